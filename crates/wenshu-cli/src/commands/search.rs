//! Search command handler

use anyhow::Result;

use wenshu_core::{Store, User};

use crate::output::Output;

/// Search resource texts for a keyword
///
/// `transcription_only` restricts the search to simplified text and
/// translations. Hits the acting user has favorited are starred; anonymous
/// searches are allowed.
pub fn search(
    store: &Store,
    actor: Option<&User>,
    keyword: String,
    transcription_only: bool,
    output: &Output,
) -> Result<()> {
    let hits = store.search_hits(&keyword, actor.map(|u| u.id), transcription_only)?;
    output.print_search_hits(&hits);
    Ok(())
}
