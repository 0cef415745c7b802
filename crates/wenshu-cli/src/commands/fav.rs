//! Favorite command handlers

use anyhow::Result;

use wenshu_core::{Store, User};

use super::{optional_text, require_user};
use crate::output::{Output, OutputFormat};

/// Favorite a resource, or unfavorite it if it already is
pub fn toggle(
    store: &Store,
    actor: Option<&User>,
    resource_id: i64,
    tags: Option<String>,
    output: &Output,
) -> Result<()> {
    let user = require_user(actor)?;
    let outcome = store.toggle_favorite(user.id, resource_id, tags.as_deref())?;

    match output.format {
        OutputFormat::Json => output.json(&outcome),
        OutputFormat::Quiet => println!("{}", outcome.favorited),
        OutputFormat::Human => {
            if outcome.favorited {
                output.success(&format!("Added resource {} to favorites", resource_id));
            } else {
                output.success(&format!("Removed resource {} from favorites", resource_id));
            }
        }
    }
    Ok(())
}

/// List the acting user's favorites
pub fn list(store: &Store, actor: Option<&User>, output: &Output) -> Result<()> {
    let user = require_user(actor)?;
    let entries = store.favorites_by_user(user.id)?;
    output.print_favorites(&entries);
    Ok(())
}

/// Documents the acting user has favorited something in
pub fn documents(store: &Store, actor: Option<&User>, output: &Output) -> Result<()> {
    let user = require_user(actor)?;
    let docs = store.favorite_documents(user.id)?;
    output.print_document_list(&docs);
    Ok(())
}

/// Replace the tags on a favorite
pub fn tags(
    store: &Store,
    actor: Option<&User>,
    favorite_id: i64,
    tags: Option<String>,
    output: &Output,
) -> Result<()> {
    let user = require_user(actor)?;
    let tags = optional_text(tags);
    let favorite = store.update_favorite_tags(user.id, favorite_id, tags.as_deref())?;

    match output.format {
        OutputFormat::Json => output.json(&favorite),
        _ => match favorite.tags {
            Some(ref t) => output.success(&format!("Tagged favorite {}: {}", favorite.id, t)),
            None => output.success(&format!("Cleared tags on favorite {}", favorite.id)),
        },
    }
    Ok(())
}

/// Remove a favorite by its ID
pub fn delete(
    store: &Store,
    actor: Option<&User>,
    favorite_id: i64,
    output: &Output,
) -> Result<()> {
    let user = require_user(actor)?;
    let document = store.favorite_document(favorite_id)?;
    store.delete_favorite(user.id, favorite_id)?;

    match document {
        Some(doc) => output.success(&format!("Removed favorite {} from {}", favorite_id, doc.name)),
        None => output.success(&format!("Removed favorite {}", favorite_id)),
    }
    Ok(())
}
