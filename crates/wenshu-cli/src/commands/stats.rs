//! Archive statistics handler

use anyhow::Result;

use wenshu_core::Store;

use crate::output::Output;

/// Show counts for every document plus archive-wide totals
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let stats = store.document_stats()?;
    let totals = store.totals()?;
    output.print_stats(&stats, &totals);
    Ok(())
}
