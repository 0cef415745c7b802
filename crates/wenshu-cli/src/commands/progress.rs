//! Reading progress command handlers

use anyhow::Result;

use wenshu_core::{Store, User};

use super::require_user;
use crate::output::{Output, OutputFormat};

/// Record how far the acting user has read a resource
pub fn record(
    store: &Store,
    actor: Option<&User>,
    resource_id: i64,
    progress: i64,
    output: &Output,
) -> Result<()> {
    let user = require_user(actor)?;
    let record = store.record_access(user.id, resource_id, progress)?;

    match output.format {
        OutputFormat::Json => output.json(&record),
        OutputFormat::Quiet => println!("{}", record.progress),
        OutputFormat::Human => output.success(&format!(
            "Resource {} read to {}%",
            resource_id, record.progress
        )),
    }
    Ok(())
}

/// Show the acting user's progress on one resource, or their whole history
pub fn history(
    store: &Store,
    actor: Option<&User>,
    resource_id: Option<i64>,
    output: &Output,
) -> Result<()> {
    let user = require_user(actor)?;

    let Some(resource_id) = resource_id else {
        let entries = store.access_history(user.id)?;
        output.print_history(&entries);
        return Ok(());
    };

    match store.get_access_record(user.id, resource_id)? {
        Some(record) => match output.format {
            OutputFormat::Json => output.json(&record),
            OutputFormat::Quiet => println!("{}", record.progress),
            OutputFormat::Human => println!(
                "Resource {}: {}% (last read {})",
                resource_id,
                record.progress,
                record.accessed_at.format("%Y-%m-%d %H:%M")
            ),
        },
        None => output.message(&format!("Resource {} not read yet.", resource_id)),
    }
    Ok(())
}
