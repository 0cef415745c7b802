//! Note command handlers
//!
//! Notes are a user's annotations on a resource. Only the author may edit
//! or delete one.

use anyhow::{bail, Context, Result};

use wenshu_core::{NoteUpdate, Store, User};

use super::require_user;
use crate::editor::{confirm, edit_text};
use crate::output::{Output, OutputFormat};

/// Add a note to a resource
pub fn create(
    store: &Store,
    actor: Option<&User>,
    resource_id: i64,
    content: Option<String>,
    tags: Option<String>,
    output: &Output,
) -> Result<()> {
    let user = require_user(actor)?;
    let resource = store
        .get_resource(resource_id)?
        .ok_or_else(|| anyhow::anyhow!("Resource not found: {}", resource_id))?;

    let content = match content {
        Some(c) => c,
        None => {
            let mut guide = vec![format!("Note on: {}", resource.name)];
            if let Some(ref text) = resource.simplified_text {
                guide.extend(text.lines().take(3).map(str::to_string));
            }
            edit_text(&guide, "").context("Failed to edit note")?
        }
    };
    if content.trim().is_empty() {
        bail!("Note content cannot be empty");
    }

    let note = store.create_note(user.id, resource_id, &content, tags.as_deref())?;

    match output.format {
        OutputFormat::Quiet => println!("{}", note.id),
        OutputFormat::Json => output.json(&note),
        OutputFormat::Human => output.success(&format!(
            "Added note {} to resource {}",
            note.id, resource.name
        )),
    }
    Ok(())
}

/// List all notes on a resource
pub fn list(store: &Store, resource_id: i64, output: &Output) -> Result<()> {
    if store.get_resource(resource_id)?.is_none() {
        bail!("Resource not found: {}", resource_id);
    }
    let notes = store.notes_by_resource(resource_id)?;
    output.print_notes(&notes);
    Ok(())
}

/// List the acting user's notes
pub fn mine(store: &Store, actor: Option<&User>, output: &Output) -> Result<()> {
    let user = require_user(actor)?;
    let entries = store.notes_by_user(user.id)?;
    output.print_note_entries(&entries);
    Ok(())
}

/// Edit one of the acting user's notes
///
/// Without `--content` or `--tags` the current text opens in the editor.
pub fn edit(
    store: &Store,
    actor: Option<&User>,
    id: i64,
    content: Option<String>,
    tags: Option<String>,
    output: &Output,
) -> Result<()> {
    let user = require_user(actor)?;

    let content = match (content, &tags) {
        (Some(c), _) => Some(c),
        (None, Some(_)) => None,
        (None, None) => {
            let Some(note) = store.get_note(id)?.filter(|n| n.user_id == user.id) else {
                bail!("Note {} not found or not yours", id);
            };
            let guide = vec![format!("Editing note {}", id)];
            Some(edit_text(&guide, &note.content).context("Failed to edit note")?)
        }
    };

    let note = store.update_note(user.id, id, NoteUpdate { content, tags })?;
    let document = store.note_document(note.id)?;

    match output.format {
        OutputFormat::Json => output.json(&note),
        _ => match document {
            Some(doc) => output.success(&format!("Updated note {} in {}", note.id, doc.name)),
            None => output.success(&format!("Updated note {}", note.id)),
        },
    }
    Ok(())
}

/// Delete one of the acting user's notes
pub fn delete(
    store: &Store,
    actor: Option<&User>,
    id: i64,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let user = require_user(actor)?;

    if !yes && output.should_prompt() {
        if let Some(note) = store.get_note(id)?.filter(|n| n.user_id == user.id) {
            println!(
                "Delete note {}: {}",
                note.id,
                crate::output::truncate(&note.content.replace('\n', " "), 50)
            );
            if !confirm("Are you sure?")? {
                println!("Cancelled.");
                return Ok(());
            }
        }
    }

    store.delete_note(user.id, id)?;
    output.success(&format!("Deleted note: {}", id));
    Ok(())
}
