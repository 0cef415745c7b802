//! Document command handlers

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use wenshu_core::{DocumentUpdate, NewDocument, Store, User};

use super::optional_text;
use crate::editor::confirm;
use crate::output::{Output, OutputFormat};

/// Largest cover image accepted from disk
const MAX_COVER_BYTES: u64 = 16 * 1024 * 1024;

/// Create a new document
pub fn add(
    store: &Store,
    name: String,
    region: Option<String>,
    intro: Option<String>,
    output: &Output,
) -> Result<()> {
    let doc = store.create_document(NewDocument {
        name,
        region: optional_text(region),
        intro: optional_text(intro),
    })?;

    match output.format {
        OutputFormat::Quiet => println!("{}", doc.id),
        OutputFormat::Json => output.json(&doc),
        OutputFormat::Human => output.success(&format!("Created document {} ({})", doc.name, doc.id)),
    }
    Ok(())
}

/// List all documents
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let docs = store.list_documents()?;
    output.print_documents(&docs);
    Ok(())
}

/// Show a document with its resources
pub fn show(store: &Store, id: i64, actor: Option<&User>, output: &Output) -> Result<()> {
    let doc = store
        .get_document(id)?
        .ok_or_else(|| anyhow::anyhow!("Document not found: {}", id))?;
    let resources = store.resource_entries(id, actor.map(|u| u.id))?;
    let authors = store.document_authors(id)?;
    let stats = store.document_stats_for(id)?;

    output.print_document(&doc, &resources, &authors, stats.as_ref());
    Ok(())
}

/// Edit a document's name, region or intro
pub fn edit(
    store: &Store,
    id: i64,
    name: Option<String>,
    region: Option<String>,
    intro: Option<String>,
    output: &Output,
) -> Result<()> {
    let update = DocumentUpdate {
        name,
        region,
        intro,
    };
    if update.is_empty() {
        bail!("Nothing to change. Pass --name, --region or --intro.");
    }

    let doc = store.update_document(id, update)?;
    output.success(&format!("Updated document {} ({})", doc.name, doc.id));
    Ok(())
}

/// Delete a document and everything in it
pub fn delete(store: &Store, id: i64, yes: bool, output: &Output) -> Result<()> {
    let doc = store
        .get_document(id)?
        .ok_or_else(|| anyhow::anyhow!("Document not found: {}", id))?;

    if !yes && output.should_prompt() {
        let count = store.count_resources(id)?;
        println!(
            "Delete document: {} ({}) and its {} resource(s)",
            doc.name, doc.id, count
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if !store.delete_document(id)? {
        bail!("Document not found: {}", id);
    }
    output.success(&format!("Deleted document: {}", doc.name));
    Ok(())
}

/// Show counts for one document
pub fn stats(store: &Store, id: i64, kind: Option<String>, output: &Output) -> Result<()> {
    let stats = store
        .document_stats_for(id)?
        .ok_or_else(|| anyhow::anyhow!("Document not found: {}", id))?;
    let typed = match kind {
        Some(ref kind) => Some(store.count_resources_by_type(id, kind)?),
        None => None,
    };

    match output.format {
        OutputFormat::Json => output.json(&serde_json::json!({
            "stats": stats,
            "resource_type": kind,
            "type_count": typed,
        })),
        OutputFormat::Quiet => println!("{}", typed.unwrap_or(stats.resource_count)),
        OutputFormat::Human => {
            println!("Document:  {} ({})", stats.document_name, stats.document_id);
            println!("Resources: {}", stats.resource_count);
            println!("Images:    {}", stats.image_count);
            println!("Favorites: {}", stats.collection_count);
            println!("Notes:     {}", stats.annotation_count);
            if let (Some(kind), Some(count)) = (kind, typed) {
                println!("Type {}: {}", kind, count);
            }
        }
    }
    Ok(())
}

/// Set, clear or export a document's cover image
pub fn cover(
    store: &Store,
    id: i64,
    set: Option<PathBuf>,
    clear: bool,
    out: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    if let Some(path) = set {
        let size = fs::metadata(&path)
            .with_context(|| format!("Failed to read cover file: {:?}", path))?
            .len();
        if size > MAX_COVER_BYTES {
            bail!("Cover image is too large ({} bytes)", size);
        }
        let bytes =
            fs::read(&path).with_context(|| format!("Failed to read cover file: {:?}", path))?;
        store.set_document_cover(id, Some(bytes.as_slice()))?;
        output.success(&format!("Set cover of document {} ({} bytes)", id, bytes.len()));
        return Ok(());
    }

    if clear {
        store.set_document_cover(id, None)?;
        output.success(&format!("Cleared cover of document {}", id));
        return Ok(());
    }

    let cover = store.get_document_cover(id)?;
    match (cover, out) {
        (None, _) => output.message(&format!("Document {} has no cover.", id)),
        (Some(bytes), Some(path)) => {
            fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write cover file: {:?}", path))?;
            output.success(&format!("Wrote {} bytes to {}", bytes.len(), path.display()));
        }
        (Some(bytes), None) => match output.format {
            OutputFormat::Json => output.json(&serde_json::json!({
                "document_id": id,
                "size": bytes.len(),
                "data": STANDARD.encode(&bytes),
            })),
            OutputFormat::Quiet => println!("{}", bytes.len()),
            OutputFormat::Human => {
                println!("Document {} has a cover of {} bytes.", id, bytes.len());
                println!("Export it with --out <file>.");
            }
        },
    }
    Ok(())
}

/// Documents containing a resource by this author
pub fn by_author(store: &Store, author: String, output: &Output) -> Result<()> {
    let docs = store.documents_by_author(&author)?;
    output.print_document_list(&docs);
    Ok(())
}
