//! Resource command handlers

use anyhow::{bail, Result};

use wenshu_core::{NewResource, ResourceInfo, ResourceUpdate, Store, User};

use super::optional_text;
use crate::editor::confirm;
use crate::output::{Output, OutputFormat};

/// Text fields shared by `res add` and `res edit`
#[derive(Default)]
pub struct ResourceFields {
    pub name: Option<String>,
    pub resource_type: Option<String>,
    pub original: Option<String>,
    pub simplified: Option<String>,
    pub translation: Option<String>,
}

/// Create a resource inside a document
pub fn add(store: &Store, document_id: i64, fields: ResourceFields, output: &Output) -> Result<()> {
    let Some(name) = fields.name else {
        bail!("A resource needs a --name");
    };

    let res = store.create_resource(NewResource {
        document_id,
        name,
        resource_type: optional_text(fields.resource_type),
        original_text: fields.original,
        simplified_text: fields.simplified,
        translated_text: fields.translation,
    })?;

    match output.format {
        OutputFormat::Quiet => println!("{}", res.id),
        OutputFormat::Json => output.json(&res),
        OutputFormat::Human => output.success(&format!(
            "Created resource {} ({}) in document {}",
            res.name, res.id, res.document_id
        )),
    }
    Ok(())
}

/// List the resources of a document
pub fn list(store: &Store, document_id: i64, output: &Output) -> Result<()> {
    if store.get_document(document_id)?.is_none() {
        bail!("Document not found: {}", document_id);
    }
    let resources = store.resources_by_document(document_id)?;
    output.print_resources(&resources);
    Ok(())
}

/// Show a resource with its info and notes
///
/// Viewing as a signed-in user records the given reading progress.
pub fn show(
    store: &Store,
    id: i64,
    actor: Option<&User>,
    progress: Option<i64>,
    output: &Output,
) -> Result<()> {
    let res = store
        .get_resource(id)?
        .ok_or_else(|| anyhow::anyhow!("Resource not found: {}", id))?;
    let info = store.get_resource_info(id)?;
    let favorited = store.is_favorited(actor.map(|u| u.id), id)?;
    let notes = store.notes_by_resource(id)?;

    if let (Some(user), Some(progress)) = (actor, progress) {
        store.record_access(user.id, id, progress)?;
    }

    output.print_resource(&res, info.as_ref(), favorited, &notes);
    Ok(())
}

/// Edit a resource, optionally moving it to another document
pub fn edit(
    store: &Store,
    id: i64,
    document_id: Option<i64>,
    fields: ResourceFields,
    output: &Output,
) -> Result<()> {
    let update = ResourceUpdate {
        document_id,
        name: fields.name,
        resource_type: fields.resource_type,
        original_text: fields.original,
        simplified_text: fields.simplified,
        translated_text: fields.translation,
    };
    let res = store.update_resource(id, update)?;
    output.success(&format!("Updated resource {} ({})", res.name, res.id));
    Ok(())
}

/// Delete a resource and its notes, favorites and progress
pub fn delete(store: &Store, id: i64, yes: bool, output: &Output) -> Result<()> {
    let res = store
        .get_resource(id)?
        .ok_or_else(|| anyhow::anyhow!("Resource not found: {}", id))?;

    if !yes && output.should_prompt() {
        let favorites = store.favorite_count(id)?;
        println!(
            "Delete resource: {} ({}), favorited by {} user(s)",
            res.name, res.id, favorites
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if !store.delete_resource(id)? {
        bail!("Resource not found: {}", id);
    }
    output.success(&format!("Deleted resource: {}", res.name));
    Ok(())
}

/// Show or replace a resource's author and dynasty
pub fn info(
    store: &Store,
    id: i64,
    author: Option<String>,
    dynasty: Option<String>,
    output: &Output,
) -> Result<()> {
    if author.is_none() && dynasty.is_none() {
        let info = store.get_resource_info(id)?;
        let document = store.resource_document(id)?;
        match output.format {
            OutputFormat::Json => output.json(&serde_json::json!({
                "info": info,
                "document": document,
            })),
            _ => {
                let info = info.unwrap_or_default();
                println!("Author:   {}", info.author.as_deref().unwrap_or("(unknown)"));
                println!("Dynasty:  {}", info.dynasty.as_deref().unwrap_or("(unknown)"));
                if let Some(doc) = document {
                    println!("Document: {} ({})", doc.name, doc.id);
                }
            }
        }
        return Ok(());
    }

    let info = store.set_resource_info(ResourceInfo {
        resource_id: id,
        author: optional_text(author),
        dynasty: optional_text(dynasty),
    })?;
    match output.format {
        OutputFormat::Json => output.json(&info),
        _ => output.success(&format!("Updated info for resource {}", id)),
    }
    Ok(())
}
