//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)
//!
//! Truncation and time formatting happen only here; the core returns
//! full records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use wenshu_core::{
    Document, DocumentStats, DocumentSummary, FavoriteEntry, HistoryEntry, Note, NoteEntry,
    Resource, ResourceEntry, ResourceInfo, SearchHit, Totals, User,
};

/// Longest document intro shown in listings
pub const INTRO_PREVIEW_CHARS: usize = 100;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Failed to encode JSON output: {}", e),
        }
    }

    /// Print a user account (never the password hash)
    pub fn print_user(&self, user: &User) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", user.id);
                println!("Username: {}", user.username);
                println!("Email:    {}", user.email);
                if let Some(ref question) = user.recovery_question {
                    println!("Recovery: {}", question);
                }
                println!("Joined:   {}", format_time(&user.created_at));
            }
            OutputFormat::Json => self.json(user),
            OutputFormat::Quiet => println!("{}", user.id),
        }
    }

    /// Print the document listing
    pub fn print_documents(&self, docs: &[DocumentSummary]) {
        match self.format {
            OutputFormat::Human => {
                if docs.is_empty() {
                    println!("No documents found.");
                    return;
                }
                for summary in docs {
                    let doc = &summary.document;
                    println!(
                        "{:>4} | {} | {} | {} | {} resource(s)",
                        doc.id,
                        doc.name,
                        doc.region.as_deref().unwrap_or("-"),
                        authors_cell(&summary.authors),
                        summary.resource_count
                    );
                    if let Some(ref intro) = doc.intro {
                        println!("       {}", truncate(intro, INTRO_PREVIEW_CHARS));
                    }
                }
                println!("\n{} document(s)", docs.len());
            }
            OutputFormat::Json => self.json(docs),
            OutputFormat::Quiet => {
                for summary in docs {
                    println!("{}", summary.document.id);
                }
            }
        }
    }

    /// Print plain documents (author and favorite lookups)
    pub fn print_document_list(&self, docs: &[Document]) {
        match self.format {
            OutputFormat::Human => {
                if docs.is_empty() {
                    println!("No documents found.");
                    return;
                }
                for doc in docs {
                    println!(
                        "{:>4} | {} | {}",
                        doc.id,
                        doc.name,
                        doc.region.as_deref().unwrap_or("-")
                    );
                }
                println!("\n{} document(s)", docs.len());
            }
            OutputFormat::Json => self.json(docs),
            OutputFormat::Quiet => {
                for doc in docs {
                    println!("{}", doc.id);
                }
            }
        }
    }

    /// Print a document with its resources and counts
    pub fn print_document(
        &self,
        doc: &Document,
        resources: &[ResourceEntry],
        authors: &[String],
        stats: Option<&DocumentStats>,
    ) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", doc.id);
                println!("Name:    {}", doc.name);
                if let Some(ref region) = doc.region {
                    println!("Region:  {}", region);
                }
                if !authors.is_empty() {
                    println!("Authors: {}", authors.join(", "));
                }
                println!("Cover:   {}", if doc.has_cover { "yes" } else { "no" });
                if let Some(s) = stats {
                    println!(
                        "Counts:  {} resource(s), {} image(s), {} favorite(s), {} note(s)",
                        s.resource_count, s.image_count, s.collection_count, s.annotation_count
                    );
                }
                if let Some(ref intro) = doc.intro {
                    println!();
                    println!("{}", intro);
                }

                println!();
                println!("── Resources ({}) ──", resources.len());
                for entry in resources {
                    println!("{}", resource_line(entry));
                }
            }
            OutputFormat::Json => self.json(&serde_json::json!({
                "document": doc,
                "authors": authors,
                "stats": stats,
                "resources": resources,
            })),
            OutputFormat::Quiet => println!("{}", doc.id),
        }
    }

    /// Print resource rows (listings and search hits)
    pub fn print_resources(&self, resources: &[Resource]) {
        match self.format {
            OutputFormat::Human => {
                if resources.is_empty() {
                    println!("No resources found.");
                    return;
                }
                for res in resources {
                    let preview = res
                        .simplified_text
                        .as_deref()
                        .or(res.original_text.as_deref())
                        .map(|t| truncate_line(t, 40))
                        .unwrap_or_default();
                    println!(
                        "{:>4} | doc {:>3} | {} | {}",
                        res.id, res.document_id, res.name, preview
                    );
                }
                println!("\n{} resource(s)", resources.len());
            }
            OutputFormat::Json => self.json(resources),
            OutputFormat::Quiet => {
                for res in resources {
                    println!("{}", res.id);
                }
            }
        }
    }

    /// Print search results with their document names
    pub fn print_search_hits(&self, hits: &[SearchHit]) {
        match self.format {
            OutputFormat::Human => {
                if hits.is_empty() {
                    println!("No resources found.");
                    return;
                }
                for hit in hits {
                    println!("{}", hit_line(hit));
                }
                println!("\n{} resource(s)", hits.len());
            }
            OutputFormat::Json => self.json(hits),
            OutputFormat::Quiet => {
                for hit in hits {
                    println!("{}", hit.resource.id);
                }
            }
        }
    }

    /// Print one resource in full
    pub fn print_resource(
        &self,
        res: &Resource,
        info: Option<&ResourceInfo>,
        favorited: bool,
        notes: &[Note],
    ) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", res.id);
                println!("Name:     {}", res.name);
                println!("Document: {}", res.document_id);
                if let Some(ref kind) = res.resource_type {
                    println!("Type:     {}", kind);
                }
                if let Some(info) = info {
                    if let Some(ref author) = info.author {
                        println!("Author:   {}", author);
                    }
                    if let Some(ref dynasty) = info.dynasty {
                        println!("Dynasty:  {}", dynasty);
                    }
                }
                if favorited {
                    println!("★ In your favorites");
                }
                for (label, text) in [
                    ("Original", &res.original_text),
                    ("Simplified", &res.simplified_text),
                    ("Translation", &res.translated_text),
                ] {
                    if let Some(text) = text {
                        println!();
                        println!("── {} ──", label);
                        println!("{}", text);
                    }
                }
                if !notes.is_empty() {
                    println!();
                    println!("── Notes ({}) ──", notes.len());
                    for note in notes {
                        println!(
                            "[{}] #{} {}",
                            note.created_at.format("%Y-%m-%d"),
                            note.id,
                            truncate_line(&note.content, 60)
                        );
                    }
                }
            }
            OutputFormat::Json => self.json(&serde_json::json!({
                "resource": res,
                "info": info,
                "favorited": favorited,
                "notes": notes,
            })),
            OutputFormat::Quiet => println!("{}", res.id),
        }
    }

    /// Print the notes on a resource
    pub fn print_notes(&self, notes: &[Note]) {
        match self.format {
            OutputFormat::Human => {
                if notes.is_empty() {
                    println!("No notes on this resource.");
                    return;
                }
                for note in notes {
                    println!("────────────────────────────────────────");
                    println!(
                        "ID: {}  User: {}  Updated: {}",
                        note.id,
                        note.user_id,
                        format_time(&note.updated_at)
                    );
                    if let Some(ref tags) = note.tags {
                        println!("Tags: {}", tags);
                    }
                    println!();
                    println!("{}", note.content);
                    println!();
                }
                println!("{} note(s)", notes.len());
            }
            OutputFormat::Json => self.json(notes),
            OutputFormat::Quiet => {
                for note in notes {
                    println!("{}", note.id);
                }
            }
        }
    }

    /// Print a user's notes with where they are attached
    pub fn print_note_entries(&self, entries: &[NoteEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No notes yet.");
                    return;
                }
                for entry in entries {
                    println!(
                        "{:>4} | {} / {} | {} | {}",
                        entry.note.id,
                        entry.document_name,
                        entry.resource_name,
                        format_time(&entry.note.updated_at),
                        truncate_line(&entry.note.content, 40)
                    );
                }
                println!("\n{} note(s)", entries.len());
            }
            OutputFormat::Json => self.json(entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.note.id);
                }
            }
        }
    }

    /// Print a user's favorites
    pub fn print_favorites(&self, entries: &[FavoriteEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No favorites yet.");
                    return;
                }
                for entry in entries {
                    let tags = entry
                        .favorite
                        .tags
                        .as_deref()
                        .map(|t| format!(" [{}]", t))
                        .unwrap_or_default();
                    println!(
                        "{:>4} | {} / {}{} | {}",
                        entry.favorite.id,
                        entry.document_name,
                        entry.resource_name,
                        tags,
                        format_time(&entry.favorite.created_at)
                    );
                }
                println!("\n{} favorite(s)", entries.len());
            }
            OutputFormat::Json => self.json(entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.favorite.id);
                }
            }
        }
    }

    /// Print a user's reading history
    pub fn print_history(&self, entries: &[HistoryEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("Nothing read yet.");
                    return;
                }
                for entry in entries {
                    println!(
                        "{} | {} / {} | {}",
                        format_time(&entry.record.accessed_at),
                        entry.document_name,
                        entry.resource_name,
                        progress_bar(entry.record.progress)
                    );
                }
            }
            OutputFormat::Json => self.json(entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{} {}", entry.record.resource_id, entry.record.progress);
                }
            }
        }
    }

    /// Print per-document statistics and totals
    pub fn print_stats(&self, stats: &[DocumentStats], totals: &Totals) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "{:>4} | {:<20} | {:>9} | {:>6} | {:>9} | {:>5}",
                    "ID", "Document", "Resources", "Images", "Favorites", "Notes"
                );
                for s in stats {
                    println!(
                        "{:>4} | {:<20} | {:>9} | {:>6} | {:>9} | {:>5}",
                        s.document_id,
                        truncate(&s.document_name, 20),
                        s.resource_count,
                        s.image_count,
                        s.collection_count,
                        s.annotation_count
                    );
                }
                println!();
                println!(
                    "{} document(s), {} resource(s), {} favorite(s), {} note(s)",
                    totals.documents, totals.resources, totals.favorites, totals.notes
                );
            }
            OutputFormat::Json => self.json(&serde_json::json!({
                "documents": stats,
                "totals": totals,
            })),
            OutputFormat::Quiet => {
                println!(
                    "{} {} {} {}",
                    totals.documents, totals.resources, totals.favorites, totals.notes
                );
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn resource_line(entry: &ResourceEntry) -> String {
    let star = if entry.favorited { "★" } else { " " };
    let author = entry
        .info
        .as_ref()
        .and_then(|i| i.author.as_deref())
        .map(|a| format!(" ({})", a))
        .unwrap_or_default();
    format!("{} {:>4} {}{}", star, entry.resource.id, entry.resource.name, author)
}

fn hit_line(hit: &SearchHit) -> String {
    let star = if hit.favorited { "★" } else { " " };
    let res = &hit.resource;
    let preview = res
        .simplified_text
        .as_deref()
        .or(res.original_text.as_deref())
        .map(|t| truncate_line(t, 40))
        .unwrap_or_default();
    format!(
        "{} {:>4} | {} | {} | {}",
        star, res.id, hit.document_name, res.name, preview
    )
}

fn authors_cell(authors: &[String]) -> String {
    if authors.is_empty() {
        "-".to_string()
    } else {
        authors.join("、")
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

fn progress_bar(progress: i64) -> String {
    let filled = (progress.clamp(0, 100) / 10) as usize;
    format!("[{}{}] {:>3}%", "#".repeat(filled), ".".repeat(10 - filled), progress)
}

/// Truncate a string to `max_chars` characters, adding "..." if truncated
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_chars: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_chars)
}
