//! Interactive input support
//!
//! Opens $EDITOR for writing note content and asks for confirmation before
//! destructive commands.

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::process::Command;

/// Prefix of the guide lines shown in the editor and stripped afterwards
const COMMENT_PREFIX: &str = "#";

/// Open the user's editor and return what they wrote
///
/// `guide` lines are shown above the text and removed from the result,
/// along with surrounding whitespace. Lines the user writes are kept even
/// when they start with the guide prefix.
pub fn edit_text(guide: &[String], initial: &str) -> Result<String> {
    let editor = find_editor()?;

    let temp_path = env::temp_dir().join(format!("wenshu_note_{}.txt", std::process::id()));
    let mut content = String::new();
    for line in guide {
        content.push_str(&format!("{} {}\n", COMMENT_PREFIX, line));
    }
    content.push('\n');
    content.push_str(initial);

    fs::write(&temp_path, &content)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;

    let status = Command::new(&editor)
        .arg(&temp_path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor));

    let edited = match status {
        Ok(s) if s.success() => fs::read_to_string(&temp_path)
            .with_context(|| format!("Failed to read edited file: {:?}", temp_path)),
        Ok(_) => Err(anyhow::anyhow!(
            "Editor '{}' exited with non-zero status",
            editor
        )),
        Err(e) => Err(e),
    };
    let _ = fs::remove_file(&temp_path);

    Ok(strip_guide(&edited?, guide.len()))
}

/// Remove the leading `guide_lines` guide lines and trim the remainder
fn strip_guide(text: &str, guide_lines: usize) -> String {
    let mut lines = text.lines().peekable();
    for _ in 0..guide_lines {
        if lines.next_if(|line| line.starts_with(COMMENT_PREFIX)).is_none() {
            break;
        }
    }
    lines.collect::<Vec<_>>().join("\n").trim().to_string()
}

/// Find the user's preferred editor
fn find_editor() -> Result<String> {
    for var in ["VISUAL", "EDITOR"] {
        if let Ok(editor) = env::var(var) {
            if !editor.is_empty() {
                return Ok(editor);
            }
        }
    }

    for editor in ["nano", "vim", "vi"] {
        if command_exists(editor) {
            return Ok(editor.to_string());
        }
    }

    bail!(
        "No editor found. Set $EDITOR or pass the text with --content.\n\
         Example: export EDITOR=nano"
    )
}

/// Check if a command exists in PATH
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Prompt for confirmation
///
/// Returns false without asking when stdin is not a terminal.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
