//! Terminal implementation of the engine's prompts.

use dialoguer::{Confirm, Editor};

use treesync_core::{Prompter, SyncError};

/// Asks on the terminal and edits messages in the user's Git editor.
pub struct TerminalPrompter;

/// Editor lookup order used by `git commit`.
fn editor_program() -> String {
    ["GIT_EDITOR", "VISUAL", "EDITOR"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| "vi".to_string())
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool, SyncError> {
        Confirm::new()
            .with_prompt(question)
            .default(true)
            .interact()
            .map_err(|e| SyncError::Prompt(e.to_string()))
    }

    fn edit(&mut self, text: &str) -> Result<String, SyncError> {
        Editor::new()
            .executable(editor_program())
            .extension(".gitcommit")
            .require_save(false)
            .edit(text)
            .map(Option::unwrap_or_default)
            .map_err(|e| SyncError::Prompt(e.to_string()))
    }
}
