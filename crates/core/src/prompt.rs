//! Interactive collaborators: confirmations and message editing.
//!
//! The engine never talks to a terminal directly. It asks a [`Prompter`],
//! which the CLI implements with real prompts and an editor, and which
//! non-interactive runs and tests replace with [`AutoConfirm`].

use crate::errors::SyncError;

/// Yes/no confirmation and message editing, injected into the engine.
pub trait Prompter {
    /// Ask a yes/no question. `Ok(false)` means the user declined.
    fn confirm(&mut self, question: &str) -> Result<bool, SyncError>;

    /// Let the user edit `text` and return the raw result.
    ///
    /// The engine normalizes the returned text; an empty result aborts the
    /// import.
    fn edit(&mut self, text: &str) -> Result<String, SyncError>;
}

/// Non-interactive prompter: confirms everything, edits nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl Prompter for AutoConfirm {
    fn confirm(&mut self, _question: &str) -> Result<bool, SyncError> {
        Ok(true)
    }

    fn edit(&mut self, text: &str) -> Result<String, SyncError> {
        Ok(text.to_string())
    }
}
