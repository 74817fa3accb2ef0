//! Commit message drafting and clean-up.

use crate::config::MessageConfig;

/// Lines starting with this are dropped from edited messages.
pub const COMMENT_PREFIX: char = '#';

/// Values substituted into the message templates.
#[derive(Debug, Clone)]
pub struct MessageFields<'a> {
    /// Human description of the external source.
    pub source: &'a str,
    /// Abbreviated id of the external head.
    pub short_id: &'a str,
    /// One-line summary of the external head.
    pub summary: &'a str,
}

/// Renders the import and merge messages from configured templates.
pub struct MessageComposer {
    import_template: String,
    merge_template: String,
}

impl MessageComposer {
    pub fn new(config: &MessageConfig) -> Self {
        Self {
            import_template: config.import_template.clone(),
            merge_template: config.merge_template.clone(),
        }
    }

    /// Draft of the import commit message, before any user edit.
    pub fn import_draft(&self, fields: &MessageFields<'_>) -> String {
        render(&self.import_template, fields)
    }

    /// Message of the merge commit.
    pub fn merge_message(&self, fields: &MessageFields<'_>) -> String {
        normalize(&render(&self.merge_template, fields))
    }
}

fn render(template: &str, fields: &MessageFields<'_>) -> String {
    template
        .replace("{source}", fields.source)
        .replace("{short_id}", fields.short_id)
        .replace("{summary}", fields.summary)
}

/// Append the instructions shown to the user in the editor.
pub fn editor_text(draft: &str) -> String {
    format!(
        "{}\n{c} Please enter the commit message for the imported tree. Lines starting\n\
         {c} with '{c}' will be ignored, and an empty message aborts the import.\n",
        draft.trim_end(),
        c = COMMENT_PREFIX
    )
}

/// Clean up a message the way `git commit` does.
///
/// Comment lines and trailing whitespace are removed, runs of blank lines
/// collapse to one, and leading/trailing blank lines are dropped. The
/// result ends with a single newline, or is empty.
pub fn normalize(raw: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut pending_blank = false;
    for line in raw.lines() {
        if line.starts_with(COMMENT_PREFIX) {
            continue;
        }
        let line = line.trim_end();
        if line.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if pending_blank {
            out.push("");
            pending_blank = false;
        }
        out.push(line);
    }
    if out.is_empty() {
        return String::new();
    }
    let mut message = out.join("\n");
    message.push('\n');
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> MessageFields<'static> {
        MessageFields {
            source: "'upstream/main'",
            short_id: "1a2b3c4",
            summary: "Bump version to 2.0",
        }
    }

    #[test]
    fn test_default_import_draft_names_source_and_summary() {
        let composer = MessageComposer::new(&MessageConfig::default());
        let draft = composer.import_draft(&fields());
        let mut lines = draft.lines();
        assert_eq!(lines.next(), Some("Import tree of 'upstream/main'"));
        assert!(draft.contains("1a2b3c4: Bump version to 2.0"));
    }

    #[test]
    fn test_merge_message_is_normalized() {
        let config = MessageConfig {
            import_template: "{source}".into(),
            merge_template: "Merge {source}   \n\n\n".into(),
        };
        let composer = MessageComposer::new(&config);
        assert_eq!(composer.merge_message(&fields()), "Merge 'upstream/main'\n");
    }

    #[test]
    fn test_normalize_strips_comments_and_blank_runs() {
        let raw = "\n\nTitle  \n\n\n\nBody line\n# a comment\n\n";
        assert_eq!(normalize(raw), "Title\n\nBody line\n");
    }

    #[test]
    fn test_normalize_only_comments_is_empty() {
        let text = editor_text("");
        assert_eq!(normalize(&text), "");
        assert_eq!(normalize("   \n\t\n"), "");
    }

    #[test]
    fn test_editor_text_round_trips_draft() {
        let draft = "Import tree of x\n\nx is at abc: y\n";
        assert_eq!(normalize(&editor_text(draft)), draft);
    }
}
