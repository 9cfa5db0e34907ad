pub const DEFAULT_EDIT_CODE_PROMPT: &str = "\
You are an expert software engineer. Rewrite the provided code according to \
the instructions. Respond with the full modified code only, inside a single \
fenced code block, with no explanation before or after.";

pub const DEFAULT_AUTO_APPLY_PROMPT: &str = "\
You are merging a proposed change into an existing file. Respond with one or \
more edits in fenced code blocks using this exact format:\n\
```<language>:<file path>\n\
<<<<<<< SEARCH\n\
exact lines copied from the destination file\n\
=======\n\
the replacement lines\n\
>>>>>>> REPLACE\n\
```\n\
Each SEARCH text must match the destination file verbatim. Keep edits \
minimal and do not include unrelated changes.";

pub const DEFAULT_COMMIT_MESSAGE_PROMPT: &str = "\
Write a concise git commit message for the following diff. Use the \
imperative mood in the subject line and keep it under 72 characters. Add a \
short body only when the change needs explanation.";

pub const DEFAULT_NAME_LOOKUPS_PROMPT: &str = "\
Suggest descriptive identifier names for the described code element. \
Respond with a JSON array of strings and nothing else.";

/// Prompt overrides for the built-in actions; empty fields fall back to the
/// defaults above.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CorePrompts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_apply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_lookups: Option<String>,
}

impl CorePrompts {
    pub fn edit_code(&self) -> &str {
        self.edit_code.as_deref().unwrap_or(DEFAULT_EDIT_CODE_PROMPT)
    }

    pub fn auto_apply(&self) -> &str {
        self.auto_apply.as_deref().unwrap_or(DEFAULT_AUTO_APPLY_PROMPT)
    }

    pub fn commit_message(&self) -> &str {
        self.commit_message
            .as_deref()
            .unwrap_or(DEFAULT_COMMIT_MESSAGE_PROMPT)
    }

    pub fn name_lookups(&self) -> &str {
        self.name_lookups
            .as_deref()
            .unwrap_or(DEFAULT_NAME_LOOKUPS_PROMPT)
    }
}
