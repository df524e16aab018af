//! Message templates with `{{key}}` merge placeholders.

use serde::{Deserialize, Serialize};

/// An outbound message template.
///
/// The merge-field list is never stored: it is derived on demand by
/// scanning the subject and bodies, so it cannot drift from the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub subject: String,
    pub html_body: String,
    #[serde(default)]
    pub text_body: Option<String>,
}

impl Template {
    #[must_use]
    pub fn new(subject: impl Into<String>, html_body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            html_body: html_body.into(),
            text_body: None,
        }
    }

    /// Derive the authoritative list of merge-field names used anywhere in
    /// this template, in first-seen order, without duplicates.
    #[must_use]
    pub fn merge_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();

        for source in [
            self.subject.as_str(),
            self.html_body.as_str(),
            self.text_body.as_deref().unwrap_or_default(),
        ] {
            scan_placeholders(source, &mut |key| {
                if !fields.iter().any(|f| f == key) {
                    fields.push(key.to_string());
                }
            });
        }

        fields
    }
}

/// Walk `input` and invoke `found` for every well-formed `{{key}}`
/// placeholder. Keys are trimmed; an unterminated `{{` is ignored, which
/// matches the renderer treating it as literal text.
pub fn scan_placeholders(input: &str, found: &mut dyn FnMut(&str)) {
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };

        let key = after[..end].trim();
        if !key.is_empty() {
            found(key);
        }

        rest = &after[end + 2..];
    }
}
