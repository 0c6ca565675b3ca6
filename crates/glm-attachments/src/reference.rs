//! Attachment References
//!
//! Markdown links and images pointing at files uploaded to the source
//! instance, e.g. `![screenshot](/uploads/5f3c.../screen.png)`.

use std::collections::HashMap;

use glm_core::{NamespaceId, UPLOADS_PREFIX};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

/// `(!?)\[([^\]]+)\]\((/uploads[^)]+)\)`
pub static ATTACHMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(!?)\[([^\]]+)\]\(({}[^)]+)\)",
        regex::escape(UPLOADS_PREFIX)
    ))
    .expect("attachment pattern is valid")
});

/// A single link to an uploaded file found in a text body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentReference {
    /// Written as an image (`![...]`)
    pub image: bool,
    /// Link text
    pub label: String,
    /// Source-relative path, starting with `/uploads`
    pub path: String,
    /// Byte offset of the match within the scanned body
    pub offset: usize,
}

impl AttachmentReference {
    fn from_captures(caps: &Captures<'_>) -> Self {
        let whole = caps.get(0).expect("group 0 always participates");
        Self {
            image: !caps[1].is_empty(),
            label: caps[2].to_string(),
            path: caps[3].to_string(),
            offset: whole.start(),
        }
    }

    /// Find every reference in `body`, in order of appearance
    pub fn scan(body: &str) -> Vec<Self> {
        ATTACHMENT_PATTERN
            .captures_iter(body)
            .map(|caps| Self::from_captures(&caps))
            .collect()
    }

    pub fn marker(&self) -> &'static str {
        if self.image {
            "!"
        } else {
            ""
        }
    }

    /// Final segment of the path
    pub fn basename(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    /// MIME type guessed from the file extension, if it is a known one
    pub fn content_type(&self) -> Option<String> {
        mime_guess::from_path(self.basename())
            .first()
            .map(|mime| mime.to_string())
    }

    /// Destination key: `[<namespace>/]<sha256(path)>/<basename>`
    pub fn storage_key(&self, namespace: Option<NamespaceId>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.path.as_bytes());
        let name = format!("{}/{}", hex::encode(hasher.finalize()), self.basename());

        // Repository id 0 means "no repository"
        match namespace.filter(|ns| *ns != 0) {
            Some(ns) => format!("{}/{}", ns, name),
            None => name,
        }
    }

    /// The reference rewritten to point at `url`
    pub fn render(&self, url: &str) -> String {
        format!("{}[{}]({})", self.marker(), self.label, url)
    }
}

/// Replacement text for references, keyed by their offset in the scanned body
#[derive(Debug, Default, Clone)]
pub struct RewriteMap {
    entries: HashMap<usize, String>,
}

impl RewriteMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, offset: usize, replacement: String) {
        self.entries.insert(offset, replacement);
    }

    pub fn get(&self, offset: usize) -> Option<&str> {
        self.entries.get(&offset).map(String::as_str)
    }

    /// Substitute every mapped reference in `body` in a single pass.
    ///
    /// `body` must be the text the offsets were scanned from. References
    /// without an entry are left as they were.
    pub fn apply(&self, body: &str) -> String {
        if self.entries.is_empty() {
            return body.to_string();
        }

        ATTACHMENT_PATTERN
            .replace_all(body, |caps: &Captures<'_>| {
                let whole = caps.get(0).expect("group 0 always participates");
                self.get(whole.start())
                    .unwrap_or(whole.as_str())
                    .to_string()
            })
            .into_owned()
    }
}
