//! Sender list loaded from `senders.json`
//!
//! ```json
//! { "to_be_deleted": ["newsletter@example.com", "@promo.example.org"] }
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, SweepError};

#[derive(Debug, Default, Deserialize)]
struct SendersFile {
    #[serde(default)]
    to_be_deleted: Vec<String>,
}

/// Ordered, de-duplicated sender fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderList {
    fragments: Vec<String>,
}

impl SenderList {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = Vec::new();
        for fragment in fragments {
            let fragment = fragment.into().trim().to_string();
            if !fragment.is_empty() && !list.contains(&fragment) {
                list.push(fragment);
            }
        }
        Self { fragments: list }
    }

    /// Load the list; a missing file is an empty list
    pub async fn load(path: &Path) -> Result<Self> {
        Ok(Self::load_optional(path).await?.unwrap_or_default())
    }

    /// Load the list, distinguishing a missing file (`None`)
    pub async fn load_optional(path: &Path) -> Result<Option<Self>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SweepError::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let file: SendersFile = serde_json::from_str(&content).map_err(|e| {
            SweepError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        Ok(Some(Self::new(file.to_be_deleted)))
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(String::as_str)
    }

    /// Case-insensitive substring test, mirroring IMAP `SEARCH FROM`
    pub fn matches(&self, from_header: &str) -> bool {
        self.iter().any(|fragment| fragment_matches(fragment, from_header))
    }
}

/// Whether `from_header` contains `fragment`, ignoring ASCII case
pub fn fragment_matches(fragment: &str, from_header: &str) -> bool {
    from_header
        .to_ascii_lowercase()
        .contains(&fragment.to_ascii_lowercase())
}
