pub mod chain;
pub mod local;
pub mod remote;

use crate::core::errors::SourceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use chain::SourceChain;
pub use local::{LocalWordlists, PinnedWordlist, SizeTier};
pub use remote::RemoteCatalogue;

/// Lazy, finite, single-pass candidate sequence
pub type Candidates = Box<dyn Iterator<Item = String> + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrigin {
    Pinned,
    Remote,
    Local,
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOrigin::Pinned => write!(f, "pinned"),
            SourceOrigin::Remote => write!(f, "remote"),
            SourceOrigin::Local => write!(f, "local"),
        }
    }
}

/// One loadable wordlist inside a source tier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub origin: SourceOrigin,
    pub name: String,
    /// Path for files, catalogue key for remote lists
    pub location: String,
    pub size_bytes: Option<u64>,
}

impl SourceDescriptor {
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.origin)
    }
}

/// A tier of wordlists. Tiers are consulted in preference order by the
/// controller; the lists inside a tier are searched in the order returned.
#[async_trait]
pub trait WordlistSource: Send + Sync {
    fn origin(&self) -> SourceOrigin;

    async fn sources(&self) -> Result<Vec<SourceDescriptor>, SourceError>;

    async fn load(&self, descriptor: &SourceDescriptor) -> Result<Candidates, SourceError>;

    /// Entry count for listings, when cheaply known
    async fn count(&self, _descriptor: &SourceDescriptor) -> Option<u64> {
        None
    }
}

/// Normalise one raw wordlist line. Blank lines yield nothing.
pub(crate) fn clean_line(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line("  hunter2\r"), Some("hunter2".to_string()));
        assert_eq!(clean_line("   "), None);
    }

    #[test]
    fn test_descriptor_label() {
        let d = SourceDescriptor {
            origin: SourceOrigin::Remote,
            name: "common".into(),
            location: "common".into(),
            size_bytes: None,
        };
        assert_eq!(d.label(), "common (remote)");
    }
}
