use super::{Candidates, SourceDescriptor, SourceOrigin, WordlistSource, clean_line};
use crate::core::errors::SourceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which local wordlists to use, by file size
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    /// Every file, smallest first
    #[default]
    All,
    Small,
    Medium,
    Big,
}

impl FromStr for SizeTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(SizeTier::All),
            "small" | "smallest" => Ok(SizeTier::Small),
            "medium" | "median" => Ok(SizeTier::Medium),
            "big" | "largest" => Ok(SizeTier::Big),
            other => Err(format!("unknown size tier '{}' (all, small, medium, big)", other)),
        }
    }
}

impl SizeTier {
    pub fn select(self, mut entries: Vec<(PathBuf, u64)>) -> Vec<(PathBuf, u64)> {
        if entries.is_empty() {
            return entries;
        }
        match self {
            SizeTier::All => entries,
            SizeTier::Small => vec![entries.swap_remove(0)],
            SizeTier::Medium => {
                let idx = entries.len() / 2;
                vec![entries.swap_remove(idx)]
            }
            SizeTier::Big => entries.pop().into_iter().collect(),
        }
    }
}

/// Regular files in `dir`, ordered by (size, name)
pub fn list_local(dir: &Path) -> Result<Vec<(PathBuf, u64)>, SourceError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("Skipping {:?}: {}", entry.path(), e);
                continue;
            }
        };
        if metadata.is_file() {
            entries.push((entry.path(), metadata.len()));
        }
    }
    entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    Ok(entries)
}

/// Lazily read a wordlist file. A read error ends the sequence early.
///
/// Lines are pulled through an 8 KiB buffer between attempts, so the
/// search loop only touches the disk once per buffer refill.
pub async fn read(path: &Path) -> Result<Candidates, SourceError> {
    let file = tokio::fs::File::open(path).await?.into_std().await;
    let shown = path.display().to_string();
    let lines = BufReader::new(file)
        .split(b'\n')
        .map_while(move |chunk| match chunk {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!("Stopped reading {}: {}", shown, e);
                None
            }
        })
        .filter_map(|bytes| clean_line(&String::from_utf8_lossy(&bytes)));
    Ok(Box::new(lines))
}

fn file_descriptor(origin: SourceOrigin, path: &Path, size: Option<u64>) -> SourceDescriptor {
    SourceDescriptor {
        origin,
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string()),
        location: path.display().to_string(),
        size_bytes: size,
    }
}

/// Wordlist files from a local directory
pub struct LocalWordlists {
    dir: PathBuf,
    tier: SizeTier,
}

impl LocalWordlists {
    pub fn new(dir: impl Into<PathBuf>, tier: SizeTier) -> Self {
        Self { dir: dir.into(), tier }
    }
}

#[async_trait]
impl WordlistSource for LocalWordlists {
    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Local
    }

    async fn sources(&self) -> Result<Vec<SourceDescriptor>, SourceError> {
        if !self.dir.is_dir() {
            return Err(SourceError::unavailable(
                self.dir.display().to_string(),
                "directory not found",
            ));
        }
        let dir = self.dir.clone();
        let listed = tokio::task::spawn_blocking(move || list_local(&dir))
            .await
            .map_err(|e| SourceError::unavailable(self.dir.display().to_string(), e))??;
        let entries = self.tier.select(listed);
        Ok(entries
            .iter()
            .map(|(path, size)| file_descriptor(SourceOrigin::Local, path, Some(*size)))
            .collect())
    }

    async fn load(&self, descriptor: &SourceDescriptor) -> Result<Candidates, SourceError> {
        read(Path::new(&descriptor.location)).await
    }
}

/// A single wordlist chosen explicitly by the operator
pub struct PinnedWordlist {
    path: PathBuf,
}

impl PinnedWordlist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WordlistSource for PinnedWordlist {
    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Pinned
    }

    async fn sources(&self) -> Result<Vec<SourceDescriptor>, SourceError> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| SourceError::unavailable(self.path.display().to_string(), e))?;
        Ok(vec![file_descriptor(SourceOrigin::Pinned, &self.path, Some(metadata.len()))])
    }

    async fn load(&self, descriptor: &SourceDescriptor) -> Result<Candidates, SourceError> {
        read(Path::new(&descriptor.location)).await
    }
}
