use super::AttemptExecutor;
use crate::core::errors::{EngineError, PrepareError};
use crate::core::models::{AttemptError, AttemptResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;
use std::time::Instant;
use zip::ZipArchive;
use zip::result::ZipError;

type ArchiveHandle = ZipArchive<BufReader<File>>;

/// Tests candidate keys against one encrypted archive entry.
///
/// A key is accepted only when the probe entry decrypts and its full content
/// passes the integrity check, not on the header check value alone.
pub struct ArchiveExecutor {
    archive: Option<ArchiveHandle>,
    probe_index: usize,
    probe_name: String,
}

impl ArchiveExecutor {
    pub fn open(path: &Path) -> Result<Self, PrepareError> {
        if !path.is_file() {
            return Err(EngineError::MissingTarget(path.display().to_string()).into());
        }
        let file = File::open(path)
            .map_err(|e| EngineError::MissingTarget(format!("{}: {}", path.display(), e)))?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .map_err(|e| PrepareError::Structural(format!("not a readable zip archive: {}", e)))?;

        let (probe_index, probe_name) = select_probe(&mut archive)?;
        tracing::info!(
            "Archive {} has {} entries, probing '{}'",
            path.display(),
            archive.len(),
            probe_name
        );

        Ok(Self {
            archive: Some(archive),
            probe_index,
            probe_name,
        })
    }

    pub fn probe_name(&self) -> &str {
        &self.probe_name
    }
}

/// Smallest non-empty encrypted file entry, or any encrypted entry when all
/// are empty.
fn select_probe<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<(usize, String), PrepareError> {
    let mut best: Option<(bool, u64, usize, String)> = None;
    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|e| PrepareError::Structural(format!("entry {} unreadable: {}", index, e)))?;
        if !entry.encrypted() || entry.is_dir() {
            continue;
        }
        let key = (entry.size() == 0, entry.compressed_size(), index, entry.name().to_string());
        let better = match &best {
            None => true,
            Some(current) => (key.0, key.1) < (current.0, current.1),
        };
        if better {
            best = Some(key);
        }
    }
    best.map(|(_, _, index, name)| (index, name))
        .ok_or_else(|| PrepareError::Structural("archive has no encrypted entries".to_string()))
}

fn check_key<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    key: &[u8],
) -> Result<(), AttemptError> {
    let mut entry = match archive.by_index_decrypt(index, key) {
        Ok(entry) => entry,
        Err(ZipError::InvalidPassword) => {
            return Err(AttemptError::Rejected("password check failed".to_string()));
        }
        Err(other) => return Err(AttemptError::Structural(other.to_string())),
    };
    io::copy(&mut entry, &mut io::sink())
        .map(|_| ())
        .map_err(|e| AttemptError::Rejected(e.to_string()))
}

#[async_trait]
impl AttemptExecutor for ArchiveExecutor {
    async fn attempt(&mut self, candidate: &str) -> AttemptResult {
        let started = Instant::now();
        let Some(mut archive) = self.archive.take() else {
            return AttemptResult::failed(
                AttemptError::Structural("archive handle lost".to_string()),
                started.elapsed(),
            );
        };
        let index = self.probe_index;
        let key = candidate.as_bytes().to_vec();

        let joined = tokio::task::spawn_blocking(move || {
            let outcome = check_key(&mut archive, index, &key);
            (archive, outcome)
        })
        .await;

        match joined {
            Ok((archive, outcome)) => {
                self.archive = Some(archive);
                match outcome {
                    Ok(()) => AttemptResult {
                        elapsed: started.elapsed(),
                        ..Default::default()
                    },
                    Err(err) => AttemptResult::failed(err, started.elapsed()),
                }
            }
            Err(e) => AttemptResult::failed(
                AttemptError::Structural(format!("integrity check aborted: {}", e)),
                started.elapsed(),
            ),
        }
    }
}

/// Extract every entry with the recovered key. Entries whose names would
/// escape `dest` are skipped.
pub fn extract_all(path: &Path, key: &str, dest: &Path) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Failed to read archive {}", path.display()))?;
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create directory {}", dest.display()))?;

    let mut written = 0;
    for index in 0..archive.len() {
        let encrypted = archive.by_index_raw(index)?.encrypted();
        let mut entry = if encrypted {
            archive.by_index_decrypt(index, key.as_bytes())?
        } else {
            archive.by_index(index)?
        };

        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping entry with unsafe path: {}", entry.name());
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)
            .with_context(|| format!("Failed to create {}", out_path.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to extract {}", out_path.display()))?;
        written += 1;
    }

    tracing::info!("Extracted {} files to {}", written, dest.display());
    Ok(written)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::{AesMode, ZipWriter};

    /// Zip with one AES-encrypted text entry and one plain entry
    pub(crate) fn encrypted_zip(dir: &Path, password: &str) -> PathBuf {
        let path = dir.join("secret.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        let locked = SimpleFileOptions::default().with_aes_encryption(AesMode::Aes256, password);
        writer.start_file("notes/flag.txt", locked).unwrap();
        writer.write_all(b"the flag is under the mat\n").unwrap();
        writer.start_file("readme.txt", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"nothing to see").unwrap();
        writer.finish().unwrap();
        path
    }

    #[tokio::test]
    async fn test_right_key_passes_integrity_check() {
        let dir = TempDir::new().unwrap();
        let path = encrypted_zip(dir.path(), "p2");
        let mut exec = ArchiveExecutor::open(&path).unwrap();
        assert_eq!(exec.probe_name(), "notes/flag.txt");

        let wrong = exec.attempt("p1").await;
        assert!(matches!(wrong.error, Some(AttemptError::Rejected(_))));

        let right = exec.attempt("p2").await;
        assert!(right.error.is_none());

        // the handle survives repeated attempts
        let again = exec.attempt("p3").await;
        assert!(matches!(again.error, Some(AttemptError::Rejected(_))));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = ArchiveExecutor::open(Path::new("/nonexistent/none.zip")).err().unwrap();
        assert!(matches!(err, PrepareError::Fatal(EngineError::MissingTarget(_))));
    }

    #[test]
    fn test_garbage_file_is_structural() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.zip");
        fs::write(&path, b"definitely not a zip").unwrap();
        let err = ArchiveExecutor::open(&path).err().unwrap();
        assert!(matches!(err, PrepareError::Structural(_)));
    }

    #[test]
    fn test_unencrypted_archive_is_structural() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        writer.start_file("a.txt", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"open").unwrap();
        writer.finish().unwrap();

        let err = ArchiveExecutor::open(&path).err().unwrap();
        assert!(matches!(err, PrepareError::Structural(_)));
    }

    #[test]
    fn test_extract_all_writes_entries() {
        let dir = TempDir::new().unwrap();
        let path = encrypted_zip(dir.path(), "p2");
        let dest = dir.path().join("extracted");

        let written = extract_all(&path, "p2", &dest).unwrap();
        assert_eq!(written, 2);
        let flag = fs::read_to_string(dest.join("notes/flag.txt")).unwrap();
        assert_eq!(flag, "the flag is under the mat\n");
    }
}
