#[cfg(test)]
#[path = "artifact_store_test.rs"]
mod tests;

use std::io;
use std::path;

use anyhow::Result;
use chrono::DateTime;
use chrono::Local;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Artifact;

const FILE_PREFIX: &str = "generated_";

/// Writes every generated program to its own file. Files are never
/// overwritten or removed, so the directory doubles as a history of attempts.
pub struct ArtifactStore {
    pub dir: path::PathBuf,
    suffix: String,
}

impl Default for ArtifactStore {
    fn default() -> ArtifactStore {
        return ArtifactStore::new(
            path::PathBuf::from(Config::get(ConfigKey::ArtifactsDir)),
            &Config::get(ConfigKey::ArtifactSuffix),
        );
    }
}

impl ArtifactStore {
    pub fn new(dir: path::PathBuf, suffix: &str) -> ArtifactStore {
        let mut suffix = suffix.trim().to_string();
        if !suffix.is_empty() && !suffix.starts_with('.') {
            suffix = format!(".{suffix}");
        }

        return ArtifactStore { dir, suffix };
    }

    fn file_name(&self, timestamp: &DateTime<Local>, sequence: usize) -> String {
        let stamp = timestamp.format("%Y%m%d_%H%M%S");
        if sequence == 0 {
            return format!("{FILE_PREFIX}{stamp}{}", self.suffix);
        }

        return format!("{FILE_PREFIX}{stamp}_{sequence}{}", self.suffix);
    }

    /// Saves `code` under a name derived from the current second. When that
    /// name is taken, by this session or another one, a sequence number is
    /// appended until a free name is found.
    pub async fn persist(&self, code: &str) -> Result<Artifact> {
        fs::create_dir_all(&self.dir).await?;

        let created_at = Local::now();
        let mut sequence = 0;
        loop {
            let filename = self.dir.join(self.file_name(&created_at, sequence));
            let file_res = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&filename)
                .await;

            let mut file = match file_res {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    sequence += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            file.write_all(code.as_bytes()).await?;
            file.flush().await?;

            tracing::debug!(filename = ?filename, bytes = code.len(), "Saved artifact");

            return Ok(Artifact {
                code: code.to_string(),
                filename,
                created_at,
            });
        }
    }

    /// Orders by the timestamp, then by the collision sequence as a number so
    /// `_10` follows `_9`.
    fn sort_key(&self, artifact: &path::Path) -> (String, usize, String) {
        let file_name = artifact
            .file_name()
            .map(|name| return name.to_string_lossy().to_string())
            .unwrap_or_default();

        let stem = file_name
            .strip_prefix(FILE_PREFIX)
            .and_then(|rest| return rest.strip_suffix(self.suffix.as_str()))
            .unwrap_or(file_name.as_str());

        let mut parts = stem.splitn(3, '_');
        let date = parts.next().unwrap_or_default();
        let time = parts.next().unwrap_or_default();
        let sequence = parts
            .next()
            .and_then(|seq| return seq.parse::<usize>().ok())
            .unwrap_or(0);

        return (format!("{date}_{time}"), sequence, file_name.clone());
    }

    /// All artifacts in the directory, oldest first.
    pub async fn list(&self) -> Result<Vec<path::PathBuf>> {
        let mut artifacts: Vec<path::PathBuf> = vec![];
        if !self.dir.exists() {
            return Ok(artifacts);
        }

        let mut dir = fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with(FILE_PREFIX) && file_name.ends_with(&self.suffix) {
                artifacts.push(entry.path());
            }
        }

        artifacts.sort_by_cached_key(|artifact| return self.sort_key(artifact));

        return Ok(artifacts);
    }
}
