//! File secret backend implementation
//!
//! Reads secrets from a local CSV file with the header
//! `category,name,value,notes` (any column order, `notes` optional):
//!
//! ```text
//! name,category,value,notes
//! example_name,root,super_secret,example secret
//! example_pw,prod/data,super_secret_pw,production password
//! ```
//!
//! The file is re-read on every lookup; caching is the resolver's job. Stores
//! rewrite the whole file through a temporary sibling that is renamed into
//! place, and create it when missing. Intended for local
//! development and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::backend::{SecretBackend, SecretBackendType};
use crate::secrets::error::{Result, SecretsError};
use crate::secrets::types::{SecretMap, SecretString};

/// Default file name, relative to `$HOME`.
pub const DEFAULT_SECRETS_FILE_NAME: &str = ".secretary.csv";

/// Default location of the secrets file: `$HOME/.secretary.csv`.
pub fn default_secrets_file() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());
    Path::new(&home).join(DEFAULT_SECRETS_FILE_NAME)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SecretRow {
    category: String,
    name: String,
    value: String,
    #[serde(default)]
    notes: Option<String>,
}

/// CSV file secret backend
#[derive(Debug)]
pub struct FileSecretBackend {
    path: PathBuf,
    // Serialises read-modify-write cycles in `store`.
    write_lock: Mutex<()>,
}

impl FileSecretBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, message: impl std::fmt::Display) -> SecretsError {
        SecretsError::backend_unavailable(
            SecretBackendType::File.as_str(),
            format!("{}: {}", self.path.display(), message),
        )
    }

    async fn read_rows(&self) -> Result<Vec<SecretRow>> {
        debug!(path = %self.path.display(), "Reading secrets file");

        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            error!(path = %self.path.display(), error = %e, "Failed to read secrets file");
            self.unavailable(e)
        })?;

        parse_rows(&bytes).map_err(|e| self.unavailable(e))
    }

    async fn read_rows_or_empty(&self) -> Result<Vec<SecretRow>> {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => self.read_rows().await,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.unavailable(e)),
        }
    }
}

fn parse_rows(bytes: &[u8]) -> std::result::Result<Vec<SecretRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader.deserialize().collect()
}

fn render_rows(rows: &[SecretRow]) -> std::result::Result<Vec<u8>, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).map_err(|e| e.to_string())?;
    }
    writer.into_inner().map_err(|e| e.to_string())
}

/// Replace `path` with `contents` via a temporary file in the same directory,
/// so a failed write leaves the previous file intact.
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl SecretBackend for FileSecretBackend {
    async fn lookup(&self, name: &str, category: &str) -> Result<Option<SecretString>> {
        let rows = self.read_rows().await?;
        // Later rows win, matching lookup_all.
        Ok(rows
            .into_iter()
            .rev()
            .find(|row| row.category == category && row.name == name)
            .map(|row| SecretString::new(row.value)))
    }

    async fn lookup_all(&self, category: &str) -> Result<SecretMap> {
        let rows = self.read_rows().await?;
        Ok(rows
            .into_iter()
            .filter(|row| row.category == category)
            .map(|row| (row.name, SecretString::new(row.value)))
            .collect())
    }

    async fn store(&self, secrets: &SecretMap, category: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut rows = self.read_rows_or_empty().await?;

        for (name, value) in secrets {
            // Duplicate rows all take the new value so lookups read it back.
            let mut updated = false;
            for row in rows.iter_mut().filter(|row| row.category == category && &row.name == name) {
                row.value = value.expose_secret().to_string();
                updated = true;
            }
            if !updated {
                rows.push(SecretRow {
                    category: category.to_string(),
                    name: name.clone(),
                    value: value.expose_secret().to_string(),
                    notes: None,
                });
            }
        }

        let bytes = render_rows(&rows).map_err(|e| self.unavailable(e))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| self.unavailable(e))?
            .map_err(|e| {
                error!(path = %self.path.display(), error = %e, "Failed to write secrets file");
                self.unavailable(e)
            })?;

        info!(
            path = %self.path.display(),
            category = %category,
            count = secrets.len(),
            "Stored secrets to file"
        );
        Ok(())
    }

    fn backend_type(&self) -> SecretBackendType {
        SecretBackendType::File
    }

    fn is_writable(&self) -> bool {
        true
    }
}
