//! Generated deployment bundle.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stackforge_common::diagnostic::Diagnostic;
use stackforge_common::error::{Result, StackforgeError};

/// Summary figures of a generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMetadata {
    /// Number of resolved services, native ones included.
    pub service_count: usize,
    /// Estimated memory need of the full stack, in MB.
    pub estimated_memory_mb: u64,
    /// When the bundle was generated.
    pub generated_at: DateTime<Utc>,
}

/// Every file of a deployment, keyed by path relative to the bundle root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    /// Relative path to file contents.
    pub files: BTreeMap<String, String>,
    /// Summary figures.
    pub metadata: BundleMetadata,
    /// Advisory diagnostics collected along the way.
    pub warnings: Vec<Diagnostic>,
}

impl Bundle {
    /// Returns the contents of one file.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Writes every file below `dir`, creating parent directories.
    ///
    /// Existing files with the same path are overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written, or if a
    /// file path would escape `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        for (relative, contents) in &self.files {
            let relative_path = Path::new(relative);
            if relative_path.is_absolute()
                || relative_path
                    .components()
                    .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                return Err(StackforgeError::Config {
                    message: format!("bundle path escapes output directory: {relative}"),
                });
            }
            let path = dir.join(relative_path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StackforgeError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            std::fs::write(&path, contents).map_err(|e| StackforgeError::Io {
                path: path.clone(),
                source: e,
            })?;
        }
        tracing::info!(
            dir = %dir.display(),
            files = self.files.len(),
            "bundle written"
        );
        Ok(())
    }
}
