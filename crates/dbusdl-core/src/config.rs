//! Resolves the one setting this daemon takes: where downloaded files land.

use std::path::PathBuf;

use anyhow::Result;

/// Download directory configuration: either an explicit override (from
/// `--tmpdir`) or the fixed default `/tmp/downloads`.
pub struct DownloadDirConfig {
    pub path: PathBuf,
}

impl DownloadDirConfig {
    /// `override_path` wins unconditionally when present; otherwise falls
    /// back to `/tmp/downloads`, the default spec'd for this service.
    pub fn resolve(override_path: Option<PathBuf>) -> Result<Self> {
        let path = override_path.unwrap_or_else(|| PathBuf::from("/tmp/downloads"));
        Ok(DownloadDirConfig { path })
    }
}
