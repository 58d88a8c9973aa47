//! Fixed curl transport options shared by every transfer.
//!
//! One GET per item, written sequentially from offset 0 — there is no
//! resume support and no Range requests, matching the single HTTP fetch the
//! worker performs per item.

use std::time::Duration;

use anyhow::{Context, Result};

/// Builds a fresh `Easy` handle with every option the worker's transfers
/// always need, except the write/progress callbacks, which are wired by the
/// caller since they close over per-transfer state.
///
/// `ACCEPTTIMEOUT_MS` from the original worker bounds FTP PASV negotiation
/// only; it has no HTTP(S) equivalent and curl-rust's safe `Easy` API does
/// not expose a setter for it, so it is dropped here rather than reached for
/// through an unsafe raw `setopt`.
pub fn configure(url: &str) -> Result<curl::easy::Easy> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.max_redirections(5)?;
    easy.connect_timeout(Duration::from_secs(45))?;
    easy.fail_on_error(true)?;
    easy.progress(true)?;
    Ok(easy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_accepts_a_well_formed_url() {
        assert!(configure("http://example.invalid/file.bin").is_ok());
    }

    #[test]
    fn configure_rejects_an_embedded_nul_byte() {
        assert!(configure("http://example.invalid/\0file.bin").is_err());
    }
}
