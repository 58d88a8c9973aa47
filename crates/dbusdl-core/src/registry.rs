//! Item registry: allocates item IDs and derives their on-disk paths.

use std::path::{Path, PathBuf};

/// A single queued download: its id, URL, progress scale, and destination path.
///
/// `url` and `destfile_path` never mutate after creation; `item_id` is
/// non-zero and unique per live item. Owned by exactly one holder at any
/// moment — the event currently carrying it, the worker's in-flight slot, or
/// an outbound `Done` event in transit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub item_id: u32,
    pub total_ticks: u32,
    pub url: String,
    pub destfile_path: PathBuf,
}

/// Builds the canonical destination path for an item id: ten zero-padded
/// decimal digits, lexicographically sortable, suffixed `.dbusdl`.
fn construct_path(download_dir: &Path, id: u32) -> PathBuf {
    download_dir.join(format!("{id:010}.dbusdl"))
}

/// Allocates monotonically-increasing item ids and derives destination
/// paths from them. Single-threaded: called only from the bus thread's
/// method handlers (see spec §5).
pub struct Registry {
    download_dir: PathBuf,
    temp_file_path: PathBuf,
    next_free_id: u32,
}

impl Registry {
    /// Stores `download_dir`, precomputes the singleton temp-file path for
    /// id 0, and starts the id allocator at 1. If `create_dir` is true,
    /// attempts to create `download_dir` (mode 0770 on Unix); failure to
    /// create it is logged at error level but does not fail `init`.
    pub fn init(download_dir: impl Into<PathBuf>, create_dir: bool) -> Self {
        let download_dir = download_dir.into();
        let temp_file_path = construct_path(&download_dir, 0);

        if create_dir {
            if let Err(e) = create_download_dir(&download_dir) {
                tracing::error!(
                    dir = %download_dir.display(),
                    error = %e,
                    "failed creating download directory"
                );
            }
        }

        Registry {
            download_dir,
            temp_file_path,
            next_free_id: 1,
        }
    }

    /// Issues the next id, builds the item's destination path, and returns
    /// the new item. Ids wrap from `u32::MAX` back to 1, never 0.
    pub fn allocate(&mut self, url: impl Into<String>, ticks: u32) -> Item {
        let item_id = self.next_id();
        let url = url.into();
        let destfile_path = construct_path(&self.download_dir, item_id);
        Item {
            item_id,
            total_ticks: ticks,
            url,
            destfile_path,
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_free_id;
        self.next_free_id = self.next_free_id.wrapping_add(1);
        if self.next_free_id == 0 {
            self.next_free_id = 1;
        }
        id
    }

    /// The cached temp-file path shared by every download (id 0's path).
    pub fn tempfile_path(&self) -> &Path {
        &self.temp_file_path
    }

    /// The configured download directory.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }
}

#[cfg(unix)]
fn create_download_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o770)
        .create(dir)
}

#[cfg(not(unix))]
fn create_download_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increment() {
        let mut reg = Registry::init("/tmp/downloads", false);
        let a = reg.allocate("http://example.invalid/a", 100);
        let b = reg.allocate("http://example.invalid/b", 100);
        assert_eq!(a.item_id, 1);
        assert_eq!(b.item_id, 2);
    }

    #[test]
    fn ids_never_zero_on_wraparound() {
        let mut reg = Registry::init("/tmp/downloads", false);
        reg.next_free_id = u32::MAX;
        let item = reg.allocate("http://example.invalid", 0);
        assert_eq!(item.item_id, u32::MAX);
        let next = reg.allocate("http://example.invalid", 0);
        assert_eq!(next.item_id, 1);
    }

    #[test]
    fn destfile_path_is_deterministic_and_zero_padded() {
        let mut reg = Registry::init("/tmp/downloads", false);
        let item = reg.allocate("http://example.invalid", 0);
        assert_eq!(
            item.destfile_path,
            Path::new("/tmp/downloads/0000000001.dbusdl")
        );
    }

    #[test]
    fn tempfile_path_is_id_zero() {
        let reg = Registry::init("/tmp/downloads", false);
        assert_eq!(
            reg.tempfile_path(),
            Path::new("/tmp/downloads/0000000000.dbusdl")
        );
    }

    #[test]
    fn url_and_ticks_are_copied_onto_item() {
        let mut reg = Registry::init("/tmp/downloads", false);
        let item = reg.allocate("http://example.invalid/file.bin", 250);
        assert_eq!(item.url, "http://example.invalid/file.bin");
        assert_eq!(item.total_ticks, 250);
    }
}
