//! Local caching for downloaded PDF files.
//!
//! Payloads are validated by magic bytes before they touch disk: the cache
//! never stores or returns content that does not start with `%PDF`,
//! whatever content type the upstream server claimed. Writes are
//! idempotent; concurrent writers for the same identifier produce the same
//! bytes, so last-writer-wins needs no locking.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Leading bytes of every valid PDF file
const PDF_MAGIC: &[u8] = b"%PDF";

/// File-based cache of PDF payloads keyed by paper identifier
#[derive(Debug, Clone)]
pub struct PdfCache {
    directory: PathBuf,
}

impl PdfCache {
    /// Create a cache rooted at the given directory. The directory is
    /// created lazily on the first save.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The cache directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Validate and persist a PDF payload. Returns the file path on
    /// success, `None` when the payload fails magic-byte validation or the
    /// write fails (logged, not fatal).
    pub fn save(&self, id: &str, bytes: &[u8]) -> Option<PathBuf> {
        if !bytes.starts_with(PDF_MAGIC) {
            warn!("rejecting non-PDF payload for {} ({} bytes)", id, bytes.len());
            return None;
        }

        if let Err(e) = fs::create_dir_all(&self.directory) {
            warn!("failed to create cache directory: {}", e);
            return None;
        }

        let path = self.path_for(id);
        match fs::write(&path, bytes) {
            Ok(()) => {
                debug!("cached PDF for {} at {}", id, path.display());
                Some(path)
            }
            Err(e) => {
                warn!("failed to cache PDF for {}: {}", id, e);
                None
            }
        }
    }

    /// Path of a previously cached PDF, or `None` when absent or invalid.
    /// Files that fail re-validation (truncated or overwritten with junk)
    /// are treated as absent.
    pub fn get(&self, id: &str) -> Option<PathBuf> {
        let path = self.path_for(id);
        let mut header = [0u8; 4];

        let valid = fs::File::open(&path)
            .and_then(|mut file| {
                use std::io::Read;
                file.read_exact(&mut header)
            })
            .map(|_| header.starts_with(PDF_MAGIC))
            .unwrap_or(false);

        if valid {
            Some(path)
        } else {
            None
        }
    }

    /// Remove a cached PDF, if present.
    pub fn delete(&self, id: &str) {
        let path = self.path_for(id);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to delete cached PDF for {}: {}", id, e);
            }
        }
    }

    /// Remove every cached PDF.
    pub fn clear(&self) {
        if let Ok(entries) = fs::read_dir(&self.directory) {
            for entry in entries.flatten() {
                if entry.path().extension().is_some_and(|ext| ext == "pdf") {
                    if let Err(e) = fs::remove_file(entry.path()) {
                        warn!("failed to delete {}: {}", entry.path().display(), e);
                    }
                }
            }
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        let safe: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.directory.join(format!("{}.pdf", safe))
    }
}
