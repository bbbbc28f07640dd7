//! Service configuration.

use std::path::PathBuf;

/// Configuration for the exchange service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding the sled database.
    pub data_dir: PathBuf,

    /// Refuse a second pending request for the same requester and book.
    /// Off by default: duplicates are only logged.
    pub reject_duplicate_pending: bool,
}

impl ServiceConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            reject_duplicate_pending: false,
        }
    }

    pub fn with_reject_duplicate_pending(mut self, reject: bool) -> Self {
        self.reject_duplicate_pending = reject;
        self
    }

    /// Path of the sled database inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("exchange.db")
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("org", "bookmarket", "book-exchange")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".book-exchange"));

        Self::new(data_dir)
    }
}
