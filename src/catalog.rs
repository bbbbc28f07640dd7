//! Book catalog seam and a sled-backed implementation
use std::sync::Arc;

use sled::{Db, Tree};

use super::book::BookRecord;

pub const BOOKS_TREE: &str = "books";

/// Read access to book metadata owned by the wider marketplace.
pub trait BookCatalog: Send + Sync {
    fn get(&self, book_id: &str) -> anyhow::Result<Option<BookRecord>>;
}

pub struct SledCatalog {
    books: Tree,
}

impl SledCatalog {
    pub fn open(db: &Arc<Db>) -> anyhow::Result<Self> {
        Ok(Self {
            books: db.open_tree(BOOKS_TREE)?,
        })
    }

    /// Insert or replace a book.
    pub fn put(&self, record: &BookRecord) -> anyhow::Result<()> {
        self.books
            .insert(record.book_id.as_bytes(), record.to_cbor()?)?;
        Ok(())
    }

    /// Returns the removed record, if there was one.
    pub fn remove(&self, book_id: &str) -> anyhow::Result<Option<BookRecord>> {
        match self.books.remove(book_id.as_bytes())? {
            Some(bytes) => Ok(Some(BookRecord::from_cbor(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl BookCatalog for SledCatalog {
    fn get(&self, book_id: &str) -> anyhow::Result<Option<BookRecord>> {
        match self.books.get(book_id.as_bytes())? {
            Some(bytes) => Ok(Some(BookRecord::from_cbor(&bytes)?)),
            None => Ok(None),
        }
    }
}
