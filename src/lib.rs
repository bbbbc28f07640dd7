//! Exchange request workflow for an online book marketplace.
//!
//! A user proposes trading one of their books for a book owned by someone
//! else; the owner accepts or rejects. Requests are stored in sled and move
//! `pending -> accepted` or `pending -> rejected` exactly once.

pub mod api;
pub mod book;
pub mod catalog;
pub mod config;
pub mod error;
pub mod notify;
pub mod request;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;
