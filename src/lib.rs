//! Fauxto: a photo organizer core. Nested folders with user-controlled
//! ordering over a photo library, plus background tagging and search.

pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod library;
pub mod logging;
pub mod search;
pub mod tagging;
pub mod tasks;
