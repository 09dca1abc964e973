//! Persistence of `permits.json` documents.
//!
//! # Responsibility
//! - Parse documents and reject unsupported layouts.
//! - Write documents back with the indentation they were read with.
//!
//! # Invariants
//! - Writes replace the whole file in one rename; readers never see a
//!   half-written document.
//! - A trailing newline is kept only when the original had one.

pub mod permit_file;
