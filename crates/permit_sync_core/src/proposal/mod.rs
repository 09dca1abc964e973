//! Proposal token normalization and canonical selection.
//!
//! # Responsibility
//! - Rewrite bare or loosely-prefixed tokens to `Proposal DDDD-DD-DDDD`.
//! - Pick one canonical proposal number per base-id group.
//!
//! # Invariants
//! - Note value kinds (text, list of text) survive rewriting.
//! - Two different numbers among changed siblings are never auto-resolved.

pub mod canonical;
pub mod text;
