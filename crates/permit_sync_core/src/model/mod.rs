//! Permit record model and proposal token types.
//!
//! # Responsibility
//! - Describe the two accepted `permits.json` collection shapes.
//! - Resolve identifier and note fields through their accepted aliases.
//! - Define the validated `ProposalNumber` token.
//!
//! # Invariants
//! - Record order is never changed by the model layer.
//! - Fields the model does not know about are passed through untouched.

pub mod permit;
pub mod proposal;
