//! Proposal number token.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EXACT_PROPOSAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{4}$").expect("valid exact proposal regex"));

/// Word that prefixes every normalized proposal token.
pub const PROPOSAL_PREFIX: &str = "Proposal";

/// A proposal number in `DDDD-DD-DDDD` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProposalNumber(String);

/// Rejected proposal token input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalNumberError(pub String);

impl Display for ProposalNumberError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid proposal number `{}`; expected DDDD-DD-DDDD",
            self.0
        )
    }
}

impl Error for ProposalNumberError {}

impl ProposalNumber {
    /// Parses one proposal number. Surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Result<Self, ProposalNumberError> {
        let trimmed = value.trim();
        if EXACT_PROPOSAL_RE.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ProposalNumberError(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the normalized note text, e.g. `Proposal 1234-56-7890`.
    pub fn prefixed(&self) -> String {
        format!("{PROPOSAL_PREFIX} {}", self.0)
    }
}

impl Display for ProposalNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProposalNumber {
    type Error = ProposalNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value.as_str())
    }
}

impl From<ProposalNumber> for String {
    fn from(value: ProposalNumber) -> Self {
        value.0
    }
}
