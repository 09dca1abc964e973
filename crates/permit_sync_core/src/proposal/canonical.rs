//! Canonical proposal selection for one base-id group.
//!
//! Precedence:
//! 1. First token of each changed record. One distinct value wins
//!    (`from-changed`); more than one is an error.
//! 2. First token of every record in the group. One distinct value wins
//!    (`from-existing`); none gives `none`; several give `ambiguous-existing`
//!    and no canonical number.

use crate::model::permit::{note_value, permit_id};
use crate::model::proposal::ProposalNumber;
use crate::proposal::text::first_number;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Why a canonical number was (or was not) chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalReason {
    FromChanged,
    FromExisting,
    None,
    AmbiguousExisting(Vec<ProposalNumber>),
}

impl Display for CanonicalReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FromChanged => f.write_str("from-changed"),
            Self::FromExisting => f.write_str("from-existing"),
            Self::None => f.write_str("none"),
            Self::AmbiguousExisting(values) => {
                write!(f, "ambiguous-existing:{}", join_numbers(values))
            }
        }
    }
}

/// Selection outcome for one base id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalChoice {
    pub number: Option<ProposalNumber>,
    pub reason: CanonicalReason,
}

/// Changed records disagree on the proposal number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousChanged {
    /// Distinct values in first-seen order.
    pub values: Vec<ProposalNumber>,
}

impl Display for AmbiguousChanged {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ambiguous-changed:{}", join_numbers(&self.values))
    }
}

impl Error for AmbiguousChanged {}

/// Chooses the canonical proposal number for the records of one base id.
///
/// `group` holds the object records sharing the base id, in file order.
pub fn select_canonical(
    group: &[&Map<String, Value>],
    changed_ids: &BTreeSet<String>,
    note_field: &str,
) -> Result<CanonicalChoice, AmbiguousChanged> {
    let changed_records = group
        .iter()
        .copied()
        .filter(|record| permit_id(record).is_some_and(|id| changed_ids.contains(id)));
    let from_changed = distinct_first_numbers(changed_records, note_field);

    match from_changed.len() {
        0 => {}
        1 => {
            return Ok(CanonicalChoice {
                number: from_changed.into_iter().next(),
                reason: CanonicalReason::FromChanged,
            })
        }
        _ => {
            return Err(AmbiguousChanged {
                values: from_changed,
            })
        }
    }

    let existing = distinct_first_numbers(group.iter().copied(), note_field);
    let choice = match existing.len() {
        0 => CanonicalChoice {
            number: None,
            reason: CanonicalReason::None,
        },
        1 => CanonicalChoice {
            number: existing.into_iter().next(),
            reason: CanonicalReason::FromExisting,
        },
        _ => CanonicalChoice {
            number: None,
            reason: CanonicalReason::AmbiguousExisting(existing),
        },
    };
    Ok(choice)
}

fn distinct_first_numbers<'a>(
    records: impl Iterator<Item = &'a Map<String, Value>>,
    note_field: &str,
) -> Vec<ProposalNumber> {
    let mut distinct: Vec<ProposalNumber> = Vec::new();
    for record in records {
        if let Some(number) = first_number(note_value(record, note_field)) {
            if !distinct.contains(&number) {
                distinct.push(number);
            }
        }
    }
    distinct
}

fn join_numbers(values: &[ProposalNumber]) -> String {
    values
        .iter()
        .map(ProposalNumber::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::{select_canonical, CanonicalReason};
    use serde_json::{json, Map, Value};
    use std::collections::BTreeSet;

    fn records(values: &[Value]) -> Vec<Map<String, Value>> {
        values
            .iter()
            .map(|value| value.as_object().cloned().expect("object fixture"))
            .collect()
    }

    fn changed(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn changed_record_wins_over_existing_siblings() {
        let group = records(&[
            json!({"permit_id": "A_001", "notes": "Proposal 1111-11-1111"}),
            json!({"permit_id": "A_002", "notes": "now 2222-22-2222"}),
        ]);
        let refs: Vec<_> = group.iter().collect();
        let choice = select_canonical(&refs, &changed(&["A_002"]), "notes").unwrap();
        assert_eq!(choice.number.unwrap().as_str(), "2222-22-2222");
        assert_eq!(choice.reason, CanonicalReason::FromChanged);
    }

    #[test]
    fn two_changed_values_are_rejected() {
        let group = records(&[
            json!({"permit_id": "X_1", "notes": "Proposal 1111-11-1111"}),
            json!({"permit_id": "X_2", "notes": "Proposal 2222-22-2222"}),
        ]);
        let refs: Vec<_> = group.iter().collect();
        let err = select_canonical(&refs, &changed(&["X_1", "X_2"]), "notes").unwrap_err();
        assert_eq!(err.values.len(), 2);
        assert_eq!(
            err.to_string(),
            "ambiguous-changed:1111-11-1111,2222-22-2222"
        );
    }

    #[test]
    fn same_value_on_several_changed_records_is_not_ambiguous() {
        let group = records(&[
            json!({"permit_id": "X_1", "notes": "1111-11-1111"}),
            json!({"permit_id": "X_2", "note": ["Proposal 1111-11-1111"]}),
        ]);
        let refs: Vec<_> = group.iter().collect();
        let choice = select_canonical(&refs, &changed(&["X_1", "X_2"]), "notes").unwrap();
        assert_eq!(choice.reason, CanonicalReason::FromChanged);
    }

    #[test]
    fn fallback_to_existing_then_none_then_ambiguous_existing() {
        let single = records(&[
            json!({"permit_id": "B_1", "notes": "edited"}),
            json!({"permit_id": "B_2", "notes": "Proposal 3333-33-3333"}),
        ]);
        let refs: Vec<_> = single.iter().collect();
        let choice = select_canonical(&refs, &changed(&["B_1"]), "notes").unwrap();
        assert_eq!(choice.reason, CanonicalReason::FromExisting);
        assert_eq!(choice.number.unwrap().as_str(), "3333-33-3333");

        let empty = records(&[json!({"permit_id": "C_1", "notes": ""})]);
        let refs: Vec<_> = empty.iter().collect();
        let choice = select_canonical(&refs, &changed(&["C_1"]), "notes").unwrap();
        assert_eq!(choice.number, None);
        assert_eq!(choice.reason.to_string(), "none");

        let split = records(&[
            json!({"permit_id": "D_1", "notes": "edited"}),
            json!({"permit_id": "D_2", "notes": "4444-44-4444"}),
            json!({"permit_id": "D_3", "notes": "5555-55-5555"}),
        ]);
        let refs: Vec<_> = split.iter().collect();
        let choice = select_canonical(&refs, &changed(&["D_1"]), "notes").unwrap();
        assert_eq!(choice.number, None);
        assert_eq!(
            choice.reason.to_string(),
            "ambiguous-existing:4444-44-4444,5555-55-5555"
        );
    }
}
