//! Note text rules for proposal tokens.

use crate::model::proposal::{ProposalNumber, PROPOSAL_PREFIX};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

static PROPOSAL_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{4})\b").expect("valid proposal number regex"));
// Optional `proposal`/`ref` label with flexible separators, then the number.
static LOOSE_PROPOSAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:(?:proposal|ref)\b[\s:#.\-]*)?(\d{4}-\d{2}-\d{4})\b")
        .expect("valid loose proposal regex")
});
static PREFIXED_PROPOSAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bproposal\b\s*(\d{4}-\d{2}-\d{4})\b").expect("valid prefixed proposal regex")
});

/// Rewrites every bare or loosely-prefixed token to `Proposal DDDD-DD-DDDD`.
///
/// Text outside the matched token is left as-is.
pub fn normalize_prefixes(text: &str) -> String {
    LOOSE_PROPOSAL_RE
        .replace_all(text, |caps: &Captures<'_>| {
            format!("{PROPOSAL_PREFIX} {}", &caps[1])
        })
        .into_owned()
}

/// Returns all proposal numbers in a text note or list-of-text note, in order.
pub fn extract_numbers(note: Option<&Value>) -> Vec<ProposalNumber> {
    let mut numbers = Vec::new();
    match note {
        Some(Value::String(text)) => collect_numbers(text, &mut numbers),
        Some(Value::Array(items)) => {
            for item in items.iter().filter_map(Value::as_str) {
                collect_numbers(item, &mut numbers);
            }
        }
        _ => {}
    }
    numbers
}

/// Returns the first proposal number found in a note.
pub fn first_number(note: Option<&Value>) -> Option<ProposalNumber> {
    extract_numbers(note).into_iter().next()
}

fn collect_numbers(text: &str, out: &mut Vec<ProposalNumber>) {
    out.extend(
        PROPOSAL_NUMBER_RE
            .captures_iter(text)
            .filter_map(|caps| ProposalNumber::parse(&caps[1]).ok()),
    );
}

fn contains_prefixed(text: &str, number: &ProposalNumber) -> bool {
    PREFIXED_PROPOSAL_RE
        .captures_iter(text)
        .any(|caps| &caps[1] == number.as_str())
}

fn normalize_item(text: &str, canonical: Option<&ProposalNumber>) -> String {
    let normalized = normalize_prefixes(text);
    match canonical {
        Some(number) => PREFIXED_PROPOSAL_RE
            .replace_all(&normalized, number.prefixed().as_str())
            .into_owned(),
        None => normalized,
    }
}

/// Normalizes one text note and, with a canonical number, forces it in.
///
/// Existing prefixed tokens are replaced by the canonical number. When the
/// canonical token is still missing it is appended after a single space, or
/// becomes the whole note when the note is blank.
pub fn canonicalize_text(text: &str, canonical: Option<&ProposalNumber>) -> String {
    let updated = normalize_item(text, canonical);
    let Some(number) = canonical else {
        return updated;
    };
    if contains_prefixed(&updated, number) {
        return updated;
    }
    if updated.trim().is_empty() {
        return number.prefixed();
    }
    let separator = if updated.ends_with([' ', '\n', '\t']) {
        ""
    } else {
        " "
    };
    format!("{updated}{separator}{}", number.prefixed())
}

/// Returns the rewritten note value, or `None` when the note stays as it is.
///
/// - text: normalized via [`canonicalize_text`].
/// - list: every text element normalized; the canonical token is appended as
///   a new element when no element carries it.
/// - null or absent: becomes the prefixed canonical token, if there is one.
/// - any other JSON kind: untouched.
pub fn rewrite_note(note: Option<&Value>, canonical: Option<&ProposalNumber>) -> Option<Value> {
    let rewritten = match note {
        Some(Value::String(text)) => Value::String(canonicalize_text(text, canonical)),
        Some(Value::Array(items)) => Value::Array(rewrite_list(items, canonical)),
        None | Some(Value::Null) => Value::String(canonical?.prefixed()),
        Some(_) => return None,
    };
    if note == Some(&rewritten) {
        None
    } else {
        Some(rewritten)
    }
}

fn rewrite_list(items: &[Value], canonical: Option<&ProposalNumber>) -> Vec<Value> {
    let mut found_canonical = false;
    let mut rewritten: Vec<Value> = items
        .iter()
        .map(|item| match item {
            Value::String(text) => {
                let updated = normalize_item(text, canonical);
                if canonical.is_some_and(|number| contains_prefixed(&updated, number)) {
                    found_canonical = true;
                }
                Value::String(updated)
            }
            other => other.clone(),
        })
        .collect();

    if let Some(number) = canonical.filter(|_| !found_canonical) {
        rewritten.push(Value::String(number.prefixed()));
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::{canonicalize_text, extract_numbers, first_number, normalize_prefixes, rewrite_note};
    use crate::model::proposal::ProposalNumber;
    use serde_json::json;

    fn number(value: &str) -> ProposalNumber {
        ProposalNumber::parse(value).expect("fixture token")
    }

    #[test]
    fn normalize_rewrites_loose_prefix_without_touching_other_text() {
        assert_eq!(normalize_prefixes("proposal: 1234-56-7890"), "Proposal 1234-56-7890");
        assert_eq!(normalize_prefixes("PROPOSAL#1234-56-7890 ok"), "Proposal 1234-56-7890 ok");
        assert_eq!(
            normalize_prefixes("crew note 1234-56-7890, call first"),
            "crew note Proposal 1234-56-7890, call first"
        );
        assert_eq!(normalize_prefixes("ref 9999-88-7777"), "Proposal 9999-88-7777");
    }

    #[test]
    fn normalize_is_stable_on_normalized_text() {
        let text = "Proposal 1234-56-7890 and Proposal 1111-22-3333";
        assert_eq!(normalize_prefixes(text), text);
    }

    #[test]
    fn normalize_ignores_longer_digit_runs() {
        let text = "order 12345-67-89012";
        assert_eq!(normalize_prefixes(text), text);
        assert!(extract_numbers(Some(&json!(text))).is_empty());
    }

    #[test]
    fn extraction_covers_text_and_list_notes() {
        assert_eq!(
            first_number(Some(&json!("x 1111-22-3333 y 4444-55-6666"))),
            Some(number("1111-22-3333"))
        );
        assert_eq!(
            extract_numbers(Some(&json!(["a", 5, "Proposal 4444-55-6666"]))),
            vec![number("4444-55-6666")]
        );
        assert!(extract_numbers(Some(&json!(null))).is_empty());
        assert!(extract_numbers(None).is_empty());
    }

    #[test]
    fn canonical_replaces_stale_number_in_text() {
        let canonical = number("2222-22-2222");
        assert_eq!(
            canonicalize_text("see proposal 1111-11-1111 here", Some(&canonical)),
            "see Proposal 2222-22-2222 here"
        );
    }

    #[test]
    fn canonical_is_appended_with_single_separator() {
        let canonical = number("1234-56-7890");
        assert_eq!(
            canonicalize_text("pole swap", Some(&canonical)),
            "pole swap Proposal 1234-56-7890"
        );
        assert_eq!(
            canonicalize_text("pole swap ", Some(&canonical)),
            "pole swap Proposal 1234-56-7890"
        );
        assert_eq!(canonicalize_text("", Some(&canonical)), "Proposal 1234-56-7890");
        assert_eq!(canonicalize_text("   ", Some(&canonical)), "Proposal 1234-56-7890");
    }

    #[test]
    fn list_note_is_normalized_without_duplicate_element() {
        let canonical = number("9999-88-7777");
        let rewritten = rewrite_note(
            Some(&json!(["see file", "ref 9999-88-7777"])),
            Some(&canonical),
        );
        assert_eq!(rewritten, Some(json!(["see file", "Proposal 9999-88-7777"])));
    }

    #[test]
    fn list_note_gets_canonical_element_when_missing() {
        let canonical = number("1234-56-7890");
        assert_eq!(
            rewrite_note(Some(&json!(["see file", 3])), Some(&canonical)),
            Some(json!(["see file", 3, "Proposal 1234-56-7890"]))
        );
        assert_eq!(
            rewrite_note(Some(&json!([])), Some(&canonical)),
            Some(json!(["Proposal 1234-56-7890"]))
        );
    }

    #[test]
    fn null_and_absent_notes_only_change_with_canonical() {
        let canonical = number("1234-56-7890");
        assert_eq!(rewrite_note(None, None), None);
        assert_eq!(rewrite_note(Some(&json!(null)), None), None);
        assert_eq!(
            rewrite_note(Some(&json!(null)), Some(&canonical)),
            Some(json!("Proposal 1234-56-7890"))
        );
        assert_eq!(
            rewrite_note(None, Some(&canonical)),
            Some(json!("Proposal 1234-56-7890"))
        );
    }

    #[test]
    fn other_kinds_and_unchanged_notes_report_no_rewrite() {
        let canonical = number("1234-56-7890");
        assert_eq!(rewrite_note(Some(&json!({"a": 1})), Some(&canonical)), None);
        assert_eq!(rewrite_note(Some(&json!(42)), Some(&canonical)), None);
        assert_eq!(
            rewrite_note(Some(&json!("Proposal 1234-56-7890")), Some(&canonical)),
            None
        );
    }
}
