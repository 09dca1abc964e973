//! Permit record collection and field accessors.
//!
//! # Responsibility
//! - Detect whether a document is a bare record list or `{"permits": [...]}`.
//! - Read identifiers and notes through their alias lists.
//! - Derive the base id used to group sibling permits.
//!
//! # Invariants
//! - Alias lookup uses a fixed priority order; the first present field wins
//!   for reads and the same field receives writes.
//! - Non-object entries in the record list are kept in place and ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Key wrapping the record list in the object-shaped document.
pub const PERMITS_KEY: &str = "permits";
/// Identifier field aliases, in read priority order.
pub const PERMIT_ID_FIELDS: &[&str] = &["permit_id", "permitId"];
/// Note field aliases, in read/write priority order.
pub const NOTE_FIELDS: &[&str] = &["notes", "note", "Notes", "Note"];
/// Field written when a record carries none of `NOTE_FIELDS`.
pub const DEFAULT_NOTE_FIELD: &str = "notes";

static TRAILING_SEQUENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_\d+$").expect("valid trailing sequence regex"));

/// Accepted top-level layouts of a permits document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionShape {
    /// `[ {...}, {...} ]`
    BareList,
    /// `{ "permits": [ {...} ], ... }`
    Wrapped,
}

impl CollectionShape {
    /// Returns the shape of `document`, or `None` when neither layout matches.
    pub fn detect(document: &Value) -> Option<Self> {
        match document {
            Value::Array(_) => Some(Self::BareList),
            Value::Object(map) if matches!(map.get(PERMITS_KEY), Some(Value::Array(_))) => {
                Some(Self::Wrapped)
            }
            _ => None,
        }
    }
}

/// A parsed permits document plus the location of its record list.
#[derive(Debug, Clone, PartialEq)]
pub struct PermitCollection {
    document: Value,
    shape: CollectionShape,
}

impl PermitCollection {
    /// Wraps a parsed document. Returns `None` for unsupported layouts.
    pub fn from_document(document: Value) -> Option<Self> {
        let shape = CollectionShape::detect(&document)?;
        Some(Self { document, shape })
    }

    pub fn shape(&self) -> CollectionShape {
        self.shape
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_document(self) -> Value {
        self.document
    }

    /// Returns every entry of the record list, objects or not, in file order.
    pub fn entries(&self) -> &[Value] {
        let list = match self.shape {
            CollectionShape::BareList => self.document.as_array(),
            CollectionShape::Wrapped => self
                .document
                .get(PERMITS_KEY)
                .and_then(Value::as_array),
        };
        list.map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mutable access to the record list. Length and order must not change.
    pub fn entries_mut(&mut self) -> &mut [Value] {
        let list = match self.shape {
            CollectionShape::BareList => self.document.as_array_mut(),
            CollectionShape::Wrapped => self
                .document
                .get_mut(PERMITS_KEY)
                .and_then(Value::as_array_mut),
        };
        match list {
            Some(list) => list.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Iterates object records with their position in the record list.
    pub fn records(&self) -> impl Iterator<Item = (usize, &Map<String, Value>)> {
        self.entries()
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_object().map(|record| (index, record)))
    }

    /// Returns the object record at `index`, if that entry is an object.
    pub fn record_mut(&mut self, index: usize) -> Option<&mut Map<String, Value>> {
        self.entries_mut()
            .get_mut(index)
            .and_then(Value::as_object_mut)
    }
}

/// Returns the permit identifier from the first string-valued alias.
pub fn permit_id(record: &Map<String, Value>) -> Option<&str> {
    PERMIT_ID_FIELDS
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str))
}

/// Strips one trailing `_<digits>` segment: `BTX-North_Seg1_001` -> `BTX-North_Seg1`.
pub fn base_id(permit_id: &str) -> &str {
    match TRAILING_SEQUENCE_RE.find(permit_id) {
        Some(found) => &permit_id[..found.start()],
        None => permit_id,
    }
}

/// Returns the note field this record reads from and writes to.
pub fn note_field_name<'a>(record: &Map<String, Value>, preferred: &'a str) -> &'a str {
    NOTE_FIELDS
        .iter()
        .copied()
        .find(|field| record.contains_key(*field))
        .unwrap_or(preferred)
}

/// Returns the note value, `None` when the resolved field is absent.
pub fn note_value<'r>(record: &'r Map<String, Value>, preferred: &str) -> Option<&'r Value> {
    record.get(note_field_name(record, preferred))
}

/// Writes the note value into the resolved note field.
pub fn set_note_value(record: &mut Map<String, Value>, value: Value, preferred: &str) {
    let field = note_field_name(record, preferred).to_string();
    record.insert(field, value);
}

#[cfg(test)]
mod tests {
    use super::{
        base_id, note_field_name, note_value, permit_id, set_note_value, CollectionShape,
        PermitCollection,
    };
    use serde_json::{json, Value};

    fn object(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().expect("fixture should be an object")
    }

    #[test]
    fn base_id_strips_only_trailing_numeric_segment() {
        assert_eq!(base_id("BTX-Wild-North-PT1_Seg1_001"), "BTX-Wild-North-PT1_Seg1");
        assert_eq!(base_id("A_12"), "A");
        assert_eq!(base_id("A_Seg1"), "A_Seg1");
        assert_eq!(base_id("A_001_x"), "A_001_x");
        assert_eq!(base_id("plain"), "plain");
    }

    #[test]
    fn shape_detection_accepts_list_and_wrapped_object_only() {
        assert_eq!(CollectionShape::detect(&json!([])), Some(CollectionShape::BareList));
        assert_eq!(
            CollectionShape::detect(&json!({"permits": [], "meta": 1})),
            Some(CollectionShape::Wrapped)
        );
        assert_eq!(CollectionShape::detect(&json!({"permits": {}})), None);
        assert_eq!(CollectionShape::detect(&json!({"items": []})), None);
        assert_eq!(CollectionShape::detect(&json!("text")), None);
    }

    #[test]
    fn records_skip_non_objects_but_keep_positions() {
        let collection =
            PermitCollection::from_document(json!({"permits": [1, {"permit_id": "A_1"}]}))
                .expect("wrapped shape");
        let records: Vec<_> = collection.records().map(|(index, _)| index).collect();
        assert_eq!(records, vec![1]);
        assert_eq!(collection.entries().len(), 2);
    }

    #[test]
    fn permit_id_prefers_snake_case_and_requires_string() {
        assert_eq!(permit_id(&object(json!({"permit_id": "A", "permitId": "B"}))), Some("A"));
        assert_eq!(permit_id(&object(json!({"permit_id": 7, "permitId": "B"}))), Some("B"));
        assert_eq!(permit_id(&object(json!({"id": "C"}))), None);
    }

    #[test]
    fn note_alias_priority_is_fixed_and_writes_follow_reads() {
        let mut record = object(json!({"Note": "upper", "note": "lower"}));
        assert_eq!(note_field_name(&record, "notes"), "note");
        assert_eq!(note_value(&record, "notes"), Some(&json!("lower")));

        set_note_value(&mut record, json!("changed"), "notes");
        assert_eq!(record.get("note"), Some(&json!("changed")));
        assert_eq!(record.get("Note"), Some(&json!("upper")));
        assert!(!record.contains_key("notes"));
    }

    #[test]
    fn missing_note_field_uses_preferred_name() {
        let mut record = object(json!({"permit_id": "A_1"}));
        assert_eq!(note_value(&record, "remarks"), None);
        set_note_value(&mut record, json!("Proposal 1234-56-7890"), "remarks");
        assert_eq!(record.get("remarks"), Some(&json!("Proposal 1234-56-7890")));
    }
}
