//! Shape discovery: groups records by their field-set and infers which
//! fields could serve as a matching key.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, Warning, WarningKind};
use crate::record::{signature_of, strict_records, usable_key, Record};

/// A group of records sharing the exact same set of field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub signature: String,
    pub fields: Vec<String>,
    pub count: usize,
    /// Fields holding a non-blank string in every member record, sorted.
    pub key_candidates: Vec<String>,
}

impl Shape {
    /// The single candidate, when there is no ambiguity.
    pub fn unique_candidate(&self) -> Option<&str> {
        match self.key_candidates.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShapeAnalysis {
    /// Ordered by signature.
    pub shapes: Vec<Shape>,
    pub warnings: Vec<Warning>,
}

impl ShapeAnalysis {
    pub fn get(&self, signature: &str) -> Option<&Shape> {
        self.shapes
            .binary_search_by(|s| s.signature.as_str().cmp(signature))
            .ok()
            .map(|i| &self.shapes[i])
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.get(signature).is_some()
    }

    pub fn signatures(&self) -> impl Iterator<Item = &str> {
        self.shapes.iter().map(|s| s.signature.as_str())
    }
}

/// Partitions `records` (a JSON array of objects) into shapes.
///
/// Any element that is not an object fails the whole call with
/// `InvalidInputShape` before a single shape is computed.
pub fn analyze_shapes(records: &Value) -> Result<ShapeAnalysis> {
    let records = strict_records(records, None)?;
    Ok(analyze_records(&records))
}

pub(crate) fn analyze_records(records: &[&Record]) -> ShapeAnalysis {
    let mut groups: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for record in records.iter().copied() {
        groups.entry(signature_of(record)).or_default().push(record);
    }

    let mut warnings = Vec::new();
    let shapes: Vec<Shape> = groups
        .into_iter()
        .map(|(signature, members)| {
            let mut fields: Vec<String> = members[0].keys().cloned().collect();
            fields.sort();
            let key_candidates: Vec<String> = fields
                .iter()
                .filter(|field| members.iter().all(|r| usable_key(r, field).is_some()))
                .cloned()
                .collect();
            if key_candidates.is_empty() {
                warnings.push(
                    Warning::new(
                        WarningKind::NoKeyCandidates,
                        format!(
                            "shape \"{signature}\" has no field with a non-empty string in every record"
                        ),
                    )
                    .signature(&signature),
                );
            }
            Shape {
                count: members.len(),
                signature,
                fields,
                key_candidates,
            }
        })
        .collect();

    debug!(
        records = records.len(),
        shapes = shapes.len(),
        "analyzed record shapes"
    );
    ShapeAnalysis { shapes, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiffError;
    use serde_json::json;

    #[test]
    fn empty_input_has_no_shapes() {
        let analysis = analyze_shapes(&json!([])).unwrap();
        assert!(analysis.shapes.is_empty());
        assert!(analysis.warnings.is_empty());
    }

    #[test]
    fn groups_by_exact_field_set_in_signature_order() {
        let analysis = analyze_shapes(&json!([
            {"id": "1", "name": "a"},
            {"sku": "x"},
            {"name": "b", "id": "2"},
            {"id": "3", "name": "c", "extra": true},
        ]))
        .unwrap();
        let sigs: Vec<&str> = analysis.signatures().collect();
        assert_eq!(sigs, vec!["extra,id,name", "id,name", "sku"]);
        assert_eq!(analysis.get("id,name").unwrap().count, 2);
        assert_eq!(analysis.get("extra,id,name").unwrap().count, 1);
        assert!(!analysis.contains("id"));
    }

    #[test]
    fn candidates_require_non_blank_strings_everywhere() {
        let analysis = analyze_shapes(&json!([
            {"id": "1", "code": "a", "n": 1, "label": "x"},
            {"id": "2", "code": " ", "n": 2, "label": "y"},
        ]))
        .unwrap();
        let shape = &analysis.shapes[0];
        assert_eq!(shape.key_candidates, vec!["id", "label"]);
        assert_eq!(shape.unique_candidate(), None);
    }

    #[test]
    fn unique_candidate_when_single() {
        let analysis = analyze_shapes(&json!([{"id": "1", "n": 1}])).unwrap();
        assert_eq!(analysis.shapes[0].unique_candidate(), Some("id"));
    }

    #[test]
    fn shape_without_candidates_is_warned() {
        let analysis = analyze_shapes(&json!([{"n": 1}, {"n": 2}])).unwrap();
        assert!(analysis.shapes[0].key_candidates.is_empty());
        assert_eq!(analysis.warnings.len(), 1);
        assert_eq!(analysis.warnings[0].kind, WarningKind::NoKeyCandidates);
        assert_eq!(analysis.warnings[0].signature.as_deref(), Some("n"));
    }

    #[test]
    fn non_object_element_is_fatal() {
        let err = analyze_shapes(&json!([{"id": "1"}, "oops", null])).unwrap_err();
        assert_eq!(
            err,
            DiffError::InvalidInputShape { side: None, index: Some(1), found: "a string" }
        );
    }

    #[test]
    fn non_array_is_fatal() {
        assert!(analyze_shapes(&json!({"id": "1"})).is_err());
        assert!(analyze_shapes(&json!(null)).is_err());
    }
}
