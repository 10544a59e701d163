use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::diff::{diff, ComparisonResult, DiffOptions};
use crate::error::{Result, Side};
use crate::keys::{resolve_keys, validate_key_selection, KeyMapping};
use crate::record::{lenient_records, strict_records, Record};
use crate::shape::{analyze_records, ShapeAnalysis};

/// Everything produced by one run of [`compare`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub before_shapes: ShapeAnalysis,
    pub after_shapes: ShapeAnalysis,
    /// The mapping actually used, auto-selections included.
    pub key_mapping: KeyMapping,
    pub result: ComparisonResult,
}

/// Shape analysis of one side, honouring `strict_records`. Skipped elements
/// are not warned about here; [`diff`] reports them.
pub fn analyze_side(records: &Value, side: Side, options: &DiffOptions) -> Result<ShapeAnalysis> {
    let objects: Vec<&Record> = if options.strict_records {
        strict_records(records, Some(side))?
    } else {
        let mut ignored = Vec::new();
        lenient_records(records, side, &mut ignored)?
            .into_iter()
            .map(|(_, record)| record)
            .collect()
    };
    Ok(analyze_records(&objects))
}

/// Analyze, resolve keys, validate and diff in one call.
///
/// Fails with `MissingKeySelection` if a shape found on both sides has no
/// key field after auto-selection.
pub fn compare(
    before: &Value,
    after: &Value,
    mapping: &KeyMapping,
    options: &DiffOptions,
) -> Result<Comparison> {
    let before_shapes = analyze_side(before, Side::Before, options)?;
    let after_shapes = analyze_side(after, Side::After, options)?;

    let key_mapping = if options.auto_select_keys {
        resolve_keys(&before_shapes, &after_shapes, mapping)
    } else {
        mapping.clone()
    };
    validate_key_selection(&before_shapes, &after_shapes, &key_mapping)?;

    let mut result = diff(before, after, &key_mapping, options)?;
    // Only shapes that still lack a key are worth surfacing.
    let shape_warnings = before_shapes
        .warnings
        .iter()
        .chain(&after_shapes.warnings)
        .filter(|w| {
            w.signature
                .as_deref()
                .map_or(true, |sig| key_mapping.get(sig).is_none())
        })
        .cloned();
    let mut warnings: Vec<_> = Vec::new();
    for warning in shape_warnings {
        if !warnings.contains(&warning) {
            warnings.push(warning);
        }
    }
    warnings.append(&mut result.warnings);
    result.warnings = warnings;

    debug!(
        before_shapes = before_shapes.shapes.len(),
        after_shapes = after_shapes.shapes.len(),
        keys = key_mapping.len(),
        "comparison complete"
    );
    Ok(Comparison {
        before_shapes,
        after_shapes,
        key_mapping,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DiffError, WarningKind};
    use serde_json::json;

    #[test]
    fn auto_selects_and_diffs() {
        let cmp = compare(
            &json!([{"id": "1", "n": 1}]),
            &json!([{"id": "1", "n": 2}]),
            &KeyMapping::new(),
            &DiffOptions::default(),
        )
        .unwrap();
        assert_eq!(cmp.key_mapping.get("id,n"), Some("id"));
        assert_eq!(cmp.result.modified_entries.len(), 1);
    }

    #[test]
    fn shared_shape_without_key_is_fatal() {
        let err = compare(
            &json!([{"a": "x", "b": "y"}]),
            &json!([{"a": "x", "b": "z"}]),
            &KeyMapping::new(),
            &DiffOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, DiffError::MissingKeySelection { signature: "a,b".into() });
    }

    #[test]
    fn auto_selection_can_be_disabled() {
        let options = DiffOptions { auto_select_keys: false, ..DiffOptions::default() };
        let err = compare(
            &json!([{"id": "1"}]),
            &json!([{"id": "1"}]),
            &KeyMapping::new(),
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, DiffError::MissingKeySelection { .. }));
    }

    #[test]
    fn unresolved_one_sided_shapes_are_warned_once() {
        let cmp = compare(
            &json!([{"n": 1}]),
            &json!([{"m": 1}, {"m": 2}]),
            &KeyMapping::new(),
            &DiffOptions::default(),
        )
        .unwrap();
        let kinds: Vec<_> = cmp.result.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::NoKeyCandidates, WarningKind::NoKeyCandidates]);
        assert_eq!(cmp.result.deleted_entries.len(), 1);
        assert_eq!(cmp.result.new_entries.len(), 2);
    }

    #[test]
    fn lenient_analysis_skips_non_objects() {
        let cmp = compare(
            &json!([{"id": "1"}, null]),
            &json!([{"id": "1"}]),
            &KeyMapping::new(),
            &DiffOptions::default(),
        )
        .unwrap();
        assert_eq!(cmp.before_shapes.shapes.len(), 1);
        assert_eq!(cmp.result.warnings.len(), 1);
        assert_eq!(cmp.result.warnings[0].kind, WarningKind::InvalidRecord);
    }
}
