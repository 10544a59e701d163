use std::fmt::Write as _;

use serde_json::Value;
use similar::{ChangeTag, TextDiff};

use crate::compare::Comparison;
use crate::diff::{ComparisonResult, Entry, ModifiedEntry};
use crate::keys::KeyMapping;
use crate::record::canonical_json;
use crate::shape::ShapeAnalysis;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub unchanged: usize,
    pub new_entries: usize,
    pub modified: usize,
    pub deleted: usize,
    pub warnings: usize,
}

impl Counters {
    pub fn from_result(result: &ComparisonResult) -> Self {
        Self {
            unchanged: result.unchanged_count,
            new_entries: result.new_entries.len(),
            modified: result.modified_entries.len(),
            deleted: result.deleted_entries.len(),
            warnings: result.warnings.len(),
        }
    }
}

fn describe_entry(entry: &Entry) -> String {
    match (&entry.key_field, &entry.key_value) {
        (Some(field), Some(value)) => format!("[{}] {field}={value}", entry.signature),
        _ => format!("[{}] (unkeyed)", entry.signature),
    }
}

fn describe_modified(entry: &ModifiedEntry) -> String {
    match &entry.before_signature {
        Some(before) => format!(
            "[{before} -> {}] {}={}",
            entry.signature, entry.key_field, entry.key_value
        ),
        None => format!("[{}] {}={}", entry.signature, entry.key_field, entry.key_value),
    }
}

/// Line diff of two multi-line strings, `- `/`+ ` prefixed, context lines
/// indented.
pub fn annotate_text_diff(before: &str, after: &str, indent: &str) -> String {
    let diff = TextDiff::from_lines(before, after);
    let mut output = String::new();
    for change in diff.iter_all_changes() {
        let marker = match change.tag() {
            ChangeTag::Equal => "  ",
            ChangeTag::Delete => "- ",
            ChangeTag::Insert => "+ ",
        };
        let line = change.value().strip_suffix('\n').unwrap_or(change.value());
        let _ = writeln!(output, "{indent}{marker}{line}");
    }
    output
}

fn render_change(out: &mut String, field: &str, before: &Value, after: &Value) {
    match (before, after) {
        (Value::String(a), Value::String(b)) if a.contains('\n') || b.contains('\n') => {
            let _ = writeln!(out, "    ~ {field}:");
            out.push_str(&annotate_text_diff(a, b, "        "));
        }
        _ => {
            let _ = writeln!(
                out,
                "    ~ {field}: {} -> {}",
                canonical_json(before),
                canonical_json(after)
            );
        }
    }
}

pub fn render_text(result: &ComparisonResult) -> String {
    let mut out = String::new();

    if !result.new_entries.is_empty() {
        let _ = writeln!(out, "== New ({}) ==", result.new_entries.len());
        for entry in &result.new_entries {
            let _ = writeln!(out, "+ {}", describe_entry(entry));
            let _ = writeln!(out, "    {}", canonical_json(&Value::Object(entry.record.clone())));
        }
    }

    if !result.modified_entries.is_empty() {
        let _ = writeln!(out, "== Modified ({}) ==", result.modified_entries.len());
        for entry in &result.modified_entries {
            let _ = writeln!(out, "~ {}", describe_modified(entry));
            for (field, value) in &entry.changes.added {
                let _ = writeln!(out, "    + {field}: {}", canonical_json(value));
            }
            for (field, value) in &entry.changes.removed {
                let _ = writeln!(out, "    - {field}: {}", canonical_json(value));
            }
            for (field, change) in &entry.changes.changed {
                render_change(&mut out, field, &change.before, &change.after);
            }
        }
    }

    if !result.deleted_entries.is_empty() {
        let _ = writeln!(out, "== Deleted ({}) ==", result.deleted_entries.len());
        for entry in &result.deleted_entries {
            let _ = writeln!(out, "- {}", describe_entry(entry));
            let _ = writeln!(out, "    {}", canonical_json(&Value::Object(entry.record.clone())));
        }
    }

    if !result.warnings.is_empty() {
        let _ = writeln!(out, "== Warnings ({}) ==", result.warnings.len());
        for warning in &result.warnings {
            let _ = writeln!(out, "! {warning}");
        }
    }

    let counters = Counters::from_result(result);
    out.push_str("== Summary ==\n");
    let _ = writeln!(out, "Unchanged (omitted):  {}", counters.unchanged);
    let _ = writeln!(out, "New:                  {}", counters.new_entries);
    let _ = writeln!(out, "Modified:             {}", counters.modified);
    let _ = writeln!(out, "Deleted:              {}", counters.deleted);
    let _ = writeln!(out, "Warnings:             {}", counters.warnings);
    out
}

fn render_inventory(out: &mut String, title: &str, analysis: &ShapeAnalysis, mapping: &KeyMapping) {
    let _ = writeln!(out, "== {title} shapes ({}) ==", analysis.shapes.len());
    for shape in &analysis.shapes {
        let candidates = if shape.key_candidates.is_empty() {
            "none".to_string()
        } else {
            shape.key_candidates.join(", ")
        };
        let selected = mapping.get(&shape.signature).unwrap_or("-");
        let _ = writeln!(
            out,
            "[{}] records={} candidates={candidates} key={selected}",
            shape.signature, shape.count
        );
    }
}

/// Dry-run listing: both inventories plus the shared shapes still lacking a key.
pub fn render_shapes(
    before: &ShapeAnalysis,
    after: &ShapeAnalysis,
    mapping: &KeyMapping,
    missing: &[String],
) -> String {
    let mut out = String::new();
    render_inventory(&mut out, "Before", before, mapping);
    render_inventory(&mut out, "After", after, mapping);
    if !missing.is_empty() {
        let _ = writeln!(out, "== Key selection required ({}) ==", missing.len());
        for signature in missing {
            let _ = writeln!(out, "? [{signature}] (use --key '{signature}=FIELD')");
        }
    }
    out
}

pub fn render_json(comparison: &Comparison) -> serde_json::Result<String> {
    serde_json::to_string_pretty(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff, DiffOptions};
    use crate::shape::analyze_shapes;
    use serde_json::json;

    #[test]
    fn text_report_lists_each_section() {
        let mapping: KeyMapping = [("id,name", "id")].into_iter().collect();
        let result = diff(
            &json!([{"id": "1", "name": "Alice"}, {"id": "3", "name": "Cara"}]),
            &json!([{"id": "1", "name": "Alicia"}, {"id": "2", "name": "Bob"}]),
            &mapping,
            &DiffOptions::default(),
        )
        .unwrap();
        let text = render_text(&result);
        assert!(text.contains("== New (1) ==\n+ [id,name] id=2\n"));
        assert!(text.contains("~ [id,name] id=1\n    ~ name: \"Alice\" -> \"Alicia\"\n"));
        assert!(text.contains("- [id,name] id=3\n"));
        assert!(text.contains("Modified:             1\n"));
        assert!(!text.contains("Warnings ("));
    }

    #[test]
    fn multi_line_strings_get_a_line_diff() {
        let text = annotate_text_diff("a\nb\nc\n", "a\nB\nc\n", "");
        assert_eq!(text, "  a\n- b\n+ B\n  c\n");
    }

    #[test]
    fn counters_follow_result() {
        let result = ComparisonResult {
            unchanged_count: 4,
            ..ComparisonResult::default()
        };
        assert_eq!(
            Counters::from_result(&result),
            Counters { unchanged: 4, ..Counters::default() }
        );
    }

    #[test]
    fn shape_listing_flags_missing_keys() {
        let before = analyze_shapes(&json!([{"a": "x", "b": "y"}])).unwrap();
        let text = render_shapes(&before, &before, &KeyMapping::new(), &["a,b".to_string()]);
        assert!(text.contains("[a,b] records=1 candidates=a, b key=-"));
        assert!(text.contains("? [a,b] (use --key 'a,b=FIELD')"));
    }
}
