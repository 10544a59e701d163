use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::changes::{compute_changes, ChangeSet};
use crate::error::{Result, Side, Warning, WarningKind};
use crate::keys::KeyMapping;
use crate::record::{
    canonical_json, fingerprint, lenient_records, records_equal, signature_of, strict_records,
    usable_key, Record,
};

/// What to do when a key value is found on both sides but under two
/// different shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeChangePolicy {
    /// Report the old record as deleted and the new one as new.
    Replace,
    /// Report a single modification carrying the field-level changes.
    #[default]
    Modify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    pub shape_change: ShapeChangePolicy,
    /// Abort on non-object elements instead of skipping them with a warning.
    pub strict_records: bool,
    /// Only used by [`crate::compare::compare`].
    pub auto_select_keys: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            shape_change: ShapeChangePolicy::Modify,
            strict_records: false,
            auto_select_keys: true,
        }
    }
}

/// A record reported as new or deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub signature: String,
    /// `None` for unkeyed records.
    pub key_field: Option<String>,
    pub key_value: Option<String>,
    pub record: Record,
}

impl Entry {
    fn identity(&self) -> (String, String) {
        let id = match &self.key_value {
            Some(value) => format!("key:{value}"),
            None => format!("record:{}", fingerprint(&self.record)),
        };
        (self.signature.clone(), id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedEntry {
    pub key_value: String,
    pub key_field: String,
    pub signature: String,
    /// Set only when the before record had another shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_signature: Option<String>,
    pub before: Record,
    pub after: Record,
    pub changes: ChangeSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub new_entries: Vec<Entry>,
    pub modified_entries: Vec<ModifiedEntry>,
    pub deleted_entries: Vec<Entry>,
    pub warnings: Vec<Warning>,
    /// Matched pairs that turned out identical.
    pub unchanged_count: usize,
}

impl ComparisonResult {
    pub fn has_differences(&self) -> bool {
        !(self.new_entries.is_empty()
            && self.modified_entries.is_empty()
            && self.deleted_entries.is_empty())
    }
}

#[derive(Debug, Clone, Copy)]
enum KeySlot<'a> {
    Unkeyed,
    Keyed { field: &'a str, value: &'a str },
    /// Key field configured but unusable on this record.
    Excluded,
}

struct Item<'a> {
    record: &'a Record,
    signature: String,
    key: KeySlot<'a>,
}

impl Item<'_> {
    fn to_entry(&self) -> Entry {
        let (key_field, key_value) = match self.key {
            KeySlot::Keyed { field, value } => (Some(field.to_string()), Some(value.to_string())),
            _ => (None, None),
        };
        Entry {
            signature: self.signature.clone(),
            key_field,
            key_value,
            record: self.record.clone(),
        }
    }
}

/// Classifies `before` and `after` into new, modified and deleted records.
///
/// Records are matched by the value of the key field selected for their
/// shape in `mapping`. Records whose shape has no selection are unkeyed:
/// they show up as new (after side) or, when their shape is gone from the
/// after side entirely, as deleted. The caller is expected to have run
/// [`crate::validate_key_selection`] first.
pub fn diff(
    before: &Value,
    after: &Value,
    mapping: &KeyMapping,
    options: &DiffOptions,
) -> Result<ComparisonResult> {
    let mut warnings = Vec::new();
    let before_items = prepare_side(before, Side::Before, mapping, options, &mut warnings)?;
    let after_items = prepare_side(after, Side::After, mapping, options, &mut warnings)?;

    let before_lookup = build_lookup(&before_items, Side::Before, &mut warnings);
    let after_lookup = build_lookup(&after_items, Side::After, &mut warnings);
    let after_signatures: HashSet<&str> =
        after_items.iter().map(|i| i.signature.as_str()).collect();

    let mut new_entries = Vec::new();
    let mut modified_entries = Vec::new();
    let mut deleted_entries = Vec::new();
    let mut replaced: HashSet<usize> = HashSet::new();
    let mut unchanged_count = 0;

    for (pos, item) in after_items.iter().enumerate() {
        let (field, value) = match item.key {
            KeySlot::Excluded => continue,
            KeySlot::Unkeyed => {
                trace!(signature = %item.signature, "unkeyed after record is new");
                new_entries.push(item.to_entry());
                continue;
            }
            KeySlot::Keyed { field, value } => (field, value),
        };
        if after_lookup.get(value) != Some(&pos) {
            continue;
        }
        let Some(&before_pos) = before_lookup.get(value) else {
            trace!(key = value, "key only on after side");
            new_entries.push(item.to_entry());
            continue;
        };

        let prev = &before_items[before_pos];
        let shape_changed = prev.signature != item.signature;
        // A collision between shapes keyed by different fields is never the
        // same entity.
        let same_key_field = matches!(prev.key, KeySlot::Keyed { field: f, .. } if f == field);
        if shape_changed && (options.shape_change == ShapeChangePolicy::Replace || !same_key_field) {
            trace!(
                key = value,
                from = %prev.signature,
                to = %item.signature,
                "shape changed, reporting replacement"
            );
            replaced.insert(before_pos);
            deleted_entries.push(prev.to_entry());
            new_entries.push(item.to_entry());
            continue;
        }
        if !shape_changed && records_equal(prev.record, item.record) {
            unchanged_count += 1;
            continue;
        }

        let changes = compute_changes(prev.record, item.record);
        if changes.is_empty() {
            unchanged_count += 1;
            continue;
        }
        trace!(key = value, fields = changes.len(), "modified");
        modified_entries.push(ModifiedEntry {
            key_value: value.to_string(),
            key_field: field.to_string(),
            signature: item.signature.clone(),
            before_signature: shape_changed.then(|| prev.signature.clone()),
            before: prev.record.clone(),
            after: item.record.clone(),
            changes,
        });
    }

    for (pos, item) in before_items.iter().enumerate() {
        if replaced.contains(&pos) {
            continue;
        }
        match item.key {
            KeySlot::Excluded => {}
            KeySlot::Unkeyed => {
                if !after_signatures.contains(item.signature.as_str()) {
                    trace!(signature = %item.signature, "unkeyed shape gone from after side");
                    deleted_entries.push(item.to_entry());
                }
            }
            KeySlot::Keyed { value, .. } => {
                if before_lookup.get(value) == Some(&pos) && !after_lookup.contains_key(value) {
                    trace!(key = value, "key only on before side");
                    deleted_entries.push(item.to_entry());
                }
            }
        }
    }

    let result = ComparisonResult {
        new_entries: dedup_keep_last(new_entries),
        modified_entries,
        deleted_entries: dedup_keep_last(deleted_entries),
        warnings,
        unchanged_count,
    };
    debug!(
        new = result.new_entries.len(),
        modified = result.modified_entries.len(),
        deleted = result.deleted_entries.len(),
        unchanged = result.unchanged_count,
        warnings = result.warnings.len(),
        "diff complete"
    );
    Ok(result)
}

fn prepare_side<'a>(
    records: &'a Value,
    side: Side,
    mapping: &'a KeyMapping,
    options: &DiffOptions,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<Item<'a>>> {
    let records: Vec<(usize, &Record)> = if options.strict_records {
        strict_records(records, Some(side))?
            .into_iter()
            .enumerate()
            .collect()
    } else {
        lenient_records(records, side, warnings)?
    };

    let mut items = Vec::with_capacity(records.len());
    for (index, record) in records {
        let signature = signature_of(record);
        let key = match mapping.get(&signature) {
            None => KeySlot::Unkeyed,
            Some(field) => match usable_key(record, field) {
                Some(value) => KeySlot::Keyed { field, value },
                None => {
                    let found = record.get(field);
                    let shown = found
                        .map(canonical_json)
                        .unwrap_or_else(|| "nothing (field missing)".to_string());
                    let mut warning = Warning::new(
                        WarningKind::InvalidKeyValue,
                        format!(
                            "{side} element {index} (shape \"{signature}\"): key field \"{field}\" holds {shown}, expected a non-empty string; record excluded"
                        ),
                    )
                    .at(side, index)
                    .signature(&signature)
                    .field(field);
                    if let Some(found) = found {
                        warning = warning.value(found);
                    }
                    warnings.push(warning);
                    KeySlot::Excluded
                }
            },
        };
        items.push(Item {
            record,
            signature,
            key,
        });
    }
    Ok(items)
}

/// Key value to position of the last record carrying it.
fn build_lookup<'a>(
    items: &[Item<'a>],
    side: Side,
    warnings: &mut Vec<Warning>,
) -> HashMap<&'a str, usize> {
    let mut lookup = HashMap::new();
    for (pos, item) in items.iter().enumerate() {
        if let KeySlot::Keyed { field, value } = item.key {
            if lookup.insert(value, pos).is_some() {
                warnings.push(
                    Warning::new(
                        WarningKind::DuplicateKey,
                        format!(
                            "duplicate key \"{value}\" in {side} collection (field \"{field}\", shape \"{}\"); the later record is used",
                            item.signature
                        ),
                    )
                    .signature(&item.signature)
                    .field(field)
                    .key_value(value),
                );
            }
        }
    }
    lookup
}

fn dedup_keep_last(entries: Vec<Entry>) -> Vec<Entry> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Entry> = entries
        .into_iter()
        .rev()
        .filter(|e| seen.insert(e.identity()))
        .collect();
    kept.reverse();
    kept
}
