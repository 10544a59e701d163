use std::fs;
use std::path::Path;

use anyhow::{bail, Result};
use encoding_rs::WINDOWS_1252;
use glob::Pattern;
use serde_json::Value;

/// Reads a text file as UTF-8, falling back to Windows-1252. A leading BOM
/// is dropped.
pub fn read_text_best_effort(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(err) => {
            let (res, _, _) = WINDOWS_1252.decode(err.as_bytes());
            res.into_owned()
        }
    };
    Ok(match content.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => content,
    })
}

/// Splits `SIGNATURE=FIELD` at the last `=`; signatures contain commas,
/// so no other delimiter is safe.
pub fn parse_key_assignment(raw: &str) -> Result<(String, String)> {
    let Some((signature, field)) = raw.rsplit_once('=') else {
        bail!("Invalid key selection \"{raw}\": expected SIGNATURE=FIELD");
    };
    let field = field.trim();
    if field.is_empty() {
        bail!("Invalid key selection \"{raw}\": field is empty");
    }
    if !signature.split(',').any(|f| f == field) {
        bail!("Invalid key selection \"{raw}\": \"{field}\" is not a field of shape \"{signature}\"");
    }
    Ok((signature.to_string(), field.to_string()))
}

/// Removes top-level fields matching any pattern from every object element.
pub fn strip_fields(collection: &mut Value, patterns: &[Pattern]) {
    if patterns.is_empty() {
        return;
    }
    if let Value::Array(items) = collection {
        for item in items.iter_mut() {
            if let Value::Object(record) = item {
                record.retain(|field, _| !patterns.iter().any(|p| p.matches(field)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn key_assignment_splits_on_last_equals() {
        assert_eq!(
            parse_key_assignment("id,name=id").unwrap(),
            ("id,name".to_string(), "id".to_string())
        );
        assert_eq!(
            parse_key_assignment("a=b,c=c").unwrap(),
            ("a=b,c".to_string(), "c".to_string())
        );
    }

    #[test]
    fn key_assignment_rejects_bad_input() {
        assert!(parse_key_assignment("id,name").is_err());
        assert!(parse_key_assignment("id,name=").is_err());
        assert!(parse_key_assignment("id,name=sku").is_err());
    }

    #[test]
    fn strip_fields_matches_globs() {
        let mut value = json!([{"id": "1", "updated_at": 1, "updated_by": "x", "etag": "e"}, 3]);
        let patterns = vec![Pattern::new("updated_*").unwrap(), Pattern::new("etag").unwrap()];
        strip_fields(&mut value, &patterns);
        assert_eq!(value, json!([{"id": "1"}, 3]));
    }

    #[test]
    fn reads_latin1_and_drops_bom() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[\"caf\xe9\"]").unwrap();
        assert_eq!(read_text_best_effort(file.path()).unwrap(), "[\"café\"]");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("\u{feff}[]".as_bytes()).unwrap();
        assert_eq!(read_text_best_effort(file.path()).unwrap(), "[]");
    }
}
