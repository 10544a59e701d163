use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use glob::Pattern;

use crate::diff::{DiffOptions, ShapeChangePolicy};
use crate::keys::KeyMapping;
use crate::logging::LogFormat;
use crate::utils::{parse_key_assignment, read_text_best_effort};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Before collection: JSON array file, or directory of JSON array files
    pub before: PathBuf,

    /// After collection: JSON array file, or directory of JSON array files
    pub after: PathBuf,

    /// Key field for a shape, as SIGNATURE=FIELD (repeatable)
    #[arg(short, long = "key", value_name = "SIGNATURE=FIELD")]
    pub keys: Vec<String>,

    /// JSON object mapping shape signatures to key fields
    #[arg(long = "keys", value_name = "FILE")]
    pub keys_file: Option<PathBuf>,

    /// Write the effective key mapping (auto-selections included) to FILE
    #[arg(long, value_name = "FILE")]
    pub save_keys: Option<PathBuf>,

    /// Glob patterns of field names to drop before comparing (can be repeated or comma separated)
    #[arg(short, long, value_delimiter = ',', num_args = 1..)]
    pub ignore_field: Vec<String>,

    /// How to report a key whose record changed shape
    #[arg(long, value_enum, default_value_t = ShapeChange::Modify)]
    pub shape_change: ShapeChange,

    /// Fail on array elements that are not objects instead of skipping them
    #[arg(long)]
    pub strict: bool,

    /// Do not pick key fields automatically for unambiguous shapes
    #[arg(long)]
    pub no_auto_keys: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Only list the shapes, their key candidates and the key mapping; do not diff
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with status 1 when differences are found
    #[arg(long)]
    pub exit_code: bool,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShapeChange {
    /// Old record deleted, new record added
    Replace,
    /// One modification with field-level changes
    Modify,
}

impl From<ShapeChange> for ShapeChangePolicy {
    fn from(value: ShapeChange) -> Self {
        match value {
            ShapeChange::Replace => ShapeChangePolicy::Replace,
            ShapeChange::Modify => ShapeChangePolicy::Modify,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug)]
pub struct Options {
    pub key_mapping: KeyMapping,
    pub ignore_fields: Vec<Pattern>,
    pub diff: DiffOptions,
    pub format: OutputFormat,
    pub dry_run: bool,
    pub exit_code: bool,
    pub save_keys: Option<PathBuf>,
}

pub fn build_options(args: &Args) -> Result<Options> {
    let patterns = args
        .ignore_field
        .iter()
        .map(|s| Pattern::new(s).with_context(|| format!("Invalid glob pattern: {s}")))
        .collect::<Result<Vec<_>>>()?;

    let mut key_mapping = match &args.keys_file {
        Some(path) => {
            let text = read_text_best_effort(path)
                .with_context(|| format!("Cannot read key file {}", path.display()))?;
            serde_json::from_str::<KeyMapping>(&text).with_context(|| {
                format!(
                    "Key file {} must be a JSON object of signature to field",
                    path.display()
                )
            })?
        }
        None => KeyMapping::new(),
    };
    for raw in &args.keys {
        let (signature, field) = parse_key_assignment(raw)?;
        key_mapping.set(signature, field);
    }

    Ok(Options {
        key_mapping,
        ignore_fields: patterns,
        diff: DiffOptions {
            shape_change: args.shape_change.into(),
            strict_records: args.strict,
            auto_select_keys: !args.no_auto_keys,
        },
        format: args.format,
        dry_run: args.dry_run,
        exit_code: args.exit_code,
        save_keys: args.save_keys.clone(),
    })
}
