use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use recdiff::cli::OutputFormat;
use recdiff::logging;
use recdiff::{
    analyze_side, build_options, compare, load_collection, missing_key_selections, report,
    resolve_keys, Args, DiffError, KeyMapping, Options, Side,
};

fn save_keys(opts: &Options, mapping: &KeyMapping) -> Result<()> {
    if let Some(path) = &opts.save_keys {
        let text = serde_json::to_string_pretty(mapping)?;
        fs::write(path, text + "\n")
            .with_context(|| format!("Cannot write key mapping to {}", path.display()))?;
        info!(path = %path.display(), keys = mapping.len(), "saved key mapping");
    }
    Ok(())
}

fn run(args: &Args) -> Result<bool> {
    if let (Ok(a), Ok(b)) = (args.before.canonicalize(), args.after.canonicalize()) {
        if a == b {
            warn!("before and after are the same path");
        }
    }
    let opts = build_options(args)?;

    let before = load_collection(&args.before, &opts.ignore_fields)
        .with_context(|| format!("Invalid before input {}", args.before.display()))?;
    let after = load_collection(&args.after, &opts.ignore_fields)
        .with_context(|| format!("Invalid after input {}", args.after.display()))?;

    if opts.dry_run {
        let before_shapes = analyze_side(&before, Side::Before, &opts.diff)?;
        let after_shapes = analyze_side(&after, Side::After, &opts.diff)?;
        let mapping = if opts.diff.auto_select_keys {
            resolve_keys(&before_shapes, &after_shapes, &opts.key_mapping)
        } else {
            opts.key_mapping.clone()
        };
        let missing = missing_key_selections(&before_shapes, &after_shapes, &mapping);
        print!(
            "{}",
            report::render_shapes(&before_shapes, &after_shapes, &mapping, &missing)
        );
        save_keys(&opts, &mapping)?;
        return Ok(false);
    }

    let comparison = match compare(&before, &after, &opts.key_mapping, &opts.diff) {
        Ok(comparison) => comparison,
        Err(err @ DiffError::MissingKeySelection { .. }) => {
            return Err(err).context(
                "Select key fields with --key SIGNATURE=FIELD or --keys FILE (see --dry-run)",
            )
        }
        Err(err) => return Err(err.into()),
    };
    save_keys(&opts, &comparison.key_mapping)?;

    for warning in &comparison.result.warnings {
        warn!(kind = ?warning.kind, "{warning}");
    }

    match opts.format {
        OutputFormat::Text => print!("{}", report::render_text(&comparison.result)),
        OutputFormat::Json => println!("{}", report::render_json(&comparison)?),
    }

    let counters = report::Counters::from_result(&comparison.result);
    info!(
        new = counters.new_entries,
        modified = counters.modified,
        deleted = counters.deleted,
        unchanged = counters.unchanged,
        "comparison finished"
    );

    Ok(opts.exit_code && comparison.result.has_differences())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose, args.log_format);

    match run(&args) {
        Ok(true) => ExitCode::from(1),
        Ok(false) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}
