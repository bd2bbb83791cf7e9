//! `jtelebot check-config`: load the config and print the validation report.

use std::path::Path;

use anyhow::Result;

use jtelebot_config::{apply_all_defaults, collect_referenced_vars, load_config, read_config_value, validate};

use crate::output::{note_error, note_success, note_warn};

/// Returns `true` when the config has no errors.
pub async fn run(path: &Path) -> Result<bool> {
    println!("Checking {}", path.display());

    let raw = read_config_value(path).await?;
    for var in collect_referenced_vars(&raw) {
        match std::env::var(&var) {
            Ok(value) if !value.is_empty() => note_success(&format!("{var} is set")),
            _ => note_error(&format!("{var} is referenced but not set")),
        }
    }

    let config = match load_config(path).await {
        Ok(config) => apply_all_defaults(config),
        Err(e) => {
            note_error(&format!("{e:#}"));
            return Ok(false);
        }
    };

    let report = validate(&config);
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }

    if report.is_valid() {
        note_success("Config is valid");
    }
    Ok(report.is_valid())
}
