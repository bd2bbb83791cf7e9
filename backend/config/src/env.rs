//! `${VAR}` substitution in config values.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are recognised. `$${VAR}` is an
//! escape and yields a literal `${VAR}`. A string that is exactly one reference
//! to a numeric value becomes a number, so `admin_id: ${ADMIN_ID}` works.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

/// `$${NAME}` (escape, group 1) or `${NAME}` (reference, group 2).
static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$\{([A-Z_][A-Z0-9_]*)\}|\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

static WHOLE_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$\{([A-Z_][A-Z0-9_]*)\}$").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute references throughout a value tree using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute references using the given variables.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute(value, env, "")?)
}

fn substitute(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => substitute_string(s, env, path),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| substitute(item, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                let child = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                out.insert(key.clone(), substitute(item, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn lookup(name: &str, env: &HashMap<String, String>, path: &str) -> Result<String, MissingEnvVarError> {
    env.get(name)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| MissingEnvVarError { var_name: name.to_string(), config_path: path.to_string() })
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<Value, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(Value::String(s.to_string()));
    }

    if let Some(caps) = WHOLE_REFERENCE.captures(s) {
        let resolved = lookup(&caps[1], env, path)?;
        if let Ok(number) = resolved.parse::<i64>() {
            return Ok(Value::from(number));
        }
        return Ok(Value::String(resolved));
    }

    let mut missing = None;
    let replaced = REFERENCE.replace_all(s, |caps: &Captures| {
        if let Some(escaped) = caps.get(1) {
            return format!("${{{}}}", escaped.as_str());
        }
        match lookup(&caps[2], env, path) {
            Ok(value) => value,
            Err(e) => {
                missing.get_or_insert(e);
                String::new()
            }
        }
    });

    match missing {
        Some(e) => Err(e),
        None => Ok(Value::String(replaced.into_owned())),
    }
}

/// Every variable name referenced in a value tree, sorted and deduplicated.
pub fn collect_referenced_vars(value: &Value) -> Vec<String> {
    fn walk(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => {
                out.extend(REFERENCE.captures_iter(s).filter_map(|c| c.get(2)).map(|m| m.as_str().to_string()))
            }
            Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            Value::Object(map) => map.values().for_each(|v| walk(v, out)),
            _ => {}
        }
    }

    let mut vars = Vec::new();
    walk(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}
