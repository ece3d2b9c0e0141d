// src/config/interpolate.rs

//! `${...}` substitution over the raw TOML document.
//!
//! Scope rules:
//! - `[vars]` values are literal.
//! - `[paths]` values may use `${vars.<name>}`.
//! - Every other string may use `${src}`, `${dist}`, `${style_glob}` and
//!   `${vars.<name>}`.
//!
//! `$$` produces a literal `$`.

use std::collections::BTreeMap;

use toml::{Table, Value};

use crate::errors::{AssetflowError, Result};

/// Names available for substitution.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: BTreeMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Only `vars.<name>` entries.
    pub fn from_vars(vars: &BTreeMap<String, String>) -> Self {
        let mut out = Self::new();
        for (name, value) in vars {
            out.insert(format!("vars.{name}"), value.clone());
        }
        out
    }

    /// Substitute every placeholder in `input`.
    ///
    /// `location` names the config key for error messages.
    pub fn interpolate(&self, input: &str, location: &str) -> Result<String> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(tail) = after.strip_prefix('$') {
                out.push('$');
                rest = tail;
            } else if let Some(body) = after.strip_prefix('{') {
                let end = body.find('}').ok_or_else(|| {
                    AssetflowError::ConfigError(format!(
                        "{location}: unterminated '${{' in \"{input}\""
                    ))
                })?;
                let name = body[..end].trim();
                let value = self.get(name).ok_or_else(|| {
                    AssetflowError::ConfigError(format!(
                        "{location}: unknown placeholder '${{{name}}}'"
                    ))
                })?;
                out.push_str(value);
                rest = &body[end + 1..];
            } else {
                out.push('$');
                rest = after;
            }
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// Resolve all placeholders in a parsed config document, in place.
pub fn interpolate_document(doc: &mut Table) -> Result<()> {
    let vars: BTreeMap<String, String> = match doc.get("vars") {
        Some(value) => value.clone().try_into()?,
        None => BTreeMap::new(),
    };

    let mut scope = Variables::from_vars(&vars);

    if let Some(paths) = doc.get_mut("paths") {
        interpolate_value(paths, &scope, "paths")?;
    }

    // Read back the (now resolved) paths, falling back to the defaults.
    let paths: crate::config::model::PathsSection = match doc.get("paths") {
        Some(value) => value.clone().try_into()?,
        None => crate::config::model::PathsSection::default(),
    };
    scope.insert("src", paths.src);
    scope.insert("dist", paths.dist);
    scope.insert("style_glob", paths.style_glob);

    for (key, value) in doc.iter_mut() {
        if key == "vars" || key == "paths" {
            continue;
        }
        interpolate_value(value, &scope, key)?;
    }

    Ok(())
}

fn interpolate_value(value: &mut Value, scope: &Variables, location: &str) -> Result<()> {
    match value {
        Value::String(s) => {
            if s.contains('$') {
                *s = scope.interpolate(s, location)?;
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                interpolate_value(item, scope, &format!("{location}[{i}]"))?;
            }
        }
        Value::Table(table) => {
            for (key, item) in table.iter_mut() {
                interpolate_value(item, scope, &format!("{location}.{key}"))?;
            }
        }
        _ => {}
    }
    Ok(())
}
