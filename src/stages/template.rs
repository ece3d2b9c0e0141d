// src/stages/template.rs

use anyhow::{Context, Result};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

/// Render a minijinja template. Undefined variables are errors so a typo in
/// a custom template fails the stage instead of producing empty CSS.
pub fn render<S: Serialize>(name: &str, source: &str, context: S) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);

    env.add_template(name, source)
        .with_context(|| format!("parsing template {name}"))?;
    let template = env.get_template(name)?;
    let rendered = template
        .render(context)
        .with_context(|| format!("rendering template {name}"))?;
    Ok(rendered)
}
