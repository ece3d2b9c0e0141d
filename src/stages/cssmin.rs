// src/stages/cssmin.rs

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::config::options::{CssminOptions, ExtDot};
use crate::files::PatternSet;
use crate::stages::{css, Stage, StageContext, StageReport};

impl Stage for CssminOptions {
    fn validate(&self) -> Result<()> {
        PatternSet::compile(&self.src)?;
        if !self.ext.starts_with('.') {
            bail!("`ext` must start with a dot (got '{}')", self.ext);
        }
        Ok(())
    }

    /// Minify every matched stylesheet under `cwd` into `dest`, keeping the
    /// relative layout and swapping the extension for `ext`. Two inputs that
    /// map to the same output fail the stage before anything is written.
    fn run(&self, ctx: &StageContext<'_>) -> Result<StageReport> {
        let patterns = PatternSet::compile(&self.src)?;
        let cwd = ctx.path(&self.cwd);
        let dest = ctx.path(&self.dest);
        let mut report = StageReport::new();

        let mut outputs: HashMap<String, String> = HashMap::new();
        let mut jobs = Vec::new();
        for rel in patterns.expand_relative(ctx.fs, &cwd)? {
            let out_rel = replace_ext(&rel, &self.ext, self.ext_dot);
            if let Some(other) = outputs.insert(out_rel.clone(), rel.clone()) {
                bail!(
                    "`{other}` and `{rel}` both minify to {out_rel}; set ext_dot = \"last\" or narrow `src`"
                );
            }
            jobs.push((rel, out_rel));
        }

        for (rel, out_rel) in jobs {
            let input = cwd.join(&rel);
            let output = dest.join(out_rel);

            if !ctx.is_stale(&[input.clone()], &[output.clone()]) {
                debug!(input = %rel, "up to date");
                report.skipped += 1;
                continue;
            }

            let source = ctx.fs.read_to_string(&input)?;
            let minified =
                css::minify(&source, &rel).with_context(|| format!("minifying {:?}", input))?;
            ctx.fs.write(&output, minified.as_bytes())?;

            debug!(
                input = %rel,
                before = source.len(),
                after = minified.len(),
                "minified"
            );
            report.processed += 1;
            report.wrote(output);
        }

        info!(
            minified = report.processed,
            skipped = report.skipped,
            "cssmin finished"
        );
        Ok(report)
    }
}

/// Swap the extension of the file-name part of `rel`.
///
/// With [`ExtDot::First`] everything after the first dot of the file name is
/// replaced (`a/styles.tidy.css` -> `a/styles.min.css`); with
/// [`ExtDot::Last`] only the last extension is.
pub fn replace_ext(rel: &str, ext: &str, ext_dot: ExtDot) -> String {
    let (dir, name) = match rel.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, rel),
    };

    let dot = match ext_dot {
        // A leading dot (dotfile) is part of the name.
        ExtDot::First => name.get(1..).and_then(|n| n.find('.')).map(|i| i + 1),
        ExtDot::Last => name.rfind('.').filter(|&i| i > 0),
    };
    let stem = match dot {
        Some(i) => &name[..i],
        None => name,
    };

    match dir {
        Some(dir) => format!("{dir}/{stem}{ext}"),
        None => format!("{stem}{ext}"),
    }
}
