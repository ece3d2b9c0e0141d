// src/stages/sass.rs

use anyhow::{anyhow, bail, Context, Result};
use grass::{Options, OutputStyle};
use tracing::info;

use crate::config::options::{SassOptions, SassStyle};
use crate::stages::{Stage, StageContext, StageReport};

impl Stage for SassOptions {
    fn validate(&self) -> Result<()> {
        if self.entry.trim().is_empty() || self.output.trim().is_empty() {
            bail!("`entry` and `output` must not be empty");
        }
        Ok(())
    }

    /// Compile `entry` into `output`. Imports resolve relative to the entry's
    /// directory first, then `load_paths`.
    fn run(&self, ctx: &StageContext<'_>) -> Result<StageReport> {
        let entry = ctx.path(&self.entry);
        let output = ctx.path(&self.output);

        if !ctx.fs.is_file(&entry) {
            bail!("missing entry stylesheet {:?}", entry);
        }
        let source = ctx.fs.read_to_string(&entry)?;

        let style = match self.style {
            SassStyle::Expanded => OutputStyle::Expanded,
            SassStyle::Compressed => OutputStyle::Compressed,
        };
        let mut options = Options::default().style(style);
        if let Some(dir) = entry.parent() {
            options = options.load_path(dir);
        }
        for path in &self.load_paths {
            options = options.load_path(ctx.path(path));
        }

        // The compiler diagnostic is passed through untouched.
        let css = grass::from_string(source, &options)
            .map_err(|err| anyhow!("{err}"))
            .with_context(|| format!("compiling {:?}", entry))?;

        ctx.fs.write(&output, css.as_bytes())?;
        info!(output = ?output, bytes = css.len(), "compiled stylesheet");

        let mut report = StageReport::new();
        report.processed = 1;
        report.wrote(output);
        Ok(report)
    }
}
