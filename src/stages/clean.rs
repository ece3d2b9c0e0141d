// src/stages/clean.rs

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::options::CleanOptions;
use crate::files::PatternSet;
use crate::stages::{Stage, StageContext, StageReport};

impl Stage for CleanOptions {
    fn validate(&self) -> Result<()> {
        PatternSet::compile(&self.patterns)?;
        Ok(())
    }

    /// Delete every file matched by `patterns`. Directories are left in place
    /// and a missing dist tree is simply nothing to do. Ignores `newer:`.
    fn run(&self, ctx: &StageContext<'_>) -> Result<StageReport> {
        let patterns = PatternSet::compile(&self.patterns)?;
        let mut report = StageReport::new();

        for path in patterns.expand(ctx.fs, ctx.root())? {
            if !ctx.fs.is_file(&path) {
                continue;
            }
            ctx.fs
                .remove_file(&path)
                .with_context(|| format!("cleaning {:?}", path))?;
            debug!(path = ?path, "removed");
            report.processed += 1;
        }

        info!(removed = report.processed, "clean finished");
        Ok(report)
    }
}
