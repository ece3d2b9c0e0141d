// src/stages/uglify.rs

use anyhow::{anyhow, bail, Context, Result};
use minify_js::{minify, Session, TopLevelMode};
use tracing::{debug, info, warn};

use crate::config::options::UglifyOptions;
use crate::files::PatternSet;
use crate::stages::{Stage, StageContext, StageReport};

impl Stage for UglifyOptions {
    fn validate(&self) -> Result<()> {
        PatternSet::compile(&self.src)?;
        if self.output.trim().is_empty() {
            bail!("`output` must not be empty");
        }
        Ok(())
    }

    /// Concatenate the matched scripts in expansion order and minify the
    /// bundle into `output`.
    fn run(&self, ctx: &StageContext<'_>) -> Result<StageReport> {
        let patterns = PatternSet::compile(&self.src)?;
        let inputs = patterns.expand(ctx.fs, ctx.root())?;
        let output = ctx.path(&self.output);
        let mut report = StageReport::new();

        if inputs.is_empty() {
            warn!(output = ?output, "no source files matched; bundle not written");
            return Ok(report);
        }

        if !ctx.is_stale(&inputs, &[output.clone()]) {
            report.skipped = inputs.len();
            info!(output = ?output, "bundle up to date");
            return Ok(report);
        }

        let mut sources = Vec::with_capacity(inputs.len());
        for input in &inputs {
            sources.push(ctx.fs.read_to_string(input)?);
        }
        let bundle = sources.join(&self.separator);

        if self.compress && !self.mangle {
            debug!("minify-js always mangles local names; `mangle = false` has no effect");
        }
        let code = if self.compress || self.mangle {
            minify_bundle(&bundle).with_context(|| {
                let names: Vec<String> = inputs
                    .iter()
                    .map(|p| p.strip_prefix(ctx.root()).unwrap_or(p).display().to_string())
                    .collect();
                format!("minifying bundle of [{}]", names.join(", "))
            })?
        } else {
            bundle
        };

        ctx.fs.write(&output, code.as_bytes())?;
        info!(
            output = ?output,
            files = inputs.len(),
            bytes = code.len(),
            "bundled scripts"
        );

        report.processed = inputs.len();
        report.wrote(output);
        Ok(report)
    }
}

fn minify_bundle(source: &str) -> Result<String> {
    let session = Session::new();
    let mut out = Vec::new();
    minify(&session, TopLevelMode::Global, source.as_bytes(), &mut out)
        .map_err(|err| anyhow!("{err:?}"))?;
    String::from_utf8(out).context("minified bundle is not valid UTF-8")
}
