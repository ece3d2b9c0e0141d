// src/files/expand.rs

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::trace;

use crate::files::braces::expand_braces;
use crate::fs::FileSystem;

/// One positive pattern, compiled.
#[derive(Clone)]
struct IncludePattern {
    source: String,
    matcher: GlobSet,
    /// Walk roots (literal directory prefix + depth limit), one per brace
    /// alternative.
    roots: Vec<(String, Option<usize>)>,
}

/// An ordered list of include/exclude globs, compiled once.
///
/// Each positive pattern contributes its matches sorted by path; later
/// patterns append files not seen yet. `!` patterns remove files from the
/// final list, and excluded directories (`!dir/**`) are never descended into.
#[derive(Clone)]
pub struct PatternSet {
    includes: Vec<IncludePattern>,
    exclude: Option<GlobSet>,
    pruned_dirs: Option<GlobSet>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<&str> = self.includes.iter().map(|p| p.source.as_str()).collect();
        f.debug_struct("PatternSet")
            .field("includes", &sources)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    /// Compile a list of patterns. Fails on malformed globs.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();
        let mut pruned = Vec::new();

        for raw in patterns {
            let raw = raw.as_ref().trim();
            if let Some(neg) = raw.strip_prefix('!') {
                for alt in expand_braces(normalize(neg)) {
                    if let Some(dir) = alt.strip_suffix("/**") {
                        pruned.push(dir.to_string());
                    }
                    excludes.push(alt);
                }
                continue;
            }

            let alternatives = expand_braces(normalize(raw));
            let matcher = build_set(&alternatives)
                .with_context(|| format!("invalid glob pattern: {raw}"))?;
            let roots = alternatives.iter().map(|alt| walk_root(alt)).collect();

            includes.push(IncludePattern {
                source: raw.to_string(),
                matcher,
                roots,
            });
        }

        let exclude = if excludes.is_empty() {
            None
        } else {
            Some(build_set(&excludes).context("invalid exclusion pattern")?)
        };
        let pruned_dirs = if pruned.is_empty() {
            None
        } else {
            Some(build_set(&pruned).context("invalid exclusion pattern")?)
        };

        Ok(Self {
            includes,
            exclude,
            pruned_dirs,
        })
    }

    /// True if the relative path is matched by some include and no exclude.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.includes.iter().any(|p| p.matcher.is_match(rel_path)) && !self.is_excluded(rel_path)
    }

    fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|set| set.is_match(rel_path))
    }

    fn is_pruned(&self, rel_dir: &str) -> bool {
        self.pruned_dirs
            .as_ref()
            .is_some_and(|set| set.is_match(rel_dir))
    }

    /// Expand against `base`, returning paths relative to it (forward slashes).
    ///
    /// A missing base directory simply yields no files.
    pub fn expand_relative(&self, fs: &dyn FileSystem, base: &Path) -> Result<Vec<String>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();

        for pattern in &self.includes {
            let mut candidates = Vec::new();
            for (root, depth) in &pattern.roots {
                self.walk(fs, base, root, *depth, &mut candidates)?;
            }

            let mut matched: Vec<String> = candidates
                .into_iter()
                .filter(|rel| pattern.matcher.is_match(rel) && !self.is_excluded(rel))
                .collect();
            matched.sort();
            matched.dedup();

            trace!(pattern = %pattern.source, count = matched.len(), "expanded pattern");

            for rel in matched {
                if seen.insert(rel.clone()) {
                    out.push(rel);
                }
            }
        }

        Ok(out)
    }

    /// Expand against `base`, returning full paths.
    pub fn expand(&self, fs: &dyn FileSystem, base: &Path) -> Result<Vec<PathBuf>> {
        Ok(self
            .expand_relative(fs, base)?
            .into_iter()
            .map(|rel| base.join(rel))
            .collect())
    }

    fn walk(
        &self,
        fs: &dyn FileSystem,
        base: &Path,
        rel_dir: &str,
        depth_left: Option<usize>,
        out: &mut Vec<String>,
    ) -> Result<()> {
        let dir = if rel_dir.is_empty() {
            base.to_path_buf()
        } else {
            base.join(rel_dir)
        };
        if !fs.is_dir(&dir) {
            return Ok(());
        }

        for entry in fs.read_dir(&dir)? {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let rel = if rel_dir.is_empty() {
                name.to_string()
            } else {
                format!("{rel_dir}/{name}")
            };

            if fs.is_dir(&entry) {
                if self.is_pruned(&rel) {
                    trace!(dir = %rel, "skipping excluded directory");
                    continue;
                }
                match depth_left {
                    Some(1) => {}
                    other => self.walk(fs, base, &rel, other.map(|d| d - 1), out)?,
                }
            } else {
                out.push(rel);
            }
        }
        Ok(())
    }
}

/// Build a `GlobSet` from patterns (with brace expansion), for matching only.
pub fn compile_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut alternatives = Vec::new();
    for pat in patterns {
        alternatives.extend(expand_braces(normalize(pat.as_ref().trim())));
    }
    build_set(&alternatives)
}

fn build_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn normalize(pattern: &str) -> &str {
    pattern.strip_prefix("./").unwrap_or(pattern)
}

/// Split a single (brace-free) alternative into the literal directory prefix
/// to start walking from and the maximum walk depth below it.
fn walk_root(alt: &str) -> (String, Option<usize>) {
    let components: Vec<&str> = alt.split('/').collect();
    let mut base: Vec<&str> = Vec::new();

    for comp in &components[..components.len() - 1] {
        if is_glob(comp) {
            break;
        }
        base.push(comp);
    }

    let rest = &components[base.len()..];
    let depth = if rest.iter().any(|c| c.contains("**")) {
        None
    } else {
        Some(rest.len())
    };

    (base.join("/"), depth)
}

fn is_glob(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}
