// src/stages/uncss.rs

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{anyhow, bail, Context, Result};
use lightningcss::media_query::MediaList;
use lightningcss::rules::style::StyleRule;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::selector::{Component, Selector};
use lightningcss::stylesheet::PrinterOptions;
use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};

use crate::config::options::UncssOptions;
use crate::files::PatternSet;
use crate::fs::FileSystem;
use crate::stages::css;
use crate::stages::{Stage, StageContext, StageReport};

static TEMPLATE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w-]+").expect("static regex"));

/// `class="..."` and `id='...'` attribute values.
static NAME_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:class|id)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("static regex")
});

/// lightningcss drops `@charset` while parsing.
static CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\A\u{FEFF}?\s*(@charset\s+"[^"]*"\s*;)"#).expect("static regex")
});

impl Stage for UncssOptions {
    fn validate(&self) -> Result<()> {
        if self.stylesheets.is_empty() {
            bail!("`stylesheets` must list at least one stylesheet");
        }
        PatternSet::compile(&self.templates)?;
        IgnoreList::compile(&self.ignore)?;
        compile_sheet_filters(&self.ignore_sheets)?;
        Ok(())
    }

    /// Remove selectors that no template references and write the result to
    /// `output`. Removals are reported, never fatal.
    fn run(&self, ctx: &StageContext<'_>) -> Result<StageReport> {
        let sheet_filters = compile_sheet_filters(&self.ignore_sheets)?;
        let templates = PatternSet::compile(&self.templates)?.expand(ctx.fs, ctx.root())?;
        if templates.is_empty() {
            bail!(
                "no templates matched {:?}; refusing to prune every selector",
                self.templates
            );
        }

        let pruner = Pruner {
            tokens: collect_tokens(ctx.fs, &templates)?,
            ignore: IgnoreList::compile(&self.ignore)?,
            media: self.media.iter().map(|m| PreservedMedia::new(m)).collect(),
            sheet_filters,
        };
        debug!(
            templates = templates.len(),
            tokens = pruner.tokens.len(),
            "scanned templates"
        );

        let mut report = StageReport::new();
        let mut output = PrunedOutput::default();
        let mut original_bytes = 0usize;

        for sheet in &self.stylesheets {
            if pruner.is_ignored_sheet(sheet) {
                info!(stylesheet = %sheet, "stylesheet matches ignore_sheets; skipped");
                continue;
            }
            let path = ctx.path(sheet);
            let source = ctx.fs.read_to_string(&path)?;
            original_bytes += source.len();

            pruner
                .prune_sheet(&source, sheet, &mut output, &mut report.findings)
                .with_context(|| format!("pruning {sheet}"))?;
            report.processed += 1;
        }

        let pruned = output.render();
        let output = ctx.path(&self.output);
        css::check_syntax(&pruned, &self.output)
            .with_context(|| format!("pruned stylesheet for {:?} does not parse", output))?;
        ctx.fs.write(&output, pruned.as_bytes())?;
        report.wrote(output.clone());

        for selector in &report.findings {
            debug!(selector = %selector, "removed unused selector");
        }
        info!(
            output = ?output,
            removed = report.findings.len(),
            "uncss finished"
        );
        if self.report {
            info!(original_bytes, pruned_bytes = pruned.len(), "uncss size report");
        }

        Ok(report)
    }
}

/// The combined output of every pruned stylesheet. `@charset` and
/// `@import` stay in front of every rule.
#[derive(Debug, Default)]
struct PrunedOutput {
    charset: Option<String>,
    imports: Vec<String>,
    body: Vec<String>,
}

impl PrunedOutput {
    fn render(&self) -> String {
        let mut out = String::new();
        for line in self.charset.iter().chain(&self.imports) {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.body.join("\n"));
        out.push('\n');
        out
    }
}

/// Selectors that survive pruning regardless of template usage.
#[derive(Debug, Default)]
pub struct IgnoreList {
    literals: HashSet<String>,
    patterns: Vec<Regex>,
}

impl IgnoreList {
    /// Entries wrapped in slashes (`/test\-[0-9]+/`, optionally with an `i`
    /// flag) are regexes; everything else is a literal selector.
    pub fn compile(entries: &[String]) -> Result<Self> {
        let mut list = Self::default();
        for entry in entries {
            let entry = entry.trim();
            match regex_literal(entry) {
                Some((pattern, case_insensitive)) => {
                    let re = RegexBuilder::new(pattern)
                        .case_insensitive(case_insensitive)
                        .build()
                        .with_context(|| format!("invalid ignore pattern {entry}"))?;
                    list.patterns.push(re);
                }
                None => {
                    list.literals.insert(normalize_selector(entry));
                }
            }
        }
        Ok(list)
    }

    pub fn matches(&self, selector: &str) -> bool {
        self.literals.contains(&normalize_selector(selector))
            || self.patterns.iter().any(|re| re.is_match(selector))
    }
}

fn regex_literal(entry: &str) -> Option<(&str, bool)> {
    let body = entry.strip_prefix('/')?;
    if let Some(pattern) = body.strip_suffix("/i") {
        return Some((pattern, true));
    }
    body.strip_suffix('/').map(|pattern| (pattern, false))
}

fn compile_sheet_filters(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            let p = regex_literal(p).map_or(p.as_str(), |(inner, _)| inner);
            Regex::new(p).with_context(|| format!("invalid ignore_sheets pattern {p}"))
        })
        .collect()
}

/// Every identifier-like word of every template, plus each whole word of
/// `class` and `id` attribute values so names like `md:flex` or `w-1/2`
/// survive.
pub fn collect_tokens(fs: &dyn FileSystem, templates: &[PathBuf]) -> Result<HashSet<String>> {
    let mut tokens = HashSet::new();
    for template in templates {
        let bytes = fs.read(template)?;
        let text = String::from_utf8_lossy(&bytes);
        tokens.extend(TEMPLATE_WORD.find_iter(&text).map(|m| m.as_str().to_string()));
        for caps in NAME_ATTRIBUTE.captures_iter(&text) {
            if let Some(value) = caps.get(1).or_else(|| caps.get(2)) {
                tokens.extend(value.as_str().split_whitespace().map(str::to_string));
            }
        }
    }
    Ok(tokens)
}

struct Pruner {
    tokens: HashSet<String>,
    ignore: IgnoreList,
    media: Vec<PreservedMedia>,
    sheet_filters: Vec<Regex>,
}

impl Pruner {
    fn is_ignored_sheet(&self, url: &str) -> bool {
        self.sheet_filters.iter().any(|re| re.is_match(url))
    }

    fn prune_sheet(
        &self,
        source: &str,
        filename: &str,
        output: &mut PrunedOutput,
        removed: &mut Vec<String>,
    ) -> Result<()> {
        if output.charset.is_none() {
            output.charset = CHARSET.captures(source).map(|caps| caps[1].to_string());
        }

        let mut sheet = css::parse(source, filename)?;
        let mut rules = CssRuleList(Vec::new());
        for rule in std::mem::take(&mut sheet.rules.0) {
            if let CssRule::Import(import) = &rule {
                if self.is_ignored_sheet(&import.url) {
                    debug!(import = %import.url, "import matches ignore_sheets; kept verbatim");
                } else {
                    warn!(import = %import.url, "imported stylesheet is not analysed; kept verbatim");
                }
                output.imports.push(css::print(&rule)?);
                continue;
            }
            rules.0.push(rule);
        }

        sheet.rules = self.prune_rules(rules, removed)?;
        let printed = sheet
            .to_css(PrinterOptions::default())
            .map_err(|err| anyhow!("{err}"))?
            .code;
        if !printed.trim().is_empty() {
            output.body.push(printed.trim_end().to_string());
        }
        Ok(())
    }

    fn prune_rules<'i>(
        &self,
        rules: CssRuleList<'i>,
        removed: &mut Vec<String>,
    ) -> Result<CssRuleList<'i>> {
        let mut kept = Vec::with_capacity(rules.0.len());
        for mut rule in rules.0 {
            if let CssRule::Media(media) = &rule {
                if self.is_preserved_media(&media.query)? {
                    kept.push(rule);
                    continue;
                }
            }
            if let CssRule::Style(style) = &mut rule {
                if !self.prune_style(style, removed)? {
                    continue;
                }
            } else if let Some(inner) = css::grouped_rules_mut(&mut rule) {
                let pruned = self.prune_rules(std::mem::replace(inner, CssRuleList(Vec::new())), removed)?;
                if pruned.0.is_empty() {
                    continue;
                }
                *inner = pruned;
            }
            kept.push(rule);
        }
        Ok(CssRuleList(kept))
    }

    /// Drop the unused selectors of a style rule; false once none are left.
    fn prune_style(&self, style: &mut StyleRule<'_>, removed: &mut Vec<String>) -> Result<bool> {
        let mut kept = Vec::new();
        for selector in std::mem::take(&mut style.selectors.0) {
            let text = css::selector_text(&selector)?;
            if self.is_used(&selector, &text) {
                kept.push(selector);
            } else {
                removed.push(normalize_selector(&text));
            }
        }
        style.selectors.0 = kept.into_iter().collect();
        Ok(!style.selectors.0.is_empty())
    }

    /// Every class and id of the selector (outside functional
    /// pseudo-classes) must occur in a template.
    fn is_used(&self, selector: &Selector<'_>, text: &str) -> bool {
        if self.ignore.matches(text) {
            return true;
        }
        selector.iter_raw_match_order().all(|component| match component {
            Component::Class(name) | Component::ID(name) => self.tokens.contains(&*name.0),
            _ => true,
        })
    }

    /// A block is preserved when its query equals a configured one, or when
    /// every parenthesised feature it tests appears in a configured query.
    fn is_preserved_media(&self, query: &MediaList<'_>) -> Result<bool> {
        let query = normalize_media(&css::print(query)?);
        let features = media_features(&query);
        Ok(self.media.iter().any(|configured| {
            configured.query == query
                || (!features.is_empty()
                    && features.iter().all(|f| configured.features.iter().any(|c| c == f)))
        }))
    }
}

/// A configured media query, printed the way lightningcss prints the
/// queries of the stylesheet so legacy `min-width` and range syntax compare
/// equal.
#[derive(Debug)]
struct PreservedMedia {
    query: String,
    features: Vec<String>,
}

impl PreservedMedia {
    fn new(query: &str) -> Self {
        let features = media_features(&normalize_media(query))
            .into_iter()
            .map(canonical_media)
            .collect();
        Self {
            query: canonical_media(query),
            features,
        }
    }
}

/// Round-trip a media query through lightningcss; queries it rejects are
/// only whitespace-normalised.
fn canonical_media(query: &str) -> String {
    let wrapped = format!("@media {query} {{}}");
    let printed = css::parse(&wrapped, "media").ok().and_then(|sheet| {
        match sheet.rules.0.first() {
            Some(CssRule::Media(media)) => css::print(&media.query).ok(),
            _ => None,
        }
    });
    normalize_media(printed.as_deref().unwrap_or(query))
}

fn normalize_selector(selector: &str) -> String {
    selector.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase, single spaces, no spaces just inside parentheses or after
/// colons.
pub fn normalize_media(query: &str) -> String {
    let collapsed = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    collapsed
        .replace("( ", "(")
        .replace(" )", ")")
        .replace(": ", ":")
        .replace(" :", ":")
}

fn media_features(query: &str) -> Vec<&str> {
    let mut features = Vec::new();
    let mut rest = query;
    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(len) => {
                features.push(&rest[open..=open + len]);
                rest = &rest[open + len + 1..];
            }
            None => break,
        }
    }
    features
}
