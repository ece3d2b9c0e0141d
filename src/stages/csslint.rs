// src/stages/csslint.rs

use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::{anyhow, bail, Context, Result};
use lightningcss::properties::Property;
use lightningcss::rules::style::StyleRule;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::selector::{Component, Selector};
use lightningcss::stylesheet::PrinterOptions;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::options::{CsslintOptions, CsslintRules};
use crate::files::PatternSet;
use crate::stages::css;
use crate::stages::{Stage, StageContext, StageReport};

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("static regex"));

static ZERO_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s(,:])0(?:px|em|rem|ex|ch|vw|vh|vmin|vmax|cm|mm|in|pt|pc)(?:$|[\s),!;}])")
        .expect("static regex")
});

/// One advisory lint result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub rule: &'static str,
    pub selector: String,
    pub message: String,
}

impl Stage for CsslintOptions {
    fn validate(&self) -> Result<()> {
        PatternSet::compile(&self.src)?;
        Ok(())
    }

    /// Lint each matched stylesheet. A stylesheet that fails to parse is an
    /// error; rule findings are warnings unless `fail_on_error` is set.
    fn run(&self, ctx: &StageContext<'_>) -> Result<StageReport> {
        let patterns = PatternSet::compile(&self.src)?;
        let files = patterns.expand(ctx.fs, ctx.root())?;
        let mut report = StageReport::new();

        if files.is_empty() {
            warn!("no stylesheets matched; nothing to lint");
        }

        for file in files {
            let rel = file
                .strip_prefix(ctx.root())
                .unwrap_or(&file)
                .display()
                .to_string();

            if !ctx.changed_since_last_run(&file) {
                debug!(file = %rel, "unchanged since last lint");
                report.skipped += 1;
                continue;
            }

            let source = ctx.fs.read_to_string(&file)?;
            let findings = lint(&source, &self.rules).with_context(|| format!("parsing {rel}"))?;

            for finding in findings {
                warn!(file = %rel, rule = finding.rule, selector = %finding.selector, "{}", finding.message);
                report
                    .findings
                    .push(format!("{rel}: {}: {}", finding.rule, finding.message));
            }
            report.processed += 1;
        }

        info!(
            files = report.processed,
            findings = report.findings.len(),
            "csslint finished"
        );

        if self.fail_on_error && !report.findings.is_empty() {
            bail!("{} lint finding(s)", report.findings.len());
        }
        Ok(report)
    }
}

/// Run the enabled rules over a stylesheet. Fails only if it does not parse.
pub fn lint(source: &str, rules: &CsslintRules) -> Result<Vec<LintFinding>> {
    let sheet = css::parse(source, "stylesheet")?;
    let mut findings = Vec::new();
    let mut rule_lines = Vec::new();
    lint_rules(&sheet.rules, rules, &mut rule_lines, &mut findings)?;
    if rules.zero_units {
        zero_units(source, &rule_lines, &mut findings);
    }
    Ok(findings)
}

fn lint_rules(
    list: &CssRuleList<'_>,
    rules: &CsslintRules,
    rule_lines: &mut Vec<(u32, String)>,
    out: &mut Vec<LintFinding>,
) -> Result<()> {
    for rule in &list.0 {
        if let CssRule::Style(style) = rule {
            let selector = css::print(&style.selectors)?;
            lint_style(style, &selector, rules, out)?;
            rule_lines.push((style.loc.line, selector));
            lint_rules(&style.rules, rules, rule_lines, out)?;
        } else if let Some(inner) = css::grouped_rules(rule) {
            lint_rules(inner, rules, rule_lines, out)?;
        }
    }
    Ok(())
}

fn lint_style(
    style: &StyleRule<'_>,
    selector: &str,
    rules: &CsslintRules,
    out: &mut Vec<LintFinding>,
) -> Result<()> {
    let mut push = |rule: &'static str, message: String| {
        out.push(LintFinding {
            rule,
            selector: selector.to_string(),
            message,
        });
    };

    let block = &style.declarations;
    if rules.empty_rules
        && block.declarations.is_empty()
        && block.important_declarations.is_empty()
        && style.rules.0.is_empty()
    {
        push("empty-rules", format!("rule '{selector}' is empty"));
    }

    for part in style.selectors.0.iter() {
        let text = css::selector_text(part)?;
        if rules.ids && part.iter_raw_match_order().any(|c| matches!(c, Component::ID(_))) {
            push("ids", format!("selector '{text}' uses an id"));
        }
        if rules.universal_selector && has_universal_key(part) {
            push(
                "universal-selector",
                format!("selector '{text}' has the universal selector as key"),
            );
        }
    }

    if rules.important {
        for property in &block.important_declarations {
            push("important", format!("'{}' uses !important", property_name(property)));
        }
    }

    if rules.duplicate_properties {
        let mut last_seen: HashMap<String, (usize, String)> = HashMap::new();
        for (index, property) in block.declarations.iter().enumerate() {
            let name = property_name(property);
            let value = property
                .value_to_css_string(PrinterOptions::default())
                .map_err(|err| anyhow!("{err}"))?;
            if let Some((prev_index, prev_value)) = last_seen.get(&name) {
                // Adjacent declarations with different values are fallbacks.
                if *prev_index + 1 != index || *prev_value == value {
                    push(
                        "duplicate-properties",
                        format!("'{name}' is declared more than once in '{selector}'"),
                    );
                }
            }
            last_seen.insert(name, (index, value));
        }
    }
    Ok(())
}

fn property_name(property: &Property<'_>) -> String {
    property.property_id().name().to_ascii_lowercase()
}

/// The right-most compound selector is `*`.
fn has_universal_key(selector: &Selector<'_>) -> bool {
    selector
        .iter()
        .any(|c| matches!(c, Component::ExplicitUniversalType))
}

/// The parsed tree prints `0px` as `0`, so units on zero values are found
/// in the source text and attributed to the closest preceding style rule.
fn zero_units(source: &str, rule_lines: &[(u32, String)], out: &mut Vec<LintFinding>) {
    let blanked = COMMENT.replace_all(source, |caps: &regex::Captures<'_>| {
        caps[0].replace(|c: char| c != '\n', " ")
    });
    for (line_no, line) in blanked.lines().enumerate() {
        let Some(found) = ZERO_WITH_UNIT.find(line) else {
            continue;
        };
        let line_no = line_no as u32;
        let Some((_, selector)) = rule_lines
            .iter()
            .filter(|(start, _)| *start <= line_no)
            .max_by_key(|(start, _)| *start)
        else {
            continue;
        };
        out.push(LintFinding {
            rule: "zero-units",
            selector: selector.clone(),
            message: format!(
                "line {}: '{}' has a unit on a zero value",
                line_no + 1,
                found.as_str().trim_matches(|c: char| !c.is_ascii_alphanumeric())
            ),
        });
    }
}
