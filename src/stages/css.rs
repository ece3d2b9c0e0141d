// src/stages/css.rs

//! Shared CSS helpers on top of lightningcss.

use anyhow::{anyhow, Result};
use lightningcss::rules::container::ContainerRule;
use lightningcss::rules::document::MozDocumentRule;
use lightningcss::rules::layer::LayerBlockRule;
use lightningcss::rules::media::MediaRule;
use lightningcss::rules::scope::ScopeRule;
use lightningcss::rules::starting_style::StartingStyleRule;
use lightningcss::rules::supports::SupportsRule;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::selector::Selector;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::traits::ToCss;

fn parser_options<'i>(filename: &str) -> ParserOptions<'i> {
    ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    }
}

/// Parse a stylesheet, borrowing from `source`.
pub fn parse<'i>(source: &'i str, filename: &str) -> Result<StyleSheet<'i>> {
    StyleSheet::parse(source, parser_options(filename)).map_err(|err| anyhow!("{err}"))
}

/// Parse and minify a stylesheet.
pub fn minify(source: &str, filename: &str) -> Result<String> {
    let mut sheet = parse(source, filename)?;
    sheet
        .minify(MinifyOptions::default())
        .map_err(|err| anyhow!("{err}"))?;
    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|err| anyhow!("{err}"))?;
    Ok(printed.code)
}

/// Fail if `source` is not a parseable stylesheet.
pub fn check_syntax(source: &str, filename: &str) -> Result<()> {
    parse(source, filename)?;
    Ok(())
}

/// Serialize any AST node without minification.
pub fn print<T: ToCss>(node: &T) -> Result<String> {
    node.to_css_string(PrinterOptions::default())
        .map_err(|err| anyhow!("{err}"))
}

/// Serialize a single selector of a selector list.
pub fn selector_text(selector: &Selector<'_>) -> Result<String> {
    print(selector)
}

/// Rules nested inside a grouping at-rule (`@media`, `@supports`,
/// `@layer`, `@container` and friends).
pub fn grouped_rules<'a, 'i>(rule: &'a CssRule<'i>) -> Option<&'a CssRuleList<'i>> {
    match rule {
        CssRule::Media(MediaRule { rules, .. })
        | CssRule::Supports(SupportsRule { rules, .. })
        | CssRule::LayerBlock(LayerBlockRule { rules, .. })
        | CssRule::Container(ContainerRule { rules, .. })
        | CssRule::MozDocument(MozDocumentRule { rules, .. })
        | CssRule::StartingStyle(StartingStyleRule { rules, .. })
        | CssRule::Scope(ScopeRule { rules, .. }) => Some(rules),
        _ => None,
    }
}

pub fn grouped_rules_mut<'a, 'i>(rule: &'a mut CssRule<'i>) -> Option<&'a mut CssRuleList<'i>> {
    match rule {
        CssRule::Media(MediaRule { rules, .. })
        | CssRule::Supports(SupportsRule { rules, .. })
        | CssRule::LayerBlock(LayerBlockRule { rules, .. })
        | CssRule::Container(ContainerRule { rules, .. })
        | CssRule::MozDocument(MozDocumentRule { rules, .. })
        | CssRule::StartingStyle(StartingStyleRule { rules, .. })
        | CssRule::Scope(ScopeRule { rules, .. }) => Some(rules),
        _ => None,
    }
}
