// src/config/options.rs

//! Strongly typed option records, one per stage kind.
//!
//! Every record rejects unknown keys, so a typo in `Assetflow.toml` is a load
//! error rather than a silently ignored option.

use serde::Deserialize;

/// `[clean.<target>]`: delete generated files.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanOptions {
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SassStyle {
    #[default]
    Expanded,
    Compressed,
}

/// `[sass.<target>]`: compile one entry stylesheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SassOptions {
    pub entry: String,
    pub output: String,
    #[serde(default)]
    pub load_paths: Vec<String>,
    #[serde(default)]
    pub style: SassStyle,
}

/// Individual lint checks; all enabled by default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case", default)]
pub struct CsslintRules {
    pub important: bool,
    pub ids: bool,
    pub empty_rules: bool,
    pub duplicate_properties: bool,
    pub zero_units: bool,
    pub universal_selector: bool,
}

impl Default for CsslintRules {
    fn default() -> Self {
        Self {
            important: true,
            ids: true,
            empty_rules: true,
            duplicate_properties: true,
            zero_units: true,
            universal_selector: true,
        }
    }
}

/// `[csslint.<target>]`: advisory lint of compiled stylesheets.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsslintOptions {
    pub src: Vec<String>,
    #[serde(default)]
    pub rules: CsslintRules,
    /// Turn findings into a stage failure.
    #[serde(default)]
    pub fail_on_error: bool,
}

/// `[uncss.<target>]`: prune selectors no template references.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UncssOptions {
    pub stylesheets: Vec<String>,
    pub templates: Vec<String>,
    pub output: String,
    /// Selectors that are always kept. `/.../` entries are regexes.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Media queries whose blocks are kept untouched.
    #[serde(default)]
    pub media: Vec<String>,
    /// Regexes for stylesheet URLs that are never analysed.
    #[serde(default)]
    pub ignore_sheets: Vec<String>,
    #[serde(default)]
    pub report: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtDot {
    /// Replace everything after the first dot of the file name.
    #[default]
    First,
    /// Replace only the last extension.
    Last,
}

/// `[cssmin.<target>]`: minify each stylesheet next to its source.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CssminOptions {
    pub cwd: String,
    pub src: Vec<String>,
    pub dest: String,
    #[serde(default = "default_min_ext")]
    pub ext: String,
    #[serde(default)]
    pub ext_dot: ExtDot,
}

fn default_min_ext() -> String {
    ".min.css".to_string()
}

/// `[uglify.<target>]`: concatenate and minify scripts.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UglifyOptions {
    pub src: Vec<String>,
    pub output: String,
    #[serde(default = "default_true")]
    pub mangle: bool,
    #[serde(default = "default_true")]
    pub compress: bool,
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    ";\n".to_string()
}

/// `[imagemin.<target>]`: optimise raster images into the dist tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageminOptions {
    pub cwd: String,
    pub src: Vec<String>,
    pub dest: String,
    /// 0-7, mapped onto PNG compression effort.
    #[serde(default = "default_optimization_level")]
    pub optimization_level: u8,
    /// Ask for progressive JPEG output. Only baseline encoding is available,
    /// so JPEGs are still copied unchanged and the stage warns.
    #[serde(default)]
    pub progressive: bool,
}

fn default_optimization_level() -> u8 {
    3
}

pub const FROZEN_FONT_HEIGHT: u32 = 4096;
pub const FROZEN_ASCENT: u32 = 4096;
pub const FROZEN_DESCENT: u32 = 0;

/// `[webfont.<target>]`: build an icon font from SVG files.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebfontOptions {
    pub src: String,
    pub dest: String,
    pub dest_css: String,
    #[serde(default = "default_font_name")]
    pub font: String,
    #[serde(default = "default_start_codepoint")]
    pub start_codepoint: u32,
    // Glyph metrics are frozen; changing them shifts every glyph.
    #[serde(default = "default_font_height")]
    pub font_height: u32,
    #[serde(default = "default_font_height")]
    pub ascent: u32,
    #[serde(default)]
    pub descent: u32,
    /// Required to deviate from the frozen metrics above.
    #[serde(default)]
    pub unlock_metrics: bool,
    #[serde(default = "default_true")]
    pub normalize: bool,
    #[serde(default = "default_relative_font_path")]
    pub relative_font_path: String,
    #[serde(default = "default_font_formats")]
    pub formats: Vec<String>,
    #[serde(default = "default_stylesheet_ext")]
    pub stylesheet: String,
    #[serde(default = "default_true")]
    pub partial_prefix: bool,
    #[serde(default = "default_class_prefix")]
    pub class_prefix: String,
    /// Optional minijinja template for the stylesheet partial.
    #[serde(default)]
    pub template: Option<String>,
    /// Shell command producing non-SVG formats. Placeholders: `{svg}`,
    /// `{dest}`, `{font}`, `{format}`.
    #[serde(default)]
    pub converter: Option<String>,
}

fn default_font_name() -> String {
    "icon-font".to_string()
}

fn default_start_codepoint() -> u32 {
    0x00b1
}

fn default_font_height() -> u32 {
    FROZEN_FONT_HEIGHT
}

fn default_relative_font_path() -> String {
    "../fonts/".to_string()
}

fn default_font_formats() -> Vec<String> {
    ["eot", "svg", "woff", "ttf"].map(String::from).to_vec()
}

fn default_stylesheet_ext() -> String {
    "scss".to_string()
}

fn default_class_prefix() -> String {
    "icon-".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpriteAlgorithm {
    #[default]
    TopDown,
    LeftRight,
}

/// `[sprite.<target>]`: pack PNGs into one sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpriteOptions {
    pub src: String,
    pub dest: String,
    pub dest_css: String,
    /// Optional minijinja template for the stylesheet partial.
    #[serde(default)]
    pub css_template: Option<String>,
    #[serde(default)]
    pub padding: u32,
    #[serde(default)]
    pub algorithm: SpriteAlgorithm,
    /// URL used in the stylesheet; defaults to the sprite file name.
    #[serde(default)]
    pub image_url: Option<String>,
}
