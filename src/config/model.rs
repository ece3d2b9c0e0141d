// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::options::{
    CleanOptions, CssminOptions, CsslintOptions, ImageminOptions, SassOptions, SpriteOptions,
    UglifyOptions, UncssOptions, WebfontOptions,
};
use crate::stages::Stage;
use crate::types::{StageKind, TaskId, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from `Assetflow.toml`, after `${...}`
/// interpolation.
///
/// ```toml
/// [paths]
/// src = "assets/src"
/// dist = "assets/dist"
///
/// [sass.dist]
/// entry = "${src}/sass/styles.scss"
/// output = "${dist}/css/styles.css"
///
/// [pipelines]
/// default = ["clean:all", "sass:dist", "cssmin"]
/// ```
///
/// Stage sections are keyed by target name, so `[sass.dist]` becomes the
/// task `sass:dist`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Directory all relative paths resolve against. Filled in by the loader.
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    #[serde(default)]
    pub clean: BTreeMap<String, CleanOptions>,
    #[serde(default)]
    pub sass: BTreeMap<String, SassOptions>,
    #[serde(default)]
    pub csslint: BTreeMap<String, CsslintOptions>,
    #[serde(default)]
    pub uncss: BTreeMap<String, UncssOptions>,
    #[serde(default)]
    pub cssmin: BTreeMap<String, CssminOptions>,
    #[serde(default)]
    pub uglify: BTreeMap<String, UglifyOptions>,
    #[serde(default)]
    pub imagemin: BTreeMap<String, ImageminOptions>,
    #[serde(default)]
    pub webfont: BTreeMap<String, WebfontOptions>,
    #[serde(default)]
    pub sprite: BTreeMap<String, SpriteOptions>,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub concurrent: BTreeMap<String, ConcurrentOptions>,

    /// Named pipelines: ordered step references.
    #[serde(default)]
    pub pipelines: BTreeMap<String, Vec<String>>,
}

/// `[paths]` section. Values are available as `${src}`, `${dist}` and
/// `${style_glob}` everywhere else in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default = "default_dist")]
    pub dist: String,
    #[serde(default = "default_style_glob")]
    pub style_glob: String,
}

fn default_src() -> String {
    "assets/src".to_string()
}

fn default_dist() -> String {
    "assets/dist".to_string()
}

fn default_style_glob() -> String {
    "**/*.{scss,sass}".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            dist: default_dist(),
            style_glob: default_style_glob(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// `"queue"` (default) or `"cancel"`.
    #[serde(default)]
    pub behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued reactions per group.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    #[serde(default)]
    pub groups: BTreeMap<String, WatchGroupConfig>,
}

fn default_queue_length() -> usize {
    1
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            groups: BTreeMap::new(),
        }
    }
}

/// `[watch.groups.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchGroupConfig {
    /// Globs relative to the project root that trigger this group.
    pub files: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Reaction: step references run on every trigger.
    pub tasks: Vec<String>,

    /// Skip reactions to saves that leave the file content unchanged.
    #[serde(default)]
    pub use_hash: bool,
}

/// `[concurrent.<name>]` section: watch groups run side by side.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConcurrentOptions {
    /// `watch:<group>` references.
    pub tasks: Vec<String>,

    #[serde(default = "default_log_concurrent_output")]
    pub log_concurrent_output: bool,
}

fn default_log_concurrent_output() -> bool {
    true
}

/// Options of one stage target, tagged by kind.
#[derive(Debug, Clone)]
pub enum StageConfig {
    Clean(CleanOptions),
    Sass(SassOptions),
    Csslint(CsslintOptions),
    Uncss(UncssOptions),
    Cssmin(CssminOptions),
    Uglify(UglifyOptions),
    Imagemin(ImageminOptions),
    Webfont(WebfontOptions),
    Sprite(SpriteOptions),
}

impl StageConfig {
    pub fn kind(&self) -> StageKind {
        match self {
            StageConfig::Clean(_) => StageKind::Clean,
            StageConfig::Sass(_) => StageKind::Sass,
            StageConfig::Csslint(_) => StageKind::Csslint,
            StageConfig::Uncss(_) => StageKind::Uncss,
            StageConfig::Cssmin(_) => StageKind::Cssmin,
            StageConfig::Uglify(_) => StageKind::Uglify,
            StageConfig::Imagemin(_) => StageKind::Imagemin,
            StageConfig::Webfont(_) => StageKind::Webfont,
            StageConfig::Sprite(_) => StageKind::Sprite,
        }
    }

    pub fn as_stage(&self) -> &dyn Stage {
        match self {
            StageConfig::Clean(o) => o,
            StageConfig::Sass(o) => o,
            StageConfig::Csslint(o) => o,
            StageConfig::Uncss(o) => o,
            StageConfig::Cssmin(o) => o,
            StageConfig::Uglify(o) => o,
            StageConfig::Imagemin(o) => o,
            StageConfig::Webfont(o) => o,
            StageConfig::Sprite(o) => o,
        }
    }
}

/// Validated, immutable project configuration.
///
/// Built from [`RawConfigFile`] via `TryFrom` (see `validate.rs`), then
/// shared by reference with every stage and watch group.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub paths: PathsSection,
    pub vars: BTreeMap<String, String>,
    pub tasks: BTreeMap<TaskId, StageConfig>,
    pub watch: WatchSection,
    pub concurrent: BTreeMap<String, ConcurrentOptions>,
    pub pipelines: BTreeMap<String, Vec<String>>,
}

impl Project {
    /// Assemble a project without validating it. Callers normally go through
    /// `Project::try_from(raw)`.
    pub fn new_unchecked(raw: RawConfigFile) -> Self {
        let mut tasks = BTreeMap::new();

        macro_rules! collect {
            ($field:ident, $kind:ident) => {
                for (target, opts) in raw.$field {
                    tasks.insert(TaskId::new(StageKind::$kind, target), StageConfig::$kind(opts));
                }
            };
        }

        collect!(clean, Clean);
        collect!(sass, Sass);
        collect!(csslint, Csslint);
        collect!(uncss, Uncss);
        collect!(cssmin, Cssmin);
        collect!(uglify, Uglify);
        collect!(imagemin, Imagemin);
        collect!(webfont, Webfont);
        collect!(sprite, Sprite);

        Self {
            root: raw.root,
            paths: raw.paths,
            vars: raw.vars,
            tasks,
            watch: raw.watch,
            concurrent: raw.concurrent,
            pipelines: raw.pipelines,
        }
    }

    pub fn task(&self, id: &TaskId) -> Option<&StageConfig> {
        self.tasks.get(id)
    }

    /// Every target of `kind`, in target-name order.
    pub fn targets_of(&self, kind: StageKind) -> Vec<TaskId> {
        self.tasks
            .keys()
            .filter(|id| id.kind == kind)
            .cloned()
            .collect()
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }
}
