// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Behaviour when a watch group is triggered while its reaction is running.
///
/// - `Queue`: remember the trigger and run the reaction again once the current
///   run finishes (default). Several triggers collapse into one queued run.
/// - `Cancel`: drop any previously queued run and keep only the latest
///   trigger. The in-flight run is never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// The kinds of stage the pipeline knows how to run.
///
/// The lowercase name doubles as the first half of a task id
/// (`sass:dist`, `clean:all`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageKind {
    Clean,
    Sass,
    Csslint,
    Uncss,
    Cssmin,
    Uglify,
    Imagemin,
    Webfont,
    Sprite,
}

impl StageKind {
    pub const ALL: [StageKind; 9] = [
        StageKind::Clean,
        StageKind::Sass,
        StageKind::Csslint,
        StageKind::Uncss,
        StageKind::Cssmin,
        StageKind::Uglify,
        StageKind::Imagemin,
        StageKind::Webfont,
        StageKind::Sprite,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Clean => "clean",
            StageKind::Sass => "sass",
            StageKind::Csslint => "csslint",
            StageKind::Uncss => "uncss",
            StageKind::Cssmin => "cssmin",
            StageKind::Uglify => "uglify",
            StageKind::Imagemin => "imagemin",
            StageKind::Webfont => "webfont",
            StageKind::Sprite => "sprite",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown stage kind '{s}'"))
    }
}

/// Fully qualified task id: `<kind>:<target>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId {
    pub kind: StageKind,
    pub target: String,
}

impl TaskId {
    pub fn new(kind: StageKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.target)
    }
}
