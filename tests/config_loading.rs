// tests/config_loading.rs

use std::error::Error;
use std::path::PathBuf;

use assetflow::config::{load_builtin, load_from_str, Project, StageConfig};
use assetflow::errors::AssetflowError;
use assetflow::types::{StageKind, TaskId, TriggerWhileRunningBehaviour};
use assetflow_test_utils::builders::ConfigBuilder;
use assetflow_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn builtin_config_loads_every_stage_kind() -> TestResult {
    init_tracing();
    let project = load_builtin("/site")?;

    for kind in StageKind::ALL {
        assert!(
            !project.targets_of(kind).is_empty(),
            "builtin config has no {kind} target"
        );
    }
    assert_eq!(
        project.targets_of(StageKind::Clean),
        vec![
            TaskId::new(StageKind::Clean, "all"),
            TaskId::new(StageKind::Clean, "sprites"),
        ]
    );

    assert_eq!(project.watch.behaviour, TriggerWhileRunningBehaviour::Queue);
    assert_eq!(project.watch.queue_length, 1);
    assert!(project.watch.groups["images"].use_hash);
    assert!(!project.watch.groups["styles"].use_hash);

    let names: Vec<&str> = project.pipelines.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["default", "iconfont", "stripcss"]);
    Ok(())
}

#[test]
fn builtin_paths_are_interpolated() -> TestResult {
    let project = load_builtin("/site")?;

    let Some(StageConfig::Sass(sass)) = project.task(&TaskId::new(StageKind::Sass, "dist")) else {
        return Err("sass:dist missing".into());
    };
    assert_eq!(sass.entry, "assets/src/sass/styles.scss");
    assert_eq!(sass.output, "assets/dist/css/styles.css");

    assert_eq!(
        project.watch.groups["styles"].files,
        vec!["assets/src/**/*.{scss,sass}".to_string()]
    );
    assert_eq!(project.resolve(&sass.output), PathBuf::from("/site/assets/dist/css/styles.css"));
    Ok(())
}

#[test]
fn changing_src_and_dist_reroutes_every_stage() -> TestResult {
    let toml = assetflow::config::BUILTIN_CONFIG.replacen(
        "src = \"assets/src\"\ndist = \"assets/dist\"",
        "src = \"web/source\"\ndist = \"public/build\"",
        1,
    );
    let project = Project::try_from(load_from_str(&toml, "/site")?)?;

    let rendered = format!("{:?}", project.tasks);
    assert!(!rendered.contains("assets/src"), "stale src path in {rendered}");
    assert!(!rendered.contains("assets/dist"), "stale dist path in {rendered}");
    assert!(rendered.contains("web/source/sass/styles.scss"));
    assert!(rendered.contains("public/build/css/styles.css"));

    assert_eq!(
        project.watch.groups["js"].files,
        vec!["web/source/**/*.js".to_string()]
    );
    Ok(())
}

#[test]
fn vars_are_available_to_paths_and_tasks() -> TestResult {
    let project = ConfigBuilder::new()
        .section("vars", "theme = \"dark\"")
        .section("paths", "src = \"themes/${vars.theme}/src\"\ndist = \"out\"")
        .task("clean", "all", "patterns = [\"${dist}/${vars.theme}/**/*.css\", \"cost$$.txt\"]")
        .pipeline("default", &["clean"])
        .try_build()?;

    let Some(StageConfig::Clean(clean)) = project.task(&TaskId::new(StageKind::Clean, "all")) else {
        return Err("clean:all missing".into());
    };
    assert_eq!(clean.patterns, vec!["out/dark/**/*.css", "cost$.txt"]);
    assert_eq!(project.paths.src, "themes/dark/src");
    Ok(())
}

#[test]
fn unknown_placeholder_is_a_config_error() {
    let result = ConfigBuilder::new()
        .task("clean", "all", "patterns = [\"${build}/**/*.css\"]")
        .pipeline("default", &["clean"])
        .try_build();

    match result {
        Err(AssetflowError::ConfigError(msg)) => assert!(msg.contains("build"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn unterminated_placeholder_is_a_config_error() {
    let result = ConfigBuilder::new()
        .task("clean", "all", "patterns = [\"${dist/**/*.css\"]")
        .pipeline("default", &["clean"])
        .try_build();

    assert!(matches!(result, Err(AssetflowError::ConfigError(_))), "{result:?}");
}

#[test]
fn unknown_option_keys_are_rejected_at_load() {
    let result = ConfigBuilder::new()
        .task("cssmin", "minify", "cwd = \"css\"\nsrc = [\"*.css\"]\ndest = \"css\"\nkeepSpecialComments = 0")
        .pipeline("default", &["cssmin"])
        .try_build();

    match result {
        Err(AssetflowError::TomlError(err)) => {
            assert!(err.to_string().contains("keepSpecialComments"), "{err}")
        }
        other => panic!("expected TomlError, got {other:?}"),
    }
}

#[test]
fn stage_option_validation_runs_at_load() {
    let result = ConfigBuilder::new()
        .task("imagemin", "dist", "cwd = \"img\"\nsrc = [\"*.png\"]\ndest = \"out\"\noptimization_level = 9")
        .pipeline("default", &["imagemin"])
        .try_build();

    match result {
        Err(AssetflowError::ConfigError(msg)) => assert!(msg.contains("imagemin.dist"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn zero_queue_length_is_rejected() {
    let result = ConfigBuilder::new()
        .section("watch", "queue_length = 0")
        .task("clean", "all", "patterns = [\"out/**\"]")
        .pipeline("default", &["clean"])
        .try_build();

    assert!(matches!(result, Err(AssetflowError::ConfigError(_))), "{result:?}");
}

#[test]
fn cancel_behaviour_is_parsed() -> TestResult {
    let project = ConfigBuilder::new()
        .section("watch", "behaviour = \"cancel\"\nqueue_length = 3")
        .task("clean", "all", "patterns = [\"out/**\"]")
        .pipeline("default", &["clean"])
        .try_build()?;

    assert_eq!(project.watch.behaviour, TriggerWhileRunningBehaviour::Cancel);
    assert_eq!(project.watch.queue_length, 3);
    Ok(())
}
