// tests/stages_js.rs

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use assetflow::errors::AssetflowError;
use assetflow::exec::PipelineRunner;
use assetflow::fs::mock::MockFileSystem;
use assetflow::fs::FileSystem;
use assetflow_test_utils::builders::ConfigBuilder;
use assetflow_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn runner(fs: &MockFileSystem, uglify_body: &str) -> Result<PipelineRunner, AssetflowError> {
    let project = ConfigBuilder::new()
        .root("/p")
        .task("uglify", "dist", uglify_body)
        .pipeline("default", &["uglify:dist"])
        .try_build()?;
    Ok(PipelineRunner::new(Arc::new(project), Arc::new(fs.clone())))
}

fn scripts(fs: &MockFileSystem) {
    fs.add_file("/p/src/js/main.js", "var main = 1;");
    fs.add_file("/p/src/js/app.js", "var app = 2;");
    fs.add_file("/p/src/js/vendor/lib.js", "var lib = 3;");
}

#[test]
fn bundle_order_is_pinned_by_expansion() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    scripts(&fs);

    let runner = runner(
        &fs,
        "src = [\"src/js/{,*/}*.js\"]\noutput = \"dist/js/all.js\"\nmangle = false\ncompress = false",
    )?;
    let steps: Vec<_> = runner.plan("default")?.stage_steps().cloned().collect();
    runner.run_stages("default", &steps)?;

    let bundle = fs.read_to_string(Path::new("/p/dist/js/all.js"))?;
    assert_eq!(bundle, "var app = 2;;\nvar main = 1;;\nvar lib = 3;");
    Ok(())
}

#[test]
fn explicit_file_order_wins_over_sorting() -> TestResult {
    let fs = MockFileSystem::new();
    scripts(&fs);

    let runner = runner(
        &fs,
        "src = [\"src/js/vendor/lib.js\", \"src/js/*.js\"]\noutput = \"dist/all.js\"\nmangle = false\ncompress = false\nseparator = \"\\n\"",
    )?;
    let steps: Vec<_> = runner.plan("default")?.stage_steps().cloned().collect();
    runner.run_stages("default", &steps)?;

    let bundle = fs.read_to_string(Path::new("/p/dist/all.js"))?;
    assert_eq!(bundle, "var lib = 3;\nvar app = 2;\nvar main = 1;");
    Ok(())
}

#[test]
fn minified_bundle_is_smaller() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(
        "/p/src/js/app.js",
        "function greet(name) {\n    var message = 'Hello, ' + name;\n    return message;\n}\n\ngreet('world');\n",
    );

    let runner = runner(&fs, "src = [\"src/js/*.js\"]\noutput = \"dist/all.min.js\"")?;
    let steps: Vec<_> = runner.plan("default")?.stage_steps().cloned().collect();
    let summary = runner.run_stages("default", &steps)?;
    assert_eq!(summary.stages[0].report.processed, 1);

    let source = fs.read_to_string(Path::new("/p/src/js/app.js"))?;
    let bundle = fs.read_to_string(Path::new("/p/dist/all.min.js"))?;
    assert!(!bundle.is_empty());
    assert!(bundle.len() < source.len(), "{bundle}");
    Ok(())
}

#[test]
fn syntax_error_names_the_bundle_inputs() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/js/broken.js", "function (");

    let runner = runner(&fs, "src = [\"src/js/*.js\"]\noutput = \"dist/all.min.js\"")?;
    let steps: Vec<_> = runner.plan("default")?.stage_steps().cloned().collect();

    match runner.run_stages("default", &steps) {
        Err(err @ AssetflowError::Stage { .. }) => {
            let message = err.to_string();
            assert!(message.contains("src/js/broken.js"), "{message}");
        }
        other => panic!("expected a stage failure, got {other:?}"),
    }
    assert!(!fs.exists(Path::new("/p/dist/all.min.js")));
    Ok(())
}

#[test]
fn no_inputs_writes_nothing() -> TestResult {
    let fs = MockFileSystem::new();
    let runner = runner(&fs, "src = [\"src/js/*.js\"]\noutput = \"dist/all.min.js\"")?;
    let steps: Vec<_> = runner.plan("default")?.stage_steps().cloned().collect();

    runner.run_stages("default", &steps)?;
    assert!(fs.file_paths().is_empty());
    Ok(())
}
