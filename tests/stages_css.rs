// tests/stages_css.rs

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetflow::config::{CsslintRules, ExtDot, Project};
use assetflow::errors::AssetflowError;
use assetflow::exec::{PipelineRunner, RunSummary};
use assetflow::fs::mock::MockFileSystem;
use assetflow::fs::FileSystem;
use assetflow::stages::csslint::lint;
use assetflow::stages::cssmin::replace_ext;
use assetflow_test_utils::builders::ConfigBuilder;
use assetflow_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn run(project: Project, fs: &MockFileSystem, pipeline: &str) -> Result<RunSummary, AssetflowError> {
    let runner = PipelineRunner::new(Arc::new(project), Arc::new(fs.clone()));
    let plan = runner.plan(pipeline)?;
    let steps: Vec<_> = plan.stage_steps().cloned().collect();
    runner.run_stages(pipeline, &steps)
}

fn read(fs: &MockFileSystem, path: &str) -> Result<String, Box<dyn Error>> {
    Ok(fs.read_to_string(Path::new(path))?)
}

#[test]
fn clean_on_missing_dist_succeeds() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let project = ConfigBuilder::new()
        .root("/p")
        .task("clean", "all", "patterns = [\"dist/**/*.css\", \"dist/**/*.js\"]")
        .pipeline("default", &["clean"])
        .try_build()?;

    let summary = run(project, &fs, "default")?;
    assert_eq!(summary.stages.len(), 1);
    assert_eq!(summary.stages[0].report.processed, 0);
    Ok(())
}

#[test]
fn clean_removes_only_matching_files() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/dist/css/styles.css", "a{}");
    fs.add_file("/p/dist/js/all.min.js", "x");
    fs.add_file("/p/dist/fonts/icon-font.svg", "<svg/>");

    let project = ConfigBuilder::new()
        .root("/p")
        .task("clean", "all", "patterns = [\"dist/**/*.css\", \"dist/**/*.js\"]")
        .pipeline("default", &["clean:all"])
        .try_build()?;
    run(project, &fs, "default")?;

    assert_eq!(fs.file_paths(), vec![PathBuf::from("/p/dist/fonts/icon-font.svg")]);
    Ok(())
}

#[test]
fn sass_compiles_and_cssmin_writes_min_files() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(
        "/p/src/sass/styles.scss",
        "$brand: #ff0000;\n.button {\n  color: $brand;\n  .icon { margin: 0; }\n}\n",
    );

    let project = ConfigBuilder::new()
        .root("/p")
        .paths("src", "dist")
        .task("sass", "dist", "entry = \"${src}/sass/styles.scss\"\noutput = \"${dist}/css/styles.css\"")
        .task(
            "cssmin",
            "minify",
            "cwd = \"${dist}/css\"\nsrc = [\"*.css\", \"!*.min.css\"]\ndest = \"${dist}/css\"",
        )
        .pipeline("default", &["sass:dist", "cssmin"])
        .try_build()?;

    let summary = run(project, &fs, "default")?;
    assert_eq!(summary.stages.len(), 2);

    let compiled = read(&fs, "/p/dist/css/styles.css")?;
    assert!(compiled.contains(".button .icon"), "{compiled}");
    assert!(!compiled.contains("$brand"), "{compiled}");

    let minified = read(&fs, "/p/dist/css/styles.min.css")?;
    assert!(!minified.contains('\n'), "{minified}");
    assert!(minified.len() < compiled.len());
    Ok(())
}

#[test]
fn sass_error_aborts_the_pipeline() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/styles.scss", ".a { color: $undefined; }");

    let project = ConfigBuilder::new()
        .root("/p")
        .task("sass", "dist", "entry = \"src/styles.scss\"\noutput = \"dist/styles.css\"")
        .task("clean", "after", "patterns = [\"src/**\"]")
        .pipeline("default", &["sass", "clean"])
        .try_build()?;

    match run(project, &fs, "default") {
        Err(AssetflowError::Stage { stage, .. }) => assert_eq!(stage, "sass:dist"),
        other => panic!("expected a stage failure, got {other:?}"),
    }
    // Nothing after the failing stage ran, and nothing was written.
    assert_eq!(fs.file_paths(), vec![PathBuf::from("/p/src/styles.scss")]);
    Ok(())
}

#[test]
fn newer_cssmin_skips_up_to_date_files() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/css/a.css", ".a { color: red; }");
    fs.add_file("/p/css/b.css", ".b { color: blue; }");

    let project = ConfigBuilder::new()
        .root("/p")
        .task("cssmin", "minify", "cwd = \"css\"\nsrc = [\"*.css\", \"!*.min.css\"]\ndest = \"css\"")
        .pipeline("default", &["newer:cssmin"])
        .try_build()?;
    let runner = PipelineRunner::new(Arc::new(project), Arc::new(fs.clone()));
    let steps: Vec<_> = runner.plan("default")?.stage_steps().cloned().collect();

    let first = runner.run_stages("default", &steps)?;
    assert_eq!(first.stages[0].report.processed, 2);

    fs.add_file("/p/css/b.css", ".b { color: green; }");
    let second = runner.run_stages("default", &steps)?;
    assert_eq!(second.stages[0].report.processed, 1);
    assert_eq!(second.stages[0].report.skipped, 1);
    Ok(())
}

#[test]
fn ext_dot_controls_which_extension_is_replaced() {
    assert_eq!(replace_ext("styles.css", ".min.css", ExtDot::First), "styles.min.css");
    assert_eq!(replace_ext("styles.tidy.css", ".min.css", ExtDot::First), "styles.min.css");
    assert_eq!(replace_ext("styles.tidy.css", ".min.css", ExtDot::Last), "styles.tidy.min.css");
    assert_eq!(replace_ext("sub/app.css", ".min.css", ExtDot::First), "sub/app.min.css");
}

const PRUNE_SOURCE: &str = r#"@charset "UTF-8";
.used { color: red; }
.unused { color: blue; }
#added_at_runtime { display: none; }
.test-12 { margin: 0; }
.used, .also-unused { padding: 1px; }
@media (min-width: 700px) { .never-in-templates { width: 1px; } }
@media print { .unused-print { color: black; } .used { color: black; } }
"#;

fn uncss_project() -> Result<Project, AssetflowError> {
    ConfigBuilder::new()
        .root("/p")
        .task(
            "uncss",
            "dist",
            r##"stylesheets = ["dist/css/styles.css"]
templates = ["MVC/**/*.cshtml"]
output = "dist/css/styles.tidy.css"
ignore = ["#added_at_runtime", "/test\\-[0-9]+/"]
media = ["(min-width: 700px) handheld and (orientation: landscape)"]
ignore_sheets = ["fonts.googleapis"]
report = true"##,
        )
        .pipeline("stripcss", &["uncss"])
        .try_build()
}

#[test]
fn uncss_prunes_unused_selectors_but_keeps_ignored_and_media() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/dist/css/styles.css", PRUNE_SOURCE);
    fs.add_file("/p/MVC/Views/Home/Index.cshtml", r#"<div class="used">@Model.Title</div>"#);

    let summary = run(uncss_project()?, &fs, "stripcss")?;
    let pruned = read(&fs, "/p/dist/css/styles.tidy.css")?;

    assert!(pruned.starts_with("@charset \"UTF-8\";"), "{pruned}");
    assert!(pruned.contains(".used"), "{pruned}");
    assert!(pruned.contains("#added_at_runtime"), "{pruned}");
    assert!(pruned.contains(".test-12"), "{pruned}");
    assert!(pruned.contains(".never-in-templates"), "{pruned}");
    assert!(pruned.contains("@media print"), "{pruned}");

    assert!(!pruned.contains(".unused"), "{pruned}");
    assert!(!pruned.contains(".also-unused"), "{pruned}");
    assert!(!pruned.contains(".unused-print"), "{pruned}");

    let removed = &summary.stages[0].report.findings;
    assert!(removed.contains(&".unused".to_string()), "{removed:?}");
    assert!(removed.contains(&".unused-print".to_string()), "{removed:?}");
    Ok(())
}

#[test]
fn uncss_without_templates_fails() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/dist/css/styles.css", PRUNE_SOURCE);

    match run(uncss_project()?, &fs, "stripcss") {
        Err(AssetflowError::Stage { stage, .. }) => assert_eq!(stage, "uncss:dist"),
        other => panic!("expected a stage failure, got {other:?}"),
    }
    assert!(!fs.exists(Path::new("/p/dist/css/styles.tidy.css")));
    Ok(())
}

#[test]
fn csslint_reports_each_rule() -> TestResult {
    let source = r#"
#header { color: red !important; }
.box { margin: 0px; }
.empty { }
.dup { color: red; padding: 1px; color: red; }
.fallback { display: block; display: flex; }
.list > * { margin: 0; }
@media screen { #nested { color: blue; } }
"#;
    let findings = lint(source, &CsslintRules::default())?;
    let rules: Vec<(&str, &str)> = findings
        .iter()
        .map(|f| (f.rule, f.selector.as_str()))
        .collect();

    assert!(rules.contains(&("ids", "#header")), "{rules:?}");
    assert!(rules.contains(&("important", "#header")), "{rules:?}");
    assert!(rules.contains(&("zero-units", ".box")), "{rules:?}");
    assert!(rules.contains(&("empty-rules", ".empty")), "{rules:?}");
    assert!(rules.contains(&("duplicate-properties", ".dup")), "{rules:?}");
    assert!(rules.contains(&("universal-selector", ".list > *")), "{rules:?}");
    assert!(rules.contains(&("ids", "#nested")), "{rules:?}");
    assert!(
        !rules.iter().any(|(_, selector)| *selector == ".fallback"),
        "{rules:?}"
    );
    Ok(())
}

#[test]
fn csslint_reads_declarations_after_braces_in_strings() -> TestResult {
    let source = ".quote { content: \"}\"; color: red !important; }\n.next { margin: 0px; }\n";
    let findings = lint(source, &CsslintRules::default())?;
    let rules: Vec<(&str, &str)> = findings
        .iter()
        .map(|f| (f.rule, f.selector.as_str()))
        .collect();

    assert!(rules.contains(&("important", ".quote")), "{rules:?}");
    assert!(rules.contains(&("zero-units", ".next")), "{rules:?}");
    assert!(!rules.iter().any(|(rule, _)| *rule == "empty-rules"), "{rules:?}");
    Ok(())
}

#[test]
fn csslint_fails_on_unparseable_stylesheet() {
    assert!(lint("..a { color: red; }", &CsslintRules::default()).is_err());
}

#[test]
fn csslint_rules_can_be_disabled() -> TestResult {
    let rules = CsslintRules {
        ids: false,
        important: false,
        ..CsslintRules::default()
    };
    assert!(lint("#a { color: red !important; }", &rules)?.is_empty());
    Ok(())
}

#[test]
fn csslint_fail_on_error_fails_the_stage() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/dist/styles.css", "#a { color: red; }");

    let project = ConfigBuilder::new()
        .root("/p")
        .task("csslint", "dev", "src = [\"dist/styles.css\"]\nfail_on_error = true")
        .pipeline("default", &["csslint"])
        .try_build()?;

    assert!(matches!(
        run(project, &fs, "default"),
        Err(AssetflowError::Stage { .. })
    ));
    Ok(())
}

#[test]
fn newer_csslint_skips_unchanged_files_on_second_run() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/dist/styles.css", ".a { color: red; }");

    let project = ConfigBuilder::new()
        .root("/p")
        .task("csslint", "dev", "src = [\"dist/styles.css\"]")
        .pipeline("default", &["newer:csslint:dev"])
        .try_build()?;
    let runner = PipelineRunner::new(Arc::new(project), Arc::new(fs.clone()));
    let steps: Vec<_> = runner.plan("default")?.stage_steps().cloned().collect();

    let first = runner.run_stages("default", &steps)?;
    assert_eq!(first.stages[0].report.processed, 1);

    let second = runner.run_stages("default", &steps)?;
    assert_eq!(second.stages[0].report.skipped, 1);
    Ok(())
}

#[test]
fn uncss_keeps_class_names_with_escaped_characters() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(
        "/p/dist/css/styles.css",
        ".md\\:flex { display: flex; }\n.w-1\\/2 { width: 50%; }\n.\\31 0 { color: red; }\n.lg\\:hidden { display: none; }\n",
    );
    fs.add_file(
        "/p/MVC/Views/Home/Index.cshtml",
        r#"<div class="md:flex w-1/2"><span class='10'>@Model.Title</span></div>"#,
    );

    let summary = run(uncss_project()?, &fs, "stripcss")?;
    let pruned = read(&fs, "/p/dist/css/styles.tidy.css")?;

    assert!(pruned.contains(r".md\:flex"), "{pruned}");
    assert!(pruned.contains(r".w-1\/2"), "{pruned}");
    assert!(pruned.contains(r".\31 0"), "{pruned}");
    assert!(!pruned.contains("hidden"), "{pruned}");

    let removed = &summary.stages[0].report.findings;
    assert_eq!(removed, &vec![r".lg\:hidden".to_string()]);
    Ok(())
}

fn two_sheet_uncss_project() -> Result<Project, AssetflowError> {
    ConfigBuilder::new()
        .root("/p")
        .task(
            "uncss",
            "dist",
            r#"stylesheets = ["dist/css/fonts.css", "dist/css/site.css"]
templates = ["MVC/**/*.cshtml"]
output = "dist/css/styles.tidy.css"
ignore_sheets = ["fonts.googleapis"]"#,
        )
        .pipeline("stripcss", &["uncss"])
        .try_build()
}

#[test]
fn uncss_keeps_ignored_imports_in_front() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(
        "/p/dist/css/fonts.css",
        "@import url(\"https://fonts.googleapis.com/css?family=Open+Sans\");\n.used { font-family: 'Open Sans'; }\n",
    );
    fs.add_file("/p/dist/css/site.css", ".used { color: red; }\n.gone { color: blue; }\n");
    fs.add_file("/p/MVC/Views/Home/Index.cshtml", r#"<p class="used"></p>"#);

    run(two_sheet_uncss_project()?, &fs, "stripcss")?;
    let pruned = read(&fs, "/p/dist/css/styles.tidy.css")?;

    let first = pruned.lines().next().unwrap_or_default();
    assert!(first.starts_with("@import"), "{pruned}");
    assert!(first.contains("https://fonts.googleapis.com/css?family=Open+Sans"), "{pruned}");
    assert_eq!(pruned.matches("@import").count(), 1, "{pruned}");
    assert!(!pruned.contains(".gone"), "{pruned}");
    Ok(())
}

#[test]
fn uncss_keeps_a_later_charset_ahead_of_earlier_imports() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(
        "/p/dist/css/fonts.css",
        "@import url(\"https://fonts.googleapis.com/css?family=Open+Sans\");\n",
    );
    fs.add_file(
        "/p/dist/css/site.css",
        "@charset \"UTF-8\";\n.used { content: \"\u{2713}\"; }\n",
    );
    fs.add_file("/p/MVC/Views/Home/Index.cshtml", r#"<p class="used"></p>"#);

    run(two_sheet_uncss_project()?, &fs, "stripcss")?;
    let pruned = read(&fs, "/p/dist/css/styles.tidy.css")?;

    let lines: Vec<&str> = pruned.lines().collect();
    assert_eq!(lines[0], "@charset \"UTF-8\";", "{pruned}");
    assert!(lines[1].starts_with("@import"), "{pruned}");
    assert_eq!(pruned.matches("@charset").count(), 1, "{pruned}");
    Ok(())
}

#[test]
fn clean_keeps_an_existing_empty_dist_directory() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_dir("/p/dist");

    let project = ConfigBuilder::new()
        .root("/p")
        .task("clean", "all", "patterns = [\"dist/**/*.css\", \"dist/**/*.js\"]")
        .pipeline("default", &["clean"])
        .try_build()?;

    let summary = run(project, &fs, "default")?;
    assert_eq!(summary.stages[0].report.processed, 0);
    assert!(fs.is_dir(Path::new("/p/dist")));
    Ok(())
}

fn cssmin_project(ext_dot: &str) -> Result<Project, AssetflowError> {
    ConfigBuilder::new()
        .root("/p")
        .task(
            "cssmin",
            "minify",
            &format!(
                "cwd = \"css\"\nsrc = [\"*.css\", \"!*.min.css\"]\ndest = \"css\"\next_dot = \"{ext_dot}\""
            ),
        )
        .pipeline("default", &["cssmin"])
        .try_build()
}

#[test]
fn cssmin_twice_rewrites_the_same_files() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/css/styles.css", ".a { color: red; }\n.b { margin: 0 auto; }\n");

    run(cssmin_project("first")?, &fs, "default")?;
    let first = read(&fs, "/p/css/styles.min.css")?;
    run(cssmin_project("first")?, &fs, "default")?;
    let second = read(&fs, "/p/css/styles.min.css")?;

    assert_eq!(first, second);
    assert_eq!(
        fs.file_paths(),
        vec![PathBuf::from("/p/css/styles.css"), PathBuf::from("/p/css/styles.min.css")]
    );
    Ok(())
}

#[test]
fn cssmin_refuses_two_inputs_with_the_same_output() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/css/styles.css", ".a { color: red; }");
    fs.add_file("/p/css/styles.tidy.css", ".a { color: blue; }");

    match run(cssmin_project("first")?, &fs, "default") {
        Err(AssetflowError::Stage { stage, source }) => {
            assert_eq!(stage, "cssmin:minify");
            assert!(source.to_string().contains("styles.min.css"), "{source}");
        }
        other => panic!("expected a stage failure, got {other:?}"),
    }
    assert!(!fs.exists(Path::new("/p/css/styles.min.css")));

    run(cssmin_project("last")?, &fs, "default")?;
    assert!(fs.exists(Path::new("/p/css/styles.min.css")));
    assert!(fs.exists(Path::new("/p/css/styles.tidy.min.css")));
    Ok(())
}
