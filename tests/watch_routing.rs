// tests/watch_routing.rs

use std::error::Error;
use std::path::Path;

use assetflow::config::load_builtin;
use assetflow::engine::ReactorEvent;
use assetflow::fs::mock::MockFileSystem;
use assetflow::fs::FileSystem;
use assetflow::watch::{
    build_group_profiles, content_changed, relative_str, route_change, GroupSender,
    GroupWatchProfile, MemoryHashStore,
};
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn Error>>;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn drain(rx: &mut mpsc::Receiver<ReactorEvent>) -> Vec<String> {
    let mut paths = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ReactorEvent::Triggered { path, .. } = event {
            paths.push(path);
        }
    }
    paths
}

#[test]
fn profile_applies_excludes() -> TestResult {
    let profile = GroupWatchProfile::new(
        "js",
        &strings(&["src/js/**/*.js"]),
        &strings(&["src/js/vendor/**"]),
        false,
    )?;

    assert!(profile.matches("src/js/main.js"));
    assert!(profile.matches("src/js/lib/util.js"));
    assert!(!profile.matches("src/js/vendor/jquery.js"));
    assert!(!profile.matches("src/sass/main.sass"));
    Ok(())
}

#[test]
fn builtin_groups_build_and_unknown_group_fails() -> TestResult {
    let project = load_builtin("/p")?;
    let profiles = build_group_profiles(&project, &strings(&["styles", "images"]))?;
    assert_eq!(profiles[0].name(), "styles");
    assert!(profiles[1].use_hash());

    assert!(build_group_profiles(&project, &strings(&["fonts"])).is_err());
    Ok(())
}

#[test]
fn relative_paths_use_forward_slashes() {
    assert_eq!(
        relative_str(Path::new("/p"), Path::new("/p/src/sass/a.sass")),
        Some("src/sass/a.sass".to_string())
    );
    assert_eq!(relative_str(Path::new("/p"), Path::new("/elsewhere/a.sass")), None);
}

#[test]
fn unchanged_content_is_not_a_change() -> TestResult {
    let fs = MockFileSystem::new();
    let abs = Path::new("/p/src/images/logo.png");
    fs.add_file(abs, b"one".to_vec());
    let mut store = MemoryHashStore::new();

    assert!(content_changed(&mut store, &fs, "images", "src/images/logo.png", abs));
    assert!(!content_changed(&mut store, &fs, "images", "src/images/logo.png", abs));

    fs.add_file(abs, b"two".to_vec());
    assert!(content_changed(&mut store, &fs, "images", "src/images/logo.png", abs));

    // Hashes are tracked per group.
    assert!(content_changed(&mut store, &fs, "styles", "src/images/logo.png", abs));
    assert_eq!(store.len(), 2);

    fs.remove_file(abs)?;
    assert!(content_changed(&mut store, &fs, "images", "src/images/logo.png", abs));
    assert_eq!(store.len(), 1);
    Ok(())
}

#[tokio::test]
async fn changes_reach_only_matching_groups() -> TestResult {
    let fs = MockFileSystem::new();
    let root = Path::new("/p");
    fs.add_file("/p/src/sass/main.sass", b"body\n  color: red\n".to_vec());
    fs.add_file("/p/src/images/logo.png", b"png".to_vec());

    let (styles_tx, mut styles_rx) = mpsc::channel(8);
    let (images_tx, mut images_rx) = mpsc::channel(8);
    let groups = vec![
        GroupSender {
            profile: GroupWatchProfile::new("styles", &strings(&["src/sass/**/*.sass"]), &[], false)?,
            tx: styles_tx,
        },
        GroupSender {
            profile: GroupWatchProfile::new("images", &strings(&["src/images/**/*.png"]), &[], true)?,
            tx: images_tx,
        },
    ];
    let mut store = MemoryHashStore::new();

    for path in ["/p/src/sass/main.sass", "/p/src/images/logo.png", "/p/README.md"] {
        route_change(root, Path::new(path), &groups, &fs, &mut store).await;
    }
    assert_eq!(drain(&mut styles_rx), vec!["src/sass/main.sass"]);
    assert_eq!(drain(&mut images_rx), vec!["src/images/logo.png"]);

    // A save without content change only triggers the non-hashing group.
    route_change(root, Path::new("/p/src/sass/main.sass"), &groups, &fs, &mut store).await;
    route_change(root, Path::new("/p/src/images/logo.png"), &groups, &fs, &mut store).await;
    assert_eq!(drain(&mut styles_rx), vec!["src/sass/main.sass"]);
    assert!(drain(&mut images_rx).is_empty());
    Ok(())
}
