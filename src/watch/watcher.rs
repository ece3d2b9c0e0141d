// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{ReactorEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::watch::hash::{content_changed, HashStore, MemoryHashStore};
use crate::watch::patterns::{relative_str, GroupWatchProfile};

/// A group's profile together with the channel into its reactor.
#[derive(Debug, Clone)]
pub struct GroupSender {
    pub profile: GroupWatchProfile,
    pub tx: mpsc::Sender<ReactorEvent>,
}

/// Keeps the underlying `RecommendedWatcher` alive. Dropping it stops
/// file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send `ReactorEvent::Triggered` to every
/// group whose patterns match a created, modified or removed file.
///
/// For `use_hash` groups the current contents of every watched file are
/// hashed up front, so only saves that change bytes trigger a reaction.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    groups: Vec<GroupSender>,
    fs: Arc<dyn FileSystem>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let mut hash_store = MemoryHashStore::new();
    seed_hashes(&mut hash_store, fs.as_ref(), &root, &groups);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("assetflow: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("assetflow: file watch error: {err}"),
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    let names: Vec<&str> = groups.iter().map(|g| g.profile.name()).collect();
    info!(root = ?root, groups = ?names, "file watcher started");

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !is_content_event(&event.kind) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in &event.paths {
                route_change(&root, path, &groups, fs.as_ref(), &mut hash_store).await;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn seed_hashes(
    store: &mut dyn HashStore,
    fs: &dyn FileSystem,
    root: &Path,
    groups: &[GroupSender],
) {
    for group in groups.iter().filter(|g| g.profile.use_hash()) {
        let files = match group.profile.collect_matching_files(fs, root) {
            Ok(files) => files,
            Err(err) => {
                warn!(group = group.profile.name(), error = %err, "could not seed content hashes");
                continue;
            }
        };
        for rel in &files {
            content_changed(store, fs, group.profile.name(), rel, &root.join(rel));
        }
        debug!(group = group.profile.name(), files = files.len(), "seeded content hashes");
    }
}

/// Send a trigger to every group interested in `path`.
pub async fn route_change(
    root: &Path,
    path: &Path,
    groups: &[GroupSender],
    fs: &dyn FileSystem,
    hash_store: &mut dyn HashStore,
) {
    let Some(rel) = relative_str(root, path) else {
        warn!("could not relativize path {:?} against root {:?}", path, root);
        return;
    };

    for group in groups.iter().filter(|g| g.profile.matches(&rel)) {
        let name = group.profile.name();
        if group.profile.use_hash() && !content_changed(hash_store, fs, name, &rel, path) {
            info!(group = name, path = %rel, "content unchanged; skipping trigger");
            continue;
        }

        debug!(group = name, path = %rel, "watch match -> triggering group");
        if let Err(err) = group
            .tx
            .send(ReactorEvent::Triggered {
                path: rel.clone(),
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!(group = name, "failed to send trigger: {err}");
        }
    }
}
