use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Filesystem notification relevant to tailing.
#[derive(Debug)]
pub enum WatchEvent {
    /// Data was written to the named file
    Write(PathBuf),
    /// The named file was created, or moved into the directory
    Create(PathBuf),
    /// The watch backend failed; no further events should be expected
    Error(notify::Error),
}

/// Paths with a `Write` event queued but not yet taken by the consumer.
type PendingWrites = Arc<Mutex<HashSet<PathBuf>>>;

/// Non-recursive watch on one directory, delivered as an ordered async stream.
///
/// At most one `Write` per path is queued at a time: a reader drains the file
/// to EOF, so further writes before it gets there add nothing. `Create` and
/// `Error` events are always queued.
pub struct DirWatcher {
    // Dropping the watcher ends the watch.
    _watcher: Option<RecommendedWatcher>,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    pending: PendingWrites,
}

impl DirWatcher {
    pub fn new(dir: &Path) -> Result<Self, notify::Error> {
        let (tx, events) = mpsc::unbounded_channel();
        let pending = PendingWrites::default();

        let callback_pending = Arc::clone(&pending);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let events = match res {
                Ok(event) => classify(event),
                Err(e) => vec![WatchEvent::Error(e)],
            };

            for event in events {
                if let WatchEvent::Write(path) = &event {
                    if !mark_pending(&callback_pending, path) {
                        continue;
                    }
                }
                // Receiver gone means the tailer is shutting down.
                let _ = tx.send(event);
            }
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: Some(watcher),
            events,
            pending,
        })
    }

    /// Watcher fed by `events` instead of the OS
    #[cfg(test)]
    pub(crate) fn from_channel(events: mpsc::UnboundedReceiver<WatchEvent>) -> Self {
        Self {
            _watcher: None,
            events,
            pending: PendingWrites::default(),
        }
    }

    /// Next event, or `None` once the backend has shut down.
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        let event = self.events.recv().await?;
        if let WatchEvent::Write(path) = &event {
            // Cleared before the caller reads, so later writes queue a new event.
            if let Ok(mut pending) = self.pending.lock() {
                pending.remove(path);
            }
        }
        Some(event)
    }
}

/// True if no `Write` for `path` was queued yet.
fn mark_pending(pending: &PendingWrites, path: &Path) -> bool {
    match pending.lock() {
        Ok(mut pending) => pending.insert(path.to_path_buf()),
        Err(_) => true,
    }
}

fn classify(event: notify::Event) -> Vec<WatchEvent> {
    match event.kind {
        EventKind::Create(_) => event.paths.into_iter().map(WatchEvent::Create).collect(),
        // A file renamed into place counts as created under its new name
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.into_iter().map(WatchEvent::Create).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.into_iter().last().map(WatchEvent::Create).into_iter().collect()
        }
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            event.paths.into_iter().map(WatchEvent::Write).collect()
        }
        _ => Vec::new(),
    }
}
