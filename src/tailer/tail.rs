use crate::config::types::{ReadStart, TailerConfig};
use crate::pipeline::entry::Entry;
use crate::pipeline::sink::{EntrySink, ForwardError};
use crate::tailer::cursor::ActiveFile;
use crate::tailer::watch::{DirWatcher, WatchEvent};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn, Dispatch};

#[derive(Debug, Error)]
pub enum TailerError {
    #[error("cannot watch {}: {source}", .path.display())]
    WatchSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("cannot list {}: {source}", .path.display())]
    ScanDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("cannot open {}: {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("downstream rejected entry: {0}")]
    Forward(#[from] ForwardError),

    #[error("filesystem watch failed: {0}")]
    Watch(notify::Error),

    #[error("filesystem watch closed unexpectedly")]
    WatchClosed,
}

pub struct TailerBuilder {
    config: TailerConfig,
    sink: Arc<dyn EntrySink>,
    logger: Dispatch,
}

impl TailerBuilder {
    pub fn logger(mut self, logger: Dispatch) -> Self {
        self.logger = logger;
        self
    }

    /// Watch the scrape directory and open the first matching file, if any.
    ///
    /// Fails if the directory cannot be watched or listed. Finding no
    /// matching file is not an error; the tailer waits for one to be created.
    pub fn start(self) -> Result<Tailer, TailerError> {
        let logger = self.logger;
        let config = self.config;
        let sink = self.sink;

        tracing::dispatcher::with_default(&logger, || -> Result<Tailer, TailerError> {
            let pattern = Regex::new(&config.file_pattern)?;
            let dir = config.scrape_path.clone();

            let watcher = DirWatcher::new(&dir).map_err(|source| TailerError::WatchSetup {
                path: dir.clone(),
                source,
            })?;

            let active = open_startup_file(&dir, &pattern, config.start)?;
            match &active {
                Some(file) => info!(
                    path = %file.path().display(),
                    offset = file.offset(),
                    "Tailing file"
                ),
                None => info!(
                    dir = %dir.display(),
                    pattern = %pattern,
                    "No matching file yet, waiting for one to be created"
                ),
            }

            Ok(Tailer {
                pattern,
                watcher,
                active,
                sink,
                logger: logger.clone(),
            })
        })
    }
}

/// Follows one log file in a directory, switching to newly created files
/// that match the pattern.
pub struct Tailer {
    pattern: Regex,
    watcher: DirWatcher,
    active: Option<ActiveFile>,
    sink: Arc<dyn EntrySink>,
    logger: Dispatch,
}

impl Tailer {
    pub fn builder(config: TailerConfig, sink: Arc<dyn EntrySink>) -> TailerBuilder {
        TailerBuilder {
            config,
            sink,
            logger: Dispatch::none(),
        }
    }

    /// Path of the file currently being tailed.
    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|file| file.path())
    }

    /// Process filesystem events until `cancel` fires or a fatal error occurs.
    ///
    /// Cancellation returns `Ok(())`, including while waiting on a full
    /// downstream queue. Lines read but not yet forwarded at that point are lost.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), TailerError> {
        let logger = self.logger.clone();
        self.event_loop(cancel).with_subscriber(logger).await
    }

    async fn event_loop(mut self, cancel: CancellationToken) -> Result<(), TailerError> {
        loop {
            let event = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Tailer stopped");
                    return Ok(());
                }

                event = self.watcher.next_event() => event,
            };

            match event {
                Some(WatchEvent::Write(path)) => {
                    let lines = match self.active.as_mut() {
                        Some(file) if file.is_same_file(&path) => {
                            file.read_lines().map_err(|source| TailerError::Read {
                                path: file.path().to_path_buf(),
                                source,
                            })?
                        }
                        _ => continue,
                    };

                    if !lines.is_empty() {
                        debug!(lines = lines.len(), "Read lines");
                    }

                    for line in lines {
                        tokio::select! {
                            biased;

                            _ = cancel.cancelled() => {
                                info!("Tailer stopped while forwarding");
                                return Ok(());
                            }

                            forwarded = self.sink.forward(Entry::new(line)) => forwarded?,
                        }
                    }
                }
                Some(WatchEvent::Create(path)) => self.switch_to(path),
                Some(WatchEvent::Error(e)) => return Err(TailerError::Watch(e)),
                None => return Err(TailerError::WatchClosed),
            }
        }
    }

    /// Replace the active file with a newly created one, read from offset 0.
    fn switch_to(&mut self, path: PathBuf) {
        if !matches_pattern(&self.pattern, &path) {
            return;
        }

        // A rename can be reported twice; keep the cursor if nothing changed.
        if self.active.as_ref().is_some_and(|file| file.is_open_at(&path)) {
            debug!(path = %path.display(), "Already tailing file");
            return;
        }

        // Closes the old handle and drops its partial line.
        if let Some(old) = self.active.take() {
            info!(
                from = %old.path().display(),
                to = %path.display(),
                "Switching to new file"
            );
        }

        match ActiveFile::open(&path, ReadStart::Beginning) {
            Ok(file) => {
                info!(path = %path.display(), "Tailing file");
                self.active = Some(file);
            }
            Err(source) => {
                let err = TailerError::FileOpen { path, source };
                warn!(error = %err, "Waiting for next matching file");
            }
        }
    }
}

fn matches_pattern(pattern: &Regex, path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| pattern.is_match(name))
}

/// First matching regular file in name order that can be opened.
fn open_startup_file(
    dir: &Path,
    pattern: &Regex,
    start: ReadStart,
) -> Result<Option<ActiveFile>, TailerError> {
    let scan_err = |source| TailerError::ScanDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(scan_err)? {
        let path = entry.map_err(scan_err)?.path();
        if path.is_file() && matches_pattern(pattern, &path) {
            candidates.push(path);
        }
    }
    candidates.sort();

    for path in candidates {
        match ActiveFile::open(&path, start) {
            Ok(file) => return Ok(Some(file)),
            Err(source) => {
                let err = TailerError::FileOpen { path, source };
                warn!(error = %err, "Skipping file");
            }
        }
    }

    Ok(None)
}
