use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, TryRecvError},
    time::{Duration, Instant},
};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::filter::{looks_binary, ActivityFilter};
use super::{ActivitySnapshot, ActivitySource, SourceKind};
use crate::error::{FocusError, FocusResult};
use crate::utils::text::tail_chars;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub const EXCERPT_CHARS: usize = 500;
pub const MAX_EXCERPTS: usize = 5;
const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);
/// A batch is flushed after this many debounce windows even while events keep arriving.
const MAX_BATCH_WINDOWS: u32 = 5;
/// Worst case UTF-8 width, so the tail read always covers `EXCERPT_CHARS`.
const TAIL_BYTES: u64 = (EXCERPT_CHARS as u64) * 4;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Touch {
    path: PathBuf,
    removed: bool,
}

#[derive(Debug, Default)]
struct PendingBatch {
    touches: Vec<Touch>,
    opened_at: Option<Instant>,
    last_event_at: Option<Instant>,
}

impl PendingBatch {
    fn touch(&mut self, path: PathBuf, removed: bool, now: Instant) {
        match self.touches.iter_mut().find(|t| t.path == path) {
            Some(existing) => existing.removed = removed,
            None => self.touches.push(Touch { path, removed }),
        }
        self.opened_at.get_or_insert(now);
        self.last_event_at = Some(now);
    }

    fn is_ready(&self, now: Instant, debounce: Duration) -> bool {
        let (Some(opened), Some(last)) = (self.opened_at, self.last_event_at) else {
            return false;
        };
        now.duration_since(last) >= debounce
            || now.duration_since(opened) >= debounce * MAX_BATCH_WINDOWS
    }

    fn take(&mut self) -> Vec<Touch> {
        self.opened_at = None;
        self.last_event_at = None;
        std::mem::take(&mut self.touches)
    }
}

/// Watches a directory tree and turns bursts of file events into snapshots.
pub struct FileWatchSource {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    events: Receiver<notify::Result<Event>>,
    filter: ActivityFilter,
    debounce: Duration,
    pending: PendingBatch,
}

impl FileWatchSource {
    pub fn new(root: impl AsRef<Path>) -> FocusResult<Self> {
        Self::with_debounce(root, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(root: impl AsRef<Path>, debounce: Duration) -> FocusResult<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(FocusError::configuration(format!(
                "watch root {} does not exist or is not a directory",
                root.display()
            )));
        }
        let root = root.canonicalize().map_err(|err| {
            FocusError::configuration(format!("cannot resolve {}: {err}", root.display()))
        })?;
        let filter = ActivityFilter::new()?;

        let (event_tx, event_rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Fails only after the source has been dropped.
            let _ = event_tx.send(res);
        })
        .map_err(|err| FocusError::configuration(format!("cannot create file watcher: {err}")))?;

        if let Err(err) = watcher.watch(&root, RecursiveMode::Recursive) {
            drop(watcher);
            return Err(FocusError::configuration(format!(
                "cannot watch {}: {err}",
                root.display()
            )));
        }

        log_info!("Watching {} for activity", root.display());

        Ok(Self {
            root,
            watcher: Some(watcher),
            events: event_rx,
            filter,
            debounce,
            pending: PendingBatch::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    fn drain_events(&mut self) {
        let now = Instant::now();
        loop {
            match self.events.try_recv() {
                Ok(Ok(event)) => self.absorb(event, now),
                Ok(Err(err)) => log_warn!("file watcher error: {err}"),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.watcher.is_some() {
                        log_warn!("file watcher channel disconnected");
                    }
                    break;
                }
            }
        }
    }

    fn absorb(&mut self, event: Event, now: Instant) {
        let removed = match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => false,
            EventKind::Remove(_) => true,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => return,
        };

        for path in event.paths {
            let relative = self.relative(&path).to_path_buf();
            if !self.filter.accepts(&relative) {
                continue;
            }
            log_debug!("activity: {} (removed: {removed})", relative.display());
            self.pending.touch(path, removed, now);
        }
    }
}

#[async_trait]
impl ActivitySource for FileWatchSource {
    fn kind(&self) -> SourceKind {
        SourceKind::FileDiff
    }

    async fn capture(&mut self) -> FocusResult<Option<ActivitySnapshot>> {
        if self.watcher.is_none() {
            return Ok(None);
        }

        self.drain_events();
        if !self.pending.is_ready(Instant::now(), self.debounce) {
            return Ok(None);
        }

        let touches = self.pending.take();
        let root = self.root.clone();
        let touched_paths: Vec<PathBuf> = touches
            .iter()
            .map(|t| t.path.strip_prefix(&root).unwrap_or(&t.path).to_path_buf())
            .collect();

        let content = tokio::task::spawn_blocking(move || render_excerpts(&root, &touches))
            .await
            .context("excerpt reader task failed")?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(ActivitySnapshot {
            source_kind: SourceKind::FileDiff,
            content,
            touched_paths,
            timestamp: Utc::now(),
        }))
    }

    fn close(&mut self) {
        if self.watcher.take().is_some() {
            self.pending.take();
            log_info!("Stopped watching {}", self.root.display());
        }
    }
}

impl Drop for FileWatchSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Excerpts for the most recently touched files, in first-touch order.
fn render_excerpts(root: &Path, touches: &[Touch]) -> String {
    let start = touches.len().saturating_sub(MAX_EXCERPTS);
    let mut sections = Vec::new();

    for touch in &touches[start..] {
        let display = touch.path.strip_prefix(root).unwrap_or(&touch.path);
        if touch.removed || !touch.path.exists() {
            if touch.removed {
                sections.push(format!("deleted: {}", display.display()));
            }
            continue;
        }

        match read_tail(&touch.path) {
            Ok(Some(excerpt)) => {
                sections.push(format!("== {} ==\n{}", display.display(), excerpt));
            }
            Ok(None) => {}
            Err(err) => log_debug!("skipping {}: {err}", display.display()),
        }
    }

    sections.join("\n\n")
}

/// Last `EXCERPT_CHARS` characters of a text file; `None` for binary content.
fn read_tail(path: &Path) -> std::io::Result<Option<String>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let offset = len.saturating_sub(TAIL_BYTES);
    file.seek(SeekFrom::Start(offset))?;

    let mut bytes = Vec::with_capacity((len - offset) as usize);
    file.read_to_end(&mut bytes)?;
    if looks_binary(&bytes) {
        return Ok(None);
    }

    let text = String::from_utf8_lossy(&bytes);
    // A seek into the middle of a multi-byte char leaves a replacement char up front.
    let text = if offset > 0 {
        text.trim_start_matches('\u{FFFD}')
    } else {
        text.as_ref()
    };
    Ok(Some(tail_chars(text, EXCERPT_CHARS).to_string()))
}
