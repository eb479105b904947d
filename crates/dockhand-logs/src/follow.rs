//! Live follow: fan out newly appended lines to subscribers
//!
//! One follower task per active file path, created lazily on first
//! subscribe and torn down on last cancel. The task watches the file's
//! parent directory (so rename+recreate rotations stay visible), reads
//! appended bytes on each wake, and delivers complete lines to every
//! subscriber whose substring filter matches.
//!
//! Delivery is non-blocking: each subscriber owns a bounded queue; on
//! overflow the oldest queued line is dropped and the subscriber's
//! overflow counter incremented.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use dockhand_core::constants::{FOLLOW_POLL_MS, SUBSCRIBER_QUEUE_CAP, WATCHER_RETRY_LIMIT};

/// Process-wide map from canonical file path to its follower.
///
/// Creation and destruction of followers is serialized under the registry
/// mutex; subscriber sets are guarded by each follower's own mutex.
#[derive(Clone, Default)]
pub struct FollowerRegistry {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<Follower>>>>,
}

struct Follower {
    path: PathBuf,
    subscribers: Mutex<Vec<Arc<SubscriberShared>>>,
    next_id: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct SubscriberShared {
    id: u64,
    filter: String,
    queue: Mutex<VecDeque<String>>,
    notify: Notify,
    overflow: AtomicU64,
    closed: AtomicBool,
}

/// One live-follow subscriber. Dropping it cancels the subscription.
pub struct Subscription {
    registry: FollowerRegistry,
    follower: Arc<Follower>,
    shared: Arc<SubscriberShared>,
    cancelled: AtomicBool,
}

impl FollowerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to lines appended to `path` from this moment on.
    ///
    /// The first subscriber spawns the follower task; later subscribers
    /// share it and receive lines from the current append position.
    pub fn subscribe(&self, path: &Path, filter: impl Into<String>) -> Subscription {
        let key = canonical_key(path);

        let mut map = self.inner.lock();
        let follower = match map.get(&key) {
            Some(existing) => Arc::clone(existing),
            None => {
                let follower = Arc::new(Follower {
                    path: key.clone(),
                    subscribers: Mutex::new(Vec::new()),
                    next_id: AtomicU64::new(1),
                    task: Mutex::new(None),
                });
                // snapshot the append position before returning so lines
                // written after subscribe() are never skipped
                let start = TailState::at_current_end(&follower.path);
                let handle = tokio::spawn(run_follower(
                    Arc::clone(&follower),
                    self.clone(),
                    start,
                ));
                *follower.task.lock() = Some(handle);
                map.insert(key.clone(), Arc::clone(&follower));
                info!("follower started for {}", follower.path.display());
                follower
            }
        };

        let shared = Arc::new(SubscriberShared {
            id: follower.next_id.fetch_add(1, Ordering::Relaxed),
            filter: filter.into(),
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            overflow: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });
        follower.subscribers.lock().push(Arc::clone(&shared));

        Subscription {
            registry: self.clone(),
            follower,
            shared,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Cancel every follower and close all subscribers.
    pub fn shutdown(&self) {
        let mut map = self.inner.lock();
        for (_, follower) in map.drain() {
            close_subscribers(&follower);
            if let Some(handle) = follower.task.lock().take() {
                handle.abort();
            }
        }
    }

    /// Number of live followers, for teardown assertions
    pub fn follower_count(&self) -> usize {
        self.inner.lock().len()
    }

    /// Drop the follower from the map if it is still the registered one.
    fn deregister(&self, follower: &Arc<Follower>) {
        let mut map = self.inner.lock();
        let registered = map
            .get(&follower.path)
            .map(|f| Arc::ptr_eq(f, follower))
            .unwrap_or(false);
        if registered {
            map.remove(&follower.path);
        }
    }
}

impl Subscription {
    /// Receive the next matching line; `None` once the subscription closed.
    pub async fn recv(&self) -> Option<String> {
        loop {
            if let Some(line) = self.shared.queue.lock().pop_front() {
                return Some(line);
            }
            if self.shared.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.shared.notify.notified().await;
        }
    }

    /// Lines dropped from this subscriber's queue due to overflow
    pub fn overflow(&self) -> u64 {
        self.shared.overflow.load(Ordering::Relaxed)
    }

    /// Stop delivery. Idempotent; once this returns no further lines are
    /// queued. The follower is torn down with its last subscriber.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut map = self.registry.inner.lock();
        let now_empty = {
            let mut subs = self.follower.subscribers.lock();
            subs.retain(|s| s.id != self.shared.id);
            subs.is_empty()
        };
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.notify.notify_one();

        if now_empty {
            let registered = map
                .get(&self.follower.path)
                .map(|f| Arc::ptr_eq(f, &self.follower))
                .unwrap_or(false);
            if registered {
                map.remove(&self.follower.path);
            }
            if let Some(handle) = self.follower.task.lock().take() {
                handle.abort();
            }
            info!("follower stopped for {}", self.follower.path.display());
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Key followers by the canonicalized parent plus file name, so differently
/// spelled paths to one file share a follower. The file itself may not
/// exist yet.
fn canonical_key(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Tail position within the followed file
struct TailState {
    offset: u64,
    inode: Option<u64>,
    partial: Vec<u8>,
}

impl TailState {
    /// Snapshot the current end of file as the starting position
    fn at_current_end(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) => Self {
                offset: meta.len(),
                inode: Some(inode_of(&meta)),
                partial: Vec::new(),
            },
            Err(_) => Self {
                offset: 0,
                inode: None,
                partial: Vec::new(),
            },
        }
    }
}

#[cfg(unix)]
fn inode_of(meta: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn inode_of(_meta: &fs::Metadata) -> u64 {
    0
}

async fn run_follower(follower: Arc<Follower>, registry: FollowerRegistry, mut state: TailState) {
    let Some((_watcher, mut events)) = establish_watcher(&follower).await else {
        registry.deregister(&follower);
        close_subscribers(&follower);
        return;
    };

    // the watcher channel wakes us on directory activity; the poll tick
    // covers filesystems where no events arrive
    let mut watcher_alive = true;
    loop {
        if watcher_alive {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        // drain coalesced events so one wake absorbs a burst
                        Some(()) => while events.try_recv().is_ok() {},
                        None => watcher_alive = false,
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(FOLLOW_POLL_MS)) => {}
            }
        } else {
            tokio::time::sleep(Duration::from_millis(FOLLOW_POLL_MS)).await;
        }
        if let Err(e) = poll_file(&follower, &mut state) {
            debug!("follow poll error on {}: {}", follower.path.display(), e);
        }
    }
}

/// Create the directory watcher, retrying transient failures a bounded
/// number of times before giving up.
async fn establish_watcher(
    follower: &Follower,
) -> Option<(RecommendedWatcher, mpsc::Receiver<()>)> {
    let dir = follower
        .path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    for attempt in 1..=WATCHER_RETRY_LIMIT {
        let (tx, rx) = mpsc::channel::<()>(8);
        let created = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if res.is_ok() {
                let _ = tx.try_send(());
            }
        })
        .and_then(|mut watcher| {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            Ok(watcher)
        });

        match created {
            Ok(watcher) => return Some((watcher, rx)),
            Err(e) => {
                warn!(
                    "failed to watch {} (attempt {}/{}): {}",
                    dir.display(),
                    attempt,
                    WATCHER_RETRY_LIMIT,
                    e
                );
                tokio::time::sleep(Duration::from_millis(FOLLOW_POLL_MS)).await;
            }
        }
    }
    None
}

/// Read newly appended bytes and deliver complete lines.
///
/// An inode change or a size below the last offset means the file was
/// rotated or truncated: the offset resets to the new head without
/// disturbing subscribers.
fn poll_file(follower: &Follower, state: &mut TailState) -> std::io::Result<()> {
    let meta = match fs::metadata(&follower.path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // rotation in progress; pick the new file up from its head
            state.offset = 0;
            state.inode = None;
            state.partial.clear();
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let inode = inode_of(&meta);
    if state.inode.map_or(false, |prev| prev != inode) || meta.len() < state.offset {
        debug!("rotation detected on {}", follower.path.display());
        state.offset = 0;
        state.partial.clear();
    }
    state.inode = Some(inode);

    if meta.len() == state.offset {
        return Ok(());
    }

    let mut file = File::open(&follower.path)?;
    file.seek(SeekFrom::Start(state.offset))?;
    let mut appended = Vec::new();
    file.read_to_end(&mut appended)?;
    state.offset += appended.len() as u64;
    state.partial.extend_from_slice(&appended);

    // deliver complete lines; the trailing partial waits for its newline
    while let Some(nl) = state.partial.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = state.partial.drain(..=nl).collect();
        let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
        if !line.is_empty() {
            deliver(follower, &line);
        }
    }
    Ok(())
}

fn deliver(follower: &Follower, line: &str) {
    let subs = follower.subscribers.lock();
    for sub in subs.iter() {
        if !sub.filter.is_empty() && !line.contains(&sub.filter) {
            continue;
        }
        {
            let mut queue = sub.queue.lock();
            if queue.len() >= SUBSCRIBER_QUEUE_CAP {
                queue.pop_front();
                sub.overflow.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(line.to_string());
        }
        sub.notify.notify_one();
    }
}

fn close_subscribers(follower: &Follower) {
    let mut subs = follower.subscribers.lock();
    for sub in subs.drain(..) {
        sub.closed.store(true, Ordering::SeqCst);
        sub.notify.notify_one();
    }
}
