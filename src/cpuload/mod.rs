//! Per-cgroup CPU load snapshots via the kernel's taskstats facility.
//!
//! [`CpuLoadReader`] is the facade over the netlink protocol stack: it owns
//! one [`Connection`], resolves the dynamic taskstats family id once at
//! construction, and then answers [`get_load`](CpuLoadReader::get_load)
//! calls for arbitrary cgroup paths until it is closed.
//!
//! # Usage
//!
//! ```no_run
//! use cgload::cpuload::CpuLoadReader;
//!
//! let mut reader = CpuLoadReader::new()?;
//! let stats = reader.get_load("/sys/fs/cgroup/cpu/mygroup")?;
//! println!("running: {}", stats.nr_running);
//! reader.close();
//! # Ok::<(), cgload::cpuload::CpuLoadError>(())
//! ```
//!
//! # Concurrency
//!
//! A reader is strictly sequential: one request in flight on its connection,
//! enforced by `&mut self`. Callers wanting concurrent collection use one
//! reader per worker or serialize access themselves.
//!
//! # Platform requirements
//!
//! - Linux with `CONFIG_TASKSTATS`.
//! - Privileges to open a `NETLINK_GENERIC` socket and the queried cgroup
//!   directories.

pub mod error;

use std::fmt;
use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::Path;

use crate::netlink::{Connection, NetlinkChannel, query_load_stats, resolve_family_id};

pub use crate::netlink::LoadStats;
pub use error::CpuLoadError;

/// Optional hook invoked after each major reader step.
///
/// Meant for diagnostics that want more structure than the log stream, e.g.
/// an agent recording which family id a session resolved or sampling decoded
/// snapshots. All methods default to no-ops.
pub trait LoadObserver {
    /// The taskstats family id this reader resolved and cached.
    fn family_resolved(&self, family_id: u16) {
        let _ = family_id;
    }

    /// A snapshot was decoded for `path`.
    fn load_collected(&self, path: &Path, stats: &LoadStats) {
        let _ = (path, stats);
    }
}

/// Reads instantaneous task-state counters for individual cgroups.
///
/// Owns the netlink connection and the family id for its whole lifetime.
/// The family id is resolved exactly once, at construction, and never
/// re-resolved: should the kernel drop the family mid-session (module
/// reload), subsequent queries fail with [`CpuLoadError::Query`] until the
/// reader is rebuilt.
pub struct CpuLoadReader<C: NetlinkChannel = Connection> {
    family_id: u16,
    channel: Option<C>,
    observer: Option<Box<dyn LoadObserver>>,
}

// Manual impl: the boxed observer has no Debug representation.
impl<C: NetlinkChannel + fmt::Debug> fmt::Debug for CpuLoadReader<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuLoadReader")
            .field("family_id", &self.family_id)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl CpuLoadReader<Connection> {
    /// Opens a netlink connection and resolves the taskstats family id.
    ///
    /// # Errors
    ///
    /// [`CpuLoadError::Connection`] if the socket cannot be created or
    /// bound; [`CpuLoadError::Resolution`] if the family lookup fails, in
    /// which case the just-opened socket is released again.
    pub fn new() -> Result<Self, CpuLoadError> {
        let conn = Connection::open().map_err(|source| CpuLoadError::Connection { source })?;
        Self::from_channel(conn)
    }
}

impl<C: NetlinkChannel> CpuLoadReader<C> {
    /// Builds a reader over an already-open channel.
    ///
    /// Performs the one-time family resolution; on failure the channel is
    /// dropped. This is also the seam the tests drive a scripted channel
    /// through.
    pub fn from_channel(mut channel: C) -> Result<Self, CpuLoadError> {
        let family_id = resolve_family_id(&mut channel)
            .map_err(|source| CpuLoadError::Resolution { source })?;
        log::debug!("resolved netlink family id {family_id} for taskstats");
        Ok(Self {
            family_id,
            channel: Some(channel),
            observer: None,
        })
    }

    /// Installs an observer, notifying it of the already-cached family id.
    pub fn with_observer(mut self, observer: Box<dyn LoadObserver>) -> Self {
        observer.family_resolved(self.family_id);
        self.observer = Some(observer);
        self
    }

    /// The cached taskstats family id, for diagnostics.
    pub fn family_id(&self) -> u16 {
        self.family_id
    }

    /// Fetches the instantaneous task-state counters for the cgroup at
    /// `path`.
    ///
    /// `path` is an absolute path of a cgroup directory in the
    /// CPU-accounting hierarchy. The directory is opened for the duration of
    /// the call and released on every exit path. The returned snapshot is
    /// non-hierarchical; callers derive rates by differencing snapshots over
    /// time.
    ///
    /// # Errors
    ///
    /// - [`CpuLoadError::Closed`] after [`close`](Self::close).
    /// - [`CpuLoadError::EmptyPath`] for an empty path, before any I/O.
    /// - [`CpuLoadError::Open`] if the directory cannot be opened.
    /// - [`CpuLoadError::Query`] for any failure of the netlink exchange or
    ///   reply decode. The reader stays usable afterwards.
    pub fn get_load(&mut self, path: impl AsRef<Path>) -> Result<LoadStats, CpuLoadError> {
        let path = path.as_ref();
        let channel = self.channel.as_mut().ok_or(CpuLoadError::Closed)?;
        if path.as_os_str().is_empty() {
            return Err(CpuLoadError::EmptyPath);
        }

        let cgroup_dir = File::open(path).map_err(|source| CpuLoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let stats = query_load_stats(channel, self.family_id, cgroup_dir.as_raw_fd())
            .map_err(|source| CpuLoadError::Query { source })?;
        drop(cgroup_dir);

        log::trace!("task stats for `{}`: {:?}", path.display(), stats);
        if let Some(observer) = &self.observer {
            observer.load_collected(path, &stats);
        }
        Ok(stats)
    }

    /// Releases the netlink connection.
    ///
    /// Idempotent; any later [`get_load`](Self::get_load) fails with
    /// [`CpuLoadError::Closed`].
    pub fn close(&mut self) {
        self.channel = None;
    }
}
