//! cgload: per-cgroup CPU load snapshots read straight from the kernel.
//!
//! This library asks the kernel's taskstats facility, over generic netlink,
//! how many tasks of a single cgroup are currently running, sleeping,
//! stopped, uninterruptible, or waiting on I/O. A resource-monitoring agent
//! polls these snapshots and differences them over time to derive CPU load
//! per container.
//!
//! The netlink protocol — session management, dynamic family-id resolution,
//! attribute-framed request/reply encoding — is implemented by hand in
//! [`netlink`]; [`cpuload`] provides the [`CpuLoadReader`] facade on top.
//!
//! Each query is a single best-effort round trip: no retries, no caching of
//! results, no hierarchical aggregation. Anything beyond the snapshot
//! (polling cadence, cgroup discovery, rate computation, export) belongs to
//! the caller.

pub mod cpuload;
pub mod netlink;

pub use cpuload::{CpuLoadError, CpuLoadReader, LoadObserver, LoadStats};
