//! Defines structured error types for the cpuload reader facade.
//!
//! Construction failures ([`CpuLoadError::Connection`],
//! [`CpuLoadError::Resolution`]) are unrecoverable for that reader instance;
//! a caller must build a fresh reader. Per-query failures
//! ([`CpuLoadError::EmptyPath`], [`CpuLoadError::Open`],
//! [`CpuLoadError::Query`]) leave the reader usable, and the next call may
//! well succeed. None of these are retried here; retry policy belongs to the
//! caller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::netlink::NetlinkError;

#[derive(Debug, Error)]
pub enum CpuLoadError {
    #[error("failed to create netlink connection: {source}")]
    Connection {
        #[source]
        source: io::Error,
    },

    #[error("failed to resolve netlink family id for task stats: {source}")]
    Resolution {
        #[source]
        source: NetlinkError,
    },

    #[error("cgroup path can not be empty")]
    EmptyPath,

    #[error("failed to open cgroup path `{path}`: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cgroup load query failed: {source}")]
    Query {
        #[source]
        source: NetlinkError,
    },

    #[error("reader is closed")]
    Closed,
}
