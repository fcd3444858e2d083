//! Defines structured error types for the generic netlink protocol layer.
//!
//! This module provides the [`NetlinkError`] enum, which covers every failure
//! mode of a single request/reply exchange: socket I/O, kernel-reported
//! errors, and malformed or truncated reply framing.
//!
//! # Error Types
//!
//! - [`NetlinkError::Send`] / [`NetlinkError::Receive`] — Wrap underlying socket I/O errors.
//! - [`NetlinkError::ShortSend`] — A request was only partially written to the socket.
//! - [`NetlinkError::Kernel`] — The kernel answered with an `NLMSG_ERROR` message.
//! - [`NetlinkError::TruncatedReply`] — A reply is shorter than its headers claim.
//! - [`NetlinkError::MalformedAttribute`] — An attribute header contradicts the buffer bounds.
//! - [`NetlinkError::MissingAttribute`] — A required attribute is absent from the reply.
//! - [`NetlinkError::FamilyNotRegistered`] — The queried family is unknown to the running kernel.
//! - [`NetlinkError::TruncatedStats`] — The statistics payload is shorter than the fixed record.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetlinkError {
    #[error("failed to send netlink request: {source}")]
    Send {
        #[source]
        source: io::Error,
    },

    #[error("short send on netlink socket: wrote {written} of {expected} bytes")]
    ShortSend { written: usize, expected: usize },

    #[error("failed to receive netlink reply: {source}")]
    Receive {
        #[source]
        source: io::Error,
    },

    #[error("kernel replied with error code {errno}")]
    Kernel { errno: i32 },

    #[error("netlink reply truncated: need {expected} bytes, got {actual}")]
    TruncatedReply { expected: usize, actual: usize },

    #[error("malformed netlink attribute: header claims {len} bytes with {remaining} remaining")]
    MalformedAttribute { len: usize, remaining: usize },

    #[error("netlink reply is missing required attribute type {attr_type}")]
    MissingAttribute { attr_type: u16 },

    #[error("generic netlink family `{name}` is not registered with the running kernel")]
    FamilyNotRegistered { name: &'static str },

    #[error("cgroup statistics payload truncated: need {expected} bytes, got {actual}")]
    TruncatedStats { expected: usize, actual: usize },
}
