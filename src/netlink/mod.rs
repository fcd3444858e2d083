//! Generic netlink plumbing for the kernel's taskstats facility.
//!
//! This module implements the full protocol stack the cpuload reader sits
//! on, without any netlink library: only the socket syscalls go through
//! `libc`, everything on the wire is assembled and taken apart by hand.
//!
//! # Layers
//!
//! - [`connection`] — Socket lifecycle and the [`NetlinkChannel`] seam used
//!   by everything above it.
//! - [`message`] — `nlmsghdr`/`genlmsghdr`/`nlattr` framing: request
//!   building, reply validation, attribute walking.
//! - [`family`] — Control-plane lookup of the dynamic `TASKSTATS` family id.
//! - [`stats`] — Data-plane `CGROUPSTATS_CMD_GET` query and the fixed-layout
//!   [`LoadStats`] decode.
//!
//! # Protocol shape
//!
//! Every exchange is one request followed by exactly one reply on a single
//! blocking socket. The family id is dynamic per running kernel and must be
//! resolved through the controller before any stats request can be
//! addressed; the stats reply carries one type-tagged attribute holding the
//! kernel's `struct cgroupstats` verbatim.

pub mod connection;
pub mod error;
pub mod family;
pub mod message;
pub mod stats;

pub use connection::{Connection, NetlinkChannel};
pub use error::NetlinkError;
pub use family::{TASKSTATS_GENL_NAME, resolve_family_id};
pub use stats::{LoadStats, query_load_stats};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted channel and reply builders shared by the protocol and
    //! facade tests.

    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::connection::NetlinkChannel;
    use super::error::NetlinkError;
    use super::message::{GENL_HDRLEN, GENL_VERSION, NLA_HDRLEN, NLMSG_ERROR, NLMSG_HDRLEN, nla_align};

    /// Records every request and replays queued replies in order.
    #[derive(Debug, Default)]
    pub struct MockChannel {
        replies: VecDeque<Result<Vec<u8>, NetlinkError>>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        seq: u32,
    }

    impl MockChannel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_reply(&mut self, reply: Vec<u8>) {
            self.replies.push_back(Ok(reply));
        }

        pub fn push_channel_error(&mut self, err: NetlinkError) {
            self.replies.push_back(Err(err));
        }

        /// Shared handle onto the request log, usable after the channel has
        /// been moved into a reader.
        pub fn sent_log(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
            Arc::clone(&self.sent)
        }
    }

    impl NetlinkChannel for MockChannel {
        fn next_seq(&mut self) -> u32 {
            self.seq = self.seq.wrapping_add(1);
            self.seq
        }

        fn send(&mut self, msg: &[u8]) -> Result<(), NetlinkError> {
            self.sent.lock().unwrap().push(msg.to_vec());
            Ok(())
        }

        fn receive(&mut self) -> Result<Vec<u8>, NetlinkError> {
            self.replies.pop_front().unwrap_or_else(|| {
                Err(NetlinkError::Receive {
                    source: io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted reply left"),
                })
            })
        }
    }

    /// Builds a well-formed generic netlink reply carrying `attrs`.
    pub fn encode_reply(msg_type: u16, attrs: &[(u16, Vec<u8>)]) -> Vec<u8> {
        let mut attr_buf = Vec::new();
        for (attr_type, payload) in attrs {
            let attr_len = (NLA_HDRLEN + payload.len()) as u16;
            attr_buf.extend_from_slice(&attr_len.to_ne_bytes());
            attr_buf.extend_from_slice(&attr_type.to_ne_bytes());
            attr_buf.extend_from_slice(payload);
            attr_buf.resize(attr_buf.len() + nla_align(payload.len()) - payload.len(), 0);
        }

        let total = NLMSG_HDRLEN + GENL_HDRLEN + attr_buf.len();
        let mut buf = Vec::with_capacity(total);
        buf.extend_from_slice(&(total as u32).to_ne_bytes());
        buf.extend_from_slice(&msg_type.to_ne_bytes());
        buf.extend_from_slice(&0u16.to_ne_bytes());
        buf.extend_from_slice(&0u32.to_ne_bytes());
        buf.extend_from_slice(&0u32.to_ne_bytes());
        buf.push(0);
        buf.push(GENL_VERSION);
        buf.extend_from_slice(&0u16.to_ne_bytes());
        buf.extend_from_slice(&attr_buf);
        buf
    }

    /// Builds an `NLMSG_ERROR` reply for the given errno.
    pub fn error_reply(errno: i32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(NLMSG_HDRLEN + 4);
        buf.extend_from_slice(&((NLMSG_HDRLEN + 4) as u32).to_ne_bytes());
        buf.extend_from_slice(&NLMSG_ERROR.to_ne_bytes());
        buf.extend_from_slice(&0u16.to_ne_bytes());
        buf.extend_from_slice(&0u32.to_ne_bytes());
        buf.extend_from_slice(&0u32.to_ne_bytes());
        buf.extend_from_slice(&(-errno).to_ne_bytes());
        buf
    }

    /// Serializes five counters the way `struct cgroupstats` lays them out.
    pub fn cgroupstats_payload(
        sleeping: u64,
        running: u64,
        stopped: u64,
        uninterruptible: u64,
        io_wait: u64,
    ) -> Vec<u8> {
        let mut payload = Vec::with_capacity(40);
        for counter in [sleeping, running, stopped, uninterruptible, io_wait] {
            payload.extend_from_slice(&counter.to_ne_bytes());
        }
        payload
    }
}
