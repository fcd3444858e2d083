//! Hand-rolled generic netlink wire format.
//!
//! Every message this crate exchanges with the kernel is framed as
//! `nlmsghdr` + `genlmsghdr` + a flat list of `nlattr` attributes. There is
//! deliberately no netlink library underneath: requests are assembled with
//! [`NetlinkMessage`] and replies are taken apart with [`parse_genl_reply`]
//! and [`AttrIter`].
//!
//! # Wire assumptions
//!
//! - All integer fields are host-endian, as netlink requires.
//! - Attribute payloads are padded to a 4-byte boundary; the padding is not
//!   counted in the attribute's own length field.
//! - A reply whose `nlmsghdr` type is [`NLMSG_ERROR`] carries the negated
//!   errno as the first four payload bytes.

use super::error::NetlinkError;

/// Length of `struct nlmsghdr`.
pub const NLMSG_HDRLEN: usize = 16;
/// Length of `struct genlmsghdr`.
pub const GENL_HDRLEN: usize = 4;
/// Length of `struct nlattr`.
pub const NLA_HDRLEN: usize = 4;
/// Attribute payloads are padded to this boundary.
pub const NLA_ALIGNTO: usize = 4;

/// Message type of an error/ack reply.
pub const NLMSG_ERROR: u16 = 0x2;
/// Flag carried by every request.
pub const NLM_F_REQUEST: u16 = 0x1;

/// Fixed message type of the generic netlink controller.
pub const GENL_ID_CTRL: u16 = 0x10;
/// Controller command: look a family up by name.
pub const CTRL_CMD_GETFAMILY: u8 = 3;
pub const CTRL_ATTR_FAMILY_ID: u16 = 1;
pub const CTRL_ATTR_FAMILY_NAME: u16 = 2;

/// Generic netlink header version used for all requests.
pub const GENL_VERSION: u8 = 0x1;

pub(crate) fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

pub(crate) fn read_u16(buf: &[u8]) -> u16 {
    u16::from_ne_bytes([buf[0], buf[1]])
}

pub(crate) fn read_u32(buf: &[u8]) -> u32 {
    u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]])
}

pub(crate) fn read_u64(buf: &[u8]) -> u64 {
    u64::from_ne_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

/// A generic netlink request under construction.
///
/// The header lengths are filled in at [`encode`](Self::encode) time, so
/// attributes can be appended in any number before serialization.
#[derive(Debug)]
pub struct NetlinkMessage {
    msg_type: u16,
    flags: u16,
    seq: u32,
    cmd: u8,
    attrs: Vec<u8>,
}

impl NetlinkMessage {
    /// Starts a request addressed to `msg_type` carrying the generic netlink
    /// command `cmd`.
    pub fn request(msg_type: u16, cmd: u8, seq: u32) -> Self {
        Self {
            msg_type,
            flags: NLM_F_REQUEST,
            seq,
            cmd,
            attrs: Vec::new(),
        }
    }

    /// Appends one `nlattr`, padding the payload to the 4-byte boundary.
    pub fn append_attr(&mut self, attr_type: u16, payload: &[u8]) {
        let attr_len = (NLA_HDRLEN + payload.len()) as u16;
        self.attrs.extend_from_slice(&attr_len.to_ne_bytes());
        self.attrs.extend_from_slice(&attr_type.to_ne_bytes());
        self.attrs.extend_from_slice(payload);
        let padding = nla_align(payload.len()) - payload.len();
        self.attrs.resize(self.attrs.len() + padding, 0);
    }

    /// Serializes the message as `nlmsghdr` + `genlmsghdr` + attributes.
    pub fn encode(&self) -> Vec<u8> {
        let total = NLMSG_HDRLEN + GENL_HDRLEN + self.attrs.len();
        let mut buf = Vec::with_capacity(total);
        buf.extend_from_slice(&(total as u32).to_ne_bytes());
        buf.extend_from_slice(&self.msg_type.to_ne_bytes());
        buf.extend_from_slice(&self.flags.to_ne_bytes());
        buf.extend_from_slice(&self.seq.to_ne_bytes());
        // nlmsg_pid left zero, the kernel identifies the sender itself
        buf.extend_from_slice(&0u32.to_ne_bytes());
        buf.push(self.cmd);
        buf.push(GENL_VERSION);
        buf.extend_from_slice(&0u16.to_ne_bytes());
        buf.extend_from_slice(&self.attrs);
        buf
    }
}

/// Validates a reply's framing and returns its attribute region.
///
/// Strips `nlmsghdr` and `genlmsghdr`, bounds the result by the length the
/// header claims, and surfaces [`NLMSG_ERROR`] replies as
/// [`NetlinkError::Kernel`] carrying the kernel's errno.
///
/// # Errors
///
/// Returns [`NetlinkError::TruncatedReply`] if the buffer is shorter than the
/// headers require or shorter than the header-claimed message length.
pub fn parse_genl_reply(buf: &[u8]) -> Result<&[u8], NetlinkError> {
    if buf.len() < NLMSG_HDRLEN {
        return Err(NetlinkError::TruncatedReply {
            expected: NLMSG_HDRLEN,
            actual: buf.len(),
        });
    }
    let msg_len = read_u32(buf) as usize;
    if msg_len < NLMSG_HDRLEN || msg_len > buf.len() {
        return Err(NetlinkError::TruncatedReply {
            expected: msg_len,
            actual: buf.len(),
        });
    }

    let msg_type = read_u16(&buf[4..]);
    if msg_type == NLMSG_ERROR {
        // struct nlmsgerr starts with the negated errno
        if msg_len < NLMSG_HDRLEN + 4 {
            return Err(NetlinkError::TruncatedReply {
                expected: NLMSG_HDRLEN + 4,
                actual: msg_len,
            });
        }
        let errno = -(read_u32(&buf[NLMSG_HDRLEN..]) as i32);
        return Err(NetlinkError::Kernel { errno });
    }

    let attr_start = NLMSG_HDRLEN + GENL_HDRLEN;
    if msg_len < attr_start {
        return Err(NetlinkError::TruncatedReply {
            expected: attr_start,
            actual: msg_len,
        });
    }
    Ok(&buf[attr_start..msg_len])
}

/// Iterator over the `(type, payload)` pairs of a flat attribute region.
///
/// Yields an error item and terminates as soon as an attribute header
/// contradicts the remaining buffer; a well-formed region yields only `Ok`
/// items.
#[derive(Debug)]
pub struct AttrIter<'a> {
    buf: &'a [u8],
}

impl<'a> AttrIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = Result<(u16, &'a [u8]), NetlinkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }
        if self.buf.len() < NLA_HDRLEN {
            let remaining = self.buf.len();
            self.buf = &[];
            return Some(Err(NetlinkError::MalformedAttribute {
                len: NLA_HDRLEN,
                remaining,
            }));
        }

        let attr_len = read_u16(self.buf) as usize;
        let attr_type = read_u16(&self.buf[2..]);
        if attr_len < NLA_HDRLEN || attr_len > self.buf.len() {
            let remaining = self.buf.len();
            self.buf = &[];
            return Some(Err(NetlinkError::MalformedAttribute {
                len: attr_len,
                remaining,
            }));
        }

        let payload = &self.buf[NLA_HDRLEN..attr_len];
        let advance = nla_align(attr_len).min(self.buf.len());
        self.buf = &self.buf[advance..];
        Some(Ok((attr_type, payload)))
    }
}
