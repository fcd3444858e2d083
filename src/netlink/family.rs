//! Resolution of the dynamic taskstats family id.
//!
//! Generic netlink families are registered at runtime, so their numeric
//! message type is not a constant: it must be looked up by name through the
//! controller family before any data-plane request can be addressed. The id
//! is stable for the lifetime of the running kernel, not across reboots or
//! module reloads, and is resolved once per reader.

use super::connection::NetlinkChannel;
use super::error::NetlinkError;
use super::message::{
    AttrIter, CTRL_ATTR_FAMILY_ID, CTRL_ATTR_FAMILY_NAME, CTRL_CMD_GETFAMILY, GENL_ID_CTRL,
    NetlinkMessage, parse_genl_reply, read_u16,
};

/// Well-known name of the taskstats generic netlink family.
pub const TASKSTATS_GENL_NAME: &str = "TASKSTATS";

/// Asks the netlink controller for the numeric id of the taskstats family.
///
/// One `CTRL_CMD_GETFAMILY` round trip on the control family; the reply's
/// attribute list is walked for `CTRL_ATTR_FAMILY_ID`.
///
/// # Errors
///
/// - [`NetlinkError::FamilyNotRegistered`] if the kernel answers `ENOENT`,
///   i.e. taskstats support is absent from the running kernel.
/// - [`NetlinkError::MissingAttribute`] if the reply carries no id attribute.
/// - Any send/receive or framing error from the exchange itself.
pub fn resolve_family_id<C: NetlinkChannel>(channel: &mut C) -> Result<u16, NetlinkError> {
    let seq = channel.next_seq();
    let mut msg = NetlinkMessage::request(GENL_ID_CTRL, CTRL_CMD_GETFAMILY, seq);

    // The controller matches on the NUL-terminated name.
    let mut name = Vec::with_capacity(TASKSTATS_GENL_NAME.len() + 1);
    name.extend_from_slice(TASKSTATS_GENL_NAME.as_bytes());
    name.push(0);
    msg.append_attr(CTRL_ATTR_FAMILY_NAME, &name);

    channel.send(&msg.encode())?;
    let reply = channel.receive()?;

    let attrs = match parse_genl_reply(&reply) {
        Err(NetlinkError::Kernel { errno }) if errno == libc::ENOENT => {
            return Err(NetlinkError::FamilyNotRegistered {
                name: TASKSTATS_GENL_NAME,
            });
        }
        other => other?,
    };

    for attr in AttrIter::new(attrs) {
        let (attr_type, payload) = attr?;
        if attr_type == CTRL_ATTR_FAMILY_ID {
            if payload.len() < 2 {
                return Err(NetlinkError::TruncatedReply {
                    expected: 2,
                    actual: payload.len(),
                });
            }
            return Ok(read_u16(payload));
        }
    }

    Err(NetlinkError::MissingAttribute {
        attr_type: CTRL_ATTR_FAMILY_ID,
    })
}
