//! Per-cgroup statistics query and fixed-layout decoding.
//!
//! The data-plane exchange: a `CGROUPSTATS_CMD_GET` request addressed to the
//! resolved taskstats family, carrying the open cgroup directory descriptor
//! as its single attribute. The kernel answers with one
//! `CGROUPSTATS_TYPE_CGROUP_STATS` attribute whose payload mirrors
//! `struct cgroupstats` byte for byte: five host-endian `u64` counters in
//! kernel-defined order.
//!
//! Decoding is all-or-nothing. A payload shorter than the full record is a
//! hard error, never a partially filled [`LoadStats`].

use std::os::fd::RawFd;

use serde::Serialize;

use super::connection::NetlinkChannel;
use super::error::NetlinkError;
use super::message::{AttrIter, NetlinkMessage, parse_genl_reply, read_u64};

/// Data-plane command: get statistics for one cgroup.
pub const CGROUPSTATS_CMD_GET: u8 = 4;
/// Request attribute: open descriptor of the cgroup directory.
pub const CGROUPSTATS_CMD_ATTR_FD: u16 = 1;
/// Reply attribute holding the statistics record.
pub const CGROUPSTATS_TYPE_CGROUP_STATS: u16 = 1;
/// Size of the kernel's `struct cgroupstats`: five `u64` counters.
pub const CGROUPSTATS_SIZE: usize = 40;

/// Instantaneous task-state counters for exactly one cgroup.
///
/// Field order mirrors the kernel's `struct cgroupstats`. The snapshot is
/// non-hierarchical: descendant cgroups are not included. Callers wanting a
/// rate are expected to difference successive snapshots themselves.
///
/// The serialized field names are part of the reported-data contract and
/// must stay as they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadStats {
    /// Number of sleeping tasks.
    pub nr_sleeping: u64,
    /// Number of running tasks.
    pub nr_running: u64,
    /// Number of tasks in stopped state.
    pub nr_stopped: u64,
    /// Number of tasks in uninterruptible state.
    pub nr_uninterruptible: u64,
    /// Number of tasks waiting on I/O.
    pub nr_io_wait: u64,
}

/// Performs one statistics round trip for the cgroup behind `cgroup_fd`.
///
/// The caller guarantees the descriptor stays open for the duration of the
/// call. Exactly one send and one receive; no retry.
///
/// # Errors
///
/// Returns [`NetlinkError::MissingAttribute`] if the reply lacks the
/// statistics attribute, [`NetlinkError::TruncatedStats`] if its payload is
/// shorter than the fixed record, or any send/receive/framing error.
pub fn query_load_stats<C: NetlinkChannel>(
    channel: &mut C,
    family_id: u16,
    cgroup_fd: RawFd,
) -> Result<LoadStats, NetlinkError> {
    let seq = channel.next_seq();
    let mut msg = NetlinkMessage::request(family_id, CGROUPSTATS_CMD_GET, seq);
    msg.append_attr(CGROUPSTATS_CMD_ATTR_FD, &(cgroup_fd as u32).to_ne_bytes());

    channel.send(&msg.encode())?;
    let reply = channel.receive()?;
    let attrs = parse_genl_reply(&reply)?;

    for attr in AttrIter::new(attrs) {
        let (attr_type, payload) = attr?;
        if attr_type == CGROUPSTATS_TYPE_CGROUP_STATS {
            return decode_load_stats(payload);
        }
    }

    Err(NetlinkError::MissingAttribute {
        attr_type: CGROUPSTATS_TYPE_CGROUP_STATS,
    })
}

fn decode_load_stats(payload: &[u8]) -> Result<LoadStats, NetlinkError> {
    if payload.len() < CGROUPSTATS_SIZE {
        return Err(NetlinkError::TruncatedStats {
            expected: CGROUPSTATS_SIZE,
            actual: payload.len(),
        });
    }
    Ok(LoadStats {
        nr_sleeping: read_u64(payload),
        nr_running: read_u64(&payload[8..]),
        nr_stopped: read_u64(&payload[16..]),
        nr_uninterruptible: read_u64(&payload[24..]),
        nr_io_wait: read_u64(&payload[32..]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::message::{read_u16, read_u32};
    use crate::netlink::testing::{MockChannel, cgroupstats_payload, encode_reply};

    const FAMILY_ID: u16 = 0x18;

    #[test]
    fn test_query_decodes_counters_in_kernel_order() {
        let mut channel = MockChannel::new();
        channel.push_reply(encode_reply(
            FAMILY_ID,
            &[(
                CGROUPSTATS_TYPE_CGROUP_STATS,
                cgroupstats_payload(3, 1, 0, 0, 2),
            )],
        ));

        let stats = query_load_stats(&mut channel, FAMILY_ID, 5).unwrap();
        assert_eq!(
            stats,
            LoadStats {
                nr_sleeping: 3,
                nr_running: 1,
                nr_stopped: 0,
                nr_uninterruptible: 0,
                nr_io_wait: 2,
            }
        );
    }

    #[test]
    fn test_request_addresses_family_and_carries_fd() {
        let mut channel = MockChannel::new();
        channel.push_reply(encode_reply(
            FAMILY_ID,
            &[(
                CGROUPSTATS_TYPE_CGROUP_STATS,
                cgroupstats_payload(0, 0, 0, 0, 0),
            )],
        ));

        query_load_stats(&mut channel, FAMILY_ID, 42).unwrap();

        let sent = channel.sent_log();
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let req = &sent[0];
        assert_eq!(read_u16(&req[4..]), FAMILY_ID);
        assert_eq!(req[16], CGROUPSTATS_CMD_GET);
        assert_eq!(read_u16(&req[20..]), 8);
        assert_eq!(read_u16(&req[22..]), CGROUPSTATS_CMD_ATTR_FD);
        assert_eq!(read_u32(&req[24..]), 42);
    }

    #[test]
    fn test_short_payload_is_all_or_nothing() {
        let mut channel = MockChannel::new();
        let mut payload = cgroupstats_payload(3, 1, 0, 0, 2);
        payload.truncate(CGROUPSTATS_SIZE - 1);
        channel.push_reply(encode_reply(
            FAMILY_ID,
            &[(CGROUPSTATS_TYPE_CGROUP_STATS, payload)],
        ));

        let err = query_load_stats(&mut channel, FAMILY_ID, 5).unwrap_err();
        assert!(matches!(
            err,
            NetlinkError::TruncatedStats {
                expected: CGROUPSTATS_SIZE,
                actual: 39
            }
        ));
    }

    #[test]
    fn test_reply_without_stats_attribute_is_an_error() {
        let mut channel = MockChannel::new();
        channel.push_reply(encode_reply(FAMILY_ID, &[(7, vec![0; 8])]));

        let err = query_load_stats(&mut channel, FAMILY_ID, 5).unwrap_err();
        assert!(matches!(
            err,
            NetlinkError::MissingAttribute {
                attr_type: CGROUPSTATS_TYPE_CGROUP_STATS
            }
        ));
    }

    #[test]
    fn test_serialized_field_names_match_contract() {
        let stats = LoadStats {
            nr_sleeping: 3,
            nr_running: 1,
            nr_stopped: 0,
            nr_uninterruptible: 0,
            nr_io_wait: 2,
        };
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "nr_sleeping": 3,
                "nr_running": 1,
                "nr_stopped": 0,
                "nr_uninterruptible": 0,
                "nr_io_wait": 2,
            })
        );
    }
}
