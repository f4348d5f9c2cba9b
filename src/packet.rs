//! Raw datagram parsing.
//!
//! Turns a captured IP datagram (IPv4 or IPv6) into a borrowed [`TcpSegment`]
//! using zero-copy parsing via etherparse. Anything that is not a well-formed
//! TCP-over-IP datagram is rejected with a [`PacketError`]; callers drop the
//! packet and carry on.

use std::net::IpAddr;

use etherparse::{Ipv4Header, NetSlice, SlicedPacket, TransportSlice};

use crate::error::PacketError;

/// IP protocol number for TCP.
pub const IP_PROTO_TCP: u8 = 6;

/// A parsed TCP segment borrowing its payload from the captured datagram.
#[derive(Debug, Clone, Copy)]
pub struct TcpSegment<'a> {
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    /// Connection teardown flags, used for the explicit-close fast path.
    pub fin: bool,
    pub rst: bool,
    pub payload: &'a [u8],
}

/// Parse a raw IP datagram into a TCP segment.
///
/// The payload slice respects the IP total-length field, so trailing capture
/// padding is never treated as stream data.
pub fn parse_datagram(data: &[u8]) -> Result<TcpSegment<'_>, PacketError> {
    if data.len() < Ipv4Header::MIN_LEN {
        return Err(PacketError::TooShort {
            needed: Ipv4Header::MIN_LEN,
            have: data.len(),
        });
    }

    match data[0] >> 4 {
        4 | 6 => {}
        version => return Err(PacketError::UnsupportedIpVersion { version }),
    }

    let sliced = SlicedPacket::from_ip(data).map_err(|e| PacketError::InvalidHeader {
        reason: e.to_string(),
    })?;

    let (src_ip, dst_ip, ip_number) = match &sliced.net {
        Some(NetSlice::Ipv4(v4)) => (
            IpAddr::V4(v4.header().source_addr()),
            IpAddr::V4(v4.header().destination_addr()),
            v4.payload().ip_number.0,
        ),
        Some(NetSlice::Ipv6(v6)) => (
            IpAddr::V6(v6.header().source_addr()),
            IpAddr::V6(v6.header().destination_addr()),
            v6.payload().ip_number.0,
        ),
        None => {
            return Err(PacketError::InvalidHeader {
                reason: "missing IP header".to_string(),
            })
        }
    };

    match sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => Ok(TcpSegment {
            src_ip,
            dst_ip,
            src_port: tcp.source_port(),
            dst_port: tcp.destination_port(),
            fin: tcp.fin(),
            rst: tcp.rst(),
            payload: tcp.payload(),
        }),
        _ => Err(PacketError::NotTcp {
            protocol: ip_number,
        }),
    }
}
