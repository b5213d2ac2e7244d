use crate::codec::{encode, Reader, Streamable};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv6Addr};

/// Service bit for a node that stores and relays objects
pub const NODE_NETWORK: u64 = 1;

/// A peer as advertised in `addr` and `version` messages.
///
/// IPv4 addresses are kept IPv4-mapped (`::ffff:a.b.c.d`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct NetworkAddress {
    time: u64,
    stream: u32,
    services: u64,
    ipv6: [u8; 16],
    port: u16,
}

impl NetworkAddress {
    pub fn new(ip: IpAddr, port: u16) -> NetworkAddress {
        let ipv6 = match ip {
            IpAddr::V4(v4) => v4.to_ipv6_mapped(),
            IpAddr::V6(v6) => v6,
        };
        NetworkAddress {
            time: 0,
            stream: 1,
            services: NODE_NETWORK,
            ipv6: ipv6.octets(),
            port,
        }
    }

    pub fn with_time(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    pub fn with_stream(mut self, stream: u32) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_services(mut self, services: u64) -> Self {
        self.services = services;
        self
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn stream(&self) -> u32 {
        self.stream
    }

    pub fn services(&self) -> u64 {
        self.services
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn ipv6(&self) -> &[u8; 16] {
        &self.ipv6
    }

    /// IPv4-mapped addresses come back as `IpAddr::V4`
    pub fn ip(&self) -> IpAddr {
        let v6 = Ipv6Addr::from(self.ipv6);
        match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        }
    }

    /// `services(8) ip(16) port(2)`, as used inside `version`
    pub fn write_light(&self, out: &mut Vec<u8>) {
        encode::uint64(self.services, out);
        out.extend_from_slice(&self.ipv6);
        encode::uint16(self.port, out);
    }

    pub fn read_light(reader: &mut Reader<'_>) -> Result<NetworkAddress> {
        let services = reader.uint64()?;
        let ipv6 = reader.array()?;
        let port = reader.uint16()?;
        Ok(NetworkAddress {
            time: 0,
            stream: 0,
            services,
            ipv6,
            port,
        })
    }

    pub fn read_full(reader: &mut Reader<'_>) -> Result<NetworkAddress> {
        let time = reader.uint64()?;
        let stream = reader.uint32()?;
        let mut address = Self::read_light(reader)?;
        address.time = time;
        address.stream = stream;
        Ok(address)
    }
}

/// Full form: `time(8) stream(4) services(8) ip(16) port(2)`
impl Streamable for NetworkAddress {
    fn write_to(&self, out: &mut Vec<u8>) {
        encode::uint64(self.time, out);
        encode::uint32(self.stream, out);
        self.write_light(out);
    }
}
