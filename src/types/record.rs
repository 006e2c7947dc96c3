use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::sync::Arc;

use inetnum::addr::Prefix;
use inetnum::asn::Asn;
use zerocopy::{
    Immutable, IntoBytes, KnownLayout, NetworkEndian, Unaligned, U32,
};

use super::errors::RtrStoreError;

//------------ ProtocolVersion -----------------------------------------------

/// The RTR protocol revisions a cache can serve. Version 0 is RFC 6810,
/// version 1 is RFC 8210, which added router keys.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ProtocolVersion {
    V0 = 0,
    V1 = 1,
}

impl ProtocolVersion {
    pub fn supports_router_keys(self) -> bool {
        match self {
            ProtocolVersion::V0 => false,
            ProtocolVersion::V1 => true,
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolVersion::V0 => write!(f, "v0"),
            ProtocolVersion::V1 => write!(f, "v1"),
        }
    }
}

impl From<ProtocolVersion> for u8 {
    fn from(value: ProtocolVersion) -> Self {
        match value {
            ProtocolVersion::V0 => 0,
            ProtocolVersion::V1 => 1,
        }
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = RtrStoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ProtocolVersion::V0),
            1 => Ok(ProtocolVersion::V1),
            _ => Err(RtrStoreError::UnsupportedProtocolVersion(value)),
        }
    }
}

//------------ Flags ---------------------------------------------------------

/// Whether a payload PDU announces or withdraws its record.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Flags {
    Withdraw,
    Announce,
}

impl From<Flags> for u8 {
    fn from(value: Flags) -> Self {
        match value {
            Flags::Withdraw => 0,
            Flags::Announce => 1,
        }
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flags::Withdraw => write!(f, "withdraw"),
            Flags::Announce => write!(f, "announce"),
        }
    }
}

//------------ Payload PDU layouts -------------------------------------------
//
// The fixed parts of the RFC 8210 payload PDUs. All fields are single bytes
// or network-endian integers, so the structs have no padding and can be
// written out as they are.

const IPV4_PREFIX_PDU: u8 = 4;
const IPV6_PREFIX_PDU: u8 = 6;
const ROUTER_KEY_PDU: u8 = 9;

#[derive(IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct Ipv4PrefixPdu {
    version: u8,
    pdu_type: u8,
    zero: [u8; 2],
    length: U32<NetworkEndian>,
    flags: u8,
    prefix_len: u8,
    max_len: u8,
    zero_2: u8,
    prefix: [u8; 4],
    asn: U32<NetworkEndian>,
}

#[derive(IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct Ipv6PrefixPdu {
    version: u8,
    pdu_type: u8,
    zero: [u8; 2],
    length: U32<NetworkEndian>,
    flags: u8,
    prefix_len: u8,
    max_len: u8,
    zero_2: u8,
    prefix: [u8; 16],
    asn: U32<NetworkEndian>,
}

// Followed by the variable length subject public key info.
#[derive(IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct RouterKeyPduHeader {
    version: u8,
    pdu_type: u8,
    flags: u8,
    zero: u8,
    length: U32<NetworkEndian>,
    subject_key_identifier: [u8; 20],
    asn: U32<NetworkEndian>,
}

//------------ RouteOrigin ---------------------------------------------------

/// A validated Route Origin Authorization payload: the prefix, the maximum
/// length of announcements covered by it, and the AS allowed to originate
/// them.
#[derive(Clone, Copy, Debug)]
pub struct RouteOrigin {
    prefix: Prefix,
    max_len: u8,
    asn: Asn,
}

impl RouteOrigin {
    /// Create a route origin. Fails if `max_len` is shorter than the prefix
    /// length, or longer than the address family allows.
    pub fn new(
        prefix: Prefix,
        max_len: u8,
        asn: Asn,
    ) -> Result<Self, RtrStoreError> {
        let af_bits = match prefix.addr() {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if max_len < prefix.len() || max_len > af_bits {
            return Err(RtrStoreError::MaxLengthInvalid);
        }
        Ok(Self {
            prefix,
            max_len,
            asn,
        })
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    pub fn max_len(&self) -> u8 {
        self.max_len
    }

    pub fn asn(&self) -> Asn {
        self.asn
    }

    // (address family, address bits, prefix length, max length, asn)
    fn key(&self) -> (u8, u128, u8, u8, u32) {
        let (family, bits) = match self.prefix.addr() {
            IpAddr::V4(addr) => (4, u32::from(addr) as u128),
            IpAddr::V6(addr) => (6, u128::from(addr)),
        };
        (
            family,
            bits,
            self.prefix.len(),
            self.max_len,
            self.asn.into_u32(),
        )
    }

    fn length(&self) -> usize {
        match self.prefix.addr() {
            IpAddr::V4(_) => size_of::<Ipv4PrefixPdu>(),
            IpAddr::V6(_) => size_of::<Ipv6PrefixPdu>(),
        }
    }

    fn encode(&self, version: ProtocolVersion, flags: Flags) -> Vec<u8> {
        let length = U32::new(self.length() as u32);
        let asn = U32::new(self.asn.into_u32());
        match self.prefix.addr() {
            IpAddr::V4(addr) => Ipv4PrefixPdu {
                version: version.into(),
                pdu_type: IPV4_PREFIX_PDU,
                zero: [0; 2],
                length,
                flags: flags.into(),
                prefix_len: self.prefix.len(),
                max_len: self.max_len,
                zero_2: 0,
                prefix: addr.octets(),
                asn,
            }
            .as_bytes()
            .to_vec(),
            IpAddr::V6(addr) => Ipv6PrefixPdu {
                version: version.into(),
                pdu_type: IPV6_PREFIX_PDU,
                zero: [0; 2],
                length,
                flags: flags.into(),
                prefix_len: self.prefix.len(),
                max_len: self.max_len,
                zero_2: 0,
                prefix: addr.octets(),
                asn,
            }
            .as_bytes()
            .to_vec(),
        }
    }
}

impl PartialEq for RouteOrigin {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for RouteOrigin {}

impl Hash for RouteOrigin {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

impl PartialOrd for RouteOrigin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RouteOrigin {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl std::fmt::Display for RouteOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} => {}", self.prefix, self.max_len, self.asn)
    }
}

//------------ RouterKey -----------------------------------------------------

/// A validated BGPsec router key: the subject key identifier and subject
/// public key info of a router certificate, bound to an AS.
#[derive(Clone, Debug)]
pub struct RouterKey {
    subject_key_identifier: [u8; 20],
    asn: Asn,
    subject_public_key_info: Arc<[u8]>,
}

impl RouterKey {
    pub fn new(
        subject_key_identifier: [u8; 20],
        asn: Asn,
        subject_public_key_info: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            subject_key_identifier,
            asn,
            subject_public_key_info: subject_public_key_info.into(),
        }
    }

    pub fn subject_key_identifier(&self) -> &[u8; 20] {
        &self.subject_key_identifier
    }

    pub fn asn(&self) -> Asn {
        self.asn
    }

    pub fn subject_public_key_info(&self) -> &[u8] {
        &self.subject_public_key_info
    }

    fn key(&self) -> (&[u8; 20], u32, &[u8]) {
        (
            &self.subject_key_identifier,
            self.asn.into_u32(),
            &self.subject_public_key_info,
        )
    }

    fn length(&self) -> usize {
        size_of::<RouterKeyPduHeader>() + self.subject_public_key_info.len()
    }

    fn encode(&self, version: ProtocolVersion, flags: Flags) -> Vec<u8> {
        let header = RouterKeyPduHeader {
            version: version.into(),
            pdu_type: ROUTER_KEY_PDU,
            flags: flags.into(),
            zero: 0,
            length: U32::new(self.length() as u32),
            subject_key_identifier: self.subject_key_identifier,
            asn: U32::new(self.asn.into_u32()),
        };
        let mut buf = Vec::with_capacity(self.length());
        buf.extend_from_slice(header.as_bytes());
        buf.extend_from_slice(&self.subject_public_key_info);
        buf
    }
}

impl PartialEq for RouterKey {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for RouterKey {}

impl Hash for RouterKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

impl PartialOrd for RouterKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RouterKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl std::fmt::Display for RouterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "router key ")?;
        for b in self.subject_key_identifier {
            write!(f, "{:02X}", b)?;
        }
        write!(f, " => {}", self.asn)
    }
}

//------------ RtrDataUnit ---------------------------------------------------

/// One validated payload record served by the cache.
///
/// Equality and ordering are structural: two records built independently
/// from the same fields are the same record. All route origins sort before
/// all router keys.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum RtrDataUnit {
    RouteOrigin(RouteOrigin),
    RouterKey(RouterKey),
}

impl RtrDataUnit {
    pub fn asn(&self) -> Asn {
        match self {
            RtrDataUnit::RouteOrigin(roa) => roa.asn(),
            RtrDataUnit::RouterKey(key) => key.asn(),
        }
    }

    /// Returns whether this record exists at all for a client speaking
    /// `version`. Router keys were introduced in version 1, so a version 0
    /// client never sees them, even though they are part of every diff.
    pub fn is_encodable(&self, version: ProtocolVersion) -> bool {
        match self {
            RtrDataUnit::RouteOrigin(_) => true,
            RtrDataUnit::RouterKey(_) => version.supports_router_keys(),
        }
    }

    /// The length in bytes of the payload PDU for this record, zero if the
    /// record is not encodable for `version`.
    pub fn length(&self, version: ProtocolVersion) -> usize {
        if !self.is_encodable(version) {
            return 0;
        }
        match self {
            RtrDataUnit::RouteOrigin(roa) => roa.length(),
            RtrDataUnit::RouterKey(key) => key.length(),
        }
    }

    /// The payload PDU for this record, or `None` if the record is not
    /// encodable for `version`.
    pub fn encode(
        &self,
        version: ProtocolVersion,
        flags: Flags,
    ) -> Option<Vec<u8>> {
        if !self.is_encodable(version) {
            return None;
        }
        Some(match self {
            RtrDataUnit::RouteOrigin(roa) => roa.encode(version, flags),
            RtrDataUnit::RouterKey(key) => key.encode(version, flags),
        })
    }
}

impl From<RouteOrigin> for RtrDataUnit {
    fn from(value: RouteOrigin) -> Self {
        RtrDataUnit::RouteOrigin(value)
    }
}

impl From<RouterKey> for RtrDataUnit {
    fn from(value: RouterKey) -> Self {
        RtrDataUnit::RouterKey(value)
    }
}

impl std::fmt::Display for RtrDataUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtrDataUnit::RouteOrigin(roa) => write!(f, "{}", roa),
            RtrDataUnit::RouterKey(key) => write!(f, "{}", key),
        }
    }
}
