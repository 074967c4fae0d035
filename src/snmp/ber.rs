// AirGuard - Multi-protocol telemetry collection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! SNMPv2c message codec (BER subset)
//!
//! Covers what GET needs: the message envelope, GetRequest / Response PDUs,
//! and the SMIv2 application types an agent answers with.
//!
//! ```text
//! Message  ::= SEQUENCE { version INTEGER, community OCTET STRING, pdu }
//! pdu      ::= [tag] { request-id, error-status, error-index, varbinds }
//! varbinds ::= SEQUENCE OF SEQUENCE { name OID, value ANY }
//! ```

use crate::error::CollectorError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_NULL: u8 = 0x05;
const TAG_OBJECT_ID: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_IP_ADDRESS: u8 = 0x40;
const TAG_COUNTER32: u8 = 0x41;
const TAG_GAUGE32: u8 = 0x42;
const TAG_TIMETICKS: u8 = 0x43;
const TAG_COUNTER64: u8 = 0x46;
const TAG_NO_SUCH_OBJECT: u8 = 0x80;
const TAG_NO_SUCH_INSTANCE: u8 = 0x81;
const TAG_END_OF_MIB_VIEW: u8 = 0x82;

/// SNMP version field value for v2c
pub const VERSION_2C: i64 = 1;

/// Error status `noSuchName` (v1 agents answering v2c requests)
pub const ERROR_NO_SUCH_NAME: i64 = 2;

/// Codec failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BerError {
    /// Input ended before the structure did
    #[error("Truncated at offset {offset}")]
    Truncated { offset: usize },

    /// Structure present but not what SNMP allows here
    #[error("Invalid BER at offset {offset}: {reason}")]
    Invalid { offset: usize, reason: String },

    /// Object identifier text could not be parsed
    #[error("Invalid object identifier: {0}")]
    InvalidOid(String),
}

impl From<BerError> for CollectorError {
    fn from(err: BerError) -> Self {
        CollectorError::malformed(err.to_string())
    }
}

/// An object identifier such as `1.3.6.1.2.1.1.3.0`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(Vec<u32>);

impl Oid {
    /// Build from arcs; needs at least two, with a valid first pair
    pub fn from_arcs(arcs: impl Into<Vec<u32>>) -> Result<Self, BerError> {
        let arcs = arcs.into();
        let valid = arcs.len() >= 2
            && arcs[0] <= 2
            && (arcs[1] < 40 || (arcs[0] == 2 && arcs[1] <= u32::MAX - 80));
        if !valid {
            return Err(BerError::InvalidOid(format!("{:?}", arcs)));
        }
        Ok(Self(arcs))
    }

    /// Build from arcs known to be valid at compile time
    pub(crate) fn known(arcs: &[u32]) -> Self {
        debug_assert!(arcs.len() >= 2 && arcs[0] <= 2);
        Self(arcs.to_vec())
    }

    /// Arc values
    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    /// A new OID with `arc` appended
    pub fn child(&self, arc: u32) -> Self {
        let mut arcs = self.0.clone();
        arcs.push(arc);
        Self(arcs)
    }
}

impl FromStr for Oid {
    type Err = BerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .trim_start_matches('.')
            .split('.')
            .map(|arc| arc.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| BerError::InvalidOid(s.to_string()))?;
        Self::from_arcs(arcs).map_err(|_| BerError::InvalidOid(s.to_string()))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
        }
        Ok(())
    }
}

/// A variable-binding value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    ObjectId(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl SnmpValue {
    /// Whether the agent answered with an exception instead of a value
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            SnmpValue::NoSuchObject | SnmpValue::NoSuchInstance | SnmpValue::EndOfMibView
        )
    }

    /// Non-negative numeric view
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SnmpValue::Integer(v) => u64::try_from(*v).ok(),
            SnmpValue::Counter32(v) | SnmpValue::Gauge32(v) | SnmpValue::TimeTicks(v) => {
                Some(*v as u64)
            }
            SnmpValue::Counter64(v) => Some(*v),
            _ => None,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            SnmpValue::Integer(v) => write_tlv(TAG_INTEGER, &encode_integer(*v), out),
            SnmpValue::OctetString(bytes) => write_tlv(TAG_OCTET_STRING, bytes, out),
            SnmpValue::Null => write_tlv(TAG_NULL, &[], out),
            SnmpValue::ObjectId(oid) => write_tlv(TAG_OBJECT_ID, &encode_oid(oid), out),
            SnmpValue::IpAddress(addr) => write_tlv(TAG_IP_ADDRESS, addr, out),
            SnmpValue::Counter32(v) => write_tlv(TAG_COUNTER32, &encode_unsigned(*v as u64), out),
            SnmpValue::Gauge32(v) => write_tlv(TAG_GAUGE32, &encode_unsigned(*v as u64), out),
            SnmpValue::TimeTicks(v) => write_tlv(TAG_TIMETICKS, &encode_unsigned(*v as u64), out),
            SnmpValue::Counter64(v) => write_tlv(TAG_COUNTER64, &encode_unsigned(*v), out),
            SnmpValue::NoSuchObject => write_tlv(TAG_NO_SUCH_OBJECT, &[], out),
            SnmpValue::NoSuchInstance => write_tlv(TAG_NO_SUCH_INSTANCE, &[], out),
            SnmpValue::EndOfMibView => write_tlv(TAG_END_OF_MIB_VIEW, &[], out),
        }
    }

    fn decode(tag: u8, content: &[u8], offset: usize) -> Result<Self, BerError> {
        let value = match tag {
            TAG_INTEGER => SnmpValue::Integer(decode_integer(content, offset)?),
            TAG_OCTET_STRING => SnmpValue::OctetString(content.to_vec()),
            TAG_NULL => SnmpValue::Null,
            TAG_OBJECT_ID => SnmpValue::ObjectId(decode_oid(content, offset)?),
            TAG_IP_ADDRESS => {
                let addr: [u8; 4] = content.try_into().map_err(|_| BerError::Invalid {
                    offset,
                    reason: format!("IpAddress of {} bytes", content.len()),
                })?;
                SnmpValue::IpAddress(addr)
            }
            TAG_COUNTER32 => SnmpValue::Counter32(decode_u32(content, offset)?),
            TAG_GAUGE32 => SnmpValue::Gauge32(decode_u32(content, offset)?),
            TAG_TIMETICKS => SnmpValue::TimeTicks(decode_u32(content, offset)?),
            TAG_COUNTER64 => SnmpValue::Counter64(decode_unsigned(content, offset)?),
            TAG_NO_SUCH_OBJECT => SnmpValue::NoSuchObject,
            TAG_NO_SUCH_INSTANCE => SnmpValue::NoSuchInstance,
            TAG_END_OF_MIB_VIEW => SnmpValue::EndOfMibView,
            other => {
                return Err(BerError::Invalid {
                    offset,
                    reason: format!("unsupported value type 0x{:02x}", other),
                })
            }
        };
        Ok(value)
    }
}

/// PDU types this codec handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PduType {
    GetRequest = 0xA0,
    GetNextRequest = 0xA1,
    Response = 0xA2,
}

impl PduType {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0xA0 => Some(PduType::GetRequest),
            0xA1 => Some(PduType::GetNextRequest),
            0xA2 => Some(PduType::Response),
            _ => None,
        }
    }
}

/// Protocol data unit
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub pdu_type: PduType,
    pub request_id: i32,
    pub error_status: i64,
    pub error_index: i64,
    pub varbinds: Vec<(Oid, SnmpValue)>,
}

/// A complete SNMP message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub version: i64,
    pub community: Vec<u8>,
    pub pdu: Pdu,
}

impl Message {
    /// A v2c GetRequest for `oids`
    pub fn get_request(community: &str, request_id: i32, oids: &[Oid]) -> Self {
        Self {
            version: VERSION_2C,
            community: community.as_bytes().to_vec(),
            pdu: Pdu {
                pdu_type: PduType::GetRequest,
                request_id,
                error_status: 0,
                error_index: 0,
                varbinds: oids.iter().map(|oid| (oid.clone(), SnmpValue::Null)).collect(),
            },
        }
    }

    /// A v2c Response carrying `varbinds`
    pub fn response(community: &[u8], request_id: i32, varbinds: Vec<(Oid, SnmpValue)>) -> Self {
        Self {
            version: VERSION_2C,
            community: community.to_vec(),
            pdu: Pdu {
                pdu_type: PduType::Response,
                request_id,
                error_status: 0,
                error_index: 0,
                varbinds,
            },
        }
    }

    /// Serialize to wire bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut varbinds = Vec::new();
        for (oid, value) in &self.pdu.varbinds {
            let mut binding = Vec::new();
            write_tlv(TAG_OBJECT_ID, &encode_oid(oid), &mut binding);
            value.encode(&mut binding);
            write_tlv(TAG_SEQUENCE, &binding, &mut varbinds);
        }

        let mut pdu = Vec::new();
        write_tlv(TAG_INTEGER, &encode_integer(self.pdu.request_id as i64), &mut pdu);
        write_tlv(TAG_INTEGER, &encode_integer(self.pdu.error_status), &mut pdu);
        write_tlv(TAG_INTEGER, &encode_integer(self.pdu.error_index), &mut pdu);
        write_tlv(TAG_SEQUENCE, &varbinds, &mut pdu);

        let mut body = Vec::new();
        write_tlv(TAG_INTEGER, &encode_integer(self.version), &mut body);
        write_tlv(TAG_OCTET_STRING, &self.community, &mut body);
        write_tlv(self.pdu.pdu_type as u8, &pdu, &mut body);

        let mut out = Vec::with_capacity(body.len() + 4);
        write_tlv(TAG_SEQUENCE, &body, &mut out);
        out
    }

    /// Parse wire bytes
    pub fn decode(buf: &[u8]) -> Result<Self, BerError> {
        let mut outer = Reader::new(buf, 0);
        let mut message = outer.expect(TAG_SEQUENCE)?;

        let version = message.read_integer()?;
        let community = message.expect(TAG_OCTET_STRING)?.rest().to_vec();

        let (tag, mut pdu) = message.read_tlv()?;
        let pdu_type = PduType::from_tag(tag).ok_or_else(|| BerError::Invalid {
            offset: pdu.base,
            reason: format!("unsupported PDU type 0x{:02x}", tag),
        })?;

        let request_id = pdu.read_integer()?;
        let request_id = i32::try_from(request_id).map_err(|_| BerError::Invalid {
            offset: pdu.base,
            reason: format!("request-id {} out of range", request_id),
        })?;
        let error_status = pdu.read_integer()?;
        let error_index = pdu.read_integer()?;

        let mut list = pdu.expect(TAG_SEQUENCE)?;
        let mut varbinds = Vec::new();
        while !list.is_empty() {
            let mut binding = list.expect(TAG_SEQUENCE)?;
            let oid_reader = binding.expect(TAG_OBJECT_ID)?;
            let oid = decode_oid(oid_reader.rest(), oid_reader.base)?;
            let (tag, value) = binding.read_tlv()?;
            varbinds.push((oid, SnmpValue::decode(tag, value.rest(), value.base)?));
        }

        Ok(Self {
            version,
            community,
            pdu: Pdu {
                pdu_type,
                request_id,
                error_status,
                error_index,
                varbinds,
            },
        })
    }
}

/// Cursor over BER content; `base` is the absolute offset of `buf[0]`
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8], base: usize) -> Self {
        Self { buf, pos: 0, base }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn byte(&mut self) -> Result<u8, BerError> {
        let b = *self.buf.get(self.pos).ok_or(BerError::Truncated {
            offset: self.offset(),
        })?;
        self.pos += 1;
        Ok(b)
    }

    fn length(&mut self) -> Result<usize, BerError> {
        let first = self.byte()?;
        if first & 0x80 == 0 {
            return Ok(first as usize);
        }
        let count = (first & 0x7f) as usize;
        if count == 0 || count > 4 {
            return Err(BerError::Invalid {
                offset: self.offset() - 1,
                reason: format!("unsupported length form 0x{:02x}", first),
            });
        }
        let mut len = 0usize;
        for _ in 0..count {
            len = (len << 8) | self.byte()? as usize;
        }
        Ok(len)
    }

    /// Read one TLV and return its tag and a reader over its content
    fn read_tlv(&mut self) -> Result<(u8, Reader<'a>), BerError> {
        let tag = self.byte()?;
        let len = self.length()?;
        let start = self.pos;
        let end = start.checked_add(len).filter(|end| *end <= self.buf.len());
        let end = end.ok_or(BerError::Truncated {
            offset: self.base + start,
        })?;
        self.pos = end;
        Ok((tag, Reader::new(&self.buf[start..end], self.base + start)))
    }

    fn expect(&mut self, expected: u8) -> Result<Reader<'a>, BerError> {
        let offset = self.offset();
        let (tag, reader) = self.read_tlv()?;
        if tag != expected {
            return Err(BerError::Invalid {
                offset,
                reason: format!("expected tag 0x{:02x}, found 0x{:02x}", expected, tag),
            });
        }
        Ok(reader)
    }

    fn read_integer(&mut self) -> Result<i64, BerError> {
        let reader = self.expect(TAG_INTEGER)?;
        decode_integer(reader.rest(), reader.base)
    }
}

fn write_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

fn write_tlv(tag: u8, content: &[u8], out: &mut Vec<u8>) {
    out.push(tag);
    write_length(content.len(), out);
    out.extend_from_slice(content);
}

/// Minimal two's complement encoding
fn encode_integer(v: i64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let (b, next) = (bytes[start], bytes[start + 1]);
        let redundant = (b == 0x00 && next & 0x80 == 0) || (b == 0xff && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Unsigned encoding, with a leading zero when the high bit is set
fn encode_unsigned(v: u64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(bytes.len() - 1);
    let mut out = Vec::with_capacity(bytes.len() - skip + 1);
    if bytes[skip] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes[skip..]);
    out
}

fn encode_base128(mut v: u32, out: &mut Vec<u8>) {
    let mut tmp = [0u8; 5];
    let mut i = tmp.len();
    loop {
        i -= 1;
        tmp[i] = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    let last = tmp.len() - 1;
    for b in &mut tmp[i..last] {
        *b |= 0x80;
    }
    out.extend_from_slice(&tmp[i..]);
}

fn encode_oid(oid: &Oid) -> Vec<u8> {
    let arcs = oid.arcs();
    let mut out = Vec::with_capacity(arcs.len() + 4);
    encode_base128(arcs[0] * 40 + arcs[1], &mut out);
    for arc in &arcs[2..] {
        encode_base128(*arc, &mut out);
    }
    out
}

fn decode_integer(content: &[u8], offset: usize) -> Result<i64, BerError> {
    if content.is_empty() || content.len() > 8 {
        return Err(BerError::Invalid {
            offset,
            reason: format!("INTEGER of {} bytes", content.len()),
        });
    }
    let init: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    Ok(content.iter().fold(init, |acc, b| (acc << 8) | *b as i64))
}

fn decode_unsigned(content: &[u8], offset: usize) -> Result<u64, BerError> {
    let content = match content {
        [0, rest @ ..] if !rest.is_empty() => rest,
        _ => content,
    };
    if content.is_empty() || content.len() > 8 {
        return Err(BerError::Invalid {
            offset,
            reason: format!("unsigned of {} bytes", content.len()),
        });
    }
    Ok(content.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

fn decode_u32(content: &[u8], offset: usize) -> Result<u32, BerError> {
    let v = decode_unsigned(content, offset)?;
    u32::try_from(v).map_err(|_| BerError::Invalid {
        offset,
        reason: format!("{} does not fit a 32-bit type", v),
    })
}

fn decode_oid(content: &[u8], offset: usize) -> Result<Oid, BerError> {
    let mut values = Vec::new();
    let mut acc: u32 = 0;
    for (i, b) in content.iter().enumerate() {
        if acc > (u32::MAX >> 7) {
            return Err(BerError::Invalid {
                offset: offset + i,
                reason: "OID arc overflow".to_string(),
            });
        }
        acc = (acc << 7) | (b & 0x7f) as u32;
        if b & 0x80 == 0 {
            values.push(acc);
            acc = 0;
        }
    }
    if values.is_empty() || content.last().map_or(true, |b| b & 0x80 != 0) {
        return Err(BerError::Invalid {
            offset,
            reason: "incomplete OID".to_string(),
        });
    }

    let first = values[0];
    let (a, b) = match first {
        0..=39 => (0, first),
        40..=79 => (1, first - 40),
        _ => (2, first - 80),
    };
    let mut arcs = Vec::with_capacity(values.len() + 1);
    arcs.push(a);
    arcs.push(b);
    arcs.extend_from_slice(&values[1..]);
    Ok(Oid(arcs))
}
