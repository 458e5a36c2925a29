//! Clarity values and their consensus wire encoding.
//!
//! Read-only calls send arguments and receive results as `0x`-prefixed hex of
//! this encoding. Only the subset of behaviour a client needs is here: exact
//! round-tripping of every value type, and a strict decoder that reports
//! malformed input instead of guessing.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::c32;

const TYPE_INT: u8 = 0x00;
const TYPE_UINT: u8 = 0x01;
const TYPE_BUFFER: u8 = 0x02;
const TYPE_TRUE: u8 = 0x03;
const TYPE_FALSE: u8 = 0x04;
const TYPE_STANDARD_PRINCIPAL: u8 = 0x05;
const TYPE_CONTRACT_PRINCIPAL: u8 = 0x06;
const TYPE_RESPONSE_OK: u8 = 0x07;
const TYPE_RESPONSE_ERR: u8 = 0x08;
const TYPE_OPTIONAL_NONE: u8 = 0x09;
const TYPE_OPTIONAL_SOME: u8 = 0x0a;
const TYPE_LIST: u8 = 0x0b;
const TYPE_TUPLE: u8 = 0x0c;
const TYPE_STRING_ASCII: u8 = 0x0d;
const TYPE_STRING_UTF8: u8 = 0x0e;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unknown type prefix 0x{0:02x}")]
    UnknownType(u8),
    #[error("invalid utf-8 in string value")]
    InvalidUtf8,
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("value nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing tuple field '{0}'")]
    MissingField(String),
    #[error("integer out of range for {0}")]
    OutOfRange(&'static str),
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Standard {
        version: u8,
        hash160: [u8; 20],
    },
    Contract {
        version: u8,
        hash160: [u8; 20],
        name: String,
    },
}

impl Principal {
    /// Parse `ADDRESS` or `ADDRESS.contract-name`, verifying the checksum.
    pub fn parse(s: &str) -> Result<Self, DecodeError> {
        let (addr, name) = match s.split_once('.') {
            Some((a, n)) => (a, Some(n)),
            None => (s, None),
        };
        let (version, hash160) =
            c32::decode_address(addr).map_err(|e| DecodeError::InvalidPrincipal(e.to_string()))?;
        Ok(match name {
            Some(n) if !n.is_empty() && n.len() <= 128 => Principal::Contract {
                version,
                hash160,
                name: n.to_string(),
            },
            Some(_) => return Err(DecodeError::InvalidPrincipal(s.to_string())),
            None => Principal::Standard { version, hash160 },
        })
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (version, hash160, name) = match self {
            Principal::Standard { version, hash160 } => (*version, hash160, None),
            Principal::Contract {
                version,
                hash160,
                name,
            } => (*version, hash160, Some(name)),
        };
        let addr = match c32::encode_address(version, hash160) {
            Ok(addr) => addr,
            Err(_) => format!("0x{:02x}{}", version, hex::encode(hash160)),
        };
        match name {
            Some(n) => write!(f, "{addr}.{n}"),
            None => write!(f, "{addr}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Bool(bool),
    Buffer(Vec<u8>),
    Principal(Principal),
    ResponseOk(Box<ClarityValue>),
    ResponseErr(Box<ClarityValue>),
    OptionalNone,
    OptionalSome(Box<ClarityValue>),
    List(Vec<ClarityValue>),
    Tuple(BTreeMap<String, ClarityValue>),
    StringAscii(String),
    StringUtf8(String),
}

impl ClarityValue {
    pub fn some(v: ClarityValue) -> Self {
        ClarityValue::OptionalSome(Box::new(v))
    }

    pub fn ok(v: ClarityValue) -> Self {
        ClarityValue::ResponseOk(Box::new(v))
    }

    pub fn tuple<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, ClarityValue)>,
        K: Into<String>,
    {
        ClarityValue::Tuple(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ClarityValue::Int(_) => "int",
            ClarityValue::UInt(_) => "uint",
            ClarityValue::Bool(_) => "bool",
            ClarityValue::Buffer(_) => "buffer",
            ClarityValue::Principal(_) => "principal",
            ClarityValue::ResponseOk(_) => "ok response",
            ClarityValue::ResponseErr(_) => "err response",
            ClarityValue::OptionalNone => "none",
            ClarityValue::OptionalSome(_) => "some",
            ClarityValue::List(_) => "list",
            ClarityValue::Tuple(_) => "tuple",
            ClarityValue::StringAscii(_) => "string-ascii",
            ClarityValue::StringUtf8(_) => "string-utf8",
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    /// `0x`-prefixed hex, the form the node's HTTP API expects.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.serialize()))
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            ClarityValue::Int(v) => {
                out.push(TYPE_INT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            ClarityValue::UInt(v) => {
                out.push(TYPE_UINT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            ClarityValue::Bool(true) => out.push(TYPE_TRUE),
            ClarityValue::Bool(false) => out.push(TYPE_FALSE),
            ClarityValue::Buffer(bytes) => {
                out.push(TYPE_BUFFER);
                write_len_prefixed(out, bytes);
            }
            ClarityValue::Principal(Principal::Standard { version, hash160 }) => {
                out.push(TYPE_STANDARD_PRINCIPAL);
                out.push(*version);
                out.extend_from_slice(hash160);
            }
            ClarityValue::Principal(Principal::Contract {
                version,
                hash160,
                name,
            }) => {
                out.push(TYPE_CONTRACT_PRINCIPAL);
                out.push(*version);
                out.extend_from_slice(hash160);
                out.push(name.len() as u8);
                out.extend_from_slice(name.as_bytes());
            }
            ClarityValue::ResponseOk(inner) => {
                out.push(TYPE_RESPONSE_OK);
                inner.write_to(out);
            }
            ClarityValue::ResponseErr(inner) => {
                out.push(TYPE_RESPONSE_ERR);
                inner.write_to(out);
            }
            ClarityValue::OptionalNone => out.push(TYPE_OPTIONAL_NONE),
            ClarityValue::OptionalSome(inner) => {
                out.push(TYPE_OPTIONAL_SOME);
                inner.write_to(out);
            }
            ClarityValue::List(items) => {
                out.push(TYPE_LIST);
                out.extend_from_slice(&(items.len() as u32).to_be_bytes());
                for item in items {
                    item.write_to(out);
                }
            }
            ClarityValue::Tuple(fields) => {
                // BTreeMap iteration is already in canonical (sorted) key order.
                out.push(TYPE_TUPLE);
                out.extend_from_slice(&(fields.len() as u32).to_be_bytes());
                for (name, value) in fields {
                    out.push(name.len() as u8);
                    out.extend_from_slice(name.as_bytes());
                    value.write_to(out);
                }
            }
            ClarityValue::StringAscii(s) => {
                out.push(TYPE_STRING_ASCII);
                write_len_prefixed(out, s.as_bytes());
            }
            ClarityValue::StringUtf8(s) => {
                out.push(TYPE_STRING_UTF8);
                write_len_prefixed(out, s.as_bytes());
            }
        }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader { buf: bytes, pos: 0 };
        let value = reader.value(0)?;
        let rest = bytes.len() - reader.pos;
        if rest != 0 {
            return Err(DecodeError::TrailingBytes(rest));
        }
        Ok(value)
    }

    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    // ----- typed accessors -----

    pub fn expect_uint(&self) -> Result<u128, DecodeError> {
        match self {
            ClarityValue::UInt(v) => Ok(*v),
            other => Err(unexpected("uint", other)),
        }
    }

    pub fn expect_principal(&self) -> Result<&Principal, DecodeError> {
        match self {
            ClarityValue::Principal(p) => Ok(p),
            other => Err(unexpected("principal", other)),
        }
    }

    /// Either string flavour; contract revisions have used both for messages.
    pub fn expect_string(&self) -> Result<&str, DecodeError> {
        match self {
            ClarityValue::StringUtf8(s) | ClarityValue::StringAscii(s) => Ok(s),
            other => Err(unexpected("string", other)),
        }
    }

    pub fn expect_tuple(&self) -> Result<&BTreeMap<String, ClarityValue>, DecodeError> {
        match self {
            ClarityValue::Tuple(fields) => Ok(fields),
            other => Err(unexpected("tuple", other)),
        }
    }

    /// Present/absent split for optionals. Anything that is neither `some`
    /// nor `none` is malformed.
    pub fn into_optional(self) -> Result<Option<ClarityValue>, DecodeError> {
        match self {
            ClarityValue::OptionalNone => Ok(None),
            ClarityValue::OptionalSome(inner) => Ok(Some(*inner)),
            other => Err(unexpected("optional", &other)),
        }
    }

    /// Strip a top-level `(ok ...)`. An `(err ...)` is reported as malformed.
    pub fn unwrap_response(self) -> Result<ClarityValue, DecodeError> {
        match self {
            ClarityValue::ResponseOk(inner) => Ok(*inner),
            ClarityValue::ResponseErr(_) => Err(DecodeError::UnexpectedType {
                expected: "ok response",
                found: "err response",
            }),
            other => Ok(other),
        }
    }
}

pub fn field<'a>(
    fields: &'a BTreeMap<String, ClarityValue>,
    name: &str,
) -> Result<&'a ClarityValue, DecodeError> {
    fields
        .get(name)
        .ok_or_else(|| DecodeError::MissingField(name.to_string()))
}

fn unexpected(expected: &'static str, found: &ClarityValue) -> DecodeError {
    DecodeError::UnexpectedType {
        expected,
        found: found.type_name(),
    }
}

fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).ok_or(DecodeError::UnexpectedEof)?;
        let slice = self.buf.get(self.pos..end).ok_or(DecodeError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn bytes16(&mut self) -> Result<[u8; 16], DecodeError> {
        let mut out = [0u8; 16];
        out.copy_from_slice(self.take(16)?);
        Ok(out)
    }

    fn version(&mut self) -> Result<u8, DecodeError> {
        match self.u8()? {
            v if v < 32 => Ok(v),
            v => Err(DecodeError::InvalidPrincipal(format!("version {v}"))),
        }
    }

    fn hash160(&mut self) -> Result<[u8; 20], DecodeError> {
        let mut out = [0u8; 20];
        out.copy_from_slice(self.take(20)?);
        Ok(out)
    }

    fn utf8(&mut self, len: usize) -> Result<String, DecodeError> {
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    fn value(&mut self, depth: usize) -> Result<ClarityValue, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep);
        }
        let prefix = self.u8()?;
        Ok(match prefix {
            TYPE_INT => ClarityValue::Int(i128::from_be_bytes(self.bytes16()?)),
            TYPE_UINT => ClarityValue::UInt(u128::from_be_bytes(self.bytes16()?)),
            TYPE_BUFFER => {
                let len = self.u32()? as usize;
                ClarityValue::Buffer(self.take(len)?.to_vec())
            }
            TYPE_TRUE => ClarityValue::Bool(true),
            TYPE_FALSE => ClarityValue::Bool(false),
            TYPE_STANDARD_PRINCIPAL => {
                let version = self.version()?;
                let hash160 = self.hash160()?;
                ClarityValue::Principal(Principal::Standard { version, hash160 })
            }
            TYPE_CONTRACT_PRINCIPAL => {
                let version = self.version()?;
                let hash160 = self.hash160()?;
                let len = self.u8()? as usize;
                let name = self.utf8(len)?;
                ClarityValue::Principal(Principal::Contract {
                    version,
                    hash160,
                    name,
                })
            }
            TYPE_RESPONSE_OK => ClarityValue::ResponseOk(Box::new(self.value(depth + 1)?)),
            TYPE_RESPONSE_ERR => ClarityValue::ResponseErr(Box::new(self.value(depth + 1)?)),
            TYPE_OPTIONAL_NONE => ClarityValue::OptionalNone,
            TYPE_OPTIONAL_SOME => ClarityValue::OptionalSome(Box::new(self.value(depth + 1)?)),
            TYPE_LIST => {
                let len = self.u32()? as usize;
                // Each element takes at least one byte; refuse lengths the buffer can't hold.
                if len > self.buf.len() - self.pos {
                    return Err(DecodeError::UnexpectedEof);
                }
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.value(depth + 1)?);
                }
                ClarityValue::List(items)
            }
            TYPE_TUPLE => {
                let len = self.u32()? as usize;
                let mut fields = BTreeMap::new();
                for _ in 0..len {
                    let name_len = self.u8()? as usize;
                    let name = self.utf8(name_len)?;
                    let value = self.value(depth + 1)?;
                    fields.insert(name, value);
                }
                ClarityValue::Tuple(fields)
            }
            TYPE_STRING_ASCII => {
                let len = self.u32()? as usize;
                ClarityValue::StringAscii(self.utf8(len)?)
            }
            TYPE_STRING_UTF8 => {
                let len = self.u32()? as usize;
                ClarityValue::StringUtf8(self.utf8(len)?)
            }
            other => return Err(DecodeError::UnknownType(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_wire_format() {
        assert_eq!(
            ClarityValue::UInt(7).to_hex(),
            "0x0100000000000000000000000000000007"
        );
        assert_eq!(
            ClarityValue::from_hex("0x0100000000000000000000000000000007").unwrap(),
            ClarityValue::UInt(7)
        );
    }

    #[test]
    fn utf8_string_wire_format() {
        let v = ClarityValue::StringUtf8("hi".into());
        assert_eq!(v.to_hex(), "0x0e000000026869");
    }

    #[test]
    fn optional_tip_tuple_decodes() {
        let tipper = Principal::Standard {
            version: c32::MAINNET_SINGLESIG,
            hash160: [7u8; 20],
        };
        let value = ClarityValue::some(ClarityValue::tuple([
            ("tipper", ClarityValue::Principal(tipper.clone())),
            ("amount", ClarityValue::UInt(1_500_000)),
            ("message", ClarityValue::StringUtf8("gm ☕".into())),
            ("block", ClarityValue::UInt(150_000)),
        ]));

        let decoded = ClarityValue::from_hex(&value.to_hex()).unwrap();
        assert_eq!(decoded, value);

        let inner = decoded.into_optional().unwrap().unwrap();
        let fields = inner.expect_tuple().unwrap();
        assert_eq!(field(fields, "amount").unwrap().expect_uint().unwrap(), 1_500_000);
        assert_eq!(field(fields, "message").unwrap().expect_string().unwrap(), "gm ☕");
        assert_eq!(field(fields, "tipper").unwrap().expect_principal().unwrap(), &tipper);
    }

    #[test]
    fn none_is_absent_not_error() {
        let v = ClarityValue::from_hex("0x09").unwrap();
        assert_eq!(v.into_optional().unwrap(), None);
    }

    #[test]
    fn tuple_keys_are_sorted_on_the_wire() {
        let v = ClarityValue::tuple([("b", ClarityValue::Bool(true)), ("a", ClarityValue::Bool(false))]);
        // 0c | 00000002 | 01 'a' 04 | 01 'b' 03
        assert_eq!(v.to_hex(), "0x0c00000002016104016203");
    }

    #[test]
    fn malformed_input_is_reported() {
        assert_eq!(ClarityValue::from_hex("0x01"), Err(DecodeError::UnexpectedEof));
        assert_eq!(ClarityValue::from_hex("0xff"), Err(DecodeError::UnknownType(0xff)));
        assert_eq!(ClarityValue::from_hex("0x0903"), Err(DecodeError::TrailingBytes(1)));
        assert!(matches!(ClarityValue::from_hex("0xzz"), Err(DecodeError::InvalidHex(_))));
        assert_eq!(
            ClarityValue::from_hex("0x0e00000001ff"),
            Err(DecodeError::InvalidUtf8)
        );
        // list claiming four billion elements in a five-byte buffer
        assert_eq!(
            ClarityValue::from_hex("0x0bffffffff"),
            Err(DecodeError::UnexpectedEof)
        );
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let mut bytes = vec![TYPE_OPTIONAL_SOME; MAX_DEPTH + 2];
        bytes.push(TYPE_TRUE);
        assert_eq!(ClarityValue::deserialize(&bytes), Err(DecodeError::TooDeep));
    }

    #[test]
    fn response_wrapper_is_stripped() {
        let v = ClarityValue::ok(ClarityValue::UInt(3));
        assert_eq!(v.unwrap_response().unwrap(), ClarityValue::UInt(3));
        assert_eq!(
            ClarityValue::UInt(3).unwrap_response().unwrap(),
            ClarityValue::UInt(3)
        );
        assert!(ClarityValue::ResponseErr(Box::new(ClarityValue::UInt(1)))
            .unwrap_response()
            .is_err());
    }

    #[test]
    fn principal_parse_and_display() {
        let p = Principal::parse("SP3E0DQAHTXJHH5YT9TZCSBW013YXZB25QFDVXXWY.tip-jar-v3").unwrap();
        assert!(matches!(p, Principal::Contract { ref name, .. } if name == "tip-jar-v3"));
        assert_eq!(
            p.to_string(),
            "SP3E0DQAHTXJHH5YT9TZCSBW013YXZB25QFDVXXWY.tip-jar-v3"
        );

        let std = Principal::parse("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7").unwrap();
        let bytes = ClarityValue::Principal(std.clone()).serialize();
        assert_eq!(bytes[0], TYPE_STANDARD_PRINCIPAL);
        assert_eq!(bytes[1], c32::MAINNET_SINGLESIG);
        assert_eq!(bytes.len(), 22);

        assert!(Principal::parse("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7.").is_err());
    }
}
