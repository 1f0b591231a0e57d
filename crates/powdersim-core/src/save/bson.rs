//! The small subset of BSON used by OPS saves
//!
//! Array element keys are kept as written: saves use them as data (palette
//! identifiers, `"sign"`, `"render_mode"`), so arrays are stored as ordinary
//! documents rather than renumbered lists.

use super::error::ParseError;

const TYPE_DOUBLE: u8 = 0x01;
const TYPE_STRING: u8 = 0x02;
const TYPE_DOCUMENT: u8 = 0x03;
const TYPE_ARRAY: u8 = 0x04;
const TYPE_BINARY: u8 = 0x05;
const TYPE_BOOL: u8 = 0x08;
const TYPE_NULL: u8 = 0x0A;
const TYPE_INT32: u8 = 0x10;
const TYPE_INT64: u8 = 0x12;

/// Binary subtype for application data, used for every OPS blob
pub const BINARY_USER: u8 = 0x80;

/// Nesting beyond this is treated as malformed
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum Bson {
    Double(f64),
    String(String),
    Document(Document),
    /// Same layout as a document; keys are not renumbered
    Array(Document),
    Binary { subtype: u8, data: Vec<u8> },
    Bool(bool),
    Null,
    Int32(i32),
    Int64(i64),
}

impl Bson {
    pub fn type_name(&self) -> &'static str {
        match self {
            Bson::Double(_) => "double",
            Bson::String(_) => "string",
            Bson::Document(_) => "object",
            Bson::Array(_) => "array",
            Bson::Binary { .. } => "binary",
            Bson::Bool(_) => "bool",
            Bson::Null => "null",
            Bson::Int32(_) => "int",
            Bson::Int64(_) => "long",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Bson::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Bson::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Bson::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Bson::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Document> {
        match self {
            Bson::Array(d) => Some(d),
            _ => None,
        }
    }

    /// Data of a user-subtype binary with at least one byte
    pub fn as_user_binary(&self) -> Option<&[u8]> {
        match self {
            Bson::Binary { subtype, data } if *subtype == BINARY_USER && !data.is_empty() => {
                Some(data)
            }
            _ => None,
        }
    }
}

/// Ordered key/value pairs; duplicate keys are allowed and preserved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, Bson)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: Bson) {
        self.entries.push((key.into(), value));
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&Bson> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bson)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode a document from the start of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = Reader { bytes, pos: 0 };
        reader.document(0)
    }

    /// Encode as a complete BSON document
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_document(&mut out, self);
        out
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

fn bson_err(msg: &str) -> ParseError {
    ParseError::Bson(msg.to_string())
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| bson_err("unexpected end of document"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    fn i32(&mut self) -> Result<i32, ParseError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i64(&mut self) -> Result<i64, ParseError> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(i64::from_le_bytes(raw))
    }

    fn length(&mut self) -> Result<usize, ParseError> {
        let len = self.i32()?;
        usize::try_from(len).map_err(|_| bson_err("negative length"))
    }

    fn cstring(&mut self) -> Result<String, ParseError> {
        let rest = &self.bytes[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| bson_err("unterminated key"))?;
        let s = String::from_utf8_lossy(&rest[..nul]).into_owned();
        self.pos += nul + 1;
        Ok(s)
    }

    fn string(&mut self) -> Result<String, ParseError> {
        let len = self.length()?;
        if len == 0 {
            return Err(bson_err("bad string length"));
        }
        let raw = self.take(len)?;
        if raw[len - 1] != 0 {
            return Err(bson_err("string not terminated"));
        }
        Ok(String::from_utf8_lossy(&raw[..len - 1]).into_owned())
    }

    fn document(&mut self, depth: usize) -> Result<Document, ParseError> {
        if depth > MAX_DEPTH {
            return Err(bson_err("nesting too deep"));
        }
        let start = self.pos;
        let size = self.length()?;
        if size < 5 || start + size > self.bytes.len() {
            return Err(bson_err("bad document size"));
        }
        let end = start + size - 1;

        let mut doc = Document::new();
        while self.pos < end {
            let kind = self.u8()?;
            let key = self.cstring()?;
            let value = match kind {
                TYPE_DOUBLE => Bson::Double(f64::from_bits(self.i64()? as u64)),
                TYPE_STRING => Bson::String(self.string()?),
                TYPE_DOCUMENT => Bson::Document(self.document(depth + 1)?),
                TYPE_ARRAY => Bson::Array(self.document(depth + 1)?),
                TYPE_BINARY => {
                    let len = self.length()?;
                    let subtype = self.u8()?;
                    Bson::Binary {
                        subtype,
                        data: self.take(len)?.to_vec(),
                    }
                }
                TYPE_BOOL => Bson::Bool(self.u8()? != 0),
                TYPE_NULL => Bson::Null,
                TYPE_INT32 => Bson::Int32(self.i32()?),
                TYPE_INT64 => Bson::Int64(self.i64()?),
                other => return Err(ParseError::Bson(format!("unsupported element type {other:#04x}"))),
            };
            doc.push(key, value);
        }
        if self.pos != end || self.u8()? != 0 {
            return Err(bson_err("document overruns its size"));
        }
        Ok(doc)
    }
}

fn write_cstring(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    out.extend_from_slice(&bytes[..len]);
    out.push(0);
}

fn write_document(out: &mut Vec<u8>, doc: &Document) {
    let start = out.len();
    out.extend_from_slice(&[0; 4]);
    for (key, value) in &doc.entries {
        let kind = match value {
            Bson::Double(_) => TYPE_DOUBLE,
            Bson::String(_) => TYPE_STRING,
            Bson::Document(_) => TYPE_DOCUMENT,
            Bson::Array(_) => TYPE_ARRAY,
            Bson::Binary { .. } => TYPE_BINARY,
            Bson::Bool(_) => TYPE_BOOL,
            Bson::Null => TYPE_NULL,
            Bson::Int32(_) => TYPE_INT32,
            Bson::Int64(_) => TYPE_INT64,
        };
        out.push(kind);
        write_cstring(out, key);
        match value {
            Bson::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
            Bson::String(s) => {
                out.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
            Bson::Document(d) | Bson::Array(d) => write_document(out, d),
            Bson::Binary { subtype, data } => {
                out.extend_from_slice(&(data.len() as i32).to_le_bytes());
                out.push(*subtype);
                out.extend_from_slice(data);
            }
            Bson::Bool(b) => out.push(u8::from(*b)),
            Bson::Null => {}
            Bson::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Bson::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
    out.push(0);
    let size = (out.len() - start) as i32;
    out[start..start + 4].copy_from_slice(&size.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_keys_survive() {
        let mut palette = Document::new();
        palette.push("DEFAULT_PT_DUST", Bson::Int32(1));
        palette.push("DEFAULT_PT_WATR", Bson::Int32(2));
        let mut doc = Document::new();
        doc.push("palette", Bson::Array(palette));
        doc.push("pi", Bson::Double(3.5));
        doc.push("name", Bson::String("sand".into()));

        let parsed = Document::from_bytes(&doc.to_bytes()).unwrap();
        let palette = parsed.get("palette").and_then(Bson::as_array).unwrap();
        let keys: Vec<&str> = palette.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["DEFAULT_PT_DUST", "DEFAULT_PT_WATR"]);
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_user_binary_requires_subtype_and_data() {
        let user = Bson::Binary {
            subtype: BINARY_USER,
            data: vec![1, 2],
        };
        let generic = Bson::Binary {
            subtype: 0,
            data: vec![1, 2],
        };
        let empty = Bson::Binary {
            subtype: BINARY_USER,
            data: vec![],
        };
        assert_eq!(user.as_user_binary(), Some(&[1u8, 2][..]));
        assert!(generic.as_user_binary().is_none());
        assert!(empty.as_user_binary().is_none());
    }

    #[test]
    fn test_truncated_document_is_rejected() {
        let mut doc = Document::new();
        doc.push("legacyEnable", Bson::Bool(true));
        let bytes = doc.to_bytes();
        assert!(matches!(
            Document::from_bytes(&bytes[..bytes.len() - 2]),
            Err(ParseError::Bson(_))
        ));
    }

    #[test]
    fn test_lying_binary_length_is_rejected() {
        let mut doc = Document::new();
        doc.push(
            "parts",
            Bson::Binary {
                subtype: BINARY_USER,
                data: vec![9; 4],
            },
        );
        let mut bytes = doc.to_bytes();
        // length field of the binary follows type byte, "parts\0"
        let len_at = 4 + 1 + 6;
        bytes[len_at..len_at + 4].copy_from_slice(&1000i32.to_le_bytes());
        assert!(Document::from_bytes(&bytes).is_err());
    }
}
