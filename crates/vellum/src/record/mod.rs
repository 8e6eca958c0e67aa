//! Record codec: documents as stored bytes.
//!
//! Layout: a compact header enumerating the fields — varint field count,
//! then per field a varint name length, the name bytes, and a varint value
//! length — followed by the concatenation of the ordered-codec encodings of
//! each field value. Field lookup by name scans only the header; iteration
//! decodes values lazily. Encoding is deterministic, so re-encoding a
//! decoded document yields identical bytes.

use crate::error::{Error, Result};
use crate::types::{decode_value, encode_value, Document, FieldBuffer, Value};

pub fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    let mut header = Vec::new();
    let mut body = Vec::new();
    write_uvarint(doc.len() as u64, &mut header);
    for (name, value) in doc.iter() {
        let encoded = encode_value(value)?;
        write_uvarint(name.len() as u64, &mut header);
        header.extend_from_slice(name.as_bytes());
        write_uvarint(encoded.len() as u64, &mut header);
        body.extend_from_slice(&encoded);
    }
    header.extend_from_slice(&body);
    Ok(header)
}

pub fn decode_document(bytes: &[u8]) -> Result<Document> {
    let mut buf = FieldBuffer::new();
    for entry in EncodedDocument::new(bytes).iter() {
        let (name, value) = entry?;
        buf.add(name, value)
            .map_err(|_| Error::Codec(format!("duplicate field {}", name)))?;
    }
    Ok(buf.into_document())
}

/// A stored record, readable without decoding every field.
#[derive(Debug, Clone, Copy)]
pub struct EncodedDocument<'a> {
    bytes: &'a [u8],
}

impl<'a> EncodedDocument<'a> {
    pub fn new(bytes: &'a [u8]) -> EncodedDocument<'a> {
        EncodedDocument { bytes }
    }

    /// Decodes only the named field, scanning just the header to find it.
    pub fn field(&self, name: &str) -> Result<Option<Value>> {
        for entry in self.entries()? {
            let (field_name, body) = entry?;
            if field_name == name {
                return decode_value(body).map(Some);
            }
        }
        Ok(None)
    }

    /// Iterates `(name, value)` pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = Result<(&'a str, Value)>> {
        let entries = match self.entries() {
            Ok(entries) => entries,
            Err(err) => return EntryValues(Err(Some(err))),
        };
        EntryValues(Ok(entries))
    }

    fn entries(&self) -> Result<Entries<'a>> {
        let (count, read) = read_uvarint(self.bytes)?;
        Ok(Entries {
            bytes: self.bytes,
            header_at: read,
            body_at: header_end(self.bytes, read, count)?,
            remaining: count,
        })
    }
}

/// Computes where the body starts by walking the header once.
fn header_end(bytes: &[u8], mut at: usize, count: u64) -> Result<usize> {
    for _ in 0..count {
        let (name_len, read) = read_uvarint(bytes.get(at..).unwrap_or(&[]))?;
        at += read + name_len as usize;
        let (_, read) = read_uvarint(bytes.get(at..).unwrap_or(&[]))?;
        at += read;
    }
    if at > bytes.len() {
        return Err(Error::Codec("truncated record header".into()));
    }
    Ok(at)
}

/// Header walker yielding `(name, encoded value bytes)` per field.
struct Entries<'a> {
    bytes: &'a [u8],
    header_at: usize,
    body_at: usize,
    remaining: u64,
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<(&'a str, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.advance())
    }
}

impl<'a> Entries<'a> {
    fn advance(&mut self) -> Result<(&'a str, &'a [u8])> {
        let (name_len, read) = read_uvarint(&self.bytes[self.header_at..])?;
        self.header_at += read;
        let name_raw = self
            .bytes
            .get(self.header_at..self.header_at + name_len as usize)
            .ok_or_else(|| Error::Codec("truncated field name".into()))?;
        let name = std::str::from_utf8(name_raw)
            .map_err(|_| Error::Codec("invalid utf-8 in field name".into()))?;
        self.header_at += name_len as usize;

        let (value_len, read) = read_uvarint(&self.bytes[self.header_at..])?;
        self.header_at += read;
        let body = self
            .bytes
            .get(self.body_at..self.body_at + value_len as usize)
            .ok_or_else(|| Error::Codec("truncated field value".into()))?;
        self.body_at += value_len as usize;
        Ok((name, body))
    }
}

struct EntryValues<'a>(std::result::Result<Entries<'a>, Option<Error>>);

impl<'a> Iterator for EntryValues<'a> {
    type Item = Result<(&'a str, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.0 {
            Ok(entries) => match entries.next()? {
                Ok((name, body)) => Some(decode_value(body).map(|value| (name, value))),
                Err(err) => Some(Err(err)),
            },
            Err(err) => err.take().map(Err),
        }
    }
}

fn write_uvarint(mut v: u64, buf: &mut Vec<u8>) {
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v != 0 {
            buf.push(byte | 0x80);
        } else {
            buf.push(byte);
            return;
        }
    }
}

fn read_uvarint(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    let mut shift = 0u32;
    for (i, &byte) in bytes.iter().enumerate() {
        if shift >= 64 {
            break;
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(Error::Codec("invalid varint".into()))
}
