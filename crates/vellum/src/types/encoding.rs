//! Order-preserving byte encoding of values.
//!
//! Every encoding starts with the value's type tag, followed by a body
//! chosen so that `memcmp` over whole encodings matches the logical value
//! order within a type (and the tag order across types). Index keys and
//! primary-key record ids are built from these bytes, and the record codec
//! reuses them as its field bodies, so decoding is self-delimiting.

use super::{Array, FieldBuffer, Value, ValueKind};
use crate::error::{Error, Result};

const COMPOSITE_ITEM: u8 = 0x01;
const COMPOSITE_END: u8 = 0x00;

pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_into(value, &mut buf)?;
    Ok(buf)
}

pub fn encode_value_into(value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    buf.push(value.kind().tag());
    match value {
        Value::Null => {}
        Value::Bool(b) => buf.push(*b as u8),
        Value::Int64(i) => {
            // Flipping the sign bit makes negatives sort before positives.
            let flipped = (*i as u64) ^ (1 << 63);
            buf.extend_from_slice(&flipped.to_be_bytes());
        }
        Value::Float64(f) => {
            if f.is_nan() {
                return Err(Error::type_mismatch("orderable float64", "NaN"));
            }
            let bits = f.to_bits();
            let sortable = if f.is_sign_negative() {
                !bits
            } else {
                bits ^ (1 << 63)
            };
            buf.extend_from_slice(&sortable.to_be_bytes());
        }
        Value::Text(s) => escape_into(s.as_bytes(), buf),
        Value::Blob(b) => escape_into(b, buf),
        Value::Array(array) => {
            for item in array.iter() {
                buf.push(COMPOSITE_ITEM);
                encode_value_into(item, buf)?;
            }
            buf.push(COMPOSITE_END);
        }
        Value::Document(doc) => {
            for (name, item) in doc.iter() {
                buf.push(COMPOSITE_ITEM);
                escape_into(name.as_bytes(), buf);
                encode_value_into(item, buf)?;
            }
            buf.push(COMPOSITE_END);
        }
    }
    Ok(())
}

/// Decodes one value, requiring that it spans the whole input.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    let (value, read) = decode_value_prefix(bytes)?;
    if read != bytes.len() {
        return Err(Error::Codec(format!(
            "{} trailing bytes after encoded value",
            bytes.len() - read
        )));
    }
    Ok(value)
}

/// Decodes one value from the front of `bytes`, returning it with the
/// number of bytes consumed.
pub fn decode_value_prefix(bytes: &[u8]) -> Result<(Value, usize)> {
    let (&tag, body) = bytes
        .split_first()
        .ok_or_else(|| Error::Codec("empty encoded value".into()))?;
    let kind = ValueKind::from_tag(tag)
        .ok_or_else(|| Error::Codec(format!("unknown value tag {:#04x}", tag)))?;

    let (value, body_read) = match kind {
        ValueKind::Null => (Value::Null, 0),
        ValueKind::Bool => match body.first() {
            Some(0) => (Value::Bool(false), 1),
            Some(1) => (Value::Bool(true), 1),
            Some(b) => return Err(Error::Codec(format!("invalid bool byte {:#04x}", b))),
            None => return Err(Error::Codec("truncated bool".into())),
        },
        ValueKind::Int64 => {
            let raw = fixed8(body, "int64")?;
            (Value::Int64((u64::from_be_bytes(raw) ^ (1 << 63)) as i64), 8)
        }
        ValueKind::Float64 => {
            let raw = fixed8(body, "float64")?;
            let sortable = u64::from_be_bytes(raw);
            let bits = if sortable & (1 << 63) != 0 {
                sortable ^ (1 << 63)
            } else {
                !sortable
            };
            (Value::Float64(f64::from_bits(bits)), 8)
        }
        ValueKind::Text => {
            let (raw, read) = unescape(body)?;
            let text = String::from_utf8(raw)
                .map_err(|_| Error::Codec("invalid utf-8 in encoded text".into()))?;
            (Value::Text(text), read)
        }
        ValueKind::Blob => {
            let (raw, read) = unescape(body)?;
            (Value::Blob(raw), read)
        }
        ValueKind::Array => {
            let mut array = Array::new();
            let mut at = 0;
            loop {
                match body.get(at) {
                    Some(&COMPOSITE_END) => break (Value::Array(array), at + 1),
                    Some(&COMPOSITE_ITEM) => {
                        let (item, read) = decode_value_prefix(&body[at + 1..])?;
                        array.push(item);
                        at += 1 + read;
                    }
                    Some(b) => {
                        return Err(Error::Codec(format!("invalid array marker {:#04x}", b)))
                    }
                    None => return Err(Error::Codec("truncated array".into())),
                }
            }
        }
        ValueKind::Document => {
            let mut buf = FieldBuffer::new();
            let mut at = 0;
            loop {
                match body.get(at) {
                    Some(&COMPOSITE_END) => break (Value::Document(buf.into_document()), at + 1),
                    Some(&COMPOSITE_ITEM) => {
                        let (raw_name, name_read) = unescape(&body[at + 1..])?;
                        let name = String::from_utf8(raw_name).map_err(|_| {
                            Error::Codec("invalid utf-8 in encoded field name".into())
                        })?;
                        let (item, value_read) =
                            decode_value_prefix(&body[at + 1 + name_read..])?;
                        buf.add(&name, item)
                            .map_err(|_| Error::Codec(format!("duplicate field {}", name)))?;
                        at += 1 + name_read + value_read;
                    }
                    Some(b) => {
                        return Err(Error::Codec(format!("invalid document marker {:#04x}", b)))
                    }
                    None => return Err(Error::Codec("truncated document".into())),
                }
            }
        }
    };
    Ok((value, 1 + body_read))
}

fn fixed8(body: &[u8], what: &str) -> Result<[u8; 8]> {
    body.get(..8)
        .and_then(|b| <[u8; 8]>::try_from(b).ok())
        .ok_or_else(|| Error::Codec(format!("truncated {}", what)))
}

/// Null-byte escaping: `0x00` becomes `0x00 0xFF`, and `0x00 0x00`
/// terminates. Escaped strings keep their lexicographic order and shorter
/// prefixes sort first.
fn escape_into(raw: &[u8], buf: &mut Vec<u8>) {
    for &byte in raw {
        buf.push(byte);
        if byte == 0x00 {
            buf.push(0xFF);
        }
    }
    buf.extend_from_slice(&[0x00, 0x00]);
}

fn unescape(body: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let mut at = 0;
    loop {
        match body.get(at) {
            Some(&0x00) => match body.get(at + 1) {
                Some(&0x00) => return Ok((out, at + 2)),
                Some(&0xFF) => {
                    out.push(0x00);
                    at += 2;
                }
                _ => return Err(Error::Codec("invalid escape in encoded bytes".into())),
            },
            Some(&byte) => {
                out.push(byte);
                at += 1;
            }
            None => return Err(Error::Codec("unterminated encoded bytes".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;

    fn doc(fields: &[(&str, Value)]) -> Document {
        let mut buf = FieldBuffer::new();
        for (name, value) in fields {
            buf.add(name, value.clone()).unwrap();
        }
        buf.into_document()
    }

    #[track_caller]
    fn round_trip(value: Value) {
        let encoded = encode_value(&value).unwrap();
        assert_eq!(decode_value(&encoded).unwrap(), value);
    }

    #[test]
    fn round_trips() {
        round_trip(Value::Null);
        round_trip(Value::Bool(true));
        round_trip(Value::Int64(0));
        round_trip(Value::Int64(i64::MIN));
        round_trip(Value::Int64(i64::MAX));
        round_trip(Value::Float64(-1.5));
        round_trip(Value::Float64(f64::INFINITY));
        round_trip(Value::Text("".into()));
        round_trip(Value::Text("héllo\u{0}world".into()));
        round_trip(Value::Blob(vec![0, 255, 0, 0, 1]));
        round_trip(Value::Array(Array::from(vec![
            Value::Int64(1),
            Value::Text("two".into()),
            Value::Array(Array::from(vec![Value::Null])),
        ])));
        round_trip(Value::Document(doc(&[
            ("a", Value::Int64(1)),
            ("b", Value::Document(doc(&[("c", Value::Bool(false))]))),
        ])));
    }

    #[test]
    fn nan_is_rejected() {
        assert!(encode_value(&Value::Float64(f64::NAN)).is_err());
    }

    #[track_caller]
    fn assert_encoded_order(values: &[Value]) {
        let encoded: Vec<_> = values.iter().map(|v| encode_value(v).unwrap()).collect();
        for pair in encoded.windows(2) {
            assert!(pair[0] < pair[1], "{:?} !< {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn integer_encoding_orders_by_value() {
        assert_encoded_order(&[
            Value::Int64(i64::MIN),
            Value::Int64(-100),
            Value::Int64(-1),
            Value::Int64(0),
            Value::Int64(1),
            Value::Int64(100),
            Value::Int64(i64::MAX),
        ]);
    }

    #[test]
    fn float_encoding_orders_by_value() {
        assert_encoded_order(&[
            Value::Float64(f64::NEG_INFINITY),
            Value::Float64(-1000.5),
            Value::Float64(-1.0),
            Value::Float64(-0.001),
            Value::Float64(0.0),
            Value::Float64(0.001),
            Value::Float64(1.0),
            Value::Float64(1000.5),
            Value::Float64(f64::INFINITY),
        ]);
    }

    #[test]
    fn text_encoding_orders_lexicographically() {
        assert_encoded_order(&[
            Value::Text("".into()),
            Value::Text("a".into()),
            Value::Text("a\u{0}".into()),
            Value::Text("ab".into()),
            Value::Text("b".into()),
        ]);
    }

    #[test]
    fn array_encoding_respects_prefix_rule() {
        assert_encoded_order(&[
            Value::Array(Array::from(vec![Value::Int64(1)])),
            Value::Array(Array::from(vec![Value::Int64(1), Value::Int64(2)])),
            Value::Array(Array::from(vec![Value::Int64(2)])),
        ]);
    }

    #[test]
    fn cross_type_encoding_orders_by_tag() {
        assert_encoded_order(&[
            Value::Null,
            Value::Bool(true),
            Value::Int64(i64::MAX),
            Value::Float64(f64::NEG_INFINITY),
            Value::Text("a".into()),
            Value::Blob(vec![b'a']),
            Value::Array(Array::from(vec![])),
            Value::Document(doc(&[])),
        ]);
    }
}
