//! Records and batches handed to the sink by the host.
//!
//! A [`Record`] is a JSON object whose key order is preserved from insertion,
//! so both payload encodings emit fields in the order the host produced them.
//! Hosts that buffer MessagePack-framed `[tag, time, record]` entries can hand
//! the raw chunk to [`EventBatch::from_msgpack_chunk`], which keeps only the
//! records.

use std::fmt;
use std::io::Cursor;

use serde::Deserialize;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};

use crate::error::DeliveryError;

/// Single structured record.
pub type Record = Map<String, Value>;

/// Ordered group of records flushed together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventBatch {
    records: Vec<Record>,
}

/// Buffered entry as framed by the host: `[tag, time, record]`.
#[derive(Deserialize)]
struct ChunkEntry(IgnoredAny, IgnoredAny, ChunkRecord);

impl EventBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Decode a chunk of concatenated MessagePack `[tag, time, record]`
    /// arrays, discarding tag and time.
    pub fn from_msgpack_chunk(chunk: &[u8]) -> Result<Self, DeliveryError> {
        let mut cursor = Cursor::new(chunk);
        let mut records = Vec::new();
        while (cursor.position() as usize) < chunk.len() {
            let ChunkEntry(_, _, ChunkRecord(record)) = rmp_serde::from_read(&mut cursor)?;
            records.push(record);
        }
        Ok(Self { records })
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for EventBatch {
    fn from(records: Vec<Record>) -> Self {
        Self::from_records(records)
    }
}

impl FromIterator<Record> for EventBatch {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Record map decoded from a chunk entry.
struct ChunkRecord(Record);

impl<'de> Deserialize<'de> for ChunkRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match ChunkValue::deserialize(deserializer)?.0 {
            Value::Object(map) => Ok(Self(map)),
            other => Err(de::Error::custom(format_args!(
                "expected a record map, found {other}"
            ))),
        }
    }
}

/// Any MessagePack value, with `bin` payloads read as UTF-8 text.
///
/// Hosts pack strings without an encoding tag as `bin`, so the bytes are
/// decoded as UTF-8 and invalid sequences are replaced rather than failing
/// the chunk.
struct ChunkValue(Value);

impl<'de> Deserialize<'de> for ChunkValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ChunkValueVisitor).map(Self)
    }
}

struct ChunkValueVisitor;

impl<'de> Visitor<'de> for ChunkValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a MessagePack value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    // NaN and infinities have no JSON form and become null.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::String(String::from_utf8_lossy(v).into_owned()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Value, E> {
        let text = String::from_utf8(v)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned());
        Ok(Value::String(text))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(ChunkValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut record = Record::new();
        while let Some((ChunkValue(key), ChunkValue(value))) = map.next_entry()? {
            record.insert(key_text(key), value);
        }
        Ok(Value::Object(record))
    }
}

/// JSON object keys must be strings; other key types use their JSON text.
fn key_text(key: Value) -> String {
    match key {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::record;
    use rstest::rstest;
    use serde_json::json;

    /// One `["tag", 1, <record>]` entry around hand-packed record bytes.
    fn entry_with_record(packed: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x93, 0xa3, b't', b'a', b'g', 0x01];
        bytes.extend_from_slice(packed);
        bytes
    }

    fn framed(entries: &[(&str, u64, Value)]) -> Vec<u8> {
        entries
            .iter()
            .flat_map(|entry| rmp_serde::to_vec(entry).expect("encode entry"))
            .collect()
    }

    #[rstest]
    fn decodes_chunk_and_strips_metadata() {
        let chunk = framed(&[
            ("app.access", 1_700_000_000, json!({"foo": "bar"})),
            ("app.error", 1_700_000_001, json!({"level": 3, "ok": false})),
        ]);
        let batch = EventBatch::from_msgpack_chunk(&chunk).expect("decode chunk");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.records()[0], record(json!({"foo": "bar"})));
        assert_eq!(batch.records()[1], record(json!({"level": 3, "ok": false})));
    }

    #[rstest]
    fn empty_chunk_is_empty_batch() {
        let batch = EventBatch::from_msgpack_chunk(&[]).expect("decode empty");
        assert!(batch.is_empty());
    }

    #[rstest]
    fn truncated_chunk_is_an_error() {
        let mut chunk = framed(&[("tag", 1, json!({"foo": "bar"}))]);
        chunk.truncate(chunk.len() - 2);
        let err = EventBatch::from_msgpack_chunk(&chunk).expect_err("truncated");
        assert!(matches!(err, DeliveryError::Decode(_)));
        assert!(!err.is_retryable());
    }

    #[rstest]
    fn record_preserves_key_order() {
        let record = record(json!({"zeta": 1, "alpha": 2}));
        let keys: Vec<_> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha"]);
    }

    #[rstest]
    #[case::utf8_bin(
        &[0x81, 0xa3, b'f', b'o', b'o', 0xc4, 0x06, 0xe8, 0x81, 0x94, 0xe6, 0x83, 0xb3],
        json!({"foo": "联想"})
    )]
    #[case::invalid_utf8_bin(
        &[0x81, 0xa3, b'f', b'o', b'o', 0xc4, 0x02, b'a', 0xff],
        json!({"foo": "a\u{FFFD}"})
    )]
    #[case::bin_inside_array(
        &[0x81, 0xa4, b't', b'a', b'g', b's', 0x92, 0xc4, 0x01, b'a', 0xa1, b'b'],
        json!({"tags": ["a", "b"]})
    )]
    #[case::bin_key(
        &[0x81, 0xc4, 0x01, b'k', 0xc0],
        json!({"k": null})
    )]
    fn bin_values_decode_as_text(#[case] packed: &[u8], #[case] expected: Value) {
        let batch = EventBatch::from_msgpack_chunk(&entry_with_record(packed)).expect("decode");
        assert_eq!(batch.records(), [record(expected)]);
    }

    #[rstest]
    fn non_map_record_is_an_error() {
        let err =
            EventBatch::from_msgpack_chunk(&entry_with_record(&[0x01])).expect_err("not a map");
        assert!(matches!(err, DeliveryError::Decode(_)));
    }
}
