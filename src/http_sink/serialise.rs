//! Request body encodings.
//!
//! JSON bodies carry the whole batch as an array of records, written
//! verbatim with non-ASCII text left unescaped. Form bodies carry a single
//! record flattened into `key=value` pairs in record order.

use serde_json::Value;
use url::form_urlencoded::Serializer;

use crate::event::Record;

/// Serialise records as a JSON array.
///
/// # Errors
///
/// Returns the underlying [`serde_json::Error`] if a value cannot be
/// serialised.
pub(super) fn serialise_json_array(records: &[Record]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(records)
}

/// Serialise a record as `application/x-www-form-urlencoded` data.
///
/// Escaping follows the WHATWG form encoder: alphanumerics and `*-._` pass
/// through, spaces become `+` and every other byte of the UTF-8 text is
/// percent-encoded. Strings are sent as-is, numbers and booleans in their
/// JSON text form and `null` as a bare key. Arrays repeat the key once per
/// element; objects and nested arrays are sent as JSON text.
///
/// # Errors
///
/// Returns the underlying [`serde_json::Error`] if a nested value cannot be
/// serialised.
pub(super) fn serialise_form(record: &Record) -> serde_json::Result<Vec<u8>> {
    let mut form = Serializer::new(String::new());
    for (key, value) in record {
        match value {
            Value::Array(items) => {
                for item in items {
                    append_pair(&mut form, key, item)?;
                }
            }
            _ => append_pair(&mut form, key, value)?,
        }
    }
    Ok(form.finish().into_bytes())
}

fn append_pair(
    form: &mut Serializer<'_, String>,
    key: &str,
    value: &Value,
) -> serde_json::Result<()> {
    match value {
        Value::Null => {
            form.append_key_only(key);
        }
        Value::String(s) => {
            form.append_pair(key, s);
        }
        Value::Bool(b) => {
            form.append_pair(key, if *b { "true" } else { "false" });
        }
        Value::Number(n) => {
            form.append_pair(key, &n.to_string());
        }
        Value::Array(_) | Value::Object(_) => {
            form.append_pair(key, &serde_json::to_string(value)?);
        }
    }
    Ok(())
}
