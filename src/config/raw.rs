//! Raw key/value configuration as handed over by the host.
//!
//! The host owns its configuration syntax; the sink only sees string pairs.
//! For standalone use the pairs can also be loaded from an INI file through
//! `rust-ini`, decoding the file with `encoding_rs` when a label is given.

use std::{collections::BTreeMap, fs, path::Path};

use encoding_rs::{Encoding, UTF_8};
use ini::Ini;

use crate::error::ConfigError;

/// Unvalidated configuration parameters.
///
/// A key mapped to an empty string means the parameter was written without a
/// value, which is distinct from the key being absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawConfig {
    entries: BTreeMap<String, String>,
}

impl RawConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from host-parsed pairs. Later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Set a single parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter; values are returned untrimmed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse INI text, reading `section` or the unnamed leading section.
    pub fn from_ini_str(text: &str, section: Option<&str>) -> Result<Self, ConfigError> {
        parse_section("<string>", text, section)
    }

    /// Read and parse an INI file.
    ///
    /// `encoding` is a WHATWG label such as `"latin1"`; UTF-8 is assumed when
    /// it is `None`.
    pub fn from_ini_file(
        path: impl AsRef<Path>,
        section: Option<&str>,
        encoding: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = read_file_bytes(path)?;
        let text = decode_contents(path, &bytes, encoding)?;
        parse_section(&path.display().to_string(), &text, section)
    }
}

fn read_file_bytes(path: &Path) -> Result<Vec<u8>, ConfigError> {
    fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_contents(
    path: &Path,
    bytes: &[u8],
    encoding: Option<&str>,
) -> Result<String, ConfigError> {
    let encoding = match encoding {
        Some(label) => {
            let normalized = label.trim().to_ascii_lowercase();
            Encoding::for_label(normalized.as_bytes())
                .ok_or_else(|| ConfigError::UnknownEncoding(label.to_owned()))?
        }
        None => UTF_8,
    };
    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(ConfigError::Decode {
            path: path.to_path_buf(),
            encoding: encoding.name(),
        });
    }
    Ok(decoded.into_owned())
}

fn parse_section(origin: &str, text: &str, section: Option<&str>) -> Result<RawConfig, ConfigError> {
    let ini = Ini::load_from_str(text).map_err(|err| ConfigError::Parse {
        origin: origin.to_owned(),
        message: err.to_string(),
    })?;
    let props = match section {
        Some(name) => ini
            .section(Some(name))
            .ok_or_else(|| ConfigError::MissingSection {
                origin: origin.to_owned(),
                section: name.to_owned(),
            })?,
        None => ini.general_section(),
    };
    Ok(RawConfig::from_pairs(
        props
            .iter()
            .map(|(key, value)| (key.to_owned(), value.to_owned())),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_named_section() {
        let text = "[other]\nurl = http://ignored/\n\n[http]\nurl = https://example.org/\naccept_status_code = 200, 201\n";
        let raw = RawConfig::from_ini_str(text, Some("http")).expect("parse");
        assert_eq!(raw.get("url"), Some("https://example.org/"));
        assert_eq!(raw.get("accept_status_code"), Some("200, 201"));
    }

    #[rstest]
    fn parses_general_section() {
        let raw = RawConfig::from_ini_str("url = http://example.org/\n", None).expect("parse");
        assert_eq!(raw.get("url"), Some("http://example.org/"));
    }

    #[rstest]
    fn keeps_explicitly_empty_values() {
        let raw = RawConfig::from_ini_str("authorization_token =\n", None).expect("parse");
        assert_eq!(raw.get("authorization_token"), Some(""));
    }

    #[rstest]
    fn missing_section_is_reported() {
        let err = RawConfig::from_ini_str("url = http://example.org/\n", Some("http"))
            .expect_err("section should be missing");
        assert!(matches!(err, ConfigError::MissingSection { .. }));
    }

    #[rstest]
    fn later_pairs_override_earlier_ones() {
        let raw = RawConfig::from_pairs([("url", "http://a/"), ("url", "http://b/")]);
        assert_eq!(raw.get("url"), Some("http://b/"));
    }

    #[rstest]
    fn decode_rejects_unknown_encoding() {
        let err = decode_contents(Path::new("sink.ini"), b"url = x", Some("does-not-exist"))
            .expect_err("expected lookup failure");
        assert!(matches!(err, ConfigError::UnknownEncoding(label) if label == "does-not-exist"));
    }

    #[rstest]
    fn decode_honours_label() {
        let text = decode_contents(Path::new("sink.ini"), b"token = caf\xe9", Some("latin1"))
            .expect("decode latin1");
        assert_eq!(text, "token = café");
    }

    #[rstest]
    fn decode_rejects_invalid_utf8() {
        let err = decode_contents(Path::new("sink.ini"), b"token = \xff\xfe", None)
            .expect_err("invalid utf-8");
        assert!(matches!(err, ConfigError::Decode { encoding: "UTF-8", .. }));
    }
}
