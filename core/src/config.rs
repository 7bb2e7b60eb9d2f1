//! Named-key configuration consumed by trainers and processors.
//!
//! A config file is either a flat JSON object (`*.json`) or `key = value`
//! lines with `#` comments. Every component reads its keys at construction
//! time; a missing required key fails construction.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{LexError, Result};

#[derive(Debug, Clone, Default)]
pub struct Config {
    values: BTreeMap<String, String>,
    source: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| LexError::config(format!("cannot read config {}: {e}", path.display())))?;
        let mut cfg = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            Self::parse_json(&text)?
        } else {
            Self::parse_lines(&text)?
        };
        cfg.source = Some(path.to_path_buf());
        Ok(cfg)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Display,
    {
        let values = pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())).collect();
        Self { values, source: None }
    }

    fn parse_lines(text: &str) -> Result<Self> {
        let mut values = BTreeMap::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| LexError::config(format!("line {}: expected 'key = value'", lineno + 1)))?;
            values.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self { values, source: None })
    }

    fn parse_json(text: &str) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        let obj = json
            .as_object()
            .ok_or_else(|| LexError::config("JSON config must be an object"))?;
        let mut values = BTreeMap::new();
        for (key, value) in obj {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => if *b { "1".into() } else { "0".into() },
                other => return Err(LexError::config(format!("key '{key}' has non-scalar value {other}"))),
            };
            values.insert(key.clone(), value);
        }
        Ok(Self { values, source: None })
    }

    pub fn set<K: Into<String>, V: Display>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.to_string());
    }

    /// Apply a `key=value` override.
    pub fn apply_override(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| LexError::config(format!("override '{assignment}' is not key=value")))?;
        self.set(key.trim(), value.trim());
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self
            .raw(key)
            .ok_or_else(|| LexError::config(format!("missing required key '{key}'{}", self.origin())))?;
        raw.parse::<T>()
            .map_err(|e| LexError::config(format!("key '{key}' = '{raw}'{}: {e}", self.origin())))
    }

    pub fn get_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        if self.contains(key) { self.get(key) } else { Ok(default) }
    }

    /// Value of the first key in `keys` that is present.
    pub fn get_first<T>(&self, keys: &[&str]) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match keys.iter().find(|k| self.contains(k)) {
            Some(key) => self.get(key),
            None => Err(LexError::config(format!("missing required key, one of {keys:?}{}", self.origin()))),
        }
    }

    /// ` in <file>` for configs loaded from disk.
    fn origin(&self) -> String {
        self.source.as_ref().map_or_else(String::new, |p| format!(" in {}", p.display()))
    }

    pub fn path(&self, key: &str) -> Result<PathBuf> {
        self.get::<String>(key).map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_key_value_lines() {
        let cfg = Config::parse_lines("# comment\nfreq_threshold = 3\n\nbreak = /tmp/break.idx\n").unwrap();
        assert_eq!(cfg.get::<u32>("freq_threshold").unwrap(), 3);
        assert_eq!(cfg.path("break").unwrap(), PathBuf::from("/tmp/break.idx"));
    }

    #[test]
    fn missing_and_invalid_keys_fail() {
        let cfg = Config::from_pairs([("df_threshold", "abc")]);
        assert!(matches!(cfg.get::<u32>("verbose"), Err(LexError::Config(_))));
        assert!(matches!(cfg.get::<u32>("df_threshold"), Err(LexError::Config(_))));
        assert_eq!(cfg.get_or::<u32>("verbose", 0).unwrap(), 0);
    }

    #[test]
    fn get_first_prefers_earlier_keys() {
        let cfg = Config::from_pairs([("bamboo_cfg", "b"), ("ke_bamboo_cfg", "k")]);
        assert_eq!(cfg.get_first::<String>(&["ke_bamboo_cfg", "bamboo_cfg"]).unwrap(), "k");
        assert!(cfg.get_first::<String>(&["nope"]).is_err());
    }

    #[test]
    fn loads_json_and_applies_overrides() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(f, r#"{{"max_token_length": 16, "verbose": true, "break": "b.idx"}}"#).unwrap();
        let mut cfg = Config::load(f.path()).unwrap();
        assert_eq!(cfg.get::<i64>("max_token_length").unwrap(), 16);
        assert_eq!(cfg.get::<u32>("verbose").unwrap(), 1);
        cfg.apply_override("max_token_length=8").unwrap();
        assert_eq!(cfg.get::<i64>("max_token_length").unwrap(), 8);
        assert!(cfg.apply_override("garbage").is_err());

        let err = cfg.get::<u32>("df_threshold").unwrap_err().to_string();
        assert!(err.contains("df_threshold"), "{err}");
        assert!(err.contains(&f.path().display().to_string()), "{err}");
    }
}
