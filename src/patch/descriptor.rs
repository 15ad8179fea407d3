//! Single-key value substitution in a JSON-like descriptor file
//!
//! The file is never re-serialized. Only the bytes of the first value bound to
//! the key change, so formatting, key order and everything else stay intact.

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;

/// JSON scalar literal: string, number, boolean or null.
const SCALAR: &str = r#"("(?:[^"\\]|\\.)*"|-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|true|false|null)"#;

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorEdit {
    pub path: PathBuf,
    pub key: String,
    pub value: Value,
    /// Current value required for the edit to go ahead.
    pub expect: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    Changed { content: String, previous: String },
    AlreadySet,
    KeyNotFound,
    UnexpectedValue { found: String },
}

impl DescriptorEdit {
    pub fn plan(&self, content: &str) -> Result<Rewrite> {
        rewrite_value(content, &self.key, &self.value, self.expect.as_ref())
    }
}

/// Replace the value bound to the first `"key":` in `content`.
pub fn rewrite_value(
    content: &str,
    key: &str,
    value: &Value,
    expect: Option<&Value>,
) -> Result<Rewrite> {
    let pattern = format!(r#""{}"(\s*:\s*){SCALAR}"#, regex::escape(key));
    let re = Regex::new(&pattern).with_context(|| format!("building matcher for key '{key}'"))?;

    let Some(caps) = re.captures(content) else {
        return Ok(Rewrite::KeyNotFound);
    };
    let Some(literal) = caps.get(2) else {
        return Ok(Rewrite::KeyNotFound);
    };

    let previous = literal.as_str();
    let current: Option<Value> = serde_json::from_str(previous).ok();

    if current.as_ref() == Some(value) {
        return Ok(Rewrite::AlreadySet);
    }
    if let Some(expected) = expect {
        if current.as_ref() != Some(expected) {
            return Ok(Rewrite::UnexpectedValue { found: previous.to_string() });
        }
    }

    let rendered = serde_json::to_string(value).context("serializing descriptor value")?;
    let mut updated = String::with_capacity(content.len() + rendered.len());
    updated.push_str(&content[..literal.start()]);
    updated.push_str(&rendered);
    updated.push_str(&content[literal.end()..]);

    Ok(Rewrite::Changed { content: updated, previous: previous.to_string() })
}
