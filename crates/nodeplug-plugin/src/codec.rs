//! Attribute codec: typed model values to and from string attributes.
//!
//! Every plugin attribute is named `<namespace>-<dash-cased-key>`. Two
//! control attributes exist per plugin: `plugin-<namespace>` and
//! `<namespace>-ready`, both carrying `"true"` when set.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of the per-plugin "plugged" flag attribute.
pub const PLUGGED_PREFIX: &str = "plugin-";

/// Type tag of a schema key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrType {
    /// `"true"` / `"false"`; an absent attribute decodes to `false`.
    Boolean,
    /// Any finite float.
    Number,
    /// RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or RFC 2822.
    Date,
    /// Any string.
    String,
    /// A tag this codec does not understand. Never decodes.
    Unknown(String),
}

impl From<&str> for AttrType {
    fn from(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "boolean" => Self::Boolean,
            "number" => Self::Number,
            "date" => Self::Date,
            "string" => Self::String,
            _ => Self::Unknown(tag.to_string()),
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Number => write!(f, "number"),
            Self::Date => write!(f, "date"),
            Self::String => write!(f, "string"),
            Self::Unknown(tag) => write!(f, "{tag}"),
        }
    }
}

/// A typed model value.
///
/// JSON strings always deserialize as [`AttrValue::String`]; typed dates are
/// recovered by [`decode`] against the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
}

impl AttrValue {
    /// Returns the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the numeric payload, if this is a number value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the date payload, if this is a date value.
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Decodes a raw attribute value. Returns `None` when the value is invalid
/// for `ty`.
pub fn decode(raw: Option<&str>, ty: &AttrType) -> Option<AttrValue> {
    match (ty, raw) {
        (AttrType::Boolean, None) => Some(AttrValue::Bool(false)),
        (AttrType::Boolean, Some("true")) => Some(AttrValue::Bool(true)),
        (AttrType::Boolean, Some("false")) => Some(AttrValue::Bool(false)),
        (AttrType::Boolean, Some(_)) => None,
        (AttrType::Number, Some(raw)) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(AttrValue::Number),
        (AttrType::Date, Some(raw)) => parse_date(raw.trim()).map(AttrValue::Date),
        (AttrType::String, Some(raw)) => Some(AttrValue::String(raw.to_string())),
        (AttrType::Unknown(_), _) | (_, None) => None,
    }
}

/// Encodes a model value as an attribute string.
pub fn encode(value: &AttrValue) -> String {
    match value {
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::Number(n) => n.to_string(),
        AttrValue::Date(d) => d.to_rfc3339(),
        AttrValue::String(s) => s.clone(),
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(date.and_utc());
        }
    }
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// `maxWidth` → `max-width`: a dash goes between a lowercase letter and a
/// following uppercase one, then everything is lowercased.
pub fn dash_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for ch in key.chars() {
        if ch.is_uppercase() && prev_lower {
            out.push('-');
        }
        prev_lower = ch.is_lowercase();
        out.extend(ch.to_lowercase());
    }
    out
}

/// `<namespace>-<dash-cased-key>`
pub fn attr_name(namespace: &str, key: &str) -> String {
    format!("{namespace}-{}", dash_case(key))
}

/// `plugin-<namespace>`
pub fn plugged_attr(namespace: &str) -> String {
    format!("{PLUGGED_PREFIX}{namespace}")
}

/// `<namespace>-ready`
pub fn ready_attr(namespace: &str) -> String {
    format!("{namespace}-ready")
}

/// Extracts the namespace from a `plugin-<namespace>` attribute name.
pub fn plugged_namespace(attribute: &str) -> Option<&str> {
    attribute
        .strip_prefix(PLUGGED_PREFIX)
        .filter(|ns| !ns.is_empty())
}
