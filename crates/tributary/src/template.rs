//! Typed attribute templates.
//!
//! Attribute values are JSON trees whose strings are parsed once into a
//! sequence of [`Segment`]s, so reference discovery walks typed nodes instead
//! of matching serialized blobs. A reference token has the form `${kind.name.path}`:
//!
//! ```text
//! postgres://${res.res-db.endpoint}:5432/app
//! └─ literal ─┘└──── reference ─────┘└ literal ┘
//! ```
//!
//! Anything that does not match the token grammar is kept as literal text, so
//! parsing never fails and [`Template::render`] always reproduces the input.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `${<kind>.<name>.<path>}`; kind and name contain no `.`, whitespace or `}`.
static REFERENCE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^.\s}]+)\.([^.\s}]+)\.([^}]+)\}").expect("reference token regex is valid")
});

/// A reference to another entity's output, e.g. `${res.res-db.endpoint}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Kind token (`res`, `svc`, `service`).
    pub kind: String,
    /// Name of the referenced entity.
    pub name: String,
    /// Attribute path on the referenced entity (`endpoint`, `outputs.url`).
    pub path: String,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}.{}}}", self.kind, self.name, self.path)
    }
}

/// One piece of a parsed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Plain text, copied verbatim.
    Literal(String),
    /// An interpolation token.
    Reference(Reference),
}

/// A parsed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a raw attribute value.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for caps in REFERENCE_TOKEN.captures_iter(raw) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > cursor {
                segments.push(Segment::Literal(raw[cursor..whole.start()].to_string()));
            }
            segments.push(Segment::Reference(Reference {
                kind: caps[1].to_string(),
                name: caps[2].to_string(),
                path: caps[3].to_string(),
            }));
            cursor = whole.end();
        }

        if cursor < raw.len() {
            segments.push(Segment::Literal(raw[cursor..].to_string()));
        }

        Self { segments }
    }

    /// The parsed segments, in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterate over the reference tokens in this value.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Reference(r) => Some(r),
            Segment::Literal(_) => None,
        })
    }

    /// Render back to the raw attribute text.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Reference(r) => write!(f, "{r}")?,
            }
        }
        Ok(())
    }
}

impl From<&str> for Template {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for Template {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Template> for String {
    fn from(t: Template) -> Self {
        t.render()
    }
}

/// A structured attribute value: a JSON tree whose strings are templates.
///
/// Reference tokens are found in string leaves at any depth, so
/// `{"env": {"URL": "${res.db.url}"}}` references `db`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number, kept as written.
    Number(serde_json::Number),
    /// A string, parsed as a template.
    Text(Template),
    /// JSON array.
    List(Vec<Value>),
    /// JSON object, key-sorted.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Every reference token in this value, depth first.
    #[must_use]
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Self::Text(template) => out.extend(template.references()),
            Self::List(items) => items.iter().for_each(|v| v.collect_references(out)),
            Self::Map(entries) => entries.values().for_each(|v| v.collect_references(out)),
            Self::Null | Self::Bool(_) | Self::Number(_) => {}
        }
    }

    /// The template, if this value is a string.
    #[must_use]
    pub fn as_template(&self) -> Option<&Template> {
        match self {
            Self::Text(template) => Some(template),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::Text(Template::parse(&s)),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::Text(t) => Self::String(t.render()),
            Value::List(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Map(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(raw: &str) -> Self {
        Self::Text(Template::parse(raw))
    }
}

/// An entity's attributes: key-sorted mapping of key to structured value.
///
/// Serializes as a JSON object; string leaves keep their raw template text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Value>);

impl Attributes {
    /// Create an empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a string attribute, parsing it as a template.
    pub fn insert(&mut self, key: impl Into<String>, raw: &str) -> Option<Value> {
        self.insert_value(key, Value::from(raw))
    }

    /// Insert or replace an attribute with a structured value.
    pub fn insert_value(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Get an attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterate over attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Iterate over every reference token across all attributes, at any depth.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.0.values().flat_map(Value::references)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: AsRef<str>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Value::from(v.as_ref())))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn reference(kind: &str, name: &str, path: &str) -> Segment {
        Segment::Reference(Reference {
            kind: kind.into(),
            name: name.into(),
            path: path.into(),
        })
    }

    #[test]
    fn parses_literal_and_reference_segments() {
        let t = Template::parse("postgres://${res.res-db.endpoint}:5432/app");
        assert_eq!(
            t.segments(),
            &[
                Segment::Literal("postgres://".into()),
                reference("res", "res-db", "endpoint"),
                Segment::Literal(":5432/app".into()),
            ]
        );
    }

    #[test]
    fn parses_adjacent_references() {
        let t = Template::parse("${res.a.x}${svc.b.outputs.url}");
        assert_eq!(
            t.segments(),
            &[reference("res", "a", "x"), reference("svc", "b", "outputs.url")]
        );
    }

    #[rstest]
    #[case::plain_text("just text")]
    #[case::missing_path("${res.db}")]
    #[case::unterminated("${res.db.endpoint")]
    #[case::whitespace_in_name("${res.my db.endpoint}")]
    #[case::empty("")]
    fn non_tokens_stay_literal(#[case] raw: &str) {
        let t = Template::parse(raw);
        assert_eq!(t.references().count(), 0);
        assert_eq!(t.render(), raw);
    }

    #[rstest]
    #[case("postgres://${res.res-db.endpoint}:5432")]
    #[case("${service.api.outputs.url}/health")]
    #[case("a ${res.x.y} b ${res.z.w} c")]
    fn render_reproduces_input(#[case] raw: &str) {
        assert_eq!(Template::parse(raw).render(), raw);
    }

    #[test]
    fn attributes_serialize_as_raw_strings() {
        let attrs: Attributes = [("url", "${res.db.endpoint}"), ("port", "5432")]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&attrs).unwrap();
        assert_eq!(json, r#"{"port":"5432","url":"${res.db.endpoint}"}"#);

        let back: Attributes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attrs);
        assert_eq!(back.references().count(), 1);
    }

    #[test]
    fn finds_references_nested_in_objects_and_arrays() {
        let attrs: Attributes = serde_json::from_str(
            r#"{"env":{"URL":"${res.db.url}"},"hosts":["${res.cache.host}",{"x":"${res.queue.arn}"}],"replicas":3}"#,
        )
        .unwrap();

        let names: Vec<_> = attrs.references().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["db", "cache", "queue"]);
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn non_string_scalars_survive_round_trip() {
        let raw = r#"{"debug":false,"name":"${res.db.host}","ratio":0.5,"replicas":3,"tags":null}"#;
        let attrs: Attributes = serde_json::from_str(raw).unwrap();

        assert_eq!(attrs.get("replicas"), Some(&Value::Number(3.into())));
        assert_eq!(attrs.get("debug"), Some(&Value::Bool(false)));
        assert!(attrs.get("name").and_then(Value::as_template).is_some());
        assert_eq!(serde_json::to_string(&attrs).unwrap(), raw);
    }
}
