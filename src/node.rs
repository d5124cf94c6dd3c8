//! Structure-preserving YAML node tree.
//!
//! Every node keeps the exact source text it was parsed from. Whitespace,
//! comments and line breaks between nodes are stored as decor next to the
//! lexical value. Rendering concatenates the fragments in document order, so
//! a tree that was never edited renders to its input byte for byte.
//!
//! Edits replace a scalar's lexical form, or write a flow sequence in its
//! place. The decor around it, and every other node, stays untouched.

use std::borrow::Cow;
use std::fmt;

use serde_yaml::Value;

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Sequence),
    Scalar(Scalar),
}

impl Node {
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub(crate) fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// True for an absent value (`key:` with nothing after it) or an explicit null.
    pub fn is_null(&self) -> bool {
        self.as_scalar().is_some_and(Scalar::is_null)
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Scalar(_) => "scalar",
        }
    }
}

/// Mapping, block or flow. Keys are unique and kept in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    /// Decor and opening `{` of a flow mapping. Empty for block mappings.
    pub(crate) head: String,
    pub(crate) entries: Vec<Entry>,
    /// Closing `}` of a flow mapping and the rest of its line.
    pub(crate) tail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Entry {
    /// Trivia lines and indentation before the key.
    pub(crate) decor: String,
    /// Key as written, up to the `:` indicator.
    pub(crate) key_repr: String,
    /// Decoded key.
    pub(crate) key: String,
    /// The `:` indicator and what follows it up to the value. When the value
    /// is a nested block this runs to the end of the line.
    pub(crate) sep: String,
    pub(crate) value: Node,
}

impl Mapping {
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entry_mut(key).map(|e| &mut e.value)
    }

    pub(crate) fn entry_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|e| (e.key.as_str(), &e.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Written inline as `{...}`.
    pub fn is_flow(&self) -> bool {
        !self.head.is_empty()
    }
}

impl Entry {
    /// Overwrite the value of this entry, keeping key and decor.
    ///
    /// Scalars keep their type where the new text allows it. A sequence value
    /// is written as a flow sequence and may replace a scalar or another flow
    /// sequence.
    pub(crate) fn assign(&mut self, value: &Value, in_flow: bool) -> Result<(), String> {
        if let Value::Sequence(values) = value {
            return self.assign_sequence(values, in_flow);
        }
        let scalar = match &mut self.value {
            Node::Scalar(scalar) => scalar,
            other => {
                return Err(format!(
                    "cannot replace a {} with a scalar value",
                    other.kind()
                ));
            }
        };
        let repr = scalar.encode(value, in_flow)?;
        if scalar.repr.is_empty() && scalar.decor.is_empty() {
            scalar.trailer = open_value(&mut self.sep, in_flow, std::mem::take(&mut scalar.trailer));
        }
        scalar.repr = repr;
        Ok(())
    }

    fn assign_sequence(&mut self, values: &[Value], in_flow: bool) -> Result<(), String> {
        let items = flow_items(values)?;
        match &mut self.value {
            Node::Sequence(seq) if seq.is_flow() => seq.items = items,
            Node::Scalar(scalar) => {
                let decor = std::mem::take(&mut scalar.decor);
                let mut trailer = std::mem::take(&mut scalar.trailer);
                if scalar.repr.is_empty() && decor.is_empty() {
                    trailer = open_value(&mut self.sep, in_flow, trailer);
                }
                self.value = Node::Sequence(Sequence {
                    head: format!("{decor}["),
                    items,
                    tail: format!("]{trailer}"),
                });
            }
            other => {
                return Err(format!(
                    "cannot replace a {} with a flow sequence",
                    other.kind()
                ));
            }
        }
        Ok(())
    }
}

/// Make room for a value after an empty `key:` and return the trailer that
/// follows it.
fn open_value(sep: &mut String, in_flow: bool, trailer: String) -> String {
    if !in_flow {
        return open_inline(sep);
    }
    if sep.is_empty() {
        sep.push(':');
    }
    if !sep.ends_with(char::is_whitespace) {
        sep.push(' ');
    }
    trailer
}

/// Turn a separator that runs to the end of the line into an inline one,
/// returning the line remainder as the scalar trailer. Node properties such
/// as `&anchor` stay in the separator.
fn open_inline(sep: &mut String) -> String {
    let body = sep.trim_end_matches(['\r', '\n']);
    let bytes = body.as_bytes();
    let comment = (1..bytes.len())
        .find(|&i| bytes[i] == b'#' && bytes[i - 1].is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let keep = body[..comment].trim_end().len();
    let tail = sep.split_off(keep);
    sep.push(' ');
    let trimmed = tail.trim_start_matches([' ', '\t']);
    if trimmed.starts_with('#') {
        tail
    } else {
        trimmed.to_string()
    }
}

fn flow_items(values: &[Value]) -> Result<Vec<Item>, String> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let decor = if index == 0 { String::new() } else { ", ".to_string() };
            Ok(Item {
                decor,
                sep: String::new(),
                value: flow_node(value)?,
            })
        })
        .collect()
}

fn flow_node(value: &Value) -> Result<Node, String> {
    match value {
        Value::Sequence(values) => Ok(Node::Sequence(Sequence {
            head: "[".into(),
            items: flow_items(values)?,
            tail: "]".into(),
        })),
        Value::Tagged(tagged) => flow_node(&tagged.value),
        scalar => Ok(Node::Scalar(Scalar {
            repr: encode_value(scalar, true)?,
            ..Scalar::default()
        })),
    }
}

/// Sequence, block or flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    /// Decor and opening `[` of a flow sequence. Empty for block sequences.
    pub(crate) head: String,
    pub(crate) items: Vec<Item>,
    /// Closing `]` of a flow sequence and the rest of its line.
    pub(crate) tail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Item {
    pub(crate) decor: String,
    /// The `-` indicator and the gap before the value. Empty in flow sequences.
    pub(crate) sep: String,
    pub(crate) value: Node,
}

impl Sequence {
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index).map(|i| &i.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().map(|i| &i.value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Written inline as `[...]`.
    pub fn is_flow(&self) -> bool {
        !self.head.is_empty()
    }
}

/// How a scalar is written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

/// A scalar with its original lexical form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scalar {
    /// Text between the preceding indicator and the value. Empty for values
    /// on the same line as their key.
    pub(crate) decor: String,
    pub(crate) repr: String,
    /// Trailing whitespace, comment and line break.
    pub(crate) trailer: String,
}

impl Scalar {
    /// The value as written, quotes and block indicators included.
    pub fn raw(&self) -> &str {
        &self.repr
    }

    pub fn style(&self) -> ScalarStyle {
        match self.repr.as_bytes().first() {
            Some(b'"') => ScalarStyle::DoubleQuoted,
            Some(b'\'') => ScalarStyle::SingleQuoted,
            Some(b'|') => ScalarStyle::Literal,
            Some(b'>') => ScalarStyle::Folded,
            _ => ScalarStyle::Plain,
        }
    }

    /// Decoded string value. Block scalars are returned as written.
    pub fn value(&self) -> Cow<'_, str> {
        decode_lexical(&self.repr)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.repr.as_str(), "" | "~" | "null" | "Null" | "NULL")
    }

    /// Whether the value as written reads back as a string.
    fn holds_string(&self) -> bool {
        match self.style() {
            ScalarStyle::Plain => {
                matches!(serde_yaml::from_str::<Value>(&self.repr), Ok(Value::String(_)))
            }
            _ => true,
        }
    }

    /// Lexical form for `value` that keeps this scalar's type.
    ///
    /// A string scalar stays a string in its own quote style. A plain
    /// non-string scalar (`1`, `false`) receives the stringified value
    /// unquoted, so `"3"` over `1` is written as `3`. An empty scalar takes
    /// the type of `value`.
    pub(crate) fn encode(&self, value: &Value, in_flow: bool) -> Result<String, String> {
        if self.is_null() {
            return encode_value(value, in_flow);
        }
        let text = match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Tagged(tagged) => return self.encode(&tagged.value, in_flow),
            Value::Sequence(_) | Value::Mapping(_) => return Err(MAPPING_REJECTED.into()),
        };
        if self.holds_string() {
            Ok(encode_str(&text, self.style(), in_flow))
        } else if is_plain_syntax(&text, in_flow) {
            Ok(text)
        } else {
            Ok(double_quoted(&text))
        }
    }
}

const MAPPING_REJECTED: &str = "a mapping cannot replace a scalar, set its keys one by one";

pub(crate) fn decode_lexical(repr: &str) -> Cow<'_, str> {
    if let Some(inner) = repr.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return Cow::Owned(unescape_double(inner));
    }
    if let Some(inner) = repr.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        return Cow::Owned(inner.replace("''", "'"));
    }
    if matches!(repr.as_bytes().first(), Some(b'|' | b'>')) {
        return Cow::Borrowed(repr);
    }
    if !repr.contains('\n') {
        return Cow::Borrowed(repr.trim());
    }
    // Multi-line plain scalars fold line breaks into spaces.
    let folded: Vec<&str> = repr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    Cow::Owned(folded.join(" "))
}

fn unescape_double(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('x') => push_hex(&mut out, &mut chars, 2),
            Some('u') => push_hex(&mut out, &mut chars, 4),
            Some('U') => push_hex(&mut out, &mut chars, 8),
            Some(other @ ('"' | '\\' | '/' | ' ')) => out.push(other),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn push_hex(out: &mut String, chars: &mut std::str::Chars<'_>, digits: usize) {
    let code: String = chars.by_ref().take(digits).collect();
    if let Some(c) = u32::from_str_radix(&code, 16)
        .ok()
        .and_then(char::from_u32)
    {
        out.push(c);
    }
}

/// Lexical form of a scalar `value`, typed by the value itself.
fn encode_value(value: &Value, in_flow: bool) -> Result<String, String> {
    match value {
        Value::Null => Ok("null".into()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(encode_str(s, ScalarStyle::Plain, in_flow)),
        Value::Tagged(tagged) => encode_value(&tagged.value, in_flow),
        Value::Sequence(_) | Value::Mapping(_) => Err(MAPPING_REJECTED.into()),
    }
}

fn encode_str(s: &str, style: ScalarStyle, in_flow: bool) -> String {
    match style {
        ScalarStyle::DoubleQuoted => double_quoted(s),
        ScalarStyle::SingleQuoted if !s.chars().any(char::is_control) => {
            format!("'{}'", s.replace('\'', "''"))
        }
        ScalarStyle::SingleQuoted => double_quoted(s),
        _ if is_plain_safe(s, in_flow) => s.to_string(),
        _ => double_quoted(s),
    }
}

/// Whether `s` can be written unquoted and read back as the same string.
fn is_plain_safe(s: &str, in_flow: bool) -> bool {
    // "true", "1.5", "~" and friends would come back with another type.
    is_plain_syntax(s, in_flow) && matches!(serde_yaml::from_str::<Value>(s), Ok(Value::String(_)))
}

/// Whether `s` can be written unquoted as a single scalar token.
fn is_plain_syntax(s: &str, in_flow: bool) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };
    if first.is_whitespace() || s.ends_with(char::is_whitespace) {
        return false;
    }
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return false;
    }
    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return false;
    }
    if s.chars().any(char::is_control) {
        return false;
    }
    !(in_flow && s.contains([',', '[', ']', '{', '}']))
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Mapping(m) => m.fmt(f),
            Node::Sequence(s) => s.fmt(f),
            Node::Scalar(s) => s.fmt(f),
        }
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.head)?;
        for e in &self.entries {
            write!(f, "{}{}{}{}", e.decor, e.key_repr, e.sep, e.value)?;
        }
        f.write_str(&self.tail)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.head)?;
        for i in &self.items {
            write!(f, "{}{}{}", i.decor, i.sep, i.value)?;
        }
        f.write_str(&self.tail)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.decor, self.repr, self.trailer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(repr: &str) -> Scalar {
        Scalar {
            decor: String::new(),
            repr: repr.into(),
            trailer: "\n".into(),
        }
    }

    #[test]
    fn decodes_plain_and_quoted() {
        assert_eq!(scalar("tssc").value(), "tssc");
        assert_eq!(scalar("'it''s'").value(), "it's");
        assert_eq!(scalar(r#""a\"b\n""#).value(), "a\"b\n");
        assert_eq!(scalar(r#""café""#).value(), "café");
    }

    #[test]
    fn folds_multiline_plain() {
        assert_eq!(scalar("first\n    second").value(), "first second");
    }

    #[test]
    fn style_from_first_char() {
        assert_eq!(scalar("x").style(), ScalarStyle::Plain);
        assert_eq!(scalar("'x'").style(), ScalarStyle::SingleQuoted);
        assert_eq!(scalar("\"x\"").style(), ScalarStyle::DoubleQuoted);
        assert_eq!(scalar("|\n  x").style(), ScalarStyle::Literal);
        assert_eq!(scalar(">-\n  x").style(), ScalarStyle::Folded);
    }

    #[test]
    fn null_forms() {
        assert!(scalar("").is_null());
        assert!(scalar("~").is_null());
        assert!(!scalar("'null'").is_null());
    }

    #[test]
    fn encodes_plain_when_safe() {
        let s = scalar("old");
        assert_eq!(s.encode(&Value::from("new-value"), false).unwrap(), "new-value");
        assert_eq!(s.encode(&Value::from("http://x"), false).unwrap(), "http://x");
    }

    #[test]
    fn string_node_stays_string() {
        let s = scalar("old");
        assert_eq!(s.encode(&Value::Bool(true), false).unwrap(), "\"true\"");
        assert_eq!(s.encode(&Value::from(42), false).unwrap(), "\"42\"");
    }

    #[test]
    fn typed_node_keeps_its_type() {
        assert_eq!(scalar("1").encode(&Value::from("3"), false).unwrap(), "3");
        assert_eq!(scalar("false").encode(&Value::from("true"), false).unwrap(), "true");
        assert_eq!(scalar("false").encode(&Value::Bool(true), false).unwrap(), "true");
        assert_eq!(scalar("1.5").encode(&Value::from(2), false).unwrap(), "2");
        // Text that cannot stay plain is quoted rather than broken.
        assert_eq!(
            scalar("1").encode(&Value::from("a: b"), false).unwrap(),
            "\"a: b\""
        );
    }

    #[test]
    fn empty_node_takes_value_type() {
        assert_eq!(scalar("").encode(&Value::Bool(true), false).unwrap(), "true");
        assert_eq!(scalar("~").encode(&Value::from(7), false).unwrap(), "7");
        assert_eq!(scalar("").encode(&Value::from("true"), false).unwrap(), "\"true\"");
    }

    #[test]
    fn quotes_strings_that_would_change_type() {
        let s = scalar("old");
        assert_eq!(s.encode(&Value::from("true"), false).unwrap(), "\"true\"");
        assert_eq!(s.encode(&Value::from("1.5"), false).unwrap(), "\"1.5\"");
        assert_eq!(s.encode(&Value::from(""), false).unwrap(), "\"\"");
        assert_eq!(s.encode(&Value::from("a: b"), false).unwrap(), "\"a: b\"");
        assert_eq!(s.encode(&Value::from("#x"), false).unwrap(), "\"#x\"");
    }

    #[test]
    fn flow_context_quotes_indicators() {
        let s = scalar("old");
        assert_eq!(s.encode(&Value::from("a,b"), false).unwrap(), "a,b");
        assert_eq!(s.encode(&Value::from("a,b"), true).unwrap(), "\"a,b\"");
    }

    #[test]
    fn keeps_quote_style() {
        assert_eq!(
            scalar("'old'").encode(&Value::from("it's"), false).unwrap(),
            "'it''s'"
        );
        assert_eq!(
            scalar("\"old\"").encode(&Value::from("plain"), false).unwrap(),
            "\"plain\""
        );
    }

    fn entry(sep: &str, value: Node) -> Entry {
        Entry {
            decor: String::new(),
            key_repr: "k".into(),
            key: "k".into(),
            sep: sep.into(),
            value,
        }
    }

    #[test]
    fn sequence_assigns_as_flow() {
        let v: Value = serde_yaml::from_str("[a, 'b,c', 3, [x]]").unwrap();
        let mut e = entry(": ", Node::Scalar(scalar("old")));
        e.assign(&v, false).unwrap();
        assert_eq!(e.value.to_string(), "[a, \"b,c\", 3, [x]]\n");
        match &e.value {
            Node::Sequence(seq) => assert_eq!(seq.len(), 4),
            other => panic!("Expected Sequence, got: {other:?}"),
        }

        let v: Value = serde_yaml::from_str("[b]").unwrap();
        e.assign(&v, false).unwrap();
        assert_eq!(e.value.to_string(), "[b]\n");
    }

    #[test]
    fn sequence_fills_empty_value() {
        let v: Value = serde_yaml::from_str("[a]").unwrap();
        let mut e = entry(": # note\n", Node::Scalar(Scalar::default()));
        e.assign(&v, false).unwrap();
        assert_eq!(format!("{}{}", e.sep, e.value), ": [a] # note\n");
    }

    #[test]
    fn mapping_value_rejected() {
        let v: Value = serde_yaml::from_str("{a: 1}").unwrap();
        assert!(scalar("x").encode(&v, false).is_err());
        let mut e = entry(": ", Node::Scalar(scalar("x")));
        assert!(e.assign(&v, false).is_err());
    }

    #[test]
    fn block_collections_are_not_replaced() {
        let mut e = entry(":\n", Node::Mapping(Mapping::default()));
        let err = e.assign(&Value::from("x"), false).unwrap_err();
        assert!(err.contains("mapping"), "got: {err}");
    }

    #[test]
    fn open_inline_moves_comment_to_trailer() {
        let mut sep = String::from(":   # note\n");
        let trailer = open_inline(&mut sep);
        assert_eq!(sep, ": ");
        assert_eq!(trailer, "   # note\n");

        let mut sep = String::from(":\n");
        assert_eq!(open_inline(&mut sep), "\n");
        assert_eq!(sep, ": ");
    }

    #[test]
    fn open_inline_keeps_properties() {
        let mut sep = String::from(": &port # default\n");
        assert_eq!(open_inline(&mut sep), " # default\n");
        assert_eq!(sep, ": &port ");
    }

    #[test]
    fn open_value_in_flow_keeps_trailer() {
        let mut sep = String::new();
        assert_eq!(open_value(&mut sep, true, String::new()), "");
        assert_eq!(sep, ": ");

        let mut sep = String::from(":");
        open_value(&mut sep, true, String::new());
        assert_eq!(sep, ": ");
    }
}
