//! Lossless parser for block-style YAML documents.
//!
//! The parser never rewrites text. It walks the source line by line and cuts
//! it into contiguous fragments, each owned by exactly one node of the tree:
//! trivia (blank lines, comments, indentation) becomes the decor of the next
//! key or sequence item, and whatever follows a value on its line becomes that
//! value's trailer. `at` always points at the first byte not yet assigned to a
//! node, so concatenating the fragments gives back the input.
//!
//! Supported: block mappings and sequences (including `- key: value` items and
//! sequences indented at their parent key's level), plain, quoted, literal and
//! folded scalars, `&anchor` and `!tag` properties, and flow mappings and
//! sequences, which may span lines. Inside a flow collection the gaps between
//! entries, commas included, become the decor of the next entry. Well-formedness
//! is checked beforehand by `serde_yaml`; this pass only needs to recover the
//! structure.

use crate::error::ConfigError;
use crate::node::{Entry, Item, Mapping, Node, Scalar, Sequence, decode_lexical};

/// A parsed document: text before the root node, the root, and text after it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Parsed {
    pub(crate) prologue: String,
    pub(crate) root: Node,
    pub(crate) epilogue: String,
}

#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    /// End of the content, before `\n` or `\r\n`.
    end: usize,
    /// Start of the following line.
    next: usize,
}

struct Parser<'a> {
    src: &'a str,
    lines: Vec<Line>,
    line: usize,
    at: usize,
}

pub(crate) fn parse_document(src: &str) -> Result<Parsed, ConfigError> {
    let mut p = Parser::new(src);

    // Directives, comments and the `---` start marker.
    loop {
        p.skip_trivia();
        if p.eof() {
            break;
        }
        let text = p.text(p.line);
        if text.starts_with('%') {
            p.line += 1;
            continue;
        }
        if text.starts_with("---") && p.is_marker(p.line) {
            let rest = text[3..].trim_start();
            if !(rest.is_empty() || rest.starts_with('#')) {
                return Err(p.error("content after the document start marker is not supported"));
            }
            p.line += 1;
            continue;
        }
        break;
    }

    if p.eof() || p.is_marker(p.line) {
        let end = p.lines.get(p.line).map_or(src.len(), |l| l.start);
        let prologue = p.take(end);
        return Ok(Parsed {
            prologue,
            root: Node::Scalar(Scalar::default()),
            epilogue: src[p.at..].to_string(),
        });
    }

    let indent = p.indent(p.line);
    let prologue = p.take(p.lines[p.line].start + indent);
    let root = p.parse_node(indent, None)?;

    p.skip_trivia();
    if !p.eof() && !p.is_marker(p.line) {
        return Err(p.error("unexpected content"));
    }
    Ok(Parsed {
        prologue,
        root,
        epilogue: src[p.at..].to_string(),
    })
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        for chunk in src.split_inclusive('\n') {
            let next = start + chunk.len();
            let body = chunk.strip_suffix('\n').unwrap_or(chunk);
            let body = body.strip_suffix('\r').unwrap_or(body);
            lines.push(Line {
                start,
                end: start + body.len(),
                next,
            });
            start = next;
        }
        Parser {
            src,
            lines,
            line: 0,
            at: 0,
        }
    }

    fn eof(&self) -> bool {
        self.line >= self.lines.len()
    }

    fn text(&self, idx: usize) -> &'a str {
        let l = self.lines[idx];
        &self.src[l.start..l.end]
    }

    /// Text of line `idx` from column `col` on.
    fn text_from(&self, idx: usize, col: usize) -> &'a str {
        let l = self.lines[idx];
        &self.src[(l.start + col).min(l.end)..l.end]
    }

    fn indent(&self, idx: usize) -> usize {
        let text = self.text(idx);
        text.len() - text.trim_start_matches(' ').len()
    }

    fn is_blank(&self, idx: usize) -> bool {
        self.text(idx).trim().is_empty()
    }

    fn is_trivia(&self, idx: usize) -> bool {
        let t = self.text(idx).trim_start();
        t.is_empty() || t.starts_with('#')
    }

    /// `---` or `...` at column zero.
    fn is_marker(&self, idx: usize) -> bool {
        let t = self.text(idx);
        (t.starts_with("---") || t.starts_with("..."))
            && t[3..].chars().next().is_none_or(char::is_whitespace)
    }

    /// Advance past trivia lines without assigning them; they end up in the
    /// decor of whatever node comes next.
    fn skip_trivia(&mut self) {
        while !self.eof() && self.is_trivia(self.line) {
            self.line += 1;
        }
    }

    /// Assign the source text up to `end` and return it.
    fn take(&mut self, end: usize) -> String {
        let s = self.src[self.at..end].to_string();
        self.at = end;
        s
    }

    /// Move `line` forward to the line containing `offset`.
    fn seek(&mut self, offset: usize) {
        while self.line + 1 < self.lines.len() && offset > self.lines[self.line].end {
            self.line += 1;
        }
    }

    fn error(&self, reason: &str) -> ConfigError {
        ConfigError::ParseError {
            line: self.line + 1,
            reason: reason.to_string(),
        }
    }

    /// Error located at byte `offset` rather than at the current line.
    fn error_at(&self, offset: usize, reason: &str) -> ConfigError {
        ConfigError::ParseError {
            line: self.lines.iter().take_while(|l| l.start <= offset).count().max(1),
            reason: reason.to_string(),
        }
    }

    /// Assign the rest of the current line, which may only hold a comment,
    /// and move to the next line.
    fn line_rest(&mut self) -> Result<String, ConfigError> {
        let src = self.src;
        let l = self.lines[self.line];
        let tail = &src[self.at..l.end];
        let after = tail.trim_start();
        if !(after.is_empty() || (after.starts_with('#') && after.len() < tail.len())) {
            return Err(self.error("unexpected content after value"));
        }
        self.line += 1;
        Ok(self.take(l.next))
    }

    /// Parse the node whose first token sits at column `col` of the current line.
    fn parse_node(&mut self, col: usize, parent: Option<usize>) -> Result<Node, ConfigError> {
        let rest = self.text_from(self.line, col);
        if is_dash(rest) {
            self.parse_sequence(col)
        } else if mapping_colon(rest).is_some() {
            self.parse_mapping(col)
        } else {
            self.parse_inline(col, parent)
        }
    }

    /// Parse a value that starts at column `col` and is not a block collection.
    fn parse_inline(&mut self, col: usize, parent: Option<usize>) -> Result<Node, ConfigError> {
        let start = self.lines[self.line].start + col;
        if !matches!(self.src.as_bytes().get(start), Some(b'[' | b'{')) {
            return self.parse_scalar(col, parent).map(Node::Scalar);
        }
        let decor = self.take(start);
        let mut node = self.parse_flow(decor)?;
        self.seek(self.at);
        let rest = self.line_rest()?;
        match &mut node {
            Node::Mapping(m) => m.tail.push_str(&rest),
            Node::Sequence(s) => s.tail.push_str(&rest),
            Node::Scalar(s) => s.trailer.push_str(&rest),
        }
        Ok(node)
    }

    /// Parse the block value of a `key:` or `-` whose line ended right after
    /// the indicator.
    fn parse_nested(&mut self, parent: usize, in_mapping: bool) -> Result<Node, ConfigError> {
        self.skip_trivia();
        if self.eof() {
            return Ok(Node::Scalar(Scalar::default()));
        }
        let indent = self.indent(self.line);
        let marker = indent == 0 && self.is_marker(self.line);
        let compact_seq = in_mapping && indent == parent && is_dash(self.text_from(self.line, indent));
        if !marker && (indent > parent || compact_seq) {
            self.parse_node(indent, Some(parent))
        } else {
            Ok(Node::Scalar(Scalar::default()))
        }
    }

    fn parse_mapping(&mut self, col: usize) -> Result<Node, ConfigError> {
        let src = self.src;
        let mut entries: Vec<Entry> = Vec::new();
        loop {
            let l = self.lines[self.line];
            let key_start = l.start + col;
            let colon = mapping_colon(&src[key_start..l.end])
                .ok_or_else(|| self.error("expected a mapping key"))?;

            let decor = self.take(key_start);
            let key_repr = self.take(key_start + colon);
            let key = decode_lexical(key_repr.trim_end()).into_owned();
            if entries.iter().any(|e| e.key == key) {
                return Err(self.error(&format!("duplicate key '{key}'")));
            }

            let rest = &src[key_start + colon + 1..l.end];
            let value_text = rest.trim_start();
            let value_text = &value_text[properties_len(value_text)..];
            let (sep, value) = if value_text.is_empty() || value_text.starts_with('#') {
                let sep = self.take(l.next);
                self.line += 1;
                (sep, self.parse_nested(col, true)?)
            } else {
                let value_start = l.end - value_text.len();
                let sep = self.take(value_start);
                (sep, self.parse_inline(value_start - l.start, Some(col))?)
            };
            entries.push(Entry {
                decor,
                key_repr,
                key,
                sep,
                value,
            });

            self.skip_trivia();
            if self.eof() || self.indent(self.line) != col {
                break;
            }
            if col == 0 && self.is_marker(self.line) {
                break;
            }
            let next = self.text_from(self.line, col);
            if is_dash(next) {
                break;
            }
            if mapping_colon(next).is_none() {
                return Err(self.error("expected a mapping key"));
            }
        }
        Ok(Node::Mapping(Mapping {
            entries,
            ..Mapping::default()
        }))
    }

    fn parse_sequence(&mut self, col: usize) -> Result<Node, ConfigError> {
        let src = self.src;
        let mut items = Vec::new();
        loop {
            let l = self.lines[self.line];
            let dash = l.start + col;
            let decor = self.take(dash);

            let rest = &src[dash + 1..l.end];
            let value_text = rest.trim_start();
            let value_text = &value_text[properties_len(value_text)..];
            let (sep, value) = if value_text.is_empty() || value_text.starts_with('#') {
                let sep = self.take(l.next);
                self.line += 1;
                (sep, self.parse_nested(col, false)?)
            } else {
                let value_start = l.end - value_text.len();
                let sep = self.take(value_start);
                (sep, self.parse_node(value_start - l.start, Some(col))?)
            };
            items.push(Item { decor, sep, value });

            self.skip_trivia();
            if self.eof() || self.indent(self.line) != col {
                break;
            }
            if !is_dash(self.text_from(self.line, col)) {
                break;
            }
        }
        Ok(Node::Sequence(Sequence {
            items,
            ..Sequence::default()
        }))
    }

    /// Parse the flow collection opening at `at`. `decor` is the text before
    /// the bracket.
    fn parse_flow(&mut self, decor: String) -> Result<Node, ConfigError> {
        let open = self.at;
        let mut head = decor;
        head.push_str(&self.take(open + 1));
        if self.src.as_bytes()[open] == b'{' {
            self.flow_mapping(head)
        } else {
            self.flow_sequence(head)
        }
    }

    fn flow_mapping(&mut self, head: String) -> Result<Node, ConfigError> {
        let src = self.src;
        let bytes = src.as_bytes();
        let mut entries: Vec<Entry> = Vec::new();
        let mut scan = self.at;
        let close = loop {
            let key_start = flow_gap_end(src, scan);
            match bytes.get(key_start) {
                Some(b'}') => break key_start,
                Some(b',') => return Err(self.error_at(key_start, "unexpected ',' in flow mapping")),
                None => return Err(self.error_at(key_start, "unterminated flow mapping")),
                _ => {}
            }

            let decor = self.take(key_start);
            let key_end = match bytes[key_start] {
                q @ (b'"' | b'\'') => quoted_end(src, key_start, q)
                    .ok_or_else(|| self.error_at(key_start, "unterminated quoted scalar"))?,
                _ => flow_plain_end(src, key_start),
            };
            if key_end == key_start {
                return Err(self.error_at(key_start, "expected a flow mapping key"));
            }
            let key_repr = self.take(key_end);
            let key = decode_lexical(&key_repr).into_owned();
            if entries.iter().any(|e| e.key == key) {
                return Err(self.error_at(key_start, &format!("duplicate key '{key}'")));
            }

            let colon = flow_gap_end(src, key_end);
            let (sep, value) = if bytes.get(colon) == Some(&b':') {
                let value_start = flow_gap_end(src, colon + 1);
                let sep = self.take(value_start);
                let value = match bytes.get(value_start) {
                    Some(b',' | b'}') => Node::Scalar(Scalar::default()),
                    _ => self.flow_node()?,
                };
                (sep, value)
            } else {
                (String::new(), Node::Scalar(Scalar::default()))
            };
            entries.push(Entry {
                decor,
                key_repr,
                key,
                sep,
                value,
            });

            let next = flow_gap_end(src, self.at);
            match bytes.get(next) {
                Some(b'}') => break next,
                Some(b',') => scan = next + 1,
                _ => return Err(self.error_at(next, "expected ',' or '}' in flow mapping")),
            }
        };
        let tail = self.take(close + 1);
        Ok(Node::Mapping(Mapping {
            head,
            entries,
            tail,
        }))
    }

    fn flow_sequence(&mut self, head: String) -> Result<Node, ConfigError> {
        let src = self.src;
        let bytes = src.as_bytes();
        let mut items = Vec::new();
        let mut scan = self.at;
        let close = loop {
            let item_start = flow_gap_end(src, scan);
            match bytes.get(item_start) {
                Some(b']') => break item_start,
                Some(b',') => return Err(self.error_at(item_start, "unexpected ',' in flow sequence")),
                None => return Err(self.error_at(item_start, "unterminated flow sequence")),
                _ => {}
            }
            let decor = self.take(item_start);
            let value = self.flow_node()?;
            items.push(Item {
                decor,
                sep: String::new(),
                value,
            });

            let next = flow_gap_end(src, self.at);
            match bytes.get(next) {
                Some(b']') => break next,
                Some(b',') => scan = next + 1,
                _ => return Err(self.error_at(next, "expected ',' or ']' in flow sequence")),
            }
        };
        let tail = self.take(close + 1);
        Ok(Node::Sequence(Sequence { head, items, tail }))
    }

    /// A value inside a flow collection, starting at `at`.
    fn flow_node(&mut self) -> Result<Node, ConfigError> {
        let src = self.src;
        let start = self.at;
        let end = match src.as_bytes().get(start) {
            Some(b'[' | b'{') => return self.parse_flow(String::new()),
            Some(&q @ (b'"' | b'\'')) => quoted_end(src, start, q)
                .ok_or_else(|| self.error_at(start, "unterminated quoted scalar"))?,
            _ => flow_plain_end(src, start),
        };
        if end == start {
            return Err(self.error_at(start, "expected a flow value"));
        }
        let repr = self.take(end);
        Ok(Node::Scalar(Scalar {
            repr,
            ..Scalar::default()
        }))
    }

    /// Parse a scalar starting at column `col`. `parent` is the indentation of
    /// the owning key or dash; continuation lines must be indented deeper.
    fn parse_scalar(&mut self, col: usize, parent: Option<usize>) -> Result<Scalar, ConfigError> {
        let src = self.src;
        let l = self.lines[self.line];
        let start = l.start + col;
        let decor = self.take(start);

        let end = match src.as_bytes().get(start) {
            Some(&q @ (b'"' | b'\'')) => {
                let end = quoted_end(src, start, q)
                    .ok_or_else(|| self.error("unterminated quoted scalar"))?;
                self.seek(end);
                end
            }
            Some(b'|' | b'>') => self.block_scalar_end(parent),
            _ => self.plain_end(start, parent),
        };

        let repr = self.take(end);
        let trailer = self.line_rest()?;
        Ok(Scalar {
            decor,
            repr,
            trailer,
        })
    }

    /// End of a block scalar: the last non-blank line indented deeper than
    /// `parent`. Trailing blank lines are left as trivia.
    fn block_scalar_end(&mut self, parent: Option<usize>) -> usize {
        let mut end = self.lines[self.line].end;
        let mut idx = self.line + 1;
        while idx < self.lines.len() {
            if self.is_blank(idx) {
                idx += 1;
                continue;
            }
            if parent.is_some_and(|p| self.indent(idx) <= p) || (parent.is_none() && self.indent(idx) == 0) {
                break;
            }
            end = self.lines[idx].end;
            self.line = idx;
            idx += 1;
        }
        end
    }

    /// End of a plain scalar, following continuation lines.
    fn plain_end(&mut self, start: usize, parent: Option<usize>) -> usize {
        let src = self.src;
        let l = self.lines[self.line];
        let mut end = start + plain_len(&src[start..l.end]);
        let mut idx = self.line + 1;
        loop {
            let mut cand = idx;
            while cand < self.lines.len() && self.is_blank(cand) {
                cand += 1;
            }
            if cand >= self.lines.len() || self.is_trivia(cand) || self.is_marker(cand) {
                break;
            }
            let indent = self.indent(cand);
            if parent.is_some_and(|p| indent <= p) {
                break;
            }
            let text = self.text_from(cand, indent);
            if parent.is_none() && mapping_colon(text).is_some() {
                break;
            }
            let line_start = self.lines[cand].start + indent;
            end = line_start + plain_len(text);
            self.line = cand;
            idx = cand + 1;
        }
        end
    }
}

/// A block sequence indicator: `-` alone or followed by whitespace.
fn is_dash(s: &str) -> bool {
    s == "-" || s.starts_with("- ") || s.starts_with("-\t")
}

/// Byte offset of the `:` that makes `s` a mapping entry, if any.
fn mapping_colon(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = match bytes.first()? {
        &q @ (b'"' | b'\'') => quoted_end(s, 0, q)?,
        b'[' | b'{' | b'#' | b'|' | b'>' | b'&' | b'*' | b'!' | b'%' | b'@' | b'`' | b'?' => {
            return None;
        }
        _ => 0,
    };
    while i < bytes.len() {
        match bytes[i] {
            b':' if bytes.get(i + 1).is_none_or(u8::is_ascii_whitespace) => return Some(i),
            b'#' if i > 0 && bytes[i - 1].is_ascii_whitespace() => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Length of a plain scalar on one line: up to a ` #` comment, trailing
/// whitespace excluded.
fn plain_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut cut = bytes.len();
    for i in 1..bytes.len() {
        if bytes[i] == b'#' && bytes[i - 1].is_ascii_whitespace() {
            cut = i;
            break;
        }
    }
    text[..cut].trim_end().len()
}

/// Offset just past the closing quote of the quoted scalar opening at `start`.
fn quoted_end(src: &str, start: usize, quote: u8) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            b if b == quote => {
                if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                } else {
                    return Some(i + 1);
                }
            }
            _ => i += 1,
        }
    }
    None
}

/// Length of the `&anchor` and `!tag` properties opening `text`, with the
/// blanks after them.
fn properties_len(text: &str) -> usize {
    let mut rest = text;
    while rest.starts_with(['&', '!']) {
        let token = rest.find([' ', '\t']).unwrap_or(rest.len());
        rest = rest[token..].trim_start_matches([' ', '\t']);
    }
    text.len() - rest.len()
}

/// Skip whitespace, line breaks and comments between flow tokens.
fn flow_gap_end(src: &str, mut i: usize) -> usize {
    let bytes = src.as_bytes();
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'#' if i > 0 && bytes[i - 1].is_ascii_whitespace() => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            _ => break,
        }
    }
    i
}

/// End of a plain scalar inside a flow collection. It may cross line breaks;
/// trailing whitespace is excluded.
fn flow_plain_end(src: &str, start: usize) -> usize {
    let bytes = src.as_bytes();
    let mut end = start;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b',' | b'[' | b']' | b'{' | b'}' => break,
            b':' if bytes
                .get(i + 1)
                .is_none_or(|b| b.is_ascii_whitespace() || b",[]{}".contains(b)) =>
            {
                break;
            }
            b'#' if i > start && bytes[i - 1].is_ascii_whitespace() => break,
            b' ' | b'\t' | b'\r' | b'\n' => {}
            _ => end = i + 1,
        }
        i += 1;
    }
    end
}
