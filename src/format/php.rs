//! PHP array settings files
//!
//! Reads the subset of PHP used by settings files: a single
//! `return [...];` (or `return array(...);`) statement whose value is built
//! from string, integer, float and boolean literals and nested arrays.
//!
//! - Arrays with only `'key' => value` entries become mappings
//! - Arrays with only positional entries become sequences
//! - `[]` becomes an empty mapping
//! - `//`, `#` and `/* */` comments and trailing commas are accepted
//! - `null`, integer keys, mixed arrays, constants and expressions are rejected

use super::raw::RawNode;
use super::{Format, ensure_finite};
use crate::error::{Error, Location, Result};
use crate::tree::{ConfigNode, ConfigTree, Mapping, Scalar};
use std::fmt::Write as _;

/// PHP array format
#[derive(Debug, Clone)]
pub struct PhpFormat {
    indent: usize,
}

impl Default for PhpFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl PhpFormat {
    /// Create a PHP format rendering with four-space indentation
    pub fn new() -> Self {
        Self { indent: 4 }
    }

    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }
}

impl Format for PhpFormat {
    fn extension(&self) -> &str {
        "php"
    }

    fn parse(&self, content: &str) -> Result<ConfigTree> {
        Parser::new(content).document()?.into_tree("php")
    }

    fn render(&self, tree: &ConfigTree) -> Result<String> {
        ensure_finite("php", tree)?;
        let mut out = String::from("<?php\nreturn ");
        render_mapping(&mut out, tree.root(), 0, self.indent);
        out.push_str(";\n");
        Ok(out)
    }
}

// =============================================================================
// Parser
// =============================================================================

/// Arrays nested deeper than this are rejected
const MAX_DEPTH: usize = 128;

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

fn is_ident(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> Error {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> Error {
        Error::parse("php", Some(Location::from_offset(self.src, pos)), message)
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// Case-insensitive keyword not followed by an identifier character
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let rest = self.rest().as_bytes();
        let n = keyword.len();
        let matched = rest.len() >= n
            && rest[..n].eq_ignore_ascii_case(keyword.as_bytes())
            && !rest.get(n).is_some_and(|b| is_ident(*b));
        if matched {
            self.pos += n;
        }
        matched
    }

    fn skip_line(&mut self) {
        match self.rest().find('\n') {
            Some(i) => self.pos += i + 1,
            None => self.pos = self.src.len(),
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'#') if self.peek_at(1) != Some(b'[') => self.skip_line(),
                Some(b'/') if self.peek_at(1) == Some(b'/') => self.skip_line(),
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos;
                    match self.rest()[2..].find("*/") {
                        Some(end) => self.pos += end + 4,
                        None => return Err(self.error_at(start, "unterminated comment")),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn document(&mut self) -> Result<RawNode> {
        self.eat("\u{feff}");
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        if !self.eat("<?php") {
            return Err(self.error("expected opening <?php tag"));
        }
        self.skip_trivia()?;

        if self.eat_keyword("declare") {
            self.declare()?;
            self.skip_trivia()?;
        }

        if !self.eat_keyword("return") {
            return Err(self.error("expected `return` statement"));
        }
        self.skip_trivia()?;
        let value = self.value()?;
        self.skip_trivia()?;
        if !self.eat(";") {
            return Err(self.error("expected `;` after returned value"));
        }
        self.skip_trivia()?;
        if self.eat("?>") {
            while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                self.pos += 1;
            }
        }
        if self.pos < self.src.len() {
            return Err(self.error("unexpected content after return statement"));
        }
        Ok(value)
    }

    /// `declare(strict_types=1);`
    fn declare(&mut self) -> Result<()> {
        self.skip_trivia()?;
        if !self.eat("(") {
            return Err(self.error("expected `(` after declare"));
        }
        match self.rest().find(')') {
            Some(end) => self.pos += end + 1,
            None => return Err(self.error("unterminated declare")),
        }
        self.skip_trivia()?;
        if !self.eat(";") {
            return Err(self.error("expected `;` after declare"));
        }
        Ok(())
    }

    fn value(&mut self) -> Result<RawNode> {
        match self.peek() {
            Some(b'[') => {
                self.pos += 1;
                self.array(b']')
            }
            Some(b'\'') => self.single_quoted().map(RawNode::Str),
            Some(b'"') => self.double_quoted().map(RawNode::Str),
            Some(b'-' | b'+' | b'.' | b'0'..=b'9') => self.number(),
            Some(_) => {
                let start = self.pos;
                if self.eat_keyword("array") {
                    self.skip_trivia()?;
                    if self.eat("(") {
                        return self.array(b')');
                    }
                    return Err(self.error("expected `(` after array"));
                }
                if self.eat_keyword("true") {
                    return Ok(RawNode::Bool(true));
                }
                if self.eat_keyword("false") {
                    return Ok(RawNode::Bool(false));
                }
                if self.eat_keyword("null") {
                    return Err(self.error_at(start, "null values are not supported"));
                }
                Err(self.error_at(start, "unsupported expression"))
            }
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn array(&mut self, close: u8) -> Result<RawNode> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("nesting too deep (limit {MAX_DEPTH})")));
        }
        self.depth += 1;
        let node = self.array_entries(close)?;
        self.depth -= 1;
        Ok(node)
    }

    fn array_entries(&mut self, close: u8) -> Result<RawNode> {
        let mut keyed: Vec<(String, RawNode)> = Vec::new();
        let mut positional: Vec<RawNode> = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }

            let entry_start = self.pos;
            let first = self.value()?;
            self.skip_trivia()?;

            if self.eat("=>") {
                let key = match first {
                    RawNode::Str(key) => key,
                    RawNode::Int(_) => {
                        return Err(self.error_at(entry_start, "integer keys are not supported"));
                    }
                    _ => return Err(self.error_at(entry_start, "array keys must be strings")),
                };
                if !positional.is_empty() {
                    return Err(self.error_at(entry_start, "mixed keyed and positional entries"));
                }
                self.skip_trivia()?;
                keyed.push((key, self.value()?));
            } else {
                if !keyed.is_empty() {
                    return Err(self.error_at(entry_start, "mixed keyed and positional entries"));
                }
                positional.push(first);
            }

            self.skip_trivia()?;
            if self.eat(",") {
                continue;
            }
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }
            return Err(self.error(format!("expected `,` or `{}`", close as char)));
        }

        Ok(if positional.is_empty() {
            RawNode::Map(keyed)
        } else {
            RawNode::Seq(positional)
        })
    }

    fn single_quoted(&mut self) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let rest = self.rest();
            let Some(i) = rest.find(['\'', '\\']) else {
                return Err(self.error_at(start, "unterminated string"));
            };
            out.push_str(&rest[..i]);
            self.pos += i;
            if self.peek() == Some(b'\'') {
                self.pos += 1;
                return Ok(out);
            }
            // only \\ and \' are escapes, any other backslash is literal
            match self.peek_at(1) {
                Some(b'\'') => {
                    out.push('\'');
                    self.pos += 2;
                }
                Some(b'\\') => {
                    out.push('\\');
                    self.pos += 2;
                }
                _ => {
                    out.push('\\');
                    self.pos += 1;
                }
            }
        }
    }

    /// Double-quoted string. Byte escapes (`\x41`, `\101`) may spell out
    /// multi-byte characters, so the value is assembled as bytes.
    fn double_quoted(&mut self) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let rest = self.rest();
            let Some(i) = rest.find(['"', '\\', '$']) else {
                return Err(self.error_at(start, "unterminated string"));
            };
            out.extend_from_slice(rest[..i].as_bytes());
            self.pos += i;
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    return String::from_utf8(out)
                        .map_err(|_| self.error_at(start, "byte escapes do not form valid UTF-8"));
                }
                Some(b'$') => {
                    if self
                        .peek_at(1)
                        .is_some_and(|b| b == b'{' || b == b'_' || b.is_ascii_alphabetic())
                    {
                        return Err(self.error("variable interpolation is not supported"));
                    }
                    out.push(b'$');
                    self.pos += 1;
                }
                _ => self.escape(&mut out)?,
            }
        }
    }

    fn escape(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let simple = match self.peek_at(1) {
            Some(b'n') => Some('\n'),
            Some(b't') => Some('\t'),
            Some(b'r') => Some('\r'),
            Some(b'v') => Some('\u{0b}'),
            Some(b'e') => Some('\u{1b}'),
            Some(b'f') => Some('\u{0c}'),
            Some(b'\\') => Some('\\'),
            Some(b'$') => Some('$'),
            Some(b'"') => Some('"'),
            _ => None,
        };
        if let Some(c) = simple {
            push_char(out, c);
            self.pos += 2;
            return Ok(());
        }

        // \xNN: one or two hex digits
        if self.peek_at(1) == Some(b'x') {
            let digits = self.escape_digits(2, 2, |b| b.is_ascii_hexdigit());
            if digits > 0 {
                let text = &self.src[self.pos + 2..self.pos + 2 + digits];
                let byte = u8::from_str_radix(text, 16).map_err(|_| self.error("invalid hex escape"))?;
                out.push(byte);
                self.pos += 2 + digits;
                return Ok(());
            }
        }

        // \NNN: one to three octal digits, wrapping at 256
        let digits = self.escape_digits(1, 3, |b| matches!(b, b'0'..=b'7'));
        if digits > 0 {
            let text = &self.src[self.pos + 1..self.pos + 1 + digits];
            let value = u16::from_str_radix(text, 8).map_err(|_| self.error("invalid octal escape"))?;
            out.push((value & 0xff) as u8);
            self.pos += 1 + digits;
            return Ok(());
        }

        if self.rest().starts_with("\\u{") {
            let start = self.pos;
            let body = &self.rest()[3..];
            let end = body
                .find('}')
                .ok_or_else(|| self.error_at(start, "unterminated unicode escape"))?;
            let c = u32::from_str_radix(&body[..end], 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| self.error_at(start, "invalid unicode escape"))?;
            push_char(out, c);
            self.pos += end + 4;
            return Ok(());
        }

        out.push(b'\\');
        self.pos += 1;
        Ok(())
    }

    /// Count up to `max` bytes matching `accept`, starting `offset` bytes
    /// past the current position.
    fn escape_digits(&self, offset: usize, max: usize, accept: impl Fn(u8) -> bool) -> usize {
        (0..max)
            .take_while(|i| self.peek_at(offset + i).is_some_and(&accept))
            .count()
    }

    fn number(&mut self) -> Result<RawNode> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }

        let mut is_float = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' | b'_' => {}
                b'a'..=b'd' | b'f' | b'A'..=b'D' | b'F' | b'x' | b'X' | b'o' | b'O' => {}
                b'.' => is_float = true,
                b'e' | b'E' => {
                    if !self.src[start..self.pos].contains(['x', 'X']) {
                        is_float = true;
                        if matches!(self.peek_at(1), Some(b'-' | b'+')) {
                            self.pos += 1;
                        }
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }

        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let invalid = || self.error_at(start, format!("invalid number `{text}`"));

        if is_float {
            return text.parse::<f64>().map(RawNode::Float).map_err(|_| invalid());
        }

        let (negative, digits) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text.as_str()),
        };
        let (radix, body) = radix_literal(digits);
        if body.is_empty() || !body.bytes().all(|b| (b as char).is_digit(radix)) {
            return Err(invalid());
        }

        let signed = if negative { format!("-{body}") } else { body.to_string() };
        match i64::from_str_radix(&signed, radix) {
            Ok(n) => Ok(RawNode::Int(n)),
            // integer overflow degrades to float
            Err(_) if radix == 10 => text.parse::<f64>().map(RawNode::Float).map_err(|_| invalid()),
            Err(_) => Err(invalid()),
        }
    }
}

fn push_char(out: &mut Vec<u8>, c: char) {
    out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
}

/// Split a radix prefix off an unsigned integer literal.
fn radix_literal(digits: &str) -> (u32, &str) {
    let lower = digits.get(..2).map(str::to_ascii_lowercase);
    match lower.as_deref() {
        Some("0x") => (16, &digits[2..]),
        Some("0b") => (2, &digits[2..]),
        Some("0o") => (8, &digits[2..]),
        _ if digits.len() > 1 && digits.starts_with('0') => (8, &digits[1..]),
        _ => (10, digits),
    }
}

// =============================================================================
// Renderer
// =============================================================================

fn pad(out: &mut String, depth: usize, indent: usize) {
    out.extend(std::iter::repeat_n(' ', depth * indent));
}

fn render_string(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
}

fn render_scalar(out: &mut String, scalar: &Scalar) {
    match scalar {
        Scalar::String(s) => render_string(out, s),
        Scalar::Integer(n) => {
            let _ = write!(out, "{n}");
        }
        Scalar::Float(n) => {
            let _ = write!(out, "{n:?}");
        }
        Scalar::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
    }
}

fn render_node(out: &mut String, node: &ConfigNode, depth: usize, indent: usize) {
    match node {
        ConfigNode::Scalar(scalar) => render_scalar(out, scalar),
        ConfigNode::Sequence(items) if items.is_empty() => out.push_str("[]"),
        ConfigNode::Sequence(items) => {
            out.push_str("[\n");
            for item in items {
                pad(out, depth + 1, indent);
                render_node(out, item, depth + 1, indent);
                out.push_str(",\n");
            }
            pad(out, depth, indent);
            out.push(']');
        }
        ConfigNode::Mapping(mapping) => render_mapping(out, mapping, depth, indent),
    }
}

fn render_mapping(out: &mut String, mapping: &Mapping, depth: usize, indent: usize) {
    if mapping.is_empty() {
        out.push_str("[]");
        return;
    }
    out.push_str("[\n");
    for (key, node) in mapping.iter() {
        pad(out, depth + 1, indent);
        render_string(out, key);
        out.push_str(" => ");
        render_node(out, node, depth + 1, indent);
        out.push_str(",\n");
    }
    pad(out, depth, indent);
    out.push(']');
}
