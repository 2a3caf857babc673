//! Text to value codec for free-form literal editors.
//!
//! The fallback editor for unknown types stores raw text and parses it on
//! read. Parsing is done by a [`LiteralCodec`]; the default, [`PythonLiteral`],
//! accepts numbers, quoted strings, `True`/`False`/`None`, and tuples, lists
//! and dicts of those. Nothing is ever evaluated.
//!
//! # Example
//!
//! ```
//! use horizon_autogui_core::{LiteralCodec, PythonLiteral, Value};
//!
//! let codec = PythonLiteral;
//! let v = codec.parse("[1, 'two', (3.0, None)]").unwrap();
//! assert_eq!(codec.format(&v), "[1, 'two', (3.0, None)]");
//! assert!(codec.parse("__import__('os')").is_err());
//! ```

use crate::error::{CoreError, Result};
use crate::value::Value;

/// Converts between editor text and values.
pub trait LiteralCodec: Send + Sync {
    /// Parse `text`, failing on anything that is not a literal.
    fn parse(&self, text: &str) -> Result<Value>;

    /// Render `value` so that [`parse`](Self::parse) reads it back.
    fn format(&self, value: &Value) -> String {
        value.to_string()
    }
}

/// Safe parser for Python literal syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonLiteral;

impl LiteralCodec for PythonLiteral {
    fn parse(&self, text: &str) -> Result<Value> {
        let mut parser = Parser {
            text,
            chars: text.char_indices().collect(),
            pos: 0,
            depth: 0,
        };
        let value = parser.expr()?;
        parser.skip_ws();
        if parser.pos < parser.chars.len() {
            return Err(parser.error("unexpected trailing characters"));
        }
        tracing::trace!(target: crate::logging::targets::LITERAL, %text, "parsed literal");
        Ok(value)
    }
}

/// Deepest container nesting accepted.
pub const MAX_NESTING: usize = 128;

struct Parser<'a> {
    text: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.text.len(), |(offset, _)| *offset)
    }

    fn error(&self, message: &str) -> CoreError {
        CoreError::literal(self.text, self.offset(), message)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Value> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('(') => self.nested(Self::tuple),
            Some('[') => self.nested(|p| Ok(Value::List(p.items(']')?))),
            Some('{') => self.nested(Self::dict),
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                self.string(q)
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.keyword(),
            Some(_) => Err(self.error("unexpected character")),
        }
    }

    /// Consume an opening bracket and parse its contents with `f`.
    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<Value>) -> Result<Value> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        self.pos += 1;
        let value = f(self);
        self.depth -= 1;
        value
    }

    /// Comma-separated items up to `close`; trailing comma allowed.
    fn items(&mut self, close: char) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.expr()?);
            if !self.eat(',') {
                if self.eat(close) {
                    return Ok(items);
                }
                return Err(self.error("expected ',' or closing bracket"));
            }
        }
    }

    fn tuple(&mut self) -> Result<Value> {
        if self.eat(')') {
            return Ok(Value::Tuple(Vec::new()));
        }
        let first = self.expr()?;
        if self.eat(')') {
            // parenthesized expression, not a tuple
            return Ok(first);
        }
        if !self.eat(',') {
            return Err(self.error("expected ',' or ')'"));
        }
        let mut items = vec![first];
        items.extend(self.items(')')?);
        Ok(Value::Tuple(items))
    }

    fn dict(&mut self) -> Result<Value> {
        let mut pairs = Vec::new();
        loop {
            if self.eat('}') {
                return Ok(Value::Dict(pairs));
            }
            let key = self.expr()?;
            if !self.eat(':') {
                return Err(self.error("expected ':'"));
            }
            let value = self.expr()?;
            pairs.push((key, value));
            if !self.eat(',') {
                if self.eat('}') {
                    return Ok(Value::Dict(pairs));
                }
                return Err(self.error("expected ',' or '}'"));
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<Value> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(Value::Str(out)),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some(c @ ('\\' | '\'' | '"')) => c,
                        Some(_) => return Err(self.error("unknown escape sequence")),
                        None => return Err(self.error("unterminated string")),
                    };
                    out.push(escaped);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    if matches!(self.chars.get(self.pos + 1), Some((_, '-' | '+'))) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos]
            .iter()
            .map(|(_, c)| *c)
            .filter(|c| *c != '_')
            .collect();
        if is_float {
            raw.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.error("invalid float literal"))
        } else {
            raw.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.error("invalid integer literal"))
        }
    }

    fn keyword(&mut self) -> Result<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().map(|(_, c)| *c).collect();
        match word.as_str() {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::None),
            _ => {
                self.pos = start;
                Err(self.error("names are not literals"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Value> {
        PythonLiteral.parse(text)
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse("42").unwrap(), Value::Int(42));
        assert_eq!(parse(" -7 ").unwrap(), Value::Int(-7));
        assert_eq!(parse("1_000").unwrap(), Value::Int(1000));
        assert_eq!(parse("2.5e3").unwrap(), Value::Float(2500.0));
        assert_eq!(parse("None").unwrap(), Value::None);
        assert_eq!(parse("True").unwrap(), Value::Bool(true));
        assert_eq!(parse(r#""a\"b""#).unwrap(), Value::str("a\"b"));
    }

    #[test]
    fn test_containers() {
        assert_eq!(parse("()").unwrap(), Value::Tuple(vec![]));
        assert_eq!(parse("(1,)").unwrap(), Value::Tuple(vec![Value::Int(1)]));
        assert_eq!(parse("(1)").unwrap(), Value::Int(1));
        assert_eq!(
            parse("[1, [2, 3],]").unwrap(),
            Value::List(vec![
                Value::Int(1),
                Value::List(vec![Value::Int(2), Value::Int(3)])
            ])
        );
        assert_eq!(
            parse("{'a': 1, 2: None}").unwrap(),
            Value::Dict(vec![
                (Value::str("a"), Value::Int(1)),
                (Value::Int(2), Value::None)
            ])
        );
    }

    #[test]
    fn test_rejects_non_literals() {
        for bad in ["", "foo", "1 + 2", "[1, 2", "'open", "{1 2}", "print('x')"] {
            assert!(parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_error_reports_offset() {
        let err = parse("[1, x]").unwrap_err();
        assert!(matches!(err, CoreError::Literal { offset: 4, .. }));
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let err = parse(&"[".repeat(200_000)).unwrap_err();
        assert!(matches!(err, CoreError::Literal { ref message, .. } if message == "nesting too deep"));

        let ok = format!("{}{}", "[".repeat(MAX_NESTING), "]".repeat(MAX_NESTING));
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn test_format_round_trips_repr() {
        let v = parse("{'k': (1, 'it\\'s')}").unwrap();
        assert_eq!(parse(&PythonLiteral.format(&v)).unwrap(), v);
    }
}
