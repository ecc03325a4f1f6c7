use crate::chars;
use crate::types::{Int, Map, Value};
use itertools::Itertools;
use std::fmt;
use std::iter::Peekable;
use std::mem;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub line: usize,
    pub name: String,
}

#[derive(Debug, PartialEq)]
pub enum Reason {
    UnexpectedClose(char),
    MismatchedClose { expected: char, found: char },
    UnterminatedString,
    UnterminatedChar,
    UnterminatedCollection(char),
    DanglingQuote,
    QuoteBeforeClose,
    InvalidKeyword,
    UnsupportedCharacter,
    InvalidUnicode,
    InvalidOctal,
    InvalidNumber(String),
    InvalidRadix(Int),
    NumberTooLarge(String),
    DecimalsNotImplemented,
    OddMapEntries,
    NothingToRead,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::UnexpectedClose(c) => write!(f, "unexpected '{}', nothing to close", c),
            Reason::MismatchedClose { expected, found } => {
                write!(f, "expected '{}' but found '{}'", expected, found)
            }
            Reason::UnterminatedString => write!(f, "unterminated string"),
            Reason::UnterminatedChar => write!(f, "unterminated character"),
            Reason::UnterminatedCollection(c) => write!(f, "unbalanced, missing '{}'", c),
            Reason::DanglingQuote => write!(f, "quote with nothing to quote"),
            Reason::QuoteBeforeClose => write!(f, "unexpected quote"),
            Reason::InvalidKeyword => write!(f, "invalid keyword"),
            Reason::UnsupportedCharacter => write!(f, "unsupported character"),
            Reason::InvalidUnicode => write!(f, "invalid unicode character"),
            Reason::InvalidOctal => write!(f, "invalid octal character"),
            Reason::InvalidNumber(s) => write!(f, "invalid numeric format for '{}'", s),
            Reason::InvalidRadix(r) => write!(f, "radix {} out of range [2, 36]", r),
            Reason::NumberTooLarge(s) => write!(f, "number '{}' out of range", s),
            Reason::DecimalsNotImplemented => write!(f, "decimals not implemented"),
            Reason::OddMapEntries => write!(f, "map literal must contain an even number of forms"),
            Reason::NothingToRead => write!(f, "no form to read"),
        }
    }
}

#[derive(Debug)]
pub struct ReadError {
    pub position: Position,
    pub reason: Reason,
}

impl ReadError {
    /// True when more input could turn this into a valid read.
    pub fn is_incomplete(&self) -> bool {
        match self.reason {
            Reason::UnterminatedString
            | Reason::UnterminatedChar
            | Reason::UnterminatedCollection(_)
            | Reason::DanglingQuote => true,
            _ => false,
        }
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}:{}) reader error: {}",
            self.position.line, self.position.name, self.reason
        )
    }
}

fn is_separator(c: char) -> bool {
    match c {
        ' ' | '(' | ')' | '[' | ']' | '{' | '}' | '\n' | '\r' | '"' | '\'' | '\t' | '\x0c'
        | '\x0b' | '`' | ',' | ';' => true,
        _ => false,
    }
}

fn is_whitespace(c: char) -> bool {
    match c {
        ' ' | '\n' | '\r' | '\t' | '\x0c' | '\x0b' | ',' => true,
        _ => false,
    }
}

fn is_keyword_char(c: char) -> bool {
    c.is_alphanumeric()
        || match c {
            '_' | '$' | '-' | '?' | '!' | '*' | '+' | '.' | '<' | '>' | '=' => true,
            _ => false,
        }
}

enum DigitError {
    Invalid,
    Overflow,
}

#[derive(Debug, Clone, Copy)]
struct Number {
    neg: bool,
    acc: Int,
    base: u32,
    digits: usize,
}

impl Number {
    fn new(neg: bool) -> Self {
        Self {
            neg,
            acc: 0,
            base: 10,
            digits: 0,
        }
    }

    fn with_base(self, base: u32) -> Self {
        Self {
            acc: 0,
            base,
            digits: 0,
            ..self
        }
    }

    fn push(&mut self, c: char) -> Result<(), DigitError> {
        let digit = c.to_digit(self.base).ok_or(DigitError::Invalid)?;
        // Negative literals accumulate downwards so that Int::MIN is reachable.
        let digit = Int::from(digit);
        let neg = self.neg;
        self.acc = self
            .acc
            .checked_mul(Int::from(self.base))
            .and_then(|acc| match neg {
                true => acc.checked_sub(digit),
                false => acc.checked_add(digit),
            })
            .ok_or(DigitError::Overflow)?;
        self.digits += 1;
        Ok(())
    }

    fn value(&self) -> Int {
        self.acc
    }

    /// The digits read so far as an unsigned magnitude, for `NrDDD` literals.
    fn magnitude(&self) -> Int {
        self.acc.wrapping_abs()
    }
}

#[derive(Debug)]
enum State {
    Normal,
    InChar,
    InString,
    InComment,
    InKeyword,
    InNamespacedKeyword,
    InNumber(Number),
    InDecimalNumber,
    InRadixNumber(Number),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameKind {
    List,
    Vector,
    Map,
}

impl FrameKind {
    fn closer(self) -> char {
        match self {
            FrameKind::List => ')',
            FrameKind::Vector => ']',
            FrameKind::Map => '}',
        }
    }
}

/// One open collection literal.
#[derive(Debug)]
struct ReaderFrame {
    kind: FrameKind,
    items: Vec<Value>,
    quotes: usize,
}

impl ReaderFrame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            quotes: 0,
        }
    }

    fn finish(self) -> Result<Value, Reason> {
        match self.kind {
            FrameKind::List => Ok(Value::wrap_list(self.items)),
            FrameKind::Vector => Ok(Value::wrap_vector(self.items)),
            FrameKind::Map => {
                if self.items.len() % 2 == 1 {
                    return Err(Reason::OddMapEntries);
                }
                let mut map = Map::default();
                for (key, value) in self.items.into_iter().tuples() {
                    map.assoc(key, value);
                }
                Ok(Value::wrap_map(map))
            }
        }
    }
}

fn quote(value: Value, times: usize) -> Value {
    (0..times).fold(value, |quoted, _| {
        Value::wrap_list(vec![Value::new_symbol("quote"), quoted])
    })
}

fn symbol_or_constant(token: String) -> Value {
    match token.as_str() {
        "nil" => Value::Nil,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::new_symbol(&token),
    }
}

type Step = Result<(State, Option<Value>), ReadError>;

/// Incremental reader: each call to `next` consumes just enough characters
/// to produce one more top-level form. Stops for good after the first error.
pub struct Reader<'a> {
    chars: Peekable<Chars<'a>>,
    pushback: Option<char>,
    position: Position,
    state: State,
    build: String,
    stack: Vec<ReaderFrame>,
    quotes: usize,
    failed: bool,
}

impl<'a> Reader<'a> {
    pub fn new(src: &'a str, name: &str) -> Self {
        Self {
            chars: src.chars().peekable(),
            pushback: None,
            position: Position {
                line: 1,
                name: name.to_string(),
            },
            state: State::Normal,
            build: String::new(),
            stack: Vec::new(),
            quotes: 0,
            failed: false,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    fn error(&self, reason: Reason) -> ReadError {
        ReadError {
            position: self.position.clone(),
            reason,
        }
    }

    fn next_char(&mut self) -> Option<char> {
        if let Some(c) = self.pushback.take() {
            return Some(c);
        }
        let c = self.chars.next()?;
        if c == '\n' {
            self.position.line += 1;
        }
        Some(c)
    }

    fn peek_char(&mut self) -> Option<char> {
        match self.pushback {
            Some(c) => Some(c),
            None => self.chars.peek().copied(),
        }
    }

    fn unread(&mut self, c: char) {
        debug_assert!(self.pushback.is_none());
        self.pushback = Some(c);
    }

    /// Places a completed value in the innermost open collection, or hands
    /// it back when it is a top-level form. Pending quotes are applied.
    fn emit(&mut self, value: Value) -> Option<Value> {
        match self.stack.last_mut() {
            Some(frame) => {
                let value = quote(value, mem::take(&mut frame.quotes));
                frame.items.push(value);
                None
            }
            None => Some(quote(value, mem::take(&mut self.quotes))),
        }
    }

    /// Emits any pending symbol before `c` is handled. If that completes a
    /// top-level form, `c` is pushed back for the next call.
    fn flush_before(&mut self, c: char) -> Option<Value> {
        if self.build.is_empty() {
            return None;
        }
        let token = mem::take(&mut self.build);
        let value = self.emit(symbol_or_constant(token));
        if value.is_some() {
            self.unread(c);
        }
        value
    }

    fn emit_built<F: FnOnce(String) -> Value>(&mut self, make: F) -> Option<Value> {
        let token = mem::take(&mut self.build);
        self.emit(make(token))
    }

    fn close_frame(&mut self, c: char) -> Result<Option<Value>, ReadError> {
        let frame = match self.stack.pop() {
            Some(frame) => frame,
            None => return Err(self.error(Reason::UnexpectedClose(c))),
        };
        if frame.kind.closer() != c {
            return Err(self.error(Reason::MismatchedClose {
                expected: frame.kind.closer(),
                found: c,
            }));
        }
        if frame.quotes > 0 {
            return Err(self.error(Reason::QuoteBeforeClose));
        }
        let value = frame.finish().map_err(|reason| self.error(reason))?;
        Ok(self.emit(value))
    }

    fn normal(&mut self, c: char) -> Step {
        if let Some(value) = match c {
            '(' | '[' | '{' | ')' | ']' | '}' | '\'' | '`' | '^' | '@' | '&' | '~' | '"' | ';'
            | '\\' => self.flush_before(c),
            c if is_whitespace(c) => self.flush_before(c),
            _ => None,
        } {
            return Ok((State::Normal, Some(value)));
        }

        let value = match c {
            c if is_whitespace(c) => None,
            '(' => {
                self.stack.push(ReaderFrame::new(FrameKind::List));
                None
            }
            '[' => {
                self.stack.push(ReaderFrame::new(FrameKind::Vector));
                None
            }
            '{' => {
                self.stack.push(ReaderFrame::new(FrameKind::Map));
                None
            }
            ')' | ']' | '}' => self.close_frame(c)?,
            '\'' => {
                match self.stack.last_mut() {
                    Some(frame) => frame.quotes += 1,
                    None => self.quotes += 1,
                }
                None
            }
            '`' | '^' | '@' | '&' => self.emit(Value::new_symbol(&c.to_string())),
            '~' => match self.peek_char() {
                Some('@') => {
                    self.next_char();
                    self.emit(Value::new_symbol("~@"))
                }
                _ => self.emit(Value::new_symbol("~")),
            },
            '"' => return Ok((State::InString, None)),
            ';' => return Ok((State::InComment, None)),
            '\\' => return Ok((State::InChar, None)),
            '-' => {
                self.build.push(c);
                let leads_number = self.build.len() == 1
                    && self.peek_char().map_or(false, |next| next.is_ascii_digit());
                if leads_number {
                    return Ok((State::InNumber(Number::new(true)), None));
                }
                None
            }
            c if c.is_ascii_digit() && self.build.is_empty() => {
                self.unread(c);
                return Ok((State::InNumber(Number::new(false)), None));
            }
            ':' if self.build.is_empty() => {
                self.build.push(c);
                return Ok((State::InKeyword, None));
            }
            _ => {
                self.build.push(c);
                None
            }
        };
        Ok((State::Normal, value))
    }

    fn expect_digits(&mut self, count: u32, radix: u32, reason: Reason) -> Result<u32, ReadError> {
        let mut code = 0;
        for _ in 0..count {
            let c = match self.next_char() {
                Some(c) => c,
                None => return Err(self.error(Reason::UnterminatedChar)),
            };
            match c.to_digit(radix) {
                Some(digit) => code = code * radix + digit,
                None => return Err(self.error(reason)),
            }
        }
        Ok(code)
    }

    fn in_char(&mut self, c: char) -> Step {
        if self.peek_char().map_or(true, is_separator) {
            return Ok((State::Normal, self.emit(Value::Char(c))));
        }
        let value = match c {
            'u' => {
                let code = self.expect_digits(4, 16, Reason::InvalidUnicode)?;
                std::char::from_u32(code).ok_or_else(|| self.error(Reason::InvalidUnicode))?
            }
            'o' => {
                let code = self.expect_digits(3, 8, Reason::InvalidOctal)?;
                std::char::from_u32(code).ok_or_else(|| self.error(Reason::InvalidOctal))?
            }
            _ => {
                let name = chars::names_starting_with(c)
                    .next()
                    .ok_or_else(|| self.error(Reason::UnsupportedCharacter))?;
                for expected in name.chars().skip(1) {
                    if self.next_char() != Some(expected) {
                        return Err(self.error(Reason::UnsupportedCharacter));
                    }
                }
                chars::by_name(name).ok_or_else(|| self.error(Reason::UnsupportedCharacter))?
            }
        };
        if !self.peek_char().map_or(true, is_separator) {
            return Err(self.error(Reason::UnsupportedCharacter));
        }
        Ok((State::Normal, self.emit(Value::Char(value))))
    }

    fn in_string(&mut self, c: char) -> Step {
        match c {
            '"' => Ok((State::Normal, self.emit_built(Value::String))),
            '\\' => match self.next_char() {
                Some(escaped) => {
                    self.build.push(c);
                    self.build.push(escaped);
                    Ok((State::InString, None))
                }
                None => Err(self.error(Reason::UnterminatedString)),
            },
            _ => {
                self.build.push(c);
                Ok((State::InString, None))
            }
        }
    }

    fn in_comment(&mut self, c: char) -> Step {
        match c {
            '\n' => Ok((State::Normal, None)),
            '\r' => {
                if self.peek_char() == Some('\n') {
                    self.next_char();
                }
                Ok((State::Normal, None))
            }
            _ => Ok((State::InComment, None)),
        }
    }

    fn keyword_complete(&self) -> bool {
        self.build.len() > 1 && self.build != "::"
    }

    fn in_keyword(&mut self, c: char) -> Step {
        if is_keyword_char(c) || (c == ':' && self.build == ":") {
            self.build.push(c);
            Ok((State::InKeyword, None))
        } else if c == '/' && self.keyword_complete() {
            self.build.push(c);
            Ok((State::InNamespacedKeyword, None))
        } else if self.keyword_complete() {
            self.unread(c);
            Ok((State::Normal, self.emit_built(Value::Keyword)))
        } else {
            Err(self.error(Reason::InvalidKeyword))
        }
    }

    fn in_namespaced_keyword(&mut self, c: char) -> Step {
        if is_keyword_char(c) {
            self.build.push(c);
            Ok((State::InNamespacedKeyword, None))
        } else if !self.build.ends_with('/') {
            self.unread(c);
            Ok((State::Normal, self.emit_built(Value::Keyword)))
        } else {
            Err(self.error(Reason::InvalidKeyword))
        }
    }

    fn push_digit(&mut self, number: &mut Number, c: char) -> Result<(), ReadError> {
        self.build.push(c);
        match number.push(c) {
            Ok(()) => Ok(()),
            Err(DigitError::Overflow) => Err(self.error(Reason::NumberTooLarge(self.build.clone()))),
            Err(DigitError::Invalid) => Err(self.error(Reason::InvalidNumber(self.build.clone()))),
        }
    }

    fn emit_number(&mut self, number: Number) -> Result<Option<Value>, ReadError> {
        if number.digits == 0 {
            return Err(self.error(Reason::InvalidNumber(self.build.clone())));
        }
        self.build.clear();
        Ok(self.emit(Value::Integer(number.value())))
    }

    fn in_number(&mut self, mut number: Number, c: char) -> Step {
        match c {
            c if c.is_ascii_digit() => {
                self.push_digit(&mut number, c)?;
                Ok((State::InNumber(number), None))
            }
            '.' => Ok((State::InDecimalNumber, None)),
            'r' | 'R' => {
                self.build.push(c);
                let radix = number.magnitude();
                if radix < 2 || radix > 36 {
                    return Err(self.error(Reason::InvalidRadix(radix)));
                }
                let base = radix as u32;
                Ok((State::InRadixNumber(number.with_base(base)), None))
            }
            'x' | 'X' if number.digits == 1 && number.acc == 0 => {
                self.build.push(c);
                Ok((State::InRadixNumber(number.with_base(16)), None))
            }
            c if is_separator(c) => {
                self.unread(c);
                Ok((State::Normal, self.emit_number(number)?))
            }
            _ => {
                self.build.push(c);
                Err(self.error(Reason::InvalidNumber(self.build.clone())))
            }
        }
    }

    fn in_radix_number(&mut self, mut number: Number, c: char) -> Step {
        match c {
            c if c.is_ascii_alphanumeric() => {
                self.push_digit(&mut number, c)?;
                Ok((State::InRadixNumber(number), None))
            }
            c if is_separator(c) => {
                self.unread(c);
                Ok((State::Normal, self.emit_number(number)?))
            }
            _ => {
                self.build.push(c);
                Err(self.error(Reason::InvalidNumber(self.build.clone())))
            }
        }
    }

    fn handle(&mut self, state: State, c: char) -> Step {
        match state {
            State::Normal => self.normal(c),
            State::InChar => self.in_char(c),
            State::InString => self.in_string(c),
            State::InComment => self.in_comment(c),
            State::InKeyword => self.in_keyword(c),
            State::InNamespacedKeyword => self.in_namespaced_keyword(c),
            State::InNumber(number) => self.in_number(number, c),
            State::InDecimalNumber => Err(self.error(Reason::DecimalsNotImplemented)),
            State::InRadixNumber(number) => self.in_radix_number(number, c),
        }
    }

    /// End of input: flush whatever token is pending, then complain about
    /// anything left open.
    fn finish(&mut self) -> Result<Option<Value>, ReadError> {
        let state = mem::replace(&mut self.state, State::Normal);
        let flushed = match state {
            State::Normal | State::InComment => match self.build.is_empty() {
                true => None,
                false => self.emit_built(symbol_or_constant),
            },
            State::InChar => return Err(self.error(Reason::UnterminatedChar)),
            State::InString => return Err(self.error(Reason::UnterminatedString)),
            State::InKeyword if self.keyword_complete() => self.emit_built(Value::Keyword),
            State::InNamespacedKeyword if !self.build.ends_with('/') => {
                self.emit_built(Value::Keyword)
            }
            State::InKeyword | State::InNamespacedKeyword => {
                return Err(self.error(Reason::InvalidKeyword))
            }
            State::InNumber(number) | State::InRadixNumber(number) => self.emit_number(number)?,
            State::InDecimalNumber => return Err(self.error(Reason::DecimalsNotImplemented)),
        };
        if flushed.is_some() {
            return Ok(flushed);
        }
        if let Some(frame) = self.stack.last() {
            return Err(self.error(Reason::UnterminatedCollection(frame.kind.closer())));
        }
        if self.quotes > 0 {
            return Err(self.error(Reason::DanglingQuote));
        }
        Ok(None)
    }

    fn read_next(&mut self) -> Result<Option<Value>, ReadError> {
        while let Some(c) = self.next_char() {
            let state = mem::replace(&mut self.state, State::Normal);
            let (state, value) = self.handle(state, c)?;
            self.state = state;
            if value.is_some() {
                return Ok(value);
            }
        }
        self.finish()
    }
}

impl Iterator for Reader<'_> {
    type Item = Result<Value, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_next() {
            Ok(value) => {
                if let Some(v) = &value {
                    log::trace!("read {}", v);
                }
                value.map(Ok)
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Reads the first form of `src`.
pub fn read_str(src: &str) -> Result<Value, ReadError> {
    let mut reader = Reader::new(src, "string");
    match reader.next() {
        Some(result) => result,
        None => Err(reader.error(Reason::NothingToRead)),
    }
}
