use crate::chars;
use crate::types::Value;
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrintMode {
    /// Output that the reader would turn back into an equal value.
    ReadableRepresentation,
    /// Strings and characters as their text, for `str` and `println`.
    Directly,
}

pub fn pr_str(value: &Value, mode: PrintMode) -> String {
    Printer { value, mode }.to_string()
}

struct Printer<'a> {
    value: &'a Value,
    mode: PrintMode,
}

impl Printer<'_> {
    fn nested<'b>(&self, value: &'b Value) -> Printer<'b> {
        Printer {
            value,
            mode: self.mode,
        }
    }

    fn write_sequence(&self, f: &mut fmt::Formatter<'_>, open: &str, close: &str) -> fmt::Result {
        let elements = match self.value.collect_seq() {
            Ok(elements) => elements,
            Err(e) => {
                log::warn!("cannot print sequence: {}", e);
                return write!(f, "{}#<error: {}>{}", open, e, close);
            }
        };
        write!(
            f,
            "{}{}{}",
            open,
            elements.iter().map(|v| self.nested(v)).join(" "),
            close
        )
    }
}

impl fmt::Display for Printer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PrintMode::*;
        match (self.value, self.mode) {
            (Value::Nil, _) => write!(f, "nil"),
            (Value::Bool(b), _) => write!(f, "{}", b),
            (Value::Integer(i), _) => write!(f, "{}", i),
            (Value::String(s), ReadableRepresentation) => write!(f, "\"{}\"", s),
            (Value::String(s), Directly) => write!(f, "{}", chars::unescape(s)),
            (Value::Char(c), ReadableRepresentation) => match chars::name_of(*c) {
                Some(name) => write!(f, "\\{}", name),
                None => write!(f, "\\{}", c),
            },
            (Value::Char(c), Directly) => write!(f, "{}", c),
            (Value::Keyword(k), _) => write!(f, "{}", k),
            (Value::Symbol(s), _) => write!(f, "{}", s),
            (Value::Vector(_), _) => self.write_sequence(f, "[", "]"),
            (Value::List(_), _) | (Value::Cons(_), _) | (Value::Lazy(_), _) => {
                self.write_sequence(f, "(", ")")
            }
            (Value::Map(map), _) => write!(
                f,
                "{{{}}}",
                map.iter()
                    .map(|(k, v)| format!("{} {}", self.nested(k), self.nested(v)))
                    .join(", ")
            ),
            (Value::Callable(c), _) => write!(f, "#<{}>", c.name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printer = Printer {
            value: self,
            mode: PrintMode::ReadableRepresentation,
        };
        write!(f, "{}", printer)
    }
}
