// Named character literals and string escapes. The reader keeps string
// escapes exactly as written; they are only interpreted when a string is
// printed directly (`str`, `println`).

use bimap::BiMap;
use std::str::Chars;

lazy_static! {
    static ref CHAR_NAMES: BiMap<&'static str, char> = {
        let mut m = BiMap::new();
        m.insert("newline", '\n');
        m.insert("space", ' ');
        m.insert("tab", '\t');
        m.insert("formfeed", '\x0c');
        m.insert("backspace", '\x08');
        m.insert("return", '\r');
        m
    };
    static ref ESCAPES: BiMap<char, char> = {
        let mut m = BiMap::new();
        m.insert('\\', '\\');
        m.insert('"', '"');
        m.insert('n', '\n');
        m.insert('t', '\t');
        m.insert('r', '\r');
        m.insert('f', '\x0c');
        m.insert('b', '\x08');
        m
    };
}

/// Looks up a character by its literal name, e.g. `newline`.
pub(crate) fn by_name(name: &str) -> Option<char> {
    CHAR_NAMES.get_by_left(name).copied()
}

/// The literal name of a character, if it has one.
pub(crate) fn name_of(c: char) -> Option<&'static str> {
    CHAR_NAMES.get_by_right(&c).copied()
}

/// Names beginning with the given character; used by the reader to decide
/// whether `\n` is the letter `n` or the start of `\newline`.
pub(crate) fn names_starting_with(c: char) -> impl Iterator<Item = &'static str> {
    CHAR_NAMES
        .left_values()
        .copied()
        .filter(move |name| name.starts_with(c))
}

struct Unescaper<'a> {
    chars: Chars<'a>,
}

impl Iterator for Unescaper<'_> {
    type Item = (char, Option<char>);

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.chars.next()?;
        if next != '\\' {
            return Some((next, None));
        }
        let item = match self.chars.next() {
            None => ('\\', None),
            Some(c) => match ESCAPES.get_by_left(&c) {
                Some(&unescaped) => (unescaped, None),
                // Unknown escapes are left alone.
                None => ('\\', Some(c)),
            },
        };
        Some(item)
    }
}

/// Interprets the escape pairs of a raw string literal body.
pub(crate) fn unescape(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    for (first, second) in (Unescaper { chars: raw.chars() }) {
        output.push(first);
        if let Some(second) = second {
            output.push(second);
        }
    }
    output
}
