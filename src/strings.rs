// String literals know the escapes \n, \" and \\, which are also re-applied
// when printing, plus \' which is accepted on input but never printed.

use bimap::BiMap;
use std::str::Chars;

lazy_static! {
    static ref ESCAPES: BiMap<char, char> = {
        let mut m = BiMap::new();
        m.insert('\\', '\\');
        m.insert('"', '"');
        m.insert('n', '\n');
        m
    };
}

const READ_ONLY_ESCAPES: &[(char, char)] = &[('\'', '\'')];

/// The character that `\c` stands for inside a string literal, if any.
pub(crate) fn unescape(c: char) -> Option<char> {
    ESCAPES.get_by_left(&c).copied().or_else(|| {
        READ_ONLY_ESCAPES
            .iter()
            .find(|&&(escape, _)| escape == c)
            .map(|&(_, decoded)| decoded)
    })
}

struct StringPrinter<'a> {
    chars: Chars<'a>,
}

impl<'a> StringPrinter<'a> {
    fn new(src: &'a str) -> Self {
        Self { chars: src.chars() }
    }
}

impl Iterator for StringPrinter<'_> {
    type Item = (char, Option<char>);

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.chars.next()?;
        let charseq = match ESCAPES.get_by_right(&next) {
            Some(&l) => ('\\', Some(l)),
            None => (next, None),
        };
        Some(charseq)
    }
}

pub(crate) fn string_repr(src: &str) -> String {
    let mut output = String::new();
    output.push('"');
    for (char1, char2) in StringPrinter::new(src) {
        output.push(char1);
        if let Some(char2) = char2 {
            output.push(char2)
        };
    }
    output.push('"');
    output
}
