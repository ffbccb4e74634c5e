use crate::strings;
use crate::types::{Location, Value};
use itertools::Itertools;
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    List,
    Vector,
    Map,
    String,
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Delimiter::List => "list",
            Delimiter::Vector => "vector",
            Delimiter::Map => "hash-map",
            Delimiter::String => "string",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Unterminated(Delimiter),
    UnknownEscape(char),
    MissingMapValue,
    MissingMacroTarget(&'static str),
    UnexpectedDelimiter(char),
    InvalidNumber(String),
}

#[derive(Debug, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub location: Location,
}

impl Error {
    fn new(kind: ErrorKind, location: Location) -> Self {
        Self { kind, location }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Unterminated(d) => write!(f, "unterminated {}", d),
            ErrorKind::UnknownEscape(c) => write!(f, "cannot parse \\{}", c),
            ErrorKind::MissingMapValue => write!(f, "hash-map key has no value"),
            ErrorKind::MissingMacroTarget(name) => write!(f, "{} has no form to apply to", name),
            ErrorKind::UnexpectedDelimiter(c) => write!(f, "unexpected '{}'", c),
            ErrorKind::InvalidNumber(s) => write!(f, "invalid number literal {}", s),
        }?;
        write!(f, " at {}", self.location)
    }
}

pub type Result<T = Value> = std::result::Result<T, Error>;

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"^-?[0-9]+(\.[0-9]+)?").unwrap();
}

fn is_whitespace(c: char) -> bool {
    c.is_whitespace() || c == ','
}

fn is_symbol_char(c: char) -> bool {
    !(c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | ',' | '"' | ';'))
}

/// Reads one datum at a time from `src`. `location` always points at the
/// next unread character.
pub struct Reader<'a> {
    src: &'a str,
    position: usize,
    location: Location,
    finished: bool,
}

impl<'a> Reader<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            position: 0,
            location: Location::start(),
            finished: false,
        }
    }

    /// The next datum, or a `Nop` with an empty message at end of input.
    pub fn next_node(&mut self) -> Result {
        self.skip_insignificant();
        let location = self.location;
        let node = match self.peek() {
            None => Ok(Value::nop("", location)),
            Some(c) => self.read_form(c, location),
        };
        if let Ok(value) = &node {
            log::trace!("read {} at {}", value, location);
        }
        node
    }

    fn peek(&self) -> Option<char> {
        self.src[self.position..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.src[self.position..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.location.row += 1;
            self.location.column = 1;
        } else {
            self.location.column += 1;
        }
        Some(c)
    }

    fn skip_insignificant(&mut self) {
        loop {
            match self.peek() {
                Some(c) if is_whitespace(c) => {
                    self.bump();
                }
                Some(';') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_form(&mut self, first: char, location: Location) -> Result {
        match first {
            '(' => self
                .read_sequence(')', Delimiter::List, location)
                .map(|elements| Value::list(elements, location)),
            '[' => self
                .read_sequence(']', Delimiter::Vector, location)
                .map(|elements| Value::vector(elements, location)),
            '{' => {
                self.bump();
                self.read_map_body(location)
            }
            ')' | ']' | '}' => {
                self.bump();
                Err(Error::new(ErrorKind::UnexpectedDelimiter(first), location))
            }
            '"' => self.read_string(location),
            '\'' => {
                self.bump();
                self.read_macro("quote", location)
            }
            '`' => {
                self.bump();
                self.read_macro("quasiquote", location)
            }
            '~' => {
                self.bump();
                if self.peek() == Some('@') {
                    self.bump();
                    self.read_macro("splice-unquote", location)
                } else {
                    self.read_macro("unquote", location)
                }
            }
            '@' => {
                self.bump();
                self.read_macro("deref", location)
            }
            '^' if self.peek_second() == Some('{') => self.read_metadata(location),
            ':' => {
                self.bump();
                let name = self.take_symbol_chars();
                Ok(Value::keyword(name, location))
            }
            c if c.is_ascii_digit() => self.read_number(location),
            '-' if self.peek_second().map_or(false, |c| c.is_ascii_digit()) => {
                self.read_number(location)
            }
            _ => Ok(self.read_symbol(location)),
        }
    }

    /// The form a reader macro applies to. Unlike `next_node`, running out of
    /// input here is an error.
    fn read_target(&mut self, name: &'static str, location: Location) -> Result {
        self.skip_insignificant();
        let target_location = self.location;
        match self.peek() {
            None => Err(Error::new(ErrorKind::MissingMacroTarget(name), location)),
            Some(c) => self.read_form(c, target_location),
        }
    }

    fn read_macro(&mut self, name: &'static str, location: Location) -> Result {
        let target = self.read_target(name, location)?;
        Ok(Value::list(
            vec![Value::symbol(name, location), target],
            location,
        ))
    }

    fn read_metadata(&mut self, location: Location) -> Result {
        self.bump();
        let map_location = self.location;
        self.bump();
        let meta = self.read_map_body(map_location)?;
        let target = self.read_target("with-meta", location)?;
        Ok(Value::list(
            vec![Value::symbol("with-meta", location), target, meta],
            location,
        ))
    }

    fn read_sequence(
        &mut self,
        close: char,
        delimiter: Delimiter,
        location: Location,
    ) -> Result<Vec<Value>> {
        self.bump();
        self.read_elements(close, delimiter, location)
    }

    fn read_elements(
        &mut self,
        close: char,
        delimiter: Delimiter,
        location: Location,
    ) -> Result<Vec<Value>> {
        let mut elements = Vec::new();
        loop {
            self.skip_insignificant();
            let element_location = self.location;
            match self.peek() {
                None => return Err(Error::new(ErrorKind::Unterminated(delimiter), location)),
                Some(c) if c == close => {
                    self.bump();
                    return Ok(elements);
                }
                Some(c) => elements.push(self.read_form(c, element_location)?),
            }
        }
    }

    fn read_map_body(&mut self, location: Location) -> Result {
        let elements = self.read_elements('}', Delimiter::Map, location)?;
        if elements.len() % 2 == 1 {
            let key_location = elements.last().map_or(location, |key| key.location);
            return Err(Error::new(ErrorKind::MissingMapValue, key_location));
        }
        let entries = elements.into_iter().tuples().collect();
        Ok(Value::map(entries, location))
    }

    fn read_string(&mut self, location: Location) -> Result {
        self.bump();
        let mut string = String::new();
        loop {
            let char_location = self.location;
            match self.bump() {
                None => return Err(Error::new(ErrorKind::Unterminated(Delimiter::String), location)),
                Some('"') => return Ok(Value::string(string, location)),
                Some('\\') => match self.bump() {
                    None => {
                        return Err(Error::new(
                            ErrorKind::Unterminated(Delimiter::String),
                            location,
                        ))
                    }
                    Some(c) => {
                        let decoded = strings::unescape(c).ok_or_else(|| {
                            Error::new(ErrorKind::UnknownEscape(c), char_location)
                        })?;
                        string.push(decoded);
                    }
                },
                Some(c) => string.push(c),
            }
        }
    }

    fn read_number(&mut self, location: Location) -> Result {
        let src = self.src;
        let literal = match NUMBER_RE.find(&src[self.position..]) {
            Some(m) => m.as_str(),
            None => return Ok(self.read_symbol(location)),
        };
        for _ in literal.chars() {
            self.bump();
        }
        literal
            .parse()
            .map(|n| Value::number(n, location))
            .map_err(|_| Error::new(ErrorKind::InvalidNumber(literal.into()), location))
    }

    fn take_symbol_chars(&mut self) -> &'a str {
        let src = self.src;
        let start = self.position;
        while let Some(c) = self.peek() {
            if !is_symbol_char(c) {
                break;
            }
            self.bump();
        }
        &src[start..self.position]
    }

    fn read_symbol(&mut self, location: Location) -> Value {
        match self.take_symbol_chars() {
            "true" => Value::bool(true, location),
            "false" => Value::bool(false, location),
            "nil" => Value::nil(location),
            name => Value::symbol(name, location),
        }
    }
}

impl Iterator for Reader<'_> {
    type Item = Result;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_node() {
            Ok(value) if value.is_nop() => {
                self.finished = true;
                None
            }
            Ok(value) => Some(Ok(value)),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

pub fn read_str(input: &str) -> Result {
    Reader::new(input).next_node()
}

pub fn read_all(input: &str) -> Result<Vec<Value>> {
    Reader::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueKind;
    use pretty_assertions::assert_eq;

    fn read_ok(input: &str) -> Value {
        match read_str(input) {
            Ok(value) => value,
            Err(e) => panic!("failed to read {:?}: {}", input, e),
        }
    }

    fn read_err(input: &str) -> Error {
        match read_str(input) {
            Ok(value) => panic!("expected {:?} to fail, got {}", input, value),
            Err(e) => e,
        }
    }

    #[test]
    fn atoms() {
        let loc = Location::start();
        assert_eq!(read_ok("42"), Value::number(42.0, loc));
        assert_eq!(read_ok("-7"), Value::number(-7.0, loc));
        assert_eq!(read_ok("2.5"), Value::number(2.5, loc));
        assert_eq!(read_ok("abc"), Value::symbol("abc", loc));
        assert_eq!(read_ok("-"), Value::symbol("-", loc));
        assert_eq!(read_ok("-x"), Value::symbol("-x", loc));
        assert_eq!(read_ok(":kw"), Value::keyword("kw", loc));
        assert_eq!(read_ok("true"), Value::bool(true, loc));
        assert_eq!(read_ok("false"), Value::bool(false, loc));
        assert_eq!(read_ok("nil"), Value::nil(loc));
        assert_eq!(read_ok("nilly"), Value::symbol("nilly", loc));
    }

    #[test]
    fn strings_decode_escapes() {
        let value = read_ok(r#""a\"b\\c\nd\'e""#);
        assert_eq!(value, Value::string("a\"b\\c\nd'e", Location::start()));
    }

    #[test]
    fn empty_input_is_nop() {
        assert!(read_ok("").is_nop());
        assert!(read_ok("   , \n ; just a comment").is_nop());
    }

    #[test]
    fn nested_structures() {
        let value = read_ok("(a [1 2] {:k \"v\"} ())");
        let elements = value.as_seq().unwrap();
        assert_eq!(elements.len(), 4);
        assert_eq!(elements[1].as_seq().unwrap().len(), 2);
        match &elements[2].kind {
            ValueKind::Map(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].0, Value::keyword("k", Location::start()));
            }
            _ => panic!("expected a hash-map, got {:?}", elements[2]),
        }
        assert_eq!(elements[3].as_seq().unwrap().len(), 0);
    }

    #[test]
    fn locations_track_rows_and_columns() {
        let value = read_ok("\n  (foo\n bar)");
        assert_eq!(value.location, Location::new(2, 3));
        let elements = value.as_seq().unwrap();
        assert_eq!(elements[0].location, Location::new(2, 4));
        assert_eq!(elements[1].location, Location::new(3, 2));
    }

    #[test]
    fn comments_and_commas_are_skipped() {
        let value = read_ok("(1, 2 ; two\n 3)");
        assert_eq!(value.as_seq().unwrap().len(), 3);
    }

    #[test]
    fn quote_is_sugar() {
        assert_eq!(read_ok("'x"), read_ok("(quote x)"));
        assert_eq!(read_ok("`(a ~b ~@c)"), read_ok("(quasiquote (a (unquote b) (splice-unquote c)))"));
        assert_eq!(read_ok("@a"), read_ok("(deref a)"));
    }

    #[test]
    fn metadata_rewrites_to_with_meta() {
        assert_eq!(read_ok("^{:a 1} [1 2]"), read_ok("(with-meta [1 2] {:a 1})"));
    }

    #[test]
    fn braces_end_symbols() {
        assert_eq!(read_ok("{:a b}"), read_ok("{:a b }"));
    }

    #[test]
    fn unterminated_forms() {
        assert_eq!(
            read_err("(1 2").kind,
            ErrorKind::Unterminated(Delimiter::List)
        );
        assert_eq!(read_err("(1 2").location, Location::new(1, 1));
        assert_eq!(
            read_err("[1 (2)").kind,
            ErrorKind::Unterminated(Delimiter::Vector)
        );
        assert_eq!(read_err("{:a 1").kind, ErrorKind::Unterminated(Delimiter::Map));
        assert_eq!(
            read_err("(\"abc").kind,
            ErrorKind::Unterminated(Delimiter::String)
        );
    }

    #[test]
    fn bad_escape() {
        let err = read_err(r#"  "a\tb""#);
        assert_eq!(err.kind, ErrorKind::UnknownEscape('t'));
        assert_eq!(err.location, Location::new(1, 5));
    }

    #[test]
    fn map_key_without_value() {
        let err = read_err("{:a 1 :b}");
        assert_eq!(err.kind, ErrorKind::MissingMapValue);
        assert_eq!(err.location, Location::new(1, 7));
    }

    #[test]
    fn macros_need_a_target() {
        assert_eq!(read_err("'").kind, ErrorKind::MissingMacroTarget("quote"));
        assert_eq!(
            read_err("^{:a 1}").kind,
            ErrorKind::MissingMacroTarget("with-meta")
        );
        assert_eq!(read_err("(')").kind, ErrorKind::UnexpectedDelimiter(')'));
    }

    #[test]
    fn stray_closer() {
        assert_eq!(read_err(")").kind, ErrorKind::UnexpectedDelimiter(')'));
    }

    #[test]
    fn reader_iterates_over_every_datum() {
        let values = read_all("(def! a 1) a ; trailing\n").unwrap();
        assert_eq!(values.len(), 2);
        assert!(read_all("1 (2").is_err());
        assert!(read_all("  ").unwrap().is_empty());
    }
}
