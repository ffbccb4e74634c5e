use crate::strings;
use crate::types::{Value, ValueKind};
use itertools::Itertools;
use std::fmt;

pub fn pr_str(object: &Value) -> String {
    match &object.kind {
        ValueKind::List(elements) => format!("({})", elements.iter().map(pr_str).join(" ")),
        ValueKind::Vector(elements) => format!("[{}]", elements.iter().map(pr_str).join(" ")),
        ValueKind::Map(entries) => format!(
            "{{{}}}",
            entries
                .iter()
                .map(|(key, value)| format!("{} {}", pr_str(key), pr_str(value)))
                .join(" ")
        ),
        ValueKind::Number(value) => value.to_string(),
        ValueKind::Symbol(name) => name.to_string(),
        ValueKind::Keyword(name) => format!(":{}", name),
        ValueKind::String(s) => strings::string_repr(s),
        ValueKind::Bool(b) => b.to_string(),
        ValueKind::Nil => String::from("nil"),
        ValueKind::Function(_) => String::from("(function)"),
        ValueKind::Nop(message) => message.clone(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", pr_str(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_str;
    use crate::types::Location;
    use pretty_assertions::assert_eq;

    fn round_trip(input: &str) -> String {
        pr_str(&read_str(input).unwrap())
    }

    #[test]
    fn atoms_round_trip() {
        for literal in &[
            "42", "-7", "2.5", "abc", ":kw", "\"s\"", r#""a\nb\"c\\""#, "true", "false", "nil",
        ] {
            assert_eq!(round_trip(literal), *literal);
        }
    }

    #[test]
    fn whitespace_is_canonicalized() {
        assert_eq!(round_trip("(  a ,b\n c )"), "(a b c)");
        assert_eq!(round_trip("[ 1 [2 ] ]"), "[1 [2]]");
        assert_eq!(round_trip("{ :a 1, :b 2 }"), "{:a 1 :b 2}");
        assert_eq!(round_trip("{}"), "{}");
    }

    #[test]
    fn reader_macros_print_expanded() {
        assert_eq!(round_trip("'(1 2)"), "(quote (1 2))");
        assert_eq!(round_trip("~@xs"), "(splice-unquote xs)");
    }

    #[test]
    fn single_quote_escape_prints_bare() {
        assert_eq!(round_trip(r#""it\'s""#), "\"it's\"");
    }

    #[test]
    fn nop_prints_its_message() {
        let nop = Value::nop("'x' not found at 1:1", Location::start());
        assert_eq!(nop.to_string(), "'x' not found at 1:1");
    }
}
