extern crate derive_more;
use crate::environment::Environment;
use crate::evaluator;
use derive_more::{Deref, Display};
use itertools::Itertools;
use std::borrow::Borrow;
use std::fmt;
use std::fmt::Formatter;
use std::ops::{RangeFrom, RangeInclusive};
use std::rc::Rc;

/// Row and column of the first character of a datum. Rows and columns both
/// count from 1.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[display(fmt = "{}:{}", row, column)]
pub struct Location {
    pub row: usize,
    pub column: usize,
}

impl Location {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    pub const fn start() -> Self {
        Self::new(1, 1)
    }

    /// Stamped on values that were never read from source, i.e. the
    /// primitives seeded into the root environment.
    pub const fn builtin() -> Self {
        Self::new(0, 0)
    }
}

#[derive(Deref, Debug, PartialEq)]
pub struct Sequence(pub Vec<Value>);

#[derive(Deref, Debug, PartialEq)]
pub struct MapEntries(pub Vec<(Value, Value)>);

#[derive(Deref, Display, Debug, PartialEq, Eq, Hash, Clone)]
pub struct Symbol(pub String);

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol(name.into())
    }
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    #[display(fmt = "list")]
    List,
    #[display(fmt = "vector")]
    Vector,
    #[display(fmt = "hash-map")]
    Map,
    #[display(fmt = "number")]
    Number,
    #[display(fmt = "symbol")]
    Symbol,
    #[display(fmt = "keyword")]
    Keyword,
    #[display(fmt = "string")]
    String,
    #[display(fmt = "bool")]
    Bool,
    #[display(fmt = "nil")]
    Nil,
    #[display(fmt = "function")]
    Function,
    #[display(fmt = "nop")]
    Nop,
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    List(Rc<Sequence>),
    Vector(Rc<Sequence>),
    Map(Rc<MapEntries>),
    Number(f64),
    Symbol(Symbol),
    Keyword(String),
    String(String),
    Bool(bool),
    Nil,
    Function(Rc<dyn Callable>),
    Nop(String),
}

impl PartialEq for ValueKind {
    fn eq(&self, other: &Self) -> bool {
        use ValueKind::*;
        match (self, other) {
            (List(x), List(y)) => x == y,
            (Vector(x), Vector(y)) => x == y,
            (Map(x), Map(y)) => x == y,
            (Number(x), Number(y)) => x == y,
            (Symbol(x), Symbol(y)) => x == y,
            (Keyword(x), Keyword(y)) => x == y,
            (String(x), String(y)) => x == y,
            (Bool(x), Bool(y)) => x == y,
            (Nil, Nil) => true,
            (Function(x), Function(y)) => Rc::ptr_eq(x, y),
            (Nop(x), Nop(y)) => x == y,
            (_, _) => false,
        }
    }
}

/// A datum together with where it came from. Equality only looks at the
/// kind: two values read at different places are still equal.
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub location: Location,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Value {
    pub fn new(kind: ValueKind, location: Location) -> Self {
        Self { kind, location }
    }

    pub fn list(elements: Vec<Value>, location: Location) -> Self {
        Self::new(ValueKind::List(Rc::new(Sequence(elements))), location)
    }

    pub fn vector(elements: Vec<Value>, location: Location) -> Self {
        Self::new(ValueKind::Vector(Rc::new(Sequence(elements))), location)
    }

    pub fn map(entries: Vec<(Value, Value)>, location: Location) -> Self {
        Self::new(ValueKind::Map(Rc::new(MapEntries(entries))), location)
    }

    pub fn number(value: f64, location: Location) -> Self {
        Self::new(ValueKind::Number(value), location)
    }

    pub fn symbol(name: &str, location: Location) -> Self {
        Self::new(ValueKind::Symbol(Symbol::from(name)), location)
    }

    pub fn keyword(name: &str, location: Location) -> Self {
        Self::new(ValueKind::Keyword(name.into()), location)
    }

    pub fn string(text: impl Into<String>, location: Location) -> Self {
        Self::new(ValueKind::String(text.into()), location)
    }

    pub fn bool(value: bool, location: Location) -> Self {
        Self::new(ValueKind::Bool(value), location)
    }

    pub fn nil(location: Location) -> Self {
        Self::new(ValueKind::Nil, location)
    }

    pub fn function(callable: Rc<dyn Callable>, location: Location) -> Self {
        Self::new(ValueKind::Function(callable), location)
    }

    pub fn nop(message: impl Into<String>, location: Location) -> Self {
        Self::new(ValueKind::Nop(message.into()), location)
    }

    /// Same kind and payload, restamped with `location`.
    pub fn at(&self, location: Location) -> Self {
        Self::new(self.kind.clone(), location)
    }

    pub fn tag(&self) -> Tag {
        match &self.kind {
            ValueKind::List(_) => Tag::List,
            ValueKind::Vector(_) => Tag::Vector,
            ValueKind::Map(_) => Tag::Map,
            ValueKind::Number(_) => Tag::Number,
            ValueKind::Symbol(_) => Tag::Symbol,
            ValueKind::Keyword(_) => Tag::Keyword,
            ValueKind::String(_) => Tag::String,
            ValueKind::Bool(_) => Tag::Bool,
            ValueKind::Nil => Tag::Nil,
            ValueKind::Function(_) => Tag::Function,
            ValueKind::Nop(_) => Tag::Nop,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Number(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match &self.kind {
            ValueKind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::List(x) | ValueKind::Vector(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<dyn Callable>> {
        match &self.kind {
            ValueKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.kind, ValueKind::Nil)
    }

    pub fn is_nop(&self) -> bool {
        matches!(self.kind, ValueKind::Nop(_))
    }

    /// Everything except `nil` and `false`, so `0` and `()` are both true.
    pub fn truthy(&self) -> bool {
        use ValueKind::*;
        match self.kind {
            List(_) | Vector(_) | Map(_) | Number(_) | Symbol(_) | Keyword(_) | String(_)
            | Function(_) | Nop(_) => true,
            Bool(t) => t,
            Nil => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Arity {
    Between(RangeInclusive<usize>),
    AtLeast(RangeFrom<usize>),
}

#[derive(Debug)]
pub struct BadArgCount {
    name: &'static str,
    expected: Arity,
    got: usize,
}

impl fmt::Display for BadArgCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {} arguments, got {}",
            self.name, self.expected, self.got
        )
    }
}

impl Arity {
    pub(crate) const fn exactly(n: usize) -> Self {
        Self::Between(n..=n)
    }

    pub(crate) const fn at_least(n: usize) -> Self {
        Self::AtLeast(n..)
    }

    pub(crate) fn contains(&self, n: usize) -> bool {
        match self {
            Self::Between(range) => range.contains(&n),
            Self::AtLeast(range) => range.contains(&n),
        }
    }

    pub(crate) fn validate_for(&self, n: usize, name: &'static str) -> Result<(), BadArgCount> {
        match self.contains(n) {
            true => Ok(()),
            false => Err(BadArgCount {
                name,
                expected: self.clone(),
                got: n,
            }),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Between(r) => {
                if r.start() == r.end() {
                    write!(f, "exactly {}", r.start())
                } else {
                    write!(f, "from {} to {}", r.start(), r.end())
                }
            }
            Arity::AtLeast(r) => write!(f, "at least {}", r.start),
        }
    }
}

#[derive(Debug)]
pub struct TypeMismatch {
    pub operator: &'static str,
    pub expected: &'static str,
    pub got: Tag,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.operator, self.expected, self.got
        )
    }
}

/// Whether the evaluator hands a callable its operands as written or
/// evaluates them first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    Evaluated,
    Unevaluated,
}

/// Anything that can sit at the head of an application. `head` is the
/// evaluated head of the form; its location is the one to blame in errors.
pub trait Callable: fmt::Debug {
    fn name(&self) -> &str;

    fn operands(&self) -> Operands {
        Operands::Evaluated
    }

    fn call(&self, env: &Rc<Environment>, head: &Value, args: &[Value]) -> evaluator::Result;
}

pub type PrimitiveFnPtr = fn(&Rc<Environment>, &Value, &[Value]) -> evaluator::Result;

#[derive(Clone)]
pub struct PrimitiveFn {
    pub name: &'static str,
    pub arity: Arity,
    pub operands: Operands,
    pub fn_ptr: PrimitiveFnPtr,
}

impl fmt::Debug for PrimitiveFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "primitive function #<{}>", self.name)
    }
}

impl Callable for PrimitiveFn {
    fn name(&self) -> &str {
        self.name
    }

    fn operands(&self) -> Operands {
        self.operands
    }

    fn call(&self, env: &Rc<Environment>, head: &Value, args: &[Value]) -> evaluator::Result {
        evaluator::call_primitive(self, env, head, args)
    }
}

#[derive(Clone, Debug)]
pub struct ClosureParameters {
    pub positional: Vec<Symbol>,
    pub others: Option<Symbol>,
}

impl fmt::Display for ClosureParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.positional.iter().join(" "))?;
        if let Some(rest) = &self.others {
            write!(f, " & {}", rest)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum BadClosureParameters {
    TooManyAmpersands(usize),
    AmpersandPositionNotPenultimate,
}

impl fmt::Display for BadClosureParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BadClosureParameters::TooManyAmpersands(n) => {
                write!(f, "expected at most one '&', found {}", n)
            }
            BadClosureParameters::AmpersandPositionNotPenultimate => {
                write!(f, "'&' must be followed by exactly one parameter")
            }
        }
    }
}

impl ClosureParameters {
    pub fn new(mut symbols: Vec<Symbol>) -> Result<Self, BadClosureParameters> {
        let is_ampersand = |s: &Symbol| s.as_str() == "&";
        let ampersand_count = symbols.iter().filter(|s| is_ampersand(s)).count();

        match ampersand_count {
            0 => Ok(ClosureParameters {
                positional: symbols,
                others: None,
            }),
            1 => {
                let penultimate = matches!(
                    symbols.as_slice(),
                    [.., penultimate, _] if is_ampersand(penultimate)
                );
                if !penultimate {
                    return Err(BadClosureParameters::AmpersandPositionNotPenultimate);
                }
                let others = symbols.pop();
                let _ampersand = symbols.pop();
                Ok(ClosureParameters {
                    positional: symbols,
                    others,
                })
            }
            _ => Err(BadClosureParameters::TooManyAmpersands(ampersand_count)),
        }
    }

    /// A closure without `& rest` accepts extra arguments unless `strict`.
    pub fn arity(&self, strict: bool) -> Arity {
        match (&self.others, strict) {
            (None, true) => Arity::exactly(self.positional.len()),
            _ => Arity::at_least(self.positional.len()),
        }
    }
}

pub struct Closure {
    pub parameters: ClosureParameters,
    pub body: Value,
    pub parent: Rc<Environment>,
}

impl fmt::Debug for Closure {
    // Not derived because we want to skip the parent: the parent may well contain this Closure!
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Closure{{parameters: {:?}, body: {:?}}}",
            self.parameters, self.body
        )
    }
}

impl Callable for Closure {
    fn name(&self) -> &str {
        "closure"
    }

    fn call(&self, _env: &Rc<Environment>, head: &Value, args: &[Value]) -> evaluator::Result {
        evaluator::call_closure(self, head, args)
    }
}
