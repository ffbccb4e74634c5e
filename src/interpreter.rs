use crate::environment::{Environment, Settings};
use crate::reader::Reader;
use crate::types::{Location, Value};
use crate::{evaluator, printer, reader};
use std::fmt;
use std::rc::Rc;

pub type Result<T = Value> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Read(reader::Error),
    Eval(evaluator::Error),
}

impl Error {
    pub fn location(&self) -> Location {
        match self {
            Error::Read(e) => e.location,
            Error::Eval(e) => e.location,
        }
    }

    /// The displayable stand-in the front end shows instead of a result.
    pub fn into_nop(self) -> Value {
        Value::nop(self.to_string(), self.location())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Read(e) => write!(f, "read error: {}", e),
            Error::Eval(e) => write!(f, "{}", e),
        }
    }
}

impl From<reader::Error> for Error {
    fn from(e: reader::Error) -> Self {
        Self::Read(e)
    }
}

impl From<evaluator::Error> for Error {
    fn from(e: evaluator::Error) -> Self {
        Self::Eval(e)
    }
}

pub fn read(text: &str) -> Result {
    reader::read_str(text).map_err(Error::Read)
}

pub fn stringify(value: &Value) -> String {
    printer::pr_str(value)
}

/// One interactive session: a root environment that persists between
/// calls, so `def!` in one line is visible in the next.
pub struct Session {
    env: Rc<Environment>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            env: Environment::root(settings),
        }
    }

    pub fn env(&self) -> &Rc<Environment> {
        &self.env
    }

    pub fn evaluate(&self, value: &Value) -> Result {
        evaluator::EVAL(value, &self.env).map_err(Error::Eval)
    }

    /// Reads the first datum of `line` and evaluates it. Faults come back as
    /// a `Nop` carrying their message.
    pub fn rep(&self, line: &str) -> Value {
        read(line)
            .and_then(|ast| self.evaluate(&ast))
            .unwrap_or_else(Error::into_nop)
    }

    /// Evaluates every datum in `source` in order, stopping at the first
    /// fault. Yields the last result, or an empty `Nop` if there was nothing
    /// to evaluate.
    pub fn run(&self, source: &str) -> Result {
        let mut last = Value::nop("", Location::start());
        for datum in Reader::new(source) {
            last = self.evaluate(&datum?)?;
        }
        Ok(last)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
