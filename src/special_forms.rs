use crate::environment::Environment;
use crate::evaluator::{Error, Result, EVAL};
use crate::types::{BadClosureParameters, Closure, ClosureParameters, Symbol, Tag, Value};
use itertools::Itertools;
use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
pub enum DefError {
    WrongArgCount(usize),
    KeyNotASymbol,
}

impl fmt::Display for DefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefError::WrongArgCount(n) => write!(f, "expected exactly 2 arguments, got {}", n),
            DefError::KeyNotASymbol => {
                write!(f, "First parameter of def! should be a symbol name")
            }
        }
    }
}

pub fn apply_def(head: &Value, args: &[Value], env: &Rc<Environment>) -> Result {
    let (key, value) = match args {
        [key, value] => (key, value),
        _ => return Err(Error::new(DefError::WrongArgCount(args.len()), head.location)),
    };
    let key = key
        .as_symbol()
        .ok_or_else(|| Error::new(DefError::KeyNotASymbol, key.location))?;
    let value = EVAL(value, env)?;
    env.insert(key.clone(), value.clone());
    Ok(value)
}

#[derive(Debug)]
pub enum LetError {
    WrongArgCount(usize),
    BindingsNotSequence(Tag),
    BindingsOddLength(usize),
    BindToNonSymbol(Tag),
}

impl fmt::Display for LetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LetError::WrongArgCount(n) => write!(f, "expected exactly 2 arguments, got {}", n),
            LetError::BindingsNotSequence(tag) => {
                write!(f, "bindings should be a list or vector, got {}", tag)
            }
            LetError::BindingsOddLength(n) => {
                write!(f, "bindings should come in pairs, got {} forms", n)
            }
            LetError::BindToNonSymbol(tag) => write!(f, "cannot bind to {}", tag),
        }
    }
}

pub fn apply_let(head: &Value, args: &[Value], env: &Rc<Environment>) -> Result {
    let (bindings, body) = match args {
        [bindings, body] => (bindings, body),
        _ => return Err(Error::new(LetError::WrongArgCount(args.len()), head.location)),
    };
    let pairs = bindings.as_seq().ok_or_else(|| {
        Error::new(LetError::BindingsNotSequence(bindings.tag()), bindings.location)
    })?;
    if pairs.len() % 2 == 1 {
        return Err(Error::new(
            LetError::BindingsOddLength(pairs.len()),
            bindings.location,
        ));
    }

    let child = Environment::spawn_from(env);
    for (key, value) in pairs.iter().tuples() {
        let key = key
            .as_symbol()
            .ok_or_else(|| Error::new(LetError::BindToNonSymbol(key.tag()), key.location))?;
        // Note: evaluate in the child so that later bindings can refer to earlier ones
        let value = EVAL(value, &child)?;
        child.insert(key.clone(), value);
    }
    EVAL(body, &child)
}

#[derive(Debug)]
pub enum FnError {
    ParametersNotGivenAsSequence(Tag),
    ParameterNotASymbol(Tag),
    BadVariadic(BadClosureParameters),
}

impl fmt::Display for FnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FnError::ParametersNotGivenAsSequence(tag) => {
                write!(f, "parameters should be a list, got {}", tag)
            }
            FnError::ParameterNotASymbol(tag) => {
                write!(f, "parameter names should be symbols, got {}", tag)
            }
            FnError::BadVariadic(e) => write!(f, "{}", e),
        }
    }
}

/// Builds a closure over `env`. Receives its operands unevaluated: a
/// parameter list and a body. Operands past the body are ignored.
pub fn apply_fn(env: &Rc<Environment>, head: &Value, args: &[Value]) -> Result {
    let (parameters, body) = (&args[0], &args[1]);
    let parameters = parameters.as_seq().ok_or_else(|| {
        Error::new(
            FnError::ParametersNotGivenAsSequence(parameters.tag()),
            parameters.location,
        )
    })?;
    let extract_symbol = |obj: &Value| match obj.as_symbol() {
        Some(s) => Ok(s.clone()),
        None => Err(Error::new(FnError::ParameterNotASymbol(obj.tag()), obj.location)),
    };
    let parameters: Vec<Symbol> = parameters.iter().map(extract_symbol).collect::<Result<_>>()?;

    let closure = Closure {
        parameters: ClosureParameters::new(parameters)
            .map_err(|e| Error::new(FnError::BadVariadic(e), head.location))?,
        body: body.clone(),
        parent: env.clone(),
    };
    Ok(Value::function(Rc::new(closure), head.location))
}
