use crate::environment::Environment;
use crate::special_forms::{self, DefError, FnError, LetError};
use crate::types::{
    BadArgCount, Callable, Closure, Location, Operands, PrimitiveFn, Symbol, Tag, TypeMismatch,
    Value, ValueKind,
};
use itertools::Itertools;
use std::fmt;
use std::rc::Rc;

pub type Result<T = Value> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum ErrorKind {
    UndefinedSymbol(Symbol),
    NotAFunction(Tag),
    NopOperand,
    Def(DefError),
    Let(LetError),
    Fn(FnError),
    TypeMismatch(TypeMismatch),
    BadArgCount(BadArgCount),
    DivideByZero,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub location: Location,
}

impl Error {
    pub fn new(kind: impl Into<ErrorKind>, location: Location) -> Self {
        Self {
            kind: kind.into(),
            location,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UndefinedSymbol(s) => write!(f, "'{}' not found", s),
            ErrorKind::NotAFunction(tag) => write!(f, "Expect function. Got {}", tag),
            ErrorKind::NopOperand => write!(f, "nothing cannot be used as an operand"),
            ErrorKind::Def(e) => write!(f, "def!: {}", e),
            ErrorKind::Let(e) => write!(f, "let*: {}", e),
            ErrorKind::Fn(e) => write!(f, "fn*: {}", e),
            ErrorKind::TypeMismatch(e) => write!(f, "{}", e),
            ErrorKind::BadArgCount(e) => write!(f, "{}", e),
            ErrorKind::DivideByZero => write!(f, "cannot divide by zero!"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.location)
    }
}

impl From<TypeMismatch> for ErrorKind {
    fn from(t: TypeMismatch) -> Self {
        Self::TypeMismatch(t)
    }
}

impl From<BadArgCount> for ErrorKind {
    fn from(e: BadArgCount) -> Self {
        Self::BadArgCount(e)
    }
}

impl From<DefError> for ErrorKind {
    fn from(e: DefError) -> Self {
        Self::Def(e)
    }
}

impl From<LetError> for ErrorKind {
    fn from(e: LetError) -> Self {
        Self::Let(e)
    }
}

impl From<FnError> for ErrorKind {
    fn from(e: FnError) -> Self {
        Self::Fn(e)
    }
}

#[allow(non_snake_case)]
pub fn EVAL(ast: &Value, env: &Rc<Environment>) -> Result {
    match &ast.kind {
        ValueKind::List(list) if list.is_empty() => Ok(ast.clone()),
        ValueKind::List(list) => evaluate_list(ast, list, env),
        _ => evaluate_ast(ast, env),
    }
}

fn evaluate_list(ast: &Value, argv: &[Value], env: &Rc<Environment>) -> Result {
    log::trace!("apply {}", ast);
    let (head, operands) = match argv.split_first() {
        Some(split) => split,
        None => return Ok(ast.clone()),
    };
    if let ValueKind::Symbol(name) = &head.kind {
        match name.as_str() {
            "def!" => {
                let result = special_forms::apply_def(head, operands, env);
                if let Ok(value) = &result {
                    log::debug!("define {} as {}", operands[0], value);
                }
                return result;
            }
            "let*" => return special_forms::apply_let(head, operands, env),
            // Any other initial symbol is looked up and applied below
            _ => (),
        }
    }

    let head = EVAL(head, env)?;
    let callable = match &head.kind {
        ValueKind::Function(f) => f.clone(),
        _ => return Err(Error::new(ErrorKind::NotAFunction(head.tag()), head.location)),
    };
    let args = match callable.operands() {
        Operands::Evaluated => evaluate_sequence_elementwise(operands, env)?,
        Operands::Unevaluated => operands.to_vec(),
    };
    apply(&callable, env, &head, &args)
}

/// Calls `callable` with operands that are already in their final form.
pub fn apply(
    callable: &Rc<dyn Callable>,
    env: &Rc<Environment>,
    head: &Value,
    args: &[Value],
) -> Result {
    if let Some(nop) = args.iter().find(|arg| arg.is_nop()) {
        return Err(Error::new(ErrorKind::NopOperand, nop.location));
    }
    callable.call(env, head, args)
}

pub fn evaluate_ast(ast: &Value, env: &Rc<Environment>) -> Result {
    log::trace!("evaluate_ast {:?}", ast);
    match &ast.kind {
        ValueKind::Symbol(_) => env.get(ast),
        ValueKind::List(list) => evaluate_sequence_elementwise(list, env)
            .map(|elements| Value::list(elements, ast.location)),
        ValueKind::Vector(vec) => evaluate_sequence_elementwise(vec, env)
            .map(|elements| Value::vector(elements, ast.location)),
        ValueKind::Map(entries) => {
            let mut evaluated = Vec::with_capacity(entries.len());
            for (key, old_value) in entries.iter() {
                evaluated.push((key.clone(), EVAL(old_value, env)?));
            }
            Ok(Value::map(evaluated, ast.location))
        }
        ValueKind::Number(_)
        | ValueKind::Keyword(_)
        | ValueKind::String(_)
        | ValueKind::Bool(_)
        | ValueKind::Nil
        | ValueKind::Function(_)
        | ValueKind::Nop(_) => Ok(ast.clone()),
    }
}

pub fn evaluate_sequence_elementwise(seq: &[Value], env: &Rc<Environment>) -> Result<Vec<Value>> {
    seq.iter().map(|obj| EVAL(obj, env)).collect()
}

pub(crate) fn pretty_print_args(args: &[Value]) -> String {
    match args.len() {
        0 => "no args".into(),
        1 => args[0].to_string(),
        _ => format!("\n\t{}", args.iter().join("\n\t")),
    }
}

pub fn call_primitive(
    func: &PrimitiveFn,
    env: &Rc<Environment>,
    head: &Value,
    args: &[Value],
) -> Result {
    func.arity
        .validate_for(args.len(), func.name)
        .map_err(|e| Error::new(e, head.location))?;
    log::trace!("Call {} with {}", func.name, pretty_print_args(args));
    let result = (func.fn_ptr)(env, head, args);
    match &result {
        Ok(val) => log::trace!("Call to {} resulted in {}", func.name, val),
        Err(e) => log::trace!("Call to {} failed: {}", func.name, e),
    }
    result
}

/// Binds the arguments in a fresh child of the environment the closure was
/// created in, then evaluates the body there.
pub fn call_closure(func: &Closure, head: &Value, args: &[Value]) -> Result {
    log::trace!(
        "Call closure ({}) with {}",
        func.parameters,
        pretty_print_args(args)
    );
    let strict = func.parent.settings().strict_closure_arity;
    func.parameters
        .arity(strict)
        .validate_for(args.len(), "closure")
        .map_err(|e| Error::new(e, head.location))?;
    let env = Environment::spawn_from(&func.parent);

    let (positional, rest) = args.split_at(func.parameters.positional.len());
    for (key, value) in func.parameters.positional.iter().zip(positional) {
        env.insert(key.clone(), value.clone());
    }
    if let Some(rest_key) = &func.parameters.others {
        env.insert(rest_key.clone(), Value::list(rest.to_vec(), head.location));
    }
    EVAL(&func.body, &env)
}
