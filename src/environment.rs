use crate::core::CORE;
use crate::evaluator::{Error, ErrorKind, Result};
use crate::types::{Location, Symbol, TypeMismatch, Value};
use itertools::Itertools;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Knobs that change how a session evaluates. Every frame carries a copy of
/// its root's settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    /// Reject calls that pass a closure more arguments than it declares.
    pub strict_closure_arity: bool,
}

pub struct Environment {
    frame: RefCell<HashMap<Symbol, Value>>,
    parent: Option<Rc<Environment>>,
    settings: Settings,
}

impl Environment {
    /// A root frame holding every primitive from the core library.
    pub fn root(settings: Settings) -> Rc<Self> {
        let env = Self {
            frame: RefCell::new(HashMap::new()),
            parent: None,
            settings,
        };
        for (&name, func) in CORE.iter() {
            env.insert(
                Symbol::from(name),
                Value::function(Rc::new(func.clone()), Location::builtin()),
            );
        }
        Rc::new(env)
    }

    pub fn spawn_from(parent: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            frame: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
            settings: parent.settings,
        })
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Binds `key` in this frame, shadowing any binding further up.
    pub fn insert(&self, key: Symbol, value: Value) -> Option<Value> {
        self.frame.borrow_mut().insert(key, value)
    }

    pub fn set(&self, symbol: &Value, data: Value) -> Result<()> {
        let key = symbol.as_symbol().ok_or_else(|| {
            Error::new(
                TypeMismatch {
                    operator: "set",
                    expected: "symbol",
                    got: symbol.tag(),
                },
                symbol.location,
            )
        })?;
        self.insert(key.clone(), data);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<Value> {
        match self.frame.borrow().get(name) {
            Some(value) => Some(value.clone()),
            None => self.parent.as_ref().and_then(|parent| parent.find(name)),
        }
    }

    /// Looks `symbol` up through the chain. The result is stamped with the
    /// symbol's own location rather than wherever the value was defined.
    pub fn get(&self, symbol: &Value) -> Result {
        let key = symbol.as_symbol().ok_or_else(|| {
            Error::new(
                TypeMismatch {
                    operator: "get",
                    expected: "symbol",
                    got: symbol.tag(),
                },
                symbol.location,
            )
        })?;
        self.find(key)
            .map(|value| value.at(symbol.location))
            .ok_or_else(|| Error::new(ErrorKind::UndefinedSymbol(key.clone()), symbol.location))
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.frame.borrow();
        write!(
            f,
            "Environment{{{}}}",
            frame.keys().map(|k| k.as_str()).sorted().join(" ")
        )?;
        if let Some(parent) = &self.parent {
            write!(f, " -> {:?}", parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueKind;
    use pretty_assertions::assert_eq;

    fn sym(name: &str) -> Value {
        Value::symbol(name, Location::new(4, 2))
    }

    #[test]
    fn root_holds_builtins() {
        let env = Environment::root(Settings::default());
        for name in &["+", "-", "*", "/", "list", "if", "fn*", "="] {
            let value = env.get(&sym(name)).unwrap();
            assert!(matches!(value.kind, ValueKind::Function(_)), "{}", name);
        }
    }

    #[test]
    fn lookup_restamps_location() {
        let env = Environment::root(Settings::default());
        env.set(&sym("x"), Value::number(5.0, Location::new(1, 9)))
            .unwrap();
        let found = env.get(&Value::symbol("x", Location::new(3, 3))).unwrap();
        assert_eq!(found.location, Location::new(3, 3));
        assert_eq!(found.as_number(), Some(5.0));
        assert_eq!(env.find("x").unwrap().location, Location::new(1, 9));
    }

    #[test]
    fn children_shadow_without_touching_parents() {
        let root = Environment::root(Settings::default());
        root.set(&sym("x"), Value::number(1.0, Location::start()))
            .unwrap();
        let child = Environment::spawn_from(&root);
        child
            .set(&sym("x"), Value::number(2.0, Location::start()))
            .unwrap();
        child
            .set(&sym("y"), Value::number(3.0, Location::start()))
            .unwrap();
        assert_eq!(child.get(&sym("x")).unwrap().as_number(), Some(2.0));
        assert_eq!(root.get(&sym("x")).unwrap().as_number(), Some(1.0));
        assert!(root.find("y").is_none());
    }

    #[test]
    fn undefined_symbol_names_the_use_site() {
        let env = Environment::root(Settings::default());
        let err = env.get(&sym("nope")).unwrap_err();
        assert_eq!(err.location, Location::new(4, 2));
        assert_eq!(err.to_string(), "'nope' not found at 4:2");
    }

    #[test]
    fn set_requires_a_symbol() {
        let env = Environment::root(Settings::default());
        let err = env
            .set(&Value::number(1.0, Location::start()), Value::nil(Location::start()))
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)));
    }

    #[test]
    fn settings_are_inherited() {
        let settings = Settings {
            strict_closure_arity: true,
        };
        let root = Environment::root(settings);
        let grandchild = Environment::spawn_from(&Environment::spawn_from(&root));
        assert_eq!(grandchild.settings(), settings);
    }
}
