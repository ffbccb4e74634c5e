use crate::environment::Environment;
use crate::evaluator::{self, Error, ErrorKind};
use crate::types::{Arity, Operands, PrimitiveFn, TypeMismatch, Value, ValueKind};
use crate::{printer, special_forms};
use itertools::Itertools;
use std::collections::HashMap;
use std::rc::Rc;

fn grab_numbers(head: &Value, name: &'static str, args: &[Value]) -> evaluator::Result<Vec<f64>> {
    args.iter()
        .map(|arg| {
            arg.as_number().ok_or_else(|| {
                Error::new(
                    TypeMismatch {
                        operator: name,
                        expected: "number",
                        got: arg.tag(),
                    },
                    head.location,
                )
            })
        })
        .collect()
}

const SUM: PrimitiveFn = PrimitiveFn {
    name: "+",
    fn_ptr: sum_,
    arity: Arity::at_least(2),
    operands: Operands::Evaluated,
};

fn sum_(_env: &Rc<Environment>, head: &Value, args: &[Value]) -> evaluator::Result {
    let value = grab_numbers(head, "+", args)?.iter().sum();
    Ok(Value::number(value, head.location))
}

const SUB: PrimitiveFn = PrimitiveFn {
    name: "-",
    fn_ptr: sub_,
    arity: Arity::at_least(2),
    operands: Operands::Evaluated,
};

fn sub_(_env: &Rc<Environment>, head: &Value, args: &[Value]) -> evaluator::Result {
    match grab_numbers(head, "-", args)?.as_slice() {
        [seed, rest @ ..] => Ok(Value::number(
            rest.iter().fold(*seed, |acc, x| acc - x),
            head.location,
        )),
        [] => unreachable!(), // arity checked by PrimitiveFn
    }
}

const MUL: PrimitiveFn = PrimitiveFn {
    name: "*",
    fn_ptr: mul_,
    arity: Arity::at_least(2),
    operands: Operands::Evaluated,
};

fn mul_(_env: &Rc<Environment>, head: &Value, args: &[Value]) -> evaluator::Result {
    let value = grab_numbers(head, "*", args)?.iter().product();
    Ok(Value::number(value, head.location))
}

const DIV: PrimitiveFn = PrimitiveFn {
    name: "/",
    fn_ptr: div_,
    arity: Arity::at_least(2),
    operands: Operands::Evaluated,
};

fn div_(_env: &Rc<Environment>, head: &Value, args: &[Value]) -> evaluator::Result {
    match grab_numbers(head, "/", args)?.as_slice() {
        [_, rest @ ..] if rest.contains(&0.0) => {
            Err(Error::new(ErrorKind::DivideByZero, head.location))
        }
        [seed, rest @ ..] => Ok(Value::number(
            rest.iter().fold(*seed, |acc, x| acc / x),
            head.location,
        )),
        [] => unreachable!(), // arity checked by PrimitiveFn
    }
}

/// Holds when `comp` holds for every adjacent pair, so `(< 1 2 3)` is true.
fn comparison_(
    head: &Value,
    name: &'static str,
    args: &[Value],
    comp: fn(&f64, &f64) -> bool,
) -> evaluator::Result {
    let numbers = grab_numbers(head, name, args)?;
    let holds = numbers.iter().tuple_windows().all(|(x, y)| comp(x, y));
    Ok(Value::bool(holds, head.location))
}

// One const per operator; the comparison itself is the matching PartialOrd method.
macro_rules! comparison_primitive {
    ($SYMBOL:tt, $NAME:ident) => {
        paste::item! {
            const $NAME: PrimitiveFn = PrimitiveFn {
                name: stringify!($SYMBOL),
                fn_ptr: |_, head, args| comparison_(head, stringify!($SYMBOL), args, f64:: [<$NAME:lower>]),
                arity: Arity::at_least(2),
                operands: Operands::Evaluated,
            };
        }
    };
}

comparison_primitive!(<, LT);
comparison_primitive!(<=, LE);
comparison_primitive!(>, GT);
comparison_primitive!(>=, GE);

const EQUAL: PrimitiveFn = PrimitiveFn {
    name: "=",
    fn_ptr: equal_,
    arity: Arity::at_least(2),
    operands: Operands::Evaluated,
};

fn equal_(_env: &Rc<Environment>, head: &Value, args: &[Value]) -> evaluator::Result {
    let holds = args.iter().tuple_windows().all(|(x, y)| x == y);
    Ok(Value::bool(holds, head.location))
}

const LIST: PrimitiveFn = PrimitiveFn {
    name: "list",
    fn_ptr: |_, head, args| Ok(Value::list(args.to_vec(), head.location)),
    arity: Arity::at_least(0),
    operands: Operands::Evaluated,
};

const LIST_TEST: PrimitiveFn = PrimitiveFn {
    name: "list?",
    fn_ptr: |_, head, args| {
        let is_list = matches!(args[0].kind, ValueKind::List(_));
        Ok(Value::bool(is_list, head.location))
    },
    arity: Arity::at_least(1),
    operands: Operands::Evaluated,
};

const VECTOR: PrimitiveFn = PrimitiveFn {
    name: "vector",
    fn_ptr: |_, head, args| Ok(Value::vector(args.to_vec(), head.location)),
    arity: Arity::at_least(0),
    operands: Operands::Evaluated,
};

const VECTOR_TEST: PrimitiveFn = PrimitiveFn {
    name: "vector?",
    fn_ptr: |_, head, args| {
        let is_vector = matches!(args[0].kind, ValueKind::Vector(_));
        Ok(Value::bool(is_vector, head.location))
    },
    arity: Arity::exactly(1),
    operands: Operands::Evaluated,
};

const EMPTY_TEST: PrimitiveFn = PrimitiveFn {
    name: "empty?",
    fn_ptr: empty_test_,
    arity: Arity::at_least(1),
    operands: Operands::Evaluated,
};

fn empty_test_(_env: &Rc<Environment>, head: &Value, args: &[Value]) -> evaluator::Result {
    let empty = match &args[0].kind {
        ValueKind::List(xs) | ValueKind::Vector(xs) => xs.is_empty(),
        ValueKind::Map(entries) => entries.is_empty(),
        ValueKind::Nil => true,
        _ => {
            return Err(Error::new(
                TypeMismatch {
                    operator: "empty?",
                    expected: "list, vector, hash-map or nil",
                    got: args[0].tag(),
                },
                head.location,
            ))
        }
    };
    Ok(Value::bool(empty, head.location))
}

const COUNT: PrimitiveFn = PrimitiveFn {
    name: "count",
    fn_ptr: count_,
    arity: Arity::at_least(1),
    operands: Operands::Evaluated,
};

fn count_(_env: &Rc<Environment>, head: &Value, args: &[Value]) -> evaluator::Result {
    let count = args[0].as_seq().map_or(0, <[Value]>::len);
    Ok(Value::number(count as f64, head.location))
}

const IF: PrimitiveFn = PrimitiveFn {
    name: "if",
    fn_ptr: if_,
    arity: Arity::Between(2..=3),
    operands: Operands::Evaluated,
};

fn if_(_env: &Rc<Environment>, head: &Value, args: &[Value]) -> evaluator::Result {
    if args[0].truthy() {
        Ok(args[1].clone())
    } else {
        Ok(args
            .get(2)
            .cloned()
            .unwrap_or_else(|| Value::nil(head.location)))
    }
}

const DO: PrimitiveFn = PrimitiveFn {
    name: "do",
    fn_ptr: |_, _, args| Ok(args[args.len() - 1].clone()),
    arity: Arity::at_least(1),
    operands: Operands::Evaluated,
};

const NOT: PrimitiveFn = PrimitiveFn {
    name: "not",
    fn_ptr: |_, head, args| Ok(Value::bool(!args[0].truthy(), head.location)),
    arity: Arity::exactly(1),
    operands: Operands::Evaluated,
};

const FN: PrimitiveFn = PrimitiveFn {
    name: "fn*",
    fn_ptr: special_forms::apply_fn,
    arity: Arity::at_least(2),
    operands: Operands::Unevaluated,
};

const QUOTE: PrimitiveFn = PrimitiveFn {
    name: "quote",
    fn_ptr: |_, _, args| Ok(args[0].clone()),
    arity: Arity::exactly(1),
    operands: Operands::Unevaluated,
};

macro_rules! tag_test_primitive {
    ($SYMBOL:expr, $NAME:ident, $PATTERN:pat) => {
        const $NAME: PrimitiveFn = PrimitiveFn {
            name: $SYMBOL,
            fn_ptr: |_, head, args| {
                let matched = matches!(args[0].kind, $PATTERN);
                Ok(Value::bool(matched, head.location))
            },
            arity: Arity::exactly(1),
            operands: Operands::Evaluated,
        };
    };
}

tag_test_primitive!("nil?", NIL_TEST, ValueKind::Nil);
tag_test_primitive!("number?", NUMBER_TEST, ValueKind::Number(_));
tag_test_primitive!("string?", STRING_TEST, ValueKind::String(_));
tag_test_primitive!("symbol?", SYMBOL_TEST, ValueKind::Symbol(_));
tag_test_primitive!("keyword?", KEYWORD_TEST, ValueKind::Keyword(_));
tag_test_primitive!("fn?", FUNCTION_TEST, ValueKind::Function(_));

const PR_STR: PrimitiveFn = PrimitiveFn {
    name: "pr-str",
    fn_ptr: |_, head, args| {
        let text = args.iter().map(printer::pr_str).join(" ");
        Ok(Value::string(text, head.location))
    },
    arity: Arity::at_least(0),
    operands: Operands::Evaluated,
};

type Namespace = HashMap<&'static str, PrimitiveFn>;
lazy_static! {
    pub static ref CORE: Namespace = {
        let mut map = Namespace::new();
        for func in vec![
            // Arithmetic
            SUM,
            SUB,
            MUL,
            DIV,
            // Comparisons
            GT,
            GE,
            LT,
            LE,
            EQUAL,
            // Working with sequences
            LIST,
            LIST_TEST,
            VECTOR,
            VECTOR_TEST,
            EMPTY_TEST,
            COUNT,
            // Control
            IF,
            DO,
            NOT,
            FN,
            QUOTE,
            // Testing
            NIL_TEST,
            NUMBER_TEST,
            STRING_TEST,
            SYMBOL_TEST,
            KEYWORD_TEST,
            FUNCTION_TEST,
            // Printing
            PR_STR,
        ] {
            map.insert(func.name, func);
        }
        map
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Settings;
    use crate::evaluator::EVAL;
    use crate::reader::read_str;
    use crate::types::Tag;
    use pretty_assertions::assert_eq;

    fn eval_str(input: &str) -> evaluator::Result {
        let env = Environment::root(Settings::default());
        EVAL(&read_str(input).unwrap(), &env)
    }

    fn printed(input: &str) -> String {
        match eval_str(input) {
            Ok(value) => value.to_string(),
            Err(e) => panic!("{} failed: {}", input, e),
        }
    }

    #[test]
    fn arithmetic_folds_left() {
        assert_eq!(printed("(+ 1 2 3)"), "6");
        assert_eq!(printed("(- 10 1 2)"), "7");
        assert_eq!(printed("(* 2 3 4)"), "24");
        assert_eq!(printed("(/ 20 2 5)"), "2");
        assert_eq!(printed("(/ 1 4)"), "0.25");
        assert_eq!(printed("(- 1.5 2)"), "-0.5");
    }

    #[test]
    fn arithmetic_needs_two_numbers() {
        let err = eval_str("(+ 1)").unwrap_err();
        assert_eq!(err.to_string(), "+: expected at least 2 arguments, got 1 at 1:2");
        let err = eval_str("(* 1 \"two\")").unwrap_err();
        assert_eq!(err.to_string(), "*: expected number, got string at 1:2");
    }

    #[test]
    fn division_by_zero() {
        let err = eval_str("(/ 1 0)").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DivideByZero));
        assert_eq!(printed("(/ 0 1)"), "0");
    }

    #[test]
    fn comparisons_chain() {
        assert_eq!(printed("(< 1 2)"), "true");
        assert_eq!(printed("(< 1 2 3)"), "true");
        assert_eq!(printed("(< 1 3 2)"), "false");
        assert_eq!(printed("(<= 1 1 2)"), "true");
        assert_eq!(printed("(> 3 2 1)"), "true");
        assert_eq!(printed("(>= 3 3 4)"), "false");
    }

    #[test]
    fn comparisons_need_numbers() {
        let err = eval_str("(< 1 :a)").unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::TypeMismatch(TypeMismatch {
                operator: "<",
                got: Tag::Keyword,
                ..
            })
        ));
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(printed("(= (list 1 2) (list 1 2))"), "true");
        assert_eq!(printed("(= (list 1 2) (list 2 1))"), "false");
        assert_eq!(printed("(= 1 1)"), "true");
        assert_eq!(printed("(= (list 1 2) [1 2])"), "false");
        assert_eq!(printed("(= {:a [1]} {:a [1]})"), "true");
        assert_eq!(printed("(= \"a\" \"a\" \"b\")"), "false");
        assert_eq!(printed("(= nil nil)"), "true");
        assert_eq!(printed("(= list list)"), "true");
    }

    #[test]
    fn if_truthiness() {
        assert_eq!(printed("(if nil 1 2)"), "2");
        assert_eq!(printed("(if false 1 2)"), "2");
        assert_eq!(printed("(if 0 1 2)"), "1");
        assert_eq!(printed("(if (list) 1 2)"), "1");
        assert_eq!(printed("(if false 1)"), "nil");
        assert!(matches!(
            eval_str("(if true 1 2 3)").unwrap_err().kind,
            ErrorKind::BadArgCount(_)
        ));
    }

    #[test]
    fn sequences() {
        assert_eq!(printed("(list 1 :b \"c\")"), "(1 :b \"c\")");
        assert_eq!(printed("(list)"), "()");
        assert_eq!(printed("(list? (list))"), "true");
        assert_eq!(printed("(list? [1])"), "false");
        assert_eq!(printed("(vector 1 2)"), "[1 2]");
        assert_eq!(printed("(vector? [1])"), "true");
        assert_eq!(printed("(count (list 1 2 3))"), "3");
        assert_eq!(printed("(count [1])"), "1");
        assert_eq!(printed("(count nil)"), "0");
        assert_eq!(printed("(count 7)"), "0");
    }

    #[test]
    fn emptiness() {
        assert_eq!(printed("(empty? (list))"), "true");
        assert_eq!(printed("(empty? [1])"), "false");
        assert_eq!(printed("(empty? {})"), "true");
        assert_eq!(printed("(empty? nil)"), "true");
        assert!(matches!(
            eval_str("(empty? 0)").unwrap_err().kind,
            ErrorKind::TypeMismatch(_)
        ));
    }

    #[test]
    fn quote_and_fn_see_raw_operands() {
        assert_eq!(printed("(quote (a b))"), "(a b)");
        assert_eq!(printed("'undefined-symbol"), "undefined-symbol");
        assert_eq!(printed("(fn* (a) a)"), "(function)");
        assert_eq!(printed("((fn* (a b) (* a b)) 6 7)"), "42");
    }

    #[test]
    fn miscellany() {
        assert_eq!(printed("(do 1 2 3)"), "3");
        assert_eq!(printed("(not nil)"), "true");
        assert_eq!(printed("(not 0)"), "false");
        assert_eq!(printed("(nil? nil)"), "true");
        assert_eq!(printed("(number? 1)"), "true");
        assert_eq!(printed("(string? :a)"), "false");
        assert_eq!(printed("(symbol? 'a)"), "true");
        assert_eq!(printed("(keyword? :a)"), "true");
        assert_eq!(printed("(fn? +)"), "true");
        assert_eq!(printed("(pr-str 1 \"a\\n\" [:b])"), r#""1 \"a\\n\" [:b]""#);
    }
}
