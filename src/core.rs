use crate::environment::Environment;
use crate::evaluator::{self, apply, Error};
use crate::lazy::{CONS, ITERATE, LAZY_SEQ, REALIZED_TEST, REPEAT, REPEATEDLY};
use crate::printer::{pr_str, PrintMode};
use crate::special_forms::{
    AND, ASSERT, COMMENT, DEF, DEFN, DO, EQUAL, FN, IF, LET, NOT_EQUAL, NS, OR, QUOTE, REQUIRE,
    WHEN,
};
use crate::types::{truthy, Arity, Map, PrimitiveFn, SpecialForm, TypeMismatch, Value};
use crate::{lazy, reader};
use itertools::Itertools;
use std::rc::Rc;

const COUNT: PrimitiveFn = PrimitiveFn {
    name: "count",
    fn_ptr: count_,
    arity: Arity::exactly(1),
};

fn count_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let count = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::List(list) => list.len(),
        Value::Vector(vec) => vec.len(),
        Value::Map(map) => map.len(),
        other => other.seq_iter()?.fold_ok(0, |n, _| n + 1)?,
    };
    Ok(Value::Integer(count as i64))
}

const SEQ: PrimitiveFn = PrimitiveFn {
    name: "seq",
    fn_ptr: |_env, args| seq_of(&args[0]),
    arity: Arity::exactly(1),
};

/// `nil` for an empty collection, otherwise the elements as a sequence.
fn seq_of(value: &Value) -> evaluator::Result {
    let value = &lazy::force(value)?;
    let seq = match value {
        Value::Nil => Value::Nil,
        Value::Cons(_) => value.clone(),
        Value::List(list) if list.is_empty() => Value::Nil,
        Value::List(_) => value.clone(),
        Value::String(s) if s.is_empty() => Value::Nil,
        Value::String(s) => Value::wrap_list(s.chars().map(Value::Char).collect()),
        _ => match value.collect_seq()? {
            elements if elements.is_empty() => Value::Nil,
            elements => Value::wrap_list(elements),
        },
    };
    Ok(seq)
}

const FIRST: PrimitiveFn = PrimitiveFn {
    name: "first",
    fn_ptr: first_,
    arity: Arity::exactly(1),
};

fn first_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let first = args[0].seq_iter()?.next().transpose()?;
    Ok(first.unwrap_or(Value::Nil))
}

const REST: PrimitiveFn = PrimitiveFn {
    name: "rest",
    fn_ptr: |_env, args| rest_of(&args[0]),
    arity: Arity::exactly(1),
};

/// Everything after the first element; never `nil`.
fn rest_of(value: &Value) -> evaluator::Result {
    match &lazy::force(value)? {
        Value::Cons(cell) if cell.rest.is_nil() => Ok(Value::new_list()),
        Value::Cons(cell) => Ok(cell.rest.clone()),
        value => {
            let mut elements = value.seq_iter()?;
            elements.next().transpose()?;
            Ok(Value::wrap_list(elements.collect::<evaluator::Result<_>>()?))
        }
    }
}

const NEXT: PrimitiveFn = PrimitiveFn {
    name: "next",
    fn_ptr: |_env, args| seq_of(&rest_of(&args[0])?),
    arity: Arity::exactly(1),
};

const IDENTITY: PrimitiveFn = PrimitiveFn {
    name: "identity",
    fn_ptr: |_env, args| Ok(args[0].clone()),
    arity: Arity::exactly(1),
};

const REDUCE: PrimitiveFn = PrimitiveFn {
    name: "reduce",
    fn_ptr: reduce_,
    arity: Arity::Between(2..=3),
};

fn reduce_(env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let f = args[0].as_callable()?;
    let (mut acc, mut elements) = match args {
        [_, init, coll] => (init.clone(), coll.seq_iter()?),
        [_, coll] => {
            let mut elements = coll.seq_iter()?;
            match elements.next().transpose()? {
                Some(first) => (first, elements),
                None => return apply(&f, &[], env),
            }
        }
        _ => unreachable!(),
    };
    while let Some(element) = elements.next() {
        acc = apply(&f, &[acc, element?], env)?;
    }
    Ok(acc)
}

const TAKE: PrimitiveFn = PrimitiveFn {
    name: "take",
    fn_ptr: take_,
    arity: Arity::exactly(2),
};

fn take_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let n = args[0].as_int()?.max(0) as usize;
    let taken = args[1]
        .seq_iter()?
        .take(n)
        .collect::<evaluator::Result<_>>()?;
    Ok(Value::wrap_list(taken))
}

const SOME: PrimitiveFn = PrimitiveFn {
    name: "some",
    fn_ptr: some_,
    arity: Arity::exactly(2),
};

fn some_(env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let pred = args[0].as_callable()?;
    for element in args[1].seq_iter()? {
        let result = apply(&pred, &[element?], env)?;
        if truthy(&result) {
            return Ok(result);
        }
    }
    Ok(Value::Nil)
}

const CONJ: PrimitiveFn = PrimitiveFn {
    name: "conj",
    fn_ptr: conj_,
    arity: Arity::at_least(1),
};

fn conj_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let (coll, items) = (&args[0], &args[1..]);
    match coll {
        Value::Vector(vec) => {
            let mut elements = vec.to_vec();
            elements.extend_from_slice(items);
            Ok(Value::wrap_vector(elements))
        }
        Value::Map(map) => {
            let mut map = Map::clone(map);
            for item in items {
                match item.collect_seq()?.as_slice() {
                    [key, value] => map.assoc(key.clone(), value.clone()),
                    _ => return Err(Error::TypeMismatch(TypeMismatch::NotAMap)),
                }
            }
            Ok(Value::wrap_map(map))
        }
        Value::Nil | Value::List(_) => {
            let mut elements: Vec<Value> = items.iter().rev().cloned().collect();
            elements.extend(coll.collect_seq()?);
            Ok(Value::wrap_list(elements))
        }
        Value::Cons(_) | Value::Lazy(_) => Ok(items.iter().fold(coll.clone(), |rest, item| {
            lazy::cons_cell(item.clone(), rest)
        })),
        _ => Err(Error::TypeMismatch(TypeMismatch::NotASequence)),
    }
}

const ASSOC: PrimitiveFn = PrimitiveFn {
    name: "assoc",
    fn_ptr: assoc_,
    arity: Arity::at_least(3),
};

fn assoc_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let mut map = match &args[0] {
        Value::Nil => Map::default(),
        other => other.as_map()?.clone(),
    };
    if args.len() % 2 == 0 {
        return Err(Error::MissingArgument {
            name: "assoc".into(),
            position: args.len(),
        });
    }
    for (key, value) in args[1..].iter().tuples() {
        map.assoc(key.clone(), value.clone());
    }
    Ok(Value::wrap_map(map))
}

const GET: PrimitiveFn = PrimitiveFn {
    name: "get",
    fn_ptr: get_,
    arity: Arity::Between(2..=3),
};

fn get_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let default = args.get(2).cloned().unwrap_or(Value::Nil);
    let found = match (&args[0], &args[1]) {
        (Value::Map(map), key) => map.get(key).cloned(),
        (Value::Vector(vec), Value::Integer(i)) if *i >= 0 => vec.0.get(*i as usize).cloned(),
        _ => None,
    };
    Ok(found.unwrap_or(default))
}

const LIST: PrimitiveFn = PrimitiveFn {
    name: "list",
    fn_ptr: |_env, args| Ok(Value::wrap_list(args.to_vec())),
    arity: Arity::at_least(0),
};

const VECTOR: PrimitiveFn = PrimitiveFn {
    name: "vector",
    fn_ptr: |_env, args| Ok(Value::wrap_vector(args.to_vec())),
    arity: Arity::at_least(0),
};

const HASH_MAP: PrimitiveFn = PrimitiveFn {
    name: "hash-map",
    fn_ptr: hash_map_,
    arity: Arity::at_least(0),
};

fn hash_map_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    if args.len() % 2 != 0 {
        return Err(Error::MissingArgument {
            name: "hash-map".into(),
            position: args.len(),
        });
    }
    let mut map = Map::default();
    for (key, value) in args.iter().tuples() {
        map.assoc(key.clone(), value.clone());
    }
    Ok(Value::wrap_map(map))
}

fn print_all(args: &[Value], mode: PrintMode, separator: &str) -> String {
    args.iter()
        .filter(|arg| mode == PrintMode::ReadableRepresentation || !arg.is_nil())
        .map(|arg| pr_str(arg, mode))
        .join(separator)
}

const STR: PrimitiveFn = PrimitiveFn {
    name: "str",
    fn_ptr: |_env, args| Ok(Value::String(print_all(args, PrintMode::Directly, ""))),
    arity: Arity::at_least(0),
};

const PR_STR: PrimitiveFn = PrimitiveFn {
    name: "pr-str",
    fn_ptr: |_env, args| {
        let printed = print_all(args, PrintMode::ReadableRepresentation, " ");
        Ok(Value::String(printed))
    },
    arity: Arity::at_least(0),
};

const PRINTLN: PrimitiveFn = PrimitiveFn {
    name: "println",
    fn_ptr: |_env, args| {
        println!("{}", args.iter().map(|arg| pr_str(arg, PrintMode::Directly)).join(" "));
        Ok(Value::Nil)
    },
    arity: Arity::at_least(0),
};

const PRN: PrimitiveFn = PrimitiveFn {
    name: "prn",
    fn_ptr: |_env, args| {
        println!("{}", print_all(args, PrintMode::ReadableRepresentation, " "));
        Ok(Value::Nil)
    },
    arity: Arity::at_least(0),
};

const NIL_TEST: PrimitiveFn = PrimitiveFn {
    name: "nil?",
    fn_ptr: |_env, args| Ok(Value::Bool(args[0].is_nil())),
    arity: Arity::exactly(1),
};

const EMPTY_TEST: PrimitiveFn = PrimitiveFn {
    name: "empty?",
    fn_ptr: empty_test_,
    arity: Arity::exactly(1),
};

fn empty_test_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let empty = match &args[0] {
        Value::String(s) => s.is_empty(),
        other => other.seq_iter()?.next().transpose()?.is_none(),
    };
    Ok(Value::Bool(empty))
}

const NOT: PrimitiveFn = PrimitiveFn {
    name: "not",
    fn_ptr: |_env, args| Ok(Value::Bool(!truthy(&args[0]))),
    arity: Arity::exactly(1),
};

const READ_STRING: PrimitiveFn = PrimitiveFn {
    name: "read-string",
    fn_ptr: read_string_,
    arity: Arity::exactly(1),
};

fn read_string_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let src = args[0].as_string()?;
    reader::read_str(src).map_err(Error::Read)
}

const SPECIAL_FORMS: &[SpecialForm] = &[
    IF, WHEN, QUOTE, DEF, DO, LET, FN, DEFN, ASSERT, COMMENT, NS, REQUIRE, EQUAL, NOT_EQUAL, AND,
    OR, LAZY_SEQ,
];

const PRIMITIVES: &[PrimitiveFn] = &[
    // Sequences
    COUNT,
    SEQ,
    FIRST,
    REST,
    NEXT,
    CONS,
    CONJ,
    TAKE,
    REDUCE,
    SOME,
    IDENTITY,
    // Lazy sequences
    ITERATE,
    REPEAT,
    REPEATEDLY,
    REALIZED_TEST,
    // Constructors
    LIST,
    VECTOR,
    HASH_MAP,
    ASSOC,
    GET,
    // Printing and reading
    STR,
    PR_STR,
    PRINTLN,
    PRN,
    READ_STRING,
    // Predicates
    NIL_TEST,
    EMPTY_TEST,
    NOT,
];

/// Installs the special forms and core functions into the internal table.
pub fn add_core(env: &mut Environment) {
    for form in SPECIAL_FORMS.iter() {
        env.set_internal(form.name, Value::Callable(Rc::new(form.clone())));
    }
    for func in PRIMITIVES.iter() {
        env.set_internal(func.name, Value::Callable(Rc::new(func.clone())));
    }
}
