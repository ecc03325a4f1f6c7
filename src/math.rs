use crate::environment::Environment;
use crate::evaluator;
use crate::types::{Arity, Int, PrimitiveFn, Value};
use std::rc::Rc;

fn grab_ints(args: &[Value]) -> evaluator::Result<Vec<Int>> {
    let type_check: Result<Vec<_>, _> = args.iter().map(|v| v.as_int()).collect();
    type_check.map_err(evaluator::Error::TypeMismatch)
}

const SUM: PrimitiveFn = PrimitiveFn {
    name: "+",
    fn_ptr: sum_,
    arity: Arity::at_least(0),
};

fn sum_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let value = grab_ints(args)?
        .iter()
        .fold(0 as Int, |acc, &x| acc.wrapping_add(x));
    Ok(Value::Integer(value))
}

const SUB: PrimitiveFn = PrimitiveFn {
    name: "-",
    fn_ptr: sub_,
    arity: Arity::at_least(1),
};

fn sub_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let value = match grab_ints(args)?.as_slice() {
        [x] => x.wrapping_neg(),
        [x, rest @ ..] => rest.iter().fold(*x, |acc, &y| acc.wrapping_sub(y)),
        [] => unreachable!(),
    };
    Ok(Value::Integer(value))
}

const MUL: PrimitiveFn = PrimitiveFn {
    name: "*",
    fn_ptr: mul_,
    arity: Arity::at_least(0),
};

fn mul_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let value = grab_ints(args)?
        .iter()
        .fold(1 as Int, |acc, &x| acc.wrapping_mul(x));
    Ok(Value::Integer(value))
}

const INC: PrimitiveFn = PrimitiveFn {
    name: "inc",
    fn_ptr: |_env, args| Ok(Value::Integer(args[0].as_int()?.wrapping_add(1))),
    arity: Arity::exactly(1),
};

const DEC: PrimitiveFn = PrimitiveFn {
    name: "dec",
    fn_ptr: |_env, args| Ok(Value::Integer(args[0].as_int()?.wrapping_sub(1))),
    arity: Arity::exactly(1),
};

/// Only the first two arguments take part; any others must still be
/// integers.
fn comparison_(args: &[Value], op: fn(&Int, &Int) -> bool) -> evaluator::Result {
    let result = match grab_ints(args)?.as_slice() {
        [x, y, ..] => op(x, y),
        _ => true,
    };
    Ok(Value::Bool(result))
}

macro_rules! comparison_primitive {
    ($SYMBOL:tt, $NAME:ident) => {
        paste::item! {
            const $NAME: PrimitiveFn = PrimitiveFn {
                name: stringify!($SYMBOL),
                fn_ptr: |_env: &mut Environment, args: &[Value]| comparison_(args, Int:: [<$NAME:lower>]),
                arity: Arity::at_least(1),
            };
        }
    };
}

comparison_primitive!(<, LT);
comparison_primitive!(<=, LE);
comparison_primitive!(>, GT);
comparison_primitive!(>=, GE);

const MATH: &[PrimitiveFn] = &[SUM, SUB, MUL, INC, DEC, LT, LE, GT, GE];

pub fn add_math(env: &mut Environment) {
    for func in MATH.iter() {
        env.set_internal(func.name, Value::Callable(Rc::new(func.clone())));
    }
}
