use crate::environment::{Environment, Namespaces};
use crate::evaluator::{self, apply, Args, Error};
use crate::special_forms::Closure;
use crate::types::{Arity, Callable, PrimitiveFn, SpecialForm, TypeMismatch, Value};
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

/// A value prepended to a (possibly lazy) sequence without realizing it.
#[derive(Debug)]
pub struct Cons {
    pub first: Value,
    pub rest: Value,
}

/// A sequence whose body runs at most once, on first traversal.
pub struct LazySeq {
    body: RefCell<Option<Rc<dyn Callable>>>,
    realized: RefCell<Option<Value>>,
    namespaces: Weak<RefCell<Namespaces>>,
}

impl fmt::Debug for LazySeq {
    // The body may well refer back to this sequence, so skip it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.realized.borrow().as_ref() {
            Some(value) => write!(f, "LazySeq{{realized: {:?}}}", value),
            None => write!(f, "LazySeq{{unrealized}}"),
        }
    }
}

impl Drop for LazySeq {
    fn drop(&mut self) {
        if let Some(realized) = self.realized.get_mut().take() {
            unlink(realized);
        }
    }
}

impl Drop for Cons {
    fn drop(&mut self) {
        unlink(mem::replace(&mut self.rest, Value::Nil));
    }
}

/// Drops a chain of cons cells and realized lazy sequences one link at a
/// time, so a long sequence does not exhaust the stack. Stops at the first
/// link that is still shared.
fn unlink(mut value: Value) {
    loop {
        value = match value {
            Value::Cons(cell) => match Rc::try_unwrap(cell) {
                Ok(mut cell) => mem::replace(&mut cell.rest, Value::Nil),
                Err(_) => return,
            },
            Value::Lazy(lazy) => match Rc::try_unwrap(lazy) {
                Ok(lazy) => lazy.realized.replace(None).unwrap_or(Value::Nil),
                Err(_) => return,
            },
            _ => return,
        };
    }
}

/// Realizes lazy sequences until the value is something else.
pub(crate) fn force(value: &Value) -> evaluator::Result {
    let mut value = value.clone();
    loop {
        let realized = match &value {
            Value::Lazy(lazy) => lazy.realize()?,
            _ => break,
        };
        value = realized;
    }
    Ok(value)
}

impl LazySeq {
    pub fn new(body: Rc<dyn Callable>, env: &Environment) -> Self {
        Self {
            body: RefCell::new(Some(body)),
            realized: RefCell::new(None),
            namespaces: env.namespaces_handle(),
        }
    }

    pub fn is_realized(&self) -> bool {
        self.realized.borrow().is_some()
    }

    /// Runs the body if needed and returns the cached sequence. A `nil`
    /// result is the empty list; anything else must be sequential.
    pub fn realize(&self) -> evaluator::Result {
        if let Some(value) = self.realized.borrow().as_ref() {
            return Ok(value.clone());
        }
        let body = self
            .body
            .borrow_mut()
            .take()
            .ok_or(Error::LazySeqRecursion)?;
        let namespaces = match self.namespaces.upgrade() {
            Some(namespaces) => namespaces,
            None => {
                self.body.replace(Some(body));
                return Err(Error::EnvironmentDropped);
            }
        };
        let mut env = Environment::with_namespaces(namespaces);
        log::trace!("Realize lazy sequence via {}", body.name());
        let value = match body.invoke(&mut env, Args::evaluated(&[])) {
            Ok(Value::Nil) => Value::new_list(),
            Ok(value) if value.is_sequential() => value,
            Ok(_) => {
                self.body.replace(Some(body));
                return Err(Error::TypeMismatch(TypeMismatch::NotASequence));
            }
            Err(e) => {
                self.body.replace(Some(body));
                return Err(e);
            }
        };
        self.realized.replace(Some(value.clone()));
        Ok(value)
    }
}

fn wrap_lazy(step: impl Callable + 'static, env: &Environment) -> Value {
    Value::Lazy(Rc::new(LazySeq::new(Rc::new(step), env)))
}

pub(crate) fn cons_cell(first: Value, rest: Value) -> Value {
    Value::Cons(Rc::new(Cons { first, rest }))
}

pub(crate) const CONS: PrimitiveFn = PrimitiveFn {
    name: "cons",
    fn_ptr: cons_,
    arity: Arity::exactly(2),
};

fn cons_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    args[1].seq_iter()?;
    let rest = match &args[1] {
        Value::Map(_) => Value::wrap_list(args[1].collect_seq()?),
        _ => args[1].clone(),
    };
    Ok(cons_cell(args[0].clone(), rest))
}

pub(crate) const LAZY_SEQ: SpecialForm = SpecialForm {
    name: "lazy-seq",
    fn_ptr: lazy_seq_,
};

fn lazy_seq_(env: &mut Environment, args: Args) -> evaluator::Result {
    let body: Vec<Value> = args.remaining().to_vec();
    let closure = Closure::new(env, Some("lazy-seq"), Rc::new(Default::default()), body)?;
    Ok(wrap_lazy(closure, env))
}

/// One step of `(iterate f x)`: yields `(f x)` then continues from it.
#[derive(Debug)]
struct Iterate {
    f: Rc<dyn Callable>,
    x: Value,
}

impl Callable for Iterate {
    fn name(&self) -> &str {
        "iterate"
    }

    fn invoke(&self, env: &mut Environment, _args: Args) -> evaluator::Result {
        let next = apply(&self.f, &[self.x.clone()], env)?;
        let rest = wrap_lazy(
            Iterate {
                f: self.f.clone(),
                x: next.clone(),
            },
            env,
        );
        Ok(cons_cell(next, rest))
    }
}

pub(crate) const ITERATE: PrimitiveFn = PrimitiveFn {
    name: "iterate",
    fn_ptr: iterate_,
    arity: Arity::exactly(2),
};

fn iterate_(env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let f = args[0].as_callable()?;
    Ok(wrap_lazy(
        Iterate {
            f,
            x: args[1].clone(),
        },
        env,
    ))
}

/// How many more elements a counted `repeat`/`repeatedly` yields; `None`
/// for no limit.
type Remaining = Option<i64>;

fn exhausted(remaining: Remaining) -> bool {
    remaining.map_or(false, |n| n <= 0)
}

fn one_fewer(remaining: Remaining) -> Remaining {
    remaining.map(|n| n - 1)
}

#[derive(Debug)]
struct Repeat {
    x: Value,
    remaining: Remaining,
}

impl Callable for Repeat {
    fn name(&self) -> &str {
        "repeat"
    }

    fn invoke(&self, env: &mut Environment, _args: Args) -> evaluator::Result {
        if exhausted(self.remaining) {
            return Ok(Value::Nil);
        }
        let rest = wrap_lazy(
            Repeat {
                x: self.x.clone(),
                remaining: one_fewer(self.remaining),
            },
            env,
        );
        Ok(cons_cell(self.x.clone(), rest))
    }
}

pub(crate) const REPEAT: PrimitiveFn = PrimitiveFn {
    name: "repeat",
    fn_ptr: repeat_,
    arity: Arity::Between(1..=2),
};

fn repeat_(env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let (remaining, x) = match args {
        [x] => (None, x),
        [n, x] => (Some(n.as_int()?), x),
        _ => unreachable!(),
    };
    Ok(wrap_lazy(
        Repeat {
            x: x.clone(),
            remaining,
        },
        env,
    ))
}

#[derive(Debug)]
struct Repeatedly {
    f: Rc<dyn Callable>,
    remaining: Remaining,
}

impl Callable for Repeatedly {
    fn name(&self) -> &str {
        "repeatedly"
    }

    fn invoke(&self, env: &mut Environment, _args: Args) -> evaluator::Result {
        if exhausted(self.remaining) {
            return Ok(Value::Nil);
        }
        let first = apply(&self.f, &[], env)?;
        let rest = wrap_lazy(
            Repeatedly {
                f: self.f.clone(),
                remaining: one_fewer(self.remaining),
            },
            env,
        );
        Ok(cons_cell(first, rest))
    }
}

pub(crate) const REPEATEDLY: PrimitiveFn = PrimitiveFn {
    name: "repeatedly",
    fn_ptr: repeatedly_,
    arity: Arity::Between(1..=2),
};

fn repeatedly_(env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let (remaining, f) = match args {
        [f] => (None, f),
        [n, f] => (Some(n.as_int()?), f),
        _ => unreachable!(),
    };
    Ok(wrap_lazy(
        Repeatedly {
            f: f.as_callable()?,
            remaining,
        },
        env,
    ))
}

pub(crate) const REALIZED_TEST: PrimitiveFn = PrimitiveFn {
    name: "realized?",
    fn_ptr: realized_test_,
    arity: Arity::exactly(1),
};

fn realized_test_(_env: &mut Environment, args: &[Value]) -> evaluator::Result {
    let realized = match &args[0] {
        Value::Lazy(lazy) => lazy.is_realized(),
        _ => true,
    };
    Ok(Value::Bool(realized))
}
