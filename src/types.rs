use crate::environment::Environment;
use crate::evaluator::{self, Args};
use crate::lazy::{Cons, LazySeq};
use derive_more::{Deref, DerefMut};
use std::fmt;
use std::ops::{RangeFrom, RangeInclusive};
use std::rc::Rc;

#[derive(Deref, DerefMut, Debug, Default)]
pub struct List(pub Vec<Value>);
#[derive(Deref, DerefMut, Debug, Default)]
pub struct Vector(pub Vec<Value>);

/// Association list. Keys are unique; `assoc` replaces in place so the
/// original insertion position is kept.
#[derive(Deref, DerefMut, Debug, Default, Clone)]
pub struct Map(pub Vec<(Value, Value)>);

pub type Int = i64;

#[derive(Deref, Debug, PartialEq, Eq, Hash, Clone)]
pub struct Symbol(pub String);

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Symbol {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self(name.into())
    }

    /// Splits `ns/name` at the first slash. A slash at either end is part of
    /// the name, so `/` alone is a plain symbol.
    pub fn split_ns(&self) -> (Option<&str>, &str) {
        match self.0.find('/') {
            Some(i) if i > 0 && i + 1 < self.0.len() => (Some(&self.0[..i]), &self.0[i + 1..]),
            _ => (None, &self.0),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Map {
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn assoc(&mut self, key: Value, value: Value) {
        match self.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.push((key, value)),
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
    name: String,
    expected: Arity,
    got: usize,
}

impl fmt::Display for BadArgCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wrong number of args ({}) passed to {}, expected {}",
            self.got, self.name, self.expected
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

    pub(crate) fn validate_for(&self, n: usize, name: &str) -> Result<(), BadArgCount> {
        match self.contains(n) {
            true => Ok(()),
            false => Err(BadArgCount {
                name: name.to_string(),
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

/// Anything that can sit at the head of a list form. Arguments arrive
/// unevaluated; the callable decides what to evaluate and when.
pub trait Callable: fmt::Debug {
    fn name(&self) -> &str;
    fn invoke(&self, env: &mut Environment, args: Args) -> evaluator::Result;
}

/// An ordinary function implemented in Rust: all arguments are evaluated
/// left to right before the arity check.
#[derive(Clone)]
pub struct PrimitiveFn {
    pub name: &'static str,
    pub arity: Arity,
    pub fn_ptr: fn(&mut Environment, &[Value]) -> evaluator::Result,
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

    fn invoke(&self, env: &mut Environment, args: Args) -> evaluator::Result {
        let values = args.into_values(env)?;
        self.arity
            .validate_for(values.len(), self.name)
            .map_err(evaluator::Error::BadArgCount)?;
        log::trace!(
            "Call {} with {}",
            self.name,
            evaluator::pretty_print_args(&values)
        );
        let result = (self.fn_ptr)(env, &values);
        match &result {
            Ok(val) => log::trace!("Call to {} resulted in {}", self.name, val),
            Err(e) => log::trace!("Call to {} failed: {}", self.name, e),
        }
        result
    }
}

/// A Rust-implemented form that receives its arguments unevaluated.
#[derive(Clone)]
pub struct SpecialForm {
    pub name: &'static str,
    pub fn_ptr: fn(&mut Environment, Args) -> evaluator::Result,
}

impl fmt::Debug for SpecialForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "special form #<{}>", self.name)
    }
}

impl Callable for SpecialForm {
    fn name(&self) -> &str {
        self.name
    }

    fn invoke(&self, env: &mut Environment, args: Args) -> evaluator::Result {
        log::trace!("Enter special form {}", self.name);
        (self.fn_ptr)(env, args)
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(Int),
    String(String),
    Char(char),
    Keyword(String),
    Symbol(Symbol),
    List(Rc<List>),
    Vector(Rc<Vector>),
    Map(Rc<Map>),
    Callable(Rc<dyn Callable>),
    Cons(Rc<Cons>),
    Lazy(Rc<LazySeq>),
}

pub fn truthy(obj: &Value) -> bool {
    use Value::*;
    match obj {
        Nil => false,
        Bool(t) => *t,
        Integer(_) | String(_) | Char(_) | Keyword(_) | Symbol(_) | List(_) | Vector(_)
        | Map(_) | Callable(_) | Cons(_) | Lazy(_) => true,
    }
}

#[derive(Debug)]
pub enum TypeMismatch {
    NotAnInt,
    NotASequence,
    NotASymbol,
    NotAString,
    NotAVector,
    NotAMap,
    NotCallable,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected = match self {
            TypeMismatch::NotAnInt => "an integer",
            TypeMismatch::NotASequence => "a sequence",
            TypeMismatch::NotASymbol => "a symbol",
            TypeMismatch::NotAString => "a string",
            TypeMismatch::NotAVector => "a vector",
            TypeMismatch::NotAMap => "a map",
            TypeMismatch::NotCallable => "callable",
        };
        write!(f, "expected {}", expected)
    }
}

impl Value {
    pub(crate) fn as_int(&self) -> Result<Int, TypeMismatch> {
        match self {
            Value::Integer(x) => Ok(*x),
            _ => Err(TypeMismatch::NotAnInt),
        }
    }

    pub(crate) fn as_symbol(&self) -> Result<&Symbol, TypeMismatch> {
        match self {
            Value::Symbol(s) => Ok(s),
            _ => Err(TypeMismatch::NotASymbol),
        }
    }

    pub(crate) fn as_string(&self) -> Result<&str, TypeMismatch> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(TypeMismatch::NotAString),
        }
    }

    pub(crate) fn as_vector(&self) -> Result<&Vector, TypeMismatch> {
        match self {
            Value::Vector(v) => Ok(v),
            _ => Err(TypeMismatch::NotAVector),
        }
    }

    pub(crate) fn as_map(&self) -> Result<&Map, TypeMismatch> {
        match self {
            Value::Map(m) => Ok(m),
            _ => Err(TypeMismatch::NotAMap),
        }
    }

    pub(crate) fn as_callable(&self) -> Result<Rc<dyn Callable>, TypeMismatch> {
        match self {
            Value::Callable(c) => Ok(c.clone()),
            _ => Err(TypeMismatch::NotCallable),
        }
    }

    pub(crate) fn is_nil(&self) -> bool {
        match self {
            Value::Nil => true,
            _ => false,
        }
    }

    /// List, vector, cons cell or lazy sequence.
    pub fn is_sequential(&self) -> bool {
        match self {
            Value::List(_) | Value::Vector(_) | Value::Cons(_) | Value::Lazy(_) => true,
            _ => false,
        }
    }

    /// Uniform element iterator over anything seqable. Maps yield their
    /// entries as `[key value]` vectors and `nil` is the empty sequence.
    pub fn seq_iter(&self) -> Result<SeqIter, TypeMismatch> {
        match self {
            Value::Nil
            | Value::List(_)
            | Value::Vector(_)
            | Value::Map(_)
            | Value::Cons(_)
            | Value::Lazy(_) => Ok(SeqIter {
                rest: self.clone(),
                index: 0,
            }),
            _ => Err(TypeMismatch::NotASequence),
        }
    }

    pub fn collect_seq(&self) -> evaluator::Result<Vec<Value>> {
        self.seq_iter()?.collect()
    }
}

impl Value {
    pub fn new_list() -> Self {
        Self::List(Rc::new(List(Vec::new())))
    }
    pub fn wrap_list(elements: Vec<Value>) -> Self {
        Self::List(Rc::new(List(elements)))
    }
    pub fn wrap_vector(elements: Vec<Value>) -> Self {
        Self::Vector(Rc::new(Vector(elements)))
    }
    pub fn wrap_map(map: Map) -> Self {
        Self::Map(Rc::new(map))
    }
    pub fn new_symbol(name: &str) -> Self {
        Self::Symbol(Symbol::new(name))
    }
    pub fn new_keyword(name: &str) -> Self {
        match name.starts_with(':') {
            true => Self::Keyword(name.to_string()),
            false => Self::Keyword(format!(":{}", name)),
        }
    }
    pub fn wrap_callable<C: Callable + 'static>(callable: C) -> Self {
        Self::Callable(Rc::new(callable))
    }
}

pub struct SeqIter {
    rest: Value,
    index: usize,
}

impl Iterator for SeqIter {
    type Item = evaluator::Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = match self.rest.clone() {
                Value::List(list) => list.get(self.index).cloned(),
                Value::Vector(vec) => vec.get(self.index).cloned(),
                Value::Map(map) => map
                    .0
                    .get(self.index)
                    .map(|(k, v)| Value::wrap_vector(vec![k.clone(), v.clone()])),
                Value::Cons(cell) => {
                    self.rest = cell.rest.clone();
                    self.index = 0;
                    return Some(Ok(cell.first.clone()));
                }
                Value::Lazy(lazy) => {
                    match lazy.realize() {
                        Ok(realized) => self.rest = realized,
                        Err(e) => {
                            self.rest = Value::Nil;
                            return Some(Err(e));
                        }
                    }
                    self.index = 0;
                    continue;
                }
                _ => None,
            };
            self.index += 1;
            return item.map(Ok);
        }
    }
}

fn same_callable(x: &Rc<dyn Callable>, y: &Rc<dyn Callable>) -> bool {
    Rc::as_ptr(x) as *const u8 == Rc::as_ptr(y) as *const u8
}

impl Value {
    /// Structural equality. Sequential values compare element by element
    /// whatever their concrete kind, which may realize lazy sequences.
    pub fn try_eq(&self, other: &Value) -> evaluator::Result<bool> {
        use Value::*;
        if self.is_sequential() && other.is_sequential() {
            return equal_sequences(self, other);
        }
        let equal = match (self, other) {
            (Nil, Nil) => true,
            (Bool(x), Bool(y)) => x == y,
            (Integer(x), Integer(y)) => x == y,
            (String(x), String(y)) => x == y,
            (Char(x), Char(y)) => x == y,
            (Keyword(x), Keyword(y)) => x == y,
            (Symbol(x), Symbol(y)) => x == y,
            (Map(x), Map(y)) => return equal_maps(x, y),
            (Callable(x), Callable(y)) => same_callable(x, y),
            (_, _) => false,
        };
        Ok(equal)
    }
}

fn equal_sequences(xs: &Value, ys: &Value) -> evaluator::Result<bool> {
    let mut xs = xs.seq_iter()?;
    let mut ys = ys.seq_iter()?;
    loop {
        match (xs.next().transpose()?, ys.next().transpose()?) {
            (None, None) => return Ok(true),
            (Some(x), Some(y)) => {
                if !x.try_eq(&y)? {
                    return Ok(false);
                }
            }
            _ => return Ok(false),
        }
    }
}

fn equal_maps(xs: &Map, ys: &Map) -> evaluator::Result<bool> {
    if xs.len() != ys.len() {
        return Ok(false);
    }
    for (key, x) in xs.iter() {
        match ys.get(key) {
            Some(y) if x.try_eq(y)? => continue,
            _ => return Ok(false),
        }
    }
    Ok(true)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.try_eq(other).unwrap_or_else(|e| {
            log::warn!("comparison failed, treating as unequal: {}", e);
            false
        })
    }
}
