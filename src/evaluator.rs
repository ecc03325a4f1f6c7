use crate::destructure::DestructureError;
use crate::environment::Environment;
use crate::reader::ReadError;
use crate::special_forms::{DefError, FnError, LetError, RequireError};
use crate::types::{self, Callable, Map, Symbol, TypeMismatch, Value};
use itertools::Itertools;
use std::fmt;
use std::rc::Rc;
use std::slice;

pub type Result<T = Value> = std::result::Result<T, Error>;
#[derive(Debug)]
pub enum Error {
    UnknownSymbol(Symbol),
    UnknownNamespace(String, Symbol),
    NotCallable(Value),
    MissingArgument { name: String, position: usize },
    NoScope(String),
    Def(DefError),
    Let(LetError),
    Fn(FnError),
    Destructure(DestructureError),
    Require(RequireError),
    AssertFailed { form: Value, message: Option<Value> },
    TypeMismatch(types::TypeMismatch),
    BadArgCount(types::BadArgCount),
    LazySeqRecursion,
    EnvironmentDropped,
    Read(ReadError),
    IOError(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownSymbol(s) => write!(f, "unable to find symbol '{}'", s),
            Error::UnknownNamespace(ns, s) => {
                write!(f, "no namespace '{}' while resolving '{}'", ns, s)
            }
            Error::NotCallable(form) => write!(f, "head of {} is not callable", form),
            Error::MissingArgument { name, position } => {
                write!(f, "{}: missing argument at position {}", name, position)
            }
            Error::NoScope(name) => write!(f, "no open scope to bind '{}'", name),
            Error::Def(e) => write!(f, "def: {}", e),
            Error::Let(e) => write!(f, "let: {}", e),
            Error::Fn(e) => write!(f, "fn: {}", e),
            Error::Destructure(e) => write!(f, "destructure: {}", e),
            Error::Require(e) => write!(f, "require: {}", e),
            Error::AssertFailed {
                form,
                message: Some(message),
            } => write!(f, "assert failed: {}\n{}", form, message),
            Error::AssertFailed {
                form,
                message: None,
            } => write!(f, "assert failed: {}", form),
            Error::TypeMismatch(e) => write!(f, "type mismatch: {}", e),
            Error::BadArgCount(e) => write!(f, "{}", e),
            Error::LazySeqRecursion => {
                write!(f, "lazy sequence referred to itself while being realized")
            }
            Error::EnvironmentDropped => {
                write!(f, "lazy sequence outlived the environment that created it")
            }
            Error::Read(e) => write!(f, "{}", e),
            Error::IOError(e) => write!(f, "io error: {}", e),
        }
    }
}

impl From<types::TypeMismatch> for Error {
    fn from(t: TypeMismatch) -> Self {
        Self::TypeMismatch(t)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IOError(e)
    }
}

impl From<ReadError> for Error {
    fn from(e: ReadError) -> Self {
        Self::Read(e)
    }
}

/// Cursor over the arguments of a call. Forms from source arrive
/// unevaluated; `apply` from Rust passes values that must not be evaluated
/// a second time.
pub struct Args<'a> {
    forms: slice::Iter<'a, Value>,
    evaluated: bool,
}

impl<'a> Args<'a> {
    pub fn unevaluated(forms: &'a [Value]) -> Self {
        Self {
            forms: forms.iter(),
            evaluated: false,
        }
    }

    pub fn evaluated(values: &'a [Value]) -> Self {
        Self {
            forms: values.iter(),
            evaluated: true,
        }
    }

    /// The arguments not yet consumed.
    pub fn remaining(&self) -> &'a [Value] {
        self.forms.as_slice()
    }

    pub fn next_form(&mut self) -> Option<&'a Value> {
        self.forms.next()
    }

    pub fn required_form(&mut self, name: &str, position: usize) -> Result<&'a Value> {
        self.next_form().ok_or_else(|| Error::MissingArgument {
            name: name.to_string(),
            position,
        })
    }

    /// Evaluates one argument form, unless it is already a value.
    pub fn evaluate(&self, form: &Value, env: &mut Environment) -> Result {
        match self.evaluated {
            true => Ok(form.clone()),
            false => eval(form, env),
        }
    }

    pub fn next_value(&mut self, env: &mut Environment) -> Option<Result> {
        let form = self.next_form()?;
        Some(self.evaluate(form, env))
    }

    pub fn required_value(
        &mut self,
        env: &mut Environment,
        name: &str,
        position: usize,
    ) -> Result {
        let form = self.required_form(name, position)?;
        self.evaluate(form, env)
    }

    /// Evaluates the remaining arguments in order, returning the last value
    /// or `nil` if there were none.
    pub fn eval_rest(mut self, env: &mut Environment) -> Result {
        let mut last = Value::Nil;
        while let Some(value) = self.next_value(env) {
            last = value?;
        }
        Ok(last)
    }

    pub fn into_values(mut self, env: &mut Environment) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(self.forms.len());
        while let Some(value) = self.next_value(env) {
            values.push(value?);
        }
        Ok(values)
    }
}

pub fn eval(form: &Value, env: &mut Environment) -> Result {
    match form {
        Value::Symbol(s) => env.resolve(s),
        Value::Vector(v) => evaluate_sequence_elementwise(v, env).map(Value::wrap_vector),
        Value::Map(m) => evaluate_map(m, env),
        Value::List(list) => match list.split_first() {
            None => Ok(form.clone()),
            Some((head, args)) => {
                log::trace!("apply {}", form);
                match eval(head, env)? {
                    Value::Callable(f) => f.invoke(env, Args::unevaluated(args)),
                    _ => Err(Error::NotCallable(form.clone())),
                }
            }
        },
        Value::Nil
        | Value::Bool(_)
        | Value::Integer(_)
        | Value::String(_)
        | Value::Char(_)
        | Value::Keyword(_)
        | Value::Callable(_)
        | Value::Cons(_)
        | Value::Lazy(_) => Ok(form.clone()),
    }
}

fn evaluate_map(map: &Map, env: &mut Environment) -> Result {
    let mut evaluated = Map::default();
    for (key, value) in map.iter() {
        let key = eval(key, env)?;
        let value = eval(value, env)?;
        evaluated.assoc(key, value);
    }
    Ok(Value::wrap_map(evaluated))
}

pub fn evaluate_sequence_elementwise(seq: &[Value], env: &mut Environment) -> Result<Vec<Value>> {
    seq.iter().map(|form| eval(form, env)).collect()
}

/// Calls `f` with arguments that are already values.
pub fn apply(f: &Rc<dyn Callable>, args: &[Value], env: &mut Environment) -> Result {
    f.invoke(env, Args::evaluated(args))
}

pub(crate) fn pretty_print_args(args: &[Value]) -> String {
    match args.len() {
        0 => "no args".into(),
        1 => args[0].to_string(),
        _ => format!("\n\t{}", args.iter().join("\n\t")),
    }
}
