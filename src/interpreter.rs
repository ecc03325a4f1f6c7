use crate::environment::Environment;
use crate::reader::{ReadError, Reader};
use crate::types::{Arity, PrimitiveFn, Value};
use crate::{core, evaluator, math};
use std::fmt;
use std::fs::read_to_string;
use std::path::Path;
use std::rc::Rc;

const PRELUDE: &str = include_str!("prelude.clj");

pub type Result<T = Value> = std::result::Result<T, Error>;
#[derive(Debug)]
pub enum Error {
    Read(ReadError),
    Eval(evaluator::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Read(e) => write!(f, "{}", e),
            Error::Eval(e) => write!(f, "{}", e),
        }
    }
}

impl From<ReadError> for Error {
    fn from(e: ReadError) -> Self {
        Self::Read(e)
    }
}

impl From<evaluator::Error> for Error {
    fn from(e: evaluator::Error) -> Self {
        match e {
            evaluator::Error::Read(e) => Self::Read(e),
            e => Self::Eval(e),
        }
    }
}

impl From<Error> for evaluator::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Read(e) => evaluator::Error::Read(e),
            Error::Eval(e) => e,
        }
    }
}

/// Reads and evaluates each top-level form in turn, stopping at the first
/// error. Returns the value of the last form.
pub fn eval_all(src: &str, name: &str, env: &mut Environment) -> Result {
    let mut last = Value::Nil;
    for form in Reader::new(src, name) {
        let form = form?;
        log::trace!("eval top-level form {}", form);
        last = env.eval(&form)?;
    }
    Ok(last)
}

/// Evaluates a file, leaving the current namespace as it found it.
pub fn load_file(path: &Path, env: &mut Environment) -> Result {
    log::debug!("load file {}", path.display());
    let src = read_to_string(path).map_err(|e| Error::Eval(e.into()))?;
    let saved = env.curr_ns();
    let result = eval_all(&src, &path.to_string_lossy(), env);
    env.set_curr_ns(saved.as_deref());
    result
}

const LOAD_FILE: PrimitiveFn = PrimitiveFn {
    name: "load-file",
    fn_ptr: |env, args| {
        let path = args[0].as_string()?;
        load_file(Path::new(path), env).map_err(evaluator::Error::from)
    },
    arity: Arity::exactly(1),
};

/// Functions that reach outside the interpreter.
pub fn add_env(env: &mut Environment) {
    env.set_internal(LOAD_FILE.name, Value::Callable(Rc::new(LOAD_FILE)));
}

pub fn read_prelude(env: &mut Environment) -> Result {
    eval_all(PRELUDE, "prelude", env)
}

/// An environment with every built-in library and the prelude loaded.
pub fn standard_environment() -> Result<Environment> {
    let mut env = Environment::default();
    core::add_core(&mut env);
    math::add_math(&mut env);
    add_env(&mut env);
    read_prelude(&mut env)?;
    Ok(env)
}

pub fn eval_str(src: &str) -> Result {
    let mut env = standard_environment()?;
    eval_all(src, "eval_str", &mut env)
}
