use crate::environment::Environment;
use crate::evaluator::{Error, Result};
use crate::types::Value;
use std::fmt;

#[derive(Debug)]
pub enum DestructureError {
    NotASequence(Value),
    UnexpectedPattern(Value),
    MissingTarget(&'static str),
}

impl fmt::Display for DestructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestructureError::NotASequence(value) => {
                write!(f, "cannot destructure {} as a sequence", value)
            }
            DestructureError::UnexpectedPattern(pattern) => {
                write!(f, "unexpected type for destructure binding: {}", pattern)
            }
            DestructureError::MissingTarget(marker) => {
                write!(f, "expected a binding after {}", marker)
            }
        }
    }
}

/// Binds the names in `pattern` to the matching parts of `value` in the
/// innermost scope of `env`.
pub fn destructure(pattern: &Value, value: &Value, env: &mut Environment) -> Result<()> {
    match pattern {
        Value::Symbol(name) => env.bind(name, value.clone()),
        Value::Vector(patterns) => destructure_sequential(patterns, value, env),
        _ => Err(Error::Destructure(DestructureError::UnexpectedPattern(
            pattern.clone(),
        ))),
    }
}

fn destructure_sequential(patterns: &[Value], value: &Value, env: &mut Environment) -> Result<()> {
    if !value.is_sequential() {
        return Err(Error::Destructure(DestructureError::NotASequence(
            value.clone(),
        )));
    }
    let mut values = value.seq_iter()?;
    let mut patterns = patterns.iter();
    while let Some(pattern) = patterns.next() {
        match pattern {
            Value::Symbol(s) if s.as_str() == "&" => {
                let target = patterns
                    .next()
                    .ok_or(Error::Destructure(DestructureError::MissingTarget("&")))?;
                let rest = values.by_ref().collect::<Result<Vec<_>>>()?;
                destructure(target, &Value::wrap_vector(rest), env)?;
            }
            Value::Keyword(k) if k == ":as" => {
                let target = patterns
                    .next()
                    .ok_or(Error::Destructure(DestructureError::MissingTarget(":as")))?;
                destructure(target, value, env)?;
            }
            _ => {
                let next = values.next().transpose()?.unwrap_or(Value::Nil);
                destructure(pattern, &next, env)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_str;

    fn bind(pattern: &str, value: &str) -> Result<Environment> {
        let mut env = Environment::default();
        env.push_scope();
        destructure(&read_str(pattern)?, &read_str(value)?, &mut env)?;
        Ok(env)
    }

    fn bound(env: &Environment, name: &str) -> String {
        match env.lex_resolve(name) {
            Some(v) => v.to_string(),
            None => panic!("{} is not bound", name),
        }
    }

    #[test]
    fn rest_and_as() {
        let env = bind("[a b & c :as v]", "[5 6 7 8 9 10]").unwrap();
        assert_eq!(bound(&env, "a"), "5");
        assert_eq!(bound(&env, "b"), "6");
        assert_eq!(bound(&env, "c"), "[7 8 9 10]");
        assert_eq!(bound(&env, "v"), "[5 6 7 8 9 10]");
    }

    #[test]
    fn nested_patterns() {
        let env = bind("[[x y] z]", "((1 2) 3)").unwrap();
        assert_eq!(bound(&env, "x"), "1");
        assert_eq!(bound(&env, "y"), "2");
        assert_eq!(bound(&env, "z"), "3");
    }

    #[test]
    fn under_supply_binds_nil() {
        let env = bind("[x y & more]", "[9]").unwrap();
        assert_eq!(bound(&env, "x"), "9");
        assert_eq!(bound(&env, "y"), "nil");
        assert_eq!(bound(&env, "more"), "[]");
    }

    #[test]
    fn values_must_be_sequential() {
        for value in &["{:a 1}", "nil", "3"] {
            match bind("[a]", value) {
                Err(Error::Destructure(DestructureError::NotASequence(_))) => (),
                v => panic!("unexpected result: {:?}", v.map(|_| ())),
            }
        }
    }

    #[test]
    fn bad_patterns() {
        match bind("{a :a}", "{:a 1}") {
            Err(Error::Destructure(DestructureError::UnexpectedPattern(_))) => (),
            v => panic!("unexpected result: {:?}", v.map(|_| ())),
        }
        match bind("[a &]", "[1 2]") {
            Err(Error::Destructure(DestructureError::MissingTarget("&"))) => (),
            v => panic!("unexpected result: {:?}", v.map(|_| ())),
        }
    }

    #[test]
    fn needs_a_scope() {
        let mut env = Environment::default();
        match destructure(&Value::new_symbol("x"), &Value::Nil, &mut env) {
            Err(Error::NoScope(_)) => (),
            v => panic!("unexpected result: {:?}", v),
        }
    }
}
