use crate::destructure::destructure;
use crate::environment::{Environment, Scope};
use crate::evaluator::{pretty_print_args, Args, Error, Result};
use crate::types::{truthy, Arity, Callable, SpecialForm, Value, Vector};
use itertools::Itertools;
use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
pub enum DefError {
    NameNotASymbol(Value),
}

impl fmt::Display for DefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefError::NameNotASymbol(v) => write!(f, "expected a symbol to define, got {}", v),
        }
    }
}

#[derive(Debug)]
pub enum LetError {
    BindingsNotAVector(Value),
    BindingsOddLength(usize),
}

impl fmt::Display for LetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LetError::BindingsNotAVector(v) => write!(f, "bindings must be a vector, got {}", v),
            LetError::BindingsOddLength(n) => {
                write!(f, "bindings need an even number of forms, got {}", n)
            }
        }
    }
}

#[derive(Debug)]
pub enum FnError {
    ParametersNotAVector(Value),
    MissingBinding(&'static str),
}

impl fmt::Display for FnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FnError::ParametersNotAVector(v) => {
                write!(f, "parameters must be a vector, got {}", v)
            }
            FnError::MissingBinding(marker) => {
                write!(f, "expected a parameter after {}", marker)
            }
        }
    }
}

#[derive(Debug)]
pub enum RequireError {
    UnknownModule(String),
    BadSpec(Value),
}

impl fmt::Display for RequireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequireError::UnknownModule(ns) => write!(f, "no module named {}", ns),
            RequireError::BadSpec(v) => write!(
                f,
                "expected a namespace symbol or [ns :as alias], got {}",
                v
            ),
        }
    }
}

/// A user function. Free symbols with a lexical binding are copied into
/// `captured` when the closure is made; everything else is looked up at
/// call time.
#[derive(Clone)]
pub struct Closure {
    name: String,
    arity: Arity,
    parameters: Rc<Vector>,
    body: Rc<[Value]>,
    captured: Scope,
    binds_self: bool,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "closure #<{}>", self.name)
    }
}

impl Closure {
    pub fn new(
        env: &Environment,
        name: Option<&str>,
        parameters: Rc<Vector>,
        body: Vec<Value>,
    ) -> Result<Self> {
        let arity = arity_of(&parameters)?;
        let mut captured = Scope::new();
        for form in body.iter() {
            capture(form, env, &mut captured);
        }
        log::trace!(
            "Closure {} captured {}",
            name.unwrap_or("fn"),
            captured.keys().join(", ")
        );
        Ok(Self {
            name: name.unwrap_or("fn").to_string(),
            arity,
            parameters,
            body: body.into(),
            captured,
            binds_self: false,
        })
    }
}

fn arity_of(parameters: &[Value]) -> Result<Arity> {
    let mut positional = 0;
    let mut parameters = parameters.iter();
    while let Some(parameter) = parameters.next() {
        match parameter {
            Value::Symbol(s) if s.as_str() == "&" => {
                return match parameters.next() {
                    Some(_) => Ok(Arity::at_least(positional)),
                    None => Err(Error::Fn(FnError::MissingBinding("&"))),
                }
            }
            Value::Keyword(k) if k == ":as" => {
                parameters
                    .next()
                    .ok_or(Error::Fn(FnError::MissingBinding(":as")))?;
            }
            _ => positional += 1,
        }
    }
    Ok(Arity::exactly(positional))
}

fn capture(form: &Value, env: &Environment, captured: &mut Scope) {
    match form {
        Value::Symbol(s) => {
            if let Some(value) = env.lex_resolve(s) {
                captured.insert(s.to_string(), value);
            }
        }
        Value::List(forms) => forms.iter().for_each(|f| capture(f, env, captured)),
        Value::Vector(forms) => forms.iter().for_each(|f| capture(f, env, captured)),
        Value::Map(map) => {
            for (key, value) in map.iter() {
                capture(key, env, captured);
                capture(value, env, captured);
            }
        }
        _ => (),
    }
}

impl Callable for Closure {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, env: &mut Environment, args: Args) -> Result {
        let values = args.into_values(env)?;
        self.arity
            .validate_for(values.len(), &self.name)
            .map_err(Error::BadArgCount)?;
        log::trace!("Call {} with {}", self.name, pretty_print_args(&values));
        let mut scope = self.captured.clone();
        if self.binds_self {
            scope.insert(self.name.clone(), Value::wrap_callable(self.clone()));
        }
        let parameters = Value::Vector(self.parameters.clone());
        env.with_frame(scope, |env| {
            destructure(&parameters, &Value::wrap_vector(values), env)?;
            Args::unevaluated(&self.body).eval_rest(env)
        })
    }
}

pub(crate) const IF: SpecialForm = SpecialForm {
    name: "if",
    fn_ptr: if_,
};

fn if_(env: &mut Environment, mut args: Args) -> Result {
    let test = args.required_value(env, "if", 0)?;
    let then = args.required_form("if", 1)?;
    if truthy(&test) {
        args.evaluate(then, env)
    } else {
        match args.next_form() {
            Some(otherwise) => args.evaluate(otherwise, env),
            None => Ok(Value::Nil),
        }
    }
}

pub(crate) const WHEN: SpecialForm = SpecialForm {
    name: "when",
    fn_ptr: when_,
};

fn when_(env: &mut Environment, mut args: Args) -> Result {
    let test = args.required_value(env, "when", 0)?;
    match truthy(&test) {
        true => args.eval_rest(env),
        false => Ok(Value::Nil),
    }
}

pub(crate) const QUOTE: SpecialForm = SpecialForm {
    name: "quote",
    fn_ptr: quote_,
};

fn quote_(_env: &mut Environment, mut args: Args) -> Result {
    args.required_form("quote", 0).map(Value::clone)
}

pub(crate) const DEF: SpecialForm = SpecialForm {
    name: "def",
    fn_ptr: def_,
};

fn def_(env: &mut Environment, mut args: Args) -> Result {
    let name = args.required_form("def", 0)?;
    let symbol = name
        .as_symbol()
        .map_err(|_| Error::Def(DefError::NameNotASymbol(name.clone())))?;
    let value = args.required_value(env, "def", 1)?;
    log::debug!("define {} as {}", symbol, value);
    env.set_internal(symbol, value);
    Ok(name.clone())
}

pub(crate) const DO: SpecialForm = SpecialForm {
    name: "do",
    fn_ptr: do_,
};

fn do_(env: &mut Environment, args: Args) -> Result {
    args.eval_rest(env)
}

pub(crate) const LET: SpecialForm = SpecialForm {
    name: "let",
    fn_ptr: let_,
};

fn let_(env: &mut Environment, mut args: Args) -> Result {
    let bindings = args.required_form("let", 0)?;
    let bindings = bindings
        .as_vector()
        .map_err(|_| Error::Let(LetError::BindingsNotAVector(bindings.clone())))?;
    if bindings.len() % 2 != 0 {
        return Err(Error::Let(LetError::BindingsOddLength(bindings.len())));
    }
    env.with_scope(move |env| {
        // Each value sees the bindings made before it.
        for (pattern, form) in bindings.iter().tuples() {
            let value = args.evaluate(form, env)?;
            destructure(pattern, &value, env)?;
        }
        args.eval_rest(env)
    })
}

fn make_closure(
    env: &Environment,
    form: &str,
    name: Option<&str>,
    args: &mut Args,
) -> Result<Closure> {
    let parameters = match args.required_form(form, 0)? {
        Value::Vector(parameters) => parameters.clone(),
        other => return Err(Error::Fn(FnError::ParametersNotAVector(other.clone()))),
    };
    Closure::new(env, name, parameters, args.remaining().to_vec())
}

pub(crate) const FN: SpecialForm = SpecialForm {
    name: "fn",
    fn_ptr: fn_,
};

fn fn_(env: &mut Environment, mut args: Args) -> Result {
    let name = match args.remaining().first() {
        Some(Value::Symbol(name)) => {
            args.next_form();
            Some(name.as_str())
        }
        _ => None,
    };
    let mut closure = make_closure(env, "fn", name, &mut args)?;
    closure.binds_self = name.is_some();
    Ok(Value::wrap_callable(closure))
}

pub(crate) const DEFN: SpecialForm = SpecialForm {
    name: "defn",
    fn_ptr: defn_,
};

fn defn_(env: &mut Environment, mut args: Args) -> Result {
    let name = args.required_form("defn", 0)?;
    let symbol = name
        .as_symbol()
        .map_err(|_| Error::Def(DefError::NameNotASymbol(name.clone())))?;
    // Doc string, unless it is the only thing left.
    if let [Value::String(_), _, ..] = args.remaining() {
        args.next_form();
    }
    let closure = make_closure(env, "defn", Some(symbol.as_str()), &mut args)?;
    log::debug!("define {} as {:?}", symbol, closure);
    env.set_internal(symbol, Value::wrap_callable(closure));
    Ok(name.clone())
}

pub(crate) const ASSERT: SpecialForm = SpecialForm {
    name: "assert",
    fn_ptr: assert_,
};

fn assert_(env: &mut Environment, mut args: Args) -> Result {
    let form = args.required_form("assert", 0)?;
    if truthy(&args.evaluate(form, env)?) {
        return Ok(Value::Nil);
    }
    let message = args.next_value(env).transpose()?;
    Err(Error::AssertFailed {
        form: form.clone(),
        message,
    })
}

pub(crate) const COMMENT: SpecialForm = SpecialForm {
    name: "comment",
    fn_ptr: |_env, _args| Ok(Value::Nil),
};

pub(crate) const NS: SpecialForm = SpecialForm {
    name: "ns",
    fn_ptr: ns_,
};

fn ns_(env: &mut Environment, mut args: Args) -> Result {
    let name = args.required_form("ns", 0)?.as_symbol()?;
    env.set_curr_ns(Some(name.as_str()));
    Ok(Value::Nil)
}

pub(crate) const REQUIRE: SpecialForm = SpecialForm {
    name: "require",
    fn_ptr: require_,
};

fn require_(env: &mut Environment, mut args: Args) -> Result {
    while let Some(spec) = args.next_value(env) {
        let spec = spec?;
        let (ns, alias) = match &spec {
            Value::Symbol(ns) => (ns.to_string(), None),
            Value::Vector(parts) => match parts.as_slice() {
                [Value::Symbol(ns), Value::Keyword(k), Value::Symbol(alias)] if k == ":as" => {
                    (ns.to_string(), Some(alias.to_string()))
                }
                _ => return Err(Error::Require(RequireError::BadSpec(spec.clone()))),
            },
            _ => return Err(Error::Require(RequireError::BadSpec(spec.clone()))),
        };
        if !env.has_module(&ns) {
            return Err(Error::Require(RequireError::UnknownModule(ns)));
        }
        env.load_module(&ns);
        if let Some(alias) = alias {
            env.alias_ns(&alias, &ns);
        }
    }
    Ok(Value::Nil)
}

pub(crate) const EQUAL: SpecialForm = SpecialForm {
    name: "=",
    fn_ptr: |env, args| compare_with_first(env, args, "=", true),
};

pub(crate) const NOT_EQUAL: SpecialForm = SpecialForm {
    name: "not=",
    fn_ptr: |env, args| compare_with_first(env, args, "not=", false),
};

/// Compares the first argument against each later one, stopping at the
/// first comparison whose outcome differs from `want_equal`.
fn compare_with_first(
    env: &mut Environment,
    mut args: Args,
    name: &str,
    want_equal: bool,
) -> Result {
    let first = args.required_value(env, name, 0)?;
    args.remaining()
        .first()
        .ok_or_else(|| Error::MissingArgument {
            name: name.to_string(),
            position: 1,
        })?;
    while let Some(other) = args.next_value(env) {
        if first.try_eq(&other?)? != want_equal {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub(crate) const AND: SpecialForm = SpecialForm {
    name: "and",
    fn_ptr: and_,
};

fn and_(env: &mut Environment, mut args: Args) -> Result {
    let mut last = Value::Bool(true);
    while let Some(value) = args.next_value(env) {
        last = value?;
        if !truthy(&last) {
            break;
        }
    }
    Ok(last)
}

pub(crate) const OR: SpecialForm = SpecialForm {
    name: "or",
    fn_ptr: or_,
};

fn or_(env: &mut Environment, mut args: Args) -> Result {
    let mut last = Value::Nil;
    while let Some(value) = args.next_value(env) {
        last = value?;
        if truthy(&last) {
            break;
        }
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::eval_str;

    fn assert_truthy(src: &str) {
        match eval_str(src) {
            Ok(v) => assert!(truthy(&v), "{} gave {}", src, v),
            v => panic!("unexpected result: {:?}", v),
        }
    }

    #[test]
    fn closure_arity() {
        let params = |src: &str| match crate::reader::read_str(src) {
            Ok(Value::Vector(v)) => arity_of(&v),
            v => panic!("unexpected result: {:?}", v),
        };
        assert!(params("[a b]").unwrap().contains(2));
        assert!(!params("[a b]").unwrap().contains(3));
        assert!(params("[a & more]").unwrap().contains(1));
        assert!(params("[a & more]").unwrap().contains(9));
        assert!(params("[[a b] :as all]").unwrap().contains(1));
        assert!(params("[a &]").is_err());
    }

    #[test]
    fn captures_snapshot_of_lexical_scope() {
        assert_truthy(
            r#"
            (def f (let [x 1] (fn [] x)))
            (def x 2)
            (= (f) 1)
            "#,
        );
    }

    #[test]
    fn globals_resolve_at_call_time() {
        assert_truthy(
            r#"
            (defn g [] y)
            (def y 5)
            (= (g) 5)
            "#,
        );
    }

    #[test]
    fn named_fn_can_recurse() {
        assert_truthy(
            r#"
            (let [countdown (fn down [n] (if (= n 0) :done (down (dec n))))]
              (= (countdown 3) :done))
            "#,
        );
    }

    #[test]
    fn defn_with_docstring() {
        assert_truthy(
            r#"
            (defn twice "Doubles its argument." [x] (+ x x))
            (= (twice 4) 8)
            "#,
        );
    }

    #[test]
    fn defn_returning_a_string() {
        assert_truthy(r#"(defn s [] "body") (= (s) "body")"#);
    }

    #[test]
    fn assert_reports_form() {
        match eval_str("(assert (= 1 2) (str \"one is \" 1))") {
            Err(crate::interpreter::Error::Eval(Error::AssertFailed {
                form,
                message: Some(message),
            })) => {
                assert_eq!(form.to_string(), "(= 1 2)");
                assert_eq!(message, Value::String("one is 1".into()));
            }
            v => panic!("unexpected result: {:?}", v),
        }
    }

    #[test]
    fn let_needs_even_vector() {
        match eval_str("(let [a] a)") {
            Err(crate::interpreter::Error::Eval(Error::Let(LetError::BindingsOddLength(1)))) => (),
            v => panic!("unexpected result: {:?}", v),
        }
        match eval_str("(let (a 1) a)") {
            Err(crate::interpreter::Error::Eval(Error::Let(LetError::BindingsNotAVector(_)))) => {}
            v => panic!("unexpected result: {:?}", v),
        }
    }

    #[test]
    fn require_unknown_module() {
        match eval_str("(require 'no.such.module)") {
            Err(crate::interpreter::Error::Eval(Error::Require(RequireError::UnknownModule(
                ns,
            )))) => assert_eq!(ns, "no.such.module"),
            v => panic!("unexpected result: {:?}", v),
        }
    }
}
