use crate::evaluator::{self, Error};
use crate::types::{Symbol, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

pub type Scope = HashMap<String, Value>;
type Table = HashMap<String, Value>;

/// Runs once, the first time its namespace is required.
pub type ModuleInit = fn(&mut Environment, &str);

/// Bindings that outlive every call frame: one table per namespace, the
/// alias tables, and the internal table used when no namespace is current.
#[derive(Debug, Default)]
pub struct Namespaces {
    tables: HashMap<String, Table>,
    aliases: HashMap<String, HashMap<String, String>>,
    internal: Table,
    current: Option<String>,
    pending: HashMap<String, ModuleInit>,
}

impl Namespaces {
    fn current_key(&self) -> &str {
        self.current.as_deref().unwrap_or("")
    }
}

pub struct ModuleMember<'a> {
    pub name: &'a str,
    pub member: Value,
}

pub struct Module<'e> {
    env: &'e mut Environment,
    ns: String,
}

impl Module<'_> {
    pub fn add_members(&mut self, members: Vec<ModuleMember>) -> &mut Self {
        for ModuleMember { name, member } in members {
            self.env
                .set_internal(&format!("{}/{}", self.ns, name), member);
        }
        self
    }
}

/// Lexical frames over shared namespace state. Each frame is a stack of
/// scopes; only the top frame is visible to symbol lookup.
pub struct Environment {
    namespaces: Rc<RefCell<Namespaces>>,
    frames: Vec<Vec<Scope>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::with_namespaces(Rc::new(RefCell::new(Namespaces::default())))
    }
}

impl Environment {
    pub fn with_namespaces(namespaces: Rc<RefCell<Namespaces>>) -> Self {
        Self {
            namespaces,
            frames: vec![Vec::new()],
        }
    }

    pub(crate) fn namespaces_handle(&self) -> Weak<RefCell<Namespaces>> {
        Rc::downgrade(&self.namespaces)
    }

    pub fn eval(&mut self, form: &Value) -> evaluator::Result {
        evaluator::eval(form, self)
    }

    fn top_frame(&self) -> &[Scope] {
        self.frames.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lex_resolve(&self, name: &str) -> Option<Value> {
        self.top_frame()
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    /// Looks a symbol up: `ns/name` through the alias and namespace tables,
    /// otherwise the lexical scopes, then the current namespace, then the
    /// internal table.
    pub fn resolve(&self, symbol: &Symbol) -> evaluator::Result {
        let namespaces = self.namespaces.borrow();
        match symbol.split_ns() {
            (Some(prefix), name) => {
                let ns = namespaces
                    .aliases
                    .get(namespaces.current_key())
                    .and_then(|aliases| aliases.get(prefix))
                    .map(String::as_str)
                    .unwrap_or(prefix);
                let table = namespaces
                    .tables
                    .get(ns)
                    .ok_or_else(|| Error::UnknownNamespace(ns.to_string(), symbol.clone()))?;
                table
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::UnknownSymbol(symbol.clone()))
            }
            (None, name) => {
                if let Some(value) = self.lex_resolve(name) {
                    return Ok(value);
                }
                let in_current = namespaces
                    .current
                    .as_ref()
                    .and_then(|ns| namespaces.tables.get(ns))
                    .and_then(|table| table.get(name));
                in_current
                    .or_else(|| namespaces.internal.get(name))
                    .cloned()
                    .ok_or_else(|| Error::UnknownSymbol(symbol.clone()))
            }
        }
    }

    /// Writes a global binding: `ns/name` into that namespace, a bare name
    /// into the current namespace or, with none current, the internal table.
    pub fn set_internal(&mut self, name: &str, value: Value) {
        let symbol = Symbol::new(name);
        let mut namespaces = self.namespaces.borrow_mut();
        let (ns, name) = match symbol.split_ns() {
            (Some(ns), name) => (Some(ns.to_string()), name),
            (None, name) => (namespaces.current.clone(), name),
        };
        match ns {
            Some(ns) => namespaces
                .tables
                .entry(ns)
                .or_default()
                .insert(name.to_string(), value),
            None => namespaces.internal.insert(name.to_string(), value),
        };
    }

    /// Binds in the innermost scope of the current frame.
    pub fn bind(&mut self, name: &str, value: Value) -> evaluator::Result<()> {
        match self.frames.last_mut().and_then(|frame| frame.last_mut()) {
            Some(scope) => {
                scope.insert(name.to_string(), value);
                Ok(())
            }
            None => Err(Error::NoScope(name.to_string())),
        }
    }

    pub fn push_scope(&mut self) {
        match self.frames.last_mut() {
            Some(frame) => frame.push(Scope::new()),
            None => self.frames.push(vec![Scope::new()]),
        }
    }

    pub fn pop_scope(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pop();
        }
    }

    pub fn push_frame(&mut self, scope: Scope) {
        self.frames.push(vec![scope]);
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Runs `f` inside a fresh scope, popping it afterwards whether or not
    /// `f` succeeded.
    pub fn with_scope<T, F>(&mut self, f: F) -> evaluator::Result<T>
    where
        F: FnOnce(&mut Self) -> evaluator::Result<T>,
    {
        self.push_scope();
        let result = f(self);
        self.pop_scope();
        result
    }

    /// Runs `f` in a new frame whose only scope is `scope`.
    pub fn with_frame<T, F>(&mut self, scope: Scope, f: F) -> evaluator::Result<T>
    where
        F: FnOnce(&mut Self) -> evaluator::Result<T>,
    {
        self.push_frame(scope);
        let result = f(self);
        self.pop_frame();
        result
    }

    pub fn register_module(&mut self, ns: &str, init: ModuleInit) {
        log::debug!("register module {}", ns);
        self.namespaces
            .borrow_mut()
            .pending
            .insert(ns.to_string(), init);
    }

    /// Runs a registered initializer if `ns` has one still pending.
    pub(crate) fn load_module(&mut self, ns: &str) {
        let init = self.namespaces.borrow_mut().pending.remove(ns);
        if let Some(init) = init {
            log::debug!("initialize module {}", ns);
            init(self, ns);
        }
    }

    pub fn create_module(&mut self, ns: &str) -> Module<'_> {
        self.namespaces
            .borrow_mut()
            .tables
            .insert(ns.to_string(), Table::new());
        Module {
            env: self,
            ns: ns.to_string(),
        }
    }

    pub fn has_module(&self, ns: &str) -> bool {
        let namespaces = self.namespaces.borrow();
        namespaces.tables.contains_key(ns) || namespaces.pending.contains_key(ns)
    }

    pub fn curr_ns(&self) -> Option<String> {
        self.namespaces.borrow().current.clone()
    }

    pub fn set_curr_ns(&mut self, ns: Option<&str>) {
        log::debug!("switch to namespace {:?}", ns);
        let mut namespaces = self.namespaces.borrow_mut();
        if let Some(ns) = ns {
            namespaces.tables.entry(ns.to_string()).or_default();
        }
        namespaces.current = ns.map(str::to_string);
    }

    /// Makes `alias/x` mean `target/x` within the current namespace.
    pub fn alias_ns(&mut self, alias: &str, target: &str) {
        let mut namespaces = self.namespaces.borrow_mut();
        let current = namespaces.current_key().to_string();
        namespaces
            .aliases
            .entry(current)
            .or_default()
            .insert(alias.to_string(), target.to_string());
    }
}
