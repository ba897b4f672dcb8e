//! Session state owned by one runner: variables, visited nodes, and the
//! function registry.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::runner::RunError;
use crate::value::Value;

/// Name of the builtin that reports whether a node has been entered.
pub const VISITED_FUNCTION: &str = "visited";

/// Backing store for dialogue variables. Names carry no `$` sigil.
pub trait VariableStorage {
    fn get(&self, name: &str) -> Option<Value>;
    fn set(&mut self, name: &str, value: Value);
}

/// Default in-memory variable storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryVariableStorage {
    values: HashMap<String, Value>,
}

impl MemoryVariableStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl VariableStorage for MemoryVariableStorage {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }
}

/// Shared handle, so the host can keep reading a storage it handed over.
impl<T: VariableStorage> VariableStorage for Rc<RefCell<T>> {
    fn get(&self, name: &str) -> Option<Value> {
        self.borrow().get(name)
    }

    fn set(&mut self, name: &str, value: Value) {
        self.borrow_mut().set(name, value);
    }
}

/// Host-defined function callable from expressions.
pub type HostFunction = Box<dyn FnMut(&[Value]) -> Value>;

enum Function {
    Visited,
    Host(HostFunction),
}

/// Registry of callable functions, pre-populated with `visited`.
pub struct Functions {
    entries: HashMap<String, Function>,
}

impl Default for Functions {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(VISITED_FUNCTION.to_string(), Function::Visited);
        Self { entries }
    }
}

impl fmt::Debug for Functions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("Functions").field("names", &names).finish()
    }
}

impl Functions {
    /// Register or replace a function.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        function: impl FnMut(&[Value]) -> Value + 'static,
    ) {
        self.entries
            .insert(name.into(), Function::Host(Box::new(function)));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn call(
        &mut self,
        name: &str,
        args: &[Value],
        visited: &HashSet<String>,
        line: usize,
    ) -> Result<Value, RunError> {
        match self.entries.get_mut(name) {
            Some(Function::Visited) => match args {
                [title] => Ok(Value::Bool(visited.contains(&title.to_string()))),
                _ => Err(RunError::InvalidArguments {
                    function: name.to_string(),
                    expected: 1,
                    found: args.len(),
                    line,
                }),
            },
            Some(Function::Host(function)) => Ok(function(args)),
            None => Err(RunError::UnknownFunction {
                name: name.to_string(),
                line,
            }),
        }
    }
}

/// Everything a runner keeps across `run` calls.
pub struct Session {
    variables: Box<dyn VariableStorage>,
    visited: HashSet<String>,
    functions: Functions,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            variables: Box::new(MemoryVariableStorage::new()),
            visited: HashSet::new(),
            functions: Functions::default(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("visited", &self.visited)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn variables(&self) -> &dyn VariableStorage {
        self.variables.as_ref()
    }

    pub fn set_variables(&mut self, storage: impl VariableStorage + 'static) {
        self.variables = Box::new(storage);
    }

    pub fn functions_mut(&mut self) -> &mut Functions {
        &mut self.functions
    }

    #[must_use]
    pub fn has_visited(&self, title: &str) -> bool {
        self.visited.contains(title)
    }

    pub(crate) fn mark_visited(&mut self, title: &str) {
        self.visited.insert(title.to_string());
    }

    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        self.variables.get(name)
    }

    pub(crate) fn set(&mut self, name: &str, value: Value) {
        self.variables.set(name, value);
    }

    pub(crate) fn call(
        &mut self,
        name: &str,
        args: &[Value],
        line: usize,
    ) -> Result<Value, RunError> {
        self.functions.call(name, args, &self.visited, line)
    }
}
