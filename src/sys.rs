//! System functions and the backends that run them
//!
//! System functions are called with `&name` syntax. Each one is registered
//! in a [`SysRegistry`] with a fixed signature. Handlers never touch the
//! outside world directly; they go through a [`SysBackend`].

mod native;

use std::{any::Any, collections::VecDeque, fmt, sync::Arc};

use indexmap::IndexMap;
use parking_lot::Mutex;

pub use native::NativeSys;

use crate::{Ident, Signature, SysLookup, Value};

/// The function that implements a system function
///
/// Arguments are given with the value that was on top of the stack first.
/// Outputs are pushed in order, so the last output ends up on top.
pub type SysHandler =
    Arc<dyn Fn(&dyn SysBackend, Vec<Value>) -> Result<Vec<Value>, String> + Send + Sync>;

/// A registered system function
#[derive(Clone)]
pub struct SysFn {
    /// The name, without the `&`
    pub name: Ident,
    /// The number of values the function pops
    pub args: usize,
    /// The number of values the function pushes
    pub outputs: usize,
    /// Whether the function interacts with the outside world
    pub effects: bool,
    /// The implementation
    pub handler: SysHandler,
}

impl SysFn {
    /// Create a new system function
    pub fn new<F>(name: impl Into<Ident>, args: usize, outputs: usize, handler: F) -> Self
    where
        F: Fn(&dyn SysBackend, Vec<Value>) -> Result<Vec<Value>, String> + Send + Sync + 'static,
    {
        SysFn {
            name: name.into(),
            args,
            outputs,
            effects: true,
            handler: Arc::new(handler),
        }
    }
    /// Mark the function as pure
    pub fn pure(mut self) -> Self {
        self.effects = false;
        self
    }
    /// Get the function's signature
    pub fn sig(&self) -> Signature {
        Signature::new(self.args, self.outputs)
    }
}

impl fmt::Debug for SysFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SysFn")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("outputs", &self.outputs)
            .field("effects", &self.effects)
            .finish()
    }
}

/// The table of system functions available to a program
///
/// The same registry should be used to compile and to run a program, since
/// the compiler checks system function signatures against it.
#[derive(Clone)]
pub struct SysRegistry {
    functions: IndexMap<Ident, SysFn>,
    backend: Arc<dyn SysBackend>,
}

impl Default for SysRegistry {
    fn default() -> Self {
        Self::with_builtins(NativeSys)
    }
}

impl fmt::Debug for SysRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.functions.keys()).finish()
    }
}

impl SysRegistry {
    /// Create a registry with no functions
    pub fn new(backend: impl SysBackend) -> Self {
        SysRegistry {
            functions: IndexMap::new(),
            backend: Arc::new(backend),
        }
    }
    /// Create a registry with the built-in system functions
    pub fn with_builtins(backend: impl SysBackend) -> Self {
        let mut registry = Self::new(backend);
        for sys in builtins() {
            registry.register(sys);
        }
        registry
    }
    /// Register a system function
    ///
    /// A function with the same name is replaced.
    pub fn register(&mut self, sys: SysFn) {
        tracing::trace!(name = %sys.name, args = sys.args, outputs = sys.outputs, "registered system function");
        self.functions.insert(sys.name.clone(), sys);
    }
    /// Get a system function by name
    pub fn get(&self, name: &str) -> Option<&SysFn> {
        self.functions.get(name)
    }
    /// Iterate over the registered functions
    pub fn iter(&self) -> impl Iterator<Item = &SysFn> {
        self.functions.values()
    }
    /// Get the backend
    pub fn backend(&self) -> &dyn SysBackend {
        &*self.backend
    }
    /// Get the backend as a concrete type
    pub fn downcast_backend<T: SysBackend>(&self) -> Option<&T> {
        self.backend.any().downcast_ref()
    }
}

impl SysLookup for SysRegistry {
    fn sys_sig(&self, name: &str) -> Option<Signature> {
        self.get(name).map(SysFn::sig)
    }
}

fn builtins() -> Vec<SysFn> {
    vec![
        SysFn::new("p", 1, 0, |backend, args| {
            for value in args {
                let s = value.as_string().unwrap_or_else(|| value.to_string());
                backend.print_str_stdout(&format!("{s}\n"))?;
            }
            Ok(Vec::new())
        }),
        SysFn::new("pf", 1, 0, |backend, args| {
            for value in args {
                let s = value.as_string().unwrap_or_else(|| value.to_string());
                backend.print_str_stdout(&s)?;
            }
            Ok(Vec::new())
        }),
        SysFn::new("sc", 0, 1, |backend, _| {
            let line = backend.scan_line_stdin()?.unwrap_or_default();
            Ok(vec![Value::from(line)])
        }),
        SysFn::new("clock", 0, 1, |backend, _| Ok(vec![Value::from(backend.now())])),
    ]
}

/// Access to the outside world for system functions
///
/// Every method has a default implementation that fails, so a backend only
/// implements what its environment supports.
#[allow(unused_variables)]
pub trait SysBackend: Any + Send + Sync + 'static {
    /// Cast the backend to `&dyn Any`
    fn any(&self) -> &dyn Any;
    /// Print a string (without a newline) to stdout
    fn print_str_stdout(&self, s: &str) -> Result<(), String> {
        Err("Printing to stdout is not supported in this environment".into())
    }
    /// Read a line from stdin
    ///
    /// Should return `Ok(None)` if EOF is reached.
    fn scan_line_stdin(&self) -> Result<Option<String>, String> {
        Err("Reading from stdin is not supported in this environment".into())
    }
    /// The current time in seconds since the Unix epoch
    fn now(&self) -> f64 {
        0.0
    }
}

/// A system backend that never touches the real world
///
/// Output is collected in a buffer and input is read from queued lines.
#[derive(Default, Clone)]
pub struct SafeSys {
    stdout: Arc<Mutex<String>>,
    stdin: Arc<Mutex<VecDeque<String>>>,
}

impl SafeSys {
    /// Create a new safe backend
    pub fn new() -> Self {
        Self::default()
    }
    /// Create a safe backend that reads the given lines as input
    pub fn with_input<I>(lines: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let sys = Self::default();
        sys.stdin.lock().extend(lines.into_iter().map(Into::into));
        sys
    }
    /// Take everything written to stdout so far
    pub fn take_stdout(&self) -> String {
        std::mem::take(&mut *self.stdout.lock())
    }
}

impl SysBackend for SafeSys {
    fn any(&self) -> &dyn Any {
        self
    }
    fn print_str_stdout(&self, s: &str) -> Result<(), String> {
        self.stdout.lock().push_str(s);
        Ok(())
    }
    fn scan_line_stdin(&self) -> Result<Option<String>, String> {
        Ok(self.stdin.lock().pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = SysRegistry::with_builtins(SafeSys::new());
        assert_eq!(registry.sys_sig("p"), Some(Signature::new(1, 0)));
        assert_eq!(registry.sys_sig("sc"), Some(Signature::new(0, 1)));
        assert_eq!(registry.sys_sig("nope"), None);
    }

    #[test]
    fn safe_backend_buffers_io() {
        let sys = SafeSys::with_input(["hello"]);
        let registry = SysRegistry::with_builtins(sys.clone());
        let scan = registry.get("sc").unwrap();
        let out = (scan.handler)(registry.backend(), Vec::new()).unwrap();
        assert_eq!(out, vec![Value::from("hello")]);
        let out = (scan.handler)(registry.backend(), Vec::new()).unwrap();
        assert_eq!(out, vec![Value::from("")]);

        let print = registry.get("p").unwrap();
        (print.handler)(registry.backend(), vec![Value::from(3i64)]).unwrap();
        assert_eq!(sys.take_stdout(), "3\n");
        assert!(registry.downcast_backend::<SafeSys>().is_some());
    }

    #[test]
    fn registering_replaces() {
        let mut registry = SysRegistry::new(SafeSys::new());
        registry.register(SysFn::new("twice", 1, 2, |_, args| Ok([args.clone(), args].concat())).pure());
        assert!(!registry.get("twice").unwrap().effects);
        registry.register(SysFn::new("twice", 1, 1, |_, args| Ok(args)));
        assert_eq!(registry.sys_sig("twice"), Some(Signature::new(1, 1)));
        assert_eq!(registry.iter().count(), 1);
    }
}
