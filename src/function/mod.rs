//! Function values and the two-level function registry (spec.md §4.6/§4.9).

pub mod core_builtins;

use std::fmt::{self, Display};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::DanaResult;
use crate::interpreter::Interpreter;
use crate::parser::ast::{FunctionDefinition, Param};
use crate::types::Value;

/// A function defined in DANA source: parameters, body AST, and the
/// module-private context it closed over at definition time (spec.md §3
/// "Function values").
#[derive(Debug, Clone)]
pub struct DanaFunction {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    pub body: Arc<Vec<crate::parser::ast::Statement>>,
    /// The module this function was defined in, if any (`None` for
    /// top-level/REPL definitions). Used to resolve its private namespace
    /// on each call.
    pub module: Option<String>,
    /// Whether this function runs with elevated trust, i.e. may call
    /// `system:`-scoped builtins a plain user function cannot (spec.md
    /// §4.9 "trust_for_context").
    pub trusted: bool,
}

impl DanaFunction {
    pub fn from_def(def: &FunctionDefinition, module: Option<String>, trusted: bool) -> Self {
        Self {
            name: def.name.clone(),
            params: def.params.clone(),
            return_type: def.return_type.clone(),
            body: Arc::new(def.body.clone()),
            module,
            trusted,
        }
    }
}

pub type NativeFn = dyn Fn(&mut Interpreter, &[Value], &[(String, Value)]) -> DanaResult<Value> + Send + Sync;

/// A native (Rust-implemented) function exposed to DANA code, e.g. the
/// `core` namespace builtins in `core_builtins.rs` (spec.md §3 "Function
/// values": "PythonFunction (native callable wrapper)").
#[derive(Clone)]
pub struct PythonFunction {
    pub name: String,
    pub callable: Arc<NativeFn>,
}

impl fmt::Debug for PythonFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PythonFunction").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub enum FunctionValue {
    Dana(DanaFunction),
    Native(PythonFunction),
}

impl FunctionValue {
    pub fn name(&self) -> &str {
        match self {
            FunctionValue::Dana(f) => &f.name,
            FunctionValue::Native(f) => &f.name,
        }
    }
}

impl Display for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The namespaces a function can be registered under (spec.md §4.9).
/// Lookup without an explicit namespace prefix walks them in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Private,
    Public,
    Core,
    System,
}

impl Namespace {
    /// Unqualified-call precedence (spec.md line 113): private of the
    /// current module, then public of the current module, then the core
    /// built-ins, then system. `local` isn't part of this chain — functions
    /// have no per-call-frame namespace, unlike variable scopes.
    pub const RESOLUTION_ORDER: [Namespace; 4] = [Namespace::Private, Namespace::Public, Namespace::Core, Namespace::System];

    pub fn label(&self) -> &'static str {
        match self {
            Namespace::Private => "private",
            Namespace::Public => "public",
            Namespace::Core => "core",
            Namespace::System => "system",
        }
    }
}

/// Two-level index by `(namespace, name)` (spec.md §4.9). Registration is
/// idempotent, matching `TypeRegistry`'s re-registration semantics.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    entries: DashMap<(Namespace, String), Arc<FunctionValue>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, namespace: Namespace, function: FunctionValue) {
        self.entries.insert((namespace, function.name().to_string()), Arc::new(function));
    }

    pub fn get(&self, namespace: Namespace, name: &str) -> Option<Arc<FunctionValue>> {
        self.entries.get(&(namespace, name.to_string())).map(|e| e.value().clone())
    }

    /// Resolves a bare name (no namespace qualifier) by walking
    /// `Namespace::RESOLUTION_ORDER`, honoring the precedence rule that a
    /// user's own `local`/`private`/`public` definitions shadow `system`/
    /// `core` builtins of the same name (spec.md §4.9).
    pub fn resolve(&self, name: &str) -> Option<Arc<FunctionValue>> {
        for ns in Namespace::RESOLUTION_ORDER {
            if let Some(f) = self.get(ns, name) {
                return Some(f);
            }
        }
        None
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(name: &str) -> FunctionValue {
        FunctionValue::Native(PythonFunction { name: name.to_string(), callable: Arc::new(|_, _, _| Ok(Value::None)) })
    }

    #[test]
    fn resolution_prefers_private_over_core() {
        let registry = FunctionRegistry::new();
        registry.register(Namespace::Core, native("greet"));
        registry.register(Namespace::Private, native("greet"));
        let resolved = registry.resolve("greet").unwrap();
        assert!(matches!(&*resolved, FunctionValue::Native(_)));
    }

    #[test]
    fn resolution_prefers_core_over_system() {
        let registry = FunctionRegistry::new();
        registry.register(Namespace::System, native("status"));
        assert!(registry.resolve("status").is_some());
        registry.register(Namespace::Core, native("status"));
        let resolved = registry.resolve("status").unwrap();
        assert!(matches!(&*resolved, FunctionValue::Native(_)));
        assert_eq!(Namespace::RESOLUTION_ORDER.iter().position(|n| *n == Namespace::Core).unwrap(), 2);
        assert_eq!(Namespace::RESOLUTION_ORDER.iter().position(|n| *n == Namespace::System).unwrap(), 3);
    }
}
