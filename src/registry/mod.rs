//! Thread-safe type/method/instance registries (spec.md §4.10).
//!
//! All registries are `dashmap`-backed so concurrent promises (spec.md §5)
//! can register/resolve without a single global lock, matching the
//! concurrency stack's general approach of favoring lock-free structures
//! over a giant mutex.

mod instance_registry;

pub use instance_registry::{InstanceCategory, InstanceRecord, InstanceRegistry};

use std::sync::Arc;

use dashmap::DashMap;

use crate::function::FunctionValue;
use crate::types::{AgentType, ResourceType, StructType};

/// Registers a `StructType`/`AgentType`/`ResourceType` by name. Each of the
/// three concrete registries below is a thin specialization of this shape
/// (spec.md §4.10 names them as three separate registries).
#[derive(Debug, Default)]
pub struct TypeRegistry<T> {
    entries: DashMap<String, Arc<T>>,
}

impl<T> TypeRegistry<T> {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Registration is idempotent: re-registering the same name overwrites
    /// rather than erroring, matching module reload semantics where a
    /// module's top-level statements may run more than once in tests.
    pub fn register(&self, name: impl Into<String>, value: T) {
        self.entries.insert(name.into(), Arc::new(value));
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name).map(|e| e.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type StructTypeRegistry = TypeRegistry<StructType>;
pub type AgentTypeRegistry = TypeRegistry<AgentType>;
pub type ResourceTypeRegistry = TypeRegistry<ResourceType>;

/// Resolves `(type_name, method_name)` to a callable (spec.md §4.10). A
/// struct's own methods take precedence; a `None` type_name entry is a
/// free function usable from any receiver type search order (used for
/// agent built-ins like `reason`, which are not tied to one struct name).
#[derive(Debug, Default)]
pub struct MethodRegistry {
    entries: DashMap<(String, String), Arc<FunctionValue>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn register(&self, type_name: impl Into<String>, method_name: impl Into<String>, function: FunctionValue) {
        self.entries.insert((type_name.into(), method_name.into()), Arc::new(function));
    }

    pub fn resolve(&self, type_name: &str, method_name: &str) -> Option<Arc<FunctionValue>> {
        self.entries.get(&(type_name.to_string(), method_name.to_string())).map(|e| e.value().clone())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Bundles every registry a `SandboxContext` needs, shared (via `Arc`)
/// across a whole program run and every promise it spawns.
#[derive(Debug, Default)]
pub struct Registries {
    pub structs: StructTypeRegistry,
    pub agents: AgentTypeRegistry,
    pub resources: ResourceTypeRegistry,
    pub methods: MethodRegistry,
    pub functions: crate::function::FunctionRegistry,
    /// Optional per spec.md §4.10 ("An InstanceRegistry optionally tracks
    /// live agent and resource instances") — always present, callers that
    /// don't care simply never query it.
    pub instances: InstanceRegistry,
}

impl Registries {
    pub fn new() -> Arc<Self> {
        let registries = Arc::new(Self::default());
        crate::function::core_builtins::register_core_functions(&registries.functions);
        registries
    }

    pub fn clear(&self) {
        self.structs.clear();
        self.agents.clear();
        self.resources.clear();
        self.methods.clear();
        self.functions.clear();
        self.instances.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_registration_is_idempotent() {
        let reg = StructTypeRegistry::new();
        reg.register("Point", StructType::new("Point", vec![]));
        reg.register("Point", StructType::new("Point", vec![]));
        assert_eq!(reg.len(), 1);
    }
}
