//! Concrete instances of struct/agent/resource types (spec.md §3 "Instances").

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use super::Value;
use crate::resource::{ResourceBackend, ResourceState};

/// An instance of a user-declared `struct` type: a type name for
/// diagnostics/coercion and a flat field map.
#[derive(Debug, Clone)]
pub struct StructInstance {
    pub type_name: Arc<str>,
    pub fields: HashMap<String, Value>,
}

impl StructInstance {
    pub fn new(type_name: impl Into<Arc<str>>, fields: HashMap<String, Value>) -> Self {
        Self { type_name: type_name.into(), fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }
}

impl Display for StructInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_name)?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, ")")
    }
}

/// An instance of an `agent` type. Carries the same field map as a struct
/// plus memory that is private to the agent and never visible through
/// ordinary field access (spec.md §3: "private memory, lazy conversation
/// memory, lazy LLM resource ref").
#[derive(Debug, Clone)]
pub struct AgentInstance {
    pub base: StructInstance,
    /// Memory only this agent's own methods (`plan`/`solve`/...) can read,
    /// distinct from `fields` which is visible to ordinary dotted access.
    pub private_memory: HashMap<String, Value>,
    /// Populated on first `remember`/`recall`/`chat` call, not at
    /// construction, to avoid paying for conversation state an agent never
    /// uses.
    pub conversation_memory: Option<Vec<(String, String)>>,
    /// The LLM resource this agent reasons through, resolved lazily the
    /// first time `reason`/`chat`/`solve` runs.
    pub llm_resource: Option<Value>,
}

impl AgentInstance {
    pub fn new(type_name: impl Into<Arc<str>>, fields: HashMap<String, Value>) -> Self {
        Self {
            base: StructInstance::new(type_name, fields),
            private_memory: HashMap::new(),
            conversation_memory: None,
            llm_resource: None,
        }
    }

    pub fn conversation_memory_mut(&mut self) -> &mut Vec<(String, String)> {
        self.conversation_memory.get_or_insert_with(Vec::new)
    }
}

impl Display for AgentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

/// An instance of a `resource` type: lifecycle state plus the same field
/// map a struct has. The pluggable backend (network client, DB handle,
/// ...) lives behind `crate::resource::ResourceBackend`; it is `None`
/// until `initialize()` attaches one (or construction does, under
/// `DANA_MOCK_LLM`).
#[derive(Clone)]
pub struct ResourceInstance {
    pub base: StructInstance,
    pub state: ResourceState,
    pub backend: Option<Arc<dyn ResourceBackend>>,
}

impl std::fmt::Debug for ResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceInstance").field("base", &self.base).field("state", &self.state).finish()
    }
}

impl ResourceInstance {
    pub fn new(type_name: impl Into<Arc<str>>, fields: HashMap<String, Value>) -> Self {
        Self { base: StructInstance::new(type_name, fields), state: ResourceState::Created, backend: None }
    }
}

impl Display for ResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.base, self.state)
    }
}
