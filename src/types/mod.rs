//! Runtime value representation and the struct/agent/resource type model
//! (spec.md §3 "Type model" / "Instances").

pub mod instance;

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use parking_lot::RwLock;

pub use instance::{AgentInstance, ResourceInstance, StructInstance};

use crate::concurrency::promise::PromiseHandle;
use crate::function::FunctionValue;

/// A field declared on a struct/agent/resource type: name, declared type
/// name, and an optional default-value expression already evaluated once
/// at registration time isn't possible (defaults may reference other
/// fields), so defaults are stored as a `Value` thunked by the caller.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_name: String,
    pub default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, default: Option<Value>) -> Self {
        Self { name: name.into(), type_name: type_name.into(), default }
    }
}

/// The primitive/structural type tags a `TypeDescriptor` can resolve to,
/// used by the coercion engine to decide what shape a value must take
/// (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Int,
    Float,
    Str,
    Bool,
    None,
    List(Box<TypeDescriptor>),
    Dict,
    /// A user-declared struct/agent/resource type, named by identity.
    Named(String),
    Any,
}

impl TypeDescriptor {
    pub fn from_name(name: &str) -> Self {
        match name {
            "int" => TypeDescriptor::Int,
            "float" => TypeDescriptor::Float,
            "str" => TypeDescriptor::Str,
            "bool" => TypeDescriptor::Bool,
            "None" => TypeDescriptor::None,
            "dict" => TypeDescriptor::Dict,
            "any" => TypeDescriptor::Any,
            other if other.starts_with("list[") && other.ends_with(']') => {
                TypeDescriptor::List(Box::new(TypeDescriptor::from_name(&other[5..other.len() - 1])))
            }
            other => TypeDescriptor::Named(other.to_string()),
        }
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Int => write!(f, "int"),
            TypeDescriptor::Float => write!(f, "float"),
            TypeDescriptor::Str => write!(f, "str"),
            TypeDescriptor::Bool => write!(f, "bool"),
            TypeDescriptor::None => write!(f, "None"),
            TypeDescriptor::List(inner) => write!(f, "list[{inner}]"),
            TypeDescriptor::Dict => write!(f, "dict"),
            TypeDescriptor::Named(name) => write!(f, "{name}"),
            TypeDescriptor::Any => write!(f, "any"),
        }
    }
}

/// A user-declared `struct` type: its own name and ordered field list.
/// `AgentType`/`ResourceType` embed one of these as their base (spec.md §3:
/// "AgentType (inherits StructType, ...)").
#[derive(Debug, Clone)]
pub struct StructType {
    pub name: Arc<str>,
    pub fields: Vec<FieldDescriptor>,
}

impl StructType {
    pub fn new(name: impl Into<Arc<str>>, fields: Vec<FieldDescriptor>) -> Self {
        Self { name: name.into(), fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Built-in methods every agent type carries in addition to user-defined
/// ones (spec.md §3/§4.6).
pub const AGENT_BUILTIN_METHODS: &[&str] = &["plan", "solve", "remember", "recall", "reason", "chat"];

/// `struct` subtype with agent-specific state and built-in methods.
/// `state` is auto-prepended as the first field, defaulting `"CREATED"`,
/// matching `resource_type.py`'s approach to the same lifecycle tag.
#[derive(Debug, Clone)]
pub struct AgentType {
    pub base: StructType,
}

impl AgentType {
    pub fn new(name: impl Into<Arc<str>>, mut fields: Vec<FieldDescriptor>) -> Self {
        prepend_state_field(&mut fields);
        Self { base: StructType::new(name, fields) }
    }

    pub fn has_builtin_method(&self, name: &str) -> bool {
        AGENT_BUILTIN_METHODS.contains(&name)
    }
}

/// `struct` subtype with lifecycle (CREATED/INITIALIZED/RUNNING/STOPPED/
/// TERMINATED) and a pluggable backend (spec.md §5 "Resource lifecycle").
#[derive(Debug, Clone)]
pub struct ResourceType {
    pub base: StructType,
}

impl ResourceType {
    pub fn new(name: impl Into<Arc<str>>, mut fields: Vec<FieldDescriptor>) -> Self {
        prepend_state_field(&mut fields);
        Self { base: StructType::new(name, fields) }
    }
}

fn prepend_state_field(fields: &mut Vec<FieldDescriptor>) {
    if !fields.iter().any(|f| f.name == "state") {
        fields.insert(0, FieldDescriptor::new("state", "str", Some(Value::Str("CREATED".into()))));
    }
}

/// A runtime value. Compound/mutable instances are `Arc<RwLock<...>>` so
/// struct/agent/resource values share identity across clones the way
/// Python object references do (spec.md §3 "Instances").
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    List(Arc<RwLock<Vec<Value>>>),
    Dict(Arc<RwLock<HashMap<String, Value>>>),
    Struct(Arc<RwLock<StructInstance>>),
    Agent(Arc<RwLock<AgentInstance>>),
    Resource(Arc<RwLock<ResourceInstance>>),
    Function(Arc<FunctionValue>),
    /// A not-yet-resolved concurrent call result (spec.md §5). Interpreter
    /// operations transparently force this on first use outside an explicit
    /// `await`-like construct, per spec.md §4.7's "promise-transparent" rule.
    Promise(PromiseHandle),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(RwLock::new(items)))
    }

    pub fn dict(items: HashMap<String, Value>) -> Self {
        Value::Dict(Arc::new(RwLock::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bool(_) => "bool",
            Value::None => "None",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Struct(_) => "struct",
            Value::Agent(_) => "agent",
            Value::Resource(_) => "resource",
            Value::Function(_) => "function",
            Value::Promise(_) => "promise",
        }
    }

    /// Python-style truthiness used by `if`/`while`/`not`/boolean coercion
    /// (spec.md §4.5 "smart-boolean"): nonzero numbers, non-empty
    /// containers, and non-empty strings are truthy, except the strings
    /// `"no"`, `"false"`, `"0"`, `"none"` (case-insensitive), which read as
    /// false even though they're non-empty — this is what lets an LLM's
    /// `"no"` reply drive a plain `if` the same way a literal `False` would.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "no" | "false" | "0" | "none" => false,
                _ => !s.is_empty(),
            },
            Value::Bool(b) => *b,
            Value::None => false,
            Value::List(items) => !items.read().is_empty(),
            Value::Dict(items) => !items.read().is_empty(),
            Value::Struct(_) | Value::Agent(_) | Value::Resource(_) | Value::Function(_) => true,
            Value::Promise(p) => p.force_truthy(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::None => write!(f, "None"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.read().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Dict(items) => {
                write!(f, "{{")?;
                for (i, (k, v)) in items.read().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Struct(s) => write!(f, "{}", s.read()),
            Value::Agent(a) => write!(f, "{}", a.read()),
            Value::Resource(r) => write!(f, "{}", r.read()),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::Promise(_) => write!(f, "<promise>"),
        }
    }
}
