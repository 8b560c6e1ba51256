//! `SandboxContext`: the per-scope variable store every DANA program (and
//! every function call frame within it) runs inside (spec.md §3
//! "SandboxContext").

use std::collections::HashMap;
use std::sync::Arc;

use crate::concurrency::PromiseLimiter;
use crate::error::{DanaError, DanaException, Location};
use crate::registry::Registries;
use crate::scope::{Scope, ScopedName};
use crate::types::Value;

/// Runtime-wide toggles seeded from environment variables and overridable
/// by the embedding host before running a program (spec.md §10.3).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub coercion_strategy: crate::coercion::CoercionStrategy,
    pub auto_coercion: bool,
    pub llm_auto_coercion: bool,
    pub mock_llm: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            coercion_strategy: crate::coercion::CoercionStrategy::Enhanced,
            auto_coercion: env_flag("DANA_AUTO_COERCION", true),
            llm_auto_coercion: env_flag("DANA_LLM_AUTO_COERCION", true),
            mock_llm: env_flag("DANA_MOCK_LLM", false),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.as_str(), "1" | "true" | "True" | "yes"),
        Err(_) => default,
    }
}

type Table = HashMap<String, Value>;

/// The per-scope variable store a program runs inside. `private`/`public`/
/// `system` live for the whole context's lifetime; `local` is a stack of
/// frames, one pushed per function call and popped when it returns, so a
/// callee's locals never leak into its caller's and recursive calls each
/// get their own (spec.md §3/§4.3).
pub struct SandboxContext {
    local_frames: Vec<Table>,
    private: Table,
    public: Table,
    system: Table,
    pub registries: Arc<Registries>,
    pub config: RuntimeConfig,
    pub limiter: Arc<PromiseLimiter>,
    /// The system-owned LLM resource `reason()`/agent methods resolve
    /// against when no per-agent resource is set (spec.md §3).
    pub system_llm_resource: Option<Value>,
    /// Resolves `import` statements against a search path of source
    /// directories (spec.md §4.9). Shared across promise snapshots so an
    /// imported module is still parsed at most once per process even when
    /// the import happens inside a spawned promise body.
    pub module_loader: Arc<crate::module_loader::ModuleLoader>,
}

impl SandboxContext {
    pub fn new(registries: Arc<Registries>) -> Self {
        let search_path = std::env::current_dir().map(|d| vec![d]).unwrap_or_default();
        Self::with_search_path(registries, search_path)
    }

    pub fn with_search_path(registries: Arc<Registries>, search_path: Vec<std::path::PathBuf>) -> Self {
        Self {
            local_frames: vec![Table::default()],
            private: Table::default(),
            public: Table::default(),
            system: Table::default(),
            registries,
            config: RuntimeConfig::default(),
            limiter: Arc::new(PromiseLimiter::new(crate::concurrency::LimiterConfig::from_env())),
            system_llm_resource: None,
            module_loader: Arc::new(crate::module_loader::ModuleLoader::new(search_path)),
        }
    }

    /// Pushes a fresh, empty local frame for an about-to-run function call
    /// (spec.md §4.3). Pair with `pop_local_frame` once the call returns.
    pub fn push_local_frame(&mut self) {
        self.local_frames.push(Table::default());
    }

    /// Pops the current local frame, discarding its bindings — a function
    /// call's locals never survive past `return` (spec.md §3).
    pub fn pop_local_frame(&mut self) {
        self.local_frames.pop();
        if self.local_frames.is_empty() {
            self.local_frames.push(Table::default());
        }
    }

    fn local(&self) -> &Table {
        self.local_frames.last().expect("local frame stack is never empty")
    }

    fn local_mut(&mut self) -> &mut Table {
        self.local_frames.last_mut().expect("local frame stack is never empty")
    }

    fn table(&self, scope: Scope) -> &Table {
        match scope {
            Scope::Local => self.local(),
            Scope::Private => &self.private,
            Scope::Public => &self.public,
            Scope::System => &self.system,
        }
    }

    fn table_mut(&mut self, scope: Scope) -> &mut Table {
        match scope {
            Scope::Local => self.local_mut(),
            Scope::Private => &mut self.private,
            Scope::Public => &mut self.public,
            Scope::System => &mut self.system,
        }
    }

    /// Reads a scoped name. An explicit scope is looked up directly; an
    /// unqualified name walks `ScopedName::read_order` (spec.md §4.3).
    pub fn get(&self, name: &ScopedName) -> Option<Value> {
        if let Some(scope) = name.scope {
            return self.table(scope).get(&name.name).cloned();
        }
        for scope in ScopedName::read_order() {
            if let Some(v) = self.table(scope).get(&name.name) {
                return Some(v.clone());
            }
        }
        None
    }

    /// Writes a scoped name under the function-body default (`local`)
    /// when unqualified (spec.md §4.3 point 2). Use `assign_with_default`
    /// at module top level, where unqualified assignment targets default
    /// to `private` instead (spec.md §4.3 point 3).
    pub fn assign(&mut self, name: &ScopedName, value: Value) {
        self.assign_with_default(name, value, Scope::Local);
    }

    /// Writes a scoped name. An explicit scope writes there directly,
    /// except `system`, which user code may never write (spec.md §4.3
    /// rule 4) — use `set_system` from engine-internal code instead. An
    /// unqualified name overwrites an existing binding wherever the read
    /// order first finds one, falling back to `default_scope` when the
    /// name is new (spec.md §4.3).
    pub fn assign_with_default(&mut self, name: &ScopedName, value: Value, default_scope: Scope) -> Result<(), DanaError> {
        if let Some(scope) = name.scope {
            if scope == Scope::System {
                return Err(DanaError::Exception(DanaException::name(
                    format!("cannot assign to system-scoped name '{name}' from user code"),
                    Location::unknown(),
                )));
            }
            self.table_mut(scope).insert(name.name.clone(), value);
            return Ok(());
        }
        for scope in ScopedName::write_search_order() {
            if self.table(scope).contains_key(&name.name) {
                self.table_mut(scope).insert(name.name.clone(), value);
                return Ok(());
            }
        }
        self.table_mut(default_scope).insert(name.name.clone(), value);
        Ok(())
    }

    /// A flat copy of the `public` table, used to build the namespace
    /// object an `import` statement binds (spec.md §4.9) — modules don't
    /// share live state with their importer, only a snapshot taken right
    /// after their top-level statements finish running.
    pub fn public_snapshot(&self) -> HashMap<String, Value> {
        self.public.clone()
    }

    pub fn get_system(&self, name: &str) -> Option<Value> {
        self.system.get(name).cloned()
    }

    pub fn set_system(&mut self, name: impl Into<String>, value: Value) {
        self.system.insert(name.into(), value);
    }

    /// Raises a `NameError` for an unresolved identifier — a thin wrapper
    /// so call sites share the exact wording (spec.md §6 error format).
    pub fn name_error(&self, name: &ScopedName, location: Location) -> DanaError {
        DanaError::Exception(DanaException::name(format!("name '{name}' is not defined"), location))
    }

    /// A context for a promise's own thread: `private`/`public`/`system`
    /// are copied by value (a read-mostly snapshot of the parent's state
    /// at spawn time), `local` starts empty, and `registries`/`limiter`
    /// are shared `Arc`s so the promise body sees the same types, methods,
    /// and concurrency budget as its parent (spec.md §5 "derived child
    /// context for isolated writes"). Mutations the promise body makes are
    /// never observed by the parent once it resumes.
    pub fn snapshot_for_promise(&self) -> Self {
        Self {
            local_frames: vec![Table::default()],
            private: self.private.clone(),
            public: self.public.clone(),
            system: self.system.clone(),
            registries: self.registries.clone(),
            config: self.config.clone(),
            limiter: self.limiter.clone(),
            system_llm_resource: self.system_llm_resource.clone(),
            module_loader: self.module_loader.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unqualified_write_then_read_round_trips() {
        let mut ctx = SandboxContext::new(Registries::new());
        ctx.assign(&ScopedName::implicit("x"), Value::Int(1));
        assert!(matches!(ctx.get(&ScopedName::implicit("x")), Some(Value::Int(1))));
    }

    #[test]
    fn unqualified_write_reuses_an_existing_broader_scope_binding() {
        // spec.md §4.3 / §9 Open Question: an unqualified write prefers an
        // already-bound broader scope over shadowing it in `local`.
        let mut ctx = SandboxContext::new(Registries::new());
        ctx.assign_with_default(&ScopedName::explicit(Scope::Public, "x"), Value::Int(1), Scope::Local).unwrap();
        ctx.assign(&ScopedName::implicit("x"), Value::Int(2));
        assert!(matches!(ctx.get(&ScopedName::explicit(Scope::Public, "x")), Some(Value::Int(2))));
        assert!(matches!(ctx.get(&ScopedName::implicit("x")), Some(Value::Int(2))));
    }

    #[test]
    fn explicit_scopes_do_not_leak_into_each_other() {
        let mut ctx = SandboxContext::new(Registries::new());
        ctx.assign_with_default(&ScopedName::explicit(Scope::Private, "x"), Value::Int(1), Scope::Local).unwrap();
        assert!(ctx.get(&ScopedName::explicit(Scope::Public, "x")).is_none());
    }

    #[test]
    fn local_frames_do_not_leak_across_calls() {
        let mut ctx = SandboxContext::new(Registries::new());
        ctx.assign(&ScopedName::implicit("x"), Value::Int(1));
        ctx.push_local_frame();
        assert!(ctx.get(&ScopedName::implicit("x")).is_none());
        ctx.assign(&ScopedName::implicit("x"), Value::Int(2));
        ctx.pop_local_frame();
        assert!(matches!(ctx.get(&ScopedName::implicit("x")), Some(Value::Int(1))));
    }

    #[test]
    fn user_code_cannot_write_system_scope() {
        let mut ctx = SandboxContext::new(Registries::new());
        assert!(ctx.assign_with_default(&ScopedName::explicit(Scope::System, "x"), Value::Int(1), Scope::Local).is_err());
    }
}
