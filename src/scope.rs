//! Variable scopes and name resolution (spec.md §3 / §4.3).

use std::fmt::{self, Display};

/// The four namespaces a `SandboxContext` maintains independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Function-local bindings, torn down when the call frame returns.
    Local,
    /// Bindings private to the current agent/module, invisible to callees.
    Private,
    /// Bindings visible across the whole program.
    Public,
    /// Runtime/engine-owned bindings (`system:__runtime_status`, etc.).
    System,
}

impl Scope {
    pub const ALL: [Scope; 4] = [Scope::Local, Scope::Private, Scope::Public, Scope::System];

    pub fn prefix(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Private => "private",
            Scope::Public => "public",
            Scope::System => "system",
        }
    }

    pub fn parse(prefix: &str) -> Option<Scope> {
        match prefix {
            "local" => Some(Scope::Local),
            "private" => Some(Scope::Private),
            "public" => Some(Scope::Public),
            "system" => Some(Scope::System),
            _ => None,
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// A name split into its explicit scope (if any) and bare identifier, e.g.
/// `private:x` -> `(Some(Private), "x")`, `x` -> `(None, "x")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedName {
    pub scope: Option<Scope>,
    pub name: String,
}

impl ScopedName {
    pub fn explicit(scope: Scope, name: impl Into<String>) -> Self {
        Self { scope: Some(scope), name: name.into() }
    }

    pub fn implicit(name: impl Into<String>) -> Self {
        Self { scope: None, name: name.into() }
    }

    /// Auto-scoping order used for unqualified reads (spec.md §4.3 rule 2):
    /// local, then private, then public, falling through to `system` last.
    /// Writes never target `system` implicitly — only reads fall through to
    /// it, since `system:` bindings are runtime/engine-owned.
    pub fn read_order() -> [Scope; 4] {
        [Scope::Local, Scope::Private, Scope::Public, Scope::System]
    }

    /// Scopes an unqualified *write* may overwrite an existing binding in
    /// (spec.md §4.3 rule 4: `system` is never implicitly writable, even
    /// when a same-named `system:` binding already exists).
    pub fn write_search_order() -> [Scope; 3] {
        [Scope::Local, Scope::Private, Scope::Public]
    }
}

impl Display for ScopedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Some(scope) => write!(f, "{scope}:{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_prefixes() {
        assert_eq!(Scope::parse("private"), Some(Scope::Private));
        assert_eq!(Scope::parse("bogus"), None);
    }

    #[test]
    fn read_order_falls_through_to_system_last() {
        assert_eq!(ScopedName::read_order(), [Scope::Local, Scope::Private, Scope::Public, Scope::System]);
    }
}
