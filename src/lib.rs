//! DANA — parser, type system, and tree-walking interpreter for the
//! neurosymbolic agent language described in `SPEC_FULL.md`.

pub mod coercion;
pub mod concurrency;
pub mod context;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod lexer;
pub mod logging;
pub mod module_loader;
pub mod parser;
pub mod registry;
pub mod resource;
pub mod scope;
pub mod types;

use std::sync::Arc;

use context::SandboxContext;
use error::{DanaError, DanaException, DanaResult, Location};
use registry::Registries;

/// Parse and execute a DANA source string against a fresh top-level
/// sandbox, returning the context it ran in. The single entry point the
/// `dana` binary and the integration tests both call through.
pub fn run_source(source: &str, registries: Arc<Registries>) -> DanaResult<SandboxContext> {
    let tokens = lexer::Lexer::new(source).lex().map_err(|e| {
        DanaError::Exception(DanaException::syntax(e.message, Location::new(e.position.0, e.position.1, "")))
    })?;
    let program = parser::parse(tokens, source)?;
    let mut interp = interpreter::Interpreter::new(SandboxContext::new(registries));
    interp.run_program(&program)?;
    Ok(interp.into_ctx())
}
