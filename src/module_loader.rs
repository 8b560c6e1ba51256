//! Resolves and loads `.na` source modules (spec.md §4.9), grounded on the
//! teacher's `src/loader/mod.rs` recursive module loader — extended here
//! with the cycle detection that file lacked.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{DanaError, DanaException, Location};
use crate::parser::ast::Program;

/// A loaded module: its parsed AST and the export surface (`public` names,
/// populated by the interpreter once it runs the module body — the loader
/// itself only owns parsing and caching).
pub struct LoadedModule {
    pub name: String,
    pub path: PathBuf,
    pub program: Program,
}

/// Loads `.na` files from a search path, caching by canonical path so a
/// module is parsed at most once per process and repeated imports return
/// the same cached value (spec.md §4.9 "write-once per process").
pub struct ModuleLoader {
    search_path: Vec<PathBuf>,
    cache: RwLock<HashMap<PathBuf, Arc<LoadedModule>>>,
    /// Import chain currently being resolved, used to detect and report
    /// cycles with their full chain (spec.md §4.9).
    in_progress: RwLock<Vec<PathBuf>>,
}

impl ModuleLoader {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path, cache: RwLock::new(HashMap::new()), in_progress: RwLock::new(vec![]) }
    }

    fn resolve_path(&self, module: &str) -> Result<PathBuf, DanaError> {
        let relative = module.replace('.', "/") + ".na";
        for dir in &self.search_path {
            let candidate = dir.join(&relative);
            if candidate.is_file() {
                return Ok(candidate.canonicalize().unwrap_or(candidate));
            }
        }
        Err(DanaError::Exception(DanaException::name(
            format!("module '{module}' not found on search path"),
            Location::unknown(),
        )))
    }

    pub fn load(&self, module: &str) -> Result<Arc<LoadedModule>, DanaError> {
        let path = self.resolve_path(module)?;

        if let Some(cached) = self.cache.read().get(&path) {
            return Ok(cached.clone());
        }

        {
            let mut in_progress = self.in_progress.write();
            if let Some(pos) = in_progress.iter().position(|p| p == &path) {
                let chain = in_progress[pos..]
                    .iter()
                    .map(|p| p.display().to_string())
                    .chain(std::iter::once(path.display().to_string()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(DanaError::Exception(DanaException::new(
                    crate::error::ErrorKind::Dana,
                    format!("import cycle detected: {chain}"),
                    Location::unknown(),
                )));
            }
            in_progress.push(path.clone());
        }

        let result = self.load_uncached(module, &path);

        self.in_progress.write().pop();
        result
    }

    fn load_uncached(&self, module: &str, path: &Path) -> Result<Arc<LoadedModule>, DanaError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            DanaError::Exception(DanaException::resource(format!("failed to read module '{module}': {e}"), Location::unknown()))
        })?;
        let tokens = crate::lexer::Lexer::new(&source).lex().map_err(|e| {
            DanaError::Exception(DanaException::syntax(e.message, Location::new(e.position.0, e.position.1, "")))
        })?;
        let program = crate::parser::parse(tokens, &source)?;
        let loaded = Arc::new(LoadedModule { name: module.to_string(), path: path.to_path_buf(), program });
        self.cache.write().insert(path.to_path_buf(), loaded.clone());
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_module(dir: &Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(format!("{name}.na"))).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_and_caches_a_module_once() {
        let dir = std::env::temp_dir().join(format!("dana_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_module(&dir, "greet", "x = 1\n");

        let loader = ModuleLoader::new(vec![dir.clone()]);
        let first = loader.load("greet").unwrap();
        let second = loader.load("greet").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reports_missing_module_as_name_error() {
        let loader = ModuleLoader::new(vec![]);
        let err = loader.load("does_not_exist").unwrap_err();
        match err {
            DanaError::Exception(e) => assert_eq!(e.kind, crate::error::ErrorKind::Name),
            _ => panic!("expected a NameError"),
        }
    }
}
