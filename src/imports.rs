// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Import resolution.
//!
//! The analyzer never touches the filesystem itself. It asks an
//! [`ImportResolver`] for the parsed tree behind an `import`, or for a
//! confirmation that an `importstr` target exists. The collector walks the
//! entry module, resolves every import transitively, and produces the set
//! of root trees that are analyzed jointly.

use crate::ast::{children, Expr, ExprRef, Module};
use crate::linter::ErrorSink;
use crate::parser::Parser;
use crate::variables::{resolve_variables, VarInfo};
use crate::Map;

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use anyhow::{bail, Result};

/// Resolves import targets on behalf of the analyzer.
pub trait ImportResolver {
    /// Resolve a code import to its parsed tree.
    fn resolve_code(&mut self, from: &str, path: &str) -> Result<Module>;

    /// Confirm that a string import target exists.
    fn resolve_string(&mut self, from: &str, path: &str) -> Result<()>;
}

/// Outcome of resolving one import expression.
#[derive(Debug, Clone)]
pub enum ImportStatus {
    /// Code import, resolved to the module with the given index.
    Code(usize),
    /// String import, target exists.
    Str,
    /// Resolution failed; the message is reported at the import site.
    Failed(String),
}

/// Resolution outcomes keyed by (module index, expression index).
#[derive(Debug, Default)]
pub struct ImportMap {
    entries: Map<(usize, u32), ImportStatus>,
}

impl ImportMap {
    pub fn get(&self, module_idx: usize, eidx: u32) -> Option<&ImportStatus> {
        self.entries.get(&(module_idx, eidx))
    }
}

/// A module together with its variable information, ready for analysis.
#[derive(Debug, Clone)]
pub struct ModuleUnit {
    pub module: Module,
    pub vars: VarInfo,
}

/// Collect the entry module and everything it transitively imports.
///
/// Each distinct file is analyzed once; repeated imports map to the same
/// module index, which also breaks import cycles. Resolution failures are
/// recorded in the returned [`ImportMap`] and reported later, at the import
/// site, in source-walk order.
pub fn collect_imports(
    entry: Module,
    entry_vars: VarInfo,
    resolver: &mut dyn ImportResolver,
    sink: &mut dyn ErrorSink,
) -> (Vec<ModuleUnit>, ImportMap) {
    let mut modules = vec![ModuleUnit {
        module: entry,
        vars: entry_vars,
    }];
    let mut imports = ImportMap::default();
    let mut seen: Map<String, usize> = Map::new();
    seen.insert(modules[0].module.source.file().clone(), 0);

    let mut next = 0usize;
    while next < modules.len() {
        let root = modules[next].module.root.clone();
        let from = modules[next].module.source.file().clone();
        scan(
            &root, next, &from, resolver, sink, &mut modules, &mut imports, &mut seen,
        );
        next += 1;
    }

    (modules, imports)
}

#[allow(clippy::too_many_arguments)]
fn scan(
    expr: &ExprRef,
    module_idx: usize,
    from: &str,
    resolver: &mut dyn ImportResolver,
    sink: &mut dyn ErrorSink,
    modules: &mut Vec<ModuleUnit>,
    imports: &mut ImportMap,
    seen: &mut Map<String, usize>,
) {
    match expr.as_ref() {
        Expr::Import { eidx, path, .. } => {
            let status = match resolver.resolve_code(from, path) {
                Ok(module) => {
                    let key = module.source.file().clone();
                    let idx = match seen.get(&key) {
                        Some(idx) => *idx,
                        None => {
                            let idx = modules.len();
                            seen.insert(key, idx);
                            let vars = resolve_variables(&module, sink);
                            modules.push(ModuleUnit { module, vars });
                            idx
                        }
                    };
                    ImportStatus::Code(idx)
                }
                Err(_) => ImportStatus::Failed(format!("Couldn't open import {path:?}")),
            };
            imports.entries.insert((module_idx, *eidx), status);
        }
        Expr::ImportStr { eidx, path, .. } => {
            let status = match resolver.resolve_string(from, path) {
                Ok(()) => ImportStatus::Str,
                Err(_) => ImportStatus::Failed(format!("Couldn't open import {path:?}")),
            };
            imports.entries.insert((module_idx, *eidx), status);
        }
        _ => {
            for child in children(expr) {
                scan(
                    child, module_idx, from, resolver, sink, modules, imports, seen,
                );
            }
        }
    }
}

/// An in-memory resolver mapping import paths to source text.
///
/// Lookups use the import path verbatim; no directory joining is applied.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    files: Map<String, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: &str, contents: &str) {
        self.files.insert(path.into(), contents.into());
    }
}

impl ImportResolver for MemoryResolver {
    fn resolve_code(&mut self, _from: &str, path: &str) -> Result<Module> {
        let Some(contents) = self.files.get(path) else {
            bail!("import target {path:?} not found");
        };
        let source = crate::lexer::Source::from_contents(path.into(), contents.clone())?;
        let mut parser = Parser::new(&source)?;
        parser.parse_module()
    }

    fn resolve_string(&mut self, _from: &str, path: &str) -> Result<()> {
        if self.files.contains_key(path) {
            Ok(())
        } else {
            bail!("import target {path:?} not found")
        }
    }
}

/// A filesystem resolver. Paths are resolved relative to the directory of
/// the importing file; parsed modules are cached per resolved path.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct FileResolver {
    cache: Map<String, Module>,
}

#[cfg(feature = "std")]
impl FileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve_path(from: &str, path: &str) -> String {
        let base = std::path::Path::new(from);
        let joined = match base.parent() {
            Some(dir) => dir.join(path),
            None => std::path::PathBuf::from(path),
        };
        match std::fs::canonicalize(&joined) {
            Ok(p) => p.to_string_lossy().into_owned(),
            Err(_) => joined.to_string_lossy().into_owned(),
        }
    }
}

#[cfg(feature = "std")]
impl ImportResolver for FileResolver {
    fn resolve_code(&mut self, from: &str, path: &str) -> Result<Module> {
        let resolved = Self::resolve_path(from, path);
        if let Some(module) = self.cache.get(&resolved) {
            return Ok(module.clone());
        }
        let source = crate::lexer::Source::from_file(&resolved)?;
        let mut parser = Parser::new(&source)?;
        let module = parser.parse_module()?;
        self.cache.insert(resolved, module.clone());
        Ok(module)
    }

    fn resolve_string(&mut self, from: &str, path: &str) -> Result<()> {
        let resolved = Self::resolve_path(from, path);
        match std::fs::metadata(&resolved) {
            Ok(m) if m.is_file() => Ok(()),
            _ => bail!("import target {path:?} not found"),
        }
    }
}
