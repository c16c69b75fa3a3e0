// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared helpers for in-crate tests.

use crate::analysis::{self, TypeGraph};
use crate::imports::collect_imports;
use crate::variables::resolve_variables;
use crate::{lint_source, LintError, MemoryResolver, Module, Parser, Source};

use alloc::string::{String, ToString as _};
use alloc::vec::Vec;

use anyhow::{bail, Result};

pub fn parse(code: &str) -> Result<Module> {
    let source = Source::from_contents("test.jsonnet".to_string(), code.to_string())?;
    let mut parser = Parser::new(&source)?;
    parser.parse_module()
}

/// Lint a snippet with additional importable files and return the
/// diagnostic messages in emission order.
pub fn lint_messages_with_files(code: &str, files: &[(&str, &str)]) -> Result<Vec<String>> {
    let source = Source::from_contents("test.jsonnet".to_string(), code.to_string())?;
    let mut resolver = MemoryResolver::new();
    for (name, contents) in files {
        resolver.add_file(name, contents);
    }
    let mut errors: Vec<LintError> = Vec::new();
    lint_source(&source, &mut resolver, &mut errors)?;
    Ok(errors.iter().map(|e| e.message().to_string()).collect())
}

pub fn lint_messages(code: &str) -> Result<Vec<String>> {
    lint_messages_with_files(code, &[])
}

pub fn assert_lint(code: &str, expected: &[&str]) -> Result<()> {
    let messages = lint_messages(code)?;
    if messages != expected {
        bail!("for {code:?}:\nexpected {expected:#?}\ngot      {messages:#?}");
    }
    Ok(())
}

/// Run the full inference pipeline on a snippet with no imports.
pub fn infer_snippet(code: &str) -> Result<(Module, TypeGraph)> {
    let module = parse(code)?;
    let mut errors: Vec<LintError> = Vec::new();
    let vars = resolve_variables(&module, &mut errors);
    if !errors.is_empty() {
        bail!("unexpected resolution errors: {errors:?}");
    }
    let mut resolver = MemoryResolver::new();
    let (modules, imports) = collect_imports(module.clone(), vars, &mut resolver, &mut errors);
    if !errors.is_empty() {
        bail!("unexpected import errors: {errors:?}");
    }
    let graph = analysis::infer(&modules, &imports);
    Ok((module, graph))
}
