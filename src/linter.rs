// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Linter entry points and the diagnostic sink.

use crate::analysis;
use crate::analysis::check;
use crate::ast::Module;
use crate::imports::{collect_imports, ImportResolver};
use crate::lexer::{Source, Span};
use crate::parser::Parser;
use crate::variables::{resolve_variables, VarInfo, VarKind};

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use anyhow::Result;
use serde::Serialize;

/// Location of a diagnostic. Lines and columns start at 1.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct Location {
    pub row: u32,
    pub col: u32,
}

/// One lint diagnostic: a message anchored to a source range.
#[derive(Debug, Clone)]
pub struct LintError {
    msg: String,
    span: Span,
}

impl LintError {
    pub fn new(msg: String, span: Span) -> Self {
        LintError { msg, span }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn location(&self) -> Location {
        Location {
            row: self.span.line,
            col: self.span.col,
        }
    }
}

impl core::fmt::Display for LintError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.span.message("lint", &self.msg))
    }
}

/// Receives diagnostics as they are produced.
pub trait ErrorSink {
    fn push(&mut self, err: LintError);
}

impl ErrorSink for Vec<LintError> {
    fn push(&mut self, err: LintError) {
        Vec::push(self, err);
    }
}

/// Analyze a parsed module and report diagnostics to `sink`.
///
/// `vars` must describe every variable occurrence in `module`; imports are
/// resolved through `resolver` and analyzed jointly with the entry module.
/// Returns whether any diagnostic was reported.
pub fn lint(
    module: &Module,
    vars: &VarInfo,
    resolver: &mut dyn ImportResolver,
    sink: &mut dyn ErrorSink,
) -> bool {
    let mut errs: Vec<LintError> = Vec::new();

    let (modules, imports) = collect_imports(module.clone(), vars.clone(), resolver, &mut errs);

    // Unused variables are reported for the entry file only, in
    // declaration order.
    for v in &modules[0].vars.variables {
        if v.kind == VarKind::Regular && v.uses == 0 {
            errs.push(LintError::new(
                format!("Unused variable: {}", v.name),
                v.decl.clone(),
            ));
        }
    }

    let graph = analysis::infer(&modules, &imports);
    for (m, unit) in modules.iter().enumerate() {
        check::check_module(unit, m, &graph, &imports, &mut errs);
    }

    let any = !errs.is_empty();
    for err in errs {
        sink.push(err);
    }
    any
}

/// Parse and lint a source file.
///
/// Parse failures are returned as errors; lint diagnostics go to `sink`.
/// Returns whether any diagnostic was reported.
pub fn lint_source(
    source: &Source,
    resolver: &mut dyn ImportResolver,
    sink: &mut dyn ErrorSink,
) -> Result<bool> {
    let mut parser = Parser::new(source)?;
    let module = parser.parse_module()?;

    let mut errs: Vec<LintError> = Vec::new();
    let vars = resolve_variables(&module, &mut errs);
    let resolve_errors = !errs.is_empty();
    for err in errs {
        sink.push(err);
    }

    let lint_errors = lint(&module, &vars, resolver, sink);
    Ok(resolve_errors || lint_errors)
}
