// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Scope resolution.
//!
//! Walks a parsed module and attaches, to every variable occurrence, the
//! descriptor of the binding it refers to. The result is a dense table
//! indexed by expression index, which is all the type-inference engine
//! needs. Use counts are tracked so the linter can flag unused locals.

use crate::ast::{children, Bind, Expr, ExprRef, Module};
use crate::lexer::Span;
use crate::linter::{ErrorSink, LintError};
use crate::{Map, Rc};

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

/// What kind of binding a variable occurrence refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// A `local` bind or an object-level local.
    Regular,
    /// A function parameter.
    Param,
    /// The standard library root, `std`.
    Stdlib,
    /// The outermost-object reference, `$`.
    Dollar,
}

/// Descriptor of one binding site.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: Rc<str>,
    pub kind: VarKind,
    pub decl: Span,
    /// Expression index of the bound expression, for `Regular` binds.
    pub bind_eidx: Option<u32>,
    pub uses: u32,
}

/// Per-module variable information: descriptors plus the occurrence table.
#[derive(Debug, Clone, Default)]
pub struct VarInfo {
    pub variables: Vec<Variable>,
    /// Indexed by expression index; `Some(id)` for every `Var` node.
    pub var_at: Vec<Option<u32>>,
}

impl VarInfo {
    /// Descriptor for the variable occurrence at `eidx`, if any.
    pub fn at(&self, eidx: u32) -> Option<&Variable> {
        match self.var_at.get(eidx as usize) {
            Some(Some(id)) => self.variables.get(*id as usize),
            _ => None,
        }
    }
}

type Scope = Map<Rc<str>, u32>;

struct Resolver<'a> {
    info: VarInfo,
    sink: &'a mut dyn ErrorSink,
}

/// Resolve every variable occurrence in `module`.
///
/// Occurrences of names with no binding in scope are reported to `sink` and
/// given a synthetic descriptor so that downstream phases always find one.
pub fn resolve_variables(module: &Module, sink: &mut dyn ErrorSink) -> VarInfo {
    let mut resolver = Resolver {
        info: VarInfo {
            variables: vec![],
            var_at: vec![None; module.num_exprs as usize],
        },
        sink,
    };

    let mut scope = Scope::new();
    let std_id = resolver.add_var(
        "std".into(),
        VarKind::Stdlib,
        module.root.span().clone(),
        None,
    );
    scope.insert("std".into(), std_id);

    resolver.walk(&module.root, &scope);
    resolver.info
}

impl Resolver<'_> {
    fn add_var(&mut self, name: Rc<str>, kind: VarKind, decl: Span, bind_eidx: Option<u32>) -> u32 {
        let id = self.info.variables.len() as u32;
        self.info.variables.push(Variable {
            name,
            kind,
            decl,
            bind_eidx,
            uses: 0,
        });
        id
    }

    fn add_binds(&mut self, binds: &[Bind], scope: &mut Scope) {
        for bind in binds {
            let name: Rc<str> = bind.name.text().into();
            let id = self.add_var(
                name.clone(),
                VarKind::Regular,
                bind.name.clone(),
                Some(bind.body.eidx()),
            );
            scope.insert(name, id);
        }
    }

    fn walk(&mut self, expr: &ExprRef, scope: &Scope) {
        match expr.as_ref() {
            Expr::Local { binds, body, .. } => {
                // All binds are in scope in every bind body, so mutually
                // recursive locals resolve.
                let mut inner = scope.clone();
                self.add_binds(binds, &mut inner);
                for bind in binds {
                    self.walk(&bind.body, &inner);
                }
                self.walk(body, &inner);
            }
            Expr::Function { params, body, .. } => {
                let mut inner = scope.clone();
                for name in &params.required {
                    let id = self.add_var(name.text().into(), VarKind::Param, name.clone(), None);
                    inner.insert(name.text().into(), id);
                }
                for param in &params.optional {
                    let id = self.add_var(
                        param.name.text().into(),
                        VarKind::Param,
                        param.name.clone(),
                        None,
                    );
                    inner.insert(param.name.text().into(), id);
                }
                for param in &params.optional {
                    self.walk(&param.default, &inner);
                }
                self.walk(body, &inner);
            }
            Expr::Object {
                span,
                locals,
                asserts,
                fields,
                ..
            } => {
                let mut inner = scope.clone();
                if !inner.contains_key("$") {
                    // `$` binds at the outermost object literal.
                    let id = self.add_var("$".into(), VarKind::Dollar, span.clone(), None);
                    inner.insert("$".into(), id);
                }
                self.add_binds(locals, &mut inner);
                for local in locals {
                    self.walk(&local.body, &inner);
                }
                for assert in asserts {
                    self.walk(assert, &inner);
                }
                for field in fields {
                    // Field names are evaluated outside the object scope.
                    self.walk(&field.name, scope);
                    self.walk(&field.body, &inner);
                }
            }
            Expr::Var {
                span, eidx, name, ..
            } => {
                let id = match scope.get(name) {
                    Some(id) => *id,
                    None => {
                        let msg = if name.as_ref() == "$" {
                            "No top-level object found".into()
                        } else {
                            format!("Undeclared variable: {name}")
                        };
                        self.sink.push(LintError::new(msg, span.clone()));
                        // Synthetic descriptor so every occurrence has one.
                        self.add_var(name.clone(), VarKind::Regular, span.clone(), None)
                    }
                };
                self.info.variables[id as usize].uses += 1;
                self.info.var_at[*eidx as usize] = Some(id);
            }
            _ => {
                for child in children(expr) {
                    self.walk(child, scope);
                }
            }
        }
    }
}
