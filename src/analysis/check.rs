// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The apply/index checker.
//!
//! Walks each analyzed tree, children before the node itself, and reports
//! misuses based on the solved upper bounds. Diagnostic order therefore
//! follows the left-to-right depth-first order of the source.

use crate::analysis::graph::TypeGraph;
use crate::analysis::model::{describe, FuncParams};
use crate::ast::{children, Arguments, Expr, ExprRef};
use crate::imports::{ImportMap, ImportStatus, ModuleUnit};
use crate::lexer::Span;
use crate::linter::{ErrorSink, LintError};
use crate::Set;

use alloc::format;
use alloc::string::String;

pub(crate) fn check_module(
    unit: &ModuleUnit,
    module_idx: usize,
    graph: &TypeGraph,
    imports: &ImportMap,
    sink: &mut dyn ErrorSink,
) {
    check_expr(&unit.module.root, module_idx, graph, imports, sink);
}

fn err(sink: &mut dyn ErrorSink, msg: String, span: &Span) {
    sink.push(LintError::new(msg, span.clone()));
}

fn check_expr(
    node: &ExprRef,
    module_idx: usize,
    graph: &TypeGraph,
    imports: &ImportMap,
    sink: &mut dyn ErrorSink,
) {
    for child in children(node) {
        check_expr(child, module_idx, graph, imports, sink);
    }

    match node.as_ref() {
        Expr::Apply {
            span, target, args, ..
        } => {
            let t = graph.upper_bound_of(module_idx, target.eidx());
            let Some(f) = &t.function else {
                err(
                    sink,
                    format!(
                        "Called value must be a function, but it is assumed to be {}",
                        describe(t)
                    ),
                    span,
                );
                return;
            };
            let got = args.positional.len() + args.named.len();
            if got > f.max_arity {
                err(
                    sink,
                    format!(
                        "Too many arguments: got {got}, but expected at most {}",
                        f.max_arity
                    ),
                    span,
                );
            } else if let Some(params) = &f.params {
                check_args(params, args, span, sink);
            } else if got < f.min_arity {
                err(
                    sink,
                    format!(
                        "Too few arguments: got {got}, but expected at least {}",
                        f.min_arity
                    ),
                    span,
                );
            }
        }

        Expr::Index {
            span,
            target,
            index,
            ..
        } => {
            let target_type = graph.upper_bound_of(module_idx, target.eidx());
            let index_type = graph.upper_bound_of(module_idx, index.eidx());

            if !target_type.is_array() && !target_type.is_object() && !target_type.maybe_string {
                err(
                    sink,
                    "Indexed value is neither an array nor an object nor a string".into(),
                    span,
                );
            } else if !target_type.is_object() {
                // It's not an object, so it must be an array or a string.
                let assumed = if target_type.is_array() && target_type.maybe_string {
                    "an array or a string"
                } else if target_type.is_array() {
                    "an array"
                } else {
                    "a string"
                };
                if !index_type.maybe_number {
                    err(
                        sink,
                        format!("Indexed value is assumed to be {assumed}, but index is not a number"),
                        span,
                    );
                }
            } else if !target_type.is_array() {
                // It's not an array, so it must be an object.
                if !index_type.maybe_string {
                    err(
                        sink,
                        "Indexed value is assumed to be an object, but index is not a string"
                            .into(),
                        span,
                    );
                }
                if let Some(obj) = &target_type.object {
                    if obj.all_fields_known {
                        if let Expr::String { value, .. } = index.as_ref() {
                            if !obj.field_contains.contains_key(value) {
                                err(
                                    sink,
                                    format!("Indexed object has no field {value:?}"),
                                    span,
                                );
                            }
                        }
                    }
                }
            } else if !index_type.maybe_number && !index_type.maybe_string {
                // We don't know what the target is, but we sure cannot
                // index it with that.
                err(
                    sink,
                    "Index is neither a number (for indexing arrays and string) nor a string (for indexing objects)".into(),
                    span,
                );
            }
        }

        Expr::Import { span, eidx, .. } | Expr::ImportStr { span, eidx, .. } => {
            if let Some(ImportStatus::Failed(msg)) = imports.get(module_idx, *eidx) {
                err(sink, msg.clone(), span);
            }
        }

        _ => (),
    }
}

fn check_args(params: &FuncParams, args: &Arguments, loc: &Span, sink: &mut dyn ErrorSink) {
    let mut received: Set<&str> = Set::new();
    let mut accepted: Set<&str> = Set::new();

    let num_passed = args.positional.len();
    let num_expected = params.required.len() + params.optional.len();

    for param in &params.required {
        accepted.insert(param.as_ref());
    }
    for param in &params.optional {
        accepted.insert(param.as_ref());
    }

    for (i, arg) in args.positional.iter().enumerate() {
        if i < params.required.len() {
            received.insert(params.required[i].as_ref());
        } else if i < num_expected {
            received.insert(params.optional[i - params.required.len()].as_ref());
        } else {
            err(
                sink,
                format!(
                    "Too many arguments, there can be at most {num_expected}, but {num_passed} provided"
                ),
                arg.span(),
            );
        }
    }

    for named in &args.named {
        let name = named.name.text();
        if received.contains(name) {
            err(
                sink,
                format!("Argument {name} already provided"),
                named.arg.span(),
            );
            return;
        }
        if !accepted.contains(name) {
            err(
                sink,
                format!("function has no parameter {name}"),
                named.arg.span(),
            );
            return;
        }
        received.insert(name);
    }

    for param in &params.required {
        if !received.contains(param.as_ref()) {
            err(sink, format!("Missing argument: {param}"), loc);
            return;
        }
    }
}
