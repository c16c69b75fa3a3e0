// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Graph construction: one placeholder per expression.
//!
//! The walk is pre-order at compound nodes so that child placeholders
//! exist by the time the parent's local type is computed. `local` binds
//! and object locals get their placeholders before any bind body is
//! walked, which is what makes mutually recursive bindings resolve.

use crate::analysis::graph::{
    concrete_tp, tp_index, tp_ref, tp_sum, PlaceholderId, TypeGraph, TypePlaceholder, ANY,
    ANY_OBJECT, BOOL, NULL, NUMBER, STDLIB, STRING,
};
use crate::analysis::model::{
    ArrayDesc, FuncParams, FunctionDesc, IndexSpec, ObjectDesc, TypeDesc, MAX_KNOWN,
};
use crate::ast::{children, Expr, ExprRef, UnaryOp};
use crate::imports::{ImportMap, ImportStatus};
use crate::variables::{VarInfo, VarKind};
use crate::Rc;

use alloc::vec;
use alloc::vec::Vec;

/// Build-time context for one module.
pub(crate) struct BuildCtx<'a> {
    pub module_idx: usize,
    pub vars: &'a VarInfo,
    pub imports: &'a ImportMap,
    /// Root placeholder of every module in the joint analysis.
    pub roots: &'a [PlaceholderId],
}

fn prepare(g: &mut TypeGraph, ctx: &BuildCtx, node: &ExprRef) {
    let p = g.new_placeholder();
    g.set_expr_placeholder(ctx.module_idx, node.eidx(), p);
    prepare_with_placeholder(g, ctx, node, p);
}

pub(crate) fn prepare_with_placeholder(
    g: &mut TypeGraph,
    ctx: &BuildCtx,
    node: &ExprRef,
    p: PlaceholderId,
) {
    match node.as_ref() {
        Expr::Local { binds, body, .. } => {
            let mut bind_placeholders = Vec::with_capacity(binds.len());
            for bind in binds {
                let bp = g.new_placeholder();
                g.set_expr_placeholder(ctx.module_idx, bind.body.eidx(), bp);
                bind_placeholders.push(bp);
            }
            for (bind, bp) in binds.iter().zip(bind_placeholders) {
                prepare_with_placeholder(g, ctx, &bind.body, bp);
            }
            prepare(g, ctx, body);
        }
        Expr::Object {
            locals,
            asserts,
            fields,
            ..
        } => {
            let mut local_placeholders = Vec::with_capacity(locals.len());
            for local in locals {
                let lp = g.new_placeholder();
                g.set_expr_placeholder(ctx.module_idx, local.body.eidx(), lp);
                local_placeholders.push(lp);
            }
            for (local, lp) in locals.iter().zip(local_placeholders) {
                prepare_with_placeholder(g, ctx, &local.body, lp);
            }
            for assert in asserts {
                prepare(g, ctx, assert);
            }
            for field in fields {
                prepare(g, ctx, &field.name);
                prepare(g, ctx, &field.body);
            }
        }
        _ => {
            for child in children(node) {
                prepare(g, ctx, child);
            }
        }
    }
    let tp = calc_tp(g, ctx, node);
    g.set_placeholder(p, tp);
}

fn calc_tp(g: &TypeGraph, ctx: &BuildCtx, node: &ExprRef) -> TypePlaceholder {
    let m = ctx.module_idx;
    match node.as_ref() {
        Expr::Null { .. } => tp_ref(NULL),
        Expr::Bool { .. } => tp_ref(BOOL),
        Expr::Number { .. } => tp_ref(NUMBER),
        Expr::String { .. } => tp_ref(STRING),

        Expr::Array { elements, .. } => {
            let known_count = elements.len().min(MAX_KNOWN);
            let mut desc = ArrayDesc {
                all_contain: Vec::with_capacity(elements.len() - known_count),
                element_contains: Vec::with_capacity(known_count),
            };
            for (i, el) in elements.iter().enumerate() {
                let p = g.expr_placeholder(m, el.eidx());
                if i < known_count {
                    desc.element_contains.push(vec![p]);
                } else {
                    desc.all_contain.push(p);
                }
            }
            concrete_tp(TypeDesc {
                array: Some(desc),
                ..TypeDesc::default()
            })
        }

        Expr::Object { fields, .. } => {
            let mut desc = ObjectDesc {
                all_fields_known: true,
                ..ObjectDesc::default()
            };
            for field in fields {
                let body = g.expr_placeholder(m, field.body.eidx());
                match field.name.as_ref() {
                    Expr::String { value, .. } => {
                        desc.field_contains
                            .entry(value.clone())
                            .or_default()
                            .push(body);
                    }
                    _ => {
                        // Computed field name: the field set is open.
                        desc.all_contain.push(body);
                        desc.all_fields_known = false;
                    }
                }
            }
            concrete_tp(TypeDesc {
                object: Some(desc),
                ..TypeDesc::default()
            })
        }

        // Operator overloading makes binary expressions genuinely hard to
        // pin down; the bound stays trivial.
        Expr::Binary { .. } => tp_ref(ANY),

        Expr::Unary { op, .. } => match op {
            UnaryOp::Not => tp_ref(BOOL),
            UnaryOp::BitNot | UnaryOp::Plus | UnaryOp::Minus => tp_ref(NUMBER),
        },

        Expr::Conditional {
            branch_true,
            branch_false,
            ..
        } => tp_sum(
            g.expr_placeholder(m, branch_true.eidx()),
            g.expr_placeholder(m, branch_false.eidx()),
        ),

        Expr::Local { body, .. } => tp_ref(g.expr_placeholder(m, body.eidx())),

        Expr::Var { eidx, name, .. } => {
            let Some(v) = ctx.vars.at(*eidx) else {
                panic!("variable {name} has no descriptor");
            };
            match v.kind {
                VarKind::Stdlib => tp_ref(STDLIB),
                VarKind::Param => tp_ref(ANY),
                VarKind::Dollar => tp_ref(ANY_OBJECT),
                VarKind::Regular => match v.bind_eidx {
                    Some(bind_eidx) => tp_ref(g.expr_placeholder(m, bind_eidx)),
                    // Unresolved occurrence; already reported.
                    None => tp_ref(ANY),
                },
            }
        }

        Expr::SelfExpr { .. } | Expr::SuperIndex { .. } => tp_ref(ANY_OBJECT),
        Expr::InSuper { .. } => tp_ref(BOOL),

        // An error never produces a value.
        Expr::Error { .. } => concrete_tp(TypeDesc::default()),

        Expr::Function { params, body, .. } => {
            let func_params = FuncParams {
                required: params.required.iter().map(|p| Rc::from(p.text())).collect(),
                optional: params
                    .optional
                    .iter()
                    .map(|p| Rc::from(p.name.text()))
                    .collect(),
            };
            concrete_tp(TypeDesc {
                function: Some(FunctionDesc {
                    min_arity: params.required.len(),
                    max_arity: params.required.len() + params.optional.len(),
                    params: Some(Rc::new(func_params)),
                    result_contains: vec![g.expr_placeholder(m, body.eidx())],
                }),
                ..TypeDesc::default()
            })
        }

        Expr::Apply { target, .. } => {
            tp_index(IndexSpec::call(g.expr_placeholder(m, target.eidx())))
        }

        Expr::Index { target, index, .. } => {
            let target_p = g.expr_placeholder(m, target.eidx());
            match index.as_ref() {
                Expr::String { value, .. } => {
                    tp_index(IndexSpec::known_string(target_p, value.clone()))
                }
                Expr::Number { value, .. }
                    if *value >= 0.0 && *value < MAX_KNOWN as f64 && value.fract() == 0.0 =>
                {
                    tp_index(IndexSpec::known_int(target_p, *value as usize))
                }
                _ => tp_index(IndexSpec::generic(target_p)),
            }
        }

        Expr::Import { eidx, .. } => match ctx.imports.get(m, *eidx) {
            Some(ImportStatus::Code(idx)) => tp_ref(ctx.roots[*idx]),
            // Resolution failed; reported at the import site by the checker.
            Some(ImportStatus::Failed(_)) => tp_ref(ANY),
            Some(ImportStatus::Str) | None => {
                panic!("code import was not resolved (module {m}, expression {eidx})")
            }
        },

        Expr::ImportStr { .. } => tp_ref(STRING),
    }
}
