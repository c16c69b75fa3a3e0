// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Static type inference for Jsonnet programs.
//!
//! Jsonnet has no declared types, but we can still infer, for each
//! expression, a conservative over-approximation of the set of values it
//! may produce. The information is coarse on purpose: the goal is catching
//! simple mistakes (indexing a number, calling an array, reading a field a
//! fully known object does not have) while never rejecting a program that
//! could run successfully.
//!
//! The analysis proceeds in phases over a single graph shared by the entry
//! module and everything it imports:
//!
//! 1. `build` allocates a placeholder per expression and derives its
//!    locally-implied type, containment edges, and at most one deferred
//!    index request.
//! 2. `graph::simplify_references` collapses placeholders that only
//!    forward to one other placeholder.
//! 3. `graph::separate_element_types` materializes index requests into
//!    element placeholders, memoized per (container, index shape).
//! 4. Kosaraju-style SCC discovery over the containment graph, then one
//!    widening pass per component in reverse topological order, stamps the
//!    final upper bound of every placeholder.
//! 5. `check` re-walks each tree and reports misuses at `apply` and
//!    `index` sites using the upper bounds.
//!
//! Everything is id-based: placeholders live in one owning vector and all
//! other structures refer to them by dense integer ids, so the routinely
//! cyclic containment graph needs no reference counting.

pub(crate) mod build;
pub(crate) mod check;
pub(crate) mod graph;
pub mod model;
pub(crate) mod stdlib;

pub use graph::{PlaceholderId, TypeGraph};
pub use model::{describe, ArrayDesc, FuncParams, FunctionDesc, ObjectDesc, TypeDesc};

use crate::imports::{ImportMap, ModuleUnit};

use alloc::vec::Vec;

/// Build and solve the type graph for a set of jointly analyzed modules.
///
/// `modules[0]` is the entry module; the rest are its transitive imports in
/// discovery order. The returned graph answers upper-bound queries by
/// module and expression index.
pub fn infer(modules: &[ModuleUnit], imports: &ImportMap) -> TypeGraph {
    let mut g = TypeGraph::new();

    // Root placeholders are allocated up front so that import expressions
    // in any module can point at the root of any other.
    let mut roots = Vec::with_capacity(modules.len());
    for unit in modules {
        let m = g.add_module(unit.module.num_exprs);
        let p = g.new_placeholder();
        g.set_expr_placeholder(m, unit.module.root.eidx(), p);
        roots.push(p);
    }

    for (m, unit) in modules.iter().enumerate() {
        let ctx = build::BuildCtx {
            module_idx: m,
            vars: &unit.vars,
            imports,
            roots: &roots,
        };
        build::prepare_with_placeholder(&mut g, &ctx, &unit.module.root, roots[m]);
    }

    g.simplify_references();
    g.separate_element_types();
    g.make_topo_order();
    g.find_types();
    g
}
