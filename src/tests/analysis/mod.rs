// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::common::{assert_lint, infer_snippet};
use crate::analysis::graph::{
    normalize_placeholders, tp_ref, PlaceholderId, TypeGraph, ANY, NUMBER,
};
use crate::analysis::model::{describe, ArrayDesc, ObjectDesc, TypeDesc};

use alloc::vec;

use anyhow::Result;

#[test]
fn describe_void_and_scalars() {
    let void = TypeDesc::default();
    assert_eq!(describe(&void), "void");

    let t = TypeDesc {
        maybe_number: true,
        maybe_string: true,
        ..TypeDesc::default()
    };
    assert_eq!(describe(&t), "number or string");
}

#[test]
fn normalize_sorts_and_dedups() {
    let ps = vec![
        PlaceholderId(5),
        PlaceholderId(3),
        PlaceholderId(5),
        PlaceholderId(2),
    ];
    let normalized = normalize_placeholders(ps);
    assert_eq!(
        normalized,
        vec![PlaceholderId(2), PlaceholderId(3), PlaceholderId(5)]
    );
}

#[test]
fn normalize_collapses_any() {
    let ps = vec![PlaceholderId(5), ANY, PlaceholderId(3)];
    assert_eq!(normalize_placeholders(ps), vec![ANY]);
}

#[test]
fn normalize_is_idempotent() {
    let mut t = TypeDesc {
        maybe_bool: true,
        array: Some(ArrayDesc {
            all_contain: vec![PlaceholderId(7), PlaceholderId(3), PlaceholderId(7)],
            element_contains: vec![vec![PlaceholderId(4), PlaceholderId(4)]],
        }),
        object: Some(ObjectDesc {
            all_contain: vec![PlaceholderId(9), PlaceholderId(2)],
            ..ObjectDesc::default()
        }),
        ..TypeDesc::default()
    };
    t.normalize();
    let once = t.clone();
    t.normalize();
    assert_eq!(t, once);
}

#[test]
fn widen_is_monotone() {
    let mut a = TypeDesc {
        maybe_number: true,
        ..TypeDesc::default()
    };
    let b = TypeDesc {
        maybe_string: true,
        object: Some(ObjectDesc {
            all_contain: vec![PlaceholderId(3)],
            all_fields_known: true,
            ..ObjectDesc::default()
        }),
        ..TypeDesc::default()
    };

    a.widen(&b);
    assert!(a.maybe_number && a.maybe_string);
    assert!(a.is_object());

    // Widening with the same operand again changes nothing observable.
    let mut again = a.clone();
    again.widen(&b);
    again.normalize();
    a.normalize();
    assert_eq!(a, again);
}

#[test]
fn widen_keeps_closed_object_closed() {
    // The join of a closed-form object with an open one stays closed; this
    // is a deliberate asymmetry, preferring precision when any constituent
    // claims a complete field set.
    let mut a = TypeDesc {
        object: Some(ObjectDesc {
            all_fields_known: false,
            ..ObjectDesc::default()
        }),
        ..TypeDesc::default()
    };
    let b = TypeDesc {
        object: Some(ObjectDesc {
            all_fields_known: true,
            ..ObjectDesc::default()
        }),
        ..TypeDesc::default()
    };
    a.widen(&b);
    assert!(a.object.as_ref().is_some_and(|o| o.all_fields_known));
}

#[test]
fn simplify_compresses_reference_chains() {
    let mut g = TypeGraph::new();
    let a = g.new_placeholder();
    let b = g.new_placeholder();
    let c = g.new_placeholder();
    g.set_placeholder(a, tp_ref(b));
    g.set_placeholder(b, tp_ref(c));
    g.set_placeholder(c, tp_ref(NUMBER));

    g.simplify_references();
    assert_eq!(g.contains_of(a), &[NUMBER]);

    // Running the simplifier again must not change anything.
    g.simplify_references();
    assert_eq!(g.contains_of(a), &[NUMBER]);
}

#[test]
fn simplify_collapses_reference_cycles() {
    let mut g = TypeGraph::new();
    let a = g.new_placeholder();
    let b = g.new_placeholder();
    g.set_placeholder(a, tp_ref(b));
    g.set_placeholder(b, tp_ref(a));

    g.simplify_references();
    g.simplify_references();

    // Both ends point at one representative; no infinite chain remains.
    let target = g.contains_of(a)[0];
    assert!(target == a || target == b);
}

#[test]
fn literal_upper_bound() -> Result<()> {
    let (module, graph) = infer_snippet("local x = 1; x")?;
    let bound = graph.upper_bound_of(0, module.root.eidx());
    assert!(bound.maybe_number);
    assert!(!bound.maybe_string && !bound.maybe_bool && !bound.maybe_null);
    assert!(!bound.is_array() && !bound.is_object() && !bound.is_function());
    Ok(())
}

#[test]
fn conditional_joins_branches() -> Result<()> {
    let (module, graph) = infer_snippet("if true then 1 else \"s\"")?;
    let bound = graph.upper_bound_of(0, module.root.eidx());
    assert!(bound.maybe_number && bound.maybe_string);
    assert!(!bound.maybe_bool && !bound.maybe_null);
    Ok(())
}

#[test]
fn parameters_are_any() -> Result<()> {
    let (module, graph) = infer_snippet("local id(x) = x; id(1)")?;
    let bound = graph.upper_bound_of(0, module.root.eidx());
    assert!(bound.is_any());
    assert_eq!(describe(bound), "any");
    Ok(())
}

#[test]
fn recursive_array_terminates() -> Result<()> {
    let (module, graph) = infer_snippet("local xs = [xs]; xs[0][0]")?;
    let bound = graph.upper_bound_of(0, module.root.eidx());
    assert!(bound.is_array());
    // The element cache keeps the graph finite for recursive programs.
    assert!(graph.placeholder_count() < 100);
    Ok(())
}

#[test]
fn recursive_function_is_sound() -> Result<()> {
    assert_lint("local f(x) = if x == 0 then 0 else f(x - 1); f(3)", &[])?;
    let (module, graph) = infer_snippet("local f(x) = if x == 0 then 0 else f(x - 1); f(3)")?;
    let bound = graph.upper_bound_of(0, module.root.eidx());
    assert!(bound.maybe_number);
    assert!(!bound.maybe_string);
    Ok(())
}

#[test]
fn array_slots_are_tracked_individually() -> Result<()> {
    // Slot 0 is an object with a complete field set, slot 1 a number; a
    // known-int index only sees its own slot.
    assert_lint(
        "local arr = [{a: 1}, 2]; arr[0].b",
        &["Indexed object has no field \"b\""],
    )?;
    assert_lint(
        "local arr = [{a: 1}, 2]; arr[1].b",
        &["Indexed value is neither an array nor an object nor a string"],
    )?;
    assert_lint("local arr = [{a: 1}, 2]; arr[0].a", &[])
}

#[test]
fn generic_index_joins_all_slots() -> Result<()> {
    assert_lint(
        "local arr = [{a: 1}, 2]; local i = std.length(\"x\"); arr[i].a",
        &[],
    )
}

#[test]
fn large_known_int_degrades_to_generic() -> Result<()> {
    assert_lint("local arr = [1, 2]; arr[7] + 1", &[])
}

#[test]
fn stdlib_results_are_seeded() -> Result<()> {
    let (module, graph) = infer_snippet("std.length(\"abc\")")?;
    let bound = graph.upper_bound_of(0, module.root.eidx());
    assert!(bound.maybe_number);
    assert!(!bound.maybe_string);
    Ok(())
}
