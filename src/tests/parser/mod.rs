// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::common::parse;
use crate::ast::{children, BinaryOp, Expr, ExprRef};
use crate::Set;

use alloc::vec::Vec;

use anyhow::{bail, Result};

fn collect_eidx(expr: &ExprRef, out: &mut Vec<u32>) {
    out.push(expr.eidx());
    for child in children(expr) {
        collect_eidx(child, out);
    }
}

#[test]
fn expression_indices_are_unique_and_bounded() -> Result<()> {
    let module = parse(
        "local f(x, y=2) = if x > 0 then [x, y] else {a: x, [\"b\" + \"c\"]: y};\nf(1) + f(2, 3)",
    )?;
    let mut eidx = Vec::new();
    collect_eidx(&module.root, &mut eidx);

    let unique: Set<u32> = eidx.iter().copied().collect();
    if unique.len() != eidx.len() {
        bail!("duplicate expression indices: {eidx:?}");
    }
    for idx in &eidx {
        if *idx >= module.num_exprs {
            bail!("expression index {idx} out of bounds ({})", module.num_exprs);
        }
    }
    Ok(())
}

#[test]
fn field_access_is_string_index() -> Result<()> {
    let module = parse("a.b")?;
    let Expr::Index { index, .. } = module.root.as_ref() else {
        bail!("expected index, got {:?}", module.root);
    };
    let Expr::String { value, .. } = index.as_ref() else {
        bail!("expected string index, got {index:?}");
    };
    assert_eq!(value.as_ref(), "b");
    Ok(())
}

#[test]
fn array_comprehension_desugars_to_flat_map() -> Result<()> {
    let module = parse("[x for x in [1, 2]]")?;
    let Expr::Apply { target, args, .. } = module.root.as_ref() else {
        bail!("expected apply, got {:?}", module.root);
    };
    let Expr::Index { target: std_var, index, .. } = target.as_ref() else {
        bail!("expected std field access, got {target:?}");
    };
    assert!(matches!(std_var.as_ref(), Expr::Var { name, .. } if name.as_ref() == "std"));
    assert!(matches!(index.as_ref(), Expr::String { value, .. } if value.as_ref() == "flatMap"));
    assert_eq!(args.positional.len(), 2);
    assert!(matches!(
        args.positional[0].as_ref(),
        Expr::Function { .. }
    ));
    Ok(())
}

#[test]
fn object_comprehension_desugars_to_flat_merge() -> Result<()> {
    let module = parse("{[k]: 1 for k in [\"a\"]}")?;
    let Expr::Apply { target, .. } = module.root.as_ref() else {
        bail!("expected apply, got {:?}", module.root);
    };
    let Expr::Index { index, .. } = target.as_ref() else {
        bail!("expected std field access, got {target:?}");
    };
    assert!(matches!(
        index.as_ref(),
        Expr::String { value, .. } if value.as_ref() == "$objectFlatMerge"
    ));
    Ok(())
}

#[test]
fn slice_desugars_to_std_slice() -> Result<()> {
    let module = parse("[1, 2, 3][1:2]")?;
    let Expr::Apply { target, args, .. } = module.root.as_ref() else {
        bail!("expected apply, got {:?}", module.root);
    };
    let Expr::Index { index, .. } = target.as_ref() else {
        bail!("expected std field access, got {target:?}");
    };
    assert!(matches!(index.as_ref(), Expr::String { value, .. } if value.as_ref() == "slice"));
    assert_eq!(args.positional.len(), 4);
    assert!(matches!(args.positional[3].as_ref(), Expr::Null { .. }));
    Ok(())
}

#[test]
fn object_apply_desugars_to_plus() -> Result<()> {
    let module = parse("{a: 1} {b: 2}")?;
    let Expr::Binary { op, .. } = module.root.as_ref() else {
        bail!("expected binary, got {:?}", module.root);
    };
    assert_eq!(*op, BinaryOp::Plus);
    Ok(())
}

#[test]
fn method_fields_become_functions() -> Result<()> {
    let module = parse("{f(x): x}")?;
    let Expr::Object { fields, .. } = module.root.as_ref() else {
        bail!("expected object, got {:?}", module.root);
    };
    assert!(matches!(fields[0].body.as_ref(), Expr::Function { .. }));
    Ok(())
}

#[test]
fn local_function_sugar() -> Result<()> {
    let module = parse("local f(x) = x; f")?;
    let Expr::Local { binds, .. } = module.root.as_ref() else {
        bail!("expected local, got {:?}", module.root);
    };
    let Expr::Function { params, .. } = binds[0].body.as_ref() else {
        bail!("expected function bind, got {:?}", binds[0].body);
    };
    assert_eq!(params.required.len(), 1);
    Ok(())
}

#[test]
fn expression_assert_desugars_to_conditional() -> Result<()> {
    let module = parse("assert true : \"nope\"; 1")?;
    let Expr::Conditional { branch_false, .. } = module.root.as_ref() else {
        bail!("expected conditional, got {:?}", module.root);
    };
    assert!(matches!(branch_false.as_ref(), Expr::Error { .. }));
    Ok(())
}

#[test]
fn missing_else_defaults_to_null() -> Result<()> {
    let module = parse("if true then 1")?;
    let Expr::Conditional { branch_false, .. } = module.root.as_ref() else {
        bail!("expected conditional, got {:?}", module.root);
    };
    assert!(matches!(branch_false.as_ref(), Expr::Null { .. }));
    Ok(())
}

#[test]
fn plus_super_fields_are_flagged() -> Result<()> {
    let module = parse("{a+: 1}")?;
    let Expr::Object { fields, .. } = module.root.as_ref() else {
        bail!("expected object, got {:?}", module.root);
    };
    assert!(fields[0].plus_super);
    Ok(())
}

#[test]
fn in_super_parses() -> Result<()> {
    let module = parse("{f: \"x\" in super}")?;
    let Expr::Object { fields, .. } = module.root.as_ref() else {
        bail!("expected object, got {:?}", module.root);
    };
    assert!(matches!(fields[0].body.as_ref(), Expr::InSuper { .. }));
    Ok(())
}

#[test]
fn string_escapes_are_decoded() -> Result<()> {
    let module = parse("\"a\\nb\\u0041\"")?;
    let Expr::String { value, .. } = module.root.as_ref() else {
        bail!("expected string, got {:?}", module.root);
    };
    assert_eq!(value.as_ref(), "a\nbA");
    Ok(())
}

#[test]
fn verbatim_strings_collapse_doubled_quotes() -> Result<()> {
    let module = parse("@'it''s'")?;
    let Expr::String { value, .. } = module.root.as_ref() else {
        bail!("expected string, got {:?}", module.root);
    };
    assert_eq!(value.as_ref(), "it's");
    Ok(())
}

#[test]
fn text_blocks_are_rejected() {
    assert!(parse("|||\n  text\n|||").is_err());
}

#[test]
fn keywords_cannot_be_bound() {
    assert!(parse("local local = 3; 1").is_err());
}

#[test]
fn named_before_positional_is_rejected() {
    assert!(parse("local f(x, y) = x; f(x=1, 2)").is_err());
}

#[test]
fn operator_precedence_nests_correctly() -> Result<()> {
    let module = parse("1 + 2 * 3")?;
    let Expr::Binary { op, right, .. } = module.root.as_ref() else {
        bail!("expected binary, got {:?}", module.root);
    };
    assert_eq!(*op, BinaryOp::Plus);
    assert!(matches!(
        right.as_ref(),
        Expr::Binary { op: BinaryOp::Mult, .. }
    ));
    Ok(())
}
