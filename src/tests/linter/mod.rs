// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::common::{assert_lint, lint_messages_with_files};

use anyhow::{bail, Result};

fn assert_lint_with_files(code: &str, files: &[(&str, &str)], expected: &[&str]) -> Result<()> {
    let messages = lint_messages_with_files(code, files)?;
    if messages != expected {
        bail!("for {code:?}:\nexpected {expected:#?}\ngot      {messages:#?}");
    }
    Ok(())
}

#[test]
fn indexing_a_number() -> Result<()> {
    assert_lint(
        "local x = 1; x.y",
        &["Indexed value is neither an array nor an object nor a string"],
    )
}

#[test]
fn calling_a_number() -> Result<()> {
    assert_lint(
        "local f = 3; f(1, 2)",
        &["Called value must be a function, but it is assumed to be number"],
    )
}

#[test]
fn reading_an_absent_field() -> Result<()> {
    assert_lint("{a: 1}.b", &["Indexed object has no field \"b\""])
}

#[test]
fn missing_required_argument() -> Result<()> {
    assert_lint("local g(x, y) = x; g(1)", &["Missing argument: y"])
}

#[test]
fn too_many_arguments() -> Result<()> {
    assert_lint(
        "local h(x) = x; h(1, 2, 3)",
        &["Too many arguments: got 3, but expected at most 1"],
    )
}

#[test]
fn unused_variable() -> Result<()> {
    assert_lint("local unused = 1; 2", &["Unused variable: unused"])
}

#[test]
fn undeclared_variable() -> Result<()> {
    assert_lint("y + 1", &["Undeclared variable: y"])
}

#[test]
fn dollar_outside_object() -> Result<()> {
    assert_lint("$.x", &["No top-level object found"])
}

#[test]
fn unused_variables_in_declaration_order() -> Result<()> {
    assert_lint(
        "local a = 1, b = 2; 3",
        &["Unused variable: a", "Unused variable: b"],
    )
}

#[test]
fn unused_reported_before_type_errors() -> Result<()> {
    assert_lint(
        "local unused = 1; local f = 2; f(3)",
        &[
            "Unused variable: unused",
            "Called value must be a function, but it is assumed to be number",
        ],
    )
}

#[test]
fn parameters_are_not_reported_unused() -> Result<()> {
    assert_lint("local f = function(a) 1; f(2)", &[])
}

#[test]
fn checker_order_is_depth_first() -> Result<()> {
    assert_lint(
        "[{a: 1}.b, null(1)]",
        &[
            "Indexed object has no field \"b\"",
            "Called value must be a function, but it is assumed to be null",
        ],
    )
}

#[test]
fn named_argument_already_provided() -> Result<()> {
    assert_lint(
        "local f(x, y=1) = x; f(1, x=2)",
        &["Argument x already provided"],
    )
}

#[test]
fn named_argument_unknown() -> Result<()> {
    assert_lint(
        "local f(x, y=1) = x; f(1, z=2)",
        &["function has no parameter z"],
    )
}

#[test]
fn named_arguments_satisfy_required() -> Result<()> {
    assert_lint("local f(x, y=1) = x; f(y=1, x=2)", &[])
}

#[test]
fn optional_parameters_widen_arity() -> Result<()> {
    assert_lint("local f(x, y=1) = x; f(2)", &[])?;
    assert_lint("local f(x, y=1) = x; f(2, 3)", &[])?;
    assert_lint(
        "local f(x, y=1) = x; f(2, 3, 4)",
        &["Too many arguments: got 3, but expected at most 2"],
    )
}

#[test]
fn stdlib_call_is_clean() -> Result<()> {
    assert_lint("std.length(\"abc\") + std.max(1, 2)", &[])
}

#[test]
fn stdlib_missing_argument() -> Result<()> {
    assert_lint("std.length()", &["Missing argument: x"])
}

#[test]
fn stdlib_too_many_arguments() -> Result<()> {
    assert_lint(
        "std.length(1, 2)",
        &["Too many arguments: got 2, but expected at most 1"],
    )
}

#[test]
fn stdlib_unknown_field() -> Result<()> {
    assert_lint(
        "std.nope(1)",
        &[
            "Indexed object has no field \"nope\"",
            "Called value must be a function, but it is assumed to be void",
        ],
    )
}

#[test]
fn method_fields_carry_signatures() -> Result<()> {
    assert_lint("{inc(x): x + 1}.inc(3)", &[])?;
    assert_lint("{inc(x): x + 1}.inc()", &["Missing argument: x"])?;
    assert_lint(
        "{inc(x): x + 1}.inc(1, 2)",
        &["Too many arguments: got 2, but expected at most 1"],
    )
}

#[test]
fn object_with_computed_name_is_open() -> Result<()> {
    assert_lint("local k = \"a\"; {[k]: 1}.b", &[])
}

#[test]
fn string_index_must_be_number() -> Result<()> {
    assert_lint(
        "local s = \"abc\"; s.len",
        &["Indexed value is assumed to be a string, but index is not a number"],
    )
}

#[test]
fn array_index_must_be_number() -> Result<()> {
    assert_lint(
        "[1][\"a\"]",
        &["Indexed value is assumed to be an array, but index is not a number"],
    )
}

#[test]
fn object_index_must_be_string() -> Result<()> {
    assert_lint(
        "{a: 1}[2]",
        &["Indexed value is assumed to be an object, but index is not a string"],
    )
}

#[test]
fn ambiguous_target_rejects_null_index() -> Result<()> {
    assert_lint(
        "(if true then {a: 1} else [1])[null]",
        &["Index is neither a number (for indexing arrays and string) nor a string (for indexing objects)"],
    )
}

#[test]
fn ambiguous_target_accepts_either_index() -> Result<()> {
    assert_lint("(if true then {a: 1} else [1])[\"a\"]", &[])?;
    assert_lint("(if true then 1 else \"s\")[0]", &[])
}

#[test]
fn comprehensions_are_clean() -> Result<()> {
    assert_lint("[x * x for x in [1, 2, 3]][0] + 1", &[])?;
    assert_lint("{[k]: 1 for k in [\"a\", \"b\"]}.c", &[])
}

#[test]
fn asserts_are_analyzed() -> Result<()> {
    assert_lint("{assert self.x > 0, x: 1}.x", &[])?;
    assert_lint(
        "assert {a: 1}.b == 1; 2",
        &["Indexed object has no field \"b\""],
    )
}

#[test]
fn import_provides_fields() -> Result<()> {
    let files = [("lib.jsonnet", "{value: 1, double(x): x * 2}")];
    assert_lint_with_files("(import \"lib.jsonnet\").value + 1", &files, &[])?;
    assert_lint_with_files(
        "(import \"lib.jsonnet\").missing",
        &files,
        &["Indexed object has no field \"missing\""],
    )?;
    assert_lint_with_files(
        "(import \"lib.jsonnet\").double(2, 3)",
        &files,
        &["Too many arguments: got 2, but expected at most 1"],
    )
}

#[test]
fn import_failure_reported_at_site() -> Result<()> {
    assert_lint_with_files(
        "import \"nope.jsonnet\"",
        &[],
        &["Couldn't open import \"nope.jsonnet\""],
    )
}

#[test]
fn importstr_failure_reported_at_site() -> Result<()> {
    assert_lint_with_files(
        "importstr \"data.txt\"",
        &[],
        &["Couldn't open import \"data.txt\""],
    )?;
    assert_lint_with_files("importstr \"data.txt\"", &[("data.txt", "hi")], &[])
}

#[test]
fn import_cycle_terminates() -> Result<()> {
    let files = [
        ("a.jsonnet", "{x: (import \"b.jsonnet\").y}"),
        ("b.jsonnet", "{y: (import \"a.jsonnet\").x}"),
    ];
    assert_lint_with_files("(import \"a.jsonnet\").x", &files, &[])
}

#[test]
fn imported_file_type_errors_reported() -> Result<()> {
    let files = [("bad.jsonnet", "local f = 3; f(1)")];
    assert_lint_with_files(
        "import \"bad.jsonnet\"",
        &files,
        &["Called value must be a function, but it is assumed to be number"],
    )
}

#[test]
fn imported_file_unused_not_reported() -> Result<()> {
    let files = [("lib.jsonnet", "local unused = 1; {a: 2}")];
    assert_lint_with_files("(import \"lib.jsonnet\").a", &files, &[])
}

#[test]
fn binary_results_are_unconstrained() -> Result<()> {
    assert_lint("local o = {a: 1} + {b: 2}; o.c", &[])
}

#[test]
fn error_expression_is_void() -> Result<()> {
    assert_lint("if true then 1 else error \"boom\"", &[])
}
