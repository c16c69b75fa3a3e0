// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! YAML-driven end-to-end lint cases.
//!
//! Each file under `tests/lint` holds a list of cases: a snippet, optional
//! importable files, and the exact expected diagnostic messages in order.

use anyhow::{bail, Result};
use jsonnet_lint::{lint_source, LintError, MemoryResolver, Source};
use serde::Deserialize;
use std::collections::BTreeMap;
use test_generator::test_resources;

#[derive(Deserialize, Debug)]
struct Test {
    cases: Vec<Case>,
}

#[derive(Deserialize, Debug)]
struct Case {
    note: String,
    jsonnet: String,
    #[serde(default)]
    files: BTreeMap<String, String>,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    parse_error: bool,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        let source = Source::from_contents("test.jsonnet".to_string(), case.jsonnet.clone())?;
        let mut resolver = MemoryResolver::new();
        for (name, contents) in &case.files {
            resolver.add_file(name, contents);
        }

        let mut errors: Vec<LintError> = vec![];
        match lint_source(&source, &mut resolver, &mut errors) {
            Ok(_) => {
                if case.parse_error {
                    bail!("{}: expected a parse error", case.note);
                }
            }
            Err(e) => {
                if case.parse_error {
                    continue;
                }
                bail!("{}: unexpected parse error: {e}", case.note);
            }
        }

        let messages: Vec<String> = errors.iter().map(|e| e.message().to_string()).collect();
        if messages != case.errors {
            bail!(
                "{}: diagnostics mismatch\nexpected: {:#?}\ngot:      {:#?}",
                case.note,
                case.errors,
                messages
            );
        }
    }

    Ok(())
}

#[test_resources("tests/lint/**/*.yaml")]
fn yaml_test(file: &str) {
    yaml_test_impl(file).unwrap();
}
