// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Command-line front end: lint one Jsonnet file.
//!
//! Exit codes: 0 when the file is clean, 2 when diagnostics were reported,
//! 1 when the file could not be read.

use jsonnet_lint::{lint_source, FileResolver, LintError, Source};

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let mut args = std::env::args().skip(1);
    let (Some(path), None) = (args.next(), args.next()) else {
        eprintln!("usage: jsonnet-lint <file.jsonnet>");
        return 1;
    };

    let source = match Source::from_file(&path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let mut resolver = FileResolver::new();
    let mut errors: Vec<LintError> = Vec::new();
    match lint_source(&source, &mut resolver, &mut errors) {
        Ok(_) => (),
        Err(e) => {
            // Static parse error: diagnostics were found, just not lint ones.
            eprintln!("{e}");
            return 2;
        }
    }

    for err in &errors {
        eprintln!("{err}");
    }

    if errors.is_empty() {
        0
    } else {
        2
    }
}
