// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Unsafe code should not be used.
// Hard to reason about correctness, and maintainability.
#![forbid(unsafe_code)]
// Ensure that all lint names are valid.
#![deny(unknown_lints)]
// Fail-fast lints: correctness, safety, and API surface
#![deny(
    // Panic sources. Invariant breaches inside the analyzer deliberately
    // panic; everything else must propagate errors.
    clippy::unwrap_used, // reject Result/Option unwraps
    clippy::expect_used, // reject expect with panic messages
    clippy::todo, // blocks remaining todo! placeholders
    clippy::unimplemented, // blocks unimplemented! placeholders

    // Rust warnings/upstream
    dead_code, // ban unused items
    deprecated, // prevent use of deprecated APIs
    future_incompatible, // catch patterns slated to break
    keyword_idents, // disallow identifiers that are keywords
    missing_debug_implementations, // require Debug on public types
    non_ascii_idents, // disallow non-ASCII identifiers
    nonstandard_style, // enforce idiomatic naming/style
    noop_method_call, // catch no-op method calls
    trivial_casts, // block needless casts
    unreachable_patterns, // catch unreachable match arms
    unused_extern_crates, // remove unused extern crate declarations
    unused_import_braces, // avoid unused braces in imports
    absolute_paths_not_starting_with_crate, // enforce crate:: prefix for absolute paths

    // API correctness / style
    clippy::semicolon_if_nothing_returned, // enforce trailing semicolon for unit
    clippy::unused_self, // remove unused self parameters
    clippy::redundant_pub_crate, // avoid pub(crate) on already pub items
    clippy::wildcard_dependencies, // disallow wildcard Cargo dependency versions

    // no_std hygiene
    clippy::std_instead_of_core, // prefer core/alloc over std in no_std

    // Misc polish
    clippy::dbg_macro, // forbid dbg! in production code
    clippy::empty_line_after_outer_attr, // enforce spacing after outer attrs
)]
// Advisory lints: useful, but not fatal
#![warn(
    clippy::match_like_matches_macro, // prefer matches! macro over verbose match
    clippy::needless_continue, // remove redundant continue statements
)]
// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]
// We'll default to building for no_std - use core, alloc instead of std.
#![no_std]

extern crate alloc;

// Import std crate if building with std support.
// We don't import types or macros from std.
// As a result, types and macros from std must be qualified via `std::`
// making dependencies on std easier to spot.
#[cfg(any(feature = "std", test))]
extern crate std;

pub mod analysis;
mod ast;
mod imports;
mod lexer;
mod linter;
mod parser;
mod variables;

pub use ast::{
    children, Arguments, BinaryOp, Bind, Expr, ExprRef, Field, Module, NamedArg, Param,
    Parameters, Ref, UnaryOp,
};
pub use imports::{
    collect_imports, ImportMap, ImportResolver, ImportStatus, MemoryResolver, ModuleUnit,
};
pub use lexer::{Source, SourceStr, Span};
pub use linter::{lint, lint_source, ErrorSink, LintError, Location};
pub use parser::Parser;
pub use variables::{resolve_variables, VarInfo, VarKind, Variable};

#[cfg(feature = "std")]
pub use imports::FileResolver;

#[cfg(feature = "arc")]
pub use alloc::sync::Arc as Rc;

#[cfg(not(feature = "arc"))]
pub use alloc::rc::Rc;

#[cfg(feature = "std")]
use std::collections::{HashMap as Map, HashSet as Set};

#[cfg(not(feature = "std"))]
use alloc::collections::{BTreeMap as Map, BTreeSet as Set};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests;
