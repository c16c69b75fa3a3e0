// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Standard library seeding.
//!
//! The `STDLIB` placeholder is an object with a complete field set: every
//! built-in is pinned to its parameter names and result kind, so that
//! `std.length(x)` has a usable type and `std.nonexistent` is a reportable
//! mistake. The signatures ship as an embedded catalog; argument types are
//! not tracked.

use crate::analysis::graph::{
    concrete_tp, PlaceholderId, TypeGraph, ANY, ANY_ARRAY, ANY_FUNCTION, ANY_OBJECT, BOOL, NUMBER,
    STDLIB, STRING,
};
use crate::analysis::model::{ObjectDesc, TypeDesc};
use crate::Rc;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use lazy_static::lazy_static;
use serde::Deserialize;

const STDLIB_JSON: &str = include_str!("./stdlib.json");

#[derive(Debug, Deserialize)]
struct Catalog {
    builtins: Vec<Builtin>,
}

#[derive(Debug, Deserialize)]
struct Builtin {
    name: String,
    /// Absent for plain value fields such as `thisFile`.
    #[serde(default)]
    args: Option<Vec<String>>,
    result: ResultKind,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum ResultKind {
    Any,
    Bool,
    Number,
    String,
    AnyArray,
    ArrayOfString,
    ArrayOfNumber,
    AnyObject,
    AnyFunction,
    Json,
    StringOrArray,
    StringOrNumber,
}

impl ResultKind {
    fn placeholder(self) -> PlaceholderId {
        match self {
            // The element kinds of arrays and the non-function shape of
            // json values are not tracked yet.
            ResultKind::Any
            | ResultKind::Json
            | ResultKind::StringOrArray
            | ResultKind::StringOrNumber => ANY,
            ResultKind::Bool => BOOL,
            ResultKind::Number => NUMBER,
            ResultKind::String => STRING,
            ResultKind::AnyArray | ResultKind::ArrayOfString | ResultKind::ArrayOfNumber => {
                ANY_ARRAY
            }
            ResultKind::AnyObject => ANY_OBJECT,
            ResultKind::AnyFunction => ANY_FUNCTION,
        }
    }
}

lazy_static! {
    static ref CATALOG: Catalog = match serde_json::from_str(STDLIB_JSON) {
        Ok(catalog) => catalog,
        Err(e) => panic!("embedded stdlib catalog is invalid: {e}"),
    };
}

/// Populate the `STDLIB` placeholder. Must run right after the other
/// sentinels have been allocated.
pub(crate) fn seed(g: &mut TypeGraph) {
    let stdlib_id = g.new_placeholder();
    debug_assert_eq!(stdlib_id, STDLIB);

    let mut field_contains: BTreeMap<Rc<str>, Vec<PlaceholderId>> = BTreeMap::new();
    for builtin in &CATALOG.builtins {
        let result = builtin.result.placeholder();
        let p = match &builtin.args {
            Some(args) => {
                let names: Vec<&str> = args.iter().map(String::as_str).collect();
                g.new_simple_func(result, &names)
            }
            None => result,
        };
        field_contains.insert(Rc::from(builtin.name.as_str()), vec![p]);
    }

    g.set_placeholder(
        STDLIB,
        concrete_tp(TypeDesc {
            object: Some(ObjectDesc {
                all_contain: vec![],
                field_contains,
                all_fields_known: true,
            }),
            ..TypeDesc::default()
        }),
    );
}
