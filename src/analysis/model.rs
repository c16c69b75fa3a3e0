// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Type descriptions: the lattice elements attached to placeholders.
//!
//! A description lists which scalar kinds a value may have, plus up to
//! three structural facets (array, object, function). Facets carry
//! placeholder ids, never nested descriptions, so the lattice has finite
//! height within a strongly connected component and one widening pass per
//! component suffices.

use crate::analysis::graph::{normalize_placeholders, PlaceholderId};
use crate::Rc;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Array positions are tracked individually only up to this many slots;
/// everything beyond flows into the shared remainder.
pub(crate) const MAX_KNOWN: usize = 5;

/// Array facet: per-position element sources for a known prefix, and a
/// shared list for the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayDesc {
    pub all_contain: Vec<PlaceholderId>,
    pub element_contains: Vec<Vec<PlaceholderId>>,
}

impl ArrayDesc {
    fn widen(&mut self, other: &ArrayDesc) {
        self.all_contain.extend_from_slice(&other.all_contain);
        if self.element_contains.len() < other.element_contains.len() {
            self.element_contains
                .resize(other.element_contains.len(), Vec::new());
        }
        for (i, ps) in other.element_contains.iter().enumerate() {
            self.element_contains[i].extend_from_slice(ps);
        }
    }

    fn normalize(&mut self) {
        self.all_contain = normalize_placeholders(core::mem::take(&mut self.all_contain));
        for ps in &mut self.element_contains {
            *ps = normalize_placeholders(core::mem::take(ps));
        }
    }
}

/// Object facet: known fields, a shared list for everything else, and
/// whether the field set is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectDesc {
    pub all_contain: Vec<PlaceholderId>,
    pub field_contains: BTreeMap<Rc<str>, Vec<PlaceholderId>>,
    pub all_fields_known: bool,
}

impl ObjectDesc {
    fn widen(&mut self, other: &ObjectDesc) {
        self.all_contain.extend_from_slice(&other.all_contain);
        for (name, ps) in &other.field_contains {
            self.field_contains
                .entry(name.clone())
                .or_default()
                .extend_from_slice(ps);
        }
        self.all_fields_known = self.all_fields_known || other.all_fields_known;
    }

    fn normalize(&mut self) {
        self.all_contain = normalize_placeholders(core::mem::take(&mut self.all_contain));
        for ps in self.field_contains.values_mut() {
            *ps = normalize_placeholders(core::mem::take(ps));
        }
    }
}

/// Ordered parameter names carried by a function facet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncParams {
    pub required: Vec<Rc<str>>,
    pub optional: Vec<Rc<str>>,
}

/// Function facet: arity window, parameter names when known, and the
/// sources of the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDesc {
    pub min_arity: usize,
    pub max_arity: usize,
    pub params: Option<Rc<FuncParams>>,
    pub result_contains: Vec<PlaceholderId>,
}

impl FunctionDesc {
    // Arity and parameter names are not joined; they are only consulted at
    // apply sites.
    fn widen(&mut self, other: &FunctionDesc) {
        self.result_contains.extend_from_slice(&other.result_contains);
    }

    fn normalize(&mut self) {
        self.result_contains = normalize_placeholders(core::mem::take(&mut self.result_contains));
    }
}

/// A conservative description of the values an expression may produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDesc {
    pub maybe_bool: bool,
    pub maybe_number: bool,
    pub maybe_string: bool,
    pub maybe_null: bool,
    pub function: Option<FunctionDesc>,
    pub object: Option<ObjectDesc>,
    pub array: Option<ArrayDesc>,
}

impl TypeDesc {
    pub fn is_function(&self) -> bool {
        self.function.is_some()
    }

    pub fn is_object(&self) -> bool {
        self.object.is_some()
    }

    pub fn is_array(&self) -> bool {
        self.array.is_some()
    }

    /// All scalar kinds plus all three facets, each open to any value.
    pub fn is_any(&self) -> bool {
        use crate::analysis::graph::ANY;
        self.maybe_bool
            && self.maybe_number
            && self.maybe_string
            && self.maybe_null
            && matches!(&self.function, Some(f) if f.result_contains.contains(&ANY))
            && matches!(&self.object, Some(o) if o.all_contain.contains(&ANY))
            && matches!(&self.array, Some(a) if a.all_contain.contains(&ANY))
    }

    /// No scalar kinds and no facets: no value can match.
    pub fn is_void(&self) -> bool {
        !self.maybe_bool
            && !self.maybe_number
            && !self.maybe_string
            && !self.maybe_null
            && !self.is_function()
            && !self.is_object()
            && !self.is_array()
    }

    /// Lattice join: broaden `self` so it also admits everything `other`
    /// admits. Widening is monotone; nothing is ever removed.
    pub fn widen(&mut self, other: &TypeDesc) {
        self.maybe_bool = self.maybe_bool || other.maybe_bool;
        self.maybe_number = self.maybe_number || other.maybe_number;
        self.maybe_string = self.maybe_string || other.maybe_string;
        self.maybe_null = self.maybe_null || other.maybe_null;

        match (&mut self.function, &other.function) {
            (Some(a), Some(b)) => a.widen(b),
            (None, Some(b)) => self.function = Some(b.clone()),
            _ => (),
        }
        match (&mut self.object, &other.object) {
            (Some(a), Some(b)) => a.widen(b),
            (None, Some(b)) => self.object = Some(b.clone()),
            _ => (),
        }
        match (&mut self.array, &other.array) {
            (Some(a), Some(b)) => a.widen(b),
            (None, Some(b)) => self.array = Some(b.clone()),
            _ => (),
        }
    }

    /// Sort and deduplicate every placeholder list, collapsing lists that
    /// admit any value. Idempotent.
    pub fn normalize(&mut self) {
        if let Some(f) = &mut self.function {
            f.normalize();
        }
        if let Some(o) = &mut self.object {
            o.normalize();
        }
        if let Some(a) = &mut self.array {
            a.normalize();
        }
    }
}

/// Human-readable rendering of a description, used in diagnostics.
pub fn describe(t: &TypeDesc) -> String {
    if t.is_any() {
        return "any".into();
    }
    if t.is_void() {
        return "void".into();
    }
    let mut parts: Vec<&str> = Vec::new();
    if t.maybe_bool {
        parts.push("bool");
    }
    if t.maybe_number {
        parts.push("number");
    }
    if t.maybe_string {
        parts.push("string");
    }
    if t.maybe_null {
        parts.push("null");
    }
    if t.is_function() {
        parts.push("function");
    }
    if t.is_object() {
        parts.push("object");
    }
    if t.is_array() {
        parts.push("array");
    }
    parts.join(" or ")
}

/// The shape of a deferred index operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IndexKind {
    /// Index value unknown, or known but untracked.
    Generic,
    /// Indexing by a known string key.
    KnownString(Rc<str>),
    /// Indexing by a known small non-negative integer, below `MAX_KNOWN`.
    KnownInt(usize),
    /// Function application.
    Call,
}

/// A deferred "element of `indexed` under this index shape" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexSpec {
    pub indexed: PlaceholderId,
    pub kind: IndexKind,
}

impl IndexSpec {
    pub fn generic(indexed: PlaceholderId) -> Self {
        IndexSpec {
            indexed,
            kind: IndexKind::Generic,
        }
    }

    pub fn known_string(indexed: PlaceholderId, key: Rc<str>) -> Self {
        IndexSpec {
            indexed,
            kind: IndexKind::KnownString(key),
        }
    }

    pub fn known_int(indexed: PlaceholderId, index: usize) -> Self {
        IndexSpec {
            indexed,
            kind: IndexKind::KnownInt(index),
        }
    }

    pub fn call(target: PlaceholderId) -> Self {
        IndexSpec {
            indexed: target,
            kind: IndexKind::Call,
        }
    }
}

/// Per-placeholder cache of materialized element placeholders, one slot per
/// distinct index shape. Populated before recursing so that recursive
/// programs terminate with a finite graph.
#[derive(Debug, Clone, Default)]
pub(crate) struct ElementDesc {
    pub generic: PlaceholderId,
    pub string_index: BTreeMap<Rc<str>, PlaceholderId>,
    pub int_index: [PlaceholderId; MAX_KNOWN],
    pub call: PlaceholderId,
}
