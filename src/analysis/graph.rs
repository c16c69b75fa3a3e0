// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The type-inference graph and its solving phases.
//!
//! Placeholders are owned by one vector and referred to by dense ids.
//! Low ids are reserved for sentinel placeholders describing the primitive
//! kinds, the unconstrained structural kinds, and the standard library.

use crate::analysis::model::{
    ArrayDesc, ElementDesc, FuncParams, FunctionDesc, IndexKind, IndexSpec, ObjectDesc, TypeDesc,
};
use crate::analysis::stdlib;
use crate::Rc;

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

/// Dense id of one placeholder in the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaceholderId(pub(crate) u32);

impl PlaceholderId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

// Sentinel placeholders occupy fixed low ids. `NO_TYPE` is the zero value
// standing for "not initialized"; it never appears in a solved graph.
pub(crate) const NO_TYPE: PlaceholderId = PlaceholderId(0);
pub(crate) const ANY: PlaceholderId = PlaceholderId(1);
pub(crate) const BOOL: PlaceholderId = PlaceholderId(2);
pub(crate) const NUMBER: PlaceholderId = PlaceholderId(3);
pub(crate) const STRING: PlaceholderId = PlaceholderId(4);
pub(crate) const NULL: PlaceholderId = PlaceholderId(5);
pub(crate) const ANY_ARRAY: PlaceholderId = PlaceholderId(6);
pub(crate) const ANY_OBJECT: PlaceholderId = PlaceholderId(7);
pub(crate) const ANY_FUNCTION: PlaceholderId = PlaceholderId(8);
pub(crate) const STDLIB: PlaceholderId = PlaceholderId(9);

/// Sort, deduplicate, and collapse to `[ANY]` when any value is already
/// admitted.
pub(crate) fn normalize_placeholders(mut placeholders: Vec<PlaceholderId>) -> Vec<PlaceholderId> {
    if placeholders.contains(&ANY) {
        return vec![ANY];
    }
    placeholders.sort_unstable();
    placeholders.dedup();
    placeholders
}

/// One node of the inference graph.
#[derive(Debug, Clone, Default)]
pub(crate) struct TypePlaceholder {
    /// Locally-implied type, independent of data flow.
    pub concrete: TypeDesc,
    /// Placeholders whose values flow into this one.
    pub contains: Vec<PlaceholderId>,
    /// At most one deferred index request; always cleared by
    /// `separate_element_types`.
    pub index: Option<IndexSpec>,
}

pub(crate) fn concrete_tp(t: TypeDesc) -> TypePlaceholder {
    TypePlaceholder {
        concrete: t,
        contains: vec![],
        index: None,
    }
}

pub(crate) fn tp_ref(p: PlaceholderId) -> TypePlaceholder {
    TypePlaceholder {
        concrete: TypeDesc::default(),
        contains: vec![p],
        index: None,
    }
}

pub(crate) fn tp_sum(p1: PlaceholderId, p2: PlaceholderId) -> TypePlaceholder {
    TypePlaceholder {
        concrete: TypeDesc::default(),
        contains: vec![p1, p2],
        index: None,
    }
}

pub(crate) fn tp_index(index: IndexSpec) -> TypePlaceholder {
    TypePlaceholder {
        concrete: TypeDesc::default(),
        contains: vec![],
        index: Some(index),
    }
}

/// The inference graph for one joint analysis run.
#[derive(Debug, Default)]
pub struct TypeGraph {
    placeholders: Vec<TypePlaceholder>,
    element_type: Vec<Option<ElementDesc>>,
    /// Per module: expression index to placeholder id.
    expr_placeholders: Vec<Vec<PlaceholderId>>,
    topo_order: Vec<PlaceholderId>,
    scc_of: Vec<u32>,
    upper_bound: Vec<TypeDesc>,
}

impl TypeGraph {
    pub(crate) fn new() -> TypeGraph {
        let mut g = TypeGraph::default();

        let any_function = FunctionDesc {
            min_arity: 0,
            // No program can get anywhere near this arity; the window just
            // has to never reject a call.
            max_arity: usize::MAX,
            params: None,
            result_contains: vec![ANY],
        };
        let any_object = ObjectDesc {
            all_contain: vec![ANY],
            field_contains: BTreeMap::new(),
            all_fields_known: false,
        };
        let any_array = ArrayDesc {
            all_contain: vec![ANY],
            element_contains: vec![],
        };

        g.seed_sentinel(NO_TYPE, TypeDesc::default());
        g.seed_sentinel(
            ANY,
            TypeDesc {
                maybe_bool: true,
                maybe_number: true,
                maybe_string: true,
                maybe_null: true,
                function: Some(any_function.clone()),
                object: Some(any_object.clone()),
                array: Some(any_array.clone()),
            },
        );
        g.seed_sentinel(
            BOOL,
            TypeDesc {
                maybe_bool: true,
                ..TypeDesc::default()
            },
        );
        g.seed_sentinel(
            NUMBER,
            TypeDesc {
                maybe_number: true,
                ..TypeDesc::default()
            },
        );
        g.seed_sentinel(
            STRING,
            TypeDesc {
                maybe_string: true,
                ..TypeDesc::default()
            },
        );
        g.seed_sentinel(
            NULL,
            TypeDesc {
                maybe_null: true,
                ..TypeDesc::default()
            },
        );
        g.seed_sentinel(
            ANY_ARRAY,
            TypeDesc {
                array: Some(any_array),
                ..TypeDesc::default()
            },
        );
        g.seed_sentinel(
            ANY_OBJECT,
            TypeDesc {
                object: Some(any_object),
                ..TypeDesc::default()
            },
        );
        g.seed_sentinel(
            ANY_FUNCTION,
            TypeDesc {
                function: Some(any_function),
                ..TypeDesc::default()
            },
        );

        stdlib::seed(&mut g);
        g
    }

    fn seed_sentinel(&mut self, expected: PlaceholderId, t: TypeDesc) {
        let id = self.new_placeholder();
        debug_assert_eq!(id, expected);
        self.placeholders[id.idx()] = concrete_tp(t);
    }

    pub(crate) fn new_placeholder(&mut self) -> PlaceholderId {
        self.placeholders.push(TypePlaceholder::default());
        self.element_type.push(None);
        PlaceholderId((self.placeholders.len() - 1) as u32)
    }

    pub(crate) fn set_placeholder(&mut self, id: PlaceholderId, tp: TypePlaceholder) {
        self.placeholders[id.idx()] = tp;
    }

    pub(crate) fn add_module(&mut self, num_exprs: u32) -> usize {
        self.expr_placeholders
            .push(vec![NO_TYPE; num_exprs as usize]);
        self.expr_placeholders.len() - 1
    }

    /// Placeholder of the expression `eidx` in module `module_idx`.
    ///
    /// Panics if the expression has not been assigned a placeholder; during
    /// graph construction that means a child was reached before its
    /// allocation, which is a bug in the builder, not in user code.
    pub(crate) fn expr_placeholder(&self, module_idx: usize, eidx: u32) -> PlaceholderId {
        let p = self.expr_placeholders[module_idx][eidx as usize];
        if p == NO_TYPE {
            panic!("placeholder missing for expression {eidx} in module {module_idx}");
        }
        p
    }

    pub(crate) fn set_expr_placeholder(&mut self, module_idx: usize, eidx: u32, p: PlaceholderId) {
        self.expr_placeholders[module_idx][eidx as usize] = p;
    }

    pub(crate) fn new_simple_func(
        &mut self,
        return_type: PlaceholderId,
        arg_names: &[&str],
    ) -> PlaceholderId {
        let params = FuncParams {
            required: arg_names.iter().map(|n| Rc::from(*n)).collect(),
            optional: vec![],
        };
        let p = self.new_placeholder();
        self.placeholders[p.idx()] = concrete_tp(TypeDesc {
            function: Some(FunctionDesc {
                min_arity: arg_names.len(),
                max_arity: arg_names.len(),
                params: Some(Rc::new(params)),
                result_contains: vec![return_type],
            }),
            ..TypeDesc::default()
        });
        p
    }

    /// Upper bound of a placeholder after `find_types` has run.
    pub(crate) fn upper_bound(&self, p: PlaceholderId) -> &TypeDesc {
        &self.upper_bound[p.idx()]
    }

    /// Upper bound of the expression `eidx` in module `module_idx`.
    pub fn upper_bound_of(&self, module_idx: usize, eidx: u32) -> &TypeDesc {
        self.upper_bound(self.expr_placeholder(module_idx, eidx))
    }

    /// Remove indirection through simple references: placeholders which add
    /// no local type, carry no index request, and contain exactly one other
    /// placeholder are rewritten away everywhere they are referenced.
    pub(crate) fn simplify_references(&mut self) {
        let n = self.placeholders.len();
        let mut mapping: Vec<PlaceholderId> = (0..n).map(|i| PlaceholderId(i as u32)).collect();
        for (i, p) in self.placeholders.iter().enumerate() {
            if p.concrete.is_void() && p.index.is_none() && p.contains.len() == 1 {
                mapping[i] = p.contains[0];
            }
        }

        // Full transitive closure. A cycle of pure references collapses to
        // the placeholder at which the cycle was first entered.
        let mut state = vec![ResolveState::Unvisited; n];
        for i in 0..n {
            resolve_mapping(&mut mapping, &mut state, PlaceholderId(i as u32));
        }

        for p in &mut self.placeholders {
            for c in &mut p.contains {
                *c = mapping[c.idx()];
            }
            if let Some(index) = &mut p.index {
                index.indexed = mapping[index.indexed.idx()];
            }
        }

        for table in &mut self.expr_placeholders {
            for p in table.iter_mut() {
                if *p != NO_TYPE {
                    *p = mapping[p.idx()];
                }
            }
        }
    }

    fn lookup_element_type(&self, target: PlaceholderId, index: &IndexSpec) -> PlaceholderId {
        match &self.element_type[target.idx()] {
            None => NO_TYPE,
            Some(el) => match &index.kind {
                IndexKind::Generic => el.generic,
                IndexKind::KnownString(key) => {
                    el.string_index.get(key).copied().unwrap_or(NO_TYPE)
                }
                IndexKind::KnownInt(i) => el.int_index[*i],
                IndexKind::Call => el.call,
            },
        }
    }

    fn get_or_create_element_type(
        &mut self,
        target: PlaceholderId,
        index: &IndexSpec,
    ) -> (bool, PlaceholderId) {
        let existing = self.lookup_element_type(target, index);
        if existing != NO_TYPE {
            return (false, existing);
        }
        let el_id = self.new_placeholder();
        self.set_element_type(target, index, el_id);
        (true, el_id)
    }

    fn set_element_type(&mut self, target: PlaceholderId, index: &IndexSpec, new_id: PlaceholderId) {
        let el = self.element_type[target.idx()].get_or_insert_with(ElementDesc::default);
        match &index.kind {
            IndexKind::Generic => el.generic = new_id,
            IndexKind::KnownString(key) => {
                el.string_index.insert(key.clone(), new_id);
            }
            IndexKind::KnownInt(i) => el.int_index[*i] = new_id,
            IndexKind::Call => el.call = new_id,
        }
    }

    /// The placeholder standing for "`container` indexed with `index`",
    /// materialized on first request and cached afterwards. The cache entry
    /// is recorded before recursing, which both breaks cycles and keeps the
    /// graph finite for recursive programs.
    fn get_element_type(&mut self, container: PlaceholderId, index: &IndexSpec) -> PlaceholderId {
        let (created, el_id) = self.get_or_create_element_type(container, index);
        if !created {
            return el_id;
        }

        let mut contains: Vec<PlaceholderId> = Vec::new();

        // Direct contributions from the container's own facets.
        let concrete = &self.placeholders[container.idx()].concrete;
        match &index.kind {
            IndexKind::KnownString(key) => {
                if let Some(obj) = &concrete.object {
                    contains.extend_from_slice(&obj.all_contain);
                    if let Some(ps) = obj.field_contains.get(key) {
                        contains.extend_from_slice(ps);
                    }
                }
            }
            IndexKind::KnownInt(i) => {
                if let Some(arr) = &concrete.array {
                    contains.extend_from_slice(&arr.all_contain);
                    if *i < arr.element_contains.len() {
                        contains.extend_from_slice(&arr.element_contains[*i]);
                    }
                }
            }
            IndexKind::Call => {
                if let Some(f) = &concrete.function {
                    contains.extend_from_slice(&f.result_contains);
                }
            }
            IndexKind::Generic => {
                if let Some(obj) = &concrete.object {
                    contains.extend_from_slice(&obj.all_contain);
                    for ps in obj.field_contains.values() {
                        contains.extend_from_slice(ps);
                    }
                }
                if let Some(arr) = &concrete.array {
                    for ps in &arr.element_contains {
                        contains.extend_from_slice(ps);
                    }
                    contains.extend_from_slice(&arr.all_contain);
                }
            }
        }

        let own_index = self.placeholders[container.idx()].index.clone();
        let own_contains = self.placeholders[container.idx()].contains.clone();

        // The indexed thing may itself be indexing something; go deeper.
        if let Some(own_index) = own_index {
            let el_in_c = self.get_element_type(own_index.indexed, &own_index);
            let deeper = self.get_element_type(el_in_c, index);
            contains.push(deeper);
        }

        // The indexed thing may contain other values; index those as well.
        for contained in own_contains {
            let el = self.get_element_type(contained, index);
            contains.push(el);
        }

        let contains = normalize_placeholders(contains);

        // Immediate path compression.
        if contains.len() == 1 {
            self.set_element_type(container, index, contains[0]);
            return contains[0];
        }

        self.placeholders[el_id.idx()].contains = contains;
        el_id
    }

    /// Materialize every index request into a containment edge to the
    /// corresponding element placeholder. Afterwards no placeholder carries
    /// an index request.
    pub(crate) fn separate_element_types(&mut self) {
        let n = self.placeholders.len();
        for i in 0..n {
            let Some(index) = self.placeholders[i].index.clone() else {
                continue;
            };
            let el = self.get_element_type(index.indexed, &index);
            let tp = &mut self.placeholders[i];
            tp.index = None;
            tp.contains.push(el);
        }
    }

    /// Forward DFS post-order over containment edges.
    pub(crate) fn make_topo_order(&mut self) {
        let n = self.placeholders.len();
        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);
        for i in 0..n {
            if !visited[i] {
                topo_visit(
                    &self.placeholders,
                    &mut visited,
                    &mut order,
                    PlaceholderId(i as u32),
                );
            }
        }
        self.topo_order = order;
    }

    /// Kosaraju-style second pass: walk the transposed graph in decreasing
    /// post-order to discover strongly connected components, then widen one
    /// joint description per component in reverse topological order.
    pub(crate) fn find_types(&mut self) {
        let n = self.placeholders.len();

        let mut dependent_on: Vec<Vec<PlaceholderId>> = vec![Vec::new(); n];
        for (i, p) in self.placeholders.iter().enumerate() {
            for dependency in &p.contains {
                dependent_on[dependency.idx()].push(PlaceholderId(i as u32));
            }
        }

        let mut visited = vec![false; n];
        self.scc_of = vec![0; n];
        let mut sccs: Vec<Vec<PlaceholderId>> = Vec::new();

        self.upper_bound = vec![TypeDesc::default(); n];

        for i in (0..self.topo_order.len()).rev() {
            let p = self.topo_order[i];
            if !visited[p.idx()] {
                let scc_id = sccs.len() as u32;
                sccs.push(Vec::with_capacity(1));
                scc_visit(
                    &dependent_on,
                    &mut visited,
                    &mut self.scc_of,
                    &mut sccs,
                    scc_id,
                    p,
                );
            }
        }

        for scc in sccs.iter().rev() {
            self.resolve_types_in_scc(scc);
        }
    }

    fn resolve_types_in_scc(&mut self, scc: &[PlaceholderId]) {
        let scc_id = self.scc_of[scc[0].idx()];

        let mut common = TypeDesc::default();

        for p in scc {
            for contained in &self.placeholders[p.idx()].contains {
                if self.scc_of[contained.idx()] != scc_id {
                    common.widen(&self.upper_bound[contained.idx()]);
                }
            }
        }

        for p in scc {
            common.widen(&self.placeholders[p.idx()].concrete);
            if let Some(index) = &self.placeholders[p.idx()].index {
                panic!(
                    "all indexing should have been rewritten to direct references at this point (indexing {}, indexed {})",
                    p.0, index.indexed.0
                );
            }
        }

        common.normalize();

        for p in scc {
            self.upper_bound[p.idx()] = common.clone();
        }
    }

    #[cfg(test)]
    pub(crate) fn placeholder_count(&self) -> usize {
        self.placeholders.len()
    }

    #[cfg(test)]
    pub(crate) fn contains_of(&self, p: PlaceholderId) -> &[PlaceholderId] {
        &self.placeholders[p.idx()].contains
    }
}

#[derive(Clone, Copy, PartialEq)]
enum ResolveState {
    Unvisited,
    InProgress,
    Done,
}

fn resolve_mapping(
    mapping: &mut [PlaceholderId],
    state: &mut [ResolveState],
    i: PlaceholderId,
) -> PlaceholderId {
    match state[i.idx()] {
        ResolveState::Done => mapping[i.idx()],
        ResolveState::InProgress => i,
        ResolveState::Unvisited => {
            state[i.idx()] = ResolveState::InProgress;
            let target = mapping[i.idx()];
            let root = if target == i {
                i
            } else {
                resolve_mapping(mapping, state, target)
            };
            mapping[i.idx()] = root;
            state[i.idx()] = ResolveState::Done;
            root
        }
    }
}

fn topo_visit(
    placeholders: &[TypePlaceholder],
    visited: &mut [bool],
    order: &mut Vec<PlaceholderId>,
    p: PlaceholderId,
) {
    visited[p.idx()] = true;
    for child in &placeholders[p.idx()].contains {
        if !visited[child.idx()] {
            topo_visit(placeholders, visited, order, *child);
        }
    }
    order.push(p);
}

fn scc_visit(
    dependent_on: &[Vec<PlaceholderId>],
    visited: &mut [bool],
    scc_of: &mut [u32],
    sccs: &mut Vec<Vec<PlaceholderId>>,
    scc_id: u32,
    p: PlaceholderId,
) {
    visited[p.idx()] = true;
    scc_of[p.idx()] = scc_id;
    sccs[scc_id as usize].push(p);
    for dependent in &dependent_on[p.idx()] {
        if !visited[dependent.idx()] {
            scc_visit(dependent_on, visited, scc_of, sccs, scc_id, *dependent);
        }
    }
}
