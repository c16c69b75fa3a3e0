// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core (desugared) Jsonnet syntax tree.
//!
//! The parser lowers surface sugar while parsing, so the analyzer only ever
//! sees the node kinds below. Every expression carries a [`Span`] and a
//! dense per-module expression index (`eidx`) used to key side tables
//! without touching the tree.

use crate::lexer::{Source, Span};
use crate::Rc;

use alloc::vec;
use alloc::vec::Vec;

pub type Ref<T> = Rc<T>;
pub type ExprRef = Ref<Expr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mult,
    Div,
    Percent,
    Plus,
    Minus,
    ShiftL,
    ShiftR,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    BitNot,
    Plus,
    Minus,
}

/// A `local` binding or a desugared object-level local.
#[derive(Debug, Clone)]
pub struct Bind {
    pub name: Span,
    pub body: ExprRef,
}

/// One field of a desugared object. Fixed names are represented as literal
/// string expressions; computed names are arbitrary expressions.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: ExprRef,
    pub plus_super: bool,
    pub body: ExprRef,
}

/// An optional parameter with its default value.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Span,
    pub default: ExprRef,
}

#[derive(Debug, Clone, Default)]
pub struct Parameters {
    pub required: Vec<Span>,
    pub optional: Vec<Param>,
}

#[derive(Debug, Clone)]
pub struct NamedArg {
    pub name: Span,
    pub arg: ExprRef,
}

#[derive(Debug, Clone, Default)]
pub struct Arguments {
    pub positional: Vec<ExprRef>,
    pub named: Vec<NamedArg>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Null {
        span: Span,
        eidx: u32,
    },
    Bool {
        span: Span,
        eidx: u32,
        value: bool,
    },
    Number {
        span: Span,
        eidx: u32,
        value: f64,
    },
    String {
        span: Span,
        eidx: u32,
        value: Rc<str>,
    },
    Array {
        span: Span,
        eidx: u32,
        elements: Vec<ExprRef>,
    },
    Object {
        span: Span,
        eidx: u32,
        locals: Vec<Bind>,
        asserts: Vec<ExprRef>,
        fields: Vec<Field>,
    },
    Binary {
        span: Span,
        eidx: u32,
        op: BinaryOp,
        left: ExprRef,
        right: ExprRef,
    },
    Unary {
        span: Span,
        eidx: u32,
        op: UnaryOp,
        expr: ExprRef,
    },
    Conditional {
        span: Span,
        eidx: u32,
        cond: ExprRef,
        branch_true: ExprRef,
        branch_false: ExprRef,
    },
    Local {
        span: Span,
        eidx: u32,
        binds: Vec<Bind>,
        body: ExprRef,
    },
    Var {
        span: Span,
        eidx: u32,
        name: Rc<str>,
    },
    SelfExpr {
        span: Span,
        eidx: u32,
    },
    SuperIndex {
        span: Span,
        eidx: u32,
        index: ExprRef,
    },
    InSuper {
        span: Span,
        eidx: u32,
        index: ExprRef,
    },
    Function {
        span: Span,
        eidx: u32,
        params: Ref<Parameters>,
        body: ExprRef,
    },
    Apply {
        span: Span,
        eidx: u32,
        target: ExprRef,
        args: Arguments,
        tailstrict: bool,
    },
    Index {
        span: Span,
        eidx: u32,
        target: ExprRef,
        index: ExprRef,
    },
    Error {
        span: Span,
        eidx: u32,
        expr: ExprRef,
    },
    Import {
        span: Span,
        eidx: u32,
        path: Rc<str>,
    },
    ImportStr {
        span: Span,
        eidx: u32,
        path: Rc<str>,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        use Expr::*;
        match self {
            Null { span, .. }
            | Bool { span, .. }
            | Number { span, .. }
            | String { span, .. }
            | Array { span, .. }
            | Object { span, .. }
            | Binary { span, .. }
            | Unary { span, .. }
            | Conditional { span, .. }
            | Local { span, .. }
            | Var { span, .. }
            | SelfExpr { span, .. }
            | SuperIndex { span, .. }
            | InSuper { span, .. }
            | Function { span, .. }
            | Apply { span, .. }
            | Index { span, .. }
            | Error { span, .. }
            | Import { span, .. }
            | ImportStr { span, .. } => span,
        }
    }

    pub fn eidx(&self) -> u32 {
        use Expr::*;
        match self {
            Null { eidx, .. }
            | Bool { eidx, .. }
            | Number { eidx, .. }
            | String { eidx, .. }
            | Array { eidx, .. }
            | Object { eidx, .. }
            | Binary { eidx, .. }
            | Unary { eidx, .. }
            | Conditional { eidx, .. }
            | Local { eidx, .. }
            | Var { eidx, .. }
            | SelfExpr { eidx, .. }
            | SuperIndex { eidx, .. }
            | InSuper { eidx, .. }
            | Function { eidx, .. }
            | Apply { eidx, .. }
            | Index { eidx, .. }
            | Error { eidx, .. }
            | Import { eidx, .. }
            | ImportStr { eidx, .. } => *eidx,
        }
    }
}

/// Direct children of an expression in left-to-right source order.
///
/// The order is load bearing: diagnostics are emitted in the order this
/// function yields subtrees.
pub fn children(expr: &Expr) -> Vec<&ExprRef> {
    use Expr::*;
    match expr {
        Null { .. } | Bool { .. } | Number { .. } | String { .. } | Var { .. }
        | SelfExpr { .. } | Import { .. } | ImportStr { .. } => vec![],
        Array { elements, .. } => elements.iter().collect(),
        Object {
            locals,
            asserts,
            fields,
            ..
        } => {
            let mut out: Vec<&ExprRef> = locals.iter().map(|l| &l.body).collect();
            out.extend(asserts.iter());
            for field in fields {
                out.push(&field.name);
                out.push(&field.body);
            }
            out
        }
        Binary { left, right, .. } => vec![left, right],
        Unary { expr, .. } => vec![expr],
        Conditional {
            cond,
            branch_true,
            branch_false,
            ..
        } => vec![cond, branch_true, branch_false],
        Local { binds, body, .. } => {
            let mut out: Vec<&ExprRef> = binds.iter().map(|b| &b.body).collect();
            out.push(body);
            out
        }
        SuperIndex { index, .. } | InSuper { index, .. } => vec![index],
        Function { params, body, .. } => {
            let mut out: Vec<&ExprRef> = params.optional.iter().map(|p| &p.default).collect();
            out.push(body);
            out
        }
        Apply { target, args, .. } => {
            let mut out = vec![target];
            out.extend(args.positional.iter());
            out.extend(args.named.iter().map(|n| &n.arg));
            out
        }
        Index { target, index, .. } => vec![target, index],
        Error { expr, .. } => vec![expr],
    }
}

/// A parsed source file: the desugared root expression plus the size of the
/// expression index space the parser allotted for it.
#[derive(Debug, Clone)]
pub struct Module {
    pub source: Source,
    pub root: ExprRef,
    pub num_exprs: u32,
}
