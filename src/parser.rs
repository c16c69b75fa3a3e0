// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Recursive-descent parser producing the core (desugared) syntax tree.
//!
//! Surface sugar is lowered while parsing: field methods and `local f(x) =`
//! become function literals, `e { .. }` becomes `e + { .. }`, slices become
//! `std.slice(..)` calls, comprehensions become `std.flatMap` /
//! `std.$objectFlatMerge` calls, and asserts become conditionals over
//! `error`. Text blocks (`|||`) are not part of the accepted subset.

use crate::ast::*;
use crate::lexer::*;
use crate::Rc;

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use anyhow::{bail, Result};

const KEYWORDS: [&str; 17] = [
    "assert",
    "else",
    "error",
    "false",
    "for",
    "function",
    "if",
    "import",
    "importstr",
    "in",
    "local",
    "null",
    "self",
    "super",
    "tailstrict",
    "then",
    "true",
];

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    end: u32,
    next_eidx: u32,
}

enum CompSpec {
    For { var: Span, expr: ExprRef },
    If { cond: ExprRef },
}

fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            end: 0,
            next_eidx: 0,
        })
    }

    /// Parse a whole source file into its desugared root expression.
    pub fn parse_module(&mut self) -> Result<Module> {
        let root = self.parse_expr()?;
        if self.tok.0 != TokenKind::Eof {
            bail!(self.tok.1.error("expecting end of file"));
        }
        Ok(Module {
            source: self.source.clone(),
            root,
            num_exprs: self.next_eidx,
        })
    }

    fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String | TokenKind::VerbatimString => "",
        }
    }

    fn next_token(&mut self) -> Result<()> {
        self.end = self.tok.1.end;
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text {
            self.next_token()
        } else {
            let msg = format!("expecting `{text}` {context}");
            Err(self.source.error(self.tok.1.line, self.tok.1.col, &msg))
        }
    }

    fn peek_token(&self) -> Result<Token> {
        let mut lexer = self.lexer.clone();
        lexer.next_token()
    }

    fn eidx(&mut self) -> u32 {
        let idx = self.next_eidx;
        self.next_eidx += 1;
        idx
    }

    // Span from the start of `from` to the end of the last consumed token.
    fn span_from(&self, from: &Span) -> Span {
        Span {
            source: self.source.clone(),
            line: from.line,
            col: from.col,
            start: from.start,
            end: self.end,
        }
    }

    fn ident(&mut self, context: &str) -> Result<Span> {
        if self.tok.0 != TokenKind::Ident || is_keyword(self.token_text()) {
            bail!(self
                .source
                .error(self.tok.1.line, self.tok.1.col, &format!("expecting an identifier {context}")));
        }
        let span = self.tok.1.clone();
        self.next_token()?;
        Ok(span)
    }

    fn string_literal(&mut self, context: &str) -> Result<(Span, Rc<str>)> {
        let verbatim = match self.tok.0 {
            TokenKind::String => false,
            TokenKind::VerbatimString => true,
            _ => bail!(self.source.error(
                self.tok.1.line,
                self.tok.1.col,
                &format!("expecting a string literal {context}")
            )),
        };
        let span = self.tok.1.clone();
        let value: Rc<str> = unescape(&span, verbatim)?.into();
        self.next_token()?;
        Ok((span, value))
    }

    fn string_expr(&mut self, span: Span, value: Rc<str>) -> ExprRef {
        Rc::new(Expr::String {
            span,
            eidx: self.eidx(),
            value,
        })
    }

    // Synthetic `std.<field>` reference used by desugarings.
    fn std_field(&mut self, span: &Span, field: &str) -> ExprRef {
        let std_var = Rc::new(Expr::Var {
            span: span.clone(),
            eidx: self.eidx(),
            name: "std".into(),
        });
        let name = self.string_expr(span.clone(), field.into());
        Rc::new(Expr::Index {
            span: span.clone(),
            eidx: self.eidx(),
            target: std_var,
            index: name,
        })
    }

    pub fn parse_expr(&mut self) -> Result<ExprRef> {
        self.parse_binary(0)
    }

    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        if self.tok.0 != TokenKind::Symbol && self.token_text() != "in" {
            return None;
        }
        let op = match self.token_text() {
            "||" => (BinaryOp::Or, 1),
            "&&" => (BinaryOp::And, 2),
            "|" => (BinaryOp::BitOr, 3),
            "^" => (BinaryOp::BitXor, 4),
            "&" => (BinaryOp::BitAnd, 5),
            "==" => (BinaryOp::Eq, 6),
            "!=" => (BinaryOp::Ne, 6),
            "<" => (BinaryOp::Lt, 7),
            "<=" => (BinaryOp::Le, 7),
            ">" => (BinaryOp::Gt, 7),
            ">=" => (BinaryOp::Ge, 7),
            "in" => (BinaryOp::In, 7),
            "<<" => (BinaryOp::ShiftL, 8),
            ">>" => (BinaryOp::ShiftR, 8),
            "+" => (BinaryOp::Plus, 9),
            "-" => (BinaryOp::Minus, 9),
            "*" => (BinaryOp::Mult, 10),
            "/" => (BinaryOp::Div, 10),
            "%" => (BinaryOp::Percent, 10),
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let mut lhs = self.parse_unary()?;
        while let Some((op, prec)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            self.next_token()?;
            if op == BinaryOp::In && self.token_text() == "super" {
                self.next_token()?;
                lhs = Rc::new(Expr::InSuper {
                    span: self.span_from(&start),
                    eidx: self.eidx(),
                    index: lhs,
                });
                continue;
            }
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Rc::new(Expr::Binary {
                span: self.span_from(&start),
                eidx: self.eidx(),
                op,
                left: lhs,
                right: rhs,
            });
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let op = match self.token_text() {
            "!" => Some(UnaryOp::Not),
            "~" => Some(UnaryOp::BitNot),
            "+" => Some(UnaryOp::Plus),
            "-" => Some(UnaryOp::Minus),
            _ => None,
        };
        if let Some(op) = op {
            self.next_token()?;
            let expr = self.parse_unary()?;
            return Ok(Rc::new(Expr::Unary {
                span: self.span_from(&start),
                eidx: self.eidx(),
                op,
                expr,
            }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        let mut expr = self.parse_primary()?;
        loop {
            match self.token_text() {
                "." => {
                    self.next_token()?;
                    let field = self.ident("after `.`")?;
                    let name = self.string_expr(field.clone(), field.text().into());
                    expr = Rc::new(Expr::Index {
                        span: self.span_from(&start),
                        eidx: self.eidx(),
                        target: expr,
                        index: name,
                    });
                }
                "[" => {
                    self.next_token()?;
                    expr = self.parse_index_or_slice(expr, &start)?;
                }
                "(" => {
                    self.next_token()?;
                    let args = self.parse_arguments()?;
                    let mut tailstrict = false;
                    if self.token_text() == "tailstrict" {
                        self.next_token()?;
                        tailstrict = true;
                    }
                    expr = Rc::new(Expr::Apply {
                        span: self.span_from(&start),
                        eidx: self.eidx(),
                        target: expr,
                        args,
                        tailstrict,
                    });
                }
                "{" => {
                    let brace = self.tok.1.clone();
                    self.next_token()?;
                    let obj = self.parse_object(&brace)?;
                    expr = Rc::new(Expr::Binary {
                        span: self.span_from(&start),
                        eidx: self.eidx(),
                        op: BinaryOp::Plus,
                        left: expr,
                        right: obj,
                    });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    // Parses `e]`, `e:e]`, `:e]` and friends after the `[` was consumed.
    // Slices lower to `std.slice(target, index, end, step)` with `null` for
    // absent components.
    fn parse_index_or_slice(&mut self, target: ExprRef, start: &Span) -> Result<ExprRef> {
        let mut parts: [Option<ExprRef>; 3] = [None, None, None];
        let mut slot = 0usize;
        loop {
            match self.token_text() {
                "]" => {
                    self.next_token()?;
                    break;
                }
                ":" => {
                    self.next_token()?;
                    slot += 1;
                }
                "::" => {
                    self.next_token()?;
                    slot += 2;
                }
                _ => {
                    if slot > 2 || parts[slot].is_some() {
                        bail!(self.tok.1.error("invalid slice"));
                    }
                    parts[slot] = Some(self.parse_expr()?);
                }
            }
            if slot > 2 {
                bail!(self.tok.1.error("invalid slice"));
            }
        }

        let span = self.span_from(start);
        if slot == 0 {
            // Plain index.
            let index = match parts[0].take() {
                Some(e) => e,
                None => bail!(span.error("expecting an index expression")),
            };
            return Ok(Rc::new(Expr::Index {
                span,
                eidx: self.eidx(),
                target,
                index,
            }));
        }

        let slice_fn = self.std_field(&span, "slice");
        let mut positional = vec![target];
        for part in parts {
            let arg = match part {
                Some(e) => e,
                None => Rc::new(Expr::Null {
                    span: span.clone(),
                    eidx: self.eidx(),
                }),
            };
            positional.push(arg);
        }
        Ok(Rc::new(Expr::Apply {
            span,
            eidx: self.eidx(),
            target: slice_fn,
            args: Arguments {
                positional,
                named: vec![],
            },
            tailstrict: false,
        }))
    }

    fn parse_arguments(&mut self) -> Result<Arguments> {
        let mut args = Arguments::default();
        loop {
            if self.token_text() == ")" {
                self.next_token()?;
                break;
            }
            let named = self.tok.0 == TokenKind::Ident
                && !is_keyword(self.token_text())
                && self.peek_token()?.1.text() == "=";
            if named {
                let name = self.ident("in named argument")?;
                self.expect("=", "in named argument")?;
                let arg = self.parse_expr()?;
                args.named.push(NamedArg { name, arg });
            } else {
                if !args.named.is_empty() {
                    bail!(self
                        .tok
                        .1
                        .error("positional argument after a named argument is not allowed"));
                }
                args.positional.push(self.parse_expr()?);
            }
            if self.token_text() == "," {
                self.next_token()?;
            } else {
                self.expect(")", "after arguments")?;
                break;
            }
        }
        Ok(args)
    }

    fn parse_parameters(&mut self) -> Result<Parameters> {
        let mut params = Parameters::default();
        loop {
            if self.token_text() == ")" {
                self.next_token()?;
                break;
            }
            let name = self.ident("in parameter list")?;
            if self.token_text() == "=" {
                self.next_token()?;
                let default = self.parse_expr()?;
                params.optional.push(Param { name, default });
            } else {
                if !params.optional.is_empty() {
                    bail!(name.error("required parameter after an optional parameter"));
                }
                params.required.push(name);
            }
            if self.token_text() == "," {
                self.next_token()?;
            } else {
                self.expect(")", "after parameters")?;
                break;
            }
        }
        Ok(params)
    }

    // One `local` binding: `name = e` or the function sugar `name(params) = e`.
    fn parse_bind(&mut self) -> Result<Bind> {
        let name = self.ident("in local")?;
        let fn_start = self.tok.1.clone();
        let params = if self.token_text() == "(" {
            self.next_token()?;
            Some(self.parse_parameters()?)
        } else {
            None
        };
        self.expect("=", "in local")?;
        let body = self.parse_expr()?;
        let body = match params {
            Some(params) => Rc::new(Expr::Function {
                span: self.span_from(&fn_start),
                eidx: self.eidx(),
                params: Rc::new(params),
                body,
            }),
            None => body,
        };
        Ok(Bind { name, body })
    }

    fn parse_primary(&mut self) -> Result<ExprRef> {
        let start = self.tok.1.clone();
        match self.tok.0 {
            TokenKind::Number => {
                let value = match start.text().parse::<f64>() {
                    Ok(v) => v,
                    Err(_) => bail!(start.error("invalid number")),
                };
                self.next_token()?;
                Ok(Rc::new(Expr::Number {
                    span: start,
                    eidx: self.eidx(),
                    value,
                }))
            }
            TokenKind::String | TokenKind::VerbatimString => {
                let (span, value) = self.string_literal("")?;
                Ok(self.string_expr(span, value))
            }
            TokenKind::Eof => bail!(start.error("unexpected end of file")),
            _ => self.parse_primary_symbol_or_ident(start),
        }
    }

    fn parse_primary_symbol_or_ident(&mut self, start: Span) -> Result<ExprRef> {
        match self.token_text() {
            "(" => {
                self.next_token()?;
                let inner = self.parse_expr()?;
                self.expect(")", "to close parenthesized expression")?;
                Ok(inner)
            }
            "[" => {
                self.next_token()?;
                self.parse_array(&start)
            }
            "{" => {
                self.next_token()?;
                self.parse_object(&start)
            }
            "$" => {
                self.next_token()?;
                Ok(Rc::new(Expr::Var {
                    span: start,
                    eidx: self.eidx(),
                    name: "$".into(),
                }))
            }
            "null" => {
                self.next_token()?;
                Ok(Rc::new(Expr::Null {
                    span: start,
                    eidx: self.eidx(),
                }))
            }
            "true" | "false" => {
                let value = self.token_text() == "true";
                self.next_token()?;
                Ok(Rc::new(Expr::Bool {
                    span: start,
                    eidx: self.eidx(),
                    value,
                }))
            }
            "self" => {
                self.next_token()?;
                Ok(Rc::new(Expr::SelfExpr {
                    span: start,
                    eidx: self.eidx(),
                }))
            }
            "super" => {
                self.next_token()?;
                let index = match self.token_text() {
                    "." => {
                        self.next_token()?;
                        let field = self.ident("after `super.`")?;
                        self.string_expr(field.clone(), field.text().into())
                    }
                    "[" => {
                        self.next_token()?;
                        let index = self.parse_expr()?;
                        self.expect("]", "to close `super[`")?;
                        index
                    }
                    _ => bail!(self.tok.1.error("expecting `.` or `[` after `super`")),
                };
                Ok(Rc::new(Expr::SuperIndex {
                    span: self.span_from(&start),
                    eidx: self.eidx(),
                    index,
                }))
            }
            "import" | "importstr" => {
                let is_code = self.token_text() == "import";
                self.next_token()?;
                let (_, path) = self.string_literal("after import")?;
                let span = self.span_from(&start);
                let eidx = self.eidx();
                Ok(Rc::new(if is_code {
                    Expr::Import { span, eidx, path }
                } else {
                    Expr::ImportStr { span, eidx, path }
                }))
            }
            "error" => {
                self.next_token()?;
                let expr = self.parse_expr()?;
                Ok(Rc::new(Expr::Error {
                    span: self.span_from(&start),
                    eidx: self.eidx(),
                    expr,
                }))
            }
            "if" => {
                self.next_token()?;
                let cond = self.parse_expr()?;
                self.expect("then", "in conditional")?;
                let branch_true = self.parse_expr()?;
                let branch_false = if self.token_text() == "else" {
                    self.next_token()?;
                    self.parse_expr()?
                } else {
                    Rc::new(Expr::Null {
                        span: self.span_from(&start),
                        eidx: self.eidx(),
                    })
                };
                Ok(Rc::new(Expr::Conditional {
                    span: self.span_from(&start),
                    eidx: self.eidx(),
                    cond,
                    branch_true,
                    branch_false,
                }))
            }
            "function" => {
                self.next_token()?;
                self.expect("(", "in function definition")?;
                let params = self.parse_parameters()?;
                let body = self.parse_expr()?;
                Ok(Rc::new(Expr::Function {
                    span: self.span_from(&start),
                    eidx: self.eidx(),
                    params: Rc::new(params),
                    body,
                }))
            }
            "local" => {
                self.next_token()?;
                let mut binds = vec![self.parse_bind()?];
                while self.token_text() == "," {
                    self.next_token()?;
                    binds.push(self.parse_bind()?);
                }
                self.expect(";", "after local binds")?;
                let body = self.parse_expr()?;
                Ok(Rc::new(Expr::Local {
                    span: self.span_from(&start),
                    eidx: self.eidx(),
                    binds,
                    body,
                }))
            }
            "assert" => {
                self.next_token()?;
                let cond = self.parse_expr()?;
                let msg = if self.token_text() == ":" {
                    self.next_token()?;
                    self.parse_expr()?
                } else {
                    self.string_expr(self.span_from(&start), "Assertion failed".into())
                };
                self.expect(";", "after assert")?;
                let rest = self.parse_expr()?;
                let span = self.span_from(&start);
                let error = Rc::new(Expr::Error {
                    span: span.clone(),
                    eidx: self.eidx(),
                    expr: msg,
                });
                Ok(Rc::new(Expr::Conditional {
                    span,
                    eidx: self.eidx(),
                    cond,
                    branch_true: rest,
                    branch_false: error,
                }))
            }
            _ if self.tok.0 == TokenKind::Ident && !is_keyword(self.token_text()) => {
                let name: Rc<str> = start.text().into();
                self.next_token()?;
                Ok(Rc::new(Expr::Var {
                    span: start,
                    eidx: self.eidx(),
                    name,
                }))
            }
            text => {
                let msg = format!("unexpected token `{text}`");
                bail!(self.source.error(self.tok.1.line, self.tok.1.col, &msg))
            }
        }
    }

    fn parse_array(&mut self, start: &Span) -> Result<ExprRef> {
        if self.token_text() == "]" {
            self.next_token()?;
            return Ok(Rc::new(Expr::Array {
                span: self.span_from(start),
                eidx: self.eidx(),
                elements: vec![],
            }));
        }

        let first = self.parse_expr()?;
        if self.token_text() == "for" {
            let specs = self.parse_comp_specs("]")?;
            self.expect("]", "to close array comprehension")?;
            let span = self.span_from(start);
            return self.desugar_array_comp(first, &specs, &span);
        }

        let mut elements = vec![first];
        while self.token_text() == "," {
            self.next_token()?;
            if self.token_text() == "]" {
                break;
            }
            elements.push(self.parse_expr()?);
        }
        self.expect("]", "to close array")?;
        Ok(Rc::new(Expr::Array {
            span: self.span_from(start),
            eidx: self.eidx(),
            elements,
        }))
    }

    fn parse_comp_specs(&mut self, end: &str) -> Result<Vec<CompSpec>> {
        let mut specs = vec![];
        loop {
            match self.token_text() {
                "for" => {
                    self.next_token()?;
                    let var = self.ident("in comprehension")?;
                    self.expect("in", "in comprehension")?;
                    let expr = self.parse_expr()?;
                    specs.push(CompSpec::For { var, expr });
                }
                "if" => {
                    self.next_token()?;
                    let cond = self.parse_expr()?;
                    specs.push(CompSpec::If { cond });
                }
                t if t == end => break,
                _ => bail!(self.tok.1.error("expecting `for`, `if` or end of comprehension")),
            }
        }
        Ok(specs)
    }

    // `[term for x in e if c ..]` lowers to nested `std.flatMap` calls with
    // `if c then rest else []` for the filters.
    fn desugar_array_comp(
        &mut self,
        term: ExprRef,
        specs: &[CompSpec],
        span: &Span,
    ) -> Result<ExprRef> {
        let Some((first, rest_specs)) = specs.split_first() else {
            return Ok(Rc::new(Expr::Array {
                span: span.clone(),
                eidx: self.eidx(),
                elements: vec![term],
            }));
        };
        let rest = self.desugar_array_comp(term, rest_specs, span)?;
        Ok(match first {
            CompSpec::For { var, expr } => {
                let params = Parameters {
                    required: vec![var.clone()],
                    optional: vec![],
                };
                let fn_expr = Rc::new(Expr::Function {
                    span: span.clone(),
                    eidx: self.eidx(),
                    params: Rc::new(params),
                    body: rest,
                });
                let flat_map = self.std_field(span, "flatMap");
                Rc::new(Expr::Apply {
                    span: span.clone(),
                    eidx: self.eidx(),
                    target: flat_map,
                    args: Arguments {
                        positional: vec![fn_expr, expr.clone()],
                        named: vec![],
                    },
                    tailstrict: false,
                })
            }
            CompSpec::If { cond } => {
                let empty = Rc::new(Expr::Array {
                    span: span.clone(),
                    eidx: self.eidx(),
                    elements: vec![],
                });
                Rc::new(Expr::Conditional {
                    span: span.clone(),
                    eidx: self.eidx(),
                    cond: cond.clone(),
                    branch_true: rest,
                    branch_false: empty,
                })
            }
        })
    }

    fn parse_object(&mut self, start: &Span) -> Result<ExprRef> {
        let mut locals = vec![];
        let mut asserts = vec![];
        let mut fields: Vec<Field> = vec![];

        loop {
            match self.token_text() {
                "}" => {
                    self.next_token()?;
                    break;
                }
                "local" => {
                    self.next_token()?;
                    locals.push(self.parse_bind()?);
                }
                "assert" => {
                    self.next_token()?;
                    let assert_start = self.tok.1.clone();
                    let cond = self.parse_expr()?;
                    let msg = if self.token_text() == ":" {
                        self.next_token()?;
                        self.parse_expr()?
                    } else {
                        self.string_expr(self.span_from(&assert_start), "Object assertion failed".into())
                    };
                    let span = self.span_from(&assert_start);
                    let error = Rc::new(Expr::Error {
                        span: span.clone(),
                        eidx: self.eidx(),
                        expr: msg,
                    });
                    let null = Rc::new(Expr::Null {
                        span: span.clone(),
                        eidx: self.eidx(),
                    });
                    asserts.push(Rc::new(Expr::Conditional {
                        span,
                        eidx: self.eidx(),
                        cond,
                        branch_true: null,
                        branch_false: error,
                    }));
                }
                _ => {
                    let field = self.parse_field()?;
                    let computed = !matches!(field.name.as_ref(), Expr::String { .. });
                    fields.push(field);

                    // `{[k]: v for x in e ..}` is an object comprehension.
                    if self.token_text() == "for" {
                        if fields.len() != 1 || !computed || !locals.is_empty() || !asserts.is_empty()
                        {
                            bail!(self
                                .tok
                                .1
                                .error("object comprehension must consist of a single computed field"));
                        }
                        let field = fields.remove(0);
                        let specs = self.parse_comp_specs("}")?;
                        self.expect("}", "to close object comprehension")?;
                        let span = self.span_from(start);
                        return self.desugar_object_comp(field, &specs, &span);
                    }
                }
            }
            match self.token_text() {
                "," => self.next_token()?,
                "}" => {
                    self.next_token()?;
                    break;
                }
                _ => bail!(self.tok.1.error("expecting `,` or `}` in object")),
            }
        }

        Ok(Rc::new(Expr::Object {
            span: self.span_from(start),
            eidx: self.eidx(),
            locals,
            asserts,
            fields,
        }))
    }

    fn parse_field(&mut self) -> Result<Field> {
        let name = match self.tok.0 {
            TokenKind::Ident if !is_keyword(self.token_text()) => {
                let span = self.ident("as field name")?;
                self.string_expr(span.clone(), span.text().into())
            }
            TokenKind::String | TokenKind::VerbatimString => {
                let (span, value) = self.string_literal("as field name")?;
                self.string_expr(span, value)
            }
            _ if self.token_text() == "[" => {
                self.next_token()?;
                let name = self.parse_expr()?;
                self.expect("]", "to close computed field name")?;
                name
            }
            _ => bail!(self.tok.1.error("expecting a field name")),
        };

        // Method sugar: `f(params): body`.
        let fn_start = self.tok.1.clone();
        let params = if self.token_text() == "(" {
            self.next_token()?;
            Some(self.parse_parameters()?)
        } else {
            None
        };

        let plus_super = if self.token_text() == "+" {
            if params.is_some() {
                bail!(self.tok.1.error("`+:` cannot be used with a method"));
            }
            self.next_token()?;
            true
        } else {
            false
        };

        // Visibility (`:`, `::`, `:::`) does not affect analysis.
        match self.token_text() {
            ":" | "::" | ":::" => self.next_token()?,
            _ => bail!(self.tok.1.error("expecting `:` after field name")),
        }

        let body = self.parse_expr()?;
        let body = match params {
            Some(params) => Rc::new(Expr::Function {
                span: self.span_from(&fn_start),
                eidx: self.eidx(),
                params: Rc::new(params),
                body,
            }),
            None => body,
        };

        Ok(Field {
            name,
            plus_super,
            body,
        })
    }

    // `{[k]: v for ..}` lowers to
    // `std.$objectFlatMerge(std.flatMap(function(x) [{[k]: v}], e))`.
    fn desugar_object_comp(
        &mut self,
        field: Field,
        specs: &[CompSpec],
        span: &Span,
    ) -> Result<ExprRef> {
        let unit = Rc::new(Expr::Object {
            span: span.clone(),
            eidx: self.eidx(),
            locals: vec![],
            asserts: vec![],
            fields: vec![field],
        });
        let array = self.desugar_array_comp(unit, specs, span)?;
        let merge = self.std_field(span, "$objectFlatMerge");
        Ok(Rc::new(Expr::Apply {
            span: span.clone(),
            eidx: self.eidx(),
            target: merge,
            args: Arguments {
                positional: vec![array],
                named: vec![],
            },
            tailstrict: false,
        }))
    }
}

impl core::fmt::Debug for Parser<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Parser")
            .field("source", &self.source)
            .field("tok", &self.tok)
            .finish()
    }
}
