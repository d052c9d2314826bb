/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

// src/rule/parser.rs
// Recursive descent parser for rule expressions. The language has no
// variables, loops or definitions: an expression is built only from
// literals, operators and calls into the closed Function set, and
// unknown names are rejected here rather than at evaluation time.
//
// Precedence, lowest first:
//   or
//   and
//   not
//   == != < <= > >= in
//   + -
//   * / %
//   unary -

use std::fmt;

use regex::Regex;

use crate::rule::error::RuleParseError;
use crate::rule::lexer::{Lexer, Span, Token, TokenKind};

// Function is the closed set of callable functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    ComponentEq,
    ComponentIn,
    SetComponent,
    SetImageId,
    GetDeviceInfo,
    GetVpdValue,
    ValidVpdValue,
    CheckRegistrationCode,
    GetPhase,
    Assert,
    Re,
}

impl Function {
    pub const ALL: [Function; 11] = [
        Function::ComponentEq,
        Function::ComponentIn,
        Function::SetComponent,
        Function::SetImageId,
        Function::GetDeviceInfo,
        Function::GetVpdValue,
        Function::ValidVpdValue,
        Function::CheckRegistrationCode,
        Function::GetPhase,
        Function::Assert,
        Function::Re,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Function::ComponentEq => "ComponentEq",
            Function::ComponentIn => "ComponentIn",
            Function::SetComponent => "SetComponent",
            Function::SetImageId => "SetImageId",
            Function::GetDeviceInfo => "GetDeviceInfo",
            Function::GetVpdValue => "GetVPDValue",
            Function::ValidVpdValue => "ValidVPDValue",
            Function::CheckRegistrationCode => "CheckRegistrationCode",
            Function::GetPhase => "GetPhase",
            Function::Assert => "Assert",
            Function::Re => "Re",
        }
    }

    pub fn from_name(name: &str) -> Option<Function> {
        Self::ALL.into_iter().find(|function| function.name() == name)
    }

    // arity returns the accepted (min, max) argument counts.
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Function::GetPhase => (0, 0),
            Function::SetImageId | Function::CheckRegistrationCode | Function::Re => (1, 1),
            Function::GetDeviceInfo | Function::Assert => (1, 2),
            Function::ComponentEq
            | Function::ComponentIn
            | Function::SetComponent
            | Function::GetVpdValue
            | Function::ValidVpdValue => (2, 2),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    In,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    None,
    Bool(bool),
    Integer(i64),
    String(String),
}

// RegexLiteral is a Re('...') call. Its argument must be a string
// literal, so the pattern is compiled once while parsing.
#[derive(Debug, Clone)]
pub struct RegexLiteral {
    pub pattern: String,
    pub regex: Regex,
}

impl PartialEq for RegexLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Regex(RegexLiteral),
    List(Vec<Node>),
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Call {
        function: Function,
        args: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub expr: Expr,
    pub span: Span,
}

impl Node {
    fn new(expr: Expr, span: Span) -> Self {
        Self { expr, span }
    }
}

// Expression is a parsed rule expression together with its source
// text, which is what gets written back when the database is saved.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, RuleParseError> {
        let tokens = Lexer::tokenize(source)?;
        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let root = parser.parse_or()?;
        let trailing = parser.peek();
        if trailing.kind != TokenKind::Eof {
            return Err(RuleParseError::new(
                "unexpected trailing input",
                trailing.span.start,
                source,
            ));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    // text_of returns the source text of a sub-expression.
    pub fn text_of(&self, span: Span) -> &str {
        self.source
            .get(span.start..span.end)
            .unwrap_or(&self.source)
            .trim()
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        // tokenize() always ends the list with Eof, and the parser
        // never advances past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn error<M: Into<String>>(&self, message: M, offset: usize) -> RuleParseError {
        RuleParseError::new(message, offset, self.source)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Identifier(name) if name == keyword)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, RuleParseError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(self.error(format!("expected {what}"), token.span.start))
        }
    }

    fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
        let span = lhs.span.to(rhs.span);
        Node::new(
            Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }

    fn parse_or(&mut self) -> Result<Node, RuleParseError> {
        let mut lhs = self.parse_and()?;
        while self.is_keyword("or") {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Self::binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Node, RuleParseError> {
        let mut lhs = self.parse_not()?;
        while self.is_keyword("and") {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Self::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Node, RuleParseError> {
        if self.is_keyword("not") {
            let start = self.advance().span;
            let operand = self.parse_not()?;
            let span = start.to(operand.span);
            return Ok(Node::new(
                Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Node, RuleParseError> {
        let lhs = self.parse_additive()?;
        let op = match &self.peek().kind {
            TokenKind::EqualEqual => BinaryOp::Equal,
            TokenKind::NotEqual => BinaryOp::NotEqual,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::LessEqual => BinaryOp::LessEqual,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
            TokenKind::Identifier(name) if name == "in" => BinaryOp::In,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_additive()?;
        Ok(Self::binary(op, lhs, rhs))
    }

    fn parse_additive(&mut self) -> Result<Node, RuleParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Node, RuleParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Modulo,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Node, RuleParseError> {
        if self.peek().kind == TokenKind::Minus {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.to(operand.span);
            return Ok(Node::new(
                Expr::Unary {
                    op: UnaryOp::Negate,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, RuleParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Integer(value) => Ok(Node::new(
                Expr::Literal(Literal::Integer(value)),
                token.span,
            )),
            TokenKind::String(value) => Ok(Node::new(
                Expr::Literal(Literal::String(value)),
                token.span,
            )),
            TokenKind::LeftParen => {
                let mut inner = self.parse_or()?;
                let close = self.expect(TokenKind::RightParen, "')'")?;
                inner.span = token.span.to(close.span);
                Ok(inner)
            }
            TokenKind::LeftBracket => {
                let (items, close) = self.parse_items(TokenKind::RightBracket, "']'")?;
                Ok(Node::new(Expr::List(items), token.span.to(close)))
            }
            TokenKind::Identifier(name) => self.parse_identifier(name, token.span),
            TokenKind::Eof => Err(self.error("unexpected end of expression", token.span.start)),
            _ => Err(self.error("unexpected token", token.span.start)),
        }
    }

    // parse_items parses a comma separated list of expressions up to
    // and including the closing token. A trailing comma is allowed.
    fn parse_items(
        &mut self,
        close: TokenKind,
        what: &str,
    ) -> Result<(Vec<Node>, Span), RuleParseError> {
        let mut items = Vec::new();
        loop {
            if self.peek().kind == close {
                let span = self.advance().span;
                return Ok((items, span));
            }
            items.push(self.parse_or()?);
            if self.peek().kind == TokenKind::Comma {
                self.advance();
            } else {
                let span = self.expect(close.clone(), what)?.span;
                return Ok((items, span));
            }
        }
    }

    fn parse_identifier(&mut self, name: String, span: Span) -> Result<Node, RuleParseError> {
        let literal = match name.as_str() {
            "True" => Some(Literal::Bool(true)),
            "False" => Some(Literal::Bool(false)),
            "None" => Some(Literal::None),
            _ => None,
        };
        if let Some(literal) = literal {
            return Ok(Node::new(Expr::Literal(literal), span));
        }

        let function = Function::from_name(&name)
            .ok_or_else(|| self.error(format!("unknown function '{name}'"), span.start))?;
        self.expect(TokenKind::LeftParen, "'(' after function name")?;
        let (args, close) = self.parse_items(TokenKind::RightParen, "')'")?;
        let span = span.to(close);

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(self.error(
                format!(
                    "{function}() takes {} arguments, got {}",
                    if min == max {
                        min.to_string()
                    } else {
                        format!("{min} to {max}")
                    },
                    args.len()
                ),
                span.start,
            ));
        }

        if function == Function::Re {
            let Expr::Literal(Literal::String(pattern)) = &args[0].expr else {
                return Err(self.error("Re() expects a string literal", args[0].span.start));
            };
            let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
                self.error(format!("invalid regular expression: {e}"), args[0].span.start)
            })?;
            return Ok(Node::new(
                Expr::Regex(RegexLiteral {
                    pattern: pattern.clone(),
                    regex,
                }),
                span,
            ));
        }

        Ok(Node::new(Expr::Call { function, args }, span))
    }
}
