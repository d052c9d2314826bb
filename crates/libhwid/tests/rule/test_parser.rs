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

use libhwid::rule::lexer::{Lexer, TokenKind};
use libhwid::rule::parser::{BinaryOp, Expr, Expression, Function, Literal, UnaryOp};

fn parse_error(source: &str) -> String {
    Expression::parse(source)
        .expect_err("expression should be rejected")
        .message
}

#[test]
fn test_lexer_tokens() {
    let tokens = Lexer::tokenize("Foo('a\\'b', 12) >= -3").unwrap();
    let kinds: Vec<TokenKind> = tokens.into_iter().map(|token| token.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Identifier("Foo".to_string()),
            TokenKind::LeftParen,
            TokenKind::String("a'b".to_string()),
            TokenKind::Comma,
            TokenKind::Integer(12),
            TokenKind::RightParen,
            TokenKind::GreaterEqual,
            TokenKind::Minus,
            TokenKind::Integer(3),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lexer_keeps_regex_escapes() {
    let tokens = Lexer::tokenize(r"'Intel\(R\) \d+'").unwrap();
    assert_eq!(
        tokens[0].kind,
        TokenKind::String(r"Intel\(R\) \d+".to_string())
    );
}

#[test]
fn test_parse_call() {
    let expression = Expression::parse("SetComponent('dram', 'dram_1')").unwrap();
    assert_eq!(expression.source(), "SetComponent('dram', 'dram_1')");
    let Expr::Call { function, args } = &expression.root().expr else {
        panic!("expected a call");
    };
    assert_eq!(*function, Function::SetComponent);
    assert_eq!(args.len(), 2);
    assert!(matches!(&args[1].expr, Expr::Literal(Literal::String(name)) if name == "dram_1"));
}

#[test]
fn test_parse_precedence() {
    let expression = Expression::parse("not 1 + 2 * 3 == 7 and True or None").unwrap();
    let Expr::Binary { op: BinaryOp::Or, lhs, .. } = &expression.root().expr else {
        panic!("expected 'or' at the root");
    };
    let Expr::Binary { op: BinaryOp::And, lhs, .. } = &lhs.expr else {
        panic!("expected 'and' under 'or'");
    };
    let Expr::Unary { op: UnaryOp::Not, operand } = &lhs.expr else {
        panic!("expected 'not' under 'and'");
    };
    let Expr::Binary { op: BinaryOp::Equal, lhs, .. } = &operand.expr else {
        panic!("expected '==' under 'not'");
    };
    let Expr::Binary { op: BinaryOp::Add, rhs, .. } = &lhs.expr else {
        panic!("expected '+' under '=='");
    };
    assert!(matches!(
        rhs.expr,
        Expr::Binary {
            op: BinaryOp::Multiply,
            ..
        }
    ));
}

#[test]
fn test_parse_lists_and_in() {
    let expression = Expression::parse("GetPhase() in ['PVT_DOGFOOD', 'PVT',]").unwrap();
    let Expr::Binary { op: BinaryOp::In, rhs, .. } = &expression.root().expr else {
        panic!("expected 'in' at the root");
    };
    assert!(matches!(&rhs.expr, Expr::List(items) if items.len() == 2));
    assert!(Expression::parse("[]").is_ok());
}

#[test]
fn test_parse_regex_literal() {
    let expression = Expression::parse(r"Re('Intel\(R\) .*')").unwrap();
    let Expr::Regex(literal) = &expression.root().expr else {
        panic!("expected a regex literal");
    };
    assert_eq!(literal.pattern, r"Intel\(R\) .*");
    assert!(literal.regex.is_match("Intel(R) Core"));
    assert!(!literal.regex.is_match("AMD Intel(R)"));
}

#[test]
fn test_function_names() {
    assert_eq!(Function::from_name("GetVPDValue"), Some(Function::GetVpdValue));
    assert_eq!(Function::from_name("ValidVPDValue"), Some(Function::ValidVpdValue));
    assert_eq!(Function::from_name("GetVpdValue"), None);
    for function in Function::ALL {
        assert_eq!(Function::from_name(function.name()), Some(function));
    }
}

#[test]
fn test_unknown_function() {
    assert_eq!(parse_error("Eval('1')"), "unknown function 'Eval'");
    assert_eq!(parse_error("cpu"), "unknown function 'cpu'");
}

#[test]
fn test_wrong_arity() {
    assert_eq!(
        parse_error("ComponentEq('cpu')"),
        "ComponentEq() takes 2 arguments, got 1"
    );
    assert_eq!(
        parse_error("Assert(True, 'a', 'b')"),
        "Assert() takes 1 to 2 arguments, got 3"
    );
    assert_eq!(parse_error("GetPhase(1)"), "GetPhase() takes 0 arguments, got 1");
}

#[test]
fn test_invalid_regex() {
    assert!(parse_error("Re('(unclosed')").starts_with("invalid regular expression"));
    assert_eq!(parse_error("Re(GetPhase())"), "Re() expects a string literal");
}

#[test]
fn test_syntax_errors() {
    assert_eq!(parse_error("'unterminated"), "unterminated string literal");
    assert_eq!(parse_error("1 2"), "unexpected trailing input");
    assert_eq!(parse_error("1 == 2 == 3"), "unexpected trailing input");
    assert_eq!(parse_error("(1 + 2"), "expected ')'");
    assert_eq!(parse_error("1 +"), "unexpected end of expression");
    assert_eq!(parse_error("1 & 2"), "unexpected character '&'");
    assert_eq!(parse_error(""), "unexpected end of expression");
}

#[test]
fn test_parse_error_offset() {
    let error = Expression::parse("ComponentEq('cpu', 'cpu_0') and Nope()").unwrap_err();
    assert_eq!(error.offset, 32);
    assert_eq!(error.expression, "ComponentEq('cpu', 'cpu_0') and Nope()");
}

#[test]
fn test_text_of_span() {
    let expression = Expression::parse("Assert( ComponentEq('cpu', 'cpu_5') )").unwrap();
    let Expr::Call { args, .. } = &expression.root().expr else {
        panic!("expected a call");
    };
    assert_eq!(expression.text_of(args[0].span), "ComponentEq('cpu', 'cpu_5')");
    assert_eq!(expression.text_of(expression.root().span), expression.source());
}

#[test]
fn test_expressions_compare_by_source() {
    assert_eq!(
        Expression::parse("GetPhase()").unwrap(),
        Expression::parse("GetPhase()").unwrap()
    );
    assert_ne!(
        Expression::parse("GetPhase()").unwrap(),
        Expression::parse("GetPhase( )").unwrap()
    );
    assert_eq!(Expression::parse("1+1").unwrap().to_string(), "1+1");
}
