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

// src/rule/lexer.rs
// Converts rule expression text into tokens. Every token records the
// byte range it came from, so that failures can point back at the
// exact sub-expression.

use crate::rule::error::RuleParseError;

// Span is a byte range into the expression source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    // to returns the span covering both self and other.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Integer(i64),
    String(String),
    Identifier(String),
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    // tokenize lexes the whole input, ending with an Eof token.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, RuleParseError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    fn error<M: Into<String>>(&self, message: M, offset: usize) -> RuleParseError {
        RuleParseError::new(message, offset, self.source)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    pub fn next_token(&mut self) -> Result<Token, RuleParseError> {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }

        let start = self.pos;
        let Some(current) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::new(start, start),
            });
        };

        let kind = match current {
            b'\'' | b'"' => self.lex_string(current)?,
            b'0'..=b'9' => self.lex_integer()?,
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_identifier(),
            _ => self.lex_punctuation(current)?,
        };
        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    fn lex_punctuation(&mut self, current: u8) -> Result<TokenKind, RuleParseError> {
        let two = |lexer: &mut Self, kind: TokenKind| {
            lexer.pos += 2;
            kind
        };
        let next = self.peek_at(1);
        let kind = match (current, next) {
            (b'=', Some(b'=')) => two(self, TokenKind::EqualEqual),
            (b'!', Some(b'=')) => two(self, TokenKind::NotEqual),
            (b'<', Some(b'=')) => two(self, TokenKind::LessEqual),
            (b'>', Some(b'=')) => two(self, TokenKind::GreaterEqual),
            _ => {
                let kind = match current {
                    b'(' => TokenKind::LeftParen,
                    b')' => TokenKind::RightParen,
                    b'[' => TokenKind::LeftBracket,
                    b']' => TokenKind::RightBracket,
                    b',' => TokenKind::Comma,
                    b'+' => TokenKind::Plus,
                    b'-' => TokenKind::Minus,
                    b'*' => TokenKind::Star,
                    b'/' => TokenKind::Slash,
                    b'%' => TokenKind::Percent,
                    b'<' => TokenKind::Less,
                    b'>' => TokenKind::Greater,
                    _ => {
                        let ch = self.source[self.pos..].chars().next().unwrap_or('?');
                        return Err(self.error(format!("unexpected character '{ch}'"), self.pos));
                    }
                };
                self.pos += 1;
                kind
            }
        };
        Ok(kind)
    }

    fn lex_string(&mut self, quote: u8) -> Result<TokenKind, RuleParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut content = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string literal", start)),
                Some(b) if b == quote => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    let escaped = match self.peek_at(1) {
                        Some(b'n') => b'\n',
                        Some(b't') => b'\t',
                        Some(b @ (b'\\' | b'\'' | b'"')) => b,
                        // Unknown escapes are kept verbatim, which keeps
                        // regex escapes such as \d readable.
                        Some(_) => {
                            content.push(b'\\');
                            self.pos += 1;
                            continue;
                        }
                        None => return Err(self.error("unterminated string literal", start)),
                    };
                    content.push(escaped);
                    self.pos += 2;
                }
                Some(b) => {
                    content.push(b);
                    self.pos += 1;
                }
            }
        }
        String::from_utf8(content)
            .map(TokenKind::String)
            .map_err(|_| self.error("invalid UTF-8 in string literal", start))
    }

    fn lex_integer(&mut self) -> Result<TokenKind, RuleParseError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.source[start..self.pos]
            .parse::<i64>()
            .map(TokenKind::Integer)
            .map_err(|_| self.error("integer literal out of range", start))
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        TokenKind::Identifier(self.source[start..self.pos].to_string())
    }
}
