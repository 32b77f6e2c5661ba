// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Turns verb source into a stream of typed tokens.

use crate::CompileOptions;
use crate::errors::CompileError;
use pest::Parser;
use pest::iterators::Pairs;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use strum::{AsRefStr, EnumString};
use tracing::warn;

pub mod moo {
    #[derive(Parser)]
    #[grammar = "src/moo.pest"]
    pub struct MooParser;
}

use moo::{MooParser, Rule};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Keyword {
    If,
    ElseIf,
    Else,
    EndIf,
    For,
    In,
    EndFor,
    While,
    EndWhile,
    Break,
    Continue,
    Fork,
    EndFork,
    Try,
    Except,
    Finally,
    EndTry,
    Return,
    #[strum(serialize = "__VERB__")]
    Verb,
    EndVerb,
    Any,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, AsRefStr)]
pub enum Punct {
    #[strum(serialize = "==")]
    EqEq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "<=")]
    LtEq,
    #[strum(serialize = ">=")]
    GtEq,
    #[strum(serialize = "&&")]
    AndAnd,
    #[strum(serialize = "||")]
    OrOr,
    #[strum(serialize = "=>")]
    Arrow,
    #[strum(serialize = "..")]
    DotDot,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "%")]
    Percent,
    #[strum(serialize = "^")]
    Caret,
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "?")]
    Question,
    #[strum(serialize = "|")]
    Pipe,
    #[strum(serialize = "!")]
    Bang,
    #[strum(serialize = ".")]
    Dot,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ";")]
    Semi,
    #[strum(serialize = "@")]
    At,
    #[strum(serialize = "$")]
    Dollar,
    #[strum(serialize = "(")]
    LParen,
    #[strum(serialize = ")")]
    RParen,
    #[strum(serialize = "[")]
    LBracket,
    #[strum(serialize = "]")]
    RBracket,
    #[strum(serialize = "{")]
    LBrace,
    #[strum(serialize = "}")]
    RBrace,
    #[strum(serialize = "`")]
    Backtick,
    #[strum(serialize = "'")]
    Quote,
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl Display for Punct {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TokenKind {
    Integer,
    Float,
    Str,
    Object,
    ErrorCode,
    Identifier,
    Keyword(Keyword),
    Punct(Punct),
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Integer => write!(f, "integer"),
            TokenKind::Float => write!(f, "float"),
            TokenKind::Str => write!(f, "string"),
            TokenKind::Object => write!(f, "object reference"),
            TokenKind::ErrorCode => write!(f, "error code"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Keyword(k) => write!(f, "`{k}`"),
            TokenKind::Punct(p) => write!(f, "`{p}`"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn is_punct(&self, p: Punct) -> bool {
        self.kind == TokenKind::Punct(p)
    }

    pub fn is_keyword(&self, k: Keyword) -> bool {
        self.kind == TokenKind::Keyword(k)
    }
}

/// Lazily classifies the lexemes recognized by the token grammar.
pub struct Lexer<'a> {
    pairs: Pairs<'a, Rule>,
    strict: bool,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, options: &CompileOptions) -> Result<Self, CompileError> {
        let pairs = MooParser::parse(Rule::tokens, source).map_err(|e| {
            let (line, column) = match e.line_col {
                pest::error::LineColLocation::Pos(lc) => lc,
                pest::error::LineColLocation::Span(begin, _) => begin,
            };
            CompileError::ParseError {
                line,
                column,
                context: e.line().to_string(),
                message: e.variant.message().to_string(),
            }
        })?;
        Ok(Self {
            pairs,
            strict: options.strict_lexing,
            failed: false,
        })
    }
}

fn classify_ident(text: &str) -> TokenKind {
    if let Ok(keyword) = Keyword::from_str(text) {
        return TokenKind::Keyword(keyword);
    }
    if text.starts_with("E_") {
        return TokenKind::ErrorCode;
    }
    TokenKind::Identifier
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let pair = self.pairs.next()?;
            let (line, column) = pair.line_col();
            let text = pair.as_str();
            let kind = match pair.as_rule() {
                Rule::EOI => return None,
                Rule::float => TokenKind::Float,
                Rule::integer => TokenKind::Integer,
                Rule::string => TokenKind::Str,
                Rule::object => TokenKind::Object,
                Rule::ident => classify_ident(text),
                Rule::punct => match Punct::from_str(text) {
                    Ok(p) => TokenKind::Punct(p),
                    Err(_) => {
                        self.failed = true;
                        return Some(Err(CompileError::ParseError {
                            line,
                            column,
                            context: text.to_string(),
                            message: format!("unsupported operator {text}"),
                        }));
                    }
                },
                Rule::unterminated_string => {
                    self.failed = true;
                    return Some(Err(CompileError::StringLexError(format!(
                        "unterminated string literal @ {line}/{column}"
                    ))));
                }
                Rule::unknown => {
                    let character = text.chars().next().unwrap_or_default();
                    if self.strict {
                        self.failed = true;
                        return Some(Err(CompileError::LexError {
                            character,
                            line,
                            column,
                        }));
                    }
                    warn!(?character, line, column, "skipping unrecognized character");
                    continue;
                }
                _ => continue,
            };
            return Some(Ok(Token {
                kind,
                text: text.to_string(),
                line,
                column,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, &CompileOptions::default())
            .unwrap()
            .map(|t| t.unwrap().kind)
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 1.5 .5 2.0e-3 1e5"),
            vec![
                TokenKind::Integer,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float
            ]
        );
    }

    #[test]
    fn test_trailing_dot_float() {
        assert_eq!(
            kinds("1. 2.e3 3.;"),
            vec![
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Punct(Punct::Semi)
            ]
        );
        assert_eq!(
            kinds("4.x"),
            vec![
                TokenKind::Integer,
                TokenKind::Punct(Punct::Dot),
                TokenKind::Identifier
            ]
        );
    }

    #[test]
    fn test_range_is_not_float() {
        assert_eq!(
            kinds("1..3"),
            vec![
                TokenKind::Integer,
                TokenKind::Punct(Punct::DotDot),
                TokenKind::Integer
            ]
        );
    }

    #[test]
    fn test_negative_numbers_are_two_tokens() {
        assert_eq!(
            kinds("-5"),
            vec![TokenKind::Punct(Punct::Minus), TokenKind::Integer]
        );
        assert_eq!(kinds("#-1"), vec![TokenKind::Object]);
    }

    #[test]
    fn test_keywords_ignore_case() {
        assert_eq!(
            kinds("IF EndWhile __VERB__ any E_PERM e_perm"),
            vec![
                TokenKind::Keyword(Keyword::If),
                TokenKind::Keyword(Keyword::EndWhile),
                TokenKind::Keyword(Keyword::Verb),
                TokenKind::Keyword(Keyword::Any),
                TokenKind::ErrorCode,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens: Vec<Token> = Lexer::new("x = \"a\\\"b\";\n  return x;", &CompileOptions::default())
            .unwrap()
            .map(|t| t.unwrap())
            .collect();
        assert_eq!(tokens[2].kind, TokenKind::Str);
        assert_eq!(tokens[2].text, "\"a\\\"b\"");
        assert_eq!((tokens[4].line, tokens[4].column), (2, 3));
        assert!(tokens[4].is_keyword(Keyword::Return));
    }

    #[test]
    fn test_punctuation_longest_match() {
        assert_eq!(
            kinds("a=>b==c=d"),
            vec![
                TokenKind::Identifier,
                TokenKind::Punct(Punct::Arrow),
                TokenKind::Identifier,
                TokenKind::Punct(Punct::EqEq),
                TokenKind::Identifier,
                TokenKind::Punct(Punct::Assign),
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_strict_unknown_character() {
        let mut lexer = Lexer::new("x ~ y", &CompileOptions::default()).unwrap();
        assert!(lexer.next().unwrap().is_ok());
        assert_eq!(
            lexer.next(),
            Some(Err(CompileError::LexError {
                character: '~',
                line: 1,
                column: 3
            }))
        );
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_lenient_unknown_character() {
        let options = CompileOptions {
            strict_lexing: false,
            ..Default::default()
        };
        let kinds: Vec<_> = Lexer::new("x ~ y", &options)
            .unwrap()
            .map(|t| t.unwrap().kind)
            .collect();
        assert_eq!(kinds, vec![TokenKind::Identifier, TokenKind::Identifier]);
    }

    #[test]
    fn test_unterminated_string() {
        let result: Result<Vec<_>, _> =
            Lexer::new("x = \"abc;", &CompileOptions::default()).unwrap().collect();
        assert!(matches!(result, Err(CompileError::StringLexError(_))));
    }
}
