#![forbid(unsafe_code)]

use logos::Logos;

use crate::pos::{LineMap, Pos};
use crate::token::{Tok, Token};

/// Raw token layer produced by logos. The public [`Lexer`] folds this into
/// [`Token`]s carrying positions and literal text; lexical faults become
/// `Illegal` tokens rather than hard errors, so the parser can keep going.
#[derive(Logos, Clone, Debug, PartialEq)]
#[logos(skip r"\p{White_Space}+")]
enum RawTok {
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,

    #[token("←")]
    #[token("<-")]
    Assign,
    #[token(",")]
    Comma,
    #[token("≔")]
    #[token(":=")]
    Define,
    #[token(";")]
    Semicolon,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("·")]
    #[token("*")]
    Multiply,
    // A single `/` divides; `//` starts a comment and wins as the longer
    // match.
    #[token("÷")]
    #[token("/")]
    Divide,

    #[token("∧")]
    #[token("&")]
    And,
    #[token("∨")]
    #[token("|")]
    Or,
    #[token("⟹")]
    #[token("=>")]
    Implies,

    #[token("<")]
    Less,
    #[token("≤")]
    #[token("<=")]
    LessEq,
    #[token("=")]
    Equal,
    #[token("≠")]
    #[token("#")]
    NotEqual,
    #[token(">")]
    Greater,
    #[token("≥")]
    #[token(">=")]
    GreaterEq,
    #[token("∈")]
    In,
    #[token("¬")]
    #[token("~")]
    Not,

    // Line comments keep the leading `//` in their literal text.
    #[regex(r"//[^\n]*")]
    Comment,

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("is")]
    Is,
    #[token("bool")]
    Bool,
    #[token("i64")]
    I64,
    #[token("f64")]
    F64,
    #[token("string")]
    String,
    #[token("func")]
    Func,
    #[token("assert")]
    Assert,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("if")]
    If,
    #[token("return")]
    Return,
    #[token("set")]
    Set,
    #[token("let")]
    Let,

    #[regex(r"[\p{L}_][\p{L}\p{Nd}_]*")]
    Ident,

    // A digit-initial run of digits, underscores and dots. Zero dots is an
    // i64 literal, one dot an f64 literal, anything else is illegal.
    #[regex(r"[0-9][0-9_.]*", classify_number)]
    Number(NumKind),

    // Terminated string literal; the callback checks the escape set.
    #[regex(r#""([^"\\\n]|\\[^\n])*""#, check_escapes, priority = 6)]
    Str(bool),

    // A string cut short by end of line or end of input.
    #[regex(r#""([^"\\\n]|\\[^\n])*"#, priority = 5)]
    UnterminatedStr,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum NumKind {
    I64,
    F64,
    Illegal,
}

fn classify_number(lex: &mut logos::Lexer<RawTok>) -> NumKind {
    match lex.slice().bytes().filter(|b| *b == b'.').count() {
        0 => NumKind::I64,
        1 => NumKind::F64,
        _ => NumKind::Illegal,
    }
}

fn check_escapes(lex: &mut logos::Lexer<RawTok>) -> bool {
    let mut chars = lex.slice().chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            continue;
        }
        match chars.next() {
            Some('n' | 't' | '\\' | '"') => {}
            _ => return false,
        }
    }
    true
}

/// The lexical analyzer. [`Lexer::read`] hands out one token per call, in
/// source order, each carrying the position of its first byte; after the end
/// of input it keeps returning the `EOF` token.
pub struct Lexer<'src> {
    src: &'src str,
    inner: logos::SpannedIter<'src, RawTok>,
    lines: LineMap,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            inner: RawTok::lexer(src).spanned(),
            lines: LineMap::new(src),
        }
    }

    /// Read the next token. Unknown runes, malformed numbers and unterminated
    /// strings come back as `Illegal` tokens with the offending text as their
    /// literal.
    pub fn read(&mut self) -> Token {
        let Some((raw, span)) = self.inner.next() else {
            return Token {
                kind: Tok::Eof,
                pos: self.lines.pos(self.src.len()),
                lit: "EOF".to_string(),
            };
        };

        let pos = self.lines.pos(span.start);
        let lit = self.src[span].to_string();
        let kind = match raw {
            Ok(raw) => match raw {
                RawTok::LeftParen => Tok::LeftParen,
                RawTok::RightParen => Tok::RightParen,
                RawTok::LeftBracket => Tok::LeftBracket,
                RawTok::RightBracket => Tok::RightBracket,
                RawTok::LeftBrace => Tok::LeftBrace,
                RawTok::RightBrace => Tok::RightBrace,
                RawTok::Assign => Tok::Assign,
                RawTok::Comma => Tok::Comma,
                RawTok::Define => Tok::Define,
                RawTok::Semicolon => Tok::Semicolon,
                RawTok::Plus => Tok::Plus,
                RawTok::Minus => Tok::Minus,
                RawTok::Multiply => Tok::Multiply,
                RawTok::Divide => Tok::Divide,
                RawTok::And => Tok::And,
                RawTok::Or => Tok::Or,
                RawTok::Implies => Tok::Implies,
                RawTok::Less => Tok::Less,
                RawTok::LessEq => Tok::LessEq,
                RawTok::Equal => Tok::Equal,
                RawTok::NotEqual => Tok::NotEqual,
                RawTok::Greater => Tok::Greater,
                RawTok::GreaterEq => Tok::GreaterEq,
                RawTok::In => Tok::In,
                RawTok::Not => Tok::Not,
                RawTok::Comment => Tok::Comment,
                RawTok::True => Tok::True,
                RawTok::False => Tok::False,
                RawTok::Is => Tok::Is,
                RawTok::Bool => Tok::Bool,
                RawTok::I64 => Tok::I64,
                RawTok::F64 => Tok::F64,
                RawTok::String => Tok::String,
                RawTok::Func => Tok::Func,
                RawTok::Assert => Tok::Assert,
                RawTok::Break => Tok::Break,
                RawTok::Continue => Tok::Continue,
                RawTok::Else => Tok::Else,
                RawTok::For => Tok::For,
                RawTok::If => Tok::If,
                RawTok::Return => Tok::Return,
                RawTok::Set => Tok::Set,
                RawTok::Let => Tok::Let,
                RawTok::Ident => Tok::Identifier,
                RawTok::Number(NumKind::I64) => Tok::I64Lit,
                RawTok::Number(NumKind::F64) => Tok::F64Lit,
                RawTok::Number(NumKind::Illegal) => Tok::Illegal,
                RawTok::Str(true) => Tok::StringLit,
                RawTok::Str(false) => Tok::Illegal,
                RawTok::UnterminatedStr => Tok::Illegal,
            },
            Err(()) => Tok::Illegal,
        };

        Token { kind, pos, lit }
    }
}

/// Lex the whole input, ending with the `EOF` token.
pub fn tokenize(src: &str) -> Vec<Token> {
    let mut lx = Lexer::new(src);
    let mut out = Vec::new();
    loop {
        let tok = lx.read();
        let done = tok.kind == Tok::Eof;
        out.push(tok);
        if done {
            return out;
        }
    }
}
