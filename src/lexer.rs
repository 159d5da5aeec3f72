//! Lexer for kernel scripts using logos
//!
//! Supports tokens like:
//! - Literals: `1` (int), `1u` (uint), `1.5` (float), `1.5d` (double)
//! - Identifiers and keywords: `acc`, `float4`, `while`
//! - Operators: `+ - * / % & | ^ ~ << >> == != < <= > >= =`
//! - Punctuation: `( ) [ ] { } , ; .`
//! - Line comments starting with `//`

use logos::Logos;

/// Token types of the kernel script language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // Literals
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?d", |lex| {
        let s = lex.slice();
        s[..s.len() - 1].parse::<f64>().ok()
    })]
    Double(f64),

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"[0-9]+u", |lex| {
        let s = lex.slice();
        s[..s.len() - 1].parse::<u32>().ok()
    })]
    Uint(u32),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Keywords
    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("while")]
    While,

    #[token("break")]
    Break,

    #[token("continue")]
    Continue,

    // Operators
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("&")]
    Amp,

    #[token("|")]
    Pipe,

    #[token("^")]
    Caret,

    #[token("~")]
    Tilde,

    #[token("<<")]
    Shl,

    #[token(">>")]
    Shr,

    #[token("==")]
    EqEq,

    #[token("!=")]
    NotEq,

    #[token("<")]
    Lt,

    #[token("<=")]
    Le,

    #[token(">")]
    Gt,

    #[token(">=")]
    Ge,

    #[token("=")]
    Equals,

    #[token(".")]
    Dot,

    // Punctuation
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Double(n) => write!(f, "{}d", n),
            Token::Float(n) => write!(f, "{:?}", n),
            Token::Uint(n) => write!(f, "{}u", n),
            Token::Int(n) => write!(f, "{}", n),
            Token::Ident(s) => write!(f, "{}", s),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Caret => write!(f, "^"),
            Token::Tilde => write!(f, "~"),
            Token::Shl => write!(f, "<<"),
            Token::Shr => write!(f, ">>"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::Equals => write!(f, "="),
            Token::Dot => write!(f, "."),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
        }
    }
}

/// Lexer wrapper that provides a stream of tokens
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
    peeked: Option<Option<Result<Token, ()>>>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: Token::lexer(source),
            peeked: None,
        }
    }

    /// Get current position in source
    pub fn span(&self) -> std::ops::Range<usize> {
        self.inner.span()
    }

    /// Peek at the next token without consuming it
    pub fn peek(&mut self) -> Option<&Result<Token, ()>> {
        let inner = &mut self.inner;
        self.peeked.get_or_insert_with(|| inner.next()).as_ref()
    }

    /// Check if the next token matches expected
    pub fn check(&mut self, expected: &Token) -> bool {
        match self.peek() {
            Some(Ok(tok)) => tok == expected,
            _ => false,
        }
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<Token, ()>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(peeked) = self.peeked.take() {
            peeked
        } else {
            self.inner.next()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        Lexer::new(source).filter_map(Result::ok).collect()
    }

    #[test]
    fn test_literal_suffixes() {
        assert_eq!(
            tokens("1 1u 1.0 1.5d 2.5e1"),
            vec![
                Token::Int(1),
                Token::Uint(1),
                Token::Float(1.0),
                Token::Double(1.5),
                Token::Float(25.0),
            ]
        );
    }

    #[test]
    fn test_statement() {
        assert_eq!(
            tokens("var float4 acc = float4(0.0); // init"),
            vec![
                Token::Ident("var".to_string()),
                Token::Ident("float4".to_string()),
                Token::Ident("acc".to_string()),
                Token::Equals,
                Token::Ident("float4".to_string()),
                Token::LParen,
                Token::Float(0.0),
                Token::RParen,
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_operators_and_keywords() {
        assert_eq!(
            tokens("while (i <= 16) { x = x << 1; } else"),
            vec![
                Token::While,
                Token::LParen,
                Token::Ident("i".to_string()),
                Token::Le,
                Token::Int(16),
                Token::RParen,
                Token::LBrace,
                Token::Ident("x".to_string()),
                Token::Equals,
                Token::Ident("x".to_string()),
                Token::Shl,
                Token::Int(1),
                Token::Semicolon,
                Token::RBrace,
                Token::Else,
            ]
        );
    }

    #[test]
    fn test_swizzle_access() {
        assert_eq!(
            tokens("acc.xy"),
            vec![Token::Ident("acc".to_string()), Token::Dot, Token::Ident("xy".to_string())]
        );
    }

    #[test]
    fn test_invalid_character() {
        let results: Vec<_> = Lexer::new("a $ b").collect();
        assert!(results.iter().any(Result::is_err));
    }
}
