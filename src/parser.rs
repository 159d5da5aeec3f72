//! Parser for kernel scripts
//!
//! Parses scripts like:
//! - `threads 128;`
//! - `var float4 acc = float4(0.0);`
//! - `while (i < 16) { acc = mad(points[coord], scale, acc); i = i + 1; }`
//! - `out[tid_flat] = acc.x;`
//!
//! Binary operators follow C precedence, lowest first: `|`, `^`, `&`,
//! equality, relational, shifts, additive, multiplicative.

use crate::ast::{BinaryOp, Expr, Program, Statement, UnaryOp};
use crate::error::{CompileError, CompileResult};
use crate::lexer::{Lexer, Token};

/// Parser for kernel scripts
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    current: Option<Token>,
    lex_error: Option<CompileError>,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source str) -> Self {
        let mut parser = Self {
            lexer: Lexer::new(source),
            current: None,
            lex_error: None,
        };
        parser.current = parser.next_token();
        parser
    }

    fn next_token(&mut self) -> Option<Token> {
        match self.lexer.next()? {
            Ok(token) => Some(token),
            Err(()) => {
                let span = self.lexer.span();
                self.lex_error.get_or_insert(CompileError::LexerError {
                    position: span.start,
                    message: "unexpected character".to_string(),
                });
                None
            }
        }
    }

    /// Advance to the next token
    fn advance(&mut self) -> Option<Token> {
        let prev = self.current.take();
        self.current = self.next_token();
        prev
    }

    /// Check if current token matches expected
    fn check(&self, expected: &Token) -> bool {
        match &self.current {
            Some(tok) => std::mem::discriminant(tok) == std::mem::discriminant(expected),
            None => false,
        }
    }

    /// A lexer error hides whatever the parser tripped over afterwards
    fn error(&mut self, message: impl Into<String>) -> CompileError {
        self.lex_error
            .take()
            .unwrap_or_else(|| CompileError::parse_error(message))
    }

    /// Consume token if it matches, otherwise error
    fn expect(&mut self, expected: Token) -> CompileResult<Token> {
        if self.check(&expected) {
            if let Some(token) = self.advance() {
                return Ok(token);
            }
        }
        let found = self.found();
        Err(self.error(format!("expected `{}`, got {}", expected, found)))
    }

    fn found(&self) -> String {
        match &self.current {
            Some(token) => format!("`{}`", token),
            None => "end of input".to_string(),
        }
    }

    fn expect_ident(&mut self, what: &str) -> CompileResult<String> {
        if let Some(Token::Ident(name)) = &self.current {
            let name = name.clone();
            self.advance();
            return Ok(name);
        }
        let found = self.found();
        Err(self.error(format!("expected {}, got {}", what, found)))
    }

    fn expect_number(&mut self, what: &str) -> CompileResult<u32> {
        if let Some(Token::Int(n)) = self.current {
            if let Ok(n) = u32::try_from(n) {
                self.advance();
                return Ok(n);
            }
        }
        let found = self.found();
        Err(self.error(format!("expected {}, got {}", what, found)))
    }

    fn end_statement(&mut self) -> CompileResult<()> {
        self.expect(Token::Semicolon).map(|_| ())
    }

    /// Parse a complete script
    pub fn parse_program(&mut self) -> CompileResult<Program> {
        let mut statements = Vec::new();
        while self.current.is_some() {
            statements.push(self.parse_statement()?);
        }
        if let Some(err) = self.lex_error.take() {
            return Err(err);
        }
        Ok(Program { statements })
    }

    fn parse_block(&mut self) -> CompileResult<Vec<Statement>> {
        self.expect(Token::LBrace)?;
        let mut statements = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.current.is_none() {
                return Err(self.error("unterminated block"));
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(Token::RBrace)?;
        Ok(statements)
    }

    fn parse_condition(&mut self) -> CompileResult<Expr> {
        self.expect(Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(Token::RParen)?;
        Ok(cond)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> CompileResult<Statement> {
        match self.current.clone() {
            Some(Token::If) => {
                self.advance();
                let cond = self.parse_condition()?;
                let then = self.parse_block()?;
                let otherwise = if self.check(&Token::Else) {
                    self.advance();
                    if self.check(&Token::If) {
                        Some(vec![self.parse_statement()?])
                    } else {
                        Some(self.parse_block()?)
                    }
                } else {
                    None
                };
                Ok(Statement::If { cond, then, otherwise })
            }
            Some(Token::While) => {
                self.advance();
                let cond = self.parse_condition()?;
                let body = self.parse_block()?;
                Ok(Statement::While { cond, body })
            }
            Some(Token::Break) => {
                self.advance();
                self.end_statement()?;
                Ok(Statement::Break)
            }
            Some(Token::Continue) => {
                self.advance();
                self.end_statement()?;
                Ok(Statement::Continue)
            }
            Some(Token::Ident(word)) => {
                self.advance();
                let statement = self.parse_word_statement(word)?;
                self.end_statement()?;
                Ok(statement)
            }
            _ => {
                let found = self.found();
                Err(self.error(format!("expected a statement, got {}", found)))
            }
        }
    }

    /// Statements introduced by an identifier: headers, declarations,
    /// atomics and assignments
    fn parse_word_statement(&mut self, word: String) -> CompileResult<Statement> {
        match word.as_str() {
            "threads" => Ok(Statement::Threads(self.expect_number("a thread count")?)),
            "profile" => Ok(Statement::Profile(self.expect_ident("a profile name")?)),
            "barrier" => Ok(Statement::Barrier),
            "fence" => Ok(Statement::Fence),
            "arg" => {
                let ty = self.expect_ident("a type")?;
                let name = self.expect_ident("an argument name")?;
                Ok(Statement::Arg { ty, name })
            }
            "input1d" | "input2d" => {
                let rank = if word == "input1d" { 1 } else { 2 };
                let ty = self.expect_ident("a type")?;
                let name = self.expect_ident("a resource name")?;
                let slot = self.expect_number("a resource slot")?;
                Ok(Statement::Input { rank, ty, name, slot })
            }
            "uav" => {
                let kind = self.expect_ident("raw, struct or typed")?;
                let ty = self.expect_ident("a type")?;
                let name = self.expect_ident("a UAV name")?;
                let id = self.expect_number("a UAV id")?;
                let cache = match &self.current {
                    Some(Token::Ident(_)) => Some(self.expect_ident("a cache mode")?),
                    _ => None,
                };
                Ok(Statement::Uav {
                    kind,
                    ty,
                    name,
                    id,
                    cache,
                })
            }
            "lds" => {
                let ty = self.expect_ident("a type")?;
                let name = self.expect_ident("an LDS name")?;
                let id = self.expect_number("an LDS id")?;
                let count = self.expect_number("an element count")?;
                Ok(Statement::Lds { ty, name, id, count })
            }
            "global" => {
                let ty = self.expect_ident("a type")?;
                let name = self.expect_ident("a view name")?;
                Ok(Statement::Global { ty, name })
            }
            "indexed" => {
                let ty = self.expect_ident("a type")?;
                let name = self.expect_ident("an array name")?;
                let len = self.expect_number("an array length")?;
                Ok(Statement::Indexed { ty, name, len })
            }
            "var" => {
                let ty = self.expect_ident("a type")?;
                let name = self.expect_ident("a variable name")?;
                let init = if self.check(&Token::Equals) {
                    self.advance();
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                Ok(Statement::Var { ty, name, init })
            }
            op if op.starts_with("atomic_") => {
                let op = op.trim_start_matches("atomic_").to_string();
                self.expect(Token::LParen)?;
                let view = self.expect_ident("a view name")?;
                self.expect(Token::Comma)?;
                let index = self.parse_expr()?;
                let mut operands = Vec::new();
                while self.check(&Token::Comma) {
                    self.advance();
                    operands.push(self.parse_expr()?);
                }
                self.expect(Token::RParen)?;
                Ok(Statement::Atomic {
                    op,
                    view,
                    index,
                    operands,
                })
            }
            _ => self.parse_assignment(word),
        }
    }

    fn parse_assignment(&mut self, name: String) -> CompileResult<Statement> {
        if self.check(&Token::LBracket) {
            self.advance();
            let index = self.parse_expr()?;
            self.expect(Token::RBracket)?;
            self.expect(Token::Equals)?;
            let value = self.parse_expr()?;
            return Ok(Statement::Store {
                view: name,
                index,
                value,
            });
        }
        let lanes = if self.check(&Token::Dot) {
            self.advance();
            Some(self.expect_ident("lane selectors")?)
        } else {
            None
        };
        self.expect(Token::Equals)?;
        let value = self.parse_expr()?;
        Ok(Statement::Assign { name, lanes, value })
    }

    /// Parse an expression (handles operator precedence)
    pub fn parse_expr(&mut self) -> CompileResult<Expr> {
        self.parse_or()
    }

    /// One left-associative precedence level
    fn parse_level(
        &mut self,
        operators: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> CompileResult<Expr>,
    ) -> CompileResult<Expr> {
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in operators {
                if self.check(token) {
                    self.advance();
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        lhs: Box::new(left),
                        rhs: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            break;
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> CompileResult<Expr> {
        self.parse_level(&[(Token::Pipe, BinaryOp::Or)], Self::parse_xor)
    }

    fn parse_xor(&mut self) -> CompileResult<Expr> {
        self.parse_level(&[(Token::Caret, BinaryOp::Xor)], Self::parse_and)
    }

    fn parse_and(&mut self) -> CompileResult<Expr> {
        self.parse_level(&[(Token::Amp, BinaryOp::And)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> CompileResult<Expr> {
        self.parse_level(
            &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::Ne)],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> CompileResult<Expr> {
        self.parse_level(
            &[
                (Token::Le, BinaryOp::Le),
                (Token::Lt, BinaryOp::Lt),
                (Token::Ge, BinaryOp::Ge),
                (Token::Gt, BinaryOp::Gt),
            ],
            Self::parse_shift,
        )
    }

    fn parse_shift(&mut self) -> CompileResult<Expr> {
        self.parse_level(
            &[(Token::Shl, BinaryOp::Shl), (Token::Shr, BinaryOp::Shr)],
            Self::parse_additive,
        )
    }

    /// Parse additive expressions: a + b, a - b
    fn parse_additive(&mut self) -> CompileResult<Expr> {
        self.parse_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    /// Parse multiplicative expressions: a * b, a / b, a % b
    fn parse_multiplicative(&mut self) -> CompileResult<Expr> {
        self.parse_level(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    /// Parse unary expressions: -a, ~a; a minus directly before a signed
    /// literal becomes part of the literal
    fn parse_unary(&mut self) -> CompileResult<Expr> {
        if self.check(&Token::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(match operand {
                Expr::Int(n) => Expr::Int(-n),
                Expr::Float(n) => Expr::Float(-n),
                Expr::Double(n) => Expr::Double(-n),
                other => Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(other),
                },
            });
        }
        if self.check(&Token::Tilde) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    /// Parse postfix lane selection: a.xy
    fn parse_postfix(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_primary()?;
        while self.check(&Token::Dot) {
            self.advance();
            let lanes = self.expect_ident("lane selectors after `.`")?;
            expr = Expr::Swizzle {
                base: Box::new(expr),
                lanes,
            };
        }
        Ok(expr)
    }

    /// Parse primary expressions: literals, names, calls, reads, parentheses
    fn parse_primary(&mut self) -> CompileResult<Expr> {
        match self.current.clone() {
            Some(Token::Int(n)) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            Some(Token::Uint(n)) => {
                self.advance();
                Ok(Expr::Uint(n))
            }
            Some(Token::Float(n)) => {
                self.advance();
                Ok(Expr::Float(n))
            }
            Some(Token::Double(n)) => {
                self.advance();
                Ok(Expr::Double(n))
            }
            Some(Token::Ident(name)) => {
                self.advance();
                if self.check(&Token::LParen) {
                    let args = self.parse_args()?;
                    return Ok(Expr::Call { name, args });
                }
                if self.check(&Token::LBracket) {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket)?;
                    return Ok(Expr::Index {
                        view: name,
                        index: Box::new(index),
                    });
                }
                Ok(Expr::Ident(name))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            None => Err(self.error("unexpected end of input")),
            Some(other) => Err(self.error(format!("unexpected token `{}`", other))),
        }
    }

    /// Parse function arguments: (arg1, arg2, ...)
    fn parse_args(&mut self) -> CompileResult<Vec<Expr>> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args.push(self.parse_expr()?);
            while self.check(&Token::Comma) {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Statement> {
        Parser::new(source).parse_program().unwrap().statements
    }

    #[test]
    fn test_parse_declarations() {
        let statements = parse(
            "threads 128; arg float4 centroid; input2d float4 points 0;\n\
             uav raw float out 1 cached; lds uint partial 0 64; indexed int table 8;",
        );
        assert_eq!(statements[0], Statement::Threads(128));
        assert_eq!(
            statements[1],
            Statement::Arg {
                ty: "float4".into(),
                name: "centroid".into()
            }
        );
        assert_eq!(
            statements[2],
            Statement::Input {
                rank: 2,
                ty: "float4".into(),
                name: "points".into(),
                slot: 0
            }
        );
        assert_eq!(
            statements[3],
            Statement::Uav {
                kind: "raw".into(),
                ty: "float".into(),
                name: "out".into(),
                id: 1,
                cache: Some("cached".into())
            }
        );
        assert!(matches!(statements[4], Statement::Lds { count: 64, .. }));
        assert!(matches!(statements[5], Statement::Indexed { len: 8, .. }));
    }

    #[test]
    fn test_precedence() {
        let statements = parse("x = a + b * c << 1 == d;");
        let Statement::Assign { value, .. } = &statements[0] else {
            panic!("expected assignment");
        };
        let Expr::Binary { op: BinaryOp::Eq, lhs, .. } = value else {
            panic!("expected ==, got {:?}", value);
        };
        let Expr::Binary { op: BinaryOp::Shl, lhs, .. } = lhs.as_ref() else {
            panic!("expected <<");
        };
        let Expr::Binary { op: BinaryOp::Add, rhs, .. } = lhs.as_ref() else {
            panic!("expected +");
        };
        assert!(matches!(rhs.as_ref(), Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_parse_control_flow() {
        let statements = parse(
            "while (i < 16) { if (i == 3) { break; } else { i = i + 1; } }",
        );
        let Statement::While { body, .. } = &statements[0] else {
            panic!("expected while");
        };
        let Statement::If { then, otherwise, .. } = &body[0] else {
            panic!("expected if");
        };
        assert_eq!(then, &vec![Statement::Break]);
        assert_eq!(otherwise.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_stores_swizzles_and_atomics() {
        let statements = parse("out[tid_flat] = acc.x; acc.yw = v.xx; atomic_add(counter, 0, 1u);");
        assert_eq!(
            statements[0],
            Statement::Store {
                view: "out".into(),
                index: Expr::Ident("tid_flat".into()),
                value: Expr::Swizzle {
                    base: Box::new(Expr::Ident("acc".into())),
                    lanes: "x".into()
                },
            }
        );
        assert!(matches!(&statements[1], Statement::Assign { lanes: Some(l), .. } if l == "yw"));
        assert_eq!(
            statements[2],
            Statement::Atomic {
                op: "add".into(),
                view: "counter".into(),
                index: Expr::Int(0),
                operands: vec![Expr::Uint(1)],
            }
        );
    }

    #[test]
    fn test_negative_literals() {
        let statements = parse("var int i = -3; x = -y;");
        assert!(matches!(&statements[0], Statement::Var { init: Some(Expr::Int(-3)), .. }));
        assert!(matches!(
            &statements[1],
            Statement::Assign { value: Expr::Unary { op: UnaryOp::Neg, .. }, .. }
        ));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Parser::new("var float x").parse_program(),
            Err(CompileError::ParseError { .. })
        ));
        assert!(matches!(
            Parser::new("x = 1 $ 2;").parse_program(),
            Err(CompileError::LexerError { position: 6, .. })
        ));
        assert!(Parser::new("while (x) { x = 1;").parse_program().is_err());
    }
}
