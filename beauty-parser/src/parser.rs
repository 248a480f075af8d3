use crate::ast::{BinaryOp, Block, Expr, Param, Stmt, StmtKind, UnaryOp};
use crate::lexer::{tokenize, Keyword, Operator, Token, TokenKind};
use crate::types::Type;
use beauty_source::{ensure_sufficient_stack, Error, Result};

mod expr;
mod stmt;

pub struct Parser<'a> {
    tokens: &'a [Token],
    /// Index of the current token. Never moves past the trailing `Eof`.
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` over `tokens`, which must end with [`TokenKind::Eof`].
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }
}

impl<'a> Parser<'a> {
    /// Parses the whole token sequence into the top level block.
    pub fn parse_program(&mut self) -> Result<Block> {
        let block = match self.current().kind {
            TokenKind::Indent(_) => self.parse_block()?,
            _ => Block::new(),
        };
        if self.current().kind != TokenKind::Eof {
            return Err(self.error("expected end of file"));
        }
        tracing::debug!(statements = block.len(), "parsed program");
        Ok(block)
    }
}

/// Parse utilities
impl<'a> Parser<'a> {
    fn current(&self) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        &tokens[self.pos.min(tokens.len() - 1)]
    }

    /// Returns the token `n` positions after the current one.
    fn peek(&self, n: usize) -> &'a TokenKind {
        let tokens: &'a [Token] = self.tokens;
        &tokens[(self.pos + n).min(tokens.len() - 1)].kind
    }

    fn next(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn at_op(&self, op: Operator) -> bool {
        self.current().kind == TokenKind::Operator(op)
    }

    fn at_line_end(&self) -> bool {
        self.current().kind == TokenKind::LineFeed
    }

    /// Predicate that tests whether the current token is `op` and eats it if yes as a side effect.
    fn eat_op(&mut self, op: Operator) -> bool {
        if self.at_op(op) {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: Operator, message: &str) -> Result<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn expect_line_end(&mut self, message: &str) -> Result<()> {
        if self.at_line_end() {
            self.next();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<String> {
        match &self.current().kind {
            TokenKind::Identifier(ident) => {
                let ident = ident.clone();
                self.next();
                Ok(ident)
            }
            _ => Err(self.error(message)),
        }
    }

    /// Raises a syntax error at the current token.
    fn error(&self, message: &str) -> Error {
        Error::syntax(message, self.current().loc)
    }
}

/// Lexes and parses `source` into the top level block.
pub fn parse_source(source: &str) -> Result<Block> {
    let tokens = tokenize(source)?;
    Parser::new(&tokens).parse_program()
}
