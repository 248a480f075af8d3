use super::*;

impl<'a> Parser<'a> {
    /// Parses an indentation block. The current token must be the `Indent` of its first line.
    pub fn parse_block(&mut self) -> Result<Block> {
        let base = match self.current().kind {
            TokenKind::Indent(width) => width,
            _ => return Err(self.error("expected indentation")),
        };

        let mut block = Block::new();
        while let TokenKind::Indent(width) = self.current().kind {
            if width > base {
                return Err(self.error("unexpected indentation"));
            } else if width < base {
                break;
            }
            block.push(self.parse_instruction(base)?);
        }
        Ok(block)
    }

    /// Parses the block nested under a header line indented at `base`, raising `message` if the
    /// next line is not more indented.
    fn parse_nested_block(&mut self, base: usize, message: &str) -> Result<Block> {
        match self.current().kind {
            TokenKind::Indent(width) if width > base => ensure_sufficient_stack(|| self.parse_block()),
            _ => Err(self.error(message)),
        }
    }

    /// Parses one instruction (a line and its nested blocks) of a block indented at `base`.
    fn parse_instruction(&mut self, base: usize) -> Result<Stmt> {
        self.next(); // eat indentation
        let loc = self.current().loc;

        let kind = match &self.current().kind {
            TokenKind::Identifier(_) if *self.peek(1) == TokenKind::Operator(Operator::Colon) => {
                self.parse_var_declaration()?
            }
            TokenKind::Keyword(Keyword::Def) => self.parse_fn_declaration(base)?,
            TokenKind::Keyword(Keyword::If) => self.parse_if_stmt(base)?,
            TokenKind::Keyword(Keyword::Else) => return Err(self.error("unexpected else")),
            TokenKind::Keyword(Keyword::While) => {
                self.next();
                let condition = self.parse_operand_expr()?;
                let body = self.parse_nested_block(base, "expected while block")?;
                StmtKind::WhileStmt { condition, body }
            }
            TokenKind::Keyword(Keyword::For) => self.parse_for_stmt(base)?,
            TokenKind::Keyword(Keyword::Return) => {
                self.next();
                if self.at_line_end() {
                    self.next();
                    StmtKind::ReturnStmt(None)
                } else {
                    StmtKind::ReturnStmt(Some(self.parse_operand_expr()?))
                }
            }
            TokenKind::Keyword(Keyword::Print) => {
                self.next();
                StmtKind::PrintStmt(self.parse_operand_expr()?)
            }
            TokenKind::Keyword(Keyword::Read) => {
                self.next();
                StmtKind::ReadStmt(self.parse_operand_expr()?)
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect_line_end("expected operator or end of expression")?;
                StmtKind::ExprStmt(expr)
            }
        };

        Ok(Stmt::new(kind, loc))
    }

    /// Parses the expression operand of a keyword statement, up to and including the line feed.
    fn parse_operand_expr(&mut self) -> Result<Expr> {
        if self.at_line_end() {
            return Err(self.error("expected expression"));
        }
        let expr = self.parse_expr()?;
        self.expect_line_end("expected operator or end of expression")?;
        Ok(expr)
    }

    /// Parses `name : type`, `name : type = expr` or `name : = expr`.
    fn parse_var_declaration(&mut self) -> Result<StmtKind> {
        let ident = self.expect_identifier("expected variable name")?;
        self.expect_op(Operator::Colon, "expected colon")?;

        let ty = if self.at_op(Operator::Equals) {
            None
        } else {
            Some(self.parse_type()?)
        };

        let initializer = if self.eat_op(Operator::Equals) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_line_end("expected operator or end of expression")?;

        Ok(StmtKind::VarDeclaration {
            ident,
            ty,
            initializer,
        })
    }

    /// Parses a type name: `boolean`, `number`, `string` or `array<T>`.
    fn parse_type(&mut self) -> Result<Type> {
        let ty = match self.current().kind {
            TokenKind::Keyword(Keyword::Boolean) => Type::Boolean,
            TokenKind::Keyword(Keyword::Number) => Type::Number,
            TokenKind::Keyword(Keyword::String) => Type::String,
            TokenKind::Keyword(Keyword::Array) => {
                self.next();
                self.expect_op(Operator::LessThan, "expected '<' after array")?;
                let element = ensure_sufficient_stack(|| self.parse_type())?;
                self.expect_op(Operator::GreaterThan, "expected '>'")?;
                return Ok(Type::array_of(element));
            }
            _ => return Err(self.error("expected type name")),
        };
        self.next(); // eat type keyword
        Ok(ty)
    }

    /// Parses `def name(p1 : T1, p2 : T2) [: R]` and the body under it.
    fn parse_fn_declaration(&mut self, base: usize) -> Result<StmtKind> {
        self.next(); // eat `def`
        let ident = self.expect_identifier("expected function name")?;
        self.expect_op(Operator::OpenParen, "expected open parenthesis")?;

        let mut params: Vec<Param> = Vec::new();
        if !self.eat_op(Operator::CloseParen) {
            loop {
                let param_loc = self.current().loc;
                let param_ident = self.expect_identifier("expected parameter name")?;
                self.expect_op(Operator::Colon, "expected colon")?;
                let ty = self.parse_type()?;

                if params.iter().any(|param| param.ident == param_ident) {
                    return Err(Error::syntax("duplicate parameter name", param_loc));
                }
                params.push(Param {
                    ident: param_ident,
                    ty,
                });

                if self.eat_op(Operator::CloseParen) {
                    break;
                } else if !self.eat_op(Operator::Comma) {
                    return Err(self.error("expected comma or closing parenthesis"));
                }
            }
        }

        let ret_ty = if self.eat_op(Operator::Colon) {
            self.parse_type()?
        } else {
            Type::None
        };
        self.expect_line_end("expected end of line")?;

        let body = self.parse_nested_block(base, "expected function body")?;
        Ok(StmtKind::FnDeclaration {
            ident,
            params,
            ret_ty,
            body,
        })
    }

    fn parse_if_stmt(&mut self, base: usize) -> Result<StmtKind> {
        self.next(); // eat `if`
        let condition = self.parse_operand_expr()?;
        let then_block = self.parse_nested_block(base, "expected if block")?;

        let else_block = if self.current().kind == TokenKind::Indent(base)
            && *self.peek(1) == TokenKind::Keyword(Keyword::Else)
        {
            self.next(); // eat indentation
            self.next(); // eat `else`
            self.expect_line_end("expected end of line after else")?;
            Some(self.parse_nested_block(base, "expected else block")?)
        } else {
            None
        };

        Ok(StmtKind::IfStmt {
            condition,
            then_block,
            else_block,
        })
    }

    /// Parses `for name : range` and the body under it.
    fn parse_for_stmt(&mut self, base: usize) -> Result<StmtKind> {
        self.next(); // eat `for`
        let ident = self.expect_identifier("expected loop variable name")?;
        self.expect_op(Operator::Colon, "expected colon")?;
        let range = self.parse_operand_expr()?;
        let body = self.parse_nested_block(base, "expected for block")?;
        Ok(StmtKind::ForStmt { ident, range, body })
    }
}
