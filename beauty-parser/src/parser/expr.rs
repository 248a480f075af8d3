use super::*;

/// Assignment operators, right-associative.
const ASSIGNMENT_OPS: &[(Operator, BinaryOp)] = &[
    (Operator::Equals, BinaryOp::Assign),
    (Operator::PlusEquals, BinaryOp::AddAssign),
    (Operator::MinusEquals, BinaryOp::SubtractAssign),
    (Operator::AsteriskEquals, BinaryOp::MultiplyAssign),
    (Operator::SlashEquals, BinaryOp::DivideAssign),
    (Operator::PercentEquals, BinaryOp::RemainderAssign),
    (Operator::AndEquals, BinaryOp::AndAssign),
    (Operator::OrEquals, BinaryOp::OrAssign),
];

const PREDICATE_OPS: &[(Operator, BinaryOp)] = &[
    (Operator::EqualsEquals, BinaryOp::Equal),
    (Operator::LessThan, BinaryOp::Less),
    (Operator::GreaterThan, BinaryOp::Greater),
    (Operator::LessThanEquals, BinaryOp::LessEqual),
    (Operator::GreaterThanEquals, BinaryOp::GreaterEqual),
    (Operator::NotEquals, BinaryOp::Different),
];

const ADDITIVE_OPS: &[(Operator, BinaryOp)] = &[
    (Operator::Plus, BinaryOp::Add),
    (Operator::Minus, BinaryOp::Subtract),
];

const MULTIPLICATIVE_OPS: &[(Operator, BinaryOp)] = &[
    (Operator::Asterisk, BinaryOp::Multiply),
    (Operator::Slash, BinaryOp::Divide),
    (Operator::Percent, BinaryOp::Remainder),
];

const UNARY_OPS: &[(Operator, UnaryOp)] = &[
    (Operator::Plus, UnaryOp::Plus),
    (Operator::Minus, UnaryOp::Minus),
    (Operator::Not, UnaryOp::Not),
];

/// Looks up the current token in the table of one precedence level.
fn lookup<T: Copy>(table: &[(Operator, T)], token: &Token) -> Option<T> {
    match token.kind {
        TokenKind::Operator(op) => table
            .iter()
            .find(|(candidate, _)| *candidate == op)
            .map(|(_, node)| *node),
        _ => None,
    }
}

impl<'a> Parser<'a> {
    /* Expressions */
    /// Parses any expression.
    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_assignment_level()
    }

    fn parse_assignment_level(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| {
            let lhs = self.parse_or_level()?;
            match lookup(ASSIGNMENT_OPS, self.current()) {
                Some(op) => {
                    self.next();
                    let rhs = self.parse_assignment_level()?;
                    Ok(Expr::Binary {
                        lhs: Box::new(lhs),
                        op,
                        rhs: Box::new(rhs),
                    })
                }
                None => Ok(lhs),
            }
        })
    }

    /// Parses one left-associative level: `next (op next)*`.
    fn parse_left_assoc(
        &mut self,
        table: &[(Operator, BinaryOp)],
        next_level: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut lhs = next_level(self)?;
        while let Some(op) = lookup(table, self.current()) {
            self.next();
            let rhs = next_level(self)?;
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_or_level(&mut self) -> Result<Expr> {
        self.parse_left_assoc(&[(Operator::Or, BinaryOp::Or)], Self::parse_and_level)
    }

    fn parse_and_level(&mut self) -> Result<Expr> {
        self.parse_left_assoc(&[(Operator::And, BinaryOp::And)], Self::parse_predicate_level)
    }

    fn parse_predicate_level(&mut self) -> Result<Expr> {
        self.parse_left_assoc(PREDICATE_OPS, Self::parse_additive_level)
    }

    fn parse_additive_level(&mut self) -> Result<Expr> {
        self.parse_left_assoc(ADDITIVE_OPS, Self::parse_multiplicative_level)
    }

    fn parse_multiplicative_level(&mut self) -> Result<Expr> {
        self.parse_left_assoc(MULTIPLICATIVE_OPS, Self::parse_unary_level)
    }

    fn parse_unary_level(&mut self) -> Result<Expr> {
        match lookup(UNARY_OPS, self.current()) {
            Some(op) => {
                self.next();
                let arg = ensure_sufficient_stack(|| self.parse_unary_level())?;
                Ok(Expr::Unary {
                    op,
                    arg: Box::new(arg),
                })
            }
            None => self.parse_index_level(),
        }
    }

    /// Parses an operand followed by any number of `[index]` suffixes.
    fn parse_index_level(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_operand()?;
        while self.eat_op(Operator::OpenSquare) {
            let index = self.parse_expr()?;
            self.expect_op(Operator::CloseSquare, "expected closing square bracket")?;
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op: BinaryOp::Index,
                rhs: Box::new(index),
            };
        }
        Ok(lhs)
    }

    /// Parses a primary (atom) expression.
    fn parse_operand(&mut self) -> Result<Expr> {
        let expr = match &self.current().kind {
            TokenKind::Boolean(val) => Expr::BoolLit(*val),
            TokenKind::Number(val) => Expr::NumberLit(*val),
            TokenKind::String(val) => Expr::StringLit(val.clone()),
            TokenKind::Identifier(_) => return self.parse_identifier_or_call_expr(),
            TokenKind::Operator(Operator::OpenParen) => {
                self.next();
                let expr = self.parse_expr()?;
                self.expect_op(
                    Operator::CloseParen,
                    "expected binary operator or closing parenthesis",
                )?;
                return Ok(expr);
            }
            TokenKind::Operator(Operator::OpenSquare) => return self.parse_list_expr(),
            _ => {
                return Err(self.error("expected open parenthesis, unary operator or operand"));
            }
        };
        self.next(); // eat parsed literal
        Ok(expr)
    }

    /* Expressions.Identifier */
    /// Parses an identifier or a call expression.
    fn parse_identifier_or_call_expr(&mut self) -> Result<Expr> {
        let ident = self.expect_identifier("expected identifier")?;

        if self.eat_op(Operator::OpenParen) {
            let args = self.parse_expr_list(Operator::CloseParen, "expected comma or closing parenthesis")?;
            Ok(Expr::FnCall { ident, args })
        } else {
            Ok(Expr::Identifier(ident))
        }
    }

    /// Parses a list literal (`[a, b, c]`).
    fn parse_list_expr(&mut self) -> Result<Expr> {
        self.expect_op(Operator::OpenSquare, "expected open square bracket")?;
        let elements = self.parse_expr_list(
            Operator::CloseSquare,
            "expected comma or closing square bracket",
        )?;
        Ok(Expr::ListLit(elements))
    }

    /// Parses comma separated expressions up to and including `close`.
    fn parse_expr_list(&mut self, close: Operator, message: &str) -> Result<Vec<Expr>> {
        let mut exprs = Vec::new();
        if self.eat_op(close) {
            return Ok(exprs);
        }
        loop {
            exprs.push(self.parse_expr()?);

            if self.eat_op(close) {
                break;
            } else if !self.eat_op(Operator::Comma) {
                return Err(self.error(message));
            }
        }
        Ok(exprs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beauty_source::Location;
    use insta::assert_debug_snapshot;

    fn expr(source: &str) -> Expr {
        let tokens = tokenize(source).unwrap();
        let mut parser = Parser::new(&tokens);
        parser.next(); // skip indentation
        let expr = parser.parse_expr().unwrap();
        assert_eq!(parser.current().kind, TokenKind::LineFeed);
        expr
    }

    fn error(source: &str) -> Error {
        let tokens = tokenize(source).unwrap();
        let mut parser = Parser::new(&tokens);
        parser.next();
        parser.parse_expr().unwrap_err()
    }

    fn num(val: f64) -> Box<Expr> {
        Box::new(Expr::NumberLit(val))
    }

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Identifier(name.to_string()))
    }

    #[test]
    fn test_literal() {
        assert_eq!(expr("true"), Expr::BoolLit(true));
        assert_eq!(expr("2.5"), Expr::NumberLit(2.5));
        assert_eq!(expr("'hi'"), Expr::StringLit("hi".to_string()));
        assert_eq!(expr("[]"), Expr::ListLit(vec![]));
    }

    #[test]
    fn test_binary_expr() {
        assert_debug_snapshot!("binary-precedence", expr("1 + 2 * 3"));
        assert_debug_snapshot!("assignment-associativity", expr("a = b += c"));
        // should be (1 - 2) - 3
        assert_eq!(
            expr("1 - 2 - 3"),
            Expr::Binary {
                lhs: Box::new(Expr::Binary {
                    lhs: num(1.0),
                    op: BinaryOp::Subtract,
                    rhs: num(2.0),
                }),
                op: BinaryOp::Subtract,
                rhs: num(3.0),
            }
        );
    }

    #[test]
    fn test_logical_levels() {
        // `&` binds tighter than `|`, predicates tighter than `&`
        assert_eq!(
            expr("a | b & c == d"),
            Expr::Binary {
                lhs: ident("a"),
                op: BinaryOp::Or,
                rhs: Box::new(Expr::Binary {
                    lhs: ident("b"),
                    op: BinaryOp::And,
                    rhs: Box::new(Expr::Binary {
                        lhs: ident("c"),
                        op: BinaryOp::Equal,
                        rhs: ident("d"),
                    }),
                }),
            }
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            expr("- -x"),
            Expr::Unary {
                op: UnaryOp::Minus,
                arg: Box::new(Expr::Unary {
                    op: UnaryOp::Minus,
                    arg: ident("x"),
                }),
            }
        );
        // unary binds looser than indexing
        assert_eq!(
            expr("!a[0]"),
            Expr::Unary {
                op: UnaryOp::Not,
                arg: Box::new(Expr::Binary {
                    lhs: ident("a"),
                    op: BinaryOp::Index,
                    rhs: num(0.0),
                }),
            }
        );
    }

    #[test]
    fn test_index() {
        assert_debug_snapshot!("index-chain", expr("a[0][i + 1]"));
    }

    #[test]
    fn test_parenthesized() {
        assert_eq!(
            expr("(1 + 2) * 3"),
            Expr::Binary {
                lhs: Box::new(Expr::Binary {
                    lhs: num(1.0),
                    op: BinaryOp::Add,
                    rhs: num(2.0),
                }),
                op: BinaryOp::Multiply,
                rhs: num(3.0),
            }
        );
    }

    #[test]
    fn test_fn_call() {
        assert_eq!(
            expr("foo()"),
            Expr::FnCall {
                ident: "foo".to_string(),
                args: vec![],
            }
        );
        assert_debug_snapshot!("fn-call-with-args", expr("foo(1, [bar], baz())"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            error("1 + )"),
            Error::syntax(
                "expected open parenthesis, unary operator or operand",
                Location::new(1, 5)
            )
        );
        assert_eq!(
            error("(1 + 2"),
            Error::syntax(
                "expected binary operator or closing parenthesis",
                Location::new(1, 7)
            )
        );
        assert_eq!(
            error("a[1"),
            Error::syntax("expected closing square bracket", Location::new(1, 4))
        );
        assert_eq!(
            error("f(1 2)"),
            Error::syntax("expected comma or closing parenthesis", Location::new(1, 5))
        );
    }
}
