//! Type checking pass.
//!
//! Walks the tree once with its own [`Store`], checking operand types and the lvalue class of
//! every expression. Faults carry the location of the statement being analyzed.

use beauty_parser::ast::{BinaryOp, Block, Expr, Param, Stmt, StmtKind, UnaryOp};
use beauty_parser::types::Type;
use beauty_source::{ensure_sufficient_stack, Error, Location, Result};
use beauty_value::store::{Function, Store};

/// Whether an expression denotes a storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    Lvalue,
    Rvalue,
}

/// The static type and class of an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Typed {
    pub ty: Type,
    pub class: ValueClass,
}

impl Typed {
    fn rvalue(ty: Type) -> Self {
        Self {
            ty,
            class: ValueClass::Rvalue,
        }
    }

    fn lvalue(ty: Type) -> Self {
        Self {
            ty,
            class: ValueClass::Lvalue,
        }
    }
}

/// Type checking pass.
pub struct Analyzer<'ast> {
    store: Store<'ast>,
    /// Location of the statement being analyzed.
    loc: Option<Location>,
    /// Return type of the function whose body is analyzed. `None` outside of functions.
    ret_ty: Option<&'ast Type>,
}

impl<'ast> Analyzer<'ast> {
    pub fn new() -> Self {
        Self {
            store: Store::new(),
            loc: None,
            ret_ty: None,
        }
    }

    pub fn analyze_program(&mut self, program: &'ast Block) -> Result<()> {
        self.analyze_block(program)?;
        tracing::debug!("semantic analysis passed");
        Ok(())
    }

    fn error(&self, message: impl ToString) -> Error {
        Error::semantic(message, self.loc)
    }

    /// Runs `f` inside a fresh scope level.
    fn with_level<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.store.new_level();
        let result = f(self);
        self.store.delete_level();
        result
    }

    pub fn analyze_block(&mut self, block: &'ast Block) -> Result<()> {
        ensure_sufficient_stack(|| {
            self.with_level(|this| {
                for stmt in block {
                    this.analyze_stmt(stmt)?;
                }
                Ok(())
            })
        })
    }

    fn analyze_stmt(&mut self, stmt: &'ast Stmt) -> Result<()> {
        self.loc = Some(stmt.loc);

        match &stmt.kind {
            StmtKind::VarDeclaration {
                ident,
                ty,
                initializer,
            } => {
                let ty = match (ty, initializer) {
                    (Some(ty), Some(initializer)) => {
                        let source = self.analyze_expr(initializer)?.ty;
                        if !ty.is_assignable_from(&source) {
                            return Err(self.error(format!(
                                "incompatible type for assignment to {}",
                                ident
                            )));
                        }
                        ty.clone()
                    }
                    (Some(ty), None) => ty.clone(),
                    (None, Some(initializer)) => {
                        let source = self.analyze_expr(initializer)?.ty;
                        Type::concretize(&source).ok_or_else(|| {
                            let message = format!("cannot infer the type of {} from {}", ident, source);
                            self.error(message)
                        })?
                    }
                    (None, None) => {
                        return Err(self.error(format!(
                            "{} has neither a type nor an initializer",
                            ident
                        )))
                    }
                };
                self.store
                    .register_variable(ident, ty, None)
                    .map_err(|err| self.error(err))?;
            }
            StmtKind::FnDeclaration {
                ident,
                params,
                ret_ty,
                body,
            } => {
                for (i, param) in params.iter().enumerate() {
                    if params[..i].iter().any(|other| other.ident == param.ident) {
                        return Err(self.error("duplicate parameter name"));
                    }
                }
                self.store
                    .register_function(
                        ident,
                        Function {
                            params,
                            ret_ty,
                            body,
                        },
                    )
                    .map_err(|err| self.error(err))?;

                let (_, scope) = self
                    .store
                    .lookup_function(ident)
                    .map_err(|err| self.error(err))?;
                self.store.new_frame(scope);
                let outer_ret_ty = self.ret_ty.replace(ret_ty);
                let result = self.analyze_fn_body(params, body);
                self.ret_ty = outer_ret_ty;
                self.store.delete_level();
                result?;
            }
            StmtKind::ExprStmt(expr) => {
                self.analyze_expr(expr)?;
            }
            StmtKind::ReturnStmt(value) => {
                let ret_ty = self
                    .ret_ty
                    .ok_or_else(|| self.error("return outside of a function"))?;
                match value {
                    None if *ret_ty == Type::None => {}
                    None => return Err(self.error("non-void function must return a value")),
                    Some(_) if *ret_ty == Type::None => {
                        return Err(self.error("void function cannot return a value"))
                    }
                    Some(value) => {
                        let source = self.analyze_expr(value)?.ty;
                        if !ret_ty.is_assignable_from(&source) {
                            return Err(self.error("incompatible return type"));
                        }
                    }
                }
            }
            StmtKind::PrintStmt(expr) => {
                let typed = self.analyze_expr(expr)?;
                if !typed.ty.is_primitive() {
                    return Err(self.error("invalid operand"));
                }
            }
            StmtKind::ReadStmt(expr) => {
                let typed = self.analyze_expr(expr)?;
                if !typed.ty.is_primitive() {
                    return Err(self.error("invalid operand"));
                } else if typed.class != ValueClass::Lvalue {
                    return Err(self.error("rvalue as operand of read"));
                }
            }
            StmtKind::IfStmt {
                condition,
                then_block,
                else_block,
            } => {
                self.analyze_condition(condition)?;
                self.analyze_block(then_block)?;
                if let Some(else_block) = else_block {
                    self.analyze_block(else_block)?;
                }
            }
            StmtKind::WhileStmt { condition, body } => {
                self.analyze_condition(condition)?;
                self.analyze_block(body)?;
            }
            StmtKind::ForStmt { ident, range, body } => {
                let range = self.analyze_expr(range)?.ty;
                let element = match &range {
                    Type::String => Type::String,
                    Type::Array(element) => element.as_ref().clone(),
                    // an empty list binds nothing usable
                    Type::List(element) => element.as_ref().clone(),
                    _ => return Err(self.error("invalid range")),
                };
                if element == Type::Mixed {
                    return Err(self.error("invalid range"));
                }
                self.with_level(|this| {
                    this.store
                        .register_variable(ident, element, None)
                        .map_err(|err| this.error(err))?;
                    this.analyze_block(body)
                })?;
            }
        }
        Ok(())
    }

    /// Analyzes a function body in the frame seeded with `params`.
    fn analyze_fn_body(&mut self, params: &'ast [Param], body: &'ast Block) -> Result<()> {
        for param in params {
            self.store
                .register_variable(&param.ident, param.ty.clone(), None)
                .map_err(|err| self.error(err))?;
        }
        self.analyze_block(body)
    }

    fn analyze_condition(&mut self, condition: &'ast Expr) -> Result<()> {
        match self.analyze_expr(condition)?.ty {
            Type::Boolean => Ok(()),
            _ => Err(self.error("condition must be boolean")),
        }
    }

    /// Computes the type and class of `expr`.
    pub fn analyze_expr(&mut self, expr: &'ast Expr) -> Result<Typed> {
        ensure_sufficient_stack(|| match expr {
            Expr::BoolLit(_) => Ok(Typed::rvalue(Type::Boolean)),
            Expr::NumberLit(_) => Ok(Typed::rvalue(Type::Number)),
            Expr::StringLit(_) => Ok(Typed::rvalue(Type::String)),
            Expr::ListLit(elements) => {
                let mut types = Vec::with_capacity(elements.len());
                for element in elements {
                    let ty = self.analyze_expr(element)?.ty;
                    if ty == Type::None {
                        return Err(self.error("void function used as a value"));
                    }
                    types.push(ty);
                }
                Ok(Typed::rvalue(Type::of_list_literal(&types)))
            }
            Expr::Identifier(ident) => {
                let variable = self
                    .store
                    .lookup_variable(ident)
                    .map_err(|err| self.error(err))?;
                Ok(Typed::lvalue(variable.ty.clone()))
            }
            Expr::Unary { op, arg } => {
                let arg = self.analyze_expr(arg)?.ty;
                match (op, arg) {
                    (UnaryOp::Plus, Type::Number) | (UnaryOp::Minus, Type::Number) => {
                        Ok(Typed::rvalue(Type::Number))
                    }
                    (UnaryOp::Not, Type::Boolean) => Ok(Typed::rvalue(Type::Boolean)),
                    _ => Err(self.error("invalid operand")),
                }
            }
            Expr::Binary { lhs, op, rhs } => self.analyze_binary(lhs, *op, rhs),
            Expr::FnCall { ident, args } => {
                let (function, _) = self
                    .store
                    .lookup_function(ident)
                    .map_err(|err| self.error(err))?;
                if args.len() != function.params.len() {
                    return Err(self.error("wrong number of arguments"));
                }
                for (arg, param) in args.iter().zip(function.params) {
                    let source = self.analyze_expr(arg)?.ty;
                    if !param.ty.is_assignable_from(&source) {
                        return Err(self.error(format!(
                            "incompatible type for argument {} of {}",
                            param.ident, ident
                        )));
                    }
                }
                Ok(Typed::rvalue(function.ret_ty.clone()))
            }
        })
    }

    fn analyze_binary(&mut self, lhs: &'ast Expr, op: BinaryOp, rhs: &'ast Expr) -> Result<Typed> {
        let left = self.analyze_expr(lhs)?;
        let right = self.analyze_expr(rhs)?;

        if op.is_assignment() {
            if left.class != ValueClass::Lvalue {
                return Err(self.error("rvalue as left hand side operand of an assignment"));
            }
            let assignable = match op.compound_base() {
                None => left.ty.is_assignable_from(&right.ty),
                Some(base) => binary_result(base, &left.ty, &right.ty).as_ref() == Some(&left.ty),
            };
            if !assignable {
                return Err(self.error(format!(
                    "incompatible type for assignment to {}",
                    target_name(lhs)
                )));
            }
            return Ok(Typed::lvalue(left.ty));
        }

        if op == BinaryOp::Index {
            let element = match (&left.ty, &right.ty) {
                // characters of a string are not addressable
                (Type::String, Type::Number) => return Ok(Typed::rvalue(Type::String)),
                (Type::Array(element), Type::Number) => element.as_ref().clone(),
                (Type::List(element), Type::Number)
                    if **element != Type::None && **element != Type::Mixed =>
                {
                    element.as_ref().clone()
                }
                _ => return Err(self.error("invalid operands")),
            };
            return Ok(Typed {
                ty: element,
                class: left.class,
            });
        }

        binary_result(op, &left.ty, &right.ty)
            .map(Typed::rvalue)
            .ok_or_else(|| self.error("invalid operands"))
    }
}

impl<'ast> Default for Analyzer<'ast> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result type of a non-assignment, non-index binary operator.
fn binary_result(op: BinaryOp, lhs: &Type, rhs: &Type) -> Option<Type> {
    use BinaryOp::*;

    let ty = match (op, lhs, rhs) {
        (Add, Type::Number, Type::Number) => Type::Number,
        (Add, Type::String, Type::String) => Type::String,
        (Subtract | Multiply | Divide | Remainder, Type::Number, Type::Number) => Type::Number,
        (And | Or, Type::Boolean, Type::Boolean) => Type::Boolean,
        (Equal | Different, lhs, rhs) if lhs == rhs && lhs.is_primitive() => Type::Boolean,
        (Less | Greater | LessEqual | GreaterEqual, Type::Number, Type::Number)
        | (Less | Greater | LessEqual | GreaterEqual, Type::String, Type::String) => Type::Boolean,
        _ => return None,
    };
    Some(ty)
}

/// Name of the variable an assignment target expression refers to.
fn target_name(expr: &Expr) -> &str {
    match expr {
        Expr::Identifier(ident) => ident,
        Expr::Binary { lhs, .. } => target_name(lhs),
        _ => "expression",
    }
}

/// Checks `program` with a fresh [`Analyzer`].
pub fn analyze(program: &Block) -> Result<()> {
    Analyzer::new().analyze_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beauty_parser::parser::parse_source;

    fn check(source: &str) -> Result<()> {
        let program = parse_source(source).unwrap();
        analyze(&program)
    }

    #[track_caller]
    fn assert_error(source: &str, message: &str, line: usize) {
        let err = check(source).unwrap_err();
        assert_eq!(err.message(), message);
        assert_eq!(err.location().map(|loc| loc.line), Some(line));
        assert!(matches!(err, Error::Semantic { .. }));
    }

    #[test]
    fn test_valid_programs() {
        check("x : number = 2\nx = x + 3\nprint x\n").unwrap();
        check("a : array<number> = [1, 2, 3]\nprint a[-1]\n").unwrap();
        check("def f(n : number) : number\n  return n * 2\nprint f(21)\n").unwrap();
        check("for c : \"ab\"\n  print c\n").unwrap();
        check("s : = 'abc'\ns += s[0]\nread s\n").unwrap();
        check("grid : array<array<number>> = [[], [1]]\ngrid[0] = [2, 3]\ngrid[1][0] -= 1\n")
            .unwrap();
        check("for x : []\n  print 1\n").unwrap();
        check("b : boolean\nb |= 1 < 2 & 'a' != 'b'\n").unwrap();
    }

    #[test]
    fn test_declarations() {
        assert_error(
            "x : number = 'a'",
            "incompatible type for assignment to x",
            1,
        );
        assert_error("x : = []", "cannot infer the type of x from list<none>", 1);
        assert_error(
            "x : = [1, 'a']",
            "cannot infer the type of x from list<mixed>",
            1,
        );
        assert_error(
            "x : number\nx : string\n",
            "x is already defined in this context",
            2,
        );
        // shadowing in an inner block is allowed
        check("x : number\nif true\n  x : string\n").unwrap();
    }

    #[test]
    fn test_scoping() {
        assert_error(
            "if true\n  y : number = 1\nprint y\n",
            "y is undefined in this context",
            3,
        );
        assert_error(
            "def f()\n  return\nf = 1\n",
            "f is not a variable",
            3,
        );
        assert_error("x : number\nx()\n", "x is not a function", 2);
    }

    #[test]
    fn test_operators() {
        assert_error("print -'a'", "invalid operand", 1);
        assert_error("print !1", "invalid operand", 1);
        assert_error("print 1 + 'a'", "invalid operands", 1);
        assert_error("print 'a' - 'b'", "invalid operands", 1);
        assert_error("print true < false", "invalid operands", 1);
        assert_error("print 1 & true", "invalid operands", 1);
        assert_error("print 'abc'['x']", "invalid operands", 1);
        check("print 'a' < 'b'\nprint 'a' + 'b'\nprint 1 == 2\n").unwrap();
    }

    #[test]
    fn test_lvalue_class() {
        assert_error(
            "1 = 2",
            "rvalue as left hand side operand of an assignment",
            1,
        );
        assert_error(
            "s : string\ns[0] = 'a'\n",
            "rvalue as left hand side operand of an assignment",
            2,
        );
        assert_error(
            "x : number\n(x + 1) = 2\n",
            "rvalue as left hand side operand of an assignment",
            2,
        );
        assert_error("read 1", "rvalue as operand of read", 1);
        assert_error("s : string\nread s[0]\n", "rvalue as operand of read", 2);
        // assignments yield lvalues
        check("x : number\ny : number\n(x = y) = 3\n").unwrap();
        check("a : array<number> = [1]\na[0] += 1\nread a[0]\n").unwrap();
    }

    #[test]
    fn test_control_flow() {
        assert_error("if 1\n  print 1\n", "condition must be boolean", 1);
        assert_error("while 'a'\n  print 1\n", "condition must be boolean", 1);
        assert_error("for i : 3\n  print i\n", "invalid range", 1);
        assert_error("for i : [1, 'a']\n  print i\n", "invalid range", 1);
        assert_error("for i : [1, 2]\n  i = 'a'\n", "incompatible type for assignment to i", 2);
        assert_error("print [1]", "invalid operand", 1);
    }

    #[test]
    fn test_functions() {
        assert_error("return", "return outside of a function", 1);
        assert_error(
            "def f() : number\n  return\n",
            "non-void function must return a value",
            2,
        );
        assert_error(
            "def f()\n  return 1\n",
            "void function cannot return a value",
            2,
        );
        assert_error(
            "def f() : number\n  return 'a'\n",
            "incompatible return type",
            2,
        );
        assert_error(
            "def f(a : number)\n  return\nf(1, 2)\n",
            "wrong number of arguments",
            3,
        );
        assert_error(
            "def f(a : number)\n  return\nf('a')\n",
            "incompatible type for argument a of f",
            3,
        );
        assert_error(
            "def f()\n  return\nx : = f()\n",
            "cannot infer the type of x from none",
            3,
        );
        assert_error("def f()\n  return\nprint [f()]\n", "void function used as a value", 3);
        assert_error(
            "def f()\n  return\nprint f() + 1\n",
            "invalid operands",
            3,
        );
        // recursion and array parameters
        check("def fact(n : number) : number\n  if n < 2\n    return 1\n  return n * fact(n - 1)\nprint fact(5)\n")
            .unwrap();
        check("def sum(a : array<number>) : number\n  s : number\n  for x : a\n    s += x\n  return s\nprint sum([1, 2])\n")
            .unwrap();
    }

    #[test]
    fn test_function_scope() {
        // the body sees names declared before the function, not the locals of its callers
        check("x : number = 1\ndef f() : number\n  return x\nprint f()\n").unwrap();
        assert_error(
            "def f() : number\n  return x\nx : number = 1\n",
            "x is undefined in this context",
            2,
        );
    }
}
