use std::cmp::Ordering;
use std::collections::VecDeque;
use std::io::{BufRead, Write};

use beauty_parser::ast::{BinaryOp, Block, Expr, Stmt, StmtKind, UnaryOp};
use beauty_parser::types::Type;
use beauty_source::{ensure_sufficient_stack, Error, Location, Result};
use beauty_value::store::{Function, Store, StoreError};
use beauty_value::{Lvalue, Rvalue};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Calls nested deeper than this raise a runtime error.
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// How control leaves a statement.
#[derive(Debug, Clone, PartialEq)]
enum Signal {
    Continue,
    /// A `return` was executed. Skips the rest of every block up to the call boundary.
    Return(Option<Rvalue>),
}

/// An evaluated expression.
#[derive(Debug, Clone, PartialEq)]
enum Evaluated {
    Lvalue(Lvalue),
    Rvalue(Rvalue),
}

/// Tree walking interpreter.
pub struct Vm<'ast, R, W> {
    store: Store<'ast>,
    config: VmConfig,
    input: R,
    output: W,
    call_depth: usize,
    /// Location of the statement being executed.
    loc: Option<Location>,
    /// Tokens of the last input line not consumed by `read` yet.
    pending_input: VecDeque<String>,
}

impl<'ast, R: BufRead, W: Write> Vm<'ast, R, W> {
    pub fn new(config: VmConfig, input: R, output: W) -> Self {
        Self {
            store: Store::new(),
            config,
            input,
            output,
            call_depth: 0,
            loc: None,
            pending_input: VecDeque::new(),
        }
    }

    /// Executes `program`, the top level block.
    pub fn run(&mut self, program: &'ast Block) -> Result<()> {
        tracing::debug!(max_call_depth = self.config.max_call_depth, "running program");
        let result = self.execute_block(program).map(|_| ());
        // output printed before a fault is kept
        let flushed = self
            .output
            .flush()
            .map_err(|err| self.error(format!("failed to write output: {}", err)));
        result.and(flushed)
    }

    fn error(&self, message: impl ToString) -> Error {
        Error::runtime(message, self.loc)
    }

    fn store_error(&self, err: StoreError) -> Error {
        self.error(err)
    }

    fn execute_block(&mut self, block: &'ast Block) -> Result<Signal> {
        ensure_sufficient_stack(|| {
            self.store.new_level();
            let result = self.execute_stmts(block);
            self.store.delete_level();
            result
        })
    }

    fn execute_stmts(&mut self, stmts: &'ast [Stmt]) -> Result<Signal> {
        for stmt in stmts {
            if let Signal::Return(value) = self.execute_stmt(stmt)? {
                return Ok(Signal::Return(value));
            }
        }
        Ok(Signal::Continue)
    }

    fn execute_stmt(&mut self, stmt: &'ast Stmt) -> Result<Signal> {
        self.loc = Some(stmt.loc);

        match &stmt.kind {
            StmtKind::VarDeclaration {
                ident,
                ty,
                initializer,
            } => {
                let value = match initializer {
                    Some(initializer) => Some(self.evaluate_rvalue(initializer)?),
                    None => None,
                };
                let ty = match (ty, &value) {
                    (Some(ty), _) => ty.clone(),
                    (None, Some(value)) => Type::concretize(&value.ty()).ok_or_else(|| {
                        self.error(format!("cannot infer the type of {}", ident))
                    })?,
                    (None, None) => {
                        return Err(self.error(format!(
                            "{} has neither a type nor an initializer",
                            ident
                        )))
                    }
                };
                let value = match value {
                    Some(value) => value.coerce(&ty),
                    None => Rvalue::default_for(&ty),
                }
                .ok_or_else(|| {
                    self.store_error(StoreError::IncompatibleType(ident.clone()))
                })?;
                self.store
                    .register_variable(ident, ty, Some(value))
                    .map_err(|err| self.store_error(err))?;
            }
            StmtKind::FnDeclaration {
                ident,
                params,
                ret_ty,
                body,
            } => {
                self.store
                    .register_function(
                        ident,
                        Function {
                            params,
                            ret_ty,
                            body,
                        },
                    )
                    .map_err(|err| self.store_error(err))?;
            }
            StmtKind::ExprStmt(Expr::FnCall { ident, args }) => {
                self.call(ident, args)?;
            }
            StmtKind::ExprStmt(expr) => {
                self.evaluate(expr)?;
            }
            StmtKind::ReturnStmt(value) => {
                let value = match value {
                    Some(value) => Some(self.evaluate_rvalue(value)?),
                    None => None,
                };
                return Ok(Signal::Return(value));
            }
            StmtKind::PrintStmt(expr) => {
                let value = self.evaluate_rvalue(expr)?;
                writeln!(self.output, "{}", value)
                    .map_err(|err| self.error(format!("failed to write output: {}", err)))?;
            }
            StmtKind::ReadStmt(expr) => {
                let target = self.evaluate_lvalue(expr)?;
                let ty = self
                    .store
                    .load(&target)
                    .map_err(|err| self.store_error(err))?
                    .ty();
                let token = self.read_token()?;
                let value = self.parse_input(&token, &ty)?;
                self.store
                    .store(&target, value)
                    .map_err(|err| self.store_error(err))?;
            }
            StmtKind::IfStmt {
                condition,
                then_block,
                else_block,
            } => {
                if self.evaluate_condition(condition)? {
                    return self.execute_block(then_block);
                } else if let Some(else_block) = else_block {
                    return self.execute_block(else_block);
                }
            }
            StmtKind::WhileStmt { condition, body } => {
                loop {
                    self.loc = Some(stmt.loc);
                    if !self.evaluate_condition(condition)? {
                        break;
                    }
                    if let Signal::Return(value) = self.execute_block(body)? {
                        return Ok(Signal::Return(value));
                    }
                }
            }
            StmtKind::ForStmt { ident, range, body } => {
                let (element, items) = match self.evaluate_rvalue(range)? {
                    Rvalue::String(string) => (
                        Type::String,
                        string
                            .chars()
                            .map(|c| Rvalue::String(c.to_string()))
                            .collect(),
                    ),
                    Rvalue::Array(array) => (array.element, array.items),
                    _ => return Err(self.error("invalid range")),
                };

                for item in items {
                    self.store.new_level();
                    let signal = self
                        .store
                        .register_variable(ident, element.clone(), Some(item))
                        .map_err(|err| self.store_error(err))
                        .and_then(|()| self.execute_block(body));
                    self.store.delete_level();
                    if let Signal::Return(value) = signal? {
                        return Ok(Signal::Return(value));
                    }
                }
            }
        }
        Ok(Signal::Continue)
    }

    /* Expressions */
    fn evaluate(&mut self, expr: &'ast Expr) -> Result<Evaluated> {
        ensure_sufficient_stack(|| {
            let value = match expr {
                Expr::BoolLit(val) => Rvalue::Boolean(*val),
                Expr::NumberLit(val) => Rvalue::Number(*val),
                Expr::StringLit(val) => Rvalue::String(val.clone()),
                Expr::ListLit(elements) => {
                    let mut items = Vec::with_capacity(elements.len());
                    for element in elements {
                        items.push(self.evaluate_rvalue(element)?);
                    }
                    Rvalue::list(items)
                }
                Expr::Identifier(ident) => {
                    let lvalue = self
                        .store
                        .resolve(ident)
                        .map_err(|err| self.store_error(err))?;
                    return Ok(Evaluated::Lvalue(lvalue));
                }
                Expr::Unary { op, arg } => {
                    let arg = self.evaluate_rvalue(arg)?;
                    match (op, arg) {
                        (UnaryOp::Plus, Rvalue::Number(val)) => Rvalue::Number(val),
                        (UnaryOp::Minus, Rvalue::Number(val)) => Rvalue::Number(-val),
                        (UnaryOp::Not, Rvalue::Boolean(val)) => Rvalue::Boolean(!val),
                        _ => return Err(self.error("invalid operand")),
                    }
                }
                Expr::Binary { lhs, op, rhs } => return self.evaluate_binary(lhs, *op, rhs),
                Expr::FnCall { ident, args } => self
                    .call(ident, args)?
                    .ok_or_else(|| self.error("void function used as a value"))?,
            };
            Ok(Evaluated::Rvalue(value))
        })
    }

    fn evaluate_rvalue(&mut self, expr: &'ast Expr) -> Result<Rvalue> {
        match self.evaluate(expr)? {
            Evaluated::Lvalue(lvalue) => self
                .store
                .load(&lvalue)
                .map(Rvalue::clone)
                .map_err(|err| self.store_error(err)),
            Evaluated::Rvalue(value) => Ok(value),
        }
    }

    fn evaluate_lvalue(&mut self, expr: &'ast Expr) -> Result<Lvalue> {
        match self.evaluate(expr)? {
            Evaluated::Lvalue(lvalue) => Ok(lvalue),
            Evaluated::Rvalue(_) => {
                Err(self.error("rvalue as left hand side operand of an assignment"))
            }
        }
    }

    fn evaluate_condition(&mut self, condition: &'ast Expr) -> Result<bool> {
        self.evaluate_rvalue(condition)?
            .as_boolean()
            .ok_or_else(|| self.error("condition must be boolean"))
    }

    fn evaluate_binary(
        &mut self,
        lhs: &'ast Expr,
        op: BinaryOp,
        rhs: &'ast Expr,
    ) -> Result<Evaluated> {
        if op.is_assignment() {
            let target = self.evaluate_lvalue(lhs)?;
            let value = self.evaluate_rvalue(rhs)?;
            let value = match op.compound_base() {
                Some(base) => {
                    let current = self
                        .store
                        .load(&target)
                        .map_err(|err| self.store_error(err))?
                        .clone();
                    self.apply_binary(base, current, value)?
                }
                None => value,
            };
            self.store
                .store(&target, value)
                .map_err(|err| self.store_error(err))?;
            return Ok(Evaluated::Lvalue(target));
        }

        if op == BinaryOp::Index {
            let container = self.evaluate(lhs)?;
            let index = self
                .evaluate_rvalue(rhs)?
                .as_number()
                .ok_or_else(|| self.error("invalid operands"))?;
            return self.index(container, index);
        }

        let lhs = self.evaluate_rvalue(lhs)?;
        let rhs = self.evaluate_rvalue(rhs)?;
        self.apply_binary(op, lhs, rhs).map(Evaluated::Rvalue)
    }

    fn apply_binary(&self, op: BinaryOp, lhs: Rvalue, rhs: Rvalue) -> Result<Rvalue> {
        use BinaryOp::*;
        use Rvalue::{Boolean, Number};

        let value = match (op, lhs, rhs) {
            (Add, Number(a), Number(b)) => Number(a + b),
            (Add, Rvalue::String(a), Rvalue::String(b)) => Rvalue::String(a + &b),
            (Subtract, Number(a), Number(b)) => Number(a - b),
            (Multiply, Number(a), Number(b)) => Number(a * b),
            (Divide, Number(_), Number(b)) if b == 0.0 => return Err(self.error("division by 0")),
            (Divide, Number(a), Number(b)) => Number(a / b),
            (Remainder, Number(_), Number(b)) if b == 0.0 => return Err(self.error("modulo by 0")),
            (Remainder, Number(a), Number(b)) => Number(a - (a / b).floor() * b),
            (And, Boolean(a), Boolean(b)) => Boolean(a && b),
            (Or, Boolean(a), Boolean(b)) => Boolean(a || b),
            (Equal, lhs, rhs) => Boolean(lhs == rhs),
            (Different, lhs, rhs) => Boolean(lhs != rhs),
            (Less | Greater | LessEqual | GreaterEqual, lhs, rhs) => {
                let ordering = match (&lhs, &rhs) {
                    (Number(a), Number(b)) => a.partial_cmp(b),
                    (Rvalue::String(a), Rvalue::String(b)) => Some(a.cmp(b)),
                    _ => return Err(self.error("invalid operands")),
                };
                Boolean(match op {
                    Less => ordering == Some(Ordering::Less),
                    Greater => ordering == Some(Ordering::Greater),
                    LessEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                    _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                })
            }
            _ => return Err(self.error("invalid operands")),
        };
        Ok(value)
    }

    /// Converts `index` into a position in a sequence of `len` elements.
    /// Negative indices count from the end.
    fn position(&self, index: f64, len: usize, out_of_bounds: &str) -> Result<usize> {
        if index.fract() != 0.0 {
            return Err(self.error("non-integer number used as index"));
        }
        let index = if index < 0.0 { index + len as f64 } else { index };
        if index < 0.0 || index >= len as f64 {
            return Err(self.error(out_of_bounds));
        }
        Ok(index as usize)
    }

    fn index(&self, container: Evaluated, index: f64) -> Result<Evaluated> {
        const STRING_OUT_OF_BOUNDS: &str = "string index out of bounds";
        const ARRAY_OUT_OF_BOUNDS: &str = "array index out of bounds";

        match container {
            Evaluated::Lvalue(lvalue) => {
                let value = self.store.load(&lvalue).map_err(|err| self.store_error(err))?;
                match value {
                    Rvalue::String(string) => {
                        let len = string.chars().count();
                        let position = self.position(index, len, STRING_OUT_OF_BOUNDS)?;
                        Ok(Evaluated::Rvalue(char_at(string, position)))
                    }
                    Rvalue::Array(array) => {
                        let len = array.items.len();
                        let position = self.position(index, len, ARRAY_OUT_OF_BOUNDS)?;
                        Ok(Evaluated::Lvalue(lvalue.index(position)))
                    }
                    _ => Err(self.error("invalid operands")),
                }
            }
            Evaluated::Rvalue(Rvalue::String(string)) => {
                let len = string.chars().count();
                let position = self.position(index, len, STRING_OUT_OF_BOUNDS)?;
                Ok(Evaluated::Rvalue(char_at(&string, position)))
            }
            Evaluated::Rvalue(Rvalue::Array(mut array)) => {
                let position = self.position(index, array.items.len(), ARRAY_OUT_OF_BOUNDS)?;
                Ok(Evaluated::Rvalue(array.items.swap_remove(position)))
            }
            Evaluated::Rvalue(_) => Err(self.error("invalid operands")),
        }
    }

    /* Calls */
    /// Calls function `ident`. Returns `None` for void functions.
    fn call(&mut self, ident: &str, args: &'ast [Expr]) -> Result<Option<Rvalue>> {
        let (function, scope) = self
            .store
            .lookup_function(ident)
            .map_err(|err| self.store_error(err))?;
        if args.len() != function.params.len() {
            return Err(self.error("wrong number of arguments"));
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate_rvalue(arg)?);
        }

        if self.call_depth >= self.config.max_call_depth {
            return Err(self.error(format!(
                "maximum call depth of {} exceeded",
                self.config.max_call_depth
            )));
        }

        let call_loc = self.loc;
        self.call_depth += 1;
        tracing::trace!(function = ident, depth = self.call_depth, "call");
        self.store.new_frame(scope);
        let result = self.execute_call(ident, function, values);
        self.store.delete_level();
        self.call_depth -= 1;
        self.loc = call_loc;

        let returned = result?;
        tracing::trace!(function = ident, "return");
        match returned {
            None if *function.ret_ty != Type::None => Err(self.error(
                "non-void function finished execution without returning any value",
            )),
            None => Ok(None),
            Some(value) => value
                .coerce(function.ret_ty)
                .map(Some)
                .ok_or_else(|| self.error("incompatible return type")),
        }
    }

    /// Binds the arguments in the current frame and runs the body.
    fn execute_call(
        &mut self,
        ident: &str,
        function: Function<'ast>,
        values: Vec<Rvalue>,
    ) -> Result<Option<Rvalue>> {
        for (param, value) in function.params.iter().zip(values) {
            let value = value.coerce(&param.ty).ok_or_else(|| {
                self.error(format!(
                    "incompatible type for argument {} of {}",
                    param.ident, ident
                ))
            })?;
            self.store
                .register_variable(&param.ident, param.ty.clone(), Some(value))
                .map_err(|err| self.store_error(err))?;
        }
        match self.execute_block(function.body)? {
            Signal::Return(value) => Ok(value),
            Signal::Continue => Ok(None),
        }
    }

    /* Input */
    /// Returns the next whitespace delimited token of the input.
    fn read_token(&mut self) -> Result<String> {
        loop {
            if let Some(token) = self.pending_input.pop_front() {
                return Ok(token);
            }
            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .map_err(|err| self.error(format!("failed to read input: {}", err)))?;
            if read == 0 {
                return Err(self.error("unexpected end of input"));
            }
            self.pending_input
                .extend(line.split_whitespace().map(str::to_string));
        }
    }

    fn parse_input(&self, token: &str, ty: &Type) -> Result<Rvalue> {
        match ty {
            Type::Boolean => match token {
                "true" | "TRUE" | "1" | "t" | "T" => Ok(Rvalue::Boolean(true)),
                "false" | "FALSE" | "0" | "f" | "F" => Ok(Rvalue::Boolean(false)),
                _ => Err(self.error("invalid input for boolean type")),
            },
            Type::Number => token
                .parse()
                .map(Rvalue::Number)
                .map_err(|_| self.error("invalid input for number type")),
            Type::String => Ok(Rvalue::String(token.to_string())),
            _ => Err(self.error("invalid operand")),
        }
    }
}

/// The character at char position `position` as a one character string.
fn char_at(string: &str, position: usize) -> Rvalue {
    Rvalue::String(
        string
            .chars()
            .nth(position)
            .map(String::from)
            .unwrap_or_default(),
    )
}

/// Executes `program` on a fresh [`Vm`].
pub fn run<R: BufRead, W: Write>(
    program: &Block,
    config: VmConfig,
    input: R,
    output: W,
) -> Result<()> {
    Vm::new(config, input, output).run(program)
}
