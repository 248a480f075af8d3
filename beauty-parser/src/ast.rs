use std::mem;

use beauty_source::Location;

use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    RemainderAssign,
    OrAssign,
    AndAssign,
    Or,
    And,
    Equal,
    Different,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Index,
}

impl BinaryOp {
    /// Returns `true` for `=` and the compound assignments.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubtractAssign
                | BinaryOp::MultiplyAssign
                | BinaryOp::DivideAssign
                | BinaryOp::RemainderAssign
                | BinaryOp::OrAssign
                | BinaryOp::AndAssign
        )
    }

    /// The operator a compound assignment applies before storing, e.g. `Add` for `+=`.
    pub fn compound_base(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::AddAssign => Some(BinaryOp::Add),
            BinaryOp::SubtractAssign => Some(BinaryOp::Subtract),
            BinaryOp::MultiplyAssign => Some(BinaryOp::Multiply),
            BinaryOp::DivideAssign => Some(BinaryOp::Divide),
            BinaryOp::RemainderAssign => Some(BinaryOp::Remainder),
            BinaryOp::OrAssign => Some(BinaryOp::Or),
            BinaryOp::AndAssign => Some(BinaryOp::And),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    BoolLit(bool),
    NumberLit(f64),
    StringLit(String),
    /// A list literal (e.g. `[1, 2, 3]`).
    ListLit(Vec<Expr>),
    /// An identifier (e.g. `foo`).
    Identifier(String),
    /// A unary expression (e.g. `-a`).
    Unary { op: UnaryOp, arg: Box<Expr> },
    /// A binary expression (e.g. `1+1`). Indexing (`a[i]`) is a binary expression too.
    Binary {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
    },
    /// A function call (e.g. `f(1, 2)`).
    FnCall { ident: String, args: Vec<Expr> },
}

/// Deeply nested expressions are freed with an explicit work list instead of recursion.
impl Drop for Expr {
    fn drop(&mut self) {
        if !self.has_children() {
            return;
        }
        let mut pending = Vec::new();
        self.take_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.take_children(&mut pending);
        }
    }
}

impl Expr {
    fn has_children(&self) -> bool {
        match self {
            Expr::Unary { .. } | Expr::Binary { .. } => true,
            Expr::ListLit(items) | Expr::FnCall { args: items, .. } => !items.is_empty(),
            _ => false,
        }
    }

    /// Moves the sub-expressions into `pending`, leaving leaves in their place.
    fn take_children(&mut self, pending: &mut Vec<Expr>) {
        let leaf = || Expr::BoolLit(false);
        match self {
            Expr::Unary { arg, .. } => pending.push(mem::replace(&mut **arg, leaf())),
            Expr::Binary { lhs, rhs, .. } => {
                pending.push(mem::replace(&mut **lhs, leaf()));
                pending.push(mem::replace(&mut **rhs, leaf()));
            }
            Expr::ListLit(items) | Expr::FnCall { args: items, .. } => pending.append(items),
            _ => {}
        }
    }
}

/// A function parameter (`name : type`).
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ident: String,
    pub ty: Type,
}

/// An indentation block: consecutive statements sharing one indentation width.
pub type Block = Vec<Stmt>;

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    /// Location of the first token of the statement.
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    VarDeclaration {
        ident: String,
        ty: Option<Type>,
        initializer: Option<Expr>,
    },
    FnDeclaration {
        ident: String,
        params: Vec<Param>,
        /// [`Type::None`] for functions without a return type.
        ret_ty: Type,
        body: Block,
    },
    ExprStmt(Expr),
    ReturnStmt(Option<Expr>),
    PrintStmt(Expr),
    ReadStmt(Expr),
    IfStmt {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    WhileStmt {
        condition: Expr,
        body: Block,
    },
    ForStmt {
        ident: String,
        range: Expr,
        body: Block,
    },
}

impl Stmt {
    pub fn new(kind: StmtKind, loc: Location) -> Self {
        Self { kind, loc }
    }
}
