//! The Lotus abstract syntax tree: expressions and statements.
//!
//! Every child node is owned by its parent (`Box`); the tree is acyclic
//! by construction and `Clone` gives a total deep copy, which is exactly
//! what a `Function` statement needs when it hands its body to a closure.

/// Semantic operators used by `Expr::Unary`/`Expr::Binary`. Distinct from
/// `TokenKind`: several token kinds (e.g. `Bang`) map to more than one
/// surface form, but every operator-bearing token maps to exactly one of
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Mod,
    And,
    Or,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    Not,
    Forward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Number,
    Boolean,
    Nil,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `payload` is the raw lexeme/literal text; numeric parsing and
    /// boolean/nil construction happen during evaluation, not parsing.
    Literal { kind: LiteralKind, payload: String },
    Identifier { name: String },
    Grouping { inner: Box<Expr> },
    Unary { op: Operator, right: Box<Expr> },
    Binary { left: Box<Expr>, op: Operator, right: Box<Expr> },
    Call { name: String, actuals: Vec<Expr> },
    /// Produced only by a failed `primary`; panic-mode recovery guarantees
    /// this never survives into a returned statement.
    PanicSentinel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr { expr: Expr, line: u32 },
    Print { expr: Expr, line: u32 },
    If { cond: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>>, line: u32 },
    Block { stmts: Vec<Stmt>, line: u32 },
    Declaration { name: String, expr: Expr, line: u32 },
    Assignment { name: String, expr: Expr, line: u32 },
    Function { name: String, formals: Vec<String>, body: Box<Stmt>, line: u32 },
    Return { expr: Expr, line: u32 },
}

impl Stmt {
    pub fn line(&self) -> u32 {
        match self {
            Stmt::Expr { line, .. }
            | Stmt::Print { line, .. }
            | Stmt::If { line, .. }
            | Stmt::Block { line, .. }
            | Stmt::Declaration { line, .. }
            | Stmt::Assignment { line, .. }
            | Stmt::Function { line, .. }
            | Stmt::Return { line, .. } => *line,
        }
    }

    /// True if this statement tree contains a `PanicSentinel` anywhere —
    /// used only by tests to check the parser's recovery invariant; a
    /// correctly functioning parser never returns such a statement.
    #[cfg(test)]
    pub fn contains_panic_sentinel(&self) -> bool {
        fn expr_has(e: &Expr) -> bool {
            match e {
                Expr::PanicSentinel => true,
                Expr::Grouping { inner } => expr_has(inner),
                Expr::Unary { right, .. } => expr_has(right),
                Expr::Binary { left, right, .. } => expr_has(left) || expr_has(right),
                Expr::Call { actuals, .. } => actuals.iter().any(expr_has),
                Expr::Literal { .. } | Expr::Identifier { .. } => false,
            }
        }
        match self {
            Stmt::Expr { expr, .. } | Stmt::Print { expr, .. } | Stmt::Declaration { expr, .. }
            | Stmt::Assignment { expr, .. } | Stmt::Return { expr, .. } => expr_has(expr),
            Stmt::If { cond, then_branch, else_branch, .. } => {
                expr_has(cond)
                    || then_branch.contains_panic_sentinel()
                    || else_branch.as_ref().is_some_and(|s| s.contains_panic_sentinel())
            }
            Stmt::Block { stmts, .. } => stmts.iter().any(Stmt::contains_panic_sentinel),
            Stmt::Function { body, .. } => body.contains_panic_sentinel(),
        }
    }
}
