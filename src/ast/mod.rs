//! Syntax tree for the Java-like statement subset the compiler lowers.
//!
//! There is no parser: trees are built with [`build`] or deserialized from a
//! JSON [`CompilationUnit`]. Fields marked `#[serde(skip)]` are filled in by
//! the compiler passes and never appear in input.

pub mod build;

use serde::{Deserialize, Serialize};

use crate::foreach::ForeachInfo;
use crate::span::Spanned;
use crate::typeck::scope::{LocalId, ScopeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Owner of the unit's static functions and methods.
    pub name: String,
    /// Text the spans refer to, if any. Only used for rendering diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub classes: Vec<Spanned<ClassDecl>>,
    #[serde(default)]
    pub functions: Vec<Spanned<FunctionDecl>>,
    #[serde(default)]
    pub methods: Vec<Spanned<Method>>,
}

/// A class or interface known only by its signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: Spanned<String>,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default)]
    pub is_interface: bool,
    #[serde(default)]
    pub superclass: Option<Spanned<TypeExpr>>,
    #[serde(default)]
    pub interfaces: Vec<Spanned<TypeExpr>>,
    #[serde(default)]
    pub methods: Vec<MethodSig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Spanned<TypeExpr>>,
    #[serde(default)]
    pub return_type: Option<Spanned<TypeExpr>>,
}

/// Signature of a static function callable from method bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Spanned<String>,
    #[serde(default)]
    pub params: Vec<Spanned<TypeExpr>>,
    #[serde(default)]
    pub return_type: Option<Spanned<TypeExpr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    #[serde(default)]
    pub bound: Option<Spanned<TypeExpr>>,
}

/// A static method with a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: Spanned<String>,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub return_type: Option<Spanned<TypeExpr>>,
    pub body: Spanned<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeExpr>,
    #[serde(default)]
    pub is_final: bool,
    #[serde(skip)]
    pub binding: Option<LocalId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    Named(String),
    Generic {
        name: String,
        args: Vec<Spanned<TypeExpr>>,
    },
    Array(Box<Spanned<TypeExpr>>),
    /// `?` or `? extends Bound`; only valid as a type argument.
    Wildcard {
        #[serde(default)]
        bound: Option<Box<Spanned<TypeExpr>>>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
    #[serde(skip)]
    pub scope: Option<ScopeId>,
    /// Index of the first statement flow analysis found unreachable.
    #[serde(skip)]
    pub unreachable_from: Option<usize>,
}

impl Block {
    pub fn new(stmts: Vec<Spanned<Stmt>>) -> Self {
        Self { stmts, scope: None, unreachable_from: None }
    }

    /// Statements that code generation should emit.
    pub fn reachable_stmts(&self) -> &[Spanned<Stmt>] {
        match self.unreachable_from {
            Some(i) => &self.stmts[..i.min(self.stmts.len())],
            None => &self.stmts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Local(LocalDecl),
    Expr(Spanned<Expr>),
    Block(Block),
    If {
        condition: Spanned<Expr>,
        then_branch: Box<Spanned<Stmt>>,
        #[serde(default)]
        else_branch: Option<Box<Spanned<Stmt>>>,
    },
    Foreach(ForeachStmt),
    Labeled {
        label: Spanned<String>,
        body: Box<Spanned<Stmt>>,
    },
    Break(Option<Spanned<String>>),
    Continue(Option<Spanned<String>>),
    Return(Option<Spanned<Expr>>),
    Empty,
}

impl Stmt {
    pub fn is_empty_block(&self) -> bool {
        matches!(self, Stmt::Block(b) if b.stmts.is_empty())
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Stmt::Foreach(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDecl {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeExpr>,
    #[serde(default)]
    pub init: Option<Spanned<Expr>>,
    #[serde(default)]
    pub is_final: bool,
    #[serde(skip)]
    pub binding: Option<LocalId>,
}

/// `for (T element : collection) action`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeachStmt {
    pub element: LocalDecl,
    pub collection: Spanned<Expr>,
    #[serde(default)]
    pub action: Option<Box<Spanned<Stmt>>>,
    #[serde(skip)]
    pub info: ForeachInfo,
}

impl ForeachStmt {
    /// No action, an empty block, or an empty statement.
    pub fn has_empty_action(&self) -> bool {
        match &self.action {
            None => true,
            Some(action) => action.node.is_empty_block() || matches!(action.node, Stmt::Empty),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    IntLit(i32),
    BoolLit(bool),
    StringLit(String),
    Null,
    Name(NameRef),
    NewArray {
        elem: Spanned<TypeExpr>,
        elements: Vec<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    /// `target = value`, or `target op= value` when `op` is set.
    Assign {
        target: Spanned<NameRef>,
        #[serde(default)]
        op: Option<BinOp>,
        value: Box<Spanned<Expr>>,
    },
    Call {
        name: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
    MethodCall {
        receiver: Box<Spanned<Expr>>,
        method: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameRef {
    pub name: String,
    #[serde(skip)]
    pub binding: Option<LocalId>,
}

impl NameRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), binding: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        !matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
        }
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Eq | BinOp::Ne => 1,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 2,
            BinOp::Add | BinOp::Sub => 3,
            BinOp::Mul => 4,
        }
    }
}
