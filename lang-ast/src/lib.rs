#![forbid(unsafe_code)]

mod fmt;

use std::fmt as std_fmt;

use lang_lex::{Pos, Tok};

pub use fmt::dump;

/// Identity of an AST node, unique within one parse.
///
/// The type checker's side tables are keyed by node identity; since tagged
/// values have no pointer identity, the parser stamps every expression node
/// with a fresh id at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Default)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// A line comment, collected by the parser as a side output.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    pub text: String,
    pub start: Pos,
    pub end: Pos,
}

// ---- Commands -------------------------------------------------------------

/// Statement-level nodes. A program is a single top-level [`Block`].
#[derive(Clone, Debug, PartialEq)]
pub enum Cmd {
    Assert(Assert),
    Assign(Assign),
    Block(Block),
    Break(Break),
    Continue(Continue),
    For(For),
    If(If),
    Return(Return),
    VarDecl(VarDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assert {
    pub x: Expr,
    pub start: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assign {
    pub ident: Ident,
    pub x: Expr,
    pub start: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub cmds: Vec<Cmd>,
    pub start: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Break {
    pub start: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Continue {
    pub start: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct For {
    pub x: Expr,
    pub block: Block,
    pub start: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct If {
    pub x: Expr,
    pub block: Block,
    pub els: Option<Else>,
    pub start: Pos,
}

/// The `else` arm of an [`If`]; wraps either a nested `If` or a `Block`.
#[derive(Clone, Debug, PartialEq)]
pub struct Else {
    pub cmd: Box<Cmd>,
    pub start: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Return {
    pub x: Expr,
    pub start: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub ident: Ident,
    pub x: Expr,
    pub start: Pos,
    pub end: Pos,
}

impl Cmd {
    pub fn pos(&self) -> Pos {
        match self {
            Cmd::Assert(c) => c.start,
            Cmd::Assign(c) => c.start,
            Cmd::Block(c) => c.start,
            Cmd::Break(c) => c.start,
            Cmd::Continue(c) => c.start,
            Cmd::For(c) => c.start,
            Cmd::If(c) => c.start,
            Cmd::Return(c) => c.start,
            Cmd::VarDecl(c) => c.start,
        }
    }

    pub fn end(&self) -> Pos {
        match self {
            Cmd::Assert(c) => c.end,
            Cmd::Assign(c) => c.end,
            Cmd::Block(c) => c.end,
            Cmd::Break(c) => c.end,
            Cmd::Continue(c) => c.end,
            Cmd::For(c) => c.block.end,
            Cmd::If(c) => match &c.els {
                Some(e) => e.cmd.end(),
                None => c.block.end,
            },
            Cmd::Return(c) => c.end,
            Cmd::VarDecl(c) => c.end,
        }
    }
}

// ---- Expressions ----------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Binary(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    Paren(Box<ParenExpr>),
    Ident(Ident),
    Bool(BoolLit),
    I64(I64Lit),
    F64(F64Lit),
    String(StringLit),
    Func(Box<FuncLit>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpr {
    pub id: NodeId,
    pub lhs: Expr,
    pub op: Tok,
    pub op_pos: Pos,
    pub rhs: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnaryExpr {
    pub id: NodeId,
    pub op: Tok,
    pub x: Expr,
    pub start: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParenExpr {
    pub id: NodeId,
    pub x: Expr,
    pub start: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub start: Pos,
}

impl Ident {
    pub fn end(&self) -> Pos {
        self.start.shift(self.name.len())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoolLit {
    pub id: NodeId,
    pub val: bool,
    pub start: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct I64Lit {
    pub id: NodeId,
    pub val: i64,
    pub start: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct F64Lit {
    pub id: NodeId,
    pub val: f64,
    pub start: Pos,
    pub end: Pos,
}

/// A string literal; `val` is the literal text as written, quotes included.
#[derive(Clone, Debug, PartialEq)]
pub struct StringLit {
    pub id: NodeId,
    pub val: String,
    pub start: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncLit {
    pub id: NodeId,
    pub params: Vec<Field>,
    pub result: Type,
    pub block: Block,
    pub start: Pos,
}

/// A parameter declaration: name followed by its type.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub ident: Ident,
    pub ty: Type,
}

impl Expr {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Binary(x) => x.id,
            Expr::Unary(x) => x.id,
            Expr::Paren(x) => x.id,
            Expr::Ident(x) => x.id,
            Expr::Bool(x) => x.id,
            Expr::I64(x) => x.id,
            Expr::F64(x) => x.id,
            Expr::String(x) => x.id,
            Expr::Func(x) => x.id,
        }
    }

    pub fn pos(&self) -> Pos {
        match self {
            Expr::Binary(x) => x.lhs.pos(),
            Expr::Unary(x) => x.start,
            Expr::Paren(x) => x.start,
            Expr::Ident(x) => x.start,
            Expr::Bool(x) => x.start,
            Expr::I64(x) => x.start,
            Expr::F64(x) => x.start,
            Expr::String(x) => x.start,
            Expr::Func(x) => x.start,
        }
    }

    pub fn end(&self) -> Pos {
        match self {
            Expr::Binary(x) => x.rhs.end(),
            Expr::Unary(x) => x.x.end(),
            Expr::Paren(x) => x.end,
            Expr::Ident(x) => x.end(),
            Expr::Bool(x) => x.end,
            Expr::I64(x) => x.end,
            Expr::F64(x) => x.end,
            Expr::String(x) => x.end,
            Expr::Func(x) => x.block.end,
        }
    }
}

// ---- Syntactic types ------------------------------------------------------

/// Type syntax as written in the source; resolved to semantic types by the
/// checker.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Scalar(Scalar),
    Func(Box<FuncType>),
}

/// One of `bool`, `f64`, `i64`, `string`.
#[derive(Clone, Debug, PartialEq)]
pub struct Scalar {
    pub name: String,
    pub start: Pos,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncType {
    pub params: Vec<Type>,
    pub result: Type,
    pub start: Pos,
}

impl Type {
    pub fn pos(&self) -> Pos {
        match self {
            Type::Scalar(t) => t.start,
            Type::Func(t) => t.start,
        }
    }
}

impl std_fmt::Display for Type {
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result {
        match self {
            Type::Scalar(t) => f.write_str(&t.name),
            Type::Func(t) => {
                f.write_str("func(")?;
                for (i, p) in t.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") {}", t.result)
            }
        }
    }
}
