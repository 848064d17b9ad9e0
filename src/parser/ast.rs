// AST node definitions for the pattern language.
//
// The node family is a set of closed enums dispatched by match; cloning any
// node is a deep recursive copy. Every node carries the source line it was
// parsed from.

use crate::lexer::token::{Literal, Operator, ValueType};
use crate::name::Name;

/// Byte order of a read from the byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// An expression node.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A typed numeric literal.
    Literal(Literal),

    /// Binary numeric expression. Unary operators are encoded with a zero
    /// left operand; `!` and `~` evaluate the right operand only.
    Binary {
        op: Operator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// `cond ? then : else` — only the selected branch is evaluated.
    Ternary {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    /// Dotted identifier path into the current struct/union context,
    /// e.g. `header.entry_count`.
    RValue(Vec<Name>),

    /// `::`-separated path into the type namespace, e.g. `Color::Red`.
    ScopePath(Vec<Name>),

    /// Function call with positional arguments.
    Call { name: Name, args: Vec<Expr> },
}

/// A type reference at a use site: a built-in or a named type, with an
/// optional `be`/`le` qualifier.
#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    pub endian: Option<Endianness>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Builtin(ValueType),
    /// Resolved against the evaluator's type environment.
    Named(Name),
}

/// A named type definition, stored in the type environment.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: Name,
    pub kind: TypeDefKind,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum TypeDefKind {
    /// `using Name = [be|le] T;` — the alias's endianness override lives on
    /// the aliased type.
    Alias(Type),
    Struct { members: Vec<Stmt> },
    Union { members: Vec<Stmt> },
    Enum {
        underlying: ValueType,
        entries: Vec<(Name, Expr)>,
    },
    Bitfield { entries: Vec<(Name, Expr)> },
}

/// A statement: a top-level declaration or a struct/union member.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Type definition; populates the type environment, places nothing.
    TypeDef(TypeDef),

    /// Plain variable. The placement offset is present at top level
    /// (`T name @ expr;`) and absent for members.
    Variable {
        name: Name,
        ty: Type,
        offset: Option<Expr>,
    },

    /// Array variable: `T name[size]`. A `padding[size];` member is an
    /// unnamed array of the `padding` built-in.
    Array {
        name: Option<Name>,
        ty: Type,
        size: Expr,
        offset: Option<Expr>,
    },

    /// Pointer variable: `T *name : SizeType`. The size type's width is the
    /// on-disk pointer width.
    Pointer {
        name: Name,
        ty: Type,
        size_ty: Type,
        offset: Option<Expr>,
    },

    /// `if (cond) { ... } else { ... }` among struct/union members; the
    /// selected body is inlined into the enclosing member stream.
    Conditional {
        condition: Expr,
        true_body: Vec<Stmt>,
        false_body: Vec<Stmt>,
    },
}
