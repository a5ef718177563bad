//! Error type for the Rust-side query API
//!
//! The C API collapses all of these into null/false/sentinel returns.

use crate::frontend::TypeRef;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("The cursor is not a declaration.")]
    NotADeclaration,

    #[error("The declaration `{0}` is not a record.")]
    NotARecord(String),

    #[error("The record `{0}` has no definition.")]
    IncompleteRecord(String),

    #[error("The record `{0}` has no layout.")]
    MissingLayout(String),

    #[error("The record `{record}` has a dependent base `{base}`.")]
    DependentBase { record: String, base: String },

    #[error("A base of `{record}` does not name a record.")]
    UnresolvedBase { record: String },

    #[error("The layout of `{record}` has no offset for base `{base}`.")]
    MissingBaseOffset { record: String, base: String },

    #[error("The layout of `{record}` has no offset for field `{field}`.")]
    MissingFieldOffset { record: String, field: String },

    #[error("The offset of field `{field}` in `{record}` does not fit in 64 signed bits.")]
    FieldOffsetOverflow { record: String, field: String },

    #[error("The record `{0}` is dynamic but has no v-table.")]
    MissingVTable(String),

    #[error("The cursor is not a variable declaration or expression.")]
    NotAVariableOrExpression,

    #[error("EvaluateAsRValue returned diagnostics.")]
    FoldDiagnostics(Vec<String>),

    #[error("The cursor is not a function declaration.")]
    NotAFunction,

    #[error("The type is null.")]
    NullType,

    #[error("The type {0:?} is not a function prototype.")]
    NotAFunctionPrototype(TypeRef),

    #[error("The front-end has no arrangement for `{0}`.")]
    NoArrangement(String),

    #[error("Unknown LLVM calling convention {0}.")]
    UnknownCallingConvention(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
