//! Front-end query surface
//!
//! cppabi never parses, lays out or classifies anything itself. It asks a host
//! compiler front-end for results the front-end already computed, through the
//! traits in this module, and repackages them. A binding to a real compiler
//! implements these traits; [`memory::MemoryUnit`] implements them over
//! in-memory tables.
//!
//! The enumerations in the submodules are the front-end's own numbering.
//! [`crate::kinds`] mirrors them and checks the numbers at compile time.

pub mod ast;
pub mod codegen;
pub mod eval;
pub mod layout;
pub mod lex;
pub mod memory;

pub use ast::*;
pub use codegen::{AbiArgInfo, AbiArgKind, CallingConv, CgFunctionArg, CgFunctionInfo, CodeGenTypes, CtorType, DtorType, GlobalDecl};
pub use eval::{ApFloat, ApValue, ApsInt, EvalResult, LValue, LValueBase, StringLiteralKind, ValueKind};
pub use layout::{
    AstRecordLayout, ComponentKind, CxxAbiKind, ItaniumVTableContext, MicrosoftVTableContext, TargetInfo, VBaseInfo,
    VPtrInfo, VTableComponent, VTableContext,
};
pub use lex::{IdentifierInfo, MacroHistory, MacroInfo, SourceLocation};
pub use memory::MemoryUnit;

/// Semantic model queries
pub trait AstContext {
    fn target(&self) -> TargetInfo;

    fn declaration(&self, id: DeclId) -> Option<&Decl>;

    fn expression(&self, id: ExprId) -> Option<&Expr>;

    fn attribute(&self, id: AttrId) -> Option<&Attr>;

    fn type_node(&self, ty: TypeRef) -> Option<&TypeNode>;

    /// Every type the unit created, in creation order
    fn types(&self) -> Box<dyn Iterator<Item = TypeRef> + '_>;

    fn void_pointer_type(&self) -> TypeRef;

    fn void_pointer_pointer_type(&self) -> TypeRef;

    /// Authoritative layout of a defined record
    fn record_layout(&self, record: DeclId) -> Option<&AstRecordLayout>;

    fn vtable_context(&self) -> VTableContext<'_>;

    fn evaluate_as_rvalue(&self, expr: ExprId) -> EvalResult;

    /// First declaration stored in a declaration context, implicit ones included
    fn first_decl_in_context(&self, context: DeclId) -> Option<DeclId>;

    /// Declaration following `decl` in its context
    fn next_decl_in_context(&self, decl: DeclId) -> Option<DeclId>;

    /// Prints `ty` as a declaration of `placeholder`, e.g. `int (*placeholder)(char)`
    fn print_type(&self, ty: TypeRef, placeholder: &str) -> String;

    /// Whether a location is in the main file once macro expansions are resolved
    fn is_in_main_file(&self, location: SourceLocation) -> bool;

    fn cursor_declaration(&self, cursor: Cursor) -> Option<(DeclId, &Decl)> {
        let id = cursor.as_declaration()?;
        self.declaration(id).map(|decl| (id, decl))
    }
}

/// Preprocessor queries
pub trait Preprocessor {
    fn identifiers(&self) -> Box<dyn Iterator<Item = &IdentifierInfo> + '_>;

    fn identifier_count(&self) -> usize;

    fn local_macro_directive_history(&self, identifier: &IdentifierInfo) -> Option<&MacroHistory>;
}

/// Semantic actions that mutate the translation unit
pub trait Sema {
    /// Instantiates a class template specialization. Returns `true` on success.
    fn instantiate_class_template_specialization(&mut self, record: DeclId) -> bool;

    /// Completes `ty` if possible. Returns `true` if it is complete afterwards.
    fn require_complete_type(&mut self, ty: TypeRef) -> bool;
}

/// A parsed translation unit exposing every query surface
pub trait TranslationUnit: AstContext + Preprocessor + Sema + CodeGenTypes {}

impl<T: AstContext + Preprocessor + Sema + CodeGenTypes> TranslationUnit for T {}
