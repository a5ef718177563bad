//! Handles and declaration model
//!
//! Everything a caller passes across the C API is one of the handles defined
//! here: a [`Cursor`] names a declaration, expression or attribute, a
//! [`TypeRef`] names a type. Handles are plain indices into the front-end's
//! tables, so they are `Copy` and can be returned by value from `extern "C"`
//! functions.

use super::eval::StringLiteralKind;
use super::lex::SourceLocation;

// =============================================================================
// Handles
// =============================================================================

/// Index of a declaration in the front-end's declaration table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

/// Index of an expression in the front-end's expression table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

/// Index of an attribute in the front-end's attribute table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrId(pub u32);

/// What a [`Cursor`] points at.
///
/// Kept as a transparent integer rather than a Rust enum because cursors travel
/// through C, and an out-of-range discriminant must stay representable.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CursorKind(pub i32);

impl CursorKind {
    pub const NULL: Self = Self(0);
    pub const DECLARATION: Self = Self(1);
    pub const EXPRESSION: Self = Self(2);
    pub const ATTRIBUTE: Self = Self(3);
}

/// Opaque reference to a declaration, expression or attribute
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cursor {
    pub kind: CursorKind,
    pub index: u32,
}

impl Cursor {
    pub const NULL: Self = Self {
        kind: CursorKind::NULL,
        index: 0,
    };

    pub const fn declaration(id: DeclId) -> Self {
        Self {
            kind: CursorKind::DECLARATION,
            index: id.0,
        }
    }

    pub const fn expression(id: ExprId) -> Self {
        Self {
            kind: CursorKind::EXPRESSION,
            index: id.0,
        }
    }

    pub const fn attribute(id: AttrId) -> Self {
        Self {
            kind: CursorKind::ATTRIBUTE,
            index: id.0,
        }
    }

    pub const fn is_null(self) -> bool {
        self.kind.0 == CursorKind::NULL.0
    }

    pub const fn as_declaration(self) -> Option<DeclId> {
        if self.kind.0 == CursorKind::DECLARATION.0 {
            Some(DeclId(self.index))
        } else {
            None
        }
    }

    pub const fn as_expression(self) -> Option<ExprId> {
        if self.kind.0 == CursorKind::EXPRESSION.0 {
            Some(ExprId(self.index))
        } else {
            None
        }
    }

    pub const fn as_attribute(self) -> Option<AttrId> {
        if self.kind.0 == CursorKind::ATTRIBUTE.0 {
            Some(AttrId(self.index))
        } else {
            None
        }
    }
}

/// Opaque reference to a type. [`TypeRef::NULL`] means "no type".
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(pub u32);

impl TypeRef {
    pub const NULL: Self = Self(u32::MAX);

    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for TypeRef {
    fn default() -> Self {
        Self::NULL
    }
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    /// Spelling as the front-end prints it
    pub spelling: String,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Void,
    Builtin,
    Pointer(TypeRef),
    Record(DeclId),
    FunctionProto(FunctionProto),
    /// Depends on a template parameter
    Dependent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionProto {
    pub result: TypeRef,
    pub params: Vec<TypeRef>,
    pub is_variadic: bool,
}

// =============================================================================
// Declarations
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub name: String,
    pub location: SourceLocation,
    /// Compiler-generated (implicit special members, injected class names)
    pub is_implicit: bool,
    pub kind: DeclKind,
}

impl Decl {
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            name: name.into(),
            location: SourceLocation::INVALID,
            is_implicit: false,
            kind,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn as_record(&self) -> Option<&RecordDecl> {
        match &self.kind {
            DeclKind::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match &self.kind {
            DeclKind::Function(function) => Some(function),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Record(RecordDecl),
    Field(FieldDecl),
    Function(FunctionDecl),
    Var(VarDecl),
    EnumConstant(EnumConstantDecl),
    /// Namespaces, typedefs and everything else the queries never look inside
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Struct,
    Class,
    Union,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub tag: TagKind,
    /// The defining declaration of this record, if one exists anywhere
    pub definition: Option<DeclId>,
    /// C++ class data, `None` for C structs
    pub cxx: Option<CxxRecord>,
    pub fields: Vec<DeclId>,
    pub arg_passing: ArgPassingRestriction,
    pub specialization: Option<ClassTemplateSpecialization>,
    pub attributes: Vec<AttrId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CxxRecord {
    /// Has (or inherits) a virtual function or virtual base
    pub is_dynamic: bool,
    /// Direct bases in declaration order, virtual ones included
    pub bases: Vec<BaseSpecifier>,
    /// All virtual bases, direct and indirect, in the front-end's order
    pub vbases: Vec<BaseSpecifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseSpecifier {
    pub ty: TypeRef,
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgPassingRestriction {
    CanPassInRegs,
    CannotPassInRegs,
    CanNeverPassInRegs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassTemplateSpecialization {
    pub kind: SpecializationKind,
    pub is_partial: bool,
    /// Whether the primary template (or partial specialization) was ever defined
    pub template_has_definition: bool,
}

/// Template specialization kind as the front-end numbers it
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecializationKind {
    Undeclared = 0,
    ImplicitInstantiation = 1,
    ExplicitSpecialization = 2,
    ExplicitInstantiationDeclaration = 3,
    ExplicitInstantiationDefinition = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    pub ty: TypeRef,
    pub bit_width: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Free,
    Method,
    Constructor,
    Destructor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDecl {
    pub ty: TypeRef,
    pub kind: FunctionKind,
    pub overloaded_operator: OverloadedOperatorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarDecl {
    pub ty: TypeRef,
    pub init: Option<ExprId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumConstantDecl {
    pub value: super::eval::ApsInt,
}

/// Overloaded operator kind as the front-end numbers it
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverloadedOperatorKind {
    None = 0,
    New,
    Delete,
    ArrayNew,
    ArrayDelete,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Amp,
    Pipe,
    Tilde,
    Exclaim,
    Equal,
    Less,
    Greater,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    CaretEqual,
    AmpEqual,
    PipeEqual,
    LessLess,
    GreaterGreater,
    LessLessEqual,
    GreaterGreaterEqual,
    EqualEqual,
    ExclaimEqual,
    LessEqual,
    GreaterEqual,
    Spaceship,
    AmpAmp,
    PipePipe,
    PlusPlus,
    MinusMinus,
    Comma,
    ArrowStar,
    Arrow,
    Call,
    Subscript,
    Conditional,
    Coawait,
    NumOverloadedOperators,
}

// =============================================================================
// Expressions and attributes
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub ty: TypeRef,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    StringLiteral(StringLiteral),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub kind: StringLiteralKind,
    /// Width of one code unit in bytes
    pub char_byte_width: u32,
    /// Encoded code units, no terminator
    pub bytes: Vec<u8>,
}

impl StringLiteral {
    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    /// `__declspec(uuid("..."))`
    Uuid(String),
    Other(String),
}
