//! Interop enumerations
//!
//! Every enumeration the C API hands out, with its fixed width. Those that
//! mirror a front-end enumeration are checked against it at compile time by
//! `#[mirror_enum]`; a mismatch is a build error.

use cppabi_macro::mirror_enum;

use crate::frontend::{ast, codegen, eval, layout};

/// Kind of one slot in a flattened record layout
#[mirror_enum(repr = i32)]
pub enum RecordFieldKind {
    Normal,
    VTablePtr,
    NonVirtualBase,
    VirtualBaseTablePtr,
    VTorDisp,
    VirtualBase,
}

#[mirror_enum(repr = i32, upstream = layout::ComponentKind, convert)]
pub enum VTableEntryKind {
    VCallOffset,
    VBaseOffset,
    OffsetToTop,
    #[mirror(Rtti)]
    RTTI,
    FunctionPointer,
    #[mirror(CompleteDtorPointer)]
    CompleteDestructorPointer,
    #[mirror(DeletingDtorPointer)]
    DeletingDestructorPointer,
    UnusedFunctionPointer,
}

/// Overloaded operator kind. `Invalid` doubles as the count of real operators.
#[mirror_enum(repr = i32, upstream = ast::OverloadedOperatorKind, convert)]
pub enum OperatorOverloadKind {
    None,
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
    #[mirror(NumOverloadedOperators)]
    Invalid,
}

impl OperatorOverloadKind {
    pub const COUNT: usize = Self::Invalid as usize + 1;
}

#[mirror_enum(repr = i32, upstream = ast::ArgPassingRestriction, convert)]
pub enum ArgPassingKind {
    #[mirror(CanPassInRegs)]
    CanPassInRegisters,
    #[mirror(CannotPassInRegs)]
    CannotPassInRegisters,
    #[mirror(CanNeverPassInRegs)]
    CanNeverPassInRegisters,
    #[mirror(skip)]
    Invalid,
}

#[mirror_enum(repr = u8, upstream = codegen::AbiArgKind, convert)]
pub enum ArgumentKind {
    Direct,
    Extend,
    Indirect,
    IndirectAliased,
    Ignore,
    Expand,
    CoerceAndExpand,
    InAlloca,
}

/// LLVM calling convention IDs that fit in a byte
#[mirror_enum(repr = u8, upstream = codegen::llvm_cc)]
#[allow(non_camel_case_types)]
pub enum LlvmCallingConventionKind {
    C = 0,
    Fast = 8,
    Cold = 9,
    GHC = 10,
    HiPE = 11,
    WebKit_JS = 12,
    AnyReg = 13,
    PreserveMost = 14,
    PreserveAll = 15,
    Swift = 16,
    CXX_FAST_TLS = 17,
    Tail = 18,
    CFGuard_Check = 19,
    X86_StdCall = 64,
    X86_FastCall = 65,
    ARM_APCS = 66,
    ARM_AAPCS = 67,
    ARM_AAPCS_VFP = 68,
    MSP430_INTR = 69,
    X86_ThisCall = 70,
    PTX_Kernel = 71,
    PTX_Device = 72,
    SPIR_FUNC = 75,
    SPIR_KERNEL = 76,
    Intel_OCL_BI = 77,
    X86_64_SysV = 78,
    Win64 = 79,
    X86_VectorCall = 80,
    HHVM = 81,
    HHVM_C = 82,
    X86_INTR = 83,
    AVR_INTR = 84,
    AVR_SIGNAL = 85,
    AVR_BUILTIN = 86,
    AMDGPU_VS = 87,
    AMDGPU_GS = 88,
    AMDGPU_PS = 89,
    AMDGPU_CS = 90,
    AMDGPU_KERNEL = 91,
    X86_RegCall = 92,
    AMDGPU_HS = 93,
    MSP430_BUILTIN = 94,
    AMDGPU_LS = 95,
    AMDGPU_ES = 96,
    AArch64_VectorCall = 97,
    AArch64_SVE_VectorCall = 98,
    WASM_EmscriptenInvoke = 99,
}

impl LlvmCallingConventionKind {
    pub const FIRST_TARGET_CC: u8 = Self::X86_StdCall as u8;

    pub fn from_id(id: u32) -> Option<Self> {
        u8::try_from(id).ok().and_then(Self::from_raw)
    }
}

/// Source-level calling convention
#[mirror_enum(repr = u8, upstream = codegen::CallingConv, convert)]
#[allow(non_camel_case_types)]
pub enum ClangCallingConventionKind {
    C,
    X86StdCall,
    X86FastCall,
    X86ThisCall,
    X86VectorCall,
    X86Pascal,
    Win64,
    X86_64SysV,
    X86RegCall,
    AAPCS,
    AAPCS_VFP,
    IntelOclBicc,
    SpirFunction,
    OpenCLKernel,
    Swift,
    PreserveMost,
    PreserveAll,
    AArch64VectorCall,
}

/// Specialization kind shifted up by one so that `0` means "not a specialization"
#[mirror_enum(repr = i32, upstream = ast::SpecializationKind, offset = 1, convert)]
pub enum TemplateSpecializationKind {
    #[mirror(skip)]
    Invalid = 0,
    Undeclared,
    ImplicitInstantiation,
    ExplicitSpecialization,
    ExplicitInstantiationDeclaration,
    ExplicitInstantiationDefinition,
}

#[mirror_enum(repr = i32)]
#[derive(Default)]
pub enum ConstantValueKind {
    #[default]
    Unknown,
    NullPointer,
    UnsignedInteger,
    SignedInteger,
    FloatingPoint,
    String,
}

#[mirror_enum(repr = i32, upstream = eval::StringLiteralKind, convert)]
pub enum StringConstantKind {
    Ascii,
    #[mirror(Wide)]
    WideChar,
    Utf8,
    Utf16,
    Utf32,
}

impl StringConstantKind {
    /// Set on top of the re-tagged kind when the literal was spelled `L"..."`
    pub const WIDE_CHAR_BIT: i32 = i32::MIN;
}

#[mirror_enum(repr = i32)]
pub enum MacroVariadicKind {
    None,
    C99,
    Gnu,
}
