//! Function arrangements as the code generator computes them

use super::ast::{DeclId, TypeRef};

/// LLVM calling convention IDs.
///
/// LLVM keeps these as an open set of integers rather than an enum. Values from
/// [`FIRST_TARGET_CC`] upwards are target specific.
#[allow(non_upper_case_globals)]
pub mod llvm_cc {
    pub const C: u32 = 0;
    pub const Fast: u32 = 8;
    pub const Cold: u32 = 9;
    pub const GHC: u32 = 10;
    pub const HiPE: u32 = 11;
    pub const WebKit_JS: u32 = 12;
    pub const AnyReg: u32 = 13;
    pub const PreserveMost: u32 = 14;
    pub const PreserveAll: u32 = 15;
    pub const Swift: u32 = 16;
    pub const CXX_FAST_TLS: u32 = 17;
    pub const Tail: u32 = 18;
    pub const CFGuard_Check: u32 = 19;
    pub const FIRST_TARGET_CC: u32 = 64;
    pub const X86_StdCall: u32 = 64;
    pub const X86_FastCall: u32 = 65;
    pub const ARM_APCS: u32 = 66;
    pub const ARM_AAPCS: u32 = 67;
    pub const ARM_AAPCS_VFP: u32 = 68;
    pub const MSP430_INTR: u32 = 69;
    pub const X86_ThisCall: u32 = 70;
    pub const PTX_Kernel: u32 = 71;
    pub const PTX_Device: u32 = 72;
    pub const SPIR_FUNC: u32 = 75;
    pub const SPIR_KERNEL: u32 = 76;
    pub const Intel_OCL_BI: u32 = 77;
    pub const X86_64_SysV: u32 = 78;
    pub const Win64: u32 = 79;
    pub const X86_VectorCall: u32 = 80;
    pub const HHVM: u32 = 81;
    pub const HHVM_C: u32 = 82;
    pub const X86_INTR: u32 = 83;
    pub const AVR_INTR: u32 = 84;
    pub const AVR_SIGNAL: u32 = 85;
    pub const AVR_BUILTIN: u32 = 86;
    pub const AMDGPU_VS: u32 = 87;
    pub const AMDGPU_GS: u32 = 88;
    pub const AMDGPU_PS: u32 = 89;
    pub const AMDGPU_CS: u32 = 90;
    pub const AMDGPU_KERNEL: u32 = 91;
    pub const X86_RegCall: u32 = 92;
    pub const AMDGPU_HS: u32 = 93;
    pub const MSP430_BUILTIN: u32 = 94;
    pub const AMDGPU_LS: u32 = 95;
    pub const AMDGPU_ES: u32 = 96;
    pub const AArch64_VectorCall: u32 = 97;
    pub const AArch64_SVE_VectorCall: u32 = 98;
    pub const WASM_EmscriptenInvoke: u32 = 99;
}

/// Source-level calling convention as the front-end numbers it
#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallingConv {
    C = 0,
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

/// How one argument or return value is passed, numbered as the front-end numbers it
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiArgKind {
    Direct = 0,
    Extend,
    Indirect,
    IndirectAliased,
    Ignore,
    Expand,
    CoerceAndExpand,
    InAlloca,
}

/// Raw classification of one argument.
///
/// Like the code generator's own storage, the integer fields alias each other:
/// which of them is meaningful depends on `kind`, and flags may hold stale
/// values for kinds they do not apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbiArgInfo {
    pub kind: AbiArgKind,
    pub has_coerce_to_type: bool,
    pub has_padding_type: bool,
    pub has_unpadded_coerce_and_expand_type: bool,
    pub padding_in_reg: bool,
    pub in_alloca_sret: bool,
    pub indirect_by_val: bool,
    pub indirect_realign: bool,
    pub sret_after_this: bool,
    pub in_reg: bool,
    pub can_be_flattened: bool,
    pub sign_ext: bool,
    pub direct_offset: u32,
    pub indirect_align: u32,
    pub indirect_addr_space: u32,
    pub alloca_field_index: u32,
}

impl AbiArgInfo {
    pub const fn new(kind: AbiArgKind) -> Self {
        Self {
            kind,
            has_coerce_to_type: false,
            has_padding_type: false,
            has_unpadded_coerce_and_expand_type: false,
            padding_in_reg: false,
            in_alloca_sret: false,
            indirect_by_val: false,
            indirect_realign: false,
            sret_after_this: false,
            in_reg: false,
            can_be_flattened: false,
            sign_ext: false,
            direct_offset: 0,
            indirect_align: 0,
            indirect_addr_space: 0,
            alloca_field_index: 0,
        }
    }

    pub const fn direct() -> Self {
        let mut info = Self::new(AbiArgKind::Direct);
        info.can_be_flattened = true;
        info
    }

    pub const fn extend(sign_ext: bool) -> Self {
        let mut info = Self::new(AbiArgKind::Extend);
        info.sign_ext = sign_ext;
        info
    }

    pub const fn indirect(align: u32, by_val: bool) -> Self {
        let mut info = Self::new(AbiArgKind::Indirect);
        info.indirect_align = align;
        info.indirect_by_val = by_val;
        info
    }

    pub const fn ignore() -> Self {
        Self::new(AbiArgKind::Ignore)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CgFunctionArg {
    pub ty: TypeRef,
    pub info: AbiArgInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgFunctionInfo {
    /// LLVM calling convention ID
    pub calling_convention: u32,
    pub effective_calling_convention: u32,
    pub ast_calling_convention: CallingConv,
    pub is_instance_method: bool,
    pub is_chain_call: bool,
    pub is_no_return: bool,
    pub is_returns_retained: bool,
    pub is_no_caller_saved_regs: bool,
    pub has_reg_parm: bool,
    pub reg_parm: u32,
    pub is_no_cf_check: bool,
    pub is_variadic: bool,
    pub uses_in_alloca: bool,
    pub has_extended_parameter_info: bool,
    /// Number of arguments the prototype requires, variadic tail excluded
    pub required_args: u32,
    pub return_type: TypeRef,
    pub return_info: AbiArgInfo,
    pub arguments: Vec<CgFunctionArg>,
}

impl CgFunctionInfo {
    /// A plain C-convention arrangement returning `return_type` directly
    pub fn c(return_type: TypeRef, return_info: AbiArgInfo) -> Self {
        Self {
            calling_convention: llvm_cc::C,
            effective_calling_convention: llvm_cc::C,
            ast_calling_convention: CallingConv::C,
            is_instance_method: false,
            is_chain_call: false,
            is_no_return: false,
            is_returns_retained: false,
            is_no_caller_saved_regs: false,
            has_reg_parm: false,
            reg_parm: 0,
            is_no_cf_check: false,
            is_variadic: false,
            uses_in_alloca: false,
            has_extended_parameter_info: false,
            required_args: 0,
            return_type,
            return_info,
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, ty: TypeRef, info: AbiArgInfo) -> Self {
        self.arguments.push(CgFunctionArg { ty, info });
        self.required_args = self.arguments.len() as u32;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtorType {
    Complete,
    Base,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DtorType {
    Deleting,
    Complete,
    Base,
}

/// A function declaration plus, for structors, which variant is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalDecl {
    Function(DeclId),
    Constructor(DeclId, CtorType),
    Destructor(DeclId, DtorType),
}

impl GlobalDecl {
    pub const fn decl(&self) -> DeclId {
        match self {
            Self::Function(decl) | Self::Constructor(decl, _) | Self::Destructor(decl, _) => *decl,
        }
    }
}

pub trait CodeGenTypes {
    fn arrange_global_declaration(&self, decl: GlobalDecl) -> Option<&CgFunctionInfo>;

    /// Arrangement of a call through a pointer to a function of type `ty`
    fn arrange_free_function_type(&self, ty: TypeRef) -> Option<&CgFunctionInfo>;
}
