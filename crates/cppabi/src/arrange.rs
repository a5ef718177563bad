//! Function ABI classification
//!
//! Repackages the code generator's arrangement of a function (how each argument
//! and the return value travel: registers, memory, expanded, ignored) into
//! fixed-width records. The code generator's own per-argument storage aliases
//! fields across kinds, so only the fields and flags that are valid for an
//! argument's kind are copied out.

use bitflags::bitflags;
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::frontend::{
    AbiArgInfo, AbiArgKind, AstContext, CgFunctionInfo, CodeGenTypes, Cursor, CtorType, DtorType, FunctionKind,
    GlobalDecl, TypeKind, TypeRef,
};
use crate::kinds::{ArgumentKind, ClangCallingConventionKind, LlvmCallingConventionKind};

bitflags! {
    /// Function-level facts of an arrangement
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ArrangedFunctionFlags: u16 {
        const IS_INSTANCE_METHOD = 1 << 0;
        const IS_CHAIN_CALL = 1 << 1;
        const IS_NO_RETURN = 1 << 2;
        const IS_RETURNS_RETAINED = 1 << 3;
        const IS_NO_CALLER_SAVED_REGS = 1 << 4;
        const HAS_REG_PARM = 1 << 5;
        const IS_NO_CF_CHECK = 1 << 6;
        const IS_VARIADIC = 1 << 7;
        const USES_IN_ALLOCA = 1 << 8;
        const HAS_EXTENDED_PARAMETER_INFO = 1 << 9;
    }
}

bitflags! {
    /// Per-argument facts. Each flag is only ever set for the kinds
    /// [`ArgumentFlags::valid_for`] allows.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ArgumentFlags: u16 {
        const HAS_COERCE_TO_TYPE_TYPE = 1 << 0;
        const HAS_PADDING_TYPE = 1 << 1;
        const HAS_UNPADDED_COERCE_AND_EXPAND_TYPE = 1 << 2;
        const PADDING_IN_REGISTER = 1 << 3;
        const IS_IN_ALLOCA_SRET = 1 << 4;
        const IS_INDIRECT_BY_VAL = 1 << 5;
        const IS_INDIRECT_REALIGN = 1 << 6;
        const IS_SRET_AFTER_THIS = 1 << 7;
        const IS_IN_REGISTER = 1 << 8;
        const CAN_BE_FLATTENED = 1 << 9;
        const IS_SIGN_EXTENDED = 1 << 10;
    }
}

impl ArgumentFlags {
    /// Flags that may appear on an argument of `kind`
    pub const fn valid_for(kind: ArgumentKind) -> Self {
        use ArgumentKind::*;

        let coerce = matches!(kind, Direct | Extend | CoerceAndExpand);
        let padding = matches!(kind, Direct | Extend | Indirect | Expand);

        let mut bits = 0;
        if coerce {
            bits |= Self::HAS_COERCE_TO_TYPE_TYPE.bits();
        }
        if padding {
            bits |= Self::HAS_PADDING_TYPE.bits() | Self::PADDING_IN_REGISTER.bits();
        }
        if matches!(kind, CoerceAndExpand) {
            bits |= Self::HAS_UNPADDED_COERCE_AND_EXPAND_TYPE.bits();
        }
        if matches!(kind, InAlloca) {
            bits |= Self::IS_IN_ALLOCA_SRET.bits();
        }
        if matches!(kind, Indirect) {
            bits |= Self::IS_INDIRECT_BY_VAL.bits() | Self::IS_SRET_AFTER_THIS.bits();
        }
        if matches!(kind, Indirect | IndirectAliased) {
            bits |= Self::IS_INDIRECT_REALIGN.bits();
        }
        if matches!(kind, Direct | Extend | Indirect) {
            bits |= Self::IS_IN_REGISTER.bits();
        }
        if matches!(kind, Direct) {
            bits |= Self::CAN_BE_FLATTENED.bits();
        }
        if matches!(kind, Extend) {
            bits |= Self::IS_SIGN_EXTENDED.bits();
        }
        Self::from_bits_retain(bits)
    }
}

/// How one argument (or the return value) is passed.
///
/// `extra` holds the direct offset for Direct/Extend, the indirect alignment in
/// bytes for Indirect/IndirectAliased and the alloca field index for InAlloca.
/// `extra2` holds the address space for IndirectAliased. Both are 0 otherwise.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentInfo {
    pub ty: TypeRef,
    pub kind: ArgumentKind,
    pub flags: ArgumentFlags,
    pub extra: u32,
    pub extra2: u32,
}

impl ArgumentInfo {
    pub fn classify(ty: TypeRef, info: &AbiArgInfo) -> Self {
        let kind = ArgumentKind::from(info.kind);
        let mut flags = ArgumentFlags::empty();

        let can_have_padding = matches!(
            info.kind,
            AbiArgKind::Direct | AbiArgKind::Extend | AbiArgKind::Indirect | AbiArgKind::Expand
        );
        let can_have_coerce = matches!(
            info.kind,
            AbiArgKind::Direct | AbiArgKind::Extend | AbiArgKind::CoerceAndExpand
        );

        flags.set(ArgumentFlags::HAS_COERCE_TO_TYPE_TYPE, can_have_coerce && info.has_coerce_to_type);
        if can_have_padding && info.has_padding_type {
            flags.insert(ArgumentFlags::HAS_PADDING_TYPE);
            flags.set(ArgumentFlags::PADDING_IN_REGISTER, info.padding_in_reg);
        }

        let (extra, extra2) = match info.kind {
            AbiArgKind::Direct => {
                flags.set(ArgumentFlags::IS_IN_REGISTER, info.in_reg);
                flags.set(ArgumentFlags::CAN_BE_FLATTENED, info.can_be_flattened);
                (info.direct_offset, 0)
            }
            AbiArgKind::Extend => {
                flags.set(ArgumentFlags::IS_IN_REGISTER, info.in_reg);
                flags.set(ArgumentFlags::IS_SIGN_EXTENDED, info.sign_ext);
                (info.direct_offset, 0)
            }
            AbiArgKind::Indirect => {
                flags.set(ArgumentFlags::IS_IN_REGISTER, info.in_reg);
                flags.set(ArgumentFlags::IS_INDIRECT_BY_VAL, info.indirect_by_val);
                flags.set(ArgumentFlags::IS_INDIRECT_REALIGN, info.indirect_realign);
                flags.set(ArgumentFlags::IS_SRET_AFTER_THIS, info.sret_after_this);
                (info.indirect_align, 0)
            }
            AbiArgKind::IndirectAliased => {
                flags.set(ArgumentFlags::IS_INDIRECT_REALIGN, info.indirect_realign);
                (info.indirect_align, info.indirect_addr_space)
            }
            AbiArgKind::CoerceAndExpand => {
                flags.set(
                    ArgumentFlags::HAS_UNPADDED_COERCE_AND_EXPAND_TYPE,
                    info.has_unpadded_coerce_and_expand_type,
                );
                (0, 0)
            }
            AbiArgKind::InAlloca => {
                flags.set(ArgumentFlags::IS_IN_ALLOCA_SRET, info.in_alloca_sret);
                (info.alloca_field_index, 0)
            }
            AbiArgKind::Ignore | AbiArgKind::Expand => (0, 0),
        };

        debug_assert!(
            ArgumentFlags::valid_for(kind).contains(flags),
            "{flags:?} not valid for {kind:?}"
        );

        Self {
            ty,
            kind,
            flags,
            extra,
            extra2,
        }
    }

    pub fn direct_offset(&self) -> Option<u32> {
        matches!(self.kind, ArgumentKind::Direct | ArgumentKind::Extend).then_some(self.extra)
    }

    pub fn indirect_alignment(&self) -> Option<u32> {
        matches!(self.kind, ArgumentKind::Indirect | ArgumentKind::IndirectAliased).then_some(self.extra)
    }

    pub fn alloca_field_index(&self) -> Option<u32> {
        matches!(self.kind, ArgumentKind::InAlloca).then_some(self.extra)
    }

    pub fn indirect_address_space(&self) -> Option<u32> {
        matches!(self.kind, ArgumentKind::IndirectAliased).then_some(self.extra2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrangedFunction {
    pub calling_convention: LlvmCallingConventionKind,
    pub effective_calling_convention: LlvmCallingConventionKind,
    pub ast_calling_convention: ClangCallingConventionKind,
    pub flags: ArrangedFunctionFlags,
    pub required_argument_count: u32,
    pub arguments_passed_in_register_count: u32,
    pub return_info: ArgumentInfo,
    pub arguments: Vec<ArgumentInfo>,
}

impl ArrangedFunction {
    pub fn from_function_info(info: &CgFunctionInfo) -> Result<Self> {
        let calling_convention = LlvmCallingConventionKind::from_id(info.calling_convention)
            .ok_or(Error::UnknownCallingConvention(info.calling_convention))?;
        let effective_calling_convention = LlvmCallingConventionKind::from_id(info.effective_calling_convention)
            .ok_or(Error::UnknownCallingConvention(info.effective_calling_convention))?;

        let mut flags = ArrangedFunctionFlags::empty();
        flags.set(ArrangedFunctionFlags::IS_INSTANCE_METHOD, info.is_instance_method);
        flags.set(ArrangedFunctionFlags::IS_CHAIN_CALL, info.is_chain_call);
        flags.set(ArrangedFunctionFlags::IS_NO_RETURN, info.is_no_return);
        flags.set(ArrangedFunctionFlags::IS_RETURNS_RETAINED, info.is_returns_retained);
        flags.set(ArrangedFunctionFlags::IS_NO_CALLER_SAVED_REGS, info.is_no_caller_saved_regs);
        flags.set(ArrangedFunctionFlags::HAS_REG_PARM, info.has_reg_parm);
        flags.set(ArrangedFunctionFlags::IS_NO_CF_CHECK, info.is_no_cf_check);
        flags.set(ArrangedFunctionFlags::IS_VARIADIC, info.is_variadic);
        flags.set(ArrangedFunctionFlags::USES_IN_ALLOCA, info.uses_in_alloca);
        flags.set(ArrangedFunctionFlags::HAS_EXTENDED_PARAMETER_INFO, info.has_extended_parameter_info);

        let arguments: Vec<ArgumentInfo> = info
            .arguments
            .iter()
            .map(|arg| ArgumentInfo::classify(arg.ty, &arg.info))
            .collect();
        for (index, argument) in arguments.iter().enumerate() {
            trace!(index, kind = ?argument.kind, flags = ?argument.flags, "arranged argument");
        }

        Ok(Self {
            calling_convention,
            effective_calling_convention,
            ast_calling_convention: ClangCallingConventionKind::from(info.ast_calling_convention),
            flags,
            required_argument_count: info.required_args,
            arguments_passed_in_register_count: info.reg_parm,
            return_info: ArgumentInfo::classify(info.return_type, &info.return_info),
            arguments,
        })
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }
}

/// Arranges a call to the function declaration `cursor` names.
///
/// Constructors and destructors are arranged as their complete-object variant.
pub fn arrange_function<U: AstContext + CodeGenTypes + ?Sized>(unit: &U, cursor: Cursor) -> Result<ArrangedFunction> {
    let Some((id, decl)) = unit.cursor_declaration(cursor) else {
        debug!(?cursor, "arrangement requested for a non-declaration");
        return Err(Error::NotAFunction);
    };
    let Some(function) = decl.as_function() else {
        debug!(name = %decl.name, "arrangement requested for a non-function");
        return Err(Error::NotAFunction);
    };

    let global = match function.kind {
        FunctionKind::Constructor => GlobalDecl::Constructor(id, CtorType::Complete),
        FunctionKind::Destructor => GlobalDecl::Destructor(id, DtorType::Complete),
        FunctionKind::Free | FunctionKind::Method => GlobalDecl::Function(id),
    };

    let Some(info) = unit.arrange_global_declaration(global) else {
        error!(name = %decl.name, "front-end produced no arrangement for a function");
        debug_assert!(false, "no arrangement for function `{}`", decl.name);
        return Err(Error::NoArrangement(decl.name.clone()));
    };
    ArrangedFunction::from_function_info(info)
}

/// Arranges a call through a pointer to a function of type `ty`
pub fn arrange_function_pointer<U: AstContext + CodeGenTypes + ?Sized>(unit: &U, ty: TypeRef) -> Result<ArrangedFunction> {
    if ty.is_null() {
        debug!("arrangement requested for a null type");
        return Err(Error::NullType);
    }
    let Some(node) = unit.type_node(ty) else {
        return Err(Error::NullType);
    };
    if !matches!(node.kind, TypeKind::FunctionProto(_)) {
        debug!(ty = %node.spelling, "arrangement requested for a non-prototype type");
        return Err(Error::NotAFunctionPrototype(ty));
    }

    let Some(info) = unit.arrange_free_function_type(ty) else {
        error!(ty = %node.spelling, "front-end produced no arrangement for a prototype");
        debug_assert!(false, "no arrangement for prototype `{}`", node.spelling);
        return Err(Error::NoArrangement(node.spelling.clone()));
    };
    ArrangedFunction::from_function_info(info)
}
