//! Target description, authoritative record layouts and v-table contexts
//!
//! ```text
//!   AstRecordLayout (per record)          VTableContext
//!   ┌──────────────────────────┐          ┌─────────────────────────────┐
//!   │ size / alignment         │          │ Itanium:  record -> [comp]  │
//!   │ nv size / nv alignment   │          │ Microsoft: record -> vfptrs │
//!   │ has own vfptr / vbptr    │          │            (record, offset) │
//!   │ field offsets (bits)     │          │              -> [comp]      │
//!   │ base / vbase offsets     │          └─────────────────────────────┘
//!   └──────────────────────────┘
//! ```

use std::collections::HashMap;

use super::ast::DeclId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CxxAbiKind {
    Itanium,
    Microsoft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetInfo {
    pub cxx_abi: CxxAbiKind,
    /// Bits per `char`
    pub char_width: u32,
    pub pointer_width: u32,
}

impl TargetInfo {
    pub const fn x86_64_linux() -> Self {
        Self {
            cxx_abi: CxxAbiKind::Itanium,
            char_width: 8,
            pointer_width: 64,
        }
    }

    pub const fn x86_64_windows() -> Self {
        Self {
            cxx_abi: CxxAbiKind::Microsoft,
            char_width: 8,
            pointer_width: 64,
        }
    }

    pub const fn is_microsoft(&self) -> bool {
        matches!(self.cxx_abi, CxxAbiKind::Microsoft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VBaseInfo {
    /// Byte offset of the virtual base in the complete object
    pub offset: i64,
    pub has_vtordisp: bool,
}

/// The front-end's layout of one record. All offsets in bytes unless noted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AstRecordLayout {
    pub size: i64,
    pub alignment: i64,
    pub non_virtual_size: i64,
    pub non_virtual_alignment: i64,
    pub primary_base: Option<DeclId>,
    pub has_own_vfptr: bool,
    pub has_own_vbptr: bool,
    pub vbptr_offset: i64,
    /// Field offsets in bits, indexed like the record's field list
    pub field_offsets: Vec<u64>,
    pub base_offsets: HashMap<DeclId, i64>,
    pub vbase_offsets: HashMap<DeclId, VBaseInfo>,
}

/// Kind of one v-table component as the front-end numbers it
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    VCallOffset = 0,
    VBaseOffset,
    OffsetToTop,
    Rtti,
    FunctionPointer,
    CompleteDtorPointer,
    DeletingDtorPointer,
    UnusedFunctionPointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VTableComponent {
    VCallOffset(i64),
    VBaseOffset(i64),
    OffsetToTop(i64),
    Rtti(DeclId),
    FunctionPointer(DeclId),
    CompleteDtorPointer(DeclId),
    DeletingDtorPointer(DeclId),
    UnusedFunctionPointer(DeclId),
}

impl VTableComponent {
    pub const fn kind(&self) -> ComponentKind {
        match self {
            Self::VCallOffset(_) => ComponentKind::VCallOffset,
            Self::VBaseOffset(_) => ComponentKind::VBaseOffset,
            Self::OffsetToTop(_) => ComponentKind::OffsetToTop,
            Self::Rtti(_) => ComponentKind::Rtti,
            Self::FunctionPointer(_) => ComponentKind::FunctionPointer,
            Self::CompleteDtorPointer(_) => ComponentKind::CompleteDtorPointer,
            Self::DeletingDtorPointer(_) => ComponentKind::DeletingDtorPointer,
            Self::UnusedFunctionPointer(_) => ComponentKind::UnusedFunctionPointer,
        }
    }
}

/// One vfptr of a Microsoft-ABI record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VPtrInfo {
    /// Offset of the vfptr within the most derived class
    pub full_offset_in_mdc: i64,
}

pub trait ItaniumVTableContext {
    /// Component stream of the record's single v-table
    fn vtable_layout(&self, record: DeclId) -> Option<&[VTableComponent]>;
}

pub trait MicrosoftVTableContext {
    /// vfptrs of the record in the front-end's order
    fn vfptr_offsets(&self, record: DeclId) -> &[VPtrInfo];

    fn vftable_layout(&self, record: DeclId, full_offset_in_mdc: i64) -> Option<&[VTableComponent]>;
}

/// The v-table context matching the target's C++ ABI
#[derive(Clone, Copy)]
pub enum VTableContext<'a> {
    Itanium(&'a dyn ItaniumVTableContext),
    Microsoft(&'a dyn MicrosoftVTableContext),
}
