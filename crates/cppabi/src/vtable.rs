//! V-table extraction
//!
//! Serializes the front-end's v-table component streams. The Itanium ABI gives a
//! dynamic class one table; the Microsoft ABI gives it one table per vfptr,
//! keyed by the vfptr's offset in the most derived class.

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::frontend::{AstContext, Cursor, DeclId, VTableComponent, VTableContext};
use crate::kinds::VTableEntryKind;

/// One v-table component. Only the field matching `kind` is meaningful:
/// `offset` for the offset kinds, `rtti_type` for RTTI, `method_declaration`
/// for the pointer kinds.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VTableEntry {
    pub kind: VTableEntryKind,
    pub method_declaration: Cursor,
    pub rtti_type: Cursor,
    pub offset: i64,
}

impl VTableEntry {
    pub fn from_component(component: &VTableComponent) -> Self {
        let mut entry = Self {
            kind: VTableEntryKind::from(component.kind()),
            method_declaration: Cursor::NULL,
            rtti_type: Cursor::NULL,
            offset: 0,
        };
        match *component {
            VTableComponent::VCallOffset(offset)
            | VTableComponent::VBaseOffset(offset)
            | VTableComponent::OffsetToTop(offset) => entry.offset = offset,
            VTableComponent::Rtti(record) => entry.rtti_type = Cursor::declaration(record),
            VTableComponent::FunctionPointer(method)
            | VTableComponent::CompleteDtorPointer(method)
            | VTableComponent::DeletingDtorPointer(method)
            | VTableComponent::UnusedFunctionPointer(method) => {
                entry.method_declaration = Cursor::declaration(method)
            }
        }
        entry
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VTableLayout {
    pub entries: Vec<VTableEntry>,
}

impl VTableLayout {
    pub fn from_components(components: &[VTableComponent]) -> Self {
        Self {
            entries: components.iter().map(VTableEntry::from_component).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// V-tables of a dynamic record in extraction order.
///
/// The caller decides whether the record is dynamic; asking for a non-dynamic
/// record under Microsoft yields no tables, under Itanium an error.
pub fn vtable_layouts<C: AstContext + ?Sized>(unit: &C, record: DeclId) -> Result<Vec<VTableLayout>> {
    let name = || {
        unit.declaration(record)
            .map(|decl| decl.name.clone())
            .unwrap_or_default()
    };

    let tables = match unit.vtable_context() {
        VTableContext::Itanium(context) => {
            let Some(components) = context.vtable_layout(record) else {
                debug!(record = %name(), "front-end has no Itanium v-table");
                return Err(Error::MissingVTable(name()));
            };
            vec![VTableLayout::from_components(components)]
        }
        VTableContext::Microsoft(context) => {
            let mut tables = Vec::new();
            for vfptr in context.vfptr_offsets(record) {
                let Some(components) = context.vftable_layout(record, vfptr.full_offset_in_mdc) else {
                    debug!(record = %name(), offset = vfptr.full_offset_in_mdc, "front-end has no vftable for vfptr");
                    return Err(Error::MissingVTable(name()));
                };
                tables.push(VTableLayout::from_components(components));
            }
            tables
        }
    };

    for (index, table) in tables.iter().enumerate() {
        trace!(record = %name(), index, entries = table.len(), "extracted v-table");
    }
    Ok(tables)
}

/// Entry point for callers holding a cursor rather than a record id
pub fn vtable_layouts_for<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> Result<Vec<VTableLayout>> {
    let (id, decl) = unit.cursor_declaration(cursor).ok_or(Error::NotADeclaration)?;
    let record = decl.as_record().ok_or_else(|| Error::NotARecord(decl.name.clone()))?;
    let definition = record
        .definition
        .ok_or_else(|| Error::IncompleteRecord(decl.name.clone()))?;
    let is_dynamic = unit
        .declaration(definition)
        .and_then(|def| def.as_record())
        .and_then(|def| def.cxx.as_ref())
        .is_some_and(|cxx| cxx.is_dynamic);
    if !is_dynamic {
        debug!(record = %decl.name, id = id.0, "record is not dynamic");
        return Ok(Vec::new());
    }
    vtable_layouts(unit, definition)
}
