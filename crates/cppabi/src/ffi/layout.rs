//! Record layouts across the C boundary
//!
//! ```text
//! CppAbiRecordLayout
//!   first_field ──> CppAbiRecordField ──> CppAbiRecordField ──> null
//!   first_vtable ─> CppAbiVTable ──────> CppAbiVTable ──────> null
//!                     entries[entry_count]
//! ```

use std::ffi::c_char;
use std::ptr;

use tracing::debug;

use super::{CppAbiTranslationUnit, into_c_string, unit_ref};
use crate::frontend::{Cursor, TypeRef};
use crate::kinds::RecordFieldKind;
use crate::record_layout::{LayoutSlot, RecordLayout, record_layout};
use crate::vtable::{VTableEntry, VTableLayout};

#[repr(C)]
pub struct CppAbiRecordField {
    pub kind: RecordFieldKind,
    pub offset: i64,
    pub next_field: *mut CppAbiRecordField,
    pub name: *mut c_char,
    /// Field type for `Normal`, base type for the base kinds and `VTorDisp`,
    /// `void**` for `VTablePtr`, `void*` for `VirtualBaseTablePtr`
    pub ty: TypeRef,
    /// Only relevant when `kind == Normal`
    pub field_declaration: Cursor,
    pub is_bit_field: bool,
    /// Only relevant when `is_bit_field`
    pub bit_field_start: u32,
    pub bit_field_width: u32,
    /// Only relevant for `NonVirtualBase` and `VirtualBase`
    pub is_primary_base: bool,
}

#[repr(C)]
pub struct CppAbiVTable {
    pub entry_count: usize,
    pub entries: *mut VTableEntry,
    pub next_vtable: *mut CppAbiVTable,
}

#[repr(C)]
pub struct CppAbiRecordLayout {
    pub first_field: *mut CppAbiRecordField,
    pub first_vtable: *mut CppAbiVTable,
    pub size: i64,
    pub alignment: i64,
    pub is_cpp_record: bool,
    /// C++ records only
    pub non_virtual_size: i64,
    pub non_virtual_alignment: i64,
}

impl CppAbiRecordField {
    fn from_slot(slot: &LayoutSlot, next_field: *mut CppAbiRecordField) -> Self {
        Self {
            kind: slot.kind,
            offset: slot.offset,
            next_field,
            name: into_c_string(&slot.name),
            ty: slot.ty,
            field_declaration: slot.field_declaration,
            is_bit_field: slot.is_bit_field,
            bit_field_start: slot.bit_field_start,
            bit_field_width: slot.bit_field_width,
            is_primary_base: slot.is_primary_base,
        }
    }
}

impl CppAbiVTable {
    fn from_layout(layout: &VTableLayout, next_vtable: *mut CppAbiVTable) -> Self {
        let entries: Box<[VTableEntry]> = layout.entries.clone().into_boxed_slice();
        Self {
            entry_count: entries.len(),
            entries: Box::into_raw(entries).cast(),
            next_vtable,
        }
    }
}

impl CppAbiRecordLayout {
    /// Copies `layout` into the linked C representation
    pub fn into_raw(layout: &RecordLayout) -> *mut CppAbiRecordLayout {
        // Build both chains back to front so each node links to the one after it
        let first_field = layout.slots.iter().rev().fold(ptr::null_mut(), |next, slot| {
            Box::into_raw(Box::new(CppAbiRecordField::from_slot(slot, next)))
        });
        let first_vtable = layout.vtables.iter().rev().fold(ptr::null_mut(), |next, table| {
            Box::into_raw(Box::new(CppAbiVTable::from_layout(table, next)))
        });

        Box::into_raw(Box::new(CppAbiRecordLayout {
            first_field,
            first_vtable,
            size: layout.size,
            alignment: layout.alignment,
            is_cpp_record: layout.is_cpp_record,
            non_virtual_size: layout.non_virtual_size,
            non_virtual_alignment: layout.non_virtual_alignment,
        }))
    }
}

/// Get the flattened layout of a record
///
/// # Arguments
/// * `unit` - Translation unit the cursor belongs to
/// * `cursor` - A record declaration (forward declarations resolve to the definition)
///
/// # Returns
/// * A layout to release with `cppabi_dispose_record_layout`, or null when the
///   record has no layout
///
/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_get_record_layout(
    unit: *const CppAbiTranslationUnit,
    cursor: Cursor,
) -> *mut CppAbiRecordLayout {
    // SAFETY: forwarded from the caller
    let Some(unit) = (unsafe { unit_ref(unit) }) else {
        return ptr::null_mut();
    };
    match record_layout(unit, cursor) {
        Ok(layout) => CppAbiRecordLayout::into_raw(&layout),
        Err(error) => {
            debug!(%error, "no record layout");
            ptr::null_mut()
        }
    }
}

/// Free a record layout, its fields, their names and its v-tables
///
/// # Safety
/// `layout` must be null or a layout returned by `cppabi_get_record_layout`
/// that has not been disposed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_dispose_record_layout(layout: *mut CppAbiRecordLayout) {
    if layout.is_null() {
        return;
    }
    // SAFETY: every pointer below was produced by `Box::into_raw` or
    // `CString::into_raw` in `CppAbiRecordLayout::into_raw`
    unsafe {
        let layout = Box::from_raw(layout);

        let mut field = layout.first_field;
        while !field.is_null() {
            let node = Box::from_raw(field);
            super::cppabi_dispose_string(node.name);
            field = node.next_field;
        }

        let mut vtable = layout.first_vtable;
        while !vtable.is_null() {
            let node = Box::from_raw(vtable);
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(node.entries, node.entry_count)));
            vtable = node.next_vtable;
        }
    }
}
