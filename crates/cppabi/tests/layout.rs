//! Record layouts through the Rust API and the C API

use std::collections::HashMap;
use std::ffi::CStr;

use cppabi::ffi::layout::{cppabi_dispose_record_layout, cppabi_get_record_layout};
use cppabi::ffi::{cppabi_dispose_translation_unit, translation_unit_into_raw};
use cppabi::frontend::{
    AstContext, AstRecordLayout, BaseSpecifier, Cursor, CxxRecord, DeclId, MemoryUnit, TagKind, TargetInfo, VBaseInfo,
    VTableComponent,
};
use cppabi::kinds::{RecordFieldKind, VTableEntryKind};
use cppabi::{Error, record_layout};

fn cxx(is_dynamic: bool) -> Option<CxxRecord> {
    Some(CxxRecord {
        is_dynamic,
        ..Default::default()
    })
}

/// `struct Derived : virtual Base { int x; }` as the Microsoft ABI lays it out:
/// vfptr at 0, vbptr at 8, `x` at 16, vtordisp at 20, `Base` at 24
fn microsoft_virtual_inheritance(unit: &mut MemoryUnit) -> (DeclId, DeclId) {
    let int = unit.builtin("int");
    let base = unit.add_record("Base", TagKind::Struct, cxx(true));
    unit.add_vftable(base, 0, vec![VTableComponent::Rtti(base)]);
    unit.set_record_layout(
        base,
        AstRecordLayout {
            size: 8,
            alignment: 8,
            non_virtual_size: 8,
            non_virtual_alignment: 8,
            has_own_vfptr: true,
            ..Default::default()
        },
    );

    let derived = unit.add_record("Derived", TagKind::Struct, cxx(true));
    unit.add_base(derived, base, true);
    unit.add_virtual_base(derived, base);
    unit.add_field(derived, "x", int, None);
    unit.add_vftable(derived, 0, vec![VTableComponent::Rtti(derived)]);
    unit.add_vftable(derived, 24, vec![VTableComponent::Rtti(derived), VTableComponent::FunctionPointer(derived)]);
    unit.set_record_layout(
        derived,
        AstRecordLayout {
            size: 32,
            alignment: 8,
            non_virtual_size: 24,
            non_virtual_alignment: 8,
            has_own_vfptr: true,
            has_own_vbptr: true,
            vbptr_offset: 8,
            field_offsets: vec![128],
            vbase_offsets: HashMap::from([(
                base,
                VBaseInfo {
                    offset: 24,
                    has_vtordisp: true,
                },
            )]),
            ..Default::default()
        },
    );
    (base, derived)
}

// =============================================================================
// Rust API
// =============================================================================

#[test]
fn test_microsoft_virtual_inheritance_slot_order() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_windows());
    let (base, derived) = microsoft_virtual_inheritance(&mut unit);

    let layout = record_layout(&unit, Cursor::declaration(derived)).unwrap();
    let slots: Vec<_> = layout.slots.iter().map(|s| (s.kind, s.offset, s.name.as_ref())).collect();
    assert_eq!(
        slots,
        [
            (RecordFieldKind::VTablePtr, 0, "vftable_pointer"),
            (RecordFieldKind::VirtualBaseTablePtr, 8, "vbtable_pointer"),
            (RecordFieldKind::Normal, 16, "x"),
            (RecordFieldKind::VTorDisp, 20, "vtordisp"),
            (RecordFieldKind::VirtualBase, 24, "virtual_base"),
        ]
    );
    assert_eq!(layout.slot("vtordisp").unwrap().ty, unit.record_type(base));
    assert_eq!(layout.slot("vbtable_pointer").unwrap().ty, unit.void_pointer_type());
    assert_eq!(layout.non_virtual_size, 24);

    assert_eq!(layout.vtables.len(), 2);
    assert_eq!(layout.vtables[1].entries[1].kind, VTableEntryKind::FunctionPointer);
    assert_eq!(layout.vtables[1].entries[1].method_declaration, Cursor::declaration(derived));
}

#[test]
fn test_offsets_never_decrease() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_windows());
    let (_, derived) = microsoft_virtual_inheritance(&mut unit);

    let layout = record_layout(&unit, Cursor::declaration(derived)).unwrap();
    assert!(layout.slots.windows(2).all(|pair| pair[0].offset <= pair[1].offset));
}

#[test]
fn test_fields_keep_declaration_order_for_increasing_offsets() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
    let int = unit.builtin("int");
    let record = unit.add_record("Rgb", TagKind::Struct, None);
    for name in ["r", "g", "b"] {
        unit.add_field(record, name, int, None);
    }
    unit.set_record_layout(
        record,
        AstRecordLayout {
            size: 12,
            alignment: 4,
            field_offsets: vec![0, 32, 64],
            ..Default::default()
        },
    );

    let layout = record_layout(&unit, Cursor::declaration(record)).unwrap();
    let names: Vec<_> = layout.slots.iter().map(|s| s.name.as_ref()).collect();
    assert_eq!(names, ["r", "g", "b"]);
    assert!(layout.slots.iter().all(|s| !s.field_declaration.is_null()));
}

#[test]
fn test_union_members_share_offset_zero() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
    let int = unit.builtin("int");
    let float = unit.builtin("float");
    let record = unit.add_record("Bits", TagKind::Union, None);
    unit.add_field(record, "i", int, None);
    unit.add_field(record, "f", float, None);
    unit.set_record_layout(
        record,
        AstRecordLayout {
            size: 4,
            alignment: 4,
            field_offsets: vec![0, 0],
            ..Default::default()
        },
    );

    let layout = record_layout(&unit, Cursor::declaration(record)).unwrap();
    let names: Vec<_> = layout.slots.iter().map(|s| (s.name.as_ref(), s.offset)).collect();
    assert_eq!(names, [("i", 0), ("f", 0)]);
}

#[test]
fn test_forward_declaration_resolves_to_definition() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
    let int = unit.builtin("int");
    let record = unit.add_record("Node", TagKind::Struct, None);
    unit.add_field(record, "value", int, None);
    unit.set_record_layout(
        record,
        AstRecordLayout {
            size: 4,
            alignment: 4,
            field_offsets: vec![0],
            ..Default::default()
        },
    );
    let forward = unit.add_forward_declaration("Node", TagKind::Struct, Some(record));

    let layout = record_layout(&unit, Cursor::declaration(forward)).unwrap();
    assert_eq!(layout.size, 4);
    assert_eq!(layout.slots[0].name, "value");
}

#[test]
fn test_forward_declaration_without_definition_has_no_layout() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
    let forward = unit.add_forward_declaration("Opaque", TagKind::Struct, None);

    let error = record_layout(&unit, Cursor::declaration(forward)).unwrap_err();
    assert_eq!(error, Error::IncompleteRecord("Opaque".to_string()));
}

#[test]
fn test_dependent_base_is_rejected() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
    let dependent = unit.dependent_type("T");
    let record = unit.add_record("Holder", TagKind::Struct, cxx(false));
    if let Some(cxx) = unit.record_mut(record).and_then(|r| r.cxx.as_mut()) {
        cxx.bases.push(BaseSpecifier {
            ty: dependent,
            is_virtual: false,
        });
    }
    unit.set_record_layout(record, AstRecordLayout::default());

    let error = record_layout(&unit, Cursor::declaration(record)).unwrap_err();
    assert!(matches!(error, Error::DependentBase { base, .. } if base == "T"));
}

// =============================================================================
// C API
// =============================================================================

#[test]
fn test_c_layout_matches_rust_layout() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_windows());
    let (_, derived) = microsoft_virtual_inheritance(&mut unit);
    let expected = record_layout(&unit, Cursor::declaration(derived)).unwrap();
    let handle = translation_unit_into_raw(Box::new(unit));

    unsafe {
        let layout = cppabi_get_record_layout(handle, Cursor::declaration(derived));
        assert!(!layout.is_null());
        assert_eq!((*layout).size, 32);
        assert!((*layout).is_cpp_record);

        let mut field = (*layout).first_field;
        for slot in &expected.slots {
            assert!(!field.is_null());
            assert_eq!((*field).kind, slot.kind);
            assert_eq!((*field).offset, slot.offset);
            assert_eq!(CStr::from_ptr((*field).name).to_str().unwrap(), slot.name);
            field = (*field).next_field;
        }
        assert!(field.is_null());

        let mut vtables = 0;
        let mut vtable = (*layout).first_vtable;
        while !vtable.is_null() {
            assert_eq!((*vtable).entry_count, expected.vtables[vtables].len());
            vtables += 1;
            vtable = (*vtable).next_vtable;
        }
        assert_eq!(vtables, 2);

        cppabi_dispose_record_layout(layout);
        cppabi_dispose_translation_unit(handle);
    }
}

#[test]
fn test_c_forward_declaration_returns_null() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
    let forward = unit.add_forward_declaration("Opaque", TagKind::Class, None);
    let handle = translation_unit_into_raw(Box::new(unit));

    unsafe {
        assert!(cppabi_get_record_layout(handle, Cursor::declaration(forward)).is_null());
        assert!(cppabi_get_record_layout(std::ptr::null(), Cursor::declaration(forward)).is_null());
        cppabi_dispose_record_layout(std::ptr::null_mut());
        cppabi_dispose_translation_unit(handle);
    }
}
