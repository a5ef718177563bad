//! C++ walking the lists the C API returns

use super::*;
use cppabi::ffi::layout::{cppabi_dispose_record_layout, cppabi_get_record_layout};
use cppabi::ffi::macros::cppabi_enumerate_macros;
use cppabi::ffi::{cppabi_dispose_translation_unit, translation_unit_into_raw};
use cppabi::frontend::{
    AstRecordLayout, Cursor, CxxRecord, MacroInfo, MemoryUnit, SourceLocation, TagKind, TargetInfo, VTableComponent,
};
use std::ffi::c_void;

/// `class Widget { virtual void draw(); int id; short flags; }` on x86-64 Linux
fn widget_unit() -> (MemoryUnit, Cursor) {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
    let int = unit.builtin("int");
    let short = unit.builtin("short");
    let widget = unit.add_record(
        "Widget",
        TagKind::Class,
        Some(CxxRecord {
            is_dynamic: true,
            ..Default::default()
        }),
    );
    unit.add_field(widget, "id", int, None);
    unit.add_field(widget, "flags", short, None);
    unit.set_record_layout(
        widget,
        AstRecordLayout {
            size: 16,
            alignment: 8,
            non_virtual_size: 16,
            non_virtual_alignment: 8,
            field_offsets: vec![64, 96],
            ..Default::default()
        },
    );
    unit.set_itanium_vtable(
        widget,
        vec![
            VTableComponent::OffsetToTop(0),
            VTableComponent::Rtti(widget),
            VTableComponent::FunctionPointer(widget),
        ],
    );
    (unit, Cursor::declaration(widget))
}

/// Test C++ sees the v-table pointer and both fields in order
#[test]
fn test_cpp_walks_record_layout() {
    let (unit, widget) = widget_unit();
    let handle = translation_unit_into_raw(Box::new(unit));

    unsafe {
        let layout = cppabi_get_record_layout(handle, widget);
        assert!(!layout.is_null());

        assert_eq!(cpp_count_fields(layout), 3);
        assert_eq!(cpp_field_offset(layout, c"id"), 8);
        assert_eq!(cpp_field_offset(layout, c"flags"), 12);
        assert_eq!(cpp_field_offset(layout, c"missing"), -1);
        assert_eq!(cpp_count_vtable_entries(layout), 3);

        cppabi_dispose_record_layout(layout);
        cppabi_dispose_translation_unit(handle);
    }
}

unsafe extern "C" fn sum_parameter_bytes(info: *const CppAbiMacroInformation, user_data: *mut c_void) {
    let total = unsafe { &mut *user_data.cast::<u64>() };
    *total += cpp_macro_parameter_bytes(info);
}

/// Test C++ reads the parameter length array a macro callback receives
#[test]
fn test_cpp_reads_macro_parameters() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
    unit.define_macro(
        "CLAMP",
        MacroInfo {
            location: SourceLocation::new(1, 1, 9),
            params: vec!["value".to_string(), "lo".to_string(), "hi".to_string()],
            is_function_like: true,
            ..Default::default()
        },
    );
    let handle = translation_unit_into_raw(Box::new(unit));

    let mut total = 0u64;
    unsafe {
        cppabi_enumerate_macros(handle, Some(sum_parameter_bytes), (&mut total as *mut u64).cast());
        cppabi_dispose_translation_unit(handle);
    }
    assert_eq!(total, 9);
}
