//! Struct size and offset agreement between Rust and C++

use super::*;
use cppabi::ffi::{CppAbiArrangedFunction, CppAbiConstantValueInfo, CppAbiRecordField, cppabi_get_type_sizes};
use std::mem::{offset_of, size_of};

fn rust_type_sizes() -> CppAbiTypeSizes {
    let mut sizes = CppAbiTypeSizes {
        type_sizes: size_of::<CppAbiTypeSizes>() as i32,
        ..Default::default()
    };
    assert!(unsafe { cppabi_get_type_sizes(&mut sizes) });
    sizes
}

/// Test every flat struct has the same size on both sides
#[test]
fn test_type_sizes_match() {
    assert_eq!(rust_type_sizes(), cpp_type_sizes());
}

/// Test a mismatched header is refused
#[test]
fn test_stale_header_is_rejected() {
    let mut sizes = cpp_type_sizes();
    sizes.type_sizes -= 4;
    assert!(!unsafe { cppabi_get_type_sizes(&mut sizes) });
}

#[test]
fn test_record_field_offsets_match() {
    let rust = [
        offset_of!(CppAbiRecordField, offset),
        offset_of!(CppAbiRecordField, ty),
        offset_of!(CppAbiRecordField, field_declaration),
        offset_of!(CppAbiRecordField, bit_field_start),
        offset_of!(CppAbiRecordField, is_primary_base),
    ];
    assert_eq!(rust, cpp_record_field_offsets());
}

#[test]
fn test_constant_value_offsets_match() {
    let rust = [
        offset_of!(CppAbiConstantValueInfo, kind),
        offset_of!(CppAbiConstantValueInfo, sub_kind),
        offset_of!(CppAbiConstantValueInfo, value),
    ];
    assert_eq!(rust, cpp_constant_value_offsets());
}

#[test]
fn test_macro_information_offsets_match() {
    let rust = [
        offset_of!(CppAbiMacroInformation, location),
        offset_of!(CppAbiMacroInformation, was_undefined),
        offset_of!(CppAbiMacroInformation, variadic_kind),
        offset_of!(CppAbiMacroInformation, parameter_names),
    ];
    assert_eq!(rust, cpp_macro_information_offsets());
}

/// Test the packed header: three one-byte kinds then 16-bit flags
#[test]
fn test_arranged_function_offsets_match() {
    let rust = [
        offset_of!(CppAbiArrangedFunction, flags),
        offset_of!(CppAbiArrangedFunction, argument_count),
        offset_of!(CppAbiArrangedFunction, return_info),
    ];
    assert_eq!(rust, cpp_arranged_function_offsets());
}
