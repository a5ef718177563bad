//! C++ interop tests for cppabi
//!
//! This crate checks that the flat structs behind the C API have the same
//! size and field offsets when a C++ compiler lays out hand-written mirrors
//! of them, and that C++ can walk the linked lists the C API hands out.
//! Requires a C++ compiler to build and run.
//!
//! Run with: `cargo test -p cppabi-cpp-tests`

#![recursion_limit = "512"]

use cpp::cpp;
use cppabi::ffi::CppAbiTypeSizes;
#[cfg(test)]
use cppabi::ffi::{CppAbiMacroInformation, CppAbiRecordLayout};

#[cfg(test)]
mod layouts;
#[cfg(test)]
mod sizes;

// =============================================================================
// C++ mirrors of the flat structs
// =============================================================================

cpp! {{
    #include <cstddef>
    #include <cstdint>
    #include <cstring>

    struct CppAbiCursor {
        int32_t kind;
        uint32_t index;
    };

    struct CppAbiSourceLocation {
        uint32_t file;
        uint32_t line;
        uint32_t column;
    };

    typedef uint32_t CppAbiType;

    struct CppAbiRecordField {
        int32_t kind;
        int64_t offset;
        CppAbiRecordField* next_field;
        char* name;
        CppAbiType type;
        CppAbiCursor field_declaration;
        bool is_bit_field;
        uint32_t bit_field_start;
        uint32_t bit_field_width;
        bool is_primary_base;
    };

    struct CppAbiVTableEntry {
        int32_t kind;
        CppAbiCursor method_declaration;
        CppAbiCursor rtti_type;
        int64_t offset;
    };

    struct CppAbiVTable {
        size_t entry_count;
        CppAbiVTableEntry* entries;
        CppAbiVTable* next_vtable;
    };

    struct CppAbiRecordLayout {
        CppAbiRecordField* first_field;
        CppAbiVTable* first_vtable;
        int64_t size;
        int64_t alignment;
        bool is_cpp_record;
        int64_t non_virtual_size;
        int64_t non_virtual_alignment;
    };

    struct CppAbiOperatorOverloadInfo {
        int32_t kind;
        const char* name;
        const char* spelling;
        bool is_unary;
        bool is_binary;
        bool is_member_only;
    };

    struct CppAbiConstantString {
        uint64_t size_bytes;
        uint8_t first_byte;
    };

    struct CppAbiConstantValueInfo {
        bool has_side_effects;
        bool has_undefined_behavior;
        int32_t kind;
        int32_t sub_kind;
        uint64_t value;
    };

    struct CppAbiMacroInformation {
        const char* name;
        uint64_t name_length;
        CppAbiSourceLocation location;
        bool was_undefined;
        bool is_function_like;
        bool is_builtin_macro;
        bool has_comma_pasting;
        int32_t variadic_kind;
        int32_t parameter_count;
        const char* const* parameter_names;
        const uint64_t* parameter_name_lengths;
    };

    struct CppAbiTemplateInstantiationMetrics {
        uint64_t total_specializations_count;
        uint64_t partial_specializations_count;
        uint64_t successful_instantiations_count;
        uint64_t failed_instantiations_count;
    };

    struct CppAbiArgumentInfo {
        CppAbiType type;
        uint8_t kind;
        uint16_t flags;
        uint32_t extra;
        uint32_t extra2;
    };

    struct CppAbiArrangedFunction {
        uint8_t calling_convention;
        uint8_t effective_calling_convention;
        uint8_t ast_calling_convention;
        uint16_t flags;
        uint32_t required_argument_count;
        uint32_t arguments_passed_in_register_count;
        uint32_t argument_count;
        CppAbiArgumentInfo return_info;
    };

    struct CppAbiTypeSizes {
        int32_t type_sizes;
        int32_t record_layout;
        int32_t record_field;
        int32_t vtable;
        int32_t vtable_entry;
        int32_t operator_overload_info;
        int32_t constant_string;
        int32_t constant_value_info;
        int32_t macro_information;
        int32_t template_instantiation_metrics;
        int32_t argument_info;
        int32_t arranged_function;
    };
}}

// =============================================================================
// C++ helper functions
// =============================================================================

/// Sizes as the C++ compiler computes them
pub fn cpp_type_sizes() -> CppAbiTypeSizes {
    let mut sizes = CppAbiTypeSizes::default();
    let out = &mut sizes as *mut CppAbiTypeSizes;
    cpp!(unsafe [out as "CppAbiTypeSizes*"] {
        out->type_sizes = sizeof(CppAbiTypeSizes);
        out->record_layout = sizeof(CppAbiRecordLayout);
        out->record_field = sizeof(CppAbiRecordField);
        out->vtable = sizeof(CppAbiVTable);
        out->vtable_entry = sizeof(CppAbiVTableEntry);
        out->operator_overload_info = sizeof(CppAbiOperatorOverloadInfo);
        out->constant_string = sizeof(CppAbiConstantString);
        out->constant_value_info = sizeof(CppAbiConstantValueInfo);
        out->macro_information = sizeof(CppAbiMacroInformation);
        out->template_instantiation_metrics = sizeof(CppAbiTemplateInstantiationMetrics);
        out->argument_info = sizeof(CppAbiArgumentInfo);
        out->arranged_function = sizeof(CppAbiArrangedFunction);
    });
    sizes
}

#[cfg(test)]
fn cpp_record_field_offsets() -> [usize; 5] {
    let mut offsets = [0usize; 5];
    let out = offsets.as_mut_ptr();
    cpp!(unsafe [out as "size_t*"] {
        out[0] = offsetof(CppAbiRecordField, offset);
        out[1] = offsetof(CppAbiRecordField, type);
        out[2] = offsetof(CppAbiRecordField, field_declaration);
        out[3] = offsetof(CppAbiRecordField, bit_field_start);
        out[4] = offsetof(CppAbiRecordField, is_primary_base);
    });
    offsets
}

#[cfg(test)]
fn cpp_constant_value_offsets() -> [usize; 3] {
    let mut offsets = [0usize; 3];
    let out = offsets.as_mut_ptr();
    cpp!(unsafe [out as "size_t*"] {
        out[0] = offsetof(CppAbiConstantValueInfo, kind);
        out[1] = offsetof(CppAbiConstantValueInfo, sub_kind);
        out[2] = offsetof(CppAbiConstantValueInfo, value);
    });
    offsets
}

#[cfg(test)]
fn cpp_macro_information_offsets() -> [usize; 4] {
    let mut offsets = [0usize; 4];
    let out = offsets.as_mut_ptr();
    cpp!(unsafe [out as "size_t*"] {
        out[0] = offsetof(CppAbiMacroInformation, location);
        out[1] = offsetof(CppAbiMacroInformation, was_undefined);
        out[2] = offsetof(CppAbiMacroInformation, variadic_kind);
        out[3] = offsetof(CppAbiMacroInformation, parameter_names);
    });
    offsets
}

#[cfg(test)]
fn cpp_arranged_function_offsets() -> [usize; 3] {
    let mut offsets = [0usize; 3];
    let out = offsets.as_mut_ptr();
    cpp!(unsafe [out as "size_t*"] {
        out[0] = offsetof(CppAbiArrangedFunction, flags);
        out[1] = offsetof(CppAbiArrangedFunction, argument_count);
        out[2] = offsetof(CppAbiArrangedFunction, return_info);
    });
    offsets
}

/// Number of slots C++ finds walking the field list
#[cfg(test)]
fn cpp_count_fields(layout: *const CppAbiRecordLayout) -> i32 {
    cpp!(unsafe [layout as "const CppAbiRecordLayout*"] -> i32 as "int32_t" {
        int32_t count = 0;
        for (const CppAbiRecordField* field = layout->first_field; field; field = field->next_field) {
            count++;
        }
        return count;
    })
}

/// Offset of the slot named `name`, or -1
#[cfg(test)]
fn cpp_field_offset(layout: *const CppAbiRecordLayout, name: &std::ffi::CStr) -> i64 {
    let name = name.as_ptr();
    cpp!(unsafe [layout as "const CppAbiRecordLayout*", name as "const char*"] -> i64 as "int64_t" {
        for (const CppAbiRecordField* field = layout->first_field; field; field = field->next_field) {
            if (std::strcmp(field->name, name) == 0) {
                return field->offset;
            }
        }
        return -1;
    })
}

/// Total entries over every v-table in the layout
#[cfg(test)]
fn cpp_count_vtable_entries(layout: *const CppAbiRecordLayout) -> u64 {
    cpp!(unsafe [layout as "const CppAbiRecordLayout*"] -> u64 as "uint64_t" {
        uint64_t count = 0;
        for (const CppAbiVTable* vtable = layout->first_vtable; vtable; vtable = vtable->next_vtable) {
            count += vtable->entry_count;
        }
        return count;
    })
}

/// Sum of the parameter name lengths C++ reads from a macro callback
#[cfg(test)]
fn cpp_macro_parameter_bytes(info: *const CppAbiMacroInformation) -> u64 {
    cpp!(unsafe [info as "const CppAbiMacroInformation*"] -> u64 as "uint64_t" {
        uint64_t total = 0;
        for (int32_t i = 0; i < info->parameter_count; i++) {
            total += info->parameter_name_lengths[i];
        }
        return total;
    })
}
