//! Declaration helpers across the C boundary

use std::ffi::{CStr, c_char};
use std::ptr;

use super::{CppAbiStringSet, CppAbiTranslationUnit, into_c_string, into_string_set, unit_mut, unit_ref};
use crate::decl_info::{
    OPERATOR_TABLE, OperatorOverloadInfo, arg_passing_restrictions, begin_enumerate_declarations_raw,
    enum_constant_value_zero_extended, enumerate_declarations_raw_move_next, is_function_callable,
    is_function_type_callable, location_is_from_main_file, operator_overload_info, type_spelling_with_placeholder,
    uuid_attr_text,
};
use crate::frontend::{Cursor, SourceLocation, TypeRef};
use crate::kinds::{ArgPassingKind, OperatorOverloadKind};

/// Static operator metadata. The strings are null for `None` and `Invalid`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CppAbiOperatorOverloadInfo {
    pub kind: OperatorOverloadKind,
    pub name: *const c_char,
    pub spelling: *const c_char,
    pub is_unary: bool,
    pub is_binary: bool,
    pub is_member_only: bool,
}

// SAFETY: the pointers only ever reference `'static` string literals
unsafe impl Sync for CppAbiOperatorOverloadInfo {}

const fn c_ptr(s: Option<&'static CStr>) -> *const c_char {
    match s {
        Some(s) => s.as_ptr(),
        None => ptr::null(),
    }
}

impl CppAbiOperatorOverloadInfo {
    const fn from_info(info: &OperatorOverloadInfo) -> Self {
        Self {
            kind: info.kind,
            name: c_ptr(info.name),
            spelling: c_ptr(info.spelling),
            is_unary: info.is_unary,
            is_binary: info.is_binary,
            is_member_only: info.is_member_only,
        }
    }
}

static OPERATORS: [CppAbiOperatorOverloadInfo; OperatorOverloadKind::COUNT] = {
    const BLANK: CppAbiOperatorOverloadInfo = CppAbiOperatorOverloadInfo::from_info(&OPERATOR_TABLE[0]);
    let mut table = [BLANK; OperatorOverloadKind::COUNT];
    let mut i = 0;
    while i < table.len() {
        table[i] = CppAbiOperatorOverloadInfo::from_info(&OPERATOR_TABLE[i]);
        i += 1;
    }
    table
};

/// Operator metadata for a function declaration
///
/// # Returns
/// * A pointer into a static table (never freed), or null if `cursor` is not
///   a function
///
/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_get_operator_overload_info(
    unit: *const CppAbiTranslationUnit,
    cursor: Cursor,
) -> *const CppAbiOperatorOverloadInfo {
    // SAFETY: forwarded from the caller
    let Some(unit) = (unsafe { unit_ref(unit) }) else {
        return ptr::null();
    };
    match operator_overload_info(unit, cursor) {
        Some(info) => &OPERATORS[info.kind as usize],
        None => ptr::null(),
    }
}

/// # Returns
/// * The value reinterpreted as unsigned, or `u64::MAX` for anything that is
///   not an enum constant
///
/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_enum_constant_value_zero_extended(
    unit: *const CppAbiTranslationUnit,
    cursor: Cursor,
) -> u64 {
    // SAFETY: forwarded from the caller
    unsafe { unit_ref(unit) }.map_or(u64::MAX, |unit| enum_constant_value_zero_extended(unit, cursor))
}

/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_get_arg_passing_restrictions(
    unit: *const CppAbiTranslationUnit,
    cursor: Cursor,
) -> ArgPassingKind {
    // SAFETY: forwarded from the caller
    unsafe { unit_ref(unit) }.map_or(ArgPassingKind::Invalid, |unit| arg_passing_restrictions(unit, cursor))
}

/// Text of a `uuid` attribute
///
/// # Returns
/// * A string to release with `cppabi_dispose_string`, or null if `cursor` is
///   not a uuid attribute
///
/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_get_uuid_attr_guid(unit: *const CppAbiTranslationUnit, cursor: Cursor) -> *mut c_char {
    // SAFETY: forwarded from the caller
    unsafe { unit_ref(unit) }
        .and_then(|unit| uuid_attr_text(unit, cursor))
        .map_or(ptr::null_mut(), into_c_string)
}

/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_location_is_from_main_file(
    unit: *const CppAbiTranslationUnit,
    location: SourceLocation,
) -> bool {
    // SAFETY: forwarded from the caller
    unsafe { unit_ref(unit) }.is_some_and(|unit| location_is_from_main_file(unit, location))
}

/// First declaration in the context `cursor` names, implicit ones included
///
/// # Returns
/// * The null cursor when the context is empty or `cursor` is not a context
///
/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_begin_enumerate_declarations_raw(
    unit: *const CppAbiTranslationUnit,
    cursor: Cursor,
) -> Cursor {
    // SAFETY: forwarded from the caller
    unsafe { unit_ref(unit) }.map_or(Cursor::NULL, |unit| begin_enumerate_declarations_raw(unit, cursor))
}

/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_enumerate_declarations_raw_move_next(
    unit: *const CppAbiTranslationUnit,
    cursor: Cursor,
) -> Cursor {
    // SAFETY: forwarded from the caller
    unsafe { unit_ref(unit) }.map_or(Cursor::NULL, |unit| enumerate_declarations_raw_move_next(unit, cursor))
}

fn publish_callability(result: Result<(), Vec<String>>) -> *mut CppAbiStringSet {
    match result {
        Ok(()) => ptr::null_mut(),
        Err(diagnostics) => into_string_set(&diagnostics),
    }
}

/// Check that a call to a function declaration could be emitted
///
/// # Returns
/// * Null if the function is callable, otherwise the diagnostics to release
///   with `cppabi_dispose_string_set`
///
/// # Safety
/// `unit` must be a live handle not used concurrently. A null `unit` is
/// reported as a diagnostic.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_is_function_callable(
    unit: *mut CppAbiTranslationUnit,
    cursor: Cursor,
) -> *mut CppAbiStringSet {
    // SAFETY: forwarded from the caller
    match unsafe { unit_mut(unit) } {
        Some(unit) => publish_callability(is_function_callable(unit, cursor)),
        None => publish_callability(Err(vec!["The translation unit is null.".to_string()])),
    }
}

/// As [`cppabi_is_function_callable`], for a function prototype type
///
/// # Safety
/// See [`cppabi_is_function_callable`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_is_function_type_callable(
    unit: *mut CppAbiTranslationUnit,
    ty: TypeRef,
) -> *mut CppAbiStringSet {
    // SAFETY: forwarded from the caller
    match unsafe { unit_mut(unit) } {
        Some(unit) => publish_callability(is_function_type_callable(unit, ty)),
        None => publish_callability(Err(vec!["The translation unit is null.".to_string()])),
    }
}

/// Spell `ty` as if it declared `placeholder`, e.g. `int (*name)(char)`
///
/// # Arguments
/// * `placeholder` - UTF-8 bytes, not necessarily nul-terminated
/// * `placeholder_length` - Length of `placeholder` in bytes
///
/// # Returns
/// * A string to release with `cppabi_dispose_string`. Empty for a null type,
///   null only if `unit` is null or `placeholder` is not UTF-8.
///
/// # Safety
/// `unit` must be null or a live handle. `placeholder` must be valid for
/// `placeholder_length` bytes, or null with a zero length.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_get_type_spelling_with_placeholder(
    unit: *const CppAbiTranslationUnit,
    ty: TypeRef,
    placeholder: *const c_char,
    placeholder_length: usize,
) -> *mut c_char {
    // SAFETY: forwarded from the caller
    let Some(unit) = (unsafe { unit_ref(unit) }) else {
        return ptr::null_mut();
    };
    let bytes = if placeholder.is_null() {
        &[][..]
    } else {
        // SAFETY: the caller guarantees `placeholder_length` readable bytes
        unsafe { std::slice::from_raw_parts(placeholder.cast::<u8>(), placeholder_length) }
    };
    let Ok(placeholder) = std::str::from_utf8(bytes) else {
        return ptr::null_mut();
    };
    into_c_string(&type_spelling_with_placeholder(unit, ty, placeholder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffi_operator_table_mirrors_rust_table() {
        for (ffi, info) in OPERATORS.iter().zip(OPERATOR_TABLE.iter()) {
            assert_eq!(ffi.kind, info.kind);
            assert_eq!(ffi.name.is_null(), info.name.is_none());
            if let Some(spelling) = info.spelling {
                assert_eq!(unsafe { CStr::from_ptr(ffi.spelling) }, spelling);
            }
        }
        assert!(OPERATORS[OperatorOverloadKind::None as usize].spelling.is_null());
        assert!(OPERATORS[OperatorOverloadKind::Invalid as usize].name.is_null());
    }

    #[test]
    fn test_null_unit_fails_closed() {
        unsafe {
            assert!(cppabi_get_operator_overload_info(ptr::null(), Cursor::NULL).is_null());
            assert_eq!(cppabi_enum_constant_value_zero_extended(ptr::null(), Cursor::NULL), u64::MAX);
            assert_eq!(cppabi_get_arg_passing_restrictions(ptr::null(), Cursor::NULL), ArgPassingKind::Invalid);
            assert!(cppabi_get_uuid_attr_guid(ptr::null(), Cursor::NULL).is_null());
            assert!(cppabi_begin_enumerate_declarations_raw(ptr::null(), Cursor::NULL).is_null());

            let set = cppabi_is_function_callable(ptr::null_mut(), Cursor::NULL);
            assert!(!set.is_null());
            assert_eq!((*set).count, 1);
            super::super::cppabi_dispose_string_set(set);
        }
    }
}
