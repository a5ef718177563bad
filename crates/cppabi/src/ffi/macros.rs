//! Macro enumeration across the C boundary

use std::ffi::{c_char, c_void};

use super::{CppAbiTranslationUnit, unit_ref};
use crate::frontend::SourceLocation;
use crate::kinds::MacroVariadicKind;
use crate::preprocessor::{enumerate_macros, preprocessor_identifier_count};

/// One macro. Every pointer is only valid for the duration of the callback,
/// and no string is nul-terminated.
#[repr(C)]
pub struct CppAbiMacroInformation {
    pub name: *const c_char,
    pub name_length: u64,
    pub location: SourceLocation,
    /// Defined at some point and later undefined
    pub was_undefined: bool,
    pub is_function_like: bool,
    /// `__FILE__`, `__LINE__` and friends, not macros from the built-in buffer
    pub is_builtin_macro: bool,
    /// Contains `, ## __VA_ARGS__`
    pub has_comma_pasting: bool,
    pub variadic_kind: MacroVariadicKind,
    pub parameter_count: i32,
    pub parameter_names: *const *const c_char,
    pub parameter_name_lengths: *const u64,
}

pub type CppAbiMacroEnumerator = unsafe extern "C" fn(info: *const CppAbiMacroInformation, user_data: *mut c_void);

/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_get_preprocessor_identifier_count(unit: *const CppAbiTranslationUnit) -> u32 {
    // SAFETY: forwarded from the caller
    unsafe { unit_ref(unit) }.map_or(0, |unit| {
        u32::try_from(preprocessor_identifier_count(unit)).unwrap_or(u32::MAX)
    })
}

/// Call `enumerator` once for every macro that is (or was) defined
///
/// # Safety
/// `unit` must be null or a live translation unit handle. `enumerator` must be
/// safe to call with `user_data`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_enumerate_macros(
    unit: *const CppAbiTranslationUnit,
    enumerator: Option<CppAbiMacroEnumerator>,
    user_data: *mut c_void,
) {
    // SAFETY: forwarded from the caller
    let (Some(unit), Some(enumerator)) = (unsafe { unit_ref(unit) }, enumerator) else {
        return;
    };

    let mut names: Vec<*const c_char> = Vec::new();
    let mut lengths: Vec<u64> = Vec::new();
    enumerate_macros(unit, |descriptor| {
        names.clear();
        lengths.clear();
        for parameter in descriptor.parameters {
            names.push(parameter.as_ptr().cast());
            lengths.push(parameter.len() as u64);
        }

        let info = CppAbiMacroInformation {
            name: descriptor.name.as_ptr().cast(),
            name_length: descriptor.name.len() as u64,
            location: descriptor.location,
            was_undefined: descriptor.was_undefined,
            is_function_like: descriptor.is_function_like,
            is_builtin_macro: descriptor.is_builtin_macro,
            has_comma_pasting: descriptor.has_comma_pasting,
            variadic_kind: descriptor.variadic_kind,
            parameter_count: i32::try_from(descriptor.parameter_count()).unwrap_or(i32::MAX),
            parameter_names: names.as_ptr(),
            parameter_name_lengths: lengths.as_ptr(),
        };
        // SAFETY: the caller vouches for `enumerator` and `user_data`
        unsafe { enumerator(&info, user_data) };
    });
}
