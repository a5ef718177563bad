//! C API
//!
//! Flat `extern "C"` entry points over the Rust query API:
//! - ABI-stable (only `#[repr(C)]` structs, fixed-width integers and handles)
//! - failures collapse to null, `false`, a sentinel or an `Invalid` kind
//! - every returned allocation has exactly one `cppabi_dispose_*` function
//!   that frees it and all of its children
//!
//! Cursors and types are passed by value. A translation unit is passed as an
//! opaque [`CppAbiTranslationUnit`] pointer created by the host binding through
//! [`translation_unit_into_raw`].

use std::ffi::{CString, c_char};
use std::ptr;

use crate::frontend::TranslationUnit;
use crate::templates::TemplateInstantiationMetrics;
use crate::vtable::VTableEntry;

pub mod arrange;
pub mod constant;
pub mod decl;
pub mod layout;
pub mod macros;
pub mod templates;

pub use arrange::{CppAbiArgumentInfo, CppAbiArrangedFunction};
pub use constant::{CppAbiConstantString, CppAbiConstantValueInfo};
pub use decl::CppAbiOperatorOverloadInfo;
pub use layout::{CppAbiRecordField, CppAbiRecordLayout, CppAbiVTable};
pub use macros::CppAbiMacroInformation;

// =============================================================================
// Opaque handles
// =============================================================================

/// Opaque translation unit handle
#[repr(C)]
pub struct CppAbiTranslationUnit {
    _private: [u8; 0],
}

struct UnitHandle {
    unit: Box<dyn TranslationUnit>,
}

/// Boxes `unit` behind an opaque handle for the C API.
///
/// The handle must be released with [`cppabi_dispose_translation_unit`].
pub fn translation_unit_into_raw(unit: Box<dyn TranslationUnit>) -> *mut CppAbiTranslationUnit {
    Box::into_raw(Box::new(UnitHandle { unit })).cast()
}

/// # Safety
/// `unit` must be null or a live handle from [`translation_unit_into_raw`].
pub(crate) unsafe fn unit_ref<'a>(unit: *const CppAbiTranslationUnit) -> Option<&'a (dyn TranslationUnit + 'static)> {
    // SAFETY: the caller guarantees the pointer came from `translation_unit_into_raw`
    unsafe { unit.cast::<UnitHandle>().as_ref() }.map(|handle| &*handle.unit)
}

/// # Safety
/// As [`unit_ref`], and no other reference to the unit may be live.
pub(crate) unsafe fn unit_mut<'a>(unit: *mut CppAbiTranslationUnit) -> Option<&'a mut (dyn TranslationUnit + 'static)> {
    // SAFETY: the caller guarantees exclusive access to a live handle
    unsafe { unit.cast::<UnitHandle>().as_mut() }.map(|handle| &mut *handle.unit)
}

/// Destroy a translation unit handle
///
/// # Safety
/// `unit` must be null or a handle from [`translation_unit_into_raw`] that
/// has not been disposed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_dispose_translation_unit(unit: *mut CppAbiTranslationUnit) {
    if unit.is_null() {
        return;
    }
    // SAFETY: created by `Box::into_raw` in `translation_unit_into_raw`
    drop(unsafe { Box::from_raw(unit.cast::<UnitHandle>()) });
}

// =============================================================================
// Strings
// =============================================================================

/// Copies `s` into a nul-terminated heap string. Interior nuls are dropped.
pub(crate) fn into_c_string(s: &str) -> *mut c_char {
    let c_string = match CString::new(s) {
        Ok(c_string) => c_string,
        Err(error) => {
            let mut bytes = error.into_vec();
            bytes.retain(|&b| b != 0);
            match CString::new(bytes) {
                Ok(c_string) => c_string,
                Err(_) => return ptr::null_mut(),
            }
        }
    };
    c_string.into_raw()
}

/// Free a string returned by the C API
///
/// # Safety
/// `s` must be null or a string returned by a `cppabi_*` function.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_dispose_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    // SAFETY: created by `CString::into_raw`
    drop(unsafe { CString::from_raw(s) });
}

/// A list of owned strings
#[repr(C)]
pub struct CppAbiStringSet {
    pub strings: *mut *mut c_char,
    pub count: usize,
}

pub(crate) fn into_string_set(strings: &[String]) -> *mut CppAbiStringSet {
    let pointers: Box<[*mut c_char]> = strings.iter().map(|s| into_c_string(s)).collect();
    let count = pointers.len();
    let strings = Box::into_raw(pointers).cast::<*mut c_char>();
    Box::into_raw(Box::new(CppAbiStringSet { strings, count }))
}

/// Free a string set and every string in it
///
/// # Safety
/// `set` must be null or a set returned by a `cppabi_*` function.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_dispose_string_set(set: *mut CppAbiStringSet) {
    if set.is_null() {
        return;
    }
    // SAFETY: created by `Box::into_raw` in `into_string_set`
    let set = unsafe { Box::from_raw(set) };
    // SAFETY: `strings` is the boxed slice of exactly `count` pointers
    let strings = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(set.strings, set.count)) };
    for &s in strings.iter() {
        // SAFETY: each entry came from `into_c_string`
        unsafe { cppabi_dispose_string(s) };
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Install the `tracing` subscriber configured from `CPPABI_LOG_LEVEL` and
/// `CPPABI_LOG_FORMAT`. Later calls do nothing.
#[unsafe(no_mangle)]
pub extern "C" fn cppabi_init_logging() {
    crate::logging::init_logging(crate::logging::LogOptions::from_env());
}

// =============================================================================
// Interop verification
// =============================================================================

/// C names for the Rust structs that are already flat
pub type CppAbiVTableEntry = VTableEntry;
pub type CppAbiTemplateInstantiationMetrics = TemplateInstantiationMetrics;

macro_rules! type_sizes {
    ($($field:ident: $ty:ident),* $(,)?) => {
        paste::paste! {
            /// Size of every flat struct, for checking that both sides agree.
            ///
            /// The first field is the size of this struct itself.
            #[repr(C)]
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
            pub struct CppAbiTypeSizes {
                pub type_sizes: i32,
                $(pub $field: i32,)*
            }

            fn fill_type_sizes(sizes: &mut CppAbiTypeSizes) {
                $(sizes.$field = std::mem::size_of::<[<CppAbi $ty>]>() as i32;)*
            }
        }
    };
}

type_sizes! {
    record_layout: RecordLayout,
    record_field: RecordField,
    vtable: VTable,
    vtable_entry: VTableEntry,
    operator_overload_info: OperatorOverloadInfo,
    constant_string: ConstantString,
    constant_value_info: ConstantValueInfo,
    macro_information: MacroInformation,
    template_instantiation_metrics: TemplateInstantiationMetrics,
    argument_info: ArgumentInfo,
    arranged_function: ArrangedFunction,
}

/// Populates `sizes`.
///
/// # Returns
/// `false` (and writes nothing else) unless `sizes->type_sizes` equals
/// `sizeof(CppAbiTypeSizes)`.
///
/// # Safety
/// `sizes` must be null or point to a writable `CppAbiTypeSizes`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_get_type_sizes(sizes: *mut CppAbiTypeSizes) -> bool {
    // SAFETY: the caller guarantees the pointer is valid or null
    let Some(sizes) = (unsafe { sizes.as_mut() }) else {
        return false;
    };
    if sizes.type_sizes != std::mem::size_of::<CppAbiTypeSizes>() as i32 {
        return false;
    }
    fill_type_sizes(sizes);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_sizes_fail_closed() {
        let mut sizes = CppAbiTypeSizes::default();
        assert!(!unsafe { cppabi_get_type_sizes(&mut sizes) });
        assert_eq!(sizes.record_layout, 0);

        sizes.type_sizes = std::mem::size_of::<CppAbiTypeSizes>() as i32;
        assert!(unsafe { cppabi_get_type_sizes(&mut sizes) });
        assert_eq!(sizes.vtable_entry, std::mem::size_of::<VTableEntry>() as i32);
        assert!(!unsafe { cppabi_get_type_sizes(ptr::null_mut()) });
    }

    #[test]
    fn test_string_set_round_trip() {
        let set = into_string_set(&["a".to_string(), "bc".to_string()]);
        let slice = unsafe { std::slice::from_raw_parts((*set).strings, (*set).count) };
        let text: Vec<_> = slice
            .iter()
            .map(|&s| unsafe { std::ffi::CStr::from_ptr(s) }.to_str().unwrap().to_string())
            .collect();
        assert_eq!(text, ["a", "bc"]);
        unsafe { cppabi_dispose_string_set(set) };
    }

    #[test]
    fn test_interior_nul_is_dropped() {
        let s = into_c_string("a\0b");
        assert_eq!(unsafe { std::ffi::CStr::from_ptr(s) }, c"ab");
        unsafe { cppabi_dispose_string(s) };
    }
}
