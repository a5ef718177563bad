//! Constant values across the C boundary

use std::alloc::{self, Layout};
use std::ffi::c_char;
use std::mem::offset_of;
use std::ptr;

use tracing::debug;

use super::{CppAbiTranslationUnit, unit_ref};
use crate::constant::{Constant, ConstantValue, compute_constant_value};
use crate::error::Error;
use crate::frontend::Cursor;
use crate::kinds::ConstantValueKind;

/// Length-prefixed string payload. The bytes start at `first_byte` and are
/// not nul-terminated.
#[repr(C)]
pub struct CppAbiConstantString {
    pub size_bytes: u64,
    pub first_byte: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CppAbiConstantValueInfo {
    pub has_side_effects: bool,
    pub has_undefined_behavior: bool,
    pub kind: ConstantValueKind,
    /// Bit width for numbers, encoding (possibly with the wide bit) for
    /// strings, the front-end value kind for `Unknown`
    pub sub_kind: i32,
    /// Zero-extended unsigned, sign-extended signed, raw float bits, or a
    /// `*mut CppAbiConstantString` for strings
    pub value: u64,
}

const _: () = assert!(size_of::<u64>() >= size_of::<*mut CppAbiConstantString>());

fn string_layout(len: usize) -> Option<Layout> {
    let size = offset_of!(CppAbiConstantString, first_byte).checked_add(len.max(1))?;
    Layout::from_size_align(size, align_of::<CppAbiConstantString>()).ok()
}

fn into_constant_string(bytes: &[u8]) -> *mut CppAbiConstantString {
    let Some(layout) = string_layout(bytes.len()) else {
        return ptr::null_mut();
    };
    // SAFETY: `layout` is at least one byte past the length prefix
    let raw = unsafe { alloc::alloc(layout) }.cast::<CppAbiConstantString>();
    if raw.is_null() {
        return raw;
    }
    // SAFETY: `raw` is a fresh allocation with room for the prefix and
    // `bytes.len()` bytes starting at `first_byte`
    unsafe {
        ptr::addr_of_mut!((*raw).size_bytes).write(bytes.len() as u64);
        let first = ptr::addr_of_mut!((*raw).first_byte);
        ptr::copy_nonoverlapping(bytes.as_ptr(), first, bytes.len());
    }
    raw
}

impl CppAbiConstantValueInfo {
    /// Flattens `value`. String payloads are copied into a separate allocation
    /// owned by the returned info.
    pub fn from_value(value: &ConstantValue) -> Self {
        let payload = match &value.constant {
            Constant::String { bytes, .. } => into_constant_string(bytes) as u64,
            _ => value.value(),
        };
        Self {
            has_side_effects: value.has_side_effects,
            has_undefined_behavior: value.has_undefined_behavior,
            kind: value.kind(),
            sub_kind: value.sub_kind(),
            value: payload,
        }
    }
}

fn error_message(error: &Error) -> &'static std::ffi::CStr {
    match error {
        Error::FoldDiagnostics(_) => c"EvaluateAsRValue returned diagnostics.",
        _ => c"The cursor is not a variable declaration or expression.",
    }
}

/// Compute the constant value of a variable declaration or expression
///
/// # Arguments
/// * `unit` - Translation unit the cursor belongs to
/// * `cursor` - A variable declaration or an expression
/// * `info` - Receives the value on success
/// * `error` - Receives a static message on some failures; never set on success
///
/// # Returns
/// * `true` if the value was computed. String values must be released with
///   `cppabi_dispose_constant_value_info`.
///
/// # Safety
/// `unit` must be null or a live handle. `info` and `error` must be null or
/// writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_compute_constant_value(
    unit: *const CppAbiTranslationUnit,
    cursor: Cursor,
    info: *mut CppAbiConstantValueInfo,
    error: *mut *const c_char,
) -> bool {
    // SAFETY: forwarded from the caller
    let (Some(unit), Some(info)) = (unsafe { unit_ref(unit) }, unsafe { info.as_mut() }) else {
        return false;
    };

    match compute_constant_value(unit, cursor) {
        Ok(Some(value)) => {
            *info = CppAbiConstantValueInfo::from_value(&value);
            true
        }
        Ok(None) => false,
        Err(failure) => {
            debug!(%failure, "constant evaluation failed");
            if !error.is_null() {
                // SAFETY: checked non-null, the caller guarantees it is writable
                unsafe { *error = error_message(&failure).as_ptr() };
            }
            false
        }
    }
}

/// Free the string payload of a constant value, if any, and clear `value`
///
/// # Safety
/// `info` must be null or an info filled by `cppabi_compute_constant_value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_dispose_constant_value_info(info: *mut CppAbiConstantValueInfo) {
    // SAFETY: forwarded from the caller
    let Some(info) = (unsafe { info.as_mut() }) else {
        return;
    };
    if info.kind != ConstantValueKind::String || info.value == 0 {
        return;
    }
    let string = info.value as usize as *mut CppAbiConstantString;
    // SAFETY: `value` holds a payload from `into_constant_string`
    let len = unsafe { (*string).size_bytes } as usize;
    if let Some(layout) = string_layout(len) {
        // SAFETY: allocated with exactly this layout
        unsafe { alloc::dealloc(string.cast(), layout) };
    }
    info.value = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::StringEncoding;
    use crate::kinds::StringConstantKind;

    #[test]
    fn test_string_payload_has_no_terminator() {
        let value = ConstantValue {
            has_side_effects: false,
            has_undefined_behavior: false,
            constant: Constant::String {
                encoding: StringEncoding {
                    kind: StringConstantKind::Ascii,
                    was_wide: false,
                },
                bytes: b"ab".to_vec(),
            },
        };
        let mut info = CppAbiConstantValueInfo::from_value(&value);
        assert_eq!(info.kind, ConstantValueKind::String);

        unsafe {
            let string = info.value as usize as *const CppAbiConstantString;
            assert_eq!((*string).size_bytes, 2);
            let bytes = std::slice::from_raw_parts(ptr::addr_of!((*string).first_byte), 2);
            assert_eq!(bytes, b"ab");
            cppabi_dispose_constant_value_info(&mut info);
        }
        assert_eq!(info.value, 0);
    }

    #[test]
    fn test_empty_string_still_allocates_one_byte() {
        assert_eq!(string_layout(0).map(|l| l.size()), Some(9));
        let raw = into_constant_string(b"");
        assert!(!raw.is_null());
        let mut info = CppAbiConstantValueInfo {
            kind: ConstantValueKind::String,
            value: raw as u64,
            ..Default::default()
        };
        unsafe { cppabi_dispose_constant_value_info(&mut info) };
        assert_eq!(info.value, 0);
    }
}
