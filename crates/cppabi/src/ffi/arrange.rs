//! Arranged functions across the C boundary
//!
//! An arranged function is a single allocation: the header immediately
//! followed by `argument_count` [`CppAbiArgumentInfo`] records.

use std::alloc::{self, Layout};
use std::ptr;

use tracing::debug;

use super::{CppAbiTranslationUnit, unit_ref};
use crate::arrange::{ArgumentInfo, ArrangedFunction, ArrangedFunctionFlags, arrange_function, arrange_function_pointer};
use crate::error::Result;
use crate::frontend::{Cursor, TypeRef};
use crate::kinds::{ClangCallingConventionKind, LlvmCallingConventionKind};

/// Already flat
pub type CppAbiArgumentInfo = ArgumentInfo;

#[repr(C)]
pub struct CppAbiArrangedFunction {
    pub calling_convention: LlvmCallingConventionKind,
    pub effective_calling_convention: LlvmCallingConventionKind,
    pub ast_calling_convention: ClangCallingConventionKind,
    pub flags: ArrangedFunctionFlags,
    pub required_argument_count: u32,
    pub arguments_passed_in_register_count: u32,
    pub argument_count: u32,
    pub return_info: CppAbiArgumentInfo,
}

/// Allocation layout of a header plus `count` trailing arguments, and the
/// offset of the first argument
fn allocation_layout(count: usize) -> Option<(Layout, usize)> {
    let header = Layout::new::<CppAbiArrangedFunction>();
    let arguments = Layout::array::<CppAbiArgumentInfo>(count).ok()?;
    let (layout, offset) = header.extend(arguments).ok()?;
    Some((layout.pad_to_align(), offset))
}

impl CppAbiArrangedFunction {
    /// Copies `function` into one allocation. Null if the argument count does
    /// not fit the header or the allocation fails.
    pub fn into_raw(function: &ArrangedFunction) -> *mut CppAbiArrangedFunction {
        let Ok(argument_count) = u32::try_from(function.arguments.len()) else {
            return ptr::null_mut();
        };
        let Some((layout, offset)) = allocation_layout(function.arguments.len()) else {
            return ptr::null_mut();
        };

        // SAFETY: `layout` has a non-zero size since it contains the header
        let base = unsafe { alloc::alloc(layout) };
        if base.is_null() {
            return ptr::null_mut();
        }

        let header = base.cast::<CppAbiArrangedFunction>();
        // SAFETY: `base` is a fresh allocation of `layout`, which holds the
        // header at offset 0 and the argument array at `offset`, both aligned
        unsafe {
            header.write(CppAbiArrangedFunction {
                calling_convention: function.calling_convention,
                effective_calling_convention: function.effective_calling_convention,
                ast_calling_convention: function.ast_calling_convention,
                flags: function.flags,
                required_argument_count: function.required_argument_count,
                arguments_passed_in_register_count: function.arguments_passed_in_register_count,
                argument_count,
                return_info: function.return_info,
            });
            let arguments = base.add(offset).cast::<CppAbiArgumentInfo>();
            ptr::copy_nonoverlapping(function.arguments.as_ptr(), arguments, function.arguments.len());
        }
        header
    }
}

fn publish(result: Result<ArrangedFunction>) -> *mut CppAbiArrangedFunction {
    match result {
        Ok(function) => CppAbiArrangedFunction::into_raw(&function),
        Err(error) => {
            debug!(%error, "no arrangement");
            ptr::null_mut()
        }
    }
}

/// Arrange a call to a function declaration
///
/// # Returns
/// * An arranged function to release with `cppabi_dispose_arranged_function`,
///   or null if `cursor` is not a function
///
/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_get_arranged_function(
    unit: *const CppAbiTranslationUnit,
    cursor: Cursor,
) -> *mut CppAbiArrangedFunction {
    // SAFETY: forwarded from the caller
    let Some(unit) = (unsafe { unit_ref(unit) }) else {
        return ptr::null_mut();
    };
    publish(arrange_function(unit, cursor))
}

/// Arrange a call through a pointer to a function of type `ty`
///
/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_get_arranged_function_pointer(
    unit: *const CppAbiTranslationUnit,
    ty: TypeRef,
) -> *mut CppAbiArrangedFunction {
    // SAFETY: forwarded from the caller
    let Some(unit) = (unsafe { unit_ref(unit) }) else {
        return ptr::null_mut();
    };
    publish(arrange_function_pointer(unit, ty))
}

/// Pointer to the first trailing argument record
///
/// # Safety
/// `function` must be null or a live arranged function.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_arranged_function_arguments(
    function: *const CppAbiArrangedFunction,
) -> *const CppAbiArgumentInfo {
    // SAFETY: forwarded from the caller
    let Some(header) = (unsafe { function.as_ref() }) else {
        return ptr::null();
    };
    let Some((_, offset)) = allocation_layout(header.argument_count as usize) else {
        return ptr::null();
    };
    // SAFETY: the trailing array starts `offset` bytes into the allocation
    unsafe { function.cast::<u8>().add(offset).cast() }
}

/// Free an arranged function
///
/// # Safety
/// `function` must be null or an arranged function returned by this API that
/// has not been disposed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_dispose_arranged_function(function: *mut CppAbiArrangedFunction) {
    if function.is_null() {
        return;
    }
    // SAFETY: the header was written by `into_raw`
    let count = unsafe { (*function).argument_count } as usize;
    let Some((layout, _)) = allocation_layout(count) else {
        return;
    };
    // SAFETY: allocated in `into_raw` with exactly this layout
    unsafe { alloc::dealloc(function.cast(), layout) };
}
