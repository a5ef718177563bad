//! Template helpers across the C boundary

use std::ffi::c_void;

use super::{CppAbiTranslationUnit, unit_mut, unit_ref};
use crate::frontend::Cursor;
use crate::kinds::TemplateSpecializationKind;
use crate::templates::{
    TemplateInstantiationMetrics, enumerate_specializations, instantiate_all_specializations,
    instantiate_specialization, specialization_kind,
};

pub type CppAbiSpecializationEnumerator =
    unsafe extern "C" fn(kind: TemplateSpecializationKind, specialization: Cursor, user_data: *mut c_void);

/// # Safety
/// `unit` must be null or a live translation unit handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_get_specialization_kind(
    unit: *const CppAbiTranslationUnit,
    cursor: Cursor,
) -> TemplateSpecializationKind {
    // SAFETY: forwarded from the caller
    unsafe { unit_ref(unit) }.map_or(TemplateSpecializationKind::Invalid, |unit| specialization_kind(unit, cursor))
}

/// Instantiate one class template specialization
///
/// # Returns
/// * `true` if the specialization is instantiated, including when it already was
///
/// # Safety
/// `unit` must be null or a live handle not used concurrently.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_instantiate_specialized_class_template(
    unit: *mut CppAbiTranslationUnit,
    cursor: Cursor,
) -> bool {
    // SAFETY: forwarded from the caller
    unsafe { unit_mut(unit) }.is_some_and(|unit| instantiate_specialization(unit, cursor))
}

/// Instantiate every full specialization that is still undeclared
///
/// # Safety
/// `unit` must be null or a live handle not used concurrently.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_instantiate_all_fully_specialized_class_templates(
    unit: *mut CppAbiTranslationUnit,
) -> TemplateInstantiationMetrics {
    // SAFETY: forwarded from the caller
    unsafe { unit_mut(unit) }.map(instantiate_all_specializations).unwrap_or_default()
}

/// # Safety
/// `unit` must be null or a live handle. `enumerator` must be safe to call
/// with `user_data`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cppabi_enumerate_all_specialized_class_templates(
    unit: *const CppAbiTranslationUnit,
    enumerator: Option<CppAbiSpecializationEnumerator>,
    user_data: *mut c_void,
) {
    // SAFETY: forwarded from the caller
    let (Some(unit), Some(enumerator)) = (unsafe { unit_ref(unit) }, enumerator) else {
        return;
    };
    enumerate_specializations(unit, |kind, cursor| {
        // SAFETY: the caller vouches for `enumerator` and `user_data`
        unsafe { enumerator(kind, cursor, user_data) }
    });
}
