//! Template specialization helpers through the C API

use std::ffi::c_void;

use cppabi::ffi::layout::{cppabi_dispose_record_layout, cppabi_get_record_layout};
use cppabi::ffi::templates::{
    cppabi_enumerate_all_specialized_class_templates, cppabi_get_specialization_kind,
    cppabi_instantiate_all_fully_specialized_class_templates, cppabi_instantiate_specialized_class_template,
};
use cppabi::ffi::{cppabi_dispose_translation_unit, translation_unit_into_raw};
use cppabi::frontend::{
    AstRecordLayout, ClassTemplateSpecialization, Cursor, CxxRecord, DeclId, MemoryUnit, SpecializationKind, TagKind,
    TargetInfo,
};
use cppabi::kinds::TemplateSpecializationKind;
use cppabi::templates::TemplateInstantiationMetrics;

fn specialization(unit: &mut MemoryUnit, name: &str, kind: SpecializationKind, is_partial: bool) -> DeclId {
    let record = unit.add_record(name, TagKind::Class, Some(CxxRecord::default()));
    unit.set_specialization(
        record,
        ClassTemplateSpecialization {
            kind,
            is_partial,
            template_has_definition: true,
        },
    );
    record
}

fn vector_layout() -> AstRecordLayout {
    AstRecordLayout {
        size: 24,
        alignment: 8,
        non_virtual_size: 24,
        non_virtual_alignment: 8,
        ..Default::default()
    }
}

#[test]
fn test_instantiate_all_reports_metrics() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
    let ok = specialization(&mut unit, "vector<int>", SpecializationKind::Undeclared, false);
    let broken = specialization(&mut unit, "vector<Incomplete>", SpecializationKind::Undeclared, false);
    specialization(&mut unit, "vector<T*>", SpecializationKind::ExplicitSpecialization, true);
    specialization(&mut unit, "vector<bool>", SpecializationKind::ExplicitSpecialization, false);
    let undefined = unit.add_record("opaque<int>", TagKind::Class, Some(CxxRecord::default()));
    unit.set_specialization(
        undefined,
        ClassTemplateSpecialization {
            kind: SpecializationKind::Undeclared,
            is_partial: false,
            template_has_definition: false,
        },
    );
    unit.script_instantiation(ok, true, Some(vector_layout()));
    unit.script_instantiation(broken, false, None);
    let handle = translation_unit_into_raw(Box::new(unit));

    unsafe {
        assert_eq!(
            cppabi_get_specialization_kind(handle, Cursor::declaration(ok)),
            TemplateSpecializationKind::Undeclared
        );
        assert!(cppabi_get_record_layout(handle, Cursor::declaration(ok)).is_null());

        let metrics = cppabi_instantiate_all_fully_specialized_class_templates(handle);
        assert_eq!(
            metrics,
            TemplateInstantiationMetrics {
                total_specializations_count: 3,
                partial_specializations_count: 1,
                successful_instantiations_count: 1,
                failed_instantiations_count: 1,
            }
        );

        assert_eq!(
            cppabi_get_specialization_kind(handle, Cursor::declaration(ok)),
            TemplateSpecializationKind::ImplicitInstantiation
        );
        let layout = cppabi_get_record_layout(handle, Cursor::declaration(ok));
        assert!(!layout.is_null());
        assert_eq!((*layout).size, 24);
        cppabi_dispose_record_layout(layout);

        assert!(!cppabi_instantiate_specialized_class_template(handle, Cursor::declaration(broken)));
        assert!(cppabi_instantiate_specialized_class_template(handle, Cursor::declaration(ok)));
        cppabi_dispose_translation_unit(handle);
    }
}

unsafe extern "C" fn record_specialization(kind: TemplateSpecializationKind, cursor: Cursor, user_data: *mut c_void) {
    let seen = unsafe { &mut *user_data.cast::<Vec<(TemplateSpecializationKind, Cursor)>>() };
    seen.push((kind, cursor));
}

#[test]
fn test_enumeration_visits_every_specialization() {
    let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
    unit.add_record("Plain", TagKind::Struct, None);
    let a = specialization(&mut unit, "box<int>", SpecializationKind::ExplicitInstantiationDefinition, false);
    let b = specialization(&mut unit, "box<T*>", SpecializationKind::ExplicitSpecialization, true);
    let handle = translation_unit_into_raw(Box::new(unit));

    let mut seen: Vec<(TemplateSpecializationKind, Cursor)> = Vec::new();
    unsafe {
        cppabi_enumerate_all_specialized_class_templates(
            handle,
            Some(record_specialization),
            (&mut seen as *mut Vec<(TemplateSpecializationKind, Cursor)>).cast(),
        );
        cppabi_dispose_translation_unit(handle);
    }
    assert_eq!(
        seen,
        [
            (TemplateSpecializationKind::ExplicitInstantiationDefinition, Cursor::declaration(a)),
            (TemplateSpecializationKind::ExplicitSpecialization, Cursor::declaration(b)),
        ]
    );
}

#[test]
fn test_null_handle_yields_empty_metrics() {
    unsafe {
        assert_eq!(
            cppabi_instantiate_all_fully_specialized_class_templates(std::ptr::null_mut()),
            TemplateInstantiationMetrics::default()
        );
        assert_eq!(
            cppabi_get_specialization_kind(std::ptr::null(), Cursor::NULL),
            TemplateSpecializationKind::Invalid
        );
    }
}
