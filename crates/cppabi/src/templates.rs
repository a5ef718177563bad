//! Class template specialization helpers

use tracing::{debug, trace};

use crate::frontend::{AstContext, ClassTemplateSpecialization, Cursor, DeclId, Sema, SpecializationKind, TypeKind};
use crate::kinds::TemplateSpecializationKind;

/// Counts reported by [`instantiate_all_specializations`]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemplateInstantiationMetrics {
    pub total_specializations_count: u64,
    pub partial_specializations_count: u64,
    pub successful_instantiations_count: u64,
    pub failed_instantiations_count: u64,
}

fn specialization_of<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> Option<(DeclId, ClassTemplateSpecialization)> {
    let (id, decl) = unit.cursor_declaration(cursor)?;
    let specialization = decl.as_record()?.specialization?;
    Some((id, specialization))
}

/// `Invalid` when `cursor` is not a class template specialization
pub fn specialization_kind<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> TemplateSpecializationKind {
    match specialization_of(unit, cursor) {
        Some((_, specialization)) => specialization.kind.into(),
        None => TemplateSpecializationKind::Invalid,
    }
}

/// Instantiates the specialization `cursor` names if it is still undeclared.
///
/// Returns whether the specialization is instantiated afterwards.
pub fn instantiate_specialization<U: AstContext + Sema + ?Sized>(unit: &mut U, cursor: Cursor) -> bool {
    let Some((id, specialization)) = specialization_of(&*unit, cursor) else {
        debug!(?cursor, "instantiation requested for a non-specialization");
        return false;
    };
    if specialization.kind != SpecializationKind::Undeclared {
        return true;
    }
    unit.instantiate_class_template_specialization(id)
}

fn specializations<C: AstContext + ?Sized>(unit: &C) -> Vec<(DeclId, ClassTemplateSpecialization)> {
    unit.types()
        .filter_map(|ty| match unit.type_node(ty).map(|node| &node.kind) {
            Some(TypeKind::Record(id)) => Some(*id),
            _ => None,
        })
        .filter_map(|id| {
            let specialization = unit.declaration(id)?.as_record()?.specialization?;
            Some((id, specialization))
        })
        .collect()
}

/// Walks every record type and instantiates each specialization that is
/// still undeclared.
///
/// Specializations of templates that were never defined are skipped without
/// being counted. Partial specializations are counted and skipped.
pub fn instantiate_all_specializations<U: AstContext + Sema + ?Sized>(unit: &mut U) -> TemplateInstantiationMetrics {
    let mut metrics = TemplateInstantiationMetrics::default();
    let candidates = specializations(&*unit);

    for (id, specialization) in candidates {
        if !specialization.template_has_definition {
            continue;
        }
        if specialization.is_partial {
            metrics.partial_specializations_count += 1;
            continue;
        }

        metrics.total_specializations_count += 1;
        if specialization.kind != SpecializationKind::Undeclared {
            continue;
        }

        if unit.instantiate_class_template_specialization(id) {
            metrics.successful_instantiations_count += 1;
        } else {
            trace!(record = id.0, "instantiation failed");
            metrics.failed_instantiations_count += 1;
        }
    }

    debug!(?metrics, "instantiated specializations");
    metrics
}

/// Calls `callback` with the kind and cursor of every specialization
pub fn enumerate_specializations<C, F>(unit: &C, mut callback: F)
where
    C: AstContext + ?Sized,
    F: FnMut(TemplateSpecializationKind, Cursor),
{
    for (id, specialization) in specializations(unit) {
        callback(specialization.kind.into(), Cursor::declaration(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{CxxRecord, MemoryUnit, TagKind, TargetInfo};

    fn add_specialization(unit: &mut MemoryUnit, name: &str, kind: SpecializationKind, partial: bool, defined: bool) -> DeclId {
        let record = unit.add_record(name, TagKind::Class, Some(CxxRecord::default()));
        unit.set_specialization(
            record,
            ClassTemplateSpecialization {
                kind,
                is_partial: partial,
                template_has_definition: defined,
            },
        );
        record
    }

    #[test]
    fn test_kind_is_shifted_by_one() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let spec = add_specialization(&mut unit, "V<int>", SpecializationKind::ExplicitSpecialization, false, true);
        let plain = unit.add_record("Plain", TagKind::Struct, None);

        assert_eq!(
            specialization_kind(&unit, Cursor::declaration(spec)),
            TemplateSpecializationKind::ExplicitSpecialization
        );
        assert_eq!(
            specialization_kind(&unit, Cursor::declaration(plain)),
            TemplateSpecializationKind::Invalid
        );
    }

    #[test]
    fn test_instantiate_single() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let spec = add_specialization(&mut unit, "V<int>", SpecializationKind::Undeclared, false, true);
        let done = add_specialization(&mut unit, "V<char>", SpecializationKind::ImplicitInstantiation, false, true);
        unit.script_instantiation(spec, true, None);

        assert!(instantiate_specialization(&mut unit, Cursor::declaration(spec)));
        assert!(instantiate_specialization(&mut unit, Cursor::declaration(done)));
        assert!(!instantiate_specialization(&mut unit, Cursor::NULL));
    }

    #[test]
    fn test_instantiate_all_metrics() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let ok = add_specialization(&mut unit, "A<int>", SpecializationKind::Undeclared, false, true);
        let bad = add_specialization(&mut unit, "A<void>", SpecializationKind::Undeclared, false, true);
        add_specialization(&mut unit, "A<T*>", SpecializationKind::Undeclared, true, true);
        add_specialization(&mut unit, "A<long>", SpecializationKind::ExplicitSpecialization, false, true);
        add_specialization(&mut unit, "Never<int>", SpecializationKind::Undeclared, false, false);
        unit.script_instantiation(ok, true, None);
        unit.script_instantiation(bad, false, None);

        let metrics = instantiate_all_specializations(&mut unit);
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
            specialization_kind(&unit, Cursor::declaration(ok)),
            TemplateSpecializationKind::ImplicitInstantiation
        );
    }

    #[test]
    fn test_enumerate_visits_every_specialization() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        add_specialization(&mut unit, "A<int>", SpecializationKind::Undeclared, false, true);
        add_specialization(&mut unit, "A<T*>", SpecializationKind::Undeclared, true, true);
        unit.add_record("Plain", TagKind::Struct, None);

        let mut seen = Vec::new();
        enumerate_specializations(&unit, |kind, cursor| seen.push((kind, cursor)));
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|(kind, _)| *kind == TemplateSpecializationKind::Undeclared));
    }
}
