//! Flattened record layouts
//!
//! The front-end describes a record as sizes, a field offset table and per-base
//! offset maps. This module flattens that into one list of slots ordered by
//! byte offset, with synthetic slots for the parts of the object that have no
//! declaration of their own:
//!
//! ```text
//! struct Derived : Base, virtual VBase { virtual void f(); int x; };
//!
//!   offset  kind                 name
//!   0       VTablePtr            vtable_pointer | vftable_pointer
//!   0       NonVirtualBase       primary_base / base
//!   8       VirtualBaseTablePtr  vbtable_pointer        (Microsoft)
//!   16      Normal               x
//!   20      VTorDisp             vtordisp               (Microsoft)
//!   24      VirtualBase          virtual_base
//! ```
//!
//! Slots with equal offsets keep their insertion order.

use std::borrow::Cow;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::frontend::{AstContext, BaseSpecifier, Cursor, Decl, DeclId, DeclKind, TypeKind, TypeRef};
use crate::kinds::RecordFieldKind;
use crate::vtable::{VTableLayout, vtable_layouts};

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSlot {
    pub kind: RecordFieldKind,
    /// Byte offset from the start of the record
    pub offset: i64,
    pub name: Cow<'static, str>,
    /// Field type, base type, `void**` for vtable pointers, `void*` for vbtable pointers
    pub ty: TypeRef,
    /// The field's declaration, `Normal` slots only
    pub field_declaration: Cursor,
    pub is_bit_field: bool,
    pub bit_field_start: u32,
    pub bit_field_width: u32,
    pub is_primary_base: bool,
}

impl LayoutSlot {
    pub fn new(kind: RecordFieldKind, offset: i64, name: impl Into<Cow<'static, str>>, ty: TypeRef) -> Self {
        Self {
            kind,
            offset,
            name: name.into(),
            ty,
            field_declaration: Cursor::NULL,
            is_bit_field: false,
            bit_field_start: 0,
            bit_field_width: 0,
            is_primary_base: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordLayout {
    pub size: i64,
    pub alignment: i64,
    pub is_cpp_record: bool,
    pub non_virtual_size: i64,
    pub non_virtual_alignment: i64,
    pub slots: Vec<LayoutSlot>,
    pub vtables: Vec<VTableLayout>,
}

impl RecordLayout {
    /// Inserts before the first slot whose offset is greater than `slot.offset`
    pub fn insert_slot(&mut self, slot: LayoutSlot) -> &mut LayoutSlot {
        let index = self
            .slots
            .partition_point(|existing| existing.offset <= slot.offset);
        self.slots.insert(index, slot);
        &mut self.slots[index]
    }

    pub fn slots_of_kind(&self, kind: RecordFieldKind) -> impl Iterator<Item = &LayoutSlot> + '_ {
        self.slots.iter().filter(move |slot| slot.kind == kind)
    }

    pub fn slot(&self, name: &str) -> Option<&LayoutSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }
}

/// Builds the flattened layout of the record `cursor` names.
///
/// Forward declarations resolve to their definition; records without one have
/// no layout.
pub fn record_layout<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> Result<RecordLayout> {
    let Some((_, decl)) = unit.cursor_declaration(cursor) else {
        debug!(?cursor, "layout requested for a non-declaration");
        return Err(Error::NotADeclaration);
    };
    let Some(record) = decl.as_record() else {
        debug!(name = %decl.name, "layout requested for a non-record");
        return Err(Error::NotARecord(decl.name.clone()));
    };
    let Some(definition_id) = record.definition else {
        debug!(name = %decl.name, "layout requested for an incomplete record");
        return Err(Error::IncompleteRecord(decl.name.clone()));
    };
    let (definition_decl, definition) = match unit.declaration(definition_id) {
        Some(def) => match def.as_record() {
            Some(record) => (def, record),
            None => return Err(Error::NotARecord(def.name.clone())),
        },
        None => return Err(Error::IncompleteRecord(decl.name.clone())),
    };
    let name = definition_decl.name.as_str();
    let Some(layout) = unit.record_layout(definition_id) else {
        return Err(Error::MissingLayout(name.to_string()));
    };

    let target = unit.target();
    let cxx = definition.cxx.as_ref();
    let mut ret = RecordLayout {
        size: layout.size,
        alignment: layout.alignment,
        is_cpp_record: cxx.is_some(),
        ..Default::default()
    };

    if let Some(cxx) = cxx {
        ret.non_virtual_size = layout.non_virtual_size;
        ret.non_virtual_alignment = layout.non_virtual_alignment;

        // Vtable pointer
        if cxx.is_dynamic && layout.primary_base.is_none() && !target.is_microsoft() {
            ret.insert_slot(LayoutSlot::new(
                RecordFieldKind::VTablePtr,
                0,
                "vtable_pointer",
                unit.void_pointer_pointer_type(),
            ));
        } else if layout.has_own_vfptr {
            ret.insert_slot(LayoutSlot::new(
                RecordFieldKind::VTablePtr,
                0,
                "vftable_pointer",
                unit.void_pointer_pointer_type(),
            ));
        }

        // Non-virtual bases
        for base in &cxx.bases {
            let base_id = resolve_base(unit, name, base)?;
            if base.is_virtual {
                continue;
            }
            let Some(&offset) = layout.base_offsets.get(&base_id) else {
                return Err(Error::MissingBaseOffset {
                    record: name.to_string(),
                    base: decl_name(unit, base_id),
                });
            };
            let is_primary = layout.primary_base == Some(base_id);
            let slot = ret.insert_slot(LayoutSlot::new(
                RecordFieldKind::NonVirtualBase,
                offset,
                if is_primary { "primary_base" } else { "base" },
                base.ty,
            ));
            slot.is_primary_base = is_primary;
        }

        // Virtual base table pointer
        if layout.has_own_vbptr {
            ret.insert_slot(LayoutSlot::new(
                RecordFieldKind::VirtualBaseTablePtr,
                layout.vbptr_offset,
                "vbtable_pointer",
                unit.void_pointer_type(),
            ));
        }
    }

    // Fields
    let char_width = i64::from(target.char_width.max(1));
    for (index, &field_id) in definition.fields.iter().enumerate() {
        let Some(field_decl) = unit.declaration(field_id) else {
            continue;
        };
        let DeclKind::Field(field) = &field_decl.kind else {
            continue;
        };
        let Some(&offset_bits) = layout.field_offsets.get(index) else {
            return Err(Error::MissingFieldOffset {
                record: name.to_string(),
                field: field_decl.name.clone(),
            });
        };
        let Ok(offset_bits) = i64::try_from(offset_bits) else {
            debug!(record = name, field = %field_decl.name, offset_bits, "field offset overflows");
            return Err(Error::FieldOffsetOverflow {
                record: name.to_string(),
                field: field_decl.name.clone(),
            });
        };
        let offset = offset_bits / char_width;

        let mut slot = LayoutSlot::new(
            RecordFieldKind::Normal,
            offset,
            Cow::Owned(field_decl.name.clone()),
            field.ty,
        );
        slot.field_declaration = Cursor::declaration(field_id);
        if let Some(width) = field.bit_width {
            slot.is_bit_field = true;
            slot.bit_field_start = (offset_bits - offset * char_width) as u32;
            slot.bit_field_width = width;
        }
        ret.insert_slot(slot);
    }

    if let Some(cxx) = cxx {
        // Virtual bases
        for vbase in &cxx.vbases {
            let base_id = resolve_base(unit, name, vbase)?;
            let Some(info) = layout.vbase_offsets.get(&base_id).copied() else {
                return Err(Error::MissingBaseOffset {
                    record: name.to_string(),
                    base: decl_name(unit, base_id),
                });
            };

            if info.has_vtordisp {
                ret.insert_slot(LayoutSlot::new(RecordFieldKind::VTorDisp, info.offset - 4, "vtordisp", vbase.ty));
            }

            let is_primary = layout.primary_base == Some(base_id);
            let slot = ret.insert_slot(LayoutSlot::new(
                RecordFieldKind::VirtualBase,
                info.offset,
                if is_primary { "primary_virtual_base" } else { "virtual_base" },
                vbase.ty,
            ));
            slot.is_primary_base = is_primary;
        }

        if cxx.is_dynamic {
            ret.vtables = vtable_layouts(unit, definition_id)?;
        }
    }

    for slot in &ret.slots {
        trace!(record = name, kind = ?slot.kind, offset = slot.offset, slot = %slot.name, "layout slot");
    }
    debug!(record = name, size = ret.size, slots = ret.slots.len(), vtables = ret.vtables.len(), "built record layout");
    Ok(ret)
}

fn resolve_base<C: AstContext + ?Sized>(unit: &C, record: &str, base: &BaseSpecifier) -> Result<DeclId> {
    match unit.type_node(base.ty).map(|node| &node.kind) {
        Some(TypeKind::Record(id)) => Ok(*id),
        Some(TypeKind::Dependent) => {
            let base = unit
                .type_node(base.ty)
                .map(|node| node.spelling.clone())
                .unwrap_or_default();
            debug!(record, base = %base, "record has a dependent base");
            Err(Error::DependentBase {
                record: record.to_string(),
                base,
            })
        }
        _ => Err(Error::UnresolvedBase {
            record: record.to_string(),
        }),
    }
}

fn decl_name<C: AstContext + ?Sized>(unit: &C, id: DeclId) -> String {
    unit.declaration(id)
        .map(|decl: &Decl| decl.name.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{AstRecordLayout, CxxRecord, MemoryUnit, TagKind, TargetInfo, VBaseInfo, VTableComponent};

    fn cxx(is_dynamic: bool) -> Option<CxxRecord> {
        Some(CxxRecord {
            is_dynamic,
            ..Default::default()
        })
    }

    #[test]
    fn test_insert_slot_keeps_ties_in_insertion_order() {
        let mut layout = RecordLayout::default();
        layout.insert_slot(LayoutSlot::new(RecordFieldKind::Normal, 8, "b", TypeRef(0)));
        layout.insert_slot(LayoutSlot::new(RecordFieldKind::Normal, 0, "a", TypeRef(0)));
        layout.insert_slot(LayoutSlot::new(RecordFieldKind::Normal, 8, "c", TypeRef(0)));
        layout.insert_slot(LayoutSlot::new(RecordFieldKind::Normal, 4, "d", TypeRef(0)));

        let names: Vec<_> = layout.slots.iter().map(|s| s.name.as_ref()).collect();
        assert_eq!(names, ["a", "d", "b", "c"]);
    }

    #[test]
    fn test_plain_struct() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let int = unit.builtin("int");
        let char_ty = unit.builtin("char");
        let record = unit.add_record("Point", TagKind::Struct, None);
        unit.add_field(record, "x", int, None);
        unit.add_field(record, "tag", char_ty, None);
        unit.set_record_layout(
            record,
            AstRecordLayout {
                size: 8,
                alignment: 4,
                field_offsets: vec![0, 32],
                ..Default::default()
            },
        );

        let layout = record_layout(&unit, Cursor::declaration(record)).unwrap();
        assert!(!layout.is_cpp_record);
        assert_eq!(layout.size, 8);
        assert_eq!(layout.slots.len(), 2);
        assert_eq!(layout.slots[1].name, "tag");
        assert_eq!(layout.slots[1].offset, 4);
        assert_eq!(layout.slots[1].ty, char_ty);
        assert!(layout.vtables.is_empty());
    }

    #[test]
    fn test_bit_fields_record_start_and_width() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let uint = unit.builtin("unsigned int");
        let record = unit.add_record("Flags", TagKind::Struct, None);
        unit.add_field(record, "a", uint, Some(3));
        unit.add_field(record, "b", uint, Some(7));
        unit.set_record_layout(
            record,
            AstRecordLayout {
                size: 4,
                alignment: 4,
                field_offsets: vec![0, 3],
                ..Default::default()
            },
        );

        let layout = record_layout(&unit, Cursor::declaration(record)).unwrap();
        let b = layout.slot("b").unwrap();
        assert!(b.is_bit_field);
        assert_eq!(b.offset, 0);
        assert_eq!(b.bit_field_start, 3);
        assert_eq!(b.bit_field_width, 7);
    }

    #[test]
    fn test_itanium_dynamic_class_gets_vtable_pointer_first() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let int = unit.builtin("int");
        let record = unit.add_record("Shape", TagKind::Class, cxx(true));
        unit.add_field(record, "sides", int, None);
        unit.set_record_layout(
            record,
            AstRecordLayout {
                size: 16,
                alignment: 8,
                non_virtual_size: 16,
                non_virtual_alignment: 8,
                field_offsets: vec![64],
                ..Default::default()
            },
        );
        unit.set_itanium_vtable(record, vec![VTableComponent::OffsetToTop(0), VTableComponent::Rtti(record)]);

        let layout = record_layout(&unit, Cursor::declaration(record)).unwrap();
        assert_eq!(layout.slots[0].kind, RecordFieldKind::VTablePtr);
        assert_eq!(layout.slots[0].name, "vtable_pointer");
        assert_eq!(layout.slots[0].offset, 0);
        assert_eq!(layout.slots[0].ty, unit.void_pointer_pointer_type());
        assert_eq!(layout.slots_of_kind(RecordFieldKind::VTablePtr).count(), 1);
        assert_eq!(layout.vtables.len(), 1);
        assert_eq!(layout.non_virtual_size, 16);
    }

    #[test]
    fn test_derived_with_primary_base_has_no_own_pointer() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let int = unit.builtin("int");
        let base = unit.add_record("Base", TagKind::Class, cxx(true));
        let derived = unit.add_record("Derived", TagKind::Class, cxx(true));
        unit.add_base(derived, base, false);
        unit.add_field(derived, "extra", int, None);
        unit.set_record_layout(
            derived,
            AstRecordLayout {
                size: 16,
                alignment: 8,
                primary_base: Some(base),
                field_offsets: vec![96],
                base_offsets: [(base, 0)].into_iter().collect(),
                ..Default::default()
            },
        );
        unit.set_itanium_vtable(derived, vec![VTableComponent::OffsetToTop(0)]);

        let layout = record_layout(&unit, Cursor::declaration(derived)).unwrap();
        assert_eq!(layout.slots_of_kind(RecordFieldKind::VTablePtr).count(), 0);
        assert_eq!(layout.slots[0].name, "primary_base");
        assert!(layout.slots[0].is_primary_base);
        assert_eq!(layout.slots[0].ty, unit.record_type(base));
        assert_eq!(layout.slots[1].name, "extra");
    }

    #[test]
    fn test_microsoft_virtual_base_with_vtordisp() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_windows());
        let int = unit.builtin("int");
        let vbase = unit.add_record("VBase", TagKind::Class, cxx(true));
        let record = unit.add_record("Holder", TagKind::Class, cxx(true));
        unit.add_base(record, vbase, true);
        unit.add_virtual_base(record, vbase);
        unit.add_field(record, "value", int, None);
        unit.set_record_layout(
            record,
            AstRecordLayout {
                size: 32,
                alignment: 8,
                has_own_vbptr: true,
                vbptr_offset: 0,
                field_offsets: vec![64],
                vbase_offsets: [(vbase, VBaseInfo { offset: 20, has_vtordisp: true })].into_iter().collect(),
                ..Default::default()
            },
        );

        let layout = record_layout(&unit, Cursor::declaration(record)).unwrap();
        let kinds: Vec<_> = layout.slots.iter().map(|s| (s.kind, s.offset)).collect();
        assert_eq!(
            kinds,
            [
                (RecordFieldKind::VirtualBaseTablePtr, 0),
                (RecordFieldKind::Normal, 8),
                (RecordFieldKind::VTorDisp, 16),
                (RecordFieldKind::VirtualBase, 20),
            ]
        );
        assert_eq!(layout.slot("vbtable_pointer").unwrap().ty, unit.void_pointer_type());
        assert_eq!(layout.slot("virtual_base").unwrap().ty, unit.record_type(vbase));
        // No vfptrs registered, so no tables either
        assert!(layout.vtables.is_empty());
    }

    #[test]
    fn test_forward_declaration_uses_definition() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let int = unit.builtin("int");
        let record = unit.add_record("Node", TagKind::Struct, None);
        unit.add_field(record, "value", int, None);
        unit.set_record_layout(
            record,
            AstRecordLayout {
                size: 4,
                alignment: 4,
                field_offsets: vec![0],
                ..Default::default()
            },
        );
        let forward = unit.add_forward_declaration("Node", TagKind::Struct, Some(record));

        let layout = record_layout(&unit, Cursor::declaration(forward)).unwrap();
        assert_eq!(layout.slots.len(), 1);
    }

    #[test]
    fn test_forward_declared_only_record_has_no_layout() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let forward = unit.add_forward_declaration("Opaque", TagKind::Struct, None);
        assert_eq!(
            record_layout(&unit, Cursor::declaration(forward)),
            Err(Error::IncompleteRecord("Opaque".into()))
        );
    }

    #[test]
    fn test_rejects_non_records() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let other = unit.add_decl(Decl::new("ns", DeclKind::Other));
        assert_eq!(record_layout(&unit, Cursor::NULL), Err(Error::NotADeclaration));
        assert_eq!(
            record_layout(&unit, Cursor::declaration(other)),
            Err(Error::NotARecord("ns".into()))
        );
    }

    #[test]
    fn test_dependent_base_is_rejected() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let dependent = unit.dependent_type("T");
        let record = unit.add_record("Wrapper", TagKind::Class, cxx(false));
        if let Some(cxx) = unit.record_mut(record).and_then(|r| r.cxx.as_mut()) {
            cxx.bases.push(BaseSpecifier { ty: dependent, is_virtual: false });
        }
        unit.set_record_layout(record, AstRecordLayout::default());

        assert!(matches!(
            record_layout(&unit, Cursor::declaration(record)),
            Err(Error::DependentBase { .. })
        ));
    }

    #[test]
    fn test_field_offset_past_i64_is_rejected() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let int = unit.builtin("int");
        let record = unit.add_record("Huge", TagKind::Struct, None);
        unit.add_field(record, "far", int, None);
        unit.set_record_layout(
            record,
            AstRecordLayout {
                size: 8,
                alignment: 4,
                field_offsets: vec![u64::MAX],
                ..Default::default()
            },
        );

        assert!(matches!(
            record_layout(&unit, Cursor::declaration(record)),
            Err(Error::FieldOffsetOverflow { .. })
        ));
    }
}
