//! Plain-text dumps of query results

use cppabi::frontend::{AstContext, TypeRef};
use cppabi::kinds::VTableEntryKind;
use cppabi::{ArrangedFunction, Constant, ConstantValue, MacroDescriptor, RecordLayout};

fn spelling(unit: &dyn AstContext, ty: TypeRef) -> String {
    unit.print_type(ty, "")
}

pub fn print_layout(unit: &dyn AstContext, name: &str, layout: &RecordLayout) {
    println!(
        "{name}: size {} align {} (non-virtual size {} align {})",
        layout.size, layout.alignment, layout.non_virtual_size, layout.non_virtual_alignment
    );
    for slot in &layout.slots {
        let kind = format!("{:?}", slot.kind);
        let mut line = format!("  {:>4}  {kind:<20} {:<16} {}", slot.offset, slot.name, spelling(unit, slot.ty));
        if slot.is_bit_field {
            line.push_str(&format!(" : {} @ bit {}", slot.bit_field_width, slot.bit_field_start));
        }
        if slot.is_primary_base {
            line.push_str(" (primary)");
        }
        println!("{line}");
    }

    for (index, vtable) in layout.vtables.iter().enumerate() {
        println!("  vtable #{index} ({} entries)", vtable.len());
        for (slot, entry) in vtable.entries.iter().enumerate() {
            let detail = match entry.kind {
                VTableEntryKind::VCallOffset | VTableEntryKind::VBaseOffset | VTableEntryKind::OffsetToTop => {
                    entry.offset.to_string()
                }
                VTableEntryKind::RTTI => format!("{:?}", entry.rtti_type),
                _ => format!("{:?}", entry.method_declaration),
            };
            println!("    [{slot}] {:?} {detail}", entry.kind);
        }
    }
}

pub fn print_arrangement(unit: &dyn AstContext, name: &str, function: &ArrangedFunction) {
    println!(
        "{name}: {:?} (effective {:?}, source {:?}), {} required argument(s)",
        function.calling_convention,
        function.effective_calling_convention,
        function.ast_calling_convention,
        function.required_argument_count
    );
    println!(
        "  return    {:<12} {:?} {:?}",
        spelling(unit, function.return_info.ty),
        function.return_info.kind,
        function.return_info.flags
    );
    for (index, argument) in function.arguments.iter().enumerate() {
        println!(
            "  arg {index:<5} {:<12} {:?} {:?}",
            spelling(unit, argument.ty),
            argument.kind,
            argument.flags
        );
    }
}

pub fn print_constant(name: &str, value: &ConstantValue) {
    let rendered = match &value.constant {
        Constant::String { encoding, bytes } => format!("{:?} {:?}", encoding.kind, String::from_utf8_lossy(bytes)),
        Constant::SignedInteger { value, .. } => value.to_string(),
        Constant::FloatingPoint { bit_width: 64, bits } => f64::from_bits(*bits).to_string(),
        Constant::FloatingPoint { bit_width: 32, bits } => f32::from_bits(*bits as u32).to_string(),
        _ => format!("{:#x}", value.value()),
    };
    println!("{name}: {:?}/{} = {rendered}", value.kind(), value.sub_kind());
}

pub fn print_macro(descriptor: &MacroDescriptor<'_>) {
    let mut line = descriptor.name.to_string();
    if descriptor.is_function_like {
        line.push('(');
        line.push_str(&descriptor.parameters.join(", "));
        line.push(')');
    }
    if descriptor.was_undefined {
        line.push_str(" (undefined)");
    }
    println!("  {line} at {}:{}", descriptor.location.line, descriptor.location.column);
}
