//! Walks an in-memory translation unit through every cppabi query and prints
//! what a binding generator would see.
//!
//! Set `CPPABI_LOG_LEVEL=debug` to watch the queries reject bad input.

mod dump;

use cppabi::frontend::{
    AbiArgInfo, ApFloat, ApValue, ApsInt, AstContext, AstRecordLayout, CgFunctionInfo, Cursor, CxxRecord, Decl,
    DeclId, DeclKind, EvalResult, Expr, ExprKind, FunctionDecl, FunctionKind, GlobalDecl, LValue, LValueBase,
    MacroInfo, MemoryUnit, OverloadedOperatorKind, SourceLocation, StringLiteral, StringLiteralKind, TagKind,
    TargetInfo, TypeRef, VTableComponent, VarDecl,
};
use cppabi::{LogOptions, Result};
use tracing::{info, warn};

/// `struct Flags { unsigned ready : 1; unsigned mode : 3; unsigned short id; };`
fn add_flags(unit: &mut MemoryUnit) -> DeclId {
    let unsigned = unit.builtin("unsigned int");
    let ushort = unit.builtin("unsigned short");
    let flags = unit.add_record("Flags", TagKind::Struct, None);
    unit.add_field(flags, "ready", unsigned, Some(1));
    unit.add_field(flags, "mode", unsigned, Some(3));
    unit.add_field(flags, "id", ushort, None);
    unit.set_record_layout(
        flags,
        AstRecordLayout {
            size: 4,
            alignment: 4,
            field_offsets: vec![0, 1, 16],
            ..Default::default()
        },
    );
    flags
}

/// `class Shape { virtual ~Shape(); virtual double area(); int sides; };`
fn add_shape(unit: &mut MemoryUnit) -> DeclId {
    let int = unit.builtin("int");
    let double = unit.builtin("double");
    let shape = unit.add_record(
        "Shape",
        TagKind::Class,
        Some(CxxRecord {
            is_dynamic: true,
            ..Default::default()
        }),
    );
    unit.add_field(shape, "sides", int, None);

    let area_ty = unit.function_type(double, vec![], false);
    let area = unit.add_child_decl(
        shape,
        Decl::new(
            "area",
            DeclKind::Function(FunctionDecl {
                ty: area_ty,
                kind: FunctionKind::Method,
                overloaded_operator: OverloadedOperatorKind::None,
            }),
        ),
    );
    let void = unit.void_type();
    let dtor_ty = unit.function_type(void, vec![], false);
    let dtor = unit.add_child_decl(
        shape,
        Decl::new(
            "~Shape",
            DeclKind::Function(FunctionDecl {
                ty: dtor_ty,
                kind: FunctionKind::Destructor,
                overloaded_operator: OverloadedOperatorKind::None,
            }),
        ),
    );

    unit.set_record_layout(
        shape,
        AstRecordLayout {
            size: 16,
            alignment: 8,
            non_virtual_size: 16,
            non_virtual_alignment: 8,
            field_offsets: vec![64],
            ..Default::default()
        },
    );
    unit.set_itanium_vtable(
        shape,
        vec![
            VTableComponent::OffsetToTop(0),
            VTableComponent::Rtti(shape),
            VTableComponent::CompleteDtorPointer(dtor),
            VTableComponent::DeletingDtorPointer(dtor),
            VTableComponent::FunctionPointer(area),
        ],
    );

    let mut info = CgFunctionInfo::c(double, AbiArgInfo::direct());
    info.is_instance_method = true;
    let this = unit.pointer_to(unit.record_type(shape));
    unit.set_arrangement(GlobalDecl::Function(area), info.with_argument(this, AbiArgInfo::direct()));
    shape
}

/// `int blend(Flags, char)` with the struct passed indirectly
fn add_blend(unit: &mut MemoryUnit, flags: DeclId) -> Cursor {
    let int = unit.builtin("int");
    let char_ty = unit.builtin("char");
    let flags_ty = unit.record_type(flags);
    let ty = unit.function_type(int, vec![flags_ty, char_ty], false);
    let blend = unit.add_decl(Decl::new(
        "blend",
        DeclKind::Function(FunctionDecl {
            ty,
            kind: FunctionKind::Free,
            overloaded_operator: OverloadedOperatorKind::None,
        }),
    ));
    let info = CgFunctionInfo::c(int, AbiArgInfo::extend(true))
        .with_argument(flags_ty, AbiArgInfo::indirect(4, true))
        .with_argument(char_ty, AbiArgInfo::extend(true));
    unit.set_arrangement(GlobalDecl::Function(blend), info);
    Cursor::declaration(blend)
}

fn add_variable(unit: &mut MemoryUnit, name: &str, ty: TypeRef, value: ApValue) -> Cursor {
    let init = unit.add_expr(Expr { ty, kind: ExprKind::Other });
    unit.set_evaluation(init, EvalResult::folded(value));
    let id = unit.add_decl(Decl::new(name, DeclKind::Var(VarDecl { ty, init: Some(init) })));
    Cursor::declaration(id)
}

fn add_constants(unit: &mut MemoryUnit) -> Vec<(&'static str, Cursor)> {
    let int = unit.builtin("int");
    let double = unit.builtin("double");
    let char_ty = unit.builtin("const char");
    let string_ty = unit.pointer_to(char_ty);
    let literal = unit.add_expr(Expr {
        ty: string_ty,
        kind: ExprKind::StringLiteral(StringLiteral {
            kind: StringLiteralKind::Utf8,
            char_byte_width: 1,
            bytes: b"cppabi".to_vec(),
        }),
    });

    vec![
        ("kMinusOne", add_variable(unit, "kMinusOne", int, ApValue::Int(ApsInt::signed(-1, 32)))),
        ("kPi", add_variable(unit, "kPi", double, ApValue::Float(ApFloat::from_f64(std::f64::consts::PI)))),
        (
            "kName",
            add_variable(
                unit,
                "kName",
                string_ty,
                ApValue::LValue(LValue {
                    base: LValueBase::Expr(literal),
                    is_null_pointer: false,
                }),
            ),
        ),
    ]
}

fn add_macros(unit: &mut MemoryUnit) {
    unit.define_macro(
        "SHAPE_API",
        MacroInfo {
            location: SourceLocation::new(1, 1, 9),
            ..Default::default()
        },
    );
    unit.define_macro(
        "CLAMP",
        MacroInfo {
            location: SourceLocation::new(1, 2, 9),
            params: vec!["value".to_string(), "lo".to_string(), "hi".to_string()],
            is_function_like: true,
            ..Default::default()
        },
    );
    unit.define_macro("LEGACY", MacroInfo::default());
    unit.undefine_macro("LEGACY", SourceLocation::new(1, 4, 8));
}

fn main() -> Result<()> {
    cppabi::init_logging(LogOptions::from_env());

    let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
    let flags = add_flags(&mut unit);
    let shape = add_shape(&mut unit);
    let blend = add_blend(&mut unit, flags);
    let constants = add_constants(&mut unit);
    add_macros(&mut unit);
    info!(abi = ?unit.target().cxx_abi, "translation unit built");

    println!("=== Record layouts ===");
    for (name, record) in [("Flags", flags), ("Shape", shape)] {
        let layout = cppabi::record_layout(&unit, Cursor::declaration(record))?;
        dump::print_layout(&unit, name, &layout);
    }

    println!("\n=== Arrangements ===");
    let arranged = cppabi::arrange_function(&unit, blend)?;
    dump::print_arrangement(&unit, "blend", &arranged);
    if let Err(error) = cppabi::arrange_function(&unit, Cursor::declaration(shape)) {
        warn!(%error, "Shape is not callable");
    }

    println!("\n=== Constants ===");
    for (name, cursor) in constants {
        match cppabi::compute_constant_value(&unit, cursor)? {
            Some(value) => dump::print_constant(name, &value),
            None => println!("{name}: <no value>"),
        }
    }

    println!("\n=== Macros ===");
    cppabi::enumerate_macros(&unit, dump::print_macro);

    Ok(())
}
