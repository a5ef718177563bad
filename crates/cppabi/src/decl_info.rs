//! Declaration helpers
//!
//! Small queries that libclang's own API does not answer: operator overload
//! metadata, raw enum constant values, argument passing restrictions, UUID
//! attributes, declaration context walking and callability checks.

use std::ffi::CStr;

use tracing::debug;

use crate::frontend::{AstContext, Attr, Cursor, DeclKind, Sema, SourceLocation, TypeKind, TypeRef};
use crate::guid::Guid;
use crate::kinds::{ArgPassingKind, OperatorOverloadKind};

// =============================================================================
// Operator overloads
// =============================================================================

/// Static metadata for one overloaded operator kind.
///
/// `None` and `Invalid` carry no name or spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorOverloadInfo {
    pub kind: OperatorOverloadKind,
    pub name: Option<&'static CStr>,
    pub spelling: Option<&'static CStr>,
    pub is_unary: bool,
    pub is_binary: bool,
    pub is_member_only: bool,
}

impl OperatorOverloadInfo {
    const fn unnamed(kind: OperatorOverloadKind) -> Self {
        Self {
            kind,
            name: None,
            spelling: None,
            is_unary: false,
            is_binary: false,
            is_member_only: false,
        }
    }
}

const fn cstr(s: &'static str) -> &'static CStr {
    match CStr::from_bytes_with_nul(s.as_bytes()) {
        Ok(s) => s,
        Err(_) => panic!("operator names are nul-terminated"),
    }
}

macro_rules! operators {
    ($($kind:ident $spelling:literal $unary:literal $binary:literal $member_only:literal;)*) => {
        [
            OperatorOverloadInfo::unnamed(OperatorOverloadKind::None),
            $(
                OperatorOverloadInfo {
                    kind: OperatorOverloadKind::$kind,
                    name: Some(cstr(concat!(stringify!($kind), "\0"))),
                    spelling: Some(cstr(concat!($spelling, "\0"))),
                    is_unary: $unary,
                    is_binary: $binary,
                    is_member_only: $member_only,
                },
            )*
            OperatorOverloadInfo::unnamed(OperatorOverloadKind::Invalid),
        ]
    };
}

/// Indexed by [`OperatorOverloadKind::to_raw`]
pub(crate) const OPERATOR_TABLE: [OperatorOverloadInfo; OperatorOverloadKind::COUNT] = operators! {
    New "new" true true false;
    Delete "delete" true true false;
    ArrayNew "new[]" true true false;
    ArrayDelete "delete[]" true true false;
    Plus "+" true true false;
    Minus "-" true true false;
    Star "*" true true false;
    Slash "/" false true false;
    Percent "%" false true false;
    Caret "^" false true false;
    Amp "&" true true false;
    Pipe "|" false true false;
    Tilde "~" true false false;
    Exclaim "!" true false false;
    Equal "=" false true true;
    Less "<" false true false;
    Greater ">" false true false;
    PlusEqual "+=" false true false;
    MinusEqual "-=" false true false;
    StarEqual "*=" false true false;
    SlashEqual "/=" false true false;
    PercentEqual "%=" false true false;
    CaretEqual "^=" false true false;
    AmpEqual "&=" false true false;
    PipeEqual "|=" false true false;
    LessLess "<<" false true false;
    GreaterGreater ">>" false true false;
    LessLessEqual "<<=" false true false;
    GreaterGreaterEqual ">>=" false true false;
    EqualEqual "==" false true false;
    ExclaimEqual "!=" false true false;
    LessEqual "<=" false true false;
    GreaterEqual ">=" false true false;
    Spaceship "<=>" false true false;
    AmpAmp "&&" false true false;
    PipePipe "||" false true false;
    PlusPlus "++" true true false;
    MinusMinus "--" true true false;
    Comma "," false true false;
    ArrowStar "->*" false true false;
    Arrow "->" true false true;
    Call "()" true true true;
    Subscript "[]" false true true;
    Conditional "?" false true false;
    Coawait "co_await" true false false;
};

static OPERATORS: [OperatorOverloadInfo; OperatorOverloadKind::COUNT] = OPERATOR_TABLE;

const _: () = {
    let mut i = 0;
    while i < OPERATOR_TABLE.len() {
        assert!(OPERATOR_TABLE[i].kind as usize == i, "operator table is out of order");
        i += 1;
    }
};

/// Operator metadata for a function declaration. `None` for anything that is
/// not a function.
pub fn operator_overload_info<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> Option<&'static OperatorOverloadInfo> {
    let (_, decl) = unit.cursor_declaration(cursor)?;
    let function = decl.as_function()?;
    let index = usize::try_from(function.overloaded_operator as i32)
        .ok()
        .filter(|&index| index < OPERATORS.len())
        .unwrap_or(OperatorOverloadKind::Invalid as usize);
    Some(&OPERATORS[index])
}

// =============================================================================
// Records and enums
// =============================================================================

/// `u64::MAX` when `cursor` is not an enum constant
pub fn enum_constant_value_zero_extended<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> u64 {
    let Some((_, decl)) = unit.cursor_declaration(cursor) else {
        return u64::MAX;
    };
    match &decl.kind {
        DeclKind::EnumConstant(constant) => constant.value.zext_value().unwrap_or_else(|| {
            debug!(name = %decl.name, "enum constant does not fit in 64 bits");
            u64::MAX
        }),
        _ => u64::MAX,
    }
}

pub fn arg_passing_restrictions<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> ArgPassingKind {
    unit.cursor_declaration(cursor)
        .and_then(|(_, decl)| decl.as_record())
        .map_or(ArgPassingKind::Invalid, |record| record.arg_passing.into())
}

/// Raw text of a `__declspec(uuid(...))` attribute cursor
pub fn uuid_attr_text<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> Option<&str> {
    match unit.attribute(cursor.as_attribute()?)? {
        Attr::Uuid(text) => Some(text),
        Attr::Other(_) => None,
    }
}

pub fn uuid_attr_guid<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> Option<Guid> {
    let text = uuid_attr_text(unit, cursor)?;
    match text.parse() {
        Ok(guid) => Some(guid),
        Err(error) => {
            debug!(text, %error, "unparseable uuid attribute");
            None
        }
    }
}

/// Like libclang's main-file test, except that locations inside macro
/// expansions count as the file the expansion ends up in.
pub fn location_is_from_main_file<C: AstContext + ?Sized>(unit: &C, location: SourceLocation) -> bool {
    location.is_valid() && unit.is_in_main_file(location)
}

// =============================================================================
// Raw declaration enumeration
// =============================================================================

/// First child of the declaration context `cursor` names, implicit
/// declarations included. Null when there is none.
pub fn begin_enumerate_declarations_raw<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> Cursor {
    cursor
        .as_declaration()
        .and_then(|id| unit.first_decl_in_context(id))
        .map_or(Cursor::NULL, Cursor::declaration)
}

pub fn enumerate_declarations_raw_move_next<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> Cursor {
    cursor
        .as_declaration()
        .and_then(|id| unit.next_decl_in_context(id))
        .map_or(Cursor::NULL, Cursor::declaration)
}

// =============================================================================
// Callability
// =============================================================================

/// Checks that a call to the function could be emitted: the return type and
/// every parameter type must be complete (or completable).
///
/// Returns the diagnostics on failure.
pub fn is_function_callable<U: AstContext + Sema + ?Sized>(unit: &mut U, cursor: Cursor) -> Result<(), Vec<String>> {
    let Some(ty) = unit
        .cursor_declaration(cursor)
        .and_then(|(_, decl)| decl.as_function())
        .map(|function| function.ty)
    else {
        debug!(?cursor, "callability requested for a non-function");
        return Err(vec!["The specified cursor is not a FunctionDecl.".to_string()]);
    };
    is_function_type_callable(unit, ty)
}

pub fn is_function_type_callable<U: AstContext + Sema + ?Sized>(unit: &mut U, ty: TypeRef) -> Result<(), Vec<String>> {
    if ty.is_null() {
        debug!("callability requested for a null type");
        return Err(vec!["The specified type is null.".to_string()]);
    }
    let proto = match unit.type_node(ty).map(|node| &node.kind) {
        Some(TypeKind::FunctionProto(proto)) => proto.clone(),
        _ => {
            debug!(?ty, "callability requested for a non-prototype");
            return Err(vec!["The specified type is not a FunctionProtoType.".to_string()]);
        }
    };

    let mut diagnostics = Vec::new();

    let returns_void = matches!(unit.type_node(proto.result).map(|node| &node.kind), Some(TypeKind::Void));
    if !returns_void && !unit.require_complete_type(proto.result) {
        diagnostics.push(format!("Return type '{}' is incomplete.", unit.print_type(proto.result, "")));
    }

    for &param in &proto.params {
        if !unit.require_complete_type(param) {
            diagnostics.push(format!("Argument type '{}' is incomplete.", unit.print_type(param, "")));
        }
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Prints `ty` as the declarator of `placeholder`. Empty for a null type.
pub fn type_spelling_with_placeholder<C: AstContext + ?Sized>(unit: &C, ty: TypeRef, placeholder: &str) -> String {
    if ty.is_null() {
        return String::new();
    }
    unit.print_type(ty, placeholder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{
        ApsInt, ArgPassingRestriction, CxxRecord, Decl, EnumConstantDecl, FunctionDecl, FunctionKind, MemoryUnit,
        OverloadedOperatorKind, TagKind, TargetInfo,
    };

    fn add_function(unit: &mut MemoryUnit, name: &str, ty: TypeRef, op: OverloadedOperatorKind) -> Cursor {
        let id = unit.add_decl(Decl::new(
            name,
            DeclKind::Function(FunctionDecl {
                ty,
                kind: FunctionKind::Free,
                overloaded_operator: op,
            }),
        ));
        Cursor::declaration(id)
    }

    #[test]
    fn test_operator_info() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let int = unit.builtin("int");
        let ty = unit.function_type(int, vec![int, int], false);
        let plus = add_function(&mut unit, "operator+", ty, OverloadedOperatorKind::Plus);
        let plain = add_function(&mut unit, "f", ty, OverloadedOperatorKind::None);

        let info = operator_overload_info(&unit, plus).unwrap();
        assert_eq!(info.kind, OperatorOverloadKind::Plus);
        assert_eq!(info.spelling, Some(c"+"));
        assert_eq!(info.name, Some(c"Plus"));
        assert!(info.is_unary && info.is_binary && !info.is_member_only);

        let none = operator_overload_info(&unit, plain).unwrap();
        assert_eq!(none.kind, OperatorOverloadKind::None);
        assert_eq!(none.name, None);

        assert!(operator_overload_info(&unit, Cursor::NULL).is_none());
    }

    #[test]
    fn test_out_of_range_operator_is_invalid() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let void = unit.void_type();
        let ty = unit.function_type(void, vec![], false);
        let cursor = add_function(&mut unit, "weird", ty, OverloadedOperatorKind::NumOverloadedOperators);
        assert_eq!(
            operator_overload_info(&unit, cursor).map(|info| info.kind),
            Some(OperatorOverloadKind::Invalid)
        );
    }

    #[test]
    fn test_enum_constant_zero_extended() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let minus_one = unit.add_decl(Decl::new(
            "Negative",
            DeclKind::EnumConstant(EnumConstantDecl {
                value: ApsInt::signed(-1, 32),
            }),
        ));
        let record = unit.add_record("S", TagKind::Struct, None);

        assert_eq!(enum_constant_value_zero_extended(&unit, Cursor::declaration(minus_one)), 0xFFFF_FFFF);
        assert_eq!(enum_constant_value_zero_extended(&unit, Cursor::declaration(record)), u64::MAX);
    }

    #[test]
    fn test_arg_passing_restrictions() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let record = unit.add_record("NonTrivial", TagKind::Class, Some(CxxRecord::default()));
        if let Some(r) = unit.record_mut(record) {
            r.arg_passing = ArgPassingRestriction::CannotPassInRegs;
        }
        let int = unit.builtin("int");
        let field = unit.add_field(record, "x", int, None);

        assert_eq!(
            arg_passing_restrictions(&unit, Cursor::declaration(record)),
            ArgPassingKind::CannotPassInRegisters
        );
        assert_eq!(arg_passing_restrictions(&unit, Cursor::declaration(field)), ArgPassingKind::Invalid);
    }

    #[test]
    fn test_uuid_attribute() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_windows());
        let record = unit.add_record("IUnknown", TagKind::Struct, Some(CxxRecord::default()));
        let uuid = unit.add_attribute(record, Attr::Uuid("00000000-0000-0000-C000-000000000046".into()));
        let other = unit.add_attribute(record, Attr::Other("novtable".into()));

        let guid = uuid_attr_guid(&unit, Cursor::attribute(uuid)).unwrap();
        assert_eq!(guid.data4, [0xC0, 0, 0, 0, 0, 0, 0, 0x46]);
        assert!(uuid_attr_guid(&unit, Cursor::attribute(other)).is_none());
        assert!(uuid_attr_text(&unit, Cursor::declaration(record)).is_none());
    }

    #[test]
    fn test_invalid_location_is_not_main_file() {
        let unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        assert!(!location_is_from_main_file(&unit, SourceLocation::INVALID));
        assert!(location_is_from_main_file(&unit, SourceLocation::new(1, 3, 1)));
    }

    #[test]
    fn test_raw_enumeration_includes_implicit() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let record = unit.add_record("S", TagKind::Class, Some(CxxRecord::default()));
        let mut implicit = Decl::new("S", DeclKind::Other);
        implicit.is_implicit = true;
        let injected = unit.add_child_decl(record, implicit);
        let int = unit.builtin("int");
        let field = unit.add_field(record, "x", int, None);

        let mut seen = Vec::new();
        let mut cursor = begin_enumerate_declarations_raw(&unit, Cursor::declaration(record));
        while !cursor.is_null() {
            seen.push(cursor);
            cursor = enumerate_declarations_raw_move_next(&unit, cursor);
        }
        assert_eq!(seen, vec![Cursor::declaration(injected), Cursor::declaration(field)]);
        assert!(begin_enumerate_declarations_raw(&unit, Cursor::declaration(field)).is_null());
    }

    #[test]
    fn test_incomplete_types_are_not_callable() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let void = unit.void_type();
        let int = unit.builtin("int");
        let fwd = unit.add_forward_declaration("Opaque", TagKind::Struct, None);
        let opaque = unit.record_type(fwd);

        let ok = unit.function_type(void, vec![int], false);
        let bad = unit.function_type(opaque, vec![int, opaque], false);

        assert_eq!(is_function_type_callable(&mut unit, ok), Ok(()));
        assert_eq!(
            is_function_type_callable(&mut unit, bad),
            Err(vec![
                "Return type 'Opaque' is incomplete.".to_string(),
                "Argument type 'Opaque' is incomplete.".to_string(),
            ])
        );
        assert!(is_function_type_callable(&mut unit, TypeRef::NULL).is_err());
    }

    #[test]
    fn test_callable_function_declaration() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let int = unit.builtin("int");
        let ty = unit.function_type(int, vec![int], false);
        let cursor = add_function(&mut unit, "f", ty, OverloadedOperatorKind::None);

        assert_eq!(is_function_callable(&mut unit, cursor), Ok(()));
        assert!(is_function_callable(&mut unit, Cursor::NULL).is_err());
    }

    #[test]
    fn test_spelling_with_placeholder() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let int = unit.builtin("int");
        assert_eq!(type_spelling_with_placeholder(&unit, int, "x"), "int x");
        assert_eq!(type_spelling_with_placeholder(&unit, TypeRef::NULL, "x"), "");
    }
}
