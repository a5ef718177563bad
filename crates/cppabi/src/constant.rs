//! Constant evaluation
//!
//! Folds a variable's initializer (or an expression) through the front-end and
//! reduces the result to something that can cross a language boundary: a
//! 64-bit integer or float bit pattern, a null pointer, a string literal's bytes,
//! or `Unknown` tagged with the front-end's value kind.

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::frontend::{ApValue, AstContext, Cursor, DeclKind, ExprId, ExprKind, LValueBase, ValueKind};
use crate::kinds::{ConstantValueKind, StringConstantKind};

/// Encoding of a string constant. `was_wide` marks an `L"..."` literal that was
/// re-tagged to the UTF encoding matching its code unit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringEncoding {
    pub kind: StringConstantKind,
    pub was_wide: bool,
}

impl StringEncoding {
    pub const fn to_raw(self) -> i32 {
        if self.was_wide {
            self.kind.to_raw() | StringConstantKind::WIDE_CHAR_BIT
        } else {
            self.kind.to_raw()
        }
    }

    pub const fn from_raw(raw: i32) -> Option<Self> {
        let was_wide = raw & StringConstantKind::WIDE_CHAR_BIT != 0;
        match StringConstantKind::from_raw(raw & !StringConstantKind::WIDE_CHAR_BIT) {
            Some(kind) => Some(Self { kind, was_wide }),
            None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Folded to something without a flat representation
    Unknown { value_kind: ValueKind },
    NullPointer,
    UnsignedInteger { bit_width: u32, value: u64 },
    SignedInteger { bit_width: u32, value: i64 },
    /// `bits` is the raw IEEE (or target) bit pattern
    FloatingPoint { bit_width: u32, bits: u64 },
    /// Encoded code units, no terminator
    String { encoding: StringEncoding, bytes: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantValue {
    pub has_side_effects: bool,
    pub has_undefined_behavior: bool,
    pub constant: Constant,
}

impl ConstantValue {
    pub fn kind(&self) -> ConstantValueKind {
        match self.constant {
            Constant::Unknown { .. } => ConstantValueKind::Unknown,
            Constant::NullPointer => ConstantValueKind::NullPointer,
            Constant::UnsignedInteger { .. } => ConstantValueKind::UnsignedInteger,
            Constant::SignedInteger { .. } => ConstantValueKind::SignedInteger,
            Constant::FloatingPoint { .. } => ConstantValueKind::FloatingPoint,
            Constant::String { .. } => ConstantValueKind::String,
        }
    }

    /// Bit width for numbers, encoding for strings, value kind for `Unknown`
    pub fn sub_kind(&self) -> i32 {
        match &self.constant {
            Constant::Unknown { value_kind } => *value_kind as i32,
            Constant::NullPointer => 0,
            Constant::UnsignedInteger { bit_width, .. }
            | Constant::SignedInteger { bit_width, .. }
            | Constant::FloatingPoint { bit_width, .. } => *bit_width as i32,
            Constant::String { encoding, .. } => encoding.to_raw(),
        }
    }

    /// The 64-bit value slot. Strings have no inline value.
    pub fn value(&self) -> u64 {
        match &self.constant {
            Constant::UnsignedInteger { value, .. } => *value,
            Constant::SignedInteger { value, .. } => *value as u64,
            Constant::FloatingPoint { bits, .. } => *bits,
            Constant::Unknown { .. } | Constant::NullPointer | Constant::String { .. } => 0,
        }
    }
}

/// Folds the variable or expression `cursor` names.
///
/// Returns `Ok(None)` when there is nothing to fold (a variable without an
/// initializer) or when folding failed without diagnostics.
pub fn compute_constant_value<C: AstContext + ?Sized>(unit: &C, cursor: Cursor) -> Result<Option<ConstantValue>> {
    let expr = if let Some((_, decl)) = unit.cursor_declaration(cursor) {
        let DeclKind::Var(var) = &decl.kind else {
            debug!(name = %decl.name, "constant requested for a non-variable declaration");
            return Err(Error::NotAVariableOrExpression);
        };
        match var.init {
            Some(init) => init,
            None => return Ok(None),
        }
    } else if let Some(expr) = cursor.as_expression()
        && unit.expression(expr).is_some()
    {
        expr
    } else {
        debug!(?cursor, "constant requested for a cursor that is neither a variable nor an expression");
        return Err(Error::NotAVariableOrExpression);
    };

    let result = unit.evaluate_as_rvalue(expr);
    let Some(value) = result.value else {
        if result.diagnostics.is_empty() {
            return Ok(None);
        }
        debug!(diagnostics = result.diagnostics.len(), "folding produced diagnostics");
        return Err(Error::FoldDiagnostics(result.diagnostics));
    };

    Ok(Some(ConstantValue {
        has_side_effects: result.has_side_effects,
        has_undefined_behavior: result.has_undefined_behavior,
        constant: flatten(unit, expr, &value),
    }))
}

fn flatten<C: AstContext + ?Sized>(unit: &C, expr: ExprId, value: &ApValue) -> Constant {
    match value {
        ApValue::Int(int) if int.is_signed() => match int.sext_value() {
            Some(value) => Constant::SignedInteger {
                bit_width: int.bit_width(),
                value,
            },
            None => Constant::Unknown {
                value_kind: ValueKind::Int,
            },
        },
        ApValue::Int(int) => match int.zext_value() {
            Some(value) => Constant::UnsignedInteger {
                bit_width: int.bit_width(),
                value,
            },
            None => Constant::Unknown {
                value_kind: ValueKind::Int,
            },
        },
        ApValue::Float(float) => match float.zext_bits() {
            Some(bits) => Constant::FloatingPoint {
                bit_width: float.semantics.size_in_bits(),
                bits,
            },
            None => Constant::Unknown {
                value_kind: ValueKind::Float,
            },
        },
        value if value.is_null_pointer() => Constant::NullPointer,
        ApValue::LValue(lvalue) => match lvalue.base {
            LValueBase::Expr(base) => match unit.expression(base).map(|e| &e.kind) {
                Some(ExprKind::StringLiteral(literal)) => Constant::String {
                    encoding: string_encoding(expr, literal.kind.into(), literal.char_byte_width),
                    bytes: literal.bytes.clone(),
                },
                _ => Constant::Unknown {
                    value_kind: ValueKind::LValue,
                },
            },
            LValueBase::Decl(_) | LValueBase::None => Constant::Unknown {
                value_kind: ValueKind::LValue,
            },
        },
        other => Constant::Unknown {
            value_kind: other.kind(),
        },
    }
}

fn string_encoding(expr: ExprId, kind: StringConstantKind, char_byte_width: u32) -> StringEncoding {
    if kind != StringConstantKind::WideChar {
        return StringEncoding { kind, was_wide: false };
    }
    let kind = match char_byte_width {
        1 => StringConstantKind::Utf8,
        2 => StringConstantKind::Utf16,
        4 => StringConstantKind::Utf32,
        width => {
            error!(expr = expr.0, width, "wide string literal with an unexpected code unit width");
            debug_assert!(false, "wide string literal with {width}-byte code units");
            StringConstantKind::WideChar
        }
    };
    StringEncoding { kind, was_wide: true }
}
