//! Constant folding results as the front-end reports them

use super::ast::{DeclId, ExprId};

/// Discriminant of an evaluated value, numbered as the front-end numbers it
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    None = 0,
    Indeterminate,
    Int,
    Float,
    FixedPoint,
    ComplexInt,
    ComplexFloat,
    LValue,
    Vector,
    Array,
    Struct,
    Union,
    MemberPointer,
    AddrLabelDiff,
}

/// String literal encoding as the front-end numbers it
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringLiteralKind {
    Ascii = 0,
    Wide,
    Utf8,
    Utf16,
    Utf32,
}

/// Arbitrary-width integer with explicit signedness.
///
/// Widths up to 128 bits are representable. `bits` holds the two's complement
/// pattern truncated to `bit_width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApsInt {
    bits: u128,
    bit_width: u32,
    is_unsigned: bool,
}

impl ApsInt {
    pub const fn signed(value: i128, bit_width: u32) -> Self {
        Self {
            bits: truncate(value as u128, bit_width),
            bit_width,
            is_unsigned: false,
        }
    }

    pub const fn unsigned(value: u128, bit_width: u32) -> Self {
        Self {
            bits: truncate(value, bit_width),
            bit_width,
            is_unsigned: true,
        }
    }

    pub const fn bit_width(&self) -> u32 {
        self.bit_width
    }

    pub const fn is_signed(&self) -> bool {
        !self.is_unsigned
    }

    /// Sign-extends to 64 bits, `None` if the value needs more
    pub fn sext_value(&self) -> Option<i64> {
        let value = if self.bit_width == 0 || self.bit_width >= 128 {
            self.bits as i128
        } else {
            let shift = 128 - self.bit_width;
            ((self.bits << shift) as i128) >> shift
        };
        i64::try_from(value).ok()
    }

    /// Zero-extends to 64 bits, `None` if the value needs more
    pub fn zext_value(&self) -> Option<u64> {
        u64::try_from(self.bits).ok()
    }
}

const fn truncate(bits: u128, width: u32) -> u128 {
    if width >= 128 { bits } else { bits & ((1u128 << width) - 1) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatSemantics {
    IeeeHalf,
    BFloat,
    IeeeSingle,
    IeeeDouble,
    X87DoubleExtended,
    IeeeQuad,
    PpcDoubleDouble,
}

impl FloatSemantics {
    pub const fn size_in_bits(self) -> u32 {
        match self {
            Self::IeeeHalf | Self::BFloat => 16,
            Self::IeeeSingle => 32,
            Self::IeeeDouble => 64,
            Self::X87DoubleExtended => 80,
            Self::IeeeQuad | Self::PpcDoubleDouble => 128,
        }
    }
}

/// Floating point value kept as its raw bit pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApFloat {
    pub semantics: FloatSemantics,
    pub bits: u128,
}

impl ApFloat {
    pub const fn from_f32(value: f32) -> Self {
        Self {
            semantics: FloatSemantics::IeeeSingle,
            bits: value.to_bits() as u128,
        }
    }

    pub const fn from_f64(value: f64) -> Self {
        Self {
            semantics: FloatSemantics::IeeeDouble,
            bits: value.to_bits() as u128,
        }
    }

    /// Raw bits zero-extended to 64, `None` when the pattern needs more
    pub fn zext_bits(&self) -> Option<u64> {
        u64::try_from(self.bits).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LValueBase {
    None,
    Decl(DeclId),
    Expr(ExprId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LValue {
    pub base: LValueBase,
    pub is_null_pointer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApValue {
    None,
    Indeterminate,
    Int(ApsInt),
    Float(ApFloat),
    LValue(LValue),
    /// Aggregates and other values the queries only report by kind
    Other(ValueKind),
}

impl ApValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Indeterminate => ValueKind::Indeterminate,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::LValue(_) => ValueKind::LValue,
            Self::Other(kind) => *kind,
        }
    }

    pub fn is_null_pointer(&self) -> bool {
        matches!(self, Self::LValue(lvalue) if lvalue.is_null_pointer)
    }
}

/// Outcome of folding an expression as an rvalue
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EvalResult {
    /// `None` when folding failed
    pub value: Option<ApValue>,
    pub has_side_effects: bool,
    pub has_undefined_behavior: bool,
    pub diagnostics: Vec<String>,
}

impl EvalResult {
    pub fn folded(value: ApValue) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn failed(diagnostics: Vec<String>) -> Self {
        Self {
            value: None,
            diagnostics,
            ..Default::default()
        }
    }
}
