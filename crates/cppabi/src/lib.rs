//! ABI-accurate C/C++ layouts for binding generators
//!
//! This crate answers the questions a binding generator needs a real compiler
//! for, and hands the answers out as flat, fixed-width records:
//!
//! - Record layouts flattened into a list of slots (fields, bases, v-table
//!   pointers, virtual base table pointers, vtordisps) at byte offsets
//! - V-table contents for the Itanium and Microsoft ABIs
//! - Function arrangements (calling convention and per-argument classification)
//! - Constant values of variables and expressions
//! - Macro definitions, template specializations and a handful of declaration
//!   queries
//!
//! ## Front-end
//!
//! Queries are generic over the traits in [`frontend`]. A binding to a real
//! compiler implements them; [`frontend::MemoryUnit`] is an in-memory
//! implementation used by the tests and the demo.
//!
//! ```ignore
//! use cppabi::frontend::{Cursor, MemoryUnit, TagKind, TargetInfo};
//!
//! let mut unit = MemoryUnit::new(TargetInfo::x86_64_windows());
//! let int = unit.builtin("int");
//! let point = unit.add_record("Point", TagKind::Struct, None);
//! unit.add_field(point, "x", int, None);
//!
//! let layout = cppabi::record_layout(&unit, Cursor::declaration(point))?;
//! ```
//!
//! ## C API
//!
//! Everything in [`ffi`] is `extern "C"` and exported unmangled:
//!
//! | Concern | Entry points |
//! |---------|--------------|
//! | Layout | `cppabi_get_record_layout`, `cppabi_dispose_record_layout` |
//! | Arrangement | `cppabi_get_arranged_function`, `cppabi_get_arranged_function_pointer` |
//! | Constants | `cppabi_compute_constant_value`, `cppabi_dispose_constant_value_info` |
//! | Macros | `cppabi_enumerate_macros` |
//! | Templates | `cppabi_instantiate_all_fully_specialized_class_templates` |
//! | Verification | `cppabi_get_type_sizes` |
//!
//! ## Logging
//!
//! Diagnostics go through `tracing`. Call [`init_logging`] (or
//! `cppabi_init_logging` from C) to install a subscriber configured from
//! `CPPABI_LOG_LEVEL` and `CPPABI_LOG_FORMAT`.

pub mod arrange;
pub mod constant;
pub mod decl_info;
pub mod error;
pub mod ffi;
pub mod frontend;
pub mod guid;
pub mod kinds;
pub mod logging;
pub mod preprocessor;
pub mod record_layout;
pub mod templates;
pub mod vtable;

pub use arrange::{ArgumentFlags, ArgumentInfo, ArrangedFunction, ArrangedFunctionFlags, arrange_function, arrange_function_pointer};
pub use constant::{Constant, ConstantValue, StringEncoding, compute_constant_value};
pub use error::{Error, Result};
pub use guid::Guid;
pub use logging::{LogFormat, LogLevel, LogOptions, init_logging};
pub use preprocessor::{MacroDescriptor, enumerate_macros};
pub use record_layout::{LayoutSlot, RecordLayout, record_layout};
pub use templates::TemplateInstantiationMetrics;
pub use vtable::{VTableEntry, VTableLayout};

// The C side mirrors these sizes, so pin them for the 64-bit targets it is
// built for
#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(size_of::<ffi::CppAbiRecordField>() == 64);
    assert!(size_of::<ffi::CppAbiVTable>() == 24);
    assert!(size_of::<ffi::CppAbiVTableEntry>() == 32);
    assert!(size_of::<ffi::CppAbiRecordLayout>() == 56);
    assert!(size_of::<ffi::CppAbiConstantString>() == 16);
    assert!(size_of::<ffi::CppAbiTemplateInstantiationMetrics>() == 32);
};
