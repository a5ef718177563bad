//! Macro enumeration

use tracing::trace;

use crate::frontend::{Preprocessor, SourceLocation};
use crate::kinds::MacroVariadicKind;

/// One macro as seen by an enumeration callback.
///
/// Borrowed views only live for the duration of the callback.
#[derive(Debug, Clone, Copy)]
pub struct MacroDescriptor<'a> {
    pub name: &'a str,
    pub location: SourceLocation,
    /// The latest directive for the name is an `#undef`
    pub was_undefined: bool,
    pub is_function_like: bool,
    pub is_builtin_macro: bool,
    pub has_comma_pasting: bool,
    pub variadic_kind: MacroVariadicKind,
    pub parameters: &'a [&'a str],
}

impl MacroDescriptor<'_> {
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
}

pub fn preprocessor_identifier_count<P: Preprocessor + ?Sized>(pp: &P) -> usize {
    pp.identifier_count()
}

/// Calls `callback` once for every identifier that has (or had) a macro
/// definition in this translation unit.
pub fn enumerate_macros<P, F>(pp: &P, mut callback: F)
where
    P: Preprocessor + ?Sized,
    F: FnMut(&MacroDescriptor<'_>),
{
    let mut parameters: Vec<&str> = Vec::new();
    for identifier in pp.identifiers() {
        let Some(history) = pp.local_macro_directive_history(identifier) else {
            continue;
        };
        let Some(definition) = history.definition() else {
            continue;
        };
        let info = definition.info;

        parameters.clear();
        parameters.extend(info.params.iter().map(String::as_str));

        let variadic_kind = if info.is_c99_varargs {
            MacroVariadicKind::C99
        } else if info.is_gnu_varargs {
            MacroVariadicKind::Gnu
        } else {
            MacroVariadicKind::None
        };

        let descriptor = MacroDescriptor {
            name: &identifier.name,
            location: definition.location,
            was_undefined: definition.is_undefined(),
            is_function_like: info.is_function_like,
            is_builtin_macro: info.is_builtin_macro,
            has_comma_pasting: info.has_comma_pasting,
            variadic_kind,
            parameters: &parameters,
        };
        trace!(name = descriptor.name, undefined = descriptor.was_undefined, "macro");
        callback(&descriptor);
    }
}
