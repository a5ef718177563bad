//! Source locations and the preprocessor's macro model

/// A resolved source position. File `0` is reserved for "no location".
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    pub file: u32,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub const INVALID: Self = Self {
        file: 0,
        line: 0,
        column: 0,
    };

    pub const fn new(file: u32, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    pub const fn is_valid(self) -> bool {
        self.file != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierInfo {
    pub name: String,
}

/// Body-independent facts about one `#define`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MacroInfo {
    pub location: SourceLocation,
    pub params: Vec<String>,
    pub is_function_like: bool,
    pub is_builtin_macro: bool,
    pub has_comma_pasting: bool,
    pub is_c99_varargs: bool,
    pub is_gnu_varargs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroDirectiveKind {
    Define(MacroInfo),
    Undefine,
    Visibility { is_public: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDirective {
    pub kind: MacroDirectiveKind,
    pub location: SourceLocation,
}

/// Directive history of one identifier, most recent first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MacroHistory {
    pub directives: Vec<MacroDirective>,
}

/// The definition a history currently resolves to
#[derive(Debug, Clone, Copy)]
pub struct DefInfo<'a> {
    pub info: &'a MacroInfo,
    pub location: SourceLocation,
    pub undef_location: Option<SourceLocation>,
    pub is_public: bool,
}

impl DefInfo<'_> {
    pub fn is_undefined(&self) -> bool {
        self.undef_location.is_some()
    }
}

impl MacroHistory {
    /// Walks back from the latest directive to the most recent `#define`,
    /// remembering any `#undef` seen on the way.
    pub fn definition(&self) -> Option<DefInfo<'_>> {
        let mut undef_location = None;
        let mut is_public = true;
        for directive in &self.directives {
            match &directive.kind {
                MacroDirectiveKind::Define(info) => {
                    return Some(DefInfo {
                        info,
                        location: directive.location,
                        undef_location,
                        is_public,
                    });
                }
                MacroDirectiveKind::Undefine => {
                    if undef_location.is_none() {
                        undef_location = Some(directive.location);
                    }
                }
                MacroDirectiveKind::Visibility { is_public: public } => is_public = *public,
            }
        }
        None
    }
}
