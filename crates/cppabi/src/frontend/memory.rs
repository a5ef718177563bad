//! In-memory translation unit
//!
//! [`MemoryUnit`] answers every front-end query from tables filled through its
//! builder methods. It stores results, it does not compute them: a record's
//! layout, v-table components and function arrangements must be supplied the
//! way a real front-end would have computed them.
//!
//! ```ignore
//! let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
//! let int = unit.builtin("int");
//! let point = unit.add_record("Point", TagKind::Struct, None);
//! unit.add_field(point, "x", int, None);
//! unit.add_field(point, "y", int, None);
//! unit.set_record_layout(point, AstRecordLayout { size: 8, alignment: 4, field_offsets: vec![0, 32], ..Default::default() });
//! ```

use std::collections::HashMap;

use tracing::trace;

use super::ast::{
    ArgPassingRestriction, Attr, AttrId, BaseSpecifier, ClassTemplateSpecialization, CxxRecord, Decl, DeclId, DeclKind,
    Expr, ExprId, FieldDecl, FunctionProto, RecordDecl, SpecializationKind, TagKind, TypeKind, TypeNode, TypeRef,
};
use super::codegen::{CgFunctionInfo, CodeGenTypes, GlobalDecl};
use super::eval::EvalResult;
use super::layout::{
    AstRecordLayout, ItaniumVTableContext, MicrosoftVTableContext, TargetInfo, VPtrInfo, VTableComponent, VTableContext,
};
use super::lex::{IdentifierInfo, MacroDirective, MacroDirectiveKind, MacroHistory, MacroInfo, SourceLocation};
use super::{AstContext, Preprocessor, Sema};

struct DeclEntry {
    decl: Decl,
    context: Option<DeclId>,
    children: Vec<DeclId>,
}

struct IdentifierEntry {
    info: IdentifierInfo,
    history: Option<MacroHistory>,
}

/// What instantiating a specialization does when asked to
struct ScriptedInstantiation {
    succeeds: bool,
    layout: Option<AstRecordLayout>,
}

pub struct MemoryUnit {
    target: TargetInfo,
    main_file: u32,
    /// Macro expansion buffer file -> file the expansion is spelled in
    expansions: HashMap<u32, u32>,
    decls: Vec<DeclEntry>,
    exprs: Vec<Expr>,
    attrs: Vec<Attr>,
    types: Vec<TypeNode>,
    record_types: HashMap<DeclId, TypeRef>,
    void: TypeRef,
    void_pointer: TypeRef,
    void_pointer_pointer: TypeRef,
    layouts: HashMap<DeclId, AstRecordLayout>,
    itanium_vtables: HashMap<DeclId, Vec<VTableComponent>>,
    vfptrs: HashMap<DeclId, Vec<VPtrInfo>>,
    vftables: HashMap<(DeclId, i64), Vec<VTableComponent>>,
    arrangements: HashMap<GlobalDecl, CgFunctionInfo>,
    pointer_arrangements: HashMap<TypeRef, CgFunctionInfo>,
    evaluations: HashMap<ExprId, EvalResult>,
    identifiers: Vec<IdentifierEntry>,
    identifier_index: HashMap<String, usize>,
    instantiations: HashMap<DeclId, ScriptedInstantiation>,
    /// Types `require_complete_type` can complete
    completable: HashMap<TypeRef, bool>,
}

impl MemoryUnit {
    /// Creates an empty unit. `void`, `void*` and `void**` always exist.
    pub fn new(target: TargetInfo) -> Self {
        let mut unit = Self {
            target,
            main_file: 1,
            expansions: HashMap::new(),
            decls: Vec::new(),
            exprs: Vec::new(),
            attrs: Vec::new(),
            types: Vec::new(),
            record_types: HashMap::new(),
            void: TypeRef::NULL,
            void_pointer: TypeRef::NULL,
            void_pointer_pointer: TypeRef::NULL,
            layouts: HashMap::new(),
            itanium_vtables: HashMap::new(),
            vfptrs: HashMap::new(),
            vftables: HashMap::new(),
            arrangements: HashMap::new(),
            pointer_arrangements: HashMap::new(),
            evaluations: HashMap::new(),
            identifiers: Vec::new(),
            identifier_index: HashMap::new(),
            instantiations: HashMap::new(),
            completable: HashMap::new(),
        };
        unit.void = unit.add_type("void", TypeKind::Void);
        unit.void_pointer = unit.pointer_to(unit.void);
        unit.void_pointer_pointer = unit.pointer_to(unit.void_pointer);
        unit
    }

    // =========================================================================
    // Types
    // =========================================================================

    pub fn add_type(&mut self, spelling: impl Into<String>, kind: TypeKind) -> TypeRef {
        let ty = TypeRef(self.types.len() as u32);
        self.types.push(TypeNode {
            spelling: spelling.into(),
            kind,
        });
        ty
    }

    pub fn void_type(&self) -> TypeRef {
        self.void
    }

    pub fn builtin(&mut self, spelling: &str) -> TypeRef {
        self.add_type(spelling, TypeKind::Builtin)
    }

    pub fn pointer_to(&mut self, pointee: TypeRef) -> TypeRef {
        let spelling = match self.types.get(pointee.0 as usize) {
            Some(node) => format!("{} *", node.spelling),
            None => "<null> *".to_string(),
        };
        self.add_type(spelling, TypeKind::Pointer(pointee))
    }

    pub fn function_type(&mut self, result: TypeRef, params: Vec<TypeRef>, is_variadic: bool) -> TypeRef {
        let spelling = self.prototype_spelling(result, &params, is_variadic, "");
        self.add_type(
            spelling,
            TypeKind::FunctionProto(FunctionProto {
                result,
                params,
                is_variadic,
            }),
        )
    }

    pub fn dependent_type(&mut self, spelling: &str) -> TypeRef {
        self.add_type(spelling, TypeKind::Dependent)
    }

    pub fn record_type(&self, record: DeclId) -> TypeRef {
        self.record_types.get(&record).copied().unwrap_or(TypeRef::NULL)
    }

    /// Lets `require_complete_type` succeed (or keep failing) for `ty`
    pub fn set_completable(&mut self, ty: TypeRef, completable: bool) {
        self.completable.insert(ty, completable);
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Adds a top-level declaration
    pub fn add_decl(&mut self, decl: Decl) -> DeclId {
        self.push_decl(decl, None)
    }

    /// Adds a declaration inside the context `parent`
    pub fn add_child_decl(&mut self, parent: DeclId, decl: Decl) -> DeclId {
        self.push_decl(decl, Some(parent))
    }

    fn push_decl(&mut self, decl: Decl, context: Option<DeclId>) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        trace!(name = %decl.name, id = id.0, "declaration added");
        self.decls.push(DeclEntry {
            decl,
            context,
            children: Vec::new(),
        });
        if let Some(parent) = context
            && let Some(entry) = self.decls.get_mut(parent.0 as usize)
        {
            entry.children.push(id);
        }
        id
    }

    pub fn decl_mut(&mut self, id: DeclId) -> Option<&mut Decl> {
        self.decls.get_mut(id.0 as usize).map(|entry| &mut entry.decl)
    }

    /// Adds a record. `cxx` is `None` for C structs. The record is its own
    /// definition; see [`MemoryUnit::add_forward_declaration`] for the rest.
    pub fn add_record(&mut self, name: &str, tag: TagKind, cxx: Option<CxxRecord>) -> DeclId {
        let id = self.add_decl(Decl::new(
            name,
            DeclKind::Record(RecordDecl {
                tag,
                definition: None,
                cxx,
                fields: Vec::new(),
                arg_passing: ArgPassingRestriction::CanPassInRegs,
                specialization: None,
                attributes: Vec::new(),
            }),
        ));
        if let Some(record) = self.record_mut(id) {
            record.definition = Some(id);
        }
        let ty = self.add_type(name, TypeKind::Record(id));
        self.record_types.insert(id, ty);
        id
    }

    /// Adds a redeclaration of a record, pointing at its definition if there is one
    pub fn add_forward_declaration(&mut self, name: &str, tag: TagKind, definition: Option<DeclId>) -> DeclId {
        let id = self.add_decl(Decl::new(
            name,
            DeclKind::Record(RecordDecl {
                tag,
                definition,
                cxx: None,
                fields: Vec::new(),
                arg_passing: ArgPassingRestriction::CanPassInRegs,
                specialization: None,
                attributes: Vec::new(),
            }),
        ));
        let ty = match definition.and_then(|def| self.record_types.get(&def).copied()) {
            Some(ty) => ty,
            None => self.add_type(name, TypeKind::Record(id)),
        };
        self.record_types.insert(id, ty);
        id
    }

    pub fn record_mut(&mut self, id: DeclId) -> Option<&mut RecordDecl> {
        match self.decl_mut(id).map(|decl| &mut decl.kind) {
            Some(DeclKind::Record(record)) => Some(record),
            _ => None,
        }
    }

    pub fn add_base(&mut self, record: DeclId, base: DeclId, is_virtual: bool) {
        let ty = self.record_type(base);
        if let Some(cxx) = self.record_mut(record).and_then(|r| r.cxx.as_mut()) {
            cxx.bases.push(BaseSpecifier { ty, is_virtual });
        }
    }

    pub fn add_virtual_base(&mut self, record: DeclId, vbase: DeclId) {
        let ty = self.record_type(vbase);
        if let Some(cxx) = self.record_mut(record).and_then(|r| r.cxx.as_mut()) {
            cxx.vbases.push(BaseSpecifier { ty, is_virtual: true });
        }
    }

    pub fn add_field(&mut self, record: DeclId, name: &str, ty: TypeRef, bit_width: Option<u32>) -> DeclId {
        let field = self.add_child_decl(record, Decl::new(name, DeclKind::Field(FieldDecl { ty, bit_width })));
        if let Some(record) = self.record_mut(record) {
            record.fields.push(field);
        }
        field
    }

    pub fn set_specialization(&mut self, record: DeclId, specialization: ClassTemplateSpecialization) {
        if let Some(record) = self.record_mut(record) {
            record.specialization = Some(specialization);
        }
    }

    pub fn add_attribute(&mut self, record: DeclId, attr: Attr) -> AttrId {
        let id = AttrId(self.attrs.len() as u32);
        self.attrs.push(attr);
        if let Some(record) = self.record_mut(record) {
            record.attributes.push(id);
        }
        id
    }

    // =========================================================================
    // Front-end results
    // =========================================================================

    pub fn set_record_layout(&mut self, record: DeclId, layout: AstRecordLayout) {
        self.layouts.insert(record, layout);
    }

    pub fn set_itanium_vtable(&mut self, record: DeclId, components: Vec<VTableComponent>) {
        self.itanium_vtables.insert(record, components);
    }

    /// Appends a vfptr at `full_offset_in_mdc` and its table
    pub fn add_vftable(&mut self, record: DeclId, full_offset_in_mdc: i64, components: Vec<VTableComponent>) {
        self.vfptrs
            .entry(record)
            .or_default()
            .push(VPtrInfo { full_offset_in_mdc });
        self.vftables.insert((record, full_offset_in_mdc), components);
    }

    pub fn set_arrangement(&mut self, decl: GlobalDecl, info: CgFunctionInfo) {
        self.arrangements.insert(decl, info);
    }

    pub fn set_pointer_arrangement(&mut self, ty: TypeRef, info: CgFunctionInfo) {
        self.pointer_arrangements.insert(ty, info);
    }

    pub fn add_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn set_evaluation(&mut self, expr: ExprId, result: EvalResult) {
        self.evaluations.insert(expr, result);
    }

    /// Scripts what instantiating `record` does. Unscripted instantiations fail.
    pub fn script_instantiation(&mut self, record: DeclId, succeeds: bool, layout: Option<AstRecordLayout>) {
        self.instantiations
            .insert(record, ScriptedInstantiation { succeeds, layout });
    }

    // =========================================================================
    // Preprocessor
    // =========================================================================

    pub fn set_main_file(&mut self, file: u32) {
        self.main_file = file;
    }

    /// Records that file `buffer` holds macro expansions spelled in `file`
    pub fn add_macro_expansion(&mut self, buffer: u32, file: u32) {
        self.expansions.insert(buffer, file);
    }

    /// Interns an identifier without a macro history
    pub fn add_identifier(&mut self, name: &str) -> usize {
        if let Some(&index) = self.identifier_index.get(name) {
            return index;
        }
        let index = self.identifiers.len();
        self.identifiers.push(IdentifierEntry {
            info: IdentifierInfo { name: name.to_string() },
            history: None,
        });
        self.identifier_index.insert(name.to_string(), index);
        index
    }

    pub fn define_macro(&mut self, name: &str, info: MacroInfo) {
        let location = info.location;
        self.define_macro_at(name, info, location);
    }

    /// Records a `#define` whose directive sits at `location` rather than at
    /// the macro's own location
    pub fn define_macro_at(&mut self, name: &str, info: MacroInfo, location: SourceLocation) {
        self.push_directive(name, MacroDirectiveKind::Define(info), location);
    }

    pub fn undefine_macro(&mut self, name: &str, location: SourceLocation) {
        self.push_directive(name, MacroDirectiveKind::Undefine, location);
    }

    fn push_directive(&mut self, name: &str, kind: MacroDirectiveKind, location: SourceLocation) {
        let index = self.add_identifier(name);
        let entry = &mut self.identifiers[index];
        let history = entry.history.get_or_insert_with(MacroHistory::default);
        history.directives.insert(0, MacroDirective { kind, location });
    }

    fn prototype_spelling(&self, result: TypeRef, params: &[TypeRef], is_variadic: bool, declarator: &str) -> String {
        let mut params: Vec<&str> = params.iter().map(|ty| self.spelling(*ty)).collect();
        if is_variadic {
            params.push("...");
        }
        format!("{} {}({})", self.spelling(result), declarator, params.join(", "))
    }

    fn spelling(&self, ty: TypeRef) -> &str {
        self.types
            .get(ty.0 as usize)
            .map(|node| node.spelling.as_str())
            .unwrap_or("<null>")
    }
}

impl AstContext for MemoryUnit {
    fn target(&self) -> TargetInfo {
        self.target
    }

    fn declaration(&self, id: DeclId) -> Option<&Decl> {
        self.decls.get(id.0 as usize).map(|entry| &entry.decl)
    }

    fn expression(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.0 as usize)
    }

    fn attribute(&self, id: AttrId) -> Option<&Attr> {
        self.attrs.get(id.0 as usize)
    }

    fn type_node(&self, ty: TypeRef) -> Option<&TypeNode> {
        self.types.get(ty.0 as usize)
    }

    fn types(&self) -> Box<dyn Iterator<Item = TypeRef> + '_> {
        Box::new((0..self.types.len() as u32).map(TypeRef))
    }

    fn void_pointer_type(&self) -> TypeRef {
        self.void_pointer
    }

    fn void_pointer_pointer_type(&self) -> TypeRef {
        self.void_pointer_pointer
    }

    fn record_layout(&self, record: DeclId) -> Option<&AstRecordLayout> {
        self.layouts.get(&record)
    }

    fn vtable_context(&self) -> VTableContext<'_> {
        if self.target.is_microsoft() {
            VTableContext::Microsoft(self)
        } else {
            VTableContext::Itanium(self)
        }
    }

    fn evaluate_as_rvalue(&self, expr: ExprId) -> EvalResult {
        self.evaluations.get(&expr).cloned().unwrap_or_default()
    }

    fn first_decl_in_context(&self, context: DeclId) -> Option<DeclId> {
        self.decls.get(context.0 as usize)?.children.first().copied()
    }

    fn next_decl_in_context(&self, decl: DeclId) -> Option<DeclId> {
        let parent = self.decls.get(decl.0 as usize)?.context?;
        let siblings = &self.decls.get(parent.0 as usize)?.children;
        let position = siblings.iter().position(|&sibling| sibling == decl)?;
        siblings.get(position + 1).copied()
    }

    fn print_type(&self, ty: TypeRef, placeholder: &str) -> String {
        let Some(node) = self.type_node(ty) else {
            return String::new();
        };
        match &node.kind {
            TypeKind::FunctionProto(proto) => {
                self.prototype_spelling(proto.result, &proto.params, proto.is_variadic, placeholder)
            }
            TypeKind::Pointer(pointee) => match self.type_node(*pointee).map(|node| &node.kind) {
                Some(TypeKind::FunctionProto(proto)) => self.prototype_spelling(
                    proto.result,
                    &proto.params,
                    proto.is_variadic,
                    &format!("(*{placeholder})"),
                ),
                _ => join_declarator(&node.spelling, placeholder),
            },
            _ => join_declarator(&node.spelling, placeholder),
        }
    }

    fn is_in_main_file(&self, location: SourceLocation) -> bool {
        let file = self
            .expansions
            .get(&location.file)
            .copied()
            .unwrap_or(location.file);
        file == self.main_file
    }
}

fn join_declarator(spelling: &str, placeholder: &str) -> String {
    if placeholder.is_empty() {
        spelling.to_string()
    } else {
        format!("{spelling} {placeholder}")
    }
}

impl ItaniumVTableContext for MemoryUnit {
    fn vtable_layout(&self, record: DeclId) -> Option<&[VTableComponent]> {
        self.itanium_vtables.get(&record).map(Vec::as_slice)
    }
}

impl MicrosoftVTableContext for MemoryUnit {
    fn vfptr_offsets(&self, record: DeclId) -> &[VPtrInfo] {
        self.vfptrs.get(&record).map(Vec::as_slice).unwrap_or(&[])
    }

    fn vftable_layout(&self, record: DeclId, full_offset_in_mdc: i64) -> Option<&[VTableComponent]> {
        self.vftables
            .get(&(record, full_offset_in_mdc))
            .map(Vec::as_slice)
    }
}

impl Preprocessor for MemoryUnit {
    fn identifiers(&self) -> Box<dyn Iterator<Item = &IdentifierInfo> + '_> {
        Box::new(self.identifiers.iter().map(|entry| &entry.info))
    }

    fn identifier_count(&self) -> usize {
        self.identifiers.len()
    }

    fn local_macro_directive_history(&self, identifier: &IdentifierInfo) -> Option<&MacroHistory> {
        let index = *self.identifier_index.get(&identifier.name)?;
        self.identifiers.get(index)?.history.as_ref()
    }
}

impl Sema for MemoryUnit {
    fn instantiate_class_template_specialization(&mut self, record: DeclId) -> bool {
        let Some(script) = self.instantiations.remove(&record) else {
            return false;
        };
        if !script.succeeds {
            self.instantiations.insert(record, script);
            return false;
        }
        if let Some(specialization) = self.record_mut(record).and_then(|r| r.specialization.as_mut()) {
            specialization.kind = SpecializationKind::ImplicitInstantiation;
        }
        if let Some(layout) = script.layout {
            self.layouts.insert(record, layout);
        }
        true
    }

    fn require_complete_type(&mut self, ty: TypeRef) -> bool {
        if let Some(&completable) = self.completable.get(&ty) {
            return completable;
        }
        match self.type_node(ty).map(|node| &node.kind) {
            Some(TypeKind::Void) | None => false,
            Some(TypeKind::Record(id)) => {
                let definition = self
                    .declaration(*id)
                    .and_then(Decl::as_record)
                    .and_then(|record| record.definition);
                definition.is_some_and(|def| self.layouts.contains_key(&def))
            }
            Some(_) => true,
        }
    }
}

impl CodeGenTypes for MemoryUnit {
    fn arrange_global_declaration(&self, decl: GlobalDecl) -> Option<&CgFunctionInfo> {
        self.arrangements.get(&decl)
    }

    fn arrange_free_function_type(&self, ty: TypeRef) -> Option<&CgFunctionInfo> {
        self.pointer_arrangements.get(&ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_pointer_types_exist() {
        let unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let void_ptr = unit.void_pointer_type();
        let void_ptr_ptr = unit.void_pointer_pointer_type();
        assert_eq!(unit.type_node(void_ptr).unwrap().spelling, "void *");
        assert_eq!(unit.type_node(void_ptr_ptr).unwrap().kind, TypeKind::Pointer(void_ptr));
    }

    #[test]
    fn test_context_walk_includes_all_children() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let int = unit.builtin("int");
        let record = unit.add_record("S", TagKind::Struct, None);
        let a = unit.add_field(record, "a", int, None);
        let b = unit.add_field(record, "b", int, None);

        assert_eq!(unit.first_decl_in_context(record), Some(a));
        assert_eq!(unit.next_decl_in_context(a), Some(b));
        assert_eq!(unit.next_decl_in_context(b), None);
    }

    #[test]
    fn test_print_function_pointer_with_placeholder() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let int = unit.builtin("int");
        let char_ty = unit.builtin("char");
        let function = unit.function_type(int, vec![char_ty], false);
        let pointer = unit.pointer_to(function);

        assert_eq!(unit.print_type(function, ""), "int (char)");
        assert_eq!(unit.print_type(pointer, "callback"), "int (*callback)(char)");
        assert_eq!(unit.print_type(int, "value"), "int value");
    }

    #[test]
    fn test_expansion_buffers_resolve_to_spelling_file() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        unit.add_macro_expansion(9, 1);
        assert!(unit.is_in_main_file(SourceLocation::new(9, 1, 1)));
        assert!(!unit.is_in_main_file(SourceLocation::new(2, 1, 1)));
    }

    #[test]
    fn test_scripted_instantiation_updates_kind() {
        let mut unit = MemoryUnit::new(TargetInfo::x86_64_linux());
        let record = unit.add_record("Box<int>", TagKind::Class, Some(CxxRecord::default()));
        unit.set_specialization(
            record,
            ClassTemplateSpecialization {
                kind: SpecializationKind::Undeclared,
                is_partial: false,
                template_has_definition: true,
            },
        );
        unit.script_instantiation(record, true, None);

        assert!(unit.instantiate_class_template_specialization(record));
        let kind = unit
            .declaration(record)
            .and_then(Decl::as_record)
            .and_then(|r| r.specialization)
            .map(|s| s.kind);
        assert_eq!(kind, Some(SpecializationKind::ImplicitInstantiation));
    }
}
