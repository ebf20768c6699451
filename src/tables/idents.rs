//! Identifier table with scoped visibility
//!
//! Every declaration appends an [`Ident`] record that lives for the whole
//! compilation, so tree nodes can refer to it by [`IdentId`]. Name lookup goes
//! through a map from spelling to the most recent visible record. Each record
//! remembers the binding it hid in `previous`, and leaving a scope walks the
//! scope's records backwards to put those bindings back.
//!
//! Labels are recorded here too, but they live in their own per-function
//! namespace kept by the parser and are never visible through [`IdentTable::resolve`].

use super::repr::ReprId;
use super::types::TypeRef;
use super::Item;
use crate::ast::SourceLocation;
use rustc_hash::FxHashMap;
use tracing::trace;

/// Handle of one identifier record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentId(u32);

impl IdentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn to_item(self) -> Item {
        Item::from(self.0)
    }

    pub fn from_item(item: Item) -> Self {
        match u32::try_from(item) {
            Ok(raw) => IdentId(raw),
            Err(_) => crate::errors::internal_error(format_args!(
                "slot {item} is not an identifier handle"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    Variable,
    Function,
    Label,
    TypeName,
    /// Enumerator; its displacement holds the value
    EnumConstant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: ReprId,
    pub kind: IdentKind,
    pub ty: TypeRef,
    /// Storage slot for variables, function number for functions,
    /// value for enumerators
    pub displacement: Item,
    /// Binding of the same name that this record hides or redeclares
    pub previous: Option<IdentId>,
    /// Function has a body, or label definition was seen
    pub defined: bool,
    pub location: SourceLocation,
}

/// Why a declaration was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclareError {
    Redefinition { previous: IdentId },
    MainRedefinition,
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    saved_count: usize,
    saved_displacement: Item,
}

#[derive(Debug)]
pub struct IdentTable {
    idents: Vec<Ident>,
    visible: FxHashMap<ReprId, IdentId>,
    scopes: Vec<Scope>,
    main: ReprId,
    displacement: Item,
    max_displacement: Item,
    global_displacement: Item,
    in_function: bool,
}

impl IdentTable {
    /// `main` is the spelling of the program entry point.
    pub fn new(main: ReprId) -> Self {
        Self {
            idents: Vec::new(),
            visible: FxHashMap::default(),
            scopes: Vec::new(),
            main,
            displacement: 0,
            max_displacement: 0,
            global_displacement: 0,
            in_function: false,
        }
    }

    /// Declares a non-function identifier in the current scope.
    ///
    /// Variables get storage of `size` slots: locals count up from zero in the
    /// current frame, globals count down from `-1`.
    pub fn declare(
        &mut self,
        name: ReprId,
        kind: IdentKind,
        ty: TypeRef,
        size: usize,
        location: SourceLocation,
    ) -> Result<IdentId, DeclareError> {
        if kind == IdentKind::Label {
            return Ok(self.add_label(name, location));
        }

        if let Some(previous) = self.visible_in_current_scope(name) {
            return Err(self.conflict(name, previous));
        }

        let displacement = if kind == IdentKind::Variable {
            self.allocate(size)
        } else {
            0
        };

        Ok(self.push(Ident {
            name,
            kind,
            ty,
            displacement,
            previous: None,
            defined: true,
            location,
        }))
    }

    /// Declares a function. A prototype may be followed by exactly one
    /// definition in the same scope; the definition's `previous` is the
    /// prototype.
    pub fn declare_function(
        &mut self,
        name: ReprId,
        ty: TypeRef,
        is_definition: bool,
        location: SourceLocation,
    ) -> Result<IdentId, DeclareError> {
        let mut displacement = 0;
        if let Some(previous) = self.visible_in_current_scope(name) {
            let prior = &self.idents[previous.index()];
            let completes_prototype =
                prior.kind == IdentKind::Function && !prior.defined && is_definition;
            if !completes_prototype {
                return Err(self.conflict(name, previous));
            }
            displacement = prior.displacement;
        }

        Ok(self.push(Ident {
            name,
            kind: IdentKind::Function,
            ty,
            displacement,
            previous: None,
            defined: is_definition,
            location,
        }))
    }

    /// Records a label. Labels never take part in [`IdentTable::resolve`].
    pub fn add_label(&mut self, name: ReprId, location: SourceLocation) -> IdentId {
        let id = IdentId(self.idents.len() as u32);
        self.idents.push(Ident {
            name,
            kind: IdentKind::Label,
            ty: TypeRef::UNDEFINED,
            displacement: 0,
            previous: None,
            defined: false,
            location,
        });
        id
    }

    /// Most recent visible declaration of `name`
    pub fn resolve(&self, name: ReprId) -> Option<IdentId> {
        self.visible.get(&name).copied()
    }

    pub fn get(&self, id: IdentId) -> &Ident {
        &self.idents[id.index()]
    }

    pub fn set_type(&mut self, id: IdentId, ty: TypeRef) {
        self.idents[id.index()].ty = ty;
    }

    pub fn set_displacement(&mut self, id: IdentId, displacement: Item) {
        self.idents[id.index()].displacement = displacement;
    }

    /// Marks `id` defined at `location`, replacing the location of a
    /// forward reference
    pub fn mark_defined(&mut self, id: IdentId, location: SourceLocation) {
        let ident = &mut self.idents[id.index()];
        ident.defined = true;
        ident.location = location;
    }

    pub fn len(&self) -> usize {
        self.idents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IdentId, &Ident)> {
        self.idents
            .iter()
            .enumerate()
            .map(|(i, ident)| (IdentId(i as u32), ident))
    }

    /// Identifiers currently visible by name, in declaration order
    pub fn visible(&self) -> Vec<IdentId> {
        let mut ids: Vec<IdentId> = self.visible.values().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn enter_scope(&mut self) {
        trace!(depth = self.scopes.len() + 1, "enter scope");
        self.scopes.push(Scope {
            saved_count: self.idents.len(),
            saved_displacement: self.displacement,
        });
    }

    /// Hides everything declared since the matching [`IdentTable::enter_scope`]
    /// and rewinds the storage counter.
    pub fn exit_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            crate::errors::internal_error("scope exit without a matching enter");
        };
        trace!(depth = self.scopes.len(), "exit scope");

        for index in (scope.saved_count..self.idents.len()).rev() {
            let id = IdentId(index as u32);
            let ident = &self.idents[index];
            if self.visible.get(&ident.name) != Some(&id) {
                continue;
            }
            match ident.previous {
                Some(previous) => {
                    self.visible.insert(ident.name, previous);
                }
                None => {
                    self.visible.remove(&ident.name);
                }
            }
        }

        self.displacement = scope.saved_displacement;
    }

    /// Opens the outermost scope of a function body with a fresh frame.
    pub fn enter_function_scope(&mut self) {
        self.enter_scope();
        self.in_function = true;
        self.displacement = 0;
        self.max_displacement = 0;
    }

    /// Closes a function body and returns its frame size.
    pub fn exit_function_scope(&mut self) -> usize {
        self.exit_scope();
        self.in_function = false;
        self.max_displacement as usize
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    fn scope_start(&self) -> usize {
        self.scopes.last().map_or(0, |scope| scope.saved_count)
    }

    fn visible_in_current_scope(&self, name: ReprId) -> Option<IdentId> {
        self.resolve(name)
            .filter(|id| id.index() >= self.scope_start())
    }

    fn conflict(&self, name: ReprId, previous: IdentId) -> DeclareError {
        if name == self.main {
            DeclareError::MainRedefinition
        } else {
            DeclareError::Redefinition { previous }
        }
    }

    fn allocate(&mut self, size: usize) -> Item {
        let size = size as Item;
        if self.in_function {
            let displacement = self.displacement;
            self.displacement += size;
            self.max_displacement = self.max_displacement.max(self.displacement);
            displacement
        } else {
            self.global_displacement -= size;
            self.global_displacement
        }
    }

    fn push(&mut self, mut ident: Ident) -> IdentId {
        let id = IdentId(self.idents.len() as u32);
        ident.previous = self.visible.insert(ident.name, id);
        self.idents.push(ident);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::ReprTable;

    fn setup() -> (ReprTable, IdentTable) {
        let mut reprs = ReprTable::new();
        let main = reprs.intern("main");
        (reprs, IdentTable::new(main))
    }

    fn here() -> SourceLocation {
        SourceLocation::new(1, 1)
    }

    #[test]
    fn test_shadowing_and_restore() {
        let (mut reprs, mut idents) = setup();
        let x = reprs.intern("x");

        let outer = idents
            .declare(x, IdentKind::Variable, TypeRef::INTEGER, 1, here())
            .unwrap();
        idents.enter_scope();
        let inner = idents
            .declare(x, IdentKind::Variable, TypeRef::FLOATING, 2, here())
            .unwrap();
        assert_eq!(idents.resolve(x), Some(inner));
        assert_eq!(idents.get(inner).previous, Some(outer));
        idents.exit_scope();

        assert_eq!(idents.resolve(x), Some(outer));
    }

    #[test]
    fn test_scope_exit_hides_new_names() {
        let (mut reprs, mut idents) = setup();
        let y = reprs.intern("y");

        idents.enter_scope();
        idents
            .declare(y, IdentKind::Variable, TypeRef::INTEGER, 1, here())
            .unwrap();
        idents.exit_scope();

        assert_eq!(idents.resolve(y), None);
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let (mut reprs, mut idents) = setup();
        let z = reprs.intern("z");

        let first = idents
            .declare(z, IdentKind::Variable, TypeRef::INTEGER, 1, here())
            .unwrap();
        let err = idents
            .declare(z, IdentKind::Variable, TypeRef::INTEGER, 1, here())
            .unwrap_err();
        assert_eq!(err, DeclareError::Redefinition { previous: first });
    }

    #[test]
    fn test_main_redefinition_is_distinct() {
        let (mut reprs, mut idents) = setup();
        let main = reprs.intern("main");
        let ty = TypeRef::INTEGER;

        idents.declare_function(main, ty, true, here()).unwrap();
        let err = idents.declare_function(main, ty, true, here()).unwrap_err();
        assert_eq!(err, DeclareError::MainRedefinition);
    }

    #[test]
    fn test_prototype_then_definition() {
        let (mut reprs, mut idents) = setup();
        let f = reprs.intern("f");

        let proto = idents.declare_function(f, TypeRef::INTEGER, false, here()).unwrap();
        idents.set_displacement(proto, 4);
        let def = idents.declare_function(f, TypeRef::INTEGER, true, here()).unwrap();

        assert_eq!(idents.get(def).previous, Some(proto));
        assert_eq!(idents.get(def).displacement, 4);
        assert!(idents
            .declare_function(f, TypeRef::INTEGER, true, here())
            .is_err());
    }

    #[test]
    fn test_repeated_prototype_is_rejected() {
        let (mut reprs, mut idents) = setup();
        let g = reprs.intern("g");

        idents.declare_function(g, TypeRef::VOID, false, here()).unwrap();
        assert!(idents.declare_function(g, TypeRef::VOID, false, here()).is_err());
    }

    #[test]
    fn test_displacements() {
        let (mut reprs, mut idents) = setup();
        let a = reprs.intern("a");
        let b = reprs.intern("b");
        let c = reprs.intern("c");

        let global = idents
            .declare(a, IdentKind::Variable, TypeRef::FLOATING, 2, here())
            .unwrap();
        assert_eq!(idents.get(global).displacement, -2);

        idents.enter_function_scope();
        let first = idents
            .declare(b, IdentKind::Variable, TypeRef::FLOATING, 2, here())
            .unwrap();
        idents.enter_scope();
        let second = idents
            .declare(c, IdentKind::Variable, TypeRef::INTEGER, 1, here())
            .unwrap();
        idents.exit_scope();
        let third = idents
            .declare(c, IdentKind::Variable, TypeRef::INTEGER, 1, here())
            .unwrap();
        let frame = idents.exit_function_scope();

        assert_eq!(idents.get(first).displacement, 0);
        assert_eq!(idents.get(second).displacement, 2);
        assert_eq!(idents.get(third).displacement, 2);
        assert_eq!(frame, 3);
    }

    #[test]
    fn test_labels_are_not_resolvable() {
        let (mut reprs, mut idents) = setup();
        let l = reprs.intern("l");

        let var = idents
            .declare(l, IdentKind::Variable, TypeRef::INTEGER, 1, here())
            .unwrap();
        let label = idents.add_label(l, here());
        assert_ne!(var, label);
        assert_eq!(idents.resolve(l), Some(var));
        assert_eq!(idents.get(label).kind, IdentKind::Label);
    }
}
