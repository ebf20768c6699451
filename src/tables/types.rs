//! Type ("mode") table
//!
//! Primitive types are small non-positive constants. Composite types are
//! descriptors appended to one flat buffer and referenced by their offset:
//!
//! ```text
//! pointer   [POINTER, pointee]
//! array     [ARRAY, element]
//! function  [FUNCTION, return, n, param_1 .. param_n]
//! struct    [STRUCT, size, 2n, (field_type, field_name) x n]
//! enum      [ENUM, n, (value, name) x n]
//! ```
//!
//! The table is append-only and never deduplicates: writing `int *` twice
//! yields two offsets. Compatibility is decided by [`TypeTable::is_equal`],
//! which compares derived types (pointers, arrays, functions) by structure and
//! declared types (structs, enums) by reference.

use super::repr::{ReprId, ReprTable};
use super::Item;
use crate::errors::internal_error;
use std::fmt::Write as _;

/// A primitive type constant or the offset of a composite descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeRef(Item);

impl TypeRef {
    pub const UNDEFINED: TypeRef = TypeRef(0);
    pub const CHARACTER: TypeRef = TypeRef(-1);
    pub const INTEGER: TypeRef = TypeRef(-2);
    pub const FLOATING: TypeRef = TypeRef(-3);
    pub const BOOLEAN: TypeRef = TypeRef(-4);
    pub const NULL_POINTER: TypeRef = TypeRef(-5);
    pub const VOID: TypeRef = TypeRef(-6);

    pub fn to_item(self) -> Item {
        self.0
    }

    pub fn from_item(item: Item) -> Self {
        TypeRef(item)
    }

    pub fn is_composite(self) -> bool {
        self.0 > 0
    }
}

const POINTER: Item = 1001;
const ARRAY: Item = 1002;
const FUNCTION: Item = 1003;
const STRUCT: Item = 1004;
const ENUM: Item = 1005;

/// Coarse classification of a type reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Undefined,
    Void,
    Boolean,
    Character,
    Integer,
    Floating,
    NullPointer,
    Pointer,
    Array,
    Function,
    Struct,
    Enum,
}

#[derive(Debug)]
pub struct TypeTable {
    slots: Vec<Item>,
    string: TypeRef,
    void_pointer: TypeRef,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    /// Creates the table with the string and `void *` types predefined.
    pub fn new() -> Self {
        // Slot 0 is padding so that no descriptor sits at offset 0.
        let mut table = Self {
            slots: vec![0],
            string: TypeRef::UNDEFINED,
            void_pointer: TypeRef::UNDEFINED,
        };
        table.string = table.array_of(TypeRef::CHARACTER);
        table.void_pointer = table.pointer_to(TypeRef::VOID);
        table
    }

    /// Appends a descriptor and returns its offset.
    ///
    /// Past entries are never inspected, so identical descriptors appended
    /// twice get two different offsets.
    pub fn type_add(&mut self, descriptor: &[Item]) -> TypeRef {
        let expected = descriptor_len(descriptor);
        if expected != Some(descriptor.len()) {
            internal_error(format_args!("malformed type descriptor {descriptor:?}"));
        }

        let offset = self.slots.len() as Item;
        self.slots.extend_from_slice(descriptor);
        TypeRef(offset)
    }

    pub fn pointer_to(&mut self, pointee: TypeRef) -> TypeRef {
        self.type_add(&[POINTER, pointee.0])
    }

    pub fn array_of(&mut self, element: TypeRef) -> TypeRef {
        self.type_add(&[ARRAY, element.0])
    }

    pub fn function(&mut self, return_type: TypeRef, params: &[TypeRef]) -> TypeRef {
        let mut descriptor = vec![FUNCTION, return_type.0, params.len() as Item];
        descriptor.extend(params.iter().map(|param| param.0));
        self.type_add(&descriptor)
    }

    /// Appends a struct whose size is the sum of its field sizes.
    pub fn structure(&mut self, fields: &[(TypeRef, ReprId)]) -> TypeRef {
        let size: usize = fields.iter().map(|&(ty, _)| self.size_of(ty)).sum();
        let mut descriptor = vec![STRUCT, size as Item, 2 * fields.len() as Item];
        for &(ty, name) in fields {
            descriptor.push(ty.0);
            descriptor.push(name.to_item());
        }
        self.type_add(&descriptor)
    }

    pub fn enumeration(&mut self, constants: &[(Item, ReprId)]) -> TypeRef {
        let mut descriptor = vec![ENUM, constants.len() as Item];
        for &(value, name) in constants {
            descriptor.push(value);
            descriptor.push(name.to_item());
        }
        self.type_add(&descriptor)
    }

    /// The type of string literals, `char[]`
    pub fn string(&self) -> TypeRef {
        self.string
    }

    pub fn void_pointer(&self) -> TypeRef {
        self.void_pointer
    }

    /// Number of slots in the buffer, padding included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len() <= 1
    }

    /// Raw slots of the descriptor at `ty`
    pub fn descriptor(&self, ty: TypeRef) -> &[Item] {
        if !ty.is_composite() {
            internal_error(format_args!("type {} has no descriptor", ty.0));
        }
        let start = ty.0 as usize;
        let rest = self.slots.get(start..).unwrap_or(&[]);
        match descriptor_len(rest) {
            Some(len) if len <= rest.len() => &rest[..len],
            _ => internal_error(format_args!("offset {start} is not a type descriptor")),
        }
    }

    fn slot(&self, ty: TypeRef, index: usize) -> Item {
        self.descriptor(ty)[index]
    }

    pub fn class(&self, ty: TypeRef) -> TypeClass {
        match ty {
            TypeRef::UNDEFINED => TypeClass::Undefined,
            TypeRef::CHARACTER => TypeClass::Character,
            TypeRef::INTEGER => TypeClass::Integer,
            TypeRef::FLOATING => TypeClass::Floating,
            TypeRef::BOOLEAN => TypeClass::Boolean,
            TypeRef::NULL_POINTER => TypeClass::NullPointer,
            TypeRef::VOID => TypeClass::Void,
            _ => match self.slot(ty, 0) {
                POINTER => TypeClass::Pointer,
                ARRAY => TypeClass::Array,
                FUNCTION => TypeClass::Function,
                STRUCT => TypeClass::Struct,
                ENUM => TypeClass::Enum,
                tag => internal_error(format_args!("unknown type tag {tag}")),
            },
        }
    }

    pub fn is_undefined(&self, ty: TypeRef) -> bool {
        ty == TypeRef::UNDEFINED
    }

    pub fn is_void(&self, ty: TypeRef) -> bool {
        ty == TypeRef::VOID
    }

    /// Integer class: `char`, `int`, `bool` and enums
    pub fn is_integer(&self, ty: TypeRef) -> bool {
        matches!(
            self.class(ty),
            TypeClass::Character | TypeClass::Integer | TypeClass::Boolean | TypeClass::Enum
        )
    }

    pub fn is_floating(&self, ty: TypeRef) -> bool {
        ty == TypeRef::FLOATING
    }

    pub fn is_arithmetic(&self, ty: TypeRef) -> bool {
        self.is_integer(ty) || self.is_floating(ty)
    }

    pub fn is_pointer(&self, ty: TypeRef) -> bool {
        self.class(ty) == TypeClass::Pointer
    }

    pub fn is_null_pointer(&self, ty: TypeRef) -> bool {
        ty == TypeRef::NULL_POINTER
    }

    pub fn is_scalar(&self, ty: TypeRef) -> bool {
        self.is_arithmetic(ty) || self.is_pointer(ty) || self.is_null_pointer(ty)
    }

    pub fn is_array(&self, ty: TypeRef) -> bool {
        self.class(ty) == TypeClass::Array
    }

    pub fn is_function(&self, ty: TypeRef) -> bool {
        self.class(ty) == TypeClass::Function
    }

    pub fn is_struct(&self, ty: TypeRef) -> bool {
        self.class(ty) == TypeClass::Struct
    }

    pub fn is_enum(&self, ty: TypeRef) -> bool {
        self.class(ty) == TypeClass::Enum
    }

    /// `char[]`, however it was written
    pub fn is_string(&self, ty: TypeRef) -> bool {
        self.is_array(ty) && self.element(ty) == TypeRef::CHARACTER
    }

    /// Pointee of a pointer or element of an array
    pub fn element(&self, ty: TypeRef) -> TypeRef {
        match self.class(ty) {
            TypeClass::Pointer | TypeClass::Array => TypeRef(self.slot(ty, 1)),
            class => internal_error(format_args!("{class:?} type has no element type")),
        }
    }

    pub fn function_return(&self, ty: TypeRef) -> TypeRef {
        self.expect_class(ty, TypeClass::Function);
        TypeRef(self.slot(ty, 1))
    }

    pub fn param_count(&self, ty: TypeRef) -> usize {
        self.expect_class(ty, TypeClass::Function);
        self.slot(ty, 2) as usize
    }

    pub fn param(&self, ty: TypeRef, index: usize) -> TypeRef {
        TypeRef(self.slot(ty, 3 + index))
    }

    pub fn params(&self, ty: TypeRef) -> Vec<TypeRef> {
        (0..self.param_count(ty)).map(|i| self.param(ty, i)).collect()
    }

    pub fn struct_size(&self, ty: TypeRef) -> usize {
        self.expect_class(ty, TypeClass::Struct);
        self.slot(ty, 1) as usize
    }

    pub fn field_count(&self, ty: TypeRef) -> usize {
        self.expect_class(ty, TypeClass::Struct);
        (self.slot(ty, 2) / 2) as usize
    }

    pub fn field(&self, ty: TypeRef, index: usize) -> (TypeRef, ReprId) {
        let descriptor = self.descriptor(ty);
        (
            TypeRef(descriptor[3 + 2 * index]),
            ReprId::from_item(descriptor[4 + 2 * index]),
        )
    }

    /// Linear scan of the field list; the first field named `name` wins.
    pub fn find_field(&self, ty: TypeRef, name: ReprId) -> Option<(usize, TypeRef)> {
        (0..self.field_count(ty)).find_map(|i| {
            let (field_type, field_name) = self.field(ty, i);
            (field_name == name).then_some((i, field_type))
        })
    }

    pub fn enum_count(&self, ty: TypeRef) -> usize {
        self.expect_class(ty, TypeClass::Enum);
        self.slot(ty, 1) as usize
    }

    pub fn enum_constant(&self, ty: TypeRef, index: usize) -> (Item, ReprId) {
        let descriptor = self.descriptor(ty);
        (
            descriptor[2 + 2 * index],
            ReprId::from_item(descriptor[3 + 2 * index]),
        )
    }

    /// Storage size in slots: two for `float`, the recorded size for structs,
    /// one for everything else.
    pub fn size_of(&self, ty: TypeRef) -> usize {
        match self.class(ty) {
            TypeClass::Floating => 2,
            TypeClass::Struct => self.struct_size(ty),
            _ => 1,
        }
    }

    /// Type compatibility.
    ///
    /// Pointers, arrays and functions are rebuilt every time they are
    /// written, so they compare by structure. Structs and enums are declared
    /// once and reached through their name, so they compare by reference.
    pub fn is_equal(&self, first: TypeRef, second: TypeRef) -> bool {
        if first == second {
            return true;
        }

        let class = self.class(first);
        if class != self.class(second) {
            return false;
        }

        match class {
            TypeClass::Pointer | TypeClass::Array => {
                self.is_equal(self.element(first), self.element(second))
            }
            TypeClass::Function => {
                self.is_equal(self.function_return(first), self.function_return(second))
                    && self.param_count(first) == self.param_count(second)
                    && (0..self.param_count(first))
                        .all(|i| self.is_equal(self.param(first, i), self.param(second, i)))
            }
            _ => false,
        }
    }

    /// Human-readable spelling used in diagnostics
    pub fn display(&self, ty: TypeRef, reprs: &ReprTable) -> String {
        let mut out = String::new();
        self.write_type(&mut out, ty, reprs);
        out
    }

    fn write_type(&self, out: &mut String, ty: TypeRef, reprs: &ReprTable) {
        match self.class(ty) {
            TypeClass::Undefined => out.push_str("<undefined>"),
            TypeClass::Void => out.push_str("void"),
            TypeClass::Boolean => out.push_str("bool"),
            TypeClass::Character => out.push_str("char"),
            TypeClass::Integer => out.push_str("int"),
            TypeClass::Floating => out.push_str("float"),
            TypeClass::NullPointer => out.push_str("NULL"),
            TypeClass::Pointer => {
                self.write_type(out, self.element(ty), reprs);
                out.push('*');
            }
            TypeClass::Array => {
                self.write_type(out, self.element(ty), reprs);
                out.push_str("[]");
            }
            TypeClass::Function => {
                self.write_type(out, self.function_return(ty), reprs);
                out.push('(');
                for i in 0..self.param_count(ty) {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(out, self.param(ty, i), reprs);
                }
                out.push(')');
            }
            TypeClass::Struct => {
                out.push_str("struct {");
                for i in 0..self.field_count(ty) {
                    let (field_type, name) = self.field(ty, i);
                    out.push(' ');
                    self.write_type(out, field_type, reprs);
                    let _ = write!(out, " {};", reprs.spelling(name));
                }
                out.push_str(" }");
            }
            TypeClass::Enum => {
                out.push_str("enum {");
                for i in 0..self.enum_count(ty) {
                    let (_, name) = self.enum_constant(ty, i);
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, " {}", reprs.spelling(name));
                }
                out.push_str(" }");
            }
        }
    }

    fn expect_class(&self, ty: TypeRef, class: TypeClass) {
        let actual = self.class(ty);
        if actual != class {
            internal_error(format_args!("expected a {class:?} type, found {actual:?}"));
        }
    }
}

/// Length of the descriptor starting at `slots[0]`, read from its tag
fn descriptor_len(slots: &[Item]) -> Option<usize> {
    let count = |index: usize| slots.get(index).and_then(|&n| usize::try_from(n).ok());
    match *slots.first()? {
        POINTER | ARRAY => Some(2),
        FUNCTION => Some(3 + count(2)?),
        STRUCT => Some(3 + count(2)?),
        ENUM => Some(2 + 2 * count(1)?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_append_only_without_dedup() {
        let mut types = TypeTable::new();
        let first = types.pointer_to(TypeRef::INTEGER);
        let second = types.pointer_to(TypeRef::INTEGER);

        assert_ne!(first, second);
        assert!(types.is_equal(first, second));
        assert_eq!(types.descriptor(first), types.descriptor(second));
    }

    #[test]
    fn test_function_descriptor_layout() {
        let mut types = TypeTable::new();
        let f = types.function(TypeRef::INTEGER, &[TypeRef::FLOATING, TypeRef::CHARACTER]);

        assert_eq!(types.descriptor(f), &[FUNCTION, -2, 2, -3, -1]);
        assert_eq!(types.param_count(f), 2);
        assert_eq!(types.param(f, 0), TypeRef::FLOATING);
        assert_eq!(types.function_return(f), TypeRef::INTEGER);
    }

    #[test]
    fn test_struct_fields_and_size() {
        let mut reprs = ReprTable::new();
        let x = reprs.intern("x");
        let y = reprs.intern("y");
        let mut types = TypeTable::new();
        let point = types.structure(&[(TypeRef::INTEGER, x), (TypeRef::FLOATING, y)]);

        assert_eq!(types.class(point), TypeClass::Struct);
        assert_eq!(types.struct_size(point), 3);
        assert_eq!(types.size_of(point), 3);
        assert_eq!(types.field_count(point), 2);
        assert_eq!(types.find_field(point, y), Some((1, TypeRef::FLOATING)));
        assert_eq!(types.find_field(point, reprs.intern("z")), None);
        assert_eq!(types.display(point, &reprs), "struct { int x; float y; }");
    }

    #[test]
    fn test_first_matching_field_wins() {
        let mut reprs = ReprTable::new();
        let a = reprs.intern("a");
        let mut types = TypeTable::new();
        let s = types.structure(&[(TypeRef::CHARACTER, a), (TypeRef::FLOATING, a)]);
        assert_eq!(types.find_field(s, a), Some((0, TypeRef::CHARACTER)));
    }

    #[test]
    fn test_structs_compare_by_reference() {
        let mut reprs = ReprTable::new();
        let x = reprs.intern("x");
        let mut types = TypeTable::new();
        let first = types.structure(&[(TypeRef::INTEGER, x)]);
        let second = types.structure(&[(TypeRef::INTEGER, x)]);
        assert!(!types.is_equal(first, second));

        let p1 = types.pointer_to(first);
        let p2 = types.pointer_to(first);
        assert!(types.is_equal(p1, p2));
    }

    #[test]
    fn test_enum_constants() {
        let mut reprs = ReprTable::new();
        let red = reprs.intern("RED");
        let blue = reprs.intern("BLUE");
        let mut types = TypeTable::new();
        let color = types.enumeration(&[(0, red), (4, blue)]);

        assert!(types.is_integer(color));
        assert_eq!(types.enum_count(color), 2);
        assert_eq!(types.enum_constant(color, 1), (4, blue));
        assert_eq!(types.display(color, &reprs), "enum { RED, BLUE }");
    }

    #[test]
    fn test_classification() {
        let mut types = TypeTable::new();
        let ptr = types.pointer_to(TypeRef::CHARACTER);

        assert!(types.is_scalar(ptr));
        assert!(types.is_scalar(TypeRef::NULL_POINTER));
        assert!(!types.is_arithmetic(ptr));
        assert!(types.is_integer(TypeRef::BOOLEAN));
        assert!(!types.is_scalar(TypeRef::VOID));
        assert!(types.is_string(types.string()));
        assert_eq!(types.size_of(TypeRef::FLOATING), 2);
        assert_eq!(types.size_of(ptr), 1);
    }

    #[test]
    fn test_display_derived_types() {
        let reprs = ReprTable::new();
        let mut types = TypeTable::new();
        let row = types.array_of(TypeRef::FLOATING);
        let f = types.function(TypeRef::VOID, &[row, TypeRef::INTEGER]);
        assert_eq!(types.display(f, &reprs), "void(float[], int)");
    }

    #[test]
    #[should_panic(expected = "internal compiler error")]
    fn test_malformed_descriptor_is_internal_error() {
        let mut types = TypeTable::new();
        types.type_add(&[FUNCTION, -2, 3, -2]);
    }
}
