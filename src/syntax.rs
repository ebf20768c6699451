//! Shared compilation state
//!
//! [`Syntax`] owns every table the front end fills: spellings, types,
//! identifiers, the tree, the string pool, the function table and the
//! diagnostics. The code generator reads all of them once parsing is done.

use crate::ast::{BinaryOp, Category, NodeId, NodeKind, Tree, UnaryOp};
use crate::config::FrontendOptions;
use crate::errors::Reporter;
use crate::tables::{IdentId, IdentKind, IdentTable, ReprId, ReprTable, TypeRef, TypeTable};
use rustc_hash::FxHashMap;
use std::fmt::Write as _;

/// Library functions with argument rules that a function type cannot express
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// Format string decides the number and types of the other arguments
    Printf,
    /// Any number of non-void arguments
    Print,
}

/// Slot of the function table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionEntry {
    pub ident: IdentId,
    pub definition: Option<NodeId>,
}

#[derive(Debug)]
pub struct Syntax {
    pub reprs: ReprTable,
    pub types: TypeTable,
    pub idents: IdentTable,
    pub tree: Tree,
    pub strings: Vec<String>,
    pub functions: Vec<FunctionEntry>,
    pub reporter: Reporter,
    builtins: FxHashMap<IdentId, Builtin>,
    main: ReprId,
}

const MATH_FUNCTIONS: [(&str, &str); 8] = [
    ("sqrt", "квкор"),
    ("exp", "эксп"),
    ("sin", "син"),
    ("cos", "кос"),
    ("log", "лог"),
    ("log10", "лог10"),
    ("asin", "асин"),
    ("round", "округл"),
];

impl Syntax {
    pub fn new(options: &FrontendOptions) -> Self {
        let mut reprs = ReprTable::new();
        let main = reprs.intern("main");
        let mut syntax = Self {
            reprs,
            types: TypeTable::new(),
            idents: IdentTable::new(main),
            tree: Tree::new(),
            strings: Vec::new(),
            functions: Vec::new(),
            reporter: Reporter::with_limits(options.warnings, options.max_errors),
            builtins: FxHashMap::default(),
            main,
        };
        syntax.predeclare_builtins();
        syntax
    }

    fn predeclare_builtins(&mut self) {
        let string = self.types.string();
        let printf = self.types.function(TypeRef::INTEGER, &[string]);
        let print = self.types.function(TypeRef::VOID, &[]);
        for name in ["printf", "печатьф", "PRINTF", "ПЕЧАТЬФ"] {
            self.predeclare(name, printf, Some(Builtin::Printf));
        }
        for name in ["print", "печать", "PRINT", "ПЕЧАТЬ"] {
            self.predeclare(name, print, Some(Builtin::Print));
        }

        let unary = self.types.function(TypeRef::FLOATING, &[TypeRef::FLOATING]);
        for (english, russian) in MATH_FUNCTIONS {
            self.predeclare(english, unary, None);
            self.predeclare(russian, unary, None);
        }
        let rand = self.types.function(TypeRef::FLOATING, &[]);
        self.predeclare("rand", rand, None);
        self.predeclare("случ", rand, None);
    }

    fn predeclare(&mut self, name: &str, ty: TypeRef, builtin: Option<Builtin>) {
        let repr = self.reprs.intern(name);
        let location = Default::default();
        if let Ok(id) = self.idents.declare_function(repr, ty, true, location) {
            if let Some(builtin) = builtin {
                self.builtins.insert(id, builtin);
            }
        }
    }

    pub fn builtin(&self, id: IdentId) -> Option<Builtin> {
        self.builtins.get(&id).copied()
    }

    pub fn main_repr(&self) -> ReprId {
        self.main
    }

    pub fn add_string(&mut self, value: String) -> usize {
        self.strings.push(value);
        self.strings.len() - 1
    }

    pub fn string(&self, index: usize) -> &str {
        &self.strings[index]
    }

    /// Reserves a function number for `ident`
    pub fn add_function(&mut self, ident: IdentId) -> usize {
        self.functions.push(FunctionEntry {
            ident,
            definition: None,
        });
        self.functions.len() - 1
    }

    pub fn type_name(&self, ty: TypeRef) -> String {
        self.types.display(ty, &self.reprs)
    }

    pub fn spelling(&self, repr: ReprId) -> &str {
        self.reprs.spelling(repr)
    }

    pub fn ident_name(&self, id: IdentId) -> &str {
        self.reprs.spelling(self.idents.get(id).name)
    }

    /// Storage size of `ty`
    pub fn size_of(&self, ty: TypeRef) -> usize {
        self.types.size_of(ty)
    }

    /// Declares a non-function identifier sized by its type
    pub fn declare(
        &mut self,
        name: ReprId,
        kind: IdentKind,
        ty: TypeRef,
        location: crate::ast::SourceLocation,
    ) -> Result<IdentId, crate::tables::DeclareError> {
        let size = if self.types.is_undefined(ty) {
            1
        } else {
            self.types.size_of(ty)
        };
        self.idents.declare(name, kind, ty, size, location)
    }

    /// Indented textual form of the subtree at `root`
    pub fn dump(&self, root: NodeId) -> String {
        let mut out = String::new();
        self.dump_node(&mut out, root, 0);
        out
    }

    fn dump_node(&self, out: &mut String, node: NodeId, depth: usize) {
        let _ = writeln!(out, "{:indent$}{}", "", self.describe(node), indent = depth * 2);
        for &child in self.tree.children(node) {
            self.dump_node(out, child, depth + 1);
        }
    }

    fn describe(&self, node: NodeId) -> String {
        let tree = &self.tree;
        let kind = tree.kind(node);
        let ident = |slot: usize| self.ident_name(IdentId::from_item(tree.arg(node, slot)));

        let mut text = format!("{kind:?}");
        match kind {
            NodeKind::Identifier => {
                let _ = write!(text, " {}", ident(2));
            }
            NodeKind::IntegerLiteral => {
                let _ = write!(text, " {}", tree.arg(node, 2));
            }
            NodeKind::FloatingLiteral => {
                let _ = write!(text, " {:?}", tree.literal_floating(node));
            }
            NodeKind::StringLiteral => {
                let _ = write!(text, " {:?}", self.string(tree.arg(node, 2) as usize));
            }
            NodeKind::Member => {
                let _ = write!(
                    text,
                    " {}{}",
                    if tree.arg(node, 3) != 0 { "->" } else { "." },
                    tree.arg(node, 2)
                );
            }
            NodeKind::Unary => {
                let op = UnaryOp::from_item(tree.arg(node, 2));
                let fixity = match op {
                    UnaryOp::PostInc | UnaryOp::PostDec => "postfix ",
                    _ => "",
                };
                let _ = write!(text, " {fixity}{}", op.spelling());
            }
            NodeKind::Binary => {
                let _ = write!(text, " {}", BinaryOp::from_item(tree.arg(node, 2)).spelling());
            }
            NodeKind::FunctionDefinition => {
                let _ = write!(text, " {} frame={}", ident(0), tree.arg(node, 1));
            }
            NodeKind::VariableDeclaration => {
                let id = IdentId::from_item(tree.arg(node, 0));
                let _ = write!(
                    text,
                    " {}: {}",
                    self.ident_name(id),
                    self.type_name(self.idents.get(id).ty)
                );
            }
            NodeKind::TypeDeclaration => {
                let _ = write!(text, " {}", self.type_name(TypeRef::from_item(tree.arg(node, 0))));
            }
            NodeKind::Labeled | NodeKind::Goto => {
                let _ = write!(text, " {}", ident(0));
            }
            _ => {}
        }

        if kind.is_expression() {
            let category = match tree.expression_category(node) {
                Category::Lvalue => "lvalue",
                Category::Rvalue => "rvalue",
            };
            let _ = write!(
                text,
                " : {} {category}",
                self.type_name(tree.expression_type(node))
            );
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_predeclared() {
        let mut syntax = Syntax::new(&FrontendOptions::default());
        let printf = syntax.reprs.intern("printf");
        let id = syntax.idents.resolve(printf).unwrap();
        assert_eq!(syntax.builtin(id), Some(Builtin::Printf));

        let sqrt = syntax.reprs.intern("квкор");
        let id = syntax.idents.resolve(sqrt).unwrap();
        assert_eq!(syntax.builtin(id), None);
        assert!(syntax.types.is_function(syntax.idents.get(id).ty));
    }

    #[test]
    fn test_string_pool() {
        let mut syntax = Syntax::new(&FrontendOptions::default());
        let first = syntax.add_string("hello".to_string());
        let second = syntax.add_string("world".to_string());
        assert_eq!(syntax.string(first), "hello");
        assert_eq!(second, first + 1);
    }
}
