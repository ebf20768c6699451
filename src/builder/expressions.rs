//! Expression builders
//!
//! Operator rules:
//!
//! ```text
//! unary   ++ --          arithmetic lvalue          -> operand type
//!         &              lvalue                     -> pointer to operand
//!         *              pointer                    -> element, lvalue
//!         + - abs        arithmetic                 -> int | float
//!         ~              integer                    -> int
//!         !              scalar                     -> bool
//!         upb            array                      -> int
//! binary  % << >> & ^ |  integer, integer           -> int
//!         * / + -        arithmetic, arithmetic     -> common type
//!         < > <= >=      arithmetic, arithmetic     -> bool
//!         == !=          arithmetic or pointers     -> bool
//!         && ||          scalar, scalar             -> bool
//!         = op=          lvalue, assignable         -> left type
//!         ,              any, any                   -> right type
//! ```

use super::Builder;
use crate::ast::{BinaryOp, Category, Expr, NodeKind, Span, UnaryOp};
use crate::errors::{ErrorKind, WarningKind};
use crate::syntax::Builtin;
use crate::tables::{IdentId, IdentKind, Item, ReprId, TypeRef};

/// Expected argument type of a printf conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Integer,
    Character,
    Floating,
    String,
}

impl Conversion {
    fn from_specifier(specifier: char) -> Option<Conversion> {
        match specifier {
            'i' | 'd' | 'ц' => Some(Conversion::Integer),
            'c' | 'л' => Some(Conversion::Character),
            'f' | 'в' => Some(Conversion::Floating),
            's' | 'с' => Some(Conversion::String),
            _ => None,
        }
    }
}

impl Builder<'_> {
    // ===== Primary expressions =====

    pub fn build_identifier(&mut self, name: ReprId, span: Span) -> Expr {
        let Some(id) = self.sx.idents.resolve(name) else {
            let name = self.sx.spelling(name).to_string();
            self.error(ErrorKind::UndeclaredVariable { name }, span);
            return Expr::broken_at(span);
        };

        let ident = self.sx.idents.get(id);
        let (kind, ty, displacement) = (ident.kind, ident.ty, ident.displacement);
        match kind {
            IdentKind::TypeName => {
                let name = self.sx.spelling(name).to_string();
                self.error(ErrorKind::TypeNameUsedAsValue { name }, span);
                Expr::broken_at(span)
            }
            IdentKind::EnumConstant => self.build_typed_integer_literal(displacement, ty, span),
            // the failed declaration was already reported
            IdentKind::Variable if self.sx.types.is_undefined(ty) => Expr::broken_at(span),
            IdentKind::Function if self.sx.types.is_undefined(self.sx.types.function_return(ty)) => {
                Expr::broken_at(span)
            }
            IdentKind::Function => self.identifier_node(id, ty, Category::Rvalue, span),
            IdentKind::Variable | IdentKind::Label => {
                self.identifier_node(id, ty, Category::Lvalue, span)
            }
        }
    }

    fn identifier_node(&mut self, id: IdentId, ty: TypeRef, category: Category, span: Span) -> Expr {
        self.expression_node(NodeKind::Identifier, ty, category, &[id.to_item()], &[], span)
    }

    pub fn build_integer_literal(&mut self, value: Item, span: Span) -> Expr {
        self.build_typed_integer_literal(value, TypeRef::INTEGER, span)
    }

    /// Integer literal of an integer-class type: `char`, `int`, `bool` or an enum
    pub fn build_typed_integer_literal(&mut self, value: Item, ty: TypeRef, span: Span) -> Expr {
        self.expression_node(NodeKind::IntegerLiteral, ty, Category::Rvalue, &[value], &[], span)
    }

    pub fn build_character_literal(&mut self, value: char, span: Span) -> Expr {
        self.build_typed_integer_literal(Item::from(u32::from(value)), TypeRef::CHARACTER, span)
    }

    pub fn build_floating_literal(&mut self, value: f64, span: Span) -> Expr {
        let bits = value.to_bits() as Item;
        self.expression_node(
            NodeKind::FloatingLiteral,
            TypeRef::FLOATING,
            Category::Rvalue,
            &[bits],
            &[],
            span,
        )
    }

    pub fn build_string_literal(&mut self, value: String, span: Span) -> Expr {
        let index = self.sx.add_string(value) as Item;
        let ty = self.sx.types.string();
        self.expression_node(NodeKind::StringLiteral, ty, Category::Rvalue, &[index], &[], span)
    }

    pub fn build_null_literal(&mut self, span: Span) -> Expr {
        self.expression_node(
            NodeKind::NullLiteral,
            TypeRef::NULL_POINTER,
            Category::Rvalue,
            &[],
            &[],
            span,
        )
    }

    /// Requires `expr` to have folded to a literal
    pub fn build_constant_expression(&mut self, expr: Expr) -> Expr {
        if expr.is_broken() {
            return expr;
        }
        match self.sx.tree.kind(expr.node) {
            NodeKind::IntegerLiteral | NodeKind::FloatingLiteral => expr,
            _ => {
                self.error(ErrorKind::NotConstantExpression, expr.span);
                Expr::broken_at(expr.span)
            }
        }
    }

    // ===== Postfix expressions =====

    pub fn build_subscript(&mut self, base: Expr, index: Expr, span: Span) -> Expr {
        if base.is_broken() || index.is_broken() {
            return Expr::broken_at(span);
        }
        if !self.sx.types.is_array(base.ty) {
            let found = self.type_name(base.ty);
            self.error(ErrorKind::SubscriptOfNonArray { found }, base.span);
            return Expr::broken_at(span);
        }
        if !self.sx.types.is_integer(index.ty) {
            let found = self.type_name(index.ty);
            self.error(ErrorKind::SubscriptNotInteger { found }, index.span);
            return Expr::broken_at(span);
        }

        let element = self.sx.types.element(base.ty);
        self.expression_node(
            NodeKind::Subscript,
            element,
            Category::Lvalue,
            &[],
            &[base.node, index.node],
            span,
        )
    }

    pub fn build_call(&mut self, callee: Expr, args: Vec<Expr>, span: Span) -> Expr {
        if callee.is_broken() || args.iter().any(Expr::is_broken) {
            return Expr::broken_at(span);
        }
        if !self.sx.types.is_function(callee.ty) {
            let found = self.type_name(callee.ty);
            self.error(ErrorKind::CallOfNonFunction { found }, callee.span);
            return Expr::broken_at(span);
        }

        let builtin = match self.sx.tree.kind(callee.node) {
            NodeKind::Identifier => {
                let id = IdentId::from_item(self.sx.tree.arg(callee.node, 2));
                self.sx.builtin(id)
            }
            _ => None,
        };
        let (result, args) = match builtin {
            Some(Builtin::Printf) => (TypeRef::INTEGER, self.check_printf_arguments(args, span)),
            Some(Builtin::Print) => (TypeRef::VOID, self.check_print_arguments(args, span)),
            None => {
                let result = self.sx.types.function_return(callee.ty);
                (result, self.check_call_arguments(callee.ty, args, span))
            }
        };
        let Some(args) = args else {
            return Expr::broken_at(span);
        };

        let mut children = Vec::with_capacity(args.len() + 1);
        children.push(callee.node);
        children.extend(args.iter().map(|arg| arg.node));
        self.expression_node(NodeKind::Call, result, Category::Rvalue, &[], &children, span)
    }

    fn check_call_arguments(
        &mut self,
        function: TypeRef,
        args: Vec<Expr>,
        span: Span,
    ) -> Option<Vec<Expr>> {
        let params = self.sx.types.params(function);
        if params.len() != args.len() {
            let kind = ErrorKind::WrongArgumentCount {
                expected: params.len(),
                found: args.len(),
            };
            self.error(kind, span);
            return None;
        }

        let mut checked = Vec::with_capacity(args.len());
        for (param, arg) in params.into_iter().zip(args) {
            let arg = self.check_assignment_operands(param, arg);
            if arg.is_broken() {
                return None;
            }
            checked.push(arg);
        }
        Some(checked)
    }

    fn check_printf_arguments(&mut self, args: Vec<Expr>, span: Span) -> Option<Vec<Expr>> {
        let Some(format) = args.first().copied() else {
            self.error(ErrorKind::PrintfFormatNotString, span);
            return None;
        };
        if self.sx.tree.kind(format.node) != NodeKind::StringLiteral {
            self.error(ErrorKind::PrintfFormatNotString, format.span);
            return None;
        }

        let index = self.sx.tree.arg(format.node, 2) as usize;
        let conversions = match parse_format(self.sx.string(index)) {
            Ok(conversions) => conversions,
            Err(kind) => {
                self.error(kind, format.span);
                return None;
            }
        };
        if conversions.len() > self.printf_max_args {
            let max = self.printf_max_args;
            self.error(ErrorKind::PrintfTooManyArguments { max }, format.span);
            return None;
        }
        if conversions.len() != args.len() - 1 {
            let kind = ErrorKind::PrintfArgumentCount {
                expected: conversions.len(),
                found: args.len() - 1,
            };
            self.error(kind, span);
            return None;
        }

        let mut checked = Vec::with_capacity(args.len());
        checked.push(format);
        for (conversion, arg) in conversions.into_iter().zip(args.into_iter().skip(1)) {
            let target = match conversion {
                Conversion::Integer => TypeRef::INTEGER,
                Conversion::Character => TypeRef::CHARACTER,
                Conversion::Floating => TypeRef::FLOATING,
                Conversion::String => self.sx.types.string(),
            };
            let arg = self.check_assignment_operands(target, arg);
            if arg.is_broken() {
                return None;
            }
            checked.push(arg);
        }
        Some(checked)
    }

    fn check_print_arguments(&mut self, args: Vec<Expr>, span: Span) -> Option<Vec<Expr>> {
        if args.is_empty() {
            self.error(ErrorKind::WrongArgumentCount { expected: 1, found: 0 }, span);
            return None;
        }
        for arg in &args {
            if self.sx.types.is_void(arg.ty) {
                let kind = ErrorKind::TypeMismatch {
                    expected: "a printable value".to_string(),
                    found: self.type_name(arg.ty),
                };
                self.error(kind, arg.span);
                return None;
            }
        }
        Some(args)
    }

    /// `base.name` or `base->name`
    pub fn build_member(&mut self, base: Expr, name: ReprId, is_arrow: bool, span: Span) -> Expr {
        if base.is_broken() {
            return Expr::broken_at(span);
        }

        let types = &self.sx.types;
        let (structure, category) = if is_arrow {
            let pointee = if types.is_pointer(base.ty) {
                types.element(base.ty)
            } else {
                TypeRef::UNDEFINED
            };
            if !types.is_struct(pointee) {
                let found = self.type_name(base.ty);
                self.error(ErrorKind::ArrowOfNonPointerToStruct { found }, base.span);
                return Expr::broken_at(span);
            }
            (pointee, Category::Lvalue)
        } else {
            if !types.is_struct(base.ty) {
                let found = self.type_name(base.ty);
                self.error(ErrorKind::MemberOfNonStruct { found }, base.span);
                return Expr::broken_at(span);
            }
            (base.ty, base.category)
        };

        let Some((index, field)) = self.sx.types.find_field(structure, name) else {
            let name = self.sx.spelling(name).to_string();
            self.error(ErrorKind::NoSuchMember { name }, span);
            return Expr::broken_at(span);
        };
        // a member of incomplete type was reported with its struct
        if self.sx.types.is_undefined(field) {
            return Expr::broken_at(span);
        }
        self.expression_node(
            NodeKind::Member,
            field,
            category,
            &[index as Item, Item::from(is_arrow)],
            &[base.node],
            span,
        )
    }

    // ===== Operators =====

    pub fn build_unary(&mut self, operand: Expr, op: UnaryOp, span: Span) -> Expr {
        if operand.is_broken() {
            return Expr::broken_at(span);
        }

        let types = &self.sx.types;
        let ty = operand.ty;
        let (result, category) = match op {
            UnaryOp::PostInc | UnaryOp::PostDec | UnaryOp::PreInc | UnaryOp::PreDec => {
                if !operand.is_lvalue() {
                    self.error(ErrorKind::NotAnLvalue, operand.span);
                    return Expr::broken_at(span);
                }
                if !types.is_arithmetic(ty) {
                    return self.operand_mismatch("arithmetic operand", ty, operand.span);
                }
                (ty, Category::Rvalue)
            }
            UnaryOp::Address => {
                if !operand.is_lvalue() {
                    self.error(ErrorKind::AddressOfNonLvalue, operand.span);
                    return Expr::broken_at(span);
                }
                (self.sx.types.pointer_to(ty), Category::Rvalue)
            }
            UnaryOp::Indirection => {
                if !types.is_pointer(ty) {
                    let found = self.type_name(ty);
                    self.error(ErrorKind::IndirectionOfNonPointer { found }, operand.span);
                    return Expr::broken_at(span);
                }
                (types.element(ty), Category::Lvalue)
            }
            UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Abs => {
                if types.is_floating(ty) {
                    (TypeRef::FLOATING, Category::Rvalue)
                } else if types.is_integer(ty) {
                    (TypeRef::INTEGER, Category::Rvalue)
                } else {
                    return self.operand_mismatch("arithmetic operand", ty, operand.span);
                }
            }
            UnaryOp::BitNot => {
                if !types.is_integer(ty) {
                    return self.operand_mismatch("integer operand", ty, operand.span);
                }
                (TypeRef::INTEGER, Category::Rvalue)
            }
            UnaryOp::LogNot => {
                if !types.is_scalar(ty) {
                    return self.operand_mismatch("scalar operand", ty, operand.span);
                }
                (TypeRef::BOOLEAN, Category::Rvalue)
            }
            UnaryOp::Upb => {
                if !types.is_array(ty) {
                    return self.operand_mismatch("array operand", ty, operand.span);
                }
                (TypeRef::INTEGER, Category::Rvalue)
            }
        };

        if let Some(folded) = self.fold_unary(op, operand, result, span) {
            return folded;
        }
        self.expression_node(
            NodeKind::Unary,
            result,
            category,
            &[op.to_item()],
            &[operand.node],
            span,
        )
    }

    pub fn build_binary(&mut self, left: Expr, right: Expr, op: BinaryOp, span: Span) -> Expr {
        if left.is_broken() || right.is_broken() {
            return Expr::broken_at(span);
        }
        if op.is_assignment() {
            return self.build_assignment(left, right, op, span);
        }

        let types = &self.sx.types;
        let (left, right, result) = if op == BinaryOp::Comma {
            (left, right, right.ty)
        } else if op.is_integer_only() {
            if !types.is_integer(left.ty) || !types.is_integer(right.ty) {
                return self.operands_mismatch("integer operands", op, left, right);
            }
            (left, right, TypeRef::INTEGER)
        } else if op.is_logical() {
            if !types.is_scalar(left.ty) || !types.is_scalar(right.ty) {
                return self.operands_mismatch("scalar operands", op, left, right);
            }
            (left, right, TypeRef::BOOLEAN)
        } else if op.is_equality() && !types.is_arithmetic(left.ty) {
            let comparable = types.is_equal(left.ty, right.ty)
                || (types.is_null_pointer(left.ty) && types.is_pointer(right.ty))
                || (types.is_pointer(left.ty) && types.is_null_pointer(right.ty));
            if !comparable || !types.is_scalar(left.ty) {
                return self.operands_mismatch("comparable operands", op, left, right);
            }
            (left, right, TypeRef::BOOLEAN)
        } else {
            if !types.is_arithmetic(left.ty) || !types.is_arithmetic(right.ty) {
                return self.operands_mismatch("arithmetic operands", op, left, right);
            }
            let (left, right, common) = self.usual_arithmetic_conversions(left, right);
            if op.is_equality() && common == TypeRef::FLOATING {
                self.warning(WarningKind::FloatEquality, span);
            }
            let result = if op.is_relational() || op.is_equality() {
                TypeRef::BOOLEAN
            } else {
                common
            };
            (left, right, result)
        };

        if let Some(folded) = self.fold_binary(op, left, right, result, span) {
            return folded;
        }
        self.expression_node(
            NodeKind::Binary,
            result,
            Category::Rvalue,
            &[op.to_item()],
            &[left.node, right.node],
            span,
        )
    }

    fn build_assignment(&mut self, left: Expr, right: Expr, op: BinaryOp, span: Span) -> Expr {
        if !left.is_lvalue() {
            self.error(ErrorKind::NotAnLvalue, left.span);
            return Expr::broken_at(span);
        }

        let right = match op.underlying() {
            None => self.check_assignment_operands(left.ty, right),
            Some(underlying) => {
                let types = &self.sx.types;
                let fits = if underlying.is_integer_only() {
                    types.is_integer(left.ty) && types.is_integer(right.ty)
                } else {
                    types.is_arithmetic(left.ty)
                        && types.is_arithmetic(right.ty)
                        && !(types.is_integer(left.ty) && types.is_floating(right.ty))
                };
                if !fits {
                    let expected = if underlying.is_integer_only() {
                        "integer operands"
                    } else {
                        "arithmetic operands"
                    };
                    return self.operands_mismatch(expected, op, left, right);
                }
                self.check_assignment_operands(left.ty, right)
            }
        };
        if right.is_broken() {
            return Expr::broken_at(span);
        }

        self.expression_node(
            NodeKind::Binary,
            left.ty,
            Category::Rvalue,
            &[op.to_item()],
            &[left.node, right.node],
            span,
        )
    }

    pub fn build_ternary(&mut self, condition: Expr, then: Expr, otherwise: Expr, span: Span) -> Expr {
        if condition.is_broken() || then.is_broken() || otherwise.is_broken() {
            return Expr::broken_at(span);
        }
        if !self.check_condition(condition) {
            return Expr::broken_at(span);
        }

        let types = &self.sx.types;
        let (then, otherwise, result) =
            if types.is_arithmetic(then.ty) && types.is_arithmetic(otherwise.ty) {
                self.usual_arithmetic_conversions(then, otherwise)
            } else if types.is_pointer(then.ty) && types.is_null_pointer(otherwise.ty) {
                (then, otherwise, then.ty)
            } else if types.is_null_pointer(then.ty) && types.is_pointer(otherwise.ty) {
                (then, otherwise, otherwise.ty)
            } else if types.is_equal(then.ty, otherwise.ty) {
                (then, otherwise, then.ty)
            } else {
                let kind = ErrorKind::IncompatibleConditionalOperands {
                    then: self.type_name(then.ty),
                    otherwise: self.type_name(otherwise.ty),
                };
                self.error(kind, span);
                return Expr::broken_at(span);
            };

        self.expression_node(
            NodeKind::Ternary,
            result,
            Category::Rvalue,
            &[],
            &[condition.node, then.node, otherwise.node],
            span,
        )
    }

    /// Reports a condition that is not a scalar value.
    pub(crate) fn check_condition(&mut self, condition: Expr) -> bool {
        if condition.is_broken() {
            return false;
        }
        if self.sx.types.is_scalar(condition.ty) {
            return true;
        }
        let found = self.type_name(condition.ty);
        self.error(ErrorKind::ConditionMustBeScalar { found }, condition.span);
        false
    }

    // ===== Initializers =====

    /// Braced list whose target type is not known yet
    pub fn build_initializer(&mut self, items: Vec<Expr>, span: Span) -> Expr {
        if items.is_empty() {
            self.error(ErrorKind::EmptyInitializer, span);
            return Expr::broken_at(span);
        }
        if items.iter().any(Expr::is_broken) {
            return Expr::broken_at(span);
        }
        let children: Vec<_> = items.iter().map(|item| item.node).collect();
        self.expression_node(
            NodeKind::Initializer,
            TypeRef::UNDEFINED,
            Category::Rvalue,
            &[],
            &children,
            span,
        )
    }

    /// Braced list checked against a struct or array `target`
    pub fn build_initializer_list(&mut self, items: Vec<Expr>, target: TypeRef, span: Span) -> Expr {
        if items.iter().any(Expr::is_broken) {
            return Expr::broken_at(span);
        }
        if items.is_empty() {
            self.error(ErrorKind::EmptyInitializer, span);
            return Expr::broken_at(span);
        }

        let types = &self.sx.types;
        let targets: Vec<TypeRef> = if types.is_struct(target) {
            let count = types.field_count(target);
            if count != items.len() {
                let kind = ErrorKind::WrongInitializerCount {
                    expected: count,
                    found: items.len(),
                };
                self.error(kind, span);
                return Expr::broken_at(span);
            }
            (0..count).map(|i| types.field(target, i).0).collect()
        } else if types.is_array(target) {
            vec![types.element(target); items.len()]
        } else {
            let found = self.type_name(target);
            self.error(ErrorKind::BracedInitializerForScalar { found }, span);
            return Expr::broken_at(span);
        };

        let mut children = Vec::with_capacity(items.len());
        let mut failed = false;
        for (target, item) in targets.into_iter().zip(items) {
            let item = self.check_assignment_operands(target, item);
            failed |= item.is_broken();
            children.push(item.node);
        }
        if failed {
            return Expr::broken_at(span);
        }
        self.expression_node(
            NodeKind::Initializer,
            target,
            Category::Rvalue,
            &[],
            &children,
            span,
        )
    }

    fn operand_mismatch(&mut self, expected: &str, found: TypeRef, span: Span) -> Expr {
        let kind = ErrorKind::TypeMismatch {
            expected: expected.to_string(),
            found: self.type_name(found),
        };
        self.error(kind, span);
        Expr::broken_at(span)
    }

    fn operands_mismatch(&mut self, expected: &str, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.to(right.span);
        let kind = ErrorKind::TypeMismatch {
            expected: expected.to_string(),
            found: format!(
                "{} {} {}",
                self.type_name(left.ty),
                op.spelling(),
                self.type_name(right.ty)
            ),
        };
        self.error(kind, span);
        Expr::broken_at(span)
    }
}

/// Conversions of a printf format, in order
fn parse_format(format: &str) -> Result<Vec<Conversion>, ErrorKind> {
    let mut conversions = Vec::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        match chars.next() {
            Some('%') => {}
            Some(specifier) => match Conversion::from_specifier(specifier) {
                Some(conversion) => conversions.push(conversion),
                None => return Err(ErrorKind::PrintfUnknownSpecifier { specifier }),
            },
            None => return Err(ErrorKind::PrintfIncompleteSpecifier),
        }
    }
    Ok(conversions)
}
