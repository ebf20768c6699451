//! Implicit conversions and constant folding
//!
//! The only implicit conversion is integer to float. It is applied by the
//! usual arithmetic conversions and by assignment compatibility, and folds
//! into a float literal when the operand is an integer literal.

use super::Builder;
use crate::ast::{BinaryOp, Category, Expr, NodeKind, Span, UnaryOp};
use crate::errors::ErrorKind;
use crate::tables::{Item, TypeRef};
use tracing::trace;

impl Builder<'_> {
    /// Converts `expr` to `target`, which must be `float`.
    pub fn build_cast(&mut self, target: TypeRef, expr: Expr) -> Expr {
        if expr.is_broken() || expr.ty == target {
            return expr;
        }

        if self.sx.tree.kind(expr.node) == NodeKind::IntegerLiteral {
            let value = self.sx.tree.literal_integer(expr.node);
            trace!(value, "widened integer literal");
            return self.build_floating_literal(value as f64, expr.span);
        }

        trace!(line = expr.span.start.line, "implicit cast to float");
        self.expression_node(
            NodeKind::Cast,
            target,
            Category::Rvalue,
            &[],
            &[expr.node],
            expr.span,
        )
    }

    /// Brings two arithmetic operands to a common type.
    ///
    /// Returns the converted operands and the common type: `float` when
    /// either side is floating, `int` otherwise.
    pub(crate) fn usual_arithmetic_conversions(
        &mut self,
        left: Expr,
        right: Expr,
    ) -> (Expr, Expr, TypeRef) {
        let types = &self.sx.types;
        if types.is_floating(left.ty) || types.is_floating(right.ty) {
            let left = self.build_cast(TypeRef::FLOATING, left);
            let right = self.build_cast(TypeRef::FLOATING, right);
            (left, right, TypeRef::FLOATING)
        } else {
            (left, right, TypeRef::INTEGER)
        }
    }

    /// Checks that `expr` may initialize or be assigned to a `target` value
    /// and applies the conversion that makes it fit.
    pub fn check_assignment_operands(&mut self, target: TypeRef, expr: Expr) -> Expr {
        if expr.is_broken() {
            return expr;
        }
        let types = &self.sx.types;
        // an undefined target was reported where it was declared
        if types.is_undefined(target) {
            return Expr::broken_at(expr.span);
        }

        if self.sx.tree.kind(expr.node) == NodeKind::Initializer
            && types.is_undefined(expr.ty)
        {
            let items = self
                .sx
                .tree
                .children(expr.node)
                .to_vec()
                .into_iter()
                .map(|item| self.expression_of(item))
                .collect();
            return self.build_initializer_list(items, target, expr.span);
        }

        let compatible = if types.is_floating(target) && types.is_integer(expr.ty) {
            return self.build_cast(TypeRef::FLOATING, expr);
        } else if types.is_integer(target) {
            types.is_integer(expr.ty)
        } else if types.is_floating(target) {
            types.is_floating(expr.ty)
        } else if types.is_pointer(target) {
            types.is_null_pointer(expr.ty)
                || types.is_equal(target, expr.ty)
                || (types.is_pointer(expr.ty)
                    && (types.is_equal(target, types.void_pointer())
                        || types.is_equal(expr.ty, types.void_pointer())))
        } else {
            types.is_equal(target, expr.ty)
        };

        if compatible {
            expr
        } else {
            let kind = ErrorKind::TypeMismatch {
                expected: self.type_name(target),
                found: self.type_name(expr.ty),
            };
            self.error(kind, expr.span);
            Expr::broken_at(expr.span)
        }
    }

    /// Folds a unary operator applied to a literal, if it can be folded.
    pub(crate) fn fold_unary(
        &mut self,
        op: UnaryOp,
        operand: Expr,
        result: TypeRef,
        span: Span,
    ) -> Option<Expr> {
        let tree = &self.sx.tree;
        match tree.kind(operand.node) {
            NodeKind::IntegerLiteral => {
                let value = tree.literal_integer(operand.node);
                let folded = match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Minus => value.checked_neg()?,
                    UnaryOp::BitNot => !value,
                    UnaryOp::LogNot => Item::from(value == 0),
                    UnaryOp::Abs => value.checked_abs()?,
                    _ => return None,
                };
                Some(self.build_typed_integer_literal(folded, result, span))
            }
            NodeKind::FloatingLiteral => {
                let value = tree.literal_floating(operand.node);
                match op {
                    UnaryOp::Plus => Some(self.build_floating_literal(value, span)),
                    UnaryOp::Minus => Some(self.build_floating_literal(-value, span)),
                    UnaryOp::Abs => Some(self.build_floating_literal(value.abs(), span)),
                    UnaryOp::LogNot => {
                        Some(self.build_typed_integer_literal(Item::from(value == 0.0), result, span))
                    }
                    _ => None,
                }
            }
            NodeKind::NullLiteral if op == UnaryOp::LogNot => {
                Some(self.build_typed_integer_literal(1, result, span))
            }
            _ => None,
        }
    }

    /// Folds a binary operator whose operands are both literals, if it can be
    /// folded. Overflow, division by zero and out-of-range shifts are left to
    /// run time.
    pub(crate) fn fold_binary(
        &mut self,
        op: BinaryOp,
        left: Expr,
        right: Expr,
        result: TypeRef,
        span: Span,
    ) -> Option<Expr> {
        let tree = &self.sx.tree;
        match (tree.kind(left.node), tree.kind(right.node)) {
            (NodeKind::IntegerLiteral, NodeKind::IntegerLiteral) => {
                let l = tree.literal_integer(left.node);
                let r = tree.literal_integer(right.node);
                let shift = || u32::try_from(r).ok().filter(|&s| s < Item::BITS);
                let value = match op {
                    BinaryOp::Mul => l.checked_mul(r)?,
                    BinaryOp::Div => l.checked_div(r)?,
                    BinaryOp::Rem => l.checked_rem(r)?,
                    BinaryOp::Add => l.checked_add(r)?,
                    BinaryOp::Sub => l.checked_sub(r)?,
                    BinaryOp::Shl => l.checked_shl(shift()?)?,
                    BinaryOp::Shr => l.checked_shr(shift()?)?,
                    BinaryOp::Lt => Item::from(l < r),
                    BinaryOp::Gt => Item::from(l > r),
                    BinaryOp::Le => Item::from(l <= r),
                    BinaryOp::Ge => Item::from(l >= r),
                    BinaryOp::Eq => Item::from(l == r),
                    BinaryOp::Ne => Item::from(l != r),
                    BinaryOp::BitAnd => l & r,
                    BinaryOp::BitXor => l ^ r,
                    BinaryOp::BitOr => l | r,
                    BinaryOp::LogAnd => Item::from(l != 0 && r != 0),
                    BinaryOp::LogOr => Item::from(l != 0 || r != 0),
                    _ => return None,
                };
                Some(self.build_typed_integer_literal(value, result, span))
            }
            (NodeKind::FloatingLiteral, NodeKind::FloatingLiteral) => {
                let l = tree.literal_floating(left.node);
                let r = tree.literal_floating(right.node);
                let value = match op {
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div if r != 0.0 => l / r,
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    _ => {
                        let truth = match op {
                            BinaryOp::Lt => l < r,
                            BinaryOp::Gt => l > r,
                            BinaryOp::Le => l <= r,
                            BinaryOp::Ge => l >= r,
                            BinaryOp::Eq => l == r,
                            BinaryOp::Ne => l != r,
                            BinaryOp::LogAnd => l != 0.0 && r != 0.0,
                            BinaryOp::LogOr => l != 0.0 || r != 0.0,
                            _ => return None,
                        };
                        return Some(self.build_typed_integer_literal(Item::from(truth), result, span));
                    }
                };
                Some(self.build_floating_literal(value, span))
            }
            _ => None,
        }
    }
}
