//! Expression model: a sealed tagged-variant tree with reference-counted
//! sharing so `mutate` can test "no child changed" by pointer identity.

use crate::shared::DType;
use std::rc::Rc;

/// Densely-numbered variable identity. Two `Var`s are the same variable
/// iff their ids match; names are for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

#[derive(Debug, Clone)]
pub struct VarNode {
    pub id: VarId,
    pub name: Rc<str>,
    pub dtype: DType,
}

/// Intrinsic call operators (REDESIGN FLAGS §9: a closed enum replacing
/// the reference's string-keyed global operator registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicOp {
    LeftShift,
    RightShift,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseNot,
    Abs,
}

/// An immutable, shared expression node. Clones are cheap (`Rc` bump);
/// structural equality is defined recursively on `ExprKind`.
#[derive(Debug, Clone)]
pub struct Expr(pub Rc<ExprNode>);

#[derive(Debug)]
pub struct ExprNode {
    pub dtype: DType,
    pub kind: ExprKind,
}

#[derive(Debug)]
pub enum ExprKind {
    Var(VarId, Rc<str>),
    IntImm(i64),
    FloatImm(f64),

    Add(Expr, Expr),
    Sub(Expr, Expr),
    Mul(Expr, Expr),
    Div(Expr, Expr),    // truncating division
    Mod(Expr, Expr),    // truncating modulo
    FloorDiv(Expr, Expr),
    FloorMod(Expr, Expr),
    Min(Expr, Expr),
    Max(Expr, Expr),

    Eq(Expr, Expr),
    Ne(Expr, Expr),
    Lt(Expr, Expr),
    Le(Expr, Expr),
    Gt(Expr, Expr),
    Ge(Expr, Expr),

    And(Expr, Expr),
    Or(Expr, Expr),
    Not(Expr),

    Select(Expr, Expr, Expr), // condition, true-branch, false-branch
    Ramp(Expr, Expr, u16),    // base, stride, lanes
    Broadcast(Expr, u16),     // value, lanes
    Cast(DType, Expr),
    Call(IntrinsicOp, Vec<Expr>),
    Let(VarId, Expr, Expr), // var, value, body
}

impl Expr {
    pub fn new(dtype: DType, kind: ExprKind) -> Self {
        Expr(Rc::new(ExprNode { dtype, kind }))
    }

    pub fn dtype(&self) -> DType {
        self.0.dtype
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn var(id: VarId, name: impl Into<Rc<str>>, dtype: DType) -> Self {
        Expr::new(dtype, ExprKind::Var(id, name.into()))
    }

    pub fn int_imm(dtype: DType, value: i64) -> Self {
        Expr::new(dtype, ExprKind::IntImm(value))
    }

    pub fn float_imm(dtype: DType, value: f64) -> Self {
        Expr::new(dtype, ExprKind::FloatImm(value))
    }

    pub fn as_int_imm(&self) -> Option<i64> {
        match self.kind() {
            ExprKind::IntImm(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<VarId> {
        match self.kind() {
            ExprKind::Var(id, _) => Some(*id),
            _ => None,
        }
    }

    pub fn is_index_type(&self) -> bool {
        self.dtype().is_index_type()
    }

    /// Structural equality: identical shape and constants, `Var`s compared
    /// by identity (not name).
    pub fn structurally_eq(&self, other: &Expr) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.dtype() != other.dtype() {
            return false;
        }
        use ExprKind::*;
        match (self.kind(), other.kind()) {
            (Var(a, _), Var(b, _)) => a == b,
            (IntImm(a), IntImm(b)) => a == b,
            (FloatImm(a), FloatImm(b)) => a.to_bits() == b.to_bits(),
            (Add(a1, a2), Add(b1, b2))
            | (Sub(a1, a2), Sub(b1, b2))
            | (Mul(a1, a2), Mul(b1, b2))
            | (Div(a1, a2), Div(b1, b2))
            | (Mod(a1, a2), Mod(b1, b2))
            | (FloorDiv(a1, a2), FloorDiv(b1, b2))
            | (FloorMod(a1, a2), FloorMod(b1, b2))
            | (Min(a1, a2), Min(b1, b2))
            | (Max(a1, a2), Max(b1, b2))
            | (Eq(a1, a2), Eq(b1, b2))
            | (Ne(a1, a2), Ne(b1, b2))
            | (Lt(a1, a2), Lt(b1, b2))
            | (Le(a1, a2), Le(b1, b2))
            | (Gt(a1, a2), Gt(b1, b2))
            | (Ge(a1, a2), Ge(b1, b2))
            | (And(a1, a2), And(b1, b2))
            | (Or(a1, a2), Or(b1, b2)) => a1.structurally_eq(b1) && a2.structurally_eq(b2),
            (Not(a), Not(b)) => a.structurally_eq(b),
            (Select(c1, t1, e1), Select(c2, t2, e2)) => {
                c1.structurally_eq(c2) && t1.structurally_eq(t2) && e1.structurally_eq(e2)
            }
            (Ramp(b1, s1, l1), Ramp(b2, s2, l2)) => {
                l1 == l2 && b1.structurally_eq(b2) && s1.structurally_eq(s2)
            }
            (Broadcast(v1, l1), Broadcast(v2, l2)) => l1 == l2 && v1.structurally_eq(v2),
            (Cast(d1, e1), Cast(d2, e2)) => d1 == d2 && e1.structurally_eq(e2),
            (Call(o1, a1), Call(o2, a2)) => {
                o1 == o2
                    && a1.len() == a2.len()
                    && a1.iter().zip(a2).all(|(x, y)| x.structurally_eq(y))
            }
            (Let(v1, val1, body1), Let(v2, val2, body2)) => {
                v1 == v2 && val1.structurally_eq(val2) && body1.structurally_eq(body2)
            }
            _ => false,
        }
    }
}

/// Construction helper for a `ShapeVar`: a `Var` whose implicit const-int
/// bound is `[0, +inf)`, used for shape parameters per §6.
pub fn shape_var(id: VarId, name: impl Into<Rc<str>>, dtype: DType) -> Expr {
    Expr::var(id, name, dtype)
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other)
    }
}
impl Eq for Expr {}

impl std::hash::Hash for Expr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use std::hash::Hash as _;
        self.dtype().hash(state);
        match self.kind() {
            ExprKind::Var(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            ExprKind::IntImm(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            ExprKind::FloatImm(v) => {
                2u8.hash(state);
                v.to_bits().hash(state);
            }
            ExprKind::Add(a, b) => {
                3u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Sub(a, b) => {
                4u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Mul(a, b) => {
                5u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Div(a, b) => {
                6u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Mod(a, b) => {
                7u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::FloorDiv(a, b) => {
                8u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::FloorMod(a, b) => {
                9u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Min(a, b) => {
                10u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Max(a, b) => {
                11u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Eq(a, b) => {
                12u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Ne(a, b) => {
                13u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Lt(a, b) => {
                14u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Le(a, b) => {
                15u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Gt(a, b) => {
                16u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Ge(a, b) => {
                17u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::And(a, b) => {
                18u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Or(a, b) => {
                19u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            ExprKind::Not(a) => {
                20u8.hash(state);
                a.hash(state);
            }
            ExprKind::Select(c, t, f) => {
                21u8.hash(state);
                c.hash(state);
                t.hash(state);
                f.hash(state);
            }
            ExprKind::Ramp(b, s, l) => {
                22u8.hash(state);
                b.hash(state);
                s.hash(state);
                l.hash(state);
            }
            ExprKind::Broadcast(v, l) => {
                23u8.hash(state);
                v.hash(state);
                l.hash(state);
            }
            ExprKind::Cast(d, x) => {
                24u8.hash(state);
                d.hash(state);
                x.hash(state);
            }
            ExprKind::Call(op, args) => {
                25u8.hash(state);
                op.hash(state);
                for a in args {
                    a.hash(state);
                }
            }
            ExprKind::Let(v, val, body) => {
                26u8.hash(state);
                v.hash(state);
                val.hash(state);
                body.hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_eq_ignores_var_names_but_not_identity() {
        let a = Expr::var(VarId(0), "x", DType::I32);
        let b = Expr::var(VarId(0), "x_renamed", DType::I32);
        let c = Expr::var(VarId(1), "x", DType::I32);
        assert!(a.structurally_eq(&b));
        assert!(!a.structurally_eq(&c));
    }

    #[test]
    fn ptr_eq_short_circuits() {
        let a = Expr::int_imm(DType::I32, 5);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
    }
}
