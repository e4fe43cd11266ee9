//! `ModularSetAnalyzer`: abstract interpretation of `Expr` over the
//! `{coeff*k + base}` lattice.

use super::domain::ModularSetEntry;
use crate::domain::expr::{Expr, ExprKind, IntrinsicOp, VarId};
use crate::errors::{AnalyzerError, Result};
use crate::shared::DivMode;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy)]
pub struct ScopeMark(usize);

pub struct ModularSetAnalyzer {
    var_map: FxHashMap<VarId, ModularSetEntry>,
    hints: Vec<(Expr, ModularSetEntry)>,
}

impl ModularSetAnalyzer {
    pub fn new() -> Self {
        Self {
            var_map: FxHashMap::default(),
            hints: Vec::new(),
        }
    }

    pub fn update(&mut self, var: VarId, entry: ModularSetEntry, allow_override: bool) -> Result<()> {
        if let Some(existing) = self.var_map.get(&var) {
            if !allow_override && *existing != entry {
                return Err(AnalyzerError::internal(format!(
                    "conflicting ModularSet update for var {:?}",
                    var
                )));
            }
        }
        self.var_map.insert(var, entry);
        Ok(())
    }

    fn lookup_hint(&self, e: &Expr) -> Option<ModularSetEntry> {
        self.hints
            .iter()
            .find(|(expr, _)| expr.structurally_eq(e))
            .map(|(_, entry)| *entry)
    }

    /// Patterns `x % c == b` and `x == c` register intersected entries.
    pub fn enter_constraint(&mut self, cond: &Expr) -> ScopeMark {
        let mark = ScopeMark(self.hints.len());
        for conj in crate::domain::extract_and(cond, true) {
            if let ExprKind::Eq(a, b) = conj.kind() {
                if let ExprKind::Mod(x, c) = a.kind() {
                    if let (Some(c), Some(base)) = (c.as_int_imm(), b.as_int_imm()) {
                        self.hints.push((x.clone(), ModularSetEntry::new(c, base)));
                        continue;
                    }
                }
                if let Some(c) = b.as_int_imm() {
                    self.hints.push((a.clone(), ModularSetEntry::singleton(c)));
                } else if let Some(c) = a.as_int_imm() {
                    self.hints.push((b.clone(), ModularSetEntry::singleton(c)));
                }
            }
        }
        mark
    }

    pub fn leave_constraint(&mut self, mark: ScopeMark) {
        self.hints.truncate(mark.0);
    }

    pub fn query(&mut self, e: &Expr) -> ModularSetEntry {
        if let Some(hint) = self.lookup_hint(e) {
            return hint.intersect(&self.query_uncached(e));
        }
        self.query_uncached(e)
    }

    fn query_uncached(&mut self, e: &Expr) -> ModularSetEntry {
        use ExprKind::*;
        match e.kind() {
            Var(id, _) => self.var_map.get(id).copied().unwrap_or_else(ModularSetEntry::everything),
            IntImm(v) => ModularSetEntry::singleton(*v),
            Add(a, b) => self.query(a).add(&self.query(b)),
            Sub(a, b) => self.query(a).sub(&self.query(b)),
            Mul(a, b) => self.query(a).mul(&self.query(b)),
            Div(a, b) | Mod(a, b) | FloorDiv(a, b) | FloorMod(a, b) => {
                let mode = if matches!(e.kind(), FloorDiv(..) | FloorMod(..)) {
                    DivMode::FloorDiv
                } else {
                    DivMode::TruncDiv
                };
                let lhs = self.query(a);
                let round_down = mode == DivMode::FloorDiv;
                match b.as_int_imm() {
                    Some(v) if matches!(e.kind(), Div(..) | FloorDiv(..)) => {
                        lhs.div_by_const(v, round_down, false)
                    }
                    Some(v) => lhs.mod_by_const(v, round_down, false),
                    None => ModularSetEntry::everything(),
                }
            }
            Min(a, b) | Max(a, b) => self.query(a).union(&self.query(b)),
            Select(_, t, f) => self.query(t).union(&self.query(f)),
            Cast(_, x) => self.query(x),
            Call(op, args) => self.query_call(*op, args),
            Broadcast(v, _) => self.query(v),
            Let(v, value, body) => {
                let val_entry = self.query(value);
                let prior = self.var_map.insert(*v, val_entry);
                let r = self.query(body);
                match prior {
                    Some(p) => {
                        self.var_map.insert(*v, p);
                    }
                    None => {
                        self.var_map.remove(v);
                    }
                }
                r
            }
            _ => ModularSetEntry::everything(),
        }
    }

    fn query_call(&mut self, op: IntrinsicOp, args: &[Expr]) -> ModularSetEntry {
        match op {
            IntrinsicOp::RightShift => {
                if let Some(k) = args[1].as_int_imm() {
                    if (0..63).contains(&k) {
                        return self.query(&args[0]).right_shift(k as u32, false);
                    }
                }
                ModularSetEntry::everything()
            }
            IntrinsicOp::BitwiseAnd => {
                if let Some(mask) = args[1].as_int_imm() {
                    if mask > 0 && (mask + 1).is_power_of_two() {
                        let k = (mask + 1).trailing_zeros();
                        return self.query(&args[0]).bitwise_and_pow2_mask(k, false);
                    }
                }
                ModularSetEntry::everything()
            }
            _ => ModularSetEntry::everything(),
        }
    }
}

impl Default for ModularSetAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::DType;

    #[test]
    fn select_branches_union_to_coeff_4() {
        let mut a = ModularSetAnalyzer::new();
        let x = Expr::var(VarId(0), "x", DType::I32);
        let t = Expr::new(
            DType::I32,
            ExprKind::Add(
                Expr::new(DType::I32, ExprKind::Mul(x.clone(), Expr::int_imm(DType::I32, 4))),
                Expr::int_imm(DType::I32, 2),
            ),
        );
        let f = Expr::new(
            DType::I32,
            ExprKind::Add(
                Expr::new(DType::I32, ExprKind::Mul(x, Expr::int_imm(DType::I32, 4))),
                Expr::int_imm(DType::I32, 6),
            ),
        );
        let sel = Expr::new(
            DType::I32,
            ExprKind::Select(Expr::int_imm(DType::BOOL, 1), t, f),
        );
        let r = a.query(&sel);
        assert_eq!(r, ModularSetEntry::new(4, 2));
    }
}
