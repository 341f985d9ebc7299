/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Canonization of tree programs.
//!
//! Canonization brings the body of each function into a normal form with the
//! following properties:
//! - There is no ESEQ anymore.
//! - Evaluation order is forced by the statement sequence, so sub-expressions
//!   can be evaluated in any order.
//! - CALL appears only as the right-hand side of MOVE(temp | mem, CALL(..)),
//!   and a CALL's arguments contain no nested CALL.

use super::names::Temp;
use super::tree::{TreeExp, TreeFunction, TreeProgram, TreeStm};

/// Canonizes every function of a program.
pub fn canonize(prg: TreeProgram) -> TreeProgram {
    TreeProgram {
        functions: prg.functions.into_iter().map(canonize_function).collect(),
    }
}

fn canonize_function(fun: TreeFunction) -> TreeFunction {
    TreeFunction {
        name: fun.name,
        parameter_count: fun.parameter_count,
        body: canonize_stms(fun.body),
        return_temp: fun.return_temp,
    }
}

/// An effect-expression: a statement prefix followed by a pure-by-position
/// expression. The statements witness all side effects of the expression.
struct EffectExp {
    stms: Vec<TreeStm>,
    exp: TreeExp,
}

impl EffectExp {
    fn pure(exp: TreeExp) -> Self {
        EffectExp { stms: Vec::new(), exp }
    }

    /// Whether a statement is known to leave the value of `exp` unchanged.
    /// The heuristic admits only expressions no statement can disturb.
    fn commutes(_stm: &TreeStm, exp: &TreeExp) -> bool {
        matches!(exp, TreeExp::Name(_) | TreeExp::Const(_))
    }

    fn commute(stms: &[TreeStm], exp: &TreeExp) -> bool {
        stms.iter().all(|s| Self::commutes(s, exp))
    }

    /// Arranges for `stms` to run after this effect-expression. If they might
    /// disturb the current expression, its value is spilled into a fresh temp
    /// first.
    fn extend(&mut self, stms: Vec<TreeStm>) {
        if !Self::commute(&stms, &self.exp) {
            let u = Temp::fresh();
            let old = std::mem::replace(&mut self.exp, TreeExp::Temp(u));
            self.stms.push(TreeStm::Move(TreeExp::Temp(u), old));
        }
        self.stms.extend(stms);
    }

    fn combine_with(
        mut self,
        other: EffectExp,
        f: impl FnOnce(TreeExp, TreeExp) -> TreeExp,
    ) -> EffectExp {
        self.extend(other.stms);
        EffectExp {
            stms: self.stms,
            exp: f(self.exp, other.exp),
        }
    }

    /// Combines this effect-expression with a left-to-right sequence of
    /// further ones. Every already-captured value is protected against the
    /// statements of the effect-expressions that follow it.
    fn combine_many(
        self,
        others: Vec<EffectExp>,
        f: impl FnOnce(TreeExp, Vec<TreeExp>) -> TreeExp,
    ) -> EffectExp {
        let mut stms = self.stms;
        let mut exps = vec![self.exp];
        for other in others {
            for e in exps.iter_mut() {
                if !Self::commute(&other.stms, e) {
                    let u = Temp::fresh();
                    let old = std::mem::replace(e, TreeExp::Temp(u));
                    stms.push(TreeStm::Move(TreeExp::Temp(u), old));
                }
            }
            stms.extend(other.stms);
            exps.push(other.exp);
        }
        let head = exps.remove(0);
        EffectExp { stms, exp: f(head, exps) }
    }

    fn combine_to_stm(
        mut self,
        other: EffectExp,
        f: impl FnOnce(TreeExp, TreeExp) -> TreeStm,
    ) -> Vec<TreeStm> {
        self.extend(other.stms);
        self.stms.push(f(self.exp, other.exp));
        self.stms
    }
}

fn canonize_stms(stms: Vec<TreeStm>) -> Vec<TreeStm> {
    let mut res = Vec::new();
    for stm in stms {
        res.extend(canonize_stm(stm));
    }
    res
}

fn canonize_stm(stm: TreeStm) -> Vec<TreeStm> {
    match stm {
        TreeStm::Move(dst, src) => match dst {
            TreeExp::Temp(_) | TreeExp::Param(_) => {
                let mut b = canonize_exp(src);
                b.stms.push(TreeStm::Move(dst, b.exp));
                b.stms
            }
            TreeExp::Mem(addr) => {
                let b1 = canonize_exp_no_top_call(*addr);
                let b2 = canonize_exp(src);
                b1.combine_to_stm(b2, |e1, e2| {
                    TreeStm::Move(TreeExp::Mem(Box::new(e1)), e2)
                })
            }
            TreeExp::ESeq(mut stms, e) => {
                stms.push(TreeStm::Move(*e, src));
                canonize_stms(stms)
            }
            dst => unreachable!("move destination cannot be {}", dst),
        },
        TreeStm::Jump(target, targets) => {
            let mut b = canonize_exp_no_top_call(target);
            b.stms.push(TreeStm::Jump(b.exp, targets));
            b.stms
        }
        TreeStm::CJump(rel, left, right, l_true, l_false) => {
            let b1 = canonize_exp_no_top_call(left);
            let b2 = canonize_exp_no_top_call(right);
            b1.combine_to_stm(b2, |e1, e2| {
                TreeStm::CJump(rel, e1, e2, l_true, l_false)
            })
        }
        TreeStm::Label(l) => vec![TreeStm::Label(l)],
        TreeStm::Seq(stms) => canonize_stms(stms),
    }
}

/// Canonizes an expression and additionally assigns a top-level CALL to a
/// fresh temp, so the result can be embedded anywhere.
fn canonize_exp_no_top_call(exp: TreeExp) -> EffectExp {
    let mut b = canonize_exp(exp);
    if matches!(b.exp, TreeExp::Call(_, _)) {
        let u = Temp::fresh();
        let call = std::mem::replace(&mut b.exp, TreeExp::Temp(u));
        b.stms.push(TreeStm::Move(TreeExp::Temp(u), call));
    }
    b
}

fn canonize_exp(exp: TreeExp) -> EffectExp {
    match exp {
        TreeExp::Const(_) | TreeExp::Name(_) | TreeExp::Temp(_) | TreeExp::Param(_) => {
            EffectExp::pure(exp)
        }
        TreeExp::Mem(addr) => {
            let mut b = canonize_exp_no_top_call(*addr);
            b.exp = TreeExp::Mem(Box::new(b.exp));
            b
        }
        TreeExp::BinOp(op, left, right) => {
            let b1 = canonize_exp_no_top_call(*left);
            let b2 = canonize_exp_no_top_call(*right);
            b1.combine_with(b2, |e1, e2| {
                TreeExp::BinOp(op, Box::new(e1), Box::new(e2))
            })
        }
        TreeExp::Call(fun, args) => {
            let b = canonize_exp_no_top_call(*fun);
            let bs = args.into_iter().map(canonize_exp_no_top_call).collect();
            b.combine_many(bs, |e, es| TreeExp::Call(Box::new(e), es))
        }
        TreeExp::ESeq(stms, e) => {
            let mut ss = canonize_stms(stms);
            let b = canonize_exp(*e);
            ss.extend(b.stms);
            EffectExp { stms: ss, exp: b.exp }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intermediate::names::Label;

    fn exp_is_canonical(exp: &TreeExp) -> bool {
        match exp {
            TreeExp::Const(_) | TreeExp::Name(_) | TreeExp::Temp(_) | TreeExp::Param(_) => true,
            TreeExp::Mem(addr) => exp_is_canonical(addr),
            TreeExp::BinOp(_, l, r) => exp_is_canonical(l) && exp_is_canonical(r),
            // A call reached through this path is not the RHS of a move.
            TreeExp::Call(_, _) => false,
            TreeExp::ESeq(_, _) => false,
        }
    }

    fn stm_is_canonical(stm: &TreeStm) -> bool {
        match stm {
            TreeStm::Move(dst, src) => {
                let dst_ok = match dst {
                    TreeExp::Temp(_) | TreeExp::Param(_) => true,
                    TreeExp::Mem(addr) => exp_is_canonical(addr),
                    _ => false,
                };
                // The move RHS is the only place a call may sit, and its
                // arguments must themselves be call-free.
                let src_ok = match src {
                    TreeExp::Call(f, args) => {
                        exp_is_canonical(f) && args.iter().all(exp_is_canonical)
                    }
                    e => exp_is_canonical(e),
                };
                dst_ok && src_ok
            }
            TreeStm::Jump(target, _) => exp_is_canonical(target),
            TreeStm::CJump(_, l, r, _, _) => exp_is_canonical(l) && exp_is_canonical(r),
            TreeStm::Label(_) => true,
            TreeStm::Seq(_) => false,
        }
    }

    fn assert_canonical(stms: &[TreeStm]) {
        for s in stms {
            assert!(stm_is_canonical(s), "not canonical: {}", s);
        }
    }

    fn call(name: &str, args: Vec<TreeExp>) -> TreeExp {
        TreeExp::Call(Box::new(TreeExp::Name(Label::named(name))), args)
    }

    #[test]
    fn test_eseq_is_flattened() {
        let t = Temp::fresh();
        let exp = TreeExp::ESeq(
            vec![TreeStm::Move(TreeExp::Temp(t), TreeExp::Const(1))],
            Box::new(TreeExp::Temp(t)),
        );
        let out = canonize_stm(TreeStm::Move(TreeExp::Temp(Temp::fresh()), exp));
        assert_canonical(&out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_nested_eseq_in_binop_is_flattened() {
        let t = Temp::fresh();
        let inner = TreeExp::ESeq(
            vec![TreeStm::Move(TreeExp::Temp(t), TreeExp::Const(7))],
            Box::new(TreeExp::Temp(t)),
        );
        let exp = TreeExp::BinOp(
            crate::intermediate::tree::BinOp::Plus,
            Box::new(TreeExp::Const(1)),
            Box::new(inner),
        );
        let out = canonize_stm(TreeStm::Move(TreeExp::Temp(Temp::fresh()), exp));
        assert_canonical(&out);
    }

    #[test]
    fn test_call_in_argument_is_lifted() {
        let nested = call("L_read", vec![]);
        let outer = call("L_println_int", vec![nested]);
        let out = canonize_stm(TreeStm::Move(TreeExp::Temp(Temp::fresh()), outer));
        assert_canonical(&out);
        // The inner call must have become its own move statement.
        assert_eq!(out.len(), 2);
        assert!(matches!(
            &out[0],
            TreeStm::Move(TreeExp::Temp(_), TreeExp::Call(_, _))
        ));
    }

    #[test]
    fn test_call_under_binop_is_lifted() {
        let exp = TreeExp::BinOp(
            crate::intermediate::tree::BinOp::Plus,
            Box::new(call("L_read", vec![])),
            Box::new(TreeExp::Const(1)),
        );
        let out = canonize_stm(TreeStm::Move(TreeExp::Temp(Temp::fresh()), exp));
        assert_canonical(&out);
    }

    #[test]
    fn test_argument_effects_stay_left_to_right() {
        let ta = Temp::fresh();
        let a = TreeExp::ESeq(
            vec![TreeStm::Move(TreeExp::Temp(ta), call("L_read", vec![]))],
            Box::new(TreeExp::Temp(ta)),
        );
        let b = call("L_read", vec![]);
        let out = canonize_stm(TreeStm::Move(
            TreeExp::Temp(Temp::fresh()),
            call("LA$f", vec![a, b]),
        ));
        assert_canonical(&out);
        // The first argument's read happens before the second's.
        let call_moves: Vec<usize> = out
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, TreeStm::Move(_, TreeExp::Call(_, _))))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(call_moves.len(), 3);
        assert!(call_moves[0] < call_moves[1]);
    }

    #[test]
    fn test_canonizing_canonical_program_is_identity() {
        let t = Temp::fresh();
        let l = Label::named("L0");
        let stms = vec![
            TreeStm::Label(Label::named("Lstart")),
            TreeStm::Move(TreeExp::Temp(t), TreeExp::Const(3)),
            TreeStm::Move(
                TreeExp::Mem(Box::new(TreeExp::Temp(t))),
                TreeExp::Const(4),
            ),
            TreeStm::CJump(
                crate::intermediate::tree::RelOp::Lt,
                TreeExp::Temp(t),
                TreeExp::Const(10),
                l.clone(),
                Label::named("L1"),
            ),
            TreeStm::Label(l),
        ];
        let out = canonize_stms(stms.clone());
        assert_eq!(out, stms);
    }
}
