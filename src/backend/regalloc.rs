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

//! Register allocation by graph colouring, Chaitin-style without
//! coalescing. Spills are rewritten into stack slots and the whole
//! allocation is retried until no actual spill remains.

use std::collections::BTreeMap;

use super::flow::FlowGraph;
use super::interference::Interference;
use super::liveness::Liveness;
use super::x86::function::{X86Function, X86Prg};
use super::x86::registers::{GENERAL_PURPOSE_REGS, MACHINE_REGS, X86Register};

/// Allocates registers in every function of a program.
pub fn allocate(prg: &mut X86Prg) {
    for f in &mut prg.functions {
        allocate_function(f);
    }
}

fn allocate_function(fun: &mut X86Function) {
    loop {
        let interference = build(fun);
        let stack = simplify_and_spill(&interference);
        let (colouring, spills) = select(&interference, stack);
        if spills.is_empty() {
            // Temps absent from the graph interfere with nothing; any
            // general-purpose register will do for them.
            fun.rename(&|t| {
                colouring
                    .get(&t)
                    .copied()
                    .unwrap_or(GENERAL_PURPOSE_REGS[0])
            });
            return;
        }
        // Every spill round strictly shortens the rewritten live ranges,
        // so the retry terminates.
        fun.spill(&spills);
    }
}

fn build(fun: &X86Function) -> Interference {
    let flow = FlowGraph::new(fun);
    let liveness = Liveness::new(fun, &flow);
    Interference::new(fun, &liveness)
}

/// Simplify and (potential) spill selection. Low-degree nodes are removed
/// first; when none is left, the highest-degree node is chosen as a spill
/// candidate. The returned stack has the last-removed node on top.
fn simplify_and_spill(interference: &Interference) -> Vec<X86Register> {
    let graph = interference.graph();
    let k = GENERAL_PURPOSE_REGS.len();

    let mut low_degrees: Vec<X86Register> = Vec::new();
    let mut high_degrees: BTreeMap<X86Register, usize> = BTreeMap::new();
    for (t, succ) in graph.nodes() {
        if t.is_machine_reg() {
            continue;
        }
        if succ.len() < k {
            low_degrees.push(*t);
        } else {
            high_degrees.insert(*t, succ.len());
        }
    }

    let mut stack = Vec::new();
    while !low_degrees.is_empty() || !high_degrees.is_empty() {
        let next = match low_degrees.pop() {
            Some(t) => t,
            None => {
                let mut best = None;
                let mut max_degree = 0;
                for (t, deg) in &high_degrees {
                    if *deg > max_degree {
                        best = Some(*t);
                        max_degree = *deg;
                    }
                }
                let t = best.expect("high-degree set is non-empty");
                high_degrees.remove(&t);
                t
            }
        };
        stack.push(next);
        for t in graph.successors(&next) {
            if let Some(deg) = high_degrees.get_mut(t) {
                *deg -= 1;
                if *deg == k - 1 {
                    let t = *t;
                    high_degrees.remove(&t);
                    low_degrees.push(t);
                }
            }
        }
    }
    stack
}

/// Pops the selection stack and assigns each node a colour not used by any
/// already-coloured neighbour. Nodes with no remaining colour are actual
/// spills.
fn select(
    interference: &Interference,
    mut stack: Vec<X86Register>,
) -> (BTreeMap<X86Register, X86Register>, Vec<X86Register>) {
    let graph = interference.graph();
    let mut colouring: BTreeMap<X86Register, X86Register> = BTreeMap::new();
    for r in MACHINE_REGS {
        colouring.insert(r, r);
    }

    let mut spills = Vec::new();
    while let Some(s) = stack.pop() {
        let mut possible: Vec<X86Register> = GENERAL_PURPOSE_REGS.to_vec();
        for t in graph.successors(&s) {
            if let Some(c) = colouring.get(t) {
                possible.retain(|r| r != c);
            }
        }
        match possible.first() {
            Some(&c) => {
                colouring.insert(s, c);
            }
            None => spills.push(s),
        }
    }
    (colouring, spills)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::x86::instr::{BinaryOp, Instr, Operand};
    use crate::backend::x86::registers::EAX;
    use crate::intermediate::names::{Label, Temp};

    fn assert_all_machine_regs(fun: &X86Function) {
        for i in fun.body() {
            for r in i.uses().into_iter().chain(i.defs()) {
                assert!(r.is_machine_reg(), "{} is not a machine register", r);
            }
            if let Some((d, s)) = i.is_move_between_temps() {
                assert_ne!(d, s, "trivial move survived allocation");
            }
        }
    }

    fn mov(dst: X86Register, src: Operand) -> Instr {
        Instr::Binary(BinaryOp::Mov, Operand::Reg(dst), src)
    }

    fn add(dst: X86Register, src: X86Register) -> Instr {
        Instr::Binary(BinaryOp::Add, Operand::Reg(dst), Operand::Reg(src))
    }

    #[test]
    fn test_few_temps_allocate_without_spilling() {
        let ts: Vec<X86Register> = (0..3).map(|i| X86Register::from(Temp::fixed(100 + i))).collect();
        let mut body: Vec<Instr> = ts
            .iter()
            .map(|t| mov(*t, Operand::Imm(1)))
            .collect();
        body.push(add(ts[0], ts[1]));
        body.push(add(ts[0], ts[2]));
        body.push(mov(EAX, Operand::Reg(ts[0])));
        body.push(Instr::Ret);
        let mut fun = X86Function::new(Label::named("Lf"), body);
        allocate_function(&mut fun);
        assert_all_machine_regs(&fun);
        assert_eq!(fun.frame_size(), 0, "no spill expected");
    }

    #[test]
    fn test_allocation_respects_interference() {
        let ts: Vec<X86Register> = (0..4).map(|i| X86Register::from(Temp::fixed(100 + i))).collect();
        let mut body: Vec<Instr> = ts.iter().map(|t| mov(*t, Operand::Imm(1))).collect();
        for t in &ts[1..] {
            body.push(add(ts[0], *t));
        }
        body.push(mov(EAX, Operand::Reg(ts[0])));
        body.push(Instr::Ret);

        let fun = X86Function::new(Label::named("Lf"), body);
        let interference = build(&fun);
        let stack = simplify_and_spill(&interference);
        let (colouring, spills) = select(&interference, stack);
        assert!(spills.is_empty());
        for (n, succ) in interference.graph().nodes() {
            for m in succ {
                assert_ne!(
                    colouring.get(n),
                    colouring.get(m),
                    "{} and {} interfere but share a colour",
                    n,
                    m
                );
            }
        }
    }

    #[test]
    fn test_overpressure_forces_spill() {
        // Seven mutually live temps cannot fit into six registers.
        let ts: Vec<X86Register> = (0..7).map(|i| X86Register::from(Temp::fixed(100 + i))).collect();
        let mut body: Vec<Instr> = ts.iter().map(|t| mov(*t, Operand::Imm(1))).collect();
        for t in &ts[1..] {
            body.push(add(ts[0], *t));
        }
        body.push(mov(EAX, Operand::Reg(ts[0])));
        body.push(Instr::Ret);
        let mut fun = X86Function::new(Label::named("Lf"), body);
        allocate_function(&mut fun);
        assert_all_machine_regs(&fun);
        assert!(fun.frame_size() >= 4, "a spill slot must exist");
    }

    #[test]
    fn test_no_pseudo_registers_allocates_immediately() {
        let body = vec![mov(EAX, Operand::Imm(1)), Instr::Ret];
        let mut fun = X86Function::new(Label::named("Lf"), body);
        allocate_function(&mut fun);
        assert_all_machine_regs(&fun);
        assert_eq!(fun.frame_size(), 0);
    }
}
