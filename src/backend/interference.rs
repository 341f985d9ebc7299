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

//! Interference graph for register allocation.

use std::collections::BTreeSet;

use super::graph::Graph;
use super::liveness::Liveness;
use super::x86::function::X86Function;
use super::x86::registers::{GENERAL_PURPOSE_REGS, MACHINE_REGS, X86Register};

pub struct Interference {
    graph: Graph<X86Register>,
}

impl Interference {
    pub fn new(function: &X86Function, liveness: &Liveness) -> Self {
        // Machine registers outside the allocatable set never take part.
        let ignore: BTreeSet<X86Register> = MACHINE_REGS
            .iter()
            .filter(|r| !GENERAL_PURPOSE_REGS.contains(r))
            .copied()
            .collect();

        let mut graph = Graph::new();
        for (i, instr) in function.body().iter().enumerate() {
            let mov = instr.is_move_between_temps();
            for b in instr.defs() {
                if ignore.contains(&b) {
                    continue;
                }
                for &c in liveness.live_out(i) {
                    if b == c || ignore.contains(&c) {
                        continue;
                    }
                    // A move does not make its destination interfere with
                    // its source; the values are the same.
                    if let Some((_, src)) = mov {
                        if src == c {
                            continue;
                        }
                    }
                    graph.add_edge(b, c);
                    graph.add_edge(c, b);
                }
            }
        }
        Interference { graph }
    }

    pub fn graph(&self) -> &Graph<X86Register> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::flow::FlowGraph;
    use crate::backend::x86::instr::{BinaryOp, Instr, Operand};
    use crate::backend::x86::registers::{EAX, EBP, ESP};
    use crate::intermediate::names::{Label, Temp};

    fn pseudo(id: u32) -> X86Register {
        X86Register::from(Temp::fixed(id))
    }

    fn interference_of(body: Vec<Instr>) -> Interference {
        let fun = X86Function::new(Label::named("Lf"), body);
        let flow = FlowGraph::new(&fun);
        let live = Liveness::new(&fun, &flow);
        Interference::new(&fun, &live)
    }

    #[test]
    fn test_simultaneously_live_temps_interfere_symmetrically() {
        let a = pseudo(100);
        let b = pseudo(101);
        let inter = interference_of(vec![
            Instr::Binary(BinaryOp::Mov, Operand::Reg(a), Operand::Imm(1)),
            Instr::Binary(BinaryOp::Mov, Operand::Reg(b), Operand::Imm(2)),
            Instr::Binary(BinaryOp::Add, Operand::Reg(a), Operand::Reg(b)),
            Instr::Binary(BinaryOp::Mov, Operand::Reg(EAX), Operand::Reg(a)),
            Instr::Ret,
        ]);
        assert!(inter.graph().has_edge(&b, &a));
        assert!(inter.graph().has_edge(&a, &b));
    }

    #[test]
    fn test_move_source_does_not_interfere() {
        let a = pseudo(100);
        let b = pseudo(101);
        let inter = interference_of(vec![
            Instr::Binary(BinaryOp::Mov, Operand::Reg(a), Operand::Imm(1)),
            Instr::Binary(BinaryOp::Mov, Operand::Reg(b), Operand::Reg(a)),
            Instr::Binary(BinaryOp::Add, Operand::Reg(b), Operand::Reg(a)),
            Instr::Binary(BinaryOp::Mov, Operand::Reg(EAX), Operand::Reg(b)),
            Instr::Ret,
        ]);
        // b := a keeps a live, but b and a hold the same value there.
        assert!(!inter.graph().has_edge(&b, &a));
    }

    #[test]
    fn test_stack_registers_are_excluded() {
        let a = pseudo(100);
        let inter = interference_of(vec![
            Instr::Binary(BinaryOp::Mov, Operand::Reg(a), Operand::Reg(ESP)),
            Instr::Binary(BinaryOp::Mov, Operand::Reg(EBP), Operand::Reg(a)),
            Instr::Binary(BinaryOp::Mov, Operand::Reg(EAX), Operand::Reg(a)),
            Instr::Ret,
        ]);
        for (n, succ) in inter.graph().nodes() {
            assert_ne!(*n, ESP);
            assert_ne!(*n, EBP);
            assert!(!succ.contains(&ESP));
            assert!(!succ.contains(&EBP));
        }
    }

    #[test]
    fn test_interference_is_symmetric_everywhere() {
        let a = pseudo(100);
        let b = pseudo(101);
        let c = pseudo(102);
        let inter = interference_of(vec![
            Instr::Binary(BinaryOp::Mov, Operand::Reg(a), Operand::Imm(1)),
            Instr::Binary(BinaryOp::Mov, Operand::Reg(b), Operand::Imm(2)),
            Instr::Binary(BinaryOp::Mov, Operand::Reg(c), Operand::Imm(3)),
            Instr::Binary(BinaryOp::Add, Operand::Reg(a), Operand::Reg(b)),
            Instr::Binary(BinaryOp::Add, Operand::Reg(a), Operand::Reg(c)),
            Instr::Binary(BinaryOp::Mov, Operand::Reg(EAX), Operand::Reg(a)),
            Instr::Ret,
        ]);
        let g = inter.graph();
        for (n, succ) in g.nodes() {
            for s in succ {
                assert!(g.has_edge(s, n), "edge {}-{} is not symmetric", n, s);
            }
        }
    }
}
