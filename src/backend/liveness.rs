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

//! Liveness information for register allocation.
//!
//! Standard backward dataflow to a fixed point:
//! - `live_in[i]  = (live_out[i] \ defs[i]) ∪ uses[i]`
//! - `live_out[i] = ∪ { live_in[s] : s ∈ successors(i) }`

use std::collections::BTreeSet;

use super::flow::FlowGraph;
use super::x86::function::X86Function;
use super::x86::registers::X86Register;

pub struct Liveness {
    live_in: Vec<BTreeSet<X86Register>>,
    live_out: Vec<BTreeSet<X86Register>>,
}

impl Liveness {
    pub fn new(function: &X86Function, flow: &FlowGraph) -> Self {
        let body = function.body();
        let n = body.len();
        let mut live_in: Vec<BTreeSet<X86Register>> = vec![BTreeSet::new(); n];
        let mut live_out: Vec<BTreeSet<X86Register>> = vec![BTreeSet::new(); n];

        let mut change = true;
        while change {
            change = false;
            for a in (0..n).rev() {
                let out: BTreeSet<X86Register> = flow
                    .graph()
                    .successors(&a)
                    .flat_map(|&m| live_in[m].iter().copied())
                    .collect();
                let mut inn = out.clone();
                for d in body[a].defs() {
                    inn.remove(&d);
                }
                for u in body[a].uses() {
                    inn.insert(u);
                }
                if out != live_out[a] || inn != live_in[a] {
                    change = true;
                    live_out[a] = out;
                    live_in[a] = inn;
                }
            }
        }
        Liveness { live_in, live_out }
    }

    pub fn live_in(&self, line: usize) -> &BTreeSet<X86Register> {
        &self.live_in[line]
    }

    pub fn live_out(&self, line: usize) -> &BTreeSet<X86Register> {
        &self.live_out[line]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::x86::instr::{BinaryOp, Instr, Operand};
    use crate::backend::x86::registers::EAX;
    use crate::intermediate::names::{Label, Temp};

    fn pseudo(id: u32) -> X86Register {
        X86Register::from(Temp::fixed(id))
    }

    #[test]
    fn test_straight_line_liveness() {
        let a = pseudo(100);
        let b = pseudo(101);
        let body = vec![
            Instr::Binary(BinaryOp::Mov, Operand::Reg(a), Operand::Imm(1)), // 0
            Instr::Binary(BinaryOp::Mov, Operand::Reg(b), Operand::Imm(2)), // 1
            Instr::Binary(BinaryOp::Add, Operand::Reg(b), Operand::Reg(a)), // 2
            Instr::Binary(BinaryOp::Mov, Operand::Reg(EAX), Operand::Reg(b)), // 3
            Instr::Ret,                                                     // 4
        ];
        let fun = X86Function::new(Label::named("Lf"), body);
        let flow = FlowGraph::new(&fun);
        let live = Liveness::new(&fun, &flow);

        // a is live across the definition of b, b is live up to its use.
        assert!(live.live_out(0).contains(&a));
        assert!(live.live_in(2).contains(&a));
        assert!(live.live_in(2).contains(&b));
        assert!(live.live_out(2).contains(&b));
        assert!(!live.live_out(3).contains(&b));
        // RET reads EAX.
        assert!(live.live_out(3).contains(&EAX));
    }

    #[test]
    fn test_loop_liveness_reaches_fixpoint() {
        let a = pseudo(100);
        let l = Label::named("Lloop");
        let body = vec![
            Instr::Binary(BinaryOp::Mov, Operand::Reg(a), Operand::Imm(0)), // 0
            Instr::Label(l.clone()),                                        // 1
            Instr::Binary(BinaryOp::Add, Operand::Reg(a), Operand::Imm(1)), // 2
            Instr::Jmp(l),                                                  // 3
        ];
        let fun = X86Function::new(Label::named("Lf"), body);
        let flow = FlowGraph::new(&fun);
        let live = Liveness::new(&fun, &flow);
        // Around the loop, a stays live.
        for i in 0..4 {
            assert!(live.live_out(i).contains(&a), "a not live out of {}", i);
        }
    }
}
