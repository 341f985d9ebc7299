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

//! Control flow graph over the instruction indices of one machine function.

use std::collections::HashMap;

use crate::intermediate::names::Label;

use super::graph::Graph;
use super::x86::function::X86Function;

pub struct FlowGraph {
    graph: Graph<usize>,
}

impl FlowGraph {
    pub fn new(function: &X86Function) -> Self {
        let body = function.body();
        let mut targets: HashMap<&Label, usize> = HashMap::new();
        for (i, instr) in body.iter().enumerate() {
            if let Some(l) = instr.is_label() {
                targets.insert(l, i);
            }
        }

        let mut graph = Graph::new();
        for (i, instr) in body.iter().enumerate() {
            if i + 1 < body.len() && instr.is_fall_through() {
                graph.add_edge(i, i + 1);
            }
            for l in instr.jumps() {
                let target = targets
                    .get(&l)
                    .unwrap_or_else(|| panic!("jump to unknown label {}", l));
                graph.add_edge(i, *target);
            }
        }
        FlowGraph { graph }
    }

    pub fn graph(&self) -> &Graph<usize> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::x86::instr::{BinaryOp, Cond, Instr, Operand};
    use crate::backend::x86::registers::EAX;

    #[test]
    fn test_fall_through_and_jump_edges() {
        let l = Label::named("L0");
        let body = vec![
            Instr::Binary(BinaryOp::Mov, Operand::Reg(EAX), Operand::Imm(1)), // 0
            Instr::J(Cond::E, l.clone()),                                     // 1
            Instr::Jmp(l.clone()),                                            // 2
            Instr::Label(l),                                                  // 3
            Instr::Ret,                                                       // 4
        ];
        let fun = X86Function::new(Label::named("Lf"), body);
        let flow = FlowGraph::new(&fun);
        let g = flow.graph();
        assert!(g.has_edge(&0, &1));
        // The conditional jump both falls through and jumps.
        assert!(g.has_edge(&1, &2));
        assert!(g.has_edge(&1, &3));
        // The unconditional jump has exactly its target as successor.
        assert!(g.has_edge(&2, &3));
        assert_eq!(g.successors(&2).count(), 1);
        assert!(g.has_edge(&3, &4));
    }
}
