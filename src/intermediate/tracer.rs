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

//! Tracing of canonized tree programs.
//!
//! Tracing rearranges basic blocks to establish the invariant that every
//! `CJUMP(rel, e1, e2, l_true, l_false)` is immediately followed by
//! `LABEL(l_false)`, while removing unnecessary jumps.

use std::collections::{HashMap, HashSet};

use super::names::Label;
use super::tree::{TreeExp, TreeFunction, TreeProgram, TreeStm};

/// Traces every function of a canonized program.
pub fn trace(prg: TreeProgram) -> TreeProgram {
    TreeProgram {
        functions: prg.functions.into_iter().map(trace_function).collect(),
    }
}

/// A basic block: a label, a run of non-transfer statements, and a final
/// transfer (JUMP or CJUMP).
struct BasicBlock {
    body: Vec<TreeStm>,
    transfer: TreeStm,
}

/// Decomposes a linear statement list into basic blocks.
struct BlockBuilder {
    blocks: HashMap<Label, BasicBlock>,
    start_label: Label,
    end_label: Label,
    current: Option<(Label, Vec<TreeStm>)>,
}

impl BlockBuilder {
    fn build(body: Vec<TreeStm>) -> Self {
        assert!(!body.is_empty(), "function body must not be empty");

        let start_label = match &body[0] {
            TreeStm::Label(l) => l.clone(),
            _ => Label::fresh(),
        };
        let end_label = Label::fresh();

        let mut builder = BlockBuilder {
            blocks: HashMap::new(),
            start_label: start_label.clone(),
            end_label: end_label.clone(),
            current: None,
        };
        builder.start_new(start_label);

        for stm in body {
            match stm {
                TreeStm::Label(l) => {
                    // A fall-through into a label becomes an explicit jump.
                    builder.finish_current(TreeStm::jump_to(l.clone()));
                    builder.start_new(l);
                }
                TreeStm::Jump(_, _) | TreeStm::CJump(_, _, _, _, _) => {
                    builder.finish_current(stm);
                }
                stm => builder.push_current(stm),
            }
        }
        builder.finish_current(TreeStm::jump_to(end_label));
        builder
    }

    fn start_new(&mut self, label: Label) {
        self.current = Some((label.clone(), vec![TreeStm::Label(label)]));
    }

    fn push_current(&mut self, stm: TreeStm) {
        let (_, body) = self.current.as_mut().expect("statement outside any block");
        body.push(stm);
    }

    fn finish_current(&mut self, transfer: TreeStm) {
        if let Some((label, body)) = self.current.take() {
            self.blocks.insert(label, BasicBlock { body, transfer });
        }
    }
}

fn trace_function(fun: TreeFunction) -> TreeFunction {
    let builder = BlockBuilder::build(fun.body);
    let mut blocks = builder.blocks;
    let end_label = builder.end_label;

    let mut body: Vec<TreeStm> = Vec::new();
    let mut to_trace: Vec<Label> = vec![builder.start_label];
    let mut added: HashSet<Label> = HashSet::from([end_label.clone()]);

    while let Some(l) = to_trace.pop() {
        if added.contains(&l) {
            continue;
        }
        let block = blocks.remove(&l).expect("block with this label must exist");

        // If the emitted code ends with a jump straight to this block, the
        // jump is redundant now.
        if let Some(TreeStm::Jump(TreeExp::Name(target), _)) = body.last() {
            if *target == l {
                body.pop();
            }
        }

        body.extend(block.body);

        match block.transfer {
            TreeStm::Jump(target, targets) => {
                for t in &targets {
                    to_trace.push(t.clone());
                }
                body.push(TreeStm::Jump(target, targets));
            }
            TreeStm::CJump(rel, left, right, l_true, l_false) => {
                if !added.contains(&l_false) {
                    // The false branch can be placed right behind us.
                    to_trace.push(l_true.clone());
                    to_trace.push(l_false.clone());
                    body.push(TreeStm::CJump(rel, left, right, l_true, l_false));
                } else if !added.contains(&l_true) {
                    // Flip the condition so the not-yet-placed branch
                    // becomes the fall-through.
                    to_trace.push(l_false.clone());
                    to_trace.push(l_true.clone());
                    body.push(TreeStm::CJump(rel.negate(), left, right, l_false, l_true));
                } else {
                    // Both targets are placed already; fall through to a
                    // fresh dummy label and jump on from there.
                    let dummy = Label::fresh();
                    body.push(TreeStm::CJump(rel, left, right, l_true, dummy.clone()));
                    body.push(TreeStm::Label(dummy));
                    body.push(TreeStm::jump_to(l_false));
                }
            }
            transfer => unreachable!("block transfer cannot be {}", transfer),
        }
        added.insert(l);
    }
    body.push(TreeStm::Label(end_label));

    TreeFunction {
        name: fun.name,
        parameter_count: fun.parameter_count,
        body,
        return_temp: fun.return_temp,
    }
}
