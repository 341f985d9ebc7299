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

use std::collections::HashMap;

use crate::intermediate::names::{Label, Temp};

use super::WORD_SIZE;
use super::instr::{BinaryOp, Instr, Operand};
use super::registers::{EBP, X86Register};

/// A machine function: a name, an instruction list, and the frame size,
/// which grows as spill slots are added.
#[derive(Debug, Clone)]
pub struct X86Function {
    name: Label,
    body: Vec<Instr>,
    frame_size: u32,
}

/// An x86 machine program.
#[derive(Debug, Clone)]
pub struct X86Prg {
    pub functions: Vec<X86Function>,
}

impl X86Function {
    pub fn new(name: Label, body: Vec<Instr>) -> Self {
        X86Function { name, body, frame_size: 0 }
    }

    pub fn name(&self) -> &Label {
        &self.name
    }

    pub fn body(&self) -> &[Instr] {
        &self.body
    }

    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    /// Applies a register substitution to the whole body, dropping any
    /// register-to-register move that becomes trivial.
    pub fn rename(&mut self, sigma: &dyn Fn(X86Register) -> X86Register) {
        let body = std::mem::take(&mut self.body);
        self.body = body
            .into_iter()
            .filter_map(|mut i| {
                i.rename(sigma);
                if let Some((dst, src)) = i.is_move_between_temps() {
                    if dst == src {
                        return None;
                    }
                }
                Some(i)
            })
            .collect();
    }

    fn add_local_on_stack(&mut self) -> Operand {
        self.frame_size += WORD_SIZE as u32;
        Operand::mem_base_disp(EBP, -(self.frame_size as i32))
    }

    /// Rewrites the body so that every register in `to_spill` lives in a
    /// fresh stack slot: loads are inserted before each use, stores after
    /// each definition, and occurrences are renamed to per-instruction
    /// fresh temps.
    pub fn spill(&mut self, to_spill: &[X86Register]) {
        let mut slots: HashMap<X86Register, Operand> = HashMap::new();
        for t in to_spill {
            let slot = self.add_local_on_stack();
            slots.insert(*t, slot);
        }
        let slot_op = |t: X86Register| -> Operand {
            slots.get(&t).cloned().unwrap_or(Operand::Reg(t))
        };

        let body = std::mem::take(&mut self.body);
        let mut new_body = Vec::with_capacity(body.len());

        for mut instr in body {
            // A move between temps with a spilled side turns into a direct
            // slot move, staged through a temp when both sides are slots.
            if let Some((dst, src)) = instr.is_move_between_temps() {
                let dst_op = slot_op(dst);
                let src_op = slot_op(src);
                if dst_op.is_reg() || src_op.is_reg() {
                    new_body.push(Instr::Binary(BinaryOp::Mov, dst_op, src_op));
                } else {
                    let r = Operand::Reg(X86Register::from(Temp::fresh()));
                    new_body.push(Instr::Binary(BinaryOp::Mov, r.clone(), src_op));
                    new_body.push(Instr::Binary(BinaryOp::Mov, dst_op, r));
                }
                continue;
            }

            let uses = instr.uses();
            let defs = instr.defs();
            if uses.is_empty() && defs.is_empty() {
                new_body.push(instr);
                continue;
            }

            // One fresh temp per spilled register, shared by all of its
            // occurrences within this single instruction.
            let mut fresh_idents: HashMap<X86Register, X86Register> = HashMap::new();
            let mut fresh_for = |t: X86Register| -> X86Register {
                *fresh_idents
                    .entry(t)
                    .or_insert_with(|| X86Register::from(Temp::fresh()))
            };

            for u in &uses {
                if let Some(slot) = slots.get(u) {
                    let r = fresh_for(*u);
                    new_body.push(Instr::Binary(BinaryOp::Mov, Operand::Reg(r), slot.clone()));
                }
            }

            let mut stores = Vec::new();
            for d in &defs {
                if let Some(slot) = slots.get(d) {
                    let r = fresh_for(*d);
                    stores.push(Instr::Binary(BinaryOp::Mov, slot.clone(), Operand::Reg(r)));
                }
            }

            let renamed = fresh_idents;
            instr.rename(&|t| renamed.get(&t).copied().unwrap_or(t));
            new_body.push(instr);
            new_body.extend(stores);
        }

        self.body = new_body;
    }
}
