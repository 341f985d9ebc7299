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

//! Pseudo-x86 operands and instructions.

use crate::intermediate::names::Label;

use super::registers::{CALLEE_SAVE, CALLER_SAVE, EAX, EDX, X86Register};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scale {
    S1,
    S2,
    S4,
    S8,
}

impl Scale {
    pub fn from_factor(i: i32) -> Option<Scale> {
        match i {
            1 => Some(Scale::S1),
            2 => Some(Scale::S2),
            4 => Some(Scale::S4),
            8 => Some(Scale::S8),
            _ => None,
        }
    }

    pub fn factor(self) -> i32 {
        match self {
            Scale::S1 => 1,
            Scale::S2 => 2,
            Scale::S4 => 4,
            Scale::S8 => 8,
        }
    }
}

/// A memory operand `[base + scale * index + disp]`; each component is
/// optional, but at least one must be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemOperand {
    pub base: Option<X86Register>,
    pub index: Option<(Scale, X86Register)>,
    pub disp: Option<i32>,
}

impl MemOperand {
    fn regs(&self) -> Vec<X86Register> {
        let mut rs = Vec::new();
        if let Some(b) = self.base {
            rs.push(b);
        }
        if let Some((_, i)) = self.index {
            rs.push(i);
        }
        rs
    }

    fn rename(&mut self, sigma: &dyn Fn(X86Register) -> X86Register) {
        if let Some(b) = self.base {
            self.base = Some(sigma(b));
        }
        if let Some((s, i)) = self.index {
            self.index = Some((s, sigma(i)));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Imm(i32),
    Reg(X86Register),
    Mem(MemOperand),
    /// Late-bound frame size, resolved when the function is printed.
    FrameSize,
}

impl Operand {
    pub fn mem_base(base: X86Register) -> Operand {
        Operand::Mem(MemOperand { base: Some(base), index: None, disp: None })
    }

    pub fn mem_base_disp(base: X86Register, disp: i32) -> Operand {
        Operand::Mem(MemOperand { base: Some(base), index: None, disp: Some(disp) })
    }

    pub fn mem_index_disp(scale: Scale, index: X86Register, disp: i32) -> Operand {
        Operand::Mem(MemOperand { base: None, index: Some((scale, index)), disp: Some(disp) })
    }

    pub fn mem_base_index_disp(
        base: X86Register,
        scale: Scale,
        index: X86Register,
        disp: i32,
    ) -> Operand {
        Operand::Mem(MemOperand {
            base: Some(base),
            index: Some((scale, index)),
            disp: Some(disp),
        })
    }

    pub fn mem_abs(disp: i32) -> Operand {
        Operand::Mem(MemOperand { base: None, index: None, disp: Some(disp) })
    }

    pub fn is_imm(&self) -> bool {
        matches!(self, Operand::Imm(_))
    }

    pub fn is_reg(&self) -> bool {
        matches!(self, Operand::Reg(_))
    }

    pub fn is_mem(&self) -> bool {
        matches!(self, Operand::Mem(_))
    }

    pub fn get_reg(&self) -> Option<X86Register> {
        match self {
            Operand::Reg(r) => Some(*r),
            _ => None,
        }
    }

    /// All registers mentioned by the operand.
    pub fn regs(&self) -> Vec<X86Register> {
        match self {
            Operand::Reg(r) => vec![*r],
            Operand::Mem(m) => m.regs(),
            Operand::Imm(_) | Operand::FrameSize => Vec::new(),
        }
    }

    pub fn rename(&mut self, sigma: &dyn Fn(X86Register) -> X86Register) {
        match self {
            Operand::Reg(r) => *r = sigma(*r),
            Operand::Mem(m) => m.rename(sigma),
            Operand::Imm(_) | Operand::FrameSize => {}
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOp {
    Push,
    Pop,
    Neg,
    Not,
    Inc,
    Dec,
    Idiv,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOp {
    Mov,
    Add,
    Sub,
    Shl,
    Shr,
    Sal,
    Sar,
    And,
    Or,
    Xor,
    Test,
    Cmp,
    Lea,
    Imul,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cond {
    E,
    Ne,
    L,
    Le,
    G,
    Ge,
    Z,
}

/// One pseudo-x86 instruction. Binary instructions carry `(op, dst, src)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Unary(UnaryOp, Operand),
    Binary(BinaryOp, Operand, Operand),
    Label(Label),
    Call(Label),
    Jmp(Label),
    J(Cond, Label),
    Ret,
}

impl Instr {
    /// Registers read by the instruction.
    pub fn uses(&self) -> Vec<X86Register> {
        match self {
            Instr::Unary(op, src) => match op {
                UnaryOp::Neg | UnaryOp::Not | UnaryOp::Inc | UnaryOp::Dec | UnaryOp::Push => {
                    src.regs()
                }
                UnaryOp::Idiv => {
                    let mut uses = src.regs();
                    uses.push(EAX);
                    uses.push(EDX);
                    uses
                }
                UnaryOp::Pop => Vec::new(),
            },
            Instr::Binary(op, dst, src) => match op {
                // xor r, r only clears r; it reads nothing.
                BinaryOp::Xor if src.is_reg() && dst == src => Vec::new(),
                BinaryOp::Lea => src.regs(),
                // A move into a register reads only the source; a store
                // additionally reads the destination's address registers.
                BinaryOp::Mov if dst.is_reg() => src.regs(),
                _ => {
                    let mut uses = src.regs();
                    uses.extend(dst.regs());
                    uses
                }
            },
            Instr::Ret => {
                let mut uses = CALLEE_SAVE.to_vec();
                uses.push(EAX);
                uses
            }
            Instr::Label(_) | Instr::Call(_) | Instr::Jmp(_) | Instr::J(_, _) => Vec::new(),
        }
    }

    /// Registers written by the instruction.
    pub fn defs(&self) -> Vec<X86Register> {
        match self {
            Instr::Unary(op, src) => match op {
                UnaryOp::Neg | UnaryOp::Not | UnaryOp::Inc | UnaryOp::Dec | UnaryOp::Pop => {
                    match src.get_reg() {
                        Some(r) => vec![r],
                        None => Vec::new(),
                    }
                }
                UnaryOp::Idiv => vec![EAX, EDX],
                UnaryOp::Push => Vec::new(),
            },
            Instr::Binary(op, dst, _) => match op {
                BinaryOp::Cmp | BinaryOp::Test => Vec::new(),
                _ => match dst.get_reg() {
                    Some(r) => vec![r],
                    None => Vec::new(),
                },
            },
            // A call clobbers the caller-save registers, EAX among them.
            Instr::Call(_) => CALLER_SAVE.to_vec(),
            Instr::Label(_) | Instr::Jmp(_) | Instr::J(_, _) | Instr::Ret => Vec::new(),
        }
    }

    /// Labels this instruction may transfer control to.
    pub fn jumps(&self) -> Vec<Label> {
        match self {
            Instr::Jmp(target) | Instr::J(_, target) => vec![target.clone()],
            _ => Vec::new(),
        }
    }

    /// Whether control may continue with the next instruction. A conditional
    /// jump falls through; only JMP does not.
    pub fn is_fall_through(&self) -> bool {
        !matches!(self, Instr::Jmp(_))
    }

    pub fn is_label(&self) -> Option<&Label> {
        match self {
            Instr::Label(l) => Some(l),
            _ => None,
        }
    }

    /// `Some((dst, src))` iff this is a register-to-register move.
    pub fn is_move_between_temps(&self) -> Option<(X86Register, X86Register)> {
        match self {
            Instr::Binary(BinaryOp::Mov, Operand::Reg(dst), Operand::Reg(src)) => {
                Some((*dst, *src))
            }
            _ => None,
        }
    }

    pub fn rename(&mut self, sigma: &dyn Fn(X86Register) -> X86Register) {
        match self {
            Instr::Unary(_, src) => src.rename(sigma),
            Instr::Binary(_, dst, src) => {
                src.rename(sigma);
                dst.rename(sigma);
            }
            Instr::Label(_) | Instr::Call(_) | Instr::Jmp(_) | Instr::J(_, _) | Instr::Ret => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::x86::registers::{EBX, ECX, ESI};
    use crate::intermediate::names::Temp;

    fn reg(id: u32) -> Operand {
        Operand::Reg(X86Register::from(Temp::fixed(id)))
    }

    #[test]
    fn test_idiv_uses_and_defines_eax_edx() {
        let i = Instr::Unary(UnaryOp::Idiv, reg(0));
        assert!(i.uses().contains(&EAX));
        assert!(i.uses().contains(&EDX));
        assert_eq!(i.defs(), vec![EAX, EDX]);
    }

    #[test]
    fn test_call_defines_caller_saves() {
        let i = Instr::Call(Label::named("L_halloc"));
        let defs = i.defs();
        assert!(defs.contains(&EAX));
        assert!(defs.contains(&ECX));
        assert!(defs.contains(&EDX));
        assert!(i.uses().is_empty());
    }

    #[test]
    fn test_ret_uses_callee_saves_and_eax() {
        let uses = Instr::Ret.uses();
        assert!(uses.contains(&EBX));
        assert!(uses.contains(&ESI));
        assert!(uses.contains(&EAX));
    }

    #[test]
    fn test_self_xor_has_no_uses() {
        let i = Instr::Binary(BinaryOp::Xor, reg(1), reg(1));
        assert!(i.uses().is_empty());
        assert_eq!(i.defs(), vec![X86Register::from(Temp::fixed(1))]);
    }

    #[test]
    fn test_store_uses_destination_address_registers() {
        let dst = Operand::mem_base_disp(X86Register::from(Temp::fixed(2)), 4);
        let i = Instr::Binary(BinaryOp::Mov, dst, reg(3));
        let uses = i.uses();
        assert!(uses.contains(&X86Register::from(Temp::fixed(2))));
        assert!(uses.contains(&X86Register::from(Temp::fixed(3))));
        assert!(i.defs().is_empty());
    }

    #[test]
    fn test_lea_uses_only_source_registers() {
        let src = Operand::mem_base_index_disp(
            X86Register::from(Temp::fixed(4)),
            Scale::S4,
            X86Register::from(Temp::fixed(5)),
            0,
        );
        let i = Instr::Binary(BinaryOp::Lea, reg(6), src);
        let uses = i.uses();
        assert_eq!(uses.len(), 2);
        assert!(!uses.contains(&X86Register::from(Temp::fixed(6))));
    }

    #[test]
    fn test_cmp_defines_nothing() {
        let i = Instr::Binary(BinaryOp::Cmp, reg(0), reg(1));
        assert!(i.defs().is_empty());
        assert_eq!(i.uses().len(), 2);
    }

    #[test]
    fn test_fall_through_classification() {
        assert!(!Instr::Jmp(Label::named("L0")).is_fall_through());
        assert!(Instr::J(Cond::L, Label::named("L0")).is_fall_through());
        assert!(Instr::Ret.is_fall_through());
    }

    #[test]
    fn test_move_between_temps() {
        let i = Instr::Binary(BinaryOp::Mov, reg(1), reg(2));
        let (d, s) = i.is_move_between_temps().unwrap();
        assert_eq!(d, X86Register::from(Temp::fixed(1)));
        assert_eq!(s, X86Register::from(Temp::fixed(2)));
        let store = Instr::Binary(BinaryOp::Mov, Operand::mem_base(EAX), reg(2));
        assert!(store.is_move_between_temps().is_none());
    }
}
