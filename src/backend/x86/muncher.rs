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

//! Maximal-munch instruction selection from traced tree programs into
//! pseudo-x86 with unbounded temps.

use std::collections::BTreeMap;

use crate::intermediate::names::Temp;
use crate::intermediate::tree::{BinOp, RelOp, TreeExp, TreeFunction, TreeProgram, TreeStm};

use super::WORD_SIZE;
use super::function::{X86Function, X86Prg};
use super::instr::{BinaryOp, Cond, Instr, Operand, Scale, UnaryOp};
use super::registers::{EAX, EBP, EBX, EDI, EDX, ESI, ESP, X86Register};

/// Selects instructions for every function of a traced program.
pub fn codegen(prg: TreeProgram) -> X86Prg {
    let mut muncher = Muncher { code: Vec::new() };
    X86Prg {
        functions: prg
            .functions
            .into_iter()
            .map(|f| muncher.function(f))
            .collect(),
    }
}

/// A symbolic view of an expression as `c0 + sum(ci * ti)` over temps.
/// Anything beyond additions, subtractions and linear multiplications makes
/// the combination illegal.
struct LinearCombination {
    illegal: bool,
    constant: i32,
    // Invariant: no register is mapped to a zero coefficient.
    coefficients: BTreeMap<X86Register, i32>,
}

impl LinearCombination {
    fn from_const(value: i32) -> Self {
        LinearCombination { illegal: false, constant: value, coefficients: BTreeMap::new() }
    }

    fn from_temp(t: Temp) -> Self {
        LinearCombination {
            illegal: false,
            constant: 0,
            coefficients: BTreeMap::from([(X86Register::from(t), 1)]),
        }
    }

    fn illegal() -> Self {
        LinearCombination { illegal: true, constant: 0, coefficients: BTreeMap::new() }
    }

    fn of(exp: &TreeExp) -> Self {
        match exp {
            TreeExp::Const(v) => Self::from_const(*v),
            TreeExp::Temp(t) => Self::from_temp(*t),
            TreeExp::BinOp(BinOp::Plus, l, r) => Self::of(l).add(Self::of(r)),
            TreeExp::BinOp(BinOp::Mul, l, r) => Self::of(l).mul(Self::of(r)),
            TreeExp::BinOp(BinOp::Minus, l, r) => {
                Self::of(l).add(Self::from_const(-1).mul(Self::of(r)))
            }
            TreeExp::ESeq(_, _) => unreachable!("ESEQ in canonical program"),
            _ => Self::illegal(),
        }
    }

    fn add(mut self, other: Self) -> Self {
        if self.illegal || other.illegal {
            return Self::illegal();
        }
        self.constant = self.constant.wrapping_add(other.constant);
        for (r, c) in other.coefficients {
            let entry = self.coefficients.entry(r).or_insert(0);
            *entry = entry.wrapping_add(c);
        }
        self.trim();
        self
    }

    fn mul(self, other: Self) -> Self {
        if self.illegal || other.illegal {
            return Self::illegal();
        }
        // The product stays linear only if at most one side mentions temps.
        if !self.coefficients.is_empty() && !other.coefficients.is_empty() {
            return Self::illegal();
        }
        let mut coefficients = BTreeMap::new();
        for (r, c) in &self.coefficients {
            coefficients.insert(*r, c.wrapping_mul(other.constant));
        }
        for (r, c) in &other.coefficients {
            coefficients.insert(*r, c.wrapping_mul(self.constant));
        }
        let mut lc = LinearCombination {
            illegal: false,
            constant: self.constant.wrapping_mul(other.constant),
            coefficients,
        };
        lc.trim();
        lc
    }

    fn trim(&mut self) {
        self.coefficients.retain(|_, c| *c != 0);
    }

    fn number_of_summands(&self) -> usize {
        self.coefficients.len() + usize::from(self.constant != 0)
    }

    /// An addressable form of the combination, if one or two temps remain
    /// and the scales fit the machine's addressing modes.
    fn as_operand(&self) -> Option<Operand> {
        if self.illegal {
            return None;
        }
        let mut it = self.coefficients.iter();
        match self.coefficients.len() {
            0 => Some(Operand::mem_abs(self.constant)),
            1 => {
                let (&r, &c) = it.next().unwrap();
                let scale = Scale::from_factor(c)?;
                Some(Operand::mem_index_disp(scale, r, self.constant))
            }
            2 => {
                let (&r1, &c1) = it.next().unwrap();
                let (&r2, &c2) = it.next().unwrap();
                let ((base, cb), (index, ci)) =
                    if c1 > c2 { ((r2, c2), (r1, c1)) } else { ((r1, c1), (r2, c2)) };
                if cb != 1 {
                    return None;
                }
                let scale = Scale::from_factor(ci)?;
                Some(Operand::mem_base_index_disp(base, scale, index, self.constant))
            }
            _ => None,
        }
    }
}

struct Muncher {
    code: Vec<Instr>,
}

impl Muncher {
    fn emit(&mut self, i: Instr) {
        self.code.push(i);
    }

    fn fresh_reg(&self) -> Operand {
        Operand::Reg(X86Register::from(Temp::fresh()))
    }

    fn function(&mut self, fun: TreeFunction) -> X86Function {
        self.code.clear();
        self.emit(Instr::Unary(UnaryOp::Push, Operand::Reg(EBP)));
        self.emit(Instr::Binary(BinaryOp::Mov, Operand::Reg(EBP), Operand::Reg(ESP)));
        self.emit(Instr::Binary(BinaryOp::Sub, Operand::Reg(ESP), Operand::FrameSize));

        // Callee-save registers are staged through temps; the allocator
        // keeps them in place when the registers are never clobbered.
        let ebx_save = self.fresh_reg();
        let esi_save = self.fresh_reg();
        let edi_save = self.fresh_reg();
        self.emit(Instr::Binary(BinaryOp::Mov, ebx_save.clone(), Operand::Reg(EBX)));
        self.emit(Instr::Binary(BinaryOp::Mov, esi_save.clone(), Operand::Reg(ESI)));
        self.emit(Instr::Binary(BinaryOp::Mov, edi_save.clone(), Operand::Reg(EDI)));

        for s in fun.body {
            self.stm(s);
        }

        self.emit(Instr::Binary(
            BinaryOp::Mov,
            Operand::Reg(EAX),
            Operand::Reg(X86Register::from(fun.return_temp)),
        ));
        self.emit(Instr::Binary(BinaryOp::Mov, Operand::Reg(EBX), ebx_save));
        self.emit(Instr::Binary(BinaryOp::Mov, Operand::Reg(ESI), esi_save));
        self.emit(Instr::Binary(BinaryOp::Mov, Operand::Reg(EDI), edi_save));
        self.emit(Instr::Binary(BinaryOp::Mov, Operand::Reg(ESP), Operand::Reg(EBP)));
        self.emit(Instr::Unary(UnaryOp::Pop, Operand::Reg(EBP)));
        self.emit(Instr::Ret);

        X86Function::new(fun.name, std::mem::take(&mut self.code))
    }

    fn stm(&mut self, stm: TreeStm) {
        match stm {
            TreeStm::Move(dst, src) => {
                let l = self.lexp(dst);
                let r = self.exp(src);
                if l.is_reg() && r == Operand::Imm(0) {
                    self.emit(Instr::Binary(BinaryOp::Xor, l.clone(), l));
                } else if l.is_mem() && r.is_mem() {
                    let t = self.fresh_reg();
                    self.emit(Instr::Binary(BinaryOp::Mov, t.clone(), r));
                    self.emit(Instr::Binary(BinaryOp::Mov, l, t));
                } else {
                    self.emit(Instr::Binary(BinaryOp::Mov, l, r));
                }
            }
            TreeStm::Jump(target, _) => match target {
                TreeExp::Name(l) => self.emit(Instr::Jmp(l)),
                target => unreachable!("jump target cannot be {}", target),
            },
            TreeStm::CJump(rel, left, right, l_true, _) => {
                let cond = match rel {
                    RelOp::Eq => Cond::E,
                    RelOp::Ne => Cond::Ne,
                    RelOp::Lt => Cond::L,
                    RelOp::Gt => Cond::G,
                    RelOp::Le => Cond::Le,
                    RelOp::Ge => Cond::Ge,
                    rel => unreachable!("unsigned comparison {} is never generated", rel),
                };
                let l = self.exp(left);
                let r = self.exp(right);
                if l.is_imm() || (l.is_mem() && r.is_mem()) {
                    let t = self.fresh_reg();
                    self.emit(Instr::Binary(BinaryOp::Mov, t.clone(), l));
                    self.emit(Instr::Binary(BinaryOp::Cmp, t, r));
                } else {
                    self.emit(Instr::Binary(BinaryOp::Cmp, l, r));
                }
                // The tracer guarantees that the false label follows.
                self.emit(Instr::J(cond, l_true));
            }
            TreeStm::Label(l) => self.emit(Instr::Label(l)),
            TreeStm::Seq(stms) => {
                for s in stms {
                    self.stm(s);
                }
            }
        }
    }

    /// Emits code placing the value of `exp` into the returned operand.
    fn exp(&mut self, exp: TreeExp) -> Operand {
        let lc = LinearCombination::of(&exp);
        if let Some(o) = lc.as_operand() {
            // A two-summand combination is one LEA instead of two adds.
            if lc.number_of_summands() == 2 {
                let t = self.fresh_reg();
                self.emit(Instr::Binary(BinaryOp::Lea, t.clone(), o));
                return t;
            }
        }
        self.munch_exp(exp)
    }

    fn munch_exp(&mut self, exp: TreeExp) -> Operand {
        match exp {
            TreeExp::Const(v) => Operand::Imm(v),
            TreeExp::Temp(t) => Operand::Reg(X86Register::from(t)),
            TreeExp::Param(n) => Operand::mem_base_disp(EBP, 8 + WORD_SIZE * n),
            TreeExp::Mem(addr) => self.effective_address(*addr),
            TreeExp::BinOp(op, left, right) => {
                let l = self.exp(*left);
                let r = self.exp(*right);
                match op {
                    BinOp::Plus => self.generic_binop(BinaryOp::Add, l, r),
                    BinOp::Minus => self.generic_binop(BinaryOp::Sub, l, r),
                    BinOp::Mul => self.generic_binop(BinaryOp::Imul, l, r),
                    BinOp::Div => self.divide(l, r),
                    BinOp::And => self.generic_binop(BinaryOp::And, l, r),
                    BinOp::Or => self.generic_binop(BinaryOp::Or, l, r),
                    BinOp::LShift => self.generic_binop(BinaryOp::Shl, l, r),
                    BinOp::RShift => self.generic_binop(BinaryOp::Shr, l, r),
                    BinOp::ARShift => self.generic_binop(BinaryOp::Sar, l, r),
                    BinOp::Xor => self.generic_binop(BinaryOp::Xor, l, r),
                }
            }
            TreeExp::Call(fun, args) => match *fun {
                TreeExp::Name(f) => {
                    let arg_count = args.len();
                    // cdecl: arguments are pushed right to left.
                    for arg in args.into_iter().rev() {
                        let o = self.exp(arg);
                        self.emit(Instr::Unary(UnaryOp::Push, o));
                    }
                    self.emit(Instr::Call(f));
                    let t = self.fresh_reg();
                    self.emit(Instr::Binary(BinaryOp::Mov, t.clone(), Operand::Reg(EAX)));
                    self.emit(Instr::Binary(
                        BinaryOp::Add,
                        Operand::Reg(ESP),
                        Operand::Imm(WORD_SIZE * arg_count as i32),
                    ));
                    t
                }
                fun => unreachable!("call target cannot be {}", fun),
            },
            TreeExp::Name(l) => unreachable!("NAME({}) has no value form", l),
            TreeExp::ESeq(_, _) => unreachable!("ESEQ in canonical program"),
        }
    }

    fn generic_binop(&mut self, op: BinaryOp, l: Operand, r: Operand) -> Operand {
        let t = self.fresh_reg();
        self.emit(Instr::Binary(BinaryOp::Mov, t.clone(), l));
        self.emit(Instr::Binary(op, t.clone(), r));
        t
    }

    /// Signed division through EDX:EAX. The divisor cannot be an immediate.
    fn divide(&mut self, l: Operand, r: Operand) -> Operand {
        let t = self.fresh_reg();
        self.emit(Instr::Binary(BinaryOp::Mov, Operand::Reg(EAX), l));
        self.emit(Instr::Binary(BinaryOp::Mov, Operand::Reg(EDX), Operand::Reg(EAX)));
        self.emit(Instr::Binary(BinaryOp::Sar, Operand::Reg(EDX), Operand::Imm(31)));
        if r.is_imm() {
            let s = self.fresh_reg();
            self.emit(Instr::Binary(BinaryOp::Mov, s.clone(), r));
            self.emit(Instr::Unary(UnaryOp::Idiv, s));
        } else {
            self.emit(Instr::Unary(UnaryOp::Idiv, r));
        }
        self.emit(Instr::Binary(BinaryOp::Mov, t.clone(), Operand::Reg(EAX)));
        t
    }

    /// Like `exp`, but the result is addressable as a store destination.
    fn lexp(&mut self, exp: TreeExp) -> Operand {
        match exp {
            TreeExp::Temp(t) => Operand::Reg(X86Register::from(t)),
            TreeExp::Param(n) => Operand::mem_base_disp(EBP, 8 + WORD_SIZE * n),
            TreeExp::Mem(addr) => self.effective_address(*addr),
            exp => unreachable!("{} is not an l-value", exp),
        }
    }

    /// A memory operand for the address `exp`, using a machine addressing
    /// mode when the address is a small linear combination of temps.
    fn effective_address(&mut self, exp: TreeExp) -> Operand {
        if let Some(ea) = LinearCombination::of(&exp).as_operand() {
            return ea;
        }
        let o = self.exp(exp);
        let t = X86Register::from(Temp::fresh());
        self.emit(Instr::Binary(BinaryOp::Mov, Operand::Reg(t), o));
        Operand::mem_base(t)
    }
}
