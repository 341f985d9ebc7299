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

//! Pretty-printer for machine programs, in Intel syntax.

use std::fmt;

use super::function::{X86Function, X86Prg};
use super::instr::{BinaryOp, Cond, Instr, MemOperand, Operand, UnaryOp};

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Push => "PUSH",
            UnaryOp::Pop => "POP",
            UnaryOp::Neg => "NEG",
            UnaryOp::Not => "NOT",
            UnaryOp::Inc => "INC",
            UnaryOp::Dec => "DEC",
            UnaryOp::Idiv => "IDIV",
        };
        f.write_str(s)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Mov => "MOV",
            BinaryOp::Add => "ADD",
            BinaryOp::Sub => "SUB",
            BinaryOp::Shl => "SHL",
            BinaryOp::Shr => "SHR",
            BinaryOp::Sal => "SAL",
            BinaryOp::Sar => "SAR",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
            BinaryOp::Test => "TEST",
            BinaryOp::Cmp => "CMP",
            BinaryOp::Lea => "LEA",
            BinaryOp::Imul => "IMUL",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cond::E => "E",
            Cond::Ne => "NE",
            Cond::L => "L",
            Cond::Le => "LE",
            Cond::G => "G",
            Cond::Ge => "GE",
            Cond::Z => "Z",
        };
        f.write_str(s)
    }
}

fn write_mem(f: &mut fmt::Formatter<'_>, m: &MemOperand) -> fmt::Result {
    write!(f, "DWORD PTR [")?;
    let mut first = true;
    if let Some(base) = m.base {
        write!(f, "{}", base)?;
        first = false;
    }
    if let Some((scale, index)) = m.index {
        if !first {
            write!(f, " + ")?;
        }
        write!(f, "{} * {}", scale.factor(), index)?;
        first = false;
    }
    if let Some(disp) = m.disp {
        if first {
            write!(f, "{}", disp)?;
        } else if disp < 0 {
            write!(f, " - {}", -(disp as i64))?;
        } else {
            write!(f, " + {}", disp)?;
        }
    }
    write!(f, "]")
}

fn write_operand(f: &mut fmt::Formatter<'_>, fun: &X86Function, op: &Operand) -> fmt::Result {
    match op {
        Operand::Imm(v) => write!(f, "{}", v),
        Operand::Reg(r) => write!(f, "{}", r),
        Operand::Mem(m) => write_mem(f, m),
        Operand::FrameSize => write!(f, "{}", fun.frame_size()),
    }
}

fn write_instr(f: &mut fmt::Formatter<'_>, fun: &X86Function, instr: &Instr) -> fmt::Result {
    match instr {
        Instr::Unary(op, src) => {
            write!(f, "{} ", op)?;
            write_operand(f, fun, src)
        }
        Instr::Binary(op, dst, src) => {
            write!(f, "{} ", op)?;
            write_operand(f, fun, dst)?;
            write!(f, ", ")?;
            write_operand(f, fun, src)
        }
        Instr::Label(l) => write!(f, "{}:", l),
        Instr::Call(target) => write!(f, "CALL {}", target),
        Instr::Jmp(target) => write!(f, "JMP {}", target),
        Instr::J(cond, target) => write!(f, "J{} {}", cond, target),
        Instr::Ret => write!(f, "RET"),
    }
}

impl fmt::Display for X86Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name())?;
        for i in self.body() {
            write!(f, "  ")?;
            write_instr(f, self, i)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for X86Prg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ".intel_syntax noprefix")?;
        writeln!(f, ".global Lmain")?;
        for fun in &self.functions {
            writeln!(f, "{}", fun)?;
        }
        Ok(())
    }
}
