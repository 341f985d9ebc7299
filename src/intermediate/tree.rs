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

//! Abstract syntax of the tree intermediate language.

use std::fmt;

use super::names::{Label, Temp};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Plus,
    Minus,
    Mul,
    Div,
    And,
    Or,
    LShift,
    RShift,
    ARShift,
    Xor,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl RelOp {
    /// Inverts the relation: `negate(r)(a, b)` holds iff `r(a, b)` does not.
    pub fn negate(self) -> RelOp {
        match self {
            RelOp::Eq => RelOp::Ne,
            RelOp::Ne => RelOp::Eq,
            RelOp::Lt => RelOp::Ge,
            RelOp::Gt => RelOp::Le,
            RelOp::Le => RelOp::Gt,
            RelOp::Ge => RelOp::Lt,
            RelOp::Ult => RelOp::Uge,
            RelOp::Ule => RelOp::Ugt,
            RelOp::Ugt => RelOp::Ule,
            RelOp::Uge => RelOp::Ult,
        }
    }
}

/// Tree expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeExp {
    Const(i32),
    Name(Label),
    Temp(Temp),
    /// The i-th parameter of the enclosing function (0 is `this`).
    Param(i32),
    Mem(Box<TreeExp>),
    BinOp(BinOp, Box<TreeExp>, Box<TreeExp>),
    Call(Box<TreeExp>, Vec<TreeExp>),
    ESeq(Vec<TreeStm>, Box<TreeExp>),
}

/// Tree statements.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeStm {
    Move(TreeExp, TreeExp),
    /// The label list overapproximates the possible jump targets.
    Jump(TreeExp, Vec<Label>),
    CJump(RelOp, TreeExp, TreeExp, Label, Label),
    Label(Label),
    Seq(Vec<TreeStm>),
}

impl TreeStm {
    /// An unconditional jump to a single known label.
    pub fn jump_to(label: Label) -> TreeStm {
        TreeStm::Jump(TreeExp::Name(label.clone()), vec![label])
    }
}

/// A single function of a tree program.
#[derive(Debug, Clone)]
pub struct TreeFunction {
    pub name: Label,
    pub parameter_count: usize,
    pub body: Vec<TreeStm>,
    pub return_temp: Temp,
}

#[derive(Debug, Clone)]
pub struct TreeProgram {
    pub functions: Vec<TreeFunction>,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Plus => "PLUS",
            BinOp::Minus => "MINUS",
            BinOp::Mul => "MUL",
            BinOp::Div => "DIV",
            BinOp::And => "AND",
            BinOp::Or => "OR",
            BinOp::LShift => "LSHIFT",
            BinOp::RShift => "RSHIFT",
            BinOp::ARShift => "ARSHIFT",
            BinOp::Xor => "XOR",
        };
        f.write_str(s)
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelOp::Eq => "EQ",
            RelOp::Ne => "NE",
            RelOp::Lt => "LT",
            RelOp::Gt => "GT",
            RelOp::Le => "LE",
            RelOp::Ge => "GE",
            RelOp::Ult => "ULT",
            RelOp::Ule => "ULE",
            RelOp::Ugt => "UGT",
            RelOp::Uge => "UGE",
        };
        f.write_str(s)
    }
}

impl fmt::Display for TreeExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeExp::Const(v) => write!(f, "CONST({})", v),
            TreeExp::Name(l) => write!(f, "NAME({})", l),
            TreeExp::Temp(t) => write!(f, "TEMP({})", t),
            TreeExp::Param(n) => write!(f, "PARAM({})", n),
            TreeExp::Mem(addr) => write!(f, "MEM({})", addr),
            TreeExp::BinOp(op, l, r) => write!(f, "BINOP({}, {}, {})", op, l, r),
            TreeExp::Call(fun, args) => {
                write!(f, "CALL({}", fun)?;
                for a in args {
                    write!(f, ", {}", a)?;
                }
                write!(f, ")")
            }
            TreeExp::ESeq(stms, exp) => {
                write!(f, "ESEQ([")?;
                for (i, s) in stms.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", s)?;
                }
                write!(f, "], {})", exp)
            }
        }
    }
}

impl fmt::Display for TreeStm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeStm::Move(dst, src) => write!(f, "MOVE({}, {})", dst, src),
            TreeStm::Jump(target, _) => write!(f, "JUMP({})", target),
            TreeStm::CJump(rel, l, r, t, fl) => {
                write!(f, "CJUMP({}, {}, {}, {}, {})", rel, l, r, t, fl)
            }
            TreeStm::Label(l) => write!(f, "LABEL({})", l),
            TreeStm::Seq(stms) => {
                write!(f, "SEQ(")?;
                for (i, s) in stms.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", s)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for TreeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}({} params) -> {}:", self.name, self.parameter_count, self.return_temp)?;
        for s in &self.body {
            writeln!(f, "  {}", s)?;
        }
        Ok(())
    }
}

impl fmt::Display for TreeProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fun in &self.functions {
            writeln!(f, "{}", fun)?;
        }
        Ok(())
    }
}
