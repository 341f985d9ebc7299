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

//! Translation from MiniJava to the tree intermediate language.
//!
//! Translation of types:
//! - int -> int32
//! - boolean -> int32: 0 = false, 1 = true
//! - int[] -> int32: address of a memory block containing
//!   length, a[0], ..., a[length-1] (all int32 values)
//! - object -> int32: address of a memory block containing
//!   class-id, field1, ..., fieldn (all int32 values)
//!
//! A method `A f(B x, C y)` in class `D` becomes the function
//! `LD$f(this, x, y)`.

use std::collections::HashMap;

use crate::ast::{Exp, ExpBinOp, ExpKind, MainClassDecl, MethodDecl, Program, Stm, StmKind, Type};
use crate::backend::x86::WORD_SIZE;
use crate::symbol_table::{ClassSymbol, MethodSymbol, SymbolTable};
use crate::typecheck;

use super::names::{Label, Temp};
use super::tree::{BinOp, RelOp, TreeExp, TreeFunction, TreeProgram, TreeStm};

/// Translates a type-checked program.
pub fn translate(symbols: &SymbolTable, prg: &Program) -> TreeProgram {
    let mut functions = Vec::new();
    for cd in &prg.classes {
        let cs = symbols
            .classes()
            .get(&cd.class_name)
            .expect("the symbol table lists every class");
        for md in &cd.methods {
            functions.push(translate_method(symbols, cs, md));
        }
    }
    functions.push(translate_main(symbols, &prg.main_class));
    TreeProgram { functions }
}

fn translate_method(symbols: &SymbolTable, cs: &ClassSymbol, md: &MethodDecl) -> TreeFunction {
    let ms = cs
        .methods()
        .get(&md.method_name)
        .expect("the symbol table lists every method");
    let mut tr = Translator::new(symbols, cs, ms, &md.locals);

    let ret = Temp::fresh();
    let mut body = vec![tr.stm(&md.body)];
    body.push(TreeStm::Move(TreeExp::Temp(ret), tr.exp(&md.return_exp)));
    tr.append_raise_block(&mut body);

    TreeFunction {
        name: function_name(cs.name(), &md.method_name),
        parameter_count: 1 + md.parameters.len(),
        body,
        return_temp: ret,
    }
}

fn translate_main(symbols: &SymbolTable, mcd: &MainClassDecl) -> TreeFunction {
    let cs = symbols
        .classes()
        .get(&mcd.class_name)
        .expect("the symbol table lists the main class");
    let ms = cs
        .methods()
        .get(&"main".to_string())
        .expect("the main class has a main method");
    let mut tr = Translator::new(symbols, cs, ms, &[]);

    let ret = Temp::fresh();
    let mut body = vec![tr.stm(&mcd.main_body)];
    // main returns 0 to the runtime.
    body.push(TreeStm::Move(TreeExp::Temp(ret), TreeExp::Const(0)));
    tr.append_raise_block(&mut body);

    TreeFunction {
        name: Label::named("Lmain"),
        parameter_count: 1,
        body,
        return_temp: ret,
    }
}

struct Translator<'a> {
    symbols: &'a SymbolTable,
    class_symbol: &'a ClassSymbol,
    method_symbol: &'a MethodSymbol,
    local_temps: HashMap<String, Temp>,
}

impl<'a> Translator<'a> {
    fn new(
        symbols: &'a SymbolTable,
        class_symbol: &'a ClassSymbol,
        method_symbol: &'a MethodSymbol,
        locals: &[crate::ast::VarDecl],
    ) -> Self {
        let local_temps = locals
            .iter()
            .map(|l| (l.var_name.clone(), Temp::fresh()))
            .collect();
        Translator { symbols, class_symbol, method_symbol, local_temps }
    }

    ///////////////////////////////////////////////////////////////////
    // Statements
    ///////////////////////////////////////////////////////////////////

    fn stm(&mut self, stm: &Stm) -> TreeStm {
        match &stm.kind {
            StmKind::Assignment { id, exp } => {
                let x = self.var_lexp(id);
                let e = self.exp(exp);
                TreeStm::Move(x, e)
            }
            StmKind::ArrayAssignment { id, index, exp } => {
                let raise = self.raise_label();
                let array = self.var_lexp(id);
                let index = self.exp(index);
                let (mut stms, elem) = array_deref(array, index, raise);
                stms.push(TreeStm::Move(elem, self.exp(exp)));
                TreeStm::Seq(stms)
            }
            StmKind::If { cond, true_branch, false_branch } => {
                let l_true = Label::fresh();
                let l_false = Label::fresh();
                let l_end = Label::fresh();
                TreeStm::Seq(vec![
                    self.cond(cond, &l_true, &l_false),
                    TreeStm::Label(l_true),
                    self.stm(true_branch),
                    TreeStm::jump_to(l_end.clone()),
                    TreeStm::Label(l_false),
                    self.stm(false_branch),
                    TreeStm::Label(l_end),
                ])
            }
            StmKind::While { cond, body } => {
                let l_loop = Label::fresh();
                let l_true = Label::fresh();
                let l_end = Label::fresh();
                TreeStm::Seq(vec![
                    TreeStm::Label(l_loop.clone()),
                    self.cond(cond, &l_true, &l_end),
                    TreeStm::Label(l_true),
                    self.stm(body),
                    TreeStm::jump_to(l_loop),
                    TreeStm::Label(l_end),
                ])
            }
            StmKind::Print(exp) => {
                let arg = self.exp(exp);
                TreeStm::Move(
                    TreeExp::Temp(Temp::fresh()),
                    call(Label::named("L_println_int"), vec![arg]),
                )
            }
            StmKind::Write(exp) => {
                let arg = self.exp(exp);
                TreeStm::Move(
                    TreeExp::Temp(Temp::fresh()),
                    call(Label::named("L_write"), vec![arg]),
                )
            }
            StmKind::Seq(stms) => TreeStm::Seq(stms.iter().map(|s| self.stm(s)).collect()),
        }
    }

    ///////////////////////////////////////////////////////////////////
    // Expressions
    ///////////////////////////////////////////////////////////////////

    fn exp(&mut self, exp: &Exp) -> TreeExp {
        match &exp.kind {
            ExpKind::Num(n) => TreeExp::Const(*n),
            ExpKind::Id(id) => self.var_lexp(id),
            ExpKind::BinOp(left, op, right) => {
                let op = match op {
                    ExpBinOp::Plus => BinOp::Plus,
                    ExpBinOp::Minus => BinOp::Minus,
                    ExpBinOp::Mul => BinOp::Mul,
                    ExpBinOp::Div => BinOp::Div,
                    // Boolean-valued operators materialize through the
                    // condition translation.
                    ExpBinOp::Lt | ExpBinOp::StrictAnd => {
                        return self.cond_as_value(exp);
                    }
                };
                TreeExp::BinOp(op, Box::new(self.exp(left)), Box::new(self.exp(right)))
            }
            ExpKind::Invoke { obj, method, args } => {
                let ty = typecheck::type_of(self.symbols, self.class_symbol, self.method_symbol, obj)
                    .expect("the program is type-checked");
                let Type::Class(cls) = ty else {
                    unreachable!("method receiver must have class type");
                };
                let mut call_args = vec![self.exp(obj)];
                for a in args {
                    call_args.push(self.exp(a));
                }
                call(function_name(&cls, method), call_args)
            }
            ExpKind::ArrayGet { array, index } => {
                let raise = self.raise_label();
                let array = self.exp(array);
                let index = self.exp(index);
                let (stms, elem) = array_deref(array, index, raise);
                TreeExp::ESeq(stms, Box::new(elem))
            }
            ExpKind::ArrayLength(array) => array_length(self.exp(array)),
            ExpKind::True => TreeExp::Const(1),
            ExpKind::False => TreeExp::Const(0),
            ExpKind::This => this_address(),
            ExpKind::New(cls) => new_object(self.symbols, cls),
            ExpKind::NewIntArray(size) => new_int_array(self.exp(size)),
            ExpKind::Not(inner) => TreeExp::BinOp(
                BinOp::Minus,
                Box::new(TreeExp::Const(1)),
                Box::new(self.exp(inner)),
            ),
            ExpKind::Read => call(Label::named("L_read"), vec![]),
        }
    }

    /// A boolean expression used as a value: a fresh temp starts at 0, the
    /// true branch sets it to 1, the false branch falls through.
    fn cond_as_value(&mut self, exp: &Exp) -> TreeExp {
        let t = Temp::fresh();
        let l_true = Label::fresh();
        let l_false = Label::fresh();
        let stms = vec![
            TreeStm::Move(TreeExp::Temp(t), TreeExp::Const(0)),
            self.cond(exp, &l_true, &l_false),
            TreeStm::Label(l_true),
            TreeStm::Move(TreeExp::Temp(t), TreeExp::Const(1)),
            TreeStm::Label(l_false),
        ];
        TreeExp::ESeq(stms, Box::new(TreeExp::Temp(t)))
    }

    ///////////////////////////////////////////////////////////////////
    // Conditions
    ///////////////////////////////////////////////////////////////////

    /// Compiles a boolean expression into pure control flow that reaches
    /// `l_true` or `l_false`.
    fn cond(&mut self, exp: &Exp, l_true: &Label, l_false: &Label) -> TreeStm {
        match &exp.kind {
            ExpKind::BinOp(left, ExpBinOp::StrictAnd, right) => {
                let l = Label::fresh();
                TreeStm::Seq(vec![
                    self.cond(left, &l, l_false),
                    TreeStm::Label(l),
                    self.cond(right, l_true, l_false),
                ])
            }
            ExpKind::BinOp(left, ExpBinOp::Lt, right) => {
                let tl = Temp::fresh();
                let tr = Temp::fresh();
                let left = self.exp(left);
                let right = self.exp(right);
                TreeStm::Seq(vec![
                    TreeStm::Move(TreeExp::Temp(tl), left),
                    TreeStm::Move(TreeExp::Temp(tr), right),
                    TreeStm::CJump(
                        RelOp::Lt,
                        TreeExp::Temp(tl),
                        TreeExp::Temp(tr),
                        l_true.clone(),
                        l_false.clone(),
                    ),
                ])
            }
            ExpKind::True => TreeStm::jump_to(l_true.clone()),
            ExpKind::False => TreeStm::jump_to(l_false.clone()),
            ExpKind::Not(inner) => self.cond(inner, l_false, l_true),
            ExpKind::Id(_) | ExpKind::Invoke { .. } => self.generic_cond(exp, l_true, l_false),
            kind => unreachable!("{:?} cannot have boolean type", kind),
        }
    }

    /// Any other boolean value: evaluate and compare against 1.
    fn generic_cond(&mut self, exp: &Exp, l_true: &Label, l_false: &Label) -> TreeStm {
        let t = Temp::fresh();
        let value = self.exp(exp);
        TreeStm::Seq(vec![
            TreeStm::Move(TreeExp::Temp(t), value),
            TreeStm::CJump(
                RelOp::Eq,
                TreeExp::Temp(t),
                TreeExp::Const(1),
                l_true.clone(),
                l_false.clone(),
            ),
        ])
    }

    ///////////////////////////////////////////////////////////////////
    // Helpers
    ///////////////////////////////////////////////////////////////////

    /// The l-value of a named variable: a local temp, a parameter slot, or
    /// a field of `this`.
    fn var_lexp(&self, id: &str) -> TreeExp {
        if let Some(t) = self.local_temps.get(id) {
            return TreeExp::Temp(*t);
        }
        let params = self.method_symbol.parameters().keys();
        if let Some(i) = params.iter().position(|p| p == id) {
            // Parameter 0 is `this`.
            return TreeExp::Param(i as i32 + 1);
        }
        let fields = self.class_symbol.fields().keys();
        let Some(i) = fields.iter().position(|f| f == id) else {
            unreachable!("variable {} exists by type-correctness", id);
        };
        TreeExp::Mem(Box::new(field_address(this_address(), i as i32)))
    }

    fn raise_label(&self) -> Label {
        raise_block_name(self.class_symbol.name(), self.method_symbol.name())
    }

    /// Appends the per-method raise block: an unreachable loop around
    /// `L_raise(1)`, targeted by the array bounds checks.
    fn append_raise_block(&self, stms: &mut Vec<TreeStm>) {
        let end = Label::fresh();
        let raise = self.raise_label();
        stms.push(TreeStm::jump_to(end.clone()));
        stms.push(TreeStm::Label(raise.clone()));
        stms.push(TreeStm::Move(
            TreeExp::Temp(Temp::fresh()),
            call(Label::named("L_raise"), vec![TreeExp::Const(1)]),
        ));
        stms.push(TreeStm::jump_to(raise));
        stms.push(TreeStm::Label(end));
    }
}

///////////////////////////////////////////////////////////////////
// Runtime conventions
///////////////////////////////////////////////////////////////////

fn call(fun: Label, args: Vec<TreeExp>) -> TreeExp {
    TreeExp::Call(Box::new(TreeExp::Name(fun)), args)
}

/// Mangled name of a translated method.
fn function_name(class_name: &str, method_name: &str) -> Label {
    Label::named(format!("L{}${}", class_name, method_name))
}

/// Label of the per-method raise block.
fn raise_block_name(class_name: &str, method_name: &str) -> Label {
    Label::named(format!("L{}${}$raise", class_name, method_name))
}

fn this_address() -> TreeExp {
    TreeExp::Param(0)
}

/// Address of field `n`: the class-id slot occupies offset 0.
fn field_address(obj: TreeExp, n: i32) -> TreeExp {
    TreeExp::BinOp(
        BinOp::Plus,
        Box::new(obj),
        Box::new(TreeExp::Const((n + 1) * WORD_SIZE)),
    )
}

/// Address of element `ei` of the array at `ea`: the length occupies
/// offset 0, so the element sits at `ea + (ei + 1) * 4`.
fn array_addr(ea: TreeExp, ei: TreeExp) -> TreeExp {
    let len1 = TreeExp::BinOp(BinOp::Plus, Box::new(ei), Box::new(TreeExp::Const(1)));
    let offset = TreeExp::BinOp(BinOp::Mul, Box::new(len1), Box::new(TreeExp::Const(WORD_SIZE)));
    TreeExp::BinOp(BinOp::Plus, Box::new(ea), Box::new(offset))
}

fn array_length(ea: TreeExp) -> TreeExp {
    TreeExp::Mem(Box::new(ea))
}

/// Bounds-checked array element access, shared by reads and writes.
/// Returns the checking statements and the element l-value; out-of-bounds
/// indices jump to `l_raise`.
fn array_deref(ea: TreeExp, ei: TreeExp, l_raise: Label) -> (Vec<TreeStm>, TreeExp) {
    if let TreeExp::Const(c) = ei {
        if c < 0 {
            // Statically out of bounds; the value is never used.
            let stms = vec![TreeStm::jump_to(l_raise)];
            return (stms, TreeExp::Temp(Temp::fresh()));
        }
        // A constant index needs no lower bound check.
        let ta = Temp::fresh();
        let l_ok = Label::fresh();
        let stms = vec![
            TreeStm::Move(TreeExp::Temp(ta), ea),
            TreeStm::CJump(
                RelOp::Lt,
                TreeExp::Const(c),
                array_length(TreeExp::Temp(ta)),
                l_ok.clone(),
                l_raise,
            ),
            TreeStm::Label(l_ok),
        ];
        let elem = TreeExp::Mem(Box::new(array_addr(TreeExp::Temp(ta), TreeExp::Const(c))));
        return (stms, elem);
    }

    let ta = Temp::fresh();
    let ti = Temp::fresh();
    let l_check_upper = Label::fresh();
    let l_ok = Label::fresh();
    let stms = vec![
        TreeStm::Move(TreeExp::Temp(ta), ea),
        TreeStm::Move(TreeExp::Temp(ti), ei),
        TreeStm::CJump(
            RelOp::Ge,
            TreeExp::Temp(ti),
            TreeExp::Const(0),
            l_check_upper.clone(),
            l_raise.clone(),
        ),
        TreeStm::Label(l_check_upper),
        TreeStm::CJump(
            RelOp::Lt,
            TreeExp::Temp(ti),
            array_length(TreeExp::Temp(ta)),
            l_ok.clone(),
            l_raise,
        ),
        TreeStm::Label(l_ok),
    ];
    let elem = TreeExp::Mem(Box::new(array_addr(
        TreeExp::Temp(ta),
        TreeExp::Temp(ti),
    )));
    (stms, elem)
}

fn new_object(symbols: &SymbolTable, cls: &str) -> TreeExp {
    let cs = symbols
        .classes()
        .get(&cls.to_string())
        .expect("the program is type-checked");
    let size = 1 + cs.fields().len() as i32;
    call(
        Label::named("L_halloc"),
        vec![TreeExp::Const(size * WORD_SIZE)],
    )
}

/// Allocates `(n + 1)` words and stores the length at offset 0.
fn new_int_array(len: TreeExp) -> TreeExp {
    let tlen = Temp::fresh();
    let taddr = Temp::fresh();
    let size = TreeExp::BinOp(
        BinOp::Mul,
        Box::new(TreeExp::Const(WORD_SIZE)),
        Box::new(TreeExp::BinOp(
            BinOp::Plus,
            Box::new(TreeExp::Temp(tlen)),
            Box::new(TreeExp::Const(1)),
        )),
    );
    let stms = vec![
        TreeStm::Move(TreeExp::Temp(tlen), len),
        TreeStm::Move(TreeExp::Temp(taddr), call(Label::named("L_halloc"), vec![size])),
        TreeStm::Move(
            TreeExp::Mem(Box::new(TreeExp::Temp(taddr))),
            TreeExp::Temp(tlen),
        ),
    ];
    TreeExp::ESeq(stms, Box::new(TreeExp::Temp(taddr)))
}
