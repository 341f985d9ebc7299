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

//! Type checking of MiniJava programs. Errors are reported as
//! [`CompileError`] values with the offending source span.

use crate::ast::*;
use crate::errors::CompileError;
use crate::symbol_table::{ClassSymbol, MethodSymbol, SymbolTable};

/// Type-checks a whole program.
pub fn typecheck(symbols: &SymbolTable, prg: &Program) -> Result<(), CompileError> {
    typecheck_main_class(symbols, &prg.main_class)?;
    for cd in &prg.classes {
        typecheck_class(symbols, cd)?;
    }
    Ok(())
}

/// The type of an expression within a particular method. The program must
/// already have passed name resolution for the lookup to succeed.
pub fn type_of(
    symbols: &SymbolTable,
    class_symbol: &ClassSymbol,
    method_symbol: &MethodSymbol,
    exp: &Exp,
) -> Result<Type, CompileError> {
    ExpTyper { symbols, class_symbol, method_symbol }.type_of(exp)
}

/// A type is well-formed if it mentions only defined classes.
fn check_type_well_formed(
    symbols: &SymbolTable,
    ty: &Type,
    location: Option<Location>,
) -> Result<(), CompileError> {
    match ty {
        Type::Void | Type::Int | Type::Bool => Ok(()),
        Type::Array(elem) => check_type_well_formed(symbols, elem, location),
        Type::Class(name) => {
            if symbols.classes().contains(name) {
                Ok(())
            } else {
                Err(CompileError::at(
                    format!("Use of undefined class {}.", name),
                    location,
                ))
            }
        }
    }
}

fn lookup_id(
    class_symbol: &ClassSymbol,
    method_symbol: &MethodSymbol,
    id: &String,
) -> Option<Type> {
    method_symbol
        .locals()
        .get(id)
        .or_else(|| method_symbol.parameters().get(id))
        .or_else(|| class_symbol.fields().get(id))
        .cloned()
}

/// Type inference for expressions.
struct ExpTyper<'a> {
    symbols: &'a SymbolTable,
    class_symbol: &'a ClassSymbol,
    method_symbol: &'a MethodSymbol,
}

impl ExpTyper<'_> {
    fn expect(&self, exp: &Exp, expected: &Type) -> Result<(), CompileError> {
        let actual = self.type_of(exp)?;
        if actual != *expected {
            return Err(CompileError::at(
                format!(
                    "Expression has type {}, but type {} is expected.",
                    actual, expected
                ),
                exp.location,
            ));
        }
        Ok(())
    }

    fn type_of(&self, exp: &Exp) -> Result<Type, CompileError> {
        match &exp.kind {
            ExpKind::Num(_) => Ok(Type::Int),
            ExpKind::Id(id) => {
                lookup_id(self.class_symbol, self.method_symbol, id).ok_or_else(|| {
                    CompileError::at(format!("Undeclared variable {}.", id), exp.location)
                })
            }
            ExpKind::BinOp(left, op, right) => match op {
                ExpBinOp::Plus | ExpBinOp::Minus | ExpBinOp::Mul | ExpBinOp::Div => {
                    self.expect(left, &Type::Int)?;
                    self.expect(right, &Type::Int)?;
                    Ok(Type::Int)
                }
                ExpBinOp::Lt => {
                    self.expect(left, &Type::Int)?;
                    self.expect(right, &Type::Int)?;
                    Ok(Type::Bool)
                }
                ExpBinOp::StrictAnd => {
                    self.expect(left, &Type::Bool)?;
                    self.expect(right, &Type::Bool)?;
                    Ok(Type::Bool)
                }
            },
            ExpKind::Invoke { obj, method, args } => {
                let tobj = self.type_of(obj)?;
                let Type::Class(cls) = tobj else {
                    return Err(CompileError::at(
                        format!("Expression has type {}, but class type is required.", tobj),
                        obj.location,
                    ));
                };
                // The type checker only returns well-formed types.
                let cd = self
                    .symbols
                    .classes()
                    .get(&cls)
                    .expect("class types are well-formed");
                let Some(md) = cd.methods().get(method) else {
                    return Err(CompileError::at(
                        format!("Call of undefined method {}.{}.", cls, method),
                        exp.location,
                    ));
                };

                // Check argument types against the parameter list.
                let mut args_iter = args.iter();
                for pi in md.parameters().keys() {
                    let Some(arg) = args_iter.next() else {
                        return Err(CompileError::at(
                            "Method call has too few arguments.",
                            exp.location,
                        ));
                    };
                    self.expect(arg, md.parameters().get(pi).unwrap())?;
                }
                if args_iter.next().is_some() {
                    return Err(CompileError::at(
                        "Method call has too many arguments.",
                        exp.location,
                    ));
                }
                Ok(md.return_type().clone())
            }
            ExpKind::ArrayGet { array, index } => {
                self.expect(array, &Type::Array(Box::new(Type::Int)))?;
                self.expect(index, &Type::Int)?;
                Ok(Type::Int)
            }
            ExpKind::ArrayLength(array) => {
                self.expect(array, &Type::Array(Box::new(Type::Int)))?;
                Ok(Type::Int)
            }
            ExpKind::True | ExpKind::False => Ok(Type::Bool),
            ExpKind::This => {
                if self.method_symbol.is_static() {
                    return Err(CompileError::at(
                        "Cannot use `this` in static context.",
                        exp.location,
                    ));
                }
                Ok(Type::Class(self.class_symbol.name().to_string()))
            }
            ExpKind::New(cls) => {
                if !self.symbols.classes().contains(cls) {
                    return Err(CompileError::at(
                        format!("Undefined class {}.", cls),
                        exp.location,
                    ));
                }
                Ok(Type::Class(cls.clone()))
            }
            ExpKind::NewIntArray(size) => {
                self.expect(size, &Type::Int)?;
                Ok(Type::Array(Box::new(Type::Int)))
            }
            ExpKind::Not(inner) => {
                self.expect(inner, &Type::Bool)?;
                Ok(Type::Bool)
            }
            ExpKind::Read => Ok(Type::Int),
        }
    }
}

/// Type checking for statements.
struct StmChecker<'a> {
    class_symbol: &'a ClassSymbol,
    method_symbol: &'a MethodSymbol,
    typer: ExpTyper<'a>,
}

impl StmChecker<'_> {
    fn check(&self, stm: &Stm) -> Result<(), CompileError> {
        match &stm.kind {
            StmKind::Assignment { id, exp } => {
                let Some(tid) = lookup_id(self.class_symbol, self.method_symbol, id) else {
                    return Err(CompileError::at(
                        format!("Undeclared variable {}.", id),
                        stm.location,
                    ));
                };
                let texp = self.typer.type_of(exp)?;
                if tid != texp {
                    return Err(CompileError::at(
                        format!(
                            "Assignment of expression of type {} to variable of type {}.",
                            texp, tid
                        ),
                        stm.location,
                    ));
                }
                Ok(())
            }
            StmKind::ArrayAssignment { id, index, exp } => {
                let Some(tid) = lookup_id(self.class_symbol, self.method_symbol, id) else {
                    return Err(CompileError::at(
                        format!("Undeclared variable {}.", id),
                        stm.location,
                    ));
                };
                let Type::Array(elem) = tid else {
                    return Err(CompileError::at(
                        format!("Variable {} must have array type.", id),
                        stm.location,
                    ));
                };
                self.typer.expect(index, &Type::Int)?;
                self.typer.expect(exp, &elem)
            }
            StmKind::If { cond, true_branch, false_branch } => {
                self.typer.expect(cond, &Type::Bool)?;
                self.check(true_branch)?;
                self.check(false_branch)
            }
            StmKind::While { cond, body } => {
                self.typer.expect(cond, &Type::Bool)?;
                self.check(body)
            }
            StmKind::Print(exp) | StmKind::Write(exp) => self.typer.expect(exp, &Type::Int),
            StmKind::Seq(stms) => {
                for s in stms {
                    self.check(s)?;
                }
                Ok(())
            }
        }
    }
}

/// Whether evaluating an expression may raise an IOException.
fn exp_throws(
    symbols: &SymbolTable,
    class_symbol: &ClassSymbol,
    method_symbol: &MethodSymbol,
    exp: &Exp,
) -> Result<bool, CompileError> {
    let throws = |e: &Exp| exp_throws(symbols, class_symbol, method_symbol, e);
    match &exp.kind {
        ExpKind::Num(_)
        | ExpKind::Id(_)
        | ExpKind::True
        | ExpKind::False
        | ExpKind::This
        | ExpKind::New(_) => Ok(false),
        ExpKind::BinOp(left, _, right) => Ok(throws(left)? || throws(right)?),
        ExpKind::Invoke { obj, args, method } => {
            let mut result = throws(obj)?;
            for arg in args {
                result |= throws(arg)?;
            }
            let tobj = type_of(symbols, class_symbol, method_symbol, obj)?;
            let Type::Class(cls) = tobj else {
                unreachable!("the receiver was checked to have class type");
            };
            let cd = symbols.classes().get(&cls).expect("class types are well-formed");
            let md = cd.methods().get(method).expect("the call was checked");
            Ok(result || md.throws_io_exception())
        }
        ExpKind::ArrayGet { array, index } => Ok(throws(array)? || throws(index)?),
        ExpKind::ArrayLength(array) => throws(array),
        ExpKind::NewIntArray(size) => throws(size),
        ExpKind::Not(inner) => throws(inner),
        ExpKind::Read => Ok(true),
    }
}

fn stm_throws(
    symbols: &SymbolTable,
    class_symbol: &ClassSymbol,
    method_symbol: &MethodSymbol,
    stm: &Stm,
) -> Result<bool, CompileError> {
    let ethrows = |e: &Exp| exp_throws(symbols, class_symbol, method_symbol, e);
    let sthrows = |s: &Stm| stm_throws(symbols, class_symbol, method_symbol, s);
    match &stm.kind {
        StmKind::Assignment { exp, .. } => ethrows(exp),
        StmKind::ArrayAssignment { index, exp, .. } => Ok(ethrows(index)? || ethrows(exp)?),
        StmKind::If { cond, true_branch, false_branch } => {
            Ok(ethrows(cond)? || sthrows(true_branch)? || sthrows(false_branch)?)
        }
        StmKind::While { cond, body } => Ok(ethrows(cond)? || sthrows(body)?),
        StmKind::Print(exp) | StmKind::Write(exp) => ethrows(exp),
        StmKind::Seq(stms) => {
            let mut result = false;
            for s in stms {
                result |= sthrows(s)?;
            }
            Ok(result)
        }
    }
}

fn typecheck_method(
    symbols: &SymbolTable,
    cs: &ClassSymbol,
    md: &MethodDecl,
) -> Result<(), CompileError> {
    let ms = cs
        .methods()
        .get(&md.method_name)
        .expect("the symbol table lists every method");

    for p in &md.parameters {
        check_type_well_formed(symbols, &p.var_type, p.location)?;
    }
    for l in &md.locals {
        check_type_well_formed(symbols, &l.var_type, l.location)?;
    }

    let checker = StmChecker {
        class_symbol: cs,
        method_symbol: ms,
        typer: ExpTyper { symbols, class_symbol: cs, method_symbol: ms },
    };
    checker.check(&md.body)?;

    let return_type = type_of(symbols, cs, ms, &md.return_exp)?;
    if return_type != md.return_type {
        return Err(CompileError::at(
            format!(
                "The return expression has type {}, but the method's return type is {}.",
                return_type, md.return_type
            ),
            md.return_exp.location,
        ));
    }

    let throws = stm_throws(symbols, cs, ms, &md.body)?
        || exp_throws(symbols, cs, ms, &md.return_exp)?;
    if throws && !ms.throws_io_exception() {
        return Err(CompileError::at(
            "Method body may throw IOException, which is not declared.",
            md.location,
        ));
    }
    Ok(())
}

fn typecheck_class(symbols: &SymbolTable, cd: &ClassDecl) -> Result<(), CompileError> {
    let cs = symbols
        .classes()
        .get(&cd.class_name)
        .expect("the symbol table lists every class");

    for f in &cd.fields {
        check_type_well_formed(symbols, &f.var_type, f.location)?;
    }
    for md in &cd.methods {
        typecheck_method(symbols, cs, md)?;
    }
    Ok(())
}

fn typecheck_main_class(
    symbols: &SymbolTable,
    mcd: &MainClassDecl,
) -> Result<(), CompileError> {
    let cs = symbols
        .classes()
        .get(&mcd.class_name)
        .expect("the symbol table lists the main class");
    let ms = cs
        .methods()
        .get(&"main".to_string())
        .expect("the main class has a main method");

    let checker = StmChecker {
        class_symbol: cs,
        method_symbol: ms,
        typer: ExpTyper { symbols, class_symbol: cs, method_symbol: ms },
    };
    checker.check(&mcd.main_body)?;

    if stm_throws(symbols, cs, ms, &mcd.main_body)? && !ms.throws_io_exception() {
        return Err(CompileError::at(
            "Method body may throw IOException, which is not declared.",
            mcd.location,
        ));
    }
    Ok(())
}
