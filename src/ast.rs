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

//! Abstract syntax of MiniJava programs.

use std::fmt;

/// A 1-based source span, carried by AST nodes for error reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

/// MiniJava types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Void,
    Int,
    Bool,
    Array(Box<Type>),
    Class(String),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Int => f.write_str("int"),
            Type::Bool => f.write_str("boolean"),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::Class(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpBinOp {
    Plus,
    Minus,
    Mul,
    Div,
    Lt,
    StrictAnd,
}

/// A MiniJava expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Exp {
    pub kind: ExpKind,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpKind {
    Num(i32),
    Id(String),
    BinOp(Box<Exp>, ExpBinOp, Box<Exp>),
    Invoke {
        obj: Box<Exp>,
        method: String,
        args: Vec<Exp>,
    },
    ArrayGet {
        array: Box<Exp>,
        index: Box<Exp>,
    },
    ArrayLength(Box<Exp>),
    True,
    False,
    This,
    New(String),
    NewIntArray(Box<Exp>),
    Not(Box<Exp>),
    Read,
}

/// A MiniJava statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Stm {
    pub kind: StmKind,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmKind {
    Assignment {
        id: String,
        exp: Exp,
    },
    ArrayAssignment {
        id: String,
        index: Exp,
        exp: Exp,
    },
    If {
        cond: Exp,
        true_branch: Box<Stm>,
        false_branch: Box<Stm>,
    },
    While {
        cond: Exp,
        body: Box<Stm>,
    },
    Print(Exp),
    Write(Exp),
    Seq(Vec<Stm>),
}

/// A variable declaration, used for fields, parameters and locals.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub var_name: String,
    pub var_type: Type,
    pub location: Option<Location>,
}

/// One MiniJava method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub method_name: String,
    pub return_type: Type,
    pub parameters: Vec<VarDecl>,
    pub throws_io_exception: bool,
    pub locals: Vec<VarDecl>,
    pub body: Stm,
    pub return_exp: Exp,
    pub location: Option<Location>,
}

/// A class of a MiniJava program.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub class_name: String,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<MethodDecl>,
    pub location: Option<Location>,
}

/// The class with the main function.
#[derive(Debug, Clone, PartialEq)]
pub struct MainClassDecl {
    pub class_name: String,
    pub main_throws_io_exception: bool,
    pub main_body: Stm,
    pub location: Option<Location>,
}

/// A whole MiniJava program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub main_class: MainClassDecl,
    pub classes: Vec<ClassDecl>,
}
