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

//! Converts pest parse trees into the MiniJava AST.

mod expressions;
mod statements;

use std::iter::Peekable;

use pest::iterators::{Pair, Pairs};

use crate::ast::*;
use crate::errors::CompileError;
use crate::parser::Rule;

/// The source span of a pair, 1-based.
fn loc(pair: &Pair<Rule>) -> Option<Location> {
    let span = pair.as_span();
    let (line, column) = span.start_pos().line_col();
    let (end_line, end_column) = span.end_pos().line_col();
    Some(Location { line, column, end_line, end_column })
}

/// Builds AST nodes from pest pairs. A builder wraps a single pair: its
/// rule, its source span and text, and the iterator over its inner pairs.
/// The `build_*` methods consume the builder; the `expect_*` helpers pull
/// the next inner pair and check its shape.
pub struct AstBuilder<'a> {
    location: Option<Location>,
    rule: Rule,
    text: &'a str,
    pairs: Peekable<Pairs<'a, Rule>>,
}

impl<'a> AstBuilder<'a> {
    pub fn new(pair: Pair<'a, Rule>) -> Self {
        let location = loc(&pair);
        AstBuilder {
            location,
            rule: pair.as_rule(),
            text: pair.as_str(),
            pairs: pair.into_inner().peekable(),
        }
    }

    pub fn build_program(mut self) -> Result<Program, CompileError> {
        let mut main_class = None;
        let mut classes = Vec::new();
        while let Some(p) = self.pairs.next() {
            match p.as_rule() {
                Rule::main_class => main_class = Some(AstBuilder::new(p).build_main_class()?),
                Rule::class_decl => classes.push(AstBuilder::new(p).build_class_decl()?),
                Rule::EOI => {}
                r => unreachable!("unexpected rule {:?} in program", r),
            }
        }
        Ok(Program {
            main_class: main_class.expect("the grammar guarantees a main class"),
            classes,
        })
    }

    fn build_main_class(mut self) -> Result<MainClassDecl, CompileError> {
        let location = self.location;
        let class_name = self.expect_identifier()?;
        // The String[] parameter name is fixed by the grammar but unused.
        let _args_name = self.expect_identifier()?;
        let main_throws_io_exception = self.accept_throws_clause();

        let mut stms = Vec::new();
        for p in self.pairs {
            stms.push(AstBuilder::new(p).build_statement()?);
        }
        Ok(MainClassDecl {
            class_name,
            main_throws_io_exception,
            main_body: Stm { kind: StmKind::Seq(stms), location: None },
            location,
        })
    }

    fn build_class_decl(mut self) -> Result<ClassDecl, CompileError> {
        let location = self.location;
        let class_name = self.expect_identifier()?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        for p in self.pairs {
            match p.as_rule() {
                Rule::var_decl => fields.push(AstBuilder::new(p).build_var_decl()?),
                Rule::method_decl => methods.push(AstBuilder::new(p).build_method_decl()?),
                r => unreachable!("unexpected rule {:?} in class", r),
            }
        }
        Ok(ClassDecl { class_name, fields, methods, location })
    }

    fn build_method_decl(mut self) -> Result<MethodDecl, CompileError> {
        let location = self.location;
        let return_type = self.expect_type()?;
        let method_name = self.expect_identifier()?;

        let mut parameters = Vec::new();
        if self.pairs.peek().is_some_and(|p| p.as_rule() == Rule::parameter_list) {
            for param in self.pairs.next().unwrap().into_inner() {
                parameters.push(AstBuilder::new(param).build_parameter()?);
            }
        }

        let throws_io_exception = self.accept_throws_clause();

        let mut locals = Vec::new();
        while self.pairs.peek().is_some_and(|p| p.as_rule() == Rule::var_decl) {
            let decl = self.pairs.next().unwrap();
            locals.push(AstBuilder::new(decl).build_var_decl()?);
        }

        // Everything up to the final expression is the method body.
        let mut rest: Vec<_> = self.pairs.collect();
        let return_pair = rest.pop().expect("the grammar guarantees a return expression");
        let mut stms = Vec::new();
        for p in rest {
            stms.push(AstBuilder::new(p).build_statement()?);
        }
        let return_exp = AstBuilder::new(return_pair).build_exp()?;

        Ok(MethodDecl {
            method_name,
            return_type,
            parameters,
            throws_io_exception,
            locals,
            body: Stm { kind: StmKind::Seq(stms), location: None },
            return_exp,
            location,
        })
    }

    fn build_parameter(mut self) -> Result<VarDecl, CompileError> {
        let var_type = self.expect_type()?;
        let var_name = self.expect_identifier()?;
        Ok(VarDecl { var_name, var_type, location: self.location })
    }

    fn build_var_decl(mut self) -> Result<VarDecl, CompileError> {
        let var_type = self.expect_type()?;
        let var_name = self.expect_identifier()?;
        Ok(VarDecl { var_name, var_type, location: self.location })
    }

    // ------------- expect helpers -------------

    fn next_pair(&mut self) -> Result<Pair<'a, Rule>, CompileError> {
        self.pairs.next().ok_or_else(|| {
            CompileError::at(
                format!("Missing inner element while building {:?}.", self.rule),
                self.location,
            )
        })
    }

    fn expect_pair(&mut self, rule: Rule) -> Result<Pair<'a, Rule>, CompileError> {
        let pair = self.next_pair()?;
        if pair.as_rule() != rule {
            return Err(CompileError::at(
                format!(
                    "Expected {:?} while building {:?}, found {:?}.",
                    rule,
                    self.rule,
                    pair.as_rule()
                ),
                loc(&pair),
            ));
        }
        Ok(pair)
    }

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        Ok(self.expect_pair(Rule::identifier)?.as_str().to_string())
    }

    fn expect_type(&mut self) -> Result<Type, CompileError> {
        let pair = self.next_pair()?;
        let ty = match pair.as_rule() {
            Rule::int_array_type => Type::Array(Box::new(Type::Int)),
            Rule::int_type => Type::Int,
            Rule::bool_type => Type::Bool,
            Rule::class_type => Type::Class(pair.as_str().to_string()),
            r => {
                return Err(CompileError::at(
                    format!("Expected a type, found {:?}.", r),
                    loc(&pair),
                ));
            }
        };
        Ok(ty)
    }

    fn expect_exp(&mut self) -> Result<Exp, CompileError> {
        let pair = self.next_pair()?;
        AstBuilder::new(pair).build_exp()
    }

    fn expect_statement(&mut self) -> Result<Stm, CompileError> {
        let pair = self.next_pair()?;
        AstBuilder::new(pair).build_statement()
    }

    /// Consumes an optional `throws java.io.IOException` clause.
    fn accept_throws_clause(&mut self) -> bool {
        if self.pairs.peek().is_some_and(|p| p.as_rule() == Rule::throws_clause) {
            self.pairs.next();
            return true;
        }
        false
    }
}
