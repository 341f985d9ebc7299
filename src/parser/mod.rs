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

mod ast_builder;

use pest::Parser;
use pest_derive::Parser;

use crate::ast::Program;
use crate::errors::CompileError;
use ast_builder::AstBuilder;

// Derive the parser from our grammar file.
#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct MiniJavaParser;

// Main parsing function that takes the entire source code string.
pub fn parse_source(source: &str) -> Result<Program, CompileError> {
    let mut pairs = MiniJavaParser::parse(Rule::program, source)
        .map_err(CompileError::from_pest)?;
    let program = pairs.next().expect("the program rule always matches once");
    AstBuilder::new(program).build_program()
}

// ------------- unit tests -------------
