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

//! mjc: a compiler from a MiniJava subset to 32-bit x86 assembly.
//!
//! The pipeline is a straight line: parse → symbol table → type check →
//! tree IR → canonize → trace → instruction selection → register
//! allocation → assembly text. Each stage consumes its input and produces
//! a new owned representation.

pub mod ast;
pub mod backend;
pub mod errors;
pub mod intermediate;
pub mod ordered_map;
pub mod parser;
pub mod symbol_table;
pub mod typecheck;

use anyhow::{Context, Result};

/// Compiles MiniJava source text into Intel-syntax x86 assembly.
pub fn compile(source: &str) -> Result<String> {
    // Generated names restart per compilation unit, which keeps the
    // output reproducible.
    intermediate::names::reset();

    let prg = parser::parse_source(source).context("Failed during parsing stage")?;

    let symbols =
        symbol_table::SymbolTable::new(&prg).context("Failed during symbol table construction")?;
    typecheck::typecheck(&symbols, &prg).context("Failed during type checking")?;

    let tree = intermediate::translate::translate(&symbols, &prg);
    let canonized = intermediate::canonizer::canonize(tree);
    let traced = intermediate::tracer::trace(canonized);

    let mut assem = backend::x86::codegen(traced);
    backend::regalloc::allocate(&mut assem);

    Ok(assem.to_string())
}
