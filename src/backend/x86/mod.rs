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

//! The x86 target: registers, pseudo-instructions, instruction selection
//! and assembly printing.

pub mod emit;
pub mod function;
pub mod instr;
pub mod muncher;
pub mod registers;

pub use muncher::codegen;

/// Word size of the 32-bit target, in bytes.
pub const WORD_SIZE: i32 = 4;
