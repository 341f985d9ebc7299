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

use crate::ast::{Stm, StmKind};
use crate::errors::CompileError;
use crate::parser::Rule;

use super::AstBuilder;

impl<'a> AstBuilder<'a> {
    pub(super) fn build_statement(mut self) -> Result<Stm, CompileError> {
        let location = self.location;
        let kind = match self.rule {
            Rule::block => {
                let mut stms = Vec::new();
                for p in self.pairs {
                    stms.push(AstBuilder::new(p).build_statement()?);
                }
                StmKind::Seq(stms)
            }
            Rule::if_stm => {
                let cond = self.expect_exp()?;
                let true_branch = self.expect_statement()?;
                let false_branch = self.expect_statement()?;
                StmKind::If {
                    cond,
                    true_branch: Box::new(true_branch),
                    false_branch: Box::new(false_branch),
                }
            }
            Rule::while_stm => {
                let cond = self.expect_exp()?;
                let body = self.expect_statement()?;
                StmKind::While { cond, body: Box::new(body) }
            }
            Rule::println_stm => StmKind::Print(self.expect_exp()?),
            Rule::write_stm => StmKind::Write(self.expect_exp()?),
            Rule::array_assign_stm => {
                let id = self.expect_identifier()?;
                let index = self.expect_exp()?;
                let exp = self.expect_exp()?;
                StmKind::ArrayAssignment { id, index, exp }
            }
            Rule::assign_stm => {
                let id = self.expect_identifier()?;
                let exp = self.expect_exp()?;
                StmKind::Assignment { id, exp }
            }
            r => unreachable!("unexpected statement rule {:?}", r),
        };
        Ok(Stm { kind, location })
    }
}
