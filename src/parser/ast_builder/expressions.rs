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

use crate::ast::{Exp, ExpBinOp, ExpKind};
use crate::errors::CompileError;
use crate::parser::Rule;

use super::{AstBuilder, loc};

impl<'a> AstBuilder<'a> {
    pub(super) fn build_exp(mut self) -> Result<Exp, CompileError> {
        match self.rule {
            Rule::and_exp => self.build_chain(|_| ExpBinOp::StrictAnd),
            Rule::cmp_exp => self.build_chain(|_| ExpBinOp::Lt),
            Rule::add_exp => self.build_chain(|op| match op {
                "+" => ExpBinOp::Plus,
                "-" => ExpBinOp::Minus,
                _ => unreachable!("unknown additive operator {}", op),
            }),
            Rule::mul_exp => self.build_chain(|op| match op {
                "*" => ExpBinOp::Mul,
                "/" => ExpBinOp::Div,
                _ => unreachable!("unknown multiplicative operator {}", op),
            }),
            Rule::not_exp => {
                let location = self.location;
                let inner = self.expect_exp()?;
                Ok(Exp { kind: ExpKind::Not(Box::new(inner)), location })
            }
            Rule::postfix_exp => self.build_postfix_exp(),
            r => unreachable!("unexpected expression rule {:?}", r),
        }
    }

    /// Builds a left-associative chain like `a + b - c`. Operator pairs
    /// carry the lexeme; the single-operator chains (`&&`, `<`) have none
    /// and map through the constant function.
    fn build_chain(
        mut self,
        to_op: impl Fn(&str) -> ExpBinOp,
    ) -> Result<Exp, CompileError> {
        let location = self.location;
        let mut exp = self.expect_exp()?;
        while let Some(p) = self.pairs.next() {
            let (op, rhs) = match p.as_rule() {
                Rule::add_op | Rule::mul_op => (to_op(p.as_str()), self.next_pair()?),
                _ => (to_op(""), p),
            };
            let right = AstBuilder::new(rhs).build_exp()?;
            exp = Exp {
                kind: ExpKind::BinOp(Box::new(exp), op, Box::new(right)),
                location,
            };
        }
        Ok(exp)
    }

    fn build_postfix_exp(mut self) -> Result<Exp, CompileError> {
        let first = self.next_pair()?;
        let mut exp = AstBuilder::new(first).build_primary()?;
        for suffix in self.pairs {
            let location = loc(&suffix);
            exp = match suffix.as_rule() {
                Rule::invoke_suffix => {
                    let mut builder = AstBuilder::new(suffix);
                    let method = builder.expect_identifier()?;
                    let mut args = Vec::new();
                    if let Some(arg_list) = builder.pairs.next() {
                        for a in arg_list.into_inner() {
                            args.push(AstBuilder::new(a).build_exp()?);
                        }
                    }
                    Exp {
                        kind: ExpKind::Invoke { obj: Box::new(exp), method, args },
                        location,
                    }
                }
                Rule::length_suffix => Exp {
                    kind: ExpKind::ArrayLength(Box::new(exp)),
                    location,
                },
                Rule::index_suffix => {
                    let index = AstBuilder::new(suffix).expect_exp()?;
                    Exp {
                        kind: ExpKind::ArrayGet { array: Box::new(exp), index: Box::new(index) },
                        location,
                    }
                }
                r => unreachable!("unexpected postfix rule {:?}", r),
            };
        }
        Ok(exp)
    }

    fn build_primary(mut self) -> Result<Exp, CompileError> {
        let location = self.location;
        let kind = match self.rule {
            Rule::number => {
                let value: i32 = self.text.parse().map_err(|_| {
                    CompileError::at(
                        format!("Integer literal {} is out of range.", self.text),
                        location,
                    )
                })?;
                ExpKind::Num(value)
            }
            Rule::true_lit => ExpKind::True,
            Rule::false_lit => ExpKind::False,
            Rule::this_lit => ExpKind::This,
            Rule::read_exp => ExpKind::Read,
            Rule::new_array_exp => ExpKind::NewIntArray(Box::new(self.expect_exp()?)),
            Rule::new_object_exp => ExpKind::New(self.expect_identifier()?),
            Rule::paren_exp => return self.expect_exp(),
            Rule::identifier => ExpKind::Id(self.text.to_string()),
            r => unreachable!("unexpected primary rule {:?}", r),
        };
        Ok(Exp { kind, location })
    }
}
