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

use anyhow::{Context, Result};
use clap::Parser as clap_parser;
use mjc::compile;
use mjc::errors::CompileError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(clap_parser)]
#[clap(version = "0.1.0", about = "Compiles a MiniJava source file to x86 assembly")]
struct Opts {
    /// MiniJava source file
    input: PathBuf,
}

fn main() -> ExitCode {
    let opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(1);
        }
    };

    match run(&opts) {
        Ok(target) => {
            println!(
                "Successfully compiled {} to {}",
                opts.input.display(),
                target.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err, &opts.input);
            ExitCode::from(1)
        }
    }
}

fn run(opts: &Opts) -> Result<PathBuf> {
    let source = fs::read_to_string(&opts.input)
        .with_context(|| format!("Failed to read input file: {}", opts.input.display()))?;

    let assem = compile(&source)?;

    let target = output_path(&opts.input);
    fs::write(&target, assem)
        .with_context(|| format!("Failed to write output file: {}", target.display()))?;
    Ok(target)
}

/// The output lands in the current directory, named after the source stem.
fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "out".into());
    PathBuf::from(stem).with_extension("s")
}

fn report(err: &anyhow::Error, input: &Path) {
    // Compile errors get the full located report; everything else is a
    // plain message.
    if let Some(compile_error) = err.root_cause().downcast_ref::<CompileError>() {
        compile_error.report(input);
    } else {
        eprintln!("Error: {:#}", err);
    }
}
