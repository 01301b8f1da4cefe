// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! BotForge - ahead-of-time compiler for bot programs.
//!
//! Compiles textual bot programs to `.pbo` containers and NetBots graph
//! JSON to `.nbo` containers.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

/// botforge - compile bot programs to bytecode containers
#[derive(Parser, Debug)]
#[command(name = "botforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a textual bot program to a .pbo container
    #[command(alias = "p")]
    Program {
        /// Source file
        input: PathBuf,
        /// Output file (defaults to the input with a .pbo extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile a NetBots graph (JSON) to a .nbo container
    #[command(alias = "n")]
    Netbots {
        /// Graph JSON file
        input: PathBuf,
        /// Output file (defaults to the input with a .nbo extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Lex, parse, and analyze a program without emitting a container
    Check {
        /// Source file
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{} {}", "error:".red().bold(), message);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), String> {
    match command {
        Commands::Program { input, output } => {
            let source = read(&input)?;
            let container =
                botforge_compiler::compile_program(&source).map_err(|e| e.to_string())?;
            let output = output.unwrap_or_else(|| input.with_extension("pbo"));
            write(&output, &container)?;
            println!("{} {}", "compiled".green(), output.display());
            Ok(())
        }
        Commands::Netbots { input, output } => {
            let json = read(&input)?;
            let container =
                botforge_compiler::compile_netbots(&json).map_err(|e| e.to_string())?;
            let output = output.unwrap_or_else(|| input.with_extension("nbo"));
            write(&output, &container)?;
            println!("{} {}", "compiled".green(), output.display());
            Ok(())
        }
        Commands::Check { input } => {
            let source = read(&input)?;
            botforge_compiler::analyze_program(&source).map_err(|e| e.to_string())?;
            println!("{} {}", "ok".green(), input.display());
            Ok(())
        }
    }
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), String> {
    std::fs::write(path, bytes).map_err(|e| format!("cannot write {}: {}", path.display(), e))
}
