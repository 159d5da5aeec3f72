//! Kernel script to IL compiler CLI
//!
//! Usage:
//!   expr2il kernel.il.txt --threads 128
//!   expr2il -e "uav raw float out 0; out[tid_flat] = 1.0;" --json
//!   cat kernel.txt | expr2il --config device.json -v

use clap::Parser as ClapParser;
use colored::Colorize;
use std::fs;
use std::io::{self, Read};

use expr_to_il::{analyze, CodeGenerator, IlProgram, KernelConfig, Profile};

#[derive(ClapParser, Debug)]
#[command(name = "expr2il")]
#[command(version = "0.1.0")]
#[command(about = "Compiles kernel scripts to GPU intermediate language")]
struct Args {
    /// Kernel script to compile
    #[arg(value_name = "FILE")]
    input_file: Option<String>,

    /// Compile the given script text instead of a file
    #[arg(short = 'e', long = "expr")]
    expression: Option<String>,

    /// JSON file with kernel configuration
    #[arg(short = 'c', long = "config")]
    config_file: Option<String>,

    /// Threads per work-group
    #[arg(short = 't', long = "threads")]
    threads: Option<u32>,

    /// Wavefront (SIMD) width of the target
    #[arg(short = 'w', long = "wavefront")]
    wavefront: Option<u32>,

    /// Shader profile: compute or pixel
    #[arg(short = 'p', long = "profile", value_parser = parse_profile)]
    profile: Option<Profile>,

    /// Output as JSON
    #[arg(short = 'j', long = "json")]
    json_output: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn parse_profile(s: &str) -> Result<Profile, String> {
    Profile::parse(s).ok_or_else(|| format!("Invalid profile: {} (expected compute or pixel)", s))
}

fn fail(what: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", what.red(), err);
    std::process::exit(1);
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    // Get script from argument, file, or stdin
    let source = if let Some(expr) = args.expression {
        expr
    } else if let Some(file) = &args.input_file {
        fs::read_to_string(file)
            .unwrap_or_else(|e| fail("Error", format!("Failed to read file '{}': {}", file, e)))
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .unwrap_or_else(|e| fail("Error", format!("Failed to read stdin: {}", e)));
        buffer
    };

    let base = match &args.config_file {
        Some(file) => {
            let text = fs::read_to_string(file)
                .unwrap_or_else(|e| fail("Error", format!("Failed to read config '{}': {}", file, e)));
            KernelConfig::from_json(&text).unwrap_or_else(|e| fail("Config error", e))
        }
        None => KernelConfig::default(),
    };

    let typed = analyze(&source).unwrap_or_else(|e| fail("Compilation error", e));

    // Script header overrides the config file; flags override both
    let mut config = typed.apply_header(base);
    if let Some(threads) = args.threads {
        config.threads_per_group = threads;
    }
    if let Some(wavefront) = args.wavefront {
        config.wavefront_size = wavefront;
    }
    if let Some(profile) = args.profile {
        config.profile = profile;
    }

    if args.verbose {
        println!("{}", "Kernel Script to IL Compiler".bold().blue());
        println!("{}", "=".repeat(35));
        println!();
        println!(
            "{}: {} ({} threads per group, wavefront {})",
            "Target".green(),
            config.profile,
            config.threads_per_group,
            config.wavefront_size
        );
        println!();
    }

    let mut codegen = CodeGenerator::new(config);
    let program = codegen
        .generate(typed)
        .unwrap_or_else(|e| fail("Code generation error", e));

    if args.json_output {
        match program.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => fail("Error", format!("Failed to serialize to JSON: {}", e)),
        }
    } else {
        print_program(&program, args.verbose);
    }
}

fn print_program(program: &IlProgram, verbose: bool) {
    if verbose {
        println!("{}", program.summary().cyan());
    }
    print!("{}", program);
}
