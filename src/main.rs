#[cfg(not(feature = "binary"))]
compile_error!("To compile the strata binary, you must enable the `binary` feature flag");

use std::{
    fs, io,
    path::{Path, PathBuf},
    process::exit,
};

use clap::Parser;
use colored::*;
use enum_iterator::all;
use strata::{
    Assembly, Compiler, ComplexOrdering, ComplexRounding, ComplexSemantics, Inputs, RunOptions,
    StrataError, Value, Vm, DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_MACRO_DEPTH,
};
use tracing::Level;

fn main() {
    let app = App::parse();
    tracing_subscriber::fmt()
        .with_max_level(app.log_level())
        .with_writer(io::stderr)
        .with_target(false)
        .init();
    let mut inputs = Inputs::default();
    if let Err(e) = run(app, &mut inputs) {
        eprintln!("{}", e.report(&inputs));
        exit(1);
    }
}

fn run(app: App, inputs: &mut Inputs) -> Result<(), StrataError> {
    match app {
        App::Run { path, run, .. } => {
            let asm = if path.extension().is_some_and(|ext| ext == ASSEMBLY_EXTENSION) {
                Assembly::decode(&read(&path)?)?
            } else {
                compile_file(&path, run.compiler(Vec::new()), inputs)?
            };
            let stack = run.vm().run(&asm, Vec::new())?;
            print_stack(&stack, !run.no_color);
        }
        App::Build {
            path,
            output,
            export,
            compile,
            ..
        } => {
            let asm = compile_file(&path, compile.compiler(export), inputs)?;
            let output = output.unwrap_or_else(|| path.with_extension(ASSEMBLY_EXTENSION));
            fs::write(&output, asm.encode()).map_err(|error| StrataError::Io {
                path: output.clone(),
                error,
            })?;
            tracing::info!(output = %output.display(), "wrote assembly");
        }
        App::Eval { code, run, .. } => {
            let mut compiler = run.compiler(Vec::new());
            let res = compiler.load_str(&code);
            *inputs = compiler.inputs().clone();
            let stack = run.vm().run(&res?, Vec::new())?;
            print_stack(&stack, !run.no_color);
        }
        App::Check { path, compile, .. } => {
            let asm = compile_file(&path, compile.compiler(Vec::new()), inputs)?;
            println!(
                "{} {} functions, {} instructions",
                "ok:".bright_green(),
                asm.functions.len(),
                asm.instrs.len()
            );
        }
    }
    Ok(())
}

const ASSEMBLY_EXTENSION: &str = "sasm";

fn read(path: &Path) -> Result<String, StrataError> {
    fs::read_to_string(path).map_err(|error| StrataError::Io {
        path: path.into(),
        error,
    })
}

fn compile_file(
    path: &Path,
    mut compiler: Compiler,
    inputs: &mut Inputs,
) -> Result<Assembly, StrataError> {
    let text = read(path)?;
    let res = compiler.load_file(path, &text);
    *inputs = compiler.inputs().clone();
    Ok(res?)
}

#[derive(Parser)]
#[clap(version, about)]
enum App {
    #[clap(about = "Compile and run a file, or run an assembly")]
    Run {
        path: PathBuf,
        #[clap(flatten)]
        run: RunArgs,
        #[clap(flatten)]
        log: LogArgs,
    },
    #[clap(about = "Compile a file to an assembly")]
    Build {
        path: PathBuf,
        #[clap(short, long, help = "The path to the output file")]
        output: Option<PathBuf>,
        #[clap(long, help = "Keep a binding even if the program never calls it")]
        export: Vec<String>,
        #[clap(flatten)]
        compile: CompileArgs,
        #[clap(flatten)]
        log: LogArgs,
    },
    #[clap(about = "Evaluate an expression and print its output")]
    Eval {
        code: String,
        #[clap(flatten)]
        run: RunArgs,
        #[clap(flatten)]
        log: LogArgs,
    },
    #[clap(about = "Compile a file without running it")]
    Check {
        path: PathBuf,
        #[clap(flatten)]
        compile: CompileArgs,
        #[clap(flatten)]
        log: LogArgs,
    },
}

impl App {
    fn log_level(&self) -> Level {
        match self {
            App::Run { log, .. }
            | App::Build { log, .. }
            | App::Eval { log, .. }
            | App::Check { log, .. } => log.log_level,
        }
    }
}

#[derive(clap::Args)]
struct LogArgs {
    #[clap(long, default_value = "warn", help = "The most verbose log level to show")]
    log_level: Level,
}

#[derive(clap::Args)]
struct CompileArgs {
    #[clap(long, default_value_t = DEFAULT_MAX_MACRO_DEPTH, help = "How deeply macros may expand")]
    max_macro_depth: usize,
}

impl CompileArgs {
    fn compiler(&self, exports: Vec<String>) -> Compiler {
        exports.into_iter().fold(
            Compiler::default().max_macro_depth(self.max_macro_depth),
            |compiler, name| compiler.export(name),
        )
    }
}

#[derive(clap::Args)]
struct RunArgs {
    #[clap(flatten)]
    compile: CompileArgs,
    #[clap(long, default_value_t = DEFAULT_MAX_CALL_DEPTH, help = "The maximum number of nested calls")]
    max_call_depth: usize,
    #[clap(long, help = "Stop after executing this many instructions")]
    instruction_limit: Option<usize>,
    #[clap(
        long,
        default_value = "componentwise",
        value_parser = parse_rounding,
        help = "How to round complex numbers (componentwise or reject)"
    )]
    complex_rounding: ComplexRounding,
    #[clap(
        long,
        default_value = "reject",
        value_parser = parse_ordering,
        help = "How to order complex numbers (reject or lexicographic)"
    )]
    complex_ordering: ComplexOrdering,
    #[clap(long, help = "Don't colorize stack output")]
    no_color: bool,
}

impl RunArgs {
    fn compiler(&self, exports: Vec<String>) -> Compiler {
        self.compile.compiler(exports)
    }
    fn vm(&self) -> Vm {
        Vm::new(RunOptions {
            max_call_depth: self.max_call_depth,
            instruction_limit: self.instruction_limit,
            cancel: None,
            complex: ComplexSemantics {
                rounding: self.complex_rounding,
                ordering: self.complex_ordering,
            },
        })
    }
}

fn parse_rounding(s: &str) -> Result<ComplexRounding, String> {
    ComplexRounding::from_name(s).ok_or_else(|| {
        let names: Vec<_> = all::<ComplexRounding>().map(ComplexRounding::name).collect();
        format!("expected one of {}", names.join(", "))
    })
}

fn parse_ordering(s: &str) -> Result<ComplexOrdering, String> {
    ComplexOrdering::from_name(s).ok_or_else(|| {
        let names: Vec<_> = all::<ComplexOrdering>().map(ComplexOrdering::name).collect();
        format!("expected one of {}", names.join(", "))
    })
}

fn print_stack(stack: &[Value], color: bool) {
    if stack.len() == 1 || !color {
        for value in stack {
            println!("{value}");
        }
        return;
    }
    for (i, value) in stack.iter().enumerate() {
        const W: u8 = 255;
        const B: u8 = 200;
        let (r, g, b) = match (i + 3) % 6 {
            0 => (W, B, B),
            1 => (W, W, B),
            2 => (B, W, B),
            3 => (B, W, W),
            4 => (B, B, W),
            _ => (W, B, W),
        };
        println!("{}", value.to_string().truecolor(r, g, b));
    }
}
