//! The `hotaru` CLI: run a source file under the exec path, compile it to a
//! bytecode module, or disassemble an existing module.

use clap::{Parser as ClapParser, Subcommand};
use hotaru_compiler::config::HotaruConfig;
use hotaru_compiler::parser::Parser;
use hotaru_compiler::state::State;
use hotaru_core::Arena;
use hotaru_vm::{Hvm, Module};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;

#[derive(ClapParser)]
#[command(name = "hotaru")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "hotaru toolchain: run, compile, and inspect .ht programs")]
struct Cli {
    /// Path to a hotaru.toml to load instead of the one in the current directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the VM's operand stack capacity.
    #[arg(long, global = true)]
    stack_capacity: Option<usize>,

    /// Override the VM's heap (static data) capacity.
    #[arg(long, global = true)]
    heap_capacity: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and execute a source file one statement at a time.
    Run {
        /// Input .ht source file.
        source: PathBuf,
    },
    /// Compile a source file to a bytecode module.
    Com {
        /// Input .ht source file.
        source: PathBuf,

        /// Output .hbc path.
        #[arg(short, long, default_value = "output.hbc")]
        output: PathBuf,
    },
    /// Disassemble a compiled bytecode module.
    Bcdump {
        /// Input .hbc module file.
        program: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return fatal(&format!("failed to load configuration: {e}")),
    };
    if let Some(cap) = cli.stack_capacity {
        config.vm.stack_capacity = cap;
    }
    if let Some(cap) = cli.heap_capacity {
        config.vm.heap_capacity = cap;
    }

    init_logging(&config);

    let result = match cli.command {
        Commands::Run { source } => run(&source, &config),
        Commands::Com { source, output } => com(&source, &output, &config),
        Commands::Bcdump { program } => bcdump(&program),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fatal(&e),
    }
}

fn load_config(path: Option<&Path>) -> Result<HotaruConfig, String> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            HotaruConfig::from_toml(&contents)
        }
        None => {
            let cwd = std::env::current_dir().map_err(|e| format!("failed to read current directory: {e}"))?;
            HotaruConfig::load_or_default(&cwd)
        }
    }
}

fn init_logging(config: &HotaruConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn fatal(message: &str) -> ExitCode {
    error!("{message}");
    ExitCode::FAILURE
}

fn run(source: &Path, config: &HotaruConfig) -> Result<(), String> {
    let text = read_source(source)?;
    let arena = Arena::new();
    let program = Parser::new(&text, &arena)
        .parse_program()
        .map_err(|e| format!("{}: {e}", source.display()))?;

    let vm = Hvm::with_capacities(config.vm.stack_capacity, config.vm.heap_capacity);
    let mut state = State::new(vm);
    state.exec_program(&program).map_err(|e| format!("{}: {e}", source.display()))
}

fn com(source: &Path, output: &Path, config: &HotaruConfig) -> Result<(), String> {
    let text = read_source(source)?;
    let arena = Arena::new();
    let program = Parser::new(&text, &arena)
        .parse_program()
        .map_err(|e| format!("{}: {e}", source.display()))?;

    let vm = Hvm::with_capacities(config.vm.stack_capacity, config.vm.heap_capacity);
    let mut state = State::new(vm);
    let module = state.compile_module(&program).map_err(|e| format!("{}: {e}", source.display()))?;
    module.save_to_path(output).map_err(|e| format!("failed to write {}: {e}", output.display()))
}

fn bcdump(program: &Path) -> Result<(), String> {
    let module = Module::load_from_path(program)
        .map_err(|e| format!("failed to load {}: {e}", program.display()))?;
    for (i, inst) in module.instructions().iter().enumerate() {
        let info = inst.opcode.info();
        let (int, float) = if info.has_operand {
            (inst.operand.as_i64(), inst.operand.as_f64())
        } else {
            (0, 0.0)
        };
        println!("0x{i:X} {}(int({int})|float({float}))", info.name);
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))
}
