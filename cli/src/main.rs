mod catalog;
mod output;

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use command_grammar_core::{
    CommandGroup, ExecutionResult, Grammar, GrammarConfig, Outcome, OutputTarget,
};
use tracing_subscriber::EnvFilter;

use crate::catalog::Reply;
use crate::output::{OutputFormat, format_fields, format_grammar, format_results};

/// How many accepted commands a line may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Policy {
    /// Exactly one command must accept the line.
    One,
    /// The first accepting command wins.
    First,
    /// Every accepting command runs.
    All,
}

#[derive(Debug, Parser)]
#[command(name = "grammar")]
#[command(about = "Compile command grammars and dispatch command lines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a template and show its expression and capture map.
    Compile(CompileArgs),
    /// Parse one line against a template and show the extracted fields.
    Parse(ParseArgs),
    /// Dispatch one line against the built-in demo catalog.
    Dispatch(DispatchArgs),
    /// Dispatch every line read from stdin against the demo catalog.
    Repl(ReplArgs),
}

#[derive(Debug, Args)]
struct GrammarArgs {
    /// YAML file describing the field registry.
    #[arg(long)]
    fields: PathBuf,
    /// Template source, or the name of a template defined in the fields file.
    #[arg(long)]
    template: String,
}

#[derive(Debug, Args)]
struct CompileArgs {
    #[command(flatten)]
    grammar: GrammarArgs,
    /// Output format.
    #[arg(long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ParseArgs {
    #[command(flatten)]
    grammar: GrammarArgs,
    /// Line to parse.
    #[arg(long)]
    line: String,
    /// Output format.
    #[arg(long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct DispatchArgs {
    /// Line to dispatch.
    #[arg(long)]
    line: String,
    #[command(flatten)]
    dispatch: DispatchOptions,
}

#[derive(Debug, Args)]
struct ReplArgs {
    #[command(flatten)]
    dispatch: DispatchOptions,
}

#[derive(Debug, Args)]
struct DispatchOptions {
    /// Match policy.
    #[arg(long, default_value = "one")]
    policy: Policy,
    /// Rendering target for messages.
    #[arg(long, default_value = "text")]
    target: OutputTarget,
    /// Output format.
    #[arg(long, default_value = "text")]
    format: OutputFormat,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Compile(args) => run_compile(args),
        Command::Parse(args) => run_parse(args),
        Command::Dispatch(args) => run_dispatch(args),
        Command::Repl(args) => run_repl(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_compile(args: CompileArgs) -> Result<(), String> {
    let grammar = load_grammar(&args.grammar)?;
    println!("{}", format_grammar(&grammar, args.format)?);
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let grammar = load_grammar(&args.grammar)?;
    let fields = grammar
        .parse(&args.line)
        .map_err(|err| err.to_string())?
        .ok_or_else(|| format!("line does not match \"{}\"", grammar.template()))?;
    println!("{}", format_fields(&fields, args.format)?);
    Ok(())
}

fn run_dispatch(args: DispatchArgs) -> Result<(), String> {
    let group = catalog::build(args.dispatch.target).map_err(|err| err.to_string())?;
    let results = dispatch(&group, &args.line, args.dispatch.policy).map_err(|err| err.to_string())?;
    println!("{}", format_results(&results, args.dispatch.format)?);
    Ok(())
}

fn run_repl(args: ReplArgs) -> Result<(), String> {
    let group = catalog::build(args.dispatch.target).map_err(|err| err.to_string())?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line.map_err(|err| format!("Failed to read stdin: {err}"))?;
        if line.trim().is_empty() {
            continue;
        }
        match dispatch(&group, &line, args.dispatch.policy) {
            Ok(results) => {
                let rendered = format_results(&results, args.dispatch.format)?;
                writeln!(stdout, "{rendered}")
                    .map_err(|err| format!("Failed to write stdout: {err}"))?;
            }
            Err(failure) => {
                writeln!(stdout, "error: {failure}")
                    .map_err(|err| format!("Failed to write stdout: {err}"))?;
            }
        }
    }
    Ok(())
}

fn load_grammar(args: &GrammarArgs) -> Result<Grammar, String> {
    let config = GrammarConfig::load(&args.fields)
        .map_err(|err| format!("Failed to load '{}': {err}", args.fields.display()))?;
    let source = config
        .templates
        .get(&args.template)
        .cloned()
        .unwrap_or_else(|| args.template.clone());
    config.compile(&source).map_err(|err| err.to_string())
}

fn dispatch(
    group: &CommandGroup<Reply>,
    line: &str,
    policy: Policy,
) -> Outcome<Vec<ExecutionResult<Reply>>> {
    match policy {
        Policy::One => group.process_one(line).map(|executed| vec![executed]),
        Policy::First => group.process_first(line).map(|executed| vec![executed]),
        Policy::All => group.process_all(line),
    }
}
