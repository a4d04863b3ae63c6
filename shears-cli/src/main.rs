//! SHEARS Command-Line Interface
//!
//! Command-line tool for optimizing JavaScript glue code given as an ESTree
//! JSON AST

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use shears_core::extra_info::MARKER;
use shears_core::pipeline::PassStats;
use shears_core::{ExtraInfo, Node, Pass, Pipeline, PipelineOptions};
use std::fs;
use std::io::Write;
use strum::IntoEnumIterator;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "shears")]
#[command(version = "0.1.0")]
#[command(about = "SHEARS - JavaScript glue code optimizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run passes over an ESTree JSON AST
    Optimize(OptimizeArgs),

    /// List the registered passes
    Passes,

    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone)]
struct OptimizeArgs {
    /// Input ESTree JSON, optionally followed by an extra info marker line
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file path (stdout when omitted)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<String>,

    /// Extra info file, either a marker line or bare JSON
    #[arg(long, value_name = "FILE")]
    extra_info: Option<String>,

    /// Write the extra info suffix here instead of appending it to the output
    #[arg(long, value_name = "FILE")]
    suffix_out: Option<String>,

    /// Function minified by minify-globals
    #[arg(long, default_value = "instantiate")]
    wrapper: String,

    /// Debug-level traces
    #[arg(long)]
    verbose: bool,

    /// Show per-pass statistics
    #[arg(long)]
    stats: bool,

    /// Passes to run, in order
    #[arg(short, long = "pass", value_name = "PASS", required = true)]
    passes: Vec<String>,
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("Invalid log filter: {}", e))?;
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))
}

/// Split a trailing extra info marker off the AST text
fn split_marker(text: &str) -> Result<(&str, Option<ExtraInfo>)> {
    match text.rfind(MARKER) {
        Some(start) => Ok((&text[..start], ExtraInfo::from_source(&text[start..])?)),
        None => Ok((text, None)),
    }
}

fn load_extra_info(path: &str) -> Result<ExtraInfo> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read extra info file: {}", path))?;
    match ExtraInfo::from_source(&text)? {
        Some(extra_info) => Ok(extra_info),
        None => ExtraInfo::from_json(&text),
    }
}

fn print_stats(stats: &[PassStats]) {
    eprintln!("\n📊 Pass Statistics");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for entry in stats {
        eprintln!(
            "{:<34} {:>6} changed  {:>8.2?}",
            entry.pass.as_ref(),
            entry.changed,
            entry.elapsed
        );
    }
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

fn optimize_command(args: OptimizeArgs) -> Result<()> {
    info!(input = %args.input, passes = ?args.passes, "optimizing");
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input))?;
    let (ast_text, embedded) = split_marker(&text)?;
    let mut ast: Node = serde_json::from_str(ast_text)
        .with_context(|| format!("Failed to parse ESTree JSON: {}", args.input))?;

    let extra_info = match &args.extra_info {
        Some(path) => Some(load_extra_info(path)?),
        None => embedded,
    };

    let options = PipelineOptions {
        verbose: args.verbose,
        wrapper_name: args.wrapper.clone(),
    };
    let mut pipeline = Pipeline::from_names(&args.passes, options)?.with_extra_info(extra_info);
    let result = pipeline
        .run(&mut ast)
        .with_context(|| format!("Failed to optimize {}", args.input))?;

    let mut out = String::new();
    if let Some(graph) = &result.graph {
        out.push_str(graph);
    } else if result.print {
        out.push_str(&serde_json::to_string(&ast).context("Failed to serialize AST")?);
    }
    if let Some(suffix) = &result.suffix {
        match &args.suffix_out {
            Some(path) => fs::write(path, format!("{}\n", suffix))
                .with_context(|| format!("Failed to write suffix file: {}", path))?,
            None => {
                out.push('\n');
                out.push_str(suffix);
            }
        }
    }
    if !out.is_empty() {
        out.push('\n');
    }

    match &args.output {
        Some(path) => fs::write(path, &out)
            .with_context(|| format!("Failed to write output file: {}", path))?,
        None => std::io::stdout()
            .write_all(out.as_bytes())
            .context("Failed to write to stdout")?,
    }

    if args.stats {
        print_stats(&result.stats);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Optimize(args)) => {
            init_tracing(args.verbose)?;
            optimize_command(args)?;
        }

        Some(Commands::Passes) => {
            for pass in Pass::iter() {
                println!("{:<34} {}", pass.as_ref(), pass.description());
            }
        }

        Some(Commands::Version) => {
            println!("SHEARS v{}", env!("CARGO_PKG_VERSION"));
            println!("JavaScript glue code optimizer");
            println!();
            println!("License: Apache-2.0");
        }

        None => {
            println!("SHEARS - JavaScript glue code optimizer");
            println!();
            println!("Usage: shears <COMMAND>");
            println!();
            println!("Commands:");
            println!("  optimize    Run passes over an ESTree JSON AST");
            println!("  passes      List the registered passes");
            println!("  version     Show version information");
            println!("  help        Print this message or the help of a subcommand");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GLUE: &str = r#"{"type":"Program","sourceType":"script","body":[
        {"type":"FunctionDeclaration","id":{"type":"Identifier","name":"f"},
         "params":[],"generator":false,"async":false,
         "body":{"type":"BlockStatement","body":[
            {"type":"VariableDeclaration","kind":"var","declarations":[
                {"type":"VariableDeclarator","id":{"type":"Identifier","name":"unused"},
                 "init":{"type":"Literal","value":1,"raw":"1"}}]}]}},
        {"type":"ExpressionStatement","expression":{"type":"CallExpression",
         "callee":{"type":"Identifier","name":"f"},"arguments":[],"optional":false}}]}"#;

    fn args(dir: &TempDir, passes: &[&str]) -> OptimizeArgs {
        let input = dir.path().join("input.json");
        fs::write(&input, GLUE).unwrap();
        OptimizeArgs {
            input: input.to_string_lossy().into_owned(),
            output: Some(dir.path().join("out.json").to_string_lossy().into_owned()),
            extra_info: None,
            suffix_out: None,
            wrapper: "instantiate".to_string(),
            verbose: false,
            stats: false,
            passes: passes.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_cli_builds() {
        let _cli = Cli::parse_from(["shears", "version"]);
        let cli = Cli::parse_from(["shears", "optimize", "in.json", "-p", "dce", "-p", "no-print"]);
        match cli.command {
            Some(Commands::Optimize(args)) => assert_eq!(args.passes, ["dce", "no-print"]),
            _ => panic!("expected optimize"),
        }
    }

    #[test]
    fn test_optimize_writes_ast() {
        let dir = TempDir::new().unwrap();
        let args = args(&dir, &["dce"]);
        let output = args.output.clone().unwrap();
        optimize_command(args).unwrap();

        let written = fs::read_to_string(output).unwrap();
        let ast: Node = serde_json::from_str(&written).unwrap();
        assert_eq!(ast.to_string(), "function f() { ; } f();");
    }

    #[test]
    fn test_no_print_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir, &["dce", "no-print"]);
        args.stats = true;
        let output = args.output.clone().unwrap();
        optimize_command(args).unwrap();
        assert_eq!(fs::read_to_string(output).unwrap(), "");
    }

    #[test]
    fn test_unknown_pass_fails() {
        let dir = TempDir::new().unwrap();
        let err = optimize_command(args(&dir, &["strip-everything"])).unwrap_err();
        assert!(err.to_string().contains("strip-everything"));
    }

    #[test]
    fn test_extra_info_from_marker_line() {
        let (ast, extra) =
            split_marker("{}\n// EXTRA_INFO:{\"unused\":[\"emcc$export$main\"]}\n").unwrap();
        assert_eq!(ast, "{}\n");
        assert!(extra.unwrap().unused.contains("emcc$export$main"));
    }

    #[test]
    fn test_extra_info_file_accepts_bare_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extra.json");
        fs::write(&path, r#"{"globals":{"f":"a"}}"#).unwrap();
        let extra = load_extra_info(&path.to_string_lossy()).unwrap();
        assert_eq!(extra.globals["f"], "a");
    }

    #[test]
    fn test_minify_locals_with_extra_info_file() {
        let dir = TempDir::new().unwrap();
        let extra = dir.path().join("extra.txt");
        fs::write(&extra, "// EXTRA_INFO:{\"globals\":{\"f\":\"q\"}}\n").unwrap();
        let mut args = args(&dir, &["minify-locals"]);
        args.extra_info = Some(extra.to_string_lossy().into_owned());
        let output = args.output.clone().unwrap();
        optimize_command(args).unwrap();

        let ast: Node = serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(ast.to_string(), "function q() { var a = 1; } f();");
    }
}
