use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use style_compiler_native::{
    parse_component, transform_directory, transform_file, transform_source, validate_component,
    BatchReport, CompilerError, IncrementalCache, TransformOptions, TransformOutput,
};

#[derive(Parser, Debug)]
#[command(name = "style-native")]
#[command(about = "Inline stylesheet and utility-class styles into JSX components")]
struct Args {
    /// Component file or directory of components
    input: PathBuf,

    /// Stylesheet to use instead of the component's own import (single file only)
    #[arg(short, long)]
    stylesheet: Option<PathBuf>,

    /// JSON file with transform options
    #[arg(short, long)]
    options: Option<PathBuf>,

    /// Output file, or output directory when the input is a directory
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory for the incremental cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Only validate class attributes; do not rewrite anything
    #[arg(long)]
    check: bool,

    /// Print diagnostics as JSON
    #[arg(long)]
    report: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("style_compiler_native=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("style_compiler_native=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn load_options(path: Option<&Path>) -> Result<TransformOptions, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(TransformOptions::from_json(&fs::read_to_string(path)?)?),
        None => Ok(TransformOptions::default()),
    }
}

fn print_diagnostics(diagnostics: &[CompilerError], as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(diagnostics)?);
    } else {
        for d in diagnostics {
            eprintln!("{}", d);
            for hint in &d.hints {
                eprintln!("  hint: {}", hint);
            }
        }
    }
    Ok(())
}

fn check(args: &Args, options: &TransformOptions) -> Result<bool, Box<dyn std::error::Error>> {
    let files = if args.input.is_dir() {
        style_compiler_native::find_component_files(&args.input)
    } else {
        vec![args.input.clone()]
    };

    let mut errors = Vec::new();
    for file in &files {
        let source = fs::read_to_string(file)?;
        match parse_component(&source, &file.to_string_lossy(), options) {
            Ok(component) => errors.extend(validate_component(&component)),
            Err(e) => errors.push(e),
        }
    }
    tracing::info!(files = files.len(), errors = errors.len(), "check finished");
    print_diagnostics(&errors, args.report)?;
    Ok(errors.is_empty())
}

fn run_file(args: &Args, options: &TransformOptions, cache: Option<&IncrementalCache>) -> Result<bool, Box<dyn std::error::Error>> {
    let output: TransformOutput = match &args.stylesheet {
        Some(sheet) => {
            let source = fs::read_to_string(&args.input)?;
            let css = fs::read_to_string(sheet)?;
            transform_source(&source, &args.input.to_string_lossy(), Some(&css), options)?
        }
        None => transform_file(&args.input, options, cache)?,
    };

    match &args.out {
        Some(out) => fs::write(out, &output.code)?,
        None if !args.report => print!("{}", output.code),
        None => {}
    }
    print_diagnostics(&output.diagnostics, args.report)?;
    Ok(true)
}

fn run_directory(args: &Args, options: &TransformOptions, cache: Option<&IncrementalCache>) -> Result<bool, Box<dyn std::error::Error>> {
    let report: BatchReport = transform_directory(&args.input, options, cache);

    if let Some(out_dir) = &args.out {
        for (path, output) in &report.outputs {
            let relative = path.strip_prefix(&args.input).unwrap_or(path);
            let target = out_dir.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &output.code)?;
        }
    }

    tracing::info!(
        transformed = report.outputs.len(),
        failed = report.failures.len(),
        diagnostics = report.diagnostic_count(),
        "batch finished"
    );

    if args.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (_, output) in &report.outputs {
            print_diagnostics(&output.diagnostics, false)?;
        }
        for (_, e) in &report.failures {
            eprintln!("{}", e);
        }
    }
    Ok(report.failures.is_empty())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_cli_logger(args.verbose);
    tracing::debug!("CLI args: {:?}", args);

    let options = load_options(args.options.as_deref())?;
    let cache = args.cache_dir.as_ref().map(IncrementalCache::new);

    let ok = if args.check {
        check(&args, &options)?
    } else if args.input.is_dir() {
        run_directory(&args, &options, cache.as_ref())?
    } else {
        run_file(&args, &options, cache.as_ref())?
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
