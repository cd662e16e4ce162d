use std::io;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use seqdedup::config::{ConfigLoader, ResolvedConfig};
use seqdedup::error::SeqDedupError;
use seqdedup::output::{JsonOutput, OutputMode, write_digest_table};
use seqdedup::pipeline::{
    DedupOptions, DedupResult, InspectResult, LogSink, Pipeline, ProgressSink, STDIO_PATH,
    digest_inputs,
};

#[derive(Parser)]
#[command(name = "seqdedup")]
#[command(about = "Collapse identical FASTA sequences, preferring type-strain representatives")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Deduplicate FASTA records by sequence content")]
    Dedup(DedupArgs),
    #[command(about = "Summarize duplicate groups without writing output")]
    Inspect(InspectArgs),
    #[command(about = "Print the SHA-256 digest of every record")]
    Digest(DigestArgs),
}

#[derive(Args, Clone)]
struct SelectionArgs {
    /// FASTA inputs (plain or .gz); `-` reads stdin
    #[arg(required = true)]
    inputs: Vec<Utf8PathBuf>,

    #[arg(long)]
    config: Option<String>,

    /// Accession substring marking a type strain (repeatable)
    #[arg(long = "type-marker", short = 't')]
    type_markers: Vec<String>,
}

#[derive(Args, Clone)]
struct DedupArgs {
    #[command(flatten)]
    selection: SelectionArgs,

    #[arg(long, short = 'o', default_value = STDIO_PATH)]
    output: Utf8PathBuf,

    #[arg(long)]
    line_width: Option<usize>,

    #[arg(long)]
    manifest: Option<Utf8PathBuf>,
}

#[derive(Args, Clone)]
struct InspectArgs {
    #[command(flatten)]
    selection: SelectionArgs,

    #[arg(long, default_value_t = 10)]
    top: usize,
}

#[derive(Args, Clone)]
struct DigestArgs {
    #[arg(required = true)]
    inputs: Vec<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SeqDedupError>() {
            return ExitCode::from(err.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Commands::Dedup(args) => run_dedup(args, output_mode),
        Commands::Inspect(args) => run_inspect(args, output_mode),
        Commands::Digest(args) => run_digest(args, output_mode),
    }
}

fn resolve_config(args: &SelectionArgs) -> Result<ResolvedConfig, SeqDedupError> {
    ConfigLoader::resolve_or_default(args.config.as_deref())?
        .with_type_markers(args.type_markers.as_slice())
}

fn sink_for(output_mode: OutputMode) -> &'static dyn ProgressSink {
    match output_mode {
        OutputMode::Interactive => &LogSink,
        OutputMode::NonInteractive => &JsonOutput,
    }
}

fn run_dedup(args: DedupArgs, output_mode: OutputMode) -> miette::Result<()> {
    let DedupArgs {
        selection,
        output,
        line_width,
        manifest,
    } = args;

    let config = resolve_config(&selection)?;
    let options = DedupOptions {
        type_markers: config.type_markers,
        line_width: line_width.unwrap_or(config.line_width),
        manifest: manifest.or(config.manifest.map(Utf8PathBuf::from)),
    };

    let pipeline = Pipeline::new(options);
    let result = pipeline.run(&selection.inputs, &output, sink_for(output_mode))?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_dedup(&result).into_diagnostic(),
        OutputMode::Interactive => {
            print_dedup_summary(&result);
            Ok(())
        }
    }
}

fn run_inspect(args: InspectArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = resolve_config(&args.selection)?;
    let pipeline = Pipeline::new(DedupOptions {
        type_markers: config.type_markers,
        line_width: config.line_width,
        manifest: None,
    });
    let result = pipeline.inspect(&args.selection.inputs, args.top, sink_for(output_mode))?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_inspect(&result).into_diagnostic(),
        OutputMode::Interactive => {
            print_inspect_summary(&result);
            Ok(())
        }
    }
}

fn run_digest(args: DigestArgs, output_mode: OutputMode) -> miette::Result<()> {
    let entries = digest_inputs(&args.inputs)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_digests(&entries).into_diagnostic(),
        OutputMode::Interactive => {
            write_digest_table(io::stdout().lock(), &entries).into_diagnostic()
        }
    }
}

// Summaries go to stderr so `-o -` output stays clean on stdout.
fn print_dedup_summary(result: &DedupResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    eprintln!("{cyan}seqdedup summary{reset}");
    eprintln!("{green}records read:      {}{reset}", result.stats.records);
    eprintln!("{green}unique sequences:  {}{reset}", result.stats.groups);
    eprintln!("{yellow}duplicates merged: {}{reset}", result.stats.duplicates);
    eprintln!(
        "{yellow}type-strain reps:  {} ({} promoted){reset}",
        result.stats.type_selected, result.stats.promotions
    );
    eprintln!("{cyan}output: {}{reset}", result.output);
    if let Some(path) = &result.manifest {
        eprintln!("{cyan}manifest: {path}{reset}");
    }
}

fn print_inspect_summary(result: &InspectResult) {
    println!(
        "{} records, {} unique sequences, {} duplicates, {} type-selected",
        result.stats.records,
        result.stats.groups,
        result.stats.duplicates,
        result.stats.type_selected
    );
    for group in &result.largest_groups {
        let marker = if group.type_selected { "*" } else { " " };
        println!(
            "{marker} {:>6}  {}  {}",
            group.members, group.digest, group.representative
        );
    }
}
