//! CLI entrypoint for `bloodhound-steroids`.
//!
//! Validates the module options, opens a single Neo4j connection (or none in
//! `--dry-run`), runs the selected module and prints the update count.
//! Optionally writes a CSV of every attempted pair.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use log::{LevelFilter, error};
use steroids::{
    dispatch::{KNOWN_MODULES, Options, Plan, RunOutcome, RunSettings, ValidationError, execute},
    dump::MalformedPolicy,
    export::save_pairs_csv,
    graph::{DryRunStore, GraphClient, GraphConfig},
    io::DEFAULT_MMAP_THRESHOLD_BYTES,
    report::{render_summary, updated_line},
    writer::CountMode,
};

#[derive(Parser, Debug)]
#[command(
    name = "bloodhound-steroids",
    version,
    about = "Give performance enhancing drugs to bloodhound."
)]
struct Args {
    /// List available modules
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Module to use
    #[arg(short = 'm', long = "module")]
    module: Option<String>,

    /// The related domain
    #[arg(long = "domain")]
    domain: Option<String>,

    /// A list of user names (you can specify multiple files)
    #[arg(long = "user-file")]
    user_files: Vec<PathBuf>,

    /// A list of computer names (you can specify multiple files)
    #[arg(long = "computer-file")]
    computer_files: Vec<PathBuf>,

    /// An NT dump file (NTDS.DIT export) to parse
    #[arg(long = "nt-file")]
    nt_file: Option<PathBuf>,

    /// Target Neo4j host
    #[arg(short = 'n', long = "neo4j-host")]
    neo4j_host: Option<String>,

    /// Target Neo4j bolt port
    #[arg(short = 'p', long = "port", default_value_t = 7687)]
    port: u16,

    /// Target Neo4j username
    #[arg(short = 'u', long = "user", default_value = "neo4j")]
    user: String,

    /// Target Neo4j secret
    #[arg(short = 's', long = "secret", env = "NEO4J_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// How write results add up to the reported count
    #[arg(long = "count-mode", value_enum, default_value_t = CountModeArg::Sum)]
    count_mode: CountModeArg,

    /// Abort on the first malformed dump line instead of skipping it
    #[arg(long = "strict")]
    strict: bool,

    /// Plan and count the writes without connecting to Neo4j
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Directory for the per-pair CSV report
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Only print the final update count
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CountModeArg {
    Sum,
    LastWrite,
}

impl From<CountModeArg> for CountMode {
    fn from(value: CountModeArg) -> Self {
        match value {
            CountModeArg::Sum => CountMode::Sum,
            CountModeArg::LastWrite => CountMode::LastWrite,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl Args {
    fn options(&self) -> Options {
        Options {
            module: self.module.clone(),
            domain: self.domain.clone(),
            user_files: self.user_files.clone(),
            nt_file: self.nt_file.clone(),
            computer_files: self.computer_files.clone(),
            neo4j_host: self.neo4j_host.clone(),
            dry_run: self.dry_run,
        }
    }

    fn settings(&self) -> RunSettings {
        RunSettings {
            mmap_threshold: if self.mmap_threshold == 0 {
                u64::MAX
            } else {
                self.mmap_threshold
            },
            count_mode: self.count_mode.into(),
            malformed: if self.strict {
                MalformedPolicy::Fail
            } else {
                MalformedPolicy::Skip
            },
        }
    }

    fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            host: self.neo4j_host.clone().unwrap_or_default(),
            port: self.port,
            user: self.user.clone(),
            password: self.secret.clone().unwrap_or_default(),
        }
    }
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

async fn run(args: &Args, plan: &Plan) -> Result<RunOutcome> {
    let settings = args.settings();
    if args.dry_run {
        return Ok(execute(plan, &DryRunStore, &settings).await?);
    }
    let config = args.graph_config();
    println!("Connecting to {}...", config.uri());
    let client = GraphClient::connect(&config).await?;
    Ok(execute(plan, &client, &settings).await?)
}

fn write_export(outcome: &RunOutcome, outdir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(outdir)
        .with_context(|| format!("create output directory {}", outdir.display()))?;
    let ts = chrono::Local::now().format("%Y.%m.%d_%H.%M.%S");
    let csv = outdir.join(format!("steroids_pairs_{}.csv", ts));
    save_pairs_csv(&outcome.report, &csv).with_context(|| format!("write {}", csv.display()))?;
    Ok(csv)
}

fn main() {
    if std::env::args_os().len() == 1 {
        let _ = Args::command().print_help();
        std::process::exit(1);
    }
    let args = Args::parse();
    init_logger(args.verbose);
    match args.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }

    if args.list {
        println!("{}", KNOWN_MODULES.join("\n"));
        return;
    }

    let plan = match args.options().validate() {
        Ok(plan) => plan,
        Err(ValidationError::MissingHost) => {
            let _ = Args::command().print_help();
            std::process::exit(1);
        }
        Err(e) => {
            println!("{}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    let outcome = match runtime.block_on(run(&args, &plan)) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    if args.quiet {
        println!("{}", updated_line(&outcome.stats));
    } else {
        println!("{}", render_summary(&outcome.stats, &outcome.report));
    }

    if let Some(outdir) = &args.output {
        match write_export(&outcome, outdir) {
            Ok(path) => log::info!("pairs written to {}", path.display()),
            Err(e) => {
                error!("{:#}", e);
                std::process::exit(1);
            }
        }
    }
}
