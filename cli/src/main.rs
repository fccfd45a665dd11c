mod plan;

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use miette::{Context as _, IntoDiagnostic as _, Result};
use plan::Plan;
use slshooks_hooks::{
    HOOK_NAMES, QueueTopologyRequest, TopicTopologyRequest, build_queue_topology,
    build_topic_topology,
};
use slshooks_service::BuildContext;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, prelude::*};

#[derive(Parser)]
#[command(name = "slshooks")]
#[command(version)]
#[command(about = "Build serverless service configuration from composable hooks")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv, -vvvv).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a plan and print the resulting configuration as JSON.
    Run(RunArgs),
    /// Print the hook tuples a topology request expands into.
    Topology(TopologyArgs),
    /// List the registered hooks.
    Hooks,
}

/// Overrides for the plan's build context.
#[derive(Args)]
struct ContextArgs {
    /// Active environment (stage) name.
    #[arg(long = "environment", value_name = "NAME")]
    environment: Option<String>,

    /// Build for a local/offline run; remote SNS subscriptions are skipped.
    #[arg(long = "offline")]
    offline: bool,

    /// Emit queue URL env vars into `provider.environment`.
    #[arg(long = "global-env-vars")]
    global_env_vars: bool,
}

impl ContextArgs {
    fn apply(self, mut ctx: BuildContext) -> BuildContext {
        if let Some(environment) = self.environment {
            ctx.environment = environment;
        }
        ctx.offline |= self.offline;
        ctx.emit_global_env_vars |= self.global_env_vars;
        ctx
    }
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    context: ContextArgs,

    /// Write the configuration here instead of stdout.
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    out: Option<PathBuf>,

    /// Plan file (JSON5).
    #[arg(value_name = "PLAN")]
    plan: PathBuf,
}

#[derive(Args)]
struct TopologyArgs {
    #[command(flatten)]
    context: ContextArgs,

    /// Builder to run.
    #[arg(value_enum)]
    kind: TopologyKind,

    /// Request file (JSON5).
    #[arg(value_name = "REQUEST")]
    request: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TopologyKind {
    Queue,
    Topic,
}

fn main() -> Result<()> {
    miette::set_panic_hook();
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Command::Run(args) => run(args),
        Command::Topology(args) => topology(args),
        Command::Hooks => {
            for name in HOOK_NAMES {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) -> Result<()> {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::try_from_default_env().into_diagnostic()?
    } else {
        let level = match verbose {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("error,slshooks={level},slshooks_={level}"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_fmt::layer().with_writer(std::io::stderr))
        .with(ErrorLayer::default())
        .init();

    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read `{}`", path.display()))
}

fn run(args: RunArgs) -> Result<()> {
    let plan = Plan::parse(&read(&args.plan)?)?;
    let ctx = args.context.apply(plan.context.clone());
    info!(plan = %args.plan.display(), steps = plan.hooks.len(), "running plan");

    let config = plan.run(&ctx)?;
    let rendered = serde_json::to_string_pretty(&config).into_diagnostic()?;

    match args.out {
        Some(out) => fs::write(&out, format!("{rendered}\n"))
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to write `{}`", out.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn topology(args: TopologyArgs) -> Result<()> {
    let source = read(&args.request)?;
    let ctx = args.context.apply(BuildContext::default());

    let tuples = match args.kind {
        TopologyKind::Queue => {
            let request: QueueTopologyRequest = json5::from_str(&source)
                .into_diagnostic()
                .wrap_err("invalid queue topology request")?;
            build_queue_topology(&request, &ctx)?
        }
        TopologyKind::Topic => {
            let request: TopicTopologyRequest = json5::from_str(&source)
                .into_diagnostic()
                .wrap_err("invalid topic topology request")?;
            build_topic_topology(&request)?
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&tuples).into_diagnostic()?
    );
    Ok(())
}
