//! keel - apply, fetch, patch and delete Kubernetes objects from manifests

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod exit_codes;

use commands::apply::Mode;
use commands::{ClusterArgs, OutputFormat, PatchType};

#[derive(Parser)]
#[command(name = "keel")]
#[command(version)]
#[command(about = "Apply, fetch, patch and delete Kubernetes objects", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Namespace for namespaced kinds (overrides the config file)
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Timeout in seconds for each call to the cluster
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Configuration file (default: ~/.config/keel/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an object, or update it if it already exists
    Apply {
        /// Resource kind, e.g. ConfigMap
        #[arg(short, long)]
        kind: String,

        /// Manifest file (YAML or JSON)
        file: PathBuf,
    },

    /// Create an object
    Create {
        #[arg(short, long)]
        kind: String,

        file: PathBuf,
    },

    /// Replace an existing object
    Update {
        #[arg(short, long)]
        kind: String,

        file: PathBuf,
    },

    /// Print an object
    Get {
        #[arg(short, long)]
        kind: String,

        /// Object name
        name: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },

    /// Delete an object
    Delete {
        #[arg(short, long)]
        kind: String,

        name: String,
    },

    /// Patch an object with the payload in a file
    Patch {
        #[arg(short, long)]
        kind: String,

        name: String,

        /// Patch payload (YAML or JSON)
        file: PathBuf,

        /// Patch format
        #[arg(short = 't', long = "type", value_enum, default_value_t = PatchType::Strategic)]
        patch_type: PatchType,
    },

    /// Show the patch that turns one manifest into another (offline)
    Diff {
        #[arg(short, long)]
        kind: String,

        original: PathBuf,

        modified: PathBuf,

        #[arg(short = 't', long = "type", value_enum, default_value_t = PatchType::Strategic)]
        patch_type: PatchType,
    },

    /// List supported resource kinds
    Kinds,
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let env = std::env::var("RUST_LOG").unwrap_or_else(|_| default.to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

async fn run(cli: Cli) -> error::Result<()> {
    let args = ClusterArgs {
        namespace: cli.namespace,
        timeout: cli.timeout,
        config: cli.config,
    };

    match cli.command {
        Commands::Apply { kind, file } => {
            commands::apply::run(&args, Mode::Apply, &kind, &file).await
        }
        Commands::Create { kind, file } => {
            commands::apply::run(&args, Mode::Create, &kind, &file).await
        }
        Commands::Update { kind, file } => {
            commands::apply::run(&args, Mode::Update, &kind, &file).await
        }
        Commands::Get { kind, name, output } => {
            commands::get::run(&args, &kind, &name, output).await
        }
        Commands::Delete { kind, name } => commands::delete::run(&args, &kind, &name).await,
        Commands::Patch {
            kind,
            name,
            file,
            patch_type,
        } => commands::patch::run(&args, &kind, &name, &file, patch_type).await,
        Commands::Diff {
            kind,
            original,
            modified,
            patch_type,
        } => commands::diff::run(&kind, &original, &modified, patch_type),
        Commands::Kinds => {
            commands::kinds::run();
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
