mod colors;
mod commands;

use clap::{Parser, Subcommand};
use nxresolve::{ExplicitTarget, ResolverConfig, SourcePreferences};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nxr")]
#[command(author, version, about = "Resolve package names across nixpkgs, NUR, overlays and Homebrew", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration repository (flake.lock and .nix files)
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve package names to install candidates
    Resolve {
        /// Package names
        #[arg(required = true)]
        names: Vec<String>,

        /// Prefer overlays and NUR over pinned nixpkgs
        #[arg(long)]
        bleeding_edge: bool,

        /// Also search NUR
        #[arg(long)]
        nur: bool,

        /// Only query one source (nxs, unstable, nur, homebrew)
        #[arg(long)]
        source: Option<String>,

        /// Treat names as Homebrew casks
        #[arg(long, conflicts_with = "mas")]
        cask: bool,

        /// Treat names as Mac App Store apps
        #[arg(long)]
        mas: bool,

        /// Skip the resolution cache
        #[arg(long)]
        no_cache: bool,

        /// flake.lock to read revisions and overlays from
        #[arg(long)]
        lock: Option<PathBuf>,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Check whether a nix attribute is available on this system
    Check {
        /// Attribute path (e.g. python3Packages.rich)
        attr: String,
    },

    /// Manage the resolution cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached resolution
    Clear,

    /// Remove cached resolutions for one package
    Invalidate {
        /// Package name
        name: String,

        /// Only this source
        #[arg(long)]
        source: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    colors::init_colors();

    let mut config = ResolverConfig::from_env().with_repo(&cli.repo);

    match cli.command {
        Commands::Resolve {
            names,
            bleeding_edge,
            nur,
            source,
            cask,
            mas,
            no_cache,
            lock,
            json,
        } => {
            if let Some(lock) = lock {
                config.flake_lock = Some(lock);
            }
            config.use_cache = !no_cache;

            let explicit_target = if cask {
                ExplicitTarget::Cask
            } else if mas {
                ExplicitTarget::Mas
            } else {
                ExplicitTarget::Any
            };
            let prefs = SourcePreferences {
                bleeding_edge,
                nur,
                force_source: source,
                explicit_target,
            };
            commands::resolve(&config, &names, &prefs, json).await?;
        }
        Commands::Check { attr } => {
            commands::check(&config, &attr).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Clear => commands::cache_clear(&config)?,
            CacheAction::Invalidate { name, source } => {
                commands::cache_invalidate(&config, &name, source.as_deref())?;
            }
        },
    }

    Ok(())
}
