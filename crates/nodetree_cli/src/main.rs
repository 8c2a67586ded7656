//! nodetree CLI - dependency-ordered repository sync across mirror trees.

mod commands;
mod config;
mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nodetree")]
#[command(version)]
#[command(about = "Sync repositories across a tree of mirror nodes")]
#[command(
    long_about = "nodetree syncs repositories across a tree of mirror nodes. Nodes are \
grouped into stages; every node pulls its content from its parent, so a sync run \
walks each stage parents-first and skips repositories whose upstream copy failed."
)]
#[command(after_long_help = r#"EXAMPLES
    Show the prod stage:
        $ nodetree show prod

    Sync two repositories on the EU branch of the prod stage:
        $ nodetree -t eu sync prod -r rpm-base,rpm-updates

    Sync every repository on one node and its ancestors:
        $ nodetree -f mirror3.example.com sync prod --all-repositories

    Sync the whole stage without asking:
        $ nodetree --all sync prod -r rpm-base

    Generate shell completions:
        $ nodetree completions bash > ~/.local/share/bash-completion/completions/nodetree

CONFIGURATION
    nodetree reads configuration from:
      1. ~/.config/nodetree/config.toml (or $XDG_CONFIG_HOME/nodetree/config.toml)
      2. ./nodetree.toml
      3. the file given with --config
      4. Environment variables (NODETREE_* prefix, e.g., NODETREE_TREE_FILE)
      5. .env file in current directory

ENVIRONMENT VARIABLES
    NODETREE_TREE_FILE        Stage tree file (default: ./tree.yaml)
    NODETREE_API__USER        Fallback API user
    NODETREE_API__PASSWD      Fallback API password
    NODETREE_API__SCHEME      http or https (default: https)
    RUST_LOG                  Log filter for non-interactive output
"#)]
struct Cli {
    /// Additional configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    selection: SelectionArgs,

    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Which nodes of a stage to act on.
#[derive(Debug, Clone, Default, clap::Args)]
struct SelectionArgs {
    /// Select a node (and its ancestors) by fqdn; repeatable
    #[arg(short = 'f', long = "fqdn", global = true, value_name = "FQDN")]
    fqdns: Vec<String>,

    /// Select nodes carrying a tag (and their ancestors); repeatable
    #[arg(short = 't', long = "tag", global = true, value_name = "TAG")]
    tags: Vec<String>,

    /// Act on the whole stage without asking
    #[arg(short = 'a', long, global = true)]
    all: bool,
}

impl SelectionArgs {
    fn has_filters(&self) -> bool {
        !self.fqdns.is_empty() || !self.tags.is_empty()
    }
}

/// How sync progress is rendered.
#[derive(Debug, Clone, Copy, Default, clap::Args)]
struct OutputArgs {
    /// One line per state change instead of progress bars
    #[arg(short = 'q', long, global = true, conflicts_with = "silent")]
    quiet: bool,

    /// No progress output and no error summary
    #[arg(short = 's', long, global = true)]
    silent: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a stage as a tree
    Show {
        /// Stage name
        stage: String,
    },
    /// Sync repositories on every selected node, parents first
    Sync {
        /// Stage name
        stage: String,

        /// Repositories to sync (comma-separated or repeated)
        #[arg(
            short = 'r',
            long = "repository",
            value_delimiter = ',',
            value_name = "REPO",
            required_unless_present = "all_repositories"
        )]
        repositories: Vec<String>,

        /// Sync every repository each node lists
        #[arg(long, conflicts_with = "repositories")]
        all_repositories: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when not connected to a TTY
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("nodetree=info,nodetree_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Show { stage } => {
            let config = config::Config::load(cli.config.as_deref());
            commands::show::handle_show(&config, &stage, &cli.selection)?;
        }
        Commands::Sync {
            stage,
            repositories,
            all_repositories,
        } => {
            let config = config::Config::load(cli.config.as_deref());
            let selection = commands::sync::repository_selection(repositories, all_repositories);
            let failed =
                commands::sync::handle_sync(&config, &stage, selection, &cli.selection, cli.output)
                    .await?;
            if failed {
                std::process::exit(1);
            }
        }
        Commands::Completions { shell } => {
            commands::meta::handle_completions(shell)?;
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output)?;
        }
    }

    Ok(())
}
