use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

use console::{Term, style};
use nodetree::pulp::PulpClient;
use nodetree::{RepositorySelection, SyncErrors, SyncOptions, sync_stage};

use super::shared::{Consent, confirm_whole_stage, consent, load_stage};
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::{OutputArgs, SelectionArgs};

pub(crate) fn repository_selection(
    repositories: Vec<String>,
    all_repositories: bool,
) -> RepositorySelection {
    if all_repositories {
        RepositorySelection::All
    } else {
        RepositorySelection::Named(repositories)
    }
}

/// Run a sync of `stage_name`. Returns true when any node recorded an error.
pub(crate) async fn handle_sync(
    config: &Config,
    stage_name: &str,
    repositories: RepositorySelection,
    selection: &SelectionArgs,
    output: OutputArgs,
) -> Result<bool, Box<dyn Error>> {
    if repositories.is_empty() {
        return Err("no repository given; use --repository or --all-repositories".into());
    }

    let tree = config.load_stage_tree()?;
    let stage = load_stage(&tree, stage_name, selection)?;

    match consent(selection, Term::stdout().is_term()) {
        Consent::Granted => {}
        Consent::Ask => {
            if !confirm_whole_stage(&stage, "Sync")? {
                println!("Aborted.");
                return Ok(false);
            }
        }
        Consent::Refused => {
            return Err(format!(
                "refusing to sync all {} nodes of stage '{}' without a terminal; \
                 pass --all or narrow with --fqdn/--tag",
                stage.len(),
                stage.name()
            )
            .into());
        }
    }

    let client = PulpClient::new(&config.pulp_options(&tree))?;
    let options = SyncOptions {
        repositories,
        policy: config.poll_policy(),
        check_feeds: config.sync.check_feeds,
    };

    tracing::info!(
        stage = stage.name(),
        nodes = stage.len(),
        repositories = %describe(&options.repositories),
        "Syncing stage"
    );

    let reporter = Arc::new(ProgressReporter::for_output(output.quiet, output.silent));
    let stage = Arc::new(stage);
    let started = Instant::now();

    let errors = sync_stage(&stage, Arc::new(client), options, Some(reporter.as_callback())).await;
    reporter.finish();

    if !output.silent {
        print_summary(stage.name(), &errors, started.elapsed().as_secs_f64());
    }

    Ok(errors.any())
}

fn describe(repositories: &RepositorySelection) -> String {
    match repositories {
        RepositorySelection::Named(names) => names.join(","),
        RepositorySelection::All => "all".to_string(),
    }
}

fn print_summary(stage: &str, errors: &SyncErrors, elapsed_secs: f64) {
    if !errors.any() {
        println!(
            "{} stage '{}' synced in {:.1}s",
            style("✓").green().bold(),
            stage,
            elapsed_secs
        );
        return;
    }

    eprintln!(
        "\n{} {} node(s) reported errors, {} repository sync(s) failed:\n",
        style("✗").red().bold(),
        errors.nodes.len(),
        errors.failed_repositories()
    );
    eprint!("{errors}");
}
