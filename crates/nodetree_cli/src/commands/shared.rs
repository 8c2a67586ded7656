//! Stage loading and node selection shared by `show` and `sync`.

use std::error::Error;

use console::{Term, style};
use nodetree::{Stage, StageTree};

use crate::SelectionArgs;

/// What to do before acting on the selected nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Consent {
    /// Filters narrowed the stage, or `--all` was given.
    Granted,
    /// The whole stage is selected; ask on the terminal.
    Ask,
    /// The whole stage is selected and there is nobody to ask.
    Refused,
}

/// Decide whether acting on `selection` needs the user's confirmation.
pub(crate) fn consent(selection: &SelectionArgs, interactive: bool) -> Consent {
    if selection.all || selection.has_filters() {
        Consent::Granted
    } else if interactive {
        Consent::Ask
    } else {
        Consent::Refused
    }
}

/// Build stage `name` and apply the fqdn/tag filters. Unknown fqdns are
/// reported but not fatal.
pub(crate) fn load_stage(
    tree: &StageTree,
    name: &str,
    selection: &SelectionArgs,
) -> Result<Stage, Box<dyn Error>> {
    let stage = tree.stage(name)?;

    for fqdn in unknown_fqdns(&stage, &selection.fqdns) {
        tracing::warn!(fqdn, stage = name, "Node not found in stage");
        eprintln!(
            "{} node '{}' is not part of stage '{}'",
            style("warning:").yellow().bold(),
            fqdn,
            name
        );
    }

    if selection.has_filters() {
        Ok(stage.filter(&selection.fqdns, &selection.tags))
    } else {
        Ok(stage)
    }
}

fn unknown_fqdns<'a>(stage: &Stage, fqdns: &'a [String]) -> Vec<&'a str> {
    fqdns
        .iter()
        .filter(|fqdn| stage.node_by_fqdn(fqdn).is_none())
        .map(String::as_str)
        .collect()
}

/// Show the stage and ask whether to act on all of it.
///
/// Returns `Ok(false)` when the user declines.
pub(crate) fn confirm_whole_stage(stage: &Stage, action: &str) -> Result<bool, Box<dyn Error>> {
    let term = Term::stderr();
    term.write_line(&stage.render_tree())?;
    term.write_line("")?;
    term.write_str(&format!(
        "No --fqdn or --tag given. {} all {} nodes of stage '{}'? [y/N] ",
        action,
        stage.len(),
        stage.name()
    ))?;
    let answer = term.read_line()?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
