use std::error::Error;

use console::style;

use super::shared::load_stage;
use crate::SelectionArgs;
use crate::config::Config;

pub(crate) fn handle_show(
    config: &Config,
    stage_name: &str,
    selection: &SelectionArgs,
) -> Result<(), Box<dyn Error>> {
    let tree = config.load_stage_tree()?;
    let stage = load_stage(&tree, stage_name, selection)?;

    if let Some(description) = &tree.description {
        println!("{}", style(description).dim());
    }

    println!(
        "{} ({} nodes)",
        style(stage.name()).bold().cyan(),
        stage.len()
    );
    println!("{}", stage.render_tree());
    Ok(())
}
