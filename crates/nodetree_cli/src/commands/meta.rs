//! Shell completions and man pages.

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;

use crate::Cli;

const BIN_NAME: &str = "nodetree";

fn completion_script(shell: clap_complete::Shell) -> Vec<u8> {
    let mut cmd = Cli::command();
    let mut out = Vec::new();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, &mut out);
    out
}

fn render_man(cmd: clap::Command) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut out = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut out)?;
    Ok(out)
}

fn write_stdout(bytes: &[u8]) -> Result<(), Box<dyn Error>> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()?;
    Ok(())
}

/// Write `nodetree.1` plus one page per subcommand into `dir`.
fn write_man_pages(dir: &Path) -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all(dir)?;
    clap_mangen::generate_to(Cli::command(), dir)?;
    Ok(())
}

pub(crate) fn handle_completions(shell: clap_complete::Shell) -> Result<(), Box<dyn Error>> {
    write_stdout(&completion_script(shell))
}

pub(crate) fn handle_man(output: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    match output {
        Some(dir) => {
            write_man_pages(&dir)?;
            println!("Generated man pages in: {}", dir.display());
            Ok(())
        }
        None => write_stdout(&render_man(Cli::command())?),
    }
}
