//! `vidq completions <shell>` and `vidq man` – generated shell and man-page docs.

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::Shell;
use std::io;

pub fn run_completions(shell: Shell, mut cmd: Command) -> Result<()> {
    clap_complete::generate(shell, &mut cmd, "vidq", &mut io::stdout());
    Ok(())
}

pub fn run_man(cmd: Command) -> Result<()> {
    clap_mangen::Man::new(cmd)
        .render(&mut io::stdout())
        .context("render man page")
}
