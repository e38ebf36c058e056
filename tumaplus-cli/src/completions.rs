use crate::cli::Cli;
use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io::{self, Write};

/// Write the completion script for a shell
pub fn write_completion<W: Write>(shell: Shell, out: &mut W) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "tumaplus", out);
    out.flush()?;
    Ok(())
}

/// Print shell completion script to stdout
pub fn print_completion(shell: Shell) -> Result<()> {
    write_completion(shell, &mut io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completion_lists_subcommands() {
        let mut out = Vec::new();
        write_completion(Shell::Bash, &mut out).unwrap();
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("tumaplus"));
        assert!(script.contains("report"));
        assert!(script.contains("interactive"));
    }
}
