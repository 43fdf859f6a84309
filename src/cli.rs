//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use, optionally with parameters (name:key=value,...) [available: {}]",
        pic24prog_flash::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "pic24prog")]
#[command(author, version, about = "PIC24, dsPIC30 & dsPIC33 ICSP programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(long, global = true, help = programmer_help())]
    pub programmer: Option<String>,

    /// Intel HEX file to program or verify against
    #[arg(long, global = true)]
    pub read_file: Option<PathBuf>,

    /// Save the read memory to this Intel HEX file instead of printing it
    #[arg(long, global = true)]
    pub write_file: Option<PathBuf>,

    /// Hex files store the padding byte first in every word
    #[arg(long, global = true)]
    pub swap_lanes: bool,

    /// Leave the target stopped after the command
    #[arg(long, global = true)]
    pub no_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the attached chip
    Identify,

    /// Read flash, programming executive and configuration words
    Read,

    /// Program the chip from --read-file
    Write,

    /// Erase the chip
    Erase,

    /// Compare the chip against --read-file
    Verify,

    /// List supported programmers
    ListProgrammers,

    /// List supported chips
    ListChips,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_options_after_command() {
        let cli = Cli::try_parse_from([
            "pic24prog",
            "write",
            "--programmer=dummy",
            "--read-file",
            "fw.hex",
            "--no-run",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Write));
        assert_eq!(cli.programmer.as_deref(), Some("dummy"));
        assert_eq!(cli.read_file, Some(PathBuf::from("fw.hex")));
        assert!(cli.no_run);
        assert!(!cli.swap_lanes);
    }

    #[test]
    fn test_missing_command() {
        assert!(Cli::try_parse_from(["pic24prog", "--programmer=dummy"]).is_err());
    }

    #[test]
    fn test_list_commands_need_no_programmer() {
        let cli = Cli::try_parse_from(["pic24prog", "list-chips"]).unwrap();
        assert!(matches!(cli.command, Commands::ListChips));
        assert!(cli.programmer.is_none());
        let cli = Cli::try_parse_from(["pic24prog", "-vv", "identify"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
