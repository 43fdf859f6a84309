//! pic24prog - PIC24, dsPIC30 & dsPIC33 ICSP programmer
//!
//! Reads, writes, verifies and erases 16-bit Microchip microcontrollers by
//! bit-banging the ICSP protocol through a simple adapter.
//!
//! # Architecture
//!
//! The CLI resolves `--programmer` into a line driver through
//! `pic24prog-flash`, wraps it in the core programming engine and runs one
//! of the device operations from `pic24prog_core::flash`. Images are
//! exchanged as Intel HEX files with four bytes per instruction word.

mod cli;
mod commands;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use pic24prog_core::protocol::Pic24Programmer;
use pic24prog_flash::{find_programmer, open_programmer, parse_programmer_params};

use std::path::Path;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    // Usage errors exit with status 2 before any hardware is touched
    if let Err(e) = check_usage(&cli) {
        e.exit();
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn usage_error(kind: ErrorKind, message: impl std::fmt::Display) -> clap::Error {
    Cli::command().error(kind, message)
}

fn is_list_command(command: &Commands) -> bool {
    matches!(command, Commands::ListProgrammers | Commands::ListChips)
}

/// Check the programmer and the file arguments a command needs
fn check_usage(cli: &Cli) -> Result<(), clap::Error> {
    if is_list_command(&cli.command) {
        return Ok(());
    }

    let spec = cli.programmer.as_deref().ok_or_else(|| {
        usage_error(
            ErrorKind::MissingRequiredArgument,
            "No programmer specified (--programmer)",
        )
    })?;
    let params =
        parse_programmer_params(spec).map_err(|e| usage_error(ErrorKind::InvalidValue, e))?;
    if find_programmer(&params.name).is_none() {
        return Err(usage_error(
            ErrorKind::InvalidValue,
            format!(
                "unknown programmer: {} [available: {}]",
                params.name,
                pic24prog_flash::programmer_names_short()
            ),
        ));
    }

    if matches!(cli.command, Commands::Write | Commands::Verify) && cli.read_file.is_none() {
        return Err(usage_error(
            ErrorKind::MissingRequiredArgument,
            "read file not specified (--read-file)",
        ));
    }
    Ok(())
}

fn read_file(cli: &Cli) -> Result<&Path, Box<dyn std::error::Error>> {
    cli.read_file
        .as_deref()
        .ok_or_else(|| "read file not specified (--read-file)".into())
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::ListProgrammers => {
            commands::list_programmers();
            return Ok(());
        }
        Commands::ListChips => {
            commands::list_chips();
            return Ok(());
        }
        _ => {}
    }

    let spec = cli
        .programmer
        .as_deref()
        .ok_or("No programmer specified (--programmer)")?;
    let driver = open_programmer(spec)?;
    let mut prog = Pic24Programmer::new(driver);

    let result = match cli.command {
        Commands::Identify => commands::identify::run(&mut prog),
        Commands::Read => {
            commands::read::run(&mut prog, cli.write_file.as_deref(), cli.swap_lanes)
        }
        Commands::Write => read_file(cli)
            .and_then(|input| commands::write::run(&mut prog, input, cli.swap_lanes)),
        Commands::Verify => read_file(cli)
            .and_then(|input| commands::verify::run(&mut prog, input, cli.swap_lanes)),
        Commands::Erase => commands::erase::run(&mut prog),
        Commands::ListProgrammers | Commands::ListChips => Ok(()),
    };

    if cli.no_run {
        return result;
    }

    // Let the target run its program even when the command failed
    let started = prog.start_device();
    result?;
    started?;
    log::info!("Target started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pic24prog").chain(args.iter().copied())).unwrap()
    }

    #[cfg(feature = "dummy")]
    fn temp_hex(name: &str) -> std::path::PathBuf {
        use pic24prog_core::hex::{word_set, HexImage};

        let path = std::env::temp_dir()
            .join(format!("pic24prog-{}-{}.hex", name, std::process::id()));
        let mut image = HexImage::new();
        word_set(&mut image, 0, 0x12_3456);
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn test_missing_programmer_is_usage_error() {
        let err = check_usage(&parse(&["identify"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_unknown_programmer_is_usage_error() {
        let err = check_usage(&parse(&["identify", "--programmer=ch341a"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(err.exit_code(), 2);

        let err = check_usage(&parse(&["identify", "--programmer=dummy:devid"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_missing_read_file_is_usage_error() {
        for command in ["write", "verify"] {
            let err = check_usage(&parse(&[command, "--programmer=dummy"])).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
            assert_eq!(err.exit_code(), 2);
        }
        assert!(check_usage(&parse(&["read", "--programmer=dummy"])).is_ok());
        assert!(check_usage(&parse(&["list-chips"])).is_ok());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_identify_succeeds() {
        let cli = parse(&["identify", "--programmer=dummy"]);
        assert!(check_usage(&cli).is_ok());
        assert!(run(&cli).is_ok());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_device_failures_are_runtime_errors() {
        let path = temp_hex("stall");
        let file = path.to_string_lossy().into_owned();

        let cli = parse(&["write", "--programmer=dummy:stall=1", "--read-file", &file]);
        assert!(check_usage(&cli).is_ok());
        assert!(run(&cli).is_err());

        let cli = parse(&["read", "--programmer=dummy:devid=1234", "--no-run"]);
        assert!(check_usage(&cli).is_ok());
        assert!(run(&cli).is_err());

        // Blank simulated flash does not match the image
        let cli = parse(&["verify", "--programmer=dummy", "--read-file", &file]);
        let err = run(&cli).unwrap_err();
        assert_eq!(err.to_string(), pic24prog_core::Error::VerifyError.to_string());

        std::fs::remove_file(&path).unwrap();
    }
}
