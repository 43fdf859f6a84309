//! Writes the pic24prog man pages
//!
//! Renders `pic24prog.1` for the global options and one `pic24prog-<command>.1`
//! page per subcommand (identify, read, write, erase, verify, ...). The
//! output directory defaults to `./man`.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use clap_mangen::Man;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

fn render(man: Man, path: &Path) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(path, buffer)?;
    println!("  {}", path.display());
    Ok(())
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    let command = cli::Cli::command();
    println!("Man pages generated:");
    for sub in command.get_subcommands() {
        let title = format!("pic24prog-{}", sub.get_name());
        let path = output_dir.join(format!("{}.1", title));
        render(Man::new(sub.clone()).title(title), &path)?;
    }
    render(Man::new(command), &output_dir.join("pic24prog.1"))?;

    println!("\nView with: man -l {}", output_dir.join("pic24prog.1").display());
    Ok(())
}
