use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use zitrog::session::{FileReport, RetroOptions, RetroSession, DEFAULT_PRESERVED_TAGS};
use zitrog::{Conflict, PreservedFrames, Prompter, TargetEncoding};

const LOGO: &str = r"
                              _______ ______     __
                              \___  // ||   \   / /
                                 / //  || |\ | / /
                                / // / || |/ |/ /
                               / //_/| ||  _//_/
                              /_____\|_||_| /_/

                           Zoe's ID3 Tag Retroencoder
                              for Outdated Devices
";

#[derive(Parser)]
#[command(
    name = "zitrog",
    version,
    about = "Re-encode ID3 text tags into legacy encodings for outdated devices",
    before_long_help = LOGO
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-encode Unicode text frames into a legacy encoding
    #[command(alias = "retro-encode")]
    Retroencode {
        /// Input file paths
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// Frames to keep; all others are dropped from the output
        #[arg(short, long, num_args = 1.., default_values = DEFAULT_PRESERVED_TAGS)]
        preserve: Vec<String>,
        /// Target encoding: shift-jis (default), latin1
        #[arg(short, long, default_value = "shift-jis")]
        encoding: String,
        /// Accept suggested corrections without prompting
        #[arg(short = 'u', long)]
        automatic: bool,
        /// Overwrite existing output files without prompting
        #[arg(short = 'w', long)]
        overwrite: bool,
        /// Log raw frame bytes
        #[arg(short, long)]
        verbose: bool,
        /// Print a JSON report of every processed file on stdout
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Commands::Retroencode {
            input,
            output,
            preserve,
            encoding,
            automatic,
            overwrite,
            verbose,
            json,
        } => {
            let filter = if verbose { "debug" } else { "info" };
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();

            let target = TargetEncoding::from_name(&encoding)
                .ok_or_else(|| format!("Unknown target encoding '{encoding}'"))?;
            let preserve: Vec<String> = preserve.iter().map(|p| p.to_uppercase()).collect();
            tracing::info!(
                inputs = input.len(),
                output = %output.display(),
                preserved = ?preserve,
                target = %target,
                "Retro-encoding"
            );

            let mut session = RetroSession::new(RetroOptions {
                preserved: PreservedFrames::new(preserve),
                target,
                auto_correct: automatic,
                auto_overwrite: overwrite,
                verbose,
            });

            let mut prompter = ConsolePrompter;
            let mut reports: Vec<FileReport> = Vec::with_capacity(input.len());
            for path in &input {
                reports.push(session.process_file(path, &output, &mut prompter)?);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Prompts on stderr, reads replies from stdin.
struct ConsolePrompter;

impl ConsolePrompter {
    fn ask(&self, prompt: &str) -> io::Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{prompt}> ")?;
        stderr.flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
        }
        Ok(line.trim().to_owned())
    }
}

impl Prompter for ConsolePrompter {
    fn correction(&mut self, conflict: &Conflict<'_>) -> io::Result<String> {
        let positions: Vec<String> = conflict.positions.iter().map(|p| p.to_string()).collect();
        eprintln!();
        eprintln!("!!! ENCODING ERROR ON <{}> @ POS.{} !!!", conflict.frame, positions.join(","));
        eprintln!();
        eprintln!("ACCEPT AUTOMATIC CORRECTION \"{}\" >>> \"{}\" ?", conflict.working, conflict.suggestion);
        eprintln!();
        self.ask("Enter to Accept, or Submit Own Correction")
    }

    fn confirm_overwrite(&mut self, path: &Path) -> io::Result<bool> {
        loop {
            match self
                .ask(&format!("File exists at {}. Allow overwrite? (y/n)", path.display()))?
                .to_lowercase()
                .as_str()
            {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => {}
            }
        }
    }
}
