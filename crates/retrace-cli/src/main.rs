mod cmd_chain;
mod cmd_parse;
mod cmd_sessions;
mod cmd_trace;
mod cmd_transcripts;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "retrace",
    version,
    about = "Trace epics in Claude Code transcripts back to their provenance"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse one transcript and summarize its beads activity
    Parse {
        /// Transcript file (.jsonl)
        transcript: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Print only the epic selected for the session
        #[arg(long)]
        extract_epic: bool,
    },
    /// Show the compaction chain a transcript belongs to
    Chain {
        /// Any transcript of the chain
        transcript: PathBuf,
        /// Merge the chain into one composite session
        #[arg(long)]
        composite: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Group a project's transcripts into sessions by slug
    Sessions {
        /// Project directory (default: current directory)
        #[arg(long)]
        project: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a project's transcripts, newest first
    Transcripts {
        /// Project directory (default: current directory)
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Trace an epic's provenance and print the report
    Trace {
        /// Epic id (selected from the transcript if omitted)
        #[arg(long)]
        epic: Option<String>,
        /// Transcript to take commits and decisions from
        #[arg(long)]
        transcript: Option<PathBuf>,
        /// Project root (inferred from changed files if omitted)
        #[arg(long)]
        project: Option<PathBuf>,
        /// Do not merge the transcript's compaction chain
        #[arg(long)]
        no_chain: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("RETRACE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.cmd {
        Command::Parse {
            transcript,
            json,
            extract_epic,
        } => cmd_parse::execute(&transcript, json, extract_epic),
        Command::Chain {
            transcript,
            composite,
            json,
        } => cmd_chain::execute(&transcript, composite, json),
        Command::Sessions { project, json } => {
            let project = project_or_cwd(project)?;
            cmd_sessions::execute(&project, json)
        }
        Command::Transcripts { project } => {
            let project = project_or_cwd(project)?;
            cmd_transcripts::execute(&project)
        }
        Command::Trace {
            epic,
            transcript,
            project,
            no_chain,
            json,
            output,
        } => cmd_trace::execute(&cmd_trace::TraceCliParams {
            epic: epic.as_deref(),
            transcript: transcript.as_deref(),
            project: project.as_deref(),
            no_chain,
            json,
            output: output.as_deref(),
        }),
    }
}

fn project_or_cwd(project: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match project {
        Some(p) => Ok(p),
        None => Ok(std::env::current_dir()?),
    }
}
