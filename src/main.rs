use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use git_partial::diff::DependencyLock;
use git_partial::{Action, GitPartialError, HunkLock, LineSelector, StackId};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "GIT_PARTIAL_LOG";

#[derive(Parser)]
#[command(name = "git-partial")]
#[command(about = "Recompute hunk headers for a selection of changed lines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the changed lines of a diff with their line references
    Show {
        /// Read the diff from this file instead of stdin
        #[arg(long)]
        diff: Option<PathBuf>,
    },
    /// Print hunk headers for selected lines (e.g., file.nix:10..15,-20)
    Headers {
        /// commit (standalone headers) or discard (anchored to the hunk)
        #[arg(long, default_value = "commit")]
        action: Action,
        #[arg(long)]
        diff: Option<PathBuf>,
        /// File and line references (e.g., "flake.nix:137" or "flake.nix:10..15")
        file_ref: String,
    },
    /// Print the runs the selected lines fall into
    Groups {
        #[arg(long)]
        diff: Option<PathBuf>,
        file_ref: String,
    },
    /// Print which lines of a file other stacks have claimed
    Locks {
        /// Stack asking; its own claims do not count
        #[arg(long)]
        stack: String,
        /// Claim as STACK:COMMIT:@@ -o,n +o,n @@ (repeatable)
        #[arg(long = "lock", value_parser = parse_lock)]
        locks: Vec<HunkLock>,
        #[arg(long)]
        diff: Option<PathBuf>,
        file: String,
    },
    /// Generate shell completions
    Completions { shell: Shell },
    /// Generate a man page
    Man,
}

fn parse_lock(s: &str) -> Result<HunkLock, String> {
    let mut parts = s.splitn(3, ':');
    let (Some(stack), Some(commit), Some(header)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected STACK:COMMIT:HEADER, got '{}'", s));
    };
    if stack.is_empty() || commit.is_empty() {
        return Err(format!("empty stack or commit in '{}'", s));
    }
    let hunk = header.trim().parse().map_err(|e| format!("{}", e))?;
    Ok(HunkLock {
        hunk,
        locks: vec![DependencyLock {
            stack_id: stack.into(),
            commit_id: commit.to_string(),
        }],
    })
}

fn read_diff(path: Option<&PathBuf>) -> Result<LineSelector, GitPartialError> {
    let text = match path {
        Some(path) => {
            std::fs::read_to_string(path).map_err(|e| GitPartialError::ReadFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| GitPartialError::ReadFailed {
                    path: "<stdin>".to_string(),
                    message: e.to_string(),
                })?;
            text
        }
    };
    debug!(bytes = text.len(), "read diff");
    LineSelector::parse(&text)
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing().map_err(|e| e as Box<dyn std::error::Error>)?;

    match cli.command {
        Commands::Show { diff } => {
            print!("{}", read_diff(diff.as_ref())?.annotate()?);
        }
        Commands::Headers {
            action,
            diff,
            file_ref,
        } => {
            for header in read_diff(diff.as_ref())?.headers(&file_ref, action)? {
                println!("{}", header);
            }
        }
        Commands::Groups { diff, file_ref } => {
            for group in read_diff(diff.as_ref())?.groups(&file_ref)? {
                println!("{}", group);
            }
        }
        Commands::Locks {
            stack,
            locks,
            diff,
            file,
        } => {
            let owner = StackId::from(stack);
            for report in read_diff(diff.as_ref())?.locks(&file, &owner, &locks)? {
                println!("{}", report);
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "git-partial", &mut io::stdout());
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?;
        }
    }

    Ok(())
}
