use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gcouple")]
#[command(about = "Mine git history for file coupling across repositories, churn, and event exports")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Directory holding the commit cache (default: <repo>/.gcouple)")]
    pub cache: Option<PathBuf>,

    #[arg(long, global = true, help = "Read everything from git without touching the cache")]
    pub no_cache: bool,

    #[arg(long, global = true, help = "Include merge commits", default_value_t = true, action = ArgAction::Set)]
    pub include_merges: bool,

    #[arg(long, global = true, help = "Include binary files", default_value_t = false)]
    pub binary: bool,

    #[arg(long, global = true, help = "Start from this commit or date (RFC3339, YYYY-MM-DD, '3 weeks ago', 90d)")]
    pub since: Option<String>,

    #[arg(long, global = true, help = "End at this commit or date (RFC3339, YYYY-MM-DD, '3 weeks ago', 90d)")]
    pub until: Option<String>,

    #[arg(short, long, global = true, action = ArgAction::Count, help = "Increase log verbosity (-v info, -vv debug)")]
    pub verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChurnBy {
    File,
    Module,
    Author,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cross-repository file coupling over fixed time windows
    Coupling {
        #[arg(required = true, help = "Repositories to compare, in order (the same path may repeat)")]
        repos: Vec<PathBuf>,

        #[arg(long, default_value_t = 1, allow_negative_numbers = true, help = "Window length in days")]
        window_days: i64,

        #[arg(long, help = "Only consider files under this path prefix")]
        path: Option<String>,

        #[arg(long = "cloc", help = "`cloc --by-file --csv` output, one per repository in order")]
        cloc: Vec<PathBuf>,

        #[arg(long, value_name = "FILE", help = "Write the coupling CSV to FILE ('-' for stdout)")]
        csv: Option<PathBuf>,

        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, default_value_t = 20, help = "Rows shown in the summary table")]
        top: usize,
    },
    /// Churn grouped by file, module or author
    Churn {
        #[arg(long, help = "Path to git repository")]
        repo: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = ChurnBy::File)]
        by: ChurnBy,

        #[arg(long, help = "Directory depth for module aggregation")]
        depth: Option<u32>,

        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,

        #[arg(help = "Path prefix to analyze")]
        path: Option<String>,
    },
    /// Dump the per-file commit event stream of a repository
    Export {
        #[arg(long, help = "Path to git repository")]
        repo: Option<PathBuf>,

        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Coupling {
                repos,
                window_days,
                path,
                cloc,
                csv,
                json,
                top,
            } => crate::coupling::exec(
                self.common,
                crate::coupling::exec::CouplingArgs {
                    repos,
                    window_days,
                    path,
                    cloc,
                    csv,
                    json,
                    top,
                },
            ),
            Commands::Churn {
                repo,
                by,
                depth,
                json,
                ndjson,
                path,
            } => crate::churn::exec(self.common, repo, by, depth, json, ndjson, path),
            Commands::Export { repo, json, ndjson } => crate::export::exec(self.common, repo, json, ndjson),
        }
    }
}
