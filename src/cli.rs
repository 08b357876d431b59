use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the scheduler and the admin server (default)
    Serve,
    /// Run a job once, right now, and report its result
    RunJob {
        /// Name of the job as registered
        name: String,
    },
    /// List jobs or recent runs
    List {
        /// Show registered jobs with their schedule and next run (default)
        #[arg(long, conflicts_with = "runs")]
        cron: bool,
        /// Show the most recent job runs
        #[arg(long)]
        runs: bool,
        /// Number of runs to show (default: 50, max: 500)
        #[arg(short, long, requires = "runs")]
        limit: Option<u64>,
    },
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Subcommand)]
pub enum MigrateAction {
    /// Run migrations up
    Up {
        /// Number of migrations to run (default: all)
        #[arg(short, long)]
        steps: Option<u32>,
    },
    /// Run migrations down
    Down {
        /// Number of migrations to rollback (default: 1)
        #[arg(short, long, default_value = "1")]
        steps: u32,
    },
    /// Show migration status
    Status,
}
