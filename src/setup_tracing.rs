use time::format_description::parse;
use tracing_subscriber::{fmt::time::OffsetTime, EnvFilter};

use crate::cli::Commands;

pub fn setup_tracing_for_command(command: &Option<Commands>, server_log_level: &str) {
    // Operator commands print their own output, so logs stay at 'warn' unless
    // RUST_LOG says otherwise. The long-running server uses the configured level.
    let default_level = match command {
        Some(Commands::RunJob { .. } | Commands::List { .. } | Commands::Migrate { .. }) => "warn",
        Some(Commands::Serve) | None => server_log_level,
    };

    let mut env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Filter out noisy third-party logs
    for directive in ["sqlx::postgres::notice=warn", "sea_orm_migration::migrator=warn"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    let timer = parse("[hour]:[minute]:[second].[subsecond digits:2]")
        .map(|format| {
            OffsetTime::new(
                time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC),
                format,
            )
        })
        .ok();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false) // Remove module paths for cleaner output
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_ansi(true)
        .compact();

    match timer {
        Some(timer) => subscriber.with_timer(timer).init(),
        None => subscriber.init(),
    }
}
