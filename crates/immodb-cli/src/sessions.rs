//! Stored browser session commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use sqlx::SqlitePool;

/// Sub-commands available under `sessions`.
#[derive(Debug, Subcommand)]
pub enum SessionsCommands {
    /// List stored browser sessions, valid or not
    List,
    /// Invalidate the session stored for a profile on a portal
    Invalidate {
        /// Profile name the session is stored under
        #[arg(long)]
        profile: String,
        /// Portal identifier
        #[arg(long)]
        portal: String,
    },
}

/// Prints a table of every stored session.
///
/// # Errors
///
/// Returns an error when the session query fails.
pub(crate) async fn run_sessions_list(pool: &SqlitePool) -> anyhow::Result<()> {
    let sessions = immodb_db::list_sessions(pool).await?;

    if sessions.is_empty() {
        println!("no sessions stored; sessions are captured during `immodb scrape run`");
        return Ok(());
    }

    println!(
        "{:<16}{:<36}{:<7}{:<7}{:<6}{:<5}{:<6}LAST USED",
        "PORTAL", "PROFILE", "VALID", "AUTH", "USES", "OK", "FAIL"
    );
    for session in &sessions {
        println!(
            "{:<16}{:<36}{:<7}{:<7}{:<6}{:<5}{:<6}{}",
            session.portal,
            session.profile_name,
            yes_no(session.is_valid),
            yes_no(session.is_authenticated),
            session.use_count,
            session.success_count,
            session.failure_count,
            fmt_stamp(session.last_used_at),
        );
    }
    Ok(())
}

/// Marks the session for a profile/portal pair as invalid.
///
/// # Errors
///
/// Returns an error when the update fails.
pub(crate) async fn run_sessions_invalidate(
    pool: &SqlitePool,
    profile: &str,
    portal: &str,
) -> anyhow::Result<()> {
    let affected = immodb_db::invalidate_session(pool, profile, portal).await?;
    if affected == 0 {
        println!("no session stored for profile '{profile}' on portal '{portal}'");
    } else {
        println!("invalidated session for profile '{profile}' on portal '{portal}'");
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn fmt_stamp(stamp: Option<DateTime<Utc>>) -> String {
    stamp.map_or_else(
        || "\u{2014}".to_string(),
        |stamp| stamp.format("%Y-%m-%d %H:%M").to_string(),
    )
}
