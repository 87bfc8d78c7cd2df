use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let db_password = matches
        .get_one::<String>("db-password")
        .cloned()
        .map(SecretString::from);
    let session_ttl_seconds = matches
        .get_one::<i64>("session-ttl")
        .copied()
        .context("missing required argument: --session-ttl")?;
    let secure_cookies = matches.get_flag("secure-cookies");

    Ok(Action::Server(Args {
        port,
        dsn: SecretString::from(dsn),
        db_password,
        session_ttl_seconds,
        secure_cookies,
    }))
}
