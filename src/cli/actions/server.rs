use crate::{
    cli::telemetry,
    credentials::Credentials,
    store::{DynStore, MemoryStore, PgStore},
    warbler::{self, AuthConfig, AuthState},
};
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// DSN selecting the in-process store.
pub const MEMORY_DSN: &str = "memory://";

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub db_password: Option<SecretString>,
    pub session_ttl_seconds: i64,
    pub secure_cookies: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be
/// applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store = connect_store(&args).await?;

    let auth_config = AuthConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_session_cookie_secure(args.secure_cookies);
    let auth = Arc::new(AuthState::new(auth_config, Credentials::default()));

    let result = warbler::new(args.port, store, auth).await;

    telemetry::shutdown_tracer();

    result
}

async fn connect_store(args: &Args) -> Result<DynStore> {
    if args.dsn.expose_secret() == MEMORY_DSN {
        info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let dsn = build_dsn(&args.dsn, args.db_password.as_ref())?;
    let store = PgStore::connect(dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;
    store
        .apply_schema()
        .await
        .context("Failed to apply database schema")?;

    Ok(Arc::new(store))
}

/// Inject the optional password into the DSN.
fn build_dsn(dsn: &SecretString, password: Option<&SecretString>) -> Result<SecretString> {
    let Some(password) = password else {
        return Ok(dsn.clone());
    };

    let mut dsn = Url::parse(dsn.expose_secret()).context("Invalid DSN")?;

    dsn.set_password(Some(password.expose_secret()))
        .map_err(|()| anyhow!("Error setting password"))?;

    Ok(SecretString::from(dsn.to_string()))
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(args.dsn.expose_secret())),
        ("db_password_set", args.db_password.is_some().to_string()),
        ("session_ttl", format!("{}s", args.session_ttl_seconds)),
        ("secure_cookies", args.secure_cookies.to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    if dsn == MEMORY_DSN {
        return dsn.to_string();
    }
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "warbler {} - {}\n\n{title}:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
