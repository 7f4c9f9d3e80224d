//! Douban-Backup main entry point
//!
//! This is the command-line interface for backing up Douban collections.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use douban_backup::auth::{
    parse_cookie_header, save_cookie_file, verify_cookies, SessionProvider, UserInfo,
};
use douban_backup::config::{load_config_or_default, Config};
use douban_backup::crawler::{backup_public, CrawlEngine, Orchestrator, RetryPolicy};
use douban_backup::output::{print_summary, BackupStorage};
use douban_backup::{BackupData, MediaType};
use std::future::Future;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Douban-Backup: export your Douban collections
///
/// Signs in with saved cookies or email and password, then walks the
/// movie, book, music and game collections and saves them as JSON and CSV.
/// Public collections of other users can be saved without signing in.
#[derive(Parser, Debug)]
#[command(name = "douban-backup")]
#[command(version = "1.0.0")]
#[command(about = "Back up your Douban collections", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Back up every media type enabled in the config (default)
    Run,

    /// Back up a single media type
    Media {
        #[arg(value_enum)]
        media_type: MediaType,

        /// Sign in with this email instead of saved cookies
        email: Option<String>,

        password: Option<String>,
    },

    /// Back up another user's public collections without signing in
    Public {
        /// Profile id as in `/people/<USER_ID>/`
        user_id: String,
    },

    /// List existing backup files, newest first
    List,

    /// Import cookies copied from a browser's `Cookie` request header
    ImportCookies {
        /// Cookie header; read from stdin when omitted
        cookie: Option<String>,

        /// Save the cookies even when they fail verification
        #[arg(long)]
        force: bool,
    },
}

/// How a crawl run ended
enum RunEnd {
    Finished(douban_backup::Result<()>),
    Interrupted,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => handle_run(&config).await,
        Command::Media {
            media_type,
            email,
            password,
        } => handle_media(&config, media_type, email, password).await,
        Command::Public { user_id } => handle_public(&config, &user_id).await,
        Command::List => handle_list(&config),
        Command::ImportCookies { cookie, force } => {
            handle_import_cookies(&config, cookie, force).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("douban_backup=info,warn"),
            1 => EnvFilter::new("douban_backup=debug,info"),
            2 => EnvFilter::new("douban_backup=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the default mode: full backup of every enabled media type
async fn handle_run(config: &Config) -> anyhow::Result<()> {
    let media_types = config.backup.media_types();
    if media_types.is_empty() {
        bail!("Every media type is disabled in the [backup] section");
    }

    let provider = SessionProvider::new(config)?;
    let user = sign_in(&provider, None, None).await?;

    let storage = BackupStorage::open(config.output.backup_dir())?;
    let mut data = BackupData::new();

    let end = crawl(config, provider, &user, &media_types, &mut data).await;
    if !save_unfinished(&storage, &data, end)? {
        return Ok(());
    }
    storage.save_all(&data)?;

    println!("\nBackup complete!\n");
    print_summary(&data, storage.dir());
    Ok(())
}

/// Handles the `media` command: backs up a single media type
async fn handle_media(
    config: &Config,
    media_type: MediaType,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let provider = SessionProvider::new(config)?;
    let user = sign_in(&provider, email.as_deref(), password.as_deref()).await?;

    let storage = BackupStorage::open(config.output.backup_dir())?;
    let mut data = BackupData::new();

    let end = crawl(config, provider, &user, &[media_type], &mut data).await;
    if !save_unfinished(&storage, &data, end)? {
        return Ok(());
    }
    let buckets = data.get(media_type.export_key()).cloned().unwrap_or_default();
    storage.save_media(media_type, &buckets)?;

    print_summary(&data, storage.dir());
    Ok(())
}

/// Handles the `public` command: no sign-in, enabled media types only
async fn handle_public(config: &Config, user_id: &str) -> anyhow::Result<()> {
    if config.backup.media_types().is_empty() {
        bail!("Every media type is disabled in the [backup] section");
    }

    let storage = BackupStorage::open(config.output.backup_dir())?;
    let mut data = BackupData::new();

    let end = until_interrupted(backup_public(config, user_id, &mut data)).await;
    if !save_unfinished(&storage, &data, end)? {
        return Ok(());
    }
    storage.save_all(&data)?;

    println!("\nBackup of {} complete!\n", user_id);
    print_summary(&data, storage.dir());
    Ok(())
}

/// Handles the `list` command
fn handle_list(config: &Config) -> anyhow::Result<()> {
    let storage = BackupStorage::open(config.output.backup_dir())?;
    let backups = storage.list_backups()?;

    if backups.is_empty() {
        println!("No backups in {}", storage.dir().display());
        return Ok(());
    }

    println!("Backups in {}:", storage.dir().display());
    for backup in &backups {
        println!(
            "  {} - {} ({:.1} KB)",
            backup.modified.format("%Y-%m-%d %H:%M:%S"),
            backup.name,
            backup.size as f64 / 1024.0
        );
    }

    Ok(())
}

/// Handles the `import-cookies` command
async fn handle_import_cookies(
    config: &Config,
    cookie: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let header = match cookie {
        Some(header) => header,
        None => prompt("Paste the Cookie header from your browser: ")?,
    };

    let cookies = parse_cookie_header(&header);
    if cookies.is_empty() {
        bail!("No name=value pairs found in the cookie header");
    }
    println!("Parsed {} cookies", cookies.len());

    if verify_cookies(&config.site, &config.crawler, &cookies).await {
        println!("Cookies verified");
    } else if force {
        println!("Cookies did not verify; saving anyway (--force)");
    } else {
        bail!("Cookies did not verify; copy them again after signing in, or pass --force");
    }

    let path = config.output.cookies_path();
    save_cookie_file(&path, &cookies)?;
    println!("Saved cookies to {}", path.display());
    Ok(())
}

/// Signs in with explicit credentials, else saved cookies, else a prompt
async fn sign_in(
    provider: &SessionProvider,
    email: Option<&str>,
    password: Option<&str>,
) -> anyhow::Result<UserInfo> {
    if let (Some(email), Some(password)) = (email, password) {
        return Ok(provider.login(email, password).await?);
    }

    if let Some(user) = provider.login_with_cookies().await? {
        return Ok(user);
    }

    let email = prompt("Douban email: ")?;
    let password = prompt("Password: ")?;
    let user = provider
        .login(&email, &password)
        .await
        .context("Login failed; try `import-cookies` with cookies from a signed-in browser")?;
    Ok(user)
}

/// Crawls `media_types` into `data` until done or Ctrl-C
async fn crawl(
    config: &Config,
    provider: SessionProvider,
    user: &UserInfo,
    media_types: &[MediaType],
    data: &mut BackupData,
) -> RunEnd {
    let session = provider.into_session();
    let engine = CrawlEngine::new(session.client(), RetryPolicy::from(&config.crawler));
    let orchestrator = Orchestrator::new(engine, &config.site);

    until_interrupted(orchestrator.backup(media_types, &user.id, data)).await
}

/// Runs `backup` until it finishes or Ctrl-C arrives
///
/// Dropping the backup future on Ctrl-C keeps every record it already
/// appended.
async fn until_interrupted<F>(backup: F) -> RunEnd
where
    F: Future<Output = douban_backup::Result<()>>,
{
    tokio::select! {
        result = backup => RunEnd::Finished(result),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, saving collected records");
            RunEnd::Interrupted
        }
    }
}

/// Saves `data` under an interrupted name unless the run finished cleanly
///
/// # Returns
///
/// * `Ok(true)` - The run finished; the caller saves the complete backup
/// * `Ok(false)` - Interrupted; partial records were saved
/// * `Err` - The run failed; partial records were saved before reporting it
fn save_unfinished(
    storage: &BackupStorage,
    data: &BackupData,
    end: RunEnd,
) -> anyhow::Result<bool> {
    let error = match end {
        RunEnd::Finished(Ok(())) => return Ok(true),
        RunEnd::Finished(Err(e)) => Some(e),
        RunEnd::Interrupted => None,
    };

    let saved = storage.save_interrupted(data)?;
    match error {
        Some(e) => {
            println!("Backup failed; partial backup saved to {}", saved.json.display());
            Err(e.into())
        }
        None => {
            println!("Interrupted; partial backup saved to {}", saved.json.display());
            Ok(false)
        }
    }
}

fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
