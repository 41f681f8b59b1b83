//! rolemask binary.
//!
//! Reads `rolemask.toml` (or the path given with `--config`) layered under
//! `ROLEMASK__*` environment variables, opens the SQLite store, and either
//! serves the admin API or runs one job and exits.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `admin_password_hash`:
//!
//! ```
//! cargo run -p rolemask-server -- hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::{Parser, Subcommand};
use rolemask_core::{
  config::{ConfigValues, ObfuscationMethod},
  obfuscate::preview_name,
};
use rolemask_discord::DiscordClient;
use rolemask_server::{AppState, ServerConfig, auth::AuthConfig, worker};
use rolemask_store_sqlite::SqliteStore;
use rolemask_sync::Syncer;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Obfuscated role names for an external chat platform")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rolemask.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the admin API and run the background jobs.
  Serve,
  /// Push desired role names to the platform.
  Sync {
    /// Sync only this subject.
    #[arg(long)]
    subject: Option<Uuid>,
  },
  /// Rotate random keys and reposition the rotated roles.
  Rotate {
    /// Run even when rotation is disabled in the global settings.
    #[arg(long)]
    force: bool,
  },
  /// Assign palette colors to roles matched by color rules.
  Colors {
    /// Run even when color rule sync is disabled in the global settings.
    #[arg(long)]
    force: bool,
  },
  /// Create configurations for groups that already have a role.
  Discover,
  /// Print the role name a subject would get.
  Preview {
    name:   String,
    /// Unknown methods fall back to the configured default.
    #[arg(long)]
    method: Option<String>,
    #[arg(long)]
    format: Option<String>,
  },
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

type AppSyncer = Syncer<SqliteStore, DiscordClient>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let load = || load_config(&cli.config);

  match cli.command {
    Command::HashPassword => {
      let password = read_password()?;
      let salt = SaltString::generate(&mut OsRng);
      let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
        .to_string();
      println!("{hash}");
    }
    Command::Serve => serve(load()?).await?,
    Command::Preview { name, method, format } => {
      let server_cfg = load()?;
      let draft = ConfigValues {
        method: method
          .map(|m| ObfuscationMethod::parse_or(&m, server_cfg.obfuscation.default_method))
          .unwrap_or(server_cfg.obfuscation.default_method),
        format: format.unwrap_or_default(),
        ..Default::default()
      };
      println!("{}", preview_name(name.trim(), &draft, &server_cfg.obfuscation));
    }
    Command::Sync { subject: Some(id) } => {
      let server_cfg = load()?;
      let syncer = build_syncer(&server_cfg).await?;
      let synced = syncer.sync_subject(id).await?;
      println!("{}", if synced { "synced" } else { "not synced" });
    }
    Command::Sync { subject: None } => {
      let server_cfg = load()?;
      let syncer = build_syncer(&server_cfg).await?;
      let synced = syncer.sync_all(&server_cfg.batch.control()).await?;
      println!("synced {synced} subject(s)");
    }
    Command::Rotate { force } => {
      let server_cfg = load()?;
      let syncer = build_syncer(&server_cfg).await?;
      let renamed = syncer.rotate_and_reposition(force, &server_cfg.batch.control()).await?;
      println!("rotated {renamed} subject(s)");
    }
    Command::Colors { force } => {
      let server_cfg = load()?;
      let syncer = build_syncer(&server_cfg).await?;
      let assigned = syncer.sync_color_rules(force, &server_cfg.batch.control()).await?;
      println!("colored {assigned} role(s)");
    }
    Command::Discover => {
      let server_cfg = load()?;
      let syncer = build_syncer(&server_cfg).await?;
      let created = syncer.discover_subjects().await?;
      println!("created {created} configuration(s)");
    }
  }

  Ok(())
}

async fn serve(server_cfg: ServerConfig) -> anyhow::Result<()> {
  if server_cfg.admin_username.is_empty() || server_cfg.admin_password_hash.is_empty() {
    anyhow::bail!("admin_username and admin_password_hash must be set to serve");
  }

  let syncer = Arc::new(build_syncer(&server_cfg).await?);
  worker::spawn(Arc::clone(&syncer), server_cfg.worker, server_cfg.batch);

  let state = AppState {
    syncer,
    auth: Arc::new(AuthConfig {
      username:      server_cfg.admin_username.clone(),
      password_hash: server_cfg.admin_password_hash.clone(),
    }),
    batch: server_cfg.batch,
  };

  let app = rolemask_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("ROLEMASK")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

async fn build_syncer(server_cfg: &ServerConfig) -> anyhow::Result<AppSyncer> {
  let discord = server_cfg
    .discord
    .clone()
    .context("the [discord] section is required for this command")?;
  let client = DiscordClient::new(discord).context("failed to build the Discord client")?;
  tracing::debug!(guild_id = client.guild_id(), "platform client ready");

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  Ok(Syncer::new(store, client, server_cfg.sync_settings()))
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
