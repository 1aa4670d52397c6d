//! Command line front end for the OneDrive path filesystem
//!
//! Every command goes through the same `DriveFs` facade a protocol server
//! would use, so it doubles as a manual test bench for the core.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use onedrive_pathfs::auth::token_store::{StoredTokenAuth, TokenStore};
use onedrive_pathfs::auth::{AuthProvider, StaticTokenAuth};
use onedrive_pathfs::config::ProjectConfig;
use onedrive_pathfs::fs::{spawn_cache_janitor, DriveFs, Metadata};
use onedrive_pathfs::log_appender::{parse_level, setup_logging};
use onedrive_pathfs::onedrive_service::onedrive_client::{OneDriveClient, RemoteStore};
use onedrive_pathfs::onedrive_service::onedrive_models::ROOT_ID;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

const TOKEN_ENV_VAR: &str = "ONEDRIVE_ACCESS_TOKEN";
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Browse and modify a OneDrive by path
#[derive(Parser, Debug)]
#[command(name = "onedrive-pathfs")]
#[command(version, about, long_about = None)]
struct Args {
    /// Log level (error, warn, info, debug, trace); overrides the settings file
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Access token to use instead of the stored one
    #[arg(long, value_name = "TOKEN", env = TOKEN_ENV_VAR, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the drive root is reachable
    Check,
    /// Show metadata of a path
    Stat { path: String },
    /// List the children of a folder
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Write a file's content to stdout
    Cat { path: String },
    /// Upload a local file to a new remote path
    Put { local: PathBuf, remote: String },
    /// Create a folder
    Mkdir { path: String },
    /// Remove a file or a folder with everything in it
    Rm { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_config = ProjectConfig::new().context("Failed to load configuration")?;
    let settings = &project_config.settings;

    let level = parse_level(args.log_level.as_deref().unwrap_or(&settings.log_level))?;
    setup_logging(project_config.project_dirs.data_dir(), level)
        .context("Failed to setup logging")?;

    let auth: Arc<dyn AuthProvider> = match args.token {
        Some(token) => Arc::new(StaticTokenAuth::new(token)?),
        None => Arc::new(StoredTokenAuth::new(TokenStore::new(
            project_config.project_dirs.config_dir(),
        ))),
    };

    let client = Arc::new(OneDriveClient::new(auth, &settings.api_base, &settings.fs));
    let store: Arc<dyn RemoteStore> = client;
    let drive = DriveFs::new(store.clone(), settings.fs.clone())?;
    let janitor = spawn_cache_janitor(drive.cache(), settings.fs.purge_interval);

    debug!("Running {:?}", args.command);
    let result = run(args.command, &drive, store.as_ref()).await;
    janitor.abort();
    result
}

async fn run(command: Commands, drive: &DriveFs, store: &dyn RemoteStore) -> Result<()> {
    match command {
        Commands::Check => {
            let root = store
                .get_by_id(ROOT_ID)
                .await
                .context("Failed to reach the drive root")?;
            println!("OK: root folder {}", root.id);
        }
        Commands::Stat { path } => {
            let metadata = drive.stat(&path).await?;
            print_metadata(&metadata);
        }
        Commands::Ls { path } => {
            for entry in drive.list_children(&path).await? {
                print_metadata(&entry);
            }
        }
        Commands::Cat { path } => {
            let mut handle = drive.open_for_read(&path).await?;
            let mut stdout = tokio::io::stdout();
            let mut buf = vec![0u8; READ_BUFFER_SIZE];
            loop {
                let n = handle.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                stdout.write_all(&buf[..n]).await?;
            }
            stdout.flush().await?;
            handle.close()?;
        }
        Commands::Put { local, remote } => {
            let content = tokio::fs::read(&local)
                .await
                .with_context(|| format!("Failed to read {}", local.display()))?;
            let mut handle = drive.open_for_create(&remote);
            handle.write(&content)?;
            let created = handle.close().await?;
            info!("Uploaded {} to {}", local.display(), remote);
            println!("{} ({} bytes)", created.id, created.size);
        }
        Commands::Mkdir { path } => {
            let created = drive.make_container(&path).await?;
            println!("{}", created.id);
        }
        Commands::Rm { path } => {
            drive.remove_recursive(&path).await?;
        }
    }
    Ok(())
}

fn print_metadata(metadata: &Metadata) {
    let modified = metadata
        .modified_at
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let kind = if metadata.is_container { "d" } else { "-" };
    println!(
        "{} {:>12} {} {}",
        kind, metadata.size, modified, metadata.name
    );
}
