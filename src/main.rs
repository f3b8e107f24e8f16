mod cli;

use clap::Parser;
use cli::{Cli, Command};
use gallery_catalog::database::{self, SharedConnection};
use gallery_catalog::services::{account_service, Gallery, SqliteMetadataStore, SqliteSessionStore};
use gallery_catalog::{AppError, GalleryConfig, Response};
use photo_pipeline::{BlobBackend, InMemoryBackend, UploadedFile, WebDavBackend};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let response = Response::from_result(run(cli).await, "OK");
    println!("{}", response.to_json());

    if response.is_error() {
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<Value, AppError> {
    let config = GalleryConfig::load(&cli.config)?;
    log::debug!("Using configuration {:?}", config);

    let conn = database::init_database(&config.database_path)?;
    let sessions = Arc::new(SqliteSessionStore::new(conn.clone(), config.session_ttl()));
    if let Err(e) = sessions.purge_expired() {
        log::warn!("Could not purge expired sessions: {}", e);
    }

    let gallery = build_gallery(&config, &conn, sessions, cli.command.needs_storage())?;
    if let Some(session) = cli.command.session() {
        gallery.authorize(session).await?;
    }

    match cli.command {
        Command::Register { login, password } => {
            let user = {
                let conn = database::lock(&conn);
                account_service::register_user(&conn, &login, &password)?
            };
            Ok(json!({ "login": user.login }))
        }
        Command::Login { login, password } => {
            let token = account_service::login(&conn, gallery.sessions(), &login, &password).await?;
            Ok(json!({ "session": token }))
        }
        Command::List => to_value(gallery.list().await),
        Command::Get { id } => to_value(gallery.get(&id).await?),
        Command::Create {
            fields,
            images,
            folder,
            ..
        } => {
            let files = read_images(&images)?;
            let record = gallery
                .create(&to_fields(fields), files, folder.as_deref())
                .await?;
            to_value(record)
        }
        Command::Update {
            id, fields, images, ..
        } => {
            let files = read_images(&images)?;
            to_value(gallery.update(&id, &to_fields(fields), files).await?)
        }
        Command::Delete { id, .. } => {
            gallery.delete(&id).await?;
            Ok(json!({ "deleted": id }))
        }
    }
}

fn build_gallery(
    config: &GalleryConfig,
    conn: &SharedConnection,
    sessions: Arc<SqliteSessionStore>,
    needs_storage: bool,
) -> Result<Gallery, AppError> {
    let store = Arc::new(SqliteMetadataStore::new(conn.clone(), config.metadata_timeout()));

    let backend: Arc<dyn BlobBackend> = match config.webdav() {
        Ok(webdav) => Arc::new(WebDavBackend::new(webdav)?),
        Err(e) if needs_storage => return Err(e),
        // Read-only commands never reach the backend
        Err(_) => Arc::new(InMemoryBackend::new()),
    };

    Ok(Gallery::new(
        store,
        backend,
        sessions,
        config.storage.parent_path.clone(),
        config.scratch_root.clone(),
        config.target_long_side,
    ))
}

fn read_images(paths: &[PathBuf]) -> Result<Vec<UploadedFile>, AppError> {
    paths
        .iter()
        .map(|path| -> Result<UploadedFile, AppError> {
            let content = std::fs::read(path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            Ok(UploadedFile::new(name, content))
        })
        .collect()
}

fn to_fields(pairs: Vec<(String, String)>) -> HashMap<String, String> {
    pairs.into_iter().collect()
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Persistence(format!("Could not encode result: {}", e)))
}
