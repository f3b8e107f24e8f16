use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gallery-catalog", about = "Manage paintings and their published photos")]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short = 'c', long, env = "GALLERY_CONFIG", default_value = "gallery.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        login: String,
        /// Prefer the GALLERY_PASSWORD environment variable
        #[arg(long, env = "GALLERY_PASSWORD")]
        password: String,
    },

    /// Log in and print a session token
    Login {
        #[arg(long)]
        login: String,
        #[arg(long, env = "GALLERY_PASSWORD")]
        password: String,
    },

    /// List all paintings
    List,

    /// Show one painting
    Get { id: String },

    /// Create a painting, publishing the given images
    Create {
        #[arg(long, env = "GALLERY_SESSION")]
        session: String,
        /// Metadata as key=value, repeatable
        #[arg(short = 'f', long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Image file, repeatable; order is display order
        #[arg(short = 'i', long = "image")]
        images: Vec<PathBuf>,
        /// Remote folder name (default: the title)
        #[arg(long)]
        folder: Option<String>,
    },

    /// Update fields of a painting; images replace the whole photo set
    Update {
        id: String,
        #[arg(long, env = "GALLERY_SESSION")]
        session: String,
        #[arg(short = 'f', long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        #[arg(short = 'i', long = "image")]
        images: Vec<PathBuf>,
    },

    /// Delete a painting and its remote photos
    Delete {
        id: String,
        #[arg(long, env = "GALLERY_SESSION")]
        session: String,
    },
}

impl Command {
    /// Commands that change the catalog need an authenticated session
    pub fn session(&self) -> Option<&str> {
        match self {
            Command::Create { session, .. }
            | Command::Update { session, .. }
            | Command::Delete { session, .. } => Some(session.as_str()),
            _ => None,
        }
    }

    /// Whether the command talks to remote photo storage
    pub fn needs_storage(&self) -> bool {
        matches!(
            self,
            Command::Create { .. } | Command::Update { .. } | Command::Delete { .. }
        )
    }
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
