use std::path::PathBuf;

use clap::Parser;

use crate::library::TargetSize;
use crate::review::TogglePolicy;
use crate::settings::{Settings, SettingsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "photo-sweep",
    about = "Go through a photo folder one photo at a time and clear out the ones you don't want"
)]
pub struct Cli {
    /// Folder of photos to review (default: from settings, else your Pictures folder)
    #[arg(short = 'l', long)]
    pub library: Option<String>,

    /// SQLite catalog file
    #[arg(long)]
    pub catalog: Option<String>,

    /// Where deleted photos are moved ("Recently Deleted")
    #[arg(long)]
    pub trash_dir: Option<String>,

    /// Settings file (default: <config dir>/photo-sweep/settings.json)
    #[arg(long)]
    pub settings: Option<String>,

    /// Un-marking a photo that was kept restores it to kept
    #[arg(long)]
    pub toggle_restores_kept: bool,

    /// Display width in pixels (also shapes the text preview)
    #[arg(long)]
    pub width: Option<u32>,

    /// Display height in pixels (also shapes the text preview)
    #[arg(long)]
    pub height: Option<u32>,

    /// Don't draw a text preview of each photo
    #[arg(long)]
    pub no_preview: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl Cli {
    /// The settings file to read, if any location can be determined
    pub fn settings_path(&self) -> Option<PathBuf> {
        self.settings
            .as_deref()
            .map(expand_tilde)
            .or_else(Settings::default_path)
    }
}

/// Everything the binary needs, after merging flags over the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub library: PathBuf,
    pub catalog: PathBuf,
    pub trash_dir: PathBuf,
    pub target: TargetSize,
    pub toggle_policy: TogglePolicy,
    /// Draw a text preview of each photo in the terminal
    pub preview: bool,
    pub log_level: LogLevel,
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// `<data_dir>/photo-sweep`
fn data_home() -> Result<PathBuf, SettingsError> {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or(SettingsError::NoDataDir)?;
    path.push("photo-sweep");
    Ok(path)
}

impl Config {
    /// Flags win over the settings file; the settings file wins over the
    /// built-in defaults.
    pub fn from_cli(cli: Cli, settings: &Settings) -> Result<Self, SettingsError> {
        let library = cli
            .library
            .as_deref()
            .map(expand_tilde)
            .or_else(|| settings.library.clone())
            .or_else(dirs::picture_dir)
            .ok_or(SettingsError::MissingLibrary)?;

        let catalog = match cli.catalog.as_deref().map(expand_tilde) {
            Some(path) => path,
            None => match &settings.catalog {
                Some(path) => path.clone(),
                None => data_home()?.join("catalog.db"),
            },
        };

        let trash_dir = match cli.trash_dir.as_deref().map(expand_tilde) {
            Some(path) => path,
            None => match &settings.trash_dir {
                Some(path) => path.clone(),
                None => data_home()?.join("recently-deleted"),
            },
        };

        let toggle_policy = if cli.toggle_restores_kept {
            TogglePolicy::RestoreKept
        } else {
            settings.toggle_policy
        };

        let target = TargetSize::new(
            cli.width.unwrap_or(settings.target_width),
            cli.height.unwrap_or(settings.target_height),
        );

        Ok(Self {
            library,
            catalog,
            trash_dir,
            target,
            toggle_policy,
            preview: !cli.no_preview,
            log_level: cli.log_level,
        })
    }
}
