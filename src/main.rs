use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use image::DynamicImage;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

use photo_sweep::config::{Cli, Config};
use photo_sweep::library::{FolderLibrary, TargetSize};
use photo_sweep::review::{ReviewController, ReviewError};
use photo_sweep::settings::Settings;
use photo_sweep::state::{PhotoRecord, ReviewState};

type Controller = ReviewController<FolderLibrary>;
type Input = Lines<BufReader<Stdin>>;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Keep,
    Delete,
    /// List photos from the same day as the current one
    Related,
    /// Toggle entry `n` (1-based) of the last related list
    Toggle(usize),
    Commit,
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let command = match parts.next()? {
        "k" | "keep" => Command::Keep,
        "d" | "delete" => Command::Delete,
        "r" | "related" => Command::Related,
        "t" | "toggle" => Command::Toggle(parts.next()?.parse().ok()?),
        "c" | "commit" => Command::Commit,
        "s" | "status" => Command::Status,
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

const HELP: &str = "\
  k        keep this photo
  d        mark this photo for deletion
  r        list photos from the same day
  t <n>    mark/unmark entry n of that list
  c        delete everything marked
  s        show progress
  q        quit (nothing is deleted unless you commit)";

/// Characters of the text preview, darkest first
const RAMP: &[u8] = b" .:-=+*#%@";
const PREVIEW_COLUMNS: u32 = 32;
const PREVIEW_MAX_ROWS: u32 = 40;

/// Preview size in character cells for a display of shape `target`.
///
/// Terminal cells are roughly twice as tall as wide, so rows are halved.
fn preview_size(target: TargetSize) -> TargetSize {
    let rows = u64::from(PREVIEW_COLUMNS) * u64::from(target.height)
        / u64::from(target.width.max(1))
        / 2;
    let rows = rows.clamp(1, u64::from(PREVIEW_MAX_ROWS)) as u32;
    TargetSize::new(PREVIEW_COLUMNS, rows)
}

/// One character per pixel, brighter pixels drawn with denser characters
fn text_preview(image: &DynamicImage) -> String {
    let gray = image.to_luma8();
    let mut out = String::with_capacity((gray.width() as usize + 1) * gray.height() as usize);
    for row in gray.rows() {
        for pixel in row {
            let level = usize::from(pixel.0[0]) * (RAMP.len() - 1) / 255;
            out.push(char::from(RAMP[level]));
        }
        out.push('\n');
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match cli.settings_path() {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    let config = Config::from_cli(cli, &settings)?;
    tracing::debug!("{:?}", config);

    let library = FolderLibrary::open(&config.library, &config.catalog, &config.trash_dir)
        .context("Failed to open the photo catalog")?;
    let controller =
        Arc::new(ReviewController::new(Arc::new(library)).with_toggle_policy(config.toggle_policy));

    println!("🔍 Scanning {}", controller.library().root().display());
    match controller.load().await {
        Ok(0) => {
            println!("No photos found.");
            return Ok(());
        }
        Ok(count) => println!("{} photos to review. Type h for help.", count),
        Err(e) => {
            // Access problems are reported, not crashed on.
            println!("{}", e);
            return Ok(());
        }
    }

    let names = controller
        .library()
        .file_names()
        .await
        .context("Failed to read photo names from the catalog")?;
    let mut terminal = Terminal {
        controller: &controller,
        names,
        preview: config.preview.then(|| preview_size(config.target)),
        input: BufReader::new(tokio::io::stdin()).lines(),
    };
    terminal.run().await
}

struct Terminal<'a> {
    controller: &'a Controller,
    /// File names by photo id, read once after loading
    names: HashMap<String, String>,
    /// Size of the text preview, `None` when previews are off
    preview: Option<TargetSize>,
    input: Input,
}

impl Terminal<'_> {
    async fn run(&mut self) -> anyhow::Result<()> {
        let controller = self.controller;
        let mut related: Vec<PhotoRecord> = Vec::new();
        let mut shown: Option<String> = None;

        loop {
            let current = controller.current_record();
            if current.as_ref().map(|r| &r.id) != shown.as_ref() {
                self.show_card(current.as_ref()).await;
                shown = current.map(|r| r.id);
            }

            let Some(line) = self.prompt("> ").await? else {
                break;
            };
            let Some(command) = parse_command(&line) else {
                if !line.trim().is_empty() {
                    println!("Unknown command. Type h for help.");
                }
                continue;
            };

            match command {
                Command::Keep | Command::Delete => {
                    let decided = if command == Command::Keep {
                        controller.mark_keep()
                    } else {
                        controller.mark_delete()
                    };
                    if let Err(ReviewError::NoCurrentRecord) = decided {
                        println!("Nothing left to review.");
                    } else if controller.current_record().map(|r| r.id) == shown {
                        // Cursor stays on the last photo; show where we are.
                        shown = None;
                    }
                }
                Command::Related => {
                    related = match controller.current_record() {
                        Some(record) => self.list_related(&record),
                        None => Vec::new(),
                    };
                }
                Command::Toggle(n) => match n.checked_sub(1).and_then(|i| related.get(i)) {
                    Some(record) => match controller.toggle_deletion(&record.id) {
                        Ok(state) => {
                            println!("  {} is now {}", self.label(&record.id), describe(state))
                        }
                        Err(e) => println!("{}", e),
                    },
                    None => println!("No entry {}. Use r to list related photos first.", n),
                },
                Command::Commit => {
                    self.commit().await?;
                    related.clear();
                    shown = None;
                }
                Command::Status => self.print_status(),
                Command::Help => println!("{}", HELP),
                Command::Quit => break,
            }
        }

        let pending = controller.pending_count();
        if pending > 0 {
            println!("Leaving without deleting {} marked photos.", pending);
        }
        Ok(())
    }

    async fn prompt(&mut self, text: &str) -> anyhow::Result<Option<String>> {
        print!("{}", text);
        std::io::stdout().flush()?;
        Ok(self.input.next_line().await?)
    }

    async fn show_card(&self, record: Option<&PhotoRecord>) {
        let Some(record) = record else {
            println!("🎉 All done. Nothing left in this folder.");
            return;
        };

        let progress = self.controller.progress().unwrap_or_default();
        let taken = record
            .creation_date
            .map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown date".to_string());
        println!(
            "\n{}  {}  ({}, {})",
            progress,
            self.label(&record.id),
            taken,
            describe(record.review_state)
        );

        let Some(size) = self.preview else {
            return;
        };
        match self.controller.load_current_image(size).await {
            Some(loaded) => print!("{}", text_preview(&loaded.image)),
            None => println!("  (preview unavailable)"),
        }
    }

    fn list_related(&self, record: &PhotoRecord) -> Vec<PhotoRecord> {
        let Some(group) = self.controller.related_group(record) else {
            println!("This photo has no date, so there is nothing to group it with.");
            return Vec::new();
        };

        println!("{} ({} photos)", group.title, group.photos.len());
        for (i, photo) in group.photos.iter().enumerate() {
            let marker = if photo.id == record.id { "*" } else { " " };
            println!(
                "{} {:>3}. {}  [{}]",
                marker,
                i + 1,
                self.label(&photo.id),
                describe(photo.review_state)
            );
        }
        group.photos
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        let count = self.controller.pending_count();
        if count == 0 {
            println!("{}", ReviewError::EmptySelection);
            return Ok(());
        }

        let question = format!(
            "Delete {} photos? They will be moved to Recently Deleted. [y/N] ",
            count
        );
        let answer = self.prompt(&question).await?.unwrap_or_default();
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Nothing deleted.");
            return Ok(());
        }

        match self.controller.commit_deletion().await {
            Ok(removed) => println!("🗑️  Deleted {} photos. They are in Recently Deleted.", removed),
            Err(e) => println!("{}", e),
        }
        Ok(())
    }

    fn print_status(&self) {
        let summary = self.controller.summary();
        println!(
            "{}: {} kept, {} marked for deletion, {} photos left in the library",
            summary.progress().unwrap_or_else(|| "No photos".to_string()),
            summary.kept,
            summary.pending_delete,
            summary.total
        );
    }

    /// File name for display, falling back to the catalog id.
    fn label(&self, id: &str) -> String {
        self.names
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("#{}", id))
    }
}

fn describe(state: ReviewState) -> &'static str {
    match state {
        ReviewState::Unreviewed => "not reviewed",
        ReviewState::Kept => "kept",
        ReviewState::PendingDelete => "marked for deletion",
    }
}
