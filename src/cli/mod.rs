use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing::info;

use crate::clipboard::{ClipboardSource, SystemClipboard};
use crate::collection::parse_category;
use crate::config::Config;
use crate::history::{ClipHistory, ClipKind};
use crate::links::{LinkCategory, LinkPatch, LinkStore, NewLink};
use crate::router::MessageRouter;
use crate::storage::{self, KeyValueStore};
use crate::view::{ClipView, LinkView};

#[derive(Parser)]
#[command(name = "clipdeck")]
#[command(about = "Clipboard history and quick links")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Manage clipboard history")]
    Clip {
        #[command(subcommand)]
        action: ClipCommand,
    },

    #[command(about = "Manage quick links")]
    Link {
        #[command(subcommand)]
        action: LinkCommand,
    },

    #[command(about = "Handle one JSON message and print the JSON response")]
    Route { message: String },

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    #[command(about = "Show version, build and storage information")]
    Status,
}

#[derive(Subcommand)]
pub enum ClipCommand {
    #[command(about = "Add text to history")]
    Add {
        text: String,

        /// Force a content type instead of detecting it
        #[arg(short, long)]
        kind: Option<String>,
    },

    #[command(about = "Add the current clipboard text to history")]
    Capture,

    #[command(about = "Show clipboard history")]
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    #[command(about = "Search history by text and type")]
    Search {
        #[arg(default_value = "")]
        query: String,

        #[arg(short, long, default_value = "all")]
        kind: String,
    },

    #[command(about = "Copy a clip back to the clipboard")]
    Copy { id: String },

    #[command(about = "Delete a clip")]
    Delete { id: String },

    #[command(about = "Delete every clip")]
    Clear,

    #[command(about = "Export history as JSON")]
    Export {
        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    #[command(about = "Import history from a JSON export")]
    Import { input: PathBuf },

    #[command(about = "Show history statistics")]
    Stats,
}

#[derive(Subcommand)]
pub enum LinkCommand {
    #[command(about = "Add a quick link")]
    Add {
        name: String,
        url: String,

        #[arg(short, long)]
        icon: Option<String>,

        #[arg(short = 'C', long)]
        category: Option<String>,
    },

    #[command(about = "List quick links, most used first")]
    List {
        #[arg(short = 'C', long, default_value = "all")]
        category: String,
    },

    #[command(about = "Search links by name, URL or category")]
    Search {
        #[arg(default_value = "")]
        query: String,

        #[arg(short = 'C', long, default_value = "all")]
        category: String,
    },

    #[command(about = "Open a link, counting the use")]
    Open { id: String },

    #[command(about = "Edit a custom link")]
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(short, long)]
        icon: Option<String>,

        #[arg(short = 'C', long)]
        category: Option<String>,
    },

    #[command(about = "Delete a custom link")]
    Delete { id: String },

    #[command(about = "Replace all links with the defaults")]
    Reset,

    #[command(about = "List categories in use")]
    Categories,

    #[command(about = "Export links as JSON")]
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    #[command(about = "Import links from a JSON export")]
    Import { input: PathBuf },

    #[command(about = "Show link statistics")]
    Stats,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Generate example configuration")]
    Init {
        #[arg(long)]
        force: bool,
    },

    #[command(about = "Validate configuration")]
    Validate,
}

pub struct CliHandler {
    config: Arc<Config>,
    config_path: Option<PathBuf>,
    backend: Option<Arc<dyn KeyValueStore>>,
    clips: Option<ClipHistory>,
    links: Option<LinkStore>,
}

impl CliHandler {
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            backend: None,
            clips: None,
            links: None,
        }
    }

    /// Lazily open the storage backend when needed
    async fn ensure_backend(&mut self) -> Result<Arc<dyn KeyValueStore>> {
        if let Some(backend) = &self.backend {
            return Ok(Arc::clone(backend));
        }
        info!("Opening {:?} storage backend", self.config.storage.backend);
        let backend = storage::open_backend(&self.config.storage).await?;
        self.backend = Some(Arc::clone(&backend));
        Ok(backend)
    }

    /// Lazily load the clip history when needed
    async fn ensure_clips(&mut self) -> Result<&mut ClipHistory> {
        if self.clips.is_none() {
            let history = self.load_clips().await?;
            self.clips = Some(history);
        }
        self.clips
            .as_mut()
            .ok_or_else(|| anyhow!("clip history unavailable"))
    }

    /// Lazily load the quick links when needed
    async fn ensure_links(&mut self) -> Result<&mut LinkStore> {
        if self.links.is_none() {
            let backend = self.ensure_backend().await?;
            let mut links = LinkStore::new(backend, &self.config.links);
            links.initialize().await;
            self.links = Some(links);
        }
        self.links
            .as_mut()
            .ok_or_else(|| anyhow!("quick links unavailable"))
    }

    async fn load_clips(&mut self) -> Result<ClipHistory> {
        let backend = self.ensure_backend().await?;
        let mut history = ClipHistory::new(backend, &self.config.clips);
        history.initialize().await;
        Ok(history)
    }

    pub async fn handle_command(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Clip { action } => self.handle_clip_command(action).await,
            Commands::Link { action } => self.handle_link_command(action).await,
            Commands::Route { message } => self.route_message(&message).await,
            Commands::Config { action } => self.handle_config_action(action),
            Commands::Status => self.show_status(),
        }
    }

    async fn handle_clip_command(&mut self, action: ClipCommand) -> Result<()> {
        match action {
            ClipCommand::Add { text, kind } => {
                let kind = match kind {
                    Some(kind) => Some(kind.parse::<ClipKind>().map_err(|e| anyhow!(e))?),
                    None => None,
                };
                let clip = self.ensure_clips().await?.add(&text, kind).await?;
                println!("Saved {} clip {}", clip.kind, clip.id);
            }
            ClipCommand::Capture => {
                let clipboard = SystemClipboard::new();
                match self.ensure_clips().await?.capture(&clipboard).await? {
                    Some(clip) => println!("Captured {} clip {}", clip.kind, clip.id),
                    None => println!("Clipboard holds no text"),
                }
            }
            ClipCommand::List { limit } => {
                let history = self.ensure_clips().await?;
                let views = clip_views(history.clips().iter().take(limit));
                print_clips(&views, history.len());
            }
            ClipCommand::Search { query, kind } => {
                let kind = parse_category::<ClipKind>(&kind).map_err(|e| anyhow!(e))?;
                let history = self.ensure_clips().await?;
                let views = clip_views(history.search(&query, kind).into_iter());
                print_clips(&views, history.len());
            }
            ClipCommand::Copy { id } => {
                let clip = self.ensure_clips().await?.copy(&id).await?;
                SystemClipboard::new().write_text(&clip.content).await?;
                let view = ClipView::new(&clip, Local::now());
                println!("Copied {} ({})", clip.id, view.action.hint());
                if clip.kind != ClipKind::Text {
                    println!("  {}", ClipView::action_target(&clip));
                }
            }
            ClipCommand::Delete { id } => {
                let clip = self.ensure_clips().await?.delete(&id).await?;
                println!("Deleted clip {}", clip.id);
            }
            ClipCommand::Clear => {
                let removed = self.ensure_clips().await?.clear().await?;
                println!("Cleared {} clips", removed);
            }
            ClipCommand::Export { output } => {
                let json = self.ensure_clips().await?.export_snapshot()?;
                write_export(&json, output)?;
            }
            ClipCommand::Import { input } => {
                let text = std::fs::read_to_string(&input)
                    .with_context(|| format!("Failed to read {}", input.display()))?;
                let count = self.ensure_clips().await?.import_snapshot(&text).await?;
                println!("Imported {} clips", count);
            }
            ClipCommand::Stats => {
                let stats = self.ensure_clips().await?.stats();
                println!("Clipboard History:");
                println!("  Total: {}", stats.total);
                println!("  Used today: {}", stats.today);
            }
        }
        Ok(())
    }

    async fn handle_link_command(&mut self, action: LinkCommand) -> Result<()> {
        match action {
            LinkCommand::Add {
                name,
                url,
                icon,
                category,
            } => {
                let category = match category {
                    Some(category) => parse_category::<LinkCategory>(&category).map_err(|e| anyhow!(e))?,
                    None => None,
                };
                let link = self
                    .ensure_links()
                    .await?
                    .add(NewLink {
                        name,
                        url,
                        icon,
                        category,
                    })
                    .await?;
                println!("Added {} {} ({})", link.icon, link.name, link.id);
            }
            LinkCommand::List { category } => {
                let category = parse_category::<LinkCategory>(&category).map_err(|e| anyhow!(e))?;
                let links = self.ensure_links().await?;
                print_links(&links.search("", category));
            }
            LinkCommand::Search { query, category } => {
                let category = parse_category::<LinkCategory>(&category).map_err(|e| anyhow!(e))?;
                let links = self.ensure_links().await?;
                print_links(&links.search(&query, category));
            }
            LinkCommand::Open { id } => {
                let link = self.ensure_links().await?.open(&id).await?;
                println!("{}", link.url);
            }
            LinkCommand::Update {
                id,
                name,
                url,
                icon,
                category,
            } => {
                let category = match category {
                    Some(category) => parse_category::<LinkCategory>(&category).map_err(|e| anyhow!(e))?,
                    None => None,
                };
                let patch = LinkPatch {
                    name,
                    url,
                    icon,
                    category,
                    ..LinkPatch::default()
                };
                let link = self.ensure_links().await?.update(&id, patch).await?;
                println!("Updated {} {} ({})", link.icon, link.name, link.url);
            }
            LinkCommand::Delete { id } => {
                let link = self.ensure_links().await?.delete(&id).await?;
                println!("Deleted {}", link.name);
            }
            LinkCommand::Reset => {
                self.ensure_links().await?.reset_to_defaults().await?;
                println!("Quick links reset to defaults");
            }
            LinkCommand::Categories => {
                for category in self.ensure_links().await?.categories() {
                    println!("{} {}", category.icon(), category);
                }
            }
            LinkCommand::Export { output } => {
                let json = self.ensure_links().await?.export_snapshot()?;
                write_export(&json, output)?;
            }
            LinkCommand::Import { input } => {
                let text = std::fs::read_to_string(&input)
                    .with_context(|| format!("Failed to read {}", input.display()))?;
                let count = self.ensure_links().await?.import_snapshot(&text).await?;
                println!("Imported {} links", count);
            }
            LinkCommand::Stats => {
                let links = self.ensure_links().await?;
                let stats = links.stats();
                println!("Quick Links:");
                println!("  Total: {}", stats.total);
                println!("  Custom: {}", stats.custom);
                println!("  Opens: {}", links.total_opens());
            }
        }
        Ok(())
    }

    async fn route_message(&mut self, message: &str) -> Result<()> {
        let history = match self.clips.take() {
            Some(history) => history,
            None => self.load_clips().await?,
        };
        let router = MessageRouter::new(Arc::new(Mutex::new(history)))
            .with_clipboard(Arc::new(SystemClipboard::new()));
        println!("{}", router.handle_json(message).await);
        Ok(())
    }

    fn handle_config_action(&self, action: ConfigAction) -> Result<()> {
        match action {
            ConfigAction::Show => {
                println!("Current Configuration:");
                println!("{}", toml::to_string_pretty(self.config.as_ref())?);
            }
            ConfigAction::Init { force } => {
                let path = self.config_file()?;
                Config::write_example(&path, force)?;
                println!("Example configuration written to {}", path.display());
            }
            ConfigAction::Validate => {
                // Loading already validated; re-read so edits since startup count
                let path = self.config_file()?;
                if path.exists() {
                    Config::load_from_path(&path)?;
                    println!("Configuration at {} is valid", path.display());
                } else {
                    println!("No configuration file, defaults are valid");
                }
            }
        }
        Ok(())
    }

    fn config_file(&self) -> Result<PathBuf> {
        self.config_path
            .clone()
            .or_else(Config::default_path)
            .ok_or_else(|| anyhow!("Cannot determine a config directory"))
    }

    fn show_status(&self) -> Result<()> {
        println!("ClipDeck Status:");
        println!("  Version: {}", crate::VERSION);
        println!("  Built: {} ({})", env!("BUILD_DATE"), env!("PROFILE"));
        println!("  Target: {}", env!("TARGET"));
        println!("  Rustc: {}", env!("RUSTC_VERSION"));
        match &self.config_path {
            Some(path) => println!("  Config: {}", path.display()),
            None => println!("  Config: Default"),
        }
        println!("  Storage: {:?}", self.config.storage.backend);
        println!("  Data dir: {}", self.config.storage.data_dir.display());
        println!("  Max clips: {}", self.config.clips.max_items);
        println!("  Max links: {}", self.config.links.max_items);
        Ok(())
    }
}

fn clip_views<'a>(clips: impl Iterator<Item = &'a crate::history::Clip>) -> Vec<ClipView> {
    let now = Local::now();
    clips.map(|clip| ClipView::new(clip, now)).collect()
}

fn print_clips(views: &[ClipView], total: usize) {
    if views.is_empty() {
        println!("No clips found");
        return;
    }

    println!("Clipboard History (showing {} of {}):", views.len(), total);
    for view in views {
        println!(
            "{} {} [{}] {}",
            view.icon,
            view.id,
            view.age,
            view.preview.replace('\n', " ")
        );
        if view.usage_count > 0 {
            println!("    used {} times, {}", view.usage_count, view.action.hint());
        }
    }
}

fn print_links(links: &[&crate::links::Link]) {
    if links.is_empty() {
        println!("No links found");
        return;
    }

    for view in links.iter().map(|&link| LinkView::from(link)) {
        let marker = if view.is_default { "*" } else { " " };
        println!(
            "{}{} {:<20} {} {} ({} opens) [{}]",
            marker, view.icon, view.name, view.category_icon, view.url, view.usage_count, view.id
        );
    }
}

fn write_export(json: &str, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
