use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fauxto::classifier::{self, ImageClassifier};
use fauxto::config::Config;
use fauxto::db::{self, Database, FolderSortOption, HomeScreenMode, SharedDb};
use fauxto::index::FolderIndex;
use fauxto::library::{CachedLibrary, DirectoryLibrary, PhotoLibrary, SortOrder};
use fauxto::logging;
use fauxto::search;
use fauxto::tagging::TaggingQueue;
use fauxto::tasks::{BackgroundTaskManager, TaskType};

fn print_help() {
    println!(
        r#"fauxto - photo organizer with nested folders and automatic tagging

USAGE:
    fauxto [OPTIONS] <COMMAND>

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

COMMANDS:
    folders [--parent ID] [--sort custom|alpha|recent|oldest]
    folder create NAME [--parent ID]
    folder rename ID NAME
    folder delete ID
    folder favorite ID
    folder move ID [--parent ID]
    folder reorder SOURCE TARGET
    folder group NAME ASSET...
    folder split PARENT NAME ASSET...
    assets FOLDER
    add FOLDER ASSET...
    remove ENTRY
    reorder SOURCE TARGET [--after]
    tag [--asset ID [--replace]]
    tags ASSET
    thumbnail ASSET OUTPUT [--size PX]
    search TEXT
    stats
    prefs [--home photos|folders] [--sort ...] [--tagging on|off]

ENVIRONMENT:
    FAUXTO_CONFIG       Path to config file (overrides default location)
    FAUXTO_LOG          Log filter (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/fauxto/config.toml"#
    );
}

/// Global options plus the remaining command words.
struct Args {
    config_path: Option<PathBuf>,
    command: Vec<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut command = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" if command.is_empty() => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" if command.is_empty() => {
                println!("fauxto {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" if command.is_empty() => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            _ => command.push(args[i].clone()),
        }
        i += 1;
    }

    Args { config_path, command }
}

/// Positional words and `--flag [value]` options of one command.
struct Words {
    positional: Vec<String>,
    options: Vec<(String, Option<String>)>,
}

/// Flags that never take a value.
const SWITCHES: [&str; 2] = ["--after", "--replace"];

impl Words {
    fn parse(words: &[String]) -> Self {
        let mut positional = Vec::new();
        let mut options = Vec::new();
        let mut iter = words.iter().peekable();
        while let Some(word) = iter.next() {
            if word.starts_with("--") {
                let value = if SWITCHES.contains(&word.as_str()) {
                    None
                } else {
                    iter.next_if(|next| !next.starts_with("--")).cloned()
                };
                options.push((word.clone(), value));
            } else {
                positional.push(word.clone());
            }
        }
        Self { positional, options }
    }

    fn has(&self, flag: &str) -> bool {
        self.options.iter().any(|(f, _)| f == flag)
    }

    fn value(&self, flag: &str) -> Result<Option<&str>> {
        match self.options.iter().find(|(f, _)| f == flag) {
            None => Ok(None),
            Some((_, Some(value))) => Ok(Some(value.as_str())),
            Some((_, None)) => Err(anyhow!("{} requires a value", flag)),
        }
    }

    fn arg(&self, index: usize, name: &str) -> Result<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("Missing argument: {}", name))
    }

    fn id(&self, index: usize, name: &str) -> Result<i64> {
        parse_id(self.arg(index, name)?)
    }

    fn rest(&self, from: usize) -> &[String] {
        self.positional.get(from..).unwrap_or(&[])
    }
}

fn parse_id(s: &str) -> Result<i64> {
    s.parse().with_context(|| format!("Not a valid id: {}", s))
}

fn parse_sort(s: &str) -> Result<FolderSortOption> {
    FolderSortOption::from_str(s).ok_or_else(|| anyhow!("Unknown sort option: {}", s))
}

struct Session {
    config: Config,
    db: SharedDb,
    index: FolderIndex,
}

fn open(config: Config) -> Result<Session> {
    let database = Database::open(&config.db_path)?;
    database.initialize()?;
    let db = database.into_shared();
    let index = FolderIndex::new(db.clone());
    Ok(Session { config, db, index })
}

fn build_library(config: &Config) -> Arc<dyn PhotoLibrary> {
    let directory = DirectoryLibrary::new(config.library.root.clone(), &config.library.image_extensions);
    Arc::new(CachedLibrary::new(directory, config.library.thumbnail_cache_capacity))
}

fn print_folder(folder: &fauxto::db::Folder) {
    println!(
        "{:>5}  {}{}  (order {})",
        folder.id,
        folder.name,
        if folder.is_favorite { " *" } else { "" },
        folder.sort_order
    );
}

fn run_folder_command(ctx: &Session, words: &Words) -> Result<()> {
    let index = &ctx.index;
    match words.arg(0, "folder subcommand")? {
        "create" => {
            let parent = words.value("--parent")?.map(parse_id).transpose()?;
            let folder = index.create_folder(words.arg(1, "NAME")?, parent)?;
            print_folder(&folder);
        }
        "rename" => {
            if !index.rename_folder(words.id(1, "ID")?, words.arg(2, "NAME")?)? {
                println!("No such folder");
            }
        }
        "delete" => {
            let removed = index.delete_folder(words.id(1, "ID")?)?;
            println!("Deleted {} folder(s)", removed);
        }
        "favorite" => match index.toggle_favorite(words.id(1, "ID")?)? {
            Some(true) => println!("Marked as favorite"),
            Some(false) => println!("No longer a favorite"),
            None => println!("No such folder"),
        },
        "move" => {
            let parent = words.value("--parent")?.map(parse_id).transpose()?;
            if !index.move_folder(words.id(1, "ID")?, parent)? {
                println!("Nothing to move");
            }
        }
        "reorder" => {
            if !index.reorder_folder(words.id(1, "SOURCE")?, words.id(2, "TARGET")?)? {
                println!("Order unchanged");
            }
        }
        "group" => {
            let folder = index.create_folder_from_loose_assets(words.arg(1, "NAME")?, words.rest(2))?;
            print_folder(&folder);
        }
        "split" => {
            let folder =
                index.create_subfolder_from_assets(words.id(1, "PARENT")?, words.arg(2, "NAME")?, words.rest(3))?;
            print_folder(&folder);
        }
        other => bail!("Unknown folder subcommand: {}", other),
    }
    Ok(())
}

fn run_prefs_command(ctx: &Session, words: &Words) -> Result<()> {
    let db = db::lock(&ctx.db)?;
    if let Some(home) = words.value("--home")? {
        let mode = HomeScreenMode::from_str(home).ok_or_else(|| anyhow!("Unknown home mode: {}", home))?;
        db.set_home_mode(mode)?;
    }
    if let Some(sort) = words.value("--sort")? {
        db.set_folder_sort(parse_sort(sort)?)?;
    }
    if let Some(tagging) = words.value("--tagging")? {
        let enabled = match tagging {
            "on" => true,
            "off" => false,
            other => bail!("Expected on or off, got {}", other),
        };
        db.set_tagging_enabled(enabled)?;
    }

    let prefs = db.get_preferences()?;
    println!("Home screen:    {}", prefs.home_mode.short_name());
    println!("Folder order:   {}", prefs.folder_sort.display_name());
    println!("Tagging:        {}", if prefs.tagging_enabled { "on" } else { "off" });
    match prefs.last_tagging_date {
        Some(date) => println!("Last tagged:    {}", date.format("%Y-%m-%d %H:%M")),
        None => println!("Last tagged:    never"),
    }
    Ok(())
}

fn run_stats(ctx: &Session) -> Result<()> {
    let (folders, stats, prefs) = {
        let db = db::lock(&ctx.db)?;
        (db.count_folders()?, db.tag_stats()?, db.get_preferences()?)
    };
    let library_size = build_library(&ctx.config).list_asset_identifiers(SortOrder::NewestFirst)?.len();

    println!("Library:        {} photos in {}", library_size, ctx.config.library.root.display());
    println!("Folders:        {}", folders);
    println!("Tagged photos:  {}", stats.tagged_assets);
    println!("Tags:           {}", stats.total_tags);
    if let Some(date) = prefs.last_tagging_date {
        println!("Last tagged:    {}", date.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

async fn run_tagging(ctx: &Session, words: &Words) -> Result<()> {
    if !db::lock(&ctx.db)?.get_preferences()?.tagging_enabled {
        bail!("Tagging is turned off (enable with: fauxto prefs --tagging on)");
    }

    let library = build_library(&ctx.config);
    let classifier: Arc<dyn ImageClassifier> =
        Arc::from(classifier::create_classifier(&ctx.config.classifier, &ctx.config.tagging));
    tracing::info!(provider = classifier.provider_name(), "Using classifier");

    let queue = TaggingQueue::new(
        ctx.db.clone(),
        library,
        classifier,
        Duration::from_millis(ctx.config.tagging.throttle_ms),
    );

    if let Some(identifier) = words.value("--asset")? {
        let identifier = identifier.to_string();
        let replace = words.has("--replace");
        let worker = queue.clone();
        let written = tokio::task::spawn_blocking(move || worker.tag_asset(&identifier, replace)).await??;
        match written {
            Some(count) => println!("Wrote {} tag(s)", count),
            None => println!("Photo not found or could not be read"),
        }
        return Ok(());
    }

    let mut manager = BackgroundTaskManager::new();
    let (task_id, tx, cancel) = manager.register_task(TaskType::Tagging);
    let Some(handle) = queue.start_with(Some(tx), cancel) else {
        bail!("A tagging run is already in progress");
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut interrupted = false;

    loop {
        tokio::select! {
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                eprintln!("\nStopping after the current photo...");
                manager.cancel_task(task_id);
            }
            _ = ticker.tick() => {
                // Sampled before polling so the worker's last updates are drained
                let finished = handle.is_finished();
                for info in manager.poll_updates() {
                    eprintln!();
                    println!("{}: {} ({:.1}s)", info.task_type.display_name(), info.message, info.elapsed.as_secs_f64());
                }
                if let Some(task) = manager.running_tasks().first() {
                    if let Some(progress) = &task.progress {
                        eprint!(
                            "\r{} {}% {} ",
                            queue.progress_description(),
                            progress.percent(),
                            progress.current_item.as_deref().unwrap_or("")
                        );
                    }
                }
                if finished || (!manager.has_running_tasks() && !queue.is_processing()) {
                    break;
                }
            }
        }
    }

    handle.join().map_err(|_| anyhow!("Tagging worker panicked"))?;
    Ok(())
}

async fn run(ctx: Session, command: &[String]) -> Result<()> {
    let Some((name, rest)) = command.split_first() else {
        print_help();
        return Ok(());
    };
    let words = Words::parse(rest);

    match name.as_str() {
        "folders" => {
            let parent = words.value("--parent")?.map(parse_id).transpose()?;
            let sort = match words.value("--sort")? {
                Some(sort) => parse_sort(sort)?,
                None => db::lock(&ctx.db)?.get_preferences()?.folder_sort,
            };
            for folder in ctx.index.list_folders(parent, sort)? {
                print_folder(&folder);
            }
        }
        "folder" => run_folder_command(&ctx, &words)?,
        "assets" => {
            for entry in ctx.index.folder_assets(words.id(0, "FOLDER")?)? {
                println!("{:>5}  {}", entry.id, entry.asset_identifier);
            }
        }
        "add" => {
            let added = ctx.index.add_assets(words.id(0, "FOLDER")?, words.rest(1))?;
            println!("Added {} photo(s)", added);
        }
        "remove" => {
            if !ctx.index.remove_asset(words.id(0, "ENTRY")?)? {
                println!("No such entry");
            }
        }
        "reorder" => {
            let insert_before = !words.has("--after");
            if !ctx.index.reorder_asset(words.id(0, "SOURCE")?, words.id(1, "TARGET")?, insert_before)? {
                println!("Order unchanged");
            }
        }
        "tag" => run_tagging(&ctx, &words).await?,
        "tags" => {
            let tags = db::lock(&ctx.db)?.get_tags_for_asset(words.arg(0, "ASSET")?)?;
            if tags.is_empty() {
                println!("No tags");
            }
            for tag in tags {
                println!("{:<8} {:<30} {:.2}", tag.tag_type.display_name(), tag.value, tag.confidence);
            }
        }
        "thumbnail" => {
            let size = match words.value("--size")? {
                Some(size) => size.parse().with_context(|| format!("Not a valid size: {}", size))?,
                None => ctx.config.library.thumbnail_size,
            };
            let library = build_library(&ctx.config);
            let identifier = words.arg(0, "ASSET")?;
            let asset = library
                .fetch_asset(identifier)
                .ok_or_else(|| anyhow!("Photo not found: {}", identifier))?;
            let thumbnail = library
                .thumbnail(&asset, size)
                .ok_or_else(|| anyhow!("Could not read photo: {}", identifier))?;
            thumbnail.save(words.arg(1, "OUTPUT")?)?;
        }
        "search" => {
            let query = words.positional.join(" ");
            let results = search::search(&ctx.db, &query)?;
            if results.is_empty() {
                println!("No matches");
            }
            for folder in &results.folders {
                print_folder(folder);
            }
            for identifier in &results.asset_identifiers {
                println!("       {}", identifier);
            }
        }
        "stats" => run_stats(&ctx)?,
        "prefs" => run_prefs_command(&ctx, &words)?,
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    // Uses journald on Linux, file fallback otherwise
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let ctx = open(config)?;
    run(ctx, &args.command).await
}
