use clap::{Parser, Subcommand, ValueEnum};
use folio::config::{self, BlogConfig};
use folio::objects::FsObjectStore;
use folio::output;
use folio::publish::Publisher;
use folio::render::CmarkRenderer;
use folio::store::IndexStore;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Publish Markdown page directories into an indexed blog store")]
#[command(long_about = "\
Publish Markdown page directories into an indexed blog store

Every page is a directory. Its name is the page ID; the first *.md file in it
is the document; local JPEGs it references are uploaded to object storage.

Content structure:

  content/
  └── blog-test/
      ├── content.md               # '# Title', '## Description', body, '[tags]: a, b'
      ├── sample_a.jpg             # ![alt](sample_a.jpg) → <cdn>/<image-id>
      └── img/sample_b.jpg

Saving a page that is already stored replaces it and keeps its publish date.

Run 'folio gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml; relative paths in it resolve from here
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Log output format (logs go to stderr, filtered by RUST_LOG)
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, render, index and upload page directories
    Publish {
        /// Page directories to publish
        #[arg(required_unless_present = "all")]
        dirs: Vec<PathBuf>,
        /// Publish every page directory under content_root
        #[arg(long, conflicts_with = "dirs")]
        all: bool,
    },
    /// Remove a page from the indexes and its images from object storage
    Delete {
        /// Page ID
        id: String,
    },
    /// Show one stored page
    Show {
        /// Page ID
        id: String,
        /// Print the rendered body instead of the page record
        #[arg(long)]
        html: bool,
    },
    /// Find pages whose title or description contains any keyword
    Search {
        #[arg(required = true)]
        keywords: Vec<String>,
    },
    /// List every tag with its page count
    Tags,
    /// List the pages carrying a tag
    Tagged { tag: String },
    /// List the most recently published pages
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let base = cli.config_dir.as_path();

    match cli.command {
        Command::Publish { dirs, all } => {
            let (config, store) = open_store(base)?;
            let dirs = if all {
                page_dirs(&config.content_path(base))?
            } else {
                dirs
            };
            publish(store, &config, base, &dirs)?;
        }
        Command::Delete { id } => {
            let (config, store) = open_store(base)?;
            let publisher = open_publisher(store, &config, base)?;
            let page = publisher.delete(&id)?;
            output::print_delete(&page);
        }
        Command::Show { id, html } => {
            let (_, store) = open_store(base)?;
            if html {
                let body = store.get_page_body(&id)?;
                println!("{}", String::from_utf8_lossy(&body));
            } else {
                output::print_page(&store.get_page(&id)?);
            }
        }
        Command::Search { keywords } => {
            let (_, store) = open_store(base)?;
            output::print_page_list(&store.search_pages(&keywords)?);
        }
        Command::Tags => {
            let (_, store) = open_store(base)?;
            output::print_tags(&store.all_tags()?);
        }
        Command::Tagged { tag } => {
            let (_, store) = open_store(base)?;
            output::print_page_list(&store.pages_by_tag(&tag)?);
        }
        Command::Recent { limit } => {
            let (_, store) = open_store(base)?;
            output::print_page_list(&store.recent_pages(limit)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load config from `base` and open the index store it names.
fn open_store(base: &Path) -> Result<(BlogConfig, IndexStore), Box<dyn std::error::Error>> {
    let config = config::load_config(base)?;
    init_thread_pool(&config.processing);
    let store = IndexStore::open(config.database_path(base))?;
    Ok((config, store))
}

fn open_publisher(
    store: IndexStore,
    config: &BlogConfig,
    base: &Path,
) -> Result<Publisher<CmarkRenderer, FsObjectStore>, Box<dyn std::error::Error>> {
    let objects = FsObjectStore::open(config.objects_path(base))?;
    Ok(Publisher::new(
        store,
        CmarkRenderer::new(),
        objects,
        config.publish_settings(),
    ))
}

/// Publish each directory in turn; a failed page does not stop the rest.
fn publish(
    store: IndexStore,
    config: &BlogConfig,
    base: &Path,
    dirs: &[PathBuf],
) -> Result<(), Box<dyn std::error::Error>> {
    let publisher = open_publisher(store, config, base)?;
    let mut failed = 0;

    for dir in dirs {
        match publisher.publish(dir) {
            Ok((page, outcome)) => output::print_save(&page, &outcome),
            Err(err) => {
                tracing::error!(
                    dir = %dir.display(),
                    post_commit = err.is_post_commit(),
                    "{err}"
                );
                output::print_failure(dir, &err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} pages failed", dirs.len()).into());
    }
    Ok(())
}

/// Direct sub-directories of the content root, sorted by name.
fn page_dirs(content_root: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(content_root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
