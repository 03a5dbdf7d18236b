mod export;

use std::path::PathBuf;

use anyhow::Context;
use bibsonomy_core::config::{DEFAULT_BASE_URL, DEFAULT_MAX_POSTS_PER_REQUEST};
use bibsonomy_core::{BibSonomy, ClientConfig};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::export::ExportOptions;

/// Download posts from BibSonomy and store them as JSON files.
#[derive(Debug, Parser)]
#[command(name = "bibsonomy-export", version)]
struct Args {
    /// BibSonomy user name
    #[arg(env = "BIBSONOMY_USER")]
    user: String,

    /// API key of that user (shown in the BibSonomy settings)
    #[arg(env = "BIBSONOMY_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Export the posts of USER instead of your own
    #[arg(short = 'u', long = "for-user", value_name = "USER")]
    for_user: Option<String>,

    /// Only export posts carrying all of these tags
    #[arg(short, long, num_args = 1.., value_name = "TAG")]
    tags: Vec<String>,

    /// Also download the documents attached to publications
    #[arg(short, long)]
    documents: bool,

    /// Target directory
    #[arg(long, default_value = ".", value_name = "DIR")]
    directory: PathBuf,

    /// Bookmarks file name, without extension
    #[arg(long, default_value = "bookmarks", value_name = "NAME")]
    bookmark_file: String,

    /// Publications file name, without extension
    #[arg(long, default_value = "publications", value_name = "NAME")]
    publication_file: String,

    /// Do not write bookmarks
    #[arg(long)]
    no_bookmarks: bool,

    /// Do not write publications
    #[arg(long)]
    no_publications: bool,

    #[arg(long, env = "BIBSONOMY_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Most posts requested per call
    #[arg(long, env = "BIBSONOMY_PAGE_SIZE", default_value_t = DEFAULT_MAX_POSTS_PER_REQUEST)]
    page_size: usize,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bibsonomy_core=info,bibsonomy_export=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = ClientConfig::new(&args.user, &args.api_key)
        .with_base_url(&args.base_url)
        .context("invalid --base-url")?
        .with_max_posts_per_request(args.page_size)
        .context("invalid --page-size")?;
    let client = BibSonomy::connect(&config).context("could not set up the BibSonomy client")?;

    std::fs::create_dir_all(&args.directory)
        .with_context(|| format!("could not create {}", args.directory.display()))?;

    let options = ExportOptions {
        user_name: args.for_user.unwrap_or(args.user),
        tags: args.tags,
        directory: args.directory,
        bookmark_file: (!args.no_bookmarks).then_some(args.bookmark_file),
        publication_file: (!args.no_publications).then_some(args.publication_file),
        documents: args.documents,
    };
    let summary = export::run(&client, &options)?;
    info!(
        bookmarks = summary.bookmarks,
        publications = summary.publications,
        documents = summary.documents,
        skipped_documents = summary.skipped_documents,
        "export finished"
    );
    Ok(())
}
