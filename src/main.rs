#[macro_use]
extern crate log;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};

use worksheets::config::Config;
use worksheets::model::parse_topics;
use worksheets::query::{Filter, SortSpec};
use worksheets::{server, CatalogClient, FilePayload, Submission, WorksheetDraft};

/// math worksheet catalog
#[derive(Parser, Debug)]
#[clap(name ="worksheets", author, version = env!("GIT_VERSION"), about, long_about = None)]
struct Options {
    /// enable debugging logs
    #[clap(long, action=ArgAction::Count)]
    debug: u8,

    /// config file path, the environment is used when omitted
    #[clap(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// upload a worksheet pdf (and preview image) and create its record
    Upload(UploadOptions),
    /// list worksheets
    List(ListOptions),
    /// show the actor of the current session
    Me,
    /// run the http api
    Serve,
}

#[derive(Args, Debug)]
struct UploadOptions {
    /// worksheet title
    #[clap(short, long)]
    title: String,

    /// short description shown on the worksheet card
    #[clap(short, long)]
    description: String,

    /// one of the catalog categories, e.g. "SAT Math" or "Algebra"
    #[clap(short, long)]
    category: String,

    /// Beginner, Intermediate or Advanced
    #[clap(short = 'l', long)]
    difficulty: String,

    /// path to the worksheet pdf
    #[clap(short = 'f', long)]
    pdf: String,

    /// path to a preview image
    #[clap(short, long)]
    preview: Option<String>,

    /// comma separated topics
    #[clap(short = 'o', long)]
    topics: Option<String>,

    /// number of pages
    #[clap(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    pages: Option<u32>,
}

#[derive(Args, Debug)]
struct ListOptions {
    /// only list this category
    #[clap(long, default_value_t = String::from("all"))]
    category: String,

    /// only list this difficulty
    #[clap(long, default_value_t = String::from("all"))]
    difficulty: String,

    /// sort key, prefix with '-' for descending order
    #[clap(long, default_value_t = String::from("-created_date"), allow_hyphen_values = true)]
    sort: String,

    /// print records as json
    #[clap(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    let opts = Options::parse();

    simple_logger::SimpleLogger::new()
        .with_utc_timestamps()
        .with_level({
            match opts.debug {
                0 => log::LevelFilter::Info,
                1 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            }
        })
        .with_module_level("hyper", log::Level::Warn.to_level_filter())
        .with_module_level("reqwest", log::Level::Warn.to_level_filter())
        .init()?;

    log::debug!("options: {:#?}", opts);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    rt.block_on(app(opts))
}

async fn app(opts: Options) -> Result<()> {
    let config = Config::load(opts.config.as_deref())
        .await
        .context("failed to load configuration")?;

    let client = CatalogClient::from_config(&config.backend).await?;

    match opts.command {
        Commands::Upload(opts) => upload(&client, opts).await,
        Commands::List(opts) => list(&client, opts).await,
        Commands::Me => me(&client).await,
        Commands::Serve => server::serve(client, &config.server).await,
    }
}

async fn upload(client: &CatalogClient, opts: UploadOptions) -> Result<()> {
    let mut draft = WorksheetDraft::new(
        opts.title,
        opts.description,
        opts.category,
        opts.difficulty,
    );
    if let Some(topics) = &opts.topics {
        draft.topics = parse_topics(topics);
    }
    draft.pages = opts.pages;
    draft.validate_metadata()?;

    let file = FilePayload::from_path(&opts.pdf).await?;
    let preview = match &opts.preview {
        Some(path) => Some(FilePayload::from_path(path).await?),
        None => None,
    };

    let created = client
        .publish(Submission {
            draft,
            file,
            preview,
        })
        .await
        .context("Upload failed")?;

    info!("worksheet created: {}", created.file_url);
    println!("{}", created.id);

    Ok(())
}

async fn list(client: &CatalogClient, opts: ListOptions) -> Result<()> {
    let sort: SortSpec = opts.sort.parse()?;
    let filter = Filter::new(Some(opts.category.as_str()), Some(opts.difficulty.as_str()));

    let worksheets = client.browse(&filter, &sort).await?;
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&worksheets)?);
        return Ok(());
    }

    for w in worksheets {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            w.id, w.category, w.difficulty, w.download_count, w.title
        );
    }

    Ok(())
}

async fn me(client: &CatalogClient) -> Result<()> {
    match client.auth().me().await {
        Some(actor) => println!(
            "{} ({}){}",
            actor.name.as_deref().unwrap_or(&actor.id),
            actor.role,
            if actor.is_admin() { " can manage worksheets" } else { "" }
        ),
        None => println!("anonymous"),
    }

    Ok(())
}
