use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use mapcache::application::Prewarmer;
use mapcache::domain::CacheKey;
use mapcache::infrastructure::{
    AppConfig, CatalogClient, CliArgs, Command, ConfigStore, HttpAssetFetcher, ImageCache,
    http_client,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = ConfigStore::new()?.load(args.config.as_deref())?;
    config.merge_with_args(args);
    config.validate()?;
    Ok(config)
}

async fn run(config: &AppConfig, command: Command) -> Result<()> {
    let client = http_client(config.http_timeout(), &config.http.user_agent)?;

    let catalog = Arc::new(CatalogClient::new(client.clone(), config.catalog_url.as_str()));
    let fetcher = Arc::new(HttpAssetFetcher::new(client));

    let cache_dir = config.effective_cache_dir();
    let cache = Arc::new(
        ImageCache::open(&cache_dir, fetcher, config.cache.to_image_cache_config())
            .await
            .wrap_err_with(|| format!("Failed to open cache at {}", cache_dir.display()))?,
    );
    info!(
        root = %cache.store().root().display(),
        workers = cache.config().workers,
        queue_capacity = cache.config().queue_capacity,
        "Image cache ready"
    );

    let prewarmer = Prewarmer::new(catalog.clone(), cache.clone());

    let result = match command {
        Command::Prewarm => match prewarmer.run().await {
            Ok(report) => {
                println!("{report}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        Command::Rewrite => {
            if config.cache.prewarm_on_startup {
                if let Err(e) = prewarmer.run().await {
                    warn!(error = %e, "Startup prewarm failed");
                }
            }
            rewrite_catalog(&catalog, &cache).await
        }
        Command::Fetch { url, key } => cache
            .get_or_download(&url, &CacheKey::new(key))
            .await
            .map(|path| println!("{}", path.display()))
            .map_err(Into::into),
    };

    cache.shutdown().await;
    info!(stats = %cache.stats(), "Cache shut down");
    result
}

async fn rewrite_catalog(catalog: &CatalogClient, cache: &ImageCache) -> Result<()> {
    let mut envelope = catalog.fetch_envelope().await?;
    envelope.data = cache.cache_map_images(envelope.data).await;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = mapcache::VERSION, "Starting {}", mapcache::NAME);

    let command = args.command.clone().unwrap_or(Command::Prewarm);
    run(&config, command).await
}
