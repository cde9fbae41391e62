/*
telepress - single-run main.rs
Fetches one batch of articles, relays the eligible ones to the channel and
records each successful delivery, then exits. Scheduling between runs is
external (cron or similar); runs must not overlap.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::{init_db_pool, Config};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use telepress::deliver::{Deliver, TelegramChannel};
use telepress::fetch::{NewsApiClient, NewsSource, DEFAULT_NEWS_API_URL};
use telepress::filter;
use telepress::pipeline::Pipeline;
use telepress::store::SeenStore;
use telepress::translate::{chat::ChatTranslator, http::HttpTranslator, Translator};

#[derive(Parser, Debug)]
#[command(name = "telepress", about = "Telepress single-run news relay")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fetch and filter only; do not translate, deliver or record
    #[arg(long)]
    dry_run: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local .env first, so *_env lookups below can see it
    dotenv::dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let filter_layer = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter_layer).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    // Load configuration with defaults
    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, overrides = ?override_path, "configuration loaded");

    // Build every collaborator (resolving secrets) before any network
    // activity, so a missing key fails the run up front.
    let source = create_news_source(&config)?;
    let translator = create_translator(&config)?;
    let channel = create_channel(&config)?;

    // Initialize DB pool; an absent file is an empty store and gets created.
    let db_pool = match init_db_pool(&config.database.path).await {
        Ok(p) => p,
        Err(e) => {
            error!(%e, db_path = %config.database.path, "failed to initialize database pool");
            return Err(e);
        }
    };
    let store = SeenStore::new(db_pool);
    store
        .ensure_schema()
        .await
        .context("failed to ensure seen store schema")?;

    if args.dry_run {
        info!("Dry run: fetching and filtering only");
        let articles = source.fetch_batch().await.context("news fetch failed")?;
        for article in &articles {
            match filter::check(&store, article).await? {
                Some(reason) => info!("would skip ({:?}): {}", reason, article.title),
                None => info!("would post: {}", article.title),
            }
        }
        return Ok(());
    }

    let pacing = config
        .pacing
        .as_ref()
        .and_then(|p| p.delay_seconds)
        .unwrap_or(2);

    let pipeline = Pipeline::new(source, translator, channel, store)
        .with_pacing(Duration::from_secs(pacing));

    match pipeline.run().await {
        Ok(summary) => {
            info!(
                "Done posting news to the channel ({} delivered)",
                summary.delivered
            );
            Ok(())
        }
        Err(e) => {
            error!(%e, "run aborted");
            Err(e.into())
        }
    }
}

/// Resolve a secret named by config: the config stores env var *names*,
/// never the secrets themselves.
fn env_secret(var: &str, what: &str) -> Result<String> {
    let value =
        std::env::var(var).with_context(|| format!("{} env var '{}' not set", what, var))?;
    if value.is_empty() {
        anyhow::bail!("{} env var '{}' is empty", what, var);
    }
    Ok(value)
}

fn create_news_source(config: &Config) -> Result<Arc<dyn NewsSource>> {
    let news = &config.news;
    let api_key_env = news.api_key_env.as_deref().unwrap_or("NEWS_API_KEY");
    let api_key = env_secret(api_key_env, "news API key")?;

    let api_url = news
        .api_url
        .clone()
        .unwrap_or_else(|| DEFAULT_NEWS_API_URL.to_string());
    let page_size = news.page_size.unwrap_or(15);
    let timeout_secs = news.timeout_seconds.unwrap_or(10);

    let client = NewsApiClient::new(
        api_url,
        api_key,
        news.source.as_str(),
        news.language.as_str(),
        page_size,
    )
    .with_timeout(timeout_secs);
    Ok(Arc::new(client))
}

/// Create a translation backend based on configuration.
fn create_translator(config: &Config) -> Result<Arc<dyn Translator>> {
    let translator = &config.translator;
    let backend = translator.backend.as_deref().unwrap_or("http");
    let source_lang = translator.source_lang.as_deref().unwrap_or("en");
    let target_lang = translator.target_lang.as_deref().unwrap_or("fa");

    match backend {
        "http" => {
            let http_config = translator
                .http
                .as_ref()
                .context("translator.backend = \"http\" but [translator.http] is missing")?;

            let mut backend =
                HttpTranslator::new(http_config.api_url.as_str(), source_lang, target_lang)
                    .with_timeout(http_config.timeout_seconds.unwrap_or(30));
            if let Some(key_env) = http_config.api_key_env.as_deref() {
                backend = backend.with_api_key(env_secret(key_env, "translation API key")?);
            }
            Ok(Arc::new(backend))
        }
        "chat" => {
            let chat_config = translator
                .chat
                .as_ref()
                .context("translator.backend = \"chat\" but [translator.chat] is missing")?;

            let key_env = chat_config.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
            let api_key = env_secret(key_env, "chat completion API key")?;

            let api_url = chat_config
                .api_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434/v1/chat/completions".to_string());
            let model = chat_config
                .model
                .clone()
                .unwrap_or_else(|| "gpt-4o-mini".to_string());

            let backend = ChatTranslator::new(api_url, api_key, model, source_lang, target_lang)
                .with_defaults(
                    chat_config.timeout_seconds.unwrap_or(30),
                    chat_config.max_tokens.unwrap_or(400),
                    chat_config.temperature.unwrap_or(0.2),
                );
            Ok(Arc::new(backend))
        }
        _ => anyhow::bail!("Unknown translator backend: {}", backend),
    }
}

fn create_channel(config: &Config) -> Result<Arc<dyn Deliver>> {
    let telegram = &config.telegram;
    if telegram.channel.is_empty() {
        anyhow::bail!("telegram.channel must not be empty");
    }

    let token_env = telegram.token_env.as_deref().unwrap_or("TELEGRAM_BOT_TOKEN");
    let token = env_secret(token_env, "bot token")?;

    let channel = match telegram.api_url.as_deref() {
        Some(base) => TelegramChannel::with_base_url(base, token, telegram.channel.as_str()),
        None => TelegramChannel::new(token, telegram.channel.as_str()),
    };
    Ok(Arc::new(
        channel.with_timeout(telegram.timeout_seconds.unwrap_or(15)),
    ))
}
