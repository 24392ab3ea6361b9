use ticker_feed::config::{Config, DEFAULT_BASE_URL, DEFAULT_ENDPOINT};
use ticker_feed::scrapers::yahoo::YahooScraper;
use ticker_feed::services::feed_service::FeedService;

use anyhow::Context;
use clap::{App, Arg};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

const BASE_URL_ENV: &str = "FEED_BASE_URL";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = App::new("ticker_feed")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Fetch one ticker's latest quote and publish it as Atom / RSS / HTML")
        .arg(
            Arg::new("base-url")
                .short('b')
                .long("base-url")
                .value_name("URL")
                .help("Public base URL of the published files (falls back to $FEED_BASE_URL)")
                .takes_value(true),
        )
        .arg(
            Arg::new("symbol")
                .short('s')
                .long("symbol")
                .value_name("SYMBOL")
                .help("Ticker symbol to fetch")
                .takes_value(true)
                .default_value("OCGN"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory the feed files are written to")
                .takes_value(true)
                .default_value("docs"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECONDS")
                .help("Provider request timeout in seconds")
                .takes_value(true)
                .default_value("20"),
        )
        .arg(
            Arg::new("icon")
                .long("icon")
                .value_name("PATH")
                .help("Icon copied next to the feeds (default: <SYMBOL>.png)")
                .takes_value(true),
        )
        .arg(
            Arg::new("endpoint")
                .long("endpoint")
                .value_name("URL")
                .help("Quote provider endpoint")
                .takes_value(true)
                .default_value(DEFAULT_ENDPOINT),
        )
        .arg(
            Arg::new("no-rss")
                .long("no-rss")
                .help("Do not write feed.rss")
                .takes_value(false),
        )
        .get_matches();

    let symbol = matches.value_of("symbol").unwrap_or("OCGN");
    let base_url = match matches.value_of("base-url") {
        Some(url) => url.to_string(),
        None => std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
    };
    let timeout_secs = matches
        .value_of("timeout")
        .unwrap_or("20")
        .parse::<u64>()
        .context("--timeout must be a whole number of seconds")?;

    let mut config = Config::for_symbol(symbol)
        .with_base_url(&base_url)
        .with_output_dir(matches.value_of("output-dir").unwrap_or("docs"))
        .with_request_timeout(Duration::from_secs(timeout_secs))
        .with_provider_endpoint(matches.value_of("endpoint").unwrap_or(DEFAULT_ENDPOINT))
        .with_emit_rss(!matches.is_present("no-rss"));
    if let Some(icon) = matches.value_of("icon") {
        config = config.with_icon_path(Some(icon));
    }
    config.validate()?;

    info!("Using base URL: {}", config.base_url);
    let scraper = YahooScraper::new(&config.provider_endpoint, config.request_timeout)?;
    let service = FeedService::new(config, Arc::new(scraper));

    let summary = service.run().await?;
    if summary.placeholder {
        warn!("{} feed published with placeholder entry", summary.symbol);
    } else {
        info!("{} feed published ({} files)", summary.symbol, summary.files.len());
    }

    Ok(())
}
