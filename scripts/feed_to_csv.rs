use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{App, Arg};
use log::info;
use ticker_feed::config::DEFAULT_BASE_URL;
use ticker_feed::feed::reader::{parse_atom, price_rows};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let default_source = format!("{}feed.atom", DEFAULT_BASE_URL);
    let matches = App::new("feed_to_csv")
        .about("Convert a published Atom price feed into published,price CSV")
        .arg(
            Arg::new("source")
                .value_name("URL_OR_PATH")
                .help("Feed URL or local file")
                .takes_value(true)
                .default_value(&default_source),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("CSV file to write")
                .takes_value(true)
                .default_value("docs/feed_prices.csv"),
        )
        .get_matches();

    let source = matches.value_of("source").unwrap_or(&default_source);
    let output = PathBuf::from(matches.value_of("output").unwrap_or("docs/feed_prices.csv"));

    // 读取订阅源：http(s) 地址走网络，其余按本地文件处理
    let xml = if source.starts_with("http://") || source.starts_with("https://") {
        info!("Fetching {}", source);
        reqwest::get(source)
            .await?
            .error_for_status()?
            .text()
            .await?
    } else {
        fs::read_to_string(source).with_context(|| format!("reading {}", source))?
    };

    let feed = parse_atom(&xml)?;
    let rows = price_rows(&feed)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_csv(&output, &rows)?;

    info!("Wrote {} with {} rows", output.display(), rows.len());
    Ok(())
}

fn write_csv(path: &Path, rows: &[ticker_feed::feed::reader::PriceRow]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(["published", "price"])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
