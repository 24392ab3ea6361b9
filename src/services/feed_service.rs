use crate::config::Config;
use crate::errors::{FeedError, Result};
use crate::feed::FeedBuilder;
use crate::models::quote::QuoteSnapshot;
use crate::scrapers::base::QuoteScraper;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// 超出客户端超时之外再多等的时间
const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

pub const ATOM_FILE: &str = "feed.atom";
pub const HTML_FILE: &str = "index.html";
pub const RSS_FILE: &str = "feed.rss";

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub symbol: String,
    pub placeholder: bool,
    pub files: Vec<PathBuf>,
    pub icon_deployed: bool,
}

/// 订阅源服务：抓取行情、渲染并写出静态文件
pub struct FeedService {
    config: Config,
    scraper: Arc<dyn QuoteScraper + Send + Sync>,
}

impl FeedService {
    pub fn new(config: Config, scraper: Arc<dyn QuoteScraper + Send + Sync>) -> Self {
        Self { config, scraper }
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// 抓取行情；数据源不可用时返回 Ok(None)，只有致命错误才返回 Err
    pub async fn fetch_snapshot(&self) -> Result<Option<QuoteSnapshot>> {
        let symbol = &self.config.symbol;
        let limit = self.config.request_timeout + TIMEOUT_GRACE;

        let outcome = match tokio::time::timeout(limit, self.scraper.fetch_quote(symbol)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout(limit)),
        };

        match outcome {
            Ok(quote) if quote.is_renderable() => {
                info!(
                    "{} {} price={:?} prev_close={:?} state={}",
                    self.scraper.provider_name(),
                    quote.symbol,
                    quote.price,
                    quote.previous_close,
                    quote.market_state
                );
                Ok(Some(quote))
            }
            Ok(quote) => {
                warn!("Partial data for {}: no price in provider response", quote.symbol);
                Ok(None)
            }
            Err(e) if e.is_recoverable() => {
                warn!("Provider unavailable for {}: {}", symbol, e);
                Ok(None)
            }
            Err(e) => {
                error!("Fatal provider error for {}: {}", symbol, e);
                Err(e)
            }
        }
    }

    /// 执行一次完整流程
    pub async fn run(&self) -> Result<RunSummary> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, generated_at: DateTime<Utc>) -> Result<RunSummary> {
        self.config.validate()?;
        info!("Fetching {} quote...", self.config.symbol);
        let quote = self.fetch_snapshot().await?;
        if quote.is_none() {
            warn!("Rendering placeholder entry for {}", self.config.symbol);
        }

        info!("Generating Atom and HTML...");
        let builder = FeedBuilder::new(&self.config, &self.scraper.quote_page_url(&self.config.symbol));
        let (atom, html) = builder.render(quote.as_ref(), generated_at)?;

        fs::create_dir_all(&self.config.output_dir)?;
        let mut files = vec![
            self.write_file(ATOM_FILE, atom.as_str())?,
            self.write_file(HTML_FILE, html.as_str())?,
        ];
        if self.config.emit_rss {
            let rss = builder.render_rss(quote.as_ref(), generated_at)?;
            files.push(self.write_file(RSS_FILE, rss.as_str())?);
        }

        let icon_deployed = self.deploy_icon();

        info!("Wrote {} files to {}", files.len(), self.config.output_dir.display());
        Ok(RunSummary {
            symbol: self.config.symbol.clone(),
            placeholder: quote.is_none(),
            files,
            icon_deployed,
        })
    }

    fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.config.output_dir.join(name);
        fs::write(&path, content)?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    /// 把图标复制到输出目录，失败只记录警告
    fn deploy_icon(&self) -> bool {
        let (Some(src), Some(name)) = (self.config.icon_path.as_ref(), self.config.icon_file_name()) else {
            return false;
        };
        if !src.exists() {
            info!("Icon {} not found, skipping copy", src.display());
            return false;
        }
        let dst = self.config.output_dir.join(name);
        if dst == *src {
            return true;
        }
        match fs::copy(src, &dst) {
            Ok(_) => {
                info!("Copied {} -> {}", src.display(), dst.display());
                true
            }
            Err(e) => {
                warn!("Could not copy icon file {}: {}", src.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::reader::parse_atom;
    use crate::models::quote::{MarketState, OhlcBar};
    use async_trait::async_trait;
    use chrono::TimeZone;

    enum Behaviour {
        Quote(QuoteSnapshot),
        Fail(fn() -> FeedError),
        Hang,
    }

    struct StubScraper(Behaviour);

    #[async_trait]
    impl QuoteScraper for StubScraper {
        fn provider_name(&self) -> &'static str {
            "stub"
        }

        fn quote_page_url(&self, symbol: &str) -> String {
            format!("https://example.org/quote/{}", symbol)
        }

        async fn fetch_quote(&self, _symbol: &str) -> Result<QuoteSnapshot> {
            match &self.0 {
                Behaviour::Quote(q) => Ok(q.clone()),
                Behaviour::Fail(make) => Err(make()),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(FeedError::DataError("unreachable".to_string()))
                }
            }
        }
    }

    fn quote() -> QuoteSnapshot {
        QuoteSnapshot::new("OCGN", Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap())
            .with_price(Some(1.23))
            .with_previous_close(Some(1.20))
            .with_market_state(MarketState::Regular)
            .with_bar(OhlcBar::new(1.19, 1.25, 1.18, 1.23, 500000))
    }

    fn service(dir: &Path, behaviour: Behaviour) -> FeedService {
        let config = Config::new()
            .with_output_dir(dir.to_str().unwrap())
            .with_icon_path(None);
        FeedService::new(config, Arc::new(StubScraper(behaviour)))
    }

    fn generated() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 14, 35, 0).unwrap()
    }

    #[tokio::test]
    async fn test_run_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let summary = service(dir.path(), Behaviour::Quote(quote())).run_at(generated()).await.unwrap();
        assert!(!summary.placeholder);
        assert_eq!(summary.files.len(), 3);

        let atom = fs::read_to_string(dir.path().join(ATOM_FILE)).unwrap();
        let feed = parse_atom(&atom).unwrap();
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].title, "OCGN: $1.23 (+0.03, +2.50%) [REGULAR]");
        assert!(dir.path().join(HTML_FILE).exists());
        assert!(dir.path().join(RSS_FILE).exists());
    }

    #[tokio::test]
    async fn test_recoverable_failure_renders_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let fail = Behaviour::Fail(|| FeedError::ProviderUnavailable("HTTP status 503".to_string()));
        let summary = service(dir.path(), fail).run_at(generated()).await.unwrap();
        assert!(summary.placeholder);

        let atom = fs::read_to_string(dir.path().join(ATOM_FILE)).unwrap();
        let feed = parse_atom(&atom).unwrap();
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].title, "OCGN: quote data unavailable");
    }

    #[tokio::test]
    async fn test_partial_quote_renders_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let partial = quote().with_price(None);
        let summary = service(dir.path(), Behaviour::Quote(partial)).run_at(generated()).await.unwrap();
        assert!(summary.placeholder);
    }

    #[tokio::test]
    async fn test_fatal_error_propagates_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let fail = Behaviour::Fail(|| FeedError::MalformedResponse("chart meta has no symbol".to_string()));
        let result = service(&out, fail).run_at(generated()).await;
        assert!(matches!(result, Err(FeedError::MalformedResponse(_))));
        assert!(!out.join(ATOM_FILE).exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_times_out_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), Behaviour::Hang);
        let quote = svc.fetch_snapshot().await.unwrap();
        assert!(quote.is_none());
    }

    #[tokio::test]
    async fn test_rss_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new()
            .with_output_dir(dir.path().to_str().unwrap())
            .with_icon_path(None)
            .with_emit_rss(false);
        let svc = FeedService::new(config, Arc::new(StubScraper(Behaviour::Quote(quote()))));
        let summary = svc.run_at(generated()).await.unwrap();
        assert_eq!(summary.files.len(), 2);
        assert!(!dir.path().join(RSS_FILE).exists());
    }

    #[tokio::test]
    async fn test_icon_is_copied_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let icon = dir.path().join("OCGN.png");
        fs::write(&icon, b"\x89PNG").unwrap();
        let out = dir.path().join("docs");
        let config = Config::new()
            .with_output_dir(out.to_str().unwrap())
            .with_icon_path(icon.to_str());
        let svc = FeedService::new(config, Arc::new(StubScraper(Behaviour::Quote(quote()))));
        let summary = svc.run_at(generated()).await.unwrap();
        assert!(summary.icon_deployed);
        assert!(out.join("OCGN.png").exists());
    }
}
