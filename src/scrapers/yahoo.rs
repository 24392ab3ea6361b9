use crate::models::quote::{MarketState, OhlcBar, QuoteSnapshot};
use crate::errors::{FeedError, Result};
use crate::scrapers::base::QuoteScraper;
use crate::util::{finite, from_unix_seconds};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Yahoo Finance chart API 抓取器
pub struct YahooScraper {
    client: Client,
    endpoint: String,
}

impl YahooScraper {
    /// 创建新的 Yahoo 抓取器，`endpoint` 形如 `https://query1.finance.yahoo.com`
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FeedError::RequestError)?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuoteScraper for YahooScraper {
    fn provider_name(&self) -> &'static str {
        "Yahoo Finance"
    }

    fn quote_page_url(&self, symbol: &str) -> String {
        format!("https://finance.yahoo.com/quote/{}", symbol)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<QuoteSnapshot> {
        info!("获取 {} 最新行情", symbol);

        let response = self.client
            .get(format!("{}/v8/finance/chart/{}", self.endpoint, symbol))
            .query(&[
                ("interval", "1m"),
                ("range", "1d"),
                ("includePrePost", "true"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::ProviderUnavailable(format!(
                "HTTP status {} for {}",
                status, symbol
            )));
        }

        let text = response.text().await?;
        debug!("成功获取响应，{} 字节", text.len());

        snapshot_from_chart(&text, Utc::now())
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_time: Option<i64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    regular_market_volume: Option<f64>,
    market_state: Option<String>,
    current_trading_period: Option<TradingPeriods>,
}

#[derive(Debug, Deserialize)]
struct TradingPeriods {
    pre: TradingPeriod,
    regular: TradingPeriod,
    post: TradingPeriod,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct TradingPeriod {
    start: i64,
    end: i64,
}

impl TradingPeriod {
    fn contains(&self, ts: i64) -> bool {
        self.start <= ts && ts < self.end
    }
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// 单根分钟K线，字段均已过滤非有限值
#[derive(Debug, Clone, Copy)]
struct MinuteBar {
    ts: i64,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

fn series_value(values: &[Option<f64>], i: usize) -> Option<f64> {
    finite(values.get(i).copied().flatten())
}

impl ChartResult {
    fn minute_bars(&self) -> Vec<MinuteBar> {
        let empty = QuoteSeries::default();
        let series = self.indicators.quote.first().unwrap_or(&empty);
        self.timestamp
            .iter()
            .enumerate()
            .map(|(i, &ts)| MinuteBar {
                ts,
                open: series_value(&series.open, i),
                high: series_value(&series.high, i),
                low: series_value(&series.low, i),
                close: series_value(&series.close, i),
                volume: series_value(&series.volume, i),
            })
            .collect()
    }
}

/// 将 chart API 的响应体转换为行情快照。
///
/// `now` 用于在响应没有 `marketState` 时根据交易时段推断市场状态。
/// 响应无法解析为 chart JSON 时返回 `JsonError`（致命）；
/// 数据源明确报错或没有结果时返回 `ProviderUnavailable`（可兜底）。
pub fn snapshot_from_chart(body: &str, now: DateTime<Utc>) -> Result<QuoteSnapshot> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(err) = response.chart.error {
        return Err(FeedError::ProviderUnavailable(format!(
            "{}: {}",
            err.code.unwrap_or_else(|| "error".to_string()),
            err.description.unwrap_or_default()
        )));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| FeedError::ProviderUnavailable("empty chart result".to_string()))?;

    let meta = &result.meta;
    let symbol = meta.symbol.clone().unwrap_or_default();
    if symbol.is_empty() {
        return Err(FeedError::MalformedResponse("chart meta has no symbol".to_string()));
    }

    let bars = result.minute_bars();
    let periods = meta.current_trading_period.as_ref();

    let market_state = match meta.market_state.as_deref() {
        Some(raw) => MarketState::from_provider(raw),
        None => periods
            .map(|p| market_state_at(p, now.timestamp()))
            .unwrap_or(MarketState::Closed),
    };

    // 盘前/盘后价格：对应时段内最后一个有效收盘价
    let extended = match (market_state, periods) {
        (MarketState::Pre, Some(p)) => last_close_in(&bars, &p.pre),
        (MarketState::Post, Some(p)) => last_close_in(&bars, &p.post),
        _ => None,
    };

    let regular_bars: Vec<MinuteBar> = match periods {
        Some(p) => bars.iter().copied().filter(|b| p.regular.contains(b.ts)).collect(),
        None => bars.clone(),
    };
    let bar = aggregate_bar(&regular_bars, meta);

    let latest_ts = [meta.regular_market_time, extended.map(|(ts, _)| ts)]
        .into_iter()
        .flatten()
        .max()
        .or_else(|| bars.last().map(|b| b.ts));
    let timestamp = latest_ts.and_then(from_unix_seconds).unwrap_or(now);

    let previous_close = finite(meta.previous_close).or(finite(meta.chart_previous_close));

    debug!(
        "{} state={} bars={} regular_bars={}",
        symbol,
        market_state,
        bars.len(),
        regular_bars.len()
    );

    Ok(QuoteSnapshot::new(&symbol, timestamp)
        .with_price(meta.regular_market_price)
        .with_previous_close(previous_close)
        .with_market_state(market_state)
        .with_bar(bar)
        .with_extended_price(extended.map(|(_, price)| price)))
}

fn market_state_at(periods: &TradingPeriods, ts: i64) -> MarketState {
    if periods.pre.contains(ts) {
        MarketState::Pre
    } else if periods.regular.contains(ts) {
        MarketState::Regular
    } else if periods.post.contains(ts) {
        MarketState::Post
    } else {
        MarketState::Closed
    }
}

fn last_close_in(bars: &[MinuteBar], period: &TradingPeriod) -> Option<(i64, f64)> {
    bars.iter()
        .rev()
        .filter(|b| period.contains(b.ts))
        .find_map(|b| b.close.map(|c| (b.ts, c)))
}

/// 把常规时段的分钟K线聚合成一根日内K线；
/// meta 中的日内最高/最低/成交量优先。
fn aggregate_bar(bars: &[MinuteBar], meta: &ChartMeta) -> Option<OhlcBar> {
    let open = bars.iter().find_map(|b| b.open)?;
    let close = bars.iter().rev().find_map(|b| b.close)?;

    let high = finite(meta.regular_market_day_high).or_else(|| {
        bars.iter()
            .filter_map(|b| b.high)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    })?;
    let low = finite(meta.regular_market_day_low).or_else(|| {
        bars.iter()
            .filter_map(|b| b.low)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
    })?;
    let volume = finite(meta.regular_market_volume)
        .unwrap_or_else(|| bars.iter().filter_map(|b| b.volume).sum::<f64>());

    OhlcBar::new(open, high, low, close, volume.max(0.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    // 2026-10-19: pre 08:00-13:30, regular 13:30-20:00, post 20:00-24:00 (UTC)
    const PRE_START: i64 = 1_792_396_800;
    const REG_START: i64 = PRE_START + 19_800;
    const REG_END: i64 = REG_START + 23_400;
    const POST_END: i64 = REG_END + 14_400;

    fn chart(meta_extra: serde_json::Value, timestamps: Vec<i64>, closes: Vec<Option<f64>>) -> String {
        let n = timestamps.len();
        let mut meta = json!({
            "symbol": "OCGN",
            "regularMarketPrice": 1.23,
            "chartPreviousClose": 1.20,
            "regularMarketTime": REG_START + 3600,
            "currentTradingPeriod": {
                "pre": {"start": PRE_START, "end": REG_START},
                "regular": {"start": REG_START, "end": REG_END},
                "post": {"start": REG_END, "end": POST_END}
            }
        });
        if let (Some(m), Some(extra)) = (meta.as_object_mut(), meta_extra.as_object()) {
            for (k, v) in extra {
                m.insert(k.clone(), v.clone());
            }
        }
        json!({
            "chart": {
                "result": [{
                    "meta": meta,
                    "timestamp": timestamps,
                    "indicators": {"quote": [{
                        "open": closes,
                        "high": closes,
                        "low": closes,
                        "close": closes,
                        "volume": vec![Some(1000.0); n]
                    }]}
                }],
                "error": null
            }
        })
        .to_string()
    }

    fn at(ts: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(ts, 0).unwrap()
    }

    #[test]
    fn test_regular_session_snapshot() {
        let body = chart(
            json!({}),
            vec![REG_START, REG_START + 60, REG_START + 120],
            vec![Some(1.19), Some(1.25), Some(1.23)],
        );
        let quote = snapshot_from_chart(&body, at(REG_START + 3600)).unwrap();
        assert_eq!(quote.symbol, "OCGN");
        assert_eq!(quote.price, Some(1.23));
        assert_eq!(quote.previous_close, Some(1.20));
        assert_eq!(quote.market_state, MarketState::Regular);
        assert_eq!(quote.extended_price, None);
        let bar = quote.bar.unwrap();
        assert_eq!((bar.open, bar.high, bar.low, bar.close), (1.19, 1.25, 1.19, 1.23));
        assert_eq!(bar.volume, 3000);
        assert_eq!(quote.timestamp, at(REG_START + 3600));
    }

    #[test]
    fn test_meta_day_values_take_precedence() {
        let body = chart(
            json!({"regularMarketDayHigh": 1.30, "regularMarketDayLow": 1.10, "regularMarketVolume": 500000}),
            vec![REG_START, REG_START + 60],
            vec![Some(1.19), Some(1.23)],
        );
        let bar = snapshot_from_chart(&body, at(REG_START + 120)).unwrap().bar.unwrap();
        assert_eq!((bar.high, bar.low, bar.volume), (1.30, 1.10, 500000));
    }

    #[test]
    fn test_post_market_price_and_timestamp() {
        let body = chart(
            json!({}),
            vec![REG_START, REG_END - 60, REG_END + 60, REG_END + 120],
            vec![Some(1.20), Some(1.23), Some(1.28), None],
        );
        let quote = snapshot_from_chart(&body, at(REG_END + 600)).unwrap();
        assert_eq!(quote.market_state, MarketState::Post);
        assert_eq!(quote.extended_price, Some(1.28));
        assert_eq!(quote.timestamp, at(REG_END + 60));
        assert_eq!(quote.bar.unwrap().close, 1.23);
    }

    #[test]
    fn test_pre_market_without_regular_bars() {
        let body = chart(json!({}), vec![PRE_START + 60], vec![Some(1.21)]);
        let quote = snapshot_from_chart(&body, at(PRE_START + 600)).unwrap();
        assert_eq!(quote.market_state, MarketState::Pre);
        assert_eq!(quote.extended_price, Some(1.21));
        assert_eq!(quote.bar, None);
    }

    #[test]
    fn test_explicit_market_state_wins() {
        let body = chart(json!({"marketState": "POSTPOST"}), vec![], vec![]);
        let quote = snapshot_from_chart(&body, at(REG_START + 60)).unwrap();
        assert_eq!(quote.market_state, MarketState::Closed);
    }

    #[test]
    fn test_outside_all_periods_is_closed() {
        let body = chart(json!({}), vec![], vec![]);
        let quote = snapshot_from_chart(&body, at(POST_END + 60)).unwrap();
        assert_eq!(quote.market_state, MarketState::Closed);
    }

    #[test]
    fn test_missing_price_is_partial_not_error() {
        let body = chart(json!({"regularMarketPrice": null}), vec![], vec![]);
        let quote = snapshot_from_chart(&body, at(REG_START)).unwrap();
        assert!(!quote.is_renderable());
    }

    #[test]
    fn test_previous_close_preferred_over_chart_previous_close() {
        let body = chart(json!({"previousClose": 1.15}), vec![], vec![]);
        let quote = snapshot_from_chart(&body, at(REG_START)).unwrap();
        assert_eq!(quote.previous_close, Some(1.15));
    }

    #[test]
    fn test_provider_error_is_recoverable() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = snapshot_from_chart(body, at(REG_START)).unwrap_err();
        assert!(matches!(err, FeedError::ProviderUnavailable(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_garbage_body_is_fatal() {
        let err = snapshot_from_chart("<html>rate limited</html>", at(REG_START)).unwrap_err();
        assert!(matches!(err, FeedError::JsonError(_)));
        assert!(!err.is_recoverable());
    }
}
