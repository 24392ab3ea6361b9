use chrono::{DateTime, Utc};
use strum::{AsRefStr, Display, EnumString};

use crate::util::{finite, round2};

/// 交易时段状态，只可能是这四个值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum MarketState {
    Pre,
    Regular,
    Post,
    Closed,
}

impl MarketState {
    /// 将数据源返回的状态字符串映射到四种状态之一。
    /// `PREPRE`、`POSTPOST` 以及任何未知值都视为 `CLOSED`。
    pub fn from_provider(raw: &str) -> Self {
        raw.trim()
            .to_ascii_uppercase()
            .parse()
            .unwrap_or(MarketState::Closed)
    }

    pub fn is_extended_hours(&self) -> bool {
        matches!(self, MarketState::Pre | MarketState::Post)
    }
}

/// 最新一根K线（常规交易时段聚合）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhlcBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl OhlcBar {
    /// 任何一个价格不是有限值时返回 None
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: u64) -> Option<Self> {
        if [open, high, low, close].iter().all(|v| v.is_finite()) {
            Some(Self { open, high, low, close, volume })
        } else {
            None
        }
    }
}

/// One point-in-time record of a stock's price and trading data.
///
/// Absolute and percent change are derived from `price` and
/// `previous_close` on demand, so they always agree with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub price: Option<f64>,
    pub previous_close: Option<f64>,
    pub market_state: MarketState,
    pub bar: Option<OhlcBar>,
    pub extended_price: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl QuoteSnapshot {
    pub fn new(symbol: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: None,
            previous_close: None,
            market_state: MarketState::Closed,
            bar: None,
            extended_price: None,
            timestamp,
        }
    }

    pub fn with_price(mut self, price: Option<f64>) -> Self {
        self.price = finite(price);
        self
    }

    pub fn with_previous_close(mut self, previous_close: Option<f64>) -> Self {
        self.previous_close = finite(previous_close);
        self
    }

    pub fn with_market_state(mut self, market_state: MarketState) -> Self {
        self.market_state = market_state;
        self
    }

    pub fn with_bar(mut self, bar: Option<OhlcBar>) -> Self {
        self.bar = bar.and_then(|b| OhlcBar::new(b.open, b.high, b.low, b.close, b.volume));
        self
    }

    pub fn with_extended_price(mut self, extended_price: Option<f64>) -> Self {
        self.extended_price = finite(extended_price);
        self
    }

    /// 把所有非有限数值（NaN / ±inf）替换为缺失
    pub fn sanitized(&self) -> Self {
        self.clone()
            .with_price(self.price)
            .with_previous_close(self.previous_close)
            .with_bar(self.bar)
            .with_extended_price(self.extended_price)
    }

    /// 有价格才可以渲染；没有价格属于部分数据，走占位条目
    pub fn is_renderable(&self) -> bool {
        finite(self.price).is_some()
    }

    /// price - previous_close, rounded to cents
    pub fn change(&self) -> Option<f64> {
        self.change_from(self.price)
    }

    /// (price - previous_close) / previous_close * 100, rounded to 2 decimals
    pub fn change_percent(&self) -> Option<f64> {
        self.change_percent_from(self.price)
    }

    /// 当前价格：盘前/盘后有成交时取盘前/盘后价，否则取常规时段价格
    pub fn headline_price(&self) -> Option<f64> {
        match finite(self.extended_price) {
            Some(ext) if self.market_state.is_extended_hours() => Some(ext),
            _ => finite(self.price),
        }
    }

    /// 当前价格相对昨收的涨跌额与涨跌幅
    pub fn headline_change(&self) -> Option<(f64, Option<f64>)> {
        let price = self.headline_price();
        Some((self.change_from(price)?, self.change_percent_from(price)))
    }

    fn change_from(&self, price: Option<f64>) -> Option<f64> {
        let price = finite(price)?;
        let previous_close = finite(self.previous_close)?;
        Some(round2(price - previous_close))
    }

    fn change_percent_from(&self, price: Option<f64>) -> Option<f64> {
        let price = finite(price)?;
        let previous_close = finite(self.previous_close)?;
        if previous_close == 0.0 {
            return None;
        }
        finite(Some((price - previous_close) / previous_close * 100.0)).map(round2)
    }

    /// 盘前/盘后价格相对常规时段价格的涨跌
    pub fn extended_change(&self) -> Option<(f64, f64)> {
        let extended = finite(self.extended_price)?;
        let price = finite(self.price)?;
        if price == 0.0 {
            return None;
        }
        Some((round2(extended - price), round2((extended - price) / price * 100.0)))
    }
}
