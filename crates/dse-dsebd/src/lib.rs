#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Dhaka Stock Exchange website fetch adapter.
//!
//! [`DsebdFetcher`] implements the [`MarketFetcher`] trait from `dse-core`
//! by scraping the exchange's public pages. Each fetch is one HTTP round
//! trip (two for the live board, which merges circuit-breaker limits); rows
//! that fail to parse are skipped, never fatal.

use async_trait::async_trait;
use chrono::NaiveDate;
use dse_core::{
    ArchiveRecord, BoardQuote, DseError, IndexValue, InstrumentCode, LiveQuote, MarketFetcher,
    MarketSummary, MarketTotals, NewsArticle, Result,
};
use std::collections::HashMap;
use tracing::{debug, warn};

mod html;

use html::{class_chunks, links, parse_f64, parse_i64, table_rows, text_after_class};

/// Default base URL of the exchange website.
const DEFAULT_BASE_URL: &str = "https://www.dsebd.org";

/// User agent for HTTP requests; the site rejects the reqwest default.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Business news pages scanned for headlines.
const DEFAULT_NEWS_PAGES: [&str; 3] = [
    "https://www.thedailystar.net/business",
    "https://www.tbsnews.net/economy/stocks",
    "https://en.prothomalo.com/business/local",
];

/// Minimum headline length; shorter anchor texts are navigation chrome.
const MIN_HEADLINE_LEN: usize = 30;

/// Fetch adapter scraping the Dhaka Stock Exchange website.
#[derive(Debug)]
pub struct DsebdFetcher {
    client: reqwest::Client,
    base_url: String,
    news_pages: Vec<String>,
}

impl Default for DsebdFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DsebdFetcher {
    /// Create a fetcher against the real exchange website.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a fetcher against an alternative base URL (tests, mirrors).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            news_pages: DEFAULT_NEWS_PAGES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replace the default business news pages.
    #[must_use]
    pub fn with_news_pages(mut self, pages: Vec<String>) -> Self {
        self.news_pages = pages;
        self
    }

    async fn get_page(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| DseError::Network(e.to_string()))?
            .error_for_status()
            .map_err(|e| DseError::Network(e.to_string()))?;
        resp.text().await.map_err(|e| DseError::Network(e.to_string()))
    }

    /// Circuit-breaker limits from the cbul page, keyed by code.
    async fn fetch_circuit_limits(&self) -> Result<HashMap<InstrumentCode, (Option<f64>, Option<f64>)>> {
        let page = self.get_page(&format!("{}/cbul.php", self.base_url)).await?;
        let mut map = HashMap::new();
        for cells in table_rows(&page) {
            if cells.len() < 8 {
                continue;
            }
            let code = InstrumentCode::new(&cells[1]);
            map.insert(code, (parse_f64(&cells[6]), parse_f64(&cells[7])));
        }
        Ok(map)
    }
}

#[async_trait]
impl MarketFetcher for DsebdFetcher {
    fn name(&self) -> &str {
        "dsebd.org"
    }

    async fn fetch_live(&self) -> Result<Vec<LiveQuote>> {
        let url = format!("{}/latest_share_price_scroll_l.php", self.base_url);
        let (page, limits) = tokio::join!(self.get_page(&url), self.fetch_circuit_limits());
        let page = page?;
        // The board is still useful without limits; log and carry on.
        let limits = limits.unwrap_or_else(|e| {
            warn!(error = %e, "Circuit-breaker page unavailable");
            HashMap::new()
        });

        let mut quotes = Vec::new();
        for cells in table_rows(&page) {
            if cells.len() < 11 {
                continue;
            }
            let code = InstrumentCode::new(&cells[1]);
            let (lower_limit, upper_limit) = limits.get(&code).copied().unwrap_or((None, None));
            quotes.push(LiveQuote {
                code,
                ltp: parse_f64(&cells[2]),
                high: parse_f64(&cells[3]),
                low: parse_f64(&cells[4]),
                close: parse_f64(&cells[5]),
                ycp: parse_f64(&cells[6]),
                change: parse_f64(&cells[7]),
                trades: parse_i64(&cells[8]),
                value_mn: parse_f64(&cells[9]),
                volume: parse_i64(&cells[10]),
                lower_limit,
                upper_limit,
            });
        }
        debug!("Scraped {} live quotes", quotes.len());
        Ok(quotes)
    }

    async fn fetch_dse30(&self) -> Result<Vec<BoardQuote>> {
        let page = self
            .get_page(&format!("{}/dse30_share.php", self.base_url))
            .await?;
        let mut quotes = Vec::new();
        for cells in table_rows(&page) {
            if cells.len() < 11 {
                continue;
            }
            quotes.push(BoardQuote {
                code: InstrumentCode::new(&cells[1]),
                ltp: parse_f64(&cells[2]),
                high: parse_f64(&cells[3]),
                low: parse_f64(&cells[4]),
                close: parse_f64(&cells[5]),
                ycp: parse_f64(&cells[6]),
                change_percent: parse_f64(&cells[7]),
                trades: parse_i64(&cells[8]),
                value_mn: parse_f64(&cells[9]),
                volume: parse_i64(&cells[10]),
            });
        }
        debug!("Scraped {} DSE30 rows", quotes.len());
        Ok(quotes)
    }

    async fn fetch_top20(&self) -> Result<Vec<BoardQuote>> {
        let page = self
            .get_page(&format!("{}/top_20_share.php", self.base_url))
            .await?;
        let mut quotes = Vec::new();
        for cells in table_rows(&page) {
            if cells.len() < 10 {
                continue;
            }
            // The top-20 board swaps the ycp and close columns.
            quotes.push(BoardQuote {
                code: InstrumentCode::new(&cells[1]),
                ltp: parse_f64(&cells[2]),
                high: parse_f64(&cells[3]),
                low: parse_f64(&cells[4]),
                ycp: parse_f64(&cells[5]),
                close: parse_f64(&cells[6]),
                change_percent: None,
                trades: parse_i64(&cells[7]),
                value_mn: parse_f64(&cells[8]),
                volume: parse_i64(&cells[9]),
            });
        }
        debug!("Scraped {} top-20 rows", quotes.len());
        Ok(quotes)
    }

    async fn fetch_indices(&self) -> Result<MarketSummary> {
        let page = self.get_page(&format!("{}/", self.base_url)).await?;
        let chunks = class_chunks(&page, "midrow");

        let mut indices = Vec::new();
        for chunk in chunks.iter().take(3) {
            let Some(name) = text_after_class(chunk, "m_col-1") else {
                continue;
            };
            indices.push(IndexValue {
                name,
                value: text_after_class(chunk, "m_col-2").as_deref().and_then(parse_f64),
                change: text_after_class(chunk, "m_col-3").as_deref().and_then(parse_f64),
                change_percent: text_after_class(chunk, "m_col-4")
                    .as_deref()
                    .and_then(parse_f64),
            });
        }

        // Homepage layout: row 4 carries market totals, row 6 issue counts.
        let totals_of = |chunk: Option<&&str>, class: &str| {
            chunk.and_then(|c| text_after_class(c, class))
        };
        let trade_row = chunks.get(4);
        let issues_row = chunks.get(6);
        let totals = MarketTotals {
            total_trades: totals_of(trade_row, "m_col-wid").as_deref().and_then(parse_i64),
            total_volume: totals_of(trade_row, "m_col-wid1").as_deref().and_then(parse_i64),
            total_value_mn: totals_of(trade_row, "m_col-wid2").as_deref().and_then(parse_f64),
            issues_advanced: totals_of(issues_row, "m_col-wid").as_deref().and_then(parse_i64),
            issues_declined: totals_of(issues_row, "m_col-wid1")
                .as_deref()
                .and_then(parse_i64),
            issues_unchanged: totals_of(issues_row, "m_col-wid2")
                .as_deref()
                .and_then(parse_i64),
        };

        debug!("Scraped {} index readings", indices.len());
        Ok(MarketSummary { indices, totals })
    }

    async fn fetch_news(&self) -> Result<Vec<NewsArticle>> {
        let mut articles = Vec::new();
        for page_url in &self.news_pages {
            let page = match self.get_page(page_url).await {
                Ok(page) => page,
                Err(e) => {
                    // One unreachable source must not sink the rest.
                    warn!(source = %page_url, error = %e, "News source failed");
                    continue;
                }
            };
            for (href, text) in links(&page) {
                if text.len() < MIN_HEADLINE_LEN || href.is_empty() || href.starts_with('#') {
                    continue;
                }
                let url = if href.starts_with("http") {
                    href
                } else {
                    format!("{}{href}", origin_of(page_url))
                };
                if articles.iter().any(|a: &NewsArticle| a.url.as_deref() == Some(&url)) {
                    continue;
                }
                articles.push(NewsArticle {
                    title: text,
                    published: None,
                    url: Some(url),
                    summary: None,
                });
            }
        }
        debug!("Scraped {} news headlines", articles.len());
        Ok(articles)
    }

    async fn fetch_archive(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ArchiveRecord>> {
        let url = format!(
            "{}/day_end_archive.php?startDate={start}&endDate={end}&inst=All%20Instrument&archive=data",
            self.base_url
        );
        let page = self.get_page(&url).await?;

        let mut records = Vec::new();
        for cells in table_rows(&page) {
            if cells.len() < 12 {
                continue;
            }
            let Ok(date) = cells[1].parse::<NaiveDate>() else {
                continue;
            };
            records.push(ArchiveRecord {
                date,
                code: InstrumentCode::new(&cells[2]),
                ltp: parse_f64(&cells[3]),
                high: parse_f64(&cells[4]),
                low: parse_f64(&cells[5]),
                open: parse_f64(&cells[6]),
                close: parse_f64(&cells[7]),
                ycp: parse_f64(&cells[8]),
                trades: parse_i64(&cells[9]),
                value: parse_f64(&cells[10]),
                volume: parse_i64(&cells[11]),
            });
        }
        debug!("Scraped {} archive rows for {start}..{end}", records.len());
        Ok(records)
    }
}

/// Scheme and host of a page URL, with any path stripped.
fn origin_of(page_url: &str) -> &str {
    let host_start = page_url.find("://").map_or(0, |i| i + 3);
    page_url[host_start..]
        .find('/')
        .map_or(page_url, |i| &page_url[..host_start + i])
}
