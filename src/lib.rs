use futures::{stream, StreamExt};
use scraper::Html;
use std::path::PathBuf;
use tracing::debug;

pub mod config;
pub mod edgar;
pub mod fetch;
pub mod observer;

mod error;
mod utils;

pub use config::{Config, MalformedPolicy};
pub use error::{ExtractError, ScraperError, TransportError};
pub use fetch::{Backoff, FetchTarget, Fetcher, HttpTransport, Transport};
pub use observer::{Event, Observer, Recorder, TracingObserver};
pub use utils::{random_user_agent, LogTimer};

use edgar::{FilingIndex, FilingRecord, ProxyLinks, ProxyVotes, VoteResults, VoteTable};

/// Projects a parsed document into records.
pub trait Extractor {
    type Output;

    fn extract(&self, doc: &Html) -> Self::Output;
}

/// Fetch, extract and persist pipeline for both EDGAR outputs.
pub struct Scraper<T, O> {
    config: Config,
    fetcher: Fetcher<T>,
    observer: O,
    filings: FilingIndex,
    votes: VoteTable,
}

impl Scraper<HttpTransport, TracingObserver> {
    pub fn from_config(config: Config) -> Result<Self, ScraperError> {
        let transport = HttpTransport::new(&config.user_agent, config.timeout)?;
        Scraper::new(config, transport, TracingObserver)
    }
}

impl<T: Transport, O: Observer> Scraper<T, O> {
    pub fn new(config: Config, transport: T, observer: O) -> Result<Self, ScraperError> {
        config.validate()?;
        let backoff = Backoff::new(config.sleep_min, config.sleep_max)?;
        let votes = VoteTable::new(&config.vote_row_selector)?;
        Ok(Scraper {
            fetcher: Fetcher::new(transport, config.max_retries, backoff),
            config,
            observer,
            filings: FilingIndex,
            votes,
        })
    }

    /// Pages through the filing index of `cik`, in order, and returns every
    /// record found.
    ///
    /// A page that fails after all retries is skipped. A page that loads but
    /// has no entries is the end of the index.
    pub async fn collect_filings(&self, cik: &str, filing_type: &str) -> Vec<FilingRecord> {
        let batch = self.config.batch_size;
        let mut records = vec![];

        let starts = (0..self.config.max_records).step_by(batch as usize);
        for (i, start) in starts.enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            let target =
                edgar::filing_index_target(&self.config.search_url, cik, filing_type, start, batch);
            let page = self
                .fetcher
                .fetch(&target, &self.observer, |doc| self.filing_page(doc))
                .await;

            let Some(entries) = page else {
                continue;
            };
            if entries.is_empty() {
                self.observer.notify(Event::IndexExhausted {
                    url: target.url.clone(),
                    start,
                });
                break;
            }

            let before = records.len();
            for entry in entries {
                match entry {
                    Ok(record) => records.push(record),
                    Err(e) => self.observer.notify(Event::MalformedEntry {
                        url: target.url.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
            self.observer.notify(Event::PageFetched {
                url: target.url.clone(),
                start,
                records: records.len() - before,
            });
        }

        records
    }

    fn filing_page(
        &self,
        doc: &Html,
    ) -> Result<Vec<Result<FilingRecord, ExtractError>>, ExtractError> {
        let entries = self.filings.extract(doc);
        match self.config.malformed {
            MalformedPolicy::Skip => Ok(entries),
            MalformedPolicy::Retry => match entries.iter().find_map(|e| e.as_ref().err()) {
                Some(e) => Err(e.clone()),
                None => Ok(entries),
            },
        }
    }

    /// Collects the filing index of `cik` into
    /// `<csv_dir>/<cik>_<filing_type>.csv`.
    ///
    /// Returns the written path, or `None` when no filing was found.
    pub async fn run_filings(
        &self,
        cik: &str,
        filing_type: &str,
    ) -> Result<Option<PathBuf>, ScraperError> {
        let records = self.collect_filings(cik, filing_type).await;
        if records.is_empty() {
            self.observer.notify(Event::NothingFound {
                identifier: cik.to_string(),
            });
            return Ok(None);
        }

        let path = edgar::save_filings(&self.config.csv_dir, cik, filing_type, &records)?;
        self.observer.notify(Event::Saved {
            path: path.clone(),
            records: records.len(),
        });
        Ok(Some(path))
    }

    /// Proxy documents listed in the archive index of `cik`.
    pub async fn find_proxy_links(&self, cik: &str) -> Vec<String> {
        let index = self.config.company_index_url(cik);
        let links = match ProxyLinks::new(&index, &self.config.link_keyword) {
            Ok(links) => links,
            Err(e) => {
                debug!("Invalid index url {}: {}", index, e);
                return vec![];
            }
        };

        self.fetcher
            .fetch(&FetchTarget::new(index.as_str()), &self.observer, |doc| {
                Ok(links.extract(doc))
            })
            .await
            .unwrap_or_default()
    }

    /// Vote results of one proxy document. `None` when the fetch failed.
    pub async fn scrape_vote_results(&self, url: &str) -> Option<VoteResults> {
        self.fetcher
            .fetch(&FetchTarget::new(url), &self.observer, |doc| {
                Ok(self.votes.extract(doc))
            })
            .await
    }

    /// Scrapes every proxy document of `cik`, waiting a random backoff delay
    /// before each one.
    pub async fn collect_votes(&self, cik: &str) -> ProxyVotes {
        let links = self.find_proxy_links(cik).await;
        debug!("{} proxy documents for CIK {}", links.len(), cik);

        let scraped: Vec<(String, Option<VoteResults>)> = stream::iter(links)
            .map(|url| async move {
                let delay = self.fetcher.backoff().next_delay();
                tokio::time::sleep(delay).await;
                let results = self.scrape_vote_results(&url).await;
                (url, results)
            })
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let mut votes = ProxyVotes::new();
        for (url, results) in scraped {
            match results {
                Some(results) if !results.is_empty() => {
                    self.observer.notify(Event::Scraped {
                        url: url.clone(),
                        results: results.len(),
                    });
                    votes.insert(url, results);
                }
                _ => self.observer.notify(Event::NoData { url }),
            }
        }
        votes
    }

    /// Collects proxy vote results of `cik` into
    /// `<output_dir>/<cik>_proxy_votes.json`.
    ///
    /// Returns the written path, or `None` when no document had results.
    pub async fn run_votes(&self, cik: &str) -> Result<Option<PathBuf>, ScraperError> {
        let votes = self.collect_votes(cik).await;
        if votes.is_empty() {
            self.observer.notify(Event::NothingFound {
                identifier: cik.to_string(),
            });
            return Ok(None);
        }

        let path = edgar::save_votes(&self.config.output_dir, cik, &votes)?;
        self.observer.notify(Event::Saved {
            path: path.clone(),
            records: votes.len(),
        });
        Ok(Some(path))
    }
}
