use crate::ScraperError;
use std::{path::PathBuf, time::Duration};

pub const ARCHIVE_URL: &str = "https://www.sec.gov/Archives/edgar/data/";
pub const SEARCH_URL: &str = "https://www.sec.gov/cgi-bin/browse-edgar";
pub const OUTPUT_DIR: &str = "sec_proxy_data";
pub const CSV_DIR: &str = ".";
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// What to do with an index entry that lacks a required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MalformedPolicy {
    /// Drop the entry and keep the rest of the page.
    #[default]
    Skip,
    /// Fail the page attempt and go through the retry path.
    Retry,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub archive_url: String,
    pub search_url: String,
    /// Vote results land here.
    pub output_dir: PathBuf,
    /// Filing indexes land here.
    pub csv_dir: PathBuf,
    pub max_retries: u32,
    pub sleep_min: Duration,
    pub sleep_max: Duration,
    pub batch_size: u32,
    pub max_records: u32,
    pub batch_delay: Duration,
    pub concurrency: usize,
    pub malformed: MalformedPolicy,
    pub user_agent: String,
    pub timeout: Duration,
    pub link_keyword: String,
    pub vote_row_selector: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            archive_url: ARCHIVE_URL.to_string(),
            search_url: SEARCH_URL.to_string(),
            output_dir: PathBuf::from(OUTPUT_DIR),
            csv_dir: PathBuf::from(CSV_DIR),
            max_retries: 3,
            sleep_min: Duration::from_secs(1),
            sleep_max: Duration::from_secs(5),
            batch_size: 40,
            max_records: 100,
            batch_delay: Duration::from_secs(1),
            concurrency: 1,
            malformed: MalformedPolicy::Skip,
            user_agent: USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            link_keyword: "proxy".to_string(),
            vote_row_selector: "tr.vote-result".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ScraperError> {
        if self.sleep_min > self.sleep_max {
            return Err(ScraperError::Config(format!(
                "sleep_min ({:?}) is greater than sleep_max ({:?})",
                self.sleep_min, self.sleep_max
            )));
        }
        if self.batch_size == 0 {
            return Err(ScraperError::Config("batch_size must be positive".into()));
        }
        if self.concurrency == 0 {
            return Err(ScraperError::Config("concurrency must be positive".into()));
        }
        if self.link_keyword.is_empty() {
            return Err(ScraperError::Config("link_keyword must not be empty".into()));
        }
        reqwest::Url::parse(&self.archive_url)
            .map_err(|e| ScraperError::Config(format!("archive_url: {}", e)))?;
        reqwest::Url::parse(&self.search_url)
            .map_err(|e| ScraperError::Config(format!("search_url: {}", e)))?;
        Ok(())
    }

    /// Archive index of one company. Always ends with a slash so relative
    /// document links resolve below it.
    pub fn company_index_url(&self, cik: &str) -> String {
        let base = self.archive_url.trim_end_matches('/');
        format!("{}/{}/", base, cik.trim())
    }
}
