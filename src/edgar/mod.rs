mod data;
mod extract;

pub use data::{ensure_dir, filings_path, load_filings, save_filings, save_votes, votes_path};
pub use extract::{FilingIndex, ProxyLinks, VoteTable};

use crate::fetch::FetchTarget;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Stands in for a summary the index entry does not carry.
pub const MISSING_SUMMARY: &str = "N/A";

/// One row of the company filing index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRecord {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub filing_date: String,
}

/// Vote label to vote value, in table row order. A repeated label keeps its
/// first position and its last value.
pub type VoteResults = IndexMap<String, String>;

/// Proxy document URL to the vote results found there, in discovery order.
pub type ProxyVotes = IndexMap<String, VoteResults>;

/// One page of the company browse endpoint, as an Atom feed.
pub fn filing_index_target(
    search_url: &str,
    cik: &str,
    filing_type: &str,
    start: u32,
    count: u32,
) -> FetchTarget {
    FetchTarget::new(search_url)
        .param("action", "getcompany")
        .param("CIK", cik)
        .param("type", filing_type)
        .param("start", start)
        .param("count", count)
        .param("output", "atom")
}
