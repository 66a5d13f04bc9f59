use crate::{
    edgar::{FilingRecord, VoteResults, MISSING_SUMMARY},
    utils::normalize_text,
    ExtractError, Extractor, ScraperError,
};
use itertools::Itertools;
use lazy_static::lazy_static;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

const E: &str = "Invalid selector";
lazy_static! {
    static ref ENTRY: Selector = Selector::parse("entry").expect(E);
    static ref TITLE: Selector = Selector::parse("title").expect(E);
    static ref LINK: Selector = Selector::parse("link").expect(E);
    static ref SUMMARY: Selector = Selector::parse("summary").expect(E);
    static ref UPDATED: Selector = Selector::parse("updated").expect(E);
    static ref A: Selector = Selector::parse("a[href]").expect(E);
    static ref TD: Selector = Selector::parse("td").expect(E);
    static ref VOTE_ROW: Selector = Selector::parse("tr.vote-result").expect(E);
}

fn text_of(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector)
        .next()
        .map(|found| normalize_text(&found.text().collect::<String>()))
}

/// Entries of the EDGAR company browse Atom feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilingIndex;

impl FilingIndex {
    fn entry(index: usize, entry: ElementRef<'_>) -> Result<FilingRecord, ExtractError> {
        let missing = |field| ExtractError::MissingField { index, field };

        let title = text_of(entry, &TITLE).ok_or_else(|| missing("title"))?;
        let link = entry
            .select(&LINK)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(|href| href.trim().to_string())
            .ok_or_else(|| missing("link"))?;
        let summary = text_of(entry, &SUMMARY).unwrap_or_else(|| MISSING_SUMMARY.to_string());
        let filing_date = text_of(entry, &UPDATED).ok_or_else(|| missing("updated"))?;

        Ok(FilingRecord {
            title,
            link,
            summary,
            filing_date,
        })
    }
}

impl Extractor for FilingIndex {
    type Output = Vec<Result<FilingRecord, ExtractError>>;

    fn extract(&self, doc: &Html) -> Self::Output {
        doc.select(&ENTRY)
            .enumerate()
            .map(|(index, entry)| Self::entry(index, entry))
            .collect()
    }
}

/// Links of a company archive index whose href mentions a keyword.
#[derive(Debug, Clone)]
pub struct ProxyLinks {
    base: Url,
    keyword: String,
}

impl ProxyLinks {
    pub fn new(base: &str, keyword: &str) -> Result<Self, ScraperError> {
        let base = Url::parse(base).map_err(|e| ScraperError::Config(format!("{}: {}", base, e)))?;
        Ok(ProxyLinks {
            base,
            keyword: keyword.to_lowercase(),
        })
    }
}

impl Extractor for ProxyLinks {
    type Output = Vec<String>;

    fn extract(&self, doc: &Html) -> Self::Output {
        doc.select(&A)
            .filter_map(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| href.to_lowercase().contains(&self.keyword))
            .filter_map(|href| match self.base.join(href) {
                Ok(url) => Some(String::from(url)),
                Err(e) => {
                    debug!("Skip unresolvable link {}: {}", href, e);
                    None
                }
            })
            .unique()
            .collect()
    }
}

/// Rows of a vote result table: first cell is the label, second the value.
#[derive(Debug, Clone)]
pub struct VoteTable {
    row: Selector,
}

impl VoteTable {
    pub fn new(row_selector: &str) -> Result<Self, ScraperError> {
        let row = Selector::parse(row_selector)
            .map_err(|_| ScraperError::Selector(row_selector.to_string()))?;
        Ok(VoteTable { row })
    }
}

impl Default for VoteTable {
    fn default() -> Self {
        VoteTable {
            row: VOTE_ROW.clone(),
        }
    }
}

impl Extractor for VoteTable {
    type Output = VoteResults;

    fn extract(&self, doc: &Html) -> Self::Output {
        let mut results = VoteResults::new();
        for row in doc.select(&self.row) {
            let mut cells = row
                .select(&TD)
                .map(|td| normalize_text(&td.text().collect::<String>()));
            match (cells.next(), cells.next()) {
                (Some(label), Some(value)) => {
                    results.insert(label, value);
                }
                _ => debug!("Skip vote row with less than two cells"),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn filing_entry_requires_link_href() {
        let doc = Html::parse_document(
            "<feed><entry><title>10-Q</title><link rel=\"alternate\" /><updated>2024</updated></entry></feed>",
        );
        assert_eq!(
            FilingIndex.extract(&doc),
            vec![Err(ExtractError::MissingField {
                index: 0,
                field: "link"
            })]
        );
    }

    #[test]
    fn filing_entry_requires_updated() {
        let doc = Html::parse_document(
            "<feed><entry><title>10-Q</title><link href=\"https://x/1\" /></entry></feed>",
        );
        assert_eq!(
            FilingIndex.extract(&doc),
            vec![Err(ExtractError::MissingField {
                index: 0,
                field: "updated"
            })]
        );
    }

    #[test]
    fn documents_without_matches_extract_to_empty() {
        let doc = Html::parse_document("<html><body><p>nothing here</p></body></html>");
        assert!(FilingIndex.extract(&doc).is_empty());
        assert!(VoteTable::default().extract(&doc).is_empty());
        let links = ProxyLinks::new("https://www.sec.gov/Archives/edgar/data/1/", "proxy").unwrap();
        assert!(links.extract(&doc).is_empty());
    }

    #[test]
    fn custom_vote_row_selector() {
        let table = VoteTable::new("tr.result").unwrap();
        let doc = Html::parse_document(
            "<table><tr class=\"result\"><td>For</td><td>7</td></tr><tr class=\"vote-result\"><td>Against</td><td>1</td></tr></table>",
        );
        let results = table.extract(&doc);
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("For").map(String::as_str), Some("7"));
    }

    #[test]
    fn invalid_vote_row_selector() {
        assert!(matches!(
            VoteTable::new("tr[["),
            Err(ScraperError::Selector(_))
        ));
    }
}
