use super::{FilingRecord, ProxyVotes};
use crate::ScraperError;
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Creates `dir` and its parents. Succeeds when it already exists.
pub fn ensure_dir(dir: &Path) -> Result<(), ScraperError> {
    fs::create_dir_all(dir)?;
    Ok(())
}

pub fn filings_path(dir: &Path, cik: &str, filing_type: &str) -> PathBuf {
    let filing_type = filing_type.trim().replace(['/', '\\'], "-");
    dir.join(format!("{}_{}.csv", cik.trim(), filing_type))
}

pub fn votes_path(dir: &Path, cik: &str) -> PathBuf {
    dir.join(format!("{}_proxy_votes.json", cik.trim()))
}

pub fn save_filings(
    dir: &Path,
    cik: &str,
    filing_type: &str,
    records: &[FilingRecord],
) -> Result<PathBuf, ScraperError> {
    ensure_dir(dir)?;
    let path = filings_path(dir, cik, filing_type);

    let mut writer = csv::Writer::from_path(&path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(path)
}

pub fn load_filings(path: &Path) -> Result<Vec<FilingRecord>, ScraperError> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader.deserialize().collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

pub fn save_votes(dir: &Path, cik: &str, votes: &ProxyVotes) -> Result<PathBuf, ScraperError> {
    ensure_dir(dir)?;
    let path = votes_path(dir, cik);

    let mut writer = BufWriter::new(File::create(&path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    votes.serialize(&mut ser)?;
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::{VoteResults, MISSING_SUMMARY};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(n: u32, summary: &str) -> FilingRecord {
        FilingRecord {
            title: format!("10-K - Annual report {}", n),
            link: format!("https://www.sec.gov/Archives/edgar/data/1318605/{}-index.htm", n),
            summary: summary.to_string(),
            filing_date: format!("202{}-01-29T16:30:55-05:00", n),
        }
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("out").join("nested");

        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn output_file_names() {
        let dir = Path::new("sec_proxy_data");
        assert_eq!(
            filings_path(dir, "0001318605", "10-K"),
            dir.join("0001318605_10-K.csv")
        );
        assert_eq!(
            filings_path(dir, "0001318605", "S-1/A"),
            dir.join("0001318605_S-1-A.csv")
        );
        assert_eq!(
            votes_path(dir, "0001318605"),
            dir.join("0001318605_proxy_votes.json")
        );
    }

    #[test]
    fn filings_survive_csv_round_trip() {
        let tmp = TempDir::new().unwrap();
        let records = vec![
            record(1, "<b>Filed:</b> 2021-01-29, \"quoted\""),
            record(2, MISSING_SUMMARY),
        ];

        let path = save_filings(tmp.path(), "0001318605", "10-K", &records).unwrap();
        let csv = fs::read_to_string(&path).unwrap();
        assert!(csv.starts_with("title,link,summary,filing_date\n"));
        assert_eq!(csv.lines().count(), 3);

        assert_eq!(load_filings(&path).unwrap(), records);
    }

    #[test]
    fn votes_are_pretty_printed_with_four_spaces() {
        let tmp = TempDir::new().unwrap();
        let mut votes = ProxyVotes::new();
        votes.insert(
            "https://www.sec.gov/Archives/edgar/data/1318605/proxy.htm".to_string(),
            VoteResults::from_iter([("For".to_string(), "1000".to_string())]),
        );

        let path = save_votes(&tmp.path().join("votes"), "0001318605", &votes).unwrap();
        let json = fs::read_to_string(&path).unwrap();

        assert_eq!(
            json,
            "{\n    \"https://www.sec.gov/Archives/edgar/data/1318605/proxy.htm\": {\n        \"For\": \"1000\"\n    }\n}"
        );
        let parsed: ProxyVotes = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, votes);
    }

    #[test]
    fn votes_keep_discovery_and_row_order() {
        let tmp = TempDir::new().unwrap();
        let results = |rows: &[(&str, &str)]| -> VoteResults {
            rows.iter()
                .map(|(label, value)| (label.to_string(), value.to_string()))
                .collect()
        };
        let mut votes = ProxyVotes::new();
        votes.insert(
            "https://www.sec.gov/zeta_proxy.htm".to_string(),
            results(&[("For", "10"), ("Against", "2"), ("Abstain", "1")]),
        );
        votes.insert(
            "https://www.sec.gov/alpha_proxy.htm".to_string(),
            results(&[("Withhold", "4"), ("For", "9")]),
        );

        let path = save_votes(tmp.path(), "0001318605", &votes).unwrap();
        let json = fs::read_to_string(&path).unwrap();

        let pos = |needle: &str| json.find(needle).unwrap();
        assert!(pos("zeta_proxy") < pos("alpha_proxy"));
        assert!(pos("\"For\": \"10\"") < pos("\"Against\""));
        assert!(pos("\"Against\"") < pos("\"Abstain\""));
        assert!(pos("\"Withhold\"") < pos("\"For\": \"9\""));

        let parsed: ProxyVotes = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.keys().collect::<Vec<_>>(),
            votes.keys().collect::<Vec<_>>()
        );
    }
}
