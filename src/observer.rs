use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{error, info, warn};

/// Progress of a run, reported by the fetcher and the scraper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Retrying {
        url: String,
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    Exhausted {
        url: String,
        retries: u32,
    },
    MalformedEntry {
        url: String,
        reason: String,
    },
    PageFetched {
        url: String,
        start: u32,
        records: usize,
    },
    IndexExhausted {
        url: String,
        start: u32,
    },
    Scraped {
        url: String,
        results: usize,
    },
    NoData {
        url: String,
    },
    NothingFound {
        identifier: String,
    },
    Saved {
        path: PathBuf,
        records: usize,
    },
}

pub trait Observer {
    fn notify(&self, event: Event);
}

impl<O: Observer + ?Sized> Observer for Arc<O> {
    fn notify(&self, event: Event) {
        (**self).notify(event)
    }
}

/// Writes every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn notify(&self, event: Event) {
        match event {
            Event::Retrying {
                url,
                attempt,
                delay,
                reason,
            } => warn!(
                "Request to {} failed, retry {} in {:.2}s. Error: {}",
                url,
                attempt,
                delay.as_secs_f64(),
                reason
            ),
            Event::Exhausted { url, retries } => {
                error!("Failed to fetch {} after {} retries.", url, retries)
            }
            Event::MalformedEntry { url, reason } => {
                warn!("Skipping malformed entry from {}: {}", url, reason)
            }
            Event::PageFetched {
                url,
                start,
                records,
            } => info!("[start={}] {} filings from {}", start, records, url),
            Event::IndexExhausted { url, start } => {
                info!("[start={}] Index {} has no more entries", start, url)
            }
            Event::Scraped { url, results } => {
                info!("Scraped {} vote results from {}", results, url)
            }
            Event::NoData { url } => warn!("No data found at {}", url),
            Event::NothingFound { identifier } => {
                info!("No data found for CIK {}, nothing saved.", identifier)
            }
            Event::Saved { path, records } => {
                info!("{} records saved to {}", records, path.display())
            }
        }
    }
}

/// Keeps events in memory, in the order they were reported.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl Observer for Recorder {
    fn notify(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
