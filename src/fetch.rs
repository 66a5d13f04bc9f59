use crate::{
    observer::{Event, Observer},
    ExtractError, ScraperError, TransportError,
};
use rand::Rng;
use scraper::Html;
use std::{sync::Arc, time::Duration};
use tracing::debug;

/// One GET request: URL plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl FetchTarget {
    pub fn new<S: Into<String>>(url: S) -> Self {
        FetchTarget {
            url: url.into(),
            query: vec![],
        }
    }

    pub fn param<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

#[async_trait::async_trait]
pub trait Transport {
    /// Body of a successful (2xx) response.
    async fn get(&self, target: &FetchTarget) -> Result<String, TransportError>;
}

#[async_trait::async_trait]
impl<T: Transport + Send + Sync + ?Sized> Transport for Arc<T> {
    async fn get(&self, target: &FetchTarget) -> Result<String, TransportError> {
        (**self).get(target).await
    }
}

/// `reqwest` client shared by every request of a run.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ScraperError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(HttpTransport { client })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get(&self, target: &FetchTarget) -> Result<String, TransportError> {
        debug!("Visit {} {:?}", target.url, target.query);
        let response = self
            .client
            .get(&target.url)
            .query(&target.query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// Uniform random delay, both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    min: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Result<Self, ScraperError> {
        if min > max {
            return Err(ScraperError::Config(format!(
                "backoff lower bound {:?} exceeds upper bound {:?}",
                min, max
            )));
        }
        Ok(Backoff { min, max })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        rng.gen_range(self.min..=self.max)
    }

    pub fn next_delay(&self) -> Duration {
        self.sample(&mut rand::thread_rng())
    }
}

#[derive(Debug, thiserror::Error)]
enum Failure {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

pub struct Fetcher<T> {
    transport: T,
    max_retries: u32,
    backoff: Backoff,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, max_retries: u32, backoff: Backoff) -> Self {
        Fetcher {
            transport,
            max_retries,
            backoff,
        }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Fetches `target`, parses the body and runs `extract` on it.
    ///
    /// A transport error, a non-2xx status or an extraction error counts as
    /// a failed attempt. Failed attempts are retried while fewer than
    /// `max_retries` retries have been made, sleeping a random backoff delay
    /// before each one. Returns `None` once retries are exhausted.
    pub async fn fetch<O, F, R>(
        &self,
        target: &FetchTarget,
        observer: &O,
        extract: F,
    ) -> Option<R>
    where
        O: Observer + ?Sized,
        F: Fn(&Html) -> Result<R, ExtractError>,
    {
        let mut retries = 0;
        loop {
            let failure = match self.transport.get(target).await {
                Ok(body) => match parse_and_extract(&body, &extract) {
                    Ok(value) => return Some(value),
                    Err(e) => Failure::from(e),
                },
                Err(e) => Failure::from(e),
            };

            if retries >= self.max_retries {
                observer.notify(Event::Exhausted {
                    url: target.url.clone(),
                    retries,
                });
                return None;
            }

            let delay = self.backoff.next_delay();
            retries += 1;
            observer.notify(Event::Retrying {
                url: target.url.clone(),
                attempt: retries,
                delay,
                reason: failure.to_string(),
            });
            tokio::time::sleep(delay).await;
        }
    }
}

fn parse_and_extract<F, R>(body: &str, extract: &F) -> Result<R, ExtractError>
where
    F: Fn(&Html) -> Result<R, ExtractError>,
{
    let doc = Html::parse_document(body);
    extract(&doc)
}
