use clap::{Args, Parser, Subcommand};
use edgar_scraper::{random_user_agent, Config, LogTimer, MalformedPolicy, Scraper};
use std::{
    fs::OpenOptions,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
#[command(version, about = "Download company filings and proxy vote results from SEC EDGAR")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: Options,

    /// Append-only log file
    #[arg(long, global = true, env = "EDGAR_LOG_FILE", default_value = "sec_scraper.log")]
    log_file: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Save the filing index of a company as CSV
    Filings {
        /// Company CIK, prompted for when missing
        #[arg(long)]
        cik: Option<String>,

        /// Filing type such as 10-K or 10-Q, prompted for when missing
        #[arg(long = "type")]
        filing_type: Option<String>,
    },
    /// Save proxy vote results of one or more companies as JSON
    Votes {
        /// Company CIKs, one is prompted for when none is given
        ciks: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct Options {
    #[arg(long, global = true, env = "EDGAR_ARCHIVE_URL", default_value = edgar_scraper::config::ARCHIVE_URL)]
    archive_url: String,

    #[arg(long, global = true, env = "EDGAR_SEARCH_URL", default_value = edgar_scraper::config::SEARCH_URL)]
    search_url: String,

    /// Directory of the proxy vote JSON files
    #[arg(long, global = true, env = "EDGAR_OUTPUT_DIR", default_value = edgar_scraper::config::OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Directory of the filing index CSV files
    #[arg(long, global = true, env = "EDGAR_CSV_DIR", default_value = edgar_scraper::config::CSV_DIR)]
    csv_dir: PathBuf,

    #[arg(long, global = true, env = "EDGAR_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Lower bound of the random delay between requests, in seconds
    #[arg(long, global = true, env = "EDGAR_SLEEP_MIN", default_value_t = 1.0)]
    sleep_min: f64,

    /// Upper bound of the random delay between requests, in seconds
    #[arg(long, global = true, env = "EDGAR_SLEEP_MAX", default_value_t = 5.0)]
    sleep_max: f64,

    /// Filings requested per index page
    #[arg(long, global = true, env = "EDGAR_BATCH_SIZE", default_value_t = 40)]
    batch_size: u32,

    /// Upper bound of filings requested from the index
    #[arg(long, global = true, env = "EDGAR_MAX_RECORDS", default_value_t = 100)]
    max_records: u32,

    /// Delay between index pages, in seconds
    #[arg(long, global = true, env = "EDGAR_BATCH_DELAY", default_value_t = 1.0)]
    batch_delay: f64,

    /// Proxy documents fetched at the same time
    #[arg(long, global = true, env = "EDGAR_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    #[arg(long, global = true, value_enum, default_value_t = MalformedPolicy::Skip)]
    malformed: MalformedPolicy,

    /// Defaults to a random desktop browser
    #[arg(long, global = true, env = "EDGAR_USER_AGENT")]
    user_agent: Option<String>,

    /// Request timeout, in seconds
    #[arg(long, global = true, env = "EDGAR_TIMEOUT", default_value_t = 30.0)]
    timeout: f64,
}

impl Options {
    fn into_config(self) -> Result<Config, Box<dyn std::error::Error>> {
        Ok(Config {
            archive_url: self.archive_url,
            search_url: self.search_url,
            output_dir: self.output_dir,
            csv_dir: self.csv_dir,
            max_retries: self.max_retries,
            sleep_min: seconds(self.sleep_min)?,
            sleep_max: seconds(self.sleep_max)?,
            batch_size: self.batch_size,
            max_records: self.max_records,
            batch_delay: seconds(self.batch_delay)?,
            concurrency: self.concurrency,
            malformed: self.malformed,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| random_user_agent().to_string()),
            timeout: seconds(self.timeout)?,
            ..Config::default()
        })
    }
}

fn seconds(secs: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    Ok(Duration::try_from_secs_f64(secs)?)
}

fn prompt(question: &str) -> io::Result<String> {
    print!("{} ", question);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn init_tracing(log_file: &Path) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_timer(LogTimer),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn report(saved: Option<PathBuf>, what: &str) {
    match saved {
        Some(path) => println!("Data saved to {}", path.display()),
        None => println!("No {} found.", what),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_file)?;

    let scraper = Scraper::from_config(cli.options.into_config()?)?;

    match cli.command {
        Command::Filings { cik, filing_type } => {
            let cik = match cik {
                Some(cik) => cik,
                None => prompt("Enter CIK of the company:")?,
            };
            let filing_type = match filing_type {
                Some(filing_type) => filing_type,
                None => prompt("Enter the filing type (e.g., 10-K, 10-Q):")?,
            };
            report(scraper.run_filings(&cik, &filing_type).await?, "filings");
        }
        Command::Votes { mut ciks } => {
            if ciks.is_empty() {
                ciks.push(prompt("Enter CIK of the company:")?);
            }
            for cik in &ciks {
                report(scraper.run_votes(cik).await?, "proxy vote data");
            }
        }
    }

    println!("Scraping complete. Check the log for details.");
    Ok(())
}
