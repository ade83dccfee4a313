//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where batches are scraped from
    #[serde(default)]
    pub source: SourceConfig,

    /// On-disk layout of ledger, corpus and working artifacts
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP client and request pacing
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry/backoff for transient fetch failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Log verbosity
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Daily trigger time for the scheduler binary
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if url::Url::parse(&self.source.search_url).is_err() {
            return Err(AppError::validation(format!(
                "source.search_url is not a valid URL: {}",
                self.source.search_url
            )));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(AppError::validation(
                "retry.max_delay_ms must be >= retry.base_delay_ms",
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(AppError::validation("retry.jitter must be within 0.0..=1.0"));
        }
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(AppError::validation("schedule time is out of range"));
        }
        for (name, value) in [
            ("storage.ledger_file", &self.storage.ledger_file),
            ("storage.corpus_file", &self.storage.corpus_file),
            ("storage.scrape_file", &self.storage.scrape_file),
            ("storage.stats_file", &self.storage.stats_file),
            ("storage.text_dir", &self.storage.text_dir),
            ("storage.pdf_dir", &self.storage.pdf_dir),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{name} is empty")));
            }
        }
        if self.storage.corpus_path().parent() == Some(self.storage.text_path().as_path()) {
            return Err(AppError::validation(
                "storage.corpus_file must not live inside storage.text_dir",
            ));
        }
        Ok(())
    }
}

/// Search listing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// arXiv search results URL, newest announcements first
    #[serde(default = "defaults::search_url")]
    pub search_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            search_url: defaults::search_url(),
        }
    }
}

/// Storage layout. Relative names are resolved against `root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Working directory holding everything below
    #[serde(default = "defaults::root")]
    pub root: PathBuf,

    /// Persistent ledger of every ingested paper
    #[serde(default = "defaults::ledger_file")]
    pub ledger_file: String,

    /// Audit copy of the latest scrape (never read back)
    #[serde(default = "defaults::scrape_file")]
    pub scrape_file: String,

    /// Per-item extracted text files
    #[serde(default = "defaults::text_dir")]
    pub text_dir: String,

    /// Raw documents, only written when `keep_pdfs` is set
    #[serde(default = "defaults::pdf_dir")]
    pub pdf_dir: String,

    /// Merged output text
    #[serde(default = "defaults::corpus_file")]
    pub corpus_file: String,

    /// Summary of the latest run
    #[serde(default = "defaults::stats_file")]
    pub stats_file: String,

    /// Keep per-item text files after they are merged
    #[serde(default)]
    pub keep_text_files: bool,

    /// Keep downloaded documents on disk
    #[serde(default)]
    pub keep_pdfs: bool,
}

impl StorageConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(&self.ledger_file)
    }

    pub fn scrape_path(&self) -> PathBuf {
        self.root.join(&self.scrape_file)
    }

    pub fn text_path(&self) -> PathBuf {
        self.root.join(&self.text_dir)
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.root.join(&self.pdf_dir)
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.root.join(&self.corpus_file)
    }

    pub fn stats_path(&self) -> PathBuf {
        self.root.join(&self.stats_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: defaults::root(),
            ledger_file: defaults::ledger_file(),
            scrape_file: defaults::scrape_file(),
            text_dir: defaults::text_dir(),
            pdf_dir: defaults::pdf_dir(),
            corpus_file: defaults::corpus_file(),
            stats_file: defaults::stats_file(),
            keep_text_files: false,
            keep_pdfs: false,
        }
    }
}

/// HTTP client and request pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-attempt request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Minimum delay between consecutive requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Bounded retry settings for transient fetch failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per document, including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds, doubled per attempt
    #[serde(default = "defaults::base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay in milliseconds
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,

    /// Fraction (0.0..=1.0) of each delay that may be randomly shaved off
    #[serde(default = "defaults::jitter")]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay(),
            max_delay_ms: defaults::max_delay(),
            jitter: defaults::jitter(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Local wall-clock time of the daily run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "defaults::schedule_hour")]
    pub hour: u32,

    #[serde(default)]
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: defaults::schedule_hour(),
            minute: 0,
        }
    }
}

impl ScheduleConfig {
    /// First scheduled time strictly after `now`, in `now`'s time zone.
    ///
    /// A wall-clock time skipped by a DST jump moves to the next day.
    pub fn next_run_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0)?;
        let tz = now.timezone();
        let mut date = now.date_naive();
        for _ in 0..3 {
            if let Some(candidate) = tz.from_local_datetime(&date.and_time(time)).earliest() {
                if candidate > *now {
                    return Some(candidate);
                }
            }
            date = date.succ_opt()?;
        }
        None
    }
}

mod defaults {
    use std::path::PathBuf;

    // Source defaults
    pub fn search_url() -> String {
        "https://arxiv.org/search/?query=cs.ai&searchtype=all&abstracts=show&order=-announced_date_first&size=50".into()
    }

    // Storage defaults
    pub fn root() -> PathBuf {
        PathBuf::from("paper")
    }
    pub fn ledger_file() -> String {
        "base.json".into()
    }
    pub fn scrape_file() -> String {
        "arxiv_search_result.json".into()
    }
    pub fn text_dir() -> String {
        "txt".into()
    }
    pub fn pdf_dir() -> String {
        "pdf".into()
    }
    pub fn corpus_file() -> String {
        "all.txt".into()
    }
    pub fn stats_file() -> String {
        "stats.json".into()
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; harvester/0.1)".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn request_delay() -> u64 {
        667
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        5
    }
    pub fn base_delay() -> u64 {
        500
    }
    pub fn max_delay() -> u64 {
        8_000
    }
    pub fn jitter() -> f64 {
        0.2
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn schedule_hour() -> u32 {
        7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn next_run_is_later_today_or_tomorrow() {
        use chrono::Utc;

        let schedule = ScheduleConfig::default();
        let before = Utc.with_ymd_and_hms(2026, 3, 10, 6, 30, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 3, 10, 7, 0, 0).unwrap();

        assert_eq!(
            schedule.next_run_after(&before),
            Some(Utc.with_ymd_and_hms(2026, 3, 10, 7, 0, 0).unwrap())
        );
        assert_eq!(
            schedule.next_run_after(&after),
            Some(Utc.with_ymd_and_hms(2026, 3, 11, 7, 0, 0).unwrap())
        );
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_corpus_inside_text_dir() {
        let mut config = Config::default();
        config.storage.corpus_file = "txt/all.txt".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            root = "/tmp/papers"

            [retry]
            max_attempts = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.root, PathBuf::from("/tmp/papers"));
        assert_eq!(config.storage.ledger_file, "base.json");
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.http.timeout_secs, 20);
        assert_eq!(
            config.storage.ledger_path(),
            PathBuf::from("/tmp/papers/base.json")
        );
    }
}
