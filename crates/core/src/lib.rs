pub mod domain;
pub mod ingest;
pub mod refresh;
pub mod storage;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;
    use std::time::Duration;

    const DEFAULT_DATA_FILE: &str = "data.json";
    const DEFAULT_FRED_BASE_URL: &str = "https://api.stlouisfed.org";
    const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub data_file: PathBuf,
        pub fred_api_key: Option<String>,
        pub fred_base_url: String,
        pub yahoo_base_url: String,
        pub fetch_timeout: Option<Duration>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Builds settings from an arbitrary variable source; blank values count as unset.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

            let fetch_timeout = match var("FETCH_TIMEOUT_SECS") {
                Some(raw) => Some(Duration::from_secs(
                    raw.trim().parse::<u64>().with_context(|| {
                        format!("FETCH_TIMEOUT_SECS must be an integer (got {raw})")
                    })?,
                )),
                None => None,
            };

            Ok(Self {
                data_file: var("MACRO_PULSE_DATA_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE)),
                fred_api_key: var("FRED_API_KEY"),
                fred_base_url: var("FRED_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_FRED_BASE_URL.to_string()),
                yahoo_base_url: var("YAHOO_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_YAHOO_BASE_URL.to_string()),
                fetch_timeout,
                sentry_dsn: var("SENTRY_DSN"),
            })
        }
    }

}
