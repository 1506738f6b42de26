//! Resolved settings for a load run.
//!
//! Values arrive from three places, highest precedence first: command line
//! (with environment fallback, handled by clap), an optional TOML config
//! file, and the built-in defaults. Each source is a [`PartialSettings`];
//! they are layered with [`PartialSettings::or`] and turned into validated
//! [`Settings`] by [`PartialSettings::resolve`].
//!
//! ```toml
//! # ~/.config/pg-loadgen/config.toml
//! queries = "select 1; select pg_sleep(0.01)"
//! conn_count = 20
//! query_count = 10
//! host = "db.internal"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use crate::error::{LoadError, LoadResult};
use crate::reporter::ReportFormat;

pub const DEFAULT_QUERIES: &str = "select 1;";
pub const DEFAULT_CONN_COUNT: usize = 10;
pub const DEFAULT_QUERY_COUNT: usize = 5;
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const APPLICATION_NAME: &str = "loadGenerator";
pub const FALLBACK_USER: &str = "postgres";

/// The queries workers pick from. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySet {
    queries: Vec<String>,
}

impl QuerySet {
    /// Parse a semicolon-separated list.
    ///
    /// Pieces are trimmed and empty pieces dropped, so a trailing `;` does
    /// not produce an empty query.
    ///
    /// # Example
    ///
    /// ```
    /// use pg_loadgen::config::QuerySet;
    ///
    /// let set = QuerySet::parse("select 1; select 2;").unwrap();
    /// assert_eq!(set.len(), 2);
    /// ```
    pub fn parse(raw: &str) -> LoadResult<Self> {
        Self::new(raw.split(';').map(str::trim).map(str::to_string))
    }

    pub fn new<I, S>(queries: I) -> LoadResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queries: Vec<String> = queries
            .into_iter()
            .map(Into::into)
            .filter(|q| !q.trim().is_empty())
            .collect();
        if queries.is_empty() {
            return Err(LoadError::config("query list contains no queries"));
        }
        Ok(Self { queries })
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(String::as_str)
    }

    /// Pick a query uniformly at random.
    pub fn pick(&self) -> &str {
        self.pick_with(&mut rand::rng())
    }

    /// Pick a query uniformly at random using `rng`.
    pub fn pick_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.queries[rng.random_range(0..self.queries.len())]
    }
}

/// Fully resolved, validated settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub queries: QuerySet,
    /// Pool size.
    pub conn_count: usize,
    /// Number of workers.
    pub query_count: usize,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    pub interval: Duration,
    pub format: ReportFormat,
}

impl Settings {
    /// Connection URL shared by every pool slot.
    pub fn database_url(&self) -> String {
        format!(
            "postgresql://{}@{}:{}/{}?application_name={}",
            self.user, self.host, self.port, self.database, APPLICATION_NAME
        )
    }
}

/// One layer of settings. Missing fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialSettings {
    pub queries: Option<String>,
    pub conn_count: Option<usize>,
    pub query_count: Option<usize>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub database: Option<String>,
    pub interval_secs: Option<u64>,
    pub format: Option<ReportFormat>,
}

impl PartialSettings {
    pub fn from_toml(text: &str) -> LoadResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a config file.
    pub fn load(path: &Path) -> LoadResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Read the config file at `explicit`, or the default location if it
    /// exists. An explicit path that cannot be read is an error; a missing
    /// default file is not.
    pub fn discover(explicit: Option<&Path>) -> LoadResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Fill every missing field from `fallback`.
    pub fn or(self, fallback: Self) -> Self {
        Self {
            queries: self.queries.or(fallback.queries),
            conn_count: self.conn_count.or(fallback.conn_count),
            query_count: self.query_count.or(fallback.query_count),
            host: self.host.or(fallback.host),
            port: self.port.or(fallback.port),
            user: self.user.or(fallback.user),
            database: self.database.or(fallback.database),
            interval_secs: self.interval_secs.or(fallback.interval_secs),
            format: self.format.or(fallback.format),
        }
    }

    /// Apply defaults and validate.
    pub fn resolve(self) -> LoadResult<Settings> {
        let queries = QuerySet::parse(self.queries.as_deref().unwrap_or(DEFAULT_QUERIES))?;

        let conn_count = self.conn_count.unwrap_or(DEFAULT_CONN_COUNT);
        if conn_count == 0 {
            return Err(LoadError::config("connection count must be at least 1"));
        }
        let query_count = self.query_count.unwrap_or(DEFAULT_QUERY_COUNT);
        if query_count == 0 {
            return Err(LoadError::config("query count must be at least 1"));
        }
        if query_count > conn_count {
            warn!(
                query_count,
                conn_count, "more workers than connections, checkout will spin"
            );
        }

        let interval_secs = self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(LoadError::config("report interval must be at least 1 second"));
        }

        let user = self.user.unwrap_or_else(current_user);
        let database = self.database.unwrap_or_else(|| user.clone());

        Ok(Settings {
            queries,
            conn_count,
            query_count,
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            user,
            database,
            interval: Duration::from_secs(interval_secs),
            format: self.format.unwrap_or_default(),
        })
    }
}

/// `<config dir>/pg-loadgen/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pg-loadgen").join("config.toml"))
}

/// Name of the OS user running the process, [`FALLBACK_USER`] if unknown.
pub fn current_user() -> String {
    match os_user(std::env::var("USER").ok(), std::env::var("USERNAME").ok()) {
        Some(name) => name,
        None => {
            warn!(
                fallback = FALLBACK_USER,
                "could not determine the current user (USER/USERNAME unset), pass --user or PGUSER"
            );
            FALLBACK_USER.to_string()
        }
    }
}

/// First non-blank of the Unix and Windows user variables.
fn os_user(user: Option<String>, username: Option<String>) -> Option<String> {
    user.into_iter()
        .chain(username)
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn explicit_user() -> PartialSettings {
        PartialSettings {
            user: Some("alice".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_set_drops_empty_pieces() {
        let set = QuerySet::parse("select 1;").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["select 1"]);

        let set = QuerySet::parse(" select 1 ;; select 2 ; ").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["select 1", "select 2"]);
    }

    #[test]
    fn test_query_set_must_not_be_empty() {
        assert!(matches!(QuerySet::parse(""), Err(LoadError::Config(_))));
        assert!(matches!(QuerySet::parse(" ; ;"), Err(LoadError::Config(_))));
    }

    #[test]
    fn test_pick_single_query() {
        let set = QuerySet::parse("select 42").unwrap();
        for _ in 0..10 {
            assert_eq!(set.pick(), "select 42");
        }
    }

    #[test]
    fn test_pick_is_close_to_uniform() {
        const DRAWS: usize = 20_000;
        let set = QuerySet::parse("select 1; select 2; select 3; select 4").unwrap();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        let mut counts = vec![0usize; set.len()];
        for _ in 0..DRAWS {
            let query = set.pick_with(&mut rng);
            let index = set.iter().position(|q| q == query).unwrap();
            counts[index] += 1;
        }

        let expected = DRAWS as f64 / set.len() as f64;
        let chi_squared: f64 = counts
            .iter()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                diff * diff / expected
            })
            .sum();
        // 3 degrees of freedom, p = 0.001
        assert!(chi_squared < 16.27, "chi² = {chi_squared}, counts = {counts:?}");
    }

    #[test]
    fn test_defaults() {
        let settings = explicit_user().resolve().unwrap();
        assert_eq!(settings.queries, QuerySet::parse("select 1").unwrap());
        assert_eq!(settings.conn_count, 10);
        assert_eq!(settings.query_count, 5);
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 5432);
        assert_eq!(settings.database, "alice");
        assert_eq!(settings.interval, Duration::from_secs(10));
        assert_eq!(settings.format, ReportFormat::Text);
    }

    #[test]
    fn test_database_url() {
        let settings = PartialSettings {
            host: Some("db.example".into()),
            port: Some(6543),
            database: Some("bench".into()),
            ..explicit_user()
        }
        .resolve()
        .unwrap();

        assert_eq!(
            settings.database_url(),
            "postgresql://alice@db.example:6543/bench?application_name=loadGenerator"
        );
    }

    #[test]
    fn test_rejects_zero_counts() {
        let zero_conns = PartialSettings {
            conn_count: Some(0),
            ..explicit_user()
        };
        assert!(matches!(zero_conns.resolve(), Err(LoadError::Config(_))));

        let zero_workers = PartialSettings {
            query_count: Some(0),
            ..explicit_user()
        };
        assert!(matches!(zero_workers.resolve(), Err(LoadError::Config(_))));

        let zero_interval = PartialSettings {
            interval_secs: Some(0),
            ..explicit_user()
        };
        assert!(matches!(zero_interval.resolve(), Err(LoadError::Config(_))));
    }

    #[test]
    fn test_more_workers_than_connections_is_allowed() {
        let settings = PartialSettings {
            conn_count: Some(2),
            query_count: Some(8),
            ..explicit_user()
        }
        .resolve()
        .unwrap();
        assert_eq!(settings.query_count, 8);
    }

    #[test]
    fn test_layering_prefers_first() {
        let cli = PartialSettings {
            conn_count: Some(3),
            ..Default::default()
        };
        let file = PartialSettings::from_toml(
            r#"
            conn_count = 20
            host = "from-file"
            format = "json"
            "#,
        )
        .unwrap();

        let merged = cli.or(file);
        assert_eq!(merged.conn_count, Some(3));
        assert_eq!(merged.host.as_deref(), Some("from-file"));
        assert_eq!(merged.format, Some(ReportFormat::Json));
    }

    #[test]
    fn test_config_file_rejects_unknown_keys() {
        let result = PartialSettings::from_toml("connections = 4");
        assert!(matches!(result, Err(LoadError::Toml(_))));
    }

    #[test]
    fn test_os_user_lookup_order() {
        assert_eq!(
            os_user(Some("alice".into()), Some("ALICE".into())),
            Some("alice".to_string())
        );
        assert_eq!(
            os_user(Some("  ".into()), Some("bob".into())),
            Some("bob".to_string())
        );
        assert_eq!(os_user(None, Some("carol".into())), Some("carol".to_string()));
        assert_eq!(os_user(Some(String::new()), None), None);
        assert_eq!(os_user(None, None), None);
    }

    #[test]
    fn test_explicit_missing_config_file_is_an_error() {
        let result = PartialSettings::discover(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }
}
