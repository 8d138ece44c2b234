//! Per-run artifact directory naming.
//!
//! Every artifact of one run is stored under a single directory name. The name
//! carries a random id drawn from the thread-local CSPRNG so concurrent jobs
//! fanning out from the same workflow never collide.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;

/// URL-safe alphabet used for random ids (64 symbols)
pub const ID_ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Default (and minimum) random id length
pub const DEFAULT_ID_LEN: usize = 10;

/// Fallback slug when the job name slugifies to nothing
const FALLBACK_JOB_SLUG: &str = "run";

/// How the run directory name is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirNameStrategy {
    /// `20240305140709UTC-V1StGXR8_Z`
    #[default]
    Timestamp,
    /// `e2e-tests/2024-03-05/V1StGXR8_Z`
    JobScoped,
}

impl FromStr for DirNameStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "timestamp" | "time" => Ok(Self::Timestamp),
            "job" | "job-scoped" => Ok(Self::JobScoped),
            other => Err(format!("unknown directory strategy '{other}' (expected 'timestamp' or 'job')")),
        }
    }
}

impl fmt::Display for DirNameStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp => f.write_str("timestamp"),
            Self::JobScoped => f.write_str("job"),
        }
    }
}

/// Produces directory names for one configuration
#[derive(Debug, Clone)]
pub struct DirNamer {
    strategy: DirNameStrategy,
    job_name: Option<String>,
    id_len: usize,
}

impl DirNamer {
    pub fn new(strategy: DirNameStrategy) -> Self {
        Self {
            strategy,
            job_name: None,
            id_len: DEFAULT_ID_LEN,
        }
    }

    /// Job name used by [`DirNameStrategy::JobScoped`]
    pub fn job_name(mut self, name: Option<impl Into<String>>) -> Self {
        self.job_name = name.map(Into::into);
        self
    }

    /// Random id length; values below [`DEFAULT_ID_LEN`] are raised to it
    pub fn id_len(mut self, len: usize) -> Self {
        self.id_len = len.max(DEFAULT_ID_LEN);
        self
    }

    /// Generate a name for the current time
    pub fn generate(&self) -> String {
        self.generate_at(Utc::now())
    }

    /// Generate a name for a given instant
    pub fn generate_at(&self, now: DateTime<Utc>) -> String {
        let id = random_id(self.id_len);
        match self.strategy {
            DirNameStrategy::Timestamp => {
                format!("{}UTC-{}", now.format("%Y%m%d%H%M%S"), id)
            }
            DirNameStrategy::JobScoped => {
                let slug = self
                    .job_name
                    .as_deref()
                    .map(slugify)
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| FALLBACK_JOB_SLUG.to_string());
                format!("{}/{}/{}", slug, now.format("%Y-%m-%d"), id)
            }
        }
    }
}

/// Random id of `len` symbols from [`ID_ALPHABET`]
pub fn random_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Lower-case, hyphen-separated form of `input`.
///
/// Whitespace runs become a single hyphen, characters other than word
/// characters and hyphens are dropped, repeated hyphens collapse and
/// leading/trailing hyphens are trimmed.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in input.trim().chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        } else if c.is_alphanumeric() || c == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Build & Test!! "), "build-test");
        assert_eq!(slugify("E2E Tests"), "e2e-tests");
        assert_eq!(slugify("--a -- b--"), "a-b");
        assert_eq!(slugify("snake_case job"), "snake_case-job");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_random_id_alphabet_and_length() {
        let id = random_id(DEFAULT_ID_LEN);
        assert_eq!(id.len(), DEFAULT_ID_LEN);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_timestamp_strategy_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let name = DirNamer::new(DirNameStrategy::Timestamp).generate_at(now);

        let (stamp, id) = name.split_once('-').unwrap();
        assert_eq!(stamp, "20240305140709UTC");
        assert_eq!(id.len(), DEFAULT_ID_LEN);
    }

    #[test]
    fn test_job_scoped_strategy_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let name = DirNamer::new(DirNameStrategy::JobScoped)
            .job_name(Some("Cypress E2E (chrome)"))
            .generate_at(now);

        let parts: Vec<&str> = name.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "cypress-e2e-chrome");
        assert_eq!(parts[1], "2024-03-05");
        assert_eq!(parts[2].len(), DEFAULT_ID_LEN);
    }

    #[test]
    fn test_job_scoped_without_job_uses_fallback() {
        let name = DirNamer::new(DirNameStrategy::JobScoped)
            .job_name(None::<String>)
            .generate();
        assert!(name.starts_with("run/"));
    }

    #[test]
    fn test_id_len_has_floor() {
        let name = DirNamer::new(DirNameStrategy::Timestamp).id_len(4).generate();
        let (_, id) = name.split_once("UTC-").unwrap();
        assert!(id.len() >= DEFAULT_ID_LEN);
    }

    #[test]
    fn test_ten_thousand_names_are_distinct() {
        let namer = DirNamer::new(DirNameStrategy::Timestamp);
        let now = Utc::now();
        let names: HashSet<String> = (0..10_000).map(|_| namer.generate_at(now)).collect();
        assert_eq!(names.len(), 10_000);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("timestamp".parse::<DirNameStrategy>(), Ok(DirNameStrategy::Timestamp));
        assert_eq!("Job".parse::<DirNameStrategy>(), Ok(DirNameStrategy::JobScoped));
        assert!("weekly".parse::<DirNameStrategy>().is_err());
    }
}
