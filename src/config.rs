use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::persistence::PersistenceResult;

/// Where a feed directory keeps its calendar files, and how strictly
/// diagnostics are judged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    pub calendar_file: String,
    pub calendar_dates_file: String,
    /// Treat warnings as fatal when deciding whether a feed passed.
    pub strict: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            calendar_file: "calendar.txt".to_string(),
            calendar_dates_file: "calendar_dates.txt".to_string(),
            strict: false,
        }
    }
}

impl FeedConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn save_json_file<P: AsRef<Path>>(&self, path: P) -> PersistenceResult<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: FeedConfig = serde_json::from_str(r#"{ "strict": true }"#).unwrap();
        assert!(config.strict);
        assert_eq!(config.calendar_file, "calendar.txt");
        assert_eq!(config.calendar_dates_file, "calendar_dates.txt");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<FeedConfig>(r#"{ "calendar": "x" }"#).is_err());
    }

    #[test]
    fn json_file_round_trip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = FeedConfig {
            calendar_file: "cal.csv".into(),
            strict: true,
            ..FeedConfig::default()
        };
        config.save_json_file(file.path()).unwrap();
        assert_eq!(FeedConfig::from_json_file(file.path()).unwrap(), config);
    }
}
