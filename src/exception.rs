use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-date override of the weekly pattern, as in `calendar_dates.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExceptionKind {
    #[serde(rename = "1")]
    Added,
    #[serde(rename = "2")]
    Removed,
}

impl ExceptionKind {
    pub fn from_has_service(has_service: bool) -> Self {
        if has_service {
            ExceptionKind::Added
        } else {
            ExceptionKind::Removed
        }
    }

    /// Numeric `exception_type` code: 1 adds service, 2 removes it.
    pub fn code(self) -> u8 {
        match self {
            ExceptionKind::Added => 1,
            ExceptionKind::Removed => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ExceptionKind::Added),
            2 => Some(ExceptionKind::Removed),
            _ => None,
        }
    }

    pub fn as_field(self) -> &'static str {
        match self {
            ExceptionKind::Added => "1",
            ExceptionKind::Removed => "2",
        }
    }

    pub fn adds_service(self) -> bool {
        self == ExceptionKind::Added
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_field())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_feed_encoding() {
        assert_eq!(ExceptionKind::Added.code(), 1);
        assert_eq!(ExceptionKind::Removed.code(), 2);
        assert_eq!(ExceptionKind::from_code(1), Some(ExceptionKind::Added));
        assert_eq!(ExceptionKind::from_code(2), Some(ExceptionKind::Removed));
        assert_eq!(ExceptionKind::from_code(3), None);
        assert_eq!(ExceptionKind::from_has_service(false).as_field(), "2");
    }

    #[test]
    fn serde_uses_feed_codes() {
        let json = serde_json::to_string(&ExceptionKind::Added).unwrap();
        assert_eq!(json, "\"1\"");
        let kind: ExceptionKind = serde_json::from_str("\"2\"").unwrap();
        assert_eq!(kind, ExceptionKind::Removed);
    }
}
