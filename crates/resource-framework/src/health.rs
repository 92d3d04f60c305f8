//! # Health
//!
//! The closed set of health values a resource can report, and the rule that
//! folds many of them into one deployment-level verdict.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health of a single resource, or of a whole deployment.
///
/// `Partial` is only ever produced by [`Health::aggregate`]; resources report
/// one of the other five values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Health {
    #[default]
    Unknown,
    /// Starting up or transitioning.
    Alive,
    Ready,
    Down,
    /// Expected to exist but absent from the remote engine.
    Missing,
    /// Children disagree.
    Partial,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Unknown => "UNKNOWN",
            Health::Alive => "ALIVE",
            Health::Ready => "READY",
            Health::Down => "DOWN",
            Health::Missing => "MISSING",
            Health::Partial => "PARTIAL",
        }
    }

    /// Folds per-resource health into one value and a human message.
    ///
    /// - every value `Ready` → `Ready`
    /// - every value identical (`v`) → `v`
    /// - anything else → `Partial`
    ///
    /// An empty input yields `Unknown`: nothing reported, so nothing is known.
    pub fn aggregate<I>(values: I) -> (Health, String)
    where
        I: IntoIterator<Item = Health>,
    {
        let mut values = values.into_iter();
        let Some(first) = values.next() else {
            return (Health::Unknown, "No resources reported a status".to_string());
        };

        if values.all(|h| h == first) {
            let msg = format!("All resources are reporting {first}");
            (first, msg)
        } else {
            (
                Health::Partial,
                "Resource health is mixed; the deployment may still be transitioning".to_string(),
            )
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_ready_is_ready() {
        let (health, msg) = Health::aggregate([Health::Ready, Health::Ready]);
        assert_eq!(health, Health::Ready);
        assert_eq!(msg, "All resources are reporting READY");
    }

    #[test]
    fn uniform_non_ready_passes_through() {
        assert_eq!(Health::aggregate([Health::Down, Health::Down]).0, Health::Down);
        assert_eq!(Health::aggregate([Health::Alive]).0, Health::Alive);
        assert_eq!(
            Health::aggregate([Health::Missing, Health::Missing, Health::Missing]).0,
            Health::Missing
        );
    }

    #[test]
    fn mixed_values_are_partial() {
        let (health, msg) = Health::aggregate([Health::Ready, Health::Missing]);
        assert_eq!(health, Health::Partial);
        assert!(msg.contains("transitioning"));

        assert_eq!(
            Health::aggregate([Health::Down, Health::Down, Health::Alive]).0,
            Health::Partial
        );
    }

    #[test]
    fn empty_is_unknown() {
        assert_eq!(Health::aggregate(Vec::new()).0, Health::Unknown);
    }

    #[test]
    fn serializes_as_upper_case() {
        assert_eq!(serde_json::to_string(&Health::Missing).unwrap(), "\"MISSING\"");
        let parsed: Health = serde_json::from_str("\"ALIVE\"").unwrap();
        assert_eq!(parsed, Health::Alive);
    }
}
