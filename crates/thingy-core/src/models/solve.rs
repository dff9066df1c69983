//! Speedcube timer solves

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Seconds added when inspection overran
pub const INSPECTION_PENALTY_SECS: f64 = 2.0;

/// One timed solve. `time` already includes `penalty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solve {
    pub time: f64,
    #[serde(default)]
    pub scramble: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub penalty: f64,
    #[serde(default)]
    pub raw_time: f64,
}

/// The replicated solves document: `{ "solves": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolvesDocument {
    #[serde(default)]
    pub solves: Vec<Solve>,
}

impl SolvesDocument {
    /// Record a solve, applying the inspection penalty when requested
    pub fn add(&mut self, raw_time: f64, scramble: &str, penalized: bool) -> Result<&Solve> {
        if !raw_time.is_finite() || raw_time <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "solve time must be a positive number of seconds, got {raw_time}"
            )));
        }
        let penalty = if penalized {
            INSPECTION_PENALTY_SECS
        } else {
            0.0
        };
        self.solves.push(Solve {
            time: raw_time + penalty,
            scramble: scramble.trim().to_string(),
            timestamp: Utc::now(),
            penalty,
            raw_time,
        });
        Ok(&self.solves[self.solves.len() - 1])
    }

    /// Remove by zero-based position
    pub fn remove(&mut self, index: usize) -> Result<Solve> {
        if index >= self.solves.len() {
            return Err(Error::NotFound(format!("solve #{}", index + 1)));
        }
        Ok(self.solves.remove(index))
    }

    /// Fastest recorded time
    pub fn best(&self) -> Option<&Solve> {
        self.solves
            .iter()
            .min_by(|left, right| left.time.total_cmp(&right.time))
    }
}

/// Render seconds as `S.ss` or `M:SS.ss`
pub fn format_solve_time(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let minutes = (seconds / 60.0).floor() as u64;
    #[allow(clippy::cast_precision_loss)]
    let remainder = seconds - (minutes as f64) * 60.0;
    if minutes > 0 {
        format!("{minutes}:{remainder:05.2}")
    } else {
        format!("{remainder:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_is_added_to_time() {
        let mut doc = SolvesDocument::default();
        let solve = doc.add(10.5, "R U R'", true).unwrap();
        assert!((solve.time - 12.5).abs() < f64::EPSILON);
        assert!((solve.raw_time - 10.5).abs() < f64::EPSILON);
        assert!((solve.penalty - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn best_picks_fastest_and_remove_checks_bounds() {
        let mut doc = SolvesDocument::default();
        doc.add(15.0, "", false).unwrap();
        doc.add(9.0, "", false).unwrap();
        doc.add(8.0, "", true).unwrap();
        assert!((doc.best().unwrap().time - 9.0).abs() < f64::EPSILON);

        assert!(doc.remove(5).is_err());
        doc.remove(1).unwrap();
        assert!((doc.best().unwrap().time - 10.0).abs() < f64::EPSILON);
        assert!(doc.add(0.0, "", false).is_err());
    }

    #[test]
    fn reads_original_solve_shape() {
        let doc: SolvesDocument = serde_json::from_str(
            r#"{"solves":[{"time":12.34,"scramble":"F2 U","timestamp":"2024-05-01T10:00:00.000Z","penalty":0,"rawTime":12.34}]}"#,
        )
        .unwrap();
        assert_eq!(doc.solves.len(), 1);
        assert_eq!(doc.solves[0].scramble, "F2 U");
    }

    #[test]
    fn format_solve_time_uses_minutes_when_needed() {
        assert_eq!(format_solve_time(9.876), "9.88");
        assert_eq!(format_solve_time(75.5), "1:15.50");
    }
}
