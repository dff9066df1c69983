//! Habit tracker model

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const HABIT_COLORS: [&str; 6] = [
    "#e94560", "#4ade80", "#3b82f6", "#f59e0b", "#8b5cf6", "#06b6d4",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSettings {
    #[serde(default)]
    pub show_stats: bool,
}

/// The replicated habit document.
///
/// `completions` maps an ISO day (`YYYY-MM-DD`) to the ids of habits checked
/// off that day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitDocument {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub completions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub settings: HabitSettings,
}

impl HabitDocument {
    pub fn add(&mut self, name: &str) -> Result<String> {
        let name = normalize_name(name)?;
        let id = self.next_id();
        let color = HABIT_COLORS[self.habits.len() % HABIT_COLORS.len()].to_string();
        self.habits.push(Habit {
            id: id.clone(),
            name,
            created_at: Utc::now(),
            color,
        });
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<()> {
        let name = normalize_name(name)?;
        let habit = self
            .habits
            .iter_mut()
            .find(|habit| habit.id == id)
            .ok_or_else(|| Error::NotFound(format!("habit {id}")))?;
        habit.name = name;
        Ok(())
    }

    /// Delete a habit together with its completion history
    pub fn remove(&mut self, id: &str) -> Result<Habit> {
        let index = self
            .habits
            .iter()
            .position(|habit| habit.id == id)
            .ok_or_else(|| Error::NotFound(format!("habit {id}")))?;
        for ids in self.completions.values_mut() {
            ids.retain(|habit_id| habit_id != id);
        }
        Ok(self.habits.remove(index))
    }

    /// Check or uncheck a habit for `date`; returns whether it is now checked
    pub fn toggle(&mut self, id: &str, date: NaiveDate) -> Result<bool> {
        if self.get(id).is_none() {
            return Err(Error::NotFound(format!("habit {id}")));
        }
        let day = self.completions.entry(day_key(date)).or_default();
        if let Some(index) = day.iter().position(|habit_id| habit_id == id) {
            day.remove(index);
            Ok(false)
        } else {
            day.push(id.to_string());
            Ok(true)
        }
    }

    pub fn is_completed(&self, id: &str, date: NaiveDate) -> bool {
        self.completions
            .get(&day_key(date))
            .is_some_and(|ids| ids.iter().any(|habit_id| habit_id == id))
    }

    fn next_id(&self) -> String {
        let now = Utc::now();
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let mut suffix = u64::from(now.timestamp_subsec_nanos());
        loop {
            let candidate = format!("{}{}", to_base36(millis), to_base36(suffix));
            if self.get(&candidate).is_none() {
                return candidate;
            }
            suffix = suffix.wrapping_add(1);
        }
    }
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        Err(Error::InvalidInput("habit name must not be empty".to_string()))
    } else {
        Ok(name.to_string())
    }
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[usize::try_from(value % 36).unwrap_or(0)]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    #[test]
    fn toggle_checks_and_unchecks_for_a_day() {
        let mut doc = HabitDocument::default();
        let id = doc.add("Read").unwrap();

        assert!(doc.toggle(&id, day("2024-03-01")).unwrap());
        assert!(doc.is_completed(&id, day("2024-03-01")));
        assert!(!doc.is_completed(&id, day("2024-03-02")));

        assert!(!doc.toggle(&id, day("2024-03-01")).unwrap());
        assert!(!doc.is_completed(&id, day("2024-03-01")));
    }

    #[test]
    fn remove_drops_completion_history() {
        let mut doc = HabitDocument::default();
        let read = doc.add("Read").unwrap();
        let run = doc.add("Run").unwrap();
        assert_ne!(read, run);
        doc.toggle(&read, day("2024-03-01")).unwrap();
        doc.toggle(&run, day("2024-03-01")).unwrap();

        doc.remove(&read).unwrap();
        assert_eq!(doc.completions["2024-03-01"], vec![run.clone()]);
        assert!(doc.toggle(&read, day("2024-03-01")).is_err());
    }

    #[test]
    fn rename_validates_name() {
        let mut doc = HabitDocument::default();
        let id = doc.add("Read").unwrap();
        doc.rename(&id, " Read more ").unwrap();
        assert_eq!(doc.get(&id).unwrap().name, "Read more");
        assert!(doc.rename(&id, "  ").is_err());
    }

    #[test]
    fn base36_matches_javascript_radix() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
