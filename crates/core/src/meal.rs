//! In-session meal log with per day calorie aggregation.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MealError {
    #[error("Unknown meal slot '{0}', expected one of: breakfast, lunch, dinner, snack, other")]
    UnknownSlot(String),
}

/// Meal slot of an entry. Declaration order is the display order for ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Other,
}

impl MealSlot {
    pub const ALL: [MealSlot; 5] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snack,
        MealSlot::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match &self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
            MealSlot::Snack => "snack",
            MealSlot::Other => "other",
        }
    }

    /// Label shown in the app.
    pub fn label(&self) -> &'static str {
        match &self {
            MealSlot::Breakfast => "Café da Manhã",
            MealSlot::Lunch => "Almoço",
            MealSlot::Dinner => "Jantar",
            MealSlot::Snack => "Lanche",
            MealSlot::Other => "Outro",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = MealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" | "cafe-da-manha" | "café-da-manhã" | "cafe" => Ok(MealSlot::Breakfast),
            "lunch" | "almoco" | "almoço" => Ok(MealSlot::Lunch),
            "dinner" | "jantar" => Ok(MealSlot::Dinner),
            "snack" | "lanche" => Ok(MealSlot::Snack),
            "other" | "outro" => Ok(MealSlot::Other),
            _ => Err(MealError::UnknownSlot(s.to_string())),
        }
    }
}

/// A manually logged meal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealEntry {
    pub date: NaiveDate,
    pub slot: MealSlot,
    pub description: String,
    pub calories: u32,
}

/// Calories of one day, grouped by slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealSummary {
    pub date: NaiveDate,
    pub total: u64,
    /// Slots with at least one entry, by descending calories.
    pub by_slot: Vec<(MealSlot, u64)>,
}

impl MealSummary {
    pub fn is_empty(&self) -> bool {
        self.by_slot.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MealLog {
    entries: Vec<MealEntry>,
}

impl MealLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs a meal. Entries with a blank description are rejected and `false` is returned.
    pub fn add_entry(
        &mut self,
        date: NaiveDate,
        slot: MealSlot,
        description: &str,
        calories: u32,
    ) -> bool {
        let description = description.trim();
        if description.is_empty() {
            return false;
        }
        self.entries.push(MealEntry {
            date,
            slot,
            description: description.to_string(),
            calories,
        });
        true
    }

    pub fn entries(&self) -> &[MealEntry] {
        &self.entries
    }

    pub fn entries_on(&self, date: NaiveDate) -> impl Iterator<Item = &MealEntry> {
        self.entries.iter().filter(move |e| e.date == date)
    }

    pub fn summarize(&self, date: NaiveDate) -> MealSummary {
        let mut totals = [0u64; MealSlot::ALL.len()];
        let mut present = [false; MealSlot::ALL.len()];
        for entry in self.entries_on(date) {
            let idx = entry.slot as usize;
            totals[idx] += u64::from(entry.calories);
            present[idx] = true;
        }

        let mut by_slot: Vec<(MealSlot, u64)> = MealSlot::ALL
            .iter()
            .filter(|slot| present[**slot as usize])
            .map(|slot| (*slot, totals[*slot as usize]))
            .collect();
        // Stable sort keeps slot order among equal totals
        by_slot.sort_by(|a, b| b.1.cmp(&a.1));

        MealSummary {
            date,
            total: by_slot.iter().map(|(_, c)| c).sum(),
            by_slot,
        }
    }
}
