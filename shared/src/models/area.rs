//! Sales territory models

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A day on which an area's route is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkingDay {
    Saturday,
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl WorkingDay {
    pub const ALL: [WorkingDay; 7] = [
        WorkingDay::Saturday,
        WorkingDay::Sunday,
        WorkingDay::Monday,
        WorkingDay::Tuesday,
        WorkingDay::Wednesday,
        WorkingDay::Thursday,
        WorkingDay::Friday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkingDay::Saturday => "Saturday",
            WorkingDay::Sunday => "Sunday",
            WorkingDay::Monday => "Monday",
            WorkingDay::Tuesday => "Tuesday",
            WorkingDay::Wednesday => "Wednesday",
            WorkingDay::Thursday => "Thursday",
            WorkingDay::Friday => "Friday",
        }
    }
}

impl FromStr for WorkingDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|day| day.as_str() == s)
            .ok_or_else(|| format!("unknown working day: {s}"))
    }
}

/// Working days in week order without repeats
pub fn normalize_working_days(days: &[WorkingDay]) -> Vec<WorkingDay> {
    WorkingDay::ALL
        .into_iter()
        .filter(|day| days.contains(day))
        .collect()
}
