use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Weekday tag of a master task. `Free` entries are offered on every date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MasterAttr {
    Free,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl MasterAttr {
    pub const ALL: [MasterAttr; 6] = [
        MasterAttr::Free,
        MasterAttr::Mon,
        MasterAttr::Tue,
        MasterAttr::Wed,
        MasterAttr::Thu,
        MasterAttr::Fri,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Mon => "Mon",
            Self::Tue => "Tue",
            Self::Wed => "Wed",
            Self::Thu => "Thu",
            Self::Fri => "Fri",
        }
    }

    /// Weekend days have no tag of their own.
    pub fn for_weekday(weekday: Weekday) -> Option<Self> {
        match weekday {
            Weekday::Mon => Some(Self::Mon),
            Weekday::Tue => Some(Self::Tue),
            Weekday::Wed => Some(Self::Wed),
            Weekday::Thu => Some(Self::Thu),
            Weekday::Fri => Some(Self::Fri),
            Weekday::Sat | Weekday::Sun => None,
        }
    }
}

impl fmt::Display for MasterAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MasterAttr {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|attr| attr.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow!("unknown master attr: {wanted} (expected Free, Mon, Tue, Wed, Thu or Fri)"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MasterTask {
    pub text: String,
    pub attr: MasterAttr,
}

impl MasterTask {
    pub fn new(text: impl Into<String>, attr: MasterAttr) -> Self {
        Self {
            text: text.into(),
            attr,
        }
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.text, self.attr)
    }

    pub fn offered_on(&self, weekday: Weekday, include_all: bool) -> bool {
        include_all
            || self.attr == MasterAttr::Free
            || MasterAttr::for_weekday(weekday) == Some(self.attr)
    }
}

/// Reusable task templates, independent of any date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MasterList {
    entries: Vec<MasterTask>,
}

impl Default for MasterList {
    fn default() -> Self {
        Self {
            entries: vec![
                MasterTask::new("Sample Task 1", MasterAttr::Free),
                MasterTask::new("Sample Task 2", MasterAttr::Mon),
            ],
        }
    }
}

impl MasterList {
    pub fn new(entries: Vec<MasterTask>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[MasterTask] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a template. Empty text and text already in the list are refused.
    pub fn add(&mut self, text: &str, attr: MasterAttr) -> bool {
        if text.is_empty() || self.entries.iter().any(|entry| entry.text == text) {
            debug!(text, "master task rejected");
            return false;
        }
        self.entries.push(MasterTask::new(text, attr));
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<MasterTask> {
        if index >= self.entries.len() {
            debug!(index, len = self.entries.len(), "master index out of range");
            return None;
        }
        Some(self.entries.remove(index))
    }

    /// Templates offered for `date`, in list order.
    pub fn choices_for(&self, date: NaiveDate, include_all: bool) -> Vec<&MasterTask> {
        let weekday = date.weekday();
        self.entries
            .iter()
            .filter(|entry| entry.offered_on(weekday, include_all))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{MasterAttr, MasterList, MasterTask};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    fn list() -> MasterList {
        MasterList::new(vec![
            MasterTask::new("standup", MasterAttr::Free),
            MasterTask::new("weekly review", MasterAttr::Mon),
            MasterTask::new("timesheet", MasterAttr::Fri),
        ])
    }

    fn texts(choices: Vec<&MasterTask>) -> Vec<&str> {
        choices.into_iter().map(|entry| entry.text.as_str()).collect()
    }

    #[test]
    fn weekday_filter_offers_free_and_matching_entries() {
        let list = list();
        // Monday
        assert_eq!(
            texts(list.choices_for(date("2024-01-01"), false)),
            vec!["standup", "weekly review"]
        );
        // Tuesday
        assert_eq!(texts(list.choices_for(date("2024-01-02"), false)), vec!["standup"]);
        // Friday
        assert_eq!(
            texts(list.choices_for(date("2024-01-05"), false)),
            vec!["standup", "timesheet"]
        );
    }

    #[test]
    fn weekend_offers_only_free_unless_include_all() {
        let list = list();
        assert_eq!(texts(list.choices_for(date("2024-01-06"), false)), vec!["standup"]);
        assert_eq!(list.choices_for(date("2024-01-06"), true).len(), 3);
    }

    #[test]
    fn add_rejects_empty_and_duplicate_text() {
        let mut list = list();
        assert!(!list.add("", MasterAttr::Free));
        assert!(!list.add("standup", MasterAttr::Tue));
        assert!(list.add("retro", MasterAttr::Thu));
        assert_eq!(list.len(), 4);
        assert_eq!(list.entries()[3].label(), "retro (Thu)");
    }

    #[test]
    fn remove_out_of_range_is_ignored() {
        let mut list = list();
        assert!(list.remove(3).is_none());
        let removed = list.remove(0).expect("first entry");
        assert_eq!(removed.text, "standup");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn default_list_has_two_samples() {
        let list = MasterList::default();
        assert_eq!(list.len(), 2);
        assert_eq!(list.entries()[1].attr, MasterAttr::Mon);
    }

    #[test]
    fn attr_serializes_as_short_weekday() {
        let json = serde_json::to_string(&MasterTask::new("x", MasterAttr::Wed)).expect("serialize");
        assert_eq!(json, r#"{"text":"x","attr":"Wed"}"#);
        assert_eq!("fri".parse::<MasterAttr>().expect("parse"), MasterAttr::Fri);
    }
}
