//! Summary view: one presentation card per top-level record field.
//!
//! Seven cards in fixed order, each built independently from its own
//! field. A card whose source is empty shows its own placeholder; the
//! other cards never notice. Entries keep record order, which is the
//! narrative's chronological order.

use serde::Serialize;

use crate::record::HealthRecord;

/// One item on a card: a main description, a trailing detail (usually the
/// time of day it pertains to), and an optional second line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardEntry {
    pub text: String,
    pub detail: String,
    /// Extra line under the header; meals put their ingredients here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CardEntry {
    fn new(text: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            detail: detail.into(),
            note: None,
        }
    }

    fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A self-contained presentation unit for one record category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCard {
    pub title: &'static str,
    /// Empty means the card shows `placeholder` instead.
    pub entries: Vec<CardEntry>,
    pub placeholder: &'static str,
}

impl SummaryCard {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build all seven cards in display order.
pub fn summarize(record: &HealthRecord) -> Vec<SummaryCard> {
    vec![
        symptoms_card(record),
        meals_card(record),
        medications_card(record),
        stress_card(record),
        sleep_card(record),
        stool_card(record),
        period_card(record),
    ]
}

fn symptoms_card(record: &HealthRecord) -> SummaryCard {
    SummaryCard {
        title: "Symptoms",
        entries: record
            .symptoms
            .iter()
            .map(|s| CardEntry::new(format!("{} ({})", s.symptom_type, s.score), &s.pertains_to))
            .collect(),
        placeholder: "No symptoms recorded.",
    }
}

fn meals_card(record: &HealthRecord) -> SummaryCard {
    SummaryCard {
        title: "Meals",
        entries: record
            .meals
            .iter()
            .map(|m| {
                CardEntry::new(&m.title, &m.pertains_to).with_note(m.ingredients.join(", "))
            })
            .collect(),
        placeholder: "No meals recorded.",
    }
}

fn medications_card(record: &HealthRecord) -> SummaryCard {
    SummaryCard {
        title: "Medications",
        entries: record
            .medications
            .iter()
            .map(|m| CardEntry::new(&m.name, &m.pertains_to))
            .collect(),
        placeholder: "No medications recorded.",
    }
}

fn stress_card(record: &HealthRecord) -> SummaryCard {
    SummaryCard {
        title: "Stress",
        entries: record
            .stress_levels
            .iter()
            .map(|s| CardEntry::new(&s.score, &s.pertains_to))
            .collect(),
        placeholder: "No stress levels recorded.",
    }
}

fn sleep_card(record: &HealthRecord) -> SummaryCard {
    // None is the absent-sentinel: placeholder, never "null / 10".
    let entries = match record.sleep.score {
        Some(score) => vec![CardEntry::new(
            format!("{score} / 10"),
            &record.sleep.pertains_to,
        )],
        None => Vec::new(),
    };
    SummaryCard {
        title: "Sleep Quality",
        entries,
        placeholder: "No sleep rating recorded.",
    }
}

fn stool_card(record: &HealthRecord) -> SummaryCard {
    SummaryCard {
        title: "Stool Data",
        entries: record
            .stool_data
            .iter()
            .map(|s| CardEntry::new(&s.score, &s.pertains_to))
            .collect(),
        placeholder: "No stool data recorded.",
    }
}

fn period_card(record: &HealthRecord) -> SummaryCard {
    let text = if record.period_status.status {
        "Currently on period"
    } else {
        "Not on period"
    };
    SummaryCard {
        title: "Period Status",
        entries: vec![CardEntry::new(text, "")],
        placeholder: "No period status recorded.",
    }
}

/// Plain-text rendering of the cards for terminal display.
pub fn render_cards(cards: &[SummaryCard]) -> String {
    let mut out = String::new();
    for card in cards {
        out.push_str(card.title);
        out.push('\n');
        for _ in 0..card.title.len() {
            out.push('-');
        }
        out.push('\n');
        if card.is_empty() {
            out.push_str("  ");
            out.push_str(card.placeholder);
            out.push('\n');
        } else {
            for entry in &card.entries {
                out.push_str("  ");
                out.push_str(&entry.text);
                if !entry.detail.is_empty() {
                    out.push_str("  (");
                    out.push_str(&entry.detail);
                    out.push(')');
                }
                out.push('\n');
                if let Some(note) = &entry.note {
                    out.push_str("    ");
                    out.push_str(note);
                    out.push('\n');
                }
            }
        }
        out.push('\n');
    }
    out
}
