use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of an engaged couple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngagedCoupleId(pub String);

/// Store-assigned identifier of a mentor couple record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MentorCoupleId(pub String);

/// Store-assigned identifier of a mentorship match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(pub String);

/// Monotonic draw counter stamped on every mentor and match record.
/// Reads only consider active records of the latest generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A couple awaiting mentorship. Created once at intake and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagedCouple {
    pub id: EngagedCoupleId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// One mentor couple as written by a single draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorCouple {
    pub id: MentorCoupleId,
    pub name: String,
    pub capacity: u32,
    pub active: bool,
    pub generation: Generation,
    pub created_at: DateTime<Utc>,
}

/// Assignment edge between an engaged couple and a mentor couple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorshipMatch {
    pub id: MatchId,
    pub engaged_couple_id: EngagedCoupleId,
    pub mentor_couple_id: MentorCoupleId,
    pub matched_at: DateTime<Utc>,
    pub active: bool,
    pub generation: Generation,
}

/// Admin input describing a mentor couple and how many engaged couples it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorRequest {
    pub name: String,
    pub capacity: u32,
}

impl MentorRequest {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }
}

/// A mentor couple together with the engaged couples drawn for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorAssignment {
    pub name: String,
    pub capacity: u32,
    pub assigned: Vec<String>,
}

/// Joined row of the current generation used to render results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveMatchView {
    pub engaged_name: String,
    pub mentor_name: String,
    pub mentor_capacity: u32,
}

/// Results for a single mentor couple of the active generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentorResultView {
    pub mentor_name: String,
    pub capacity: u32,
    pub assigned: Vec<String>,
}

/// Read-back of the active generation, grouped by mentor couple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawResultView {
    pub generation: Option<Generation>,
    pub mentors: Vec<MentorResultView>,
    pub total_matches: usize,
}

impl DrawResultView {
    pub fn is_empty(&self) -> bool {
        self.mentors.is_empty()
    }
}
