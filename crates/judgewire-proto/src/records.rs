//! Domain record shapes carried in request and broadcast payloads.
//!
//! These mirror the judging deployment's relational tables (hacks, judges,
//! assignments, superlatives, placements, ratings). The client treats them
//! purely as payload shapes; storage lives on the server side.

use serde::{Deserialize, Serialize};

/// A submitted hack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hack {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub description: String,
}

/// Fields for creating a hack; the server assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HackDraft {
    pub name: String,
    pub location: String,
    pub description: String,
}

/// A judge account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judge {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Fields for creating a judge; the server assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeDraft {
    pub name: String,
    pub email: String,
}

/// A superlative category (e.g. "best hardware hack").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Superlative {
    pub id: i64,
    pub name: String,
}

/// Fields for creating a superlative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperlativeDraft {
    pub name: String,
}

/// A judge's score for a hack. The score range is enforced server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub judge_id: i64,
    pub hack_id: i64,
    pub rating: i32,
}

/// A judge's first and second choice for one superlative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperlativePlacement {
    pub judge_id: i64,
    pub superlative_id: i64,
    pub first_choice: i64,
    pub second_choice: i64,
}

/// One entry in a judge's prioritized hack queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HackAssignment {
    pub judge_id: i64,
    pub hack_id: i64,
    pub priority: u32,
}

/// Tables addressable by the generic row operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Hacks,
    Judges,
    Superlatives,
    Ratings,
    Placements,
    Assignments,
}

/// Judge-facing state dump pushed on the shared synchronization channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedSnapshot {
    pub hacks: Vec<Hack>,
    pub superlatives: Vec<Superlative>,
    pub ratings: Vec<Rating>,
    pub placements: Vec<SuperlativePlacement>,
    pub assignments: Vec<HackAssignment>,
}

/// Admin-console state dump: everything judges see plus the judge roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminSnapshot {
    pub shared: SharedSnapshot,
    pub judges: Vec<Judge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_kinds_use_snake_case_names() {
        let json = serde_json::to_value(TableKind::Superlatives).unwrap();
        assert_eq!(json, "superlatives");

        let parsed: TableKind = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, TableKind::Superlatives);
    }
}
