// Player domain model: registration profile plus sale state.

use serde::{Deserialize, Serialize};

/// Registration-form fields, one set per registrant. The wire names are
/// camelCase because this is the JSON shape the public form submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    /// Membership type (e.g. "new" or "returning").
    #[serde(rename = "type")]
    pub kind: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub tel: String,
    pub dob: String,
    pub email: String,
    pub health_card: String,
    pub playing_role: String,
    pub tshirt_size: String,
    /// Self-assessed ratings arrive as strings from the form sliders.
    pub batsman_rating: String,
    pub handed_batsman: String,
    pub batting_comment: String,
    pub bowler_rating: String,
    pub arm_bowler: String,
    pub type_bowler: String,
    pub bowling_comment: String,
    pub fielder_rating: String,
    pub fielder_comment: String,
    pub image_url: String,
}

/// One row of the backing store. The ordinal position doubles as the
/// player's identifier for the auction draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: usize,
    #[serde(flatten)]
    pub profile: PlayerProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_for: Option<String>,
}

impl PlayerRecord {
    /// A fresh, unsold row for a just-registered profile.
    pub fn new(id: usize, profile: PlayerProfile) -> Self {
        Self {
            id,
            profile,
            sold_to: None,
            sold_for: None,
        }
    }

    /// Sold is derived, not stored: a record counts as sold only when both
    /// the winning team and the amount are present and non-empty. A row with
    /// just one of the two is a half-finished write and stays drawable.
    pub fn is_sold(&self) -> bool {
        non_empty(&self.sold_to) && non_empty(&self.sold_for)
    }
}

fn non_empty(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}
