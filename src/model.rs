//! Race aggregate and the dictionary entities it references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Allowed race sizes. Stored and serialized as their capitalized names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Size {
    Small,
    Medium,
    Large,
}

impl Size {
    pub const ALL: [Size; 3] = [Size::Small, Size::Medium, Size::Large];

    pub fn as_str(self) -> &'static str {
        match self {
            Size::Small => "Small",
            Size::Medium => "Medium",
            Size::Large => "Large",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Size {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Size::ALL.into_iter().find(|size| size.as_str() == s).ok_or(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AbilityScoreBonuses {
    #[serde(default)]
    pub strength: i32,
    #[serde(default)]
    pub dexterity: i32,
    #[serde(default)]
    pub constitution: i32,
    #[serde(default)]
    pub intelligence: i32,
    #[serde(default)]
    pub wisdom: i32,
    #[serde(default)]
    pub charisma: i32,
}

impl AbilityScoreBonuses {
    /// Bonuses paired with their attribute names, in canonical order.
    pub fn named(&self) -> [(&'static str, i32); 6] {
        [
            ("Strength", self.strength),
            ("Dexterity", self.dexterity),
            ("Constitution", self.constitution),
            ("Intelligence", self.intelligence),
            ("Wisdom", self.wisdom),
            ("Charisma", self.charisma),
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Age {
    #[serde(default)]
    pub race_id: Uuid,
    #[serde(default)]
    pub average_lifespan: String,
    #[serde(default)]
    pub minimum_age: i32,
    #[serde(default)]
    pub maximum_age: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Proficiency {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Language {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Trait {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Subrace {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub race_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ability_score_bonuses: AbilityScoreBonuses,
}

/// A playable race with its age profile, dictionary links and owned subraces.
///
/// `size` is kept as text so that an unknown size reaches validation instead
/// of failing deserialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Race {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ability_score_bonuses: AbilityScoreBonuses,
    #[serde(default)]
    pub age: Age,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub speed: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proficiencies: Vec<Proficiency>,
    #[serde(default, rename = "languages_known", skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<Language>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<Trait>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subraces: Vec<Subrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Flat `races` row; associations are loaded separately.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RaceRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[sqlx(flatten)]
    pub bonuses: AbilityScoreBonuses,
    pub size: String,
    pub speed: i32,
    pub alignment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RaceRow {
    pub fn into_race(self) -> Race {
        Race {
            id: self.id,
            name: self.name,
            description: self.description,
            ability_score_bonuses: self.bonuses,
            age: Age {
                race_id: self.id,
                ..Age::default()
            },
            size: self.size,
            speed: self.speed,
            alignment: self.alignment,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
            ..Race::default()
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SubraceRow {
    pub id: Uuid,
    pub race_id: Uuid,
    pub name: String,
    pub description: String,
    #[sqlx(flatten)]
    pub bonuses: AbilityScoreBonuses,
}

impl From<SubraceRow> for Subrace {
    fn from(row: SubraceRow) -> Self {
        Subrace {
            id: row.id,
            race_id: row.race_id,
            name: row.name,
            description: row.description,
            ability_score_bonuses: row.bonuses,
        }
    }
}
