//! Structural validation of candidate races and their nested entities.
//!
//! Ability bonuses are checked together and reported in one message; every
//! other rule fails on the first violation, and `validate_race` stops at the
//! first nested entity that fails.

use crate::error::ValidationError;
use crate::model::{AbilityScoreBonuses, Age, Language, Proficiency, Race, Size, Subrace, Trait};

pub fn validate_race(race: &Race) -> Result<(), ValidationError> {
    if race.name.is_empty() {
        return Err(ValidationError::new("race name cannot be empty"));
    }
    if race.size.parse::<Size>().is_err() {
        return Err(ValidationError::new(format!("invalid size: {}", race.size)));
    }
    if race.speed <= 0 {
        return Err(ValidationError::new(format!("invalid speed: {}", race.speed)));
    }
    validate_ability_bonuses(&race.ability_score_bonuses)?;
    validate_age(&race.age)?;
    for prof in &race.proficiencies {
        validate_proficiency(prof)?;
    }
    for lang in &race.languages {
        validate_language(lang)?;
    }
    for t in &race.traits {
        validate_trait(t)?;
    }
    for subrace in &race.subraces {
        validate_subrace(subrace)?;
    }
    Ok(())
}

/// Collects every negative bonus into a single error.
pub fn validate_ability_bonuses(bonuses: &AbilityScoreBonuses) -> Result<(), ValidationError> {
    let msgs: Vec<String> = bonuses
        .named()
        .iter()
        .filter(|(_, v)| *v < 0)
        .map(|(name, _)| format!("{} bonus cannot be negative", name))
        .collect();
    if msgs.is_empty() {
        return Ok(());
    }
    Err(ValidationError::new(format!(
        "negative ability bonuses: [{}]",
        msgs.join(" ")
    )))
}

pub fn validate_age(age: &Age) -> Result<(), ValidationError> {
    if age.average_lifespan.is_empty() {
        return Err(ValidationError::new("average lifespan cannot be empty"));
    }
    if age.minimum_age < 0 {
        return Err(ValidationError::new(format!(
            "minimum age cannot be negative: {}",
            age.minimum_age
        )));
    }
    if age.maximum_age < age.minimum_age {
        return Err(ValidationError::new(format!(
            "maximum age ({}) cannot be less than minimum age ({})",
            age.maximum_age, age.minimum_age
        )));
    }
    Ok(())
}

pub fn validate_proficiency(prof: &Proficiency) -> Result<(), ValidationError> {
    if prof.name.is_empty() {
        return Err(ValidationError::new("proficiency name cannot be empty"));
    }
    Ok(())
}

pub fn validate_language(lang: &Language) -> Result<(), ValidationError> {
    if lang.name.is_empty() {
        return Err(ValidationError::new("language name cannot be empty"));
    }
    Ok(())
}

pub fn validate_trait(t: &Trait) -> Result<(), ValidationError> {
    if t.name.is_empty() {
        return Err(ValidationError::new("trait name cannot be empty"));
    }
    Ok(())
}

pub fn validate_subrace(subrace: &Subrace) -> Result<(), ValidationError> {
    if subrace.name.is_empty() {
        return Err(ValidationError::new("subrace name cannot be empty"));
    }
    Ok(())
}
