//! PostgreSQL-backed [`RaceRepository`]. Every multi-statement mutation runs in one
//! transaction; returning early drops the transaction, which rolls it back.

use super::diff::{diff_keys, SetDiff};
use super::RaceRepository;
use crate::error::RepoError;
use crate::model::{Age, Language, Proficiency, Race, RaceRow, Subrace, SubraceRow, Trait};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const RACE_COLUMNS: &str = "id, name, description, strength, dexterity, constitution, intelligence, wisdom, charisma, size, speed, alignment, created_at, updated_at";
const SUBRACE_COLUMNS: &str = "id, race_id, name, description, strength, dexterity, constitution, intelligence, wisdom, charisma";

#[derive(Clone)]
pub struct PgRaceRepository {
    pool: PgPool,
}

impl PgRaceRepository {
    pub fn new(pool: PgPool) -> Self {
        PgRaceRepository { pool }
    }
}

/// Many-to-many links from a race to a shared dictionary table.
#[derive(Clone, Copy, Debug)]
enum Link {
    Proficiencies,
    Languages,
    Traits,
}

impl Link {
    fn junction(self) -> &'static str {
        match self {
            Link::Proficiencies => "race_proficiencies",
            Link::Languages => "race_languages",
            Link::Traits => "race_traits",
        }
    }

    fn column(self) -> &'static str {
        match self {
            Link::Proficiencies => "proficiency_id",
            Link::Languages => "language_id",
            Link::Traits => "trait_id",
        }
    }

    fn dictionary(self) -> &'static str {
        match self {
            Link::Proficiencies => "proficiencies",
            Link::Languages => "languages",
            Link::Traits => "traits",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Link::Proficiencies => "proficiency",
            Link::Languages => "language",
            Link::Traits => "trait",
        }
    }
}

/// One dictionary entry as supplied by a caller.
struct Entry<'a> {
    id: Uuid,
    name: &'a str,
    description: Option<&'a str>,
}

impl<'a> From<&'a Proficiency> for Entry<'a> {
    fn from(p: &'a Proficiency) -> Self {
        Entry { id: p.id, name: &p.name, description: Some(p.description.as_str()) }
    }
}

impl<'a> From<&'a Language> for Entry<'a> {
    fn from(l: &'a Language) -> Self {
        Entry { id: l.id, name: &l.name, description: None }
    }
}

impl<'a> From<&'a Trait> for Entry<'a> {
    fn from(t: &'a Trait) -> Self {
        Entry { id: t.id, name: &t.name, description: Some(t.description.as_str()) }
    }
}

/// A parsed search filter on an allowed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Criterion {
    Size(String),
    Speed(i32),
    Alignment(String),
}

/// Only `size`, `speed` and `alignment` are searchable. Sorted by key so the
/// generated SQL is stable.
pub(crate) fn parse_criteria(criteria: &HashMap<String, String>) -> Result<Vec<Criterion>, RepoError> {
    let mut keys: Vec<&String> = criteria.keys().collect();
    keys.sort();
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        let value = &criteria[key];
        let c = match key.as_str() {
            "size" => Criterion::Size(value.clone()),
            "speed" => {
                let n = value.trim().parse::<i32>().map_err(|_| RepoError::InvalidCriteria {
                    key: key.clone(),
                    value: value.clone(),
                })?;
                Criterion::Speed(n)
            }
            "alignment" => Criterion::Alignment(value.clone()),
            other => return Err(RepoError::UnknownCriteria(other.to_string())),
        };
        out.push(c);
    }
    Ok(out)
}

fn race_not_found(id: Uuid) -> RepoError {
    RepoError::NotFound(format!("race with ID {} not found", id))
}

async fn race_exists(conn: &mut PgConnection, id: Uuid) -> Result<bool, RepoError> {
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM races WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists.0)
}

async fn trait_exists(conn: &mut PgConnection, id: Uuid) -> Result<bool, RepoError> {
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM traits WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists.0)
}

/// Fill age, subraces and dictionary links for the given rows, keeping row order.
async fn expand(conn: &mut PgConnection, rows: Vec<RaceRow>) -> Result<Vec<Race>, RepoError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut races: Vec<Race> = rows.into_iter().map(RaceRow::into_race).collect();
    let index: HashMap<Uuid, usize> = races.iter().enumerate().map(|(i, r)| (r.id, i)).collect();

    let ages: Vec<Age> = sqlx::query_as(
        "SELECT race_id, average_lifespan, minimum_age, maximum_age FROM ages WHERE race_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;
    for age in ages {
        if let Some(&i) = index.get(&age.race_id) {
            races[i].age = age;
        }
    }

    let subraces: Vec<SubraceRow> = sqlx::query_as(&format!(
        "SELECT {} FROM subraces WHERE race_id = ANY($1) ORDER BY name, id",
        SUBRACE_COLUMNS
    ))
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;
    for row in subraces {
        if let Some(&i) = index.get(&row.race_id) {
            races[i].subraces.push(row.into());
        }
    }

    let proficiencies: Vec<(Uuid, Uuid, String, String)> = sqlx::query_as(
        "SELECT rp.race_id, p.id, p.name, p.description FROM race_proficiencies rp \
         JOIN proficiencies p ON p.id = rp.proficiency_id \
         WHERE rp.race_id = ANY($1) ORDER BY p.name",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;
    for (race_id, id, name, description) in proficiencies {
        if let Some(&i) = index.get(&race_id) {
            races[i].proficiencies.push(Proficiency { id, name, description });
        }
    }

    let languages: Vec<(Uuid, Uuid, String)> = sqlx::query_as(
        "SELECT rl.race_id, l.id, l.name FROM race_languages rl \
         JOIN languages l ON l.id = rl.language_id \
         WHERE rl.race_id = ANY($1) ORDER BY l.name",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;
    for (race_id, id, name) in languages {
        if let Some(&i) = index.get(&race_id) {
            races[i].languages.push(Language { id, name });
        }
    }

    let traits: Vec<(Uuid, Uuid, String, String)> = sqlx::query_as(
        "SELECT rt.race_id, t.id, t.name, t.description FROM race_traits rt \
         JOIN traits t ON t.id = rt.trait_id \
         WHERE rt.race_id = ANY($1) ORDER BY t.name",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;
    for (race_id, id, name, description) in traits {
        if let Some(&i) = index.get(&race_id) {
            races[i].traits.push(Trait { id, name, description });
        }
    }

    Ok(races)
}

async fn load_race(conn: &mut PgConnection, id: Uuid) -> Result<Race, RepoError> {
    let row: Option<RaceRow> = sqlx::query_as(&format!("SELECT {} FROM races WHERE id = $1", RACE_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let row = row.ok_or_else(|| race_not_found(id))?;
    expand(conn, vec![row]).await?.pop().ok_or_else(|| race_not_found(id))
}

async fn insert_race_row(conn: &mut PgConnection, id: Uuid, race: &Race) -> Result<(), RepoError> {
    let b = &race.ability_score_bonuses;
    sqlx::query(
        "INSERT INTO races (id, name, description, strength, dexterity, constitution, intelligence, wisdom, charisma, size, speed, alignment) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(id)
    .bind(&race.name)
    .bind(&race.description)
    .bind(b.strength)
    .bind(b.dexterity)
    .bind(b.constitution)
    .bind(b.intelligence)
    .bind(b.wisdom)
    .bind(b.charisma)
    .bind(&race.size)
    .bind(race.speed)
    .bind(&race.alignment)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn save_race_row(conn: &mut PgConnection, id: Uuid, race: &Race) -> Result<(), RepoError> {
    let b = &race.ability_score_bonuses;
    sqlx::query(
        "UPDATE races SET name = $2, description = $3, strength = $4, dexterity = $5, constitution = $6, \
         intelligence = $7, wisdom = $8, charisma = $9, size = $10, speed = $11, alignment = $12, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(&race.name)
    .bind(&race.description)
    .bind(b.strength)
    .bind(b.dexterity)
    .bind(b.constitution)
    .bind(b.intelligence)
    .bind(b.wisdom)
    .bind(b.charisma)
    .bind(&race.size)
    .bind(race.speed)
    .bind(&race.alignment)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Age is 1:1 with its race, so replacing it is an upsert on race_id.
async fn replace_age(conn: &mut PgConnection, race_id: Uuid, age: &Age) -> Result<(), RepoError> {
    sqlx::query(
        "INSERT INTO ages (race_id, average_lifespan, minimum_age, maximum_age) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (race_id) DO UPDATE SET average_lifespan = EXCLUDED.average_lifespan, \
         minimum_age = EXCLUDED.minimum_age, maximum_age = EXCLUDED.maximum_age",
    )
    .bind(race_id)
    .bind(&age.average_lifespan)
    .bind(age.minimum_age)
    .bind(age.maximum_age)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_subrace(conn: &mut PgConnection, race_id: Uuid, subrace: &Subrace) -> Result<Subrace, RepoError> {
    let id = if subrace.id.is_nil() { Uuid::new_v4() } else { subrace.id };
    let b = &subrace.ability_score_bonuses;
    let row: SubraceRow = sqlx::query_as(&format!(
        "INSERT INTO subraces (id, race_id, name, description, strength, dexterity, constitution, intelligence, wisdom, charisma) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
        SUBRACE_COLUMNS
    ))
    .bind(id)
    .bind(race_id)
    .bind(&subrace.name)
    .bind(&subrace.description)
    .bind(b.strength)
    .bind(b.dexterity)
    .bind(b.constitution)
    .bind(b.intelligence)
    .bind(b.wisdom)
    .bind(b.charisma)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.into())
}

/// Reject incoming subrace ids that repeat within the request or that already
/// exist outside `owned`. Nil ids are fresh and always pass.
async fn check_subrace_ids(
    conn: &mut PgConnection,
    race_id: Uuid,
    owned: &[Uuid],
    incoming: &[Subrace],
) -> Result<(), RepoError> {
    let mut seen = HashSet::new();
    let mut unowned = Vec::new();
    for id in incoming.iter().map(|s| s.id).filter(|id| !id.is_nil()) {
        if !seen.insert(id) {
            return Err(RepoError::ForeignSubrace(format!("duplicate subrace ID {} in request", id)));
        }
        if !owned.contains(&id) {
            unowned.push(id);
        }
    }
    if unowned.is_empty() {
        return Ok(());
    }

    let taken: Option<(Uuid, Uuid)> = sqlx::query_as("SELECT id, race_id FROM subraces WHERE id = ANY($1) LIMIT 1")
        .bind(&unowned)
        .fetch_optional(&mut *conn)
        .await?;
    match taken {
        Some((id, owner)) if owner == race_id => Err(RepoError::ForeignSubrace(format!(
            "subrace with ID {} already exists on race {}",
            id, race_id
        ))),
        Some((id, _)) => Err(RepoError::ForeignSubrace(format!(
            "subrace with ID {} does not belong to race {}",
            id, race_id
        ))),
        None => Ok(()),
    }
}

/// Owned subraces: stored rows missing from the incoming list are deleted, incoming
/// subraces without a stored counterpart are inserted, the rest are left alone.
async fn replace_subraces(
    conn: &mut PgConnection,
    race_id: Uuid,
    stored: &[Subrace],
    incoming: &[Subrace],
) -> Result<SetDiff<Uuid>, RepoError> {
    let stored_ids: Vec<Uuid> = stored.iter().map(|s| s.id).collect();
    check_subrace_ids(conn, race_id, &stored_ids, incoming).await?;
    let incoming_ids: Vec<Uuid> = incoming.iter().map(|s| s.id).filter(|id| !id.is_nil()).collect();
    let diff = diff_keys(&stored_ids, &incoming_ids);
    let fresh = incoming.iter().filter(|s| s.id.is_nil()).count();
    if diff.is_noop() && fresh == 0 {
        return Ok(diff);
    }

    if !diff.removed.is_empty() {
        sqlx::query("DELETE FROM subraces WHERE race_id = $1 AND id = ANY($2)")
            .bind(race_id)
            .bind(&diff.removed)
            .execute(&mut *conn)
            .await?;
    }
    for subrace in incoming {
        if subrace.id.is_nil() || diff.added.contains(&subrace.id) {
            insert_subrace(conn, race_id, subrace).await?;
        }
    }
    Ok(diff)
}

/// Map each entry to a dictionary row id. An explicit id must already exist;
/// entries without one are found by name or inserted.
async fn resolve_entries(conn: &mut PgConnection, link: Link, entries: &[Entry<'_>]) -> Result<Vec<Uuid>, RepoError> {
    let dict = link.dictionary();
    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        if !entry.id.is_nil() {
            let exists: (bool,) = sqlx::query_as(&format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", dict))
                .bind(entry.id)
                .fetch_one(&mut *conn)
                .await?;
            if !exists.0 {
                return Err(RepoError::NotFound(format!("{} with ID {} not found", link.noun(), entry.id)));
            }
            ids.push(entry.id);
            continue;
        }
        let id: Uuid = match entry.description {
            Some(description) => sqlx::query_scalar(&format!(
                "INSERT INTO {} (id, name, description) VALUES ($1, $2, $3) \
                 ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id",
                dict
            ))
            .bind(Uuid::new_v4())
            .bind(entry.name)
            .bind(description)
            .fetch_one(&mut *conn)
            .await?,
            None => sqlx::query_scalar(&format!(
                "INSERT INTO {} (id, name) VALUES ($1, $2) \
                 ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id",
                dict
            ))
            .bind(Uuid::new_v4())
            .bind(entry.name)
            .fetch_one(&mut *conn)
            .await?,
        };
        ids.push(id);
    }
    Ok(ids)
}

/// Make the junction rows for `race_id` equal `incoming`: detach removed ids, attach added ones.
async fn replace_links(
    conn: &mut PgConnection,
    link: Link,
    race_id: Uuid,
    stored: &[Uuid],
    incoming: &[Uuid],
) -> Result<SetDiff<Uuid>, RepoError> {
    let diff = diff_keys(stored, incoming);
    if diff.is_noop() {
        tracing::debug!(race_id = %race_id, link = link.junction(), "links unchanged");
        return Ok(diff);
    }
    if !diff.removed.is_empty() {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE race_id = $1 AND {} = ANY($2)",
            link.junction(),
            link.column()
        ))
        .bind(race_id)
        .bind(&diff.removed)
        .execute(&mut *conn)
        .await?;
    }
    if !diff.added.is_empty() {
        sqlx::query(&format!(
            "INSERT INTO {} (race_id, {}) SELECT $1, UNNEST($2::uuid[])",
            link.junction(),
            link.column()
        ))
        .bind(race_id)
        .bind(&diff.added)
        .execute(&mut *conn)
        .await?;
    }
    tracing::debug!(
        race_id = %race_id,
        link = link.junction(),
        removed = diff.removed.len(),
        added = diff.added.len(),
        unchanged = diff.unchanged.len(),
        "replaced links"
    );
    Ok(diff)
}

async fn replace_dictionary_links(
    conn: &mut PgConnection,
    link: Link,
    race_id: Uuid,
    stored: &[Uuid],
    entries: &[Entry<'_>],
) -> Result<(), RepoError> {
    let incoming = resolve_entries(conn, link, entries).await?;
    replace_links(conn, link, race_id, stored, &incoming).await?;
    Ok(())
}

#[async_trait]
impl RaceRepository for PgRaceRepository {
    async fn get_all(&self) -> Result<Vec<Race>, RepoError> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<RaceRow> = sqlx::query_as(&format!("SELECT {} FROM races ORDER BY name", RACE_COLUMNS))
            .fetch_all(&mut *conn)
            .await?;
        expand(&mut conn, rows).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Race, RepoError> {
        let mut conn = self.pool.acquire().await?;
        load_race(&mut conn, id).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Race, RepoError> {
        let mut conn = self.pool.acquire().await?;
        let row: Option<RaceRow> = sqlx::query_as(&format!("SELECT {} FROM races WHERE name = $1", RACE_COLUMNS))
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        let row = row.ok_or_else(|| RepoError::NotFound(format!("race with name '{}' not found", name)))?;
        expand(&mut conn, vec![row])
            .await?
            .pop()
            .ok_or_else(|| RepoError::NotFound(format!("race with name '{}' not found", name)))
    }

    async fn create(&self, race: &Race) -> Result<Race, RepoError> {
        let id = if race.id.is_nil() { Uuid::new_v4() } else { race.id };
        let mut tx = self.pool.begin().await?;

        insert_race_row(&mut tx, id, race).await?;
        replace_age(&mut tx, id, &race.age).await?;
        check_subrace_ids(&mut tx, id, &[], &race.subraces).await?;
        for subrace in &race.subraces {
            insert_subrace(&mut tx, id, subrace).await?;
        }
        let profs: Vec<Entry> = race.proficiencies.iter().map(Entry::from).collect();
        replace_dictionary_links(&mut tx, Link::Proficiencies, id, &[], &profs).await?;
        let langs: Vec<Entry> = race.languages.iter().map(Entry::from).collect();
        replace_dictionary_links(&mut tx, Link::Languages, id, &[], &langs).await?;
        let traits: Vec<Entry> = race.traits.iter().map(Entry::from).collect();
        replace_dictionary_links(&mut tx, Link::Traits, id, &[], &traits).await?;

        let stored = load_race(&mut tx, id).await?;
        tx.commit().await?;
        tracing::info!(race_id = %id, name = %stored.name, "race created");
        Ok(stored)
    }

    async fn update(&self, id: Uuid, race: &Race) -> Result<Race, RepoError> {
        let mut tx = self.pool.begin().await?;
        let existing = load_race(&mut tx, id).await?;

        replace_age(&mut tx, id, &race.age).await?;

        let stored: Vec<Uuid> = existing.proficiencies.iter().map(|p| p.id).collect();
        let profs: Vec<Entry> = race.proficiencies.iter().map(Entry::from).collect();
        replace_dictionary_links(&mut tx, Link::Proficiencies, id, &stored, &profs).await?;

        let stored: Vec<Uuid> = existing.languages.iter().map(|l| l.id).collect();
        let langs: Vec<Entry> = race.languages.iter().map(Entry::from).collect();
        replace_dictionary_links(&mut tx, Link::Languages, id, &stored, &langs).await?;

        let stored: Vec<Uuid> = existing.traits.iter().map(|t| t.id).collect();
        let traits: Vec<Entry> = race.traits.iter().map(Entry::from).collect();
        replace_dictionary_links(&mut tx, Link::Traits, id, &stored, &traits).await?;

        replace_subraces(&mut tx, id, &existing.subraces, &race.subraces).await?;

        save_race_row(&mut tx, id, race).await?;

        let stored = load_race(&mut tx, id).await?;
        tx.commit().await?;
        tracing::info!(race_id = %id, name = %stored.name, "race updated");
        Ok(stored)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;
        if !race_exists(&mut tx, id).await? {
            return Err(race_not_found(id));
        }
        sqlx::query("DELETE FROM races WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(race_id = %id, "race deleted");
        Ok(())
    }

    async fn add_subrace(&self, race_id: Uuid, subrace: &Subrace) -> Result<Subrace, RepoError> {
        let mut conn = self.pool.acquire().await?;
        if !race_exists(&mut conn, race_id).await? {
            return Err(race_not_found(race_id));
        }
        check_subrace_ids(&mut conn, race_id, &[], std::slice::from_ref(subrace)).await?;
        let stored = insert_subrace(&mut conn, race_id, subrace).await?;
        tracing::info!(race_id = %race_id, subrace_id = %stored.id, "subrace added");
        Ok(stored)
    }

    async fn remove_subrace(&self, race_id: Uuid, subrace_id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM subraces WHERE id = $1 AND race_id = $2")
            .bind(subrace_id)
            .bind(race_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!(
                "subrace with ID {} not found for race ID {}",
                subrace_id, race_id
            )));
        }
        tracing::info!(race_id = %race_id, subrace_id = %subrace_id, "subrace removed");
        Ok(())
    }

    async fn add_trait(&self, race_id: Uuid, trait_id: Uuid) -> Result<(), RepoError> {
        let mut conn = self.pool.acquire().await?;
        if !race_exists(&mut conn, race_id).await? {
            return Err(race_not_found(race_id));
        }
        if !trait_exists(&mut conn, trait_id).await? {
            return Err(RepoError::NotFound(format!("trait with ID {} not found", trait_id)));
        }
        sqlx::query("INSERT INTO race_traits (race_id, trait_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(race_id)
            .bind(trait_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn remove_trait(&self, race_id: Uuid, trait_id: Uuid) -> Result<(), RepoError> {
        let mut conn = self.pool.acquire().await?;
        if !race_exists(&mut conn, race_id).await? {
            return Err(race_not_found(race_id));
        }
        if !trait_exists(&mut conn, trait_id).await? {
            return Err(RepoError::NotFound(format!("trait with ID {} not found", trait_id)));
        }
        sqlx::query("DELETE FROM race_traits WHERE race_id = $1 AND trait_id = $2")
            .bind(race_id)
            .bind(trait_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn search(&self, criteria: &HashMap<String, String>) -> Result<Vec<Race>, RepoError> {
        let filters = parse_criteria(criteria)?;
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {} FROM races", RACE_COLUMNS));
        for (i, filter) in filters.into_iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match filter {
                Criterion::Size(v) => {
                    qb.push("size = ").push_bind(v);
                }
                Criterion::Speed(n) => {
                    qb.push("speed = ").push_bind(n);
                }
                Criterion::Alignment(v) => {
                    qb.push("alignment = ").push_bind(v);
                }
            }
        }
        qb.push(" ORDER BY name");
        tracing::debug!(sql = %qb.sql(), "search races");

        let mut conn = self.pool.acquire().await?;
        let rows: Vec<RaceRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
        expand(&mut conn, rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_allowed_criteria_in_key_order() {
        let parsed = parse_criteria(&criteria(&[("speed", "30"), ("alignment", "Lawful good"), ("size", "Medium")])).unwrap();
        assert_eq!(
            parsed,
            vec![
                Criterion::Alignment("Lawful good".into()),
                Criterion::Size("Medium".into()),
                Criterion::Speed(30),
            ]
        );
    }

    #[test]
    fn rejects_unknown_criteria() {
        let err = parse_criteria(&criteria(&[("size", "Small"), ("unknown", "x")])).unwrap_err();
        assert_eq!(err.to_string(), "unknown search criteria: unknown");
    }

    #[test]
    fn rejects_non_numeric_speed() {
        let err = parse_criteria(&criteria(&[("speed", "fast")])).unwrap_err();
        assert!(matches!(err, RepoError::InvalidCriteria { ref key, .. } if key == "speed"));
    }

    #[test]
    fn link_tables_line_up() {
        for link in [Link::Proficiencies, Link::Languages, Link::Traits] {
            assert!(link.junction().starts_with("race_"));
            assert!(link.junction().ends_with(link.dictionary()));
            assert!(link.column().starts_with(link.noun()));
        }
    }
}
