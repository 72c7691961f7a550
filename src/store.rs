//! Relational schema bootstrap for the race catalog. All statements are idempotent
//! (`IF NOT EXISTS`), so this runs on every start.

use crate::error::{ErrorKind, ServiceError};
use crate::model::Size;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Unique index on race names; the service maps its violations to a duplicate-name error.
pub const RACE_NAME_CONSTRAINT: &str = "races_name_key";

fn size_check() -> String {
    let allowed: Vec<String> = Size::ALL.iter().map(|s| format!("'{}'", s.as_str())).collect();
    format!("CHECK (size IN ({}))", allowed.join(", "))
}

fn schema_statements() -> Vec<String> {
    let bonus_columns = "strength INTEGER NOT NULL DEFAULT 0,
                dexterity INTEGER NOT NULL DEFAULT 0,
                constitution INTEGER NOT NULL DEFAULT 0,
                intelligence INTEGER NOT NULL DEFAULT 0,
                wisdom INTEGER NOT NULL DEFAULT 0,
                charisma INTEGER NOT NULL DEFAULT 0";

    vec![
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS races (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL CONSTRAINT {} UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                {},
                size TEXT NOT NULL {},
                speed INTEGER NOT NULL CHECK (speed > 0),
                alignment TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            RACE_NAME_CONSTRAINT,
            bonus_columns,
            size_check()
        ),
        r#"
        CREATE TABLE IF NOT EXISTS ages (
            race_id UUID PRIMARY KEY REFERENCES races(id) ON UPDATE CASCADE ON DELETE CASCADE,
            average_lifespan TEXT NOT NULL,
            minimum_age INTEGER NOT NULL,
            maximum_age INTEGER NOT NULL,
            CHECK (maximum_age >= minimum_age)
        )
        "#
        .to_string(),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS subraces (
                id UUID PRIMARY KEY,
                race_id UUID NOT NULL REFERENCES races(id) ON UPDATE CASCADE ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                {}
            )
            "#,
            bonus_columns
        ),
        "CREATE INDEX IF NOT EXISTS subraces_race_id_idx ON subraces (race_id)".to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS proficiencies (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        )
        "#
        .to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS languages (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#
        .to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS traits (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        )
        "#
        .to_string(),
        junction_ddl("race_proficiencies", "proficiency_id", "proficiencies"),
        junction_ddl("race_languages", "language_id", "languages"),
        junction_ddl("race_traits", "trait_id", "traits"),
    ]
}

/// Junction rows disappear with either side.
fn junction_ddl(table: &str, column: &str, dictionary: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            race_id UUID NOT NULL REFERENCES races(id) ON DELETE CASCADE,
            {column} UUID NOT NULL REFERENCES {dictionary}(id) ON DELETE CASCADE,
            PRIMARY KEY (race_id, {column})
        )
        "#
    )
}

/// Create the race catalog tables if they do not exist yet.
pub async fn ensure_race_tables(pool: &PgPool) -> Result<(), ServiceError> {
    let statements = schema_statements();
    tracing::debug!(statements = statements.len(), "applying race schema");
    for ddl in statements {
        sqlx::query(&ddl)
            .execute(pool)
            .await
            .map_err(|e| ServiceError::wrap(ErrorKind::Migration, "failed to create race tables", e))?;
    }
    tracing::info!("race tables ready");
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), ServiceError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        tracing::debug!("no dedicated database in DATABASE_URL, skipping creation");
        return Ok(());
    }
    tracing::debug!(database = %db_name, "checking database exists");
    let migration = |e: sqlx::Error| ServiceError::wrap(ErrorKind::Migration, "failed to prepare database", e);
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| ServiceError::bad_request(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(migration)?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(migration)?;
    if !exists.0 {
        let quoted = quote_ident(&db_name);
        sqlx::query(&format!("CREATE DATABASE {}", quoted))
            .execute(&mut conn)
            .await
            .map_err(migration)?;
        tracing::info!(database = %db_name, "database created");
    } else {
        tracing::debug!(database = %db_name, "database already exists");
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), ServiceError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| ServiceError::bad_request("DATABASE_URL: no path"))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
