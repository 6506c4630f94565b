//! Create and drop the tables behind the resolved models.
//!
//! Model tables are created in foreign key order with belongs-to keys declared
//! inline; belongs-to-many intermediate tables follow. Rollback drops them in
//! reverse.

use crate::config::{ColumnInfo, FieldType, ModelScheme, RelationshipKind, ResolvedModel, FIELD_CREATED_AT};
use crate::error::{AppError, ConfigError};
use crate::sql::quoted;
use sqlx::{ConnectOptions, PgPool};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

/// Models sorted so that every belongs-to target precedes the model pointing at it.
fn creation_order(model: &ResolvedModel) -> Result<Vec<&ModelScheme>, ConfigError> {
    let by_id: BTreeMap<&str, &ModelScheme> = model.models.models().map(|m| (m.id.as_str(), m)).collect();
    let mut done: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(by_id.len());
    while out.len() < by_id.len() {
        let before = out.len();
        for (id, m) in &by_id {
            if done.contains(id) {
                continue;
            }
            let ready = m
                .relationships
                .iter()
                .filter(|r| r.kind == RelationshipKind::BelongsTo && r.model != m.id)
                .all(|r| done.contains(r.model.as_str()));
            if ready {
                done.insert(*id);
                out.push(*m);
            }
        }
        if out.len() == before {
            let rest: Vec<&str> = by_id.keys().filter(|id| !done.contains(*id)).copied().collect();
            return Err(ConfigError::Validation(format!(
                "belongs_to cycle between models: {}",
                rest.join(", ")
            )));
        }
    }
    Ok(out)
}

fn column_def(column: &ColumnInfo, references: &HashMap<&str, (&str, &str)>) -> String {
    if column.is_pk {
        let def = match column.field_type {
            FieldType::Int => "SERIAL".to_string(),
            FieldType::Uuid => "UUID DEFAULT gen_random_uuid()".to_string(),
            other => other.pg_type(column.length),
        };
        return format!("{} {} PRIMARY KEY", quoted(&column.name), def);
    }
    let mut def = format!("{} {}", quoted(&column.name), column.field_type.pg_type(column.length));
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if column.unique {
        def.push_str(" UNIQUE");
    }
    if let Some((table, pk)) = references.get(column.name.as_str()) {
        def.push_str(&format!(" REFERENCES {} ({})", quoted(table), quoted(pk)));
    }
    def
}

/// Foreign key columns of `model` -> (target table, target key).
fn belongs_to_references<'a>(model: &'a ResolvedModel, scheme: &'a ModelScheme) -> HashMap<&'a str, (&'a str, &'a str)> {
    scheme
        .relationships
        .iter()
        .filter(|r| r.kind == RelationshipKind::BelongsTo)
        .filter_map(|r| {
            let target = model.models.model(&r.model)?;
            Some((r.foreign_key.as_str(), (target.table.as_str(), target.primary_key.as_str())))
        })
        .collect()
}

/// One table per belongs-to-many pair, declared from the side that comes first in `order`
/// (models without pending belongs-to dependencies, alphabetical by id within each pass).
fn intermediate_tables(model: &ResolvedModel, order: &[&ModelScheme]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for owner in order {
        for rel in owner.relationships.iter().filter(|r| r.kind == RelationshipKind::BelongsToMany) {
            let (Some(table), Some(target_key), Some(target)) = (
                rel.intermediate_table.as_deref(),
                rel.reverse_foreign_key.as_deref(),
                model.models.model(&rel.model),
            ) else {
                continue;
            };
            if !seen.insert(table) {
                continue;
            }
            out.push(format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n  {owner_key} {owner_type} NOT NULL REFERENCES {owner_table} ({owner_pk}) ON DELETE CASCADE,\n  {target_key} {target_type} NOT NULL REFERENCES {target_table} ({target_pk}) ON DELETE CASCADE,\n  {created} TIMESTAMP,\n  PRIMARY KEY ({owner_key}, {target_key})\n)",
                table = quoted(table),
                owner_key = quoted(&rel.foreign_key),
                owner_type = owner.pk_type.pg_type(None),
                owner_table = quoted(&owner.table),
                owner_pk = quoted(&owner.primary_key),
                target_key = quoted(target_key),
                target_type = target.pk_type.pg_type(None),
                target_table = quoted(&target.table),
                target_pk = quoted(&target.primary_key),
                created = quoted(FIELD_CREATED_AT),
            ));
        }
    }
    out
}

/// DDL for every model table followed by the intermediate tables.
pub fn create_statements(model: &ResolvedModel) -> Result<Vec<String>, ConfigError> {
    let order = creation_order(model)?;
    let mut out = Vec::with_capacity(order.len());
    for scheme in &order {
        let references = belongs_to_references(model, scheme);
        let mut cols: Vec<&ColumnInfo> = scheme.columns.iter().collect();
        cols.sort_by_key(|c| !c.is_pk);
        let defs: Vec<String> = cols.iter().map(|c| column_def(c, &references)).collect();
        out.push(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            quoted(&scheme.table),
            defs.join(",\n  ")
        ));
    }
    out.extend(intermediate_tables(model, &order));
    Ok(out)
}

/// Drops intermediate tables, then model tables in reverse creation order.
pub fn drop_statements(model: &ResolvedModel) -> Result<Vec<String>, ConfigError> {
    let order = creation_order(model)?;
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for scheme in order.iter().rev() {
        for rel in scheme.relationships.iter().filter(|r| r.kind == RelationshipKind::BelongsToMany) {
            if let Some(table) = rel.intermediate_table.as_deref() {
                if seen.insert(table) {
                    out.push(format!("DROP TABLE IF EXISTS {}", quoted(table)));
                }
            }
        }
    }
    out.extend(order.iter().rev().map(|m| format!("DROP TABLE IF EXISTS {}", quoted(&m.table))));
    Ok(out)
}

pub async fn migrate(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    let statements = create_statements(model)?;
    let mut tx = pool.begin().await?;
    for sql in &statements {
        tracing::debug!(sql = %sql, "migrate");
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(statements = statements.len(), "migrations applied");
    Ok(())
}

pub async fn rollback(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    let statements = drop_statements(model)?;
    let mut tx = pool.begin().await?;
    for sql in &statements {
        tracing::debug!(sql = %sql, "rollback");
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(statements = statements.len(), "migrations rolled back");
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_database_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| ConfigError::Validation(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Returns (URL of the `postgres` database on the same server, database name).
fn split_database_url(url: &str) -> Result<(String, String), ConfigError> {
    let (location, query) = match url.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (url, None),
    };
    let (base, db_name) = location
        .rsplit_once('/')
        .ok_or_else(|| ConfigError::Validation("DATABASE_URL: no path".into()))?;
    let admin = match query {
        Some(query) => format!("{}/postgres?{}", base, query),
        None => format!("{}/postgres", base),
    };
    Ok((admin, db_name.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::blog_model;
    use pretty_assertions::assert_eq;

    fn table_position(statements: &[String], table: &str) -> usize {
        let needle = format!("CREATE TABLE IF NOT EXISTS \"{}\"", table);
        statements.iter().position(|s| s.starts_with(&needle)).unwrap()
    }

    #[test]
    fn referenced_tables_come_first() {
        let statements = create_statements(&blog_model()).unwrap();
        assert_eq!(statements.len(), 7);
        assert!(table_position(&statements, "roles") < table_position(&statements, "users"));
        assert!(table_position(&statements, "boards") < table_position(&statements, "posts"));
        assert!(table_position(&statements, "posts") < table_position(&statements, "comments"));
        assert_eq!(table_position(&statements, "comments_emotions"), 6);
    }

    #[test]
    fn column_definitions() {
        let statements = create_statements(&blog_model()).unwrap();
        let posts = &statements[table_position(&statements, "posts")];
        assert!(posts.contains("\"id_post\" SERIAL PRIMARY KEY"));
        assert!(posts.contains("\"id_board_fk\" INTEGER NOT NULL REFERENCES \"boards\" (\"id_board\")"));
        assert!(posts.contains("\"created_at\" TIMESTAMP"));
        let emotions = &statements[table_position(&statements, "emotions")];
        assert!(emotions.contains("\"name\" VARCHAR(255) UNIQUE"));
        let link = &statements[table_position(&statements, "comments_emotions")];
        assert!(link.contains("\"id_comment_fk\" INTEGER NOT NULL REFERENCES \"comments\" (\"id_comment\") ON DELETE CASCADE"));
        assert!(link.contains("\"id_emotion_fk\" INTEGER NOT NULL REFERENCES \"emotions\" (\"id_emotion\") ON DELETE CASCADE"));
        // emotion has no belongs-to dependencies, so it is created before comment and owns the link
        assert!(link.contains("PRIMARY KEY (\"id_emotion_fk\", \"id_comment_fk\")"));
    }

    #[test]
    fn rollback_drops_links_first_then_dependents() {
        let statements = drop_statements(&blog_model()).unwrap();
        assert_eq!(statements[0], "DROP TABLE IF EXISTS \"comments_emotions\"");
        let pos = |t: &str| {
            statements
                .iter()
                .position(|s| s == &format!("DROP TABLE IF EXISTS \"{}\"", t))
                .unwrap()
        };
        assert!(pos("comments") < pos("posts"));
        assert!(pos("users") < pos("roles"));
    }

    #[test]
    fn database_url_split() {
        let (admin, name) = split_database_url("postgres://u:p@localhost:5432/blog?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres?sslmode=disable");
        assert_eq!(name, "blog");
        let (admin, _) = split_database_url("postgres://localhost/blog?sslrootcert=/etc/ca.pem").unwrap();
        assert_eq!(admin, "postgres://localhost/postgres?sslrootcert=/etc/ca.pem");
        let (admin, name) = split_database_url("postgres://localhost/blog").unwrap();
        assert_eq!(admin, "postgres://localhost/postgres");
        assert_eq!(name, "blog");
    }
}
