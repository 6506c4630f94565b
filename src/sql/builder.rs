//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from model schemes.

use crate::config::{FieldType, ModelScheme, FIELD_CREATED_AT, FIELD_DELETED_AT, FIELD_UPDATED_AT};
use serde_json::Value;
use std::collections::HashMap;

/// Column alias carrying the owning row's key in [`select_via_intermediate`].
pub const OWNER_KEY_ALIAS: &str = "__owner_key";

/// Quote identifier for PostgreSQL (safe: only from declarations).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Clone, Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        Self::default()
    }

    /// Binds `v` and returns its placeholder with the given cast.
    fn push_param(&mut self, v: Value, cast: &str) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), cast)
    }
}

/// Sort direction per field, in priority order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
}

/// Join table of a belongs-to-many relationship, seen from the owning side.
#[derive(Clone, Copy, Debug)]
pub struct IntermediateTable<'a> {
    pub table: &'a str,
    /// Column pointing at the owning model.
    pub owner_key: &'a str,
    pub owner_cast: &'static str,
    /// Column pointing at the related model.
    pub target_key: &'a str,
    pub target_cast: &'static str,
}

fn select_column_list(model: &ModelScheme, alias: Option<&str>) -> String {
    model
        .columns
        .iter()
        .map(|c| match alias {
            Some(a) => format!("{}.{}", a, quoted(&c.name)),
            None => quoted(&c.name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn pk_cast(model: &ModelScheme) -> &'static str {
    model.pk_type.cast()
}

/// SELECT by primary key.
pub fn select_by_id(model: &ModelScheme, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.clone(), pk_cast(model));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(model, None),
        quoted(&model.table),
        quoted(&model.primary_key),
        ph
    );
    q
}

/// SELECT list with exact-match filters, ORDER BY the sort fields then pk, LIMIT/OFFSET.
/// Filters and sort fields naming unknown columns are skipped.
pub fn select_list(
    model: &ModelScheme,
    filters: &[(String, Value)],
    sort: &[SortField],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();

    let mut where_parts = Vec::new();
    for (col, val) in filters {
        let Some(c) = model.column(col) else { continue };
        let ph = q.push_param(val.clone(), c.cast());
        where_parts.push(format!("{} = {}", quoted(col), ph));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };

    let mut order_parts: Vec<String> = sort
        .iter()
        .filter(|s| model.has_column(&s.field))
        .map(|s| format!("{} {}", quoted(&s.field), if s.descending { "DESC" } else { "ASC" }))
        .collect();
    if !sort.iter().any(|s| s.field == model.primary_key) {
        order_parts.push(quoted(&model.primary_key));
    }

    let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}{}",
        select_column_list(model, None),
        quoted(&model.table),
        where_clause,
        order_parts.join(", "),
        limit_clause,
        offset_clause
    );
    q
}

/// SELECT rows WHERE column IN (...) ORDER BY pk. Used for batch-loading related rows.
pub fn select_by_column_in(model: &ModelScheme, column: &str, values: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols = select_column_list(model, None);
    let table = quoted(&model.table);
    if values.is_empty() {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, table);
        return q;
    }
    let cast = model.column(column).map(|c| c.cast()).unwrap_or("text");
    let placeholders: Vec<String> = values.iter().map(|v| q.push_param(v.clone(), cast)).collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}",
        cols,
        table,
        quoted(column),
        placeholders.join(", "),
        quoted(&model.primary_key)
    );
    q
}

/// Related rows of a belongs-to-many relationship for several owners at once.
/// Each row carries the owner's key under [`OWNER_KEY_ALIAS`].
pub fn select_via_intermediate(target: &ModelScheme, link: IntermediateTable<'_>, owner_ids: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols = select_column_list(target, Some("t"));
    let from = format!(
        "{} t JOIN {} i ON i.{} = t.{}",
        quoted(&target.table),
        quoted(link.table),
        quoted(link.target_key),
        quoted(&target.primary_key)
    );
    if owner_ids.is_empty() {
        q.sql = format!("SELECT {}, NULL AS {} FROM {} WHERE 1 = 0", cols, quoted(OWNER_KEY_ALIAS), from);
        return q;
    }
    let placeholders: Vec<String> = owner_ids
        .iter()
        .map(|v| q.push_param(v.clone(), link.owner_cast))
        .collect();
    q.sql = format!(
        "SELECT {}, i.{} AS {} FROM {} WHERE i.{} IN ({}) ORDER BY t.{}",
        cols,
        quoted(link.owner_key),
        quoted(OWNER_KEY_ALIAS),
        from,
        quoted(link.owner_key),
        placeholders.join(", "),
        quoted(&target.primary_key)
    );
    q
}

/// INSERT the body's known columns. The primary key is only written when `include_pk`.
pub fn insert(model: &ModelScheme, body: &HashMap<String, Value>, include_pk: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &model.columns {
        if c.is_pk && !include_pk {
            continue;
        }
        let Some(val) = body.get(&c.name) else { continue };
        placeholders.push(q.push_param(val.clone(), c.cast()));
        cols.push(quoted(&c.name));
    }
    let returning = select_column_list(model, None);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", quoted(&model.table), returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quoted(&model.table),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// Moves the SERIAL sequence past the largest stored key, after a client supplied one.
/// `None` for keys without a sequence.
pub fn sync_key_sequence(model: &ModelScheme) -> Option<QueryBuf> {
    if model.pk_type != FieldType::Int {
        return None;
    }
    let mut q = QueryBuf::new();
    let table = q.push_param(Value::String(quoted(&model.table)), "text");
    let column = q.push_param(Value::String(model.primary_key.clone()), "text");
    q.sql = format!(
        "SELECT setval(pg_get_serial_sequence({}, {}), GREATEST((SELECT MAX({}) FROM {}), 1))",
        table,
        column,
        quoted(&model.primary_key),
        quoted(&model.table)
    );
    Some(q)
}

/// UPDATE by id: SET only known, non-key columns present in body.
/// With nothing to set this degrades to a SELECT of the row.
pub fn update(model: &ModelScheme, id: &Value, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &model.columns {
        if c.is_pk {
            continue;
        }
        let Some(v) = body.get(&c.name) else { continue };
        let ph = q.push_param(v.clone(), c.cast());
        sets.push(format!("{} = {}", quoted(&c.name), ph));
    }
    if sets.is_empty() {
        return select_by_id(model, id);
    }
    let id_ph = q.push_param(id.clone(), pk_cast(model));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        quoted(&model.table),
        sets.join(", "),
        quoted(&model.primary_key),
        id_ph,
        select_column_list(model, None)
    );
    q
}

/// DELETE by id.
pub fn delete(model: &ModelScheme, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.clone(), pk_cast(model));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        quoted(&model.table),
        quoted(&model.primary_key),
        ph,
        quoted(&model.primary_key)
    );
    q
}

fn intermediate_cast(column: &str) -> &'static str {
    match column {
        FIELD_CREATED_AT | FIELD_UPDATED_AT | FIELD_DELETED_AT => "timestamp",
        _ => "text",
    }
}

/// INSERT one intermediate row; `extra` holds additional columns such as timestamps.
pub fn insert_intermediate(
    link: IntermediateTable<'_>,
    owner_id: &Value,
    target_id: &Value,
    extra: &[(String, Value)],
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = vec![quoted(link.owner_key), quoted(link.target_key)];
    let mut placeholders = vec![
        q.push_param(owner_id.clone(), link.owner_cast),
        q.push_param(target_id.clone(), link.target_cast),
    ];
    for (col, v) in extra {
        cols.push(quoted(col));
        placeholders.push(q.push_param(v.clone(), intermediate_cast(col)));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted(link.table),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// DELETE every intermediate row of one owner.
pub fn delete_intermediate(link: IntermediateTable<'_>, owner_id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(owner_id.clone(), link.owner_cast);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        quoted(link.table),
        quoted(link.owner_key),
        ph
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::blog_model;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn list_filters_sorts_and_pages() {
        let model = blog_model();
        let posts = model.models.model("post").unwrap();
        let q = select_list(
            posts,
            &[("title".into(), json!("Hi")), ("nope".into(), json!(1))],
            &[SortField {
                field: "created_at".into(),
                descending: true,
            }],
            Some(11),
            Some(20),
        );
        assert_eq!(
            q.sql,
            "SELECT \"id_post\", \"id_board_fk\", \"id_user_fk\", \"title\", \"text\", \"created_at\", \"updated_at\", \"deleted_at\" \
             FROM \"posts\" WHERE \"title\" = $1::text ORDER BY \"created_at\" DESC, \"id_post\" LIMIT 11 OFFSET 20"
        );
        assert_eq!(q.params, vec![json!("Hi")]);
    }

    #[test]
    fn insert_skips_pk_and_absent_columns() {
        let model = blog_model();
        let boards = model.models.model("board").unwrap();
        let body: HashMap<String, Value> = [
            ("id_board".to_string(), json!(7)),
            ("title".to_string(), json!("News")),
            ("created_at".to_string(), json!("2016-01-01 00:00:00")),
        ]
        .into_iter()
        .collect();
        let q = insert(boards, &body, false);
        assert_eq!(
            q.sql,
            "INSERT INTO \"boards\" (\"title\", \"created_at\") VALUES ($1::text, $2::timestamp) \
             RETURNING \"id_board\", \"title\", \"created_at\", \"updated_at\", \"deleted_at\""
        );
        let q = insert(boards, &body, true);
        assert!(q.sql.starts_with("INSERT INTO \"boards\" (\"id_board\", \"title\", \"created_at\")"));
        assert_eq!(q.params[0], json!(7));
    }

    #[test]
    fn serial_keys_get_their_sequence_synced() {
        let model = blog_model();
        let q = sync_key_sequence(model.models.model("board").unwrap()).unwrap();
        assert_eq!(
            q.sql,
            "SELECT setval(pg_get_serial_sequence($1::text, $2::text), \
             GREATEST((SELECT MAX(\"id_board\") FROM \"boards\"), 1))"
        );
        assert_eq!(q.params, vec![json!("\"boards\""), json!("id_board")]);
    }

    #[test]
    fn update_without_columns_reads_row() {
        let model = blog_model();
        let boards = model.models.model("board").unwrap();
        let q = update(boards, &json!(3), &HashMap::new());
        assert!(q.sql.starts_with("SELECT "));
        assert_eq!(q.params, vec![json!(3)]);

        let body: HashMap<String, Value> = [("title".to_string(), json!("x"))].into_iter().collect();
        let q = update(boards, &json!(3), &body);
        assert!(q.sql.starts_with("UPDATE \"boards\" SET \"title\" = $1::text WHERE \"id_board\" = $2::integer"));
    }

    #[test]
    fn intermediate_rows_are_linked_by_owner() {
        let model = blog_model();
        let emotions = model.models.model("emotion").unwrap();
        let link = IntermediateTable {
            table: "comments_emotions",
            owner_key: "id_comment_fk",
            owner_cast: "integer",
            target_key: "id_emotion_fk",
            target_cast: "integer",
        };
        let q = select_via_intermediate(emotions, link, &[json!(1), json!(2)]);
        assert!(q.sql.contains("JOIN \"comments_emotions\" i ON i.\"id_emotion_fk\" = t.\"id_emotion\""));
        assert!(q.sql.contains("i.\"id_comment_fk\" AS \"__owner_key\""));
        assert!(q.sql.contains("WHERE i.\"id_comment_fk\" IN ($1::integer, $2::integer)"));

        let q = insert_intermediate(link, &json!(1), &json!(5), &[("created_at".into(), json!("2016-01-01 00:00:00"))]);
        assert_eq!(
            q.sql,
            "INSERT INTO \"comments_emotions\" (\"id_comment_fk\", \"id_emotion_fk\", \"created_at\") \
             VALUES ($1::integer, $2::integer, $3::timestamp)"
        );
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quoted("we\"ird"), "\"we\"\"ird\"");
    }
}
