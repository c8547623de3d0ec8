//! Opaque keyset cursors and page limits for list endpoints.
//!
//! A cursor carries the sort key and id of the last row on the previous page.
//! Lists fetch `limit + 1` rows so the presence of a further page is known
//! without a count query.

use crate::error::AppError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

/// Column alias carrying the text sort key as PostgreSQL computed it.
pub const SORT_KEY: &str = "sort_key";

/// A list row plus its database-computed text sort key. Text cursors are minted from
/// this value so the next page compares against exactly what the server ordered by.
#[derive(Debug)]
pub struct Keyed<T> {
    pub row: T,
    pub sort_key: String,
}

impl<'r, T> FromRow<'r, PgRow> for Keyed<T>
where
    T: FromRow<'r, PgRow>,
{
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Keyed {
            row: T::from_row(row)?,
            sort_key: row.try_get(SORT_KEY)?,
        })
    }
}

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    /// Sort key of the last row seen (string, number or null).
    #[serde(rename = "k")]
    pub key: Value,
    pub id: Uuid,
}

impl Cursor {
    pub fn new(key: impl Into<Value>, id: Uuid) -> Self {
        Cursor { key: key.into(), id }
    }

    pub fn encode(&self) -> String {
        // Serializing a Value and a Uuid cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(raw: &str) -> Result<Self, AppError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim())
            .map_err(|_| AppError::BadRequest("invalid cursor".into()))?;
        serde_json::from_slice(&bytes).map_err(|_| AppError::BadRequest("invalid cursor".into()))
    }

    /// Sort key as text; errors when the cursor was minted for a different sort.
    pub fn key_str(&self) -> Result<&str, AppError> {
        self.key
            .as_str()
            .ok_or_else(|| AppError::BadRequest("cursor does not match sort order".into()))
    }

    pub fn key_i64(&self) -> Result<i64, AppError> {
        self.key
            .as_i64()
            .ok_or_else(|| AppError::BadRequest("cursor does not match sort order".into()))
    }
}

/// Decode an optional `cursor` query parameter.
pub fn parse_cursor(raw: Option<&str>) -> Result<Option<Cursor>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Cursor::decode(s).map(Some),
        None => Ok(None),
    }
}

/// Clamp a requested page size to `1..=MAX_LIMIT`, defaulting to `DEFAULT_LIMIT`.
pub fn page_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Trim an over-fetched result (`limit + 1` rows) to `limit` and mint the next cursor
/// from the last kept row.
pub fn finish_page<T, F>(mut rows: Vec<T>, limit: i64, cursor_of: F) -> (Vec<T>, Option<String>)
where
    F: Fn(&T) -> Cursor,
{
    let limit = limit.max(0) as usize;
    if rows.len() <= limit {
        return (rows, None);
    }
    rows.truncate(limit);
    let next = rows.last().map(|row| cursor_of(row).encode());
    (rows, next)
}

/// `finish_page` over keyed rows, returning the bare rows.
pub fn finish_keyed_page<T, F>(rows: Vec<Keyed<T>>, limit: i64, cursor_of: F) -> (Vec<T>, Option<String>)
where
    F: Fn(&Keyed<T>) -> Cursor,
{
    let (rows, next) = finish_page(rows, limit, cursor_of);
    (rows.into_iter().map(|k| k.row).collect(), next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_page_cursor_uses_the_stored_key() {
        let keyed = |name: &'static str, key: &str| Keyed { row: (name, Uuid::new_v4()), sort_key: key.to_string() };
        // PostgreSQL lower() keeps a medial sigma where Rust would produce a final one.
        let rows = vec![keyed("Aalto", "aalto"), keyed("ΣΟΦΙΑΣ", "σοφιασ"), keyed("Zurich", "zurich")];
        let last_kept = rows[1].row.1;
        let (page, next) = finish_keyed_page(rows, 2, |k| Cursor::new(k.sort_key.clone(), k.row.1));
        assert_eq!(page.iter().map(|r| r.0).collect::<Vec<_>>(), vec!["Aalto", "ΣΟΦΙΑΣ"]);
        let cursor = Cursor::decode(&next.unwrap()).unwrap();
        assert_eq!(cursor.key_str().unwrap(), "σοφιασ");
        assert_eq!(cursor.id, last_kept);
    }

    #[test]
    fn cursor_survives_encoding() {
        let id = Uuid::new_v4();
        let cursor = Cursor::new("Oxford", id);
        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
        assert_eq!(decoded.key_str().unwrap(), "Oxford");
    }

    #[test]
    fn garbage_cursor_is_bad_request() {
        assert!(matches!(Cursor::decode("%%%"), Err(AppError::BadRequest(_))));
        let not_json = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(matches!(Cursor::decode(&not_json), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn numeric_cursor_rejects_text_access() {
        let cursor = Cursor::new(42, Uuid::nil());
        assert_eq!(cursor.key_i64().unwrap(), 42);
        assert!(cursor.key_str().is_err());
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(page_limit(None), DEFAULT_LIMIT);
        assert_eq!(page_limit(Some(0)), 1);
        assert_eq!(page_limit(Some(-5)), 1);
        assert_eq!(page_limit(Some(500)), MAX_LIMIT);
        assert_eq!(page_limit(Some(7)), 7);
    }

    #[test]
    fn empty_cursor_param_means_first_page() {
        assert_eq!(parse_cursor(None).unwrap(), None);
        assert_eq!(parse_cursor(Some("  ")).unwrap(), None);
    }

    #[test]
    fn finish_page_emits_cursor_only_when_more_rows_exist() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        let (rows, next) = finish_page(ids.clone(), 3, |id| Cursor::new(Value::Null, *id));
        assert_eq!(rows.len(), 3);
        assert!(next.is_none());

        let (rows, next) = finish_page(ids.clone(), 2, |id| Cursor::new(Value::Null, *id));
        assert_eq!(rows, ids[..2].to_vec());
        let next = Cursor::decode(&next.unwrap()).unwrap();
        assert_eq!(next.id, ids[1]);
    }
}
