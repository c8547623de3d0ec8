//! Builds parameterized SELECTs with optional filters, text search and keyset pagination.
//! Column expressions come from code only; request values always travel as parameters.

use crate::pagination::Cursor;
use crate::sql::PgBindValue;

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

/// Sort direction for keyset pagination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn keyword(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    fn comparator(self) -> &'static str {
        match self {
            Direction::Asc => ">",
            Direction::Desc => "<",
        }
    }
}

/// Keyset ordering: a sort expression with its SQL cast, plus the unique id column as tiebreaker.
#[derive(Clone, Debug)]
pub struct KeysetOrder {
    pub key_expr: String,
    /// Cast applied to the cursor placeholder (e.g. `text`, `int8`, `timestamptz`).
    pub key_cast: &'static str,
    pub id_expr: String,
    pub direction: Direction,
}

impl KeysetOrder {
    pub fn new(key_expr: impl Into<String>, key_cast: &'static str, id_expr: impl Into<String>, direction: Direction) -> Self {
        KeysetOrder {
            key_expr: key_expr.into(),
            key_cast,
            id_expr: id_expr.into(),
            direction,
        }
    }
}

/// Incremental SELECT builder. Placeholders are numbered in push order.
pub struct SelectBuilder {
    base: String,
    wheres: Vec<String>,
    params: Vec<PgBindValue>,
    group_by: Option<String>,
    order: Option<String>,
    limit: Option<i64>,
}

impl SelectBuilder {
    /// `base` is everything up to (not including) WHERE, e.g. `SELECT ... FROM t`.
    pub fn new(base: impl Into<String>) -> Self {
        SelectBuilder {
            base: base.into(),
            wheres: Vec::new(),
            params: Vec::new(),
            group_by: None,
            order: None,
            limit: None,
        }
    }

    /// Register a parameter and return its placeholder (`$n`).
    pub fn push_param(&mut self, v: impl Into<PgBindValue>) -> String {
        self.params.push(v.into());
        format!("${}", self.params.len())
    }

    /// Add a raw predicate with no parameters.
    pub fn and_where(&mut self, predicate: impl Into<String>) -> &mut Self {
        self.wheres.push(predicate.into());
        self
    }

    /// Add a predicate where every `?` is replaced by the placeholder for `value`.
    pub fn and_where_param(&mut self, template: &str, value: impl Into<PgBindValue>) -> &mut Self {
        let ph = self.push_param(value);
        self.wheres.push(template.replace('?', &ph));
        self
    }

    /// `expr = $n` when `value` is present.
    pub fn filter_eq<V: Into<PgBindValue>>(&mut self, expr: &str, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.and_where_param(&format!("{} = ?", expr), v);
        }
        self
    }

    /// Case-insensitive substring match across `exprs` (OR-ed). Blank terms are ignored.
    pub fn search(&mut self, exprs: &[&str], term: Option<&str>) -> &mut Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        let ph = self.push_param(format!("%{}%", escape_like(term)));
        let ors: Vec<String> = exprs
            .iter()
            .map(|e| format!("{} ILIKE {} ESCAPE '\\'", e, ph))
            .collect();
        self.wheres.push(format!("({})", ors.join(" OR ")));
        self
    }

    /// Apply keyset ordering; when a cursor is given, only rows strictly after it are kept.
    pub fn keyset(&mut self, order: &KeysetOrder, after: Option<(PgBindValue, uuid::Uuid)>) -> &mut Self {
        if let Some((key, id)) = after {
            let key_ph = self.push_param(key);
            let id_ph = self.push_param(id);
            self.wheres.push(format!(
                "({}, {}) {} ({}::{}, {}::uuid)",
                order.key_expr,
                order.id_expr,
                order.direction.comparator(),
                key_ph,
                order.key_cast,
                id_ph
            ));
        }
        let dir = order.direction.keyword();
        self.order = Some(format!("{} {}, {} {}", order.key_expr, dir, order.id_expr, dir));
        self
    }

    pub fn order_by(&mut self, clause: impl Into<String>) -> &mut Self {
        self.order = Some(clause.into());
        self
    }

    pub fn group_by(&mut self, clause: impl Into<String>) -> &mut Self {
        self.group_by = Some(clause.into());
        self
    }

    pub fn limit(&mut self, n: i64) -> &mut Self {
        self.limit = Some(n);
        self
    }

    pub fn build(self) -> QueryBuf {
        let mut sql = self.base;
        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.wheres.join(" AND "));
        }
        if let Some(g) = self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(&g);
        }
        if let Some(o) = self.order {
            sql.push_str(" ORDER BY ");
            sql.push_str(&o);
        }
        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }
        QueryBuf {
            sql,
            params: self.params,
        }
    }
}

/// Escape LIKE wildcards so user input matches literally.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split a decoded cursor into bind values for `SelectBuilder::keyset`, using the
/// cursor key as text.
pub fn text_after(cursor: Option<&Cursor>) -> Result<Option<(PgBindValue, uuid::Uuid)>, crate::error::AppError> {
    cursor
        .map(|c| Ok((PgBindValue::String(c.key_str()?.to_string()), c.id)))
        .transpose()
}

/// As `text_after`, with an integer sort key.
pub fn int_after(cursor: Option<&Cursor>) -> Result<Option<(PgBindValue, uuid::Uuid)>, crate::error::AppError> {
    cursor
        .map(|c| Ok((PgBindValue::I64(c.key_i64()?), c.id)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn empty_builder_is_just_the_base() {
        let q = SelectBuilder::new("SELECT id FROM universities").build();
        assert_eq!(q.sql, "SELECT id FROM universities");
        assert!(q.params.is_empty());
    }

    #[test]
    fn filters_are_numbered_in_order() {
        let mut b = SelectBuilder::new("SELECT id FROM courses");
        b.filter_eq("level", Some("master"))
            .filter_eq::<i64>("duration_months", None)
            .and_where_param("tuition_fee <= ?", 20_000_i64);
        let q = b.build();
        assert_eq!(q.sql, "SELECT id FROM courses WHERE level = $1 AND tuition_fee <= $2");
        assert_eq!(q.params, vec![PgBindValue::from("master"), PgBindValue::I64(20_000)]);
    }

    #[test]
    fn search_reuses_one_placeholder_and_escapes_wildcards() {
        let mut b = SelectBuilder::new("SELECT id FROM universities");
        b.search(&["name", "city"], Some(" 100%_sure "));
        let q = b.build();
        assert_eq!(
            q.sql,
            "SELECT id FROM universities WHERE (name ILIKE $1 ESCAPE '\\' OR city ILIKE $1 ESCAPE '\\')"
        );
        assert_eq!(q.params, vec![PgBindValue::from("%100\\%\\_sure%")]);
    }

    #[test]
    fn blank_search_is_ignored() {
        let mut b = SelectBuilder::new("SELECT 1");
        b.search(&["name"], Some("   "));
        assert_eq!(b.build().sql, "SELECT 1");
    }

    #[test]
    fn keyset_after_cursor_adds_row_comparison() {
        let id = Uuid::nil();
        let order = KeysetOrder::new("lower(u.name)", "text", "u.id", Direction::Asc);
        let mut b = SelectBuilder::new("SELECT u.id FROM universities u");
        b.filter_eq("u.country", Some("Canada"))
            .keyset(&order, Some((PgBindValue::from("mcgill"), id)))
            .limit(21);
        let q = b.build();
        assert_eq!(
            q.sql,
            "SELECT u.id FROM universities u WHERE u.country = $1 AND (lower(u.name), u.id) > ($2::text, $3::uuid) \
             ORDER BY lower(u.name) ASC, u.id ASC LIMIT 21"
        );
        assert_eq!(q.params.len(), 3);
    }

    #[test]
    fn descending_keyset_compares_downwards() {
        let order = KeysetOrder::new("created_at", "timestamptz", "id", Direction::Desc);
        let mut b = SelectBuilder::new("SELECT id FROM applications");
        b.keyset(&order, Some((PgBindValue::from("2024-01-01T00:00:00Z"), Uuid::nil())));
        let q = b.build();
        assert!(q.sql.contains("(created_at, id) < ($1::timestamptz, $2::uuid)"));
        assert!(q.sql.ends_with("ORDER BY created_at DESC, id DESC"));
    }

    #[test]
    fn cursor_key_kind_must_match_sort() {
        let c = Cursor::new("x", Uuid::nil());
        assert!(int_after(Some(&c)).is_err());
        assert!(text_after(Some(&c)).unwrap().is_some());
        assert!(text_after(None).unwrap().is_none());
    }
}
