// Query builder for the video table
//
// Statements are assembled from typed columns only; every value goes through
// parameter binding.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::constants::SORTABLE_COLUMNS;

pub type SqlValue = Value;

/// Columns of the `video` table, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoColumn {
    Name,
    Path,
    Url,
    Ctime,
    Mtime,
    Size,
    ThumbnailPath,
    ThumbnailUrl,
}

impl VideoColumn {
    pub const ALL: [VideoColumn; 8] = [
        VideoColumn::Name,
        VideoColumn::Path,
        VideoColumn::Url,
        VideoColumn::Ctime,
        VideoColumn::Mtime,
        VideoColumn::Size,
        VideoColumn::ThumbnailPath,
        VideoColumn::ThumbnailUrl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VideoColumn::Name => "name",
            VideoColumn::Path => "path",
            VideoColumn::Url => "url",
            VideoColumn::Ctime => "ctime",
            VideoColumn::Mtime => "mtime",
            VideoColumn::Size => "size",
            VideoColumn::ThumbnailPath => "thumbnailPath",
            VideoColumn::ThumbnailUrl => "thumbnailUrl",
        }
    }

    /// Look up a column clients are allowed to sort by.
    pub fn sortable(name: &str) -> Option<Self> {
        if !SORTABLE_COLUMNS.contains(&name) {
            return None;
        }
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: VideoColumn,
    pub desc: bool,
}

impl OrderBy {
    pub fn asc(column: VideoColumn) -> Self {
        Self { column, desc: false }
    }

    pub fn desc(column: VideoColumn) -> Self {
        Self { column, desc: true }
    }
}

/// A statement plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySet {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QuerySet {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self { sql: sql.into(), params }
    }

    pub fn execute(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(&self.sql, params_from_iter(self.params.iter()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    pub filter: Option<QuerySet>,
    pub order_by: Vec<OrderBy>,
    /// Negative values omit the clause.
    pub limit: Option<i64>,
    /// Negative values omit the clause.
    pub offset: Option<i64>,
}

impl SelectOptions {
    /// All rows, most recently modified first.
    pub fn recent_first() -> Self {
        Self {
            order_by: vec![OrderBy::desc(VideoColumn::Mtime)],
            ..Self::default()
        }
    }
}

/// Comma-separated placeholders: `marks(3) == "?,?,?"`.
pub fn marks(count: usize) -> String {
    vec!["?"; count].join(",")
}

fn column_list() -> String {
    VideoColumn::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn build_select(table: &str, options: &SelectOptions) -> QuerySet {
    let mut sql = format!("SELECT {} FROM {}", column_list(), table);
    let mut params = Vec::new();

    if let Some(filter) = &options.filter {
        sql.push_str(" WHERE ");
        sql.push_str(&filter.sql);
        params.extend(filter.params.iter().cloned());
    }

    if !options.order_by.is_empty() {
        let order = options
            .order_by
            .iter()
            .map(|o| format!("{}{}", o.column.as_str(), if o.desc { " DESC" } else { "" }))
            .collect::<Vec<_>>()
            .join(",");
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);
    }

    let limit = options.limit.filter(|l| *l >= 0);
    let offset = options.offset.filter(|o| *o >= 0);

    match limit {
        Some(l) => {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(l));
        }
        // SQLite only accepts OFFSET after a LIMIT
        None if offset.is_some() => sql.push_str(" LIMIT -1"),
        None => {}
    }

    if let Some(o) = offset {
        sql.push_str(" OFFSET ?");
        params.push(Value::Integer(o));
    }

    QuerySet::new(sql, params)
}

/// Multi-row upsert keyed on `path`. Each row holds one value per
/// `VideoColumn::ALL` entry. Existing thumbnails survive a refresh that
/// carries none.
pub fn build_insert(table: &str, rows: &[Vec<SqlValue>]) -> Option<QuerySet> {
    if rows.is_empty() {
        return None;
    }

    let row_marks = format!("({})", marks(VideoColumn::ALL.len()));
    let values = vec![row_marks.as_str(); rows.len()].join(",");

    let sql = format!(
        "INSERT INTO {table} ({cols}) VALUES {values} \
         ON CONFLICT(path) DO UPDATE SET \
         name=excluded.name, url=excluded.url, ctime=excluded.ctime, \
         mtime=excluded.mtime, size=excluded.size, \
         thumbnailPath=COALESCE(excluded.thumbnailPath, {table}.thumbnailPath), \
         thumbnailUrl=COALESCE(excluded.thumbnailUrl, {table}.thumbnailUrl)",
        table = table,
        cols = column_list(),
        values = values,
    );

    let params = rows.iter().flat_map(|r| r.iter().cloned()).collect();
    Some(QuerySet::new(sql, params))
}

/// Split rows into upsert statements of at most `chunk_size` rows each.
pub fn build_insert_chunks(table: &str, rows: &[Vec<SqlValue>], chunk_size: usize) -> Vec<QuerySet> {
    rows.chunks(chunk_size.max(1))
        .filter_map(|chunk| build_insert(table, chunk))
        .collect()
}

pub fn build_update(table: &str, assignments: &[(VideoColumn, SqlValue)], filter: &QuerySet) -> QuerySet {
    let set = assignments
        .iter()
        .map(|(c, _)| format!("{}=?", c.as_str()))
        .collect::<Vec<_>>()
        .join(",");

    let mut params: Vec<SqlValue> = assignments.iter().map(|(_, v)| v.clone()).collect();
    params.extend(filter.params.iter().cloned());

    QuerySet::new(format!("UPDATE {} SET {} WHERE {}", table, set, filter.sql), params)
}

pub fn build_delete(table: &str, filter: &QuerySet) -> QuerySet {
    QuerySet::new(
        format!("DELETE FROM {} WHERE {}", table, filter.sql),
        filter.params.clone(),
    )
}

pub fn path_equals(path: &str) -> QuerySet {
    QuerySet::new("path=?", vec![Value::Text(path.to_string())])
}

pub fn path_in(paths: &[String]) -> QuerySet {
    QuerySet::new(
        format!("path IN ({})", marks(paths.len())),
        paths.iter().map(|p| Value::Text(p.clone())).collect(),
    )
}
