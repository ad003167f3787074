// Video rows and their queries

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::query::{
    build_delete, build_insert_chunks, build_select, build_update, path_equals, path_in,
    SelectOptions, VideoColumn,
};
use crate::constants::{DELETE_CHUNK_SIZE, INSERT_CHUNK_SIZE, VIDEO_TABLE};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub name: String,
    pub path: String,
    pub url: String,
    /// Milliseconds since the Unix epoch; not every filesystem reports it.
    pub ctime: Option<i64>,
    pub mtime: i64,
    pub size: i64,
    pub thumbnail_path: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl VideoRecord {
    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail_path.is_some()
    }

    /// Same file contents as far as the filesystem reports.
    pub fn is_same_file(&self, other: &VideoRecord) -> bool {
        self.mtime == other.mtime && self.size == other.size
    }

    fn to_row(&self) -> Vec<Value> {
        fn opt_text(v: &Option<String>) -> Value {
            v.clone().map(Value::Text).unwrap_or(Value::Null)
        }

        vec![
            Value::Text(self.name.clone()),
            Value::Text(self.path.clone()),
            Value::Text(self.url.clone()),
            self.ctime.map(Value::Integer).unwrap_or(Value::Null),
            Value::Integer(self.mtime),
            Value::Integer(self.size),
            opt_text(&self.thumbnail_path),
            opt_text(&self.thumbnail_url),
        ]
    }
}

fn map_video(row: &rusqlite::Row) -> rusqlite::Result<VideoRecord> {
    Ok(VideoRecord {
        name: row.get(0)?,
        path: row.get(1)?,
        url: row.get(2)?,
        ctime: row.get(3)?,
        mtime: row.get(4)?,
        size: row.get(5)?,
        thumbnail_path: row.get(6)?,
        thumbnail_url: row.get(7)?,
    })
}

pub fn fetch_videos(conn: &Connection, options: &SelectOptions) -> Result<Vec<VideoRecord>> {
    let query = build_select(VIDEO_TABLE, options);
    let mut stmt = conn.prepare(&query.sql)?;
    let rows = stmt.query_map(params_from_iter(query.params.iter()), map_video)?;

    let mut videos = Vec::new();
    for row in rows {
        videos.push(row?);
    }
    Ok(videos)
}

pub fn get_video(conn: &Connection, path: &str) -> Result<Option<VideoRecord>> {
    let query = build_select(
        VIDEO_TABLE,
        &SelectOptions {
            filter: Some(path_equals(path)),
            ..SelectOptions::default()
        },
    );
    let result = conn
        .query_row(&query.sql, params_from_iter(query.params.iter()), map_video)
        .optional()?;
    Ok(result)
}

pub fn count_videos(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", VIDEO_TABLE),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Upsert videos keyed on path. Returns the number of rows written.
/// More than one chunk runs inside a single transaction.
pub fn insert_videos(conn: &Connection, videos: &[VideoRecord]) -> Result<usize> {
    let rows: Vec<Vec<Value>> = videos.iter().map(VideoRecord::to_row).collect();
    let statements = build_insert_chunks(VIDEO_TABLE, &rows, INSERT_CHUNK_SIZE);

    match statements.len() {
        0 => Ok(0),
        1 => Ok(statements[0].execute(conn)?),
        _ => {
            let tx = conn.unchecked_transaction()?;
            let mut written = 0;
            for statement in &statements {
                written += statement.execute(&tx)?;
            }
            tx.commit()?;
            Ok(written)
        }
    }
}

pub fn update_thumbnail(
    conn: &Connection,
    path: &str,
    thumbnail_path: &str,
    thumbnail_url: &str,
) -> Result<bool> {
    let query = build_update(
        VIDEO_TABLE,
        &[
            (VideoColumn::ThumbnailPath, Value::Text(thumbnail_path.to_string())),
            (VideoColumn::ThumbnailUrl, Value::Text(thumbnail_url.to_string())),
        ],
        &path_equals(path),
    );
    Ok(query.execute(conn)? > 0)
}

/// Delete rows by path in `IN (...)` batches. Returns the number removed.
pub fn delete_videos(conn: &Connection, paths: &[String]) -> Result<usize> {
    let mut removed = 0;
    for chunk in paths.chunks(DELETE_CHUNK_SIZE) {
        removed += build_delete(VIDEO_TABLE, &path_in(chunk)).execute(conn)?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::db::query::OrderBy;

    fn video(name: &str, mtime: i64) -> VideoRecord {
        VideoRecord {
            name: name.to_string(),
            path: format!("/videos/{}", name),
            url: format!("file:///videos/{}", name),
            ctime: Some(mtime - 10),
            mtime,
            size: 1024,
            thumbnail_path: None,
            thumbnail_url: None,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let conn = open_in_memory().unwrap();
        let written = insert_videos(&conn, &[video("a.mp4", 100)]).unwrap();
        assert_eq!(written, 1);

        let got = get_video(&conn, "/videos/a.mp4").unwrap().unwrap();
        assert_eq!(got, video("a.mp4", 100));
        assert!(get_video(&conn, "/videos/missing.mp4").unwrap().is_none());
    }

    #[test]
    fn test_insert_empty_is_noop() {
        let conn = open_in_memory().unwrap();
        assert_eq!(insert_videos(&conn, &[]).unwrap(), 0);
        assert_eq!(count_videos(&conn).unwrap(), 0);
    }

    #[test]
    fn test_insert_many_chunks() {
        let conn = open_in_memory().unwrap();
        let videos: Vec<_> = (0..(INSERT_CHUNK_SIZE as i64 * 2 + 7))
            .map(|i| video(&format!("v{}.mp4", i), i))
            .collect();

        insert_videos(&conn, &videos).unwrap();
        assert_eq!(count_videos(&conn).unwrap(), videos.len() as i64);
    }

    #[test]
    fn test_upsert_keeps_thumbnail() {
        let conn = open_in_memory().unwrap();
        insert_videos(&conn, &[video("a.mp4", 100)]).unwrap();
        update_thumbnail(&conn, "/videos/a.mp4", "/thumbs/a.jpg", "file:///thumbs/a.jpg").unwrap();

        let mut refreshed = video("a.mp4", 200);
        refreshed.size = 4096;
        insert_videos(&conn, &[refreshed]).unwrap();

        let got = get_video(&conn, "/videos/a.mp4").unwrap().unwrap();
        assert_eq!(got.mtime, 200);
        assert_eq!(got.size, 4096);
        assert_eq!(got.thumbnail_path.as_deref(), Some("/thumbs/a.jpg"));
        assert_eq!(count_videos(&conn).unwrap(), 1);
    }

    #[test]
    fn test_fetch_ordered_and_paged() {
        let conn = open_in_memory().unwrap();
        insert_videos(&conn, &[video("a.mp4", 1), video("b.mp4", 3), video("c.mp4", 2)]).unwrap();

        let all = fetch_videos(&conn, &SelectOptions::recent_first()).unwrap();
        let names: Vec<_> = all.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["b.mp4", "c.mp4", "a.mp4"]);

        let page = fetch_videos(
            &conn,
            &SelectOptions {
                order_by: vec![OrderBy::asc(VideoColumn::Name)],
                limit: Some(1),
                offset: Some(1),
                ..SelectOptions::default()
            },
        )
        .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "b.mp4");

        let tail = fetch_videos(
            &conn,
            &SelectOptions {
                order_by: vec![OrderBy::asc(VideoColumn::Name)],
                offset: Some(2),
                ..SelectOptions::default()
            },
        )
        .unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].name, "c.mp4");
    }

    #[test]
    fn test_update_thumbnail_missing_row() {
        let conn = open_in_memory().unwrap();
        assert!(!update_thumbnail(&conn, "/nope.mp4", "/t.jpg", "file:///t.jpg").unwrap());
    }

    #[test]
    fn test_delete_videos() {
        let conn = open_in_memory().unwrap();
        insert_videos(&conn, &[video("a.mp4", 1), video("b.mp4", 2), video("c.mp4", 3)]).unwrap();

        assert_eq!(delete_videos(&conn, &[]).unwrap(), 0);

        let removed = delete_videos(
            &conn,
            &["/videos/a.mp4".to_string(), "/videos/c.mp4".to_string(), "/videos/zzz.mp4".to_string()],
        )
        .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(count_videos(&conn).unwrap(), 1);
    }
}
