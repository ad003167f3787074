// App settings (KV store)

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// Get a setting value by key. Returns None if not set.
pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM app_settings WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Set a setting value (upsert).
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO app_settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// All stored settings, ordered by key.
pub fn list_settings(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_settings ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut settings = Vec::new();
    for row in rows {
        settings.push(row?);
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn test_setting_roundtrip() {
        let conn = open_in_memory().unwrap();
        assert_eq!(get_setting(&conn, "app__cameraFps").unwrap(), None);

        set_setting(&conn, "app__cameraFps", "30").unwrap();
        set_setting(&conn, "app__cameraFps", "60").unwrap();
        assert_eq!(get_setting(&conn, "app__cameraFps").unwrap().as_deref(), Some("60"));
    }

    #[test]
    fn test_list_settings_sorted() {
        let conn = open_in_memory().unwrap();
        set_setting(&conn, "b", "2").unwrap();
        set_setting(&conn, "a", "1").unwrap();

        let all = list_settings(&conn).unwrap();
        assert_eq!(all, vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
    }
}
