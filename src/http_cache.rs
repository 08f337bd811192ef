use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT};
use rusqlite::{Connection, OptionalExtension, params};

const CACHE_DIR: &str = "scout_terminal";
const CACHE_DB: &str = "http_cache.sqlite";

static CONN: Mutex<Option<Connection>> = Mutex::new(None);

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: i64,
}

/// Cached GET returning the response body.
///
/// Entries younger than `max_age_secs` are served without touching the
/// network. Older entries are revalidated with If-None-Match /
/// If-Modified-Since; a 304 refreshes the stored timestamp and reuses the
/// cached body.
pub fn fetch_json_cached(
    client: &Client,
    url: &str,
    extra_headers: &[(&str, &str)],
    max_age_secs: u64,
) -> Result<String> {
    let cached = with_cache(|conn| lookup(conn, url)).flatten();

    let now = now_secs();
    if let Some(entry) = cached.as_ref() {
        if is_fresh(entry.fetched_at, now, max_age_secs) {
            return Ok(entry.body.clone());
        }
    }

    let mut req = client.get(url).header(USER_AGENT, "scout_terminal/0.1");
    for (name, value) in extra_headers {
        req = req.header(*name, *value);
    }
    if let Some(entry) = cached.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().context("request failed")?;
    let status = resp.status();
    let headers = resp.headers().clone();

    if status == StatusCode::NOT_MODIFIED {
        if let Some(entry) = cached {
            with_cache(|conn| touch(conn, url, now));
            return Ok(entry.body);
        }
        return Err(anyhow::anyhow!("received 304 without cache body"));
    }

    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow::anyhow!("http {}: {}", status, body));
    }

    let entry = CacheEntry {
        body: body.clone(),
        etag: header_string(&headers, ETAG),
        last_modified: header_string(&headers, LAST_MODIFIED),
        fetched_at: now,
    };
    with_cache(|conn| upsert(conn, url, &entry));
    Ok(body)
}

/// Drop every stored response. Returns the number of rows removed.
pub fn clear_cache() -> Result<usize> {
    let mut guard = CONN.lock().expect("http cache lock poisoned");
    let Some(conn) = open_if_needed(&mut guard) else {
        return Ok(0);
    };
    let removed = conn
        .execute("DELETE FROM responses", [])
        .context("clear http cache")?;
    Ok(removed)
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn with_cache<T>(f: impl FnOnce(&Connection) -> Option<T>) -> Option<T> {
    let mut guard = CONN.lock().expect("http cache lock poisoned");
    let conn = open_if_needed(&mut guard)?;
    f(conn)
}

fn open_if_needed(guard: &mut Option<Connection>) -> Option<&Connection> {
    if guard.is_none() {
        let dir = app_cache_dir()?;
        std::fs::create_dir_all(&dir).ok()?;
        let conn = Connection::open(dir.join(CACHE_DB)).ok()?;
        init_schema(&conn).ok()?;
        *guard = Some(conn);
    }
    guard.as_ref()
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS responses (
            url TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            etag TEXT,
            last_modified TEXT,
            fetched_at INTEGER NOT NULL
        )",
    )
    .context("init http cache schema")?;
    Ok(())
}

fn lookup(conn: &Connection, url: &str) -> Option<Option<CacheEntry>> {
    let row = conn
        .query_row(
            "SELECT body, etag, last_modified, fetched_at FROM responses WHERE url = ?1",
            params![url],
            |row| {
                Ok(CacheEntry {
                    body: row.get(0)?,
                    etag: row.get(1)?,
                    last_modified: row.get(2)?,
                    fetched_at: row.get(3)?,
                })
            },
        )
        .optional()
        .ok()?;
    Some(row)
}

fn upsert(conn: &Connection, url: &str, entry: &CacheEntry) -> Option<()> {
    conn.execute(
        "INSERT INTO responses (url, body, etag, last_modified, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(url) DO UPDATE SET
            body = excluded.body,
            etag = excluded.etag,
            last_modified = excluded.last_modified,
            fetched_at = excluded.fetched_at",
        params![url, entry.body, entry.etag, entry.last_modified, entry.fetched_at],
    )
    .ok()?;
    Some(())
}

fn touch(conn: &Connection, url: &str, now: i64) -> Option<()> {
    conn.execute(
        "UPDATE responses SET fetched_at = ?2 WHERE url = ?1",
        params![url, now],
    )
    .ok()?;
    Some(())
}

fn header_string(
    headers: &reqwest::header::HeaderMap,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn is_fresh(fetched_at: i64, now: i64, max_age_secs: u64) -> bool {
    now.saturating_sub(fetched_at) < max_age_secs as i64
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn upsert_then_lookup_roundtrips() {
        let conn = mem_conn();
        let entry = CacheEntry {
            body: "{\"response\":[]}".to_string(),
            etag: Some("\"abc\"".to_string()),
            last_modified: None,
            fetched_at: 100,
        };
        upsert(&conn, "https://example.test/players", &entry).unwrap();
        let got = lookup(&conn, "https://example.test/players")
            .unwrap()
            .expect("entry should exist");
        assert_eq!(got.body, entry.body);
        assert_eq!(got.etag.as_deref(), Some("\"abc\""));
        assert_eq!(got.fetched_at, 100);
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let conn = mem_conn();
        let mut entry = CacheEntry {
            body: "old".to_string(),
            etag: None,
            last_modified: None,
            fetched_at: 1,
        };
        upsert(&conn, "u", &entry).unwrap();
        entry.body = "new".to_string();
        entry.fetched_at = 2;
        upsert(&conn, "u", &entry).unwrap();
        let got = lookup(&conn, "u").unwrap().unwrap();
        assert_eq!(got.body, "new");
        assert_eq!(got.fetched_at, 2);
    }

    #[test]
    fn touch_only_updates_timestamp() {
        let conn = mem_conn();
        let entry = CacheEntry {
            body: "body".to_string(),
            etag: Some("e".to_string()),
            last_modified: Some("lm".to_string()),
            fetched_at: 5,
        };
        upsert(&conn, "u", &entry).unwrap();
        touch(&conn, "u", 50).unwrap();
        let got = lookup(&conn, "u").unwrap().unwrap();
        assert_eq!(got.fetched_at, 50);
        assert_eq!(got.body, "body");
        assert_eq!(got.etag.as_deref(), Some("e"));
    }

    #[test]
    fn lookup_missing_is_none() {
        let conn = mem_conn();
        assert!(lookup(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn freshness_window_short_circuits() {
        // Within the window: served from cache. Past it: revalidate.
        assert!(is_fresh(1000, 1000 + 3599, 3600));
        assert!(!is_fresh(1000, 1000 + 3600, 3600));
        assert!(!is_fresh(1000, 1000 + 86_400, 3600));
        // A timestamp from a clock that went backwards still reads fresh.
        assert!(is_fresh(2000, 1000, 3600));
    }
}
