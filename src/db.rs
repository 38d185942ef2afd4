use anyhow::{anyhow, Context, Result};
use chrono::Local;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::models::{RawListing, StoredJob, MISSING};

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create store directory {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(&Self::default_path())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> PathBuf {
        // XDG data directory or fallback to the working directory
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "trawl") {
            proj_dirs.data_dir().join("trawl.db")
        } else {
            PathBuf::from("trawl.db")
        }
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uniqueid TEXT,
                title TEXT,
                company TEXT,
                location TEXT,
                salary TEXT,
                jobkey TEXT,
                fetched_date TEXT,
                read INTEGER DEFAULT 0,
                appliedto INTEGER DEFAULT 0,
                source TEXT,
                UNIQUE(jobkey, source),
                UNIQUE(uniqueid)
            );

            CREATE TABLE IF NOT EXISTS stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uniquejobs INTEGER
            );
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='jobs'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Store not initialized. Run 'trawl init' first."));
        }
        Ok(())
    }

    /// Insert-or-update every listing inside a single transaction, keyed
    /// by the content-derived unique id. Returns how many rows were newly
    /// inserted; re-fetched rows are refreshed in place and not counted.
    /// A UNIQUE(jobkey, source) violation rolls the whole batch back.
    pub fn upsert_listings(&mut self, listings: &[RawListing], source: &str) -> Result<usize> {
        let fetched_date = Local::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut new_jobs = 0;

        for job in listings {
            let uniqueid = make_uid(&job.title, &job.company);

            let existing = match tx.query_row(
                "SELECT id FROM jobs WHERE uniqueid = ?1",
                [&uniqueid],
                |row| row.get::<_, i64>(0),
            ) {
                Ok(id) => Some(id),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e.into()),
            };

            match existing {
                None => {
                    tx.execute(
                        "INSERT INTO jobs
                         (uniqueid, title, company, location, salary, jobkey, fetched_date, read, appliedto, source)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, ?8)",
                        params![
                            uniqueid,
                            job.title,
                            job.company,
                            job.location,
                            MISSING,
                            job.jobkey,
                            fetched_date,
                            source
                        ],
                    )
                    .with_context(|| {
                        format!(
                            "Uniqueness violation storing '{}' (jobkey {}, source {})",
                            job.title, job.jobkey, source
                        )
                    })?;
                    new_jobs += 1;
                }
                Some(_) => {
                    tx.execute(
                        "UPDATE jobs
                         SET title = ?1, company = ?2, location = ?3, salary = ?4, jobkey = ?5, fetched_date = ?6
                         WHERE uniqueid = ?7",
                        params![
                            job.title,
                            job.company,
                            job.location,
                            MISSING,
                            job.jobkey,
                            fetched_date,
                            uniqueid
                        ],
                    )?;
                }
            }
        }

        tx.commit()?;
        Ok(new_jobs)
    }

    pub fn list_jobs(&self, unread_only: bool) -> Result<Vec<StoredJob>> {
        let mut sql = String::from(
            "SELECT id, uniqueid, title, company, location, salary, jobkey, fetched_date, read, appliedto, source
             FROM jobs",
        );
        if unread_only {
            sql.push_str(" WHERE read = 0");
        }
        sql.push_str(" ORDER BY fetched_date DESC, id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_job)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list jobs")
    }

    pub fn count_jobs(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))
            .map_err(Into::into)
    }

    pub fn mark_read(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("UPDATE jobs SET read = 1 WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    pub fn mark_applied(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("UPDATE jobs SET appliedto = 1 WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<StoredJob> {
        Ok(StoredJob {
            id: row.get(0)?,
            uniqueid: row.get(1)?,
            title: row.get(2)?,
            company: row.get(3)?,
            location: row.get(4)?,
            salary: row.get(5)?,
            jobkey: row.get(6)?,
            fetched_date: row.get(7)?,
            read: row.get::<_, i64>(8)? != 0,
            applied: row.get::<_, i64>(9)? != 0,
            source: row.get(10)?,
        })
    }
}

/// Deduplication key: hex SHA-256 over the normalized title and company,
/// separated by a byte that cannot occur in either. Listings differing
/// only in casing or whitespace collapse to the same id.
pub fn make_uid(title: &str, company: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(title).as_bytes());
    hasher.update([0x1f]);
    hasher.update(normalize(company).as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize(field: &str) -> String {
    let collapsed = regex::Regex::new(r"\s+")
        .expect("whitespace regex literal")
        .replace_all(field.trim(), " ")
        .into_owned();
    collapsed.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(title: &str, company: &str, jobkey: &str) -> RawListing {
        RawListing {
            title: title.to_string(),
            company: company.to_string(),
            jobkey: jobkey.to_string(),
            ..RawListing::default()
        }
    }

    fn open_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    #[test]
    fn test_make_uid_is_deterministic_and_normalized() {
        let a = make_uid("Software Engineer", "Acme");
        let b = make_uid("  software   engineer ", "ACME");
        assert_eq!(a, b);
    }

    #[test]
    fn test_make_uid_differs_on_either_field() {
        let base = make_uid("Software Engineer", "Acme");
        assert_ne!(base, make_uid("Software Engineer", "Beta"));
        assert_ne!(base, make_uid("Data Engineer", "Acme"));
    }

    #[test]
    fn test_make_uid_field_boundary_is_unambiguous() {
        // "ab" + "c" must not collide with "a" + "bc".
        assert_ne!(make_uid("ab", "c"), make_uid("a", "bc"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut db = open_db();
        let listings = vec![
            listing("Software Engineer", "Acme", "j1"),
            listing("Developer", "Beta", "j2"),
        ];

        let first = db.upsert_listings(&listings, "jooble").unwrap();
        assert_eq!(first, 2);
        assert_eq!(db.count_jobs().unwrap(), 2);

        let second = db.upsert_listings(&listings, "jooble").unwrap();
        assert_eq!(second, 0);
        assert_eq!(db.count_jobs().unwrap(), 2);
    }

    #[test]
    fn test_upsert_refreshes_mutable_fields() {
        let mut db = open_db();
        db.upsert_listings(&[listing("Engineer", "Acme", "j1")], "jooble")
            .unwrap();

        let mut updated = listing("Engineer", "Acme", "j1-renumbered");
        updated.location = "Torino".to_string();
        let new_jobs = db.upsert_listings(&[updated], "jooble").unwrap();

        assert_eq!(new_jobs, 0);
        let jobs = db.list_jobs(false).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].jobkey, "j1-renumbered");
        assert_eq!(jobs[0].location, "Torino");
    }

    #[test]
    fn test_upsert_collapses_duplicates_within_one_run() {
        let mut db = open_db();
        let listings = vec![
            listing("Engineer", "Acme", "j1"),
            listing("engineer", "ACME", "j1"),
        ];

        let new_jobs = db.upsert_listings(&listings, "jooble").unwrap();

        assert_eq!(new_jobs, 1);
        assert_eq!(db.count_jobs().unwrap(), 1);
    }

    #[test]
    fn test_jobkey_collision_without_matching_uid_rolls_back() {
        let mut db = open_db();
        let listings = vec![
            listing("Engineer", "Acme", "shared-key"),
            listing("Totally Different Role", "Beta", "shared-key"),
        ];

        let result = db.upsert_listings(&listings, "jooble");

        assert!(result.is_err());
        // The whole run is one transaction; nothing from it persists.
        assert_eq!(db.count_jobs().unwrap(), 0);
    }

    #[test]
    fn test_same_jobkey_different_source_is_allowed() {
        let mut db = open_db();
        db.upsert_listings(&[listing("Engineer", "Acme", "k1")], "jooble")
            .unwrap();
        db.upsert_listings(&[listing("Developer", "Beta", "k1")], "indeed")
            .unwrap();

        assert_eq!(db.count_jobs().unwrap(), 2);
    }

    #[test]
    fn test_mark_read_and_applied() {
        let mut db = open_db();
        db.upsert_listings(&[listing("Engineer", "Acme", "j1")], "jooble")
            .unwrap();
        let id = db.list_jobs(false).unwrap()[0].id;

        assert!(db.mark_read(id).unwrap());
        assert!(db.mark_applied(id).unwrap());
        assert!(!db.mark_read(id + 999).unwrap());

        let jobs = db.list_jobs(false).unwrap();
        assert!(jobs[0].read);
        assert!(jobs[0].applied);
        assert!(db.list_jobs(true).unwrap().is_empty());
    }

    #[test]
    fn test_ensure_initialized_requires_schema() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.ensure_initialized().is_err());
        db.init().unwrap();
        assert!(db.ensure_initialized().is_ok());
    }
}
