//! Shared SQLite fixtures for unit tests.

use rusqlite::{params, Connection};

use crate::db::migrate::{bundled_migrations_dir, run_migrations};
use crate::records::RecordId;

pub fn rid(s: &str) -> RecordId {
    RecordId::parse(s).unwrap()
}

/// In-memory database with every migration applied.
pub fn fixture_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    run_migrations(&mut conn, &bundled_migrations_dir()).unwrap();
    conn
}

pub fn insert_nce(conn: &Connection, id: &str, parent: Option<&str>, opened: &str, revision: &str) {
    conn.execute(
        "INSERT INTO nce_records (nce_id, parent_id, opened_date, customer, part_number, part_revision, status) \
         VALUES (?1, ?2, ?3, 'ACME', ?4, ?5, 'open')",
        params![id, parent, opened, format!("P-{}", id), revision],
    )
    .unwrap();
}

pub fn insert_mrbe(conn: &Connection, id: &str, parent: Option<&str>, opened: &str) {
    conn.execute(
        "INSERT INTO mrbe_records (mrbe_id, parent_id, opened_date, disposition, finding) \
         VALUES (?1, ?2, ?3, 'scrap', '')",
        params![id, parent, opened],
    )
    .unwrap();
}

pub fn insert_8d(conn: &Connection, id: &str, parent: Option<&str>, related: Option<&str>, opened: &str) {
    conn.execute(
        "INSERT INTO eightd_records (eightd_id, parent_id, related_records, opened_date, problem_statement) \
         VALUES (?1, ?2, ?3, ?4, 'burr on edge')",
        params![id, parent, related, opened],
    )
    .unwrap();
}

pub fn insert_attachment(conn: &Connection, attachment_id: &str, record_id: &str, file_name: &str, content: &str) {
    conn.execute(
        "INSERT INTO attachments (attachment_id, record_id, file_name, content) VALUES (?1, ?2, ?3, ?4)",
        params![attachment_id, record_id, file_name, content],
    )
    .unwrap();
}
