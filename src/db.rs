use anyhow::{Context, Result as AnyResult};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::Result;
use crate::models::{NewTicket, Priority, Role, Status, Ticket, User};

const SCHEMA_VERSION: i32 = 1;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const TICKET_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.priority, t.status, t.category,
           t.created_at, t.updated_at, t.closed_at,
           r.id, r.email, r.name, r.role, r.created_at,
           a.id, a.email, a.name, a.role, a.created_at
    FROM tickets t
    JOIN users r ON r.id = t.reporter_id
    LEFT JOIN users a ON a.id = t.assigned_admin_id
"#;

/// The shared ticket store.
///
/// All access goes through one connection behind a mutex. Writes run inside
/// `BEGIN IMMEDIATE` transactions so a read-modify-write of a ticket is atomic
/// with respect to other threads and other processes using the same file.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> AnyResult<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        init_schema(&conn).context("Failed to initialize schema")?;
        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-transaction drops the transaction, which rolls back,
        // so the connection is still consistent.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` inside a write transaction. Commits on `Ok`, rolls back on `Err`.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock();
        f(&conn)
    }

    pub fn create_user(&self, email: &str, name: &str, role: Role) -> Result<User> {
        self.write(|conn| insert_user(conn, email, name, role))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.read(|conn| fetch_user(conn, id))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.read(list_users)
    }

    pub fn get_ticket(&self, id: i64) -> Result<Option<Ticket>> {
        self.read(|conn| fetch_ticket(conn, id))
    }

    pub fn list_tickets(&self, reporter_scope: Option<i64>) -> Result<Vec<Ticket>> {
        self.read(|conn| list_tickets(conn, reporter_scope))
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version < SCHEMA_VERSION {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('reporter', 'admin')),
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL CHECK (length(trim(title)) > 0),
                description TEXT NOT NULL CHECK (length(trim(description)) > 0),
                priority TEXT NOT NULL CHECK (priority IN ('low', 'medium', 'high', 'critical')),
                status TEXT NOT NULL DEFAULT 'open'
                    CHECK (status IN ('open', 'in-progress', 'closed')),
                category TEXT,
                reporter_id INTEGER NOT NULL,
                assigned_admin_id INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                closed_at TEXT,
                CHECK ((status = 'closed') = (closed_at IS NOT NULL)),
                FOREIGN KEY (reporter_id) REFERENCES users(id),
                FOREIGN KEY (assigned_admin_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
            CREATE INDEX IF NOT EXISTS idx_tickets_priority ON tickets(priority);
            CREATE INDEX IF NOT EXISTS idx_tickets_reporter ON tickets(reporter_id);
            CREATE INDEX IF NOT EXISTS idx_tickets_assigned ON tickets(assigned_admin_id);
            "#,
        )?;

        conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
    }

    conn.execute("PRAGMA foreign_keys = ON", [])?;
    Ok(())
}

// Users

pub fn insert_user(conn: &Connection, email: &str, name: &str, role: Role) -> Result<User> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO users (email, name, role, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![email, name, role, now.to_rfc3339()],
    )?;
    Ok(User {
        id: conn.last_insert_rowid(),
        email: email.to_string(),
        name: name.to_string(),
        role,
        created_at: now,
    })
}

pub fn fetch_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, name, role, created_at FROM users WHERE id = ?1",
            [id],
            |row| user_from_row(row, 0),
        )
        .optional()?;
    Ok(user)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, email, name, role, created_at FROM users ORDER BY id")?;
    let users = stmt
        .query_map([], |row| user_from_row(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

// Tickets

pub fn insert_ticket(
    conn: &Connection,
    new: &NewTicket,
    reporter: &User,
    now: DateTime<Utc>,
) -> Result<Ticket> {
    let ts = now.to_rfc3339();
    conn.execute(
        "INSERT INTO tickets \
         (title, description, priority, status, reporter_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![new.title, new.description, new.priority, Status::Open, reporter.id, ts],
    )?;
    Ok(Ticket {
        id: conn.last_insert_rowid(),
        title: new.title.clone(),
        description: new.description.clone(),
        priority: new.priority,
        status: Status::Open,
        category: None,
        reporter: reporter.clone(),
        assigned_admin: None,
        created_at: now,
        updated_at: now,
        closed_at: None,
    })
}

pub fn fetch_ticket(conn: &Connection, id: i64) -> Result<Option<Ticket>> {
    let sql = format!("{} WHERE t.id = ?1", TICKET_SELECT);
    let ticket = conn.query_row(&sql, [id], ticket_from_row).optional()?;
    Ok(ticket)
}

/// Newest first. `reporter_scope` narrows the query to one reporter's
/// tickets at the SQL level.
pub fn list_tickets(conn: &Connection, reporter_scope: Option<i64>) -> Result<Vec<Ticket>> {
    let mut sql = String::from(TICKET_SELECT);
    let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(reporter_id) = reporter_scope {
        sql.push_str(" WHERE t.reporter_id = ?1");
        params_vec.push(Box::new(reporter_id));
    }
    sql.push_str(" ORDER BY t.created_at DESC, t.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let tickets = stmt
        .query_map(params_refs.as_slice(), ticket_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tickets)
}

/// Persist every mutable field of `ticket`. Returns false if it no longer exists.
pub fn save_ticket(conn: &Connection, ticket: &Ticket) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE tickets SET priority = ?1, status = ?2, category = ?3, assigned_admin_id = ?4, \
         updated_at = ?5, closed_at = ?6 WHERE id = ?7",
        params![
            ticket.priority,
            ticket.status,
            ticket.category,
            ticket.assigned_admin_id(),
            ticket.updated_at.to_rfc3339(),
            ticket.closed_at.map(|dt| dt.to_rfc3339()),
            ticket.id,
        ],
    )?;
    Ok(rows > 0)
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    parse_timestamp(idx, &row.get::<_, String>(idx)?)
}

fn optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| parse_timestamp(idx, &s))
        .transpose()
}

fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(offset)?,
        email: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        role: row.get(offset + 3)?,
        created_at: timestamp(row, offset + 4)?,
    })
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    let assigned_admin = match row.get::<_, Option<i64>>(14)? {
        Some(_) => Some(user_from_row(row, 14)?),
        None => None,
    };
    Ok(Ticket {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        priority: row.get(3)?,
        status: row.get(4)?,
        category: row.get(5)?,
        created_at: timestamp(row, 6)?,
        updated_at: timestamp(row, 7)?,
        closed_at: optional_timestamp(row, 8)?,
        reporter: user_from_row(row, 9)?,
        assigned_admin,
    })
}

macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

sql_text_enum!(Role);
sql_text_enum!(Priority);
sql_text_enum!(Status);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TicketError;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    fn new_ticket(title: &str, priority: Priority) -> NewTicket {
        NewTicket {
            title: title.to_string(),
            description: "Details".to_string(),
            priority,
        }
    }

    fn insert_at(
        db: &Database,
        title: &str,
        priority: Priority,
        reporter: &User,
        at: DateTime<Utc>,
    ) -> Ticket {
        db.write(|conn| insert_ticket(conn, &new_ticket(title, priority), reporter, at))
            .unwrap()
    }

    #[test]
    fn test_reopen_existing_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let db = Database::open(&path).unwrap();
            db.create_user("a@example.com", "A", Role::Admin).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_user_roundtrip() {
        let (db, _dir) = setup_test_db();
        let created = db
            .create_user("reporter1@example.com", "John Reporter", Role::Reporter)
            .unwrap();
        let fetched = db.get_user(created.id).unwrap().unwrap();
        assert_eq!(fetched.email, "reporter1@example.com");
        assert_eq!(fetched.role, Role::Reporter);
        assert!(db.get_user(999).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (db, _dir) = setup_test_db();
        db.create_user("a@example.com", "A", Role::Reporter).unwrap();
        let err = db.create_user("a@example.com", "B", Role::Admin).unwrap_err();
        assert!(matches!(err, TicketError::Storage(_)));
    }

    #[test]
    fn test_ticket_roundtrip() {
        let (db, _dir) = setup_test_db();
        let reporter = db.create_user("r@example.com", "R", Role::Reporter).unwrap();
        let admin = db.create_user("a@example.com", "A", Role::Admin).unwrap();

        let mut ticket = insert_at(&db, "Login broken", Priority::High, &reporter, Utc::now());
        assert_eq!(ticket.status, Status::Open);

        ticket.assigned_admin = Some(admin.clone());
        ticket.status = Status::Closed;
        ticket.closed_at = Some(Utc::now());
        ticket.category = Some("Account Problem".to_string());
        assert!(db.write(|conn| save_ticket(conn, &ticket)).unwrap());

        let fetched = db.get_ticket(ticket.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Login broken");
        assert_eq!(fetched.reporter.id, reporter.id);
        assert_eq!(fetched.assigned_admin_id(), Some(admin.id));
        assert_eq!(fetched.status, Status::Closed);
        assert!(fetched.closed_at.is_some());
        assert_eq!(fetched.category.as_deref(), Some("Account Problem"));
    }

    #[test]
    fn test_closed_at_constraint_enforced() {
        let (db, _dir) = setup_test_db();
        let reporter = db.create_user("r@example.com", "R", Role::Reporter).unwrap();
        let mut ticket = insert_at(&db, "T", Priority::Low, &reporter, Utc::now());

        ticket.status = Status::Closed;
        let result = db.write(|conn| save_ticket(conn, &ticket));
        assert!(result.is_err());
        assert_eq!(db.get_ticket(ticket.id).unwrap().unwrap().status, Status::Open);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let (db, _dir) = setup_test_db();
        let reporter = db.create_user("r@example.com", "R", Role::Reporter).unwrap();

        let result: Result<()> = db.write(|conn| {
            insert_ticket(conn, &new_ticket("T", Priority::Low), &reporter, Utc::now())?;
            Err(TicketError::validation("abort"))
        });
        assert!(result.is_err());
        assert!(db.list_tickets(None).unwrap().is_empty());
    }

    #[test]
    fn test_list_scope_and_order() {
        let (db, _dir) = setup_test_db();
        let alice = db.create_user("alice@example.com", "Alice", Role::Reporter).unwrap();
        let bob = db.create_user("bob@example.com", "Bob", Role::Reporter).unwrap();
        let base = Utc::now();

        for (i, reporter) in [&alice, &bob, &alice].into_iter().enumerate() {
            let at = base + chrono::Duration::seconds(i as i64);
            insert_at(&db, &format!("T{}", i), Priority::Low, reporter, at);
        }

        let all = db.list_tickets(None).unwrap();
        let titles: Vec<&str> = all.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["T2", "T1", "T0"]);

        let mine = db.list_tickets(Some(alice.id)).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|t| t.reporter.id == alice.id));
    }

    #[test]
    fn test_sql_injection_stored_literally() {
        let (db, _dir) = setup_test_db();
        let reporter = db.create_user("r@example.com", "R", Role::Reporter).unwrap();
        let malicious = "'; DROP TABLE tickets; --";
        let ticket = insert_at(&db, malicious, Priority::Low, &reporter, Utc::now());
        assert_eq!(db.get_ticket(ticket.id).unwrap().unwrap().title, malicious);
    }
}
