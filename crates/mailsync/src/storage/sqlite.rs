//! SQLite-backed relational store for synced emails

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use rusqlite_migration::{M, Migrations};

use super::EmailStore;
use crate::models::{Attachment, BodyType, NormalizedEmail};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            CREATE TABLE emails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_email TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                gmail_message_id TEXT NOT NULL,
                body_type TEXT NOT NULL,
                body TEXT NOT NULL,
                from_address TEXT NOT NULL,
                from_domain TEXT,
                to_address TEXT NOT NULL,
                to_domain TEXT,
                subject TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                unsubscribe_link TEXT,
                read INTEGER NOT NULL,
                sent INTEGER NOT NULL,
                draft INTEGER NOT NULL,
                inbox INTEGER NOT NULL,
                UNIQUE (owner_email, gmail_message_id)
            );

            CREATE INDEX idx_emails_owner_timestamp ON emails(owner_email, timestamp);
            CREATE INDEX idx_emails_from_domain ON emails(owner_email, from_domain);

            CREATE TABLE labels (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE email_labels (
                email_id INTEGER NOT NULL,
                label_id INTEGER NOT NULL,
                PRIMARY KEY (email_id, label_id),
                FOREIGN KEY (email_id) REFERENCES emails(id) ON DELETE CASCADE,
                FOREIGN KEY (label_id) REFERENCES labels(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_email_labels_label ON email_labels(label_id);

            CREATE TABLE attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                filename TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                size INTEGER NOT NULL,
                attachment_id TEXT NOT NULL,
                FOREIGN KEY (email_id) REFERENCES emails(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_attachments_email ON attachments(email_id);
            "#,
        ),
        // Migration 2: keep label order as received from Gmail
        M::up(
            r#"
            ALTER TABLE email_labels ADD COLUMN position INTEGER NOT NULL DEFAULT 0;
            "#,
        ),
    ])
}

/// SQLite-based email store
pub struct SqliteEmailStore {
    conn: Mutex<Connection>,
}

impl SqliteEmailStore {
    /// Open (or create) the database at `db_path` and run migrations
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        // WAL lets readers proceed while a sync batch is being written;
        // NORMAL is durable enough under WAL.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;

        Self::init(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    /// Upsert a label by name and return its row id
    fn upsert_label(tx: &Transaction<'_>, name: &str) -> Result<i64> {
        tx.prepare_cached("INSERT INTO labels (name) VALUES (?) ON CONFLICT(name) DO NOTHING")?
            .execute([name])?;

        let id = tx
            .prepare_cached("SELECT id FROM labels WHERE name = ?")?
            .query_row([name], |row| row.get(0))?;

        Ok(id)
    }

    /// Upsert one email with its label links and attachments
    fn save_email(tx: &Transaction<'_>, email: &NormalizedEmail) -> Result<()> {
        let mut label_ids = Vec::with_capacity(email.labels.len());
        for name in &email.labels {
            label_ids.push(Self::upsert_label(tx, name)?);
        }

        // ON CONFLICT DO UPDATE keeps the row id stable, unlike INSERT OR REPLACE
        let email_id: i64 = tx
            .prepare_cached(
                "INSERT INTO emails
                 (owner_email, thread_id, gmail_message_id, body_type, body,
                  from_address, from_domain, to_address, to_domain, subject,
                  timestamp, unsubscribe_link, read, sent, draft, inbox)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(owner_email, gmail_message_id) DO UPDATE SET
                    thread_id = excluded.thread_id,
                    body_type = excluded.body_type,
                    body = excluded.body,
                    from_address = excluded.from_address,
                    from_domain = excluded.from_domain,
                    to_address = excluded.to_address,
                    to_domain = excluded.to_domain,
                    subject = excluded.subject,
                    timestamp = excluded.timestamp,
                    unsubscribe_link = excluded.unsubscribe_link,
                    read = excluded.read,
                    sent = excluded.sent,
                    draft = excluded.draft,
                    inbox = excluded.inbox
                 RETURNING id",
            )?
            .query_row(
                params![
                    email.owner_email,
                    email.thread_id,
                    email.gmail_message_id,
                    email.body_type.as_str(),
                    email.body,
                    email.from,
                    email.from_domain,
                    email.to,
                    email.to_domain,
                    email.subject,
                    email.timestamp,
                    email.unsubscribe_link,
                    email.read,
                    email.sent,
                    email.draft,
                    email.inbox,
                ],
                |row| row.get(0),
            )?;

        tx.execute("DELETE FROM email_labels WHERE email_id = ?", [email_id])?;
        tx.execute("DELETE FROM attachments WHERE email_id = ?", [email_id])?;

        let mut link_stmt = tx.prepare_cached(
            "INSERT OR IGNORE INTO email_labels (email_id, label_id, position) VALUES (?, ?, ?)",
        )?;
        for (i, label_id) in label_ids.into_iter().enumerate() {
            link_stmt.execute(params![email_id, label_id, i as i64])?;
        }

        let mut attachment_stmt = tx.prepare_cached(
            "INSERT INTO attachments
             (email_id, position, filename, mime_type, size, attachment_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        for (i, att) in email.attachments.iter().enumerate() {
            attachment_stmt.execute(params![
                email_id,
                i as i64,
                att.filename,
                att.mime_type,
                att.size,
                att.attachment_id,
            ])?;
        }

        Ok(())
    }

    fn load_labels(conn: &Connection, email_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT l.name FROM email_labels el
             JOIN labels l ON l.id = el.label_id
             WHERE el.email_id = ?
             ORDER BY el.position",
        )?;

        let labels = stmt
            .query_map([email_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(labels)
    }

    fn load_attachments(conn: &Connection, email_id: i64) -> Result<Vec<Attachment>> {
        let mut stmt = conn.prepare(
            "SELECT filename, mime_type, size, attachment_id FROM attachments
             WHERE email_id = ?
             ORDER BY position",
        )?;

        let attachments = stmt
            .query_map([email_id], |row| {
                Ok(Attachment {
                    filename: row.get(0)?,
                    mime_type: row.get(1)?,
                    size: row.get(2)?,
                    attachment_id: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(attachments)
    }
}

impl EmailStore for SqliteEmailStore {
    fn save_emails(&self, emails: &[NormalizedEmail]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for email in emails {
            Self::save_email(&tx, email).with_context(|| {
                format!("Failed to save email {}", email.gmail_message_id)
            })?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_email(
        &self,
        owner_email: &str,
        gmail_message_id: &str,
    ) -> Result<Option<NormalizedEmail>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT id, thread_id, body_type, body, from_address, from_domain,
                        to_address, to_domain, subject, timestamp, unsubscribe_link,
                        read, sent, draft, inbox
                 FROM emails WHERE owner_email = ? AND gmail_message_id = ?",
                params![owner_email, gmail_message_id],
                |row| {
                    let body_type: String = row.get(2)?;
                    Ok((
                        row.get::<_, i64>(0)?,
                        NormalizedEmail {
                            owner_email: owner_email.to_string(),
                            thread_id: row.get(1)?,
                            gmail_message_id: gmail_message_id.to_string(),
                            labels: Vec::new(),
                            body_type: BodyType::parse(&body_type).unwrap_or(BodyType::Html),
                            body: row.get(3)?,
                            from: row.get(4)?,
                            from_domain: row.get(5)?,
                            to: row.get(6)?,
                            to_domain: row.get(7)?,
                            subject: row.get(8)?,
                            timestamp: row.get(9)?,
                            unsubscribe_link: row.get(10)?,
                            read: row.get(11)?,
                            sent: row.get(12)?,
                            draft: row.get(13)?,
                            inbox: row.get(14)?,
                            attachments: Vec::new(),
                        },
                    ))
                },
            )
            .optional()?;

        let Some((email_id, mut email)) = row else {
            return Ok(None);
        };

        email.labels = Self::load_labels(&conn, email_id)?;
        email.attachments = Self::load_attachments(&conn, email_id)?;
        Ok(Some(email))
    }

    fn count_emails(&self, owner_email: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM emails WHERE owner_email = ?",
            [owner_email],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn count_labels(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM labels", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
