//! [`SqliteStore`]: the SQLite implementation of [`FileStore`] and
//! [`SessionStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{ErrorCode, OptionalExtension as _};
use uuid::Uuid;

use cvault_core::{
  OwnerId,
  file::{FileRecord, NewFileRecord},
  session::CredentialSession,
  store::{FileStore, SessionStore},
};

use crate::{
  Error, Result,
  encode::{
    FILE_COLUMNS, RawFileRecord, RawSession, SESSION_COLUMNS, encode_dt,
    encode_quota, encode_uuid, encode_warnings,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A cvault store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// are funnelled through one connection thread, so each statement commits
/// atomically with respect to the others.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT {FILE_COLUMNS} ...` query and decode every row.
  async fn query_files(
    &self,
    sql: String,
    owner_id: OwnerId,
    extra: Option<String>,
  ) -> Result<Vec<FileRecord>> {
    let raws: Vec<RawFileRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match extra {
          Some(extra) => stmt
            .query_map(rusqlite::params![owner_id, extra], RawFileRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map(rusqlite::params![owner_id], RawFileRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFileRecord::into_record).collect()
  }

  /// Run a `SELECT {SESSION_COLUMNS} ...` query with optional single
  /// parameter and decode every row.
  async fn query_sessions(
    &self,
    sql: String,
    param: Option<String>,
  ) -> Result<Vec<CredentialSession>> {
    let raws: Vec<RawSession> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match param {
          Some(p) => stmt
            .query_map(rusqlite::params![p], RawSession::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], RawSession::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSession::into_session).collect()
  }
}

/// Column values of a session, encoded for binding.
struct SessionParams {
  id:                    String,
  owner_id:              i64,
  access_token:          String,
  refresh_token:         Option<String>,
  token_expires_at:      String,
  is_persistent:         bool,
  auto_refresh_enabled:  bool,
  is_active:             bool,
  persistent_session_id: String,
  refresh_attempts:      i64,
  max_refresh_failures:  i64,
  last_refresh_at:       Option<String>,
  deactivated_at:        Option<String>,
  deactivated_reason:    Option<String>,
  drive_quota_total:     Option<i64>,
  drive_quota_used:      Option<i64>,
  last_quota_check:      Option<String>,
  quota_warning_level:   &'static str,
  quota_warnings_sent:   String,
  last_activity_at:      Option<String>,
  created_at:            String,
  updated_at:            String,
}

impl SessionParams {
  fn encode(s: &CredentialSession) -> Result<Self> {
    Ok(Self {
      id:                    encode_uuid(s.id),
      owner_id:              s.owner_id,
      access_token:          s.access_token.clone(),
      refresh_token:         s.refresh_token.clone(),
      token_expires_at:      encode_dt(s.token_expires_at),
      is_persistent:         s.is_persistent,
      auto_refresh_enabled:  s.auto_refresh_enabled,
      is_active:             s.is_active,
      persistent_session_id: s.persistent_session_id.clone(),
      refresh_attempts:      i64::from(s.refresh_attempts),
      max_refresh_failures:  i64::from(s.max_refresh_failures),
      last_refresh_at:       s.last_refresh_at.map(encode_dt),
      deactivated_at:        s.deactivated_at.map(encode_dt),
      deactivated_reason:    s.deactivated_reason.clone(),
      drive_quota_total:     encode_quota(s.drive_quota_total, "drive_quota_total")?,
      drive_quota_used:      encode_quota(s.drive_quota_used, "drive_quota_used")?,
      last_quota_check:      s.last_quota_check.map(encode_dt),
      quota_warning_level:   s.quota_warning_level.as_str(),
      quota_warnings_sent:   encode_warnings(&s.quota_warnings_sent)?,
      last_activity_at:      s.last_activity_at.map(encode_dt),
      created_at:            encode_dt(s.created_at),
      updated_at:            encode_dt(s.updated_at),
    })
  }
}

/// True only for a UNIQUE violation on `credential_sessions.owner_id`. Other
/// constraint failures (primary key, `persistent_session_id`, NOT NULL)
/// surface as database errors.
fn is_owner_conflict(err: &rusqlite::Error) -> bool {
  match err {
    rusqlite::Error::SqliteFailure(e, Some(msg)) => {
      e.code == ErrorCode::ConstraintViolation
        && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        && msg.contains("credential_sessions.owner_id")
    }
    _ => false,
  }
}

// ─── FileStore impl ──────────────────────────────────────────────────────────

impl FileStore for SqliteStore {
  type Error = Error;

  async fn insert_file(&self, input: NewFileRecord) -> Result<FileRecord> {
    let record = FileRecord {
      id:                  Uuid::new_v4(),
      owner_id:            input.owner_id,
      content_hash:        input.content_hash,
      original_name:       input.original_name,
      display_name:        input.display_name,
      is_duplicate:        input.is_duplicate,
      duplicate_sequence:  input.duplicate_sequence,
      canonical_record_id: input.canonical_record_id,
      created_at:          Utc::now(),
      deleted_at:          None,
    };

    let id_str        = encode_uuid(record.id);
    let owner_id      = record.owner_id;
    let hash          = record.content_hash.clone();
    let original_name = record.original_name.clone();
    let display_name  = record.display_name.clone();
    let is_duplicate  = record.is_duplicate;
    let sequence      = i64::from(record.duplicate_sequence);
    let canonical_str = record.canonical_record_id.map(encode_uuid);
    let at_str        = encode_dt(record.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO files (
             id, owner_id, content_hash, original_name, display_name,
             is_duplicate, duplicate_sequence, canonical_record_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            owner_id,
            hash,
            original_name,
            display_name,
            is_duplicate,
            sequence,
            canonical_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn get_file(&self, id: Uuid) -> Result<Option<FileRecord>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawFileRecord> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
            rusqlite::params![id_str],
            RawFileRecord::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFileRecord::into_record).transpose()
  }

  async fn find_active_by_hash(
    &self,
    owner_id:     OwnerId,
    content_hash: String,
  ) -> Result<Vec<FileRecord>> {
    // `rowid` breaks ties between records created within the same microsecond.
    let sql = format!(
      "SELECT {FILE_COLUMNS} FROM files
       WHERE owner_id = ?1 AND content_hash = ?2 AND deleted_at IS NULL
       ORDER BY created_at ASC, rowid ASC"
    );
    self.query_files(sql, owner_id, Some(content_hash)).await
  }

  async fn list_files(
    &self,
    owner_id:        OwnerId,
    include_deleted: bool,
  ) -> Result<Vec<FileRecord>> {
    let filter = if include_deleted { "" } else { "AND deleted_at IS NULL" };
    let sql = format!(
      "SELECT {FILE_COLUMNS} FROM files
       WHERE owner_id = ?1 {filter}
       ORDER BY created_at ASC, rowid ASC"
    );
    self.query_files(sql, owner_id, None).await
  }

  async fn soft_delete_file(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE files SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  type Error = Error;

  async fn insert_session(
    &self,
    session: CredentialSession,
  ) -> Result<CredentialSession> {
    let p = SessionParams::encode(&session)?;

    let inserted = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          &format!(
            "INSERT INTO credential_sessions ({SESSION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                     ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)"
          ),
          rusqlite::params![
            p.id,
            p.owner_id,
            p.access_token,
            p.refresh_token,
            p.token_expires_at,
            p.is_persistent,
            p.auto_refresh_enabled,
            p.is_active,
            p.persistent_session_id,
            p.refresh_attempts,
            p.max_refresh_failures,
            p.last_refresh_at,
            p.deactivated_at,
            p.deactivated_reason,
            p.drive_quota_total,
            p.drive_quota_used,
            p.last_quota_check,
            p.quota_warning_level,
            p.quota_warnings_sent,
            p.last_activity_at,
            p.created_at,
            p.updated_at,
          ],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if is_owner_conflict(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::SessionOwnerTaken(session.owner_id));
    }
    Ok(session)
  }

  async fn update_session(&self, session: CredentialSession) -> Result<()> {
    let p = SessionParams::encode(&session)?;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE credential_sessions SET
             access_token          = ?2,
             refresh_token         = ?3,
             token_expires_at      = ?4,
             is_persistent         = ?5,
             auto_refresh_enabled  = ?6,
             is_active             = ?7,
             refresh_attempts      = ?8,
             max_refresh_failures  = ?9,
             last_refresh_at       = ?10,
             deactivated_at        = ?11,
             deactivated_reason    = ?12,
             drive_quota_total     = ?13,
             drive_quota_used      = ?14,
             last_quota_check      = ?15,
             quota_warning_level   = ?16,
             quota_warnings_sent   = ?17,
             last_activity_at      = ?18,
             updated_at            = ?19
           WHERE id = ?1",
          rusqlite::params![
            p.id,
            p.access_token,
            p.refresh_token,
            p.token_expires_at,
            p.is_persistent,
            p.auto_refresh_enabled,
            p.is_active,
            p.refresh_attempts,
            p.max_refresh_failures,
            p.last_refresh_at,
            p.deactivated_at,
            p.deactivated_reason,
            p.drive_quota_total,
            p.drive_quota_used,
            p.last_quota_check,
            p.quota_warning_level,
            p.quota_warnings_sent,
            p.last_activity_at,
            p.updated_at,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::SessionNotFound(session.id));
    }
    Ok(())
  }

  async fn get_session(&self, id: Uuid) -> Result<Option<CredentialSession>> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM credential_sessions WHERE id = ?1");
    Ok(self.query_sessions(sql, Some(encode_uuid(id))).await?.pop())
  }

  async fn get_session_by_owner(
    &self,
    owner_id: OwnerId,
  ) -> Result<Option<CredentialSession>> {
    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {SESSION_COLUMNS} FROM credential_sessions WHERE owner_id = ?1"
            ),
            rusqlite::params![owner_id],
            RawSession::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn list_sessions_expiring_before(
    &self,
    deadline: DateTime<Utc>,
  ) -> Result<Vec<CredentialSession>> {
    let sql = format!(
      "SELECT {SESSION_COLUMNS} FROM credential_sessions
       WHERE is_active = 1 AND token_expires_at <= ?1
       ORDER BY token_expires_at ASC"
    );
    self.query_sessions(sql, Some(encode_dt(deadline))).await
  }

  async fn list_active_sessions(&self) -> Result<Vec<CredentialSession>> {
    let sql = format!(
      "SELECT {SESSION_COLUMNS} FROM credential_sessions
       WHERE is_active = 1
       ORDER BY created_at ASC"
    );
    self.query_sessions(sql, None).await
  }
}
