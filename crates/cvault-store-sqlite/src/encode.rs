//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so lexical order matches chronological order.
//! The quota warning history is stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use cvault_core::{
  file::FileRecord,
  session::{CredentialSession, QuotaWarning, QuotaWarningLevel},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Quota ───────────────────────────────────────────────────────────────────

pub fn encode_quota(bytes: Option<u64>, column: &'static str) -> Result<Option<i64>> {
  bytes
    .map(|b| i64::try_from(b).map_err(|_| Error::OutOfRange(column)))
    .transpose()
}

fn decode_quota(bytes: Option<i64>, column: &'static str) -> Result<Option<u64>> {
  bytes
    .map(|b| u64::try_from(b).map_err(|_| Error::OutOfRange(column)))
    .transpose()
}

pub fn encode_warnings(history: &[QuotaWarning]) -> Result<String> {
  Ok(serde_json::to_string(history)?)
}

fn decode_warnings(s: &str) -> Result<Vec<QuotaWarning>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const FILE_COLUMNS: &str = "id, owner_id, content_hash, original_name, \
   display_name, is_duplicate, duplicate_sequence, canonical_record_id, \
   created_at, deleted_at";

/// Raw values read directly from a `files` row.
pub struct RawFileRecord {
  pub id:                  String,
  pub owner_id:            i64,
  pub content_hash:        String,
  pub original_name:       String,
  pub display_name:        String,
  pub is_duplicate:        bool,
  pub duplicate_sequence:  i64,
  pub canonical_record_id: Option<String>,
  pub created_at:          String,
  pub deleted_at:          Option<String>,
}

impl RawFileRecord {
  /// Map a row selected with [`FILE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                  row.get(0)?,
      owner_id:            row.get(1)?,
      content_hash:        row.get(2)?,
      original_name:       row.get(3)?,
      display_name:        row.get(4)?,
      is_duplicate:        row.get(5)?,
      duplicate_sequence:  row.get(6)?,
      canonical_record_id: row.get(7)?,
      created_at:          row.get(8)?,
      deleted_at:          row.get(9)?,
    })
  }

  pub fn into_record(self) -> Result<FileRecord> {
    Ok(FileRecord {
      id:                  decode_uuid(&self.id)?,
      owner_id:            self.owner_id,
      content_hash:        self.content_hash,
      original_name:       self.original_name,
      display_name:        self.display_name,
      is_duplicate:        self.is_duplicate,
      duplicate_sequence:  u32::try_from(self.duplicate_sequence)
        .map_err(|_| Error::OutOfRange("duplicate_sequence"))?,
      canonical_record_id: self
        .canonical_record_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      created_at:          decode_dt(&self.created_at)?,
      deleted_at:          decode_opt_dt(self.deleted_at)?,
    })
  }
}

pub const SESSION_COLUMNS: &str = "id, owner_id, access_token, refresh_token, \
   token_expires_at, is_persistent, auto_refresh_enabled, is_active, \
   persistent_session_id, refresh_attempts, max_refresh_failures, \
   last_refresh_at, deactivated_at, deactivated_reason, drive_quota_total, \
   drive_quota_used, last_quota_check, quota_warning_level, \
   quota_warnings_sent, last_activity_at, created_at, updated_at";

/// Raw values read directly from a `credential_sessions` row.
pub struct RawSession {
  pub id:                    String,
  pub owner_id:              i64,
  pub access_token:          String,
  pub refresh_token:         Option<String>,
  pub token_expires_at:      String,
  pub is_persistent:         bool,
  pub auto_refresh_enabled:  bool,
  pub is_active:             bool,
  pub persistent_session_id: String,
  pub refresh_attempts:      i64,
  pub max_refresh_failures:  i64,
  pub last_refresh_at:       Option<String>,
  pub deactivated_at:        Option<String>,
  pub deactivated_reason:    Option<String>,
  pub drive_quota_total:     Option<i64>,
  pub drive_quota_used:      Option<i64>,
  pub last_quota_check:      Option<String>,
  pub quota_warning_level:   String,
  pub quota_warnings_sent:   String,
  pub last_activity_at:      Option<String>,
  pub created_at:            String,
  pub updated_at:            String,
}

impl RawSession {
  /// Map a row selected with [`SESSION_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                    row.get(0)?,
      owner_id:              row.get(1)?,
      access_token:          row.get(2)?,
      refresh_token:         row.get(3)?,
      token_expires_at:      row.get(4)?,
      is_persistent:         row.get(5)?,
      auto_refresh_enabled:  row.get(6)?,
      is_active:             row.get(7)?,
      persistent_session_id: row.get(8)?,
      refresh_attempts:      row.get(9)?,
      max_refresh_failures:  row.get(10)?,
      last_refresh_at:       row.get(11)?,
      deactivated_at:        row.get(12)?,
      deactivated_reason:    row.get(13)?,
      drive_quota_total:     row.get(14)?,
      drive_quota_used:      row.get(15)?,
      last_quota_check:      row.get(16)?,
      quota_warning_level:   row.get(17)?,
      quota_warnings_sent:   row.get(18)?,
      last_activity_at:      row.get(19)?,
      created_at:            row.get(20)?,
      updated_at:            row.get(21)?,
    })
  }

  pub fn into_session(self) -> Result<CredentialSession> {
    Ok(CredentialSession {
      id:                    decode_uuid(&self.id)?,
      owner_id:              self.owner_id,
      access_token:          self.access_token,
      refresh_token:         self.refresh_token,
      token_expires_at:      decode_dt(&self.token_expires_at)?,
      is_persistent:         self.is_persistent,
      auto_refresh_enabled:  self.auto_refresh_enabled,
      is_active:             self.is_active,
      persistent_session_id: self.persistent_session_id,
      refresh_attempts:      u32::try_from(self.refresh_attempts)
        .map_err(|_| Error::OutOfRange("refresh_attempts"))?,
      max_refresh_failures:  u32::try_from(self.max_refresh_failures)
        .map_err(|_| Error::OutOfRange("max_refresh_failures"))?,
      last_refresh_at:       decode_opt_dt(self.last_refresh_at)?,
      deactivated_at:        decode_opt_dt(self.deactivated_at)?,
      deactivated_reason:    self.deactivated_reason,
      drive_quota_total:     decode_quota(self.drive_quota_total, "drive_quota_total")?,
      drive_quota_used:      decode_quota(self.drive_quota_used, "drive_quota_used")?,
      last_quota_check:      decode_opt_dt(self.last_quota_check)?,
      quota_warning_level:   self.quota_warning_level.parse::<QuotaWarningLevel>()?,
      quota_warnings_sent:   decode_warnings(&self.quota_warnings_sent)?,
      last_activity_at:      decode_opt_dt(self.last_activity_at)?,
      created_at:            decode_dt(&self.created_at)?,
      updated_at:            decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let whole = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
    let fractional = Utc.timestamp_opt(1_700_000_000, 900_000_000).unwrap();
    assert!(encode_dt(fractional) < encode_dt(whole));
    assert_eq!(decode_dt(&encode_dt(whole)).unwrap(), whole);
  }

  #[test]
  fn oversized_quota_is_rejected() {
    assert!(matches!(
      encode_quota(Some(u64::MAX), "drive_quota_total"),
      Err(Error::OutOfRange("drive_quota_total"))
    ));
    assert_eq!(encode_quota(Some(42), "drive_quota_used").unwrap(), Some(42));
  }
}
