// crates/ticket-id-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Ticket Store
// Description: Durable TicketStore backed by SQLite.
// Purpose: Persist ticket schedules with a scope-plus-sequence constraint.
// Dependencies: ticket-id-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! This module implements a durable [`TicketStore`] using `SQLite`. Every
//! issue runs inside one transaction (`BEGIN IMMEDIATE` by default) and the
//! `ticket_schedules` table rejects a second row for the same scope and
//! sequence. Constraint failures surface as retryable conflicts; busy and
//! locked databases surface as retryable contention. Rows are re-validated
//! against the ticket identifier they carry and fail closed on mismatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::ToSql;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use ticket_id_core::AllocationScope;
use ticket_id_core::ScheduleRecord;
use ticket_id_core::ScheduleTransaction;
use ticket_id_core::ScheduledDate;
use ticket_id_core::StoreError;
use ticket_id_core::TargetId;
use ticket_id_core::TicketId;
use ticket_id_core::TicketStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Column list shared by every schedule query.
const SCHEDULE_COLUMNS: &str = "ticket_id, target_id, identity_code, target_created_on, \
                                target_code, scheduled_on, sequence";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Transaction begin behavior for issue transactions.
///
/// # Invariants
/// - `Immediate` takes the write lock before the scope read, so concurrent
///   writers queue on `busy_timeout_ms` instead of racing.
/// - `Deferred` reads without the write lock. A writer whose snapshot went
///   stale fails its lock upgrade with contention, which the issuer retries
///   until its time budget runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteTransactionMode {
    /// `BEGIN IMMEDIATE`.
    #[default]
    Immediate,
    /// `BEGIN DEFERRED`.
    Deferred,
}

impl SqliteTransactionMode {
    /// Returns the matching `rusqlite` transaction behavior.
    #[must_use]
    pub const fn behavior(self) -> TransactionBehavior {
        match self {
            Self::Immediate => TransactionBehavior::Immediate,
            Self::Deferred => TransactionBehavior::Deferred,
        }
    }
}

/// Configuration for the `SQLite` ticket store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Transaction begin behavior for issue transactions.
    #[serde(default)]
    pub transaction_mode: SqliteTransactionMode,
}

impl SqliteStoreConfig {
    /// Returns a config for `path` with default settings.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            transaction_mode: SqliteTransactionMode::default(),
        }
    }
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Only [`SqliteStoreError::Conflict`] and [`SqliteStoreError::Contention`]
///   convert into retryable [`StoreError`] values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row failed integrity checks.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Scope and sequence already committed by another writer.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Ticket identifier already committed under another scope.
    #[error("sqlite store duplicate ticket id: {0}")]
    Duplicate(String),
    /// Database busy or locked.
    #[error("sqlite store contention: {0}")]
    Contention(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::Duplicate(message) => Self::Duplicate(message),
            SqliteStoreError::Contention(message) => Self::Contention(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed ticket store.
///
/// # Invariants
/// - One connection per store instance, serialized by a mutex.
/// - Several instances may share a database file; uniqueness across them is
///   enforced by the table constraint, not by this process.
#[derive(Debug, Clone)]
pub struct SqliteTicketStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Connection guarded for transactional use.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTicketStore {
    /// Opens (or creates) the store at `config.path`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid, the database
    /// cannot be opened, or the schema version is unsupported.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        tracing::debug!(
            path = %config.path.display(),
            journal_mode = config.journal_mode.pragma_value(),
            sync_mode = config.sync_mode.pragma_value(),
            "sqlite ticket store opened"
        );
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Acquires the connection lock.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))
    }
}

impl TicketStore for SqliteTicketStore {
    fn transact<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn ScheduleTransaction) -> Result<T, E>,
    {
        let mut guard = self.lock().map_err(StoreError::from)?;
        let tx = guard
            .transaction_with_behavior(self.config.transaction_mode.behavior())
            .map_err(|err| StoreError::from(classify_sqlite_error(err)))?;
        let outcome = {
            let mut view = SqliteScheduleTransaction {
                connection: &tx,
            };
            work(&mut view)?
        };
        tx.commit().map_err(|err| StoreError::from(classify_sqlite_error(err)))?;
        Ok(outcome)
    }

    fn load_schedule(&self, ticket_id: &TicketId) -> Result<Option<ScheduleRecord>, StoreError> {
        let guard = self.lock()?;
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM ticket_schedules WHERE ticket_id = ?1");
        let records = query_schedules(&guard, &sql, params![ticket_id.as_str()])?;
        Ok(records.into_iter().next())
    }

    fn list_scope(&self, scope: &AllocationScope) -> Result<Vec<ScheduleRecord>, StoreError> {
        let guard = self.lock()?;
        let target_id = encode_target_id(scope.target_id())?;
        let target_created = scope.target_created().to_string();
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM ticket_schedules
             WHERE target_id = ?1 AND target_created_on = ?2 AND scheduled_on = ?3
             ORDER BY sequence"
        );
        Ok(query_schedules(
            &guard,
            &sql,
            params![target_id, target_created, scope.scheduled_date().as_str()],
        )?)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Schedule view over an open `SQLite` transaction.
struct SqliteScheduleTransaction<'a> {
    /// Connection inside the open transaction.
    connection: &'a Connection,
}

impl SqliteScheduleTransaction<'_> {
    /// Decides whether a constraint failure was a scope race or a reused id.
    fn classify_constraint(&self, record: &ScheduleRecord) -> Result<StoreError, StoreError> {
        let target_id = encode_target_id(record.target_id)?;
        let taken: Option<i64> = self
            .connection
            .query_row(
                "SELECT 1 FROM ticket_schedules
                 WHERE target_id = ?1 AND target_created_on = ?2 AND scheduled_on = ?3
                   AND sequence = ?4
                 LIMIT 1",
                params![
                    target_id,
                    record.target_created().to_string(),
                    record.scheduled_date().as_str(),
                    i64::from(record.sequence().get()),
                ],
                |row| row.get(0),
            )
            .optional()
            .map_err(classify_sqlite_error)?;
        if taken.is_some() {
            tracing::debug!(
                target_id = %record.target_id,
                scheduled_date = %record.scheduled_date(),
                sequence = record.sequence().get(),
                "sqlite insert lost scope race"
            );
            return Ok(SqliteStoreError::Conflict(format!(
                "sequence {} already issued for target {} on {}",
                record.sequence(),
                record.target_id,
                record.scheduled_date()
            ))
            .into());
        }
        Ok(SqliteStoreError::Duplicate(record.ticket_id.to_string()).into())
    }
}

impl ScheduleTransaction for SqliteScheduleTransaction<'_> {
    fn schedules_for(
        &mut self,
        target_id: TargetId,
        scheduled_date: &ScheduledDate,
    ) -> Result<Vec<ScheduleRecord>, StoreError> {
        let target_id = encode_target_id(target_id)?;
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM ticket_schedules
             WHERE target_id = ?1 AND scheduled_on = ?2
             ORDER BY sequence"
        );
        Ok(query_schedules(self.connection, &sql, params![target_id, scheduled_date.as_str()])?)
    }

    fn insert_schedule(&mut self, record: &ScheduleRecord) -> Result<(), StoreError> {
        let target_id = encode_target_id(record.target_id)?;
        let fields = record.ticket_id.fields();
        let result = self
            .connection
            .prepare_cached(
                "INSERT INTO ticket_schedules (ticket_id, target_id, identity_code, \
                 target_created_on, target_code, scheduled_on, sequence)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .and_then(|mut stmt| {
                stmt.execute(params![
                    record.ticket_id.as_str(),
                    target_id,
                    fields.identity_code.as_str(),
                    fields.target_created.to_string(),
                    fields.target_code.as_str(),
                    fields.scheduled_date.as_str(),
                    i64::from(fields.sequence.get()),
                ])
            });
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(self.classify_constraint(record)?)
            }
            Err(err) => Err(classify_sqlite_error(err).into()),
        }
    }
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// Raw `ticket_schedules` row prior to validation.
struct ScheduleRow {
    /// Ticket identifier text.
    ticket_id: String,
    /// Target identifier.
    target_id: i64,
    /// Identity code column.
    identity_code: String,
    /// Target-created date column (`YYYYMMDD`).
    target_created_on: String,
    /// Target code column.
    target_code: String,
    /// Scheduled date column (`YYYYMMDD`).
    scheduled_on: String,
    /// Sequence column.
    sequence: i64,
}

impl ScheduleRow {
    /// Reads a row in [`SCHEDULE_COLUMNS`] order.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            ticket_id: row.get(0)?,
            target_id: row.get(1)?,
            identity_code: row.get(2)?,
            target_created_on: row.get(3)?,
            target_code: row.get(4)?,
            scheduled_on: row.get(5)?,
            sequence: row.get(6)?,
        })
    }

    /// Validates the row against the identifier it carries.
    fn into_record(self) -> Result<ScheduleRecord, SqliteStoreError> {
        let ticket_id = TicketId::parse(&self.ticket_id).map_err(|err| {
            SqliteStoreError::Corrupt(format!("stored ticket id is malformed: {err}"))
        })?;
        let target_id = u64::try_from(self.target_id)
            .ok()
            .and_then(TargetId::from_raw)
            .ok_or_else(|| {
                SqliteStoreError::Corrupt(format!("stored target id {} is invalid", self.target_id))
            })?;
        let fields = ticket_id.fields();
        let consistent = fields.identity_code.as_str() == self.identity_code
            && fields.target_created.to_string() == self.target_created_on
            && fields.target_code.as_str() == self.target_code
            && fields.scheduled_date.as_str() == self.scheduled_on
            && i64::from(fields.sequence.get()) == self.sequence;
        if !consistent {
            return Err(SqliteStoreError::Corrupt(format!(
                "columns disagree with ticket id {ticket_id}"
            )));
        }
        Ok(ScheduleRecord::new(target_id, ticket_id))
    }
}

/// Runs a schedule query and validates every row.
fn query_schedules(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<ScheduleRecord>, SqliteStoreError> {
    let mut stmt = connection.prepare_cached(sql).map_err(classify_sqlite_error)?;
    let rows = stmt.query_map(params, ScheduleRow::from_row).map_err(classify_sqlite_error)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(classify_sqlite_error)?.into_record()?);
    }
    Ok(records)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a target id into the `INTEGER` column representation.
fn encode_target_id(target_id: TargetId) -> Result<i64, SqliteStoreError> {
    i64::try_from(target_id.get()).map_err(|_| {
        SqliteStoreError::Invalid(format!("target id {target_id} exceeds sqlite integer range"))
    })
}

/// Maps an `SQLite` failure onto the store error taxonomy.
fn classify_sqlite_error(err: rusqlite::Error) -> SqliteStoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                tracing::debug!(error = %err, "sqlite contention");
                SqliteStoreError::Contention(err.to_string())
            }
            ErrorCode::ConstraintViolation => SqliteStoreError::Conflict(err.to_string()),
            _ => SqliteStoreError::Db(err.to_string()),
        },
        _ => SqliteStoreError::Db(err.to_string()),
    }
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(classify_sqlite_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(classify_sqlite_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS ticket_schedules (
                    ticket_id TEXT NOT NULL PRIMARY KEY,
                    target_id INTEGER NOT NULL,
                    identity_code TEXT NOT NULL,
                    target_created_on TEXT NOT NULL,
                    target_code TEXT NOT NULL,
                    scheduled_on TEXT NOT NULL,
                    sequence INTEGER NOT NULL CHECK (sequence BETWEEN 1 AND 99),
                    UNIQUE (target_id, target_created_on, scheduled_on, sequence)
                );
                CREATE INDEX IF NOT EXISTS idx_ticket_schedules_target_day
                    ON ticket_schedules (target_id, scheduled_on);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tracing::debug!(version = SCHEMA_VERSION, "sqlite ticket schema created");
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
