use std::{env, fmt};
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, PoolError};
use diesel::result::DatabaseErrorKind::{ForeignKeyViolation, UniqueViolation};
use diesel::result::Error::{DatabaseError, NotFound};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenv::dotenv;
use log::*;

pub type Result<T> = std::result::Result<T, Error>;
pub type SqlitePool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const DEFAULT_DATABASE_URL: &str = "swiftledger.db";
const DEFAULT_POOL_SIZE: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Location of the ledger file
///
/// Reads `DATABASE_URL`, loading a `.env` file from the working directory first.
/// Falls back to `swiftledger.db` next to the executable's working directory.
pub fn database_url() -> String {
	dotenv().ok();
	env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

fn pool_size() -> u32 {
	env::var("LEDGER_POOL_SIZE")
		.ok()
		.and_then(|v| v.parse().ok())
		.filter(|n| *n > 0)
		.unwrap_or(DEFAULT_POOL_SIZE)
}

/// Get a pool of connections to the configured SQLite ledger file
pub fn sqlite_connection() -> Result<SqlitePool> {
	sqlite_pool(&database_url(), pool_size())
}

/// Get a pool of connections to the SQLite file at `database_url`
///
/// Every connection handed out by the pool enforces foreign keys, which the
/// member cascade relies on.
pub fn sqlite_pool(database_url: &str, max_size: u32) -> Result<SqlitePool> {
	let manager = ConnectionManager::<SqliteConnection>::new(database_url);
	let pool = r2d2::Pool::builder()
		.max_size(max_size)
		.connection_customizer(Box::new(ConnectionOptions { busy_timeout: BUSY_TIMEOUT }))
		.build(manager)?;

	debug!(target: "ledger::db", "opened pool of {} connection(s) to {}", max_size, database_url);
	Ok(pool)
}

/// Apply every embedded migration the ledger file has not seen yet
///
/// Migrations are additive, so running this against an older ledger keeps its rows
/// and backfills new columns with their defaults.
pub fn run_migrations(pool: &SqlitePool) -> Result<()> {
	let mut pooled = pool.get()?;
	let conn: &mut SqliteConnection = &mut pooled;
	let applied = conn
		.run_pending_migrations(MIGRATIONS)
		.map_err(|e| Error::Migration(e.to_string()))?;

	for version in applied {
		info!(target: "ledger::db", "applied migration {}", version);
	}
	Ok(())
}

#[derive(Debug)]
struct ConnectionOptions {
	busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
	fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
		let pragmas = format!(
			"PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
			self.busy_timeout.as_millis()
		);
		conn.batch_execute(&pragmas).map_err(r2d2::Error::QueryError)
	}
}

/// Error that can occur when querying against the database
#[derive(Debug, PartialEq)]
pub enum Error {
	RecordAlreadyExists,
	RecordNotFound,
	ForeignKeyViolation,
	Connection(String),
	Migration(String),
	/// Used as a catch-all for any other storage failure
	Query(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::RecordAlreadyExists => write!(f, "record violates a unique constraint"),
			Error::RecordNotFound => write!(f, "record does not exist"),
			Error::ForeignKeyViolation => write!(f, "record references a row that does not exist"),
			Error::Connection(e) => write!(f, "opening database connection: {}", e),
			Error::Migration(e) => write!(f, "migrating database: {}", e),
			Error::Query(e) => write!(f, "database error: {}", e),
		}
	}
}

impl std::error::Error for Error {}

impl From<diesel::result::Error> for Error {
	fn from(e: diesel::result::Error) -> Self {
		match e {
			DatabaseError(UniqueViolation, _) => Error::RecordAlreadyExists,
			DatabaseError(ForeignKeyViolation, _) => Error::ForeignKeyViolation,
			NotFound => Error::RecordNotFound,

			_ => Error::Query(e.to_string()),
		}
	}
}

impl From<PoolError> for Error {
	fn from(e: PoolError) -> Self {
		Error::Connection(e.to_string())
	}
}
