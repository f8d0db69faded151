#![allow(dead_code)]

use std::cell::Cell;

pub use approx::assert_relative_eq;
pub use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::SqliteConnection;
use tempfile::TempDir;

pub use thrift_ledger::*;
use thrift_ledger::db::SqlitePool;
use thrift_ledger::types::{Date, Time};

pub fn date(y: i32, m: u32, d: u32) -> Date {
	Date::from_ymd_opt(y, m, d).unwrap()
}

/// Calendar pinned to a date the test can move
pub struct FixedCalendar {
	today: Cell<Date>,
}

impl FixedCalendar {
	pub fn on(today: Date) -> Self {
		FixedCalendar { today: Cell::new(today) }
	}

	pub fn set_today(&self, today: Date) {
		self.today.set(today);
	}
}

impl Calendar for FixedCalendar {
	fn today(&self) -> Date {
		self.today.get()
	}

	fn now(&self) -> Time {
		self.today.get().and_hms_opt(9, 30, 0).unwrap()
	}
}

pub struct Fixture {
	pub pool: SqlitePool,
	pub calendar: FixedCalendar,
	_dir: TempDir,
}

impl Fixture {
	pub fn new() -> Self {
		Fixture::on(date(2025, 3, 14))
	}

	pub fn on(today: Date) -> Self {
		let dir = tempfile::tempdir().expect("creating temp dir");
		let path = dir.path().join("ledger.db");
		let pool = db::sqlite_pool(path.to_str().unwrap(), 4).expect("opening pool");
		db::run_migrations(&pool).expect("migrating");

		Fixture {
			pool,
			calendar: FixedCalendar::on(today),
			_dir: dir,
		}
	}

	pub fn conn(&self) -> PooledConnection<ConnectionManager<SqliteConnection>> {
		self.pool.get().unwrap()
	}

	pub fn service(&self) -> Service<'_> {
		Service::new(NewService {
			db: self.pool.clone(),
			calendar: &self.calendar,
		})
	}

	pub fn reports(&self) -> Reports {
		Reports::new(self.pool.clone())
	}

	/// Registers a member through the service with the given opening balances
	pub fn member(&self, staff_number: &str, full_name: &str, savings: f64, loans: f64) -> Member {
		self.service()
			.register_member(&NewMemberRequest {
				staff_number: staff_number.to_string(),
				full_name: full_name.to_string(),
				bank_name: "UBA".to_string(),
				department: "SLT".to_string(),
				initial_savings: savings,
				initial_loans: loans,
				..Default::default()
			})
			.unwrap()
	}

	pub fn count(&self, table: &str) -> i64 {
		#[derive(QueryableByName)]
		struct Count {
			#[diesel(sql_type = diesel::sql_types::BigInt)]
			n: i64,
		}

		diesel::sql_query(format!("SELECT COUNT(*) AS n FROM {}", table))
			.get_result::<Count>(&mut self.conn())
			.unwrap()
			.n
	}
}
