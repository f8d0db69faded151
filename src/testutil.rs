use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::SqliteConnection;
use tempfile::TempDir;

use crate::db;
use crate::member::{Member, NewMember};
use crate::schema::members;
use crate::types::Date;

/// A freshly migrated ledger in its own temporary directory
pub struct Fixture {
	pub pool: db::SqlitePool,
	pub member_factory: MemberFactory,
	_dir: TempDir,
}

impl Fixture {
	pub fn new() -> Self {
		let dir = tempfile::tempdir().expect("creating temp dir");
		let path = dir.path().join("ledger.db");
		let pool = db::sqlite_pool(path.to_str().expect("utf-8 temp path"), 4).expect("opening pool");
		db::run_migrations(&pool).expect("migrating");

		let member_factory = MemberFactory::new(pool.clone());
		Fixture {
			pool,
			member_factory,
			_dir: dir,
		}
	}

	pub fn conn(&self) -> PooledConnection<ConnectionManager<SqliteConnection>> {
		self.pool.get().unwrap()
	}
}

pub struct MemberFactory {
	pool: db::SqlitePool,
}

impl MemberFactory {
	fn new(pool: db::SqlitePool) -> Self {
		MemberFactory { pool }
	}

	pub fn defaults() -> NewMember<'static> {
		NewMember {
			staff_number: "SLT/000",
			full_name: "Default Member",
			phone: "",
			bank_name: "UBA",
			account_no: "",
			department: "SLT",
			date_joined: Date::from_ymd_opt(2024, 1, 15).unwrap(),
			current_savings: 0.0,
			total_loans: 0.0,
		}
	}

	pub fn member(&self, new_member: NewMember) -> Member {
		let mut conn = self.pool.get().unwrap();
		diesel::insert_into(members::table)
			.values(&new_member)
			.get_result::<Member>(&mut conn)
			.unwrap()
	}

	pub fn ada(&self) -> Member {
		self.member(NewMember {
			staff_number: "SLT/001",
			full_name: "Ada Obi",
			phone: "+2348012345678",
			account_no: "0123456789",
			..MemberFactory::defaults()
		})
	}

	pub fn bola(&self) -> Member {
		self.member(NewMember {
			staff_number: "SLT/002",
			full_name: "Bola Ade",
			department: "Admin",
			..MemberFactory::defaults()
		})
	}
}
