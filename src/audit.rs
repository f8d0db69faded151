use std::str::FromStr;

use diesel::{
	deserialize::{self, FromSql},
	prelude::*,
	serialize::{self, IsNull, Output, ToSql},
	sql_types::Text,
	sqlite::Sqlite,
	AsExpression, FromSqlRow, SqliteConnection,
};
use diesel::backend::Backend;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::db;
use crate::schema::audit_logs;
use crate::types::{Id, Time};

/// Identity every entry is recorded under; the ledger has a single operator
pub const ADMIN_USER: &str = "Admin";

/// Areas of the ledger an entry can be filed under
#[derive(Clone, Copy, Eq, PartialEq, EnumString, Display, AsRefStr, Debug)]
pub enum AuditCategory {
	Members,
	Savings,
	Loans,
	Settings,
	Security,
}

#[derive(AsExpression, FromSqlRow, Clone, Copy, Eq, PartialEq, EnumString, Display, AsRefStr, Debug)]
#[diesel(sql_type = Text)]
pub enum AuditStatus {
	Success,
	Failed,
}

impl ToSql<Text, Sqlite> for AuditStatus {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
		let s: &str = self.as_ref();
		out.set_value(s);
		Ok(IsNull::No)
	}
}

impl FromSql<Text, Sqlite> for AuditStatus {
	fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
		let s = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
		AuditStatus::from_str(&s).map_err(|_| format!("invalid audit status '{}'", s).into())
	}
}

#[derive(Queryable, Identifiable, PartialEq, Debug, Clone)]
#[diesel(table_name = audit_logs)]
pub struct AuditLog {
	pub id: Id,
	pub timestamp: Time,
	pub user: String,
	/// Free text so entries written by older builds stay readable
	pub category: String,
	pub description: String,
	pub status: AuditStatus,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = audit_logs)]
pub struct NewAuditLog<'a> {
	pub timestamp: Time,
	pub user: &'a str,
	pub category: &'a str,
	pub description: &'a str,
	pub status: AuditStatus,
}

/// Narrows an audit listing. Empty filter lists everything.
#[derive(Default, PartialEq, Debug, Clone)]
pub struct AuditFilter {
	pub category: Option<String>,
	/// Case-insensitive substring of the user or description
	pub search: Option<String>,
}

/// Data store implementation for the append-only audit trail
pub struct Repo<'a> {
	conn: &'a mut SqliteConnection,
}

impl<'a> Repo<'a> {
	pub fn new(conn: &'a mut SqliteConnection) -> Self {
		Repo { conn }
	}

	pub fn append(&mut self, entry: NewAuditLog) -> db::Result<AuditLog> {
		diesel::insert_into(audit_logs::table)
			.values(&entry)
			.get_result(self.conn)
			.map_err(Into::into)
	}

	/// Entries matching `filter`, newest first
	pub fn list(&mut self, filter: &AuditFilter) -> db::Result<Vec<AuditLog>> {
		let mut query = audit_logs::table.into_boxed();

		if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
			query = query.filter(audit_logs::category.eq(category.to_string()));
		}
		if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
			let pattern = format!("%{}%", escape_like(search));
			query = query.filter(
				audit_logs::user.like(pattern.clone()).escape('\\')
					.or(audit_logs::description.like(pattern).escape('\\'))
			);
		}

		query
			.order((audit_logs::timestamp.desc(), audit_logs::id.desc()))
			.load(self.conn)
			.map_err(Into::into)
	}

	/// Every category that has at least one entry, alphabetically
	pub fn categories(&mut self) -> db::Result<Vec<String>> {
		audit_logs::table
			.select(audit_logs::category)
			.distinct()
			.order(audit_logs::category.asc())
			.load(self.conn)
			.map_err(Into::into)
	}
}

/// Makes `%` and `_` match themselves inside a `LIKE` pattern escaped with `\`
fn escape_like(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		if matches!(c, '\\' | '%' | '_') {
			escaped.push('\\');
		}
		escaped.push(c);
	}
	escaped
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDate;

	use crate::testutil::*;

	use super::*;

	fn at(hour: u32) -> Time {
		NaiveDate::from_ymd_opt(2025, 5, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap()
	}

	fn seed(repo: &mut Repo) {
		let entries = vec![
			(at(8), AuditCategory::Members, "Registered SLT/001", AuditStatus::Success),
			(at(9), AuditCategory::Loans, "Loan approved for SLT/001", AuditStatus::Success),
			(at(10), AuditCategory::Loans, "Loan rejected for SLT/002", AuditStatus::Failed),
			(at(11), AuditCategory::Security, "Login failed", AuditStatus::Failed),
		];
		for (timestamp, category, description, status) in entries {
			repo.append(NewAuditLog {
				timestamp,
				user: ADMIN_USER,
				category: category.as_ref(),
				description,
				status,
			}).unwrap();
		}
	}

	#[test]
	fn list_newest_first() {
		let f = Fixture::new();
		let mut conn = f.conn();
		let mut repo = Repo::new(&mut conn);
		seed(&mut repo);

		let logs = repo.list(&AuditFilter::default()).unwrap();
		assert_eq!(logs.len(), 4);
		assert_eq!(logs[0].description, "Login failed");
		assert_eq!(logs[3].category, "Members");
		assert_eq!(logs[0].user, ADMIN_USER);
	}

	#[test]
	fn filter_by_category_and_search() {
		let f = Fixture::new();
		let mut conn = f.conn();
		let mut repo = Repo::new(&mut conn);
		seed(&mut repo);

		let loans = repo.list(&AuditFilter { category: Some("Loans".to_string()), search: None }).unwrap();
		assert_eq!(loans.len(), 2);

		let rejected = repo.list(&AuditFilter {
			category: Some("Loans".to_string()),
			search: Some("REJECTED".to_string()),
		}).unwrap();
		assert_eq!(rejected.len(), 1);
		assert_eq!(rejected[0].status, AuditStatus::Failed);

		let by_staff = repo.list(&AuditFilter { category: None, search: Some(" SLT/001 ".to_string()) }).unwrap();
		assert_eq!(by_staff.len(), 2);
	}

	#[test]
	fn search_wildcards_match_literally() {
		let f = Fixture::new();
		let mut conn = f.conn();
		let mut repo = Repo::new(&mut conn);
		seed(&mut repo);
		repo.append(NewAuditLog {
			timestamp: at(12),
			user: ADMIN_USER,
			category: AuditCategory::Savings.as_ref(),
			description: "Lodgment of 100% of arrears for SLT_003",
			status: AuditStatus::Success,
		}).unwrap();

		let percent = repo.list(&AuditFilter { category: None, search: Some("0%".to_string()) }).unwrap();
		assert_eq!(percent.len(), 1);

		let underscore = repo.list(&AuditFilter { category: None, search: Some("SLT_00".to_string()) }).unwrap();
		assert_eq!(underscore.len(), 1);
		assert_eq!(underscore[0].category, "Savings");

		assert_eq!(escape_like(r"50%_a\b"), r"50\%\_a\\b");
	}

	#[test]
	fn distinct_categories() {
		let f = Fixture::new();
		let mut conn = f.conn();
		let mut repo = Repo::new(&mut conn);
		seed(&mut repo);

		assert_eq!(repo.categories().unwrap(), vec!["Loans", "Members", "Security"]);
	}
}
