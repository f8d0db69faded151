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
use diesel::dsl::{avg, sum};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::db;
use crate::schedule::{self, ScheduleRow};
use crate::schema::{loans, members};
use crate::types::{Date, Id, Time};

/// Largest principal a member with `savings_balance` may borrow
pub fn eligibility_limit(savings_balance: f64, multiplier: f64) -> f64 {
	multiplier * savings_balance
}

#[derive(AsExpression, FromSqlRow, Clone, Copy, Eq, PartialEq, EnumString, Display, AsRefStr, Debug)]
#[diesel(sql_type = Text)]
pub enum LoanStatus {
	Active,
	Closed,
	Default,
}

impl Default for LoanStatus {
	fn default() -> Self { LoanStatus::Active }
}

impl LoanStatus {
	/// Loans only ever leave `Active`, and only once
	pub fn can_transition_to(&self, next: LoanStatus) -> bool {
		matches!((self, next), (LoanStatus::Active, LoanStatus::Closed) | (LoanStatus::Active, LoanStatus::Default))
	}
}

impl ToSql<Text, Sqlite> for LoanStatus {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
		let s: &str = self.as_ref();
		out.set_value(s);
		Ok(IsNull::No)
	}
}

impl FromSql<Text, Sqlite> for LoanStatus {
	fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
		let s = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
		LoanStatus::from_str(&s).map_err(|_| format!("invalid loan status '{}'", s).into())
	}
}

#[derive(Queryable, Identifiable, PartialEq, Debug, Clone)]
#[diesel(table_name = loans)]
pub struct Loan {
	pub id: Id,
	pub member_id: Id,
	pub principal: f64,
	/// Annual percentage actually applied at issue, kept even if the default later changes
	pub interest_rate: f64,
	pub duration_months: i32,
	pub status: LoanStatus,
	pub date_issued: Date,
	pub due_date: Date,
	pub created_at: Time,
}

impl Loan {
	/// Repayment schedule for the loan's applied rate and duration
	pub fn schedule(&self) -> Vec<ScheduleRow> {
		let months = u32::try_from(self.duration_months).unwrap_or(0);
		schedule::calculate_repayment_schedule(self.principal, self.interest_rate, months)
	}
}

#[derive(Insertable, Debug)]
#[diesel(table_name = loans)]
pub struct NewLoan {
	pub member_id: Id,
	pub principal: f64,
	pub interest_rate: f64,
	pub duration_months: i32,
	pub status: LoanStatus,
	pub date_issued: Date,
	pub due_date: Date,
}

/// A loan past its due date together with who owes it
#[derive(Queryable, PartialEq, Debug, Clone)]
pub struct OverdueLoan {
	pub loan_id: Id,
	pub member_id: Id,
	pub full_name: String,
	pub staff_number: String,
	pub principal: f64,
	pub status: LoanStatus,
	pub due_date: Date,
}

/// Principal issued over a period and the average rate it was issued at
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct Issuance {
	pub principal: f64,
	/// `None` when nothing was issued
	pub average_rate: Option<f64>,
}

/// Data store implementation for operating on loans in the database
pub struct Repo<'a> {
	conn: &'a mut SqliteConnection,
}

impl<'a> Repo<'a> {
	pub fn new(conn: &'a mut SqliteConnection) -> Self {
		Repo { conn }
	}

	pub fn create(&mut self, new_loan: NewLoan) -> db::Result<Loan> {
		diesel::insert_into(loans::table)
			.values(&new_loan)
			.get_result(self.conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&mut self, id: Id) -> db::Result<Loan> {
		loans::table
			.find(id)
			.first(self.conn)
			.map_err(Into::into)
	}

	/// A member's loans, latest issued first
	pub fn find_by_member(&mut self, member_id: Id) -> db::Result<Vec<Loan>> {
		loans::table
			.filter(loans::member_id.eq(member_id))
			.order((loans::date_issued.desc(), loans::id.desc()))
			.load(self.conn)
			.map_err(Into::into)
	}

	pub fn set_status(&mut self, id: Id, status: LoanStatus) -> db::Result<Loan> {
		diesel::update(loans::table.find(id))
			.set(loans::status.eq(status))
			.get_result(self.conn)
			.map_err(Into::into)
	}

	/// Unsettled loans due before `today`, earliest due first
	pub fn find_overdue(&mut self, today: Date) -> db::Result<Vec<OverdueLoan>> {
		loans::table
			.inner_join(members::table)
			.filter(loans::due_date.lt(today))
			.filter(loans::status.ne(LoanStatus::Closed))
			.order((loans::due_date.asc(), loans::id.asc()))
			.select((
				loans::id,
				loans::member_id,
				members::full_name,
				members::staff_number,
				loans::principal,
				loans::status,
				loans::due_date,
			))
			.load(self.conn)
			.map_err(Into::into)
	}

	/// Loans issued on `start <= date < end`
	pub fn issued_between(&mut self, start: Date, end: Date) -> db::Result<Issuance> {
		let (principal, average_rate) = loans::table
			.filter(loans::date_issued.ge(start))
			.filter(loans::date_issued.lt(end))
			.select((sum(loans::principal), avg(loans::interest_rate)))
			.first::<(Option<f64>, Option<f64>)>(self.conn)?;

		Ok(Issuance {
			principal: principal.unwrap_or(0.0),
			average_rate,
		})
	}

	/// Principal of loans issued before `end` that have not been closed
	pub fn outstanding_before(&mut self, end: Date) -> db::Result<f64> {
		let total = loans::table
			.filter(loans::date_issued.lt(end))
			.filter(loans::status.ne(LoanStatus::Closed))
			.select(sum(loans::principal))
			.first::<Option<f64>>(self.conn)?;
		Ok(total.unwrap_or(0.0))
	}
}

#[cfg(test)]
mod tests {
	use crate::testutil::*;

	use super::*;

	fn date(y: i32, m: u32, d: u32) -> Date {
		Date::from_ymd_opt(y, m, d).unwrap()
	}

	fn new_loan(member_id: Id, principal: f64, rate: f64, issued: Date, due: Date) -> NewLoan {
		NewLoan {
			member_id,
			principal,
			interest_rate: rate,
			duration_months: 24,
			status: LoanStatus::Active,
			date_issued: issued,
			due_date: due,
		}
	}

	#[test]
	fn eligibility_is_savings_times_multiplier() {
		assert_eq!(eligibility_limit(1000.0, 2.0), 2000.0);
		assert_eq!(eligibility_limit(0.0, 2.0), 0.0);
		assert_eq!(eligibility_limit(1500.0, 3.0), 4500.0);
	}

	#[test]
	fn status_transitions() {
		assert!(LoanStatus::Active.can_transition_to(LoanStatus::Closed));
		assert!(LoanStatus::Active.can_transition_to(LoanStatus::Default));
		assert!(!LoanStatus::Active.can_transition_to(LoanStatus::Active));
		assert!(!LoanStatus::Closed.can_transition_to(LoanStatus::Active));
		assert!(!LoanStatus::Default.can_transition_to(LoanStatus::Closed));
	}

	#[test]
	fn create_loan() {
		let f = Fixture::new();
		let ada = f.member_factory.ada();
		let mut conn = f.conn();

		let got = Repo::new(&mut conn)
			.create(new_loan(ada.id, 5000.0, 12.0, date(2025, 1, 10), date(2027, 1, 10)))
			.unwrap();

		assert_eq!(got.member_id, ada.id);
		assert_eq!(got.principal, 5000.0);
		assert_eq!(got.status, LoanStatus::Active);
		assert_eq!(got.due_date, date(2027, 1, 10));
		assert_eq!(got.schedule().len(), 24);
	}

	#[test]
	fn loan_requires_existing_member() {
		let f = Fixture::new();
		let mut conn = f.conn();

		let err = Repo::new(&mut conn)
			.create(new_loan(404, 100.0, 12.0, date(2025, 1, 10), date(2027, 1, 10)))
			.unwrap_err();
		assert_eq!(err, db::Error::ForeignKeyViolation);
	}

	#[test]
	fn overdue_excludes_closed_and_future_loans() {
		let f = Fixture::new();
		let ada = f.member_factory.ada();
		let bola = f.member_factory.bola();
		let mut conn = f.conn();
		let mut repo = Repo::new(&mut conn);

		let late = repo.create(new_loan(ada.id, 300.0, 12.0, date(2023, 1, 1), date(2024, 6, 1))).unwrap();
		let later = repo.create(new_loan(bola.id, 200.0, 12.0, date(2023, 1, 1), date(2024, 3, 1))).unwrap();
		let closed = repo.create(new_loan(ada.id, 100.0, 12.0, date(2023, 1, 1), date(2024, 1, 1))).unwrap();
		repo.set_status(closed.id, LoanStatus::Closed).unwrap();
		repo.create(new_loan(ada.id, 100.0, 12.0, date(2025, 1, 1), date(2027, 1, 1))).unwrap();

		let overdue = repo.find_overdue(date(2025, 2, 1)).unwrap();
		let ids: Vec<Id> = overdue.iter().map(|o| o.loan_id).collect();
		assert_eq!(ids, vec![later.id, late.id]);
		assert_eq!(overdue[0].full_name, bola.full_name);
		assert_eq!(overdue[1].staff_number, ada.staff_number);
	}

	#[test]
	fn issuance_within_month() {
		let f = Fixture::new();
		let ada = f.member_factory.ada();
		let mut conn = f.conn();
		let mut repo = Repo::new(&mut conn);

		repo.create(new_loan(ada.id, 1000.0, 10.0, date(2025, 3, 1), date(2027, 3, 1))).unwrap();
		repo.create(new_loan(ada.id, 3000.0, 14.0, date(2025, 3, 31), date(2027, 3, 31))).unwrap();
		repo.create(new_loan(ada.id, 9000.0, 12.0, date(2025, 4, 1), date(2027, 4, 1))).unwrap();

		let march = repo.issued_between(date(2025, 3, 1), date(2025, 4, 1)).unwrap();
		assert_eq!(march, Issuance { principal: 4000.0, average_rate: Some(12.0) });

		let february = repo.issued_between(date(2025, 2, 1), date(2025, 3, 1)).unwrap();
		assert_eq!(february, Issuance::default());

		assert_eq!(repo.outstanding_before(date(2025, 4, 1)).unwrap(), 4000.0);
		assert_eq!(repo.outstanding_before(date(2025, 5, 1)).unwrap(), 13000.0);
	}
}
