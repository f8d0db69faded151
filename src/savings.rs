use std::str::FromStr;

use diesel::{
	deserialize::{self, FromSql},
	prelude::*,
	serialize::{self, IsNull, Output, ToSql},
	sql_types::{Date as SqlDate, Double, Text},
	sqlite::Sqlite,
	AsExpression, FromSqlRow, SqliteConnection,
};
use diesel::backend::Backend;
use diesel::dsl::sum;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::db;
use crate::schema::savings_transactions;
use crate::types::{Date, Id, Time};

#[derive(AsExpression, FromSqlRow, Clone, Copy, Eq, PartialEq, EnumString, Display, AsRefStr, Debug)]
#[diesel(sql_type = Text)]
pub enum SavingsType {
	/// Money paid into the member's savings
	Lodgment,
	/// Money taken out of the member's savings
	Deduction,
}

impl SavingsType {
	/// The signed change `amount` makes to a savings balance
	pub fn delta(&self, amount: f64) -> f64 {
		match self {
			SavingsType::Lodgment => amount,
			SavingsType::Deduction => -amount,
		}
	}
}

impl ToSql<Text, Sqlite> for SavingsType {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
		let s: &str = self.as_ref();
		out.set_value(s);
		Ok(IsNull::No)
	}
}

impl FromSql<Text, Sqlite> for SavingsType {
	fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
		let s = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
		SavingsType::from_str(&s).map_err(|_| format!("invalid savings type '{}'", s).into())
	}
}

/// Immutable ledger entry against a member's savings
#[derive(Queryable, Identifiable, PartialEq, Debug, Clone)]
#[diesel(table_name = savings_transactions)]
pub struct SavingsTransaction {
	pub id: Id,
	pub member_id: Id,
	pub trans_date: Date,
	pub trans_type: SavingsType,
	/// Always positive; `trans_type` carries the direction
	pub amount: f64,
	/// Member's savings balance straight after this entry was posted
	pub running_balance: f64,
	pub created_at: Time,
}

impl SavingsTransaction {
	pub fn delta(&self) -> f64 {
		self.trans_type.delta(self.amount)
	}
}

#[derive(Insertable, Debug)]
#[diesel(table_name = savings_transactions)]
pub struct NewSavingsTransaction {
	pub member_id: Id,
	pub trans_date: Date,
	pub trans_type: SavingsType,
	pub amount: f64,
	pub running_balance: f64,
}

#[derive(QueryableByName)]
struct Total {
	#[diesel(sql_type = Double)]
	total: f64,
}

/// Data store implementation for the append-only savings ledger
pub struct Repo<'a> {
	conn: &'a mut SqliteConnection,
}

impl<'a> Repo<'a> {
	pub fn new(conn: &'a mut SqliteConnection) -> Self {
		Repo { conn }
	}

	pub fn create(&mut self, new_transaction: NewSavingsTransaction) -> db::Result<SavingsTransaction> {
		diesel::insert_into(savings_transactions::table)
			.values(&new_transaction)
			.get_result(self.conn)
			.map_err(Into::into)
	}

	/// A member's ledger, newest entry first
	pub fn find_by_member(&mut self, member_id: Id) -> db::Result<Vec<SavingsTransaction>> {
		savings_transactions::table
			.filter(savings_transactions::member_id.eq(member_id))
			.order((savings_transactions::trans_date.desc(), savings_transactions::id.desc()))
			.load(self.conn)
			.map_err(Into::into)
	}

	/// Sum of `trans_type` amounts posted on `start <= date < end`
	pub fn sum_between(&mut self, trans_type: SavingsType, start: Date, end: Date) -> db::Result<f64> {
		let total = savings_transactions::table
			.filter(savings_transactions::trans_type.eq(trans_type))
			.filter(savings_transactions::trans_date.ge(start))
			.filter(savings_transactions::trans_date.lt(end))
			.select(sum(savings_transactions::amount))
			.first::<Option<f64>>(self.conn)?;
		Ok(total.unwrap_or(0.0))
	}

	/// Society savings as they stood before `end`: each member's last running balance, summed
	pub fn position_before(&mut self, end: Date) -> db::Result<f64> {
		let row = diesel::sql_query(
			"SELECT COALESCE(SUM(s.running_balance), 0.0) AS total \
			 FROM savings_transactions s \
			 WHERE s.id = ( \
			     SELECT latest.id FROM savings_transactions latest \
			     WHERE latest.member_id = s.member_id AND latest.trans_date < ? \
			     ORDER BY latest.trans_date DESC, latest.id DESC LIMIT 1)",
		)
			.bind::<SqlDate, _>(end)
			.get_result::<Total>(self.conn)?;
		Ok(row.total)
	}
}
