use std::str::FromStr;
use std::time::Duration;

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
use crate::loan::eligibility_limit;
use crate::schema::system_settings;
use crate::types::{round2, Id, Time};

/// The settings table only ever holds this row
pub const SETTINGS_ID: Id = 1;

pub const DEFAULT_LOAN_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_INTEREST_RATE: f64 = 12.0;
pub const DEFAULT_DURATION_MONTHS: u32 = 24;

#[derive(AsExpression, FromSqlRow, Clone, Copy, Eq, PartialEq, EnumString, Display, AsRefStr, Debug)]
#[diesel(sql_type = Text)]
#[strum(serialize_all = "snake_case")]
pub enum SecurityMode {
	Pin,
	Password,
	/// Delegated to the operating system's credential prompt
	SystemAuth,
}

impl ToSql<Text, Sqlite> for SecurityMode {
	fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
		let s: &str = self.as_ref();
		out.set_value(s);
		Ok(IsNull::No)
	}
}

impl FromSql<Text, Sqlite> for SecurityMode {
	fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
		let s = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
		SecurityMode::from_str(&s).map_err(|_| format!("invalid security mode '{}'", s).into())
	}
}

#[derive(Queryable, Identifiable, PartialEq, Debug, Clone)]
#[diesel(table_name = system_settings)]
pub struct Settings {
	pub id: Id,
	pub society_name: String,
	pub street: String,
	pub city_state: String,
	pub phone: String,
	pub email: String,
	pub reg_no: String,
	pub loan_multiplier: f64,
	pub default_interest_rate: f64,
	pub default_duration: i32,
	pub updated_at: Time,
	pub security_mode: SecurityMode,
	/// Salted hash of the PIN or password, see `security::hash_credential`
	pub auth_hash: Option<String>,
	pub timeout_minutes: i32,
	pub theme: String,
	pub text_scale: f64,
	pub show_charts: bool,
	pub show_alerts: bool,
	pub setup_completed: bool,
}

impl Settings {
	pub fn loan_policy(&self) -> LoanPolicy {
		LoanPolicy {
			multiplier: self.loan_multiplier,
			default_interest_rate: self.default_interest_rate,
			default_duration_months: u32::try_from(self.default_duration).unwrap_or(DEFAULT_DURATION_MONTHS),
		}
	}

	/// Idle time after which the ledger locks itself
	pub fn inactivity_timeout(&self) -> Duration {
		let minutes = u64::try_from(self.timeout_minutes).unwrap_or(0);
		Duration::from_secs(minutes * 60)
	}
}

/// Lending rules in force for a single operation
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct LoanPolicy {
	pub multiplier: f64,
	/// Annual percentage applied when an application gives none
	pub default_interest_rate: f64,
	pub default_duration_months: u32,
}

impl Default for LoanPolicy {
	fn default() -> Self {
		LoanPolicy {
			multiplier: DEFAULT_LOAN_MULTIPLIER,
			default_interest_rate: DEFAULT_INTEREST_RATE,
			default_duration_months: DEFAULT_DURATION_MONTHS,
		}
	}
}

impl LoanPolicy {
	/// Limit in whole kobo, so a balance and principal that print alike compare alike
	pub fn eligibility_limit(&self, savings_balance: f64) -> f64 {
		round2(eligibility_limit(round2(savings_balance), self.multiplier))
	}
}

/// Settings fields to overwrite. `None` leaves the column untouched.
#[derive(AsChangeset, Default, PartialEq, Debug, Clone)]
#[diesel(table_name = system_settings)]
pub struct SettingsChanges {
	pub society_name: Option<String>,
	pub street: Option<String>,
	pub city_state: Option<String>,
	pub phone: Option<String>,
	pub email: Option<String>,
	pub reg_no: Option<String>,
	pub loan_multiplier: Option<f64>,
	pub default_interest_rate: Option<f64>,
	pub default_duration: Option<i32>,
	pub security_mode: Option<SecurityMode>,
	pub auth_hash: Option<String>,
	pub timeout_minutes: Option<i32>,
	pub theme: Option<String>,
	pub text_scale: Option<f64>,
	pub show_charts: Option<bool>,
	pub show_alerts: Option<bool>,
	pub setup_completed: Option<bool>,
}

/// Data store implementation for the settings singleton
pub struct Repo<'a> {
	conn: &'a mut SqliteConnection,
}

impl<'a> Repo<'a> {
	pub fn new(conn: &'a mut SqliteConnection) -> Self {
		Repo { conn }
	}

	pub fn load(&mut self) -> db::Result<Settings> {
		system_settings::table
			.find(SETTINGS_ID)
			.first(self.conn)
			.map_err(Into::into)
	}

	/// Loads the settings row, writing one with column defaults first if it is missing
	pub fn load_or_create(&mut self) -> db::Result<Settings> {
		match self.load() {
			Err(db::Error::RecordNotFound) => {
				diesel::insert_or_ignore_into(system_settings::table)
					.values(system_settings::id.eq(SETTINGS_ID))
					.execute(self.conn)?;
				self.load()
			}
			other => other,
		}
	}

	pub fn apply(&mut self, changes: &SettingsChanges, now: Time) -> db::Result<Settings> {
		diesel::update(system_settings::table.find(SETTINGS_ID))
			.set((changes, system_settings::updated_at.eq(now)))
			.get_result(self.conn)
			.map_err(Into::into)
	}
}
