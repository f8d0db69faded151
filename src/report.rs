use chrono::{Datelike, Months};
use diesel::SqliteConnection;
use log::*;

use crate::{db, loan, member, savings};
use crate::ledger::{Error, ErrorKind, Result};
use crate::loan::OverdueLoan;
use crate::member::Totals;
use crate::savings::SavingsType;
use crate::types::{month_bounds, round2, Date, DateExt};

/// Flat annual rate assumed on outstanding loans when projecting interest income
pub const PROJECTED_INTEREST_RATE: f64 = 0.12;
pub const MEMBERS_DIVIDEND_SHARE: f64 = 0.60;
pub const SOCIETY_DIVIDEND_SHARE: f64 = 0.40;
/// Liquidity ratio reported when nothing is lent out
pub const UNLIMITED_LIQUIDITY: f64 = 999.99;
/// Average rate assumed for a month in which no loan was issued
const FALLBACK_AVERAGE_RATE: f64 = 12.0;

#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct SocietyStats {
	pub total_members: i64,
	pub total_savings: f64,
	pub total_loans: f64,
	pub projected_interest: f64,
	pub members_share: f64,
	pub society_share: f64,
}

impl SocietyStats {
	pub fn from_totals(totals: &Totals) -> Self {
		let projected_interest = round2(totals.loans * PROJECTED_INTEREST_RATE);
		SocietyStats {
			total_members: totals.members,
			total_savings: round2(totals.savings),
			total_loans: round2(totals.loans),
			projected_interest,
			members_share: round2(projected_interest * MEMBERS_DIVIDEND_SHARE),
			society_share: round2(projected_interest * SOCIETY_DIVIDEND_SHARE),
		}
	}
}

/// Loans as a percentage of savings; zero when there are no savings
pub fn loan_to_savings_ratio(total_loans: f64, total_savings: f64) -> f64 {
	if total_savings == 0.0 {
		return 0.0;
	}
	round2(total_loans / total_savings * 100.0)
}

/// Savings and lending activity within one calendar month
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct MonthlySnapshot {
	pub year: i32,
	pub month: u32,
	pub lodgments: f64,
	pub deductions: f64,
	pub savings_growth: f64,
	pub new_loans: f64,
	/// Average applied rate of the month's loans, in percent
	pub average_interest_rate: f64,
	/// `new_loans × average_interest_rate / 100`
	pub interest_earned: f64,
}

/// Society position at the end of a calendar month
#[derive(PartialEq, Debug, Clone)]
pub struct TrendPoint {
	pub year: i32,
	pub month: u32,
	/// `YYYY-MM`
	pub label: String,
	pub savings: f64,
	pub loans: f64,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct LiquidityStatus {
	pub available_cash: f64,
	pub outstanding_loans: f64,
	pub liquidity_ratio: f64,
}

impl LiquidityStatus {
	pub fn from_totals(totals: &Totals) -> Self {
		let liquidity_ratio = if totals.loans > 0.0 {
			round2(totals.savings / totals.loans)
		} else {
			UNLIMITED_LIQUIDITY
		};
		LiquidityStatus {
			available_cash: round2(totals.savings),
			outstanding_loans: round2(totals.loans),
			liquidity_ratio,
		}
	}
}

/// Everything the dashboard shows in one read
#[derive(PartialEq, Debug, Clone)]
pub struct Dashboard {
	pub stats: SocietyStats,
	pub lts_ratio: f64,
	pub liquidity: LiquidityStatus,
	pub overdue: Vec<OverdueLoan>,
}

/// Read-only aggregation over the ledger
pub struct Reports {
	db: db::SqlitePool,
}

impl Reports {
	pub fn new(db: db::SqlitePool) -> Self {
		Reports { db }
	}

	pub fn society_stats(&self) -> Result<SocietyStats> {
		let totals = self.totals()?;
		Ok(SocietyStats::from_totals(&totals))
	}

	/// Loan-to-savings ratio in percent
	pub fn lts_ratio(&self) -> Result<f64> {
		let totals = self.totals()?;
		Ok(loan_to_savings_ratio(totals.loans, totals.savings))
	}

	/// Loans past due on `today` that have not been closed, earliest due first
	pub fn overdue_loans(&self, today: Date) -> Result<Vec<OverdueLoan>> {
		let mut pooled = self.db.get()?;
		loan::Repo::new(&mut pooled).find_overdue(today).map_err(Into::into)
	}

	pub fn monthly_snapshot(&self, year: i32, month: u32) -> Result<MonthlySnapshot> {
		let (start, end) = month_bounds(year, month).ok_or_else(|| {
			Error::new(ErrorKind::InvalidDate(format!("{}-{} is not a calendar month", year, month)))
		})?;

		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;

		let mut ledger = savings::Repo::new(conn);
		let lodgments = ledger.sum_between(SavingsType::Lodgment, start, end)?;
		let deductions = ledger.sum_between(SavingsType::Deduction, start, end)?;
		let issuance = loan::Repo::new(conn).issued_between(start, end)?;

		let average_interest_rate = issuance.average_rate.unwrap_or(FALLBACK_AVERAGE_RATE);
		Ok(MonthlySnapshot {
			year,
			month,
			lodgments: round2(lodgments),
			deductions: round2(deductions),
			savings_growth: round2(lodgments - deductions),
			new_loans: round2(issuance.principal),
			average_interest_rate: round2(average_interest_rate),
			interest_earned: round2(issuance.principal * average_interest_rate / 100.0),
		})
	}

	/// Savings and outstanding loans at the end of each of the last `months` months,
	/// oldest first, ending with the month containing `today`
	///
	/// Loans are counted by their current status, so a loan closed later no longer
	/// appears in earlier months.
	pub fn monthly_trend(&self, months: u32, today: Date) -> Result<Vec<TrendPoint>> {
		let first_of_month = today.with_day(1).ok_or_else(|| {
			Error::new(ErrorKind::InvalidDate(format!("no first day for {}", today)))
		})?;

		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;

		let mut trend = Vec::with_capacity(months as usize);
		for back in (0..months).rev() {
			let start = first_of_month.checked_sub_months(Months::new(back));
			let end = start.and_then(|s| s.increment_date_by_months(1));
			let (start, end) = match (start, end) {
				(Some(start), Some(end)) => (start, end),
				_ => return Err(Error::new(ErrorKind::InvalidDate(format!("{} months before {}", back, today)))),
			};

			let savings = savings::Repo::new(conn).position_before(end)?;
			let loans = loan::Repo::new(conn).outstanding_before(end)?;
			trend.push(TrendPoint {
				year: start.year(),
				month: start.month(),
				label: start.format("%Y-%m").to_string(),
				savings: round2(savings),
				loans: round2(loans),
			});
		}
		Ok(trend)
	}

	pub fn liquidity_status(&self) -> Result<LiquidityStatus> {
		let totals = self.totals()?;
		Ok(LiquidityStatus::from_totals(&totals))
	}

	pub fn dashboard(&self, today: Date) -> Result<Dashboard> {
		let totals = self.totals()?;
		let overdue = self.overdue_loans(today)?;
		if !overdue.is_empty() {
			debug!(target: "ledger::report", "{} overdue loan(s) as of {}", overdue.len(), today);
		}

		Ok(Dashboard {
			stats: SocietyStats::from_totals(&totals),
			lts_ratio: loan_to_savings_ratio(totals.loans, totals.savings),
			liquidity: LiquidityStatus::from_totals(&totals),
			overdue,
		})
	}

	fn totals(&self) -> Result<Totals> {
		let mut pooled = self.db.get()?;
		member::Repo::new(&mut pooled).totals().map_err(Into::into)
	}
}
