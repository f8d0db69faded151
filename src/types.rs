use chrono::{Months, NaiveDate, NaiveDateTime};

pub type Id = i32;
pub type Time = NaiveDateTime;
pub type Date = NaiveDate;

/// Currency symbol used in every user-facing amount
pub const CURRENCY: &str = "₦";

pub trait DateExt {
	/// Adds calendar months, clamping the day to the end of a shorter month.
	/// `None` when the result falls outside chrono's supported range.
	fn increment_date_by_months(&self, num_months: u32) -> Option<Date>;
}

impl DateExt for Date {
	fn increment_date_by_months(&self, num_months: u32) -> Option<Date> {
		self.checked_add_months(Months::new(num_months))
	}
}

/// Half-open `[first day, first day of next month)` range of a calendar month
pub fn month_bounds(year: i32, month: u32) -> Option<(Date, Date)> {
	let start = Date::from_ymd_opt(year, month, 1)?;
	let end = start.increment_date_by_months(1)?;
	Some((start, end))
}

/// Rounds to two decimal places.
///
/// Works from the exact decimal expansion of `value` with ties going to even,
/// the same result a decimal-aware `round(value, 2)` produces.
pub fn round2(value: f64) -> f64 {
	format!("{:.2}", value).parse().unwrap_or(value)
}

/// Formats an amount as `₦1,234.56`
pub fn format_money(amount: f64) -> String {
	let fixed = format!("{:.2}", amount.abs());
	let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

	let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
	for (i, digit) in whole.chars().enumerate() {
		if i > 0 && (whole.len() - i) % 3 == 0 {
			grouped.push(',');
		}
		grouped.push(digit);
	}

	let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
	format!("{}{}{}.{}", sign, CURRENCY, grouped, fraction)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn increment_date_by_months() {
		let test_cases = vec![
			(Date::from_ymd_opt(2024, 1, 15).unwrap(), 24, Date::from_ymd_opt(2026, 1, 15).unwrap()),
			(Date::from_ymd_opt(2024, 11, 30).unwrap(), 3, Date::from_ymd_opt(2025, 2, 28).unwrap()),
			(Date::from_ymd_opt(2024, 1, 31).unwrap(), 1, Date::from_ymd_opt(2024, 2, 29).unwrap()),
			(Date::from_ymd_opt(2024, 12, 1).unwrap(), 1, Date::from_ymd_opt(2025, 1, 1).unwrap()),
		];

		for (date, months, want) in test_cases {
			assert_eq!(date.increment_date_by_months(months), Some(want));
		}
	}

	#[test]
	fn month_bounds_cover_leap_february() {
		let (start, end) = month_bounds(2024, 2).unwrap();
		assert_eq!(start, Date::from_ymd_opt(2024, 2, 1).unwrap());
		assert_eq!(end, Date::from_ymd_opt(2024, 3, 1).unwrap());

		let (_, end) = month_bounds(2025, 12).unwrap();
		assert_eq!(end, Date::from_ymd_opt(2026, 1, 1).unwrap());

		assert_eq!(month_bounds(2025, 13), None);
	}

	#[test]
	fn round2_matches_decimal_rounding() {
		assert_eq!(round2(217.391304347826), 217.39);
		assert_eq!(round2(50.0), 50.0);
		assert_eq!(round2(60.00000000000001), 60.0);
		// 2.675 is stored just below the midpoint
		assert_eq!(round2(2.675), 2.67);
	}

	#[test]
	fn format_money_groups_thousands() {
		assert_eq!(format_money(0.0), "₦0.00");
		assert_eq!(format_money(999.5), "₦999.50");
		assert_eq!(format_money(2000.0), "₦2,000.00");
		assert_eq!(format_money(1234567.891), "₦1,234,567.89");
		assert_eq!(format_money(-40.0), "-₦40.00");
	}
}
