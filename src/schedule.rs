use crate::types::round2;

/// One month of a repayment schedule
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ScheduleRow {
	pub month_number: u32,
	pub principal_payment: f64,
	pub interest_payment: f64,
	pub total_payment: f64,
	/// Principal still owed once this month is paid
	pub remaining_balance: f64,
}

/// Month-by-month repayment of `principal` at `annual_rate` percent over `duration_months`
///
/// The first month only services interest. The principal is then spread evenly over the
/// remaining months, and the final month pays off whatever is left so rounding drift
/// never outlives the loan. Interest each month is charged on the balance owed at the
/// start of that month. Every figure is rounded to two decimals.
///
/// A zero duration yields an empty schedule.
pub fn calculate_repayment_schedule(principal: f64, annual_rate: f64, duration_months: u32) -> Vec<ScheduleRow> {
	if duration_months == 0 {
		return Vec::new();
	}

	let monthly_rate = annual_rate / 100.0 / 12.0;
	let principal_paying_months = duration_months.saturating_sub(1).max(1);
	let base_principal_payment = round2(principal / principal_paying_months as f64);

	let mut remaining_balance = principal;
	let mut schedule = Vec::with_capacity(duration_months as usize);

	for month_number in 1..=duration_months {
		let principal_payment = if month_number == duration_months {
			round2(remaining_balance)
		} else if month_number == 1 {
			0.0
		} else {
			base_principal_payment
		};
		let interest_payment = round2(remaining_balance * monthly_rate);

		remaining_balance -= principal_payment;
		if remaining_balance < 0.0 {
			remaining_balance = 0.0;
		}

		schedule.push(ScheduleRow {
			month_number,
			principal_payment,
			interest_payment,
			total_payment: round2(principal_payment + interest_payment),
			remaining_balance: round2(remaining_balance),
		});
	}

	if let Some(last) = schedule.last_mut() {
		last.remaining_balance = 0.0;
	}
	schedule
}

#[cfg(test)]
mod tests {
	use approx::assert_abs_diff_eq;

	use super::*;

	#[test]
	fn first_month_is_interest_only() {
		let schedule = calculate_repayment_schedule(5000.0, 12.0, 24);

		assert_eq!(schedule.len(), 24);
		assert_eq!(schedule[0], ScheduleRow {
			month_number: 1,
			principal_payment: 0.0,
			interest_payment: 50.0,
			total_payment: 50.0,
			remaining_balance: 5000.0,
		});
	}

	#[test]
	fn principal_spread_over_remaining_months() {
		let schedule = calculate_repayment_schedule(5000.0, 12.0, 24);

		for row in &schedule[1..23] {
			assert_eq!(row.principal_payment, 217.39);
		}
		assert_eq!(schedule[1].interest_payment, 50.0);
		assert_eq!(schedule[1].remaining_balance, 4782.61);
		assert_eq!(schedule[2].interest_payment, 47.83);

		let last = schedule[23];
		assert_eq!(last.month_number, 24);
		assert_eq!(last.principal_payment, 217.42);
		assert_eq!(last.interest_payment, 2.17);
		assert_eq!(last.total_payment, 219.59);
		assert_eq!(last.remaining_balance, 0.0);
	}

	#[test]
	fn single_month_pays_everything() {
		let schedule = calculate_repayment_schedule(1000.0, 12.0, 1);

		assert_eq!(schedule, vec![ScheduleRow {
			month_number: 1,
			principal_payment: 1000.0,
			interest_payment: 10.0,
			total_payment: 1010.0,
			remaining_balance: 0.0,
		}]);
	}

	#[test]
	fn two_months() {
		let schedule = calculate_repayment_schedule(600.0, 0.0, 2);

		assert_eq!(schedule[0].principal_payment, 0.0);
		assert_eq!(schedule[0].total_payment, 0.0);
		assert_eq!(schedule[1].principal_payment, 600.0);
		assert_eq!(schedule[1].remaining_balance, 0.0);
	}

	#[test]
	fn zero_duration_is_empty() {
		assert!(calculate_repayment_schedule(1000.0, 12.0, 0).is_empty());
	}

	#[test]
	fn principal_is_repaid_in_full() {
		let cases = vec![
			(5000.0, 12.0, 24),
			(1000.0, 10.0, 7),
			(12345.67, 15.5, 36),
			(250.0, 0.0, 3),
			(99999.99, 18.0, 60),
			(10.0, 12.0, 12),
		];

		for (principal, rate, months) in cases {
			let schedule = calculate_repayment_schedule(principal, rate, months);
			assert_eq!(schedule.len(), months as usize);
			assert_eq!(schedule.last().unwrap().remaining_balance, 0.0);

			let repaid: f64 = schedule.iter().map(|r| r.principal_payment).sum();
			assert_abs_diff_eq!(repaid, principal, epsilon = 0.01);

			for (i, row) in schedule.iter().enumerate() {
				assert_eq!(row.month_number, i as u32 + 1);
				assert!(row.remaining_balance >= 0.0);
			}
		}
	}

	#[test]
	fn schedule_is_deterministic() {
		assert_eq!(
			calculate_repayment_schedule(7321.5, 13.25, 18),
			calculate_repayment_schedule(7321.5, 13.25, 18),
		);
	}
}
