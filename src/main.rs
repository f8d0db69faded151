use std::env;
use std::process;

use log::*;

use thrift_ledger::{db, ledger};
use thrift_ledger::ledger::{Calendar, NewService, Service, SystemCalendar};
use thrift_ledger::report::Reports;
use thrift_ledger::types::format_money;

fn main() {
	if env::var("RUST_LOG").is_err() {
		env::set_var("RUST_LOG", "info");
	}
	pretty_env_logger::init();

	if let Err(e) = run() {
		error!(target: "ledger", "{}", e);
		process::exit(1);
	}
}

fn run() -> ledger::Result<()> {
	let pool = db::sqlite_connection()?;
	db::run_migrations(&pool)?;

	let calendar = SystemCalendar;
	let service = Service::new(NewService {
		db: pool.clone(),
		calendar: &calendar,
	});

	let settings = service.settings()?;
	if !settings.setup_completed {
		warn!(target: "ledger", "first-run setup has not been completed");
	}
	let name = match settings.society_name.as_str() {
		"" => "unnamed society",
		name => name,
	};
	info!(target: "ledger", "{} ({} security, locks after {} min)", name, settings.security_mode, settings.timeout_minutes);

	let dashboard = Reports::new(pool).dashboard(calendar.today())?;
	let stats = &dashboard.stats;
	info!(target: "ledger::report", "members: {}", stats.total_members);
	info!(target: "ledger::report", "total savings: {}", format_money(stats.total_savings));
	info!(target: "ledger::report", "total loans: {}", format_money(stats.total_loans));
	info!(
		target: "ledger::report",
		"projected interest: {} (members {}, society {})",
		format_money(stats.projected_interest),
		format_money(stats.members_share),
		format_money(stats.society_share),
	);
	info!(target: "ledger::report", "loan-to-savings ratio: {}%", dashboard.lts_ratio);
	info!(target: "ledger::report", "liquidity ratio: {}", dashboard.liquidity.liquidity_ratio);

	for loan in &dashboard.overdue {
		warn!(
			target: "ledger::report",
			"overdue: loan {} of {} for {} ({}), due {}",
			loan.loan_id,
			format_money(loan.principal),
			loan.full_name,
			loan.staff_number,
			loan.due_date,
		);
	}
	Ok(())
}
