use diesel::SqliteConnection;
use diesel_migrations::MigrationHarness;

use crate::common::*;

mod common;

#[test]
fn upgrading_an_older_ledger_keeps_its_rows() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("ledger.db");
	let pool = db::sqlite_pool(path.to_str().unwrap(), 2).unwrap();

	{
		let mut pooled = pool.get().unwrap();
		let conn: &mut SqliteConnection = &mut pooled;
		conn.run_next_migration(db::MIGRATIONS).unwrap();

		diesel::sql_query(
			"INSERT INTO members (staff_number, full_name, date_joined, current_savings, total_loans) \
			 VALUES ('SLT/001', 'Ada Obi', '2023-09-01', 1200.0, 0.0)",
		)
			.execute(conn)
			.unwrap();
		diesel::sql_query("INSERT INTO system_settings (id, society_name, loan_multiplier) VALUES (1, 'Old Society', 3.0)")
			.execute(conn)
			.unwrap();
	}

	db::run_migrations(&pool).unwrap();
	db::run_migrations(&pool).unwrap();

	let calendar = FixedCalendar::on(date(2025, 3, 14));
	let service = Service::new(NewService { db: pool.clone(), calendar: &calendar });

	let ada = service.find_member_by_staff_number("SLT/001").unwrap();
	assert_eq!(ada.full_name, "Ada Obi");
	assert_eq!(ada.current_savings, 1200.0);
	assert_eq!(ada.phone, "");
	assert_eq!(ada.department, "");

	let settings = service.settings().unwrap();
	assert_eq!(settings.society_name, "Old Society");
	assert_eq!(settings.loan_multiplier, 3.0);
	assert_eq!(settings.security_mode, SecurityMode::Pin);
	assert_eq!(settings.auth_hash, None);
	assert_eq!(settings.timeout_minutes, 10);
	assert_eq!(settings.theme, "dark");
	assert!(settings.show_alerts);
	assert!(!settings.setup_completed);

	service.post_saving(ada.id, 300.0, SavingsType::Lodgment).unwrap();
	assert_eq!(service.find_member(ada.id).unwrap().current_savings, 1500.0);
}
