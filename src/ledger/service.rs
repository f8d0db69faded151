use diesel::{Connection, SqliteConnection};
use log::*;

use crate::{audit, db, loan, member, savings, security, settings};
use crate::audit::{AuditCategory, AuditFilter, AuditLog, AuditStatus, NewAuditLog, ADMIN_USER};
use crate::loan::{Loan, LoanStatus, NewLoan};
use crate::member::{Member, MemberChanges, NewMember};
use crate::savings::{NewSavingsTransaction, SavingsTransaction, SavingsType};
use crate::schedule::ScheduleRow;
use crate::settings::{LoanPolicy, SecurityMode, Settings, SettingsChanges};
use crate::types::{format_money, round2, Date, DateExt, Id, Time};

use super::error::{Error, ErrorKind};

pub type Result<T> = std::result::Result<T, Error>;

const ACCOUNT_NO_DIGITS: usize = 10;

/// Member registration payload, shared by the registration form and the bulk importer
#[derive(Default, PartialEq, Debug, Clone)]
pub struct NewMemberRequest {
	pub staff_number: String,
	pub full_name: String,
	pub phone: String,
	pub bank_name: String,
	/// Empty, or exactly ten digits
	pub account_no: String,
	pub department: String,
	/// Defaults to today
	pub date_joined: Option<Date>,
	/// Opening savings, posted as a lodgment on the join date
	pub initial_savings: f64,
	/// Loans carried over from before the member was on the ledger
	pub initial_loans: f64,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct LoanApplication {
	pub member_id: Id,
	pub principal: f64,
	/// Annual percentage; the policy default when `None`
	pub interest_rate: Option<f64>,
	/// The policy default when `None`
	pub duration_months: Option<u32>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct LoanApproval {
	pub loan: Loan,
	/// The borrower with their outstanding total already raised
	pub member: Member,
	pub message: String,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Eligibility {
	pub member_id: Id,
	pub savings_balance: f64,
	pub multiplier: f64,
	pub limit: f64,
}

/// What the first-run wizard collects
#[derive(PartialEq, Debug, Clone)]
pub struct SetupRequest {
	pub society_name: String,
	pub street: String,
	pub city_state: String,
	pub phone: String,
	pub email: String,
	pub reg_no: String,
	pub security_mode: SecurityMode,
	/// PIN or password; ignored for `SystemAuth`
	pub credential: String,
}

/// Source of the current date and time
pub trait Calendar {
	fn today(&self) -> Date {
		chrono::Local::now().date_naive()
	}

	fn now(&self) -> Time {
		chrono::Local::now().naive_local()
	}
}

/// Calendar backed by the machine's local clock
pub struct SystemCalendar;

impl Calendar for SystemCalendar {}

/// Parses a savings category as entered by the operator
pub fn parse_savings_category(name: &str) -> Result<SavingsType> {
	name.trim()
		.parse()
		.map_err(|_| Error::new(ErrorKind::InvalidCategory(name.to_string())))
}

/// Service for operating the cooperative's ledger
pub struct Service<'a> {
	db: db::SqlitePool,
	calendar: &'a dyn Calendar,
}

/// Parameter object for creating a new Service
pub struct NewService<'a> {
	pub db: db::SqlitePool,
	pub calendar: &'a dyn Calendar,
}

impl<'a> Service<'a> {
	pub fn new(v: NewService<'a>) -> Self {
		Service {
			db: v.db,
			calendar: v.calendar,
		}
	}

	pub fn calendar(&self) -> &dyn Calendar {
		self.calendar
	}

	/// Register a new member
	///
	/// The member row, and the opening lodgment when there are opening savings, are
	/// written together or not at all. A staff number that is already taken is rejected,
	/// never overwritten.
	pub fn register_member(&self, request: &NewMemberRequest) -> Result<Member> {
		validate_new_member(request)?;

		let staff_number = request.staff_number.trim();
		let date_joined = request.date_joined.unwrap_or_else(|| self.calendar.today());

		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;

		let result = conn.transaction::<Member, Error, _>(|conn| {
			let member = member::Repo::new(conn)
				.create(NewMember {
					staff_number,
					full_name: request.full_name.trim(),
					phone: request.phone.trim(),
					bank_name: request.bank_name.trim(),
					account_no: request.account_no.trim(),
					department: request.department.trim(),
					date_joined,
					current_savings: round2(request.initial_savings),
					total_loans: round2(request.initial_loans),
				})
				.map_err(|e| match e {
					db::Error::RecordAlreadyExists => {
						Error::new(ErrorKind::DuplicateStaffNumber(staff_number.to_string()))
					}
					e => e.into(),
				})?;

			if member.current_savings > 0.0 {
				savings::Repo::new(conn).create(NewSavingsTransaction {
					member_id: member.id,
					trans_date: date_joined,
					trans_type: SavingsType::Lodgment,
					amount: member.current_savings,
					running_balance: member.current_savings,
				})?;
			}

			Ok(member)
		});

		match &result {
			Ok(member) => {
				info!(target: "ledger::members", "registered member {} ({})", member.staff_number, member.id);
				self.audit(conn, AuditCategory::Members, AuditStatus::Success, &format!(
					"Registered member {} ({})", member.full_name, member.staff_number,
				));
			}
			Err(e) => {
				warn!(target: "ledger::members", "registration of {} failed: {}", staff_number, e);
				self.audit(conn, AuditCategory::Members, AuditStatus::Failed, &format!(
					"Registration of {} failed: {}", staff_number, e,
				));
			}
		}
		result
	}

	/// Overwrite the editable fields given in `changes`
	pub fn update_member(&self, id: Id, changes: &MemberChanges) -> Result<Member> {
		if changes.is_empty() {
			return Err(invalid("no member fields to update"));
		}
		if changes.full_name.as_deref().map_or(false, |name| name.trim().is_empty()) {
			return Err(invalid("full name cannot be blank"));
		}
		if let Some(account_no) = &changes.account_no {
			validate_account_no(account_no.trim())?;
		}

		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;

		let member = member::Repo::new(conn)
			.update(id, changes)
			.map_err(member_not_found(id))?;

		info!(target: "ledger::members", "updated member {} ({})", member.staff_number, member.id);
		self.audit(conn, AuditCategory::Members, AuditStatus::Success, &format!(
			"Updated member {} ({})", member.full_name, member.staff_number,
		));
		Ok(member)
	}

	/// Remove a member along with their savings ledger and loans
	pub fn delete_member(&self, id: Id) -> Result<()> {
		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;

		let member = member::Repo::new(conn).find_by_id(id).map_err(member_not_found(id))?;
		member::Repo::new(conn).delete(id).map_err(member_not_found(id))?;

		info!(target: "ledger::members", "deleted member {} ({})", member.staff_number, member.id);
		self.audit(conn, AuditCategory::Members, AuditStatus::Success, &format!(
			"Deleted member {} ({}) with their savings and loans", member.full_name, member.staff_number,
		));
		Ok(())
	}

	pub fn find_member(&self, id: Id) -> Result<Member> {
		let mut pooled = self.db.get()?;
		member::Repo::new(&mut pooled).find_by_id(id).map_err(member_not_found(id))
	}

	pub fn find_member_by_staff_number(&self, staff_number: &str) -> Result<Member> {
		let mut pooled = self.db.get()?;
		member::Repo::new(&mut pooled)
			.find_by_staff_number(staff_number.trim())
			.map_err(Into::into)
	}

	pub fn list_members(&self) -> Result<Vec<Member>> {
		let mut pooled = self.db.get()?;
		member::Repo::new(&mut pooled).list().map_err(Into::into)
	}

	/// A member's savings ledger, newest entry first
	pub fn member_savings(&self, member_id: Id) -> Result<Vec<SavingsTransaction>> {
		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;
		member::Repo::new(conn).find_by_id(member_id).map_err(member_not_found(member_id))?;
		savings::Repo::new(conn).find_by_member(member_id).map_err(Into::into)
	}

	pub fn member_loans(&self, member_id: Id) -> Result<Vec<Loan>> {
		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;
		member::Repo::new(conn).find_by_id(member_id).map_err(member_not_found(member_id))?;
		loan::Repo::new(conn).find_by_member(member_id).map_err(Into::into)
	}

	/// Post a lodgment or deduction against a member's savings
	///
	/// The member's running balance and the ledger entry stamped with the resulting
	/// balance are written together. A deduction larger than the balance is refused.
	///
	/// # Arguments
	/// * `member_id` - member whose savings move
	/// * `amount` - positive amount; `category` decides the direction
	/// * `category` - lodgment or deduction
	pub fn post_saving(&self, member_id: Id, amount: f64, category: SavingsType) -> Result<SavingsTransaction> {
		if member_id <= 0 {
			return Err(Error::new(ErrorKind::InvalidMemberId(member_id)));
		}
		if !amount.is_finite() || round2(amount) <= 0.0 {
			return Err(Error::new(ErrorKind::InvalidAmount(amount)));
		}
		let amount = round2(amount);

		let today = self.calendar.today();
		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;

		let result = conn.transaction::<(Member, SavingsTransaction), Error, _>(|conn| {
			let member = member::Repo::new(conn)
				.find_by_id(member_id)
				.map_err(member_not_found(member_id))?;
			let balance = round2(member.current_savings);
			if category == SavingsType::Deduction && amount > balance {
				return Err(Error::new(ErrorKind::InsufficientSavings {
					balance,
					requested: amount,
				}));
			}

			let member = member::Repo::new(conn).set_savings(member_id, round2(balance + category.delta(amount)))?;
			let transaction = savings::Repo::new(conn).create(NewSavingsTransaction {
				member_id,
				trans_date: today,
				trans_type: category,
				amount,
				running_balance: member.current_savings,
			})?;

			Ok((member, transaction))
		});

		match result {
			Ok((member, transaction)) => {
				info!(
					target: "ledger::savings",
					"{} of {} for {}, balance now {}",
					category, amount, member.staff_number, member.current_savings,
				);
				self.audit(conn, AuditCategory::Savings, AuditStatus::Success, &format!(
					"{} of {} for {} ({}), balance {}",
					category,
					format_money(amount),
					member.full_name,
					member.staff_number,
					format_money(member.current_savings),
				));
				Ok(transaction)
			}
			Err(e) => {
				warn!(target: "ledger::savings", "{} of {} for member {} refused: {}", category, amount, member_id, e);
				self.audit(conn, AuditCategory::Savings, AuditStatus::Failed, &format!(
					"{} of {} for member {} failed: {}", category, format_money(amount), member_id, e,
				));
				Err(e)
			}
		}
	}

	/// How much a member may borrow under `policy`
	pub fn eligibility(&self, member_id: Id, policy: &LoanPolicy) -> Result<Eligibility> {
		let member = self.find_member(member_id)?;
		Ok(Eligibility {
			member_id,
			savings_balance: round2(member.current_savings),
			multiplier: policy.multiplier,
			limit: policy.eligibility_limit(member.current_savings),
		})
	}

	/// Approve and record a loan
	///
	/// A principal above the member's eligibility limit is rejected without changing any
	/// state. Otherwise the member's outstanding total, the loan row and the approval's
	/// audit entry are written in a single transaction.
	pub fn apply_for_loan(&self, policy: &LoanPolicy, application: &LoanApplication) -> Result<LoanApproval> {
		let member_id = application.member_id;
		if member_id <= 0 {
			return Err(Error::new(ErrorKind::InvalidMemberId(member_id)));
		}
		if !application.principal.is_finite() || round2(application.principal) <= 0.0 {
			return Err(Error::new(ErrorKind::InvalidAmount(application.principal)));
		}
		let principal = round2(application.principal);

		let interest_rate = application.interest_rate.unwrap_or(policy.default_interest_rate);
		if !interest_rate.is_finite() || interest_rate < 0.0 {
			return Err(invalid(format!("interest rate must be zero or more, got {}", interest_rate)));
		}
		let duration_months = application.duration_months.unwrap_or(policy.default_duration_months);
		let duration = i32::try_from(duration_months)
			.ok()
			.filter(|months| *months >= 1)
			.ok_or_else(|| invalid(format!("duration must be at least one month, got {}", duration_months)))?;

		let date_issued = self.calendar.today();
		let due_date = date_issued.increment_date_by_months(duration_months).ok_or_else(|| {
			Error::new(ErrorKind::InvalidDate(format!("{} months after {} is out of range", duration_months, date_issued)))
		})?;

		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;

		let member = member::Repo::new(conn).find_by_id(member_id).map_err(member_not_found(member_id))?;
		let limit = policy.eligibility_limit(member.current_savings);
		if principal > limit {
			let err = Error::new(ErrorKind::EligibilityExceeded {
				principal,
				multiplier: policy.multiplier,
				limit,
			});
			info!(target: "ledger::loans", "loan of {} for {} rejected: {}", principal, member.staff_number, err);
			self.audit(conn, AuditCategory::Loans, AuditStatus::Failed, &format!(
				"Loan for {} ({}) rejected: {}", member.full_name, member.staff_number, err,
			));
			return Err(err);
		}

		let result = conn.transaction::<(Loan, Member), Error, _>(|conn| {
			let mut members = member::Repo::new(conn);
			let current = members.find_by_id(member_id)?;
			let member = members.set_total_loans(member_id, round2(current.total_loans + principal))?;
			let loan = loan::Repo::new(conn).create(NewLoan {
				member_id,
				principal,
				interest_rate,
				duration_months: duration,
				status: LoanStatus::Active,
				date_issued,
				due_date,
			})?;

			self.audit(conn, AuditCategory::Loans, AuditStatus::Success, &format!(
				"Loan of {} approved for {} ({}) at {}% over {} months",
				format_money(principal), member.full_name, member.staff_number, interest_rate, duration_months,
			));
			Ok((loan, member))
		});

		match result {
			Ok((loan, member)) => {
				info!(
					target: "ledger::loans",
					"loan {} of {} issued to {}, due {}",
					loan.id, loan.principal, member.staff_number, loan.due_date,
				);
				let message = format!("Loan of {} approved for {}", format_money(principal), member.full_name);
				Ok(LoanApproval { loan, member, message })
			}
			Err(e) => {
				error!(target: "ledger::loans", "loan for {} rolled back: {}", member.staff_number, e);
				self.audit(conn, AuditCategory::Loans, AuditStatus::Failed, &format!(
					"Loan of {} for {} ({}) failed: {}",
					format_money(principal), member.full_name, member.staff_number, e,
				));
				Err(e)
			}
		}
	}

	pub fn find_loan(&self, loan_id: Id) -> Result<Loan> {
		let mut pooled = self.db.get()?;
		loan::Repo::new(&mut pooled).find_by_id(loan_id).map_err(loan_not_found(loan_id))
	}

	/// Repayment schedule of a recorded loan at the rate and duration it was issued with
	pub fn loan_schedule(&self, loan_id: Id) -> Result<Vec<ScheduleRow>> {
		Ok(self.find_loan(loan_id)?.schedule())
	}

	/// Settle an active loan as closed or defaulted
	///
	/// Closing releases the principal from the member's outstanding total.
	pub fn set_loan_status(&self, loan_id: Id, status: LoanStatus) -> Result<Loan> {
		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;

		let result = conn.transaction::<Loan, Error, _>(|conn| {
			let current = loan::Repo::new(conn).find_by_id(loan_id).map_err(loan_not_found(loan_id))?;
			if !current.status.can_transition_to(status) {
				return Err(Error::new(ErrorKind::InvalidStatusTransition { from: current.status, to: status }));
			}

			let loan = loan::Repo::new(conn).set_status(loan_id, status)?;
			if status == LoanStatus::Closed {
				let member = member::Repo::new(conn).find_by_id(loan.member_id)?;
				let remaining = round2((member.total_loans - loan.principal).max(0.0));
				member::Repo::new(conn).set_total_loans(member.id, remaining)?;
			}
			Ok(loan)
		});

		match &result {
			Ok(loan) => {
				info!(target: "ledger::loans", "loan {} is now {}", loan.id, loan.status);
				self.audit(conn, AuditCategory::Loans, AuditStatus::Success, &format!(
					"Loan {} of {} marked {}", loan.id, format_money(loan.principal), loan.status,
				));
			}
			Err(e) => {
				warn!(target: "ledger::loans", "status change of loan {} to {} refused: {}", loan_id, status, e);
			}
		}
		result
	}

	/// Lending rules currently configured in settings
	pub fn loan_policy(&self) -> Result<LoanPolicy> {
		Ok(self.settings()?.loan_policy())
	}

	pub fn settings(&self) -> Result<Settings> {
		let mut pooled = self.db.get()?;
		settings::Repo::new(&mut pooled).load_or_create().map_err(Into::into)
	}

	/// Apply a settings page submission. Credentials change through `change_credential`.
	pub fn update_settings(&self, changes: &SettingsChanges) -> Result<Settings> {
		validate_settings_changes(changes)?;

		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;
		let now = self.calendar.now();

		let result = conn.transaction::<Settings, Error, _>(|conn| {
			let mut repo = settings::Repo::new(conn);
			repo.load_or_create()?;
			repo.apply(changes, now).map_err(Into::into)
		});

		match &result {
			Ok(_) => {
				info!(target: "ledger::settings", "settings updated");
				self.audit(conn, AuditCategory::Settings, AuditStatus::Success, "Settings updated");
			}
			Err(e) => {
				warn!(target: "ledger::settings", "settings update failed: {}", e);
				self.audit(conn, AuditCategory::Settings, AuditStatus::Failed, &format!("Settings update failed: {}", e));
			}
		}
		result
	}

	/// Persist the first-run wizard: organization identity, security mode and credential
	pub fn complete_setup(&self, request: &SetupRequest) -> Result<Settings> {
		if request.society_name.trim().is_empty() {
			return Err(invalid("society name is required"));
		}
		security::validate_credential(request.security_mode, &request.credential)?;

		let changes = SettingsChanges {
			society_name: Some(request.society_name.trim().to_string()),
			street: Some(request.street.trim().to_string()),
			city_state: Some(request.city_state.trim().to_string()),
			phone: Some(request.phone.trim().to_string()),
			email: Some(request.email.trim().to_string()),
			reg_no: Some(request.reg_no.trim().to_string()),
			security_mode: Some(request.security_mode),
			auth_hash: credential_hash(request.security_mode, &request.credential),
			setup_completed: Some(true),
			..Default::default()
		};

		let settings = self.store_security_settings(&changes)?;
		info!(target: "ledger::security", "setup completed for {}", settings.society_name);
		self.audit_detached(AuditCategory::Security, AuditStatus::Success, &format!(
			"Initial setup completed with {} security", settings.security_mode,
		));
		Ok(settings)
	}

	/// Switch the security mode and replace the stored credential
	pub fn change_credential(&self, mode: SecurityMode, credential: &str) -> Result<Settings> {
		security::validate_credential(mode, credential)?;

		let settings = self.store_security_settings(&SettingsChanges {
			security_mode: Some(mode),
			auth_hash: credential_hash(mode, credential),
			..Default::default()
		})?;
		info!(target: "ledger::security", "credential changed, mode {}", mode);
		self.audit_detached(AuditCategory::Security, AuditStatus::Success, &format!("Credential changed ({} security)", mode));
		Ok(settings)
	}

	fn store_security_settings(&self, changes: &SettingsChanges) -> Result<Settings> {
		let mut pooled = self.db.get()?;
		let conn: &mut SqliteConnection = &mut pooled;
		let now = self.calendar.now();

		conn.transaction::<Settings, Error, _>(|conn| {
			let mut repo = settings::Repo::new(conn);
			repo.load_or_create()?;
			repo.apply(changes, now).map_err(Into::into)
		})
	}

	pub fn is_setup_complete(&self) -> Result<bool> {
		Ok(self.settings()?.setup_completed)
	}

	/// Check a PIN or password at the lock screen
	///
	/// With no stored credential entry is allowed. `SystemAuth` cannot be checked here.
	pub fn authenticate(&self, credential: &str) -> Result<()> {
		let settings = self.settings()?;

		match (settings.security_mode, settings.auth_hash.as_deref()) {
			(SecurityMode::SystemAuth, _) => Err(Error::new(ErrorKind::SystemAuthUnavailable)),
			(mode, None) => {
				info!(target: "ledger::security", "no {} configured, entry allowed", mode);
				self.audit_detached(AuditCategory::Security, AuditStatus::Success, "Login without a configured credential");
				Ok(())
			}
			(mode, Some(hash)) => {
				if security::verify_credential(credential, hash) {
					info!(target: "ledger::security", "login succeeded");
					self.audit_detached(AuditCategory::Security, AuditStatus::Success, &format!("Login successful ({})", mode));
					Ok(())
				} else {
					warn!(target: "ledger::security", "login failed");
					self.audit_detached(AuditCategory::Security, AuditStatus::Failed, &format!("Failed login attempt ({})", mode));
					Err(Error::new(ErrorKind::AuthenticationFailed))
				}
			}
		}
	}

	pub fn audit_logs(&self, filter: &AuditFilter) -> Result<Vec<AuditLog>> {
		let mut pooled = self.db.get()?;
		audit::Repo::new(&mut pooled).list(filter).map_err(Into::into)
	}

	pub fn audit_categories(&self) -> Result<Vec<String>> {
		let mut pooled = self.db.get()?;
		audit::Repo::new(&mut pooled).categories().map_err(Into::into)
	}

	/// Append an audit entry. A failure is logged and otherwise ignored.
	fn audit(&self, conn: &mut SqliteConnection, category: AuditCategory, status: AuditStatus, description: &str) {
		let entry = NewAuditLog {
			timestamp: self.calendar.now(),
			user: ADMIN_USER,
			category: category.as_ref(),
			description,
			status,
		};
		if let Err(e) = audit::Repo::new(conn).append(entry) {
			warn!(target: "ledger::audit", "audit entry not recorded ({}): {}", e, description);
		}
	}

	fn audit_detached(&self, category: AuditCategory, status: AuditStatus, description: &str) {
		match self.db.get() {
			Ok(mut pooled) => self.audit(&mut pooled, category, status, description),
			Err(e) => warn!(target: "ledger::audit", "audit entry not recorded ({}): {}", e, description),
		}
	}
}

fn invalid(msg: impl Into<String>) -> Error {
	Error::new(ErrorKind::InvalidInput(msg.into()))
}

fn member_not_found(id: Id) -> impl Fn(db::Error) -> Error {
	move |e| match e {
		db::Error::RecordNotFound => Error::new(ErrorKind::MemberNotFound(id)),
		e => e.into(),
	}
}

fn loan_not_found(id: Id) -> impl Fn(db::Error) -> Error {
	move |e| match e {
		db::Error::RecordNotFound => Error::new(ErrorKind::LoanNotFound(id)),
		e => e.into(),
	}
}

fn credential_hash(mode: SecurityMode, credential: &str) -> Option<String> {
	match mode {
		SecurityMode::SystemAuth => None,
		_ => Some(security::hash_credential(credential)),
	}
}

/// An account number is optional; when given it is exactly ten digits
pub fn is_valid_account_no(account_no: &str) -> bool {
	account_no.is_empty()
		|| (account_no.len() == ACCOUNT_NO_DIGITS && account_no.chars().all(|c| c.is_ascii_digit()))
}

fn validate_account_no(account_no: &str) -> Result<()> {
	if is_valid_account_no(account_no) {
		Ok(())
	} else {
		Err(invalid(format!("account number must be {} digits", ACCOUNT_NO_DIGITS)))
	}
}

fn validate_new_member(request: &NewMemberRequest) -> Result<()> {
	if request.staff_number.trim().is_empty() || request.full_name.trim().is_empty() {
		return Err(invalid("full name and staff number are required"));
	}
	validate_account_no(request.account_no.trim())?;
	for amount in [request.initial_savings, request.initial_loans] {
		if !amount.is_finite() || amount < 0.0 {
			return Err(invalid(format!("opening balances must be zero or more, got {}", amount)));
		}
	}
	Ok(())
}

fn validate_settings_changes(changes: &SettingsChanges) -> Result<()> {
	if changes.auth_hash.is_some() {
		return Err(invalid("credentials cannot be set directly"));
	}
	if changes.loan_multiplier.map_or(false, |m| !m.is_finite() || m <= 0.0) {
		return Err(invalid("loan multiplier must be greater than zero"));
	}
	if changes.default_interest_rate.map_or(false, |r| !r.is_finite() || r < 0.0) {
		return Err(invalid("default interest rate must be zero or more"));
	}
	if changes.default_duration.map_or(false, |d| d < 1) {
		return Err(invalid("default duration must be at least one month"));
	}
	if changes.timeout_minutes.map_or(false, |t| t < 1) {
		return Err(invalid("auto-lock timeout must be at least one minute"));
	}
	if changes.text_scale.map_or(false, |s| !s.is_finite() || s <= 0.0) {
		return Err(invalid("text scale must be greater than zero"));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn savings_category_names() {
		assert_eq!(parse_savings_category("Lodgment").unwrap(), SavingsType::Lodgment);
		assert_eq!(parse_savings_category(" Deduction ").unwrap(), SavingsType::Deduction);
		assert_eq!(
			parse_savings_category("Bonus").unwrap_err().kind(),
			&ErrorKind::InvalidCategory("Bonus".to_string()),
		);
	}

	#[test]
	fn account_numbers() {
		assert!(validate_account_no("").is_ok());
		assert!(validate_account_no("0123456789").is_ok());
		assert!(validate_account_no("012345678").is_err());
		assert!(validate_account_no("01234567890").is_err());
		assert!(validate_account_no("01234a6789").is_err());
		assert!(is_valid_account_no(""));
		assert!(!is_valid_account_no(" 0123456789"));
	}

	#[test]
	fn new_member_validation() {
		let valid = NewMemberRequest {
			staff_number: "SLT/001".to_string(),
			full_name: "Ada Obi".to_string(),
			..Default::default()
		};
		assert!(validate_new_member(&valid).is_ok());

		let blank_name = NewMemberRequest { full_name: "  ".to_string(), ..valid.clone() };
		assert!(validate_new_member(&blank_name).is_err());

		let negative = NewMemberRequest { initial_savings: -1.0, ..valid.clone() };
		assert!(validate_new_member(&negative).is_err());
	}

	#[test]
	fn settings_validation() {
		assert!(validate_settings_changes(&SettingsChanges::default()).is_ok());
		assert!(validate_settings_changes(&SettingsChanges { loan_multiplier: Some(0.0), ..Default::default() }).is_err());
		assert!(validate_settings_changes(&SettingsChanges { default_duration: Some(0), ..Default::default() }).is_err());
		assert!(validate_settings_changes(&SettingsChanges { auth_hash: Some("x$y".to_string()), ..Default::default() }).is_err());
	}
}
