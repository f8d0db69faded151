pub mod audit;
pub mod db;
pub mod import;
pub mod ledger;
pub mod loan;
pub mod member;
pub mod report;
pub mod savings;
pub mod schedule;
pub mod schema;
pub mod security;
pub mod settings;
pub mod types;

#[cfg(test)]
mod testutil;

pub use crate::audit::{AuditFilter, AuditLog, AuditStatus};
pub use crate::ledger::{
	Calendar, Eligibility, Error, ErrorKind, LoanApplication, LoanApproval, NewMemberRequest, NewService,
	Service, SetupRequest, SystemCalendar,
};
pub use crate::loan::{Loan, LoanStatus};
pub use crate::member::{Member, MemberChanges};
pub use crate::report::Reports;
pub use crate::savings::{SavingsTransaction, SavingsType};
pub use crate::settings::{LoanPolicy, SecurityMode, Settings, SettingsChanges};
