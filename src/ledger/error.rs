use std::error;
use std::fmt;

use diesel::r2d2::PoolError;

use crate::db;
use crate::loan::LoanStatus;
use crate::security::CredentialError;
use crate::types::{format_money, Id};

/// An error that can occur when operating the ledger
#[derive(Debug, PartialEq)]
pub struct Error {
	kind: ErrorKind,
}

impl Error {
	pub fn new(kind: ErrorKind) -> Error {
		Error { kind }
	}

	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}

	pub fn category(&self) -> Category {
		self.kind.category()
	}
}

/// Broad classes of failure, deciding how a caller reports them
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Category {
	/// Bad input shape or range, caught before storage is touched
	Validation,
	/// A referenced member or loan does not exist
	NotFound,
	/// The request is well formed but the ledger's rules forbid it
	BusinessRule,
	/// Storage failed; the enclosing unit of work was rolled back
	Persistence,
}

/// The kind of an error that can occur.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
	Database(db::Error),
	InvalidInput(String),
	InvalidAmount(f64),
	InvalidMemberId(Id),
	InvalidCategory(String),
	InvalidDate(String),
	InvalidCredential(CredentialError),
	MemberNotFound(Id),
	LoanNotFound(Id),
	DuplicateStaffNumber(String),
	EligibilityExceeded { principal: f64, multiplier: f64, limit: f64 },
	InsufficientSavings { balance: f64, requested: f64 },
	InvalidStatusTransition { from: LoanStatus, to: LoanStatus },
	AuthenticationFailed,
	/// The operating system prompt is handled outside the ledger
	SystemAuthUnavailable,
	Import(String),
}

impl ErrorKind {
	pub fn category(&self) -> Category {
		match self {
			ErrorKind::InvalidInput(_)
			| ErrorKind::InvalidAmount(_)
			| ErrorKind::InvalidMemberId(_)
			| ErrorKind::InvalidDate(_)
			| ErrorKind::InvalidCredential(_)
			| ErrorKind::Import(_) => Category::Validation,

			ErrorKind::MemberNotFound(_)
			| ErrorKind::LoanNotFound(_)
			| ErrorKind::Database(db::Error::RecordNotFound) => Category::NotFound,

			ErrorKind::InvalidCategory(_)
			| ErrorKind::EligibilityExceeded { .. }
			| ErrorKind::InsufficientSavings { .. }
			| ErrorKind::InvalidStatusTransition { .. }
			| ErrorKind::AuthenticationFailed
			| ErrorKind::SystemAuthUnavailable => Category::BusinessRule,

			ErrorKind::DuplicateStaffNumber(_) | ErrorKind::Database(_) => Category::Persistence,
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match &self.kind {
			ErrorKind::Database(e) => write!(f, "db error: {}", e),
			ErrorKind::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
			ErrorKind::InvalidAmount(amount) => write!(f, "amount must be greater than zero, got {}", amount),
			ErrorKind::InvalidMemberId(id) => write!(f, "invalid member id {}", id),
			ErrorKind::InvalidCategory(category) => {
				write!(f, "invalid savings category '{}', expected Lodgment or Deduction", category)
			}
			ErrorKind::InvalidDate(msg) => write!(f, "invalid date: {}", msg),
			ErrorKind::InvalidCredential(e) => write!(f, "invalid credential: {}", e),
			ErrorKind::MemberNotFound(id) => write!(f, "member {} not found", id),
			ErrorKind::LoanNotFound(id) => write!(f, "loan {} not found", id),
			ErrorKind::DuplicateStaffNumber(staff_number) => {
				write!(f, "staff number '{}' already exists", staff_number)
			}
			ErrorKind::EligibilityExceeded { principal, multiplier, limit } => write!(
				f,
				"loan of {} exceeds eligibility limit of {} ({}x savings)",
				format_money(*principal),
				format_money(*limit),
				multiplier,
			),
			ErrorKind::InsufficientSavings { balance, requested } => write!(
				f,
				"deduction of {} exceeds savings balance of {}",
				format_money(*requested),
				format_money(*balance),
			),
			ErrorKind::InvalidStatusTransition { from, to } => {
				write!(f, "loan cannot move from {} to {}", from, to)
			}
			ErrorKind::AuthenticationFailed => write!(f, "incorrect credential"),
			ErrorKind::SystemAuthUnavailable => {
				write!(f, "system authentication must be performed by the operating system")
			}
			ErrorKind::Import(msg) => write!(f, "import failed: {}", msg),
		}
	}
}

impl error::Error for Error {}

impl From<db::Error> for Error {
	fn from(e: db::Error) -> Self {
		Error::new(ErrorKind::Database(e))
	}
}

impl From<PoolError> for Error {
	fn from(e: PoolError) -> Self {
		Error::new(ErrorKind::Database(db::Error::from(e)))
	}
}

impl From<diesel::result::Error> for Error {
	fn from(e: diesel::result::Error) -> Self {
		Error::new(ErrorKind::Database(db::Error::from(e)))
	}
}

impl From<CredentialError> for Error {
	fn from(e: CredentialError) -> Self {
		Error::new(ErrorKind::InvalidCredential(e))
	}
}
