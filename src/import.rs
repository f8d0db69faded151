//! Bulk member registration from a CSV export of the member import template

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use log::*;
use serde::Deserialize;

use crate::ledger::{is_valid_account_no, Error, ErrorKind, NewMemberRequest, Result, Service};
use crate::types::Date;

/// Column headings of the import template, in template order
pub const TEMPLATE_HEADERS: [&str; 9] = [
	"Full Name",
	"Staff ID",
	"Phone",
	"Department",
	"Bank Name",
	"Account Number",
	"Date Joined (YYYY-MM-DD)",
	"Initial Savings",
	"Initial Loan",
];

const DEFAULT_DEPARTMENT: &str = "SLT";
const DEFAULT_BANK: &str = "UBA";
const COUNTRY_CODE: &str = "+234";
/// Spreadsheet row of the first data row; row 1 holds the headings
const FIRST_DATA_ROW: usize = 2;

/// Raw template row, every cell as text
#[derive(Debug, Default, Deserialize)]
struct ImportRow {
	#[serde(rename = "Full Name", default)]
	full_name: String,
	#[serde(rename = "Staff ID", default)]
	staff_id: String,
	#[serde(rename = "Phone", default)]
	phone: String,
	#[serde(rename = "Department", default)]
	department: String,
	#[serde(rename = "Bank Name", default)]
	bank_name: String,
	#[serde(rename = "Account Number", default)]
	account_no: String,
	#[serde(rename = "Date Joined (YYYY-MM-DD)", default)]
	date_joined: String,
	#[serde(rename = "Initial Savings", default)]
	initial_savings: String,
	#[serde(rename = "Initial Loan", default)]
	initial_loan: String,
}

impl ImportRow {
	fn to_request(&self, today: Date) -> std::result::Result<NewMemberRequest, String> {
		let full_name = self.full_name.trim();
		let staff_number = self.staff_id.trim();
		if full_name.is_empty() || staff_number.is_empty() {
			return Err("Full Name and Staff ID are required.".to_string());
		}

		let account_no = self.account_no.trim();
		if !is_valid_account_no(account_no) {
			return Err("Account Number must be 10 digits.".to_string());
		}

		let (initial_savings, initial_loans) = match (parse_amount(&self.initial_savings), parse_amount(&self.initial_loan)) {
			(Some(savings), Some(loans)) => (savings, loans),
			_ => return Err("Initial Savings/Loan must be numeric.".to_string()),
		};

		Ok(NewMemberRequest {
			staff_number: staff_number.to_string(),
			full_name: full_name.to_string(),
			phone: normalize_phone(&self.phone),
			bank_name: or_default(&self.bank_name, DEFAULT_BANK),
			account_no: account_no.to_string(),
			department: or_default(&self.department, DEFAULT_DEPARTMENT),
			date_joined: Some(parse_join_date(&self.date_joined, today)),
			initial_savings,
			initial_loans,
		})
	}
}

/// A template row that was not imported
#[derive(PartialEq, Debug, Clone)]
pub struct RowError {
	/// Spreadsheet row number, counting the heading row
	pub row: usize,
	pub name: String,
	pub error: String,
}

#[derive(Default, PartialEq, Debug, Clone)]
pub struct ImportReport {
	pub imported: usize,
	pub errors: Vec<RowError>,
	/// The progress callback stopped the import early
	pub cancelled: bool,
}

impl ImportReport {
	fn reject(&mut self, row: usize, name: &str, error: impl Into<String>) {
		self.errors.push(RowError { row, name: name.to_string(), error: error.into() });
	}

	/// Plain-text log of the rows that were not imported
	pub fn write_error_log<W: Write>(&self, mut out: W) -> io::Result<()> {
		writeln!(out, "SwiftLedger Import Error Log")?;
		writeln!(out, "================================")?;
		writeln!(out)?;
		for e in &self.errors {
			writeln!(out, "Row {}: {} - {}", e.row, e.name, e.error)?;
		}
		out.flush()
	}

	pub fn save_error_log(&self, path: &Path) -> Result<()> {
		File::create(path)
			.and_then(|file| self.write_error_log(io::BufWriter::new(file)))
			.map_err(|e| import_error(format!("writing error log to {}: {}", path.display(), e)))
	}
}

/// Import every row of the CSV file at `path`
pub fn import_members_from_path(service: &Service, path: &Path) -> Result<ImportReport> {
	let file = File::open(path).map_err(|e| import_error(format!("opening {}: {}", path.display(), e)))?;
	import_members(service, file)
}

pub fn import_members<R: Read>(service: &Service, source: R) -> Result<ImportReport> {
	import_members_with_progress(service, source, &mut |_, _| true)
}

/// Import template rows through `Service::register_member`
///
/// A template missing any column fails as a whole. Otherwise each row is registered or
/// rejected on its own; duplicates of existing staff numbers are skipped. `progress`
/// receives the 1-based row being processed and the total, and stops the import by
/// returning false.
pub fn import_members_with_progress<R: Read>(
	service: &Service,
	source: R,
	progress: &mut dyn FnMut(usize, usize) -> bool,
) -> Result<ImportReport> {
	let mut reader = ReaderBuilder::new().flexible(true).from_reader(source);
	let headers = reader
		.headers()
		.map_err(|e| import_error(format!("reading headings: {}", e)))?
		.clone();
	let headers = canonical_headers(&headers)?;
	let records = reader
		.records()
		.collect::<std::result::Result<Vec<StringRecord>, _>>()
		.map_err(|e| import_error(format!("reading rows: {}", e)))?;

	let total = records.len();
	let today = service.calendar().today();
	let mut report = ImportReport::default();

	for (i, record) in records.iter().enumerate() {
		let row = i + FIRST_DATA_ROW;
		if !progress(i + 1, total) {
			report.reject(row, "", "Import cancelled by user.");
			report.cancelled = true;
			info!(target: "ledger::import", "import cancelled at row {}", row);
			break;
		}

		let parsed: ImportRow = match record.deserialize(Some(&headers)) {
			Ok(parsed) => parsed,
			Err(e) => {
				report.reject(row, "", format!("Unreadable row: {}", e));
				continue;
			}
		};
		let name = parsed.full_name.trim();

		let request = match parsed.to_request(today) {
			Ok(request) => request,
			Err(msg) => {
				report.reject(row, name, msg);
				continue;
			}
		};

		if service.find_member_by_staff_number(&request.staff_number).is_ok() {
			report.reject(row, name, "Duplicate Staff ID.");
			continue;
		}

		match service.register_member(&request) {
			Ok(_) => report.imported += 1,
			Err(e) => report.reject(row, name, e.to_string()),
		}
	}

	info!(
		target: "ledger::import",
		"imported {} of {} row(s), {} rejected",
		report.imported, total, report.errors.len(),
	);
	Ok(report)
}

/// Phone number in `+234…` form where the digits allow it
pub fn normalize_phone(raw: &str) -> String {
	let phone = raw.trim();
	if phone.is_empty() {
		return COUNTRY_CODE.to_string();
	}
	if phone.starts_with('+') {
		return phone.to_string();
	}
	if phone.starts_with("234") && phone.chars().all(|c| c.is_ascii_digit()) {
		return format!("+{}", phone);
	}

	let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
	if digits.starts_with('0') && digits.len() >= 10 {
		return format!("{}{}", COUNTRY_CODE, &digits[1..]);
	}
	if digits.len() == 10 {
		return format!("{}{}", COUNTRY_CODE, digits);
	}
	phone.to_string()
}

/// Maps the file's headings onto the template's spelling, ignoring case and spacing
fn canonical_headers(headers: &StringRecord) -> Result<StringRecord> {
	let canonical: StringRecord = headers
		.iter()
		.map(|heading| {
			let wanted = normalize_header(heading);
			TEMPLATE_HEADERS
				.iter()
				.find(|template| normalize_header(template) == wanted)
				.map(|template| template.to_string())
				.unwrap_or_else(|| heading.to_string())
		})
		.collect();

	let missing: Vec<&str> = TEMPLATE_HEADERS
		.iter()
		.copied()
		.filter(|template| !canonical.iter().any(|heading| heading == *template))
		.collect();
	if !missing.is_empty() {
		return Err(import_error(format!("invalid template, missing columns: {}", missing.join(", "))));
	}
	Ok(canonical)
}

fn normalize_header(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Blank is zero; anything else must be a number
fn parse_amount(text: &str) -> Option<f64> {
	let text = text.trim();
	if text.is_empty() {
		return Some(0.0);
	}
	text.parse().ok()
}

fn parse_join_date(text: &str, today: Date) -> Date {
	Date::parse_from_str(text.trim(), "%Y-%m-%d").unwrap_or(today)
}

fn or_default(text: &str, default: &str) -> String {
	match text.trim() {
		"" => default.to_string(),
		text => text.to_string(),
	}
}

fn import_error(msg: String) -> Error {
	Error::new(ErrorKind::Import(msg))
}
