use diesel::dsl::sum;
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::db;
use crate::schema::members;
use crate::types::{Date, Id, Time};

#[derive(Queryable, Identifiable, PartialEq, Debug, Clone)]
#[diesel(table_name = members)]
pub struct Member {
	pub id: Id,
	/// Employer-issued staff number, unique across the society
	pub staff_number: String,
	pub full_name: String,
	pub date_joined: Date,
	/// Running savings balance, moved alongside every ledger entry
	pub current_savings: f64,
	/// Outstanding loan principal, moved alongside every loan approval or closure
	pub total_loans: f64,
	pub created_at: Time,
	pub phone: String,
	pub bank_name: String,
	pub account_no: String,
	pub department: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = members)]
pub struct NewMember<'a> {
	pub staff_number: &'a str,
	pub full_name: &'a str,
	pub phone: &'a str,
	pub bank_name: &'a str,
	pub account_no: &'a str,
	pub department: &'a str,
	pub date_joined: Date,
	pub current_savings: f64,
	pub total_loans: f64,
}

/// Editable member fields. `None` leaves the column untouched.
#[derive(AsChangeset, Default, PartialEq, Debug, Clone)]
#[diesel(table_name = members)]
pub struct MemberChanges {
	pub full_name: Option<String>,
	pub phone: Option<String>,
	pub bank_name: Option<String>,
	pub account_no: Option<String>,
	pub department: Option<String>,
}

impl MemberChanges {
	pub fn is_empty(&self) -> bool {
		self.full_name.is_none()
			&& self.phone.is_none()
			&& self.bank_name.is_none()
			&& self.account_no.is_none()
			&& self.department.is_none()
	}
}

/// Society-wide sums over every member row
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct Totals {
	pub members: i64,
	pub savings: f64,
	pub loans: f64,
}

/// Data store implementation for operating on members in the database
pub struct Repo<'a> {
	conn: &'a mut SqliteConnection,
}

impl<'a> Repo<'a> {
	pub fn new(conn: &'a mut SqliteConnection) -> Self {
		Repo { conn }
	}

	pub fn create(&mut self, new_member: NewMember) -> db::Result<Member> {
		diesel::insert_into(members::table)
			.values(&new_member)
			.get_result(self.conn)
			.map_err(Into::into)
	}

	pub fn find_by_id(&mut self, id: Id) -> db::Result<Member> {
		members::table
			.find(id)
			.first(self.conn)
			.map_err(Into::into)
	}

	pub fn find_by_staff_number(&mut self, staff_number: &str) -> db::Result<Member> {
		members::table
			.filter(members::staff_number.eq(staff_number))
			.first(self.conn)
			.map_err(Into::into)
	}

	/// Every member, most recently registered first
	pub fn list(&mut self) -> db::Result<Vec<Member>> {
		members::table
			.order((members::created_at.desc(), members::id.desc()))
			.load(self.conn)
			.map_err(Into::into)
	}

	pub fn update(&mut self, id: Id, changes: &MemberChanges) -> db::Result<Member> {
		diesel::update(members::table.find(id))
			.set(changes)
			.get_result(self.conn)
			.map_err(Into::into)
	}

	/// Removes the member together with their ledger entries and loans
	pub fn delete(&mut self, id: Id) -> db::Result<()> {
		let deleted = diesel::delete(members::table.find(id)).execute(self.conn)?;
		match deleted {
			0 => Err(db::Error::RecordNotFound),
			_ => Ok(()),
		}
	}

	/// Stores a member's new running savings balance and returns the updated member
	pub fn set_savings(&mut self, id: Id, current_savings: f64) -> db::Result<Member> {
		diesel::update(members::table.find(id))
			.set(members::current_savings.eq(current_savings))
			.get_result(self.conn)
			.map_err(Into::into)
	}

	pub fn set_total_loans(&mut self, id: Id, total_loans: f64) -> db::Result<Member> {
		diesel::update(members::table.find(id))
			.set(members::total_loans.eq(total_loans))
			.get_result(self.conn)
			.map_err(Into::into)
	}

	pub fn totals(&mut self) -> db::Result<Totals> {
		let members = members::table.count().get_result::<i64>(self.conn)?;
		let savings = members::table
			.select(sum(members::current_savings))
			.first::<Option<f64>>(self.conn)?;
		let loans = members::table
			.select(sum(members::total_loans))
			.first::<Option<f64>>(self.conn)?;

		Ok(Totals {
			members,
			savings: savings.unwrap_or(0.0),
			loans: loans.unwrap_or(0.0),
		})
	}
}

#[cfg(test)]
mod tests {
	use crate::testutil::*;

	use super::*;

	#[test]
	fn create_member() {
		let f = Fixture::new();
		let mut conn = f.conn();

		let got = Repo::new(&mut conn).create(NewMember {
			staff_number: "SLT/010",
			full_name: "Ngozi Eze",
			phone: "+2348030000000",
			..MemberFactory::defaults()
		}).unwrap();

		let want = Member {
			id: got.id,
			staff_number: "SLT/010".to_string(),
			full_name: "Ngozi Eze".to_string(),
			date_joined: got.date_joined,
			current_savings: 0.0,
			total_loans: 0.0,
			created_at: got.created_at,
			phone: "+2348030000000".to_string(),
			bank_name: "UBA".to_string(),
			account_no: "".to_string(),
			department: "SLT".to_string(),
		};
		assert_eq!(got, want);
	}

	#[test]
	fn duplicate_staff_number_is_rejected() {
		let f = Fixture::new();
		let ada = f.member_factory.ada();
		let mut conn = f.conn();

		let err = Repo::new(&mut conn).create(NewMember {
			staff_number: &ada.staff_number,
			full_name: "Someone Else",
			..MemberFactory::defaults()
		}).unwrap_err();

		assert_eq!(err, db::Error::RecordAlreadyExists);
		assert_eq!(Repo::new(&mut conn).list().unwrap().len(), 1);
	}

	#[test]
	fn find_member_by_id_and_staff_number() {
		let f = Fixture::new();
		let ada = f.member_factory.ada();
		let mut conn = f.conn();
		let mut repo = Repo::new(&mut conn);

		assert_eq!(repo.find_by_id(ada.id).unwrap(), ada);
		assert_eq!(repo.find_by_staff_number(&ada.staff_number).unwrap(), ada);
		assert_eq!(repo.find_by_staff_number("NOPE/1").unwrap_err(), db::Error::RecordNotFound);
	}

	#[test]
	fn update_only_touches_given_fields() {
		let f = Fixture::new();
		let ada = f.member_factory.ada();
		let mut conn = f.conn();

		let updated = Repo::new(&mut conn).update(ada.id, &MemberChanges {
			phone: Some("+2348099999999".to_string()),
			..Default::default()
		}).unwrap();

		assert_eq!(updated.phone, "+2348099999999");
		assert_eq!(updated.full_name, ada.full_name);
		assert_eq!(updated.bank_name, ada.bank_name);
	}

	#[test]
	fn set_running_totals() {
		let f = Fixture::new();
		let ada = f.member_factory.ada();
		let mut conn = f.conn();
		let mut repo = Repo::new(&mut conn);

		let member = repo.set_savings(ada.id, 100.0).unwrap();
		assert_eq!(member.current_savings, 100.0);
		let member = repo.set_savings(ada.id, 60.0).unwrap();
		assert_eq!(member.current_savings, 60.0);

		let member = repo.set_total_loans(ada.id, 120.0).unwrap();
		assert_eq!(member.total_loans, 120.0);
		let member = repo.set_total_loans(ada.id, 0.0).unwrap();
		assert_eq!(member.total_loans, 0.0);
	}

	#[test]
	fn delete_missing_member() {
		let f = Fixture::new();
		let mut conn = f.conn();
		assert_eq!(Repo::new(&mut conn).delete(404).unwrap_err(), db::Error::RecordNotFound);
	}

	#[test]
	fn totals_of_empty_society() {
		let f = Fixture::new();
		let mut conn = f.conn();
		assert_eq!(Repo::new(&mut conn).totals().unwrap(), Totals::default());
	}
}
