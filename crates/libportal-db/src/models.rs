use diesel::prelude::*;

#[derive(Identifiable, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::login::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::login::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: jiff_diesel::Timestamp,
}

#[derive(Identifiable, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::library::librarians)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Librarian {
    pub id: i32,
    pub user_id: i32,
    pub librarian_id: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_number: Option<String>,
    pub created_at: jiff_diesel::Timestamp,
    pub updated_at: jiff_diesel::Timestamp,
}

impl Librarian {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::library::librarians)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewLibrarian {
    pub user_id: i32,
    pub librarian_id: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_number: Option<String>,
    pub created_at: jiff_diesel::Timestamp,
    pub updated_at: jiff_diesel::Timestamp,
}

#[derive(Identifiable, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::library::patrons)]
#[diesel(primary_key(patron_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Patron {
    pub patron_id: i32,
    pub user_id: Option<i32>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub membership_date: jiff_diesel::Date,
    pub membership_expiry: Option<jiff_diesel::Date>,
    pub status: String,
    pub max_books_allowed: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::library::patrons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPatron {
    pub user_id: Option<i32>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub membership_date: jiff_diesel::Date,
    pub membership_expiry: Option<jiff_diesel::Date>,
    pub status: String,
    pub max_books_allowed: i32,
}

/// Patron columns needed next to a loan or a reading log.
#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::library::patrons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PatronName {
    pub patron_id: i32,
    pub first_name: String,
    pub last_name: String,
}

impl PatronName {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::library::books)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
}

#[derive(Identifiable, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::library::transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Transaction {
    pub id: i32,
    pub book_id: i32,
    pub patron_id: i32,
    pub librarian_id: Option<i32>,
    pub checkout_date: jiff_diesel::Date,
    pub due_date: jiff_diesel::Date,
    pub return_date: Option<jiff_diesel::Date>,
    pub status: String,
}

/// A transaction with the book and patron it links.
#[derive(Clone, Debug)]
pub struct LoanRecord {
    pub transaction: Transaction,
    pub book: BookSummary,
    pub patron: PatronName,
}

impl From<(Transaction, BookSummary, PatronName)> for LoanRecord {
    fn from((transaction, book, patron): (Transaction, BookSummary, PatronName)) -> Self {
        Self {
            transaction,
            book,
            patron,
        }
    }
}

#[derive(Identifiable, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::library::events)]
#[diesel(primary_key(event_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Event {
    pub event_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub event_date: jiff_diesel::Date,
    pub start_time: jiff_diesel::Time,
    pub end_time: jiff_diesel::Time,
    pub location: Option<String>,
    pub image: Option<String>,
    pub created_by: i32,
    pub created_at: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::library::events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub event_date: jiff_diesel::Date,
    pub start_time: jiff_diesel::Time,
    pub end_time: jiff_diesel::Time,
    pub location: Option<String>,
    pub image: Option<String>,
    pub created_by: i32,
    pub created_at: jiff_diesel::Timestamp,
}

/// Columns an edit rewrites. The image is replaced separately, only when a new file arrives.
#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::library::events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct EventChanges {
    pub title: String,
    pub description: Option<String>,
    pub event_date: jiff_diesel::Date,
    pub start_time: jiff_diesel::Time,
    pub end_time: jiff_diesel::Time,
    pub location: Option<String>,
}

#[derive(Identifiable, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::library::reading_programs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReadingProgram {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub start_date: jiff_diesel::Date,
    pub end_date: jiff_diesel::Date,
    pub target_minutes: i32,
    pub target_books: i32,
    pub age_group: Option<String>,
    pub status: String,
    pub created_by: i32,
    pub created_at: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::library::reading_programs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewReadingProgram {
    pub title: String,
    pub description: Option<String>,
    pub start_date: jiff_diesel::Date,
    pub end_date: jiff_diesel::Date,
    pub target_minutes: i32,
    pub target_books: i32,
    pub age_group: Option<String>,
    pub status: String,
    pub created_by: i32,
    pub created_at: jiff_diesel::Timestamp,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::library::reading_programs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ReadingProgramChanges {
    pub title: String,
    pub description: Option<String>,
    pub start_date: jiff_diesel::Date,
    pub end_date: jiff_diesel::Date,
    pub target_minutes: i32,
    pub target_books: i32,
    pub age_group: Option<String>,
    pub status: String,
}

/// Participation figures shown in the program list.
#[derive(Clone, Debug, Default)]
pub struct ProgramTotals {
    pub participants: i64,
    pub minutes: i64,
}

#[derive(Clone, Debug)]
pub struct ProgramRecord {
    pub program: ReadingProgram,
    pub totals: ProgramTotals,
}

#[derive(Identifiable, Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::library::reading_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReadingLog {
    pub id: i32,
    pub program_id: i32,
    pub patron_id: i32,
    pub book_id: Option<i32>,
    pub book_title: String,
    pub minutes_read: i32,
    pub pages_read: i32,
    pub log_date: jiff_diesel::Date,
    pub notes: Option<String>,
    pub created_at: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::library::reading_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewReadingLog {
    pub program_id: i32,
    pub patron_id: i32,
    pub book_id: Option<i32>,
    pub book_title: String,
    pub minutes_read: i32,
    pub pages_read: i32,
    pub log_date: jiff_diesel::Date,
    pub notes: Option<String>,
    pub created_at: jiff_diesel::Timestamp,
}

/// One patron's accumulated reading inside a program.
#[derive(Clone, Debug)]
pub struct ParticipantProgress {
    pub patron: PatronName,
    pub minutes: i64,
    pub pages: i64,
    pub books: i64,
}

#[derive(Clone, Debug, Default)]
pub struct DashboardStats {
    pub total_titles: i64,
    pub total_copies: i64,
    pub available_copies: i64,
    pub active_patrons: i64,
    pub loans_out: i64,
    pub overdue_loans: i64,
    pub upcoming_events: i64,
    pub active_programs: i64,
}
