//! Borrowing history: the transaction list and the return action.

use crate::{
    error::Error,
    format,
    forms::FormFields,
    layout::{select_options, Layout, ListQuery, Nav, Pager, SelectOption},
    login::CurrentLibrarian,
    respond::{validated, Outcome},
    AppState,
};
use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use axum_messages::Messages;
use libportal_db::{models, status::UnknownValue, LoanFilter, LoanSort, LoanStatus, SortOrder};
use std::collections::HashMap;

const PATH: &str = "/borrowing-history";

/// One transaction as the tables show it.
pub struct LoanRow {
    pub id: i32,
    pub book_title: String,
    pub book_author: String,
    pub isbn: String,
    pub patron_id: i32,
    pub patron_name: String,
    pub checkout: String,
    pub checkout_relative: String,
    pub due: String,
    pub returned: String,
    pub status_label: &'static str,
    pub status_class: String,
    pub is_open: bool,
    pub days_overdue: i64,
}

impl LoanRow {
    pub fn new(record: &models::LoanRecord, today: jiff::civil::Date) -> Result<Self, UnknownValue> {
        let checkout_date = record.transaction.checkout_date.to_jiff();
        let due_date = record.transaction.due_date.to_jiff();
        let status = record
            .transaction
            .status
            .parse::<LoanStatus>()?
            .effective(due_date, today);
        Ok(Self {
            id: record.transaction.id,
            book_title: record.book.title.clone(),
            book_author: record.book.author.clone(),
            isbn: record.book.isbn.clone().unwrap_or_default(),
            patron_id: record.patron.patron_id,
            patron_name: record.patron.full_name(),
            checkout: format::date(checkout_date),
            checkout_relative: format::relative_day(checkout_date, today),
            due: format::date(due_date),
            returned: format::optional_date(record.transaction.return_date.map(|d| d.to_jiff())),
            status_label: status.label(),
            status_class: status.css_class(),
            is_open: status.is_open(),
            days_overdue: if status == LoanStatus::Overdue {
                format::days_overdue(due_date, today)
            } else {
                0
            },
        })
    }
}

pub fn rows(
    records: &[models::LoanRecord],
    today: jiff::civil::Date,
) -> Result<Vec<LoanRow>, UnknownValue> {
    records.iter().map(|record| LoanRow::new(record, today)).collect()
}

/// Column header of the history table.
pub struct SortColumn {
    pub label: &'static str,
    pub href: String,
    pub indicator: &'static str,
}

#[derive(Template)]
#[template(path = "borrowing_history.html")]
pub struct BorrowingHistoryTemplate {
    layout: Layout,
    search: String,
    status_options: Vec<SelectOption>,
    columns: Vec<SortColumn>,
    loans: Vec<LoanRow>,
    pager: Pager,
}

pub fn loan_filter(query: &ListQuery) -> LoanFilter {
    LoanFilter {
        search: query.search(),
        status: query.status_value().and_then(|status| status.parse().ok()),
        sort: LoanSort::from_param(query.sort.as_deref()),
        order: SortOrder::from_param(query.order.as_deref()),
    }
}

fn sort_columns(query: &ListQuery, filter: &LoanFilter) -> Vec<SortColumn> {
    [
        (LoanSort::CheckoutDate, "Checked Out"),
        (LoanSort::DueDate, "Due"),
        (LoanSort::ReturnDate, "Returned"),
        (LoanSort::Status, "Status"),
    ]
    .into_iter()
    .map(|(sort, label)| SortColumn {
        label,
        href: query.sort_href(PATH, sort.as_str()),
        indicator: match (sort == filter.sort, filter.order) {
            (true, SortOrder::Asc) => "▲",
            (true, SortOrder::Desc) => "▼",
            (false, _) => "",
        },
    })
    .collect()
}

pub async fn get(
    State(app_state): State<AppState>,
    CurrentLibrarian(librarian): CurrentLibrarian,
    messages: Messages,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, Error> {
    let today = format::today();
    let filter = loan_filter(&query);
    let paged = app_state
        .store
        .list_loans(&filter, query.page(app_state.per_page), today)
        .await?;
    let loans = rows(&paged.items, today)?;
    let layout = Layout::build(
        &app_state,
        &librarian,
        messages,
        Nav::BorrowingHistory,
        "Borrowing History",
    )
    .await?;
    Ok(Html(
        BorrowingHistoryTemplate {
            layout,
            search: query.search_value().to_owned(),
            status_options: select_options(
                LoanStatus::ALL.iter().map(|s| (s.as_str(), s.label())),
                filter.status.as_ref().map(LoanStatus::as_str),
            ),
            columns: sort_columns(&query, &filter),
            loans,
            pager: Pager::new(&paged, &query, PATH),
        }
        .render()?,
    ))
}

/// Always answers JSON, whatever the caller accepts.
pub async fn post(
    State(app_state): State<AppState>,
    CurrentLibrarian(librarian): CurrentLibrarian,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let fields = FormFields::from(fields);
    match apply(&app_state, &librarian, &fields).await {
        Ok(outcome) => Json(outcome.envelope()).into_response(),
        Err(err) => err.into_json_response(),
    }
}

async fn apply(
    app_state: &AppState,
    librarian: &models::Librarian,
    fields: &FormFields,
) -> Result<Outcome, Error> {
    if !fields.has("ajax_return") {
        return Ok(Outcome::Failure("Unknown action".to_owned()));
    }
    let transaction_id = validated!(fields.required_int("transaction_id"));
    match app_state
        .store
        .mark_returned(transaction_id, format::today())
        .await
    {
        Ok(_) => {
            tracing::info!(transaction_id, librarian = %librarian.librarian_id, "book returned");
            Ok(Outcome::Success("Book marked as returned".to_owned()))
        }
        Err(libportal_db::Error::Skipped) => Ok(Outcome::Failure(
            "This book has already been returned".to_owned(),
        )),
        Err(libportal_db::Error::NotFound) => {
            Ok(Outcome::Failure("Transaction not found".to_owned()))
        }
        Err(err) => Err(err.into()),
    }
}
