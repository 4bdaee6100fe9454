use crate::{
    error::Error,
    format,
    forms::{FormFields, ValidationError},
    layout::{select_options, Layout, ListQuery, Nav, Pager, SelectOption},
    loans::{self, LoanRow},
    login::CurrentLibrarian,
    respond::{self, validated, Ajax, Outcome},
    AppState,
};
use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_messages::Messages;
use jiff::ToSpan;
use libportal_db::{models, status::UnknownValue, PatronFilter, PatronStatus};
use std::collections::HashMap;

const PATH: &str = "/patrons";
const HISTORY_LIMIT: i64 = 50;
const DEFAULT_MAX_BOOKS: i32 = 3;
const MAX_BOOKS_RANGE: std::ops::RangeInclusive<i32> = 1..=20;

pub struct PatronRow {
    pub id: i32,
    pub name: String,
    pub initials: String,
    pub email: String,
    pub contact_number: String,
    pub address: String,
    pub member_since: String,
    pub expires: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub status_class: String,
    pub max_books: i32,
}

impl PatronRow {
    fn new(patron: &models::Patron) -> Result<Self, UnknownValue> {
        let status = patron.status.parse::<PatronStatus>()?;
        Ok(Self {
            id: patron.patron_id,
            name: format!("{} {}", patron.first_name, patron.last_name),
            initials: format::initials(&patron.first_name, &patron.last_name),
            email: patron.email.clone(),
            contact_number: patron.contact_number.clone().unwrap_or_default(),
            address: patron.address.clone().unwrap_or_default(),
            member_since: format::date(patron.membership_date.to_jiff()),
            expires: format::optional_date(patron.membership_expiry.map(|d| d.to_jiff())),
            status: status.as_str(),
            status_label: status.label(),
            status_class: status.css_class(),
            max_books: patron.max_books_allowed,
        })
    }
}

fn status_choices() -> impl Iterator<Item = (&'static str, &'static str)> {
    PatronStatus::ALL.iter().map(|s| (s.as_str(), s.label()))
}

#[derive(Template)]
#[template(path = "patrons.html")]
pub struct PatronsTemplate {
    layout: Layout,
    search: String,
    status_options: Vec<SelectOption>,
    new_status_options: Vec<SelectOption>,
    today: String,
    patrons: Vec<PatronRow>,
    pager: Pager,
}

#[derive(Template)]
#[template(path = "patron.html")]
pub struct PatronTemplate {
    layout: Layout,
    patron: PatronRow,
    status_options: Vec<SelectOption>,
    loans: Vec<LoanRow>,
    open_loans: usize,
}

pub async fn get(
    State(app_state): State<AppState>,
    CurrentLibrarian(librarian): CurrentLibrarian,
    messages: Messages,
    Query(query): Query<ListQuery>,
) -> Result<Response, Error> {
    if let Some(patron_id) = query.viewed_id() {
        return view(app_state, librarian, messages, patron_id).await;
    }
    let filter = PatronFilter {
        search: query.search(),
        status: query.status_value().and_then(|status| status.parse().ok()),
    };
    let paged = app_state
        .store
        .list_patrons(&filter, query.page(app_state.per_page))
        .await?;
    let patrons = paged
        .items
        .iter()
        .map(PatronRow::new)
        .collect::<Result<Vec<_>, _>>()?;
    let layout = Layout::build(&app_state, &librarian, messages, Nav::Patrons, "Patrons").await?;
    Ok(Html(
        PatronsTemplate {
            layout,
            search: query.search_value().to_owned(),
            status_options: select_options(
                status_choices(),
                filter.status.as_ref().map(PatronStatus::as_str),
            ),
            new_status_options: select_options(status_choices(), None),
            today: format::input_date(format::today()),
            patrons,
            pager: Pager::new(&paged, &query, PATH),
        }
        .render()?,
    )
    .into_response())
}

async fn view(
    app_state: AppState,
    librarian: models::Librarian,
    messages: Messages,
    patron_id: i32,
) -> Result<Response, Error> {
    let Some(patron) = app_state.store.load_patron(patron_id).await? else {
        messages.error("Patron not found");
        return Ok(Redirect::to(PATH).into_response());
    };
    let today = format::today();
    let history = app_state
        .store
        .loans_for_patron(patron_id, HISTORY_LIMIT)
        .await?;
    let loans = loans::rows(&history, today)?;
    let patron = PatronRow::new(&patron)?;
    let layout = Layout::build(
        &app_state,
        &librarian,
        messages,
        Nav::Patrons,
        patron.name.clone(),
    )
    .await?;
    Ok(Html(
        PatronTemplate {
            layout,
            status_options: select_options(status_choices(), Some(patron.status)),
            open_loans: loans.iter().filter(|loan| loan.is_open).count(),
            patron,
            loans,
        }
        .render()?,
    )
    .into_response())
}

pub async fn post(
    State(app_state): State<AppState>,
    CurrentLibrarian(librarian): CurrentLibrarian,
    ajax: Ajax,
    messages: Messages,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let fields = FormFields::from(fields);
    let back = fields
        .int("patron_id")
        .ok()
        .flatten()
        .filter(|_| fields.has("update_status"))
        .map(|id| format!("{PATH}?action=view&id={id}"))
        .unwrap_or_else(|| PATH.to_owned());
    let result = apply(&app_state, &librarian, &fields).await;
    respond::finish(result, ajax, messages, &back)
}

async fn apply(
    app_state: &AppState,
    librarian: &models::Librarian,
    fields: &FormFields,
) -> Result<Outcome, Error> {
    if fields.has("add_patron") {
        let new_patron = validated!(new_patron(fields, format::today()));
        let patron = app_state.store.add_patron(new_patron).await?;
        tracing::info!(patron_id = patron.patron_id, librarian = %librarian.librarian_id, "patron added");
        Ok(Outcome::Success(format!(
            "{} {} has been added",
            patron.first_name, patron.last_name
        )))
    } else if fields.has("update_status") {
        let patron_id = validated!(fields.required_int("patron_id"));
        let status = validated!(patron_status(fields));
        match app_state
            .store
            .update_patron_status(patron_id, status)
            .await
        {
            Ok(()) => Ok(Outcome::Success(format!(
                "Patron status changed to {}",
                status.label()
            ))),
            Err(libportal_db::Error::NotFound) => Ok(Outcome::Failure("Patron not found".to_owned())),
            Err(err) => Err(err.into()),
        }
    } else {
        Ok(Outcome::Failure("Unknown action".to_owned()))
    }
}

fn patron_status(fields: &FormFields) -> Result<PatronStatus, ValidationError> {
    fields
        .required("status")?
        .parse()
        .map_err(|_| ValidationError::invalid("status", "must be active, inactive or suspended"))
}

pub(crate) fn new_patron(
    fields: &FormFields,
    today: jiff::civil::Date,
) -> Result<models::NewPatron, ValidationError> {
    let first_name = fields.required("first_name")?.to_owned();
    let last_name = fields.required("last_name")?.to_owned();
    let email = fields.required("email")?.to_owned();
    if !email_address::EmailAddress::is_valid(&email) {
        return Err(ValidationError::invalid("email", "is not a valid email address"));
    }
    let max_books_allowed = fields.int("max_books_allowed")?.unwrap_or(DEFAULT_MAX_BOOKS);
    if !MAX_BOOKS_RANGE.contains(&max_books_allowed) {
        return Err(ValidationError::invalid(
            "max_books_allowed",
            format!(
                "must be between {} and {}",
                MAX_BOOKS_RANGE.start(),
                MAX_BOOKS_RANGE.end()
            ),
        ));
    }
    let membership_date = fields.date("membership_date")?.unwrap_or(today);
    let membership_expiry = match fields.date("membership_expiry")? {
        Some(expiry) => expiry,
        None => membership_date
            .checked_add(1.year())
            .map_err(|_| ValidationError::invalid("membership_date", "is out of range"))?,
    };
    if membership_expiry < membership_date {
        return Err(ValidationError::invalid(
            "membership_expiry",
            "must not be before the membership date",
        ));
    }
    Ok(models::NewPatron {
        user_id: None,
        first_name,
        last_name,
        email,
        contact_number: fields.owned_text("contact_number"),
        address: fields.owned_text("address"),
        membership_date: membership_date.into(),
        membership_expiry: Some(membership_expiry.into()),
        status: PatronStatus::Active.as_str().to_owned(),
        max_books_allowed,
    })
}
