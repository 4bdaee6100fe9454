//! Reading programs and the reading logs recorded against them.

use crate::{
    error::Error,
    format,
    forms::{FormFields, ValidationError},
    layout::{select_options, Layout, ListQuery, Nav, Pager, SelectOption},
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
use libportal_db::{models, status::UnknownValue, ProgramFilter, ProgramStatus};
use std::collections::HashMap;

const PATH: &str = "/reading-programs";
const RECENT_LOG_LIMIT: i64 = 20;

pub struct ProgramRow {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub period: String,
    pub target_minutes: i32,
    pub target_books: i32,
    pub age_group: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub status_class: String,
    pub participants: i64,
    pub total_minutes: i64,
    pub input_start: String,
    pub input_end: String,
}

impl ProgramRow {
    fn new(
        program: &models::ReadingProgram,
        totals: &models::ProgramTotals,
    ) -> Result<Self, UnknownValue> {
        let status = program.status.parse::<ProgramStatus>()?;
        let start_date = program.start_date.to_jiff();
        let end_date = program.end_date.to_jiff();
        Ok(Self {
            id: program.id,
            title: program.title.clone(),
            description: program.description.clone().unwrap_or_default(),
            period: format!("{} - {}", format::date(start_date), format::date(end_date)),
            target_minutes: program.target_minutes,
            target_books: program.target_books,
            age_group: program.age_group.clone().unwrap_or_default(),
            status: status.as_str(),
            status_label: status.label(),
            status_class: status.css_class(),
            participants: totals.participants,
            total_minutes: totals.minutes,
            input_start: format::input_date(start_date),
            input_end: format::input_date(end_date),
        })
    }
}

pub struct ParticipantRow {
    pub patron_id: i32,
    pub name: String,
    pub minutes: i64,
    pub pages: i64,
    pub books: i64,
    pub minutes_percent: i64,
    pub books_percent: i64,
}

/// Share of `target` reached, capped at 100. A zero target counts as reached.
pub(crate) fn percent_of(value: i64, target: i32) -> i64 {
    if target <= 0 {
        return 100;
    }
    (value * 100 / i64::from(target)).clamp(0, 100)
}

impl ParticipantRow {
    fn new(progress: &models::ParticipantProgress, program: &models::ReadingProgram) -> Self {
        Self {
            patron_id: progress.patron.patron_id,
            name: progress.patron.full_name(),
            minutes: progress.minutes,
            pages: progress.pages,
            books: progress.books,
            minutes_percent: percent_of(progress.minutes, program.target_minutes),
            books_percent: percent_of(progress.books, program.target_books),
        }
    }
}

pub struct LogRow {
    pub patron_name: String,
    pub book_title: String,
    pub minutes: i32,
    pub pages: i32,
    pub date: String,
    pub logged: String,
    pub notes: String,
}

impl LogRow {
    fn new(log: &models::ReadingLog, patron: &models::PatronName, now: jiff::Timestamp) -> Self {
        Self {
            patron_name: patron.full_name(),
            book_title: log.book_title.clone(),
            minutes: log.minutes_read,
            pages: log.pages_read,
            date: format::date(log.log_date.to_jiff()),
            logged: format::time_ago(log.created_at.to_jiff(), now),
            notes: log.notes.clone().unwrap_or_default(),
        }
    }
}

pub struct PatronChoice {
    pub id: i32,
    pub name: String,
}

fn status_choices() -> impl Iterator<Item = (&'static str, &'static str)> {
    ProgramStatus::ALL.iter().map(|s| (s.as_str(), s.label()))
}

#[derive(Template)]
#[template(path = "programs.html")]
pub struct ProgramsTemplate {
    layout: Layout,
    search: String,
    status_options: Vec<SelectOption>,
    form_status_options: Vec<SelectOption>,
    programs: Vec<ProgramRow>,
    pager: Pager,
}

#[derive(Template)]
#[template(path = "program.html")]
pub struct ProgramTemplate {
    layout: Layout,
    program: ProgramRow,
    participants: Vec<ParticipantRow>,
    logs: Vec<LogRow>,
    patrons: Vec<PatronChoice>,
    form_status_options: Vec<SelectOption>,
    today: String,
}

pub async fn get(
    State(app_state): State<AppState>,
    CurrentLibrarian(librarian): CurrentLibrarian,
    messages: Messages,
    Query(query): Query<ListQuery>,
) -> Result<Response, Error> {
    if let Some(program_id) = query.viewed_id() {
        return view(app_state, librarian, messages, program_id).await;
    }
    let filter = ProgramFilter {
        search: query.search(),
        status: query.status_value().and_then(|status| status.parse().ok()),
    };
    let paged = app_state
        .store
        .list_programs(&filter, query.page(app_state.per_page))
        .await?;
    let programs = paged
        .items
        .iter()
        .map(|record| ProgramRow::new(&record.program, &record.totals))
        .collect::<Result<Vec<_>, _>>()?;
    let layout = Layout::build(
        &app_state,
        &librarian,
        messages,
        Nav::ReadingPrograms,
        "Reading Programs",
    )
    .await?;
    Ok(Html(
        ProgramsTemplate {
            layout,
            search: query.search_value().to_owned(),
            status_options: select_options(
                status_choices(),
                filter.status.as_ref().map(ProgramStatus::as_str),
            ),
            form_status_options: select_options(status_choices(), None),
            programs,
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
    program_id: i32,
) -> Result<Response, Error> {
    let store = &app_state.store;
    let Some(program) = store.load_program(program_id).await? else {
        messages.error("Reading program not found");
        return Ok(Redirect::to(PATH).into_response());
    };
    let (progress, recent_logs, patrons) = tokio::try_join!(
        store.program_participants(program_id),
        store.recent_reading_logs(program_id, RECENT_LOG_LIMIT),
        store.list_active_patron_names(),
    )?;
    let totals = models::ProgramTotals {
        participants: progress.len() as i64,
        minutes: progress.iter().map(|p| p.minutes).sum(),
    };
    let now = jiff::Timestamp::now();
    let row = ProgramRow::new(&program, &totals)?;
    let layout = Layout::build(
        &app_state,
        &librarian,
        messages,
        Nav::ReadingPrograms,
        row.title.clone(),
    )
    .await?;
    Ok(Html(
        ProgramTemplate {
            layout,
            form_status_options: select_options(status_choices(), Some(row.status)),
            program: row,
            participants: progress
                .iter()
                .map(|p| ParticipantRow::new(p, &program))
                .collect(),
            logs: recent_logs
                .iter()
                .map(|(log, patron)| LogRow::new(log, patron, now))
                .collect(),
            patrons: patrons
                .into_iter()
                .map(|patron| PatronChoice {
                    id: patron.patron_id,
                    name: patron.full_name(),
                })
                .collect(),
            today: format::input_date(format::today()),
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
    let back = if fields.has("add_log") || fields.has("edit_program") {
        fields.int("program_id").ok().flatten()
    } else {
        None
    }
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
    let today = format::today();
    let store = &app_state.store;
    if fields.has("add_program") {
        let details = validated!(ProgramDetails::parse(fields, today));
        let program = store
            .add_program(details.into_new_program(librarian.id))
            .await?;
        tracing::info!(program_id = program.id, "reading program added");
        Ok(Outcome::Success(format!(
            "Reading program \"{}\" has been added",
            program.title
        )))
    } else if fields.has("edit_program") {
        let program_id = validated!(fields.required_int("program_id"));
        let details = validated!(ProgramDetails::parse(fields, today));
        match store.update_program(program_id, details.into_changes()).await {
            Ok(program) => Ok(Outcome::Success(format!(
                "Reading program \"{}\" has been updated",
                program.title
            ))),
            Err(libportal_db::Error::NotFound) => {
                Ok(Outcome::Failure("Reading program not found".to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    } else if fields.has("delete_program") {
        let program_id = validated!(fields.required_int("program_id"));
        match store.delete_program(program_id).await {
            Ok(()) => {
                tracing::info!(program_id, "reading program deleted");
                Ok(Outcome::Success("Reading program has been deleted".to_owned()))
            }
            Err(libportal_db::Error::NotFound) => {
                Ok(Outcome::Failure("Reading program not found".to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    } else if fields.has("add_log") {
        let new_log = validated!(new_reading_log(fields, today));
        match store.add_reading_log(new_log).await {
            Ok(log) => Ok(Outcome::Success(format!(
                "Logged {} minutes of \"{}\"",
                log.minutes_read, log.book_title
            ))),
            Err(libportal_db::Error::NotFound) => Ok(Outcome::Failure(
                "Unknown reading program or patron".to_owned(),
            )),
            Err(err) => Err(err.into()),
        }
    } else {
        Ok(Outcome::Failure("Unknown action".to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProgramDetails {
    pub title: String,
    pub description: Option<String>,
    pub start_date: jiff::civil::Date,
    pub end_date: jiff::civil::Date,
    pub target_minutes: i32,
    pub target_books: i32,
    pub age_group: Option<String>,
    pub status: ProgramStatus,
}

fn non_negative(fields: &FormFields, key: &'static str) -> Result<i32, ValidationError> {
    match fields.int(key)?.unwrap_or(0) {
        value if value < 0 => Err(ValidationError::invalid(key, "must not be negative")),
        value => Ok(value),
    }
}

impl ProgramDetails {
    /// A blank status is derived from the date range.
    pub fn parse(fields: &FormFields, today: jiff::civil::Date) -> Result<Self, ValidationError> {
        let title = fields.required("title")?.to_owned();
        let start_date = fields.required_date("start_date")?;
        let end_date = fields.required_date("end_date")?;
        if end_date < start_date {
            return Err(ValidationError::invalid(
                "end_date",
                "must not be before the start date",
            ));
        }
        let status = match fields.text("status") {
            Some(status) => status.parse().map_err(|_| {
                ValidationError::invalid("status", "must be upcoming, active or completed")
            })?,
            None => ProgramStatus::from_dates(start_date, end_date, today),
        };
        Ok(Self {
            title,
            description: fields.owned_text("description"),
            start_date,
            end_date,
            target_minutes: non_negative(fields, "target_minutes")?,
            target_books: non_negative(fields, "target_books")?,
            age_group: fields.owned_text("age_group"),
            status,
        })
    }

    fn into_new_program(self, created_by: i32) -> models::NewReadingProgram {
        models::NewReadingProgram {
            title: self.title,
            description: self.description,
            start_date: self.start_date.into(),
            end_date: self.end_date.into(),
            target_minutes: self.target_minutes,
            target_books: self.target_books,
            age_group: self.age_group,
            status: self.status.as_str().to_owned(),
            created_by,
            created_at: jiff::Timestamp::now().into(),
        }
    }

    fn into_changes(self) -> models::ReadingProgramChanges {
        models::ReadingProgramChanges {
            title: self.title,
            description: self.description,
            start_date: self.start_date.into(),
            end_date: self.end_date.into(),
            target_minutes: self.target_minutes,
            target_books: self.target_books,
            age_group: self.age_group,
            status: self.status.as_str().to_owned(),
        }
    }
}

pub(crate) fn new_reading_log(
    fields: &FormFields,
    today: jiff::civil::Date,
) -> Result<models::NewReadingLog, ValidationError> {
    let program_id = fields.required_int("program_id")?;
    let patron_id = fields.required_int("patron_id")?;
    let book_title = fields.required("book_title")?.to_owned();
    let minutes_read = fields.required_int("minutes_read")?;
    if minutes_read <= 0 {
        return Err(ValidationError::invalid("minutes_read", "must be greater than zero"));
    }
    Ok(models::NewReadingLog {
        program_id,
        patron_id,
        book_id: fields.int("book_id")?,
        book_title,
        minutes_read,
        pages_read: non_negative(fields, "pages_read")?,
        log_date: fields.date("log_date")?.unwrap_or(today).into(),
        notes: fields.owned_text("notes"),
        created_at: jiff::Timestamp::now().into(),
    })
}
