use crate::{
    error::Error,
    format,
    forms::{FormFields, ValidationError},
    layout::{select_options, Layout, ListQuery, Nav, Pager, SelectOption},
    login::CurrentLibrarian,
    respond::{self, validated, Ajax, Outcome},
    uploads::{UploadDir, UploadedFile},
    AppState,
};
use askama::Template;
use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    response::Html,
    response::Response,
};
use http::StatusCode;
use axum_messages::Messages;
use libportal_db::{models, EventFilter, EventTiming};
use std::collections::HashMap;

const PATH: &str = "/events";
const IMAGE_FIELD: &str = "image";
const IMAGE_PREFIX: &str = "event";

pub struct EventRow {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub date: String,
    pub day: String,
    pub month: String,
    pub time_range: String,
    pub location: String,
    pub image_url: Option<String>,
    pub is_past: bool,
    pub input_date: String,
    pub input_start: String,
    pub input_end: String,
}

impl EventRow {
    pub fn new(event: &models::Event, today: jiff::civil::Date, uploads: &UploadDir) -> Self {
        let event_date = event.event_date.to_jiff();
        let start_time = event.start_time.to_jiff();
        let end_time = event.end_time.to_jiff();
        Self {
            id: event.event_id,
            title: event.title.clone(),
            description: event.description.clone().unwrap_or_default(),
            date: format::date(event_date),
            day: event_date.strftime("%d").to_string(),
            month: event_date.strftime("%b").to_string(),
            time_range: format!("{} - {}", format::time(start_time), format::time(end_time)),
            location: event.location.clone().unwrap_or_default(),
            image_url: event.image.as_deref().map(|image| uploads.url_for(image)),
            is_past: event_date < today,
            input_date: format::input_date(event_date),
            input_start: format::input_time(start_time),
            input_end: format::input_time(end_time),
        }
    }
}

#[derive(Template)]
#[template(path = "events.html")]
pub struct EventsTemplate {
    layout: Layout,
    search: String,
    status_options: Vec<SelectOption>,
    events: Vec<EventRow>,
    pager: Pager,
    max_image_kb: usize,
}

pub async fn get(
    State(app_state): State<AppState>,
    CurrentLibrarian(librarian): CurrentLibrarian,
    messages: Messages,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, Error> {
    let today = format::today();
    let filter = EventFilter {
        search: query.search(),
        timing: EventTiming::from_param(query.status_value()),
    };
    let paged = app_state
        .store
        .list_events(&filter, query.page(app_state.per_page), today)
        .await?;
    let events = paged
        .items
        .iter()
        .map(|event| EventRow::new(event, today, &app_state.uploads))
        .collect();
    let layout = Layout::build(&app_state, &librarian, messages, Nav::Events, "Events").await?;
    Ok(Html(
        EventsTemplate {
            layout,
            search: query.search_value().to_owned(),
            status_options: select_options(
                [("upcoming", "Upcoming"), ("past", "Past")],
                filter.timing.as_ref().map(EventTiming::as_str),
            ),
            events,
            pager: Pager::new(&paged, &query, PATH),
            max_image_kb: app_state.uploads.max_bytes() / 1024,
        }
        .render()?,
    ))
}

pub async fn post(
    State(app_state): State<AppState>,
    CurrentLibrarian(librarian): CurrentLibrarian,
    ajax: Ajax,
    messages: Messages,
    multipart: Multipart,
) -> Response {
    let result = match read_submission(multipart, app_state.uploads.max_bytes()).await {
        Ok(Ok((fields, image))) => apply(&app_state, &librarian, &fields, image).await,
        Ok(Err(outcome)) => Ok(outcome),
        Err(err) => Err(err),
    };
    respond::finish(result, ajax, messages, PATH)
}

/// Reads the form, turning a body the client got wrong into a failed outcome.
pub(crate) async fn read_submission(
    multipart: Multipart,
    max_image_bytes: usize,
) -> Result<Result<(FormFields, Option<UploadedFile>), Outcome>, Error> {
    match read_form(multipart).await {
        Ok(form) => Ok(Ok(form)),
        Err(Error::Multipart(err)) => Ok(Err(rejected_body(&err, max_image_bytes))),
        Err(err) => Err(err),
    }
}

fn rejected_body(err: &MultipartError, max_image_bytes: usize) -> Outcome {
    tracing::warn!(status = %err.status(), "rejected event form: {}", err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Outcome::Failure(format!(
            "The image is too large, the limit is {} KB",
            max_image_bytes / 1024
        ))
    } else {
        Outcome::Failure("The submitted form could not be read".to_owned())
    }
}

/// Splits the multipart body into text fields and the optional image file.
async fn read_form(mut multipart: Multipart) -> Result<(FormFields, Option<UploadedFile>), Error> {
    let mut fields = HashMap::new();
    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == IMAGE_FIELD {
            let file_name = field.file_name().map(str::to_owned).unwrap_or_default();
            let bytes = field.bytes().await?;
            if !file_name.is_empty() && !bytes.is_empty() {
                image = Some(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            fields.insert(name, field.text().await?);
        }
    }
    Ok((FormFields::from(fields), image))
}

async fn apply(
    app_state: &AppState,
    librarian: &models::Librarian,
    fields: &FormFields,
    image: Option<UploadedFile>,
) -> Result<Outcome, Error> {
    if fields.has("add_event") {
        add(app_state, librarian, fields, image).await
    } else if fields.has("update_event") {
        update(app_state, fields, image).await
    } else if fields.has("delete_event") {
        delete(app_state, fields).await
    } else {
        Ok(Outcome::Failure("Unknown action".to_owned()))
    }
}

/// Saves the image, mapping a rejected file to a failed outcome.
async fn store_image(
    uploads: &UploadDir,
    image: Option<UploadedFile>,
) -> Result<Result<Option<String>, Outcome>, Error> {
    let Some(file) = image else {
        return Ok(Ok(None));
    };
    match uploads.save(IMAGE_PREFIX, &file).await {
        Ok(stored_name) => Ok(Ok(Some(stored_name))),
        Err(err) if err.is_rejection() => Ok(Err(Outcome::Failure(err.to_string()))),
        Err(err) => Err(err.into()),
    }
}

async fn add(
    app_state: &AppState,
    librarian: &models::Librarian,
    fields: &FormFields,
    image: Option<UploadedFile>,
) -> Result<Outcome, Error> {
    let details = validated!(EventDetails::parse(fields));
    let stored_image = match store_image(&app_state.uploads, image).await? {
        Ok(stored_image) => stored_image,
        Err(outcome) => return Ok(outcome),
    };
    let new_event = details.into_new_event(librarian.id, stored_image.clone());
    match app_state.store.add_event(new_event).await {
        Ok(event) => {
            tracing::info!(event_id = event.event_id, "event added");
            Ok(Outcome::Success(format!("Event \"{}\" has been added", event.title)))
        }
        Err(err) => {
            if let Some(stored_image) = stored_image {
                app_state.uploads.discard(&stored_image).await;
            }
            Err(err.into())
        }
    }
}

async fn update(
    app_state: &AppState,
    fields: &FormFields,
    image: Option<UploadedFile>,
) -> Result<Outcome, Error> {
    let event_id = validated!(fields.required_int("event_id"));
    let details = validated!(EventDetails::parse(fields));
    let stored_image = match store_image(&app_state.uploads, image).await? {
        Ok(stored_image) => stored_image,
        Err(outcome) => return Ok(outcome),
    };
    let result = app_state
        .store
        .update_event(event_id, details.into_changes(), stored_image.clone())
        .await;
    match result {
        Ok(updated) => {
            if let Some(replaced_image) = updated.replaced_image {
                app_state.uploads.discard(&replaced_image).await;
            }
            Ok(Outcome::Success(format!(
                "Event \"{}\" has been updated",
                updated.event.title
            )))
        }
        Err(err) => {
            if let Some(stored_image) = stored_image {
                app_state.uploads.discard(&stored_image).await;
            }
            match err {
                libportal_db::Error::NotFound => Ok(Outcome::Failure("Event not found".to_owned())),
                err => Err(err.into()),
            }
        }
    }
}

async fn delete(app_state: &AppState, fields: &FormFields) -> Result<Outcome, Error> {
    let event_id = validated!(fields.required_int("event_id"));
    let deleted = app_state.store.delete_event(event_id).await;
    after_delete(&app_state.uploads, event_id, deleted).await
}

/// Removes the image of a deleted event and reports the result.
pub(crate) async fn after_delete(
    uploads: &UploadDir,
    event_id: i32,
    deleted: Result<models::Event, libportal_db::Error>,
) -> Result<Outcome, Error> {
    match deleted {
        Ok(event) => {
            if let Some(image) = event.image {
                uploads.discard(&image).await;
            }
            tracing::info!(event_id, "event deleted");
            Ok(Outcome::Success(format!("Event \"{}\" has been deleted", event.title)))
        }
        Err(libportal_db::Error::NotFound) => Ok(Outcome::Failure("Event not found".to_owned())),
        Err(err) => Err(err.into()),
    }
}

/// The validated text fields of the add and edit forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EventDetails {
    pub title: String,
    pub description: Option<String>,
    pub event_date: jiff::civil::Date,
    pub start_time: jiff::civil::Time,
    pub end_time: jiff::civil::Time,
    pub location: Option<String>,
}

impl EventDetails {
    pub fn parse(fields: &FormFields) -> Result<Self, ValidationError> {
        let title = fields.required("title")?.to_owned();
        let event_date = fields.required_date("event_date")?;
        let start_time = fields.required_time("start_time")?;
        let end_time = fields.required_time("end_time")?;
        if end_time <= start_time {
            return Err(ValidationError::invalid(
                "end_time",
                "must be after the start time",
            ));
        }
        Ok(Self {
            title,
            description: fields.owned_text("description"),
            event_date,
            start_time,
            end_time,
            location: fields.owned_text("location"),
        })
    }

    fn into_new_event(self, created_by: i32, image: Option<String>) -> models::NewEvent {
        models::NewEvent {
            title: self.title,
            description: self.description,
            event_date: self.event_date.into(),
            start_time: self.start_time.into(),
            end_time: self.end_time.into(),
            location: self.location,
            image,
            created_by,
            created_at: jiff::Timestamp::now().into(),
        }
    }

    fn into_changes(self) -> models::EventChanges {
        models::EventChanges {
            title: self.title,
            description: self.description,
            event_date: self.event_date.into(),
            start_time: self.start_time.into(),
            end_time: self.end_time.into(),
            location: self.location,
        }
    }
}
