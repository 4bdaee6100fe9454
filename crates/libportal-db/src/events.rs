use crate::{
    filters::{like_pattern, EventFilter, EventTiming},
    models,
    paging::{Page, Paged},
    schema::library::events,
    sql_date, Error, Store,
};
use diesel::prelude::*;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};

macro_rules! filtered_events {
    ($filter:expr, $today:expr, $selection:expr) => {{
        let filter: &EventFilter = $filter;
        let today: jiff::civil::Date = $today;
        let mut query = events::table.select($selection).into_boxed();
        if let Some(term) = filter.search.as_deref() {
            let pattern = like_pattern(term);
            query = query.filter(
                events::title
                    .ilike(pattern.clone())
                    .or(events::location.ilike(pattern)),
            );
        }
        match filter.timing {
            Some(EventTiming::Upcoming) => {
                query = query.filter(events::event_date.ge(sql_date(today)));
            }
            Some(EventTiming::Past) => {
                query = query.filter(events::event_date.lt(sql_date(today)));
            }
            None => {}
        }
        query
    }};
}

/// Outcome of an event edit. `replaced_image` names the file the edit made obsolete.
#[derive(Debug)]
pub struct UpdatedEvent {
    pub event: models::Event,
    pub replaced_image: Option<String>,
}

impl Store {
    #[tracing::instrument(skip(self))]
    pub async fn list_events(
        &self,
        filter: &EventFilter,
        page: Page,
        today: jiff::civil::Date,
    ) -> Result<Paged<models::Event>, Error> {
        let mut conn = self.library_connection().await?;
        let total_items = filtered_events!(filter, today, diesel::dsl::count_star())
            .get_result::<i64>(&mut conn)
            .await?;
        let query = filtered_events!(filter, today, models::Event::as_select());
        let query = match filter.timing {
            Some(EventTiming::Upcoming) => query
                .order(events::event_date.asc())
                .then_order_by(events::start_time.asc()),
            _ => query
                .order(events::event_date.desc())
                .then_order_by(events::start_time.desc()),
        };
        let items = query
            .limit(page.per_page)
            .offset(page.offset())
            .load(&mut conn)
            .await?;
        Ok(Paged {
            items,
            page,
            total_items,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn upcoming_events(
        &self,
        today: jiff::civil::Date,
        limit: i64,
    ) -> Result<Vec<models::Event>, Error> {
        let mut conn = self.library_connection().await?;
        events::table
            .filter(events::event_date.ge(sql_date(today)))
            .select(models::Event::as_select())
            .order((events::event_date.asc(), events::start_time.asc()))
            .limit(limit)
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_event(&self, event_id: i32) -> Result<Option<models::Event>, Error> {
        let mut conn = self.library_connection().await?;
        events::table
            .filter(events::event_id.eq(event_id))
            .select(models::Event::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, new_event), fields(title = %new_event.title))]
    pub async fn add_event(&self, new_event: models::NewEvent) -> Result<models::Event, Error> {
        let mut conn = self.library_connection().await?;
        diesel::insert_into(events::table)
            .values(new_event)
            .returning(models::Event::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(Into::into)
    }

    /// Rewrites an event. When `new_image` is given it replaces the stored one
    /// and the old file name is handed back for removal.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update_event(
        &self,
        event_id: i32,
        changes: models::EventChanges,
        new_image: Option<String>,
    ) -> Result<UpdatedEvent, Error> {
        self.library_connection()
            .await?
            .transaction(move |conn| {
                async move {
                    let previous_image = events::table
                        .filter(events::event_id.eq(event_id))
                        .select(events::image)
                        .for_update()
                        .first::<Option<String>>(conn)
                        .await
                        .optional()?
                        .ok_or(Error::NotFound)?;
                    let mut event = diesel::update(events::table.filter(events::event_id.eq(event_id)))
                        .set(changes)
                        .returning(models::Event::as_returning())
                        .get_result(conn)
                        .await?;
                    let mut replaced_image = None;
                    if let Some(new_image) = new_image {
                        event = diesel::update(events::table.filter(events::event_id.eq(event_id)))
                            .set(events::image.eq(Some(new_image)))
                            .returning(models::Event::as_returning())
                            .get_result(conn)
                            .await?;
                        replaced_image = previous_image;
                    }
                    Ok::<_, Error>(UpdatedEvent {
                        event,
                        replaced_image,
                    })
                }
                .scope_boxed()
            })
            .await
    }

    /// Deletes the event and returns the removed row so its image can be cleaned up.
    #[tracing::instrument(skip(self))]
    pub async fn delete_event(&self, event_id: i32) -> Result<models::Event, Error> {
        let mut conn = self.library_connection().await?;
        diesel::delete(events::table.filter(events::event_id.eq(event_id)))
            .returning(models::Event::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .ok_or(Error::NotFound)
    }
}
