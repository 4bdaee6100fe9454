use crate::{
    filters::{like_pattern, ProgramFilter},
    models,
    paging::{Page, Paged},
    schema::library::{patrons, reading_logs, reading_programs},
    Error, Store,
};
use diesel::prelude::*;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};
use itertools::Itertools;
use std::collections::HashMap;

macro_rules! filtered_programs {
    ($filter:expr, $selection:expr) => {{
        let filter: &ProgramFilter = $filter;
        let mut query = reading_programs::table.select($selection).into_boxed();
        if let Some(term) = filter.search.as_deref() {
            query = query.filter(reading_programs::title.ilike(like_pattern(term)));
        }
        if let Some(status) = filter.status {
            query = query.filter(reading_programs::status.eq(status.as_str()));
        }
        query
    }};
}

impl Store {
    #[tracing::instrument(skip(self))]
    pub async fn list_programs(
        &self,
        filter: &ProgramFilter,
        page: Page,
    ) -> Result<Paged<models::ProgramRecord>, Error> {
        use diesel::dsl::{count_distinct, sum};
        let mut conn = self.library_connection().await?;
        let total_items = filtered_programs!(filter, diesel::dsl::count_star())
            .get_result::<i64>(&mut conn)
            .await?;
        let programs = filtered_programs!(filter, models::ReadingProgram::as_select())
            .order(reading_programs::start_date.desc())
            .then_order_by(reading_programs::id.desc())
            .limit(page.per_page)
            .offset(page.offset())
            .load(&mut conn)
            .await?;
        let ids = programs.iter().map(|p| p.id).collect_vec();
        let mut totals: HashMap<i32, models::ProgramTotals> = reading_logs::table
            .filter(reading_logs::program_id.eq_any(ids))
            .group_by(reading_logs::program_id)
            .select((
                reading_logs::program_id,
                count_distinct(reading_logs::patron_id),
                sum(reading_logs::minutes_read),
            ))
            .load::<(i32, i64, Option<i64>)>(&mut conn)
            .await?
            .into_iter()
            .map(|(program_id, participants, minutes)| {
                (
                    program_id,
                    models::ProgramTotals {
                        participants,
                        minutes: minutes.unwrap_or(0),
                    },
                )
            })
            .collect();
        let items = programs
            .into_iter()
            .map(|program| models::ProgramRecord {
                totals: totals.remove(&program.id).unwrap_or_default(),
                program,
            })
            .collect();
        Ok(Paged {
            items,
            page,
            total_items,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_program(
        &self,
        program_id: i32,
    ) -> Result<Option<models::ReadingProgram>, Error> {
        let mut conn = self.library_connection().await?;
        reading_programs::table
            .filter(reading_programs::id.eq(program_id))
            .select(models::ReadingProgram::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, new_program), fields(title = %new_program.title))]
    pub async fn add_program(
        &self,
        new_program: models::NewReadingProgram,
    ) -> Result<models::ReadingProgram, Error> {
        let mut conn = self.library_connection().await?;
        diesel::insert_into(reading_programs::table)
            .values(new_program)
            .returning(models::ReadingProgram::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, changes))]
    pub async fn update_program(
        &self,
        program_id: i32,
        changes: models::ReadingProgramChanges,
    ) -> Result<models::ReadingProgram, Error> {
        let mut conn = self.library_connection().await?;
        diesel::update(reading_programs::table.filter(reading_programs::id.eq(program_id)))
            .set(changes)
            .returning(models::ReadingProgram::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .ok_or(Error::NotFound)
    }

    /// Removes a program together with every reading log recorded against it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_program(&self, program_id: i32) -> Result<(), Error> {
        self.library_connection()
            .await?
            .transaction(move |conn| {
                async move {
                    let logs = diesel::delete(
                        reading_logs::table.filter(reading_logs::program_id.eq(program_id)),
                    )
                    .execute(conn)
                    .await?;
                    match diesel::delete(
                        reading_programs::table.filter(reading_programs::id.eq(program_id)),
                    )
                    .execute(conn)
                    .await?
                    {
                        0 => Err(Error::NotFound),
                        _ => {
                            tracing::debug!(program_id, logs, "deleted reading program");
                            Ok(())
                        }
                    }
                }
                .scope_boxed()
            })
            .await
    }

    /// Records a reading session. Fails with [`Error::NotFound`] when the
    /// program or the patron does not exist.
    #[tracing::instrument(skip(self, new_log), fields(program_id = new_log.program_id, patron_id = new_log.patron_id))]
    pub async fn add_reading_log(
        &self,
        new_log: models::NewReadingLog,
    ) -> Result<models::ReadingLog, Error> {
        self.library_connection()
            .await?
            .transaction(move |conn| {
                async move {
                    let program_exists = diesel::select(diesel::dsl::exists(
                        reading_programs::table
                            .filter(reading_programs::id.eq(new_log.program_id)),
                    ))
                    .get_result::<bool>(conn)
                    .await?;
                    let patron_exists = diesel::select(diesel::dsl::exists(
                        patrons::table.filter(patrons::patron_id.eq(new_log.patron_id)),
                    ))
                    .get_result::<bool>(conn)
                    .await?;
                    if !(program_exists && patron_exists) {
                        return Err(Error::NotFound);
                    }
                    diesel::insert_into(reading_logs::table)
                        .values(new_log)
                        .returning(models::ReadingLog::as_returning())
                        .get_result(conn)
                        .await
                        .map_err(Into::into)
                }
                .scope_boxed()
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn recent_reading_logs(
        &self,
        program_id: i32,
        limit: i64,
    ) -> Result<Vec<(models::ReadingLog, models::PatronName)>, Error> {
        let mut conn = self.library_connection().await?;
        reading_logs::table
            .inner_join(patrons::table)
            .filter(reading_logs::program_id.eq(program_id))
            .select((
                models::ReadingLog::as_select(),
                models::PatronName::as_select(),
            ))
            .order((reading_logs::log_date.desc(), reading_logs::id.desc()))
            .limit(limit)
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    /// Per-patron totals for one program, most minutes first. Books are counted
    /// by distinct title.
    #[tracing::instrument(skip(self))]
    pub async fn program_participants(
        &self,
        program_id: i32,
    ) -> Result<Vec<models::ParticipantProgress>, Error> {
        let mut conn = self.library_connection().await?;
        let logs = reading_logs::table
            .inner_join(patrons::table)
            .filter(reading_logs::program_id.eq(program_id))
            .select((
                models::PatronName::as_select(),
                reading_logs::book_title,
                reading_logs::minutes_read,
                reading_logs::pages_read,
            ))
            .load::<(models::PatronName, String, i32, i32)>(&mut conn)
            .await?;
        Ok(summarize_participants(logs))
    }
}

pub(crate) fn summarize_participants(
    logs: Vec<(models::PatronName, String, i32, i32)>,
) -> Vec<models::ParticipantProgress> {
    logs.into_iter()
        .into_group_map_by(|(patron, ..)| patron.patron_id)
        .into_values()
        .filter_map(|entries| {
            let patron = entries.as_slice().first()?.0.clone();
            let minutes: i64 = entries.iter().map(|(_, _, m, _)| i64::from(*m)).sum();
            let pages: i64 = entries.iter().map(|(_, _, _, p)| i64::from(*p)).sum();
            let books = entries
                .iter()
                .map(|(_, title, _, _)| title.trim().to_lowercase())
                .unique()
                .count() as i64;
            Some(models::ParticipantProgress {
                patron,
                minutes,
                pages,
                books,
            })
        })
        .sorted_by(|a, b| {
            b.minutes
                .cmp(&a.minutes)
                .then_with(|| a.patron.last_name.cmp(&b.patron.last_name))
        })
        .collect()
}
