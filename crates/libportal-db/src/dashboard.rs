use crate::{
    models,
    schema::library::{books, events, patrons, reading_programs, transactions},
    sql_date,
    status::{LoanStatus, PatronStatus, ProgramStatus},
    Error, Store,
};
use diesel::{dsl::count_star, prelude::*};
use diesel_async::RunQueryDsl;

impl Store {
    #[tracing::instrument(skip(self))]
    pub async fn dashboard_stats(
        &self,
        today: jiff::civil::Date,
    ) -> Result<models::DashboardStats, Error> {
        use diesel::dsl::sum;
        let mut conn = self.library_connection().await?;
        let total_titles = books::table
            .select(count_star())
            .get_result::<i64>(&mut conn)
            .await?;
        let (total_copies, available_copies) = books::table
            .select((sum(books::quantity), sum(books::available)))
            .get_result::<(Option<i64>, Option<i64>)>(&mut conn)
            .await?;
        let active_patrons = patrons::table
            .filter(patrons::status.eq(PatronStatus::Active.as_str()))
            .select(count_star())
            .get_result::<i64>(&mut conn)
            .await?;
        let loans_out = transactions::table
            .filter(transactions::status.eq_any([
                LoanStatus::CheckedOut.as_str(),
                LoanStatus::Overdue.as_str(),
            ]))
            .select(count_star())
            .get_result::<i64>(&mut conn)
            .await?;
        let overdue_loans = transactions::table
            .filter(
                transactions::status.eq(LoanStatus::Overdue.as_str()).or(transactions::status
                    .eq(LoanStatus::CheckedOut.as_str())
                    .and(transactions::due_date.lt(sql_date(today)))),
            )
            .select(count_star())
            .get_result::<i64>(&mut conn)
            .await?;
        let upcoming_events = events::table
            .filter(events::event_date.ge(sql_date(today)))
            .select(count_star())
            .get_result::<i64>(&mut conn)
            .await?;
        let active_programs = reading_programs::table
            .filter(reading_programs::status.eq(ProgramStatus::Active.as_str()))
            .select(count_star())
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(models::DashboardStats {
            total_titles,
            total_copies: total_copies.unwrap_or(0),
            available_copies: available_copies.unwrap_or(0),
            active_patrons,
            loans_out,
            overdue_loans,
            upcoming_events,
            active_programs,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn recent_loans(&self, limit: i64) -> Result<Vec<models::LoanRecord>, Error> {
        let mut conn = self.library_connection().await?;
        Ok(transactions::table
            .inner_join(books::table)
            .inner_join(patrons::table)
            .select((
                models::Transaction::as_select(),
                models::BookSummary::as_select(),
                models::PatronName::as_select(),
            ))
            .order((transactions::checkout_date.desc(), transactions::id.desc()))
            .limit(limit)
            .load::<(models::Transaction, models::BookSummary, models::PatronName)>(&mut conn)
            .await?
            .into_iter()
            .map(models::LoanRecord::from)
            .collect())
    }

    /// Open loans past their due date, longest overdue first.
    #[tracing::instrument(skip(self))]
    pub async fn overdue_loans(
        &self,
        today: jiff::civil::Date,
        limit: i64,
    ) -> Result<Vec<models::LoanRecord>, Error> {
        let mut conn = self.library_connection().await?;
        Ok(transactions::table
            .inner_join(books::table)
            .inner_join(patrons::table)
            .filter(
                transactions::status
                    .eq_any([LoanStatus::CheckedOut.as_str(), LoanStatus::Overdue.as_str()])
                    .and(transactions::due_date.lt(sql_date(today))),
            )
            .select((
                models::Transaction::as_select(),
                models::BookSummary::as_select(),
                models::PatronName::as_select(),
            ))
            .order((transactions::due_date.asc(), transactions::id.asc()))
            .limit(limit)
            .load::<(models::Transaction, models::BookSummary, models::PatronName)>(&mut conn)
            .await?
            .into_iter()
            .map(models::LoanRecord::from)
            .collect())
    }
}
