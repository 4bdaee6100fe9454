use crate::{
    filters::{like_pattern, LoanFilter, LoanSort, SortOrder},
    models,
    paging::{Page, Paged},
    schema::library::{book_loans, books, patrons, transactions},
    sql_date,
    status::LoanStatus,
    Error, Store,
};
use diesel::prelude::*;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};

/// Transactions joined with their book and patron, narrowed by the search box
/// and status filter. Shared by the count and the page query.
macro_rules! filtered_loans {
    ($filter:expr, $today:expr, $selection:expr) => {{
        let filter: &LoanFilter = $filter;
        let today: jiff::civil::Date = $today;
        let mut query = transactions::table
            .inner_join(books::table)
            .inner_join(patrons::table)
            .select($selection)
            .into_boxed();
        if let Some(term) = filter.search.as_deref() {
            let pattern = like_pattern(term);
            query = query.filter(
                books::title
                    .ilike(pattern.clone())
                    .or(books::author.ilike(pattern.clone()))
                    .or(patrons::first_name.ilike(pattern.clone()))
                    .or(patrons::last_name.ilike(pattern)),
            );
        }
        match filter.status {
            Some(LoanStatus::Overdue) => {
                query = query.filter(
                    transactions::status
                        .eq(LoanStatus::Overdue.as_str())
                        .or(transactions::status
                            .eq(LoanStatus::CheckedOut.as_str())
                            .and(transactions::due_date.lt(sql_date(today)))),
                );
            }
            Some(LoanStatus::CheckedOut) => {
                query = query.filter(
                    transactions::status
                        .eq(LoanStatus::CheckedOut.as_str())
                        .and(transactions::due_date.ge(sql_date(today))),
                );
            }
            Some(status) => {
                query = query.filter(transactions::status.eq(status.as_str()));
            }
            None => {}
        }
        query
    }};
}

impl Store {
    #[tracing::instrument(skip(self))]
    pub async fn list_loans(
        &self,
        filter: &LoanFilter,
        page: Page,
        today: jiff::civil::Date,
    ) -> Result<Paged<models::LoanRecord>, Error> {
        let mut conn = self.library_connection().await?;
        let total_items = filtered_loans!(filter, today, diesel::dsl::count_star())
            .get_result::<i64>(&mut conn)
            .await?;
        let mut query = filtered_loans!(
            filter,
            today,
            (
                models::Transaction::as_select(),
                models::BookSummary::as_select(),
                models::PatronName::as_select(),
            )
        );
        query = match (filter.sort, filter.order) {
            (LoanSort::CheckoutDate, SortOrder::Asc) => query.order(transactions::checkout_date.asc()),
            (LoanSort::CheckoutDate, SortOrder::Desc) => query.order(transactions::checkout_date.desc()),
            (LoanSort::DueDate, SortOrder::Asc) => query.order(transactions::due_date.asc()),
            (LoanSort::DueDate, SortOrder::Desc) => query.order(transactions::due_date.desc()),
            (LoanSort::ReturnDate, SortOrder::Asc) => query.order(transactions::return_date.asc()),
            (LoanSort::ReturnDate, SortOrder::Desc) => query.order(transactions::return_date.desc()),
            (LoanSort::Status, SortOrder::Asc) => query.order(transactions::status.asc()),
            (LoanSort::Status, SortOrder::Desc) => query.order(transactions::status.desc()),
        };
        let items = query
            .then_order_by(transactions::id.desc())
            .limit(page.per_page)
            .offset(page.offset())
            .load::<(models::Transaction, models::BookSummary, models::PatronName)>(&mut conn)
            .await?
            .into_iter()
            .map(models::LoanRecord::from)
            .collect();
        Ok(Paged {
            items,
            page,
            total_items,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn loans_for_patron(
        &self,
        patron_id: i32,
        limit: i64,
    ) -> Result<Vec<models::LoanRecord>, Error> {
        let mut conn = self.library_connection().await?;
        Ok(transactions::table
            .inner_join(books::table)
            .inner_join(patrons::table)
            .filter(transactions::patron_id.eq(patron_id))
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

    /// Marks a transaction returned, puts the copy back on the shelf and closes
    /// the matching `book_loans` entry, all in one database transaction.
    ///
    /// A transaction that is already returned yields [`Error::Skipped`] and
    /// changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn mark_returned(
        &self,
        transaction_id: i32,
        today: jiff::civil::Date,
    ) -> Result<models::Transaction, Error> {
        self.library_connection()
            .await?
            .transaction(move |conn| {
                async move {
                    let returned = diesel::update(
                        transactions::table
                            .filter(transactions::id.eq(transaction_id))
                            .filter(transactions::status.ne(LoanStatus::Returned.as_str())),
                    )
                    .set((
                        transactions::status.eq(LoanStatus::Returned.as_str()),
                        transactions::return_date.eq(sql_date(today)),
                    ))
                    .returning(models::Transaction::as_returning())
                    .get_result(conn)
                    .await
                    .optional()?;
                    let Some(returned) = returned else {
                        let exists = diesel::select(diesel::dsl::exists(
                            transactions::table.filter(transactions::id.eq(transaction_id)),
                        ))
                        .get_result::<bool>(conn)
                        .await?;
                        return Err(if exists {
                            Error::Skipped
                        } else {
                            Error::NotFound
                        });
                    };
                    diesel::update(books::table.filter(books::id.eq(returned.book_id)))
                        .set(books::available.eq(books::available + 1))
                        .execute(conn)
                        .await?;
                    diesel::update(
                        book_loans::table
                            .filter(book_loans::book_id.eq(returned.book_id))
                            .filter(book_loans::patron_id.eq(returned.patron_id))
                            .filter(book_loans::return_date.is_null()),
                    )
                    .set((
                        book_loans::status.eq(LoanStatus::Returned.as_str()),
                        book_loans::return_date.eq(sql_date(today)),
                    ))
                    .execute(conn)
                    .await?;
                    Ok::<_, Error>(returned)
                }
                .scope_boxed()
            })
            .await
    }

    /// Rewrites checked out loans past their due date as overdue in both loan
    /// tables. Returns how many rows changed.
    #[tracing::instrument(skip(self))]
    pub async fn mark_overdue(&self, today: jiff::civil::Date) -> Result<usize, Error> {
        self.library_connection()
            .await?
            .transaction(move |conn| {
                async move {
                    let in_transactions = diesel::update(
                        transactions::table
                            .filter(transactions::status.eq(LoanStatus::CheckedOut.as_str()))
                            .filter(transactions::due_date.lt(sql_date(today))),
                    )
                    .set(transactions::status.eq(LoanStatus::Overdue.as_str()))
                    .execute(conn)
                    .await?;
                    let in_book_loans = diesel::update(
                        book_loans::table
                            .filter(book_loans::status.eq(LoanStatus::CheckedOut.as_str()))
                            .filter(book_loans::due_date.lt(sql_date(today))),
                    )
                    .set(book_loans::status.eq(LoanStatus::Overdue.as_str()))
                    .execute(conn)
                    .await?;
                    Ok::<_, Error>(in_transactions + in_book_loans)
                }
                .scope_boxed()
            })
            .await
    }
}
