use crate::{
    filters::{like_pattern, PatronFilter},
    models,
    paging::{Page, Paged},
    schema::library::patrons,
    status::PatronStatus,
    Error, Store,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

macro_rules! filtered_patrons {
    ($filter:expr, $selection:expr) => {{
        let filter: &PatronFilter = $filter;
        let mut query = patrons::table.select($selection).into_boxed();
        if let Some(term) = filter.search.as_deref() {
            let pattern = like_pattern(term);
            query = query.filter(
                patrons::first_name
                    .ilike(pattern.clone())
                    .or(patrons::last_name.ilike(pattern.clone()))
                    .or(patrons::email.ilike(pattern)),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(patrons::status.eq(status.as_str()));
        }
        query
    }};
}

impl Store {
    #[tracing::instrument(skip(self))]
    pub async fn list_patrons(
        &self,
        filter: &PatronFilter,
        page: Page,
    ) -> Result<Paged<models::Patron>, Error> {
        let mut conn = self.library_connection().await?;
        let total_items = filtered_patrons!(filter, diesel::dsl::count_star())
            .get_result::<i64>(&mut conn)
            .await?;
        let items = filtered_patrons!(filter, models::Patron::as_select())
            .order((patrons::last_name.asc(), patrons::first_name.asc()))
            .then_order_by(patrons::patron_id.asc())
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
    pub async fn load_patron(&self, patron_id: i32) -> Result<Option<models::Patron>, Error> {
        let mut conn = self.library_connection().await?;
        patrons::table
            .filter(patrons::patron_id.eq(patron_id))
            .select(models::Patron::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    /// Active patrons, for the picker of the reading log form.
    #[tracing::instrument(skip(self))]
    pub async fn list_active_patron_names(&self) -> Result<Vec<models::PatronName>, Error> {
        let mut conn = self.library_connection().await?;
        patrons::table
            .filter(patrons::status.eq(PatronStatus::Active.as_str()))
            .select(models::PatronName::as_select())
            .order((patrons::last_name.asc(), patrons::first_name.asc()))
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, new_patron), fields(email = %new_patron.email))]
    pub async fn add_patron(&self, new_patron: models::NewPatron) -> Result<models::Patron, Error> {
        let mut conn = self.library_connection().await?;
        diesel::insert_into(patrons::table)
            .values(new_patron)
            .returning(models::Patron::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_patron_status(
        &self,
        patron_id: i32,
        status: PatronStatus,
    ) -> Result<(), Error> {
        let mut conn = self.library_connection().await?;
        match diesel::update(patrons::table.filter(patrons::patron_id.eq(patron_id)))
            .set(patrons::status.eq(status.as_str()))
            .execute(&mut conn)
            .await
        {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
