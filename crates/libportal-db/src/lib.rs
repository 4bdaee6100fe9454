use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{
        mobc::{Builder, Pool},
        AsyncDieselConnectionManager,
    },
    AsyncPgConnection, RunQueryDsl,
};
use itertools::Itertools;
use std::time::Duration;

mod dashboard;
mod events;
pub mod filters;
mod loans;
pub mod models;
pub mod paging;
mod patrons;
mod programs;
mod schema;
mod sql_functions;
pub mod status;
#[cfg(test)]
mod tests;

pub use filters::{EventFilter, EventTiming, LoanFilter, LoanSort, PatronFilter, ProgramFilter, SortOrder};
pub use paging::{Page, Paged};
pub use status::{LoanStatus, PatronStatus, ProgramStatus, Role};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("getting connection from pool: {0}")]
    GetConnectionPool(#[from] mobc::Error<diesel_async::pooled_connection::PoolError>),
    #[error("result failure: {0}")]
    Result(#[from] diesel::result::Error),
    #[error("invalid stored value: {0}")]
    InvalidStoredValue(#[from] status::UnknownValue),
    #[error("environment variable {0} must be set")]
    MissingEnvironment(&'static str),
    #[error("Other General: {0}")]
    OtherGeneral(String),
    #[error("Skipped")]
    Skipped,
    #[error("Not Found")]
    NotFound,
}

type PooledConnection = mobc::Connection<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Access to both logical databases: `login` holds the accounts, `library` everything else.
#[derive(Clone, Debug)]
pub struct Store {
    login: Pool<AsyncPgConnection>,
    library: Pool<AsyncPgConnection>,
}

/// Shared by the web server's config overrides and the command line tools.
pub const LOGIN_DATABASE_URL_VAR: &str = "LIBPORTAL_LOGIN_DATABASE_URL";
pub const LIBRARY_DATABASE_URL_VAR: &str = "LIBPORTAL_LIBRARY_DATABASE_URL";

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub login: PoolConfig,
    pub library: PoolConfig,
}

impl Config {
    /// Reads [`LOGIN_DATABASE_URL_VAR`] and [`LIBRARY_DATABASE_URL_VAR`], loading `.env` first.
    pub fn from_env() -> Result<Self, Error> {
        dotenvy::dotenv().ok();
        let login = std::env::var(LOGIN_DATABASE_URL_VAR)
            .map_err(|_| Error::MissingEnvironment(LOGIN_DATABASE_URL_VAR))?;
        let library = std::env::var(LIBRARY_DATABASE_URL_VAR)
            .map_err(|_| Error::MissingEnvironment(LIBRARY_DATABASE_URL_VAR))?;
        Ok(Self {
            login: PoolConfig::with_url(login),
            library: PoolConfig::with_url(library),
        })
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PoolConfig {
    db_url: String,
    max_open: u64,
    max_idle: u64,
    #[serde(with = "humantime_serde", default)]
    max_lifetime: Option<Duration>,
    #[serde(with = "humantime_serde", default)]
    max_idle_lifetime: Option<Duration>,
    #[serde(with = "humantime_serde")]
    timeout_for_get: Duration,
}

impl PoolConfig {
    pub fn with_url(db_url: String) -> Self {
        Self {
            db_url,
            max_open: 10,
            max_idle: 2,
            max_lifetime: None,
            max_idle_lifetime: None,
            timeout_for_get: Duration::from_secs(5),
        }
    }

    pub fn set_db_url(&mut self, db_url: String) {
        self.db_url = db_url;
    }
}

/// Builds the pools. Connections are opened on first use.
pub fn create(config: &Config) -> Result<Store, Error> {
    Ok(Store {
        login: create_pool(&config.login),
        library: create_pool(&config.library),
    })
}

fn create_pool(config: &PoolConfig) -> Pool<AsyncPgConnection> {
    let builder = Builder::new()
        .max_open(config.max_open)
        .max_idle(config.max_idle)
        .max_lifetime(
            config
                .max_lifetime
                .map(|v| v.max(Duration::from_secs(3600))),
        )
        .max_idle_lifetime(
            config
                .max_idle_lifetime
                .map(|v| v.max(Duration::from_secs(900))),
        )
        .get_timeout(Some(config.timeout_for_get.max(Duration::from_secs(5))));
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.db_url);
    builder.build(manager)
}

/// Splits a login name such as `maria.de_la-cruz` into a first and last name.
pub fn librarian_name_from_username(username: &str) -> (String, String) {
    let mut parts = username
        .split(|c: char| c == '.' || c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(capitalize);
    let first_name = parts.next().unwrap_or_else(|| username.to_owned());
    let last_name = parts.join(" ");
    if last_name.is_empty() {
        (first_name, "Librarian".to_owned())
    } else {
        (first_name, last_name)
    }
}

pub fn librarian_code(user_id: i32) -> String {
    format!("LIB-{user_id:05}")
}

pub(crate) fn sql_date(date: jiff::civil::Date) -> jiff_diesel::Date {
    date.into()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Store {
    async fn login_connection(&self) -> Result<PooledConnection, Error> {
        self.login.get().await.map_err(Into::into)
    }

    async fn library_connection(&self) -> Result<PooledConnection, Error> {
        self.library.get().await.map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_user_by_username(&self, name: &str) -> Result<Option<models::User>, Error> {
        use schema::login::users::dsl::*;
        use sql_functions::lower;
        let mut conn = self.login_connection().await?;
        users
            .filter(lower(username).eq(lower(name)))
            .select(models::User::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_user_by_id(&self, user_id: i32) -> Result<Option<models::User>, Error> {
        use schema::login::users::dsl::*;
        let mut conn = self.login_connection().await?;
        users
            .filter(id.eq(user_id))
            .select(models::User::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, password_hash))]
    pub async fn create_user(
        &self,
        username: String,
        email: String,
        password_hash: String,
        role: Role,
    ) -> Result<models::User, Error> {
        use schema::login::users;
        let new_user = models::NewUser {
            username,
            email,
            password_hash,
            role: role.as_str().to_owned(),
            created_at: jiff::Timestamp::now().into(),
        };
        let mut conn = self.login_connection().await?;
        diesel::insert_into(users::table)
            .values(new_user)
            .returning(models::User::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn librarian_by_user_id(
        &self,
        user_id: i32,
    ) -> Result<Option<models::Librarian>, Error> {
        use schema::library::librarians;
        let mut conn = self.library_connection().await?;
        librarians::table
            .filter(librarians::user_id.eq(user_id))
            .select(models::Librarian::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    /// Returns the librarian profile of `user_id`, creating it from the login
    /// name when this is the first sign-in.
    #[tracing::instrument(skip(self))]
    pub async fn provision_librarian(
        &self,
        user_id: i32,
        username: &str,
    ) -> Result<models::Librarian, Error> {
        use schema::library::librarians;
        let (first_name, last_name) = librarian_name_from_username(username);
        let now: jiff_diesel::Timestamp = jiff::Timestamp::now().into();
        let new_librarian = models::NewLibrarian {
            user_id,
            librarian_id: librarian_code(user_id),
            first_name,
            last_name,
            contact_number: None,
            created_at: now,
            updated_at: now,
        };
        let mut conn = self.library_connection().await?;
        let inserted = diesel::insert_into(librarians::table)
            .values(new_librarian)
            .on_conflict(librarians::user_id)
            .do_nothing()
            .execute(&mut conn)
            .await?;
        if inserted > 0 {
            tracing::info!(user_id, "provisioned librarian profile");
        }
        librarians::table
            .filter(librarians::user_id.eq(user_id))
            .select(models::Librarian::as_select())
            .first(&mut conn)
            .await
            .map_err(Into::into)
    }
}
