use argon2::{Argon2, PasswordHash, PasswordVerifier};
use askama::Template;
use axum::{
    extract::{FromRequestParts, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_login::{AuthSession, AuthUser, AuthnBackend, UserId};
use axum_messages::Messages;
use http::{request::Parts, StatusCode};
use libportal_db::Role;
use rs_sha512::HasherContext;
use std::hash::Hasher;

pub const LOGIN_URL: &str = "/login.php";
pub const HOME_URL: &str = "/dashboard";

#[derive(Clone, Debug)]
pub struct BackEnd {
    db: libportal_db::Store,
}

pub(crate) fn create_backend(database: libportal_db::Store) -> BackEnd {
    BackEnd { db: database }
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub role: Role,
    session_auth_hash: [u8; 64],
}

impl AuthUser for User {
    type Id = i32;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        &self.session_auth_hash
    }
}

impl TryFrom<libportal_db::models::User> for User {
    type Error = Error;

    fn try_from(
        libportal_db::models::User {
            id,
            username,
            password_hash,
            role,
            ..
        }: libportal_db::models::User,
    ) -> Result<Self, Self::Error> {
        let mut hasher = rs_sha512::Sha512Hasher::default();
        hasher.write(password_hash.as_bytes());
        let _ = hasher.finish();
        let final_result = HasherContext::finish(&mut hasher);
        Ok(Self {
            id,
            username,
            role: role.parse()?,
            session_auth_hash: final_result.into(),
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Login database error: {0}")]
    LoginDb(#[from] libportal_db::Error),
    #[error("Stored role is not valid: {0}")]
    StoredRole(#[from] libportal_db::status::UnknownValue),
    #[error("Stored password hash could not be parsed: {0}")]
    StoredPasswordUnableToParse(argon2::password_hash::Error),
    #[error("Password could not be verified: {0}")]
    PasswordUnableToVerify(argon2::password_hash::Error),
    #[error("Password verification task failed: {0}")]
    VerifyTask(#[from] tokio::task::JoinError),
}

#[derive(Clone, serde::Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
    next: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl AuthnBackend for BackEnd {
    type User = User;
    type Credentials = Credentials;
    type Error = Error;

    async fn authenticate(
        &self,
        credentials: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let Some(user) = self.db.load_user_by_username(&credentials.username).await? else {
            return Ok(None);
        };
        let password_hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || {
            let parsed_hash =
                PasswordHash::new(&password_hash).map_err(Error::StoredPasswordUnableToParse)?;
            match Argon2::default().verify_password(credentials.password.as_bytes(), &parsed_hash)
            {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(err) => Err(Error::PasswordUnableToVerify(err)),
            }
        })
        .await??;
        if verified {
            Ok(Some(user.try_into()?))
        } else {
            Ok(None)
        }
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        self.db
            .load_user_by_id(*user_id)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }
}

/// The signed-in librarian. Extracting it sends anyone else to the login page.
pub struct CurrentLibrarian(pub libportal_db::models::Librarian);

impl FromRequestParts<crate::AppState> for CurrentLibrarian {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &crate::AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_session = AuthSession::<BackEnd>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let Some(user) = auth_session.user.filter(|user| user.role == Role::Librarian) else {
            return Err(redirect_to_login(parts.uri.path()));
        };
        match state.store.librarian_by_user_id(user.id).await {
            Ok(Some(librarian)) => Ok(CurrentLibrarian(librarian)),
            Ok(None) => {
                tracing::warn!(user_id = user.id, "signed in without a librarian profile");
                Err(redirect_to_login(parts.uri.path()))
            }
            Err(err) => Err(crate::error::Error::from(err).into_response()),
        }
    }
}

fn redirect_to_login(path: &str) -> Response {
    Redirect::to(&login_url(Some(path))).into_response()
}

fn login_url(next: Option<&str>) -> String {
    match next.filter(|next| is_local_path(next)) {
        Some(next) => format!("{LOGIN_URL}?next={next}"),
        None => LOGIN_URL.to_owned(),
    }
}

/// Only same-site absolute paths are followed after login.
pub(crate) fn is_local_path(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains(['\\', '?', '&', '#', ' '])
        && next != LOGIN_URL
}

pub mod login {
    use super::*;

    #[derive(Template)]
    #[template(path = "login.html")]
    pub struct LoginTemplate {
        toasts: Vec<crate::layout::Toast>,
        next: Option<String>,
    }

    #[derive(Debug, serde::Deserialize)]
    pub struct NextUrl {
        next: Option<String>,
    }

    pub async fn get(
        messages: Messages,
        Query(NextUrl { next }): Query<NextUrl>,
    ) -> Result<Html<String>, crate::error::Error> {
        Ok(Html(
            LoginTemplate {
                toasts: crate::layout::Toast::from_messages(messages),
                next: next.filter(|next| is_local_path(next)),
            }
            .render()?,
        ))
    }

    pub async fn post(
        mut auth_session: AuthSession<BackEnd>,
        State(app_state): State<crate::AppState>,
        messages: Messages,
        Form(creds): Form<Credentials>,
    ) -> Response {
        let next = creds.next.clone().filter(|next| is_local_path(next));
        let user = match auth_session.authenticate(creds).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                messages.error("Invalid username or password");
                return Redirect::to(&login_url(next.as_deref())).into_response();
            }
            Err(err) => {
                tracing::error!("authenticating: {err:?}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        if user.role != Role::Librarian {
            tracing::info!(user_id = user.id, role = %user.role, "refused non-librarian login");
            messages.error("This portal is only available to librarians");
            return Redirect::to(LOGIN_URL).into_response();
        }
        if let Err(err) = app_state
            .store
            .provision_librarian(user.id, &user.username)
            .await
        {
            return crate::error::Error::from(err).into_response();
        }
        if let Err(err) = auth_session.login(&user).await {
            tracing::error!("storing login in session: {err:?}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        messages.success("Successfully logged in");
        Redirect::to(next.as_deref().unwrap_or(HOME_URL)).into_response()
    }
}

pub mod logout {
    use super::*;

    pub async fn get(auth_session: AuthSession<BackEnd>, messages: Messages) -> Response {
        post(auth_session, messages).await
    }

    pub async fn post(mut auth_session: AuthSession<BackEnd>, messages: Messages) -> Response {
        match auth_session.logout().await {
            Ok(_) => {
                messages.info("You have been logged out");
                Redirect::to(LOGIN_URL).into_response()
            }
            Err(err) => {
                tracing::error!("ending session: {err:?}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
