//! Creates a login account. A librarian's profile is provisioned on first
//! sign-in.

use anyhow::Context;
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use clap::Parser;
use email_address::EmailAddress;
use libportal_db::Role;

#[derive(Debug, Parser)]
#[command(name = "libportal-create-user", version, about = "Create a library portal login")]
#[command(after_help = "The database urls are read from LIBPORTAL_LOGIN_DATABASE_URL and \
    LIBPORTAL_LIBRARY_DATABASE_URL, the same variables the web server honours.")]
struct Cli {
    username: String,

    email: EmailAddress,

    /// librarian, patron or admin
    role: Role,

    #[arg(
        long,
        env = "LIBPORTAL_NEW_USER_PASSWORD",
        hide_env_values = true,
        value_parser = clap::builder::NonEmptyStringValueParser::new()
    )]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(cli.password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("hashing password: {err}"))?
        .to_string();

    let config = libportal_db::Config::from_env().context("reading database configuration")?;
    let store = libportal_db::create(&config).context("creating database store")?;
    let user = store
        .create_user(cli.username, cli.email.to_string(), password_hash, cli.role)
        .await
        .context("creating user")?;
    println!(
        "created {} user {:?} with id {}",
        cli.role, user.username, user.id
    );
    Ok(())
}

#[cfg(test)]
mod tests;
