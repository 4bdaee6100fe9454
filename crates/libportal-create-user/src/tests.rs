use super::*;

#[test]
fn it_reads_positionals_and_the_password_flag() {
    let cli = Cli::try_parse_from([
        "libportal-create-user",
        "marian.paroo",
        "marian@example.org",
        "librarian",
        "--password",
        "river city",
    ])
    .expect("arguments should parse");
    assert_eq!(cli.username, "marian.paroo");
    assert_eq!(cli.email.as_str(), "marian@example.org");
    assert_eq!(cli.role, Role::Librarian);
    assert_eq!(cli.password, "river city");
}

#[test]
fn it_rejects_unknown_roles_and_bad_addresses() {
    let unknown_role = Cli::try_parse_from([
        "libportal-create-user",
        "marian",
        "marian@example.org",
        "wizard",
        "--password",
        "secret",
    ]);
    assert!(unknown_role.is_err());

    let bad_email = Cli::try_parse_from([
        "libportal-create-user",
        "marian",
        "not-an-address",
        "librarian",
        "--password",
        "secret",
    ]);
    assert!(bad_email.is_err());
}

#[test]
fn it_refuses_an_empty_password() {
    let empty = Cli::try_parse_from([
        "libportal-create-user",
        "marian",
        "marian@example.org",
        "admin",
        "--password",
        "",
    ]);
    assert!(empty.is_err());
}
