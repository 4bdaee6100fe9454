use super::*;

pub fn establish_store() -> Store {
    let config = Config::from_env().expect("LIBPORTAL_LOGIN_DATABASE_URL and LIBPORTAL_LIBRARY_DATABASE_URL must be set");
    create(&config).expect("should build the connection pools")
}

mod librarian_provisioning {
    use super::*;

    #[test]
    fn it_splits_dotted_user_names_into_first_and_last_name() {
        assert_eq!(
            librarian_name_from_username("maria.de_la-cruz"),
            ("Maria".to_owned(), "De La Cruz".to_owned())
        );
    }

    #[test]
    fn it_uses_a_placeholder_last_name_for_single_word_user_names() {
        assert_eq!(
            librarian_name_from_username("jdoe"),
            ("Jdoe".to_owned(), "Librarian".to_owned())
        );
    }

    #[test]
    fn it_keeps_odd_user_names_intact() {
        assert_eq!(
            librarian_name_from_username("__"),
            ("__".to_owned(), "Librarian".to_owned())
        );
    }

    #[test]
    fn it_derives_the_librarian_code_from_the_user_id() {
        assert_eq!(librarian_code(42), "LIB-00042");
        assert_eq!(librarian_code(123456), "LIB-123456");
    }
}

mod configuration {
    use super::*;

    #[test]
    fn it_reads_the_same_variables_as_the_server_overrides() {
        for (name, fallback) in [
            (LOGIN_DATABASE_URL_VAR, "postgres://libportal@localhost/libportal_login"),
            (LIBRARY_DATABASE_URL_VAR, "postgres://libportal@localhost/libportal_library"),
        ] {
            assert!(name.starts_with("LIBPORTAL_"), "{name}");
            if std::env::var(name).is_err() {
                std::env::set_var(name, fallback);
            }
        }
        assert!(Config::from_env().is_ok());
        assert_eq!(
            Error::MissingEnvironment(LOGIN_DATABASE_URL_VAR).to_string(),
            "environment variable LIBPORTAL_LOGIN_DATABASE_URL must be set"
        );
    }
}

mod participant_totals {
    use super::*;

    fn patron(patron_id: i32, last_name: &str) -> models::PatronName {
        models::PatronName {
            patron_id,
            first_name: "Test".to_owned(),
            last_name: last_name.to_owned(),
        }
    }

    #[test]
    fn it_sums_minutes_and_counts_distinct_titles_per_patron() {
        let logs = vec![
            (patron(1, "Ames"), "Matilda".to_owned(), 30, 20),
            (patron(2, "Brook"), "Holes".to_owned(), 45, 30),
            (patron(1, "Ames"), " matilda ".to_owned(), 20, 15),
            (patron(1, "Ames"), "The BFG".to_owned(), 15, 10),
        ];
        let progress = programs::summarize_participants(logs);
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0].patron.patron_id, 1, "most minutes first");
        assert_eq!(progress[0].minutes, 65);
        assert_eq!(progress[0].pages, 45);
        assert_eq!(progress[0].books, 2);
        assert_eq!(progress[1].minutes, 45);
        assert_eq!(progress[1].books, 1);
    }
}

/// These run against the databases named by `LIBPORTAL_LOGIN_DATABASE_URL`
/// and `LIBPORTAL_LIBRARY_DATABASE_URL` with the migrations applied.
mod live_database {
    use super::*;
    use crate::schema::library::{book_loans, books, patrons, transactions};
    use diesel_async::RunQueryDsl;

    async fn seed_loan(store: &Store, status: LoanStatus) -> (i32, i32) {
        let mut conn = store.library_connection().await.expect("library connection");
        let today = jiff::Zoned::now().date();
        let book_id = diesel::insert_into(books::table)
            .values((
                books::title.eq("The Hobbit"),
                books::author.eq("J. R. R. Tolkien"),
                books::quantity.eq(2),
                books::available.eq(1),
            ))
            .returning(books::id)
            .get_result::<i32>(&mut conn)
            .await
            .expect("should insert a book");
        let patron_id = diesel::insert_into(patrons::table)
            .values((
                patrons::first_name.eq("Bilbo"),
                patrons::last_name.eq("Baggins"),
                patrons::email.eq("bilbo@example.org"),
                patrons::membership_date.eq(sql_date(today)),
                patrons::status.eq(PatronStatus::Active.as_str()),
                patrons::max_books_allowed.eq(3),
            ))
            .returning(patrons::patron_id)
            .get_result::<i32>(&mut conn)
            .await
            .expect("should insert a patron");
        let transaction_id = diesel::insert_into(transactions::table)
            .values((
                transactions::book_id.eq(book_id),
                transactions::patron_id.eq(patron_id),
                transactions::checkout_date.eq(sql_date(today)),
                transactions::due_date.eq(sql_date(today)),
                transactions::status.eq(status.as_str()),
            ))
            .returning(transactions::id)
            .get_result::<i32>(&mut conn)
            .await
            .expect("should insert a transaction");
        diesel::insert_into(book_loans::table)
            .values((
                book_loans::book_id.eq(book_id),
                book_loans::patron_id.eq(patron_id),
                book_loans::checkout_date.eq(sql_date(today)),
                book_loans::due_date.eq(sql_date(today)),
                book_loans::status.eq(status.as_str()),
            ))
            .execute(&mut conn)
            .await
            .expect("should insert a book loan");
        (transaction_id, book_id)
    }

    async fn available_copies(store: &Store, book_id: i32) -> i32 {
        let mut conn = store.library_connection().await.expect("library connection");
        books::table
            .filter(books::id.eq(book_id))
            .select(books::available)
            .first(&mut conn)
            .await
            .expect("book should exist")
    }

    async fn book_loan_state(
        store: &Store,
        book_id: i32,
    ) -> (String, Option<jiff_diesel::Date>) {
        let mut conn = store.library_connection().await.expect("library connection");
        book_loans::table
            .filter(book_loans::book_id.eq(book_id))
            .select((book_loans::status, book_loans::return_date))
            .first(&mut conn)
            .await
            .expect("book loan should exist")
    }

    #[tokio::test]
    #[ignore = "needs a migrated Postgres database"]
    async fn it_marks_a_loan_returned_once_and_restocks_the_book() {
        let store = establish_store();
        let today = jiff::Zoned::now().date();
        let (transaction_id, book_id) = seed_loan(&store, LoanStatus::CheckedOut).await;

        let returned = store
            .mark_returned(transaction_id, today)
            .await
            .expect("first return should succeed");
        assert_eq!(returned.status, "returned");
        assert!(returned.return_date.is_some(), "return date should be set");
        assert_eq!(available_copies(&store, book_id).await, 2);
        let (loan_status, loan_returned) = book_loan_state(&store, book_id).await;
        assert_eq!(loan_status, "returned", "open book loan is closed too");
        assert_eq!(loan_returned.map(|d| d.to_jiff()), Some(today));

        let again = store.mark_returned(transaction_id, today).await;
        assert!(matches!(again, Err(Error::Skipped)), "second return is a no-op");
        assert_eq!(available_copies(&store, book_id).await, 2, "no double restock");
    }

    #[tokio::test]
    #[ignore = "needs a migrated Postgres database"]
    async fn it_reports_unknown_transactions_as_not_found() {
        let store = establish_store();
        let today = jiff::Zoned::now().date();
        let result = store.mark_returned(i32::MAX, today).await;
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[tokio::test]
    #[ignore = "needs a migrated Postgres database"]
    async fn it_deletes_an_event_and_hands_back_its_image() {
        let store = establish_store();
        let now: jiff_diesel::Timestamp = jiff::Timestamp::now().into();
        let event = store
            .add_event(models::NewEvent {
                title: "Poetry Slam".to_owned(),
                description: None,
                event_date: sql_date(jiff::civil::date(2026, 11, 20)),
                start_time: jiff::civil::time(15, 0, 0, 0).into(),
                end_time: jiff::civil::time(16, 30, 0, 0).into(),
                location: Some("Reading Room".to_owned()),
                image: Some("event_test.png".to_owned()),
                created_by: 1,
                created_at: now,
            })
            .await
            .expect("should insert the event");
        let deleted = store
            .delete_event(event.event_id)
            .await
            .expect("should delete the event");
        assert_eq!(deleted.image.as_deref(), Some("event_test.png"));
        assert!(store
            .load_event(event.event_id)
            .await
            .expect("lookup should work")
            .is_none());
    }
}
