use super::*;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use std::collections::HashMap;
use tower::ServiceExt;

const SAMPLE_CONFIG: &str = r#"
bind-address = "127.0.0.1"
bind-port = 3000

[database.login]
db-url = "postgres://libportal@localhost/libportal_login"
max-open = 4
max-idle = 1
timeout-for-get = "5s"

[database.library]
db-url = "postgres://libportal@localhost/libportal_library"
max-open = 4
max-idle = 1
max-lifetime = "2h"
timeout-for-get = "5s"

[pages]
per-page = 15

[uploads]
directory = "./uploads"
url-prefix = "/uploads/"
max-bytes = 1024

[jobs.overdue-sweep]
run = false
sleep = "1h"
error-sleep = "5m"

[tracing]
console = false
"#;

fn fields(pairs: &[(&str, &str)]) -> forms::FormFields {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<HashMap<_, _>>()
        .into()
}

fn upload_dir(directory: &std::path::Path, max_bytes: usize) -> uploads::UploadDir {
    uploads::UploadDir::new(&uploads::Config {
        directory: directory.to_path_buf(),
        url_prefix: "/uploads".to_owned(),
        max_bytes,
    })
}

mod configuration {
    use super::*;

    #[test]
    fn it_parses_the_sample_configuration() {
        let config = config::parse(SAMPLE_CONFIG).expect("sample configuration should parse");
        assert_eq!(config.bind_port, 3000);
        assert_eq!(config.pages.per_page, 15);
        assert_eq!(config.uploads.max_bytes, 1024);
        assert!(config.session.secure_cookie, "secure cookies by default");
        assert!(!config.jobs.overdue_sweep.run);
        assert_eq!(
            config.jobs.overdue_sweep.error_sleep,
            std::time::Duration::from_secs(300)
        );
    }

    #[test]
    fn it_defaults_the_page_size() {
        let without_pages = SAMPLE_CONFIG.replace("[pages]\nper-page = 15\n", "");
        let config = config::parse(&without_pages).expect("pages section is optional");
        assert_eq!(config.pages.per_page, 15);
    }
}

mod router {
    use super::*;
    use axum_login::{
        tower_sessions::{MemoryStore, SessionManagerLayer},
        AuthManagerLayerBuilder,
    };

    /// The pools connect lazily, so no database is touched by these requests.
    fn test_app(directory: &std::path::Path) -> axum::Router {
        let config = config::parse(SAMPLE_CONFIG).expect("sample configuration should parse");
        let store = libportal_db::create(&config.database).expect("pools should build");
        let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
        let auth_layer =
            AuthManagerLayerBuilder::new(login::create_backend(store.clone()), session_layer)
                .build();
        let app_state = AppState {
            store,
            uploads: Arc::new(upload_dir(directory, config.uploads.max_bytes)),
            per_page: config.pages.per_page,
        };
        routes::setup(app_state, auth_layer)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request should build")
    }

    #[tokio::test]
    async fn librarian_pages_redirect_anonymous_visitors_to_login() {
        let directory = tempfile::tempdir().expect("temp dir");
        for page in [
            "/dashboard",
            "/patrons",
            "/borrowing-history",
            "/events",
            "/reading-programs",
        ] {
            let response = test_app(directory.path())
                .oneshot(get(page))
                .await
                .expect("router should answer");
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{page}");
            assert_eq!(
                response.headers()[header::LOCATION],
                format!("/login.php?next={page}"),
                "{page}"
            );
        }
    }

    #[tokio::test]
    async fn anonymous_mutations_are_redirected_too() {
        let directory = tempfile::tempdir().expect("temp dir");
        let request = Request::builder()
            .method("POST")
            .uri("/borrowing-history")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Body::from("ajax_return=1&transaction_id=7"))
            .expect("request should build");
        let response = test_app(directory.path())
            .oneshot(request)
            .await
            .expect("router should answer");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/login.php?next=/borrowing-history"
        );
    }

    #[tokio::test]
    async fn root_goes_to_the_dashboard() {
        let directory = tempfile::tempdir().expect("temp dir");
        let response = test_app(directory.path())
            .oneshot(get("/"))
            .await
            .expect("router should answer");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/dashboard");
    }

    #[tokio::test]
    async fn login_page_renders_the_form() {
        let directory = tempfile::tempdir().expect("temp dir");
        let response = test_app(directory.path())
            .oneshot(get("/login.php?next=/events"))
            .await
            .expect("router should answer");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let html = String::from_utf8(body.to_vec()).expect("utf8 body");
        assert!(html.contains("name=\"username\""));
        assert!(html.contains("name=\"password\""));
        assert!(html.contains("name=\"next\""), "keeps the next page");
    }

    #[tokio::test]
    async fn login_page_drops_foreign_next_urls() {
        let directory = tempfile::tempdir().expect("temp dir");
        let response = test_app(directory.path())
            .oneshot(get("/login.php?next=//evil.example.org"))
            .await
            .expect("router should answer");
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let html = String::from_utf8(body.to_vec()).expect("utf8 body");
        assert!(!html.contains("evil.example.org"));
    }

    #[tokio::test]
    async fn uploaded_images_are_served() {
        let directory = tempfile::tempdir().expect("temp dir");
        std::fs::write(directory.path().join("event_test.png"), b"png bytes").expect("write");
        let response = test_app(directory.path())
            .oneshot(get("/uploads/event_test.png"))
            .await
            .expect("router should answer");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let directory = tempfile::tempdir().expect("temp dir");
        let response = test_app(directory.path())
            .oneshot(get("/admin.php"))
            .await
            .expect("router should answer");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod event_form {
    use super::*;
    use crate::{events::EventDetails, forms::ValidationError};

    const COMPLETE: &[(&str, &str)] = &[
        ("add_event", "1"),
        ("title", "Poetry Slam"),
        ("event_date", "2026-11-20"),
        ("start_time", "15:00"),
        ("end_time", "16:30"),
        ("location", "  "),
    ];

    #[test]
    fn it_accepts_a_complete_form() {
        let details = EventDetails::parse(&fields(COMPLETE)).expect("form is complete");
        assert_eq!(details.title, "Poetry Slam");
        assert_eq!(details.event_date, jiff::civil::date(2026, 11, 20));
        assert_eq!(details.start_time, jiff::civil::time(15, 0, 0, 0));
        assert_eq!(details.location, None, "blank optional fields are absent");
    }

    #[test]
    fn it_names_each_missing_required_field() {
        for missing in ["title", "event_date", "start_time", "end_time"] {
            let pairs = COMPLETE
                .iter()
                .copied()
                .filter(|(key, _)| *key != missing)
                .collect::<Vec<_>>();
            assert_eq!(
                EventDetails::parse(&fields(&pairs)),
                Err(ValidationError::Missing(missing)),
            );
        }
    }

    #[test]
    fn it_reports_missing_fields_as_a_failed_outcome() {
        let outcome = respond::Outcome::from(
            EventDetails::parse(&fields(&[("add_event", "1")])).unwrap_err(),
        );
        let envelope = serde_json::to_value(outcome.envelope()).expect("serializable");
        assert_eq!(
            envelope,
            serde_json::json!({ "success": false, "message": "title is required" })
        );
    }

    #[test]
    fn it_requires_the_end_after_the_start() {
        let mut pairs = COMPLETE.to_vec();
        pairs.retain(|(key, _)| *key != "end_time");
        pairs.push(("end_time", "15:00"));
        assert!(matches!(
            EventDetails::parse(&fields(&pairs)),
            Err(ValidationError::Invalid { field: "end_time", .. })
        ));
    }

    #[test]
    fn it_rejects_malformed_dates() {
        let mut pairs = COMPLETE.to_vec();
        pairs.retain(|(key, _)| *key != "event_date");
        pairs.push(("event_date", "next tuesday"));
        let err = EventDetails::parse(&fields(&pairs)).unwrap_err();
        assert_eq!(err.to_string(), "event date must be a date like 2026-10-16");
    }
}

mod patron_form {
    use super::*;
    use crate::patrons::new_patron;

    #[test]
    fn it_fills_in_membership_defaults() {
        let today = jiff::civil::date(2026, 10, 16);
        let patron = new_patron(
            &fields(&[
                ("first_name", "Ada"),
                ("last_name", "Lovelace"),
                ("email", "ada@example.org"),
            ]),
            today,
        )
        .expect("valid patron");
        assert_eq!(patron.max_books_allowed, 3);
        assert_eq!(patron.status, "active");
        assert_eq!(patron.membership_date.to_jiff(), today);
        assert_eq!(
            patron.membership_expiry.map(|d| d.to_jiff()),
            Some(jiff::civil::date(2027, 10, 16))
        );
    }

    #[test]
    fn it_rejects_invalid_email_and_limits() {
        let today = jiff::civil::date(2026, 10, 16);
        let bad_email = fields(&[
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("email", "not-an-address"),
        ]);
        assert!(new_patron(&bad_email, today).is_err());
        let too_many = fields(&[
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("email", "ada@example.org"),
            ("max_books_allowed", "21"),
        ]);
        assert!(new_patron(&too_many, today).is_err());
    }
}

mod program_forms {
    use super::*;
    use crate::programs::{new_reading_log, percent_of, ProgramDetails};
    use libportal_db::ProgramStatus;

    #[test]
    fn blank_status_follows_the_dates() {
        let today = jiff::civil::date(2026, 10, 16);
        let details = ProgramDetails::parse(
            &fields(&[
                ("title", "Winter Reading"),
                ("start_date", "2026-12-01"),
                ("end_date", "2027-02-28"),
                ("status", ""),
            ]),
            today,
        )
        .expect("valid program");
        assert_eq!(details.status, ProgramStatus::Upcoming);
        assert_eq!(details.target_minutes, 0);
    }

    #[test]
    fn end_date_may_not_precede_start_date() {
        let today = jiff::civil::date(2026, 10, 16);
        let result = ProgramDetails::parse(
            &fields(&[
                ("title", "Backwards"),
                ("start_date", "2026-12-01"),
                ("end_date", "2026-11-01"),
            ]),
            today,
        );
        assert!(result.is_err());
    }

    #[test]
    fn reading_logs_need_positive_minutes() {
        let today = jiff::civil::date(2026, 10, 16);
        let base = [
            ("program_id", "1"),
            ("patron_id", "2"),
            ("book_title", "Matilda"),
        ];
        let mut zero = base.to_vec();
        zero.push(("minutes_read", "0"));
        assert!(new_reading_log(&fields(&zero), today).is_err());

        let mut thirty = base.to_vec();
        thirty.push(("minutes_read", "30"));
        let log = new_reading_log(&fields(&thirty), today).expect("valid log");
        assert_eq!(log.pages_read, 0);
        assert_eq!(log.log_date.to_jiff(), today);
        assert_eq!(log.book_id, None);
    }

    #[test]
    fn progress_is_capped_at_the_target() {
        assert_eq!(percent_of(30, 120), 25);
        assert_eq!(percent_of(300, 120), 100);
        assert_eq!(percent_of(5, 0), 100);
    }
}

mod formatting {
    use super::*;
    use jiff::{civil::date, Timestamp, ToSpan};

    #[test]
    fn relative_days_read_naturally() {
        let today = date(2026, 10, 16);
        assert_eq!(format::relative_day(today, today), "today");
        assert_eq!(format::relative_day(date(2026, 10, 15), today), "yesterday");
        assert_eq!(format::relative_day(date(2026, 10, 13), today), "3 days ago");
        assert_eq!(format::relative_day(date(2026, 10, 18), today), "in 2 days");
    }

    #[test]
    fn time_ago_picks_the_largest_unit() {
        let now: Timestamp = "2026-10-16T12:00:00Z".parse().expect("timestamp");
        let ago = |span: jiff::Span| format::time_ago(now.checked_sub(span).expect("in range"), now);
        assert_eq!(ago(10.seconds()), "just now");
        assert_eq!(ago(1.minute()), "1 minute ago");
        assert_eq!(ago(5.hours()), "5 hours ago");
        assert_eq!(ago(72.hours()), "3 days ago");
        assert_eq!(ago((24 * 45).hours()), "Sep 1, 2026");
    }

    #[test]
    fn days_overdue_is_never_negative() {
        let today = date(2026, 10, 16);
        assert_eq!(format::days_overdue(date(2026, 10, 6), today), 10);
        assert_eq!(format::days_overdue(date(2026, 10, 20), today), 0);
    }

    #[test]
    fn dates_and_times_are_human_readable() {
        assert_eq!(format::date(date(2026, 10, 6)), "Oct 6, 2026");
        assert_eq!(format::time(jiff::civil::time(15, 5, 0, 0)), "3:05 PM");
        assert_eq!(format::initials("ada", "Lovelace"), "AL");
    }
}

mod upload_storage {
    use super::*;

    fn image(file_name: &str, size: usize) -> uploads::UploadedFile {
        uploads::UploadedFile {
            file_name: file_name.to_owned(),
            bytes: vec![7; size],
        }
    }

    #[tokio::test]
    async fn it_stores_images_under_generated_names() {
        let directory = tempfile::tempdir().expect("temp dir");
        let uploads = upload_dir(directory.path(), 1024);
        let stored = uploads
            .save("event", &image("Poster.PNG", 100))
            .await
            .expect("image should be stored");
        assert!(stored.starts_with("event_"));
        assert!(stored.ends_with(".png"));
        assert!(directory.path().join(&stored).exists());
        assert_eq!(uploads.url_for(&stored), format!("/uploads/{stored}"));

        assert!(uploads.remove(&stored).await.expect("removal should work"));
        assert!(!directory.path().join(&stored).exists());
        assert!(!uploads.remove(&stored).await.expect("gone already is fine"));
    }

    #[tokio::test]
    async fn it_rejects_other_types_and_oversized_files() {
        let directory = tempfile::tempdir().expect("temp dir");
        let uploads = upload_dir(directory.path(), 1024);
        let wrong_type = uploads.save("event", &image("script.php", 10)).await;
        assert!(matches!(wrong_type, Err(uploads::Error::UnsupportedType(_))));
        let too_big = uploads.save("event", &image("huge.jpg", 2048)).await;
        assert!(matches!(too_big, Err(uploads::Error::TooLarge { .. })));
        assert!(too_big.is_err_and(|err| err.is_rejection()));
        assert_eq!(
            std::fs::read_dir(directory.path()).expect("list").count(),
            0,
            "nothing was written"
        );
    }

    #[tokio::test]
    async fn it_refuses_to_remove_outside_the_upload_directory() {
        let directory = tempfile::tempdir().expect("temp dir");
        let uploads = upload_dir(&directory.path().join("nested"), 1024);
        for name in ["../secret.png", "/etc/passwd", "..", ""] {
            assert!(
                matches!(uploads.remove(name).await, Err(uploads::Error::InvalidName(_))),
                "{name:?}"
            );
        }
    }
}

mod requests {
    use super::*;
    use crate::layout::ListQuery;
    use http::HeaderMap;

    #[test]
    fn ajax_is_detected_from_either_header() {
        let mut headers = HeaderMap::new();
        assert!(!respond::wants_json(&headers));
        headers.insert("x-requested-with", "XMLHttpRequest".parse().expect("header"));
        assert!(respond::wants_json(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            "application/json, text/plain".parse().expect("header"),
        );
        assert!(respond::wants_json(&headers));
    }

    #[test]
    fn page_links_keep_the_filters() {
        let query = ListQuery {
            search: Some("Roald Dahl".to_owned()),
            status: Some("overdue".to_owned()),
            page: Some("2".to_owned()),
            action: Some("view".to_owned()),
            id: Some("9".to_owned()),
            ..ListQuery::default()
        };
        assert_eq!(
            query.href("/borrowing-history", 3),
            "/borrowing-history?search=Roald+Dahl&status=overdue&page=3"
        );
    }

    #[test]
    fn sort_links_flip_the_order_of_the_current_column() {
        let query = ListQuery {
            sort: Some("due_date".to_owned()),
            order: Some("desc".to_owned()),
            page: Some("4".to_owned()),
            ..ListQuery::default()
        };
        assert_eq!(
            query.sort_href("/borrowing-history", "due_date"),
            "/borrowing-history?sort=due_date&order=asc"
        );
        assert_eq!(
            query.sort_href("/borrowing-history", "status"),
            "/borrowing-history?sort=status&order=desc"
        );
    }

    #[test]
    fn malformed_page_numbers_fall_back_to_the_first_page() {
        let query = ListQuery {
            page: Some("abc".to_owned()),
            ..ListQuery::default()
        };
        assert_eq!(query.page(15).number, 1);
        assert_eq!(query.viewed_id(), None);
    }

    #[test]
    fn unknown_sort_columns_fall_back_to_checkout_date() {
        let query = ListQuery {
            sort: Some("password_hash".to_owned()),
            ..ListQuery::default()
        };
        let filter = loans::loan_filter(&query);
        assert_eq!(filter.sort, libportal_db::LoanSort::CheckoutDate);
        assert_eq!(filter.order, libportal_db::SortOrder::Desc);
    }

    #[test]
    fn only_local_paths_are_followed_after_login() {
        assert!(login::is_local_path("/events"));
        assert!(!login::is_local_path("//evil.example.org"));
        assert!(!login::is_local_path("https://evil.example.org"));
        assert!(!login::is_local_path("/login.php"));
    }
}

mod event_submissions {
    use super::*;
    use axum::{
        extract::{DefaultBodyLimit, Multipart},
        response::IntoResponse,
        routing::post,
        Json,
    };

    const BOUNDARY: &str = "libportal-boundary";
    const MAX_IMAGE_BYTES: usize = 1024;

    fn submission_app(body_limit: usize) -> axum::Router {
        axum::Router::new()
            .route(
                "/events",
                post(|multipart: Multipart| async move {
                    match events::read_submission(multipart, MAX_IMAGE_BYTES).await {
                        Ok(Ok((fields, image))) => Json(serde_json::json!({
                            "success": true,
                            "title": fields.text("title"),
                            "image_bytes": image.map(|image| image.bytes.len()),
                        }))
                        .into_response(),
                        Ok(Err(outcome)) => Json(outcome.envelope()).into_response(),
                        Err(err) => err.into_json_response(),
                    }
                }),
            )
            .layer(DefaultBodyLimit::max(body_limit))
    }

    fn event_form(image_size: usize) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             Poetry Slam\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"image\"; filename=\"poster.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend(std::iter::repeat(b'x').take(image_size));
        body.extend(format!("\r\n--{BOUNDARY}--\r\n").into_bytes());
        Request::builder()
            .method("POST")
            .uri("/events")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Body::from(body))
            .expect("request should build")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn it_reads_fields_and_the_image() {
        let response = submission_app(64 * 1024)
            .oneshot(event_form(300))
            .await
            .expect("router should answer");
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["title"], "Poetry Slam");
        assert_eq!(json["image_bytes"], 300);
    }

    #[tokio::test]
    async fn an_oversized_body_is_a_failed_outcome_not_a_server_error() {
        let response = submission_app(2048)
            .oneshot(event_form(16 * 1024))
            .await
            .expect("router should answer");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({
                "success": false,
                "message": "The image is too large, the limit is 1 KB",
            })
        );
    }
}

mod event_deletion {
    use super::*;
    use libportal_db::models;

    fn event_with_image(image: Option<String>) -> models::Event {
        models::Event {
            event_id: 7,
            title: "Poetry Slam".to_owned(),
            description: None,
            event_date: jiff::civil::date(2026, 11, 20).into(),
            start_time: jiff::civil::time(15, 0, 0, 0).into(),
            end_time: jiff::civil::time(16, 30, 0, 0).into(),
            location: None,
            image,
            created_by: 1,
            created_at: jiff::Timestamp::now().into(),
        }
    }

    #[tokio::test]
    async fn deleting_an_event_removes_its_image_file() {
        let directory = tempfile::tempdir().expect("temp dir");
        let uploads = upload_dir(directory.path(), 1024);
        let stored = uploads
            .save(
                "event",
                &uploads::UploadedFile {
                    file_name: "poster.png".to_owned(),
                    bytes: vec![1; 64],
                },
            )
            .await
            .expect("image should be stored");
        assert!(directory.path().join(&stored).exists());

        let deleted = Ok(event_with_image(Some(stored.clone())));
        let outcome = events::after_delete(&uploads, 7, deleted)
            .await
            .expect("deletion should succeed");
        assert_eq!(
            outcome,
            respond::Outcome::Success("Event \"Poetry Slam\" has been deleted".to_owned())
        );
        assert!(!directory.path().join(&stored).exists(), "image file is gone");
    }

    #[tokio::test]
    async fn a_missing_event_is_reported_and_leaves_files_alone() {
        let directory = tempfile::tempdir().expect("temp dir");
        std::fs::write(directory.path().join("event_other.png"), b"png").expect("write");
        let uploads = upload_dir(directory.path(), 1024);
        let outcome = events::after_delete(&uploads, 7, Err(libportal_db::Error::NotFound))
            .await
            .expect("not found is not a server error");
        assert_eq!(outcome, respond::Outcome::Failure("Event not found".to_owned()));
        assert!(directory.path().join("event_other.png").exists());
    }
}

mod page_bounds {
    use super::*;
    use crate::layout::{ListQuery, Pager};
    use libportal_db::{paging::MAX_PAGE, Paged};

    #[test]
    fn an_enormous_page_number_is_capped() {
        let query = ListQuery {
            page: Some(i64::MAX.to_string()),
            ..ListQuery::default()
        };
        let page = query.page(15);
        assert_eq!(page.number, MAX_PAGE);
        assert!(page.offset() > 0);

        let paged = Paged {
            items: Vec::<()>::new(),
            page,
            total_items: 47,
        };
        let pager = Pager::new(&paged, &query, "/borrowing-history");
        assert!(pager.next.is_none());
        assert_eq!(
            pager.previous.as_deref(),
            Some(format!("/borrowing-history?page={}", MAX_PAGE - 1).as_str())
        );
    }
}
