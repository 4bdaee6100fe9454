//! Values every page hands to `base.html`.

use crate::{error::Error, format, AppState};
use axum_messages::{Level, Messages};
use libportal_db::{models, Paged};

const NOTIFICATION_LIMIT: i64 = 5;
const PAGER_RADIUS: i64 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nav {
    Dashboard,
    Patrons,
    BorrowingHistory,
    Events,
    ReadingPrograms,
}

impl Nav {
    const ALL: &'static [Nav] = &[
        Nav::Dashboard,
        Nav::Patrons,
        Nav::BorrowingHistory,
        Nav::Events,
        Nav::ReadingPrograms,
    ];

    pub fn href(&self) -> &'static str {
        match self {
            Nav::Dashboard => "/dashboard",
            Nav::Patrons => "/patrons",
            Nav::BorrowingHistory => "/borrowing-history",
            Nav::Events => "/events",
            Nav::ReadingPrograms => "/reading-programs",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Nav::Dashboard => "Dashboard",
            Nav::Patrons => "Patrons",
            Nav::BorrowingHistory => "Borrowing History",
            Nav::Events => "Events",
            Nav::ReadingPrograms => "Reading Programs",
        }
    }
}

pub struct NavItem {
    pub href: &'static str,
    pub label: &'static str,
    pub active: bool,
}

pub struct Toast {
    pub kind: &'static str,
    pub text: String,
}

impl Toast {
    pub fn from_messages(messages: Messages) -> Vec<Toast> {
        messages
            .into_iter()
            .map(|message| Toast {
                kind: match message.level {
                    Level::Debug | Level::Info => "info",
                    Level::Success => "success",
                    Level::Warning => "warning",
                    Level::Error => "error",
                },
                text: message.message,
            })
            .collect()
    }
}

pub struct Notification {
    pub text: String,
    pub detail: String,
    pub href: String,
}

impl Notification {
    fn overdue(loan: &models::LoanRecord, today: jiff::civil::Date) -> Self {
        let days = format::days_overdue(loan.transaction.due_date.to_jiff(), today);
        Self {
            text: format!("\"{}\" is overdue", loan.book.title),
            detail: format!(
                "{} - {} day{} late",
                loan.patron.full_name(),
                days,
                if days == 1 { "" } else { "s" }
            ),
            href: "/borrowing-history?status=overdue".to_owned(),
        }
    }
}

pub struct Layout {
    pub title: String,
    pub active: Nav,
    pub librarian_name: String,
    pub librarian_code: String,
    pub initials: String,
    pub toasts: Vec<Toast>,
    pub notifications: Vec<Notification>,
}

impl Layout {
    pub async fn build(
        app_state: &AppState,
        librarian: &models::Librarian,
        messages: Messages,
        active: Nav,
        title: impl Into<String>,
    ) -> Result<Self, Error> {
        let today = format::today();
        let notifications = app_state
            .store
            .overdue_loans(today, NOTIFICATION_LIMIT)
            .await?
            .iter()
            .map(|loan| Notification::overdue(loan, today))
            .collect();
        Ok(Self {
            title: title.into(),
            active,
            librarian_name: librarian.full_name(),
            librarian_code: librarian.librarian_id.clone(),
            initials: format::initials(&librarian.first_name, &librarian.last_name),
            toasts: Toast::from_messages(messages),
            notifications,
        })
    }

    pub fn nav_items(&self) -> Vec<NavItem> {
        Nav::ALL
            .iter()
            .map(|nav| NavItem {
                href: nav.href(),
                label: nav.label(),
                active: *nav == self.active,
            })
            .collect()
    }
}

pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

pub fn select_options(
    choices: impl IntoIterator<Item = (&'static str, &'static str)>,
    selected: Option<&str>,
) -> Vec<SelectOption> {
    choices
        .into_iter()
        .map(|(value, label)| SelectOption {
            value,
            label,
            selected: selected == Some(value),
        })
        .collect()
}

/// Query string of the list pages.
///
/// Numbers stay strings so a malformed `page` falls back to the first page
/// instead of rejecting the request.
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "is_blank")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub page: Option<String>,
    #[serde(skip_serializing)]
    pub action: Option<String>,
    #[serde(skip_serializing)]
    pub id: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    !value
        .as_deref()
        .is_some_and(|value| !value.trim().is_empty())
}

impl ListQuery {
    pub fn page(&self, per_page: i64) -> libportal_db::Page {
        libportal_db::Page::new(
            self.page.as_deref().and_then(|page| page.trim().parse().ok()),
            per_page,
        )
    }

    pub fn search(&self) -> Option<String> {
        libportal_db::filters::search_term(self.search.as_deref())
    }

    pub fn search_value(&self) -> &str {
        self.search.as_deref().map(str::trim).unwrap_or_default()
    }

    pub fn status_value(&self) -> Option<&str> {
        self.status.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// The record id of `?action=view&id=N`.
    pub fn viewed_id(&self) -> Option<i32> {
        match self.action.as_deref() {
            Some("view") => self.id.as_deref().and_then(|id| id.trim().parse().ok()),
            _ => None,
        }
    }

    pub fn href(&self, path: &str, page: i64) -> String {
        let query = ListQuery {
            page: Some(page.to_string()),
            ..self.clone()
        };
        with_query(path, &query)
    }

    /// Link of a sortable column header: first click sorts descending, the
    /// next click on the same column flips the order.
    pub fn sort_href(&self, path: &str, column: &str) -> String {
        let current = libportal_db::LoanSort::from_param(self.sort.as_deref());
        let order = libportal_db::SortOrder::from_param(self.order.as_deref());
        let order = if current.as_str() == column {
            order.reversed()
        } else {
            libportal_db::SortOrder::Desc
        };
        let query = ListQuery {
            sort: Some(column.to_owned()),
            order: Some(order.as_str().to_owned()),
            page: None,
            ..self.clone()
        };
        with_query(path, &query)
    }
}

fn with_query(path: &str, query: &ListQuery) -> String {
    match serde_urlencoded::to_string(query) {
        Ok(encoded) if encoded.is_empty() => path.to_owned(),
        Ok(encoded) => format!("{path}?{encoded}"),
        Err(err) => {
            tracing::warn!("encoding list query: {err}");
            path.to_owned()
        }
    }
}

pub struct PageLink {
    pub number: i64,
    pub href: String,
    pub current: bool,
}

pub struct Pager {
    pub current: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub previous: Option<String>,
    pub next: Option<String>,
    pub links: Vec<PageLink>,
}

impl Pager {
    pub fn new<T>(paged: &Paged<T>, query: &ListQuery, path: &str) -> Self {
        let current = paged.page.number;
        Self {
            current,
            total_pages: paged.total_pages(),
            total_items: paged.total_items,
            previous: paged
                .has_previous()
                .then(|| query.href(path, current - 1)),
            next: paged.has_next().then(|| query.href(path, current + 1)),
            links: paged
                .window(PAGER_RADIUS)
                .into_iter()
                .map(|number| PageLink {
                    number,
                    href: query.href(path, number),
                    current: number == current,
                })
                .collect(),
        }
    }

    pub fn is_needed(&self) -> bool {
        self.total_pages > 1
    }
}
