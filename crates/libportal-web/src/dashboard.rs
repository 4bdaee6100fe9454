use crate::{
    error::Error,
    events::EventRow,
    format,
    layout::{Layout, Nav},
    loans::{self, LoanRow},
    login::CurrentLibrarian,
    AppState,
};
use askama::Template;
use axum::{extract::State, response::Html};
use axum_messages::Messages;

const LIST_LIMIT: i64 = 5;

pub struct StatCard {
    pub label: &'static str,
    pub value: i64,
    pub hint: String,
    pub href: &'static str,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    layout: Layout,
    cards: Vec<StatCard>,
    recent: Vec<LoanRow>,
    overdue: Vec<LoanRow>,
    events: Vec<EventRow>,
}

fn stat_cards(stats: &libportal_db::models::DashboardStats) -> Vec<StatCard> {
    vec![
        StatCard {
            label: "Book Titles",
            value: stats.total_titles,
            hint: format!("{} copies in the collection", stats.total_copies),
            href: "/borrowing-history",
        },
        StatCard {
            label: "Available Copies",
            value: stats.available_copies,
            hint: format!("{} currently on loan", stats.loans_out),
            href: "/borrowing-history?status=checked_out",
        },
        StatCard {
            label: "Active Patrons",
            value: stats.active_patrons,
            hint: "members in good standing".to_owned(),
            href: "/patrons?status=active",
        },
        StatCard {
            label: "Overdue Loans",
            value: stats.overdue_loans,
            hint: "past their due date".to_owned(),
            href: "/borrowing-history?status=overdue",
        },
        StatCard {
            label: "Upcoming Events",
            value: stats.upcoming_events,
            hint: "scheduled from today".to_owned(),
            href: "/events?status=upcoming",
        },
        StatCard {
            label: "Active Reading Programs",
            value: stats.active_programs,
            hint: "running now".to_owned(),
            href: "/reading-programs?status=active",
        },
    ]
}

pub async fn get(
    State(app_state): State<AppState>,
    CurrentLibrarian(librarian): CurrentLibrarian,
    messages: Messages,
) -> Result<Html<String>, Error> {
    let today = format::today();
    let store = &app_state.store;
    let (stats, recent, overdue, events) = tokio::try_join!(
        store.dashboard_stats(today),
        store.recent_loans(LIST_LIMIT),
        store.overdue_loans(today, LIST_LIMIT),
        store.upcoming_events(today, LIST_LIMIT),
    )?;
    let layout = Layout::build(&app_state, &librarian, messages, Nav::Dashboard, "Dashboard").await?;
    Ok(Html(
        DashboardTemplate {
            layout,
            cards: stat_cards(&stats),
            recent: loans::rows(&recent, today)?,
            overdue: loans::rows(&overdue, today)?,
            events: events
                .iter()
                .map(|event| EventRow::new(event, today, &app_state.uploads))
                .collect(),
        }
        .render()?,
    ))
}
