//! Search and filter parameters for the list views.

use crate::status::{LoanStatus, PatronStatus, ProgramStatus};

/// Columns the borrowing history may be sorted by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoanSort {
    #[default]
    CheckoutDate,
    DueDate,
    ReturnDate,
    Status,
}

impl LoanSort {
    /// Anything outside the whitelist sorts by checkout date.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("due_date") => LoanSort::DueDate,
            Some("return_date") => LoanSort::ReturnDate,
            Some("status") => LoanSort::Status,
            _ => LoanSort::CheckoutDate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanSort::CheckoutDate => "checkout_date",
            LoanSort::DueDate => "due_date",
            LoanSort::ReturnDate => "return_date",
            LoanSort::Status => "status",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some(order) if order.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Trims the search box value; blank searches match everything.
pub fn search_term(param: Option<&str>) -> Option<String> {
    param
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Case-insensitive substring pattern with LIKE wildcards escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Clone, Debug, Default)]
pub struct LoanFilter {
    pub search: Option<String>,
    pub status: Option<LoanStatus>,
    pub sort: LoanSort,
    pub order: SortOrder,
}

#[derive(Clone, Debug, Default)]
pub struct PatronFilter {
    pub search: Option<String>,
    pub status: Option<PatronStatus>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventTiming {
    Upcoming,
    Past,
}

impl EventTiming {
    pub fn from_param(param: Option<&str>) -> Option<Self> {
        match param {
            Some("upcoming") => Some(EventTiming::Upcoming),
            Some("past") => Some(EventTiming::Past),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventTiming::Upcoming => "upcoming",
            EventTiming::Past => "past",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    pub search: Option<String>,
    pub timing: Option<EventTiming>,
}

#[derive(Clone, Debug, Default)]
pub struct ProgramFilter {
    pub search: Option<String>,
    pub status: Option<ProgramStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_outside_whitelist_falls_back_to_checkout_date() {
        assert_eq!(LoanSort::from_param(Some("due_date")), LoanSort::DueDate);
        assert_eq!(LoanSort::from_param(Some("return_date")), LoanSort::ReturnDate);
        assert_eq!(LoanSort::from_param(Some("status")), LoanSort::Status);
        assert_eq!(LoanSort::from_param(Some("checkout_date")), LoanSort::CheckoutDate);
        assert_eq!(
            LoanSort::from_param(Some("id; DROP TABLE books")),
            LoanSort::CheckoutDate
        );
        assert_eq!(LoanSort::from_param(Some("title")), LoanSort::CheckoutDate);
        assert_eq!(LoanSort::from_param(None), LoanSort::CheckoutDate);
    }

    #[test]
    fn order_defaults_to_descending() {
        assert_eq!(SortOrder::from_param(Some("ASC")), SortOrder::Asc);
        assert_eq!(SortOrder::from_param(Some("sideways")), SortOrder::Desc);
        assert_eq!(SortOrder::from_param(None), SortOrder::Desc);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(search_term(Some("   ")), None);
        assert_eq!(search_term(Some(" Dahl ")), Some("Dahl".to_owned()));
    }
}
