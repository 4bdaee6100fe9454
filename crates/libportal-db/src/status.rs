//! Enumerations stored as short strings in the library database.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} value {value:?}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! impl_stored_name {
    {
        Enum $enum_type:ident, Kind $kind:literal; $($variant:ident => $name:literal, $label:literal),+
    } => {
        impl $enum_type {
            pub const ALL: &'static [$enum_type] = &[$($enum_type::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($enum_type::$variant => $name),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($enum_type::$variant => $label),+
                }
            }

            /// CSS class used by the status badges, e.g. `status-checked-out`.
            pub fn css_class(&self) -> String {
                format!("status-{}", self.as_str().replace('_', "-"))
            }
        }

        impl std::str::FromStr for $enum_type {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($enum_type::$variant)),+,
                    other => Err(UnknownValue {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $enum_type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoanStatus {
    CheckedOut,
    Returned,
    Overdue,
    Lost,
}

impl_stored_name! {
    Enum LoanStatus, Kind "loan status";
    CheckedOut => "checked_out", "Checked Out",
    Returned => "returned", "Returned",
    Overdue => "overdue", "Overdue",
    Lost => "lost", "Lost"
}

impl LoanStatus {
    /// A checked out loan whose due date has passed is overdue even before the
    /// sweep job rewrites the stored status.
    pub fn effective(self, due_date: jiff::civil::Date, today: jiff::civil::Date) -> Self {
        match self {
            LoanStatus::CheckedOut if due_date < today => LoanStatus::Overdue,
            status => status,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::CheckedOut | LoanStatus::Overdue)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatronStatus {
    Active,
    Inactive,
    Suspended,
}

impl_stored_name! {
    Enum PatronStatus, Kind "patron status";
    Active => "active", "Active",
    Inactive => "inactive", "Inactive",
    Suspended => "suspended", "Suspended"
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramStatus {
    Upcoming,
    Active,
    Completed,
}

impl_stored_name! {
    Enum ProgramStatus, Kind "program status";
    Upcoming => "upcoming", "Upcoming",
    Active => "active", "Active",
    Completed => "completed", "Completed"
}

impl ProgramStatus {
    pub fn from_dates(
        start_date: jiff::civil::Date,
        end_date: jiff::civil::Date,
        today: jiff::civil::Date,
    ) -> Self {
        if today < start_date {
            ProgramStatus::Upcoming
        } else if today > end_date {
            ProgramStatus::Completed
        } else {
            ProgramStatus::Active
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Librarian,
    Patron,
    Admin,
}

impl_stored_name! {
    Enum Role, Kind "role";
    Librarian => "librarian", "Librarian",
    Patron => "patron", "Patron",
    Admin => "admin", "Administrator"
}
