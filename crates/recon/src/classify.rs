use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::config::{MembershipConfig, MembershipRule};
use crate::derived::parse_date;
use crate::model::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipCategory {
    Probationary,
    Full,
}

impl MembershipCategory {
    pub fn label<'a>(&self, labels: &'a MembershipConfig) -> &'a str {
        match self {
            Self::Probationary => &labels.probationary,
            Self::Full => &labels.full,
        }
    }
}

/// Classify one member from the join date.
///
/// `ReferenceYear` parses the date and tests it against the reference year,
/// up to and including the reference date. `YearPrefix` only looks at the
/// cell text. Anything that cannot be judged counts as full membership.
pub fn classify_membership(join: &Cell, reference: NaiveDate, rule: MembershipRule) -> MembershipCategory {
    let probationary = match rule {
        MembershipRule::ReferenceYear => parse_date(join)
            .map(|d| d.year() == reference.year() && d <= reference)
            .unwrap_or(false),
        MembershipRule::YearPrefix => {
            let year = format!("{:04}", reference.year());
            join.to_string().trim_start().starts_with(&year)
        }
    };

    if probationary {
        MembershipCategory::Probationary
    } else {
        MembershipCategory::Full
    }
}
