use crate::types::{self, RawEvent};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// Optional predicates, AND-combined; an absent predicate is no
/// constraint. Dates and weekdays are evaluated in the filter's timezone.
#[derive(Debug, Default, Clone)]
pub struct FilterCriteria {
    /// Case-insensitive match on the event's bare city field
    pub location: Option<String>,
    pub dates: Vec<NaiveDate>,
    pub weekdays: Vec<String>,
    /// Union today's local date into the date set
    pub today: bool,
}

/// Rendered row for filter output
#[derive(Debug, Serialize)]
pub struct FilteredEvent {
    pub name: String,
    pub city: String,
    pub local_start: Option<String>,
    pub local_end: Option<String>,
}

pub struct EventFilter {
    timezone: Tz,
}

impl EventFilter {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Return the subsequence of events matching every supplied predicate.
    /// Events without a parseable start timestamp never match a date or
    /// weekday predicate.
    pub fn apply<'a>(&self, events: &'a [RawEvent], criteria: &FilterCriteria) -> Vec<&'a RawEvent> {
        let mut dates: HashSet<NaiveDate> = criteria.dates.iter().copied().collect();
        if criteria.today {
            dates.insert(Utc::now().with_timezone(&self.timezone).date_naive());
        }
        let weekdays: HashSet<String> = criteria
            .weekdays
            .iter()
            .map(|day| capitalize(day))
            .collect();
        let location = criteria.location.as_ref().map(|l| l.to_lowercase());

        debug!(
            dates = dates.len(),
            weekdays = weekdays.len(),
            location = ?location,
            "applying filters"
        );

        events
            .iter()
            .filter(|event| self.matches(event, &location, &dates, &weekdays))
            .collect()
    }

    pub fn render(&self, event: &RawEvent) -> FilteredEvent {
        FilteredEvent {
            name: types::event_name(event).to_string(),
            city: types::bare_city(event).unwrap_or("Unknown city").to_string(),
            local_start: types::start_at(event)
                .map(|dt| dt.with_timezone(&self.timezone).to_rfc3339()),
            local_end: types::end_at(event)
                .map(|dt| dt.with_timezone(&self.timezone).to_rfc3339()),
        }
    }

    fn matches(
        &self,
        event: &RawEvent,
        location: &Option<String>,
        dates: &HashSet<NaiveDate>,
        weekdays: &HashSet<String>,
    ) -> bool {
        if let Some(wanted) = location {
            let city = types::bare_city(event).unwrap_or_default();
            if city.to_lowercase() != *wanted {
                return false;
            }
        }

        if !dates.is_empty() || !weekdays.is_empty() {
            let start = match types::start_at(event) {
                Some(start) => start.with_timezone(&self.timezone),
                None => return false,
            };

            if !dates.is_empty() && !dates.contains(&start.date_naive()) {
                return false;
            }
            if !weekdays.is_empty() && !weekdays.contains(&start.format("%A").to_string()) {
                return false;
            }
        }

        true
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
