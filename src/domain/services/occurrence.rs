use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::domain::models::template::EventTemplate;
use crate::error::AppError;

/// One concrete date/time instance of a template. Derived on demand, never
/// persisted; identity is `template_id` + `date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub template_id: String,
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    /// None when the template has no end time, or when the stored end time
    /// precedes the start time on the same date (a data-entry artifact; the
    /// occurrence is emitted open-ended instead of rejecting the expansion).
    pub end: Option<DateTime<Utc>>,
    pub is_first: bool,
}

/// Expands a template into its concrete occurrences within the window.
///
/// Pure with respect to its inputs: calling it again with the same arguments
/// yields the same finite, date-ordered sequence. `recurring_end_date` bounds
/// recurring series; the window bounds everything.
pub fn expand<'a>(
    template: &'a EventTemplate,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Result<OccurrenceIter<'a>, AppError> {
    if window_end < window_start {
        return Err(AppError::InvalidInput(
            "expansion window end precedes its start".into(),
        ));
    }
    template.validate()?;

    let tz: Tz = template.timezone.parse().unwrap_or(chrono_tz::UTC);

    let (step, series_end) = if template.is_recurring {
        let pattern = template
            .recurring_pattern
            .ok_or_else(|| AppError::InvalidInput("recurring template without a pattern".into()))?;
        // recurring_end_date is guaranteed by validate(); the window caps the
        // series if it were ever absent.
        (
            pattern.step_days(),
            template.recurring_end_date.unwrap_or(window_end),
        )
    } else {
        // A plain multi-day span yields one independently bookable occurrence
        // per calendar day, so per-day sign-up and capacity apply uniformly.
        (1, template.end_date.unwrap_or(template.start_date))
    };

    let first_date = series_first_date(template, step, series_end);

    Ok(OccurrenceIter {
        template,
        tz,
        cursor: template.start_date,
        step,
        series_end,
        window_start,
        window_end,
        first_date,
    })
}

/// Earliest non-excluded date of the whole series, independent of the
/// expansion window: a clipped window must not relabel a later occurrence as
/// the first of its series.
fn series_first_date(template: &EventTemplate, step: i64, series_end: NaiveDate) -> Option<NaiveDate> {
    let mut date = template.start_date;
    while date <= series_end {
        if !template.exclude_dates.contains(&date) {
            return Some(date);
        }
        date += Duration::days(step);
    }
    None
}

pub struct OccurrenceIter<'a> {
    template: &'a EventTemplate,
    tz: Tz,
    cursor: NaiveDate,
    step: i64,
    series_end: NaiveDate,
    window_start: NaiveDate,
    window_end: NaiveDate,
    first_date: Option<NaiveDate>,
}

impl OccurrenceIter<'_> {
    fn build(&self, date: NaiveDate) -> Occurrence {
        let start = to_utc(&self.tz, date, self.template.start_time);
        let end = match self.template.end_time {
            Some(end_time) if end_time < self.template.start_time => {
                warn!(
                    template_id = %self.template.id,
                    %date,
                    "end time precedes start time, dropping end for this occurrence"
                );
                None
            }
            Some(end_time) => Some(to_utc(&self.tz, date, end_time)),
            None => None,
        };
        Occurrence {
            template_id: self.template.id.clone(),
            date,
            start,
            end,
            is_first: Some(date) == self.first_date,
        }
    }
}

impl Iterator for OccurrenceIter<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        let horizon = self.series_end.min(self.window_end);
        while self.cursor <= horizon {
            let date = self.cursor;
            self.cursor = date + Duration::days(self.step);
            if self.template.exclude_dates.contains(&date) {
                continue;
            }
            if date < self.window_start {
                continue;
            }
            return Some(self.build(date));
        }
        None
    }
}

fn to_utc(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Local time erased by a DST gap: fall back to the wall clock read as
        // UTC so expansion stays total and deterministic.
        None => Utc.from_utc_datetime(&naive),
    }
}
