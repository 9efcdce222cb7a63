use crate::error::BreakdownError;
use crate::holidays::is_nerc_holiday;
use crate::models::{HourSlice, HourlyRecord, PeakingClass, TransactionRecord};
use chrono::{Datelike, Duration, NaiveDateTime, Timelike, Weekday};
use rayon::prelude::*;
use serde::Serialize;

/// Timestamp layout of `transaction_begin_date` / `transaction_end_date` in filings.
pub const EQR_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";
/// Timestamp layout written to hourly output.
pub const HOURLY_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M";

const SECONDS_PER_HOUR: i64 = 3600;

/// NERC off-peak: Sundays, hours ending before 06:00 or after 22:00, and NERC holidays.
pub fn is_off_peak_hour(hour_start: NaiveDateTime) -> bool {
    hour_start.weekday() == Weekday::Sun
        || hour_start.hour() < 6
        || hour_start.hour() > 21
        || is_nerc_holiday(hour_start.date())
}

/// Whether an hour contradicts the transaction's declared peaking class.
///
/// Off-peak transactions drop their peak hours and peak transactions drop
/// their off-peak hours. Every other class keeps every hour.
pub fn is_excluded_hour(class: Option<&PeakingClass>, hour_start: NaiveDateTime) -> bool {
    match class {
        Some(PeakingClass::OffPeak) => !is_off_peak_hour(hour_start),
        Some(PeakingClass::Peak) => is_off_peak_hour(hour_start),
        _ => false,
    }
}

fn parse_timestamp(
    record: &TransactionRecord,
    field: &'static str,
    value: &str,
) -> Result<NaiveDateTime, BreakdownError> {
    NaiveDateTime::parse_from_str(value.trim(), EQR_TIMESTAMP_FORMAT).map_err(|_| {
        BreakdownError::Parse {
            record: record.transaction_unique_id.clone(),
            field,
            value: value.to_string(),
        }
    })
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(HOURLY_TIMESTAMP_FORMAT).to_string()
}

/// The running duration, as long as it can still be divided by.
fn retained_duration(
    record: &TransactionRecord,
    total_duration: i64,
) -> Result<i64, BreakdownError> {
    if total_duration <= 0 {
        return Err(BreakdownError::DivisionHazard {
            record: record.transaction_unique_id.clone(),
            total_duration,
        });
    }
    Ok(total_duration)
}

fn start_of_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or(ts)
}

/// Split one transaction into per-clock-hour records.
///
/// The walk steps one hour at a time from the transaction begin. Each step
/// emits the clock hour it lands in, clipped to the begin on the first step
/// and to the end when it lands in the end's hour.
///
/// Hours excluded by the peaking rule are skipped and shrink the proration
/// denominator by a full hour each; the remaining hours keep their shares of
/// the shrunken total, so the derived quantities are not re-normalized.
pub fn decompose(record: &TransactionRecord) -> Result<Vec<HourlyRecord>, BreakdownError> {
    let tx = record.normalized();
    let begin = parse_timestamp(&tx, "transaction_begin_date", &tx.transaction_begin_date)?;
    let end = parse_timestamp(&tx, "transaction_end_date", &tx.transaction_end_date)?;

    if end < begin {
        return Err(BreakdownError::ScheduleInconsistency {
            record: tx.transaction_unique_id.clone(),
            begin: tx.transaction_begin_date.clone(),
            end: tx.transaction_end_date.clone(),
        });
    }

    // Same minute, so it sits inside a single hour
    if begin == end {
        let slice = HourSlice {
            hour_begin: format_timestamp(begin),
            hour_end: format_timestamp(end),
            transaction_quantity: tx.transaction_quantity,
            standardized_quantity: tx.standardized_quantity,
            total_transaction_charge: tx.total_transaction_charge,
        };
        return Ok(vec![HourlyRecord::from_slice(&tx, slice, 1)]);
    }

    let peaking = tx.increment_peaking_name.as_ref();
    let transmission_charge = tx.total_transmission_charge.unwrap_or(0.0);
    let mut total_duration = (end - begin).num_seconds();
    let mut slices = Vec::new();
    let mut current = begin;

    while current < end {
        let hour_start = start_of_hour(current);
        let window_begin = if current == begin { begin } else { hour_start };

        if is_excluded_hour(peaking, window_begin) {
            total_duration -= SECONDS_PER_HOUR;
            current += Duration::hours(1);
            continue;
        }

        // Only the step in end's clock hour stops at the transaction end,
        // every other one runs through minute 59
        let in_last_hour = current.date() == end.date() && current.hour() == end.hour();
        let (covered_until, window_end) = if in_last_hour {
            (end, end)
        } else {
            (hour_start + Duration::hours(1), hour_start + Duration::minutes(59))
        };

        let denominator = retained_duration(&tx, total_duration)?;
        let share = (covered_until - window_begin).num_seconds() as f64 / denominator as f64;
        let quantity = tx.transaction_quantity * share;

        slices.push(HourSlice {
            hour_begin: format_timestamp(window_begin),
            hour_end: format_timestamp(window_end),
            transaction_quantity: quantity,
            standardized_quantity: tx.standardized_quantity.map(|q| q * share),
            total_transaction_charge: Some(quantity * tx.price + transmission_charge),
        });

        current += Duration::hours(1);
    }

    if slices.is_empty() {
        return Ok(Vec::new());
    }

    // Shares were already handed out against this denominator
    let total_duration = retained_duration(&tx, total_duration)?;
    let hours = (total_duration + SECONDS_PER_HOUR - 1) / SECONDS_PER_HOUR;
    let hour_duration = u32::try_from(hours).unwrap_or(u32::MAX);

    Ok(slices
        .into_iter()
        .map(|slice| HourlyRecord::from_slice(&tx, slice, hour_duration))
        .collect())
}

/// Lazily decompose a stream of transactions, one result per input record.
pub fn breakdown_iter<'a, I>(
    records: I,
) -> impl Iterator<Item = Result<Vec<HourlyRecord>, BreakdownError>> + 'a
where
    I: IntoIterator<Item = &'a TransactionRecord>,
    I::IntoIter: 'a,
{
    records.into_iter().map(decompose)
}

/// Decompose a batch across the rayon pool. Results keep the input order.
pub fn par_breakdown(
    records: &[TransactionRecord],
) -> Vec<Result<Vec<HourlyRecord>, BreakdownError>> {
    records.par_iter().map(decompose).collect()
}

/// Counts gathered while decomposing a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BreakdownStats {
    pub records: usize,
    pub hourly_rows: usize,
    pub fully_excluded: usize,
    pub rejected: usize,
}

impl BreakdownStats {
    pub fn observe(&mut self, result: &Result<Vec<HourlyRecord>, BreakdownError>) {
        self.records += 1;
        match result {
            Ok(rows) if rows.is_empty() => self.fully_excluded += 1,
            Ok(rows) => self.hourly_rows += rows.len(),
            Err(_) => self.rejected += 1,
        }
    }

    pub fn merge(&mut self, other: &BreakdownStats) {
        self.records += other.records;
        self.hourly_rows += other.hourly_rows;
        self.fully_excluded += other.fully_excluded;
        self.rejected += other.rejected;
    }
}
