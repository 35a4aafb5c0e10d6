//! Recurrence calculator
//!
//! Pure next-trigger arithmetic for recurring sessions. An external
//! scheduler re-invokes this after each firing; nothing here has side
//! effects or reads the clock.
//!
//! Weekly/biweekly rules always push a same-weekday computation a full
//! period ahead: a weekly Monday rule evaluated on a Monday yields next
//! Monday, never today, regardless of the time of day.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use splitvote_types::error::{Error, SvResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
	Weekly,
	Biweekly,
	Monthly,
	Quarterly,
}

/// A recurrence rule: frequency plus the fields it needs
///
/// `day_of_week` is required for weekly/biweekly, `day_of_month` for
/// monthly/quarterly.
#[derive(Clone, Copy, Debug)]
pub struct RecurrenceRule {
	pub frequency: Frequency,
	pub day_of_week: Option<Weekday>,
	pub day_of_month: Option<u32>,
	pub time: NaiveTime,
}

impl RecurrenceRule {
	/// Compute the next trigger strictly after `from`
	pub fn next_run(&self, from: DateTime<Utc>) -> SvResult<DateTime<Utc>> {
		match self.frequency {
			Frequency::Weekly => self.next_weekday_run(from, 7),
			Frequency::Biweekly => self.next_weekday_run(from, 14),
			Frequency::Monthly => self.next_monthly_run(from),
			Frequency::Quarterly => self.next_quarterly_run(from),
		}
	}

	fn next_weekday_run(&self, from: DateTime<Utc>, period_days: u64) -> SvResult<DateTime<Utc>> {
		let day_of_week = self.day_of_week.ok_or_else(|| {
			Error::ValidationError("weekly recurrence requires a day of week".into())
		})?;

		let today = i64::from(from.weekday().num_days_from_monday());
		let target = i64::from(day_of_week.num_days_from_monday());
		let mut ahead = (target - today).rem_euclid(7) as u64;
		if ahead == 0 {
			ahead = period_days;
		}

		let date = from
			.date_naive()
			.checked_add_days(Days::new(ahead))
			.ok_or_else(|| Error::Internal("date overflow".into()))?;
		Ok(date.and_time(self.time).and_utc())
	}

	fn next_monthly_run(&self, from: DateTime<Utc>) -> SvResult<DateTime<Utc>> {
		let dom = self.required_day_of_month()?;

		// Walk month starts; a month lacking the day (Feb 31) is skipped
		let mut month_start = first_of_month(from.date_naive())?;
		for _ in 0..48 {
			if let Some(date) = month_start.with_day(dom) {
				let candidate = date.and_time(self.time).and_utc();
				if candidate > from {
					return Ok(candidate);
				}
			}
			month_start = month_start
				.checked_add_months(Months::new(1))
				.ok_or_else(|| Error::Internal("date overflow".into()))?;
		}
		Err(Error::ValidationError(format!("day of month {} never occurs", dom)))
	}

	fn next_quarterly_run(&self, from: DateTime<Utc>) -> SvResult<DateTime<Utc>> {
		let dom = self.required_day_of_month()?;

		// Start month of the next calendar quarter from now
		let mut month_start = next_quarter_start(from.date_naive())?;
		for _ in 0..8 {
			if let Some(date) = month_start.with_day(dom) {
				return Ok(date.and_time(self.time).and_utc());
			}
			month_start = month_start
				.checked_add_months(Months::new(3))
				.ok_or_else(|| Error::Internal("date overflow".into()))?;
		}
		Err(Error::ValidationError(format!("day of month {} never occurs", dom)))
	}

	fn required_day_of_month(&self) -> SvResult<u32> {
		let dom = self.day_of_month.ok_or_else(|| {
			Error::ValidationError("monthly recurrence requires a day of month".into())
		})?;
		if !(1..=31).contains(&dom) {
			return Err(Error::ValidationError(format!(
				"day of month {} out of range (1-31)",
				dom
			)));
		}
		Ok(dom)
	}
}

fn first_of_month(date: NaiveDate) -> SvResult<NaiveDate> {
	date.with_day(1).ok_or_else(|| Error::Internal("invalid date".into()))
}

fn next_quarter_start(date: NaiveDate) -> SvResult<NaiveDate> {
	let next_q_month0 = (date.month0() / 3 + 1) * 3;
	let year = date.year() + i32::try_from(next_q_month0 / 12).unwrap_or(0);
	NaiveDate::from_ymd_opt(year, next_q_month0 % 12 + 1, 1)
		.ok_or_else(|| Error::Internal("invalid quarter start".into()))
}


// vim: ts=4
