// libs/appointment-cell/src/services/availability.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use reqwest::Method;
use tracing::debug;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError, BlockedTime, BookingRules, DayAvailability};
use crate::services::slots::{normalize_time, parse_time, slot_catalog};

/// Decides which catalog slots of a date are still bookable. Pure: all data
/// and the current wall-clock time are passed in.
#[derive(Debug, Clone)]
pub struct AvailabilityEvaluator {
    fully_booked_threshold: u32,
}

impl AvailabilityEvaluator {
    pub fn new(fully_booked_threshold: u32) -> Self {
        Self { fully_booked_threshold }
    }

    pub fn from_rules(rules: &BookingRules) -> Self {
        Self::new(rules.fully_booked_threshold)
    }

    fn taken_times(
        &self,
        date: NaiveDate,
        appointments: &[Appointment],
        blocked_times: &[BlockedTime],
    ) -> HashSet<String> {
        let blocked = blocked_times
            .iter()
            .filter(|block| block.blocked_date == date)
            .map(|block| normalize_time(&block.blocked_time));

        let booked = appointments
            .iter()
            .filter(|appointment| appointment.appointment_date == date && appointment.blocks_slot())
            .map(|appointment| normalize_time(&appointment.appointment_time));

        blocked.chain(booked).collect()
    }

    fn is_past(date: NaiveDate, time: &str, now: NaiveDateTime) -> bool {
        if date != now.date() {
            return false;
        }
        match parse_time(time) {
            Some(slot_time) => slot_time <= now.time(),
            // unparseable labels are never offered
            None => true,
        }
    }

    pub fn available_slots(
        &self,
        date: NaiveDate,
        appointments: &[Appointment],
        blocked_times: &[BlockedTime],
        now: NaiveDateTime,
    ) -> Vec<String> {
        let taken = self.taken_times(date, appointments, blocked_times);

        slot_catalog()
            .into_iter()
            .filter(|slot| !taken.contains(&normalize_time(slot)))
            .filter(|slot| !Self::is_past(date, slot, now))
            .collect()
    }

    pub fn is_slot_available(
        &self,
        date: NaiveDate,
        time: &str,
        appointments: &[Appointment],
        blocked_times: &[BlockedTime],
        now: NaiveDateTime,
    ) -> bool {
        let wanted = normalize_time(time);
        self.available_slots(date, appointments, blocked_times, now)
            .iter()
            .any(|slot| normalize_time(slot) == wanted)
    }

    /// Counts rows, not distinct slots: a blocked slot that also carries an
    /// appointment counts twice.
    pub fn is_date_fully_booked(
        &self,
        date: NaiveDate,
        appointments: &[Appointment],
        blocked_times: &[BlockedTime],
    ) -> bool {
        let booked = appointments
            .iter()
            .filter(|appointment| appointment.appointment_date == date && appointment.blocks_slot())
            .count();
        let blocked = blocked_times
            .iter()
            .filter(|block| block.blocked_date == date)
            .count();

        (booked + blocked) as u64 >= self.fully_booked_threshold as u64
    }

    pub fn evaluate_day(
        &self,
        date: NaiveDate,
        appointments: &[Appointment],
        blocked_times: &[BlockedTime],
        now: NaiveDateTime,
    ) -> DayAvailability {
        DayAvailability {
            date,
            available_slots: self.available_slots(date, appointments, blocked_times, now),
            fully_booked: self.is_date_fully_booked(date, appointments, blocked_times),
        }
    }
}

/// Loads appointments and blocked times from storage and feeds the evaluator.
pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    evaluator: AvailabilityEvaluator,
    rules: BookingRules,
}

impl AvailabilityService {
    pub fn new(supabase: Arc<SupabaseClient>, rules: BookingRules) -> Self {
        Self {
            supabase,
            evaluator: AvailabilityEvaluator::from_rules(&rules),
            rules,
        }
    }

    pub fn evaluator(&self) -> &AvailabilityEvaluator {
        &self.evaluator
    }

    pub async fn fetch_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<(Vec<Appointment>, Vec<BlockedTime>), AppointmentError> {
        debug!("Loading bookings and blocked times from {} to {}", from, to);

        let appointments_path = format!(
            "/rest/v1/appointments?appointment_date=gte.{}&appointment_date=lte.{}&status=neq.cancelled",
            from, to
        );
        let appointments: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &appointments_path,
            Some(auth_token),
            None,
        ).await?;

        let blocked_path = format!(
            "/rest/v1/blocked_times?blocked_date=gte.{}&blocked_date=lte.{}",
            from, to
        );
        let blocked_times: Vec<BlockedTime> = self.supabase.request(
            Method::GET,
            &blocked_path,
            Some(auth_token),
            None,
        ).await?;

        Ok((appointments, blocked_times))
    }

    pub async fn day_availability(
        &self,
        date: NaiveDate,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<DayAvailability, AppointmentError> {
        if date < now.date() {
            return Ok(DayAvailability {
                date,
                available_slots: vec![],
                fully_booked: false,
            });
        }

        let (appointments, blocked_times) = self.fetch_range(date, date, auth_token).await?;
        Ok(self.evaluator.evaluate_day(date, &appointments, &blocked_times, now))
    }

    /// Dates from today through the booking horizon that still offer at least one slot.
    pub async fn bookable_dates(
        &self,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Vec<NaiveDate>, AppointmentError> {
        let today = now.date();
        let last = today + Duration::days(self.rules.booking_horizon_days - 1);
        let (appointments, blocked_times) = self.fetch_range(today, last, auth_token).await?;

        let dates = today
            .iter_days()
            .take_while(|date| *date <= last)
            .filter(|date| !self.evaluator.is_date_fully_booked(*date, &appointments, &blocked_times))
            .filter(|date| {
                !self.evaluator
                    .available_slots(*date, &appointments, &blocked_times, now)
                    .is_empty()
            })
            .collect();

        Ok(dates)
    }
}
