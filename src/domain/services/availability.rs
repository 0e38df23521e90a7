use chrono::NaiveDate;

use crate::domain::models::program::{DayAvailability, ReservationProgram, TimeSlot};
use crate::error::CapacityError;

/// Capacity transitions for a reservation program.
///
/// All functions operate on an owned `ReservationProgram` aggregate and never
/// touch shared state; callers persist the mutated aggregate under the
/// storage layer's version guard, in the same transaction as the booking row
/// it belongs to.

pub fn check_capacity(
    program: &ReservationProgram,
    date: NaiveDate,
    participants: i32,
    slot: Option<&str>,
) -> Result<(), CapacityError> {
    let day = program.day(date).ok_or(CapacityError::DateNotOffered(date))?;

    if program.enable_time_slots {
        // Slot capacity supersedes the day counter; the two layers never cap
        // independently.
        let slot_row = find_slot(day, date, slot)?;
        ensure_open(date, slot_row.is_available, slot_row.current_bookings, slot_row.max_participants, participants)
    } else {
        ensure_open(date, day.is_available, day.current_bookings, day.max_participants, participants)
    }
}

/// Re-validates and increments in one step. Exactly-once invocation per
/// booking is the caller's responsibility.
pub fn reserve(
    program: &mut ReservationProgram,
    date: NaiveDate,
    participants: i32,
    slot: Option<&str>,
) -> Result<(), CapacityError> {
    check_capacity(program, date, participants, slot)?;

    let slots_enabled = program.enable_time_slots;
    let day = program.day_mut(date).ok_or(CapacityError::DateNotOffered(date))?;

    if slots_enabled {
        let slot_row = find_slot_mut(day, date, slot)?;
        slot_row.current_bookings += participants;
        if slot_row.current_bookings >= slot_row.max_participants {
            slot_row.is_available = false;
        }
    } else {
        day.current_bookings += participants;
        if day.current_bookings >= day.max_participants {
            day.is_available = false;
        }
    }
    Ok(())
}

/// Decrements on cancellation. Reopens a row that was closed purely by
/// capacity, never one staff explicitly disabled.
pub fn release(
    program: &mut ReservationProgram,
    date: NaiveDate,
    participants: i32,
    slot: Option<&str>,
) -> Result<(), CapacityError> {
    let slots_enabled = program.enable_time_slots;
    let day = program.day_mut(date).ok_or(CapacityError::DateNotOffered(date))?;

    if slots_enabled {
        let slot_row = find_slot_mut(day, date, slot)?;
        slot_row.current_bookings = (slot_row.current_bookings - participants).max(0);
        if !slot_row.disabled_by_staff && slot_row.current_bookings < slot_row.max_participants {
            slot_row.is_available = true;
        }
    } else {
        day.current_bookings = (day.current_bookings - participants).max(0);
        if !day.disabled_by_staff && day.current_bookings < day.max_participants {
            day.is_available = true;
        }
    }
    Ok(())
}

pub fn close_day(program: &mut ReservationProgram, date: NaiveDate) -> Result<(), CapacityError> {
    let day = program.day_mut(date).ok_or(CapacityError::DateNotOffered(date))?;
    day.disabled_by_staff = true;
    day.is_available = false;
    Ok(())
}

pub fn reopen_day(program: &mut ReservationProgram, date: NaiveDate) -> Result<(), CapacityError> {
    let day = program.day_mut(date).ok_or(CapacityError::DateNotOffered(date))?;
    day.disabled_by_staff = false;
    day.is_available = day.current_bookings < day.max_participants;
    Ok(())
}

pub fn close_slot(
    program: &mut ReservationProgram,
    date: NaiveDate,
    slot: &str,
) -> Result<(), CapacityError> {
    let day = program.day_mut(date).ok_or(CapacityError::DateNotOffered(date))?;
    let slot_row = find_slot_mut(day, date, Some(slot))?;
    slot_row.disabled_by_staff = true;
    slot_row.is_available = false;
    Ok(())
}

pub fn reopen_slot(
    program: &mut ReservationProgram,
    date: NaiveDate,
    slot: &str,
) -> Result<(), CapacityError> {
    let day = program.day_mut(date).ok_or(CapacityError::DateNotOffered(date))?;
    let slot_row = find_slot_mut(day, date, Some(slot))?;
    slot_row.disabled_by_staff = false;
    slot_row.is_available = slot_row.current_bookings < slot_row.max_participants;
    Ok(())
}

fn ensure_open(
    date: NaiveDate,
    is_available: bool,
    current: i32,
    max: i32,
    requested: i32,
) -> Result<(), CapacityError> {
    if !is_available {
        return Err(CapacityError::CapacityExceeded { date, requested, remaining: 0 });
    }
    if current + requested > max {
        return Err(CapacityError::CapacityExceeded {
            date,
            requested,
            remaining: (max - current).max(0),
        });
    }
    Ok(())
}

fn find_slot<'a>(
    day: &'a DayAvailability,
    date: NaiveDate,
    slot: Option<&str>,
) -> Result<&'a TimeSlot, CapacityError> {
    let start = slot.ok_or(CapacityError::SlotNotOffered { date, slot: None })?;
    day.time_slots
        .as_deref()
        .and_then(|slots| slots.iter().find(|s| s.start == start))
        .ok_or_else(|| CapacityError::SlotNotOffered { date, slot: Some(start.to_string()) })
}

fn find_slot_mut<'a>(
    day: &'a mut DayAvailability,
    date: NaiveDate,
    slot: Option<&str>,
) -> Result<&'a mut TimeSlot, CapacityError> {
    let start = slot.ok_or(CapacityError::SlotNotOffered { date, slot: None })?;
    day.time_slots
        .as_deref_mut()
        .and_then(|slots| slots.iter_mut().find(|s| s.start == start))
        .ok_or_else(|| CapacityError::SlotNotOffered { date, slot: Some(start.to_string()) })
}
