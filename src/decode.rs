use crate::data::{PlacedLesson, Schedule};
use crate::demand::Demand;
use crate::engine::Valuation;
use crate::error::SchedulingError;
use crate::model::AssignmentVariables;
use crate::slots::SlotSpace;
use log::trace;

/// Turns a valuation back into date -> slot -> lessons.
///
/// Lessons are visited in demand order, so each cell lists its lessons in
/// that order.
pub fn decode(
    demand: &Demand,
    space: &SlotSpace,
    vars: &AssignmentVariables,
    valuation: &Valuation,
) -> Result<Schedule, SchedulingError> {
    let mut schedule = Schedule::empty(&space.dates, &space.labels);

    for (i, lesson) in demand.lessons.iter().enumerate() {
        let fault = SchedulingError::Construction;
        let row = vars
            .assign
            .get(i)
            .ok_or_else(|| fault(format!("no assignment variables for lesson {}", lesson.id)))?;
        let j = row
            .iter()
            .position(|&var| valuation.is_true(var))
            .ok_or_else(|| fault(format!("lesson {} was not assigned a slot", lesson.id)))?;
        let slot = space.slots.get(j).copied().ok_or_else(|| {
            fault(format!("slot index {} out of range for lesson {}", j, lesson.id))
        })?;
        let cell = schedule
            .days
            .get_mut(slot.date)
            .and_then(|day| day.slots.get_mut(slot.slot))
            .ok_or_else(|| {
                SchedulingError::Construction(format!(
                    "slot ({}, {}) is not part of the schedule grid",
                    slot.date, slot.slot
                ))
            })?;

        trace!(
            "{} -> {} {}",
            lesson.id, space.dates[slot.date], space.labels[slot.slot]
        );
        cell.lessons.push(PlacedLesson {
            student: demand.student_of(lesson).id.clone(),
            lesson_name: lesson.display_name(),
            type_label: lesson.type_label.clone(),
            lesson_type: lesson.lesson_type,
        });
    }

    Ok(schedule)
}
