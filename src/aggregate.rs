use crate::demand::Demand;
use crate::model::{AssignmentVariables, Formulation};
use crate::slots::SlotSpace;
use good_lp::{Expression, Variable};
use log::info;

/// Lessons per day a heavy-load student must get on every day they attend.
pub const MIN_DAILY_LOAD: u32 = 2;

/// Per-student auxiliary variables, all tied both ways to the assignments.
#[derive(Debug, Clone)]
pub struct Aggregates {
    /// `daily_load[student][date]`: number of lessons that day.
    pub daily_load: Vec<Vec<Variable>>,
    /// `has_lesson[student][date]` <=> `daily_load > 0`.
    pub has_lesson: Vec<Vec<Variable>>,
    /// `occupied[student][date][slot]` <=> the student has a lesson in that slot.
    pub occupied: Vec<Vec<Vec<Variable>>>,
}

pub fn build_aggregates(
    formulation: &mut Formulation,
    demand: &Demand,
    space: &SlotSpace,
    vars: &AssignmentVariables,
) -> Aggregates {
    info!("Deriving daily loads and slot occupancy...");
    let per_day = space.slots_per_day() as f64;
    let mut daily_load = Vec::with_capacity(demand.students.len());
    let mut has_lesson = Vec::with_capacity(demand.students.len());
    let mut occupied = Vec::with_capacity(demand.students.len());

    for student in &demand.students {
        let mut loads = Vec::with_capacity(space.dates.len());
        let mut attends = Vec::with_capacity(space.dates.len());
        let mut student_occupied = Vec::with_capacity(space.dates.len());

        for date in 0..space.dates.len() {
            let load = formulation.add_integer(0.0, per_day);
            let on_day = vars.student_sum(&student.lessons, space.day(date));
            formulation.eq(load, on_day);

            let attending = formulation.add_bool();
            formulation.reify_positive(attending, Expression::from(load), per_day);

            let mut day_occupied = Vec::with_capacity(space.slots_per_day());
            for slot in 0..space.slots_per_day() {
                let flag = formulation.add_bool();
                match space.index_of(date, slot) {
                    Some(j) => {
                        let in_slot = vars.student_sum(&student.lessons, [j]);
                        formulation.reify_positive(flag, in_slot, student.lessons.len() as f64);
                    }
                    None => formulation.fix(flag, 0.0),
                }
                day_occupied.push(flag);
            }

            loads.push(load);
            attends.push(attending);
            student_occupied.push(day_occupied);
        }

        if student.is_heavy_load() {
            info!(
                "Student {} has {} lessons; requiring at least {} per attended day.",
                student.id, student.total_lesson_count, MIN_DAILY_LOAD
            );
            for (&load, &attending) in loads.iter().zip(&attends) {
                formulation.geq(load, MIN_DAILY_LOAD as f64 * attending);
            }
        }

        daily_load.push(loads);
        has_lesson.push(attends);
        occupied.push(student_occupied);
    }

    Aggregates {
        daily_load,
        has_lesson,
        occupied,
    }
}
