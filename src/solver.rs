use crate::aggregate::build_aggregates;
use crate::data::{SchedulingInput, SchedulingOutput};
use crate::decode::decode;
use crate::demand::normalize;
use crate::engine::{SolveOutcome, SolvingEngine};
use crate::error::SchedulingError;
use crate::model::{Formulation, SlotCapacity, build_assignments};
use crate::penalty::{build_penalties, objective};
use crate::report::{hard_violations, score_and_unmet_constraints};
use crate::slots::SlotSpace;
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};

/// Builds the timetabling model for `input`, hands it to `engine` and decodes
/// the result.
///
/// `default_timeout` applies when the request carries no timeout of its own.
pub fn solve<E: SolvingEngine + ?Sized>(
    input: &SchedulingInput,
    engine: &E,
    default_timeout: Duration,
) -> Result<SchedulingOutput, SchedulingError> {
    let start_time = Instant::now();
    let capacity = SlotCapacity::default();
    let time_limit = input.timeout.map_or(default_timeout, Duration::from_secs);

    let demand = normalize(&input.students);
    let space = SlotSpace::build(&input.schedule_info.dates, &input.schedule_info.slots_per_day);
    info!(
        "Setting up timetable model with {} students, {} lessons, {} dates and {} slots per day...",
        demand.students.len(),
        demand.lessons.len(),
        space.dates.len(),
        space.slots_per_day()
    );

    let mut formulation = Formulation::new();
    let vars = build_assignments(&mut formulation, &demand, &space, capacity);
    debug!(
        "{} of {} slots track high-school presence.",
        vars.high_school_present.iter().flatten().count(),
        space.len()
    );
    let aggregates = build_aggregates(&mut formulation, &demand, &space, &vars);
    let terms = build_penalties(&mut formulation, &demand, &space, &aggregates, input.weights);
    info!(
        "Model ready: {} variables, {} constraints (built in {:.2?}).",
        formulation.variable_count(),
        formulation.constraint_count(),
        start_time.elapsed()
    );

    let outcome = engine.solve(formulation, objective(&terms), time_limit)?;
    info!("Solver finished with status {} after {:.2?}", outcome.status(), start_time.elapsed());

    let valuation = match outcome {
        SolveOutcome::Optimal(valuation) | SolveOutcome::Feasible(valuation) => valuation,
        SolveOutcome::Infeasible => {
            warn!("The rules cannot all be satisfied at once.");
            return Err(SchedulingError::NoSchedule);
        }
        SolveOutcome::TimeoutNoSolution => {
            warn!("No feasible timetable found within {:?}.", time_limit);
            return Err(SchedulingError::NoSchedule);
        }
    };

    let schedule = decode(&demand, &space, &vars, &valuation)?;
    let violations = hard_violations(&demand, &schedule, capacity);
    if !violations.is_empty() {
        for violation in &violations {
            error!("Decoded timetable breaks a hard rule: {}", violation);
        }
        return Err(SchedulingError::Construction(format!(
            "decoded timetable breaks {} hard rule(s), first: {}",
            violations.len(),
            violations[0]
        )));
    }

    let (penalty, unmet_soft_constraints) =
        score_and_unmet_constraints(&demand, &schedule, input.weights);
    info!(
        "Timetable has penalty {} with {} unmet soft constraints.",
        penalty,
        unmet_soft_constraints.len()
    );

    Ok(SchedulingOutput {
        schedule,
        penalty,
        unmet_soft_constraints,
    })
}
