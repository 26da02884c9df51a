use crate::error::SchedulingError;
use crate::model::Formulation;
use good_lp::solvers::SolutionStatus;
use good_lp::{Expression, ResolutionError, Solution, SolverModel, Variable, default_solver};
use log::{debug, info};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Value of every declared variable of a solved model.
#[derive(Debug, Clone, Default)]
pub struct Valuation {
    values: HashMap<Variable, f64>,
}

impl Valuation {
    pub fn value(&self, var: Variable) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }

    pub fn is_true(&self, var: Variable) -> bool {
        self.value(var) > 0.5
    }
}

impl FromIterator<(Variable, f64)> for Valuation {
    fn from_iter<I: IntoIterator<Item = (Variable, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// What one time-bounded solve produced.
#[derive(Debug)]
pub enum SolveOutcome {
    Optimal(Valuation),
    Feasible(Valuation),
    Infeasible,
    TimeoutNoSolution,
}

impl SolveOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            SolveOutcome::Optimal(_) => "OPTIMAL",
            SolveOutcome::Feasible(_) => "FEASIBLE",
            SolveOutcome::Infeasible => "INFEASIBLE",
            SolveOutcome::TimeoutNoSolution => "TIMEOUT_NO_SOLUTION",
        }
    }
}

/// A time-bounded minimisation oracle over a [`Formulation`].
///
/// Implementations block until the budget expires, infeasibility is proven,
/// or a valuation is found.
pub trait SolvingEngine {
    fn solve(
        &self,
        formulation: Formulation,
        objective: Expression,
        time_limit: Duration,
    ) -> Result<SolveOutcome, SchedulingError>;
}

/// What good_lp reports when HiGHS stops on a limit without a feasible point.
const NO_SOLUTION_FOUND: &str = "NoSolutionFound";

/// Branch-and-bound through the HiGHS MILP solver.
#[derive(Debug, Clone)]
pub struct HighsEngine {
    pub threads: u32,
    pub random_seed: i32,
    pub log_to_console: bool,
}

impl Default for HighsEngine {
    fn default() -> Self {
        Self {
            threads: 1,
            random_seed: 1234,
            log_to_console: false,
        }
    }
}

impl SolvingEngine for HighsEngine {
    fn solve(
        &self,
        formulation: Formulation,
        objective: Expression,
        time_limit: Duration,
    ) -> Result<SolveOutcome, SchedulingError> {
        let Formulation {
            variables,
            declared,
            constraints,
        } = formulation;

        let mut model = variables
            .minimise(objective)
            .using(default_solver)
            .set_option("threads", self.threads as i32)
            .set_option("random_seed", self.random_seed) // fixed seed for reproducible schedules
            .set_option("log_to_console", if self.log_to_console { "true" } else { "false" })
            .set_option("time_limit", time_limit.as_secs_f64());
        let constraint_count = constraints.len();
        for constraint in constraints {
            model.add_constraint(constraint);
        }

        info!(
            "Starting HiGHS with {} variables, {} constraints and a {:.0?} budget...",
            declared.len(),
            constraint_count,
            time_limit
        );
        let start_time = Instant::now();
        let result = model.solve();
        debug!("HiGHS returned after {:.2?}", start_time.elapsed());

        let solution = match result {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) => return Ok(SolveOutcome::Infeasible),
            // A limit was hit before any primal-feasible point turned up.
            Err(ResolutionError::Other(NO_SOLUTION_FOUND)) => {
                return Ok(SolveOutcome::TimeoutNoSolution);
            }
            Err(e) => return Err(SchedulingError::Engine(e.to_string())),
        };

        let valuation: Valuation = declared.iter().map(|&v| (v, solution.value(v))).collect();
        match solution.status() {
            SolutionStatus::Optimal => Ok(SolveOutcome::Optimal(valuation)),
            SolutionStatus::TimeLimit | SolutionStatus::GapLimit => {
                Ok(SolveOutcome::Feasible(valuation))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_secs(10);

    /// Solves with every input fixed, pushing the indicator down and then up.
    fn indicator_bounds(build: impl Fn(&mut Formulation) -> Variable) -> (bool, bool) {
        let solve = |sign: f64| {
            let mut formulation = Formulation::new();
            let indicator = build(&mut formulation);
            let outcome = HighsEngine::default()
                .solve(formulation, sign * indicator, LIMIT)
                .unwrap();
            match outcome {
                SolveOutcome::Optimal(valuation) | SolveOutcome::Feasible(valuation) => {
                    valuation.is_true(indicator)
                }
                other => panic!("unexpected outcome {}", other.status()),
            }
        };
        (solve(1.0), solve(-1.0))
    }

    #[test]
    fn conjunction_indicator_tracks_literals_both_ways() {
        for bits in 0..8u8 {
            let (a_on, b_on, c_on) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            let expected = a_on && b_on && !c_on;
            let (lowest, highest) = indicator_bounds(|f| {
                let t = f.add_bool();
                let a = f.add_bool();
                let b = f.add_bool();
                let c = f.add_bool();
                f.fix(a, a_on as u8 as f64);
                f.fix(b, b_on as u8 as f64);
                f.fix(c, c_on as u8 as f64);
                f.reify_and(t, &[a, b], &[c]);
                t
            });
            assert_eq!((lowest, highest), (expected, expected), "inputs {bits:03b}");
        }
    }

    #[test]
    fn positive_indicator_tracks_sum_both_ways() {
        for total in 0..=3u8 {
            let (lowest, highest) = indicator_bounds(|f| {
                let flag = f.add_bool();
                let parts: Vec<Variable> = (0..3).map(|_| f.add_bool()).collect();
                for (k, &p) in parts.iter().enumerate() {
                    f.fix(p, ((k as u8) < total) as u8 as f64);
                }
                let sum: Expression = parts.iter().copied().sum();
                f.reify_positive(flag, sum, 3.0);
                flag
            });
            assert_eq!((lowest, highest), (total > 0, total > 0), "sum {total}");
        }
    }

    #[test]
    fn contradiction_is_infeasible() {
        let mut formulation = Formulation::new();
        let x = formulation.add_bool();
        formulation.fix(x, 1.0);
        formulation.fix(x, 0.0);
        let outcome = HighsEngine::default()
            .solve(formulation, Expression::from(x), LIMIT)
            .unwrap();
        assert!(matches!(outcome, SolveOutcome::Infeasible));
    }

    #[test]
    fn valuation_reports_every_declared_variable() {
        let mut formulation = Formulation::new();
        let x = formulation.add_integer(0.0, 5.0);
        let y = formulation.add_bool();
        formulation.geq(x, 3.0);
        formulation.geq(y, 1.0);
        let outcome = HighsEngine::default()
            .solve(formulation, x + y, LIMIT)
            .unwrap();
        let SolveOutcome::Optimal(valuation) = outcome else {
            panic!("expected an optimal solution");
        };
        assert!((valuation.value(x) - 3.0).abs() < 1e-6);
        assert!(valuation.is_true(y));
    }

    /// Items of uneven weight packed into tight bins, with a cost per placement.
    fn packing(items: usize, bins: usize) -> (Formulation, Expression) {
        let mut formulation = Formulation::new();
        let mut cost = Expression::from(0.0);
        let mut loads: Vec<Expression> = vec![Expression::from(0.0); bins];
        for i in 0..items {
            let weight = (7 + (i * 13) % 11) as f64;
            let row: Vec<Variable> = (0..bins).map(|_| formulation.add_bool()).collect();
            formulation.eq(row.iter().copied().sum::<Expression>(), 1.0);
            for (j, &x) in row.iter().enumerate() {
                loads[j] += weight * x;
                cost += ((i * 7 + j * 3) % 10) as f64 * x;
            }
        }
        for load in loads {
            formulation.leq(load, 23.0);
        }
        (formulation, cost)
    }

    #[test]
    fn exhausted_budget_is_not_an_engine_fault() {
        let (formulation, cost) = packing(60, 40);
        let outcome = HighsEngine::default()
            .solve(formulation, cost, Duration::from_millis(1))
            .unwrap();
        assert!(
            matches!(
                outcome,
                SolveOutcome::TimeoutNoSolution
                    | SolveOutcome::Feasible(_)
                    | SolveOutcome::Optimal(_)
            ),
            "unexpected outcome {}",
            outcome.status()
        );
    }
}
