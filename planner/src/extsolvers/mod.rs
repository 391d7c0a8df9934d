use std::marker::PhantomData;

use crate::{error::SolverError, milp::Milp};

pub mod gurobi;
pub mod highs;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unbounded,
    TimeLimit,
}

/// Raw result of one solver call. `values` is indexed like `Milp::vars` and
/// empty when the solver has no incumbent.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverOutput {
    pub status: SolveStatus,
    pub values: Vec<f64>,
    pub objective: f64,
    pub best_bound: f64,
}

impl SolverOutput {
    pub fn without_incumbent(status: SolveStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: f64::INFINITY,
            best_bound: f64::NEG_INFINITY,
        }
    }
}

/// A stateless function from a model to an assignment. Any state such as
/// added cuts or round counters lives with the caller.
pub trait SolverAdapter {
    fn solve(&mut self, model: &Milp, time_limit_seconds: f64) -> Result<SolverOutput, SolverError>;
}

impl<F> SolverAdapter for F
where
    F: FnMut(&Milp, f64) -> Result<SolverOutput, SolverError>,
{
    fn solve(&mut self, model: &Milp, time_limit_seconds: f64) -> Result<SolverOutput, SolverError> {
        self(model, time_limit_seconds)
    }
}

/// Incremental interface of a MILP backend.
pub trait LPSolver {
    type Var: Copy + Clone;
    fn new() -> Result<Self, SolverError>
    where
        Self: Sized;
    fn add_var(&mut self, cost: f64) -> Result<Self::Var, SolverError>;
    fn set_binary(&mut self, var: Self::Var) -> Result<(), SolverError>;
    fn set_bounds(&mut self, var: Self::Var, lower: f64, upper: f64) -> Result<(), SolverError>;
    fn add_constraint(&mut self, lb: f64, ub: f64, idxs: &[Self::Var], coeffs: &[f64]) -> Result<(), SolverError>;
    fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError>;
    /// Values are returned in the order the variables were added.
    fn optimize(&mut self) -> Result<SolverOutput, SolverError>;
    fn inf(&self) -> f64;
    fn num_vars(&self) -> usize;
}

/// Builds a fresh backend instance for every call, so the backend never
/// carries state between rounds of the recut loop.
pub struct ExternalSolver<LP> {
    _backend: PhantomData<fn() -> LP>,
}

impl<LP> Default for ExternalSolver<LP> {
    fn default() -> Self {
        Self {
            _backend: PhantomData,
        }
    }
}

impl<LP> ExternalSolver<LP> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<LP: LPSolver> SolverAdapter for ExternalSolver<LP> {
    fn solve(&mut self, model: &Milp, time_limit_seconds: f64) -> Result<SolverOutput, SolverError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("backend solve");
        let mut lp = LP::new()?;
        model.load_into(&mut lp)?;
        lp.set_time_limit(time_limit_seconds)?;
        let output = lp.optimize()?;
        if !output.values.is_empty() && output.values.len() != model.num_vars() {
            return Err(SolverError::ValueCount {
                expected: model.num_vars(),
                got: output.values.len(),
            });
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::RowFamily;

    /// Records what it is given and reports the lower bounds as the solution.
    #[derive(Default)]
    struct RecordingBackend {
        costs: Vec<f64>,
        bounds: Vec<(f64, f64)>,
        binary: Vec<bool>,
        rows: Vec<(f64, f64, Vec<usize>, Vec<f64>)>,
        time_limit: f64,
    }

    thread_local! {
        static LAST: std::cell::RefCell<Option<(usize, usize, usize, f64)>> = const { std::cell::RefCell::new(None) };
    }

    impl LPSolver for RecordingBackend {
        type Var = usize;

        fn new() -> Result<Self, SolverError> {
            Ok(Self::default())
        }

        fn add_var(&mut self, cost: f64) -> Result<usize, SolverError> {
            let inf = self.inf();
            self.costs.push(cost);
            self.bounds.push((0.0, inf));
            self.binary.push(false);
            Ok(self.costs.len() - 1)
        }

        fn set_binary(&mut self, var: usize) -> Result<(), SolverError> {
            self.binary[var] = true;
            Ok(())
        }

        fn set_bounds(&mut self, var: usize, lower: f64, upper: f64) -> Result<(), SolverError> {
            self.bounds[var] = (lower, upper);
            Ok(())
        }

        fn add_constraint(&mut self, lb: f64, ub: f64, idxs: &[usize], coeffs: &[f64]) -> Result<(), SolverError> {
            self.rows.push((lb, ub, idxs.to_vec(), coeffs.to_vec()));
            Ok(())
        }

        fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError> {
            self.time_limit = seconds;
            Ok(())
        }

        fn optimize(&mut self) -> Result<SolverOutput, SolverError> {
            let binaries = self.binary.iter().filter(|b| **b).count();
            LAST.with_borrow_mut(|l| *l = Some((self.num_vars(), binaries, self.rows.len(), self.time_limit)));
            let values = self.bounds.iter().map(|(lb, _)| *lb).collect::<Vec<_>>();
            let objective = values.iter().zip(self.costs.iter()).map(|(x, c)| x * c).sum();
            Ok(SolverOutput {
                status: SolveStatus::Optimal,
                values,
                objective,
                best_bound: objective,
            })
        }

        fn inf(&self) -> f64 {
            1e30
        }

        fn num_vars(&self) -> usize {
            self.costs.len()
        }
    }

    #[test]
    fn external_solver_loads_whole_model() {
        let mut milp = Milp::new();
        let a = milp.add_binary(1.0);
        let b = milp.add_var(1.0, 2.0, 5.0);
        milp.add_constraint(RowFamily::Timing, 1.0, f64::INFINITY, &[a, b], &[1.0, 1.0]);

        let output = ExternalSolver::<RecordingBackend>::new().solve(&milp, 7.5).unwrap();
        assert_eq!(output.values, vec![0.0, 2.0]);
        assert_eq!(output.objective, 2.0);
        assert_eq!(LAST.with_borrow(|l| *l), Some((2, 1, 1, 7.5)));
    }

    #[test]
    fn closures_are_adapters() {
        let mut calls = 0;
        let mut adapter = |model: &Milp, _t: f64| {
            calls += 1;
            Ok::<_, SolverError>(SolverOutput {
                status: SolveStatus::Feasible,
                values: vec![0.0; model.num_vars()],
                objective: 0.0,
                best_bound: 0.0,
            })
        };
        let output = adapter.solve(&Milp::new(), 1.0).unwrap();
        assert_eq!(output.status, SolveStatus::Feasible);
        assert_eq!(calls, 1);
    }
}
