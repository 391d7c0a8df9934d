#![cfg(feature = "gurobi")]

use std::cell::RefCell;

use super::{LPSolver, SolveStatus, SolverOutput};
use crate::error::SolverError;
use grb::{expr::LinExpr, prelude::*};

thread_local! {
static GLOBAL_GUROBI_ENV :RefCell<Option<grb::Env>> = const { RefCell::new(None) };
}

fn backend(e: grb::Error) -> SolverError {
    SolverError::Backend(e.to_string())
}

pub struct GurobiSolver {
    grb: grb::Model,
    added_vars: Vec<grb::Var>,
}

impl GurobiSolver {
    fn incumbent(&self, status: SolveStatus) -> Result<SolverOutput, SolverError> {
        let objective = self.grb.get_attr(attr::ObjVal).map_err(backend)?;
        let best_bound = self.grb.get_attr(attr::ObjBound).map_err(backend)?;
        let values = self
            .grb
            .get_obj_attr_batch(attr::X, self.added_vars.iter().cloned())
            .map_err(backend)?;
        Ok(SolverOutput {
            status,
            values,
            objective,
            best_bound,
        })
    }
}

impl LPSolver for GurobiSolver {
    type Var = grb::Var;

    fn new() -> Result<Self, SolverError> {
        // The environment holds the license check, so it is created once per thread.
        let mut grb = GLOBAL_GUROBI_ENV.with_borrow_mut(|e| {
            if e.is_none() {
                *e = Some(grb::Env::new("").map_err(backend)?);
            }
            match e.as_ref() {
                Some(env) => grb::Model::with_env("", env).map_err(backend),
                None => Err(SolverError::Backend("no Gurobi environment".to_string())),
            }
        })?;
        grb.set_param(param::OutputFlag, 0).map_err(backend)?;
        Ok(Self {
            grb,
            added_vars: Vec::new(),
        })
    }

    fn add_var(&mut self, cost: f64) -> Result<Self::Var, SolverError> {
        let model = &mut self.grb;
        let var = add_ctsvar!(model, obj: cost, bounds: ..).map_err(backend)?;
        self.added_vars.push(var);
        Ok(var)
    }

    fn set_binary(&mut self, var: Self::Var) -> Result<(), SolverError> {
        self.grb
            .set_obj_attr(attr::VType, &var, VarType::Binary)
            .map_err(backend)
    }

    fn set_bounds(&mut self, var: Self::Var, lower: f64, upper: f64) -> Result<(), SolverError> {
        self.grb.set_obj_attr(attr::LB, &var, lower).map_err(backend)?;
        self.grb.set_obj_attr(attr::UB, &var, upper).map_err(backend)
    }

    fn add_constraint(&mut self, lb: f64, ub: f64, idxs: &[Self::Var], coeffs: &[f64]) -> Result<(), SolverError> {
        let mut expr = LinExpr::new();
        for (v, c) in idxs.iter().zip(coeffs.iter()) {
            expr.add_term(*c, *v);
        }
        if lb == ub {
            self.grb.add_constr("", c!(expr == lb)).map_err(backend)?;
        } else {
            // Two-sided rows become a pair of inequalities.
            if lb != -self.inf() {
                self.grb.add_constr("", c!(expr.clone() >= lb)).map_err(backend)?;
            }
            if ub != self.inf() {
                self.grb.add_constr("", c!(expr <= ub)).map_err(backend)?;
            }
        }
        Ok(())
    }

    fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError> {
        self.grb.set_param(param::TimeLimit, seconds).map_err(backend)
    }

    fn optimize(&mut self) -> Result<SolverOutput, SolverError> {
        self.grb.optimize().map_err(backend)?;
        let has_incumbent = self.grb.get_attr(attr::SolCount).map_err(backend)? > 0;
        match self.grb.status().map_err(backend)? {
            Status::Optimal => self.incumbent(SolveStatus::Optimal),
            Status::Infeasible | Status::InfOrUnbd => Ok(SolverOutput::without_incumbent(SolveStatus::Infeasible)),
            Status::Unbounded => Ok(SolverOutput::without_incumbent(SolveStatus::Unbounded)),
            Status::TimeLimit if has_incumbent => self.incumbent(SolveStatus::TimeLimit),
            Status::TimeLimit => Err(SolverError::NoIncumbent),
            Status::CutOff
            | Status::IterationLimit
            | Status::NodeLimit
            | Status::SolutionLimit
                if has_incumbent =>
            {
                self.incumbent(SolveStatus::Feasible)
            }
            other => Err(SolverError::Backend(format!("Gurobi stopped with status {:?}", other))),
        }
    }

    fn inf(&self) -> f64 {
        f64::INFINITY
    }

    fn num_vars(&self) -> usize {
        self.added_vars.len()
    }
}
