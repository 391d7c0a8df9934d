#![cfg(feature = "highs")]

use std::ffi::{c_void, CStr};

use highs_sys::*;

use super::{LPSolver, SolveStatus, SolverOutput};
use crate::error::SolverError;

const SOLUTION_STATUS_FEASIBLE: HighsInt = 2;

pub struct HighsSolverInstance {
    ptr: *mut c_void,
}

impl Drop for HighsSolverInstance {
    fn drop(&mut self) {
        unsafe {
            Highs_destroy(self.ptr);
        }
    }
}

fn check(retval: HighsInt, what: &str) -> Result<(), SolverError> {
    if retval == STATUS_ERROR {
        return Err(SolverError::Backend(format!("HiGHS failed to {}", what)));
    }
    Ok(())
}

impl HighsSolverInstance {
    fn double_info(&self, name: &CStr) -> f64 {
        let mut value = 0.0f64;
        unsafe { Highs_getDoubleInfoValue(self.ptr, name.as_ptr(), &mut value) };
        value
    }

    fn int_info(&self, name: &CStr) -> HighsInt {
        let mut value: HighsInt = 0;
        unsafe { Highs_getIntInfoValue(self.ptr, name.as_ptr(), &mut value) };
        value
    }

    fn incumbent(&mut self, status: SolveStatus) -> SolverOutput {
        let num_cols = self.num_vars();
        let mut values = vec![0.0; num_cols];
        if num_cols > 0 {
            let null = std::ptr::null_mut();
            unsafe { Highs_getSolution(self.ptr, values.as_mut_ptr(), null, null, null) };
        }
        SolverOutput {
            status,
            values,
            objective: self.double_info(c"objective_function_value"),
            best_bound: self.double_info(c"mip_dual_bound"),
        }
    }
}

impl LPSolver for HighsSolverInstance {
    type Var = HighsInt;

    fn new() -> Result<Self, SolverError> {
        let ptr = unsafe { Highs_create() };
        if ptr.is_null() {
            return Err(SolverError::Backend("HiGHS instance could not be created".to_string()));
        }
        let instance = Self { ptr };
        check(
            unsafe { Highs_setStringOptionValue(ptr, c"presolve".as_ptr(), c"on".as_ptr()) },
            "enable presolve",
        )?;
        check(
            unsafe { Highs_setBoolOptionValue(ptr, c"output_flag".as_ptr(), 0) },
            "silence output",
        )?;
        Ok(instance)
    }

    fn add_var(&mut self, cost: f64) -> Result<Self::Var, SolverError> {
        let new_col_idx = unsafe { Highs_getNumCol(self.ptr) };
        let inf = self.inf();
        check(
            unsafe { Highs_addCol(self.ptr, cost, 0.0, inf, 0, std::ptr::null(), std::ptr::null()) },
            "add a column",
        )?;
        Ok(new_col_idx)
    }

    fn set_binary(&mut self, var: Self::Var) -> Result<(), SolverError> {
        check(
            unsafe { Highs_changeColBounds(self.ptr, var, 0.0, 1.0) },
            "bound a binary column",
        )?;
        check(
            unsafe { Highs_changeColIntegrality(self.ptr, var, kHighsVarTypeInteger) },
            "mark a column integer",
        )
    }

    fn set_bounds(&mut self, var: Self::Var, lower: f64, upper: f64) -> Result<(), SolverError> {
        let inf = self.inf();
        let (lower, upper) = (lower.max(-inf), upper.min(inf));
        check(
            unsafe { Highs_changeColBounds(self.ptr, var, lower, upper) },
            "change column bounds",
        )
    }

    fn add_constraint(&mut self, lb: f64, ub: f64, idxs: &[Self::Var], coeffs: &[f64]) -> Result<(), SolverError> {
        assert!(idxs.len() == coeffs.len());
        check(
            unsafe {
                Highs_addRow(
                    self.ptr,
                    lb,
                    ub,
                    idxs.len() as HighsInt,
                    idxs.as_ptr(),
                    coeffs.as_ptr(),
                )
            },
            "add a row",
        )
    }

    fn set_time_limit(&mut self, seconds: f64) -> Result<(), SolverError> {
        check(
            unsafe { Highs_setDoubleOptionValue(self.ptr, c"time_limit".as_ptr(), seconds) },
            "set the time limit",
        )
    }

    fn optimize(&mut self) -> Result<SolverOutput, SolverError> {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("highs run");
        check(unsafe { Highs_run(self.ptr) }, "run")?;

        let has_incumbent = self.int_info(c"primal_solution_status") == SOLUTION_STATUS_FEASIBLE;
        let model_status = unsafe { Highs_getModelStatus(self.ptr) };
        match model_status {
            MODEL_STATUS_OPTIMAL => Ok(self.incumbent(SolveStatus::Optimal)),
            MODEL_STATUS_INFEASIBLE | MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE => {
                Ok(SolverOutput::without_incumbent(SolveStatus::Infeasible))
            }
            MODEL_STATUS_UNBOUNDED => Ok(SolverOutput::without_incumbent(SolveStatus::Unbounded)),
            MODEL_STATUS_REACHED_TIME_LIMIT if has_incumbent => Ok(self.incumbent(SolveStatus::TimeLimit)),
            MODEL_STATUS_REACHED_TIME_LIMIT => Err(SolverError::NoIncumbent),
            _ if has_incumbent => Ok(self.incumbent(SolveStatus::Feasible)),
            other => Err(SolverError::Backend(format!("HiGHS stopped with model status {}", other))),
        }
    }

    fn inf(&self) -> f64 {
        unsafe { Highs_getInfinity(self.ptr) }
    }

    fn num_vars(&self) -> usize {
        unsafe { Highs_getNumCol(self.ptr) as usize }
    }
}
