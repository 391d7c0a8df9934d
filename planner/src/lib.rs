//! Exact planning for one truck and one drone delivering from a shared
//! depot. The problem is formulated as a MILP, handed to a solver behind
//! `SolverAdapter`, and the returned assignment is decoded and validated
//! into a `DeliveryPlan`.

pub mod config;
pub mod constraints;
pub mod decode;
pub mod distance;
pub mod error;
pub mod extsolvers;
pub mod milp;
pub mod model;
pub mod solve;

#[cfg(test)]
mod test_support;

pub use config::{ObjectiveKind, PlannerConfig, SubtourPolicy};
pub use error::{DecodeError, ModelError, PlanError, SolverError};
pub use extsolvers::{ExternalSolver, LPSolver, SolveStatus, SolverAdapter, SolverOutput};
pub use model::{build_model, FstspModel};
pub use solve::{plan_deliveries, solve_with};

#[cfg(feature = "highs")]
pub fn solve_highs(
    instance: &fstsp_structs::problem::Instance,
    config: &PlannerConfig,
) -> Result<fstsp_structs::plan::DeliveryPlan, PlanError> {
    solve_with::<extsolvers::highs::HighsSolverInstance>(instance, config)
}

#[cfg(feature = "gurobi")]
pub fn solve_gurobi(
    instance: &fstsp_structs::problem::Instance,
    config: &PlannerConfig,
) -> Result<fstsp_structs::plan::DeliveryPlan, PlanError> {
    solve_with::<extsolvers::gurobi::GurobiSolver>(instance, config)
}
