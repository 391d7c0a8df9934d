use fstsp_structs::{plan::DeliveryPlan, problem::Instance};
use log::{debug, info};

use crate::{
    config::PlannerConfig,
    decode::{decode, Decoded},
    error::PlanError,
    extsolvers::{ExternalSolver, LPSolver, SolverAdapter},
    model::build_model,
};

/// Plan the deliveries for `instance`. The solver is called on the model,
/// the assignment is decoded and validated, and every subtour it contains is
/// cut off before solving again, up to `config.cut_rounds` times.
pub fn plan_deliveries<S: SolverAdapter + ?Sized>(
    instance: &Instance,
    config: &PlannerConfig,
    solver: &mut S,
) -> Result<DeliveryPlan, PlanError> {
    #[cfg(feature = "prof")]
    let _p = hprof::enter("plan deliveries");
    let mut model = build_model(instance, config)?;
    let rounds = config.cut_rounds(model.n);

    for round in 0..=rounds {
        let output = solver.solve(&model.milp, config.time_limit_seconds)?;
        debug!(
            "round {} solver status {:?} objective {:.3} bound {:.3}",
            round, output.status, output.objective, output.best_bound
        );
        match decode(&model, &output, config.integrality_tolerance)? {
            Decoded::Plan(plan) => {
                info!(
                    "plan after {} rounds, {} cuts: total time {:.2}, {} truck stops, {} sorties",
                    round + 1,
                    model.cuts,
                    plan.total_time,
                    plan.truck_customers().count(),
                    plan.sorties.len()
                );
                return Ok(plan);
            }
            Decoded::Subtours(subtours) => {
                info!("round {}: cutting {} subtours", round, subtours.len());
                if round < rounds {
                    for nodes in subtours.iter() {
                        model.add_subtour_cut(nodes);
                    }
                }
            }
        }
    }
    Err(PlanError::CutLimitExceeded { rounds })
}

/// `plan_deliveries` with a fresh `LP` backend for every round.
pub fn solve_with<LP: LPSolver>(instance: &Instance, config: &PlannerConfig) -> Result<DeliveryPlan, PlanError> {
    plan_deliveries(instance, config, &mut ExternalSolver::<LP>::new())
}
