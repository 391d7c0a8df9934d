//! Exact solver for tiny instances by enumeration, used as a reference
//! backend for the planning pipeline.

use fstsp_structs::problem::Instance;

use crate::{
    config::PlannerConfig,
    decode::{encode, plan_objective, validate_sorties, RouteSortie},
    error::SolverError,
    extsolvers::{SolveStatus, SolverAdapter, SolverOutput},
    milp::Milp,
    model::{build_model, FstspModel},
};

const COST_EPS: f64 = 1e-9;

/// Tries every truck subset, every visiting order and every sortie placement,
/// and reports the cheapest plan as the assignment of the model it was built
/// from. Ties go to the plan with fewer sorties.
pub struct EnumerationOracle {
    pub model: FstspModel,
    pub calls: usize,
}

struct Best {
    cost: f64,
    route: Vec<usize>,
    sorties: Vec<RouteSortie>,
}

impl EnumerationOracle {
    pub fn new(instance: &Instance, config: &PlannerConfig) -> Self {
        let model = build_model(instance, config).unwrap();
        assert!(model.n <= 6, "enumeration only scales to tiny instances");
        Self { model, calls: 0 }
    }

    fn best(&self) -> Option<Best> {
        let customers = (1..self.model.n).collect::<Vec<_>>();
        let mut best: Option<Best> = None;
        for mask in 1u32..(1 << customers.len()) {
            let (truck, drone): (Vec<usize>, Vec<usize>) = customers
                .iter()
                .copied()
                .partition(|c| mask & (1 << (c - 1)) != 0);
            for order in permutations(&truck) {
                let mut route = vec![0];
                route.extend(order);
                route.push(0);
                self.place(&route, &drone, &mut Vec::new(), &mut best);
            }
        }
        best
    }

    fn place(&self, route: &[usize], drone: &[usize], placed: &mut Vec<RouteSortie>, best: &mut Option<Best>) {
        let Some((&customer, rest)) = drone.split_first() else {
            let mut sorties = placed.clone();
            if let Ok(schedule) = validate_sorties(&self.model.times, route, &mut sorties) {
                let cost = plan_objective(&self.model, route, &sorties, &schedule);
                let better = match best {
                    None => true,
                    Some(b) => {
                        cost < b.cost - COST_EPS
                            || (cost <= b.cost + COST_EPS && sorties.len() < b.sorties.len())
                    }
                };
                if better {
                    *best = Some(Best {
                        cost,
                        route: route.to_vec(),
                        sorties,
                    });
                }
            }
            return;
        };

        for launch_pos in 0..route.len() - 1 {
            for rendezvous_pos in launch_pos + 1..route.len() {
                let (launch, rendezvous) = (route[launch_pos], route[rendezvous_pos]);
                let Some(var) = self
                    .model
                    .sorties
                    .iter()
                    .find(|s| s.launch == launch && s.customer == customer && s.rendezvous == rendezvous)
                else {
                    continue;
                };
                placed.push(RouteSortie {
                    launch_pos,
                    customer,
                    rendezvous_pos,
                    flight: var.flight,
                });
                self.place(route, rest, placed, best);
                placed.pop();
            }
        }
    }
}

impl SolverAdapter for EnumerationOracle {
    fn solve(&mut self, milp: &Milp, _time_limit_seconds: f64) -> Result<SolverOutput, SolverError> {
        self.calls += 1;
        assert_eq!(milp.num_vars(), self.model.milp.num_vars());
        let Some(best) = self.best() else {
            return Ok(SolverOutput::without_incumbent(SolveStatus::Infeasible));
        };
        let values = encode(&self.model, &best.route, &best.sorties);
        let violations = milp.violations(&values, 1e-7);
        assert!(
            violations.is_empty(),
            "optimal plan violates the model: {}",
            violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
        );
        let objective = milp.objective(&values);
        assert!((objective - best.cost).abs() < 1e-6);
        Ok(SolverOutput {
            status: SolveStatus::Optimal,
            values,
            objective,
            best_bound: objective,
        })
    }
}

pub fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for (i, first) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, *first);
            out.push(tail);
        }
    }
    out
}

/// Shortest truck-only tour over all customers.
pub fn truck_only_time(model: &FstspModel) -> f64 {
    let customers = (1..model.n).collect::<Vec<_>>();
    permutations(&customers)
        .into_iter()
        .map(|order| {
            let mut prev = 0;
            let mut time = 0.0;
            for node in order.into_iter().chain(std::iter::once(0)) {
                time += model.times.truck[prev][node];
                prev = node;
            }
            time
        })
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ObjectiveKind, SubtourPolicy},
        solve::plan_deliveries,
    };
    use fstsp_structs::{plan::PlanStatus, Point};

    fn solve(instance: &Instance, config: &PlannerConfig) -> (fstsp_structs::plan::DeliveryPlan, f64) {
        let _ = env_logger::try_init();
        let mut oracle = EnumerationOracle::new(instance, config);
        let plan = plan_deliveries(instance, config, &mut oracle).unwrap();
        assert_eq!(oracle.calls, 1);
        (plan, truck_only_time(&oracle.model))
    }

    #[test]
    fn permutations_cover_all_orders() {
        assert_eq!(permutations(&[]).len(), 1);
        assert_eq!(permutations(&[1, 2, 3]).len(), 6);
        assert!(permutations(&[1, 2, 3]).contains(&vec![3, 1, 2]));
    }

    #[test]
    fn fast_drone_takes_one_customer() {
        let instance = Instance::new(
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 1.0)],
            1.0,
            3.0,
            100.0,
        );
        let (plan, truck_only) = solve(&instance, &PlannerConfig::default());
        assert_eq!(plan.status, PlanStatus::Optimal);
        assert_eq!(plan.sorties.len(), 1);
        assert_eq!(plan.truck_route.len(), 3);

        let s = plan.sorties[0];
        let times = crate::distance::TravelTimes::new(&instance);
        let driving: f64 = plan.truck_route.windows(2).map(|w| times.truck[w[0]][w[1]]).sum();
        let leg = times.truck[s.launch][s.rendezvous];
        let expected = driving - leg + leg.max(s.drone_time);
        assert!((plan.total_time - expected).abs() < 1e-9);
        assert!(plan.total_time <= truck_only + 1e-9);
        assert!((plan.model_objective - plan.total_time).abs() < 1e-6);
    }

    #[test]
    fn slow_drone_stays_on_the_truck() {
        let instance = Instance::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 3.0),
                Point::new(0.0, 3.0),
            ],
            1.0,
            1.0,
            100.0,
        );
        let (plan, truck_only) = solve(&instance, &PlannerConfig::default());
        assert!(plan.sorties.is_empty());
        assert_eq!(plan.truck_customers().count(), 3);
        assert!((plan.total_time - truck_only).abs() < 1e-9);
        assert!((plan.total_time - 14.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_customer_is_driven_to() {
        let instance = Instance::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(2.0, 0.0),
                Point::new(0.0, 2.0),
                Point::new(40.0, 0.0),
            ],
            1.0,
            2.0,
            10.0,
        );
        let (plan, truck_only) = solve(&instance, &PlannerConfig::default());
        assert!(plan.truck_customers().any(|c| c == 3));
        assert!(plan.sorties.iter().all(|s| s.customer != 3));
        assert!(plan.sorties.iter().all(|s| s.drone_time <= 10.0));
        assert!(plan.total_time <= truck_only + 1e-9);

        let mut served = plan.truck_customers().chain(plan.drone_customers()).collect::<Vec<_>>();
        served.sort();
        assert_eq!(served, vec![1, 2, 3]);
    }

    #[test]
    fn subtour_policies_agree() {
        let instance = Instance::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(6.0, 1.0),
                Point::new(7.0, 6.0),
                Point::new(1.0, 5.0),
                Point::new(3.0, 9.0),
            ],
            1.0,
            2.0,
            20.0,
        );
        let mtz = PlannerConfig {
            subtour_policy: SubtourPolicy::Mtz,
            ..Default::default()
        };
        let lazy = PlannerConfig {
            subtour_policy: SubtourPolicy::LazyCuts,
            ..Default::default()
        };
        let (a, truck_only) = solve(&instance, &mtz);
        let (b, _) = solve(&instance, &lazy);
        assert!((a.total_time - b.total_time).abs() < 1e-9);
        assert!(a.total_time <= truck_only + 1e-9);
    }

    #[test]
    fn additive_objective_reports_wall_clock_time() {
        let instance = Instance::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(8.0, 0.0),
                Point::new(4.0, 6.0),
                Point::new(-3.0, 4.0),
            ],
            1.0,
            2.0,
            30.0,
        );
        let config = PlannerConfig {
            objective: ObjectiveKind::Additive,
            ..Default::default()
        };
        let (plan, _) = solve(&instance, &config);
        let times = crate::distance::TravelTimes::new(&instance);
        let driving: f64 = plan.truck_route.windows(2).map(|w| times.truck[w[0]][w[1]]).sum();
        let flying: f64 = plan.sorties.iter().map(|s| s.drone_time).sum();
        assert!((plan.model_objective - (driving + flying)).abs() < 1e-6);
        assert!(plan.total_time >= driving - 1e-9);
    }
}
