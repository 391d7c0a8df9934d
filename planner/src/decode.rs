use fstsp_structs::{
    plan::{DeliveryPlan, PlanStatus, Sortie},
    problem::DEPOT,
};
use log::{debug, warn};
use tinyvec::TinyVec;

use crate::{
    config::ObjectiveKind,
    distance::TravelTimes,
    error::{DecodeError, PlanError, SolverError},
    extsolvers::{SolveStatus, SolverOutput},
    milp::Var,
    model::FstspModel,
};

/// Absolute slack when comparing recomputed times against the drone range.
const TIME_EPS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Plan(DeliveryPlan),
    /// Truck cycles that do not pass through the depot, as node lists.
    Subtours(Vec<Vec<usize>>),
}

/// A sortie located on a truck route by route positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSortie {
    pub launch_pos: usize,
    pub customer: usize,
    pub rendezvous_pos: usize,
    pub flight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    /// Truck departure time at each route position, after any rendezvous there.
    pub depart: Vec<f64>,
    /// Launch to completed rendezvous, per sortie.
    pub airborne: Vec<f64>,
}

impl Schedule {
    pub fn finish(&self) -> f64 {
        self.depart.last().copied().unwrap_or(0.0)
    }
}

/// Walk the truck route; at a rendezvous the truck leaves only once both
/// vehicles are there.
pub fn schedule(times: &TravelTimes, route: &[usize], sorties: &[RouteSortie]) -> Schedule {
    let mut depart = vec![0.0; route.len()];
    for pos in 1..route.len() {
        let mut t = depart[pos - 1] + times.truck[route[pos - 1]][route[pos]];
        for s in sorties.iter().filter(|s| s.rendezvous_pos == pos) {
            t = t.max(depart[s.launch_pos] + s.flight);
        }
        depart[pos] = t;
    }
    let airborne = sorties
        .iter()
        .map(|s| depart[s.rendezvous_pos] - depart[s.launch_pos])
        .collect();
    Schedule { depart, airborne }
}

/// Check sortie placement on a depot-to-depot route and compute its schedule.
/// Sorties are reordered by launch position.
pub fn validate_sorties(
    times: &TravelTimes,
    route: &[usize],
    sorties: &mut [RouteSortie],
) -> Result<Schedule, DecodeError> {
    for s in sorties.iter() {
        if s.launch_pos >= s.rendezvous_pos {
            return Err(DecodeError::SortieOrder {
                launch: route[s.launch_pos],
                customer: s.customer,
                rendezvous: route[s.rendezvous_pos],
            });
        }
        if s.flight > times.drone_range + TIME_EPS {
            return Err(DecodeError::RangeExceeded {
                customer: s.customer,
                flight: s.flight,
                range: times.drone_range,
            });
        }
    }

    sorties.sort_by_key(|s| (s.launch_pos, s.rendezvous_pos));
    for (a, b) in sorties.iter().zip(sorties.iter().skip(1)) {
        if b.launch_pos < a.rendezvous_pos {
            return Err(DecodeError::OverlappingSorties {
                first: a.customer,
                second: b.customer,
            });
        }
    }

    let schedule = schedule(times, route, sorties);
    for (s, airborne) in sorties.iter().zip(schedule.airborne.iter()) {
        if *airborne > times.drone_range + TIME_EPS {
            return Err(DecodeError::EnduranceExceeded {
                customer: s.customer,
                airborne: *airborne,
                range: times.drone_range,
            });
        }
    }
    Ok(schedule)
}

fn binary(values: &[f64], var: Var, tol: f64) -> Result<bool, DecodeError> {
    let value = values[var.idx()];
    let rounded = value.round();
    if (value - rounded).abs() > tol || !(rounded == 0.0 || rounded == 1.0) {
        return Err(DecodeError::Fractional { var: var.0, value });
    }
    Ok(rounded == 1.0)
}

/// Turn a solver assignment into a delivery plan and re-check it against
/// every structural rule, independently of the solver. Subtours are returned
/// rather than raised so the caller can cut them off and solve again.
///
/// The result depends only on the arguments.
pub fn decode(model: &FstspModel, output: &SolverOutput, tol: f64) -> Result<Decoded, PlanError> {
    #[cfg(feature = "prof")]
    let _p = hprof::enter("decode");
    let status = match output.status {
        SolveStatus::Infeasible => return Err(PlanError::Infeasible),
        SolveStatus::Unbounded => return Err(PlanError::Unbounded),
        SolveStatus::Optimal => PlanStatus::Optimal,
        SolveStatus::Feasible => PlanStatus::Feasible,
        SolveStatus::TimeLimit => PlanStatus::TimeLimit,
    };
    let values = &output.values;
    if values.is_empty() {
        return Err(SolverError::NoIncumbent.into());
    }
    if values.len() != model.milp.num_vars() {
        return Err(SolverError::ValueCount {
            expected: model.milp.num_vars(),
            got: values.len(),
        }
        .into());
    }

    let n = model.n;
    let mut succ: Vec<TinyVec<[usize; 2]>> = vec![Default::default(); n];
    let mut in_degree = vec![0usize; n];
    for (i, j, x) in model.arcs() {
        if binary(values, x, tol)? {
            succ[i].push(j);
            in_degree[j] += 1;
        }
    }

    let mut active = Vec::new();
    let mut drone_served = vec![0usize; n];
    for s in model.sorties.iter() {
        if binary(values, s.var, tol)? {
            drone_served[s.customer] += 1;
            active.push(*s);
        }
    }

    if succ[DEPOT].len() != 1 || in_degree[DEPOT] != 1 {
        return Err(DecodeError::DepotDegree {
            out_degree: succ[DEPOT].len(),
            in_degree: in_degree[DEPOT],
        }
        .into());
    }
    for c in 1..n {
        if succ[c].len() != in_degree[c] || in_degree[c] > 1 {
            return Err(DecodeError::TruckDegree {
                node: c,
                out_degree: succ[c].len(),
                in_degree: in_degree[c],
            }
            .into());
        }
        let times = in_degree[c] + drone_served[c];
        if times != 1 {
            return Err(DecodeError::ServiceCount { customer: c, times }.into());
        }
    }

    // Every truck node now has exactly one successor, so the walk from the
    // depot closes, and truck nodes it misses lie on other cycles.
    let mut route = vec![DEPOT];
    let mut on_route = vec![false; n];
    on_route[DEPOT] = true;
    let mut node = succ[DEPOT][0];
    while node != DEPOT {
        on_route[node] = true;
        route.push(node);
        node = succ[node][0];
    }
    route.push(DEPOT);

    let mut subtours = Vec::new();
    for start in 1..n {
        if in_degree[start] == 1 && !on_route[start] {
            let mut cycle = Vec::new();
            let mut node = start;
            while !on_route[node] {
                on_route[node] = true;
                cycle.push(node);
                node = succ[node][0];
            }
            subtours.push(cycle);
        }
    }
    if !subtours.is_empty() {
        debug!("assignment has {} subtours: {:?}", subtours.len(), subtours);
        return Ok(Decoded::Subtours(subtours));
    }

    let mut position = vec![None; n];
    for (pos, node) in route.iter().enumerate().take(route.len() - 1) {
        position[*node] = Some(pos);
    }
    let last = route.len() - 1;
    let mut route_sorties = Vec::with_capacity(active.len());
    for s in active.iter() {
        let launch_pos = position[s.launch];
        let rendezvous_pos = if s.rendezvous == DEPOT {
            Some(last)
        } else {
            position[s.rendezvous]
        };
        match (launch_pos, rendezvous_pos) {
            (Some(launch_pos), Some(rendezvous_pos)) => route_sorties.push(RouteSortie {
                launch_pos,
                customer: s.customer,
                rendezvous_pos,
                flight: s.flight,
            }),
            _ => {
                return Err(DecodeError::SortieOffRoute {
                    launch: s.launch,
                    customer: s.customer,
                    rendezvous: s.rendezvous,
                }
                .into())
            }
        }
    }

    let schedule = validate_sorties(&model.times, &route, &mut route_sorties)?;
    if status == PlanStatus::TimeLimit {
        warn!("time limit reached, plan with total time {:.2} is not proven optimal", schedule.finish());
    }

    let sorties = route_sorties
        .iter()
        .map(|s| Sortie {
            launch: route[s.launch_pos],
            customer: s.customer,
            rendezvous: route[s.rendezvous_pos],
            drone_time: s.flight,
        })
        .collect();

    Ok(Decoded::Plan(DeliveryPlan {
        total_time: schedule.finish(),
        truck_route: route,
        sorties,
        model_objective: output.objective,
        best_bound: output.best_bound,
        status,
    }))
}

/// Objective value a plan has under the model's objective kind.
pub fn plan_objective(model: &FstspModel, route: &[usize], sorties: &[RouteSortie], schedule: &Schedule) -> f64 {
    match model.objective {
        ObjectiveKind::Synchronized => schedule.finish(),
        ObjectiveKind::Additive => {
            let driving: f64 = route.windows(2).map(|w| model.times.truck[w[0]][w[1]]).sum();
            driving + sorties.iter().map(|s| s.flight).sum::<f64>()
        }
    }
}

/// Assignment for every model variable that represents the given plan, with
/// the earliest schedule. The inverse of `decode` for valid plans.
pub fn encode(model: &FstspModel, route: &[usize], sorties: &[RouteSortie]) -> Vec<f64> {
    let mut values = vec![0.0; model.milp.num_vars()];
    let schedule = schedule(&model.times, route, sorties);
    let last = route.len() - 1;

    for (pos, w) in route.windows(2).enumerate() {
        if let Some(x) = model.x(w[0], w[1]) {
            values[x.idx()] = 1.0;
        }
        values[model.depart[w[0]].idx()] = schedule.depart[pos];
    }
    values[model.finish.idx()] = schedule.finish();

    for s in sorties {
        let (launch, rendezvous) = (route[s.launch_pos], route[s.rendezvous_pos]);
        if let Some(var) = model
            .sorties
            .iter()
            .find(|v| v.launch == launch && v.customer == s.customer && v.rendezvous == rendezvous)
        {
            values[var.var.idx()] = 1.0;
        }
    }

    if let Some(position) = model.position.as_ref() {
        for u in position.iter().flatten() {
            values[u.idx()] = 1.0;
        }
        for (pos, node) in route.iter().enumerate().take(last).skip(1) {
            if let Some(u) = position[*node] {
                values[u.idx()] = pos as f64;
            }
        }
    }

    if !model.airborne.is_empty() {
        for (pos, node) in route.iter().enumerate().take(last) {
            let flying = sorties
                .iter()
                .any(|s| s.launch_pos <= pos && pos < s.rendezvous_pos);
            values[model.airborne[*node].idx()] = if flying { 1.0 } else { 0.0 };
        }
    }
    values
}
