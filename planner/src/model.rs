use fstsp_structs::problem::{Instance, DEPOT};
use log::{debug, warn};
use ordered_float::OrderedFloat;

use crate::{
    config::{ObjectiveKind, PlannerConfig},
    constraints,
    distance::TravelTimes,
    error::{ModelError, PlanError},
    milp::{Milp, Var},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SortieVar {
    pub launch: usize,
    pub customer: usize,
    pub rendezvous: usize,
    pub flight: f64,
    pub var: Var,
}

/// The FSTSP model: the solver-neutral MILP plus the mapping from instance
/// entities to its variables.
///
/// Node 0 plays two roles. As the tail of an arc or the launch of a sortie it
/// is the truck leaving the depot, as the head of an arc or the rendezvous of
/// a sortie it is the truck returning. Departure times are `depart[i]` and the
/// return time is `finish`.
#[derive(Debug, Clone)]
pub struct FstspModel {
    pub milp: Milp,
    pub times: TravelTimes,
    pub n: usize,
    pub objective: ObjectiveKind,
    /// Upper bound on every time variable.
    pub horizon: f64,
    pub big_m: f64,
    arcs: Vec<Option<Var>>,
    pub sorties: Vec<SortieVar>,
    /// Truck visiting position per customer, `None` for the depot and when
    /// subtours are cut lazily.
    pub position: Option<Vec<Option<Var>>>,
    pub depart: Vec<Var>,
    pub finish: Var,
    /// Drone in the air on the truck leg leaving node i. Empty without sorties.
    pub airborne: Vec<Var>,
    pub cuts: usize,
}

impl FstspModel {
    pub fn x(&self, i: usize, j: usize) -> Option<Var> {
        self.arcs[i * self.n + j]
    }

    /// All truck arcs as (tail, head, variable).
    pub fn arcs(&self) -> impl Iterator<Item = (usize, usize, Var)> + '_ {
        self.arcs
            .iter()
            .enumerate()
            .filter_map(move |(idx, var)| var.map(|v| (idx / self.n, idx % self.n, v)))
    }

    pub fn truck_in(&self, j: usize) -> Vec<Var> {
        (0..self.n).filter_map(|i| self.x(i, j)).collect()
    }

    pub fn truck_out(&self, i: usize) -> Vec<Var> {
        (0..self.n).filter_map(|j| self.x(i, j)).collect()
    }

    /// Time variable of the truck at the head of an arc into `j`.
    pub fn arrival(&self, j: usize) -> Var {
        if j == DEPOT {
            self.finish
        } else {
            self.depart[j]
        }
    }

    pub fn serving(&self, customer: usize) -> impl Iterator<Item = &SortieVar> {
        self.sorties.iter().filter(move |s| s.customer == customer)
    }

    pub fn launching_at(&self, node: usize) -> impl Iterator<Item = &SortieVar> {
        self.sorties.iter().filter(move |s| s.launch == node)
    }

    pub fn landing_at(&self, node: usize) -> impl Iterator<Item = &SortieVar> {
        self.sorties.iter().filter(move |s| s.rendezvous == node)
    }

    pub fn uses_mtz(&self) -> bool {
        self.position.is_some()
    }

    /// Forbid the truck from closing a cycle over `nodes`, none of which is the depot.
    pub fn add_subtour_cut(&mut self, nodes: &[usize]) {
        constraints::subtour_cut(self, nodes);
        self.cuts += 1;
    }
}

/// Build the complete model for a validated instance.
pub fn build_model(instance: &Instance, config: &PlannerConfig) -> Result<FstspModel, PlanError> {
    #[cfg(feature = "prof")]
    let _p = hprof::enter("build model");
    instance.validate()?;
    let n = instance.num_nodes();
    if n < 2 {
        return Err(ModelError::TooFewNodes(n).into());
    }
    if instance.drone_range <= 0.0 {
        return Err(ModelError::ZeroRange(instance.drone_range).into());
    }

    let times = TravelTimes::new(instance);
    let additive = config.objective == ObjectiveKind::Additive;
    let mut milp = Milp::new();

    let mut arcs = vec![None; n * n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let cost = if additive { times.truck[i][j] } else { 0.0 };
                arcs[i * n + j] = Some(milp.add_binary(cost));
            }
        }
    }

    let triples = if times.drone_useful() {
        times.eligible_sorties()
    } else {
        warn!(
            "drone speed factor {} is not above 1, sorties can never beat the truck; planning truck-only",
            times.drone_speed_factor
        );
        Vec::new()
    };
    let sorties = triples
        .into_iter()
        .map(|(launch, customer, rendezvous)| {
            let flight = times.sortie_flight(launch, customer, rendezvous);
            SortieVar {
                launch,
                customer,
                rendezvous,
                flight,
                var: milp.add_binary(if additive { flight } else { 0.0 }),
            }
        })
        .collect::<Vec<_>>();

    let position = config.uses_mtz(n).then(|| {
        (0..n)
            .map(|i| (i != DEPOT).then(|| milp.add_var(0.0, 1.0, (n - 1) as f64)))
            .collect::<Vec<_>>()
    });

    let horizon = schedule_horizon(&times, &sorties);
    let longest_flight = sorties
        .iter()
        .map(|s| OrderedFloat(s.flight))
        .max()
        .map(|f| f.0)
        .unwrap_or(0.0);
    let big_m = horizon + times.longest_truck_leg().max(longest_flight);

    let depart = (0..n)
        .map(|i| {
            let ub = if i == DEPOT { 0.0 } else { horizon };
            milp.add_var(0.0, 0.0, ub)
        })
        .collect::<Vec<_>>();
    let finish = milp.add_var(if additive { 0.0 } else { 1.0 }, 0.0, horizon);

    let airborne = if sorties.is_empty() {
        Vec::new()
    } else {
        (0..n).map(|_| milp.add_binary(0.0)).collect()
    };

    let mut model = FstspModel {
        milp,
        times,
        n,
        objective: config.objective,
        horizon,
        big_m,
        arcs,
        sorties,
        position,
        depart,
        finish,
        airborne,
        cuts: 0,
    };
    constraints::add_all(&mut model);

    debug!(
        "FSTSP model: {} nodes, {} sorties, {} variables, {} rows, mtz={}, horizon={:.2}",
        n,
        model.sorties.len(),
        model.milp.num_vars(),
        model.milp.rows.len(),
        model.uses_mtz(),
        horizon
    );
    Ok(model)
}

/// Upper bound on the completion time of any plan: every node departs at
/// most once along its longest arc, and each customer adds at most one wait,
/// never longer than the longest flight serving it.
fn schedule_horizon(times: &TravelTimes, sorties: &[SortieVar]) -> f64 {
    let driving: f64 = times
        .truck
        .iter()
        .map(|row| row.iter().copied().map(OrderedFloat).max().map(|t| t.0).unwrap_or(0.0))
        .sum();
    let mut longest_wait = vec![0.0f64; times.n];
    for s in sorties {
        longest_wait[s.customer] = longest_wait[s.customer].max(s.flight);
    }
    driving + longest_wait.iter().sum::<f64>()
}
