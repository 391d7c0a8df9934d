//! Constraint families of the FSTSP model. Every family tags its rows with a
//! `RowFamily` so that an assignment can be checked family by family.

use fstsp_structs::problem::DEPOT;
use log::trace;

use crate::{
    milp::{RowFamily, Var},
    model::FstspModel,
};

pub fn add_all(model: &mut FstspModel) {
    degree(model);
    single_service(model);
    if model.uses_mtz() {
        subtour_mtz(model);
    }
    sortie_validity(model);
    timing(model);
    endurance(model);
    if !model.airborne.is_empty() {
        drone_capacity(model);
    }
}

struct RowBuf {
    idxs: Vec<Var>,
    coeffs: Vec<f64>,
}

impl RowBuf {
    fn new() -> Self {
        Self {
            idxs: Vec::new(),
            coeffs: Vec::new(),
        }
    }

    fn term(&mut self, coeff: f64, var: Var) -> &mut Self {
        self.idxs.push(var);
        self.coeffs.push(coeff);
        self
    }

    fn terms(&mut self, coeff: f64, vars: impl IntoIterator<Item = Var>) -> &mut Self {
        for var in vars {
            self.term(coeff, var);
        }
        self
    }

    fn push(&mut self, model: &mut FstspModel, family: RowFamily, lb: f64, ub: f64) {
        model.milp.add_constraint(family, lb, ub, &self.idxs, &self.coeffs);
        self.idxs.clear();
        self.coeffs.clear();
    }
}

fn sortie_vars<'a>(it: impl Iterator<Item = &'a crate::model::SortieVar>) -> Vec<Var> {
    it.map(|s| s.var).collect()
}

/// The depot leaves and is re-entered exactly once. Every customer leaves
/// the truck exactly once unless a sortie serves it.
fn degree(model: &mut FstspModel) {
    let mut row = RowBuf::new();
    let out = model.truck_out(DEPOT);
    row.terms(1.0, out).push(model, RowFamily::Degree, 1.0, 1.0);
    let inc = model.truck_in(DEPOT);
    row.terms(1.0, inc).push(model, RowFamily::Degree, 1.0, 1.0);

    for c in 1..model.n {
        let out = model.truck_out(c);
        let served = sortie_vars(model.serving(c));
        row.terms(1.0, out)
            .terms(1.0, served)
            .push(model, RowFamily::Degree, 1.0, 1.0);
    }
}

/// Each customer is reached by exactly one truck arc or exactly one sortie.
fn single_service(model: &mut FstspModel) {
    let mut row = RowBuf::new();
    for c in 1..model.n {
        let inc = model.truck_in(c);
        let served = sortie_vars(model.serving(c));
        row.terms(1.0, inc)
            .terms(1.0, served)
            .push(model, RowFamily::SingleService, 1.0, 1.0);
    }
}

/// u_i - u_j + (n-1) x_ij <= n-2 over customer pairs.
fn subtour_mtz(model: &mut FstspModel) {
    let Some(position) = model.position.clone() else {
        return;
    };
    let n = model.n as f64;
    let mut row = RowBuf::new();
    let arcs = model
        .arcs()
        .filter(|(i, j, _)| *i != DEPOT && *j != DEPOT)
        .collect::<Vec<_>>();
    for (i, j, x) in arcs {
        if let (Some(ui), Some(uj)) = (position[i], position[j]) {
            row.term(1.0, ui)
                .term(-1.0, uj)
                .term(n - 1.0, x)
                .push(model, RowFamily::SubtourMtz, f64::NEG_INFINITY, n - 2.0);
        }
    }
}

/// Sorties launch and land only at nodes the truck visits, with the launch
/// strictly before the rendezvous, and at most one launch and one landing per
/// node.
fn sortie_validity(model: &mut FstspModel) {
    let n = model.n as f64;
    let mut row = RowBuf::new();
    for s in model.sorties.clone() {
        for node in [s.launch, s.rendezvous] {
            if node != DEPOT {
                let visits = model.truck_in(node);
                row.term(1.0, s.var)
                    .terms(-1.0, visits)
                    .push(model, RowFamily::SortieValidity, f64::NEG_INFINITY, 0.0);
            }
        }

        let positions = model
            .position
            .as_ref()
            .map(|p| (p[s.launch], p[s.rendezvous]));
        if let Some((Some(ul), Some(ur))) = positions {
            row.term(1.0, ul)
                .term(-1.0, ur)
                .term(n - 1.0, s.var)
                .push(model, RowFamily::SortieValidity, f64::NEG_INFINITY, n - 2.0);
        }
    }

    for node in 0..model.n {
        let launches = sortie_vars(model.launching_at(node));
        if launches.len() > 1 {
            row.terms(1.0, launches)
                .push(model, RowFamily::SortieValidity, f64::NEG_INFINITY, 1.0);
        }
        let landings = sortie_vars(model.landing_at(node));
        if landings.len() > 1 {
            row.terms(1.0, landings)
                .push(model, RowFamily::SortieValidity, f64::NEG_INFINITY, 1.0);
        }
    }
}

/// Truck arcs push the head's time past the tail's, and a rendezvous cannot
/// complete before the drone gets there. Whichever vehicle arrives first waits.
fn timing(model: &mut FstspModel) {
    let m = model.big_m;
    let mut row = RowBuf::new();
    let arcs = model.arcs().collect::<Vec<_>>();
    for (i, j, x) in arcs {
        let (head, tail) = (model.arrival(j), model.depart[i]);
        let lb = model.times.truck[i][j] - m;
        row.term(1.0, head)
            .term(-1.0, tail)
            .term(-m, x)
            .push(model, RowFamily::Timing, lb, f64::INFINITY);
    }

    for s in model.sorties.clone() {
        let (head, tail) = (model.arrival(s.rendezvous), model.depart[s.launch]);
        row.term(1.0, head)
            .term(-1.0, tail)
            .term(-m, s.var)
            .push(model, RowFamily::Timing, s.flight - m, f64::INFINITY);
    }
}

/// From launch until the rendezvous completes the drone is airborne, hovering
/// included, and that may not exceed its range.
fn endurance(model: &mut FstspModel) {
    let m = model.big_m;
    let range = model.times.drone_range;
    let mut row = RowBuf::new();
    for s in model.sorties.clone() {
        let (head, tail) = (model.arrival(s.rendezvous), model.depart[s.launch]);
        row.term(1.0, head)
            .term(-1.0, tail)
            .term(m, s.var)
            .push(model, RowFamily::Endurance, f64::NEG_INFINITY, range + m);
    }
}

/// One drone, one package: the airborne flag z follows the truck route,
/// z_j = z_i + launches(j) - landings(j) on every used arc (i, j), a landing
/// needs the drone in the air, and the drone is back when the truck is.
fn drone_capacity(model: &mut FstspModel) {
    let mut row = RowBuf::new();
    let z = model.airborne.clone();

    let launches = sortie_vars(model.launching_at(DEPOT));
    row.term(1.0, z[DEPOT])
        .terms(-1.0, launches)
        .push(model, RowFamily::DroneCapacity, 0.0, 0.0);

    let arcs = model.arcs().collect::<Vec<_>>();
    for (i, j, x) in arcs {
        let landings = sortie_vars(model.landing_at(j));
        if j == DEPOT {
            row.term(1.0, z[i])
                .terms(-1.0, landings.iter().copied())
                .term(-1.0, x)
                .push(model, RowFamily::DroneCapacity, -1.0, f64::INFINITY);
            row.term(1.0, z[i])
                .terms(-1.0, landings.iter().copied())
                .term(1.0, x)
                .push(model, RowFamily::DroneCapacity, f64::NEG_INFINITY, 1.0);
        } else {
            let launches = sortie_vars(model.launching_at(j));
            row.term(1.0, z[j])
                .term(-1.0, z[i])
                .terms(-1.0, launches.iter().copied())
                .terms(1.0, landings.iter().copied())
                .term(-2.0, x)
                .push(model, RowFamily::DroneCapacity, -2.0, f64::INFINITY);
            row.term(1.0, z[j])
                .term(-1.0, z[i])
                .terms(-1.0, launches.iter().copied())
                .terms(1.0, landings.iter().copied())
                .term(2.0, x)
                .push(model, RowFamily::DroneCapacity, f64::NEG_INFINITY, 2.0);
        }

        if !landings.is_empty() {
            row.terms(1.0, landings)
                .term(-1.0, z[i])
                .term(1.0, x)
                .push(model, RowFamily::DroneCapacity, f64::NEG_INFINITY, 1.0);
        }
    }
}

/// Sum of x_ij over all ordered pairs inside `nodes` is at most |nodes| - 1.
pub fn subtour_cut(model: &mut FstspModel, nodes: &[usize]) {
    trace!("subtour cut over {:?}", nodes);
    let mut row = RowBuf::new();
    for &i in nodes {
        for &j in nodes {
            if let Some(x) = model.x(i, j) {
                row.term(1.0, x);
            }
        }
    }
    row.push(
        model,
        RowFamily::SubtourCut,
        f64::NEG_INFINITY,
        nodes.len() as f64 - 1.0,
    );
}
