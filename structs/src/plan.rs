use std::fmt;

use serde::{Deserialize, Serialize};

/// One drone round trip: launched from the truck at `launch`, serves
/// `customer`, and meets the truck again at `rendezvous`. A launch at node 0
/// is the truck's departure from the depot, a rendezvous at node 0 is its
/// return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sortie {
    pub launch: usize,
    pub customer: usize,
    pub rendezvous: usize,
    /// Pure flight time launch -> customer -> rendezvous.
    pub drone_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    Optimal,
    /// The solver returned an incumbent without proving optimality.
    Feasible,
    /// The solver ran out of time; the incumbent is valid but not proven optimal.
    TimeLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPlan {
    /// Truck visiting order, starting and ending at the depot.
    pub truck_route: Vec<usize>,
    /// Sorties ordered by launch position along the truck route.
    pub sorties: Vec<Sortie>,
    /// Wall-clock completion time, recomputed from the route itself.
    pub total_time: f64,
    /// Objective value reported by the solver for the model.
    pub model_objective: f64,
    pub best_bound: f64,
    pub status: PlanStatus,
}

impl DeliveryPlan {
    pub fn proven_optimal(&self) -> bool {
        self.status == PlanStatus::Optimal
    }

    pub fn truck_customers(&self) -> impl Iterator<Item = usize> + '_ {
        let inner = self.truck_route.len().saturating_sub(1);
        self.truck_route.iter().take(inner).skip(1).copied()
    }

    pub fn drone_customers(&self) -> impl Iterator<Item = usize> + '_ {
        self.sorties.iter().map(|s| s.customer)
    }
}

impl fmt::Display for DeliveryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "plan ({:?}) total time {:.2} (model {:.2}, bound {:.2})",
            self.status, self.total_time, self.model_objective, self.best_bound
        )?;
        let route = self
            .truck_route
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        writeln!(f, "  truck: {}", route)?;
        for s in self.sorties.iter() {
            writeln!(
                f,
                "  drone: {} -> {} -> {} ({:.2})",
                s.launch, s.customer, s.rendezvous, s.drone_time
            )?;
        }
        Ok(())
    }
}
