use fstsp_structs::problem::{Instance, DEPOT};
use ordered_float::OrderedFloat;

/// Dense travel times for one instance. Truck times are Euclidean distance
/// scaled by the truck speed factor, drone times are truck times divided by K.
#[derive(Debug, Clone)]
pub struct TravelTimes {
    pub n: usize,
    pub truck: Vec<Vec<f64>>,
    pub drone: Vec<Vec<f64>>,
    pub drone_speed_factor: f64,
    pub drone_range: f64,
}

impl TravelTimes {
    /// Expects an instance that already passed `Instance::validate`.
    pub fn new(instance: &Instance) -> Self {
        let n = instance.num_nodes();
        let truck = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| instance.nodes[i].dist(&instance.nodes[j]) * instance.truck_speed_factor)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let drone = truck
            .iter()
            .map(|row| row.iter().map(|t| t / instance.drone_speed_factor).collect())
            .collect();

        Self {
            n,
            truck,
            drone,
            drone_speed_factor: instance.drone_speed_factor,
            drone_range: instance.drone_range,
        }
    }

    /// Flight time launch -> customer -> rendezvous.
    pub fn sortie_flight(&self, launch: usize, customer: usize, rendezvous: usize) -> f64 {
        self.drone[launch][customer] + self.drone[customer][rendezvous]
    }

    /// Whether a sortie can be beneficial at all. With K <= 1 the drone path
    /// is never shorter than the truck driving through the customer.
    pub fn drone_useful(&self) -> bool {
        self.drone_speed_factor > 1.0
    }

    /// True iff `customer` can be served by a sortie launched at `launch` and
    /// recovered at `rendezvous`: distinct nodes, a customer in the middle,
    /// flight within range, and a direct truck leg short enough that the drone
    /// does not outlast its endurance hovering for the truck.
    ///
    /// Node 0 as `launch` is the depot departure, as `rendezvous` the return.
    pub fn drone_eligible(&self, launch: usize, customer: usize, rendezvous: usize) -> bool {
        if customer == DEPOT || launch == customer || customer == rendezvous || launch == rendezvous {
            return false;
        }
        self.sortie_flight(launch, customer, rendezvous) <= self.drone_range
            && self.truck[launch][rendezvous] <= self.drone_range
    }

    /// All eligible (launch, customer, rendezvous) triples, customers ascending.
    pub fn eligible_sorties(&self) -> Vec<(usize, usize, usize)> {
        let mut triples = Vec::new();
        for customer in 1..self.n {
            for launch in 0..self.n {
                for rendezvous in 0..self.n {
                    if self.drone_eligible(launch, customer, rendezvous) {
                        triples.push((launch, customer, rendezvous));
                    }
                }
            }
        }
        triples
    }

    pub fn longest_truck_leg(&self) -> f64 {
        self.truck
            .iter()
            .flat_map(|row| row.iter())
            .map(|t| OrderedFloat(*t))
            .max()
            .map(|t| t.0)
            .unwrap_or(0.0)
    }
}
