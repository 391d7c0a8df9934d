use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Point;

pub const DEPOT: usize = 0;

/// A static FSTSP instance. Node 0 is the depot, every other node is a
/// customer that must be served exactly once by the truck or the drone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub nodes: Vec<Point>,
    /// Truck travel time per unit of Euclidean distance.
    pub truck_speed_factor: f64,
    /// How many times faster the drone flies than the truck drives (K).
    pub drone_speed_factor: f64,
    /// Drone endurance, in the same time unit as truck travel times.
    pub drone_range: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Depot,
    Customer,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub id: usize,
    pub loc: Point,
    pub role: NodeRole,
}

/// Malformed instance data, detected before any model is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("node {node} has a non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate { node: usize, x: f64, y: f64 },
    #[error("truck speed factor must be positive and finite, got {0}")]
    TruckSpeed(f64),
    #[error("drone speed factor must be positive and finite, got {0}")]
    DroneSpeed(f64),
    #[error("drone range must be non-negative and finite, got {0}")]
    DroneRange(f64),
    #[error("customer {node} coincides with the depot")]
    CustomerAtDepot { node: usize },
}

impl Instance {
    pub fn new(
        nodes: Vec<Point>,
        truck_speed_factor: f64,
        drone_speed_factor: f64,
        drone_range: f64,
    ) -> Self {
        Self {
            nodes,
            truck_speed_factor,
            drone_speed_factor,
            drone_range,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn customers(&self) -> impl Iterator<Item = usize> {
        1..self.nodes.len()
    }

    pub fn node(&self, id: usize) -> Node {
        Node {
            id,
            loc: self.nodes[id],
            role: if id == DEPOT {
                NodeRole::Depot
            } else {
                NodeRole::Customer
            },
        }
    }

    pub fn validate(&self) -> Result<(), InputError> {
        for (node, p) in self.nodes.iter().enumerate() {
            if !p.is_finite() {
                return Err(InputError::NonFiniteCoordinate { node, x: p.x, y: p.y });
            }
        }

        if !(self.truck_speed_factor.is_finite() && self.truck_speed_factor > 0.0) {
            return Err(InputError::TruckSpeed(self.truck_speed_factor));
        }
        if !(self.drone_speed_factor.is_finite() && self.drone_speed_factor > 0.0) {
            return Err(InputError::DroneSpeed(self.drone_speed_factor));
        }
        if !(self.drone_range.is_finite() && self.drone_range >= 0.0) {
            return Err(InputError::DroneRange(self.drone_range));
        }

        if let Some(depot) = self.nodes.first() {
            if let Some(node) = self.customers().find(|c| self.nodes[*c].eq_xy(depot)) {
                return Err(InputError::CustomerAtDepot { node });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Instance {
        Instance::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
            1.0,
            2.0,
            30.0,
        )
    }

    #[test]
    fn accepts_well_formed_instance() {
        assert_eq!(square().validate(), Ok(()));
        assert_eq!(square().customers().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(square().node(0).role, NodeRole::Depot);
        assert_eq!(square().node(2).role, NodeRole::Customer);
    }

    #[test]
    fn rejects_nan_coordinate() {
        let mut instance = square();
        instance.nodes[2].y = f64::NAN;
        assert!(matches!(
            instance.validate(),
            Err(InputError::NonFiniteCoordinate { node: 2, .. })
        ));
    }

    #[test]
    fn rejects_bad_speed_and_range() {
        let mut instance = square();
        instance.drone_speed_factor = 0.0;
        assert_eq!(instance.validate(), Err(InputError::DroneSpeed(0.0)));

        let mut instance = square();
        instance.truck_speed_factor = -1.0;
        assert_eq!(instance.validate(), Err(InputError::TruckSpeed(-1.0)));

        let mut instance = square();
        instance.drone_range = -5.0;
        assert_eq!(instance.validate(), Err(InputError::DroneRange(-5.0)));
    }

    #[test]
    fn rejects_customer_on_depot() {
        let mut instance = square();
        instance.nodes[3] = Point::new(0.0, 0.0);
        assert_eq!(
            instance.validate(),
            Err(InputError::CustomerAtDepot { node: 3 })
        );
    }

    #[test]
    fn reads_json_instance() {
        let instance: Instance = serde_json::from_str(
            r#"{
                "nodes": [{"x": 0.0, "y": 0.0}, {"x": 3.0, "y": 4.0}],
                "truck_speed_factor": 1.0,
                "drone_speed_factor": 2.0,
                "drone_range": 20.0
            }"#,
        )
        .unwrap();
        assert_eq!(instance.num_nodes(), 2);
        assert_eq!(instance.nodes[0].dist(&instance.nodes[1]), 5.0);
    }
}
