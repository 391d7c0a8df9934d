use fstsp_structs::InputError;
use thiserror::Error;

/// Instances that are well-formed but cannot be modelled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("an instance needs the depot and at least one customer, got {0} nodes")]
    TooFewNodes(usize),
    #[error("drone range must be positive, got {0}")]
    ZeroRange(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("solver backend failed: {0}")]
    Backend(String),
    #[error("solver stopped at the time limit without an incumbent")]
    NoIncumbent,
    #[error("solver returned {got} values for {expected} variables")]
    ValueCount { expected: usize, got: usize },
}

/// A solver assignment that does not describe a valid delivery plan. Apart
/// from subtours, which the solve loop cuts off, these indicate a modelling
/// bug rather than bad input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("binary variable {var} has fractional value {value}")]
    Fractional { var: u32, value: f64 },
    #[error("depot has truck out-degree {out_degree} and in-degree {in_degree}")]
    DepotDegree { out_degree: usize, in_degree: usize },
    #[error("node {node} has truck out-degree {out_degree} and in-degree {in_degree}")]
    TruckDegree {
        node: usize,
        out_degree: usize,
        in_degree: usize,
    },
    #[error("customer {customer} is served {times} times")]
    ServiceCount { customer: usize, times: usize },
    #[error("sortie {launch}->{customer}->{rendezvous} uses a node off the truck route")]
    SortieOffRoute {
        launch: usize,
        customer: usize,
        rendezvous: usize,
    },
    #[error("sortie {launch}->{customer}->{rendezvous} lands before it launches")]
    SortieOrder {
        launch: usize,
        customer: usize,
        rendezvous: usize,
    },
    #[error("sortie serving {customer} flies {flight} but range is {range}")]
    RangeExceeded { customer: usize, flight: f64, range: f64 },
    #[error("sortie serving {customer} stays airborne {airborne} but range is {range}")]
    EnduranceExceeded {
        customer: usize,
        airborne: f64,
        range: f64,
    },
    #[error("sorties serving {first} and {second} overlap")]
    OverlappingSorties { first: usize, second: usize },
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("no combined truck and drone route satisfies the constraints")]
    Infeasible,
    #[error("solver reported the model as unbounded")]
    Unbounded,
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("truck route still has subtours after {rounds} cut rounds")]
    CutLimitExceeded { rounds: usize },
}
