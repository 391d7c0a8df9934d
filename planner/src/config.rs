use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Default)]
pub enum ObjectiveKind {
    /// Minimize the wall-clock time at which the truck is back at the depot,
    /// including any time spent waiting for the drone.
    #[default]
    Synchronized,
    /// Sum of truck arc times and sortie flight times, counted independently.
    Additive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Default)]
pub enum SubtourPolicy {
    /// Position variables with Miller-Tucker-Zemlin rows.
    Mtz,
    /// No position variables; subtours are cut off after each solve.
    LazyCuts,
    /// `Mtz` up to `lazy_threshold` nodes, `LazyCuts` above.
    #[default]
    Auto,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub time_limit_seconds: f64,
    pub objective: ObjectiveKind,
    pub subtour_policy: SubtourPolicy,
    pub lazy_threshold: usize,
    /// Largest distance from an integer at which a binary still counts as integral.
    pub integrality_tolerance: f64,
    /// Cap on solve-validate-recut rounds, defaults to four per node.
    pub max_cut_rounds: Option<usize>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            time_limit_seconds: 60.0,
            objective: ObjectiveKind::default(),
            subtour_policy: SubtourPolicy::default(),
            lazy_threshold: 25,
            integrality_tolerance: 1e-6,
            max_cut_rounds: None,
        }
    }
}

impl PlannerConfig {
    pub fn uses_mtz(&self, num_nodes: usize) -> bool {
        match self.subtour_policy {
            SubtourPolicy::Mtz => true,
            SubtourPolicy::LazyCuts => false,
            SubtourPolicy::Auto => num_nodes <= self.lazy_threshold,
        }
    }

    pub fn cut_rounds(&self, num_nodes: usize) -> usize {
        self.max_cut_rounds.unwrap_or(4 * num_nodes.max(1))
    }
}
