use std::fmt;

use crate::{error::SolverError, extsolvers::LPSolver};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(pub u32);

impl Var {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RowFamily {
    Degree,
    SingleService,
    SubtourMtz,
    SortieValidity,
    Timing,
    Endurance,
    DroneCapacity,
    SubtourCut,
}

#[derive(Debug, Clone)]
pub struct VarDef {
    pub cost: f64,
    pub lb: f64,
    pub ub: f64,
    pub binary: bool,
}

#[derive(Debug, Clone)]
pub struct Row {
    pub family: RowFamily,
    pub lb: f64,
    pub ub: f64,
    pub idxs: Vec<Var>,
    pub coeffs: Vec<f64>,
}

impl Row {
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.idxs
            .iter()
            .zip(self.coeffs.iter())
            .map(|(v, c)| c * values[v.idx()])
            .sum()
    }
}

/// A minimization MILP held independently of any solver backend. Rows are
/// ranges `lb <= a.x <= ub` where either side may be infinite.
#[derive(Debug, Clone, Default)]
pub struct Milp {
    pub vars: Vec<VarDef>,
    pub rows: Vec<Row>,
}

impl Milp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn add_var(&mut self, cost: f64, lb: f64, ub: f64) -> Var {
        let var = Var(self.vars.len() as u32);
        self.vars.push(VarDef {
            cost,
            lb,
            ub,
            binary: false,
        });
        var
    }

    pub fn add_binary(&mut self, cost: f64) -> Var {
        let var = self.add_var(cost, 0.0, 1.0);
        self.vars[var.idx()].binary = true;
        var
    }

    pub fn add_constraint(&mut self, family: RowFamily, lb: f64, ub: f64, idxs: &[Var], coeffs: &[f64]) {
        assert!(idxs.len() == coeffs.len());
        self.rows.push(Row {
            family,
            lb,
            ub,
            idxs: idxs.to_vec(),
            coeffs: coeffs.to_vec(),
        });
    }

    pub fn rows_of(&self, family: RowFamily) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |r| r.family == family)
    }

    pub fn objective(&self, values: &[f64]) -> f64 {
        self.vars.iter().zip(values.iter()).map(|(v, x)| v.cost * x).sum()
    }

    /// Every violated bound or row under tolerance `tol`, checked without a
    /// solver. Row violations are reported with their family and row index.
    pub fn violations(&self, values: &[f64], tol: f64) -> Vec<Violation> {
        let mut out = Vec::new();
        if values.len() != self.vars.len() {
            out.push(Violation::Length {
                expected: self.vars.len(),
                got: values.len(),
            });
            return out;
        }

        for (idx, (def, x)) in self.vars.iter().zip(values.iter()).enumerate() {
            let integral = !def.binary || (x - x.round()).abs() <= tol;
            if *x < def.lb - tol || *x > def.ub + tol || !integral {
                out.push(Violation::Bound { var: Var(idx as u32), value: *x });
            }
        }

        for (idx, row) in self.rows.iter().enumerate() {
            let activity = row.activity(values);
            if activity < row.lb - tol || activity > row.ub + tol {
                out.push(Violation::Row {
                    family: row.family,
                    row: idx,
                    activity,
                });
            }
        }
        out
    }

    /// Load the model into a fresh backend instance.
    pub fn load_into<LP: LPSolver>(&self, lp: &mut LP) -> Result<Vec<LP::Var>, SolverError> {
        let mut vars = Vec::with_capacity(self.vars.len());
        for def in self.vars.iter() {
            let var = lp.add_var(def.cost)?;
            lp.set_bounds(var, def.lb, def.ub)?;
            if def.binary {
                lp.set_binary(var)?;
            }
            vars.push(var);
        }

        let inf = lp.inf();
        let clamp = |x: f64| if x.is_infinite() { x.signum() * inf } else { x };

        let mut idxs = Vec::new();
        for row in self.rows.iter() {
            idxs.clear();
            idxs.extend(row.idxs.iter().map(|v| vars[v.idx()]));
            lp.add_constraint(clamp(row.lb), clamp(row.ub), &idxs, &row.coeffs)?;
        }
        Ok(vars)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    Length { expected: usize, got: usize },
    Bound { var: Var, value: f64 },
    Row { family: RowFamily, row: usize, activity: f64 },
}

impl Violation {
    pub fn family(&self) -> Option<RowFamily> {
        match self {
            Violation::Row { family, .. } => Some(*family),
            _ => None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Length { expected, got } => {
                write!(f, "assignment has {} values, model has {} variables", got, expected)
            }
            Violation::Bound { var, value } => write!(f, "x{} = {} is out of bounds", var.0, value),
            Violation::Row { family, row, activity } => {
                write!(f, "{:?} row {} violated (activity {})", family, row, activity)
            }
        }
    }
}
