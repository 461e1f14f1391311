//! FoM emulator
//!
//! The FoM at any (area, depth) is obtained by bilinear interpolation of the FoM grid.
//! Points outside the grid are not extrapolated.

use crate::{
    grid::{FomGrid, Prior},
    strategy::StrategyTable,
    year::Year,
};
use nalgebra::{DMatrix, Matrix3};

#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error("grid {0} must be finite and strictly increasing: {1:?}")]
    Axis(&'static str, [f64; 3]),
    #[error("renormalization strategy {0} not found in {1} strategy table")]
    MissingReference(String, Year),
    #[error("renormalization strategy {0} ({2}, {3}) is outside the {1} grid")]
    OutOfGrid(String, Year, f64, f64),
    #[error("renormalization strategy {0} has a non positive FoM in {1}: {2}")]
    NonPositive(String, Year, f64),
}
type Result<T> = std::result::Result<T, EmulatorError>;

/// 2D interpolation interface
pub trait Interpolate2d {
    /// Interpolated value at (x,y), `None` if (x,y) is outside the interpolation domain
    fn eval(&self, x: f64, y: f64) -> Option<f64>;
    /// Interpolated values at each point
    fn eval_points(&self, points: &[(f64, f64)]) -> Vec<Option<f64>> {
        points.iter().map(|&(x, y)| self.eval(x, y)).collect()
    }
    /// Interpolated values on the mesh `xs`x`ys`, `xs` along the rows
    fn eval_mesh(&self, xs: &[f64], ys: &[f64]) -> DMatrix<Option<f64>> {
        DMatrix::from_fn(xs.len(), ys.len(), |i, j| self.eval(xs[i], ys[j]))
    }
}

/// Bilinear interpolation over a 3x3 rectilinear grid
#[derive(Debug, Clone)]
pub struct Bilinear {
    xs: [f64; 3],
    ys: [f64; 3],
    z: Matrix3<f64>,
}
impl Bilinear {
    /// Creates a bilinear interpolant of `z[(i,j)]` sampled at `(xs[i],ys[j])`
    pub fn new(xs: [f64; 3], ys: [f64; 3], z: Matrix3<f64>) -> Result<Self> {
        let is_valid =
            |v: &[f64; 3]| v.iter().all(|x| x.is_finite()) && v.windows(2).all(|w| w[0] < w[1]);
        if !is_valid(&xs) {
            return Err(EmulatorError::Axis("x", xs));
        }
        if !is_valid(&ys) {
            return Err(EmulatorError::Axis("y", ys));
        }
        Ok(Self { xs, ys, z })
    }
    /// Returns the lower index of the cell containing `v` and the normalized position within the cell
    fn locate(axis: &[f64; 3], v: f64) -> Option<(usize, f64)> {
        if !(axis[0]..=axis[2]).contains(&v) {
            return None;
        }
        let i = if v < axis[1] { 0 } else { 1 };
        Some((i, (v - axis[i]) / (axis[i + 1] - axis[i])))
    }
}
impl Interpolate2d for Bilinear {
    fn eval(&self, x: f64, y: f64) -> Option<f64> {
        let (i, tx) = Self::locate(&self.xs, x)?;
        let (j, ty) = Self::locate(&self.ys, y)?;
        let z = &self.z;
        Some(
            z[(i, j)] * (1. - tx) * (1. - ty)
                + z[(i + 1, j)] * tx * (1. - ty)
                + z[(i, j + 1)] * (1. - tx) * ty
                + z[(i + 1, j + 1)] * tx * ty,
        )
    }
}

/// FoM renormalization
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Renormalization {
    /// absolute FoM
    #[default]
    None,
    /// FoM relative to the emulated FoM of the named strategy
    Strategy(String),
    /// FoM divided by the given value
    Value(f64),
}

/// Emulated FoM of a strategy table
#[derive(Debug, Clone)]
pub struct Emulation {
    pub year: Year,
    pub prior: Prior,
    /// renormalized FoM of each strategy, in table order
    pub foms: Vec<Option<f64>>,
    /// FoM divisor
    pub renorm_value: f64,
    /// ratio of the emulated FoM to the input FoM at the grid nodes
    pub grid_ratio: Matrix3<f64>,
}

/// Emulated FoM on a regular mesh
#[derive(Debug, Clone)]
pub struct FinerMesh {
    pub areas: Vec<f64>,
    pub depths: Vec<f64>,
    /// FoM with areas along the rows and depths along the columns
    pub fom: DMatrix<Option<f64>>,
}
impl FinerMesh {
    pub fn max(&self) -> Option<f64> {
        self.fom.iter().flatten().cloned().reduce(f64::max)
    }
}

fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![min],
        _ => {
            let step = (max - min) / (n - 1) as f64;
            (0..n)
                .map(|k| if k + 1 == n { max } else { min + step * k as f64 })
                .collect()
        }
    }
}

/// FoM emulator of a given year and prior
pub struct Emulator {
    pub year: Year,
    pub prior: Prior,
    grid: Matrix3<f64>,
    interpolant: Bilinear,
}
impl Emulator {
    /// Creates the emulator over the (area, depth) grid of the FoM `grid` year
    pub fn new(grid: &FomGrid) -> Result<Self> {
        Self::from_axes(
            grid.year,
            grid.prior,
            grid.year.areas(),
            grid.year.depths(),
            *grid.fom(),
        )
    }
    /// Creates the emulator from explicit grid `areas` and `depths`
    pub fn from_axes(
        year: Year,
        prior: Prior,
        areas: [f64; 3],
        depths: [f64; 3],
        fom: Matrix3<f64>,
    ) -> Result<Self> {
        Ok(Self {
            year,
            prior,
            grid: fom,
            interpolant: Bilinear::new(areas, depths, fom)?,
        })
    }
    pub fn interpolant(&self) -> &Bilinear {
        &self.interpolant
    }
    /// Emulated FoM at the grid nodes
    pub fn emulated_grid(&self) -> Matrix3<f64> {
        let areas = self.interpolant.xs;
        let depths = self.interpolant.ys;
        Matrix3::from_fn(|i, j| {
            self.interpolant
                .eval(areas[i], depths[j])
                .unwrap_or(f64::NAN)
        })
    }
    /// Ratio of the emulated FoM to the input FoM at the grid nodes
    pub fn grid_ratio(&self) -> Matrix3<f64> {
        self.emulated_grid().component_div(&self.grid)
    }
    /// Emulated FoM of the strategy `name` in `strategies`
    pub fn reference_value(&self, strategies: &StrategyTable, name: &str) -> Result<f64> {
        let reference = strategies
            .find(name)
            .ok_or_else(|| EmulatorError::MissingReference(name.to_string(), self.year))?;
        let value = self
            .interpolant
            .eval(reference.area, reference.depth)
            .ok_or_else(|| {
                EmulatorError::OutOfGrid(
                    name.to_string(),
                    self.year,
                    reference.area,
                    reference.depth,
                )
            })?;
        if value > 0. {
            Ok(value)
        } else {
            Err(EmulatorError::NonPositive(name.to_string(), self.year, value))
        }
    }
    /// Returns the FoM divisor
    pub fn renorm_value(
        &self,
        strategies: &StrategyTable,
        renormalization: &Renormalization,
    ) -> Result<f64> {
        match renormalization {
            Renormalization::None => Ok(1.),
            Renormalization::Strategy(name) => {
                log::info!("Renormalizing by strategy {}", name);
                let value = self.reference_value(strategies, name)?;
                log::info!("Renormalizing by newly-found value {}", value);
                Ok(value)
            }
            Renormalization::Value(value) => {
                log::info!("Renormalizing by pre-existing value {}", value);
                Ok(*value)
            }
        }
    }
    /// Emulates the FoM of each strategy
    pub fn emulate(
        &self,
        strategies: &StrategyTable,
        renormalization: &Renormalization,
    ) -> Result<Emulation> {
        log::info!("Starting {} emulator {}", self.year, self.prior);
        let renorm_value = self.renorm_value(strategies, renormalization)?;
        let foms: Vec<_> = self
            .interpolant
            .eval_points(&strategies.coordinates())
            .into_iter()
            .zip(strategies.iter())
            .map(|(fom, strategy)| {
                if fom.is_none() {
                    log::warn!(
                        "{} ({},{}) is outside the {} grid",
                        strategy.name,
                        strategy.area,
                        strategy.depth,
                        self.year
                    );
                }
                fom.map(|fom| fom / renorm_value)
            })
            .collect();
        Ok(Emulation {
            year: self.year,
            prior: self.prior,
            foms,
            renorm_value,
            grid_ratio: self.grid_ratio(),
        })
    }
    /// Emulated FoM on a `n`x`n` mesh spanning the (area, depth) range of `strategies`
    pub fn finer_mesh(&self, strategies: &StrategyTable, n: usize) -> Option<FinerMesh> {
        let (area_min, area_max) = strategies
            .iter()
            .map(|s| s.area)
            .fold(None, |r: Option<(f64, f64)>, a| {
                Some(r.map_or((a, a), |(min, max)| (min.min(a), max.max(a))))
            })?;
        let (depth_min, depth_max) = strategies
            .iter()
            .map(|s| s.depth)
            .fold(None, |r: Option<(f64, f64)>, d| {
                Some(r.map_or((d, d), |(min, max)| (min.min(d), max.max(d))))
            })?;
        let areas = linspace(area_min, area_max, n);
        let depths = linspace(depth_min, depth_max, n);
        let fom = self.interpolant.eval_mesh(&areas, &depths);
        Some(FinerMesh { areas, depths, fom })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;

    fn grid() -> FomGrid {
        let values: Vec<f64> = (1..=9).map(|k| 10. * k as f64).collect();
        FomGrid::from_values(Year::Y3, Prior::Excluded, &values).unwrap()
    }

    fn strategy(name: &str, area: f64, depth: f64) -> Strategy {
        Strategy {
            name: name.to_string(),
            area,
            depth,
            visits: 0,
        }
    }

    fn table() -> StrategyTable {
        StrategyTable::new(
            Year::Y3,
            vec![
                strategy("kraken_2026", 12500., 25.65),
                strategy("node", 15000., 25.8),
                strategy("wide", 25000., 25.8),
                strategy("corner", 20000., 26.1),
            ],
        )
    }

    #[test]
    fn bilinear_reproduces_nodes() {
        let emulator = Emulator::new(&grid()).unwrap();
        assert_eq!(emulator.emulated_grid(), *grid().fom());
        assert_eq!(emulator.grid_ratio(), Matrix3::repeat(1.));
    }

    #[test]
    fn bilinear_cell_center() {
        let emulator = Emulator::new(&grid()).unwrap();
        // center of the cell [10e3,15e3]x[25.5,25.8]: mean of 10, 20, 40, 50
        let value = emulator.interpolant().eval(12500., 25.65).unwrap();
        assert!((value - 30.).abs() < 1e-9);
        // along the area axis only
        let value = emulator.interpolant().eval(17500., 26.1).unwrap();
        assert!((value - 75.).abs() < 1e-9);
    }

    #[test]
    fn no_extrapolation() {
        let emulator = Emulator::new(&grid()).unwrap();
        let bilinear = emulator.interpolant();
        assert_eq!(bilinear.eval(9999., 25.8), None);
        assert_eq!(bilinear.eval(15000., 26.2), None);
        assert_eq!(bilinear.eval(f64::NAN, 25.8), None);
        assert!(bilinear.eval(20000., 26.1).is_some());
    }

    #[test]
    fn absolute_foms() {
        let emulator = Emulator::new(&grid()).unwrap();
        let emulation = emulator.emulate(&table(), &Renormalization::None).unwrap();
        assert_eq!(emulation.renorm_value, 1.);
        assert_eq!(emulation.foms.len(), 4);
        assert_eq!(emulation.foms[1], Some(50.));
        assert_eq!(emulation.foms[2], None);
        assert_eq!(emulation.foms[3], Some(90.));
    }

    #[test]
    fn reference_strategy_is_unity() {
        let emulator = Emulator::new(&grid()).unwrap();
        let emulation = emulator
            .emulate(
                &table(),
                &Renormalization::Strategy("kraken_2026".to_string()),
            )
            .unwrap();
        assert_eq!(emulation.foms[0], Some(1.));
        assert!((emulation.renorm_value - 30.).abs() < 1e-9);
        assert!((emulation.foms[3].unwrap() - 3.).abs() < 1e-9);
    }

    #[test]
    fn given_divisor() {
        let emulator = Emulator::new(&grid()).unwrap();
        let emulation = emulator
            .emulate(&table(), &Renormalization::Value(10.))
            .unwrap();
        assert_eq!(emulation.foms[1], Some(5.));
    }

    #[test]
    fn reference_errors() {
        let emulator = Emulator::new(&grid()).unwrap();
        assert!(matches!(
            emulator.emulate(&table(), &Renormalization::Strategy("mothra_2049".into())),
            Err(EmulatorError::MissingReference(_, Year::Y3))
        ));
        assert!(matches!(
            emulator.emulate(&table(), &Renormalization::Strategy("wide".into())),
            Err(EmulatorError::OutOfGrid(..))
        ));
    }

    #[test]
    fn axes_must_increase() {
        assert!(matches!(
            Bilinear::new([1., 1., 2.], [0., 1., 2.], Matrix3::zeros()),
            Err(EmulatorError::Axis("x", _))
        ));
        assert!(matches!(
            Bilinear::new([0., 1., 2.], [2., 1., 0.], Matrix3::zeros()),
            Err(EmulatorError::Axis("y", _))
        ));
    }

    #[test]
    fn finer_mesh_spans_strategies() {
        let emulator = Emulator::new(&grid()).unwrap();
        let mesh = emulator.finer_mesh(&table(), 20).unwrap();
        assert_eq!(mesh.areas.len(), 20);
        assert_eq!(mesh.areas[0], 12500.);
        assert_eq!(mesh.areas[19], 25000.);
        assert_eq!(mesh.fom.shape(), (20, 20));
        assert!(mesh.fom[(0, 0)].is_some());
        assert!(mesh.fom[(19, 0)].is_none());
        let max = mesh.max().unwrap();
        assert!(max > 80. && max <= 90.);
        let empty = StrategyTable::new(Year::Y3, vec![]);
        assert!(emulator.finer_mesh(&empty, 20).is_none());
    }
}
