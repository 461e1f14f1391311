//! Diagnostic plots
//!
//! All the figures are SVG images of FoM values in the (area, depth) plane,
//! colored with the red-yellow-blue color map.

use crate::{
    emulator::{Emulation, Emulator, FinerMesh},
    grid::FomGrid,
    strategy::StrategyTable,
};
use nalgebra::Matrix3;
use plotters::{coord::types::RangedCoordf64, prelude::*};
use std::{
    error::Error,
    fs, io,
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("failed to create figure directory {1:?}")]
    Io(#[source] io::Error, PathBuf),
    #[error("failed to draw {1:?}")]
    Drawing(#[source] Box<dyn Error + Send + Sync>, PathBuf),
}
type Result<T> = std::result::Result<T, PlotError>;
type DrawResult = std::result::Result<(), Box<dyn Error + Send + Sync>>;
type Chart<'a, 'b> =
    ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Number of mesh points along area and depth of the finer emulated FoM map
pub const FINER_MESH_SIZE: usize = 20;
/// Number of iso-FoM lines of the contour map
pub const CONTOUR_LEVELS: usize = 15;

fn color(value: f64) -> RGBColor {
    let c = colorous::RED_YELLOW_BLUE.eval_continuous(if value.is_finite() {
        value.clamp(0., 1.)
    } else {
        0.
    });
    RGBColor(c.r, c.g, c.b)
}

fn padded(range: (f64, f64)) -> std::ops::Range<f64> {
    let span = range.1 - range.0;
    let pad = if span > 0. { 5e-2 * span } else { 1. };
    range.0 - pad..range.1 + pad
}

fn figure<F>(
    path: &Path,
    title: &str,
    areas: (f64, f64),
    depths: (f64, f64),
    draw: F,
) -> Result<()>
where
    F: FnOnce(&mut Chart<'_, '_>) -> DrawResult,
{
    log::info!("Drawing {:?}", path);
    let result = (|| -> DrawResult {
        let plot = SVGBackend::new(path, (768, 512)).into_drawing_area();
        plot.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&plot)
            .caption(title, ("sans-serif", 20))
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .margin(10)
            .build_cartesian_2d(padded(areas), padded(depths))?;
        chart
            .configure_mesh()
            .x_desc("Area [sq. deg.]")
            .y_desc("Median i-band depth")
            .draw()?;
        draw(&mut chart)?;
        plot.present()?;
        Ok(())
    })();
    result.map_err(|e| PlotError::Drawing(e, path.to_path_buf()))
}

/// Grid values colored by `values/scale`
fn grid_scatter(
    path: &Path,
    title: &str,
    grid: &FomGrid,
    values: &Matrix3<f64>,
    scale: f64,
) -> Result<()> {
    let areas = grid.year.areas();
    let depths = grid.year.depths();
    figure(path, title, (areas[0], areas[2]), (depths[0], depths[2]), |chart| {
        chart.draw_series(
            (0..3)
                .flat_map(|i| (0..3).map(move |j| (i, j)))
                .map(|(i, j)| {
                    Circle::new(
                        (areas[i], depths[j]),
                        8,
                        color(values[(i, j)] / scale).filled(),
                    )
                }),
        )?;
        Ok(())
    })
}

/// Strategies as crosses when the number of visits is unknown,
/// or as disks scaled with the number of visits otherwise
fn strategy_markers(chart: &mut Chart<'_, '_>, strategies: &StrategyTable) -> DrawResult {
    let (with_visits, without_visits): (Vec<_>, Vec<_>) =
        strategies.iter().partition(|s| s.visits > 0);
    chart.draw_series(
        without_visits
            .iter()
            .map(|s| Cross::new((s.area, s.depth), 4, BLACK)),
    )?;
    if !with_visits.is_empty() {
        let mean_visits = with_visits.iter().map(|s| s.visits as f64).sum::<f64>()
            / with_visits.len() as f64;
        chart.draw_series(with_visits.iter().map(|s| {
            let size = 20. * (s.visits as f64 / mean_visits).powi(3);
            Circle::new(
                (s.area, s.depth),
                (size.sqrt() / 2.).max(1.) as i32,
                BLACK.filled(),
            )
        }))?;
    }
    Ok(())
}

/// Mesh cells colored by their lower corner value mapped from `range` to [0,1]
fn mesh_cells(
    chart: &mut Chart<'_, '_>,
    mesh: &FinerMesh,
    scale: f64,
    range: (f64, f64),
) -> DrawResult {
    let (n, m) = mesh.fom.shape();
    let span = if range.1 > range.0 { range.1 - range.0 } else { 1. };
    chart.draw_series(
        (0..n.saturating_sub(1))
            .flat_map(|i| (0..m.saturating_sub(1)).map(move |j| (i, j)))
            .filter_map(|(i, j)| {
                mesh.fom[(i, j)].map(|v| {
                    Rectangle::new(
                        [
                            (mesh.areas[i], mesh.depths[j]),
                            (mesh.areas[i + 1], mesh.depths[j + 1]),
                        ],
                        color((v / scale - range.0) / span).filled(),
                    )
                })
            }),
    )?;
    Ok(())
}

/// Iso-value segments of the mesh at `level`, with the FoM divided by `scale`
///
/// Each mesh cell is split by marching squares, cells with a missing corner are skipped
fn iso_segments(mesh: &FinerMesh, scale: f64, level: f64) -> Vec<[(f64, f64); 2]> {
    let (n, m) = mesh.fom.shape();
    let mut segments = vec![];
    for i in 0..n.saturating_sub(1) {
        for j in 0..m.saturating_sub(1) {
            let corners = [(i, j), (i + 1, j), (i + 1, j + 1), (i, j + 1)];
            let Some(values) = corners
                .iter()
                .map(|&idx| mesh.fom[idx].map(|v| v / scale))
                .collect::<Option<Vec<f64>>>()
            else {
                continue;
            };
            let crossings: Vec<(f64, f64)> = (0..4)
                .filter_map(|k| {
                    let (a, b) = (values[k], values[(k + 1) % 4]);
                    if (a < level) == (b < level) {
                        return None;
                    }
                    let t = (level - a) / (b - a);
                    let (ia, ja) = corners[k];
                    let (ib, jb) = corners[(k + 1) % 4];
                    Some((
                        mesh.areas[ia] + t * (mesh.areas[ib] - mesh.areas[ia]),
                        mesh.depths[ja] + t * (mesh.depths[jb] - mesh.depths[ja]),
                    ))
                })
                .collect();
            segments.extend(crossings.chunks_exact(2).map(|p| [p[0], p[1]]));
        }
    }
    segments
}

/// Black iso-lines at `CONTOUR_LEVELS` levels evenly spread within `range`
fn iso_lines(
    chart: &mut Chart<'_, '_>,
    mesh: &FinerMesh,
    scale: f64,
    range: (f64, f64),
) -> DrawResult {
    let step = (range.1 - range.0) / (CONTOUR_LEVELS + 1) as f64;
    if step.is_nan() || step <= 0. {
        return Ok(());
    }
    for k in 1..=CONTOUR_LEVELS {
        let level = range.0 + step * k as f64;
        chart.draw_series(
            iso_segments(mesh, scale, level)
                .into_iter()
                .map(|[a, b]| PathElement::new(vec![a, b], BLACK)),
        )?;
    }
    Ok(())
}

fn create_dir(figs_dir: &Path) -> Result<()> {
    fs::create_dir_all(figs_dir).map_err(|e| PlotError::Io(e, figs_dir.to_path_buf()))
}

/// Plots the FoM grids of a year, as given and rescaled to the reference area
///
/// The colors are scaled by the maximum over both grids,
/// the grid with prior is drawn only if `with_prior` is set
pub fn grids(
    figs_dir: &Path,
    noprior: &FomGrid,
    prior: &FomGrid,
    with_prior: bool,
) -> Result<()> {
    create_dir(figs_dir)?;
    let max_val = [noprior, prior]
        .iter()
        .map(|g| g.max().max(g.area_rescaled().max()))
        .fold(f64::NEG_INFINITY, f64::max);
    let year = noprior.year;
    if with_prior {
        grid_scatter(
            &figs_dir.join(format!("fom_emulator_{}_prior.svg", year)),
            &format!("FoM/{} (with Stage III prior)", max_val.trunc()),
            prior,
            prior.fom(),
            max_val,
        )?;
        grid_scatter(
            &figs_dir.join(format!("fom_emulator_{}_prior_rescaled.svg", year)),
            &format!("(Rescaled FoM with Stage III prior)/{}", max_val.trunc()),
            prior,
            &prior.area_rescaled(),
            max_val,
        )?;
    }
    grid_scatter(
        &figs_dir.join(format!("fom_emulator_{}_noprior.svg", year)),
        &format!("FoM/{} (no prior)", max_val.trunc()),
        noprior,
        noprior.fom(),
        max_val,
    )?;
    grid_scatter(
        &figs_dir.join(format!("fom_emulator_{}_noprior_rescaled.svg", year)),
        &format!("(Rescaled FoM without prior)/{}", max_val.trunc()),
        noprior,
        &noprior.area_rescaled(),
        max_val,
    )
}

/// Plots the emulator diagnostics of a year
///
/// `reference` is the title of the renormalization strategy, if any
pub fn emulation(
    figs_dir: &Path,
    grid: &FomGrid,
    emulator: &Emulator,
    strategies: &StrategyTable,
    emulation: &Emulation,
    reference: Option<&str>,
) -> Result<()> {
    create_dir(figs_dir)?;
    let prefix = format!("test_{}_{}", emulation.prior.label(), emulation.year);
    let areas = grid.year.areas();
    let depths = grid.year.depths();

    grid_scatter(
        &figs_dir.join(format!("{}_ratio.svg", prefix)),
        "Emulator ratio - 0.5",
        grid,
        &emulation.grid_ratio.add_scalar(-0.5),
        1.,
    )?;

    let Some(mesh) = emulator.finer_mesh(strategies, FINER_MESH_SIZE) else {
        log::warn!("no strategy in {}, skipping the finer FoM maps", emulation.year);
        return Ok(());
    };
    let Some(mesh_max) = mesh.max() else {
        log::warn!("finer FoM map outside the {} grid", emulation.year);
        return Ok(());
    };
    let area_range = (
        mesh.areas[0].min(areas[0]),
        mesh.areas[mesh.areas.len() - 1].max(areas[2]),
    );
    let depth_range = (
        mesh.depths[0].min(depths[0]),
        mesh.depths[mesh.depths.len() - 1].max(depths[2]),
    );

    figure(
        &figs_dir.join(format!("{}_finer.svg", prefix)),
        "Emulated FoM / max",
        area_range,
        depth_range,
        |chart| {
            let fom = &mesh.fom;
            let mesh_depths = &mesh.depths;
            chart.draw_series(mesh.areas.iter().enumerate().flat_map(|(i, &area)| {
                mesh_depths.iter().enumerate().filter_map(move |(j, &depth)| {
                    fom[(i, j)]
                        .map(|v| Circle::new((area, depth), 6, color(v / mesh_max).filled()))
                })
            }))?;
            strategy_markers(chart, strategies)
        },
    )?;

    let renorm = emulation.renorm_value;
    let (vmin, vmax) = mesh
        .fom
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
            (min.min(v / renorm), max.max(v / renorm))
        });
    let title = match reference {
        Some(name) => format!("Emulated FoM versus {}", name),
        None => String::from("Emulated FoM"),
    };
    figure(
        &figs_dir.join(format!("{}_contour.svg", prefix)),
        &title,
        area_range,
        depth_range,
        |chart| {
            mesh_cells(chart, &mesh, renorm, (vmin, vmax))?;
            iso_lines(chart, &mesh, renorm, (vmin, vmax))?;
            strategy_markers(chart, strategies)
        },
    )
}
