//! # LSST dark energy FoM emulator
//!
//! Emulates the dark energy Figure of Merit (FoM) of LSST observing strategies
//! by interpolating FoM values precomputed on a grid of sky areas and median i-band depths,
//! and ranks the strategies of each survey year.
//!
//! ```no_run
//! use fom_emulator::{run, Config};
//!
//! let config = Config::from_env().grid_dir("FoM").table_dir(".");
//! for ranking in run(&config)? {
//!     ranking.summary();
//! }
//! # Ok::<(), fom_emulator::Error>(())
//! ```

pub mod analysis;
pub mod config;
pub mod emulator;
pub mod error;
pub mod grid;
#[cfg(feature = "plot")]
pub mod plot;
pub mod report;
pub mod strategy;
pub mod year;

pub use analysis::{run, Analysis};
pub use config::{Config, RenormScope};
pub use emulator::{Bilinear, Emulation, Emulator, EmulatorError, Interpolate2d, Renormalization};
pub use error::{Error, Result};
pub use grid::{FomGrid, FomGrids, GridError, GridLoader, Prior};
pub use report::Ranking;
pub use strategy::{Strategy, StrategyError, StrategyTable};
pub use year::{Year, YearError};
