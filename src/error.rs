use crate::{
    emulator::EmulatorError, grid::GridError, strategy::StrategyError, year::YearError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `year` module")]
    Year(#[from] YearError),
    #[error("Error in the `grid` module")]
    Grid(#[from] GridError),
    #[error("Error in the `strategy` module")]
    Strategy(#[from] StrategyError),
    #[error("Error in the `emulator` module")]
    Emulator(#[from] EmulatorError),
    #[cfg(feature = "plot")]
    #[error("Error in the `plot` module")]
    Plot(#[from] crate::plot::PlotError),
    #[error("Failed to write the rankings")]
    Csv(#[from] csv::Error),
}
pub type Result<T> = std::result::Result<T, Error>;
