use crate::{
    emulator::{Emulator, Renormalization},
    grid::FomGrids,
    strategy::StrategyTable,
    year::Year,
    Result,
};
use std::{
    env,
    path::{Path, PathBuf},
};

/// Default renormalization strategy
pub const RENORM_STRATEGY: &str = "kraken_2026";

/// Year(s) the renormalization strategy is evaluated in
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RenormScope {
    /// each year is renormalized by the strategy FoM of the same year
    #[default]
    SameYear,
    /// all years are renormalized by the strategy FoM of the given year
    Anchor(Year),
}

/// FoM emulator run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub grid_dir: PathBuf,
    pub table_dir: PathBuf,
    pub figs_dir: PathBuf,
    pub fake_area: bool,
    pub renorm_strategy: Option<String>,
    pub renorm_scope: RenormScope,
    pub plot: bool,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            grid_dir: Path::new("FoM").to_path_buf(),
            table_dir: Path::new(".").to_path_buf(),
            figs_dir: Path::new("figs").to_path_buf(),
            fake_area: false,
            renorm_strategy: Some(RENORM_STRATEGY.to_string()),
            renorm_scope: RenormScope::SameYear,
            plot: false,
        }
    }
}
impl Config {
    /// Default configuration with the directories overridden by
    /// the `FOM_GRID_DIR`, `FOM_TABLE_DIR` and `FOM_FIGS_DIR` environment variables if they are set
    pub fn from_env() -> Self {
        let mut this = Self::default();
        if let Ok(dir) = env::var("FOM_GRID_DIR") {
            this = this.grid_dir(dir);
        }
        if let Ok(dir) = env::var("FOM_TABLE_DIR") {
            this = this.table_dir(dir);
        }
        if let Ok(dir) = env::var("FOM_FIGS_DIR") {
            this = this.figs_dir(dir);
        }
        this
    }
    pub fn grid_dir<P: AsRef<Path>>(self, dir: P) -> Self {
        Self {
            grid_dir: dir.as_ref().to_path_buf(),
            ..self
        }
    }
    pub fn table_dir<P: AsRef<Path>>(self, dir: P) -> Self {
        Self {
            table_dir: dir.as_ref().to_path_buf(),
            ..self
        }
    }
    pub fn figs_dir<P: AsRef<Path>>(self, dir: P) -> Self {
        Self {
            figs_dir: dir.as_ref().to_path_buf(),
            ..self
        }
    }
    /// Fakes the area scaling of the FoM grids, see [FomGrid::fake_area](crate::FomGrid::fake_area)
    pub fn fake_area(self, fake_area: bool) -> Self {
        Self { fake_area, ..self }
    }
    pub fn renorm_strategy<S: Into<String>>(self, name: S) -> Self {
        Self {
            renorm_strategy: Some(name.into()),
            ..self
        }
    }
    /// Reports absolute FoM
    pub fn no_renorm(self) -> Self {
        Self {
            renorm_strategy: None,
            ..self
        }
    }
    /// Renormalizes all years with the strategy FoM of `year`
    pub fn anchor(self, year: Year) -> Self {
        Self {
            renorm_scope: RenormScope::Anchor(year),
            ..self
        }
    }
    pub fn plot(self, plot: bool) -> Self {
        Self { plot, ..self }
    }
    /// Returns whether the FoM with the Stage III prior is emulated
    ///
    /// With faked area scaling, only the FoM without prior is emulated
    pub fn with_prior(&self) -> bool {
        !self.fake_area
    }
    pub fn is_renormalized(&self) -> bool {
        self.renorm_strategy.is_some()
    }
    /// Returns the renormalization for the FoM `grids`
    ///
    /// For an anchored scope, the strategy FoM is evaluated once in the anchor year
    pub fn renormalization(&self, grids: &FomGrids) -> Result<Renormalization> {
        Ok(match (&self.renorm_strategy, self.renorm_scope) {
            (None, _) => Renormalization::None,
            (Some(name), RenormScope::SameYear) => Renormalization::Strategy(name.clone()),
            (Some(name), RenormScope::Anchor(year)) => {
                let strategies = StrategyTable::load(&self.table_dir, year)?;
                let value = Emulator::new(grids.year(year))?.reference_value(&strategies, name)?;
                log::info!("{} {} FoM: {}", name, year, value);
                Renormalization::Value(value)
            }
        })
    }
}
