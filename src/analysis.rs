//! Survey strategies FoM analysis
//!
//! For each year, the strategies are ranked according to their emulated FoM

use crate::{
    config::Config,
    emulator::{Emulation, Emulator, Renormalization},
    grid::{FomGrid, FomGrids, GridLoader, Prior},
    report::Ranking,
    strategy::StrategyTable,
    year::Year,
    Result,
};
use strum::IntoEnumIterator;

/// FoM grids with and without prior
///
/// The grids with prior are loaded in fake-area mode too: they set the color scale of the grid plots
pub struct Grids {
    pub noprior: FomGrids,
    pub prior: FomGrids,
}
impl Grids {
    /// Loads the FoM grids of all the years
    pub fn load(config: &Config) -> Result<Self> {
        let loader = |prior: Prior| {
            GridLoader::default()
                .data_path(&config.grid_dir)
                .prior(prior)
                .fake_area(config.fake_area)
                .load()
        };
        let prior = loader(Prior::Included)?;
        log::info!("{}", prior.year(Year::Y1));
        let noprior = loader(Prior::Excluded)?;
        log::info!("{}", noprior.year(Year::Y1));
        Ok(Self { noprior, prior })
    }
}

/// Strategy ranking pipeline
pub struct Analysis<'a> {
    config: &'a Config,
    grids: Grids,
}
impl<'a> Analysis<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        Ok(Self {
            config,
            grids: Grids::load(config)?,
        })
    }
    pub fn grids(&self) -> &Grids {
        &self.grids
    }
    /// Emulates the FoM of the `strategies` for the given FoM `grid`
    fn emulate(
        &self,
        grid: &FomGrid,
        strategies: &StrategyTable,
        renormalization: &Renormalization,
    ) -> Result<Emulation> {
        let emulator = Emulator::new(grid)?;
        let emulation = emulator.emulate(strategies, renormalization)?;
        #[cfg(feature = "plot")]
        if self.config.plot {
            use crate::config::RenormScope;
            let reference = self.config.renorm_strategy.as_ref().map(|name| {
                let year = match self.config.renorm_scope {
                    RenormScope::SameYear => grid.year,
                    RenormScope::Anchor(year) => year,
                };
                format!("{} {}", name, year)
            });
            crate::plot::emulation(
                &self.config.figs_dir,
                grid,
                &emulator,
                strategies,
                &emulation,
                reference.as_deref(),
            )?;
        }
        Ok(emulation)
    }
    /// Ranks the strategies of each year
    pub fn rankings(&self) -> Result<Vec<Ranking>> {
        let config = self.config;
        let grids = &self.grids;
        let noprior_renorm = config.renormalization(&grids.noprior)?;
        let prior_renorm = config
            .with_prior()
            .then(|| config.renormalization(&grids.prior))
            .transpose()?;
        Year::iter()
            .map(|year| -> Result<Ranking> {
                #[cfg(feature = "plot")]
                if config.plot {
                    crate::plot::grids(
                        &config.figs_dir,
                        grids.noprior.year(year),
                        grids.prior.year(year),
                        config.with_prior(),
                    )?;
                }
                let strategies = StrategyTable::load(&config.table_dir, year)?;
                let noprior =
                    self.emulate(grids.noprior.year(year), &strategies, &noprior_renorm)?;
                let prior = prior_renorm
                    .as_ref()
                    .map(|renorm| self.emulate(grids.prior.year(year), &strategies, renorm))
                    .transpose()?;
                Ok(Ranking::new(
                    strategies,
                    noprior,
                    prior,
                    config.is_renormalized(),
                ))
            })
            .collect()
    }
}

/// Ranks the strategies of each year according to `config`
pub fn run(config: &Config) -> Result<Vec<Ranking>> {
    Analysis::new(config)?.rankings()
}
