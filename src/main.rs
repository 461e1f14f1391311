use fom_emulator::{report, run, Config, Year};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "fom-emulator",
    about = "Ranking LSST observing strategies by emulated dark energy FoM"
)]
struct Opt {
    /// Path to the FoM grid files directory
    #[structopt(long)]
    grid_dir: Option<String>,
    /// Path to the strategy tables directory
    #[structopt(long)]
    table_dir: Option<String>,
    /// Path to the figures directory
    #[structopt(long)]
    figs_dir: Option<String>,
    /// Fake the FoM area scaling from the grid diagonals
    #[structopt(long)]
    fake_area: bool,
    /// Renormalization strategy [default: kraken_2026]
    #[structopt(long)]
    renorm: Option<String>,
    /// Report absolute FoM
    #[structopt(long, conflicts_with = "renorm")]
    no_renorm: bool,
    /// Renormalize all years with the strategy FoM of that year (Y1, Y3, Y6 or Y10)
    #[structopt(long)]
    renorm_year: Option<Year>,
    /// Save rankings to CSV file
    #[structopt(long)]
    csv: Option<String>,
    /// Plot the FoM grids and the emulator diagnostics
    #[structopt(short, long)]
    plot: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let mut config = Config::from_env();
    if let Some(arg) = opt.grid_dir {
        config = config.grid_dir(arg);
    }
    if let Some(arg) = opt.table_dir {
        config = config.table_dir(arg);
    }
    if let Some(arg) = opt.figs_dir {
        config = config.figs_dir(arg);
    }
    config = config.fake_area(opt.fake_area);
    if let Some(arg) = opt.renorm {
        config = config.renorm_strategy(arg);
    }
    if opt.no_renorm {
        config = config.no_renorm();
    }
    if let Some(arg) = opt.renorm_year {
        config = config.anchor(arg);
    }
    if opt.plot && cfg!(not(feature = "plot")) {
        log::warn!("fom-emulator was built without the `plot` feature, no figure will be drawn");
    }
    config = config.plot(opt.plot);

    let rankings = run(&config)?;
    for ranking in &rankings {
        ranking.summary();
    }
    if let Some(path) = opt.csv {
        report::to_csv(&rankings, &path)?;
        log::info!("Rankings written to {}", path);
    }

    Ok(())
}
