//! Observing strategy tables
//!
//! Each year has a pipe-delimited table `strategy_table_<year>.txt` with one strategy per row.
//! The columns used are:
//!  - 1: strategy name
//!  - 3: sky area [deg^2]
//!  - 4: median i-band depth
//!  - 13: number of i-band visits, optional

use crate::year::Year;
use std::{
    ops::Deref,
    path::{Path, PathBuf},
    str::FromStr,
};

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("cannot find file {0:?} for year {1}")]
    Missing(PathBuf, Year),
    #[error("failed to read the strategy table {1:?}")]
    Csv(#[source] csv::Error, PathBuf),
    #[error("{0:?}, line {1}: expected at least 5 columns, found {2}")]
    Columns(PathBuf, u64, usize),
    #[error("{0:?}, line {1}: invalid {2} {3:?}")]
    Value(PathBuf, u64, &'static str, String),
}
type Result<T> = std::result::Result<T, StrategyError>;

/// Number of i-band visits per year for strategies which table lacks that column
const FALLBACK_VISITS: [(&str, [f64; 4]); 19] = [
    (
        "rolling_10yrs_opsim",
        [19.17009607686149, 67.03196, 140.13828, 233.02816],
    ),
    (
        "rolling_mix_10yrs_opsim",
        [17.827055447412253, 62.7963, 133.4886, 223.60182],
    ),
    (
        "baseline2018a",
        [14.59823342079436, 65.08548, 147.00488, 258.2933],
    ),
    (
        "colossus_2664",
        [13.983119554695064, 64.04174, 143.77374, 252.1407],
    ),
    (
        "colossus_2665",
        [14.675119972692409, 65.4227, 145.51038, 257.6914],
    ),
    (
        "colossus_2667",
        [14.156289402581807, 67.01718, 150.84012, 267.87976],
    ),
    (
        "kraken_2026",
        [15.50727567502652, 67.57038, 150.43662, 267.03468],
    ),
    (
        "kraken_2035",
        [15.751901825752723, 67.16228, 147.68512, 262.56644],
    ),
    (
        "kraken_2036",
        [15.746321613278274, 54.3136, 111.16146, 216.34454],
    ),
    (
        "kraken_2042",
        [
            16.66430918416413,
            72.25023000920037,
            162.07506150123004,
            283.98536,
        ],
    ),
    (
        "kraken_2044",
        [10.745318502725427, 49.68256, 114.5921, 201.4586],
    ),
    (
        "mothra_2045",
        [30.52469022205864, 57.79377338482163, 107.63368, 181.36768],
    ),
    (
        "nexus_2097",
        [11.600585597575709, 49.2615, 105.93476, 196.6197],
    ),
    (
        "pontus_2002",
        [11.785008704101049, 51.90274, 113.13634, 200.76312],
    ),
    (
        "pontus_2489",
        [24.132090956403378, 96.123, 208.12806, 369.85366],
    ),
    ("alt_sched", [19.97984, 56.72922, 112.04002, 185.9261]),
    (
        "alt_sched_rolling",
        [37.47584628358029, 53.85072, 109.68314, 184.13812],
    ),
    (
        "pontus_2502",
        [
            15.488642770841723,
            62.17139085035306,
            129.36377275455092,
            210.57829565913184,
        ],
    ),
    (
        "mothra_2049",
        [24.335122196054208, 45.69528, 103.20514, 188.75324],
    ),
];

/// Returns the tabulated number of visits of a strategy for a given year
pub fn fallback_visits(name: &str, year: Year) -> Option<u32> {
    FALLBACK_VISITS
        .iter()
        .find(|(strategy, _)| *strategy == name)
        .map(|(_, visits)| visits[year.index()].trunc() as u32)
}

/// Observing strategy
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    /// sky area [deg^2]
    pub area: f64,
    /// median i-band depth
    pub depth: f64,
    /// number of i-band visits
    pub visits: u32,
}

/// Strategies of a given year, in table order
#[derive(Debug, Clone)]
pub struct StrategyTable {
    pub year: Year,
    strategies: Vec<Strategy>,
}
impl Deref for StrategyTable {
    type Target = Vec<Strategy>;

    fn deref(&self) -> &Self::Target {
        &self.strategies
    }
}
impl StrategyTable {
    pub fn new(year: Year, strategies: Vec<Strategy>) -> Self {
        Self { year, strategies }
    }
    /// Path to the table of `year` in directory `dir`
    pub fn path<P: AsRef<Path>>(dir: P, year: Year) -> PathBuf {
        dir.as_ref().join(format!("strategy_table_{}.txt", year))
    }
    /// Loads the strategy table of `year` from directory `dir`
    pub fn load<P: AsRef<Path>>(dir: P, year: Year) -> Result<Self> {
        let path = Self::path(dir, year);
        if !path.is_file() {
            return Err(StrategyError::Missing(path, year));
        }
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'|')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| StrategyError::Csv(e, path.clone()))?;
        let mut strategies = vec![];
        for result in rdr.records() {
            let record = result.map_err(|e| StrategyError::Csv(e, path.clone()))?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line());
            let strategy = parse_record(&record, year).map_err(|e| match e {
                RecordError::Columns(n) => StrategyError::Columns(path.clone(), line, n),
                RecordError::Value(field, value) => {
                    StrategyError::Value(path.clone(), line, field, value)
                }
            })?;
            strategies.push(strategy);
        }
        log::info!(
            "Strategy table loaded: {} lines in {:?} for year {}!",
            strategies.len(),
            path,
            year
        );
        Ok(Self::new(year, strategies))
    }
    /// Returns the first strategy named `name`
    pub fn find(&self, name: &str) -> Option<&Strategy> {
        self.iter().find(|s| s.name == name)
    }
    /// Returns the (area, depth) of each strategy
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.iter().map(|s| (s.area, s.depth)).collect()
    }
    /// Returns the number of visits of each strategy
    pub fn visits(&self) -> Vec<u32> {
        self.iter().map(|s| s.visits).collect()
    }
}

enum RecordError {
    Columns(usize),
    Value(&'static str, String),
}

fn parse_field<T: FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    field: &'static str,
) -> std::result::Result<T, RecordError> {
    let value = &record[idx];
    value
        .parse::<T>()
        .map_err(|_| RecordError::Value(field, value.to_string()))
}

fn parse_record(
    record: &csv::StringRecord,
    year: Year,
) -> std::result::Result<Strategy, RecordError> {
    if record.len() < 5 {
        return Err(RecordError::Columns(record.len()));
    }
    let name = record[1].to_string();
    let area = parse_field(record, 3, "area")?;
    let depth = parse_field(record, 4, "depth")?;
    let visits = match record.get(13) {
        Some(value) if record.len() == 14 && !value.is_empty() => {
            parse_field(record, 13, "number of visits")?
        }
        _ => fallback_visits(&name, year).unwrap_or_else(|| {
            log::warn!("no number of visits for {} in {}, set to 0", name, year);
            0
        }),
    };
    Ok(Strategy {
        name,
        area,
        depth,
        visits,
    })
}
