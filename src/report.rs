//! Strategy rankings

use crate::{emulator::Emulation, strategy::StrategyTable, year::Year, Result};
use itertools::Itertools;
use serde::Serialize;
use std::{cmp::Ordering, fmt, path::Path};

/// Descending order with the missing values last
fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Serialize)]
struct Record<'a> {
    year: String,
    strategy: &'a str,
    area: f64,
    depth: f64,
    visits: u32,
    fom_noprior: Option<f64>,
    fom_prior: Option<f64>,
}

/// Strategies of a given year ranked by emulated FoM without prior
pub struct Ranking {
    pub year: Year,
    pub strategies: StrategyTable,
    pub noprior: Emulation,
    pub prior: Option<Emulation>,
    renormalized: bool,
    order: Vec<usize>,
}
impl Ranking {
    pub fn new(
        strategies: StrategyTable,
        noprior: Emulation,
        prior: Option<Emulation>,
        renormalized: bool,
    ) -> Self {
        let order = (0..strategies.len())
            .sorted_by(|&a, &b| descending(noprior.foms[a], noprior.foms[b]))
            .collect();
        Self {
            year: strategies.year,
            strategies,
            noprior,
            prior,
            renormalized,
            order,
        }
    }
    /// Strategy indices from best to worst
    pub fn order(&self) -> &[usize] {
        &self.order
    }
    /// Strategy names from best to worst
    pub fn names(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&k| self.strategies[k].name.as_str())
            .collect()
    }
    fn fom_string(&self, fom: Option<f64>) -> String {
        match fom {
            Some(fom) if self.renormalized => format!("{:.6}", fom),
            Some(fom) => format!("{}", fom.trunc() as i64),
            None => String::from("n/a"),
        }
    }
    pub fn summary(&self) {
        println!("{}", self);
    }
    fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.order.iter().map(move |&k| {
            let strategy = &self.strategies[k];
            Record {
                year: self.year.to_string(),
                strategy: strategy.name.as_str(),
                area: strategy.area,
                depth: strategy.depth,
                visits: strategy.visits,
                fom_noprior: self.noprior.foms[k],
                fom_prior: self.prior.as_ref().and_then(|e| e.foms[k]),
            }
        })
    }
}
impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "Emulated from best to worst in year {}", self.year)?;
        match self.prior {
            Some(_) => writeln!(
                f,
                "Strategy, Area, median i-band depth, FoM without prior, FoM with prior"
            )?,
            None => writeln!(f, "Strategy, Area, median i-band depth, FoM without prior")?,
        }
        for &k in &self.order {
            let strategy = &self.strategies[k];
            write!(
                f,
                "{:>20} {} {:.2} {}",
                strategy.name,
                strategy.area.trunc() as i64,
                strategy.depth,
                self.fom_string(self.noprior.foms[k])
            )?;
            if let Some(prior) = &self.prior {
                write!(f, " {}", self.fom_string(prior.foms[k]))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Writes the rankings to a CSV file
pub fn to_csv<P: AsRef<Path>>(rankings: &[Ranking], path: P) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for record in rankings.iter().flat_map(|ranking| ranking.records()) {
        wtr.serialize(record)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid::Prior, strategy::Strategy};
    use nalgebra::Matrix3;

    fn emulation(prior: Prior, foms: Vec<Option<f64>>) -> Emulation {
        Emulation {
            year: Year::Y6,
            prior,
            foms,
            renorm_value: 1.,
            grid_ratio: Matrix3::repeat(1.),
        }
    }

    fn strategies() -> StrategyTable {
        let strategy = |name: &str, area: f64| Strategy {
            name: name.to_string(),
            area,
            depth: 26.05,
            visits: 100,
        };
        StrategyTable::new(
            Year::Y6,
            vec![
                strategy("baseline2018a", 18000.4),
                strategy("outside", 30000.),
                strategy("pontus_2489", 19500.),
                strategy("alt_sched", 12000.),
            ],
        )
    }

    fn ranking(renormalized: bool) -> Ranking {
        Ranking::new(
            strategies(),
            emulation(
                Prior::Excluded,
                vec![Some(0.9), None, Some(1.25), Some(0.5)],
            ),
            Some(emulation(
                Prior::Included,
                vec![Some(1.9), None, Some(2.25), Some(1.5)],
            )),
            renormalized,
        )
    }

    #[test]
    fn best_first_missing_last() {
        let ranking = ranking(true);
        assert_eq!(ranking.order(), &[2, 0, 3, 1]);
        assert_eq!(
            ranking.names(),
            vec!["pontus_2489", "baseline2018a", "alt_sched", "outside"]
        );
    }

    #[test]
    fn non_finite_foms_are_totally_ordered() {
        let n = 64;
        let strategies = StrategyTable::new(
            Year::Y6,
            (0..n)
                .map(|k| Strategy {
                    name: format!("s{}", k),
                    area: 15e3,
                    depth: 26.1,
                    visits: 0,
                })
                .collect(),
        );
        let foms = (0..n)
            .map(|k| match k % 5 {
                0 => Some(f64::NAN),
                1 => None,
                _ => Some(k as f64),
            })
            .collect();
        let ranking = Ranking::new(strategies, emulation(Prior::Excluded, foms), None, false);
        let order = ranking.order();
        assert_eq!(order.len(), n);
        assert_eq!(order[0], 0);
        let finite: Vec<_> = order
            .iter()
            .filter_map(|&k| ranking.noprior.foms[k].filter(|v| v.is_finite()))
            .collect();
        assert!(finite.windows(2).all(|w| w[0] > w[1]));
        assert!(order[order.len() - 13..]
            .iter()
            .all(|&k| ranking.noprior.foms[k].is_none()));
    }

    #[test]
    fn table_rows() {
        let text = ranking(true).to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[1], "Emulated from best to worst in year Y6");
        assert_eq!(
            lines[3],
            "         pontus_2489 19500 26.05 1.250000 2.250000"
        );
        assert_eq!(lines[6], "             outside 30000 26.05 n/a n/a");
        let text = ranking(false).to_string();
        assert!(text.contains("       baseline2018a 18000 26.05 0 1\n"));
    }

    #[test]
    fn csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranking.csv");
        to_csv(&[ranking(true)], &path).unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(
            lines[0],
            "year,strategy,area,depth,visits,fom_noprior,fom_prior"
        );
        assert_eq!(lines[1], "Y6,pontus_2489,19500.0,26.05,100,1.25,2.25");
        assert_eq!(lines[4], "Y6,outside,30000.0,26.05,100,,");
    }
}
