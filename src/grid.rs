//! FoM grid loader
//!
//! The FoM values are precomputed on a 3x3 grid of sky areas and median i-band depths,
//! one file per survey year.
//! Within a file, the FoM values are given on lines `<label>=<value>` where the label tells
//! whether the Stage III prior was included (`incl`) or excluded (`excl`).

use crate::year::{Year, AREA_MID};
use nalgebra::Matrix3;
use regex::Regex;
use std::{
    fmt, fs, io,
    ops::Deref,
    path::{Path, PathBuf},
};
use strum::IntoEnumIterator;

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("year {0} not found in dir {1:?}")]
    YearNotFound(Year, PathBuf),
    #[error("year {0} found more than once in dir {1:?}: {2:?} and {3:?}")]
    YearFoundTwice(Year, PathBuf, PathBuf, PathBuf),
    #[error("failed to read {1:?}")]
    Io(#[source] io::Error, PathBuf),
    #[error("invalid grid directory pattern")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to list grid directory")]
    Glob(#[from] glob::GlobError),
    #[error("non UTF-8 grid directory {0:?}")]
    Path(PathBuf),
    #[error("invalid FoM line regex")]
    Regex(#[from] regex::Error),
    #[error("{0:?}, line {1}: {2:?} is not a `<label>=<FoM>` line with a finite FoM")]
    Line(PathBuf, usize, String),
    #[error("{0:?}: expected 9 FoM values {1}, found {2}")]
    Count(PathBuf, Prior, usize),
}
type Result<T> = std::result::Result<T, GridError>;

/// Stage III prior
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Prior {
    Included,
    Excluded,
}
impl Prior {
    /// Substring flagging the grid file lines of this prior mode
    pub fn marker(&self) -> &'static str {
        match self {
            Prior::Included => "incl",
            Prior::Excluded => "excl",
        }
    }
    /// Short lower case label used in file names
    pub fn label(&self) -> &'static str {
        match self {
            Prior::Included => "prior",
            Prior::Excluded => "noprior",
        }
    }
}
impl fmt::Display for Prior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prior::Included => write!(f, "with Stage III prior"),
            Prior::Excluded => write!(f, "without prior"),
        }
    }
}

/// FoM on the (area, depth) grid of a given year
///
/// Rows are indexed by the area level and columns by the depth level
#[derive(Debug, Clone, PartialEq)]
pub struct FomGrid {
    pub year: Year,
    pub prior: Prior,
    fom: Matrix3<f64>,
}
impl FomGrid {
    /// Creates a grid from the FoM values listed in file order
    ///
    /// The n-th value goes to the cell (n/3, n%3)
    pub fn from_values(year: Year, prior: Prior, values: &[f64]) -> Option<Self> {
        (values.len() == 9).then(|| Self {
            year,
            prior,
            fom: Matrix3::from_row_slice(values),
        })
    }
    /// Returns the FoM matrix
    pub fn fom(&self) -> &Matrix3<f64> {
        &self.fom
    }
    /// Returns the FoM at the given area and depth levels
    pub fn get(&self, area_level: usize, depth_level: usize) -> f64 {
        self.fom[(area_level, depth_level)]
    }
    pub fn max(&self) -> f64 {
        self.fom.max()
    }
    /// Fakes the area scaling of the FoM
    ///
    /// Only the diagonal of the grid is kept, the other entries are obtained by
    /// scaling the diagonal entry of the same depth with the area
    pub fn fake_area(&mut self) {
        let a = self.year.areas();
        let g = &mut self.fom;
        // shallowest: rescaled from the smallest area
        g[(1, 0)] = g[(0, 0)] * a[1] / a[0];
        g[(2, 0)] = g[(0, 0)] * a[2] / a[0];
        // middle depth: rescaled from the middle area
        g[(0, 1)] = g[(1, 1)] * a[0] / a[1];
        g[(2, 1)] = g[(1, 1)] * a[2] / a[1];
        // deepest: rescaled from the largest area
        g[(0, 2)] = g[(2, 2)] * a[0] / a[2];
        g[(1, 2)] = g[(2, 2)] * a[1] / a[2];
    }
    /// Returns the FoM rescaled to the reference area [`AREA_MID`]
    pub fn area_rescaled(&self) -> Matrix3<f64> {
        let a = self.year.areas();
        let mut rescaled = self.fom;
        rescaled
            .row_iter_mut()
            .zip(a)
            .for_each(|(mut row, area)| row *= AREA_MID / area);
        rescaled
    }
}
impl fmt::Display for FomGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} FoM {}:", self.year, self.prior)?;
        writeln!(
            f,
            "  {:>8} | {:>10.2} {:>10.2} {:>10.2}",
            "area", self.year.depths()[0], self.year.depths()[1], self.year.depths()[2]
        )?;
        for (row, area) in self.fom.row_iter().zip(self.year.areas()) {
            writeln!(
                f,
                "  {:>8.0} | {:>10.3} {:>10.3} {:>10.3}",
                area,
                row[0],
                row[1],
                row[2]
            )?;
        }
        Ok(())
    }
}

/// FoM grids of all the survey years
#[derive(Debug, Clone)]
pub struct FomGrids(Vec<FomGrid>);
impl Deref for FomGrids {
    type Target = Vec<FomGrid>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl FomGrids {
    /// Returns the grid of the given year
    pub fn year(&self, year: Year) -> &FomGrid {
        &self.0[year.index()]
    }
}

/// Loads the FoM grid files from a directory
pub struct GridLoader {
    path: PathBuf,
    prior: Prior,
    fake_area: bool,
}
impl Default for GridLoader {
    fn default() -> Self {
        Self {
            path: Path::new("FoM").to_path_buf(),
            prior: Prior::Excluded,
            fake_area: false,
        }
    }
}
impl GridLoader {
    pub fn data_path<P: AsRef<Path>>(self, data_path: P) -> Self {
        Self {
            path: data_path.as_ref().to_path_buf(),
            ..self
        }
    }
    pub fn prior(self, prior: Prior) -> Self {
        Self { prior, ..self }
    }
    /// Rebuilds the off-diagonal grid entries from the diagonal ones
    pub fn fake_area(self, fake_area: bool) -> Self {
        Self { fake_area, ..self }
    }
    /// Finds the unique file of the grid directory that belongs to `year`
    pub fn find(&self, year: Year) -> Result<PathBuf> {
        let pattern = self.path.join("*");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| GridError::Path(self.path.clone()))?;
        let mut found: Option<PathBuf> = None;
        let options = glob::MatchOptions {
            require_literal_leading_dot: true,
            ..Default::default()
        };
        for entry in glob::glob_with(pattern, options)? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }
            let is_match = path
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| year.matches(name));
            if !is_match {
                continue;
            }
            match found {
                Some(first) => {
                    return Err(GridError::YearFoundTwice(
                        year,
                        self.path.clone(),
                        first,
                        path,
                    ))
                }
                None => found = Some(path),
            }
        }
        found.ok_or_else(|| GridError::YearNotFound(year, self.path.clone()))
    }
    /// Loads the grid of a single year
    pub fn load_year(&self, year: Year) -> Result<FomGrid> {
        let path = self.find(year)?;
        log::info!("Found file {:?} for year {} in dir {:?}", path, year, self.path);
        let contents = fs::read_to_string(&path).map_err(|e| GridError::Io(e, path.clone()))?;
        let values = parse_fom_values(&path, &contents, self.prior)?;
        log::info!("{} relevant lines found", values.len());
        let mut grid = FomGrid::from_values(year, self.prior, &values)
            .ok_or_else(|| GridError::Count(path.clone(), self.prior, values.len()))?;
        if self.fake_area {
            log::info!("Faking FoM area scaling so as to only use diagonals!");
            grid.fake_area();
        }
        log::debug!("{}", grid);
        Ok(grid)
    }
    /// Loads the grids of all the survey years
    pub fn load(self) -> Result<FomGrids> {
        Year::iter()
            .map(|year| self.load_year(year))
            .collect::<Result<Vec<FomGrid>>>()
            .map(FomGrids)
    }
}

/// Extracts the FoM values of the lines flagged with the `prior` marker
fn parse_fom_values(path: &Path, contents: &str, prior: Prior) -> Result<Vec<f64>> {
    let re_fom = Regex::new(r"^[^=]*=([^=]*)")?;
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains(prior.marker()))
        .map(|(k, line)| {
            re_fom
                .captures(line)
                .and_then(|capts| capts.get(1))
                .and_then(|value| value.as_str().trim().parse::<f64>().ok())
                .filter(|value| value.is_finite())
                .ok_or_else(|| GridError::Line(path.to_path_buf(), k + 1, line.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn grid_file(dir: &Path, name: &str, excl: &[f64], incl: &[f64]) {
        let mut file = File::create(dir.join(name)).unwrap();
        writeln!(file, "# WL+CL+LSS FoM").unwrap();
        for (k, v) in excl.iter().enumerate() {
            writeln!(file, "fom_excl_{}={}", k, v).unwrap();
        }
        for (k, v) in incl.iter().enumerate() {
            writeln!(file, "fom_incl_{}={}", k, v).unwrap();
        }
    }

    fn survey_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let excl: Vec<f64> = (1..=9).map(|k| 10. * k as f64).collect();
        let incl: Vec<f64> = (1..=9).map(|k| 100. * k as f64).collect();
        for year in Year::iter() {
            grid_file(dir.path(), &format!("fom_{}.txt", year), &excl, &incl);
        }
        dir
    }

    #[test]
    fn values_fill_rows_first() {
        let dir = survey_dir();
        let grids = GridLoader::default()
            .data_path(dir.path())
            .prior(Prior::Excluded)
            .load()
            .unwrap();
        assert_eq!(grids.len(), 4);
        let expected = Matrix3::new(10., 20., 30., 40., 50., 60., 70., 80., 90.);
        for grid in grids.iter() {
            assert_eq!(grid.fom(), &expected);
        }
    }

    #[test]
    fn prior_lines_are_selected() {
        let dir = survey_dir();
        let grid = GridLoader::default()
            .data_path(dir.path())
            .prior(Prior::Included)
            .load_year(Year::Y6)
            .unwrap();
        assert_eq!(grid.get(0, 0), 100.);
        assert_eq!(grid.get(2, 1), 800.);
        assert_eq!(grid.prior, Prior::Included);
    }

    #[test]
    fn y1_is_not_confused_with_y10() {
        let dir = tempfile::tempdir().unwrap();
        let values: Vec<f64> = (1..=9).map(|k| k as f64).collect();
        let y10: Vec<f64> = (1..=9).map(|k| -(k as f64)).collect();
        grid_file(dir.path(), "fom_Y10.txt", &y10, &y10);
        grid_file(dir.path(), "fom_Y1.txt", &values, &values);
        let loader = GridLoader::default().data_path(dir.path());
        assert_eq!(loader.find(Year::Y1).unwrap(), dir.path().join("fom_Y1.txt"));
        assert_eq!(loader.find(Year::Y10).unwrap(), dir.path().join("fom_Y10.txt"));
        assert_eq!(loader.load_year(Year::Y1).unwrap().get(0, 0), 1.);
    }

    #[test]
    fn missing_and_duplicated_years() {
        let dir = tempfile::tempdir().unwrap();
        let values: Vec<f64> = (1..=9).map(|k| k as f64).collect();
        grid_file(dir.path(), "a_Y3.txt", &values, &values);
        grid_file(dir.path(), "b_Y3.txt", &values, &values);
        grid_file(dir.path(), "fom_Y6.txt", &values, &values);
        grid_file(dir.path(), ".fom_Y6.txt.swp", &values, &values);
        let loader = GridLoader::default().data_path(dir.path());
        assert_eq!(loader.find(Year::Y6).unwrap(), dir.path().join("fom_Y6.txt"));
        assert!(matches!(
            loader.find(Year::Y1),
            Err(GridError::YearNotFound(Year::Y1, _))
        ));
        assert!(matches!(
            loader.find(Year::Y3),
            Err(GridError::YearFoundTwice(Year::Y3, ..))
        ));
    }

    #[test]
    fn wrong_line_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let eight: Vec<f64> = (1..=8).map(|k| k as f64).collect();
        let ten: Vec<f64> = (1..=10).map(|k| k as f64).collect();
        grid_file(dir.path(), "fom_Y6.txt", &eight, &ten);
        let loader = GridLoader::default().data_path(dir.path());
        assert!(matches!(
            loader.load_year(Year::Y6),
            Err(GridError::Count(_, Prior::Excluded, 8))
        ));
        let loader = loader.prior(Prior::Included);
        assert!(matches!(
            loader.load_year(Year::Y6),
            Err(GridError::Count(_, Prior::Included, 10))
        ));
    }

    #[test]
    fn malformed_value_is_rejected() {
        let path = Path::new("fom_Y1.txt");
        let contents = "fom_excl_0=1.0\nfom_excl_1=abc\n";
        match parse_fom_values(path, contents, Prior::Excluded) {
            Err(GridError::Line(_, line, text)) => {
                assert_eq!(line, 2);
                assert_eq!(text, "fom_excl_1=abc");
            }
            other => panic!("unexpected {:?}", other),
        }
        for (k, value) in ["nan", "inf", "-inf"].into_iter().enumerate() {
            let contents = format!("fom_excl_0=1.0\nfom_excl_{}={}\n", k + 1, value);
            assert!(matches!(
                parse_fom_values(path, &contents, Prior::Excluded),
                Err(GridError::Line(_, 2, _))
            ));
        }
        let values =
            parse_fom_values(path, "excl_fom = 12.5 \nincl_fom=3", Prior::Excluded).unwrap();
        assert_eq!(values, vec![12.5]);
    }

    #[test]
    fn fake_area_follows_area_ratios() {
        let values: Vec<f64> = (1..=9).map(|k| 10. * k as f64).collect();
        for year in Year::iter() {
            let mut grid = FomGrid::from_values(year, Prior::Excluded, &values).unwrap();
            let diagonal = grid.fom().diagonal();
            grid.fake_area();
            let a = year.areas();
            assert_eq!(grid.fom().diagonal(), diagonal);
            assert_eq!(grid.get(1, 0), grid.get(0, 0) * a[1] / a[0]);
            assert_eq!(grid.get(2, 0), grid.get(0, 0) * a[2] / a[0]);
            assert_eq!(grid.get(0, 1), grid.get(1, 1) * a[0] / a[1]);
            assert_eq!(grid.get(2, 1), grid.get(1, 1) * a[2] / a[1]);
            assert_eq!(grid.get(0, 2), grid.get(2, 2) * a[0] / a[2]);
            assert_eq!(grid.get(1, 2), grid.get(2, 2) * a[1] / a[2]);
            let r10 = grid.get(1, 0) / grid.get(0, 0);
            assert!((r10 - a[1] / a[0]).abs() < 1e-12);
        }
    }

    #[test]
    fn area_rescaling() {
        let grid = FomGrid::from_values(Year::Y3, Prior::Excluded, &[1.; 9]).unwrap();
        let rescaled = grid.area_rescaled();
        assert_eq!(rescaled[(0, 2)], 1.5);
        assert_eq!(rescaled[(1, 0)], 1.);
        assert_eq!(rescaled[(2, 1)], 0.75);
    }
}
