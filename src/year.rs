use std::{fmt, str::FromStr};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

#[derive(Debug, thiserror::Error)]
pub enum YearError {
    #[error(r#"survey year {0} is not recognized, expected "Y1", "Y3", "Y6" or "Y10""#)]
    Token(String),
}
type Result<T> = std::result::Result<T, YearError>;

/// Reference area [deg^2] for area rescaled FoM: the middle area of the Y3 grid
pub const AREA_MID: f64 = 15e3;

/// Survey milestone
#[derive(EnumIter, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum Year {
    Y1,
    Y3,
    Y6,
    Y10,
}
impl Year {
    /// Get a new `Year` from its token: "Y1", "Y3", "Y6" or "Y10"
    pub fn new(token: &str) -> Result<Self> {
        use Year::*;
        match token.trim().to_uppercase().as_str() {
            "Y1" => Ok(Y1),
            "Y3" => Ok(Y3),
            "Y6" => Ok(Y6),
            "Y10" => Ok(Y10),
            _ => Err(YearError::Token(token.to_string())),
        }
    }
    /// Position of the year in the survey sequence
    pub fn index(&self) -> usize {
        use Year::*;
        match self {
            Y1 => 0,
            Y3 => 1,
            Y6 => 2,
            Y10 => 3,
        }
    }
    /// File name token
    pub fn token(&self) -> &'static str {
        use Year::*;
        match self {
            Y1 => "Y1",
            Y3 => "Y3",
            Y6 => "Y6",
            Y10 => "Y10",
        }
    }
    /// The 3 sky areas [deg^2] of the FoM grid
    pub fn areas(&self) -> [f64; 3] {
        use Year::*;
        match self {
            Y1 => [7.5e3, 13e3, 16e3],
            Y3 | Y6 | Y10 => [10e3, 15e3, 20e3],
        }
    }
    /// The 3 median i-band depths of the FoM grid
    pub fn depths(&self) -> [f64; 3] {
        use Year::*;
        match self {
            Y1 => [24.9, 25.2, 25.5],
            Y3 => [25.5, 25.8, 26.1],
            Y6 => [25.9, 26.1, 26.3],
            Y10 => [26.3, 26.5, 26.7],
        }
    }
    /// Checks whether `file_name` belongs to that year
    ///
    /// The year token must be found in `file_name` together with none of the other
    /// year tokens, except the ones the year token already contains:
    /// "Y10" files are not "Y1" files, but "Y10" files do contain "Y1".
    pub fn matches(&self, file_name: &str) -> bool {
        let token = self.token();
        file_name.contains(token)
            && !Year::iter()
                .filter(|other| other != self && !token.contains(other.token()))
                .any(|other| file_name.contains(other.token()))
    }
}
impl FromStr for Year {
    type Err = YearError;

    fn from_str(s: &str) -> Result<Self> {
        Year::new(s)
    }
}
impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}
