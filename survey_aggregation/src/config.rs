// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// Minimum number of contributing responses below which a statistic is
/// suppressed and reported as `N/A`.
///
/// This is a fixed privacy/reliability floor, applied uniformly to every
/// cohort and every comparison population.
pub const MIN_CELL_SIZE: usize = 4;

/// Leader id that bypasses the hierarchy scan and denotes the
/// company-overall report.
pub const COMPANY_SENTINEL: u64 = 999_999;

/// The range of `Supervisor Level {n} ID` columns scanned when locating a
/// leader's own depth in the reporting chain.
pub const SUPERVISOR_LEVELS: std::ops::RangeInclusive<u32> = 2..=10;

/// A single value in an opaque tabular source.
///
/// The readers (Excel, CSV) produce these; the engine never sees the
/// underlying file formats.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Empty,
}

const EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell. Text cells holding a number are accepted
    /// since spreadsheet exports are not consistent about cell types.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Empty => None,
        }
    }

    /// Identifier view: worker ids and supervisor ids are non-negative
    /// integers, sometimes stored as floats by the export.
    pub fn as_id(&self) -> Option<u64> {
        match self {
            Cell::Int(i) if *i >= 0 => Some(*i as u64),
            Cell::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as u64),
            Cell::Text(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
    }

    /// The cell rendered as a label. Integral floats drop the trailing `.0`.
    pub fn display(&self) -> String {
        match self {
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

/// An opaque tabular source: a header row and data rows.
///
/// Parsing files into this shape is the collaborators' job; everything in
/// this crate works against `Table` only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Short name of the source, used in error messages.
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: &str, headers: Vec<String>) -> Table {
        Table {
            name: name.to_string(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// A column that the schema requires. Absence is a structural problem
    /// with the whole dataset, not something a single leader run can absorb.
    pub fn require(&self, name: &str) -> Result<usize, ReportError> {
        self.column(name).ok_or_else(|| ReportError::DataShape {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Cell access tolerant of ragged rows: anything outside the row is
    /// treated as an empty cell.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

// ******** Output data structures *********

/// The aggregate of one item (or one category) over one population.
///
/// Invariant: a ratio is never reported with a supporting count below
/// [`MIN_CELL_SIZE`]; such an aggregate is `Na`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FavorabilityCell {
    Na,
    Value { ratio: f64, n: usize },
}

impl FavorabilityCell {
    pub fn is_na(&self) -> bool {
        matches!(self, FavorabilityCell::Na)
    }

    pub fn ratio(&self) -> Option<f64> {
        match self {
            FavorabilityCell::Na => None,
            FavorabilityCell::Value { ratio, .. } => Some(*ratio),
        }
    }
}

/// One axis along which "your organization" is partitioned into cohorts.
///
/// The variant is the identity of the axis; the display title is a separate
/// concern resolved at render time.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Dimension {
    /// The fixed comparison columns (company, parent, your org).
    Overall,
    /// The delta columns (prior year, external benchmark, company complement).
    Delta,
    DirectReports,
    Affiliate,
    GradeGroup,
    TenureGroup,
    OfficeType,
    PerformanceRating,
    TalentCoordinate,
    Gender,
    Ethnicity,
    GenderEthnicity,
    AgeGroup,
    Function,
    Region,
    Country,
    Kite,
}

impl Dimension {
    pub fn title(&self) -> &'static str {
        match self {
            Dimension::Overall => "Overall",
            Dimension::Delta => "Comparisons",
            Dimension::DirectReports => "Direct Reports",
            Dimension::Affiliate => "Affiliate",
            Dimension::GradeGroup => "Grade Group",
            Dimension::TenureGroup => "Tenure Group",
            Dimension::OfficeType => "Office Type",
            Dimension::PerformanceRating => "Performance Rating",
            Dimension::TalentCoordinate => "Talent Coordinate",
            Dimension::Gender => "Gender",
            Dimension::Ethnicity => "Ethnicity (US)",
            Dimension::GenderEthnicity => "Gender x Ethnicity (US)",
            Dimension::AgeGroup => "Age Group",
            Dimension::Function => "Function",
            Dimension::Region => "Region",
            Dimension::Country => "Country",
            Dimension::Kite => "Kite",
        }
    }
}

// ******** Errors *********

/// Errors surfaced by the aggregation engine.
///
/// The first two are per-leader conditions: the batch records them and moves
/// on. `DataShape` indicates a schema mismatch in an input table and aborts
/// the whole run, since no leader's computation can recover from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// The leader id was not found at any supervisor level.
    HierarchyResolution { leader_id: u64 },
    /// The leader's organization has fewer respondents than the suppression
    /// floor. This is an explicit skip signal, not a retry hint.
    OrgTooSmall { leader_id: u64, org: String },
    /// A required column is absent from an input table.
    DataShape { table: String, column: String },
}

impl ReportError {
    /// Whether the error invalidates the whole batch rather than one leader.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReportError::DataShape { .. })
    }
}

impl Error for ReportError {}

impl Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::HierarchyResolution { leader_id } => {
                write!(f, "leader {} not found at any supervisor level", leader_id)
            }
            ReportError::OrgTooSmall { leader_id, org } => {
                write!(
                    f,
                    "organization of leader {} ({}) is below the reporting floor",
                    leader_id, org
                )
            }
            ReportError::DataShape { table, column } => {
                write!(f, "table {:?} is missing required column {:?}", table, column)
            }
        }
    }
}
