pub mod breakdown;
pub mod data_loader;
pub mod error;
pub mod filters;
pub mod holidays;
pub mod models;

pub use breakdown::{breakdown_iter, decompose, is_excluded_hour, par_breakdown, BreakdownStats};
pub use data_loader::{EqrArchiveReader, QuarterRecords};
pub use error::{BreakdownError, SourceError};
pub use filters::ProductFilter;
pub use holidays::{is_nerc_holiday, nerc_holidays, NercHoliday};
pub use models::{HourlyRecord, PeakingClass, RateUnit, TransactionRecord, HOURLY_COLUMNS};
