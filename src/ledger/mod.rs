//! Money logic that runs over already-fetched rows: expanding one entry into
//! its monthly series, and aggregating the history into dashboard figures.

pub mod aggregation;
pub mod calendar;
pub mod driver_report;
pub mod expansion;
pub mod series;
pub mod settlement;
