// Domain layer - Core business models
pub mod chart;
pub mod dashboard;
pub mod metric;
pub mod report;
pub mod series;
