// Synthetic metrics dashboard - rolling series, chart configurations and reports
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
