// Application layer - Use cases and business logic
pub mod chart_builder;
pub mod dashboard_service;
pub mod key_value_store;
pub mod live_chart_service;
pub mod report_service;
pub mod series_store;
