pub mod driver;
pub mod error;
pub mod locator;
pub mod parser;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use error::FlowError;
pub use locator::{HealedSelector, LocatorResolver};
pub use report::write_reports;
pub use runner::run_tests;
