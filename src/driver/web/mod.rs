pub mod driver;

pub use driver::{WebDriver, WebDriverConfig};
