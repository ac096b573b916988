// Library surface for the headless trainer core and integration tests.
// The terminal setup and CLI live in main.rs.
pub mod error;
pub mod results;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod trainer;
pub mod ui;

pub use error::{Error, Result};
