pub mod config;
pub mod deadline;
pub mod error;
pub mod forecast;
pub mod humidity;
pub mod io;
pub mod notify;
pub mod paths;
pub mod run;
pub mod state;

pub use error::{HumidityError, Result};
