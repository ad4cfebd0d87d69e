//! HTTP control surface for the document queue
//!
//! Routes are built by [`build_router`] over an [`AppState`]; [`run`] wires
//! the stores and the HTTP extractor from config and serves until SIGINT or
//! SIGTERM, then drains the worker pool.

mod error;
pub mod models;
mod server;
pub mod services;
pub mod state;
pub(crate) mod utils;
pub mod validation;

pub use error::ApiError;
pub use server::{build_router, build_state, run};
pub use state::AppState;
