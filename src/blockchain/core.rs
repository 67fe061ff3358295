// core.rs splits responsibilities into submodules for easier maintenance.
pub mod chain;
pub mod draft;
pub mod state;
pub mod validation;

pub use chain::*;
pub use draft::*;
pub use state::*;
pub use validation::*;
