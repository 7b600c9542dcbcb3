//! Re-export public algorithms.

pub mod communicator;
pub mod halo_exchange;
pub mod reduction;
pub mod stencil;

pub use halo_exchange::HaloExchanger;
pub use reduction::GlobalReducer;
pub use stencil::StencilStepper;
