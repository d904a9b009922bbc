pub mod activation;
pub mod amplifier;
pub mod costs;
pub mod ledger;
pub mod machines;
pub mod placement;
pub mod state;
