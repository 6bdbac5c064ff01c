pub mod catalog;
pub mod conjunct_errors;
pub mod constants;
pub mod ephemeris;
pub mod esa;
pub mod propagation;
pub mod ref_system;
pub mod screening;
pub mod search;
pub mod state;
pub mod time;
