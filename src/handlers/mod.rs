// handlers/mod.rs - routes behind the session guard
pub mod session;
