//! Request handlers

pub mod grants;
pub mod health;
pub mod leave;
pub mod months;
pub mod roster;
pub mod views;
