//! Request and response bodies

pub mod grants;
pub mod leave;
pub mod months;
pub mod views;
