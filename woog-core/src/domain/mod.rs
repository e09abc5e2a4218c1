//! Core domain types
//!
//! Structures shared between the release tool (which sequences pipeline
//! stages) and the scraper job (which produces water readings).

pub mod reading;
pub mod run;
