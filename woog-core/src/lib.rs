//! Woog Core
//!
//! Core types shared by the release tool and the scraper job.
//!
//! This crate contains:
//! - Domain types: pipeline runs, stage outcomes, water readings
//! - Schedule: cron expression parsing for the CronJob schedule
//! - Descriptor: the CronJob manifest model, `{{TAG}}` rendering and validation

pub mod descriptor;
pub mod domain;
pub mod schedule;
