//! Scan orchestration engine.
//!
//! A scan session collects its parameters through the [`modal`] queue, runs
//! the external probing tools in [`pipeline`] order through the [`tools`]
//! adapter, fuses their output in the [`registry`] and sorts every host with
//! the [`categorize`] rules.

pub mod categorize;
pub mod modal;
pub mod parsers;
pub mod pipeline;
pub mod prompt;
pub mod registry;
pub mod surface;
pub mod system;
pub mod tools;
pub mod ui;
pub mod vendors;
