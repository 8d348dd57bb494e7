//! Exploratory spatial statistics of healthcare facilities against regional
//! health and socioeconomic indicators.
//!
//! Loads facility points, regional metrics and region boundaries, joins them,
//! correlates and clusters the indicators, counts facilities per region and
//! renders static charts plus an interactive HTML map.

pub mod analysis;
pub mod colormap;
pub mod config;
pub mod data;
pub mod join;
pub mod pipeline;
pub mod render;
pub mod types;
pub mod webmap;

pub use config::AppConfig;
pub use pipeline::{run, PipelineReport};
