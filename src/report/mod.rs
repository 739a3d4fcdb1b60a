//! Report generation.
//!
//! Tables are rendered as Markdown, CSV or JSON; figures as SVG.

pub mod figures;
pub mod generator;

pub use generator::{format_mean_sd, format_or, format_p, save_table, write_text};
