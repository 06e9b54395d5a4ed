//! hookstat: hook performance analysis library
//!
//! Normalizes short-form-video performance for audience size and post age, then
//! measures which hook attributes go with better performance through rank
//! correlations, a within-creator pairwise ranking model, named interactions and
//! editor-facing bucket rules.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
