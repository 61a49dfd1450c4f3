#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
pub mod chart;
pub mod data;
pub mod export;
pub mod percentile;
pub mod summarize;
pub mod types;
