pub mod analytics;
pub mod contract;
pub mod product;
pub mod profile;
pub mod recommendation;
pub mod quality;
