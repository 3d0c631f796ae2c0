pub mod centroid;
pub mod features;
pub mod similarity;
