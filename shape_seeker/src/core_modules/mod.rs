pub mod color_classifier;
pub mod color_sampler;
pub mod geometry;
pub mod shape_classifier;
pub mod shape_record;
pub mod vocabulary;
