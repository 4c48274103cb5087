// Data models for pose/gesture verification and the civic hierarchy

pub mod civic;
pub mod pose;
pub mod validation;
