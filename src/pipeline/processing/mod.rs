// Pipeline processing: normalization, age bands, duplicate checks, and aggregation

pub mod age;
pub mod dates;
pub mod normalize;
pub mod summary;
pub mod validity;
