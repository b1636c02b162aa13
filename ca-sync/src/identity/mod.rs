//! Teacher identity: name normalization, stable ids and similarity

pub mod normalize;
pub mod resolver;

pub use normalize::{normalize, strict_normalize};
pub use resolver::{derive_id, mint_id, similar, TEACHER_ID_PREFIX};
