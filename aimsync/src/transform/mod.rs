//! Record -> product transformation
//!
//! [`Transformer`] decides per record between building the product from a
//! cached example (hit) and calling the generator (miss), and folds generated
//! results back into the cache.

mod normalize;
mod orchestrator;
mod prompt;

pub use normalize::{normalize_envelope, normalize_output};
pub use orchestrator::{Outcome, TransformSettings, Transformed, Transformer};
pub use prompt::{build_transform_prompt, TRANSFORM_SYSTEM_PROMPT};
