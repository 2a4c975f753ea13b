// src/services/mod.rs
pub mod batch;
pub mod codec;
pub mod enhancer;
pub mod pipeline;

pub use batch::BatchController;
pub use codec::ImageCodec;
pub use enhancer::{EnhancementProvider, GeminiClient, ProxyEnhancer};
pub use pipeline::Pipeline;
