// src/extractors/mod.rs
pub mod dispatch;
pub mod dom;
pub mod layouts;
pub mod links;
pub mod qa;
pub mod segment;
pub mod truncate;

// Re-export key extraction types for convenience
pub use dispatch::StrategyDispatcher;
pub use layouts::{
    AccordionStrategy,
    ExtractionStrategy,
    HeaderBlockStrategy,
    MixedInlineStrategy,
    SubtopicStrategy,
};
pub use links::LinkNormalizer;
pub use qa::{ExtractContext, ExtractedPair};
pub use truncate::TruncationFilter;
