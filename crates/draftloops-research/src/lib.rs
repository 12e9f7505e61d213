//! Web research collection: query a search provider, validate and rank the
//! hits, and hand back clean source records ready for synthesis.

mod collector;
mod provider;
mod types;

pub use collector::ResearchCollector;
pub use provider::{CollectionError, SearchProvider, TavilySearch};
pub use types::{RawSearchResult, SearchDepth, SourceRecord};
