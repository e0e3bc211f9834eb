//! Analytics Ingestor: pulls per-day campaign metrics from each platform and
//! upserts them into a normalized daily fact table.

pub mod facts;
pub mod ingestor;
pub mod summary;

pub use facts::{DailyFact, FactKey, FactStore};
pub use ingestor::{AnalyticsIngestor, IngestError, IngestRun};
pub use summary::{summarize, PerformanceSummary};
