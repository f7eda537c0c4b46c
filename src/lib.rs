//! Anamnesis: free-form patient narratives into structured health records.
//!
//! A narrative goes to a locally-run language model with one declared
//! callable; the model's tool-call arguments come back through a strict
//! validating parse into a typed record, which pure renderers turn into a
//! card summary and a raw-data tree. Single-shot and stateless: no
//! persistence, no multi-turn conversation.

pub mod config; // Runtime configuration, loaded once at startup
pub mod extract; // Extraction client: narrative -> HealthRecord
pub mod generate; // Synthetic patient-narrative generator
pub mod ollama; // Blocking HTTP transport + LlmClient seam
pub mod record; // Record types + validating boundary parse
pub mod render; // Summary cards and raw-data tree, both pure
pub mod schema; // The extract_health_data callable declaration
pub mod session; // Caller-side intake state machine

pub use config::Config;
pub use extract::{ExtractionError, HealthExtractor};
pub use generate::{GenerationError, NarrativeGenerator};
pub use ollama::{LlmClient, OllamaClient};
pub use record::HealthRecord;
pub use session::{IntakeSession, IntakeState};
