//! Nexus NL→SQL
//!
//! Turns a free-text analytics question into rows:
//!
//! - [`rules`]: deterministic keyword matcher (table, intent, filters,
//!   grouping, date ranges, limit)
//! - [`llm`]: schema-grounded prompt, provider adapters, reply parsing
//! - [`pipeline`]: schema → generate → validate → repair → execute →
//!   visualization and insight hints
//! - [`config`]: the explicit [`Settings`] value threaded through all of it
//!
//! ```no_run
//! use nexus_nl2sql::{run_query_pipeline, Settings};
//! use nexus_store::Store;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load(None)?;
//! let store = Store::open(&settings.database_path)?;
//! let result = run_query_pipeline(&store, &settings, "Count failed logins", Some("security"))?;
//! println!("{:?}", result.insights);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod llm;
pub mod pipeline;
pub mod rules;

pub use config::{ConfigError, Nl2SqlMode, Settings};
pub use llm::{build_prompt, parse_llm_output, LlmClient, LlmError, MockLlm};
pub use pipeline::{
    run_query_pipeline, Generator, Pipeline, PipelineError, PipelineResult, Visualization,
};
pub use rules::{generate_sql, Generation, GenerationMeta, Intent};
