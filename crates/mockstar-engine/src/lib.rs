//! MockStar resolution engine.
//!
//! Parses a directory tree of mockers and mock modules, routes request paths
//! to a mocker and evaluates the selected module.
//!
//! # Example
//!
//! ```no_run
//! use mockstar_engine::{Parser, ParserOptions};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let parser = Parser::new(ParserOptions::new("./mock_server/mockers"))?;
//!
//! if let Some(res) = parser.get_res_info_by_route("/cgi-bin/a/b/demo_01") {
//!     if let Some(result) = res.evaluate(None).await {
//!         println!("{}", result?);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// ===== Model and loading =====
pub mod config;
pub mod definition;
pub mod docs;
pub mod error;
pub mod model;
pub mod scanner;

// ===== Resolution =====
pub mod parser;
pub mod routing;

// ===== Optional services =====
pub mod snapshot;
pub mod watcher;

// Don't export internal modules
mod scripting;

pub use config::{Convention, ParserOptions, SourceFormat};
pub use definition::{handler_fn, DefinitionKind, HandlerRegistry, MockHandler, ModuleDefinition};
pub use docs::{DocRenderer, PassthroughRenderer};
pub use error::{ConfigError, EngineError, EvaluationError, ScanError, SnapshotError};
pub use model::{MockModule, Mocker};
pub use parser::{
    EngineHooks, MockQuery, MockQueryItem, Parser, ParserState, RescanObserver, ResolutionResult,
    ResolveRequest,
};
pub use scripting::{Completion, RhaiScript, ScriptShape};
