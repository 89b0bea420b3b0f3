pub mod engine;
pub mod error;
pub mod html;
pub mod session;

pub use engine::{AdmissionFilter, EngineConfig, EngineHandle, FetchEngine};
pub use error::EngineError;
pub use html::HtmlDocumentSource;
pub use session::{run_crawl, SessionOptions};
