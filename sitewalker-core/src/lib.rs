pub mod controller;
pub mod error;
pub mod events;
pub mod fragments;
pub mod matcher;
pub mod normalize;
pub mod path_map;

pub use controller::{ControllerAction, ControllerConfig, CrawlerController};
pub use error::ControllerError;
pub use events::{CrawlEvent, EngineEvent, QueueItem};
pub use fragments::{FragmentParseError, FragmentSource};
pub use path_map::{NodeId, PathMap, PathValue};
