pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;

pub use models::{AppConfig, CanonicalEvent, ChainKind, EventKind, MonitoringTarget, ProcessedEvent};
pub use services::adapter::{ChainAdapter, ConnectionStatus};
pub use services::listener::{EventListener, ListenerEvent, ListenerStats};
pub use services::manager::{ChainManager, ChainManagerConfig};
pub use services::notification::Notifier;
pub use services::pipeline::{EventFilter, EventPipeline};
pub use services::resolver::TargetConfigResolver;
