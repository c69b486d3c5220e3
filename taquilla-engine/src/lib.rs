pub mod config;
pub mod engine;
pub mod events;
pub mod handle;

pub use config::Config;
pub use engine::Engine;
pub use events::UiEvent;
pub use handle::EngineHandle;
