pub mod content_selector;
pub mod duel_service;
pub mod identity;
pub mod progress_service;

pub use content_selector::ContentSelector;
pub use duel_service::DuelService;
pub use progress_service::ProgressService;
