pub mod ai;
pub mod config;
pub mod merge;
pub mod sync;

pub use ai::gemini::GeminiClient;
pub use ai::{LanguagePair, TranslationError, Translator};
pub use config::SyncConfig;
pub use merge::{KeyPath, MergePlan, MissingLeaf};
pub use sync::{sync_translations, SyncError, SyncReport};
