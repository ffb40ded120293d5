//! The assistant brain: language detection, the provider abstraction
//! layer, and the three-tier intent classifier.

pub mod classifier;
pub mod intent;
pub mod language;
pub mod providers;
pub mod slots;

pub use classifier::IntentClassifier;
pub use intent::{ClassificationResult, Intent, Slots, TimerAction};
pub use language::{Detection, Lang, LanguageDetector};
pub use providers::{ClassificationProvider, CompletionRequest, ProviderError, ProviderType};
