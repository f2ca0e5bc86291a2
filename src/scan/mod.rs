pub mod orchestrator;
pub mod pool;
pub mod scanner;

pub use orchestrator::{ScanOrchestrator, ScanPhase, ScanProgress, ScanReport, SkippedEntity};
pub use pool::EntityResult;
pub use scanner::LeagueScanner;
