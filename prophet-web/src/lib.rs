// Source registry module
pub mod registry;

// Search provenance module
pub mod searches;

// Source board module
pub mod board;

// Transcript module
pub mod transcript;

// Stream decoding module
pub mod decoder;

// Run orchestration module
pub mod orchestrator;

// Result summary module
pub mod summary;

// Badge layout module
pub mod layout;

// Configuration and HTTP backend
pub mod config;
pub mod http;

// CLI module
pub mod cli;

pub use board::{extract_board_id, BoardState};
pub use orchestrator::{Admission, RunOrchestrator, RunPhase, RunUpdate};
pub use transcript::{ChatMessage, MessageKind};
