// ReelMap - Library Entry Point
// Rebuilds the production hierarchy of camera footage: which files form one
// clip, which clips are proxies or masters of each other, and what labels
// the folder and file names carry.

pub mod assets;
pub mod collapse;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod fingerprint;
pub mod folders;
pub mod hash;
pub mod hierarchy;
pub mod metadata;
pub mod mhl;
pub mod naming;
pub mod pipeline;
pub mod relations;
pub mod representations;
pub mod scan;
pub mod store;
pub mod text;

pub use config::ScoringConfig;
pub use error::{ReelMapError, Result};
pub use pipeline::{Session, SessionSummary};
