pub mod synchsafe;
pub mod header;
pub mod frame;
pub mod transcode;
pub mod reader;
pub mod writer;
pub mod session;

pub use frame::{Frame, FrameId};
pub use reader::{read_container, Container, PreservedFrames};
pub use session::{FileReport, RetroOptions, RetroSession, DEFAULT_PRESERVED_TAGS};
pub use transcode::{Conflict, CorrectionCache, CorrectionPolicy, Prompter, TargetEncoding};
pub use writer::{write_container, OverwritePolicy, WriteOutcome};

use thiserror::Error;

/// Fatal errors for one input file.
#[derive(Error, Debug)]
pub enum RetroError {
    #[error(transparent)]
    Header(#[from] header::HeaderError),
    #[error(transparent)]
    Transcode(#[from] transcode::TranscodeError),
    #[error(transparent)]
    Synchsafe(#[from] synchsafe::SynchsafeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
