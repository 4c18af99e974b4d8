//! # forcepack-vf-archive
//!
//! Archive handling for static resources.
//!
//! - **Compression** - One archive per non-empty resource folder, compressed
//!   concurrently, with a single completion callback once every job is done
//! - **Extraction** - Retrieved archives extracted one at a time, with a
//!   settle pause between items and symbolic links skipped
//!
//! ## Example
//!
//! ```rust,ignore
//! use forcepack_vf_archive::{CompressionOrchestrator, ExtractionChain, ArchiveRef};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), forcepack_vf_archive::Error> {
//!     let report = CompressionOrchestrator::new()
//!         .compress_all(
//!             Path::new("input/staticresources"),
//!             Path::new("output/staticresources"),
//!             || println!("all static resources built"),
//!         )
//!         .await?;
//!     println!("{} archives", report.archives.len());
//!
//!     let archives = vec![ArchiveRef::in_dir(Path::new("tmp/staticresources"), "Logo.resource")];
//!     ExtractionChain::new()
//!         .extract_sequentially(&archives, Path::new("input/staticresources"), || {})
//!         .await;
//!     Ok(())
//! }
//! ```

mod compress;
mod error;
mod extract;
mod fan_in;

pub use compress::{
    compress_folder, has_content, is_housekeeping, ArchiveJob, CompressionOrchestrator,
    CompressionReport, Discovery, JobFailure, JobStatus, SkipReason,
};
pub use error::{Error, ErrorKind, Result};
pub use extract::{
    clear_dir, destination_name, extract_archive, filter_extension, ArchiveRef, ExtractedArchive,
    ExtractionChain, ExtractionFailure, ExtractionReport, DEFAULT_SETTLE_INTERVAL,
};
pub use fan_in::{CompletionGuard, FanIn};
