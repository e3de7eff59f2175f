//! TasteSync fingerprint data and file format library

pub mod codec;
pub mod error;
pub mod fingerprint;
pub mod format;
pub mod reader;
pub mod writer;

pub use codec::{decode, encode, FingerprintCodec, ELEMENT_WIDTH};
pub use error::FingerprintError;
pub use fingerprint::Fingerprint;
pub use format::{FpFile, FpHeader, FpMetadata, ALGORITHM_ID, HEADER_SIZE, MAGIC, VERSION};
pub use reader::FpReader;
pub use writer::FpWriter;
