use std::io::{self, Write};
use std::path::Path;

use crate::core::errors::Result;

/// An envelope being written: plaintext goes in through `Write`,
/// armored ciphertext accumulates in the sink the writer was built over.
///
/// Dropping the writer without calling `finish` abandons the envelope.
pub trait EnvelopeWriter: Write {
    /// Finalize the encryption layer, then the armor layer.
    ///
    /// The armor footer must follow every encrypted byte, so the
    /// layers are closed innermost first.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// Port for encryption/decryption backends.
///
/// Implementations live in `adapters::cipher` (e.g. PgpBackend, AgeBackend).
/// The core layer only depends on this trait, never on a concrete backend.
pub trait CipherBackend: Send + Sync {
    /// A parsed public-key identity. Shared read-only across workers.
    type Recipient: Send + Sync;

    /// Human-readable name of this backend (e.g. "pgp", "age").
    fn name(&self) -> &str;

    /// Extension given to encrypted output, without the dot.
    fn marker_extension(&self) -> &str;

    /// Parse the contents of one key-ring file read from `source`.
    fn parse_key_ring(&self, source: &Path, contents: &[u8]) -> Result<Vec<Self::Recipient>>;

    /// Open an armored envelope over `sink`, encrypted to `recipients`.
    fn envelope_writer<'a>(
        &self,
        recipients: &'a [Self::Recipient],
        sink: &'a mut Vec<u8>,
    ) -> io::Result<Box<dyn EnvelopeWriter + 'a>>;

    /// Decrypt one envelope with the private key stored at `identity`.
    fn decrypt(&self, identity: &Path, ciphertext: &[u8]) -> Result<Vec<u8>>;
}
