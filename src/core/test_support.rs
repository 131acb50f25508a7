//! Crypto-free backend for exercising the pipeline in unit tests.

use std::io::{self, Write};
use std::path::Path;

use crate::core::errors::{Result, SealError};
use crate::core::traits::cipher::{CipherBackend, EnvelopeWriter};

pub const STUB_HEADER: &[u8] = b"-----BEGIN STUB MESSAGE-----\n";
pub const STUB_FOOTER: &[u8] = b"\n-----END STUB MESSAGE-----\n";

/// Key rings are newline-separated names; a line starting with `!` is a
/// parse error. Envelopes wrap the plaintext verbatim between a header and
/// footer. Any chunk containing `poison` fails mid-stream.
pub struct StubBackend;

struct StubWriter<'a> {
    sink: &'a mut Vec<u8>,
}

impl Write for StubWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.windows(6).any(|w| w == b"poison") {
            return Err(io::Error::other("refusing poisoned chunk"));
        }
        self.sink.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl EnvelopeWriter for StubWriter<'_> {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.sink.extend_from_slice(STUB_FOOTER);
        Ok(())
    }
}

impl CipherBackend for StubBackend {
    type Recipient = String;

    fn name(&self) -> &str {
        "stub"
    }

    fn marker_extension(&self) -> &str {
        "stub"
    }

    fn parse_key_ring(&self, source: &Path, contents: &[u8]) -> Result<Vec<String>> {
        String::from_utf8_lossy(contents)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| {
                if l.starts_with('!') {
                    Err(SealError::KeyLoadFailure {
                        path: source.to_path_buf(),
                        detail: format!("bad key '{l}'"),
                    })
                } else {
                    Ok(l.to_string())
                }
            })
            .collect()
    }

    fn envelope_writer<'a>(
        &self,
        recipients: &'a [String],
        sink: &'a mut Vec<u8>,
    ) -> io::Result<Box<dyn EnvelopeWriter + 'a>> {
        if recipients.is_empty() {
            return Err(io::Error::other("no recipients"));
        }
        sink.extend_from_slice(STUB_HEADER);
        Ok(Box::new(StubWriter { sink }))
    }

    fn decrypt(&self, _identity: &Path, ciphertext: &[u8]) -> Result<Vec<u8>> {
        ciphertext
            .strip_prefix(STUB_HEADER)
            .and_then(|rest| rest.strip_suffix(STUB_FOOTER))
            .map(<[u8]>::to_vec)
            .ok_or(SealError::DecryptionFailed {
                reason: "not a stub envelope".into(),
            })
    }
}
