use std::fmt::Display;
use std::io::{self, Read, Write};
use std::path::Path;

use sequoia_openpgp as openpgp;

use openpgp::cert::CertParser;
use openpgp::cert::amalgamation::key::ValidKeyAmalgamationIter;
use openpgp::crypto::SessionKey;
use openpgp::packet::key::{PublicParts, UnspecifiedRole};
use openpgp::packet::{PKESK, SKESK};
use openpgp::parse::Parse;
use openpgp::parse::stream::{
    DecryptionHelper, DecryptorBuilder, MessageStructure, VerificationHelper,
};
use openpgp::policy::StandardPolicy;
use openpgp::serialize::stream::{Armorer, Encryptor2, LiteralWriter, Message};
use openpgp::types::{DataFormat, SymmetricAlgorithm};
use openpgp::{Cert, Fingerprint, KeyHandle};

use crate::core::errors::{Result, SealError};
use crate::core::traits::cipher::{CipherBackend, EnvelopeWriter};

const POLICY: &StandardPolicy = &StandardPolicy::new();

/// OpenPGP backend built on Sequoia.
///
/// Key rings are OpenPGP certificates (armored or binary, one or more per
/// file). Envelopes are ASCII-armored `PGP MESSAGE` blocks holding a binary
/// literal data packet encrypted to every recipient's encryption subkeys.
#[derive(Debug, Default, Clone, Copy)]
pub struct PgpBackend;

impl PgpBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Writer stack: literal → encryptor → armorer → sink.
struct PgpEnvelope<'a> {
    message: Message<'a>,
}

impl Write for PgpEnvelope<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.message.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.message.flush()
    }
}

impl EnvelopeWriter for PgpEnvelope<'_> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        // Finalizes top-down: the literal packet, then the encryption
        // container and its MDC, then the armor footer.
        self.message
            .finalize()
            .map_err(|e| io::Error::other(format!("{e:#}")))
    }
}

impl CipherBackend for PgpBackend {
    type Recipient = Cert;

    fn name(&self) -> &str {
        "pgp"
    }

    fn marker_extension(&self) -> &str {
        "pgp"
    }

    fn parse_key_ring(&self, source: &Path, contents: &[u8]) -> Result<Vec<Cert>> {
        let certs = CertParser::from_bytes(contents)
            .map_err(|e| key_load_failure(source, e))?
            .collect::<openpgp::Result<Vec<Cert>>>()
            .map_err(|e| key_load_failure(source, e))?;

        if certs.is_empty() {
            return Err(key_load_failure(source, "no OpenPGP certificates found"));
        }
        if let Some(cert) = certs.iter().find(|c| encryption_keys(c).next().is_none()) {
            return Err(key_load_failure(
                source,
                format!("certificate {} has no usable encryption key", cert.fingerprint().to_hex()),
            ));
        }
        Ok(certs)
    }

    fn envelope_writer<'a>(
        &self,
        recipients: &'a [Cert],
        sink: &'a mut Vec<u8>,
    ) -> io::Result<Box<dyn EnvelopeWriter + 'a>> {
        // Every recipient must be reachable; never encrypt to a subset.
        let mut keys = Vec::new();
        for cert in recipients {
            let before = keys.len();
            keys.extend(encryption_keys(cert));
            if keys.len() == before {
                return Err(io::Error::other(format!(
                    "recipient {} has no usable encryption key",
                    cert.fingerprint().to_hex()
                )));
            }
        }

        let message = Message::new(sink);
        let message = Armorer::new(message).build().map_err(to_io)?;
        let message = Encryptor2::for_recipients(message, keys)
            .build()
            .map_err(to_io)?;
        let message = LiteralWriter::new(message)
            .format(DataFormat::Binary)
            .build()
            .map_err(to_io)?;

        Ok(Box::new(PgpEnvelope { message }))
    }

    fn decrypt(&self, identity: &Path, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let secret = Cert::from_file(identity).map_err(|e| SealError::DecryptionFailed {
            reason: format!(
                "Failed to read secret key '{}': {e:#}",
                identity.display()
            ),
        })?;

        if !secret.is_tsk() {
            return Err(SealError::DecryptionFailed {
                reason: format!("'{}' holds no secret key material", identity.display()),
            });
        }

        let helper = Helper { secret: &secret };
        let mut decryptor = DecryptorBuilder::from_bytes(ciphertext)
            .map_err(|e| SealError::DecryptionFailed {
                reason: format!("Invalid encrypted file: {e:#}"),
            })?
            .with_policy(POLICY, None, helper)
            .map_err(|e| match e.downcast_ref::<openpgp::Error>() {
                Some(openpgp::Error::MissingSessionKey(_)) => SealError::DecryptionNoKey,
                _ => SealError::DecryptionFailed {
                    reason: format!("Invalid encrypted file: {e:#}"),
                },
            })?;

        let mut plaintext = Vec::new();
        decryptor
            .read_to_end(&mut plaintext)
            .map_err(|e| SealError::DecryptionFailed {
                reason: format!("Read decrypted data failed: {e}"),
            })?;

        Ok(plaintext)
    }
}

/// Policy-valid keys of `cert` that may receive encrypted data.
fn encryption_keys(cert: &Cert) -> ValidKeyAmalgamationIter<'_, PublicParts, UnspecifiedRole> {
    cert.keys()
        .with_policy(POLICY, None)
        .supported()
        .alive()
        .revoked(false)
        .for_transport_encryption()
        .for_storage_encryption()
}

fn to_io(e: impl Display) -> io::Error {
    io::Error::other(format!("{e:#}"))
}

fn key_load_failure(source: &Path, e: impl Display) -> SealError {
    SealError::KeyLoadFailure {
        path: source.to_path_buf(),
        detail: format!("{e:#}"),
    }
}

/// Supplies the secret key to the streaming decryptor. Signatures are
/// not checked.
struct Helper<'a> {
    secret: &'a Cert,
}

impl VerificationHelper for Helper<'_> {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> openpgp::Result<Vec<Cert>> {
        Ok(Vec::new())
    }

    fn check(&mut self, _structure: MessageStructure) -> openpgp::Result<()> {
        Ok(())
    }
}

impl DecryptionHelper for Helper<'_> {
    fn decrypt<D>(
        &mut self,
        pkesks: &[PKESK],
        _skesks: &[SKESK],
        sym_algo: Option<SymmetricAlgorithm>,
        mut decrypt: D,
    ) -> openpgp::Result<Option<Fingerprint>>
    where
        D: FnMut(SymmetricAlgorithm, &SessionKey) -> bool,
    {
        let keys = self
            .secret
            .keys()
            .unencrypted_secret()
            .with_policy(POLICY, None)
            .supported()
            .for_transport_encryption()
            .for_storage_encryption();

        for ka in keys {
            let mut pair = ka.key().clone().into_keypair()?;
            for pkesk in pkesks {
                if let Some((algo, session_key)) = pkesk.decrypt(&mut pair, sym_algo) {
                    if decrypt(algo, &session_key) {
                        return Ok(Some(self.secret.fingerprint()));
                    }
                }
            }
        }

        Err(openpgp::Error::MissingSessionKey("no matching secret key".into()).into())
    }
}
