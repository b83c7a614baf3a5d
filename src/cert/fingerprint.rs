//! Certificate thumbprints
// (c) 2024 Ross Younger

use sha1::{Digest as _, Sha1};

/// Computes the thumbprint of a DER-encoded certificate.
///
/// This is SHA-1, regardless of the certificate's own signature algorithm,
/// because that is what OS trust stores key on. Output is lowercase hex.
#[must_use]
pub fn thumbprint(der: &[u8]) -> String {
    hex::encode(Sha1::digest(der))
}

#[cfg(test)]
mod test {
    use super::thumbprint;

    #[test]
    fn known_vector() {
        // SHA-1("abc")
        assert_eq!(
            thumbprint(b"abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn deterministic() {
        let der = [0x30u8, 0x03, 0x02, 0x01, 0x05];
        assert_eq!(thumbprint(&der), thumbprint(&der.clone()));
        assert_eq!(thumbprint(&der).len(), 40);
    }
}
