//! FNMT issuance profile validation.
//!
//! FNMT natural-person certificates carry the holder's DNI inside the subject
//! `serialNumber` attribute (`IDCES-<DNI>`), which is not a field reserved
//! for national identifiers. Checking the expected shape before trusting any
//! subject field narrows (but does not rule out) the chance of accepting a
//! certificate from another authority that happens to use a similar subject.

use thiserror::Error;
use x509_parser::certificate::X509Certificate;
use x509_parser::oid_registry::OID_X509_SERIALNUMBER;

use crate::fnmt::identity::attribute_text;

/// The only country code FNMT personal certificates are issued with.
pub const EXPECTED_COUNTRY: &str = "ES";

/// Prefix of the subject serial number: Identity Document, Spain.
pub const SERIAL_PREFIX: &str = "IDCES-";

/// Total serial number length in bytes: the prefix plus a 9-byte DNI.
pub const SERIAL_LEN: usize = 15;

/// The first profile check a certificate failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileViolation {
    /// Subject must contain exactly one country, equal to `ES`.
    #[error("country failed validation (found {found:?})")]
    Country {
        /// Country values as found; non-textual entries show as `<non-text>`.
        found: Vec<String>,
    },

    /// Serial number must be `IDCES-` followed by 9 bytes.
    #[error("serial number failed validation ({length} bytes)")]
    SerialNumber {
        /// Length of the serial number that was found, in bytes.
        length: usize,
    },

    /// Common name does not follow `<given name> <surname> - <DNI>`.
    ///
    /// Only raised when strict common-name checking is enabled.
    #[error("common name does not follow the '<name> <surname> - <dni>' convention")]
    CommonName,
}

/// Check that `cert` follows the FNMT natural-person issuance profile.
///
/// Checks run in order and stop at the first failure:
/// 1. exactly one country attribute, equal to [`EXPECTED_COUNTRY`];
/// 2. a serial number of exactly [`SERIAL_LEN`] bytes starting with
///    [`SERIAL_PREFIX`].
pub fn validate_profile(cert: &X509Certificate<'_>) -> Result<(), ProfileViolation> {
    let subject = cert.subject();

    let countries: Vec<Option<String>> = subject.iter_country().map(attribute_text).collect();
    let countries: Vec<Option<&str>> = countries.iter().map(Option::as_deref).collect();
    check_countries(&countries)?;

    let serial = subject
        .iter_by_oid(&OID_X509_SERIALNUMBER)
        .last()
        .and_then(attribute_text)
        .unwrap_or_default();
    check_serial_number(&serial)
}

fn check_countries(countries: &[Option<&str>]) -> Result<(), ProfileViolation> {
    match countries {
        [Some(EXPECTED_COUNTRY)] => Ok(()),
        _ => Err(ProfileViolation::Country {
            found: countries
                .iter()
                .map(|c| c.unwrap_or("<non-text>").to_owned())
                .collect(),
        }),
    }
}

fn check_serial_number(serial: &str) -> Result<(), ProfileViolation> {
    let length = serial.len();
    if length == SERIAL_LEN && serial.starts_with(SERIAL_PREFIX) {
        Ok(())
    } else {
        Err(ProfileViolation::SerialNumber { length })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_es_country_passes() {
        assert_eq!(check_countries(&[Some("ES")]), Ok(()));
    }

    #[test]
    fn missing_country_fails() {
        let err = check_countries(&[]).unwrap_err();
        assert_eq!(err, ProfileViolation::Country { found: vec![] });
    }

    #[test]
    fn foreign_country_fails() {
        assert!(check_countries(&[Some("PT")]).is_err());
    }

    #[test]
    fn country_check_is_case_sensitive() {
        assert!(check_countries(&[Some("es")]).is_err());
    }

    #[test]
    fn repeated_country_fails_even_when_both_are_es() {
        let err = check_countries(&[Some("ES"), Some("ES")]).unwrap_err();
        assert_eq!(
            err,
            ProfileViolation::Country {
                found: vec!["ES".into(), "ES".into()]
            }
        );
    }

    #[test]
    fn non_text_country_fails_and_is_reported() {
        let err = check_countries(&[None]).unwrap_err();
        assert_eq!(
            err,
            ProfileViolation::Country {
                found: vec!["<non-text>".into()]
            }
        );
    }

    #[test]
    fn well_formed_serial_passes() {
        assert_eq!(check_serial_number("IDCES-123456789"), Ok(()));
    }

    #[test]
    fn short_serial_fails() {
        assert_eq!(
            check_serial_number("IDCES-1234"),
            Err(ProfileViolation::SerialNumber { length: 10 })
        );
    }

    #[test]
    fn long_serial_fails() {
        assert!(check_serial_number("IDCES-1234567890").is_err());
    }

    #[test]
    fn wrong_prefix_fails() {
        // GIVEN: right length, but a passport-style prefix
        assert!(check_serial_number("PASES-123456789").is_err());
    }

    #[test]
    fn empty_serial_fails() {
        assert_eq!(
            check_serial_number(""),
            Err(ProfileViolation::SerialNumber { length: 0 })
        );
    }

    #[test]
    fn serial_length_counts_bytes_not_characters() {
        // 15 characters, 16 bytes
        assert_eq!(
            check_serial_number("IDCES-12345678Ñ"),
            Err(ProfileViolation::SerialNumber { length: 16 })
        );
    }
}
