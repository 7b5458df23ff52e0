//! Identity extraction from FNMT certificate subjects.
//!
//! An FNMT natural-person certificate encodes its holder as:
//!
//! | Attribute | OID | Content |
//! |-----------|-----|---------|
//! | `C` | 2.5.4.6 | `ES` |
//! | `serialNumber` | 2.5.4.5 | `IDCES-<DNI>` |
//! | `givenName` | 2.5.4.42 | first name |
//! | `surname` | 2.5.4.4 | last names |
//! | `CN` | 2.5.4.3 | `<first name> <last names> - <DNI>` |
//!
//! Attribute values are decoded through `x509-parser`'s typed accessors,
//! including the UTF-16 `BMPString` and UCS-4 `UniversalString` types. A
//! value that is not a textual ASN.1 string is treated as absent rather than
//! aborting extraction.

use x509_parser::certificate::X509Certificate;
use x509_parser::oid_registry::{
    OID_X509_COMMON_NAME, OID_X509_COUNTRY_NAME, OID_X509_GIVEN_NAME, OID_X509_SERIALNUMBER,
    OID_X509_SURNAME,
};
use x509_parser::prelude::FromDer;
use x509_parser::x509::AttributeTypeAndValue;

use crate::fnmt::profile::SERIAL_PREFIX;
use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Parsed identity
// ─────────────────────────────────────────────────────────────────────────────

/// Identity fields read from the subject of a client certificate.
///
/// Built once per verification and dropped when it returns. Single-valued
/// attributes that appear more than once keep their last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedIdentity {
    /// Country codes, in subject order.
    pub country: Vec<String>,

    /// Raw subject serial number (`IDCES-<DNI>` for FNMT certificates).
    pub serial_number: String,

    /// Given name (OID 2.5.4.42), empty when absent.
    pub given_name: String,

    /// Surname (OID 2.5.4.4), empty when absent.
    pub surname: String,

    /// Common name, empty when absent.
    pub common_name: String,
}

impl ParsedIdentity {
    /// Extract the identity fields from an already parsed certificate.
    ///
    /// Never fails: missing or non-textual attributes leave their field
    /// empty.
    #[must_use]
    pub fn from_certificate(cert: &X509Certificate<'_>) -> Self {
        let mut identity = Self::default();

        for attr in cert.subject().iter_attributes() {
            let oid = attr.attr_type();
            if *oid == OID_X509_COUNTRY_NAME {
                if let Some(value) = attribute_text(attr) {
                    identity.country.push(value);
                }
            } else if *oid == OID_X509_SERIALNUMBER {
                set_text(&mut identity.serial_number, attr);
            } else if *oid == OID_X509_GIVEN_NAME {
                set_text(&mut identity.given_name, attr);
            } else if *oid == OID_X509_SURNAME {
                set_text(&mut identity.surname, attr);
            } else if *oid == OID_X509_COMMON_NAME {
                set_text(&mut identity.common_name, attr);
            }
        }

        identity
    }

    /// Parse a DER-encoded certificate and extract its identity fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCertificate`] if the bytes are not a valid
    /// X.509 certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let cert = parse_certificate(der)?;
        Ok(Self::from_certificate(&cert))
    }

    /// `"<given name> <surname>"`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.surname)
    }

    /// The DNI: the serial number without its `IDCES-` prefix.
    ///
    /// `None` when the prefix is missing, which a profile-validated
    /// certificate never has.
    #[must_use]
    pub fn national_id(&self) -> Option<&str> {
        self.serial_number.strip_prefix(SERIAL_PREFIX)
    }

    /// The common name FNMT's issuance convention prescribes for this
    /// identity: `"<given name> <surname> - <DNI>"`.
    #[must_use]
    pub fn conventional_common_name(&self) -> Option<String> {
        self.national_id()
            .map(|dni| format!("{} - {dni}", self.full_name()))
    }

    /// Label for logs: the common name, or the full name when the
    /// certificate has no CN.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.common_name.is_empty() {
            self.full_name()
        } else {
            self.common_name.clone()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoding helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Decode exactly one DER certificate.
///
/// Bytes left over after the certificate make the input malformed.
pub(crate) fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>> {
    let (rest, cert) = X509Certificate::from_der(der)
        .map_err(|e| Error::MalformedCertificate(e.to_string()))?;
    if !rest.is_empty() {
        return Err(Error::MalformedCertificate(format!(
            "trailing data after certificate ({} bytes)",
            rest.len()
        )));
    }
    Ok(cert)
}

/// Decode an attribute value as text; `None` for non-string ASN.1 types.
///
/// `as_str` only covers the Numeric, Printable, UTF-8 and IA5 types; the
/// remaining directory string types are decoded through `asn1-rs`.
pub(crate) fn attribute_text(attr: &AttributeTypeAndValue<'_>) -> Option<String> {
    if let Ok(s) = attr.as_str() {
        return Some(s.to_owned());
    }
    let value = attr.attr_value();
    value
        .as_bmpstring()
        .map(|s| s.string())
        .or_else(|_| value.as_universalstring().map(|s| s.string()))
        .or_else(|_| value.as_teletexstring().map(|s| s.string()))
        .or_else(|_| value.as_visiblestring().map(|s| s.string()))
        .ok()
}

fn set_text(slot: &mut String, attr: &AttributeTypeAndValue<'_>) {
    if let Some(value) = attribute_text(attr) {
        *slot = value;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
