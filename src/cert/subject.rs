//! Subject and issuer name records
// (c) 2024 Ross Younger

use rcgen::{DistinguishedName, DnType, DnValue, Ia5String};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// OID arcs for the PKCS#9 `emailAddress` attribute, which rcgen has no named type for
const EMAIL_ADDRESS_OID: [u64; 7] = [1, 2, 840, 113549, 1, 9, 1];

/// A name-attribute record describing a certificate subject (or issuer).
///
/// Absent fields are simply not emitted. A caller-supplied record always
/// replaces [`Subject::default()`] as a whole; fields are never merged.
///
/// Field names follow the usual X.509 attribute names, so a TOML or JSON
/// document can say `commonName = "localhost"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Subject {
    /// CN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    /// C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    /// ST
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_or_province_name: Option<String>,
    /// L
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality_name: Option<String>,
    /// O
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    /// OU
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizational_unit_name: Option<String>,
    /// PKCS#9 email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

impl Default for Subject {
    /// The fixed identity used when no subject is given.
    fn default() -> Self {
        Self {
            common_name: Some("Test".into()),
            country_name: Some("Test".into()),
            state_or_province_name: Some("Test".into()),
            locality_name: Some("Test".into()),
            organization_name: Some("Test".into()),
            organizational_unit_name: Some("Test".into()),
            email_address: Some("test@example.com".into()),
        }
    }
}

impl Subject {
    /// A record carrying only a common name
    #[must_use]
    pub fn common_name<S: Into<String>>(cn: S) -> Self {
        Self {
            common_name: Some(cn.into()),
            ..Self::empty()
        }
    }

    /// A record with no attributes at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            common_name: None,
            country_name: None,
            state_or_province_name: None,
            locality_name: None,
            organization_name: None,
            organizational_unit_name: None,
            email_address: None,
        }
    }

    /// Builder-style setter for the organization
    #[must_use]
    pub fn with_organization<S: Into<String>>(mut self, org: S) -> Self {
        self.organization_name = Some(org.into());
        self
    }

    /// The attributes present in this record, in emission order
    #[must_use]
    pub fn attributes(&self) -> Vec<NameAttribute> {
        [
            (AttributeKind::CommonName, &self.common_name),
            (AttributeKind::CountryName, &self.country_name),
            (AttributeKind::StateOrProvinceName, &self.state_or_province_name),
            (AttributeKind::LocalityName, &self.locality_name),
            (AttributeKind::OrganizationName, &self.organization_name),
            (AttributeKind::OrganizationalUnitName, &self.organizational_unit_name),
            (AttributeKind::EmailAddress, &self.email_address),
        ]
        .into_iter()
        .filter_map(|(kind, value)| {
            value.as_ref().map(|v| NameAttribute {
                name: kind.name().to_string(),
                value: v.clone(),
            })
        })
        .collect()
    }

    /// Converts to the distinguished name type used for certificate assembly
    pub(crate) fn to_distinguished_name(&self) -> Result<DistinguishedName> {
        let mut dn = DistinguishedName::new();
        let mut push = |kind: AttributeKind, value: &Option<String>| -> Result<()> {
            if let Some(v) = value {
                dn.push(kind.dn_type(), kind.dn_value(v)?);
            }
            Ok(())
        };
        push(AttributeKind::CommonName, &self.common_name)?;
        push(AttributeKind::CountryName, &self.country_name)?;
        push(AttributeKind::StateOrProvinceName, &self.state_or_province_name)?;
        push(AttributeKind::LocalityName, &self.locality_name)?;
        push(AttributeKind::OrganizationName, &self.organization_name)?;
        push(
            AttributeKind::OrganizationalUnitName,
            &self.organizational_unit_name,
        )?;
        push(AttributeKind::EmailAddress, &self.email_address)?;
        Ok(dn)
    }
}

/// One attribute of a subject or issuer name, as read back from a certificate.
///
/// `name` is the attribute's conventional name (`commonName`, ...) or,
/// for attributes we don't know, its dotted OID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameAttribute {
    /// Attribute name
    pub name: String,
    /// Attribute value
    pub value: String,
}

impl NameAttribute {
    /// Convenience constructor
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The attribute types a [`Subject`] can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeKind {
    CommonName,
    CountryName,
    StateOrProvinceName,
    LocalityName,
    OrganizationName,
    OrganizationalUnitName,
    EmailAddress,
}

impl AttributeKind {
    fn name(self) -> &'static str {
        match self {
            AttributeKind::CommonName => "commonName",
            AttributeKind::CountryName => "countryName",
            AttributeKind::StateOrProvinceName => "stateOrProvinceName",
            AttributeKind::LocalityName => "localityName",
            AttributeKind::OrganizationName => "organizationName",
            AttributeKind::OrganizationalUnitName => "organizationalUnitName",
            AttributeKind::EmailAddress => "emailAddress",
        }
    }

    fn dn_type(self) -> DnType {
        match self {
            AttributeKind::CommonName => DnType::CommonName,
            AttributeKind::CountryName => DnType::CountryName,
            AttributeKind::StateOrProvinceName => DnType::StateOrProvinceName,
            AttributeKind::LocalityName => DnType::LocalityName,
            AttributeKind::OrganizationName => DnType::OrganizationName,
            AttributeKind::OrganizationalUnitName => DnType::OrganizationalUnitName,
            AttributeKind::EmailAddress => DnType::CustomDnType(EMAIL_ADDRESS_OID.to_vec()),
        }
    }

    fn dn_value(self, value: &str) -> Result<DnValue> {
        match self {
            // PKCS#9 requires IA5String here
            AttributeKind::EmailAddress => Ia5String::try_from(value.to_string())
                .map(DnValue::Ia5String)
                .map_err(|_| {
                    Error::InvalidOptions(format!("emailAddress {value:?} is not plain ASCII"))
                }),
            _ => Ok(DnValue::Utf8String(value.to_string())),
        }
    }
}

/// Returns the conventional attribute name for a dotted OID string, if it is one we know
pub(crate) fn attribute_name_for_oid(oid: &str) -> Option<&'static str> {
    Some(match oid {
        "2.5.4.3" => "commonName",
        "2.5.4.6" => "countryName",
        "2.5.4.8" => "stateOrProvinceName",
        "2.5.4.7" => "localityName",
        "2.5.4.10" => "organizationName",
        "2.5.4.11" => "organizationalUnitName",
        "1.2.840.113549.1.9.1" => "emailAddress",
        _ => return None,
    })
}

#[cfg(test)]
mod test {
    use super::{attribute_name_for_oid, NameAttribute, Subject};

    #[test]
    fn default_identity_has_seven_fields() {
        let attrs = Subject::default().attributes();
        assert_eq!(attrs.len(), 7);
        assert_eq!(attrs[0], NameAttribute::new("commonName", "Test"));
        assert_eq!(
            attrs[6],
            NameAttribute::new("emailAddress", "test@example.com")
        );
    }

    #[test]
    fn partial_subject_does_not_merge() {
        let s = Subject::common_name("localhost");
        assert_eq!(
            s.attributes(),
            vec![NameAttribute::new("commonName", "localhost")]
        );
    }

    #[test]
    fn deserializes_camel_case() {
        let s: Subject = serde_json::from_str(
            r#"{"commonName": "Anchora HTTP Server", "organizationName": "Mutiny"}"#,
        )
        .unwrap();
        assert_eq!(
            s,
            Subject::common_name("Anchora HTTP Server").with_organization("Mutiny")
        );
    }

    #[test]
    fn rejects_unknown_attribute() {
        let r = serde_json::from_str::<Subject>(r#"{"nickName": "x"}"#);
        assert!(r.is_err());
    }

    #[test]
    fn non_ascii_email_is_refused() {
        let s = Subject {
            email_address: Some("tëst@example.com".into()),
            ..Subject::empty()
        };
        assert!(s.to_distinguished_name().is_err());
    }

    #[test]
    fn oid_names() {
        assert_eq!(attribute_name_for_oid("2.5.4.3"), Some("commonName"));
        assert_eq!(attribute_name_for_oid("1.2.3.4"), None);
    }
}
