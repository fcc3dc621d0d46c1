//! Self-signed TLS material for the webhook.
//!
//! A throwaway CA signs a single server certificate valid for every DNS name
//! the webhook service is reachable under inside the cluster. The CA
//! certificate doubles as the webhook configuration's `caBundle`.

use std::path::Path;

use jiff::Span;
use jiff::tz::TimeZone;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    Issuer, KeyPair, KeyUsagePurpose,
};
use thiserror::Error;
use tracing::debug;

/// Organization recorded in issued certificates
const ORGANIZATION: &str = "namespace-node-affinity";

/// Default validity of the generated certificates
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

/// Certificate generation errors
#[derive(Debug, Error)]
pub enum CertError {
    /// Key generation failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Certificate generation or signing failed
    #[error("certificate generation failed: {0}")]
    Generation(String),

    /// Validity window could not be computed
    #[error("invalid validity period: {0}")]
    Validity(String),

    /// Writing PEM output failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for certificate operations
pub type Result<T> = std::result::Result<T, CertError>;

/// PEM-encoded certificates for the webhook
#[derive(Clone, Debug)]
pub struct WebhookCertificates {
    /// CA certificate, used as the webhook `caBundle`
    pub ca_cert_pem: String,
    /// Server certificate signed by the CA
    pub server_cert_pem: String,
    /// Server private key
    pub server_key_pem: String,
}

/// DNS names the webhook service answers to
pub fn service_dns_names(service_name: &str, namespace: &str) -> Vec<String> {
    vec![
        service_name.to_string(),
        format!("{service_name}.{namespace}"),
        format!("{service_name}.{namespace}.svc"),
        format!("{service_name}.{namespace}.svc.cluster.local"),
    ]
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn.push(DnType::OrganizationName, ORGANIZATION);
    dn
}

/// Set `not_before` to today and `not_after` to `validity_days` from now (UTC)
fn set_validity(params: &mut CertificateParams, validity_days: u32) -> Result<()> {
    let now = jiff::Zoned::now().with_time_zone(TimeZone::UTC);
    let span = Span::new()
        .try_days(i64::from(validity_days))
        .map_err(|e| CertError::Validity(e.to_string()))?;
    let expiry = now
        .checked_add(span)
        .map_err(|e| CertError::Validity(e.to_string()))?;

    let to_rcgen = |date: jiff::civil::Date| {
        rcgen::date_time_ymd(
            i32::from(date.year()),
            date.month().unsigned_abs(),
            date.day().unsigned_abs(),
        )
    };
    params.not_before = to_rcgen(now.date());
    params.not_after = to_rcgen(expiry.date());
    Ok(())
}

/// Generate a CA and a server certificate for `<service_name>.<namespace>.svc`
pub fn generate_certificates(
    service_name: &str,
    namespace: &str,
    validity_days: u32,
) -> Result<WebhookCertificates> {
    if validity_days == 0 {
        return Err(CertError::Validity(
            "validity must be at least one day".to_string(),
        ));
    }

    // CA
    let mut ca_params = CertificateParams::default();
    ca_params.distinguished_name = distinguished_name(&format!("{ORGANIZATION}-ca"));
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    set_validity(&mut ca_params, validity_days)?;

    let ca_key = KeyPair::generate()
        .map_err(|e| CertError::KeyGeneration(format!("failed to generate CA key: {e}")))?;
    let ca_cert = ca_params
        .self_signed(&ca_key)
        .map_err(|e| CertError::Generation(format!("failed to create CA cert: {e}")))?;
    let ca_cert_pem = ca_cert.pem();

    // Server
    let dns_names = service_dns_names(service_name, namespace);
    let common_name = format!("{service_name}.{namespace}.svc");
    let mut server_params = CertificateParams::new(dns_names)
        .map_err(|e| CertError::Generation(format!("invalid DNS name: {e}")))?;
    server_params.distinguished_name = distinguished_name(&common_name);
    server_params.is_ca = IsCa::NoCa;
    server_params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    server_params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ClientAuth,
        ExtendedKeyUsagePurpose::ServerAuth,
    ];
    set_validity(&mut server_params, validity_days)?;

    let server_key = KeyPair::generate()
        .map_err(|e| CertError::KeyGeneration(format!("failed to generate server key: {e}")))?;
    let issuer = Issuer::from_ca_cert_pem(&ca_cert_pem, &ca_key)
        .map_err(|e| CertError::Generation(format!("failed to create issuer: {e}")))?;
    let server_cert = server_params
        .signed_by(&server_key, &issuer)
        .map_err(|e| CertError::Generation(format!("failed to sign server cert: {e}")))?;

    debug!(common_name = %common_name, validity_days, "Generated webhook certificates");

    Ok(WebhookCertificates {
        ca_cert_pem,
        server_cert_pem: server_cert.pem(),
        server_key_pem: server_key.serialize_pem(),
    })
}

/// Write PEM contents to `path`, creating parent directories as needed
pub fn write_pem(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}
