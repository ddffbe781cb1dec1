//! Upstream TLS configuration and HTTPS client construction.
//!
//! # Responsibilities
//! - Build a per-route rustls client config from PEM material
//! - Optionally present a client certificate (mutual TLS)
//! - Trust a route-supplied CA, or the Mozilla root set when none is given
//! - Honor the per-route skip-verification flag
//!
//! # Design Decisions
//! - ring is the crypto provider; no process-wide default is installed
//! - Malformed certificate or key material is a hard error
//! - Skipping verification still checks handshake signatures

use std::sync::Arc;

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use thiserror::Error;

/// HTTP client able to reach both `http` and `https` origins.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Errors raised while building a TLS client configuration.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("invalid client certificate: {0}")]
    ClientCertificate(String),

    #[error("invalid client key: {0}")]
    ClientKey(String),

    #[error("invalid CA certificate")]
    CaCertificate,

    #[error("TLS error: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Build a client TLS configuration from PEM text.
///
/// The client certificate is only loaded when both `client_cert` and
/// `client_key` are non-empty. An empty `ca_cert` falls back to the Mozilla
/// root set.
pub fn configure_tls(
    client_cert: &str,
    client_key: &str,
    ca_cert: &str,
    skip_verify: bool,
) -> Result<ClientConfig, TlsError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let roots = root_store(ca_cert)?;

    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()?;

    let builder = if skip_verify {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification::new(provider)))
    } else {
        builder.with_root_certificates(roots)
    };

    let config = if !client_cert.is_empty() && !client_key.is_empty() {
        let certs = parse_certificates(client_cert).map_err(TlsError::ClientCertificate)?;
        let key = parse_private_key(client_key)?;
        builder.with_client_auth_cert(certs, key)?
    } else {
        builder.with_no_client_auth()
    };

    Ok(config)
}

/// Wrap a TLS configuration into an HTTP client.
pub fn upstream_client(config: ClientConfig) -> UpstreamClient {
    let connector = HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_http1()
        .build();

    Client::builder(TokioExecutor::new()).build(connector)
}

fn parse_certificates(pem: &str) -> Result<Vec<CertificateDer<'static>>, String> {
    let certs = rustls_pemfile::certs(&mut pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    if certs.is_empty() {
        return Err("no certificate found in PEM".to_string());
    }
    Ok(certs)
}

fn parse_private_key(pem: &str) -> Result<PrivateKeyDer<'static>, TlsError> {
    rustls_pemfile::private_key(&mut pem.as_bytes())
        .map_err(|e| TlsError::ClientKey(e.to_string()))?
        .ok_or_else(|| TlsError::ClientKey("no private key found in PEM".to_string()))
}

fn root_store(ca_cert: &str) -> Result<RootCertStore, TlsError> {
    if ca_cert.is_empty() {
        return Ok(RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        });
    }

    let certs = parse_certificates(ca_cert).map_err(|_| TlsError::CaCertificate)?;
    let mut roots = RootCertStore::empty();
    for cert in certs {
        roots.add(cert).map_err(|_| TlsError::CaCertificate)?;
    }
    Ok(roots)
}

/// Accepts any server certificate. Signatures are still verified so the
/// handshake itself stays sound.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl SkipServerVerification {
    fn new(provider: Arc<CryptoProvider>) -> Self {
        Self(provider)
    }
}

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
