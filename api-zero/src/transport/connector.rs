//! Connector assembly for [`HyperTransport`](super::HyperTransport).
//!
//! HTTPS needs a rustls crypto provider and a source of trust anchors, both
//! picked at compile time:
//!
//! | Feature            | Provides                                      |
//! |--------------------|-----------------------------------------------|
//! | `tls-ring`         | ring provider (part of `tls`)                 |
//! | `tls-aws-lc`       | aws-lc-rs provider                            |
//! | `tls-native-roots` | platform trust store (part of `tls`)          |
//! | `tls-webpki-roots` | bundled Mozilla roots                         |
//!
//! With trust anchors enabled but no provider feature, the process-wide
//! provider from `rustls::crypto::CryptoProvider::install_default()` is
//! picked up at runtime.

use std::time::Duration;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::ClientConfig;

/// Whether this build can reach `https://` endpoints without extra setup.
#[inline]
pub const fn tls_available() -> bool {
    let provider = cfg!(feature = "tls-ring") || cfg!(feature = "tls-aws-lc");
    let roots = cfg!(feature = "tls-native-roots") || cfg!(feature = "tls-webpki-roots");
    provider && roots
}

/// The client TLS configuration used when the caller does not supply one.
///
/// `None` when either the provider or the trust anchors are missing.
pub fn client_tls_config() -> Option<ClientConfig> {
    #[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
    {
        let roots = trust_anchors();
        let config = ClientConfig::builder_with_provider(crypto_provider()?)
            .with_safe_default_protocol_versions()
            .ok()?
            .with_root_certificates(roots)
            .with_no_client_auth();
        Some(config)
    }

    #[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
    {
        None
    }
}

#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn crypto_provider() -> Option<std::sync::Arc<rustls::crypto::CryptoProvider>> {
    if cfg!(feature = "tls-ring") {
        #[cfg(feature = "tls-ring")]
        return Some(std::sync::Arc::new(rustls::crypto::ring::default_provider()));
    }
    if cfg!(feature = "tls-aws-lc") {
        #[cfg(feature = "tls-aws-lc")]
        return Some(std::sync::Arc::new(
            rustls::crypto::aws_lc_rs::default_provider(),
        ));
    }
    rustls::crypto::CryptoProvider::get_default().cloned()
}

/// Platform roots win when both sources are enabled.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn trust_anchors() -> rustls::RootCertStore {
    let mut store = rustls::RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let loaded = rustls_native_certs::load_native_certs();
        #[cfg(feature = "tracing")]
        for err in &loaded.errors {
            tracing::debug!(error = %err, "skipping unreadable platform certificate");
        }
        let (added, ignored) = store.add_parsable_certificates(loaded.certs);
        #[cfg(feature = "tracing")]
        tracing::trace!(added, ignored, "loaded platform trust anchors");
        #[cfg(not(feature = "tracing"))]
        let _ = (added, ignored);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    store
}

/// TCP connector that lets `https://` URIs through to the TLS layer.
pub fn tcp_connector(connect_timeout: Option<Duration>) -> HttpConnector {
    let mut tcp = HttpConnector::new();
    tcp.enforce_http(false);
    tcp.set_nodelay(true);
    tcp.set_connect_timeout(connect_timeout);
    tcp
}

/// HTTP/1.1 connector serving both schemes on top of `tcp`.
pub fn https_connector(tls: ClientConfig, tcp: HttpConnector) -> HttpsConnector<HttpConnector> {
    HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .wrap_connector(tcp)
}
