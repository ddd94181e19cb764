//! Shared fixtures for origin registry integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::net::TcpListener;

use pkgclaim_core::{RegistryConfig, ServerNameClaim};
use pkgclaim_registry::{OriginClient, OriginClientConfig, PackageValidator};
use serde_json::Value;
use sha2::{Digest, Sha256};
use wiremock::MockServer;

/// The server name every fixture package claims.
pub const SERVER_NAME: &str = "io.github.acme/foo";

pub fn claim() -> ServerNameClaim {
    ServerNameClaim::new(SERVER_NAME).unwrap()
}

/// Client settings that let bundles be served by a local mock host.
pub fn client_config() -> OriginClientConfig {
    OriginClientConfig::new().allow_bundle_host("127.0.0.1")
}

pub fn validator() -> PackageValidator {
    validator_with(client_config())
}

pub fn validator_with(config: OriginClientConfig) -> PackageValidator {
    PackageValidator::new(OriginClient::new(config).unwrap())
}

/// Points every configurable registry at `base`.
pub fn config_for(base: &str) -> RegistryConfig {
    RegistryConfig::builder()
        .npm_base_url(base)
        .pypi_base_url(base)
        .nuget_base_url(format!("{base}/v3/index.json"))
        .build()
        .unwrap()
}

/// Returns a `host:port` on which nothing is listening.
pub fn refused_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("127.0.0.1:{port}")
}

/// Returns an origin URL on which nothing is listening.
pub fn refused_origin() -> String {
    format!("http://{}", refused_host())
}

/// Returns `host:port` of a mock server, as used in OCI references.
pub fn registry_host(server: &MockServer) -> String {
    server.address().to_string()
}

/// Builds an in-memory MCPB archive with the given files.
pub fn zip_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in files {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Builds an MCPB archive whose root `manifest.json` is `manifest`.
pub fn bundle(manifest: &Value) -> Vec<u8> {
    let manifest = manifest.to_string();
    zip_archive(&[
        ("manifest.json", manifest.as_bytes()),
        ("server/index.js", b"console.log('hello');\n".as_slice()),
    ])
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
