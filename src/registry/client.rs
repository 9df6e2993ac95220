// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP JSON client for the identity registry (`/api/v1.0`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use super::{
    DidDocument, IdentityRegistry, RegistryError, RegistryResult, SaveMetadataData,
    SaveVerificationMethodsData, Signed, VerificationMethod,
};

#[derive(Debug, Deserialize)]
struct PublicKeyResponse {
    pubkey: String,
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: String,
    http: Client,
}

impl RegistryClient {
    pub fn new(base_url: &str) -> RegistryResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| RegistryError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public URL of a DID document.
    pub fn document_url(base_url: &str, did: &str) -> String {
        format!("{}/api/v1.0/diddoc/{did}", base_url.trim_end_matches('/'))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1.0{path}", self.base_url)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> RegistryResult<()> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| RegistryError::Request(format!("POST {path} failed: {e}")))?;

        check_status(response, path).await.map(|_| ())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RegistryResult<T> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| RegistryError::Request(format!("GET {path} failed: {e}")))?;

        check_status(response, path)
            .await?
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(format!("GET {path} invalid JSON: {e}")))
    }
}

async fn check_status(response: Response, path: &str) -> RegistryResult<Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(RegistryError::NotFound(path.to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RegistryError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

#[async_trait]
impl IdentityRegistry for RegistryClient {
    async fn register(
        &self,
        did: &str,
        verification_methods: Vec<VerificationMethod>,
        authentication: Vec<String>,
    ) -> RegistryResult<()> {
        let body = json!({
            "did": did,
            "verification_method": verification_methods,
            "authentication": authentication,
        });
        self.post_json("/diddoc/register", &body).await
    }

    async fn get(&self, did: &str) -> RegistryResult<DidDocument> {
        self.get_json(&format!("/diddoc/{did}")).await
    }

    async fn save_metadata(&self, request: Signed<SaveMetadataData>) -> RegistryResult<()> {
        let path = format!("/diddoc/{}/metadata", request.data.did);
        self.post_json(&path, &request).await
    }

    async fn save_verification_methods(
        &self,
        request: Signed<SaveVerificationMethodsData>,
    ) -> RegistryResult<()> {
        let path = format!("/diddoc/{}/verification-methods", request.data.did);
        self.post_json(&path, &request).await
    }

    async fn get_public_key(&self, address: &str) -> RegistryResult<String> {
        let response: PublicKeyResponse = self.get_json(&format!("/accounts/{address}/pubkey")).await?;
        Ok(response.pubkey)
    }

    async fn register_account(&self, public_key_base58: &str) -> RegistryResult<()> {
        self.post_json("/accounts", &json!({ "pubkey": public_key_base58 })).await
    }
}
