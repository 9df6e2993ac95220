// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted key layout.
//!
//! Keys are composed of a namespace (`profiles:` / `devices:`), the owning
//! profile id, a sub-namespace and the entity key. The composition doubles
//! as the prefix-scan mechanism and must stay byte-for-byte stable so that
//! existing databases remain readable.
//!
//! ```text
//! profiles:{pid}                              profile
//! profiles:{pid}:wallet                       wallet
//! profiles:{pid}:account-import-index         imported account counter
//! profiles:{pid}:hd-accounts:{address}        HD account metadata
//! profiles:{pid}:imported-accounts:{address}  imported account metadata
//! devices:{pid}:{did}                         device
//! devices:{pid}:usn:{usn}                     -> bytes of the device key
//! devices:{pid}:{address}:{did}               -> bytes of the DID
//! ```

const PROFILES: &str = "profiles:";
const DEVICES: &str = "devices:";

pub fn profile(profile_id: &str) -> String {
    format!("{PROFILES}{profile_id}")
}

pub fn wallet(profile_id: &str) -> String {
    format!("{PROFILES}{profile_id}:wallet")
}

pub fn account_import_index(profile_id: &str) -> String {
    format!("{PROFILES}{profile_id}:account-import-index")
}

/// Pass an empty address to get the scan prefix.
pub fn hd_account(profile_id: &str, address: &str) -> String {
    format!("{PROFILES}{profile_id}:hd-accounts:{address}")
}

/// Pass an empty address to get the scan prefix.
pub fn imported_account(profile_id: &str, address: &str) -> String {
    format!("{PROFILES}{profile_id}:imported-accounts:{address}")
}

pub fn device(profile_id: &str, did: &str) -> String {
    format!("{DEVICES}{profile_id}:{did}")
}

/// Pass an empty USN to get the scan prefix.
pub fn device_usn(profile_id: &str, usn: &str) -> String {
    format!("{DEVICES}{profile_id}:usn:{usn}")
}

/// Pass an empty DID to get the scan prefix.
pub fn device_address(profile_id: &str, address: &str, did: &str) -> String {
    format!("{DEVICES}{profile_id}:{address}:{did}")
}

/// Recover the DID from a value stored under a USN key.
pub fn did_from_device_key<'a>(profile_id: &str, device_key: &'a str) -> Option<&'a str> {
    device_key
        .strip_prefix(DEVICES)?
        .strip_prefix(profile_id)?
        .strip_prefix(':')
}

// =============================================================================
// Keyring names
// =============================================================================

/// Keyring name of the HD account at `index`: `{pid}_{index}`.
pub fn keyring_hd(profile_id: &str, index: u32) -> String {
    format!("{profile_id}_{index}")
}

/// Keyring name of an imported account: `{pid}_imported_{index}`.
pub fn keyring_imported(profile_id: &str, index: u64) -> String {
    format!("{profile_id}_imported_{index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_keys_match_layout() {
        assert_eq!(profile("3"), "profiles:3");
        assert_eq!(wallet("3"), "profiles:3:wallet");
        assert_eq!(account_import_index("3"), "profiles:3:account-import-index");
        assert_eq!(hd_account("3", "0xab"), "profiles:3:hd-accounts:0xab");
        assert_eq!(hd_account("3", ""), "profiles:3:hd-accounts:");
        assert_eq!(imported_account("3", "0xab"), "profiles:3:imported-accounts:0xab");
        assert_eq!(keyring_hd("3", 2), "3_2");
        assert_eq!(keyring_imported("3", 1), "3_imported_1");
    }

    #[test]
    fn device_keys_match_layout() {
        let did = "did:obada:abc";
        assert_eq!(device("u1", did), "devices:u1:did:obada:abc");
        assert_eq!(device_usn("u1", "2zYt3Xq5vYQm"), "devices:u1:usn:2zYt3Xq5vYQm");
        assert_eq!(device_address("u1", "0xab", did), "devices:u1:0xab:did:obada:abc");
        assert_eq!(device_address("u1", "0xab", ""), "devices:u1:0xab:");
    }

    #[test]
    fn did_is_recovered_from_device_key() {
        let key = device("u1", "did:obada:abc");
        assert_eq!(did_from_device_key("u1", &key), Some("did:obada:abc"));
        assert_eq!(did_from_device_key("u2", &key), None);
    }
}
