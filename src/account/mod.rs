// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Engine
//!
//! Profile, wallet and account lifecycle over the keyring, the record store
//! and the chain.
//!
//! ## Invariants
//!
//! - At most one wallet per profile.
//! - HD index `n + 1` is only allocated once the account at `n` shows
//!   on-chain activity (progressive discovery).
//! - Keyring writes come first; the record-store batch is the commit point
//!   and a failed batch deletes the keyring entry again.
//! - Every mutating operation holds the profile's exclusive section.
//! - Ownership is read from the credential's explicit owner, never from its
//!   name.

pub mod error;
pub mod locks;
pub mod models;

use std::sync::Arc;

use k256::ecdsa::SigningKey;

use crate::blockchain::{ChainError, ChainMsg, ChainService, TxOutcome};
use crate::events::{AccountEvent, EventBus, EventPayload, Topic};
use crate::keyring::{hd, CredentialKind, CredentialOwner, CredentialRecord, CredentialStore};
use crate::saga::{CompensationError, Saga};
use crate::storage::{keys, AccountSnapshot, AccountSnapshotCache, RecordStore, RequireOwner, WriteBatch};
use crate::validation::ValidationErrors;

pub use error::{AccountError, AccountResult};
pub use locks::ProfileLocks;
pub use models::{Account, AccountMetadata, Balance, NewProfile, Profile, ProfileAccounts, Wallet};

/// Lowercase form used for keys, keyring lookups and cache entries.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

pub struct AccountEngine {
    records: Arc<dyn RecordStore>,
    keyring: Arc<dyn CredentialStore>,
    chain: Arc<dyn ChainService>,
    bus: Arc<EventBus>,
    cache: Arc<AccountSnapshotCache>,
    locks: ProfileLocks,
    coin_type: u32,
}

impl AccountEngine {
    pub fn new(
        records: Arc<dyn RecordStore>,
        keyring: Arc<dyn CredentialStore>,
        chain: Arc<dyn ChainService>,
        bus: Arc<EventBus>,
        cache: Arc<AccountSnapshotCache>,
        coin_type: u32,
    ) -> Self {
        Self {
            records,
            keyring,
            chain,
            bus,
            cache,
            locks: ProfileLocks::new(),
            coin_type,
        }
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    pub async fn register_profile(&self, profile_id: &str, new: NewProfile) -> AccountResult<Profile> {
        let mut errors = ValidationErrors::new();
        errors.require("id", profile_id);
        errors.require_email("email", &new.email);
        errors.into_result()?;

        let _guard = self.locks.lock(profile_id).await;

        if self.records.has(&keys::profile(profile_id))? {
            return Err(AccountError::ProfileExists);
        }

        let profile = Profile {
            id: profile_id.to_string(),
            email: new.email,
        };

        let mut batch = WriteBatch::new();
        batch.set_json(keys::profile(profile_id), &profile)?;
        batch.set_json(keys::account_import_index(profile_id), &0u64)?;
        self.records.write(batch)?;

        tracing::info!(profile_id = %profile_id, "Profile registered");
        Ok(profile)
    }

    pub fn profile(&self, profile_id: &str) -> AccountResult<Profile> {
        self.records
            .get_json(&keys::profile(profile_id))?
            .ok_or(AccountError::ProfileNotExists)
    }

    // =========================================================================
    // Wallets
    // =========================================================================

    pub fn wallet(&self, profile_id: &str) -> AccountResult<Wallet> {
        self.records
            .get_json(&keys::wallet(profile_id))?
            .ok_or(AccountError::WalletNotExists)
    }

    pub fn wallet_mnemonic(&self, profile_id: &str) -> AccountResult<String> {
        Ok(self.wallet(profile_id)?.mnemonic)
    }

    /// Fresh 24-word mnemonic; nothing is stored.
    pub fn generate_mnemonic() -> AccountResult<String> {
        Ok(hd::generate_mnemonic()?)
    }

    /// Create the profile wallet and allocate HD index 0.
    ///
    /// With `force`, an existing wallet and all its HD accounts are deleted
    /// first.
    pub async fn new_wallet(&self, profile_id: &str, mnemonic: &str, force: bool) -> AccountResult<Wallet> {
        let _guard = self.locks.lock(profile_id).await;
        self.new_wallet_locked(profile_id, mnemonic, force).await
    }

    async fn new_wallet_locked(&self, profile_id: &str, mnemonic: &str, force: bool) -> AccountResult<Wallet> {
        hd::validate_mnemonic(mnemonic)?;
        if !self.records.has(&keys::profile(profile_id))? {
            return Err(AccountError::ProfileNotExists);
        }

        let has_wallet = self.records.has(&keys::wallet(profile_id))?;
        if has_wallet && !force {
            return Err(AccountError::WalletExists);
        }
        if has_wallet {
            self.delete_wallet_locked(profile_id).await?;
        }

        let wallet = Wallet {
            mnemonic: mnemonic.to_string(),
            account_index: 0,
        };
        self.records.put_json(&keys::wallet(profile_id), &wallet)?;

        if let Err(e) = self.new_account_locked(profile_id, AccountMetadata::default()).await {
            return Err(self.rollback_wallet(profile_id, e).await);
        }

        tracing::info!(profile_id = %profile_id, "Wallet created");
        Ok(wallet)
    }

    /// Create the wallet, then rediscover used accounts until the first
    /// index without on-chain activity.
    ///
    /// Any failure other than reaching that index deletes the wallet and
    /// every entry created during the attempt.
    pub async fn import_wallet(&self, profile_id: &str, mnemonic: &str, force: bool) -> AccountResult<()> {
        let _guard = self.locks.lock(profile_id).await;

        self.new_wallet_locked(profile_id, mnemonic, force).await?;

        loop {
            match self.new_account_locked(profile_id, AccountMetadata::default()).await {
                Ok(account) => {
                    tracing::debug!(profile_id = %profile_id, address = %account.address, "Account rediscovered");
                }
                Err(AccountError::AccountHasZeroTx) => break,
                Err(e) => return Err(self.rollback_wallet(profile_id, e).await),
            }
        }

        let wallet = self.wallet(profile_id)?;
        tracing::info!(profile_id = %profile_id, accounts = wallet.account_index + 1, "Wallet imported");
        Ok(())
    }

    pub async fn delete_wallet(&self, profile_id: &str) -> AccountResult<()> {
        let _guard = self.locks.lock(profile_id).await;
        self.delete_wallet_locked(profile_id).await
    }

    async fn rollback_wallet(&self, profile_id: &str, original: AccountError) -> AccountError {
        match self.delete_wallet_locked(profile_id).await {
            Ok(()) => original,
            Err(rollback) => AccountError::RollbackFailed {
                rollback: CompensationError {
                    step: "delete wallet".to_string(),
                    message: rollback.to_string(),
                },
                original: Box::new(original),
            },
        }
    }

    /// Walk the HD indexes downward, deleting keyring entries eagerly and
    /// record entries in one batch together with the wallet.
    async fn delete_wallet_locked(&self, profile_id: &str) -> AccountResult<()> {
        let wallet = self.wallet(profile_id)?;
        let mut batch = WriteBatch::new();
        let mut deleted = Vec::new();

        for index in (0..=wallet.account_index).rev() {
            let name = keys::keyring_hd(profile_id, index);

            // Discovery may have stopped before this index was created.
            let Some(record) = self.keyring.get(&name)? else {
                continue;
            };

            match self.keyring.delete(&name) {
                Ok(()) | Err(crate::keyring::KeyringError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }

            batch.delete(keys::hd_account(profile_id, &record.address));
            deleted.push(record.address);
        }

        batch.delete(keys::wallet(profile_id));
        self.records.write(batch)?;

        for address in deleted {
            self.cache.invalidate(&address);
            self.bus
                .emit(
                    Topic::AccountDeleted,
                    EventPayload::Account(AccountEvent {
                        profile_id: profile_id.to_string(),
                        address,
                    }),
                )
                .await?;
        }

        tracing::info!(profile_id = %profile_id, "Wallet deleted");
        Ok(())
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Allocate the next HD account (progressive discovery).
    pub async fn new_account(&self, profile_id: &str, metadata: AccountMetadata) -> AccountResult<Account> {
        let _guard = self.locks.lock(profile_id).await;
        self.new_account_locked(profile_id, metadata).await
    }

    async fn new_account_locked(&self, profile_id: &str, metadata: AccountMetadata) -> AccountResult<Account> {
        let mut wallet = self.wallet(profile_id)?;

        let has_accounts = !self
            .records
            .scan_prefix(&keys::hd_account(profile_id, ""))?
            .is_empty();

        if has_accounts {
            let last = self
                .keyring
                .get(&keys::keyring_hd(profile_id, wallet.account_index))?
                .ok_or(AccountError::AccountNotExists)?;

            if !self.chain.has_on_chain_activity(&last.address).await? {
                return Err(AccountError::AccountHasZeroTx);
            }

            wallet.account_index += 1;
        }

        let index = wallet.account_index;
        let name = keys::keyring_hd(profile_id, index);
        let record = self.keyring.create(
            &name,
            &wallet.mnemonic,
            &hd::derivation_path(self.coin_type, index),
            CredentialOwner::hd(profile_id, index),
        )?;

        let mut saga = Saga::new("new_account");
        let keyring = Arc::clone(&self.keyring);
        saga.on_rollback("delete keyring entry", move || keyring.delete(&name));

        let mut batch = WriteBatch::new();
        batch.set_json(keys::hd_account(profile_id, &record.address), &metadata)?;
        batch.set_json(keys::wallet(profile_id), &wallet)?;
        if let Err(e) = self.records.write(batch) {
            return Err(saga.abort_with(e.into()));
        }
        saga.commit();

        tracing::info!(profile_id = %profile_id, index, address = %record.address, "HD account created");
        self.emit_created(profile_id, &record.address).await?;
        Ok(self.created_view(&record, metadata).await)
    }

    /// Import an armored private key under the next import counter.
    pub async fn import_account(
        &self,
        profile_id: &str,
        armor: &str,
        passphrase: &str,
        metadata: AccountMetadata,
    ) -> AccountResult<Account> {
        let _guard = self.locks.lock(profile_id).await;

        let index: u64 = self
            .records
            .get_json(&keys::account_import_index(profile_id))?
            .ok_or(AccountError::ProfileNotExists)?;
        let next = index + 1;

        let name = keys::keyring_imported(profile_id, next);
        let record = self.keyring.import_armored(
            &name,
            armor,
            passphrase,
            CredentialOwner::imported(profile_id, next),
        )?;

        let mut saga = Saga::new("import_account");
        let keyring = Arc::clone(&self.keyring);
        saga.on_rollback("delete keyring entry", move || keyring.delete(&name));

        let mut batch = WriteBatch::new();
        batch.set_json(keys::imported_account(profile_id, &record.address), &metadata)?;
        batch.set_json(keys::account_import_index(profile_id), &next)?;
        if let Err(e) = self.records.write(batch) {
            return Err(saga.abort_with(e.into()));
        }
        saga.commit();

        tracing::info!(profile_id = %profile_id, address = %record.address, "Account imported");
        self.emit_created(profile_id, &record.address).await?;
        Ok(self.created_view(&record, metadata).await)
    }

    /// Delete an imported account. HD accounts only go with their wallet.
    pub async fn delete_account(&self, profile_id: &str, address: &str) -> AccountResult<()> {
        let _guard = self.locks.lock(profile_id).await;

        let record = self.owned_credential(profile_id, address)?;
        if !record.is_imported() {
            return Err(AccountError::HdAccountDelete);
        }

        let mut batch = WriteBatch::new();
        batch.delete(keys::imported_account(profile_id, &record.address));
        self.records.write(batch)?;
        self.keyring.delete(&record.name)?;

        self.cache.invalidate(&record.address);
        self.bus
            .emit(
                Topic::AccountDeleted,
                EventPayload::Account(AccountEvent {
                    profile_id: profile_id.to_string(),
                    address: record.address.clone(),
                }),
            )
            .await?;

        tracing::info!(profile_id = %profile_id, address = %record.address, "Account deleted");
        Ok(())
    }

    pub fn export_account(&self, profile_id: &str, address: &str, passphrase: &str) -> AccountResult<String> {
        let record = self.owned_credential(profile_id, address)?;
        Ok(self.keyring.export_armored(&record.name, passphrase)?)
    }

    pub fn account_private_key(&self, profile_id: &str, address: &str) -> AccountResult<SigningKey> {
        let record = self.owned_credential(profile_id, address)?;
        Ok(self.keyring.signing_key(&record.name)?)
    }

    pub async fn update_account_name(&self, profile_id: &str, address: &str, name: &str) -> AccountResult<()> {
        let _guard = self.locks.lock(profile_id).await;
        let address = normalize_address(address);

        for prefix in [
            keys::hd_account(profile_id, ""),
            keys::imported_account(profile_id, ""),
        ] {
            for (key, value) in self.records.scan_prefix(&prefix)? {
                if key.strip_prefix(&prefix) != Some(address.as_str()) {
                    continue;
                }

                let mut metadata: AccountMetadata = serde_json::from_slice(&value)
                    .map_err(|e| AccountError::Records(e.into()))?;
                metadata.name = name.to_string();
                self.records.put_json(&key, &metadata)?;
                return Ok(());
            }
        }

        Err(AccountError::AccountNotExists)
    }

    pub async fn profile_accounts(&self, profile_id: &str) -> AccountResult<ProfileAccounts> {
        let mut accounts = ProfileAccounts::default();

        if let Some(wallet) = self.records.get_json::<Wallet>(&keys::wallet(profile_id))? {
            for index in 0..=wallet.account_index {
                let record = self
                    .keyring
                    .get(&keys::keyring_hd(profile_id, index))?
                    .require_owner(profile_id)
                    .map_err(|_| AccountError::AccountNotExists)?;
                let metadata = self.metadata(profile_id, &record)?;
                accounts.hd_accounts.push(self.account_view(&record, metadata).await?);
            }
        }

        let prefix = keys::imported_account(profile_id, "");
        for (key, value) in self.records.scan_prefix(&prefix)? {
            let address = key.strip_prefix(&prefix).unwrap_or_default();
            let record = self.owned_credential(profile_id, address)?;
            let metadata: AccountMetadata =
                serde_json::from_slice(&value).map_err(|e| AccountError::Records(e.into()))?;
            accounts.imported_accounts.push(self.account_view(&record, metadata).await?);
        }

        Ok(accounts)
    }

    pub async fn profile_account(&self, profile_id: &str, address: &str) -> AccountResult<Account> {
        let record = self.owned_credential(profile_id, address)?;
        let metadata = self.metadata(profile_id, &record)?;
        self.account_view(&record, metadata).await
    }

    /// Owning profile of `address`, from the credential's explicit owner.
    pub fn profile_by_address(&self, address: &str) -> AccountResult<Option<String>> {
        Ok(self
            .keyring
            .lookup_by_address(&normalize_address(address))?
            .map(|record| record.owner.profile_id))
    }

    pub fn has_account(&self, profile_id: &str, address: &str) -> bool {
        self.owned_credential(profile_id, address).is_ok()
    }

    pub async fn balance(&self, address: &str) -> AccountResult<Balance> {
        let address = normalize_address(address);
        let balance = self.chain.balance(&address).await?;
        Ok(Balance { address, balance })
    }

    /// Send native coins from an owned account.
    pub async fn send_coins(&self, profile_id: &str, from: &str, to: &str, amount: &str) -> AccountResult<TxOutcome> {
        let key = self.account_private_key(profile_id, from)?;
        let from = normalize_address(from);
        let to = normalize_address(to);

        if !self.chain.has_on_chain_activity(&from).await? {
            return Err(ChainError::InsufficientFunds.into());
        }

        let outcome = self
            .chain
            .send_signed_tx(
                ChainMsg::Send {
                    to: to.clone(),
                    amount: amount.to_string(),
                },
                &key,
            )
            .await?;

        self.cache.invalidate(&from);
        self.cache.invalidate(&to);
        tracing::info!(profile_id = %profile_id, from = %from, to = %to, tx_hash = %outcome.tx_hash, "Coins sent");
        Ok(outcome)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn owned_credential(&self, profile_id: &str, address: &str) -> AccountResult<CredentialRecord> {
        self.keyring
            .lookup_by_address(&normalize_address(address))?
            .require_owner(profile_id)
            .map_err(|_| AccountError::AccountNotExists)
    }

    fn metadata(&self, profile_id: &str, record: &CredentialRecord) -> AccountResult<AccountMetadata> {
        let key = match record.owner.kind {
            CredentialKind::Hd => keys::hd_account(profile_id, &record.address),
            CredentialKind::Imported => keys::imported_account(profile_id, &record.address),
        };
        Ok(self.records.get_json(&key)?.unwrap_or_default())
    }

    async fn emit_created(&self, profile_id: &str, address: &str) -> AccountResult<()> {
        self.bus
            .emit(
                Topic::AccountCreated,
                EventPayload::Account(AccountEvent {
                    profile_id: profile_id.to_string(),
                    address: address.to_string(),
                }),
            )
            .await?;
        Ok(())
    }

    async fn snapshot(&self, address: &str) -> AccountResult<AccountSnapshot> {
        if let Some(snapshot) = self.cache.get(address) {
            return Ok(snapshot);
        }

        let balance = self.chain.balance(address).await?;
        let asset_count = self.chain.assets_by_address(address).await?.len();
        let snapshot = AccountSnapshot { balance, asset_count };
        self.cache.put(address, snapshot.clone());
        Ok(snapshot)
    }

    async fn account_view(&self, record: &CredentialRecord, metadata: AccountMetadata) -> AccountResult<Account> {
        let snapshot = self.snapshot(&record.address).await?;
        Ok(Account::from_parts(record, metadata, snapshot))
    }

    /// View of an account whose records are already committed. Chain state
    /// is best-effort: a failed read must not report the allocation as
    /// failed.
    async fn created_view(&self, record: &CredentialRecord, metadata: AccountMetadata) -> Account {
        let snapshot = match self.snapshot(&record.address).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(address = %record.address, error = %e, "Chain state unavailable for new account");
                AccountSnapshot::unknown()
            }
        };
        Account::from_parts(record, metadata, snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::armor;
    use crate::testing::{Harness, MNEMONIC, MNEMONIC_ADDRESS_0};
    use k256::elliptic_curve::rand_core::OsRng;

    async fn registered(h: &Harness, profile_id: &str) {
        h.services
            .accounts
            .register_profile(
                profile_id,
                NewProfile {
                    email: "jon.doe@supermail.com".to_string(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn register_profile_once() {
        let h = Harness::new();
        registered(&h, "3").await;

        let accounts = &h.services.accounts;
        assert_eq!(accounts.profile("3").unwrap().email, "jon.doe@supermail.com");
        let err = accounts
            .register_profile("3", NewProfile { email: "x@y.io".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::ProfileExists));
        assert!(matches!(accounts.profile("4"), Err(AccountError::ProfileNotExists)));
    }

    #[tokio::test]
    async fn register_profile_validates_email() {
        let h = Harness::new();
        let err = h
            .services
            .accounts
            .register_profile("3", NewProfile { email: "nope".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation(ref v) if v.fields()[0].field == "email"));
    }

    #[tokio::test]
    async fn new_wallet_allocates_index_zero_and_blocks_unused_discovery() {
        let h = Harness::new();
        registered(&h, "3").await;
        let accounts = &h.services.accounts;

        accounts.new_wallet("3", MNEMONIC, false).await.unwrap();
        let listed = accounts.profile_accounts("3").await.unwrap();
        assert_eq!(listed.hd_accounts.len(), 1);
        assert_eq!(listed.hd_accounts[0].address, MNEMONIC_ADDRESS_0);

        let err = accounts
            .new_account("3", AccountMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::AccountHasZeroTx));
        assert_eq!(accounts.wallet("3").unwrap().account_index, 0);
        assert_eq!(accounts.profile_accounts("3").await.unwrap().hd_accounts.len(), 1);
    }

    #[tokio::test]
    async fn second_wallet_without_force_is_rejected() {
        let h = Harness::new();
        registered(&h, "3").await;
        let accounts = &h.services.accounts;

        accounts.new_wallet("3", MNEMONIC, false).await.unwrap();
        let err = accounts.new_wallet("3", MNEMONIC, false).await.unwrap_err();
        assert!(matches!(err, AccountError::WalletExists));
        assert_eq!(accounts.profile_accounts("3").await.unwrap().hd_accounts.len(), 1);
    }

    #[tokio::test]
    async fn invalid_mnemonic_is_rejected() {
        let h = Harness::new();
        registered(&h, "3").await;
        let err = h
            .services
            .accounts
            .new_wallet("3", "one two three", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidMnemonic));
    }

    #[tokio::test]
    async fn activity_unlocks_the_next_index() {
        let h = Harness::new();
        registered(&h, "3").await;
        let accounts = &h.services.accounts;

        accounts.new_wallet("3", MNEMONIC, false).await.unwrap();
        h.chain.set_active(MNEMONIC_ADDRESS_0);

        let second = accounts
            .new_account("3", AccountMetadata { name: "savings".to_string() })
            .await
            .unwrap();
        assert_eq!(second.name, "savings");
        assert_ne!(second.address, MNEMONIC_ADDRESS_0);
        assert_eq!(accounts.wallet("3").unwrap().account_index, 1);
        assert_eq!(accounts.profile_by_address(&second.address).unwrap().as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn import_wallet_rediscovers_used_accounts() {
        let h = Harness::new();
        registered(&h, "3").await;
        h.chain.set_active(MNEMONIC_ADDRESS_0);

        h.services.accounts.import_wallet("3", MNEMONIC, false).await.unwrap();

        // index 0 active, index 1 unused: discovery stops at 1
        assert_eq!(h.services.accounts.wallet("3").unwrap().account_index, 1);
        let listed = h.services.accounts.profile_accounts("3").await.unwrap();
        assert_eq!(listed.hd_accounts.len(), 2);
    }

    #[tokio::test]
    async fn import_wallet_rolls_back_on_collision() {
        let h = Harness::new();
        registered(&h, "3").await;
        registered(&h, "4").await;

        // Profile 4 already holds index 0 of the same mnemonic.
        h.services.accounts.new_wallet("4", MNEMONIC, false).await.unwrap();

        let err = h
            .services
            .accounts
            .import_wallet("3", MNEMONIC, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::AccountExists));
        assert!(matches!(
            h.services.accounts.wallet("3"),
            Err(AccountError::WalletNotExists)
        ));
        assert_eq!(
            h.services.accounts.profile_by_address(MNEMONIC_ADDRESS_0).unwrap().as_deref(),
            Some("4")
        );
    }

    fn mnemonic_address(index: u32) -> String {
        let key = hd::derive_signing_key(MNEMONIC, &hd::derivation_path(60, index)).unwrap();
        crate::blockchain::signing::address_of(key.verifying_key())
    }

    fn assert_wallet_fully_removed(h: &Harness, profile_id: &str, indexes: &[u32]) {
        let accounts = &h.services.accounts;
        assert!(matches!(accounts.wallet(profile_id), Err(AccountError::WalletNotExists)));
        assert!(h.kv().scan_prefix(&keys::hd_account(profile_id, "")).unwrap().is_empty());
        for &index in indexes {
            assert!(h.keyring.get(&keys::keyring_hd(profile_id, index)).unwrap().is_none());
            assert!(accounts.profile_by_address(&mnemonic_address(index)).unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn import_wallet_rolls_back_when_discovery_collides() {
        let h = Harness::new();
        registered(&h, "3").await;

        // Index 1 of the mnemonic is already held by profile 4.
        h.keyring
            .create("4_1", MNEMONIC, &hd::derivation_path(60, 1), CredentialOwner::hd("4", 1))
            .unwrap();
        h.chain.set_active(MNEMONIC_ADDRESS_0);

        let err = h
            .services
            .accounts
            .import_wallet("3", MNEMONIC, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::AccountExists));
        assert_wallet_fully_removed(&h, "3", &[0]);
        assert!(h.keyring.get("4_1").unwrap().is_some());
    }

    #[tokio::test]
    async fn import_wallet_rolls_back_on_chain_failure() {
        let h = Harness::new();
        registered(&h, "3").await;

        h.chain.set_active(MNEMONIC_ADDRESS_0);
        h.chain.set_unreachable(&mnemonic_address(1));

        let err = h
            .services
            .accounts
            .import_wallet("3", MNEMONIC, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Chain(ChainError::Rpc(_))));
        assert_wallet_fully_removed(&h, "3", &[0, 1]);
    }

    #[tokio::test]
    async fn new_wallet_requires_a_registered_profile() {
        let h = Harness::new();
        let accounts = &h.services.accounts;

        let err = accounts.new_wallet("9", MNEMONIC, false).await.unwrap_err();
        assert!(matches!(err, AccountError::ProfileNotExists));
        assert!(matches!(accounts.wallet("9"), Err(AccountError::WalletNotExists)));
        assert!(accounts.profile_by_address(MNEMONIC_ADDRESS_0).unwrap().is_none());

        let err = accounts.import_wallet("9", MNEMONIC, false).await.unwrap_err();
        assert!(matches!(err, AccountError::ProfileNotExists));
    }

    #[tokio::test]
    async fn allocated_account_is_returned_when_chain_reads_fail() {
        let h = Harness::new();
        registered(&h, "3").await;
        let accounts = &h.services.accounts;

        accounts.new_wallet("3", MNEMONIC, false).await.unwrap();
        h.chain.set_active(MNEMONIC_ADDRESS_0);
        let second = mnemonic_address(1);
        h.chain.set_unreachable(&second);

        let account = accounts
            .new_account("3", AccountMetadata { name: "second".to_string() })
            .await
            .unwrap();
        assert_eq!(account.address, second);
        assert_eq!(account.name, "second");
        assert_eq!(account.balance.balance_raw, "0");
        assert_eq!(account.asset_count, 0);
        assert_eq!(accounts.wallet("3").unwrap().account_index, 1);
        assert_eq!(accounts.profile_by_address(&second).unwrap().as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn delete_wallet_then_recreate_reproduces_index_zero() {
        let h = Harness::new();
        registered(&h, "3").await;
        let accounts = &h.services.accounts;
        let mut deleted = h.fanout.subscribe();

        accounts.new_wallet("3", MNEMONIC, false).await.unwrap();
        h.chain.set_active(MNEMONIC_ADDRESS_0);
        accounts.new_account("3", AccountMetadata::default()).await.unwrap();

        accounts.delete_wallet("3").await.unwrap();
        assert!(matches!(accounts.wallet("3"), Err(AccountError::WalletNotExists)));
        assert!(accounts.profile_accounts("3").await.unwrap().hd_accounts.is_empty());
        assert!(accounts.profile_by_address(MNEMONIC_ADDRESS_0).unwrap().is_none());

        let mut channels = Vec::new();
        while let Ok(msg) = deleted.try_recv() {
            channels.push(msg.channel);
        }
        assert_eq!(
            channels.iter().filter(|c| c.as_str() == "account.deleted").count(),
            2
        );

        accounts.new_wallet("3", MNEMONIC, false).await.unwrap();
        let listed = accounts.profile_accounts("3").await.unwrap();
        assert_eq!(listed.hd_accounts[0].address, MNEMONIC_ADDRESS_0);
    }

    #[tokio::test]
    async fn forced_wallet_replaces_the_old_one() {
        let h = Harness::new();
        registered(&h, "3").await;
        let accounts = &h.services.accounts;

        accounts.new_wallet("3", MNEMONIC, false).await.unwrap();
        let other = AccountEngine::generate_mnemonic().unwrap();
        accounts.new_wallet("3", &other, true).await.unwrap();

        assert_eq!(accounts.wallet_mnemonic("3").unwrap(), other);
        let listed = accounts.profile_accounts("3").await.unwrap();
        assert_eq!(listed.hd_accounts.len(), 1);
        assert_ne!(listed.hd_accounts[0].address, MNEMONIC_ADDRESS_0);
    }

    #[tokio::test]
    async fn imported_account_lifecycle() {
        let h = Harness::new();
        registered(&h, "3").await;
        let accounts = &h.services.accounts;

        let key = SigningKey::random(&mut OsRng);
        let armored = armor::armor(&key, "").unwrap();
        let imported = accounts
            .import_account("3", &armored, "", AccountMetadata { name: "x".to_string() })
            .await
            .unwrap();

        let listed = accounts.profile_accounts("3").await.unwrap();
        assert_eq!(listed.imported_accounts.len(), 1);
        assert!(listed.hd_accounts.is_empty());
        assert_eq!(listed.imported_accounts[0].name, "x");

        accounts.delete_account("3", &imported.address).await.unwrap();
        assert!(accounts.profile_accounts("3").await.unwrap().imported_accounts.is_empty());
    }

    #[tokio::test]
    async fn hd_accounts_cannot_be_deleted_individually() {
        let h = Harness::new();
        registered(&h, "3").await;
        h.services.accounts.new_wallet("3", MNEMONIC, false).await.unwrap();

        let err = h
            .services
            .accounts
            .delete_account("3", MNEMONIC_ADDRESS_0)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::HdAccountDelete));
    }

    #[tokio::test]
    async fn failed_batch_compensates_the_keyring_import() {
        let h = Harness::new();
        registered(&h, "3").await;

        let key = SigningKey::random(&mut OsRng);
        let armored = armor::armor(&key, "").unwrap();
        h.records.fail_writes(true);

        let err = h
            .services
            .accounts
            .import_account("3", &armored, "", AccountMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Records(_)));

        h.records.fail_writes(false);
        let address = crate::blockchain::signing::address_of(key.verifying_key());
        assert!(h.services.accounts.profile_by_address(&address).unwrap().is_none());
        assert_eq!(
            h.kv()
                .get_json::<u64>(&keys::account_import_index("3"))
                .unwrap(),
            Some(0)
        );
    }

    #[tokio::test]
    async fn accounts_are_isolated_between_profiles() {
        let h = Harness::new();
        registered(&h, "3").await;
        registered(&h, "4").await;
        let accounts = &h.services.accounts;
        accounts.new_wallet("3", MNEMONIC, false).await.unwrap();

        assert!(matches!(
            accounts.export_account("4", MNEMONIC_ADDRESS_0, ""),
            Err(AccountError::AccountNotExists)
        ));
        assert!(matches!(
            accounts.account_private_key("4", MNEMONIC_ADDRESS_0),
            Err(AccountError::AccountNotExists)
        ));
        assert!(matches!(
            accounts.update_account_name("4", MNEMONIC_ADDRESS_0, "mine").await,
            Err(AccountError::AccountNotExists)
        ));
        assert!(matches!(
            accounts.delete_account("4", MNEMONIC_ADDRESS_0).await,
            Err(AccountError::AccountNotExists)
        ));
        assert!(accounts.has_account("3", MNEMONIC_ADDRESS_0));
        assert!(!accounts.has_account("4", MNEMONIC_ADDRESS_0));
    }

    #[tokio::test]
    async fn rename_and_export() {
        let h = Harness::new();
        registered(&h, "3").await;
        let accounts = &h.services.accounts;
        accounts.new_wallet("3", MNEMONIC, false).await.unwrap();

        accounts
            .update_account_name("3", &MNEMONIC_ADDRESS_0.to_uppercase().replace("0X", "0x"), "main")
            .await
            .unwrap();
        assert_eq!(
            accounts.profile_account("3", MNEMONIC_ADDRESS_0).await.unwrap().name,
            "main"
        );

        let armored = accounts.export_account("3", MNEMONIC_ADDRESS_0, "pw").unwrap();
        let key = armor::unarmor(&armored, "pw").unwrap();
        assert_eq!(
            key.to_bytes(),
            accounts.account_private_key("3", MNEMONIC_ADDRESS_0).unwrap().to_bytes()
        );
    }

    #[tokio::test]
    async fn send_coins_requires_funds() {
        let h = Harness::new();
        registered(&h, "3").await;
        let accounts = &h.services.accounts;
        accounts.new_wallet("3", MNEMONIC, false).await.unwrap();

        let err = accounts
            .send_coins("3", MNEMONIC_ADDRESS_0, "0x000000000000000000000000000000000000dead", "1")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Chain(ChainError::InsufficientFunds)));

        h.chain.set_active(MNEMONIC_ADDRESS_0);
        accounts
            .send_coins("3", MNEMONIC_ADDRESS_0, "0x000000000000000000000000000000000000dead", "1")
            .await
            .unwrap();
        assert!(matches!(h.chain.sent()[0], ChainMsg::Send { .. }));
    }
}
