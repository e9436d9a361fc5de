use std::future::Future;

use chrono::Utc;
use lucky_beacon::{BeaconError, BeaconRound, BeaconSource};
use lucky_registry::{MinterRegistry, MinterSnapshot, RegistryError, SupplyStatus};
use lucky_selection::{derive_seed, select_winners_with_limit};
use lucky_storage::{ResultStore, StorageKey, StorageValue};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::credential_matches;
use crate::config::OrchestratorConfig;
use crate::types::*;

/// Decides when to run selection, enforces select-once and manages the cache.
///
/// Beacon, registry and store are injected. The store's `set_if_not_exists`
/// is the only write-once boundary: whichever run persists the marker first
/// is canonical, across processes sharing the store.
pub struct SelectionOrchestrator<B, R, S> {
    beacon: B,
    registry: R,
    store: S,
    config: OrchestratorConfig,
    /// Keeps concurrent requests in this process from all hitting the beacon.
    selection_lock: Mutex<()>,
}

impl<B, R, S> SelectionOrchestrator<B, R, S>
where
    B: BeaconSource,
    R: MinterRegistry,
    S: ResultStore,
{
    pub fn new(beacon: B, registry: R, store: S, config: OrchestratorConfig) -> Self {
        Self {
            beacon,
            registry,
            store,
            config,
            selection_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn beacon(&self) -> &B {
        &self.beacon
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current winners, selecting them if the mint just completed.
    pub async fn get_winners(&self, client: Option<&str>) -> OrchestratorResult<WinnersResponse> {
        self.check_rate_limit(client)?;

        if let Some(result) = self.cached_result()? {
            debug!("serving cached result");
            return Ok(WinnersResponse::selected(result));
        }

        // Selected is sticky: a stored marker is served without touching the
        // registry or the beacon.
        if let Some(record) = self.selection_record()? {
            debug!(round = record.round, "regenerating result from stored selection");
            return Ok(WinnersResponse::selected(self.cache_record(&record)));
        }

        let supply = self.supply_status().await?;
        if !supply.is_complete() {
            debug!(
                total_minted = supply.total_minted,
                max_supply = supply.max_supply,
                "mint not complete"
            );
            return Ok(WinnersResponse::not_eligible(supply.total_minted, supply.max_supply));
        }

        let _guard = self.selection_lock.lock().await;
        // Another request may have selected while this one waited.
        if let Some(record) = self.selection_record()? {
            return Ok(WinnersResponse::selected(self.cache_record(&record)));
        }

        let record = self.select(supply).await?;
        Ok(WinnersResponse::selected(self.cache_record(&record)))
    }

    /// State as observed right now, without selecting.
    pub async fn selection_state(&self) -> OrchestratorResult<SelectionState> {
        if self.selection_record()?.is_some() {
            return Ok(SelectionState::Selected);
        }
        if self.supply_status().await?.is_complete() {
            Ok(SelectionState::EligibleUnselected)
        } else {
            Ok(SelectionState::NotEligible)
        }
    }

    /// The stored canonical selection, if any.
    pub fn selection_record(&self) -> OrchestratorResult<Option<SelectionRecord>> {
        let key = StorageKey::from(self.config.state_key.as_str());
        match self.store.get(&key)? {
            Some(value) => value.from_json().map(Some).map_err(|e| OrchestratorError::Corrupt {
                key: self.config.state_key.clone(),
                reason: e.to_string(),
            }),
            None => Ok(None),
        }
    }

    /// The beacon round that seeds selection for a given snapshot.
    pub fn target_round(&self, snapshot: &MinterSnapshot) -> u64 {
        self.beacon.chain().round_after(snapshot.last_mint_timestamp)
            + self.config.round_offset.saturating_sub(1)
    }

    /// Clear the cached result and the selection marker.
    pub fn reset(&self, credential: &str) -> OrchestratorResult<ResetOutcome> {
        self.authorize(credential)?;
        let cache_cleared = self.store.delete(&StorageKey::from(self.config.cache_key.as_str()))?;
        let marker_cleared = self.store.delete(&StorageKey::from(self.config.state_key.as_str()))?;
        warn!(cache_cleared, marker_cleared, "selection state reset");
        Ok(ResetOutcome {
            cache_cleared,
            marker_cleared,
        })
    }

    /// Fetch a beacon round for independent auditing.
    pub async fn verify_round(&self, credential: &str, round: u64) -> OrchestratorResult<RoundAudit> {
        self.authorize(credential)?;
        let beacon = self
            .bounded(self.beacon.fetch(BeaconRound::Number(round)), self.beacon_timeout())
            .await?;
        let randomness_verified = beacon.verify_randomness().is_ok();
        let used_for_selection = self.selection_record()?.is_some_and(|r| r.round == round);
        info!(round, randomness_verified, used_for_selection, "beacon round audited");
        Ok(RoundAudit {
            published_at: self.beacon.chain().round_time(round),
            beacon,
            randomness_verified,
            used_for_selection,
        })
    }

    /// Snapshot → beacon → seed → shuffle → persist. Nothing is written
    /// unless every step succeeds.
    async fn select(&self, supply: SupplyStatus) -> OrchestratorResult<SelectionRecord> {
        let snapshot = self
            .bounded(self.registry.snapshot(), self.registry_timeout())
            .await?;
        if snapshot.pool.is_empty() {
            return Err(OrchestratorError::RegistryUnavailable("no minters found".into()));
        }

        let round = self.target_round(&snapshot);
        let current = self.beacon.chain().current_round();
        if round > current {
            return Err(OrchestratorError::BeaconUnavailable(format!(
                "round {round} not yet emitted (current {current})"
            )));
        }

        info!(
            round,
            pool = snapshot.pool.len(),
            last_mint_block = snapshot.last_mint_block,
            "selecting winners"
        );
        let beacon = self
            .bounded(self.beacon.fetch(BeaconRound::Number(round)), self.beacon_timeout())
            .await?;
        if beacon.round != round {
            return Err(BeaconError::RoundMismatch {
                requested: round,
                received: beacon.round,
            }
            .into());
        }

        let seed = derive_seed(&beacon.randomness, &self.config.contract, beacon.round);
        let assignment = select_winners_with_limit(
            snapshot.pool.as_slice(),
            &seed,
            self.config.max_regular_winners,
        );

        let record = SelectionRecord {
            contract: self.config.contract,
            round: beacon.round,
            randomness: beacon.randomness,
            signature: beacon.signature,
            seed: seed.to_hex(),
            assignment,
            max_regular_winners: self.config.max_regular_winners,
            pool_size: snapshot.pool.len(),
            pool_digest: hex::encode(snapshot.pool.digest()),
            snapshot_block: snapshot.last_mint_block,
            snapshot_timestamp: snapshot.last_mint_timestamp,
            total_minted: supply.total_minted,
            max_supply: supply.max_supply,
            selected_at: Utc::now(),
        };

        let key = StorageKey::from(self.config.state_key.as_str());
        if self
            .store
            .set_if_not_exists(key, StorageValue::to_json(&record)?, None)?
        {
            info!(
                round = record.round,
                seed = %record.seed,
                winners = record.assignment.len(),
                "selection persisted"
            );
            return Ok(record);
        }

        warn!(round, "another selection was persisted first, using it");
        self.selection_record()?.ok_or_else(|| OrchestratorError::Corrupt {
            key: self.config.state_key.clone(),
            reason: "marker disappeared after a conflicting write".into(),
        })
    }

    async fn supply_status(&self) -> OrchestratorResult<SupplyStatus> {
        self.bounded(self.registry.supply_status(), self.registry_timeout())
            .await
    }

    /// The cached result; an unreadable entry is dropped and treated as a miss.
    fn cached_result(&self) -> OrchestratorResult<Option<SelectionResult>> {
        let key = StorageKey::from(self.config.cache_key.as_str());
        let Some(value) = self.store.get(&key)? else {
            return Ok(None);
        };
        match value.from_json() {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                warn!(error = %e, "discarding unreadable cached result");
                self.store.delete(&key)?;
                Ok(None)
            }
        }
    }

    /// Render and cache the result for a record. A failed cache write only
    /// costs a regeneration on the next request.
    fn cache_record(&self, record: &SelectionRecord) -> SelectionResult {
        let result = record.to_result(&self.config.prizes);
        let key = StorageKey::from(self.config.cache_key.as_str());
        let written = StorageValue::to_json(&result)
            .and_then(|value| self.store.set_with_ttl(key, value, self.config.result_ttl));
        if let Err(e) = written {
            warn!(error = %e, "failed to cache selection result");
        }
        result
    }

    fn check_rate_limit(&self, client: Option<&str>) -> OrchestratorResult<()> {
        if self.config.rate_limit_requests == 0 {
            return Ok(());
        }
        let key = self.config.rate_limit_key(client);
        let count = self
            .store
            .incr_window(&StorageKey::from(key.as_str()), self.config.rate_limit_window)?;
        if count > self.config.rate_limit_requests {
            warn!(key = %key, count, "rate limit exceeded");
            return Err(OrchestratorError::RateLimited {
                client: client.unwrap_or(crate::config::ANONYMOUS_CLIENT).to_string(),
                count,
            });
        }
        Ok(())
    }

    fn authorize(&self, credential: &str) -> OrchestratorResult<()> {
        if credential_matches(self.config.admin_api_key.as_deref(), credential) {
            Ok(())
        } else {
            warn!("rejected admin credential");
            Err(OrchestratorError::Unauthorized)
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.config.request_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn beacon_timeout(&self) -> BeaconError {
        BeaconError::Timeout(self.timeout_ms())
    }

    fn registry_timeout(&self) -> RegistryError {
        RegistryError::Timeout(self.timeout_ms())
    }

    /// Run a network call under the request timeout.
    async fn bounded<T, E>(
        &self,
        call: impl Future<Output = Result<T, E>>,
        on_timeout: E,
    ) -> OrchestratorResult<T>
    where
        E: Into<OrchestratorError>,
    {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(on_timeout.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucky_beacon::{Beacon, BeaconChain};
    use lucky_registry::MinterSnapshot;
    use lucky_selection::{Address, MinterPool};
    use lucky_storage::MemoryStore;
    use sha2::{Digest, Sha256};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LAST_MINT_TS: u64 = 1_700_000_000;

    fn beacon_for(round: u64) -> Beacon {
        let signature = round.to_be_bytes().repeat(6);
        Beacon {
            round,
            randomness: hex::encode(Sha256::digest(&signature)),
            signature: hex::encode(signature),
            previous_signature: None,
        }
    }

    struct FakeBeacon {
        chain: BeaconChain,
        fetches: AtomicUsize,
    }

    impl BeaconSource for FakeBeacon {
        async fn fetch(&self, round: BeaconRound) -> Result<Beacon, BeaconError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match round {
                BeaconRound::Number(n) => Ok(beacon_for(n)),
                BeaconRound::Latest => Ok(beacon_for(self.chain.current_round())),
            }
        }

        fn chain(&self) -> &BeaconChain {
            &self.chain
        }
    }

    struct FakeRegistry {
        minted: u64,
    }

    impl MinterRegistry for FakeRegistry {
        async fn supply_status(&self) -> Result<SupplyStatus, RegistryError> {
            Ok(SupplyStatus {
                total_minted: self.minted,
                max_supply: 5,
            })
        }

        async fn snapshot(&self) -> Result<MinterSnapshot, RegistryError> {
            Ok(MinterSnapshot {
                pool: MinterPool::from_addresses((1..=5u8).map(|b| Address::from_bytes([b; 20]))),
                last_mint_block: 42,
                last_mint_timestamp: LAST_MINT_TS,
            })
        }
    }

    fn orchestrator(minted: u64) -> SelectionOrchestrator<FakeBeacon, FakeRegistry, MemoryStore> {
        let beacon = FakeBeacon {
            chain: BeaconChain::default(),
            fetches: AtomicUsize::new(0),
        };
        let mut config = OrchestratorConfig::new(Address::from_bytes([0xc8; 20]));
        config.admin_api_key = Some("admin".into());
        SelectionOrchestrator::new(beacon, FakeRegistry { minted }, MemoryStore::new(64), config)
    }

    #[tokio::test]
    async fn not_eligible_until_sold_out() {
        let orch = orchestrator(3);
        let resp = orch.get_winners(None).await.unwrap();
        assert_eq!(resp.status, SelectionState::NotEligible);
        assert_eq!((resp.total_minted, resp.max_supply), (3, 5));
        assert!(resp.result.is_none());
        assert_eq!(orch.beacon().fetches.load(Ordering::SeqCst), 0);
        assert_eq!(orch.selection_state().await.unwrap(), SelectionState::NotEligible);
    }

    #[tokio::test]
    async fn selects_with_round_after_last_mint() {
        let orch = orchestrator(5);
        assert_eq!(orch.selection_state().await.unwrap(), SelectionState::EligibleUnselected);

        let resp = orch.get_winners(Some("client")).await.unwrap();
        assert_eq!(resp.status, SelectionState::Selected);
        let result = resp.result.unwrap();
        assert_eq!(result.winners.len(), 5);

        let record = orch.selection_record().unwrap().unwrap();
        let expected_round = BeaconChain::default().round_after(LAST_MINT_TS);
        assert_eq!(record.round, expected_round);
        assert_eq!(result.drand_round, expected_round);
        assert!(BeaconChain::default().round_time(record.round) > LAST_MINT_TS);

        let seed = derive_seed(&record.randomness, &orch.config().contract, record.round);
        assert_eq!(record.seed, seed.to_hex());
        assert_eq!(orch.selection_state().await.unwrap(), SelectionState::Selected);
    }

    #[tokio::test]
    async fn round_offset_shifts_the_round() {
        let mut orch = orchestrator(5);
        orch.config.round_offset = 3;
        orch.get_winners(None).await.unwrap();
        let record = orch.selection_record().unwrap().unwrap();
        assert_eq!(record.round, BeaconChain::default().round_after(LAST_MINT_TS) + 2);
    }

    #[tokio::test]
    async fn rate_limit_applies_per_client() {
        let mut orch = orchestrator(3);
        orch.config.rate_limit_requests = 2;
        orch.get_winners(Some("a")).await.unwrap();
        orch.get_winners(Some("a")).await.unwrap();
        let err = orch.get_winners(Some("a")).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::RateLimited { count: 3, .. }));
        // Other clients have their own window.
        orch.get_winners(Some("b")).await.unwrap();
    }

    #[tokio::test]
    async fn admin_operations_need_the_key() {
        let orch = orchestrator(5);
        assert!(matches!(orch.reset("wrong"), Err(OrchestratorError::Unauthorized)));
        assert!(matches!(
            orch.verify_round("", 10).await,
            Err(OrchestratorError::Unauthorized)
        ));

        orch.get_winners(None).await.unwrap();
        let record = orch.selection_record().unwrap().unwrap();

        let audit = orch.verify_round("admin", record.round).await.unwrap();
        assert!(audit.randomness_verified);
        assert!(audit.used_for_selection);
        assert_eq!(audit.beacon.randomness, record.randomness);

        let outcome = orch.reset("admin").unwrap();
        assert!(outcome.cache_cleared && outcome.marker_cleared);
        assert!(orch.selection_record().unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_marker_is_reported() {
        let orch = orchestrator(5);
        orch.store()
            .set(StorageKey::from(orch.config().state_key.as_str()), "garbage".into(), None)
            .unwrap();
        assert!(matches!(
            orch.get_winners(None).await,
            Err(OrchestratorError::Corrupt { .. })
        ));
    }
}
