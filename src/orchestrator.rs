//! Apply pipeline: decode → validate → render → splice → encode → store →
//! history.
//!
//! Nothing is committed until every stage succeeds, so a failed or
//! cancelled apply leaves the current audio and the history untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};

use crate::assets::{AssetRef, AssetStore};
use crate::buffer::{Region, SampleBuffer};
use crate::config::EngineConfig;
use crate::context::RenderContext;
use crate::effects::{render_effect, EffectKind};
use crate::error::{ApplyError, FxError};
use crate::history::{EditHistory, EditHistoryEntry};
use crate::params::ParameterSet;
use crate::splice::splice_rendered;
use crate::wav;

/// Cooperative cancellation flag, checked between pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One apply call.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
    pub effect_id: String,
    /// `None` when the user has nothing selected.
    pub region: Option<Region>,
    pub params: ParameterSet,
    /// Falls back to the engine's default seed.
    pub seed: Option<u64>,
    pub cancel: Option<CancelToken>,
}

impl ApplyRequest {
    pub fn new(effect_id: impl Into<String>, region: Region) -> Self {
        ApplyRequest {
            effect_id: effect_id.into(),
            region: Some(region),
            params: ParameterSet::new(),
            seed: None,
            cancel: None,
        }
    }

    pub fn with_params(mut self, params: ParameterSet) -> Self {
        self.params = params;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Result of a successful apply.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// The spliced buffer, before 16-bit encoding.
    pub buffer: SampleBuffer,
    pub entry: EditHistoryEntry,
}

pub struct EffectApplyOrchestrator<S: AssetStore> {
    config: EngineConfig,
    store: S,
    history: EditHistory,
}

impl<S: AssetStore> EffectApplyOrchestrator<S> {
    pub fn new(config: EngineConfig, store: S) -> Self {
        EffectApplyOrchestrator {
            config,
            store,
            history: EditHistory::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load encoded audio as a new history root. Earlier entries are kept.
    pub fn load(&mut self, bytes: Vec<u8>) -> Result<AssetRef, FxError> {
        let buffer = wav::decode(&bytes)?;
        let asset = self.store.put(bytes);
        self.history.push_root(EditHistoryEntry::root("Load audio", asset.clone()));
        info!(
            "loaded {} channel(s), {} samples at {} Hz as {asset}",
            buffer.num_channels(),
            buffer.len(),
            buffer.sample_rate()
        );
        Ok(asset)
    }

    /// Run one effect over one region of the current audio.
    pub fn apply(&mut self, request: ApplyRequest) -> Result<ApplyOutcome, ApplyError> {
        let kind = EffectKind::from_id(&request.effect_id)
            .map_err(|e| ApplyError::new(request.effect_id.clone(), e))?;
        self.run(kind, request)
            .map_err(|e| ApplyError::new(kind.name(), e))
    }

    fn run(&mut self, kind: EffectKind, request: ApplyRequest) -> Result<ApplyOutcome, FxError> {
        let region = request
            .region
            .ok_or_else(|| FxError::validation("no region selected"))?;
        let source = self
            .history
            .current()
            .map(|e| e.result_ref.clone())
            .ok_or_else(|| FxError::validation("no audio loaded"))?;
        let cancelled = || {
            if request.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                warn!("{} apply cancelled", kind.id());
                Err(FxError::Cancelled)
            } else {
                Ok(())
            }
        };

        let bytes = self
            .store
            .get(&source)
            .ok_or_else(|| FxError::decode(format!("asset {source} is missing")))?;
        let buffer = wav::decode(&bytes)?;
        region.validate(buffer.len())?;
        debug!("{}: decoded {} samples from {source}", kind.id(), buffer.len());
        cancelled()?;

        let seed = request.seed.unwrap_or(self.config.default_seed);
        let mut ctx = RenderContext::new(buffer.sample_rate(), buffer.num_channels(), seed)
            .with_tempo(self.config.tempo)
            .with_limits(self.config.limits);
        let rendered = render_effect(kind, &buffer, region, &request.params, &mut ctx)?;
        cancelled()?;

        let output = splice_rendered(&buffer, &rendered, region);
        let encoded = wav::encode(&output)?;
        cancelled()?;

        let result_ref = self.store.put(encoded);
        let entry = EditHistoryEntry {
            label: kind.name().to_string(),
            effect_id: Some(kind.id().to_string()),
            parameters: request.params,
            region: Some(region),
            seed: Some(seed),
            result_ref,
            parent: None,
        };
        let entry = self.history.push(entry).clone();
        info!(
            "applied {} to [{}, {}): {} -> {} samples, stored {}",
            kind.id(),
            region.start,
            region.end,
            buffer.len(),
            output.len(),
            entry.result_ref
        );
        Ok(ApplyOutcome {
            buffer: output,
            entry,
        })
    }

    /// Step back to the previous asset without recomputing anything.
    pub fn undo(&mut self) -> Option<AssetRef> {
        let asset = self.history.undo().map(|e| e.result_ref.clone());
        if let Some(a) = &asset {
            info!("undo to {a}");
        }
        asset
    }

    pub fn redo(&mut self) -> Option<AssetRef> {
        let asset = self.history.redo().map(|e| e.result_ref.clone());
        if let Some(a) = &asset {
            info!("redo to {a}");
        }
        asset
    }

    /// Make any retained history entry current again.
    pub fn select(&mut self, index: usize) -> Option<AssetRef> {
        let asset = self.history.select(index).map(|e| e.result_ref.clone());
        if let Some(a) = &asset {
            info!("selected history entry {index} ({a})");
        }
        asset
    }

    /// Encoded bytes of the current audio.
    pub fn current_bytes(&self) -> Option<Arc<[u8]>> {
        self.history
            .current()
            .and_then(|e| self.store.get(&e.result_ref))
    }

    /// Decode the current audio. Readers should re-fetch after every apply.
    pub fn current_buffer(&self) -> Result<SampleBuffer, FxError> {
        let bytes = self
            .current_bytes()
            .ok_or_else(|| FxError::validation("no audio loaded"))?;
        wav::decode(&bytes)
    }
}

/// An orchestrator shared between callers. A second apply while one is in
/// flight is rejected with [`FxError::Busy`] instead of queued.
pub struct SharedOrchestrator<S: AssetStore> {
    inner: Arc<Mutex<EffectApplyOrchestrator<S>>>,
}

impl<S: AssetStore> Clone for SharedOrchestrator<S> {
    fn clone(&self) -> Self {
        SharedOrchestrator {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: AssetStore> SharedOrchestrator<S> {
    pub fn new(orchestrator: EffectApplyOrchestrator<S>) -> Self {
        SharedOrchestrator {
            inner: Arc::new(Mutex::new(orchestrator)),
        }
    }

    pub fn apply(&self, request: ApplyRequest) -> Result<ApplyOutcome, ApplyError> {
        match self.inner.try_lock() {
            Some(mut orchestrator) => orchestrator.apply(request),
            None => {
                warn!("rejecting {} apply: another apply is running", request.effect_id);
                let name = EffectKind::from_id(&request.effect_id)
                    .map(|k| k.name().to_string())
                    .unwrap_or(request.effect_id);
                Err(ApplyError::new(name, FxError::Busy))
            }
        }
    }

    /// Block until no apply is running and borrow the orchestrator.
    pub fn lock(&self) -> MutexGuard<'_, EffectApplyOrchestrator<S>> {
        self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetStore;
    use crate::effects::test_util::stereo_sine;

    fn loaded() -> (EffectApplyOrchestrator<MemoryAssetStore>, SampleBuffer) {
        let buffer = stereo_sine(440.0, 0.5, 4000, 8000);
        let mut orch = EffectApplyOrchestrator::new(EngineConfig::default(), MemoryAssetStore::new());
        orch.load(wav::encode(&buffer).unwrap()).unwrap();
        let decoded = orch.current_buffer().unwrap();
        (orch, decoded)
    }

    #[test]
    fn apply_commits_one_asset_and_one_entry() {
        let (mut orch, before) = loaded();
        let outcome = orch
            .apply(ApplyRequest::new("tremolo", Region::new(1000, 2000).unwrap()))
            .unwrap();
        assert_eq!(orch.store().len(), 2);
        assert_eq!(orch.history().entries().len(), 2);
        assert_eq!(outcome.entry.effect_id.as_deref(), Some("tremolo"));
        assert_eq!(outcome.entry.label, "Tremolo");
        let after = orch.current_buffer().unwrap();
        assert_eq!(&after.channel(0)[..1000], &before.channel(0)[..1000]);
        assert_ne!(&after.channel(0)[1000..2000], &before.channel(0)[1000..2000]);
    }

    #[test]
    fn undo_restores_without_recomputing() {
        let (mut orch, before) = loaded();
        let root = orch.history().current().unwrap().result_ref.clone();
        orch.apply(ApplyRequest::new("distortion", Region::new(0, 4000).unwrap()))
            .unwrap();
        assert_eq!(orch.undo(), Some(root));
        assert_eq!(orch.current_buffer().unwrap(), before);
        assert!(orch.undo().is_none());
        assert!(orch.redo().is_some());
    }

    #[test]
    fn apply_after_undo_keeps_the_undone_edit() {
        let (mut orch, _) = loaded();
        let undone = orch
            .apply(ApplyRequest::new("tremolo", Region::new(0, 2000).unwrap()))
            .unwrap();
        orch.undo();
        let branch = orch
            .apply(ApplyRequest::new("filter", Region::new(0, 2000).unwrap()))
            .unwrap();
        assert_eq!(branch.entry.parent, Some(0));
        assert_eq!(orch.history().entries().len(), 3);
        assert_eq!(orch.select(1), Some(undone.entry.result_ref.clone()));
        assert_eq!(orch.current_bytes().unwrap(), orch.store().get(&undone.entry.result_ref).unwrap());
        assert!(orch.select(7).is_none());
    }

    #[test]
    fn failures_leave_state_alone() {
        let (mut orch, before) = loaded();
        let err = orch
            .apply(ApplyRequest::new("compressor", Region::new(3000, 9000).unwrap()))
            .unwrap_err();
        assert_eq!(err.effect, "Compressor");
        assert!(err.source.is_validation());

        let mut no_region = ApplyRequest::new("gate", Region::new(0, 10).unwrap());
        no_region.region = None;
        assert!(orch.apply(no_region).unwrap_err().source.is_validation());

        let err = orch
            .apply(ApplyRequest::new("wah", Region::new(0, 10).unwrap()))
            .unwrap_err();
        assert_eq!(err.to_string(), "wah: unknown effect 'wah'");

        assert_eq!(orch.history().entries().len(), 1);
        assert_eq!(orch.store().len(), 1);
        assert_eq!(orch.current_buffer().unwrap(), before);
    }

    #[test]
    fn cancelled_apply_commits_nothing() {
        let (mut orch, _) = loaded();
        let token = CancelToken::new();
        token.cancel();
        let err = orch
            .apply(ApplyRequest::new("echo", Region::new(0, 4000).unwrap()).with_cancel(token))
            .unwrap_err();
        assert_eq!(err.source, FxError::Cancelled);
        assert_eq!(orch.history().entries().len(), 1);
    }

    #[test]
    fn apply_without_load_is_rejected() {
        let mut orch = EffectApplyOrchestrator::new(EngineConfig::default(), MemoryAssetStore::new());
        let err = orch
            .apply(ApplyRequest::new("filter", Region::new(0, 10).unwrap()))
            .unwrap_err();
        assert!(err.source.is_validation());
    }

    #[test]
    fn corrupt_load_is_a_decode_error() {
        let mut orch = EffectApplyOrchestrator::new(EngineConfig::default(), MemoryAssetStore::new());
        let err = orch.load(b"not a wav file".to_vec()).unwrap_err();
        assert!(matches!(err, FxError::Decode(_)));
        assert!(orch.history().entries().is_empty());
    }

    #[test]
    fn concurrent_apply_is_busy() {
        let (orch, _) = loaded();
        let shared = SharedOrchestrator::new(orch);
        let other = shared.clone();
        let guard = shared.lock();
        let err = other
            .apply(ApplyRequest::new("phaser", Region::new(0, 100).unwrap()))
            .unwrap_err();
        assert_eq!(err.source, FxError::Busy);
        assert_eq!(err.effect, "Phaser");
        drop(guard);
        assert!(other
            .apply(ApplyRequest::new("phaser", Region::new(0, 100).unwrap()))
            .is_ok());
    }

    #[test]
    fn seed_makes_applies_reproducible() {
        let (mut a, _) = loaded();
        let (mut b, _) = loaded();
        let req = ApplyRequest::new("granular_freeze", Region::new(500, 3500).unwrap()).with_seed(99);
        let x = a.apply(req.clone()).unwrap();
        let y = b.apply(req).unwrap();
        assert_eq!(x.entry.result_ref, y.entry.result_ref);
        assert_eq!(x.buffer.len(), 4000 + 16000);
    }
}
