use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;

use crate::error::AssetLoadFailure;

use super::{AssetSource, Drawable, ResourceId};

/// Settled outcome for one requested identifier.
#[derive(Debug, Clone)]
pub struct AssetOutcome {
    pub id: ResourceId,
    pub result: Result<Drawable, AssetLoadFailure>,
}

impl AssetOutcome {
    pub fn drawable(&self) -> Option<&Drawable> {
        self.result.as_ref().ok()
    }
}

/// One outcome per requested identifier, in request order.
///
/// Immutable once settled.
#[derive(Debug, Clone, Default)]
pub struct AssetResult {
    outcomes: Vec<AssetOutcome>,
}

impl AssetResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AssetOutcome> {
        self.outcomes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetOutcome> {
        self.outcomes.iter()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Failed identifiers with their reasons, in request order.
    pub fn failures(&self) -> Vec<(ResourceId, AssetLoadFailure)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.result {
                Ok(_) => None,
                Err(e) => Some((o.id.clone(), e.clone())),
            })
            .collect()
    }
}

impl FromIterator<AssetOutcome> for AssetResult {
    fn from_iter<I: IntoIterator<Item = AssetOutcome>>(iter: I) -> Self {
        Self { outcomes: iter.into_iter().collect() }
    }
}

/// Resolves batches of identifiers through an [`AssetSource`].
pub struct AssetLoader<S> {
    source: S,
}

impl<S: AssetSource> AssetLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Loads every identifier and waits for all of them.
    ///
    /// Loads run concurrently and independently; one failure never aborts
    /// the batch. Repeated identifiers are loaded once and share the
    /// outcome. There is no minimum-success requirement here.
    pub async fn load_all(&self, ids: &[ResourceId]) -> AssetResult {
        let mut unique: Vec<&ResourceId> = Vec::with_capacity(ids.len());
        let mut seen: HashMap<&ResourceId, usize> = HashMap::with_capacity(ids.len());
        let slots: Vec<usize> = ids
            .iter()
            .map(|id| {
                *seen.entry(id).or_insert_with(|| {
                    unique.push(id);
                    unique.len() - 1
                })
            })
            .collect();

        log::debug!("loading {} assets ({} distinct)", ids.len(), unique.len());

        let settled = join_all(unique.iter().map(|id| self.load_one(id))).await;

        let result: AssetResult = ids
            .iter()
            .zip(slots)
            .map(|(id, slot)| AssetOutcome { id: id.clone(), result: settled[slot].clone() })
            .collect();

        log::info!("assets settled: {}/{} resolved", result.success_count(), result.len());
        result
    }

    async fn load_one(&self, id: &ResourceId) -> Result<Drawable, AssetLoadFailure> {
        match self.source.load(id).await {
            Ok(Some(image)) => Ok(Arc::new(image)),
            Ok(None) => {
                log::warn!("asset `{id}` is empty");
                Err(AssetLoadFailure::Empty)
            }
            Err(err) => {
                log::warn!("asset `{id}` failed: {err}");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryAssetSource;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ids(names: &[&str]) -> Vec<ResourceId> {
        names.iter().map(|n| ResourceId::from(*n)).collect()
    }

    #[test]
    fn settles_one_outcome_per_identifier_in_order() {
        let source = MemoryAssetSource::new()
            .with_image("a", 2, 2)
            .with_failure("b", AssetLoadFailure::Failed("disk on fire".into()))
            .with_empty("c")
            .with_image("d", 3, 1);
        let loader = AssetLoader::new(source);

        let result = block_on(loader.load_all(&ids(&["a", "b", "c", "d", "missing"])));

        assert_eq!(result.len(), 5);
        assert_eq!(result.success_count(), 2);
        let order: Vec<&str> = result.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(order, ["a", "b", "c", "d", "missing"]);
        assert_eq!(result.get(2).map(|o| o.result.clone().err()), Some(Some(AssetLoadFailure::Empty)));
        assert_eq!(result.get(3).and_then(AssetOutcome::drawable).map(|d| d.width()), Some(3));
        assert!(matches!(result.get(4).map(|o| &o.result), Some(Err(AssetLoadFailure::Failed(_)))));
    }

    #[test]
    fn failures_lists_only_failed_identifiers() {
        let loader = AssetLoader::new(MemoryAssetSource::new().with_image("a", 1, 1).with_empty("b"));
        let result = block_on(loader.load_all(&ids(&["a", "b"])));
        assert_eq!(result.failures(), vec![(ResourceId::from("b"), AssetLoadFailure::Empty)]);
    }

    #[test]
    fn empty_request_settles_empty() {
        let loader = AssetLoader::new(MemoryAssetSource::new());
        let result = block_on(loader.load_all(&[]));
        assert!(result.is_empty());
        assert_eq!(result.success_count(), 0);
    }

    #[test]
    fn repeated_identifiers_load_once_and_share_the_outcome() {
        let loader = AssetLoader::new(MemoryAssetSource::new().with_image("a", 1, 1));
        let result = block_on(loader.load_all(&ids(&["a", "a", "a"])));

        assert_eq!(result.len(), 3);
        assert_eq!(result.success_count(), 3);
        assert_eq!(loader.source().requests(), ids(&["a"]));
    }

    #[test]
    fn barrier_waits_for_the_slowest_load() {
        let source = MemoryAssetSource::new().with_image("fast", 1, 1).with_image("slow", 1, 1);
        let release_slow = source.gate("slow");
        let loader = Rc::new(AssetLoader::new(source));

        let settled: Rc<RefCell<Option<AssetResult>>> = Rc::default();
        let mut pool = LocalPool::new();
        {
            let loader = loader.clone();
            let settled = settled.clone();
            pool.spawner()
                .spawn_local(async move {
                    let result = loader.load_all(&ids(&["slow", "fast"])).await;
                    *settled.borrow_mut() = Some(result);
                })
                .expect("spawn");
        }

        pool.run_until_stalled();
        assert!(settled.borrow().is_none());

        release_slow.send(()).expect("gate still open");
        pool.run_until_stalled();

        let settled = settled.borrow();
        let result = settled.as_ref().expect("batch settled");
        assert_eq!(result.success_count(), 2);
        assert_eq!(result.get(0).map(|o| o.id.as_str()), Some("slow"));
    }
}
