use crate::core::filters::SubsetFilter;
use crate::core::models::subset::Subset;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub type FilterList = Arc<[Arc<dyn SubsetFilter>]>;

type FilterKey = (Subset, Vec<Subset>);

/// Per-query memo of the filters produced for each `(subset, excluded)` request.
#[derive(Debug, Default)]
pub struct FilterCache {
    enabled: bool,
    entries: RwLock<HashMap<FilterKey, FilterList>>,
}

impl FilterCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached list for the request, producing it with `make` on a miss.
    pub fn get_or_try_insert_with<E>(
        &self,
        subset: &Subset,
        excluded: &[Subset],
        make: impl FnOnce() -> Result<Vec<Arc<dyn SubsetFilter>>, E>,
    ) -> Result<FilterList, E> {
        if !self.enabled {
            return make().map(Into::into);
        }

        let key = (subset.clone(), excluded.to_vec());
        if let Some(hit) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(hit));
        }

        let filters: FilterList = make()?.into();
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key).or_insert(filters)))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
