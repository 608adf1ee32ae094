use std::marker::PhantomData;
use std::sync::Arc;

use quarry_core::validate_model;
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::filter::Filter;
use crate::page::{ListQuery, ListQueryResult};
use crate::repository::ReadOnlyRepository;

/// Request for a single entity by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindQuery<K> {
    pub id: K,
}

impl<K> FindQuery<K> {
    pub fn new(id: K) -> Self {
        Self { id }
    }
}

/// Converts an entity into the shape a handler returns.
pub trait Mapper<S, D>: Send + Sync {
    fn map(&self, source: S) -> D;
}

impl<S, D, F> Mapper<S, D> for F
where
    F: Fn(S) -> D + Send + Sync,
{
    fn map(&self, source: S) -> D {
        self(source)
    }
}

/// Answers [`FindQuery`] through a repository and a mapper.
pub struct FindHandler<T, R, M> {
    repository: Arc<R>,
    mapper: M,
    _entity: PhantomData<fn() -> T>,
}

impl<T, R, M> FindHandler<T, R, M>
where
    T: Send + Sync + 'static,
{
    pub fn new(repository: Arc<R>, mapper: M) -> Self {
        Self {
            repository,
            mapper,
            _entity: PhantomData,
        }
    }

    /// The mapped entity, or `None` when no entity has the key.
    pub async fn handle<K, D>(&self, request: FindQuery<K>) -> Result<Option<D>, DataError>
    where
        K: Send + Sync + 'static,
        R: ReadOnlyRepository<T, K>,
        M: Mapper<T, D>,
    {
        match self.repository.find(&request.id).await {
            Ok(found) => Ok(found.map(|entity| self.mapper.map(entity))),
            Err(err) => {
                tracing::error!(error = %err, "Find request failed");
                Err(err)
            }
        }
    }
}

/// Answers [`ListQuery`]: one page plus the total element count.
pub struct ListHandler<T, K, R, M> {
    repository: Arc<R>,
    mapper: M,
    _entity: PhantomData<fn() -> (T, K)>,
}

impl<T, K, R, M> ListHandler<T, K, R, M>
where
    T: Send + Sync + 'static,
    K: Send + Sync + 'static,
    R: ReadOnlyRepository<T, K>,
{
    pub fn new(repository: Arc<R>, mapper: M) -> Self {
        Self {
            repository,
            mapper,
            _entity: PhantomData,
        }
    }

    pub async fn handle<D>(&self, request: ListQuery) -> Result<ListQueryResult<D>, DataError>
    where
        M: Mapper<T, D>,
    {
        let result = self.list(&request).await;
        if let Err(err) = &result {
            tracing::error!(error = %err, skip = request.skip, take = request.take, "List request failed");
        }
        result
    }

    async fn list<D>(&self, request: &ListQuery) -> Result<ListQueryResult<D>, DataError>
    where
        M: Mapper<T, D>,
    {
        validate_model(request)?;
        let entities = self
            .repository
            .any(request.skip, request.take, request.sort_order)
            .await?;
        let data = entities.into_iter().map(|e| self.mapper.map(e)).collect();
        let total_elements = self.repository.count(None::<Filter>).await?;
        Ok(ListQueryResult::new(data, total_elements, request))
    }
}
