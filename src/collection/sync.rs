//! Backend round-trips: `fetch` through a query, `create` through an object save.

use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{
    AddOptions, Collection, CollectionError, CreateOptions, FetchOptions, ModelInput, ResetOptions,
};
use crate::object::{Object, ObjectEvent};
use crate::query::Query;

/// A created object and its pending save.
///
/// Unless `wait` was requested the object is already a member. Inside a tokio
/// runtime the save is spawned by `create` and completes even if the
/// `Creation` is dropped; elsewhere it runs when the `Creation` is awaited.
/// Await [`Creation::saved`] (or the `Creation` itself) for the outcome.
#[must_use = "outside a tokio runtime the save runs only when the Creation is awaited"]
pub struct Creation {
    object: Object,
    save: BoxFuture<'static, Result<Object, CollectionError>>,
}

impl Creation {
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Run the save. Resolves with the saved object.
    pub async fn saved(self) -> Result<Object, CollectionError> {
        self.save.await
    }
}

impl IntoFuture for Creation {
    type Output = Result<Object, CollectionError>;
    type IntoFuture = BoxFuture<'static, Result<Object, CollectionError>>;

    fn into_future(self) -> Self::IntoFuture {
        self.save
    }
}

impl fmt::Debug for Creation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Creation")
            .field("object", &self.object)
            .finish_non_exhaustive()
    }
}

impl Collection {
    /// Load members through a query and add or reset with the results.
    ///
    /// The query is `options.query`, else the bound query, else the model
    /// class's default query. A failed query leaves the collection untouched.
    pub async fn fetch(&self, options: FetchOptions) -> Result<Collection, CollectionError> {
        let query = options
            .query
            .clone()
            .or_else(|| self.query())
            .or_else(|| {
                self.model()
                    .query()
                    .map(|query| Arc::new(query) as Arc<dyn Query>)
            })
            .ok_or(CollectionError::MissingQuery)?;

        let results = query.find().await?;
        tracing::debug!(
            target: "object_collection::collection",
            collection = %self.id(),
            results = results.len(),
            add = options.add,
            "fetched objects"
        );

        if options.add {
            self.add(
                results,
                AddOptions {
                    at: None,
                    silent: options.silent,
                },
            )?;
        } else {
            self.reset(
                results,
                ResetOptions {
                    silent: options.silent,
                },
            )?;
        }
        Ok(self.clone())
    }

    /// Build an object of the model class and save it.
    ///
    /// Invalid attributes fail here, before any mutation or event. Without
    /// `wait` the object is added immediately; with `wait` it is added once the
    /// save succeeds. The save starts right away when called inside a tokio
    /// runtime. On success the `on_success` callback runs if given, otherwise
    /// the object emits `Synced`. A failed save is not rolled back.
    pub fn create(
        &self,
        attributes: impl Into<ModelInput>,
        options: CreateOptions,
    ) -> Result<Creation, CollectionError> {
        let object = self.prepare(attributes.into())?;
        let add_options = options.add_options();
        if !options.wait {
            self.add(&object, add_options)?;
        }

        let collection = self.clone();
        let target = object.clone();
        let CreateOptions { wait, success, .. } = options;

        let save = async move {
            target.persist().await?;
            if wait {
                collection.add(&target, add_options)?;
            }
            tracing::debug!(
                target: "object_collection::collection",
                collection = %collection.id(),
                cid = %target.cid(),
                "created object"
            );

            match success {
                Some(callback) => callback(&target),
                None => target.trigger(ObjectEvent::Synced),
            }
            Ok::<Object, CollectionError>(target)
        }
        .boxed();

        Ok(Creation {
            object,
            save: start(save),
        })
    }
}

/// Spawn `save` on the current tokio runtime, if any. The returned future
/// only reports the outcome; dropping it leaves the task running.
fn start(
    save: BoxFuture<'static, Result<Object, CollectionError>>,
) -> BoxFuture<'static, Result<Object, CollectionError>> {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            let task = runtime.spawn(save);
            async move {
                match task.await {
                    Ok(result) => result,
                    Err(err) => Err(CollectionError::SaveAborted(err.to_string())),
                }
            }
            .boxed()
        }
        Err(_) => {
            tracing::trace!(
                target: "object_collection::collection",
                "no tokio runtime, save deferred until awaited"
            );
            save
        }
    }
}
