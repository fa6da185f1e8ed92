//! Identity-indexed, event-emitting collections of backend objects.

mod collection;
mod events;
mod object;
mod query;
mod store;

#[cfg(feature = "emitter")]
pub mod emitter;

pub use collection::{
    compare_values, AddOptions, Chain, Collection, CollectionError, CollectionEvent,
    CollectionEventKind, CollectionId, CollectionListener, CollectionOptions, Comparator,
    CreateOptions, Creation, FetchOptions, IntoMemberRefs, IntoModels, MemberRef, ModelInput,
    ObjectSequence, RemoveOptions, ResetOptions, SortOptions, SuccessCallback,
};
pub use events::{Events, ListenerId};
pub use object::{
    Attributes, Object, ObjectClass, ObjectError, ObjectEvent, ObjectListener, Validator,
    OBJECT_ID,
};
pub use query::{ClassQuery, Query, QueryError};
pub use store::{InMemoryObjectStore, ObjectStore, StoreError, StoredObject};

#[cfg(feature = "emitter")]
pub use emitter::{CollectionEmitter, EmittableCollection};

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
