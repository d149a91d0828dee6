pub mod error;
pub mod intent;
pub mod key;
pub mod resource;

pub use error::{CoreError, Result};
pub use intent::{
    ALLOW_INCLUSION_ANNOTATION, DelegationIntent, FINALIZER, PARENT_REF_ANNOTATION,
    PATH_PREFIX_ANNOTATION,
};
pub use key::NamespacedName;
pub use resource::{Include, ProxyResource, ResourceMeta};
