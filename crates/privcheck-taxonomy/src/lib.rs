//! # privcheck-taxonomy: Tracker Taxonomy Resolver
//!
//! Maps observed hosts to known tracker entities using a reference taxonomy.
//!
//! - **Model** (`model.rs`): [`TrackerEntry`], [`TrackerCategory`], and the
//!   indexed [`Taxonomy`].
//! - **Loader** (`loader.rs`): YAML/JSON taxonomy documents with lenient
//!   category parsing.
//! - **Resolver** (`resolver.rs`): exact-then-suffix matching bounded by the
//!   registrable domain, with deterministic tie-breaking.
//!
//! ## Crate Policy
//!
//! - Depends only on `privcheck-core` internally.
//! - A taxonomy that fails to load is fatal; a host that matches nothing is
//!   a normal outcome (`other`, no owner).

pub mod error;
pub mod loader;
pub mod model;
pub mod resolver;

pub use error::{TaxonomyError, TaxonomyResult};
pub use loader::{load_taxonomy, parse_taxonomy};
pub use model::{Taxonomy, TrackerCategory, TrackerEntry, DEFAULT_PRIORITY};
pub use resolver::{MatchKind, Resolution, Resolver};

#[cfg(test)]
mod proptests {
    use std::sync::Arc;

    use privcheck_core::HostName;
    use proptest::prelude::*;

    use super::*;

    fn label() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,6}"
    }

    proptest! {
        #[test]
        fn resolution_is_deterministic(labels in prop::collection::vec(label(), 1..4)) {
            let taxonomy = parse_taxonomy(
                "trackers:\n  tracker.com:\n    owner: T\n    category: advertising\n",
                "<inline>",
            ).unwrap();
            let resolver = Resolver::new(Arc::new(taxonomy));
            let raw = format!("{}.tracker.com", labels.join("."));
            let host = HostName::parse(&raw).unwrap();
            let a = resolver.resolve(&host);
            let b = resolver.resolve(&host);
            prop_assert_eq!(&a, &b);
            prop_assert!(a.is_match());
        }
    }
}
