//! End-to-end reconciliation through the watch loop: resources are only
//! created, annotated, and deleted through the store; the controller picks
//! everything up from change notifications.

use std::sync::Arc;
use std::time::Duration;

use proxylink_controller::{Controller, WorkerConfig};
use proxylink_core::{
    ALLOW_INCLUSION_ANNOTATION, FINALIZER, Include, NamespacedName, PARENT_REF_ANNOTATION,
    PATH_PREFIX_ANNOTATION, ProxyResource,
};
use proxylink_db_memory::MemoryStore;
use proxylink_storage::ResourceStore;

const OWNER: &str = "proxylink";

fn start_controller(store: &Arc<MemoryStore>) -> tokio::task::JoinHandle<()> {
    let controller = Controller::new(
        store.clone() as Arc<dyn ResourceStore>,
        OWNER,
        WorkerConfig {
            max_attempts: 5,
            retry_delay: Duration::from_millis(5),
        },
    );
    tokio::spawn(async move { controller.run().await })
}

/// Poll until the condition holds or the deadline passes.
async fn eventually<F>(mut condition: F, what: &str)
where
    F: AsyncFnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if condition().await {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn child_lifecycle_flows_through_watch_events() {
    let store = Arc::new(MemoryStore::new());
    let handle = start_controller(&store);
    let parent_key = NamespacedName::new("root", "example");

    store
        .create(
            ProxyResource::new("root", "example")
                .with_annotation(ALLOW_INCLUSION_ANNOTATION, "true"),
        )
        .await
        .unwrap();
    let child = store
        .create(
            ProxyResource::new("blog-team", "blog")
                .with_annotation(PARENT_REF_ANNOTATION, "root/example"),
        )
        .await
        .unwrap();

    // Inclusion with the default prefix appears.
    eventually(
        async || {
            store.get(&parent_key).await.unwrap().includes
                == vec![Include::new("blog-team", "blog", "/blog")]
        },
        "child included with default prefix",
    )
    .await;

    // The cleanup marker was attached along the way.
    assert!(store.get(&child.key).await.unwrap().has_finalizer(FINALIZER));

    // Prefix override replaces the entry without duplicating it.
    let mut updated = store.get(&child.key).await.unwrap();
    updated
        .annotations
        .insert(PATH_PREFIX_ANNOTATION.into(), "/newblog".into());
    store.update(updated, "operator").await.unwrap();

    eventually(
        async || {
            store.get(&parent_key).await.unwrap().includes
                == vec![Include::new("blog-team", "blog", "/newblog")]
        },
        "prefix update replaces entry in place",
    )
    .await;

    // Deletion: entry excised from the parent, then the object disappears.
    store.delete(&child.key, "operator").await.unwrap();

    eventually(
        async || store.get(&parent_key).await.unwrap().includes.is_empty(),
        "entry removed from parent after child deletion",
    )
    .await;
    eventually(
        async || !store.exists(&child.key),
        "child erased after marker detach",
    )
    .await;

    handle.abort();
}

#[tokio::test]
async fn conflicting_prefix_never_mutates_the_parent() {
    let store = Arc::new(MemoryStore::new());
    let handle = start_controller(&store);
    let parent_key = NamespacedName::new("root", "example");

    store
        .create(
            ProxyResource::new("root", "example")
                .with_annotation(ALLOW_INCLUSION_ANNOTATION, "true"),
        )
        .await
        .unwrap();
    store
        .create(
            ProxyResource::new("hoge", "hoge")
                .with_annotation(PARENT_REF_ANNOTATION, "root/example"),
        )
        .await
        .unwrap();

    eventually(
        async || !store.get(&parent_key).await.unwrap().includes.is_empty(),
        "first child included",
    )
    .await;

    // Second child claims the first child's prefix.
    store
        .create(
            ProxyResource::new("sales-team", "sales")
                .with_annotation(PARENT_REF_ANNOTATION, "root/example")
                .with_annotation(PATH_PREFIX_ANNOTATION, "/hoge"),
        )
        .await
        .unwrap();

    // Give the controller time to process, then verify nothing changed.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let parent = store.get(&parent_key).await.unwrap();
    assert_eq!(parent.includes, vec![Include::new("hoge", "hoge", "/hoge")]);

    handle.abort();
}

#[tokio::test]
async fn lagged_watch_receiver_resumes() {
    // An event buffer of one forces the controller's receiver to lag as
    // soon as writes outpace it; the loop must survive that and still
    // pick up the newest event.
    let store = Arc::new(MemoryStore::with_event_buffer(1));
    let handle = start_controller(&store);
    let parent_key = NamespacedName::new("root", "example");

    store
        .create(
            ProxyResource::new("root", "example")
                .with_annotation(ALLOW_INCLUSION_ANNOTATION, "true"),
        )
        .await
        .unwrap();
    for i in 0..16 {
        store
            .create(ProxyResource::new("noise", format!("n{i}")))
            .await
            .unwrap();
    }

    // The child's create is the last event sent, so it is the one the
    // receiver resumes on after reporting the lag.
    store
        .create(
            ProxyResource::new("blog-team", "blog")
                .with_annotation(PARENT_REF_ANNOTATION, "root/example"),
        )
        .await
        .unwrap();

    eventually(
        async || {
            store.get(&parent_key).await.unwrap().includes
                == vec![Include::new("blog-team", "blog", "/blog")]
        },
        "child included despite lagged watch channel",
    )
    .await;

    handle.abort();
}

#[tokio::test]
async fn siblings_converge_under_one_parent() {
    let store = Arc::new(MemoryStore::new());
    let handle = start_controller(&store);
    let parent_key = NamespacedName::new("root", "example");

    store
        .create(
            ProxyResource::new("root", "example")
                .with_annotation(ALLOW_INCLUSION_ANNOTATION, "true"),
        )
        .await
        .unwrap();

    for (namespace, name) in [("a-team", "a"), ("b-team", "b"), ("c-team", "c")] {
        store
            .create(
                ProxyResource::new(namespace, name)
                    .with_annotation(PARENT_REF_ANNOTATION, "root/example"),
            )
            .await
            .unwrap();
    }

    eventually(
        async || store.get(&parent_key).await.unwrap().includes.len() == 3,
        "all three siblings included",
    )
    .await;

    let parent = store.get(&parent_key).await.unwrap();
    assert_eq!(
        parent.includes,
        vec![
            Include::new("a-team", "a", "/a"),
            Include::new("b-team", "b", "/b"),
            Include::new("c-team", "c", "/c"),
        ]
    );

    handle.abort();
}
