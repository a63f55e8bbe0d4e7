//! Watcher timing on a paused clock

use super::*;
use crate::config::EngineConfig;
use crate::reconcile::SharedDocument;
use crate::resolve::{ResolveResult, ResolvedStatus, StaticResolver, StatusCache, StatusResolver};
use crate::ticket::{Identifier, StatusCategory};
use crate::tree::{Document, NodeId, NodeSpec};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BUILDS: &str = "https://commify.visualstudio.com/Project/_build?definitionId=42";
const ROW_A: &str = "#20260116.2 • feat: ECP-4849 [BFF] Return isBillable flag field";
const ROW_B: &str = "#20260113.3 • Pavel.malai/ecp 4805 (#637)";

struct CountingResolver {
    inner: StaticResolver,
    calls: AtomicUsize,
}

#[async_trait]
impl StatusResolver for CountingResolver {
    async fn resolve_status(&self, id: &Identifier) -> ResolveResult<ResolvedStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve_status(id).await
    }
}

fn id(raw: &str) -> Identifier {
    Identifier::normalize(raw).unwrap()
}

fn build_row(text: &str) -> NodeSpec {
    NodeSpec::element("tr")
        .class("run-row")
        .child(NodeSpec::element("td").child(NodeSpec::element("a").with_text(text)))
        .child(NodeSpec::element("td").with_text("Succeeded"))
}

fn listing(rows: &[&str]) -> Document {
    let mut table = NodeSpec::element("table").class("build-list");
    for text in rows {
        table = table.child(build_row(text));
    }
    Document::from_specs(&[NodeSpec::element("div").class("app").child(table)]).unwrap()
}

fn table_of(doc: &Document) -> NodeId {
    let app = doc.element_children(doc.body())[0];
    doc.element_children(app)[0]
}

/// Replace every row, returning the new row nodes
fn rerender(document: &SharedDocument, rows: &[&str]) -> Vec<NodeId> {
    let mut doc = document.lock().unwrap();
    let table = table_of(&doc);
    for tr in doc.element_children(table) {
        doc.remove(tr).unwrap();
    }
    rows.iter()
        .map(|text| doc.insert_spec(table, &build_row(text)).unwrap())
        .collect()
}

struct Harness {
    watcher: Arc<MutationWatcher>,
    location: SharedLocation,
    document: SharedDocument,
    resolver: Arc<CountingResolver>,
}

impl Harness {
    fn new(href: &str) -> Self {
        let resolver = Arc::new(CountingResolver {
            inner: StaticResolver::new()
                .with_status(id("ECP-4849"), ResolvedStatus::new("In Progress", StatusCategory::Indeterminate))
                .with_status(id("ECP-4805"), ResolvedStatus::new("Done", StatusCategory::Done))
                .with_status(id("IP-7"), ResolvedStatus::new("Awaiting Release", StatusCategory::Done)),
            calls: AtomicUsize::new(0),
        });
        let location = SharedLocation::new(href);
        let document: SharedDocument = Arc::new(Mutex::new(listing(&[ROW_A, ROW_B])));
        let watcher = MutationWatcher::new(
            EngineConfig::default(),
            document.clone(),
            resolver.clone(),
            Arc::new(StatusCache::default()),
            Arc::new(location.clone()),
        )
        .unwrap();
        Self {
            watcher,
            location,
            document,
            resolver,
        }
    }

    fn calls(&self) -> usize {
        self.resolver.calls.load(Ordering::SeqCst)
    }

    fn annotations(&self) -> usize {
        let engine = self.watcher.engine();
        let doc = engine.lock();
        engine.reconciler().annotations(&doc).len()
    }

    fn added(&self) -> Vec<MutationRecord> {
        let doc = self.document.lock().unwrap();
        vec![MutationRecord::added(doc.element_children(table_of(&doc)))]
    }

    async fn prime(&self) {
        self.watcher.on_mutations(&self.added());
        sleep(600).await;
        assert_eq!(self.watcher.state(), WatchState::Steady);
    }
}

async fn sleep(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn priming_burst_runs_one_full_pass() {
    let h = Harness::new(BUILDS);
    for _ in 0..3 {
        h.watcher.on_mutations(&h.added());
        sleep(100).await;
    }
    assert_eq!(h.watcher.stats().full_passes, 0);
    assert_eq!(h.watcher.state(), WatchState::Priming);

    sleep(450).await;
    assert_eq!(h.watcher.stats().full_passes, 1);
    assert_eq!(h.watcher.state(), WatchState::Steady);
    assert_eq!(h.annotations(), 2);
    assert_eq!(h.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn new_burst_supersedes_pending_pass() {
    let h = Harness::new(BUILDS);
    h.watcher.on_mutations(&h.added());
    sleep(300).await;
    h.watcher.on_mutations(&h.added());
    sleep(300).await;
    assert_eq!(h.watcher.stats().full_passes, 0);

    sleep(300).await;
    assert_eq!(h.watcher.stats().full_passes, 1);
}

#[tokio::test(start_paused = true)]
async fn batches_without_added_nodes_are_ignored() {
    let h = Harness::new(BUILDS);
    h.watcher.on_mutations(&[MutationRecord::default()]);
    h.watcher.on_mutations(&[]);
    sleep(1000).await;
    assert_eq!(h.watcher.stats().full_passes, 0);
    assert_eq!(h.watcher.state(), WatchState::Priming);
}

#[tokio::test(start_paused = true)]
async fn inactive_page_is_ignored() {
    let h = Harness::new("https://commify.visualstudio.com/Project/_git/repo");
    h.watcher.on_mutations(&h.added());
    sleep(1000).await;
    assert_eq!(h.watcher.stats().full_passes, 0);
    assert_eq!(h.annotations(), 0);
}

#[tokio::test(start_paused = true)]
async fn steady_burst_reattaches_before_passing() {
    let h = Harness::new(BUILDS);
    h.prime().await;

    // Virtual scrolling renders the same builds as new nodes
    let rows = rerender(&h.document, &[ROW_B, ROW_A]);
    h.watcher.on_mutations(&[MutationRecord::added(rows)]);
    sleep(150).await;

    let stats = h.watcher.stats();
    assert_eq!(stats.reattach_passes, 1);
    assert_eq!(stats.reattached, 2);
    assert_eq!(stats.full_passes, 2);
    assert_eq!(h.annotations(), 2);
    assert_eq!(h.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn scroll_reattaches_only_when_steady() {
    let h = Harness::new(BUILDS);
    h.watcher.on_scroll();
    sleep(300).await;
    assert_eq!(h.watcher.stats().reattach_passes, 0);

    h.prime().await;
    rerender(&h.document, &[ROW_A, ROW_B]);
    h.watcher.on_scroll();
    h.watcher.on_scroll();
    sleep(250).await;

    let stats = h.watcher.stats();
    assert_eq!(stats.reattach_passes, 1);
    assert_eq!(stats.reattached, 2);
    assert_eq!(stats.full_passes, 1);
}

#[tokio::test(start_paused = true)]
async fn start_runs_initial_pass_after_delay() {
    let h = Harness::new(BUILDS);
    let _poll = h.watcher.start();
    sleep(900).await;
    assert_eq!(h.watcher.stats().full_passes, 0);

    sleep(200).await;
    assert_eq!(h.watcher.stats().full_passes, 1);
    assert_eq!(h.watcher.state(), WatchState::Steady);
    assert!(h.watcher.engine().is_build_page());
}

#[tokio::test(start_paused = true)]
async fn navigation_resets_to_priming_and_keeps_cache() {
    let h = Harness::new(BUILDS);
    let _poll = h.watcher.start();
    sleep(1100).await;
    assert_eq!(h.watcher.state(), WatchState::Steady);
    let first_engine = h.watcher.engine();

    h.location
        .set("https://commify.visualstudio.com/Project/_build?definitionId=43");
    rerender(&h.document, &[ROW_B, "#20260117.1 • feat: IP-7 release notes"]);
    sleep(1000).await;

    assert_eq!(h.watcher.stats().navigations, 1);
    assert_eq!(h.watcher.state(), WatchState::Priming);
    assert!(!Arc::ptr_eq(&first_engine, &h.watcher.engine()));

    sleep(1000).await;
    assert_eq!(h.watcher.state(), WatchState::Steady);
    assert_eq!(h.watcher.stats().full_passes, 2);
    assert_eq!(h.annotations(), 2);
    // ECP-4805 came from the cache; only IP-7 was new
    assert_eq!(h.calls(), 3);
    assert!(h.watcher.cache().get(&id("ECP-4849")).is_some());
}

#[tokio::test(start_paused = true)]
async fn same_page_address_change_does_not_reset() {
    let h = Harness::new(BUILDS);
    let _poll = h.watcher.start();
    h.location.set(format!("{BUILDS}&view=results"));
    assert!(!h.watcher.poll_navigation());
    assert_eq!(h.watcher.stats().navigations, 0);
}
