use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use stockroom_core::{DepositId, IngestConfig, RemoteId};
use stockroom_ingest::tsv;
use stockroom_ingest::{
    scan_directory, AltTextGenerator, AssetNaming, AssetPublisher, CompletionStore, DetailScraper,
    FailureLog, IngestError, IngestPipeline, PipelineOptions, PublishRequest, ScanOutcome,
    COMPLETED_HEADER, EMPTY_TOTAL, SIZE_LIMIT_MESSAGE,
};
use tempfile::TempDir;

/// Detail page served by the fake source.
#[derive(Clone)]
struct Page {
    title: String,
    author: String,
    keywords: Vec<String>,
}

fn page(title: &str, keywords: usize) -> Page {
    Page {
        title: title.to_string(),
        author: "jdoe".to_string(),
        keywords: (0..keywords).map(|i| format!("kw{i}")).collect(),
    }
}

/// Extraction double with per-step call counters.
#[derive(Default)]
struct FakeExtractor {
    pages: HashMap<String, Page>,
    alt_timeouts: HashSet<String>,
    author_timeouts: HashSet<String>,
    keyword_failures: HashSet<String>,
    current: Mutex<Option<String>>,
    generate_calls: AtomicUsize,
    open_calls: AtomicUsize,
    title_calls: AtomicUsize,
    author_calls: AtomicUsize,
    keyword_calls: AtomicUsize,
}

impl FakeExtractor {
    fn with_pages(pages: impl IntoIterator<Item = (&'static str, Page)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(id, page)| (id.to_string(), page))
                .collect(),
            ..Self::default()
        }
    }

    fn current_id(&self) -> String {
        self.current
            .lock()
            .expect("current lock")
            .clone()
            .unwrap_or_default()
    }

    fn current_page(&self) -> Option<Page> {
        let current = self.current.lock().expect("current lock").clone()?;
        self.pages.get(&current).cloned()
    }

    fn total_calls(&self) -> usize {
        [
            &self.generate_calls,
            &self.open_calls,
            &self.title_calls,
            &self.author_calls,
            &self.keyword_calls,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

#[async_trait]
impl AltTextGenerator for FakeExtractor {
    async fn generate(&self, image: &Path) -> stockroom_ingest::Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.alt_timeouts.contains(&name) {
            return Err(IngestError::Timeout("textarea".to_string()));
        }
        Ok(format!("Alt text for {name}"))
    }
}

#[async_trait]
impl DetailScraper for FakeExtractor {
    async fn open(&self, id: &DepositId) -> stockroom_ingest::Result<String> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().expect("current lock") = Some(id.to_string());
        Ok(format!("https://depositphotos.com/photo/asset-{id}.html"))
    }

    async fn title(&self) -> stockroom_ingest::Result<String> {
        self.title_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.current.lock().expect("current lock").clone();
        match self.current_page() {
            Some(page) => Ok(page.title),
            None => Err(IngestError::NotFound {
                deposit_id: DepositId::new(current.unwrap_or_default()).expect("id"),
            }),
        }
    }

    async fn author(&self) -> stockroom_ingest::Result<String> {
        self.author_calls.fetch_add(1, Ordering::SeqCst);
        if self.author_timeouts.contains(&self.current_id()) {
            return Err(IngestError::Timeout("._wdeBj".to_string()));
        }
        Ok(self.current_page().expect("page").author)
    }

    async fn keywords(&self) -> stockroom_ingest::Result<Vec<String>> {
        self.keyword_calls.fetch_add(1, Ordering::SeqCst);
        if self.keyword_failures.contains(&self.current_id()) {
            return Err(IngestError::Extraction(
                "keyword list script returned no array".to_string(),
            ));
        }
        Ok(self.current_page().expect("page").keywords)
    }
}

/// Publisher double that fails for configured titles.
#[derive(Default)]
struct FakePublisher {
    failing_titles: HashSet<String>,
    unreachable: bool,
    requests: Mutex<Vec<PublishRequest>>,
}

impl FakePublisher {
    fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl AssetPublisher for FakePublisher {
    async fn publish(&self, request: &PublishRequest) -> stockroom_ingest::Result<RemoteId> {
        let mut requests = self.requests.lock().expect("requests lock");
        requests.push(request.clone());
        if self.unreachable {
            return Err(IngestError::Transport(
                "error sending request for url (https://mines.piwigo.com/ws.php)".to_string(),
            ));
        }
        if self.failing_titles.contains(&request.title) {
            return Err(IngestError::Protocol {
                method: "pwg.images.addSimple".to_string(),
                code: "500".to_string(),
                message: "upload failed".to_string(),
            });
        }
        Ok(RemoteId::new(format!("{}", 1000 + requests.len())))
    }
}

struct Workspace {
    photos: TempDir,
    logs: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            photos: TempDir::new().expect("photos dir"),
            logs: TempDir::new().expect("logs dir"),
        }
    }

    fn add_photo(&self, id: &str) -> PathBuf {
        let path = self.photos.path().join(format!("Depositphotos_{id}_XL.jpg"));
        std::fs::write(&path, b"jpeg").expect("write photo");
        path
    }

    fn completed_path(&self) -> PathBuf {
        self.logs.path().join("completed.tsv")
    }

    fn failed_path(&self) -> PathBuf {
        self.logs.path().join("failed.tsv")
    }

    async fn scan(&self) -> ScanOutcome {
        let naming = AssetNaming::from_config(&IngestConfig::default());
        scan_directory(self.photos.path(), &naming)
            .await
            .expect("scan")
    }

    fn pipeline(
        &self,
        extractor: FakeExtractor,
        publisher: FakePublisher,
    ) -> IngestPipeline<FakeExtractor, FakePublisher> {
        let completed = CompletionStore::open(self.completed_path()).expect("completion log");
        let failures = FailureLog::create(self.failed_path()).expect("failure log");
        IngestPipeline::new(
            extractor,
            publisher,
            completed,
            failures,
            PipelineOptions::default(),
        )
    }

    fn completed_rows(&self) -> Vec<Vec<String>> {
        read_rows(&self.completed_path())
    }

    fn failed_rows(&self) -> Vec<Vec<String>> {
        read_rows(&self.failed_path())
    }
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    tsv::parse(&std::fs::read_to_string(path).expect("read log"))
}

#[tokio::test]
async fn test_successful_run_then_idempotent_rerun() {
    let ws = Workspace::new();
    for id in ["101", "102", "103"] {
        ws.add_photo(id);
    }

    let mut pipeline = ws.pipeline(
        FakeExtractor::with_pages([
            ("101", page("Fox", 3)),
            ("102", page("Owl", 3)),
            ("103", page("Elk", 3)),
        ]),
        FakePublisher::default(),
    );
    let summary = pipeline.run(ws.scan().await).await.expect("first run");
    assert_eq!(summary.committed, 3);
    assert_eq!(summary.failed, 0);
    drop(pipeline);

    let rows = ws.completed_rows();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], COMPLETED_HEADER.map(String::from).to_vec());
    assert_eq!(rows[1][1], "101");
    assert_eq!(rows[1][2], "https://depositphotos.com/photo/asset-101.html");
    assert_eq!(rows[1][3], "Fox");
    assert_eq!(rows[1][6], "kw0;kw1;kw2");
    assert_eq!(rows[1][7], "1001");

    let mut rerun = ws.pipeline(
        FakeExtractor::with_pages([("101", page("Fox", 3))]),
        FakePublisher::default(),
    );
    let summary = rerun.run(ws.scan().await).await.expect("second run");
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.committed, 0);
    assert_eq!(rerun.extractor().total_calls(), 0);
    assert_eq!(rerun.publisher().calls(), 0);
    drop(rerun);

    assert_eq!(ws.completed_rows().len(), 4);
    assert_eq!(ws.failed_rows(), vec![vec!["LocalPath", "DepositID", "Stage", "Error"]]);
}

#[tokio::test]
async fn test_oversized_asset_makes_no_calls() {
    let ws = Workspace::new();
    let path = ws.add_photo("500");
    std::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .expect("open photo")
        .set_len(19_500_000)
        .expect("grow photo");

    let mut pipeline = ws.pipeline(
        FakeExtractor::with_pages([("500", page("Big", 3))]),
        FakePublisher::default(),
    );
    let summary = pipeline.run(ws.scan().await).await.expect("run");
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.oversized, 1);
    assert_eq!(pipeline.extractor().total_calls(), 0);
    assert_eq!(pipeline.publisher().calls(), 0);
    drop(pipeline);

    let rows = ws.failed_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][1], "500");
    assert_eq!(rows[1][2], "Generating Alt Text");
    assert_eq!(rows[1][3], SIZE_LIMIT_MESSAGE);
    assert_eq!(ws.completed_rows().len(), 1);
}

#[tokio::test]
async fn test_keywords_capped_at_fifty_in_order() {
    let ws = Workspace::new();
    ws.add_photo("700");

    let mut pipeline = ws.pipeline(
        FakeExtractor::with_pages([("700", page("Many tags", 73))]),
        FakePublisher::default(),
    );
    pipeline.run(ws.scan().await).await.expect("run");

    let requests = pipeline.publisher().requests.lock().expect("lock").clone();
    assert_eq!(requests[0].tags.len(), 50);
    drop(pipeline);

    let rows = ws.completed_rows();
    let keywords: Vec<&str> = rows[1][6].split(';').collect();
    let expected: Vec<String> = (0..50).map(|i| format!("kw{i}")).collect();
    assert_eq!(keywords, expected);
}

#[tokio::test]
async fn test_successes_and_failures_partition_candidates() {
    let ws = Workspace::new();
    for id in ["1", "2", "3", "4"] {
        ws.add_photo(id);
    }

    let mut extractor = FakeExtractor::with_pages([
        ("1", page("One", 2)),
        ("2", page("Two", 2)),
        ("3", page("Three", 2)),
        ("4", page("Four", 2)),
    ]);
    extractor
        .alt_timeouts
        .insert("Depositphotos_2_XL.jpg".to_string());
    let publisher = FakePublisher {
        failing_titles: HashSet::from(["Four".to_string()]),
        ..FakePublisher::default()
    };

    let mut pipeline = ws.pipeline(extractor, publisher);
    let summary = pipeline.run(ws.scan().await).await.expect("run");
    assert_eq!(summary.candidates, 4);
    assert_eq!(summary.committed, 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.committed + summary.failed, summary.candidates);
    drop(pipeline);

    let completed = ws.completed_rows();
    assert_eq!(completed.len() - 1, 2);

    let failed = ws.failed_rows();
    assert_eq!(failed.len() - 1, 2);
    assert_eq!(failed[1][1], "2");
    assert_eq!(failed[1][2], "Generating Alt Text");
    assert_eq!(failed[2][1], "4");
    assert_eq!(failed[2][2], "Piwigo addSimple");
    assert_eq!(failed[2][3], "pwg.images.addSimple failed: 500 upload failed");
}

#[tokio::test]
async fn test_not_found_stops_before_author() {
    let ws = Workspace::new();
    ws.add_photo("999");

    let mut pipeline = ws.pipeline(FakeExtractor::default(), FakePublisher::default());
    let summary = pipeline.run(ws.scan().await).await.expect("run");
    assert_eq!(summary.failed, 1);

    let extractor = pipeline.extractor();
    assert_eq!(extractor.title_calls.load(Ordering::SeqCst), 1);
    assert_eq!(extractor.author_calls.load(Ordering::SeqCst), 0);
    assert_eq!(extractor.keyword_calls.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.publisher().calls(), 0);
    drop(pipeline);

    let rows = ws.failed_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][2], "Gathering Title");
    assert!(rows[1][3].contains("doesn't exist"));
}

#[tokio::test]
async fn test_empty_directory() {
    let ws = Workspace::new();
    let scan = ws.scan().await;
    assert_eq!(scan.total, EMPTY_TOTAL);

    let mut pipeline = ws.pipeline(FakeExtractor::default(), FakePublisher::default());
    let summary = pipeline.run(scan).await.expect("run");
    assert_eq!(summary.candidates, 0);
    assert_eq!(summary.committed, 0);
    assert_eq!(pipeline.completed().committed_this_run(), 0);
}

#[tokio::test]
async fn test_preseeded_completion_log_is_honoured() {
    let ws = Workspace::new();
    let done = ws.add_photo("100");
    ws.add_photo("200");

    let mut seed = tsv::encode_row(&COMPLETED_HEADER);
    seed.push_str(&tsv::encode_row(&[
        done.display().to_string(),
        "100".to_string(),
        "https://depositphotos.com/photo/asset-100.html".to_string(),
        "Old".to_string(),
        "jdoe".to_string(),
        "Earlier alt text".to_string(),
        "a;b".to_string(),
        "77".to_string(),
    ]));
    std::fs::write(ws.completed_path(), seed).expect("seed log");

    let mut pipeline = ws.pipeline(
        FakeExtractor::with_pages([("100", page("Old", 2)), ("200", page("New", 2))]),
        FakePublisher::default(),
    );
    let summary = pipeline.run(ws.scan().await).await.expect("run");
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.committed, 1);
    assert_eq!(pipeline.extractor().generate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.completed().len(), 2);
    drop(pipeline);

    let rows = ws.completed_rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2][1], "200");
}

#[tokio::test]
async fn test_author_failure_is_tagged_and_stops_the_asset() {
    let ws = Workspace::new();
    ws.add_photo("31");

    let mut extractor = FakeExtractor::with_pages([("31", page("Dunes", 4))]);
    extractor.author_timeouts.insert("31".to_string());

    let mut pipeline = ws.pipeline(extractor, FakePublisher::default());
    let summary = pipeline.run(ws.scan().await).await.expect("run");
    assert_eq!(summary.failed, 1);
    assert_eq!(pipeline.extractor().author_calls.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.extractor().keyword_calls.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.publisher().calls(), 0);
    drop(pipeline);

    let rows = ws.failed_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][1], "31");
    assert_eq!(rows[1][2], "Gathering Author");
    assert_eq!(rows[1][3], "timeout: ._wdeBj");
    assert_eq!(ws.completed_rows().len(), 1);
}

#[tokio::test]
async fn test_keyword_failure_is_tagged_and_nothing_published() {
    let ws = Workspace::new();
    ws.add_photo("32");

    let mut extractor = FakeExtractor::with_pages([("32", page("Glacier", 4))]);
    extractor.keyword_failures.insert("32".to_string());

    let mut pipeline = ws.pipeline(extractor, FakePublisher::default());
    let summary = pipeline.run(ws.scan().await).await.expect("run");
    assert_eq!(summary.failed, 1);
    assert_eq!(pipeline.extractor().keyword_calls.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.publisher().calls(), 0);
    drop(pipeline);

    let rows = ws.failed_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][2], "Gathering Keywords");
    assert!(rows[1][3].starts_with("extraction failed:"));
    assert_eq!(ws.completed_rows().len(), 1);
}

#[tokio::test]
async fn test_unreachable_gallery_is_tagged_as_publish_failure() {
    let ws = Workspace::new();
    ws.add_photo("33");
    ws.add_photo("34");

    let publisher = FakePublisher {
        unreachable: true,
        ..FakePublisher::default()
    };
    let mut pipeline = ws.pipeline(
        FakeExtractor::with_pages([("33", page("Reef", 2)), ("34", page("Kelp", 2))]),
        publisher,
    );
    let summary = pipeline.run(ws.scan().await).await.expect("run");
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.committed, 0);
    assert_eq!(pipeline.publisher().calls(), 2);
    assert_eq!(pipeline.completed().committed_this_run(), 0);
    drop(pipeline);

    let rows = ws.failed_rows();
    assert_eq!(rows.len(), 3);
    assert!(rows[1..].iter().all(|row| row[2] == "Piwigo addSimple"));
    assert!(rows[1][3].starts_with("error sending request"));
    assert_eq!(ws.completed_rows().len(), 1);
}
