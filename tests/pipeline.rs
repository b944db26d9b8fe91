//! Pipeline Driver Integration Tests
//!
//! Drives the role and weapon resolvers against in-memory fetcher and
//! publisher fakes, recording every call.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use encore_rehost::adapters::{AssetFetcher, ContentPublisher, FetchError, PublishError};
use encore_rehost::config::{Settings, StoreConfig, StoreEndpoints};
use encore_rehost::core::{
    write_catalog, EntityOutcome, Pipeline, PipelineError, RoleResolver, SkipReason,
    WeaponResolver,
};
use encore_rehost::domain::{AssetKind, PublishedAsset, RawRole, RoleRecord, WeaponRecord};
use serde_json::{json, Value};
use tempfile::TempDir;
use tracing::field::{Field, Visit};
use tracing::span;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

const LISTING: &str = "https://api.test/en/character/";
const WEAPONS: &str = "https://api.test/en/weapon/";

/// Serves canned bodies by URL and records requests
#[derive(Default)]
struct FakeFetcher {
    responses: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn with_json(mut self, url: &str, value: Value) -> Self {
        self.responses
            .insert(url.to_string(), serde_json::to_vec(&value).unwrap());
        self
    }

    fn with_bytes(mut self, url: &str, bytes: &[u8]) -> Self {
        self.responses.insert(url.to_string(), bytes.to_vec());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// In-memory store with per-path failure injection
struct FakePublisher {
    store: StoreConfig,
    fail_paths: HashSet<String>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
}

impl FakePublisher {
    fn new() -> Self {
        let lookup = |key: &str| match key {
            "GITHUB_TOKEN" => Some("t0ken".to_string()),
            "GITHUB_USER" => Some("octo".to_string()),
            "REPO_NAME" => Some("assets".to_string()),
            _ => None,
        };

        Self {
            store: StoreConfig::from_lookup(lookup, &StoreEndpoints::default()).unwrap(),
            fail_paths: HashSet::new(),
            objects: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(mut self, path: &str) -> Self {
        self.fail_paths.insert(path.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentPublisher for FakePublisher {
    fn name(&self) -> &str {
        "fake"
    }

    async fn publish(
        &self,
        kind: AssetKind,
        path: &str,
        content: &[u8],
        _message: &str,
    ) -> Result<PublishedAsset, PublishError> {
        self.calls.lock().unwrap().push(path.to_string());

        if self.fail_paths.contains(path) {
            return Err(PublishError::Rejected {
                path: path.to_string(),
                status: 422,
                message: "Invalid request".to_string(),
            });
        }

        let previous = self
            .objects
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_vec());

        Ok(PublishedAsset {
            kind,
            store_path: path.to_string(),
            public_url: self.public_url(path),
            created: previous.is_none(),
        })
    }

    fn public_url(&self, path: &str) -> String {
        self.store.public_url(path)
    }
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.upstream.base_url = "https://api.test".to_string();
    settings.upstream.resource_base = "https://api.test/resource".to_string();
    settings.roles.portrait.host = "https://cdn.test/p".to_string();
    settings.weapons.icon_template = "https://api.test/resource/Game/Aki/{path}.png".to_string();
    settings
}

fn rex() -> Value {
    json!({
        "Id": 100,
        "Name": "Rex",
        "QualityId": 3,
        "Element": { "Id": 5 },
        "RoleHeadIcon": "http://x/h.png"
    })
}

fn role(id: u32, name: &str) -> Value {
    json!({
        "Id": id,
        "Name": name,
        "QualityId": 5,
        "Element": { "Id": 1 },
        "RoleHeadIcon": format!("/Game/Aki/UI/head_{}.png", id)
    })
}

/// Fetcher serving Rex's listing, detail and both images
fn rex_fetcher() -> FakeFetcher {
    FakeFetcher::default()
        .with_json(LISTING, json!({ "roleList": [rex()] }))
        .with_json(
            "https://api.test/en/character/100",
            json!({ "FormationRoleCard": "/UI/Img/x.png" }),
        )
        .with_bytes("http://x/h.png", b"head-bytes")
        .with_bytes("https://cdn.test/p/UI/Img/x.webp", b"portrait-bytes")
}

#[tokio::test]
async fn test_single_role_end_to_end() {
    let fetcher = rex_fetcher();
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let (catalog, report) = pipeline.run(&RoleResolver::new(&settings())).await.unwrap();

    assert_eq!(report.included, 1);
    assert!(report.skipped.is_empty());
    assert_eq!(
        catalog.records(),
        &[RoleRecord {
            id: 100,
            name: "Rex".to_string(),
            rarity: 3,
            element: 5,
            role_head: "https://raw.githubusercontent.com/octo/assets/main/icons/100.png"
                .to_string(),
            role_portrait: "https://raw.githubusercontent.com/octo/assets/main/portraits/100.webp"
                .to_string(),
        }]
    );

    // Head strictly before portrait
    assert_eq!(publisher.calls(), vec!["icons/100.png", "portraits/100.webp"]);
}

#[tokio::test]
async fn test_lowercase_identity_keys_accepted() {
    let listing = json!({ "roleList": [{
        "id": 100,
        "name": "Rex",
        "QualityId": 3,
        "Element": { "Id": 5 },
        "RoleHeadIcon": "http://x/h.png"
    }] });
    let fetcher = rex_fetcher().with_json(LISTING, listing);
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let (catalog, report) = pipeline.run(&RoleResolver::new(&settings())).await.unwrap();

    assert_eq!(report.included, 1);
    assert!(report.skipped.is_empty());
    assert_eq!(catalog.records()[0].id, 100);
    assert_eq!(catalog.records()[0].name, "Rex");
    assert_eq!(publisher.calls(), vec!["icons/100.png", "portraits/100.webp"]);
}

#[tokio::test]
async fn test_head_publish_failure_skips_role() {
    let fetcher = rex_fetcher();
    let publisher = FakePublisher::new().failing("icons/100.png");
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let (catalog, report) = pipeline.run(&RoleResolver::new(&settings())).await.unwrap();

    assert!(catalog.is_empty());
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.skipped[0].reason,
        SkipReason::Publish {
            kind: AssetKind::RoleHead,
            ..
        }
    ));

    // The portrait is never downloaded nor uploaded
    assert!(!fetcher
        .calls()
        .contains(&"https://cdn.test/p/UI/Img/x.webp".to_string()));
    assert_eq!(publisher.calls(), vec!["icons/100.png"]);
}

#[tokio::test]
async fn test_excluded_entities_cause_no_calls() {
    let fetcher = FakeFetcher::default().with_json(
        LISTING,
        json!({ "roleList": [role(1501, "Rover: Spectro"), role(1203, "Encore")] }),
    );
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let mut settings = settings();
    settings.roles.exclude_names = vec!["Rover".to_string()];
    settings.roles.skip_ids = vec![1203];

    let (catalog, report) = pipeline.run(&RoleResolver::new(&settings)).await.unwrap();

    assert!(catalog.is_empty());
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(report.failed(), 0);
    assert!(report
        .skipped
        .iter()
        .all(|s| matches!(s.reason, SkipReason::Excluded)));

    assert_eq!(fetcher.calls(), vec![LISTING.to_string()]);
    assert!(publisher.calls().is_empty());
}

#[tokio::test]
async fn test_missing_marker_skips_only_that_entity() {
    let fetcher = FakeFetcher::default()
        .with_json(
            LISTING,
            json!({ "roleList": [role(1, "NoMarker"), role(2, "Fine")] }),
        )
        .with_json(
            "https://api.test/en/character/1",
            json!({ "FormationRoleCard": "/Image/x.png" }),
        )
        .with_json(
            "https://api.test/en/character/2",
            json!({ "FormationRoleCard": "/Game/Aki/UI/Card/two.png" }),
        )
        .with_bytes("https://api.test/resource/Game/Aki/UI/head_1.png", b"h1")
        .with_bytes("https://api.test/resource/Game/Aki/UI/head_2.png", b"h2")
        .with_bytes("https://cdn.test/p/UI/Card/two.webp", b"p2");
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let (catalog, report) = pipeline.run(&RoleResolver::new(&settings())).await.unwrap();

    let ids: Vec<u32> = catalog.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key.as_ref().unwrap().id, 1);

    // Nothing of entity 1 was downloaded or uploaded
    assert!(!fetcher
        .calls()
        .contains(&"https://api.test/resource/Game/Aki/UI/head_1.png".to_string()));
    assert!(!publisher.calls().iter().any(|p| p.contains("/1.")));
}

#[tokio::test]
async fn test_empty_download_is_never_published() {
    let fetcher = FakeFetcher::default()
        .with_json(LISTING, json!({ "roleList": [rex()] }))
        .with_json(
            "https://api.test/en/character/100",
            json!({ "FormationRoleCard": "/UI/Img/x.png" }),
        )
        .with_bytes("http://x/h.png", b"");
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let (catalog, report) = pipeline.run(&RoleResolver::new(&settings())).await.unwrap();

    assert!(catalog.is_empty());
    assert!(matches!(
        report.skipped[0].reason,
        SkipReason::Fetch {
            error: FetchError::Empty { .. },
            ..
        }
    ));
    assert!(publisher.calls().is_empty());
}

#[tokio::test]
async fn test_failed_download_is_never_published() {
    let fetcher = FakeFetcher::default()
        .with_json(LISTING, json!({ "roleList": [rex()] }))
        .with_json(
            "https://api.test/en/character/100",
            json!({ "FormationRoleCard": "/UI/Img/x.png" }),
        );
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let (catalog, _) = pipeline.run(&RoleResolver::new(&settings())).await.unwrap();

    assert!(catalog.is_empty());
    assert!(publisher.calls().is_empty());
}

#[tokio::test]
async fn test_republish_is_idempotent() {
    let fetcher = rex_fetcher();
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);
    let resolver = RoleResolver::new(&settings());

    let (first, _) = pipeline.run(&resolver).await.unwrap();
    let (second, _) = pipeline.run(&resolver).await.unwrap();

    assert_eq!(first.records(), second.records());
    assert_eq!(publisher.objects.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_process_entity_reports_update() {
    let fetcher = rex_fetcher();
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);
    let resolver = RoleResolver::new(&settings());
    let raw: RawRole = serde_json::from_value(rex()).unwrap();

    assert!(matches!(
        pipeline.process_entity(&resolver, &raw).await,
        EntityOutcome::Included(_)
    ));
    assert!(matches!(
        pipeline.process_entity(&resolver, &raw).await,
        EntityOutcome::Included(_)
    ));
    assert_eq!(publisher.calls().len(), 4);
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let fetcher = FakeFetcher::default();
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let err = pipeline
        .run(&RoleResolver::new(&settings()))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Listing { .. }));
    assert!(publisher.calls().is_empty());
}

#[tokio::test]
async fn test_listing_without_entity_array() {
    let fetcher = FakeFetcher::default().with_json(LISTING, json!({ "error": "maintenance" }));
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let err = pipeline
        .run(&RoleResolver::new(&settings()))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ListingShape { .. }));
}

#[tokio::test]
async fn test_malformed_record_skipped() {
    let fetcher = rex_fetcher().with_json(
        LISTING,
        json!({ "roleList": [{ "Id": "not-a-number" }, rex()] }),
    );
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let (catalog, report) = pipeline.run(&RoleResolver::new(&settings())).await.unwrap();

    assert_eq!(catalog.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].key.is_none());
    assert!(matches!(report.skipped[0].reason, SkipReason::Malformed(_)));
}

#[tokio::test]
async fn test_weapons_independent_of_roles() {
    // No role listing at all, only weapons
    let fetcher = FakeFetcher::default()
        .with_json(
            WEAPONS,
            json!({ "weapons": [
                {
                    "Id": 21010011,
                    "Name": "Training Broadblade",
                    "QualityId": 1,
                    "WeaponType": 1,
                    "Icon": "/Game/Aki/UI/IconWeapon/T_W1.T_W1"
                },
                {
                    "Id": 21019999,
                    "Name": "Broadblade Projection",
                    "QualityId": 1,
                    "WeaponType": 1,
                    "Icon": "/Game/Aki/UI/IconWeapon/T_W2.T_W2"
                }
            ] }),
        )
        .with_bytes("https://api.test/resource/Game/Aki/UI/IconWeapon/T_W1.png", b"w1");
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let mut settings = settings();
    settings.weapons.exclude_names = vec!["Projection".to_string()];

    assert!(pipeline.run(&RoleResolver::new(&settings)).await.is_err());

    let (catalog, report) = pipeline.run(&WeaponResolver::new(&settings)).await.unwrap();
    assert_eq!(report.included, 1);
    assert_eq!(
        catalog.records(),
        &[WeaponRecord {
            id: 21010011,
            name: "Training Broadblade".to_string(),
            rarity: 1,
            weapon_type: 1,
            weapon_icon: "https://raw.githubusercontent.com/octo/assets/main/weapons/21010011.png"
                .to_string(),
        }]
    );
    assert_eq!(publisher.calls(), vec!["weapons/21010011.png"]);
}

#[tokio::test]
async fn test_write_catalog_records_outcome() {
    let temp = TempDir::new().unwrap();
    let fetcher = rex_fetcher();
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let (catalog, mut report) = pipeline.run(&RoleResolver::new(&settings())).await.unwrap();

    let path = temp.path().join("roles.json");
    write_catalog(&catalog, &path, &mut report).await.unwrap();
    assert!(report.output_written);

    let written: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0]["id"], 100);
    assert_eq!(written[0]["element"], 5);

    // Writing under a regular file fails but is not fatal
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "x").unwrap();
    write_catalog(&catalog, &blocker.join("roles.json"), &mut report)
        .await
        .unwrap();
    assert!(!report.output_written);
}

/// Collects span fields filled in after the span was opened
#[derive(Clone, Default)]
struct RecordedFields(Arc<Mutex<Vec<(String, String)>>>);

struct Collect<'a>(&'a mut Vec<(String, String)>);

impl Visit for Collect<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{:?}", value)));
    }
}

impl<S: tracing::Subscriber> Layer<S> for RecordedFields {
    fn on_record(&self, _id: &span::Id, values: &span::Record<'_>, _ctx: Context<'_, S>) {
        values.record(&mut Collect(&mut self.0.lock().unwrap()));
    }
}

#[tokio::test]
async fn test_run_span_carries_run_id() {
    let recorded = RecordedFields::default();
    let _guard = tracing_subscriber::registry()
        .with(recorded.clone())
        .set_default();

    let fetcher = rex_fetcher();
    let publisher = FakePublisher::new();
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let (_, report) = pipeline.run(&RoleResolver::new(&settings())).await.unwrap();

    let fields = recorded.0.lock().unwrap().clone();
    assert!(fields.contains(&("run_id".to_string(), report.run_id.to_string())));
    assert!(fields.contains(&("id".to_string(), "100".to_string())));
}
