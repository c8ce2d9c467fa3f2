//! Integration tests for the migration wizard.
//!
//! Drives the handlers end to end through the in-memory adapters:
//! 1. StartWizard snapshots expired items and locks the list
//! 2. Decisions are recorded one by one or in bulk
//! 3. CompleteWizard applies them; CancelWizard discards them
//! 4. Expiration, rate limiting and mutual exclusion hold across calls

use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use offer_migration::adapters::{
    CatalogOffer, InMemoryEventBus, InMemoryOfferCatalog, InMemoryRateLimiter,
    InMemorySessionStore, InMemoryShoppingLists, ListItem, QueuedEventPublisher,
};
use offer_migration::application::{
    BulkAcceptSuggestionsCommand, BulkAcceptSuggestionsHandler, CancelWizardCommand,
    CancelWizardHandler, CompleteWizardCommand, CompleteWizardHandler, GetSessionHandler,
    GetSessionQuery, RecordDecisionCommand, RecordDecisionHandler, StartWizardCommand,
    StartWizardHandler, WizardServices,
};
use offer_migration::config::WizardConfig;
use offer_migration::domain::foundation::{
    CommandMetadata, ItemId, OfferId, ShoppingListId, StoreId, Timestamp, UserId,
    WizardSessionId,
};
use offer_migration::domain::wizard::{StoreRef, WizardError, WizardSession, WizardStatus};
use offer_migration::ports::{EventPublisher, ShoppingList, WizardSessionStore};

// =============================================================================
// Test Infrastructure
// =============================================================================

const LIST_ID: ShoppingListId = ShoppingListId::new(42);

fn store(id: i64) -> StoreRef {
    StoreRef::new(StoreId::new(id), format!("Store {}", id))
}

fn owner() -> CommandMetadata {
    CommandMetadata::new(UserId::new("shopper-1").unwrap()).with_correlation_id("it-1")
}

/// Three expired items whose cheapest replacements sit in three different
/// stores (milk: 1, bread: 2, eggs: 3); each also has an alternate in one
/// of the other stores.
struct World {
    lists: Arc<InMemoryShoppingLists>,
    sessions: Arc<InMemorySessionStore>,
    events: Arc<InMemoryEventBus>,
    services: WizardServices,
}

impl World {
    async fn new(config: WizardConfig) -> Self {
        let events = Arc::new(InMemoryEventBus::new());
        Self::with_publisher(config, events.clone(), events).await
    }

    async fn with_publisher(
        config: WizardConfig,
        events: Arc<InMemoryEventBus>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let now = Timestamp::now();
        let lists = Arc::new(InMemoryShoppingLists::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let catalog = Arc::new(InMemoryOfferCatalog::new());

        let expired = now.minus_secs(600);
        lists
            .insert_list(
                ShoppingList {
                    id: LIST_ID,
                    owner_id: UserId::new("shopper-1").unwrap(),
                    name: "Groceries".to_string(),
                    is_locked: false,
                    locked_by: None,
                    updated_at: now,
                },
                vec![
                    ListItem::new(ItemId::new(1), "Milk", Decimal::new(149, 2), store(100))
                        .with_offer(OfferId::new(501), expired),
                    ListItem::new(ItemId::new(2), "Bread", Decimal::new(249, 2), store(100))
                        .with_offer(OfferId::new(502), expired),
                    ListItem::new(ItemId::new(3), "Eggs", Decimal::new(299, 2), store(100))
                        .with_offer(OfferId::new(503), expired)
                        .with_quantity(2),
                    ListItem::new(ItemId::new(4), "Rice", Decimal::new(189, 2), store(100))
                        .with_offer(OfferId::new(504), now.plus_secs(86_400)),
                ],
            )
            .await;

        for (id, store_id, name, cents) in [
            (11, 1, "Milk", 129),
            (12, 2, "Whole Milk", 139),
            (21, 2, "Bread", 199),
            (22, 3, "Wheat Bread", 219),
            (31, 3, "Eggs", 279),
            (32, 1, "Free Range Eggs", 310),
        ] {
            catalog
                .add_offer(CatalogOffer {
                    offer_id: OfferId::new(id),
                    store: store(store_id),
                    product_name: name.to_string(),
                    brand: None,
                    price: Decimal::new(cents, 2),
                    size: None,
                    valid_from: now.minus_secs(86_400),
                    valid_until: now.plus_secs(7 * 86_400),
                })
                .await;
        }

        let services = WizardServices {
            sessions: sessions.clone(),
            lists: lists.clone(),
            expired_items: lists.clone(),
            catalog,
            rate_limiter: Arc::new(InMemoryRateLimiter::new()),
            events: publisher,
            config,
        };

        Self {
            lists,
            sessions,
            events,
            services,
        }
    }

    async fn start(&self) -> Result<WizardSession, WizardError> {
        StartWizardHandler::new(self.services.clone())
            .handle(
                StartWizardCommand {
                    list_id: LIST_ID,
                    idempotency_key: None,
                },
                owner(),
            )
            .await
            .map(|r| r.session)
    }

    async fn decide(
        &self,
        session_id: WizardSessionId,
        item: i64,
        action: &str,
        suggestion: Option<OfferId>,
    ) -> WizardSession {
        RecordDecisionHandler::new(self.services.clone())
            .handle(
                RecordDecisionCommand {
                    session_id,
                    item_id: ItemId::new(item),
                    action: action.to_string(),
                    suggestion_id: suggestion,
                    idempotency_key: Some(format!("{}-{}-{}", session_id, item, action)),
                },
                owner(),
            )
            .await
            .unwrap()
            .session
    }

    async fn cancel(&self, session_id: WizardSessionId) -> bool {
        CancelWizardHandler::new(self.services.clone())
            .handle(CancelWizardCommand { session_id }, owner())
            .await
            .unwrap()
    }

    async fn get(&self, session_id: WizardSessionId) -> Result<WizardSession, WizardError> {
        GetSessionHandler::new(self.services.clone())
            .handle(GetSessionQuery { session_id }, owner())
            .await
    }

    async fn is_locked(&self) -> bool {
        self.lists.list(LIST_ID).await.unwrap().is_locked
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn full_migration_of_three_items() {
    let world = World::new(WizardConfig::default()).await;

    let session = world.start().await.unwrap();
    assert_eq!(session.expired_items().len(), 3);
    for item in session.expired_items() {
        assert!(item.suggestions.windows(2).all(|w| w[0].score >= w[1].score));
    }
    assert!(world.is_locked().await);

    let bread_top = session.expired_items()[1].top_suggestion().unwrap().offer_id;
    world.decide(session.id(), 1, "skip", None).await;
    world.decide(session.id(), 2, "replace", Some(bread_top)).await;
    let decided = world.decide(session.id(), 3, "remove", None).await;
    assert_eq!(decided.progress().percent_complete, 100.0);
    assert!(decided.current_item().is_none());

    let done = CompleteWizardHandler::new(world.services.clone())
        .handle(
            CompleteWizardCommand {
                session_id: session.id(),
                idempotency_key: Some("finish".to_string()),
            },
            owner(),
        )
        .await
        .unwrap();

    let summary = done.result.summary;
    assert_eq!(summary.items_migrated, 1);
    assert_eq!(summary.items_skipped, 1);
    assert_eq!(summary.items_removed, 1);
    assert_eq!(summary.stores_used, 1);
    assert!(summary.total_savings > Decimal::ZERO);
    assert!(!world.is_locked().await);

    let items = world.lists.items(LIST_ID).await;
    assert_eq!(
        items.iter().map(|i| i.id.value()).collect::<Vec<_>>(),
        vec![1, 2, 4]
    );
    assert_eq!(items[1].offer_id, Some(bread_top));

    let event_types: Vec<String> = world
        .events
        .events_for_aggregate(&session.id().to_string())
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        event_types,
        vec![
            "wizard.started",
            "wizard.decision_recorded",
            "wizard.decision_recorded",
            "wizard.decision_recorded",
            "wizard.completed",
        ]
    );
}

#[tokio::test]
async fn cancel_leaves_list_untouched() {
    let world = World::new(WizardConfig::default()).await;
    let before = world.lists.items(LIST_ID).await;

    let session = world.start().await.unwrap();
    world.decide(session.id(), 1, "remove", None).await;
    world.decide(session.id(), 2, "skip", None).await;

    assert!(world.cancel(session.id()).await);
    assert!(!world.cancel(session.id()).await);

    let stored = world.get(session.id()).await.unwrap();
    assert_eq!(stored.status(), WizardStatus::Cancelled);
    assert!(stored.decisions().is_empty());
    assert_eq!(world.lists.items(LIST_ID).await, before);
    assert!(!world.is_locked().await);
}

#[tokio::test]
async fn bulk_accept_respects_store_cap() {
    let world = World::new(WizardConfig {
        max_stores: 2,
        ..Default::default()
    })
    .await;
    let session = world.start().await.unwrap();

    let top_stores: HashSet<StoreId> = session
        .expired_items()
        .iter()
        .filter_map(|i| i.top_suggestion())
        .map(|s| s.store.id)
        .collect();
    assert_eq!(top_stores.len(), 3);

    let result = BulkAcceptSuggestionsHandler::new(world.services.clone())
        .handle(
            BulkAcceptSuggestionsCommand {
                session_id: session.id(),
            },
            owner(),
        )
        .await
        .unwrap();

    assert_eq!(result.accepted, 3);
    assert!(result.session.selected_stores().len() <= 2);
    assert_eq!(result.session.progress().completed_items, 3);
}

#[tokio::test]
async fn sixth_start_within_the_hour_is_rate_limited() {
    let world = World::new(WizardConfig::default()).await;

    for _ in 0..5 {
        let session = world.start().await.unwrap();
        world.cancel(session.id()).await;
    }

    let err = world.start().await.unwrap_err();
    assert!(matches!(
        err,
        WizardError::RateLimitExceeded {
            limit: 5,
            window_secs: 3600,
            ..
        }
    ));
    let details = err.details();
    assert_eq!(details.get("limit").map(String::as_str), Some("5"));
    assert!(details.contains_key("retryAfter"));
}

#[tokio::test]
async fn expired_session_frees_the_list() {
    let world = World::new(WizardConfig {
        session_ttl_secs: 1,
        ..Default::default()
    })
    .await;
    let session = world.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let read = world.get(session.id()).await.unwrap();
    assert_eq!(read.status(), WizardStatus::Expired);
    assert!(!world.is_locked().await);
    assert!(world.events.has_event("wizard.expired"));
    let kept = world.sessions.get(session.id()).await.unwrap().unwrap();
    assert_eq!(kept.status(), WizardStatus::Expired);
    assert!(!world.cancel(session.id()).await);

    let restarted = world.start().await.unwrap();
    assert_ne!(restarted.id(), session.id());
}

#[tokio::test]
async fn concurrent_starts_admit_one_wizard() {
    let world = World::new(WizardConfig::default()).await;

    let (a, b) = tokio::join!(world.start(), world.start());

    let (winner, loser) = match (a, b) {
        (Ok(s), Err(e)) | (Err(e), Ok(s)) => (s, e),
        other => panic!("expected exactly one winner, got {:?}", other),
    };
    assert_eq!(
        loser,
        WizardError::ListLocked {
            list_id: LIST_ID,
            locked_by: Some(winner.id()),
        }
    );
    assert_eq!(world.sessions.len().await, 1);
    assert_eq!(
        world.lists.list(LIST_ID).await.unwrap().locked_by,
        Some(winner.id())
    );
}

#[tokio::test]
async fn repeated_decision_changes_nothing() {
    let world = World::new(WizardConfig::default()).await;
    let session = world.start().await.unwrap();

    let once = world.decide(session.id(), 2, "skip", None).await;
    let twice = world.decide(session.id(), 2, "skip", None).await;

    assert_eq!(twice.decisions(), once.decisions());
    assert_eq!(twice.current_item_index(), once.current_item_index());
    assert_eq!(twice.revision(), once.revision());
}

#[tokio::test]
async fn queued_publisher_delivers_every_event() {
    let bus = Arc::new(InMemoryEventBus::new());
    let config = WizardConfig::default();
    let (publisher, worker) = QueuedEventPublisher::spawn(bus.clone(), config.event_queue_capacity);
    let world = World::with_publisher(config, bus.clone(), Arc::new(publisher)).await;

    let session = world.start().await.unwrap();
    world.decide(session.id(), 1, "remove", None).await;
    world.cancel(session.id()).await;
    drop(world);

    let delivered = worker.join().await.unwrap();
    assert_eq!(delivered, 3);
    assert_eq!(bus.event_count(), 3);
    assert!(bus.has_event("wizard.cancelled"));
}
