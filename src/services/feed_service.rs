// src/services/feed_service.rs

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tokio::sync::{broadcast, watch};

use crate::{
    common::{db_utils::StorePolicy, error::AppError},
    db::{ContactStore, PostStore},
    models::{
        auth::Viewer,
        post::{FeedBuckets, FeedFilter, Post, PostQuery},
    },
    services::authorization::AuthorizationPolicy,
};

// ---
// Intervalo de datas (inclusivo nas duas pontas)
// ---

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateRange {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

fn invalid_range() -> AppError {
    AppError::Validation("Please choose a valid date range.".to_string())
}

fn local_to_utc(naive: NaiveDateTime, offset: FixedOffset) -> Result<DateTime<Utc>, AppError> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid_range)
}

impl DateRange {
    /// `from` começa à 00:00 e `to` vai até 23:59:59.999 do dia, no fuso `offset`.
    pub fn from_dates(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        offset: FixedOffset,
    ) -> Result<Self, AppError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::Validation(
                    "The start date must not be after the end date.".to_string(),
                ));
            }
        }

        let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).ok_or_else(invalid_range)?;

        Ok(Self {
            from: from
                .map(|d| local_to_utc(d.and_time(NaiveTime::MIN), offset))
                .transpose()?,
            to: to
                .map(|d| local_to_utc(d.and_time(end_of_day), offset))
                .transpose()?,
        })
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| timestamp >= from) && self.to.is_none_or(|to| timestamp <= to)
    }
}

// ---
// Funções puras do feed
// ---

/// Distribui os posts nos três baldes, do mais novo para o mais antigo.
/// Categoria desconhecida é descartada (com aviso), nunca vira erro.
pub fn categorize(mut posts: Vec<Post>, range: &DateRange) -> FeedBuckets {
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut buckets = FeedBuckets::default();
    for post in posts {
        if !range.contains(post.timestamp) {
            continue;
        }
        match post.parsed_category() {
            Ok(category) => buckets.bucket_mut(category).push(post),
            Err(unknown) => {
                tracing::warn!("⚠️ Post {} com categoria desconhecida '{}' descartado", post.id, unknown);
            }
        }
    }
    buckets
}

/// Busca por substring na descrição, sem diferenciar maiúsculas.
pub fn apply_text_filter(mut buckets: FeedBuckets, query: &str) -> FeedBuckets {
    if query.is_empty() {
        return buckets;
    }

    let needle = query.to_lowercase();
    for bucket in [
        &mut buckets.latest_updates,
        &mut buckets.news,
        &mut buckets.advertisements,
    ] {
        bucket.retain(|post| post.description.to_lowercase().contains(&needle));
    }
    buckets
}

// ---
// Serviço
// ---

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostStore>,
    contacts: Arc<dyn ContactStore>,
    authorization: Arc<dyn AuthorizationPolicy>,
    offset: FixedOffset,
    store_policy: StorePolicy,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        contacts: Arc<dyn ContactStore>,
        authorization: Arc<dyn AuthorizationPolicy>,
        offset: FixedOffset,
        store_policy: StorePolicy,
    ) -> Self {
        Self { posts, contacts, authorization, offset, store_policy }
    }

    /// `None` = o visitante não enxerga nada (sem pastas). Não é erro.
    pub async fn resolve_visibility(&self, viewer: &Viewer) -> Result<Option<PostQuery>, AppError> {
        if self.authorization.is_admin(&viewer.phone_number) {
            return Ok(Some(PostQuery::All));
        }

        let contact = self
            .store_policy
            .bounded("find_by_phone", self.contacts.find_by_phone(&viewer.phone_number))
            .await?;

        let folders = contact.map(|c| c.folder_ids()).unwrap_or_default();
        if folders.is_empty() {
            tracing::warn!("⚠️ {} não pertence a nenhuma pasta: feed vazio", viewer.phone_number);
            return Ok(None);
        }

        Ok(Some(PostQuery::AnyOfFolders(folders)))
    }

    pub async fn fetch_and_categorize(
        &self,
        visibility: &PostQuery,
        range: &DateRange,
    ) -> Result<FeedBuckets, AppError> {
        let posts = self
            .store_policy
            .bounded("list_posts", self.posts.list_posts(visibility))
            .await?;
        Ok(categorize(posts, range))
    }

    pub async fn snapshot(&self, viewer: &Viewer, filter: &FeedFilter) -> Result<FeedBuckets, AppError> {
        let range = DateRange::from_dates(filter.from, filter.to, self.offset)?;

        let Some(visibility) = self.resolve_visibility(viewer).await? else {
            return Ok(FeedBuckets::default());
        };

        let buckets = self.fetch_and_categorize(&visibility, &range).await?;
        let buckets = apply_text_filter(buckets, filter.q.as_deref().unwrap_or_default());
        if buckets.is_empty() {
            tracing::debug!("nenhum post para {} com os filtros atuais", viewer.phone_number);
        }
        Ok(buckets)
    }

    /// Assinatura contínua: a cada mudança em `posts` o feed inteiro é
    /// recalculado e substituído de uma vez no `watch`. A tarefa termina
    /// quando o último receiver é descartado.
    pub async fn subscribe(
        &self,
        viewer: Viewer,
        filter: FeedFilter,
    ) -> Result<watch::Receiver<FeedBuckets>, AppError> {
        // Assina antes do primeiro cálculo para não perder mudanças no meio
        let mut changes = self.posts.subscribe();
        let initial = self.snapshot(&viewer, &filter).await?;
        let (tx, rx) = watch::channel(initial);

        let service = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    event = changes.recv() => match event {
                        Ok(()) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!("feed de {} pulou {} avisos", viewer.phone_number, skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }

                // Uma rajada de avisos vira um único recálculo
                while matches!(
                    changes.try_recv(),
                    Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_))
                ) {}

                match service.snapshot(&viewer, &filter).await {
                    Ok(buckets) => {
                        tracing::debug!("feed de {} recalculado: {} post(s)", viewer.phone_number, buckets.len());
                        tx.send_replace(buckets);
                    }
                    Err(e) => {
                        // Mantém o último feed bom; o próximo aviso tenta de novo
                        tracing::error!("🔥 Falha ao recalcular o feed de {}: {}", viewer.phone_number, e);
                    }
                }
            }
            tracing::debug!("assinatura de feed de {} encerrada", viewer.phone_number);
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::{
        db::MemoryStore,
        models::{
            contact::Contact,
            post::{NewPost, PostCategory},
        },
        services::authorization::AllowListPolicy,
    };

    const ADMIN: &str = "+919999999999";
    const MEMBER: &str = "+919876543210";

    fn at(raw: &str) -> DateTime<Utc> {
        raw.parse().unwrap()
    }

    fn post(category: &str, timestamp: &str, packages: Vec<i64>, description: &str) -> Post {
        Post {
            id: Uuid::new_v4(),
            category: category.to_string(),
            description: description.to_string(),
            timestamp: at(timestamp),
            files: vec![],
            hyperlink: String::new(),
            packages,
            posted_by: None,
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn service(store: &MemoryStore, offset: FixedOffset) -> FeedService {
        FeedService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(AllowListPolicy::new([ADMIN])),
            offset,
            StorePolicy::default(),
        )
    }

    fn viewer(phone: &str) -> Viewer {
        Viewer { phone_number: phone.to_string() }
    }

    async fn member_of(store: &MemoryStore, phone: &str, folders: &[i64]) {
        for &folder in folders {
            let candidate = Contact::imported(phone.to_string(), folder);
            store.add_membership(&candidate, folder).await.unwrap();
        }
    }

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn every_known_post_lands_in_exactly_one_bucket_newest_first() {
        let posts = vec![
            post("news", "2025-03-01T10:00:00Z", vec![1], "old news"),
            post("latest_updates", "2025-03-02T10:00:00Z", vec![1], "update"),
            post("news", "2025-03-03T10:00:00Z", vec![1], "fresh news"),
            post("advertisement", "2025-03-04T10:00:00Z", vec![1], ""),
        ];

        let buckets = categorize(posts, &DateRange::default());

        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets.news.len(), 2);
        assert_eq!(buckets.news[0].description, "fresh news");
        assert_eq!(buckets.latest_updates.len(), 1);
        assert_eq!(buckets.advertisements.len(), 1);
    }

    #[test]
    fn unknown_categories_are_dropped() {
        let posts = vec![
            post("promo", "2025-03-01T10:00:00Z", vec![1], "legacy"),
            post("news", "2025-03-01T11:00:00Z", vec![1], "ok"),
        ];
        let buckets = categorize(posts, &DateRange::default());
        assert_eq!(buckets.len(), 1);
    }

    #[test]
    fn end_date_includes_the_last_millisecond_of_the_day() {
        let range = DateRange::from_dates(Some(date("2025-03-10")), Some(date("2025-03-10")), utc()).unwrap();

        assert!(range.contains(at("2025-03-10T00:00:00Z")));
        assert!(range.contains(at("2025-03-10T23:59:59.999Z")));
        assert!(!range.contains(at("2025-03-11T00:00:00Z")));
        assert!(!range.contains(at("2025-03-09T23:59:59.999Z")));
    }

    #[test]
    fn day_boundaries_follow_the_configured_offset() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let range = DateRange::from_dates(None, Some(date("2025-03-10")), ist).unwrap();

        assert!(range.contains(at("2025-03-10T18:29:59.999Z")));
        assert!(!range.contains(at("2025-03-10T18:30:00Z")));
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let result = DateRange::from_dates(Some(date("2025-03-11")), Some(date("2025-03-10")), utc());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn text_filter_is_case_insensitive_and_empty_is_identity() {
        let buckets = categorize(
            vec![
                post("news", "2025-03-01T10:00:00Z", vec![1], "Big SALE today"),
                post("news", "2025-03-02T10:00:00Z", vec![1], "Weather"),
            ],
            &DateRange::default(),
        );

        assert_eq!(apply_text_filter(buckets.clone(), ""), buckets);

        let filtered = apply_text_filter(buckets, "sale");
        assert_eq!(filtered.news.len(), 1);
        assert_eq!(filtered.news[0].description, "Big SALE today");
    }

    #[tokio::test]
    async fn admin_sees_every_post() {
        let store = MemoryStore::new();
        store.seed_post(post("news", "2025-03-01T10:00:00Z", vec![1], "a")).await;
        store.seed_post(post("news", "2025-03-02T10:00:00Z", vec![2], "b")).await;

        let feed = service(&store, utc())
            .snapshot(&viewer(ADMIN), &FeedFilter::default())
            .await
            .unwrap();

        assert_eq!(feed.news.len(), 2);
        assert_eq!(feed.news[0].description, "b");
    }

    #[tokio::test]
    async fn members_only_see_posts_targeting_their_folders() {
        let store = MemoryStore::new();
        member_of(&store, MEMBER, &[1, 3]).await;
        store.seed_post(post("news", "2025-03-01T10:00:00Z", vec![1, 2], "mine")).await;
        store.seed_post(post("news", "2025-03-02T10:00:00Z", vec![2], "not mine")).await;
        store.seed_post(post("advertisement", "2025-03-03T10:00:00Z", vec![3], "ad")).await;

        let feed = service(&store, utc())
            .snapshot(&viewer(MEMBER), &FeedFilter::default())
            .await
            .unwrap();

        assert_eq!(feed.news.len(), 1);
        assert_eq!(feed.news[0].description, "mine");
        assert_eq!(feed.advertisements.len(), 1);
    }

    #[tokio::test]
    async fn viewers_without_folders_get_an_empty_feed() {
        let store = MemoryStore::new();
        store.seed_post(post("news", "2025-03-01T10:00:00Z", vec![1], "a")).await;
        let service = service(&store, utc());

        assert_eq!(service.resolve_visibility(&viewer(MEMBER)).await.unwrap(), None);
        let feed = service.snapshot(&viewer(MEMBER), &FeedFilter::default()).await.unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn snapshot_applies_dates_and_text_together() {
        let store = MemoryStore::new();
        store.seed_post(post("news", "2025-03-10T23:59:59.999Z", vec![1], "Promo late")).await;
        store.seed_post(post("news", "2025-03-11T00:00:00Z", vec![1], "promo next day")).await;
        store.seed_post(post("news", "2025-03-10T08:00:00Z", vec![1], "other")).await;

        let filter = FeedFilter {
            from: Some(date("2025-03-10")),
            to: Some(date("2025-03-10")),
            q: Some("PROMO".into()),
        };
        let feed = service(&store, utc()).snapshot(&viewer(ADMIN), &filter).await.unwrap();

        assert_eq!(feed.len(), 1);
        assert_eq!(feed.news[0].description, "Promo late");
    }

    #[tokio::test]
    async fn subscription_replaces_the_feed_on_every_change() {
        let store = MemoryStore::new();
        let service = service(&store, utc());
        let mut feed = service
            .subscribe(viewer(ADMIN), FeedFilter::default())
            .await
            .unwrap();
        assert!(feed.borrow().is_empty());

        store
            .insert_post(&NewPost {
                category: PostCategory::LatestUpdates,
                description: "new arrival".into(),
                files: vec![],
                hyperlink: String::new(),
                packages: vec![1],
                posted_by: Some(ADMIN.into()),
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), feed.changed())
            .await
            .unwrap()
            .unwrap();
        let current = feed.borrow_and_update().clone();
        assert_eq!(current.latest_updates.len(), 1);
        assert_eq!(current.latest_updates[0].description, "new arrival");
    }
}
