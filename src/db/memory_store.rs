// src/db/memory_store.rs
//
// Armazenamento em memória (STORE_BACKEND=memory e testes).
// Mesma semântica do Postgres, incluindo as escritas condicionais.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{ContactStore, FolderStore, PackageStore, PostStore},
    models::{
        contact::{Contact, MembershipOutcome, Profile, Subscription},
        folder::Folder,
        package::{Package, PackageDuration},
        post::{NewPost, Post, PostQuery, PostUpdate},
    },
};

#[derive(Default)]
struct MemoryData {
    folders: BTreeMap<i64, Folder>,
    folder_watermark: i64,
    contacts: HashMap<Uuid, Contact>,
    packages: BTreeMap<i64, Package>,
    package_watermark: i64,
    posts: Vec<Post>,
}

#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
    post_events: broadcast::Sender<()>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (post_events, _) = broadcast::channel(64);
        Self {
            data: Arc::new(RwLock::new(MemoryData::default())),
            post_events,
        }
    }

    fn notify_posts(&self) {
        // Sem assinantes não é erro
        let _ = self.post_events.send(());
    }

    // Insere um post com timestamp fixo (testes de filtro por data)
    #[cfg(test)]
    pub async fn seed_post(&self, post: Post) {
        self.data.write().await.posts.push(post);
        self.notify_posts();
    }

    #[cfg(test)]
    pub async fn contact_count(&self) -> usize {
        self.data.read().await.contacts.len()
    }
}

fn sorted_newest_first(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    posts
}

#[async_trait]
impl FolderStore for MemoryStore {
    async fn list_folders(&self) -> Result<Vec<Folder>, AppError> {
        Ok(self.data.read().await.folders.values().cloned().collect())
    }

    async fn find_folder(&self, id: i64) -> Result<Option<Folder>, AppError> {
        Ok(self.data.read().await.folders.get(&id).cloned())
    }

    async fn next_folder_id(&self) -> Result<i64, AppError> {
        let data = self.data.read().await;
        let max_existing = data.folders.keys().next_back().copied().unwrap_or(0);
        Ok(max_existing.max(data.folder_watermark) + 1)
    }

    async fn insert_folder_if_absent(&self, folder: &Folder) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        if data.folders.contains_key(&folder.id) {
            return Ok(false);
        }
        data.folders.insert(folder.id, folder.clone());
        data.folder_watermark = data.folder_watermark.max(folder.id);
        Ok(true)
    }

    async fn rename_folder(&self, id: i64, name: &str) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        Ok(match data.folders.get_mut(&id) {
            Some(folder) => {
                folder.name = name.to_string();
                true
            }
            None => false,
        })
    }

    async fn delete_folder(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.data.write().await.folders.remove(&id).is_some())
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Contact>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .contacts
            .values()
            .find(|c| c.phone_number == phone_number)
            .cloned())
    }

    async fn list_members(&self, folder_id: i64) -> Result<Vec<Contact>, AppError> {
        let data = self.data.read().await;
        let mut members: Vec<Contact> = data
            .contacts
            .values()
            .filter(|c| c.is_member_of(folder_id))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.phone_number.cmp(&b.phone_number));
        Ok(members)
    }

    async fn count_members(&self, folder_id: i64) -> Result<u64, AppError> {
        let data = self.data.read().await;
        Ok(data.contacts.values().filter(|c| c.is_member_of(folder_id)).count() as u64)
    }

    async fn add_membership(
        &self,
        candidate: &Contact,
        folder_id: i64,
    ) -> Result<MembershipOutcome, AppError> {
        // O write lock cobre a busca e a escrita: create-if-absent de verdade
        let mut data = self.data.write().await;
        let existing = data
            .contacts
            .values_mut()
            .find(|c| c.phone_number == candidate.phone_number);

        match existing {
            Some(contact) if contact.is_member_of(folder_id) => Ok(MembershipOutcome::AlreadyMember),
            Some(contact) => {
                contact.packages.insert(folder_id, String::new());
                Ok(MembershipOutcome::Linked)
            }
            None => {
                let mut contact = candidate.clone();
                contact.packages.entry(folder_id).or_default();
                data.contacts.insert(contact.userid, contact);
                Ok(MembershipOutcome::Created)
            }
        }
    }

    async fn delete_contact(&self, userid: Uuid) -> Result<bool, AppError> {
        Ok(self.data.write().await.contacts.remove(&userid).is_some())
    }

    async fn upsert_registration(
        &self,
        phone_number: &str,
        profile: &Profile,
        subscriptions: &[Subscription],
    ) -> Result<(Contact, bool), AppError> {
        let mut data = self.data.write().await;
        if let Some(contact) = data
            .contacts
            .values_mut()
            .find(|c| c.phone_number == phone_number)
        {
            contact.profile = profile.clone();
            contact.subscriptions = subscriptions.to_vec();
            return Ok((contact.clone(), false));
        }

        let contact = Contact {
            userid: Uuid::new_v4(),
            phone_number: phone_number.to_string(),
            packages: BTreeMap::new(),
            profile: profile.clone(),
            subscriptions: subscriptions.to_vec(),
        };
        data.contacts.insert(contact.userid, contact.clone());
        Ok((contact, true))
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, AppError> {
        let data = self.data.read().await;
        let posts = data
            .posts
            .iter()
            .filter(|post| match query {
                PostQuery::All => true,
                PostQuery::AnyOfFolders(folders) => {
                    post.packages.iter().any(|id| folders.contains(id))
                }
            })
            .cloned()
            .collect();
        Ok(sorted_newest_first(posts))
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        Ok(self.data.read().await.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post, AppError> {
        let stored = Post {
            id: Uuid::new_v4(),
            category: post.category.to_string(),
            description: post.description.clone(),
            timestamp: Utc::now(),
            files: post.files.clone(),
            hyperlink: post.hyperlink.clone(),
            packages: post.packages.clone(),
            posted_by: post.posted_by.clone(),
        };
        self.data.write().await.posts.push(stored.clone());
        self.notify_posts();
        Ok(stored)
    }

    async fn update_post(&self, id: Uuid, update: &PostUpdate) -> Result<Option<Post>, AppError> {
        let updated = {
            let mut data = self.data.write().await;
            data.posts.iter_mut().find(|p| p.id == id).map(|post| {
                post.category = update.category.to_string();
                post.description = update.description.clone();
                post.files = update.files.clone();
                post.hyperlink = update.hyperlink.clone();
                post.packages = update.packages.clone();
                post.clone()
            })
        };
        if updated.is_some() {
            self.notify_posts();
        }
        Ok(updated)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, AppError> {
        let removed = {
            let mut data = self.data.write().await;
            let before = data.posts.len();
            data.posts.retain(|p| p.id != id);
            data.posts.len() != before
        };
        if removed {
            self.notify_posts();
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.post_events.subscribe()
    }
}

#[async_trait]
impl PackageStore for MemoryStore {
    async fn list_packages(&self) -> Result<Vec<Package>, AppError> {
        Ok(self.data.read().await.packages.values().cloned().collect())
    }

    async fn find_package(&self, id: i64) -> Result<Option<Package>, AppError> {
        Ok(self.data.read().await.packages.get(&id).cloned())
    }

    async fn next_package_id(&self) -> Result<i64, AppError> {
        let data = self.data.read().await;
        let max_existing = data.packages.keys().next_back().copied().unwrap_or(0);
        Ok(max_existing.max(data.package_watermark) + 1)
    }

    async fn insert_package_if_absent(&self, package: &Package) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        if data.packages.contains_key(&package.id) {
            return Ok(false);
        }
        data.packages.insert(package.id, package.clone());
        data.package_watermark = data.package_watermark.max(package.id);
        Ok(true)
    }

    async fn rename_package(&self, id: i64, name: &str) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        Ok(match data.packages.get_mut(&id) {
            Some(package) => {
                package.name = name.to_string();
                true
            }
            None => false,
        })
    }

    async fn replace_durations(
        &self,
        id: i64,
        durations: &[PackageDuration],
    ) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        Ok(match data.packages.get_mut(&id) {
            Some(package) => {
                package.durations = durations.to_vec();
                true
            }
            None => false,
        })
    }

    async fn delete_package(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.data.write().await.packages.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::PostCategory;

    #[tokio::test]
    async fn folder_ids_are_not_reused_after_deleting_the_highest() {
        let store = MemoryStore::new();
        for name in ["a", "b"] {
            let id = store.next_folder_id().await.unwrap();
            assert!(store
                .insert_folder_if_absent(&Folder { id, name: name.into() })
                .await
                .unwrap());
        }
        assert!(store.delete_folder(2).await.unwrap());
        assert_eq!(store.next_folder_id().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn conditional_insert_refuses_taken_ids() {
        let store = MemoryStore::new();
        let folder = Folder { id: 1, name: "a".into() };
        assert!(store.insert_folder_if_absent(&folder).await.unwrap());
        assert!(!store.insert_folder_if_absent(&folder).await.unwrap());
    }

    #[tokio::test]
    async fn add_membership_creates_links_and_skips() {
        let store = MemoryStore::new();
        let candidate = Contact::imported("+919876543210".into(), 1);

        assert_eq!(
            store.add_membership(&candidate, 1).await.unwrap(),
            MembershipOutcome::Created
        );
        assert_eq!(
            store.add_membership(&candidate, 1).await.unwrap(),
            MembershipOutcome::AlreadyMember
        );
        let other = Contact::imported("+919876543210".into(), 2);
        assert_eq!(
            store.add_membership(&other, 2).await.unwrap(),
            MembershipOutcome::Linked
        );
        assert_eq!(store.contact_count().await, 1);
    }

    #[tokio::test]
    async fn registration_preserves_folder_memberships() {
        let store = MemoryStore::new();
        let candidate = Contact::imported("+919876543210".into(), 3);
        store.add_membership(&candidate, 3).await.unwrap();

        let (contact, created) = store
            .upsert_registration("+919876543210", &Profile::default(), &[])
            .await
            .unwrap();
        assert!(!created);
        assert!(contact.is_member_of(3));
    }

    #[tokio::test]
    async fn post_mutations_notify_subscribers() {
        let store = MemoryStore::new();
        let mut events = store.subscribe();
        store
            .insert_post(&NewPost {
                category: PostCategory::News,
                description: "hello".into(),
                files: vec![],
                hyperlink: String::new(),
                packages: vec![1],
                posted_by: None,
            })
            .await
            .unwrap();
        assert!(events.recv().await.is_ok());
    }
}
