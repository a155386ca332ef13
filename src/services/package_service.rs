// src/services/package_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{db_utils::StorePolicy, error::AppError},
    db::PackageStore,
    models::package::{Package, PackageDuration},
};

#[derive(Debug, Clone)]
pub struct DurationDraft {
    pub duration: String,
    pub price: Decimal,
}

fn validated_duration(id: String, draft: &DurationDraft) -> Result<PackageDuration, AppError> {
    let label = draft.duration.trim();
    if label.is_empty() {
        return Err(AppError::Validation("Please enter a duration.".to_string()));
    }
    if draft.price <= Decimal::ZERO {
        return Err(AppError::Validation("Price must be greater than zero.".to_string()));
    }
    Ok(PackageDuration {
        id,
        duration: label.to_string(),
        price: draft.price,
    })
}

fn required_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Please enter a package name.".to_string()));
    }
    Ok(name.to_string())
}

fn package_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Package {} not found.", id))
}

#[derive(Clone)]
pub struct PackageService {
    packages: Arc<dyn PackageStore>,
    store_policy: StorePolicy,
}

impl PackageService {
    pub fn new(packages: Arc<dyn PackageStore>, store_policy: StorePolicy) -> Self {
        Self { packages, store_policy }
    }

    pub async fn list_packages(&self) -> Result<Vec<Package>, AppError> {
        self.store_policy
            .bounded("list_packages", self.packages.list_packages())
            .await
    }

    pub async fn get_package(&self, id: i64) -> Result<Package, AppError> {
        self.store_policy
            .bounded("find_package", self.packages.find_package(id))
            .await?
            .ok_or_else(|| package_not_found(id))
    }

    pub async fn create_package(&self, name: &str, durations: &[DurationDraft]) -> Result<Package, AppError> {
        let name = required_name(name)?;
        if durations.is_empty() {
            return Err(AppError::Validation("Please add at least one duration.".to_string()));
        }
        let durations = durations
            .iter()
            .map(|d| validated_duration(Uuid::new_v4().to_string(), d))
            .collect::<Result<Vec<_>, _>>()?;

        let id = self
            .store_policy
            .bounded("next_package_id", self.packages.next_package_id())
            .await?;
        let package = Package { id, name, durations };

        let inserted = self
            .store_policy
            .bounded("insert_package", self.packages.insert_package_if_absent(&package))
            .await?;
        if !inserted {
            return Err(AppError::Conflict(format!(
                "Package id {} was taken by another request. Please try again.",
                id
            )));
        }

        tracing::info!("📦 Pacote '{}' criado com id {}", package.name, package.id);
        Ok(package)
    }

    pub async fn rename_package(&self, id: i64, name: &str) -> Result<Package, AppError> {
        let name = required_name(name)?;
        let renamed = self
            .store_policy
            .retry_idempotent("rename_package", || self.packages.rename_package(id, &name))
            .await?;
        if !renamed {
            return Err(package_not_found(id));
        }
        self.get_package(id).await
    }

    pub async fn delete_package(&self, id: i64) -> Result<(), AppError> {
        let deleted = self
            .store_policy
            .bounded("delete_package", self.packages.delete_package(id))
            .await?;
        if !deleted {
            return Err(package_not_found(id));
        }
        tracing::info!("🗑️ Pacote {} apagado", id);
        Ok(())
    }

    // ---
    // Durações: lê o pacote, altera a lista e grava a lista inteira
    // ---

    async fn save_durations(&self, mut package: Package, durations: Vec<PackageDuration>) -> Result<Package, AppError> {
        let id = package.id;
        let saved = self
            .store_policy
            .retry_idempotent("replace_durations", || self.packages.replace_durations(id, &durations))
            .await?;
        if !saved {
            return Err(package_not_found(id));
        }
        package.durations = durations;
        Ok(package)
    }

    pub async fn add_duration(&self, package_id: i64, draft: &DurationDraft) -> Result<Package, AppError> {
        let duration = validated_duration(Uuid::new_v4().to_string(), draft)?;
        let package = self.get_package(package_id).await?;

        let mut durations = package.durations.clone();
        durations.push(duration);
        self.save_durations(package, durations).await
    }

    pub async fn update_duration(
        &self,
        package_id: i64,
        duration_id: &str,
        draft: &DurationDraft,
    ) -> Result<Package, AppError> {
        let updated = validated_duration(duration_id.to_string(), draft)?;
        let package = self.get_package(package_id).await?;

        let mut durations = package.durations.clone();
        let slot = durations
            .iter_mut()
            .find(|d| d.id == duration_id)
            .ok_or_else(|| AppError::NotFound(format!("Duration {} not found.", duration_id)))?;
        *slot = updated;
        self.save_durations(package, durations).await
    }

    pub async fn delete_duration(&self, package_id: i64, duration_id: &str) -> Result<Package, AppError> {
        let package = self.get_package(package_id).await?;
        if package.duration(duration_id).is_none() {
            return Err(AppError::NotFound(format!("Duration {} not found.", duration_id)));
        }

        let durations = package
            .durations
            .iter()
            .filter(|d| d.id != duration_id)
            .cloned()
            .collect();
        self.save_durations(package, durations).await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use async_trait::async_trait;

    use super::*;
    use crate::db::MemoryStore;

    // Devolve sempre o mesmo id, como se outra criação tivesse chegado antes
    struct StaleIds {
        inner: MemoryStore,
        stale_id: i64,
    }

    #[async_trait]
    impl PackageStore for StaleIds {
        async fn list_packages(&self) -> Result<Vec<Package>, AppError> {
            self.inner.list_packages().await
        }
        async fn find_package(&self, id: i64) -> Result<Option<Package>, AppError> {
            self.inner.find_package(id).await
        }
        async fn next_package_id(&self) -> Result<i64, AppError> {
            Ok(self.stale_id)
        }
        async fn insert_package_if_absent(&self, package: &Package) -> Result<bool, AppError> {
            self.inner.insert_package_if_absent(package).await
        }
        async fn rename_package(&self, id: i64, name: &str) -> Result<bool, AppError> {
            self.inner.rename_package(id, name).await
        }
        async fn replace_durations(
            &self,
            id: i64,
            durations: &[PackageDuration],
        ) -> Result<bool, AppError> {
            self.inner.replace_durations(id, durations).await
        }
        async fn delete_package(&self, id: i64) -> Result<bool, AppError> {
            self.inner.delete_package(id).await
        }
    }

    fn service() -> PackageService {
        PackageService::new(Arc::new(MemoryStore::new()), StorePolicy::default())
    }

    fn draft(label: &str, price: &str) -> DurationDraft {
        DurationDraft {
            duration: label.to_string(),
            price: Decimal::from_str(price).unwrap(),
        }
    }

    #[tokio::test]
    async fn create_package_validates_name_and_durations() {
        let service = service();
        assert!(matches!(
            service.create_package("", &[draft("1 month", "99")]).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create_package("Gold", &[]).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create_package("Gold", &[draft("1 month", "0")]).await,
            Err(AppError::Validation(_))
        ));

        let package = service.create_package("Gold", &[draft(" 1 month ", "99.50")]).await.unwrap();
        assert_eq!(package.id, 1);
        assert_eq!(package.durations[0].duration, "1 month");
    }

    #[tokio::test]
    async fn create_package_reports_conflict_when_the_id_is_taken() {
        let store = MemoryStore::new();
        let first = PackageService::new(Arc::new(store.clone()), StorePolicy::default())
            .create_package("Gold", &[draft("1 month", "99")])
            .await
            .unwrap();

        let service = PackageService::new(
            Arc::new(StaleIds { inner: store.clone(), stale_id: first.id }),
            StorePolicy::default(),
        );
        assert!(matches!(
            service.create_package("Silver", &[draft("1 month", "49")]).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(store.list_packages().await.unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn durations_can_be_added_updated_and_removed() {
        let service = service();
        let package = service.create_package("Gold", &[draft("1 month", "99")]).await.unwrap();

        let package = service.add_duration(package.id, &draft("1 year", "999")).await.unwrap();
        assert_eq!(package.durations.len(), 2);

        let yearly = package.durations[1].id.clone();
        let package = service
            .update_duration(package.id, &yearly, &draft("12 months", "899"))
            .await
            .unwrap();
        assert_eq!(package.duration(&yearly).map(|d| d.duration.as_str()), Some("12 months"));

        let package = service.delete_duration(package.id, &yearly).await.unwrap();
        assert_eq!(package.durations.len(), 1);
        assert_eq!(service.get_package(package.id).await.unwrap(), package);
    }

    #[tokio::test]
    async fn unknown_packages_and_durations_are_not_found() {
        let service = service();
        assert!(matches!(service.delete_package(3).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            service.rename_package(3, "x").await,
            Err(AppError::NotFound(_))
        ));

        let package = service.create_package("Gold", &[draft("1 month", "99")]).await.unwrap();
        assert!(matches!(
            service.delete_duration(package.id, "nope").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.update_duration(package.id, "nope", &draft("x", "1")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn package_ids_are_not_reused() {
        let service = service();
        let a = service.create_package("A", &[draft("1 month", "1")]).await.unwrap();
        service.delete_package(a.id).await.unwrap();
        let b = service.create_package("B", &[draft("1 month", "1")]).await.unwrap();
        assert_eq!(b.id, a.id + 1);
    }
}
