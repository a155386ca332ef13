// src/services/contact_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    common::{db_utils::StorePolicy, error::AppError},
    db::{ContactStore, PackageStore},
    models::{
        auth::Viewer,
        contact::{Contact, PackageSelection, Profile, RegistrationReceipt, Subscription},
    },
};

fn require_profile(profile: &Profile) -> Result<(), AppError> {
    let address = &profile.address;
    let fields = [
        ("name", &profile.name),
        ("surname", &profile.surname),
        ("shop name", &profile.shop_name),
        ("village/city", &address.village_city),
        ("street", &address.street),
        ("mandal", &address.mandal),
        ("district", &address.district),
        ("state", &address.state),
    ];
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((label, _)) => Err(AppError::Validation(format!("Please enter your {}.", label))),
        None => Ok(()),
    }
}

#[derive(Clone)]
pub struct ContactService {
    contacts: Arc<dyn ContactStore>,
    packages: Arc<dyn PackageStore>,
    store_policy: StorePolicy,
}

impl ContactService {
    pub fn new(
        contacts: Arc<dyn ContactStore>,
        packages: Arc<dyn PackageStore>,
        store_policy: StorePolicy,
    ) -> Self {
        Self { contacts, packages, store_policy }
    }

    pub async fn find_contact(&self, phone_number: &str) -> Result<Option<Contact>, AppError> {
        self.store_policy
            .bounded("find_by_phone", self.contacts.find_by_phone(phone_number))
            .await
    }

    pub async fn me(&self, viewer: &Viewer) -> Result<Contact, AppError> {
        self.find_contact(&viewer.phone_number)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found.".to_string()))
    }

    /// Cada escolha precisa existir; o preço é o da duração no momento do cadastro.
    async fn resolve_selections(
        &self,
        selections: &[PackageSelection],
    ) -> Result<Vec<Subscription>, AppError> {
        if selections.is_empty() {
            return Err(AppError::Validation("Please select at least one package.".to_string()));
        }

        let mut subscriptions = Vec::with_capacity(selections.len());
        for selection in selections {
            let package = self
                .store_policy
                .bounded("find_package", self.packages.find_package(selection.package_id))
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Package {} not found.", selection.package_id))
                })?;

            let duration = package.duration(&selection.duration_id).ok_or_else(|| {
                AppError::NotFound(format!(
                    "Duration {} not found in package '{}'.",
                    selection.duration_id, package.name
                ))
            })?;

            subscriptions.push(Subscription {
                package_id: package.id,
                package_name: package.name.clone(),
                duration: duration.duration.clone(),
                price: duration.price,
            });
        }
        Ok(subscriptions)
    }

    /// Cadastro pelo próprio usuário. Pastas já atribuídas pelo admin são mantidas.
    pub async fn register(
        &self,
        viewer: &Viewer,
        profile: Profile,
        selections: &[PackageSelection],
    ) -> Result<RegistrationReceipt, AppError> {
        require_profile(&profile)?;
        let subscriptions = self.resolve_selections(selections).await?;
        let total_price: Decimal = subscriptions.iter().map(|s| s.price).sum();

        // Chaveado pelo telefone: repetir é seguro
        let (contact, created) = self
            .store_policy
            .retry_idempotent("upsert_registration", || {
                self.contacts
                    .upsert_registration(&viewer.phone_number, &profile, &subscriptions)
            })
            .await?;

        tracing::info!(
            "🧾 Cadastro de {} salvo ({} pacote(s), total {})",
            contact.phone_number,
            contact.subscriptions.len(),
            total_price
        );

        Ok(RegistrationReceipt { contact, total_price, created })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::{
        db::MemoryStore,
        models::package::{Package, PackageDuration},
    };

    const PHONE: &str = "+919876543210";

    fn viewer() -> Viewer {
        Viewer { phone_number: PHONE.into() }
    }

    async fn setup() -> (ContactService, MemoryStore) {
        let store = MemoryStore::new();
        for (id, name, price) in [(1, "Gold", "100.50"), (2, "Silver", "49.50")] {
            store
                .insert_package_if_absent(&Package {
                    id,
                    name: name.into(),
                    durations: vec![PackageDuration {
                        id: "m1".into(),
                        duration: "1 month".into(),
                        price: Decimal::from_str(price).unwrap(),
                    }],
                })
                .await
                .unwrap();
        }
        let service = ContactService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            StorePolicy::default(),
        );
        (service, store)
    }

    fn select(package_id: i64, duration_id: &str) -> PackageSelection {
        PackageSelection { package_id, duration_id: duration_id.into() }
    }

    #[tokio::test]
    async fn registration_totals_the_selected_prices() {
        let (service, _) = setup().await;
        let receipt = service
            .register(&viewer(), Profile::default(), &[select(1, "m1"), select(2, "m1")])
            .await
            .unwrap();

        assert!(receipt.created);
        assert_eq!(receipt.total_price, Decimal::from(150));
        assert_eq!(receipt.contact.subscriptions.len(), 2);
        assert_eq!(receipt.contact.subscriptions[0].package_name, "Gold");
    }

    #[tokio::test]
    async fn registration_keeps_existing_folder_memberships() {
        let (service, store) = setup().await;
        let imported = Contact::imported(PHONE.into(), 7);
        store.add_membership(&imported, 7).await.unwrap();

        let mut profile = Profile::default();
        profile.name = "Ravi".into();
        let receipt = service.register(&viewer(), profile, &[select(1, "m1")]).await.unwrap();

        assert!(!receipt.created);
        assert!(receipt.contact.is_member_of(7));
        assert_eq!(service.me(&viewer()).await.unwrap().profile.name, "Ravi");
    }

    #[tokio::test]
    async fn unknown_selections_are_not_found() {
        let (service, _) = setup().await;
        assert!(matches!(
            service.register(&viewer(), Profile::default(), &[select(9, "m1")]).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.register(&viewer(), Profile::default(), &[select(1, "y1")]).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn registration_requires_every_profile_field_and_a_package() {
        let (service, _) = setup().await;
        let mut profile = Profile::default();
        profile.address.mandal = " ".into();
        assert!(matches!(
            service.register(&viewer(), profile, &[select(1, "m1")]).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.register(&viewer(), Profile::default(), &[]).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn me_is_not_found_before_registration() {
        let (service, _) = setup().await;
        assert!(matches!(service.me(&viewer()).await, Err(AppError::NotFound(_))));
    }
}
