// src/services/folder_service.rs

use std::{collections::HashSet, sync::Arc};

use futures::{stream, StreamExt};

use crate::{
    common::{
        db_utils::StorePolicy,
        error::{ApiError, AppError},
        phone::PhoneNormalizer,
    },
    db::{ContactStore, FolderStore},
    models::{
        contact::{Contact, MembershipOutcome},
        folder::{Folder, FolderCount, FolderSummary, ImportFailure, ImportReport},
    },
};

#[derive(Debug, Clone, Copy)]
pub struct ImportLimits {
    /// Máximo de números aceitos por lote.
    pub max_batch: usize,
    /// Quantos números são gravados em paralelo.
    pub concurrency: usize,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self { max_batch: 500, concurrency: 16 }
    }
}

// Gerencia pastas e o vínculo contato <-> pasta
#[derive(Clone)]
pub struct FolderService {
    folders: Arc<dyn FolderStore>,
    contacts: Arc<dyn ContactStore>,
    phones: PhoneNormalizer,
    store_policy: StorePolicy,
    limits: ImportLimits,
}

fn required_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Please enter a folder name.".to_string()));
    }
    Ok(name.to_string())
}

fn folder_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Folder {} not found.", id))
}

impl FolderService {
    pub fn new(
        folders: Arc<dyn FolderStore>,
        contacts: Arc<dyn ContactStore>,
        phones: PhoneNormalizer,
        store_policy: StorePolicy,
        limits: ImportLimits,
    ) -> Self {
        Self { folders, contacts, phones, store_policy, limits }
    }

    // =========================================================================
    //  1. CICLO DE VIDA DAS PASTAS
    // =========================================================================

    pub async fn list_folders(&self) -> Result<Vec<Folder>, AppError> {
        self.store_policy
            .bounded("list_folders", self.folders.list_folders())
            .await
    }

    pub async fn create_folder(&self, name: &str) -> Result<Folder, AppError> {
        let name = required_name(name)?;

        let id = self
            .store_policy
            .bounded("next_folder_id", self.folders.next_folder_id())
            .await?;
        let folder = Folder { id, name };

        // Sem retry: é uma sequência create-if-absent
        let inserted = self
            .store_policy
            .bounded("insert_folder", self.folders.insert_folder_if_absent(&folder))
            .await?;

        if !inserted {
            tracing::warn!("⚠️ Id de pasta {} já foi ocupado por outra criação", id);
            return Err(AppError::Conflict(format!(
                "Folder id {} was taken by another request. Please try again.",
                id
            )));
        }

        tracing::info!("📁 Pasta '{}' criada com id {}", folder.name, folder.id);
        Ok(folder)
    }

    pub async fn rename_folder(&self, id: i64, new_name: &str) -> Result<Folder, AppError> {
        let name = required_name(new_name)?;

        let renamed = self
            .store_policy
            .retry_idempotent("rename_folder", || self.folders.rename_folder(id, &name))
            .await?;
        if !renamed {
            return Err(folder_not_found(id));
        }

        tracing::info!("✏️ Pasta {} renomeada para '{}'", id, name);
        Ok(Folder { id, name })
    }

    /// Apaga só a pasta. Os contatos mantêm a chave (referência pendente).
    pub async fn delete_folder(&self, id: i64) -> Result<(), AppError> {
        let deleted = self
            .store_policy
            .bounded("delete_folder", self.folders.delete_folder(id))
            .await?;
        if !deleted {
            return Err(folder_not_found(id));
        }

        tracing::info!("🗑️ Pasta {} apagada", id);
        Ok(())
    }

    async fn require_folder(&self, id: i64) -> Result<Folder, AppError> {
        self.store_policy
            .bounded("find_folder", self.folders.find_folder(id))
            .await?
            .ok_or_else(|| folder_not_found(id))
    }

    // =========================================================================
    //  2. CONTAGENS (ISOLADAS POR PASTA)
    // =========================================================================

    /// Uma falha na pasta A não impede o resultado da pasta B.
    /// Resultados na mesma ordem de `folder_ids`.
    pub async fn count_members(&self, folder_ids: &[i64]) -> Vec<FolderCount> {
        stream::iter(folder_ids.iter().copied())
            .map(|folder_id| async move {
                match self
                    .store_policy
                    .bounded("count_members", self.contacts.count_members(folder_id))
                    .await
                {
                    Ok(count) => FolderCount { folder_id, count: Some(count), error: None },
                    Err(e) => {
                        tracing::warn!("⚠️ Falha ao contar membros da pasta {}: {}", folder_id, e);
                        FolderCount {
                            folder_id,
                            count: None,
                            error: Some("Failed to fetch phone numbers. Please try again.".to_string()),
                        }
                    }
                }
            })
            .buffered(self.limits.concurrency.max(1))
            .collect()
            .await
    }

    pub async fn list_folders_with_counts(&self) -> Result<Vec<FolderSummary>, AppError> {
        let folders = self.list_folders().await?;
        let ids: Vec<i64> = folders.iter().map(|f| f.id).collect();
        let counts = self.count_members(&ids).await;

        Ok(folders
            .into_iter()
            .zip(counts)
            .map(|(folder, members)| FolderSummary { folder, members })
            .collect())
    }

    pub async fn list_member_numbers(
        &self,
        folder_id: i64,
        search: Option<&str>,
    ) -> Result<Vec<String>, AppError> {
        self.require_folder(folder_id).await?;

        let members = self
            .store_policy
            .bounded("list_members", self.contacts.list_members(folder_id))
            .await?;

        let search = search.map(str::trim).unwrap_or_default();
        Ok(members
            .into_iter()
            .map(|c| c.phone_number)
            .filter(|number| number.contains(search))
            .collect())
    }

    // =========================================================================
    //  3. IMPORTAÇÃO EM LOTE
    // =========================================================================

    /// Importa números de texto livre para a pasta.
    ///
    /// Cada número é uma escrita atômica própria, despachada sem ordem
    /// garantida. Se o future for descartado no meio (cliente desconectou),
    /// o que já foi gravado fica gravado e o resto simplesmente não é enviado.
    pub async fn bulk_import_numbers(
        &self,
        folder_id: i64,
        raw_text: &str,
    ) -> Result<ImportReport, AppError> {
        if raw_text.trim().is_empty() {
            return Err(AppError::Validation("Please enter valid numbers.".to_string()));
        }

        let parsed = self.phones.parse_batch(raw_text);
        if parsed.accepted.len() > self.limits.max_batch {
            return Err(AppError::Validation(format!(
                "You can only add up to {} users at a time.",
                self.limits.max_batch
            )));
        }
        if parsed.accepted.is_empty() {
            return Err(AppError::Validation(format!(
                "No valid numbers found to add: {}",
                parsed.rejected.join(", ")
            )));
        }

        self.require_folder(folder_id).await?;

        // Conjunto conhecido = membros atuais da pasta
        let mut known: HashSet<String> = self
            .store_policy
            .bounded("list_members", self.contacts.list_members(folder_id))
            .await?
            .into_iter()
            .map(|c| c.phone_number)
            .collect();

        let mut report = ImportReport {
            folder_id,
            rejected: parsed.rejected,
            ..ImportReport::default()
        };
        let mut unique_numbers = Vec::new();
        for number in parsed.accepted {
            if known.insert(number.clone()) {
                unique_numbers.push(number);
            } else {
                report.duplicates.push(number);
            }
        }

        let outcomes: Vec<(String, Result<MembershipOutcome, AppError>)> = stream::iter(unique_numbers)
            .map(|number| async move {
                let candidate = Contact::imported(number.clone(), folder_id);
                let outcome = self
                    .store_policy
                    .bounded("add_membership", self.contacts.add_membership(&candidate, folder_id))
                    .await;
                (number, outcome)
            })
            .buffer_unordered(self.limits.concurrency.max(1))
            .collect()
            .await;

        for (number, outcome) in outcomes {
            match outcome {
                Ok(MembershipOutcome::Created) => report.created += 1,
                Ok(MembershipOutcome::Linked) => report.linked += 1,
                Ok(MembershipOutcome::AlreadyMember) => report.already_members += 1,
                Err(e) => {
                    tracing::error!("🔥 Falha ao importar {}: {}", number, e);
                    report.failed.push(ImportFailure {
                        phone_number: number,
                        message: ApiError::from(e).message,
                    });
                }
            }
        }
        report.added = report.created + report.linked;

        if !report.duplicates.is_empty() {
            tracing::warn!(
                "⚠️ {} número(s) repetido(s) ignorado(s) na pasta {}",
                report.duplicates.len(),
                folder_id
            );
        }
        tracing::info!(
            "📥 Pasta {}: {} adicionado(s) ({} novo(s), {} vinculado(s)), {} falha(s)",
            folder_id,
            report.added,
            report.created,
            report.linked,
            report.failed.len()
        );

        Ok(report)
    }

    /// Apaga o CONTATO INTEIRO dono do número, não só o vínculo com a pasta.
    pub async fn delete_number(&self, folder_id: i64, phone_number: &str) -> Result<(), AppError> {
        let phone_number = self.phones.require(phone_number)?;

        let contact = self
            .store_policy
            .bounded("find_by_phone", self.contacts.find_by_phone(&phone_number))
            .await?
            .ok_or_else(|| AppError::NotFound("Number not found.".to_string()))?;

        let deleted = self
            .store_policy
            .bounded("delete_contact", self.contacts.delete_contact(contact.userid))
            .await?;
        if !deleted {
            return Err(AppError::NotFound("Number not found.".to_string()));
        }

        tracing::warn!(
            "🗑️ Contato {} ({}) apagado a partir da pasta {}",
            contact.phone_number,
            contact.userid,
            folder_id
        );
        Ok(())
    }
}
