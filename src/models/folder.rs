// src/models/folder.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Pasta ("pacote" de contatos). O id é sempre alocado pelo servidor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: i64,
    pub name: String,
}

// Contagem de membros por pasta. Falha em uma pasta não derruba as outras.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderCount {
    pub folder_id: i64,
    pub count: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderSummary {
    #[serde(flatten)]
    pub folder: Folder,
    pub members: FolderCount,
}

// Relatório da importação em lote
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub folder_id: i64,
    /// Contatos novos + contatos existentes vinculados à pasta.
    pub added: usize,
    pub created: usize,
    pub linked: usize,
    pub already_members: usize,
    /// Aviso não-fatal: números que já estavam na pasta ou repetidos no lote.
    pub duplicates: Vec<String>,
    /// Tokens que não são números válidos.
    pub rejected: Vec<String>,
    pub failed: Vec<ImportFailure>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub phone_number: String,
    pub message: String,
}
