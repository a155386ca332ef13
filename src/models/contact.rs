// src/models/contact.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub village_city: String,
    pub street: String,
    pub mandal: String,
    pub district: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub surname: String,
    pub shop_name: String,
    pub address: Address,
}

impl Default for Profile {
    // Perfil padrão dos contatos criados pela importação em lote
    fn default() -> Self {
        Self {
            name: "John".to_string(),
            surname: "Doe".to_string(),
            shop_name: "Shop Name".to_string(),
            address: Address {
                village_city: "City".to_string(),
                street: "Street".to_string(),
                mandal: "Mandal".to_string(),
                district: "District".to_string(),
                state: "State".to_string(),
            },
        }
    }
}

// Assinatura escolhida no cadastro (pacote + duração + preço na hora da escolha)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub package_id: i64,
    pub package_name: String,
    pub duration: String,
    pub price: Decimal,
}

// Escolha feita no cadastro: pacote + uma das suas durações
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageSelection {
    pub package_id: i64,
    pub duration_id: String,
}

// Contato, chaveado pelo telefone normalizado.
// Pertencer à pasta F == existir a chave F em `packages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub userid: Uuid,
    pub phone_number: String,
    pub packages: BTreeMap<i64, String>,
    #[serde(flatten)]
    pub profile: Profile,
    pub subscriptions: Vec<Subscription>,
}

impl Contact {
    /// Contato criado pela importação: perfil padrão e uma única pasta.
    pub fn imported(phone_number: String, folder_id: i64) -> Self {
        Self {
            userid: Uuid::new_v4(),
            phone_number,
            packages: BTreeMap::from([(folder_id, String::new())]),
            profile: Profile::default(),
            subscriptions: Vec::new(),
        }
    }

    pub fn is_member_of(&self, folder_id: i64) -> bool {
        self.packages.contains_key(&folder_id)
    }

    pub fn folder_ids(&self) -> Vec<i64> {
        self.packages.keys().copied().collect()
    }
}

// Resultado da escrita condicional "cria se não existe, senão vincula"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOutcome {
    Created,
    Linked,
    AlreadyMember,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReceipt {
    pub contact: Contact,
    pub total_price: Decimal,
    pub created: bool,
}
