// src/db/contact_repo.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::ContactStore,
    models::contact::{Address, Contact, MembershipOutcome, Profile, Subscription},
};

const CONTACT_COLUMNS: &str = r#"
    userid, phone_number, packages, name, surname, shop_name, address, subscriptions
"#;

// Fronteira de schema: se `packages` não for um mapa {id: texto} o decode
// falha aqui (AppError::Schema) em vez de vazar lixo para os serviços.
#[derive(Debug, FromRow)]
struct ContactRow {
    userid: Uuid,
    phone_number: String,
    packages: Json<BTreeMap<i64, String>>,
    name: String,
    surname: String,
    shop_name: String,
    address: Json<Address>,
    subscriptions: Json<Vec<Subscription>>,
}

#[derive(Debug, FromRow)]
struct UpsertedContact {
    #[sqlx(flatten)]
    contact: ContactRow,
    inserted: bool,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact {
            userid: row.userid,
            phone_number: row.phone_number,
            packages: row.packages.0,
            profile: Profile {
                name: row.name,
                surname: row.surname,
                shop_name: row.shop_name,
                address: row.address.0,
            },
            subscriptions: row.subscriptions.0,
        }
    }
}

// O repositório de contatos, responsável pela tabela 'contacts'
#[derive(Clone)]
pub struct ContactRepository {
    pool: PgPool,
}

impl ContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactStore for ContactRepository {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Contact>, AppError> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE phone_number = $1");
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Contact::from))
    }

    async fn list_members(&self, folder_id: i64) -> Result<Vec<Contact>, AppError> {
        // Predicado único de pertencimento: a chave existe no JSONB
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE packages ? $1 ORDER BY phone_number ASC"
        );
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(folder_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Contact::from).collect())
    }

    async fn count_members(&self, folder_id: i64) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE packages ? $1")
            .bind(folder_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn add_membership(
        &self,
        candidate: &Contact,
        folder_id: i64,
    ) -> Result<MembershipOutcome, AppError> {
        let mut tx = self.pool.begin().await?;
        let folder_key = folder_id.to_string();

        // 1. Trava a linha (se existir) para o read-modify-write ser atômico
        let existing: Option<(Uuid, Json<BTreeMap<i64, String>>)> = sqlx::query_as(
            "SELECT userid, packages FROM contacts WHERE phone_number = $1 FOR UPDATE",
        )
        .bind(&candidate.phone_number)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            Some((_, Json(packages))) if packages.contains_key(&folder_id) => {
                MembershipOutcome::AlreadyMember
            }
            Some((userid, _)) => {
                sqlx::query(
                    r#"
                    UPDATE contacts
                    SET packages = packages || jsonb_build_object($2::text, ''), updated_at = NOW()
                    WHERE userid = $1
                    "#,
                )
                .bind(userid)
                .bind(&folder_key)
                .execute(&mut *tx)
                .await?;
                MembershipOutcome::Linked
            }
            None => {
                // 2. Outro importador pode ter criado o mesmo número entre o SELECT e aqui:
                // o ON CONFLICT transforma a corrida em "vincular" em vez de duplicar.
                // O WHERE enxerga a versão mais recente da linha: se a chave já está lá,
                // nenhuma linha volta.
                let inserted: Option<bool> = sqlx::query_scalar(
                    r#"
                    INSERT INTO contacts (
                        userid, phone_number, packages, name, surname, shop_name, address, subscriptions
                    )
                    VALUES ($1, $2, jsonb_build_object($3::text, ''), $4, $5, $6, $7, $8)
                    ON CONFLICT (phone_number) DO UPDATE
                    SET packages = contacts.packages || EXCLUDED.packages, updated_at = NOW()
                    WHERE NOT (contacts.packages ? $3::text)
                    RETURNING (xmax = 0) AS inserted
                    "#,
                )
                .bind(candidate.userid)
                .bind(&candidate.phone_number)
                .bind(&folder_key)
                .bind(&candidate.profile.name)
                .bind(&candidate.profile.surname)
                .bind(&candidate.profile.shop_name)
                .bind(Json(&candidate.profile.address))
                .bind(Json(&candidate.subscriptions))
                .fetch_optional(&mut *tx)
                .await?;

                upsert_outcome(inserted)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn delete_contact(&self, userid: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM contacts WHERE userid = $1")
            .bind(userid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_registration(
        &self,
        phone_number: &str,
        profile: &Profile,
        subscriptions: &[Subscription],
    ) -> Result<(Contact, bool), AppError> {
        // `packages` não entra no UPDATE: cadastro nunca remove pastas
        let sql = format!(
            r#"
            INSERT INTO contacts (
                userid, phone_number, packages, name, surname, shop_name, address, subscriptions
            )
            VALUES ($1, $2, '{{}}'::jsonb, $3, $4, $5, $6, $7)
            ON CONFLICT (phone_number) DO UPDATE
            SET name = EXCLUDED.name,
                surname = EXCLUDED.surname,
                shop_name = EXCLUDED.shop_name,
                address = EXCLUDED.address,
                subscriptions = EXCLUDED.subscriptions,
                updated_at = NOW()
            RETURNING {CONTACT_COLUMNS}, (xmax = 0) AS inserted
            "#
        );

        let row = sqlx::query_as::<_, UpsertedContact>(&sql)
            .bind(Uuid::new_v4())
            .bind(phone_number)
            .bind(&profile.name)
            .bind(&profile.surname)
            .bind(&profile.shop_name)
            .bind(Json(&profile.address))
            .bind(Json(subscriptions))
            .fetch_one(&self.pool)
            .await?;

        Ok((Contact::from(row.contact), row.inserted))
    }
}

/// `Some(true)`: linha nova; `Some(false)`: chave adicionada a um contato
/// existente; `None`: o conflito achou o contato já na pasta.
fn upsert_outcome(inserted: Option<bool>) -> MembershipOutcome {
    match inserted {
        Some(true) => MembershipOutcome::Created,
        Some(false) => MembershipOutcome::Linked,
        None => MembershipOutcome::AlreadyMember,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn racing_import_into_the_same_folder_is_not_counted_as_a_link() {
        assert_eq!(upsert_outcome(Some(true)), MembershipOutcome::Created);
        assert_eq!(upsert_outcome(Some(false)), MembershipOutcome::Linked);
        assert_eq!(upsert_outcome(None), MembershipOutcome::AlreadyMember);
    }
}
