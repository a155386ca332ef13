// src/common/db_utils.rs

use std::{future::Future, time::Duration};

use sqlx::{Executor, Postgres};

use crate::common::error::AppError;

// ---
// Limites para chamadas ao armazenamento
// ---
#[derive(Debug, Clone, Copy)]
pub struct StorePolicy {
    /// Tempo máximo de cada chamada individual ao armazenamento.
    pub timeout: Duration,
    /// Tentativas totais para escritas idempotentes (1 = sem retry).
    pub write_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            write_attempts: 3,
            backoff_base: Duration::from_millis(100),
        }
    }
}

impl StorePolicy {
    /// Executa uma chamada ao armazenamento com tempo limitado.
    /// Estouro do prazo vira `TransientStore`, nunca uma espera infinita.
    pub async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("⏱️ '{}' excedeu {:?}", operation, self.timeout);
                Err(AppError::TransientStore(format!("{} timed out", operation)))
            }
        }
    }

    /// Retry com backoff exponencial. Use APENAS em escritas idempotentes
    /// (chaveadas por id estável). Nunca em sequências create-if-absent.
    pub async fn retry_idempotent<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let attempts = self.write_attempts.max(1);
        let mut tried = 0;
        loop {
            tried += 1;
            match self.bounded(operation, attempt()).await {
                Err(e) if e.is_transient() && tried < attempts => {
                    let delay = self.backoff_base * 2u32.saturating_pow(tried - 1);
                    tracing::warn!(
                        "🔁 '{}' falhou ({}), tentativa {}/{} em {:?}",
                        operation, e, tried, attempts, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

// ---
// Alocador "max + 1" que não reusa ids apagados
// ---

/// Próximo id para `table`: maior entre o id existente e o já emitido, + 1.
pub(crate) async fn next_id<'e, E>(executor: E, table: &str) -> Result<i64, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    // `table` vem sempre de constante interna, nunca do usuário
    let sql = format!(
        r#"
        SELECT GREATEST(
            COALESCE((SELECT MAX(id) FROM {table}), 0),
            COALESCE((SELECT last_id FROM id_watermarks WHERE entity = $1), 0)
        ) + 1
        "#
    );
    let next: i64 = sqlx::query_scalar(&sql)
        .bind(table)
        .fetch_one(executor)
        .await?;
    Ok(next)
}

/// Registra que `id` foi emitido para `entity`.
pub(crate) async fn bump_watermark<'e, E>(executor: E, entity: &str, id: i64) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO id_watermarks (entity, last_id) VALUES ($1, $2)
        ON CONFLICT (entity) DO UPDATE
        SET last_id = GREATEST(id_watermarks.last_id, EXCLUDED.last_id)
        "#,
    )
    .bind(entity)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> StorePolicy {
        StorePolicy {
            timeout: Duration::from_millis(50),
            write_attempts: 3,
            backoff_base: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn bounded_turns_a_hang_into_a_transient_error() {
        let result: Result<(), AppError> = fast_policy()
            .bounded("hang", std::future::pending())
            .await;
        assert!(matches!(result, Err(AppError::TransientStore(_))));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let calls = &AtomicU32::new(0);
        let result = fast_policy()
            .retry_idempotent("rename", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AppError::TransientStore("boom".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.ok(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_failures_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), AppError> = fast_policy()
            .retry_idempotent("rename", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::NotFound("missing".into()))
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_stop_after_the_configured_attempts() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), AppError> = fast_policy()
            .retry_idempotent("rename", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::TransientStore("down".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
