use sqlx::{Pool, Postgres};

use crate::application::errors::{DuplicateKey, StillReferenced};

pub type PgPool = Pool<Postgres>;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

pub async fn connect_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    // Uses compile-time embedded migrations under ./migrations
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Turns constraint violations into the typed errors the service layer maps to 409.
pub fn map_db_error(err: sqlx::Error) -> anyhow::Error {
    if let sqlx::Error::Database(db) = &err {
        let constraint = db.constraint().unwrap_or_default().to_string();
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return DuplicateKey { constraint }.into(),
            Some(FOREIGN_KEY_VIOLATION) => return StillReferenced { constraint }.into(),
            _ => {}
        }
    }
    err.into()
}

/// Binds `Option<Option<T>>` patches as a (touch, value) pair for `CASE WHEN` updates.
pub(crate) fn clear_pair<T: Clone>(value: &Option<Option<T>>) -> (bool, Option<T>) {
    (value.is_some(), value.clone().flatten())
}

pub mod repositories;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_pair_distinguishes_untouched_from_cleared() {
        assert_eq!(clear_pair::<i32>(&None), (false, None));
        assert_eq!(clear_pair::<i32>(&Some(None)), (true, None));
        assert_eq!(clear_pair(&Some(Some(4))), (true, Some(4)));
    }

    #[test]
    fn non_database_errors_pass_through() {
        let err = map_db_error(sqlx::Error::RowNotFound);
        assert!(err.downcast_ref::<DuplicateKey>().is_none());
        assert!(err.downcast_ref::<sqlx::Error>().is_some());
    }
}
