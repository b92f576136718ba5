use std::ops::DerefMut;

use eyre::{Context as _, Result};

use crate::model::Medal;

use super::{Database, MedalReader};

impl MedalReader for Database {
    async fn fetch_medals(&self) -> Result<Vec<Medal>> {
        let mut conn = self
            .acquire()
            .await
            .context("failed to acquire connection to fetch medals")?;

        let query = sqlx::query_as::<_, Medal>(
            r#"
SELECT 
  * 
FROM 
  medals 
ORDER BY 
  medal_id"#,
        );

        query
            .fetch_all(conn.deref_mut())
            .await
            .context("failed to fetch all medals")
    }

    async fn fetch_medal(&self, medal_id: i32) -> Result<Option<Medal>> {
        let mut conn = self
            .acquire()
            .await
            .context("failed to acquire connection to fetch medal")?;

        let query = sqlx::query_as::<_, Medal>(
            r#"
SELECT 
  * 
FROM 
  medals 
WHERE 
  medal_id = ?"#,
        )
        .bind(medal_id);

        query
            .fetch_optional(conn.deref_mut())
            .await
            .with_context(|| format!("failed to fetch medal {medal_id}"))
    }
}
