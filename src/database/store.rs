use std::ops::DerefMut;

use eyre::{Context as _, ContextCompat as _, Result};
use sqlx::{MySql, QueryBuilder};

use crate::model::Medal;

use super::{Database, MedalStore};

impl MedalStore for Database {
    async fn ensure_schema(&self) -> Result<()> {
        let mut conn = self
            .acquire()
            .await
            .context("failed to acquire connection to create medals table")?;

        let query = sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS medals (
  medal_id INT NOT NULL PRIMARY KEY,
  name VARCHAR(255),
  link VARCHAR(512),
  description TEXT,
  restriction VARCHAR(255),
  category VARCHAR(255),
  instructions TEXT,
  solution_found BOOLEAN NOT NULL DEFAULT FALSE,
  solution TEXT,
  mods VARCHAR(255),
  locked BOOLEAN NOT NULL DEFAULT FALSE,
  video VARCHAR(512),
  date DATETIME,
  pack_id VARCHAR(255),
  first_achieved_date DATETIME,
  first_achieved_by VARCHAR(255),
  mode_order INT,
  ordering INT,
  rarity DOUBLE
)"#,
        );

        query
            .execute(conn.deref_mut())
            .await
            .context("failed to create medals table")?;

        Ok(())
    }

    async fn replace_medal(&self, medal: &Medal) -> Result<()> {
        let Medal {
            medal_id,
            name,
            link,
            description,
            restriction,
            category,
            instructions,
            solution_found,
            solution,
            mods,
            locked,
            video,
            date,
            pack_id,
            first_achieved_date,
            first_achieved_by,
            mode_order,
            ordering,
            rarity,
        } = medal;

        let medal_id = (*medal_id).context("cannot store medal without a valid medal id")?;

        let mut conn = self
            .acquire()
            .await
            .with_context(|| format!("failed to acquire connection to store medal {medal_id}"))?;

        let query = sqlx::query(
            r#"
REPLACE INTO medals SET
  medal_id = ?, name = ?, link = ?,
  description = ?, restriction = ?,
  category = ?, instructions = ?,
  solution_found = ?, solution = ?,
  mods = ?, locked = ?, video = ?,
  date = ?, pack_id = ?, first_achieved_date = ?,
  first_achieved_by = ?, mode_order = ?,
  ordering = ?, rarity = ?"#,
        )
        .bind(medal_id)
        .bind(name.as_deref())
        .bind(link.as_deref())
        .bind(description.as_deref())
        .bind(restriction.as_deref())
        .bind(category.as_deref())
        .bind(instructions.as_deref())
        .bind(*solution_found)
        .bind(solution.as_deref())
        .bind(mods.as_deref())
        .bind(*locked)
        .bind(video.as_deref())
        .bind(*date)
        .bind(pack_id.as_deref())
        .bind(*first_achieved_date)
        .bind(first_achieved_by.as_deref())
        .bind(*mode_order)
        .bind(*ordering)
        .bind(*rarity);

        query
            .execute(conn.deref_mut())
            .await
            .with_context(|| format!("failed to execute medals query for medal {medal_id}"))?;

        Ok(())
    }

    async fn prune_medals(&self, keep: &[i32]) -> Result<u64> {
        ensure!(!keep.is_empty(), "refusing to prune all medals");

        let mut conn = self
            .acquire()
            .await
            .context("failed to acquire connection to prune medals")?;

        let mut builder: QueryBuilder<'_, MySql> =
            QueryBuilder::new("DELETE FROM medals WHERE medal_id NOT IN (");
        let mut separated = builder.separated(", ");

        for medal_id in keep {
            separated.push_bind(*medal_id);
        }

        builder.push(")");

        let res = builder
            .build()
            .execute(conn.deref_mut())
            .await
            .context("failed to prune medals")?;

        Ok(res.rows_affected())
    }
}
