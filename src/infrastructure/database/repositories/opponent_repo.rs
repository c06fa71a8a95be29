use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::entities::{HandSummary, OpponentProfile};
use crate::domain::repositories::{OpponentRepository, RepositoryError};
use crate::domain::value_objects::game_state::Variant;

/// SQLite implementation of OpponentRepository
///
/// Counters are only ever incremented via the upsert, so they are monotonic
/// by construction. A whole hand summary (row upsert + action log) commits
/// in one transaction: an applied hand is either fully counted or not
/// counted at all.
pub struct SqliteOpponentRepository {
    pool: SqlitePool,
}

impl SqliteOpponentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn get_db(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes if this is a fresh database.
    pub async fn init_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS opponents (
                player_id TEXT NOT NULL,
                variant TEXT NOT NULL,
                screen_name TEXT NOT NULL DEFAULT '',
                hands_played INTEGER NOT NULL DEFAULT 0,
                vpip_count INTEGER NOT NULL DEFAULT 0,
                pfr_count INTEGER NOT NULL DEFAULT 0,
                three_bet_count INTEGER NOT NULL DEFAULT 0,
                three_bet_opp INTEGER NOT NULL DEFAULT 0,
                cbet_count INTEGER NOT NULL DEFAULT 0,
                cbet_opp INTEGER NOT NULL DEFAULT 0,
                fold_to_cbet_count INTEGER NOT NULL DEFAULT 0,
                fold_to_cbet_opp INTEGER NOT NULL DEFAULT 0,
                wtsd_count INTEGER NOT NULL DEFAULT 0,
                wtsd_opp INTEGER NOT NULL DEFAULT 0,
                wsd_count INTEGER NOT NULL DEFAULT 0,
                total_bets INTEGER NOT NULL DEFAULT 0,
                total_raises INTEGER NOT NULL DEFAULT 0,
                total_calls INTEGER NOT NULL DEFAULT 0,
                bet_size_sum REAL NOT NULL DEFAULT 0,
                bet_size_count INTEGER NOT NULL DEFAULT 0,
                last_seen INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (player_id, variant)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_opponents_last_seen ON opponents(last_seen)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS opponent_actions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id TEXT NOT NULL,
                variant TEXT NOT NULL,
                hand_num INTEGER NOT NULL,
                street TEXT NOT NULL,
                action TEXT NOT NULL,
                amount INTEGER NOT NULL DEFAULT 0,
                pot_size INTEGER NOT NULL DEFAULT 0,
                pot_ratio REAL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_opponent_actions_hand \
             ON opponent_actions(player_id, variant, hand_num)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> OpponentProfile {
        use sqlx::Row;

        let variant_str: String = row.get("variant");

        OpponentProfile {
            player_id: row.get("player_id"),
            screen_name: row.get("screen_name"),
            variant: Variant::from_str(&variant_str).unwrap_or(Variant::Plo5),
            hands_played: row.get("hands_played"),
            vpip_count: row.get("vpip_count"),
            pfr_count: row.get("pfr_count"),
            three_bet_count: row.get("three_bet_count"),
            three_bet_opp: row.get("three_bet_opp"),
            cbet_count: row.get("cbet_count"),
            cbet_opp: row.get("cbet_opp"),
            fold_to_cbet_count: row.get("fold_to_cbet_count"),
            fold_to_cbet_opp: row.get("fold_to_cbet_opp"),
            wtsd_count: row.get("wtsd_count"),
            wtsd_opp: row.get("wtsd_opp"),
            wsd_count: row.get("wsd_count"),
            total_bets: row.get("total_bets"),
            total_raises: row.get("total_raises"),
            total_calls: row.get("total_calls"),
            bet_size_sum: row.get("bet_size_sum"),
            bet_size_count: row.get("bet_size_count"),
            last_seen: row.get("last_seen"),
        }
    }
}

#[async_trait]
impl OpponentRepository for SqliteOpponentRepository {
    async fn find(
        &self,
        player_id: &str,
        variant: Variant,
    ) -> Result<Option<OpponentProfile>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM opponents WHERE player_id = ? AND variant = ?")
            .bind(player_id)
            .bind(variant.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_profile))
    }

    async fn find_many(
        &self,
        player_ids: &[String],
        variant: Variant,
    ) -> Result<Vec<OpponentProfile>, RepositoryError> {
        if player_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Build placeholders for IN clause
        let placeholders: Vec<&str> = player_ids.iter().map(|_| "?").collect();
        let query = format!(
            "SELECT * FROM opponents WHERE variant = ? AND player_id IN ({})",
            placeholders.join(", ")
        );

        let mut query_builder = sqlx::query(&query).bind(variant.as_str());
        for id in player_ids {
            query_builder = query_builder.bind(id);
        }

        let rows = query_builder
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows.iter().map(Self::row_to_profile).collect())
    }

    async fn apply_hand(&self, summary: &HandSummary) -> Result<(), RepositoryError> {
        let now = chrono::Utc::now().timestamp();

        let as_inc = |flag: bool| if flag { 1i64 } else { 0 };
        let bet_sizes: Vec<f64> = summary.bet_size_samples().collect();
        let bet_size_sum: f64 = bet_sizes.iter().sum();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let applied = sqlx::query(
            r#"
            INSERT INTO opponents (
                player_id, variant, screen_name, hands_played,
                vpip_count, pfr_count,
                three_bet_count, three_bet_opp,
                cbet_count, cbet_opp,
                fold_to_cbet_count, fold_to_cbet_opp,
                wtsd_count, wtsd_opp, wsd_count,
                total_bets, total_raises, total_calls,
                bet_size_sum, bet_size_count, last_seen
            )
            VALUES (?, ?, ?, 1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(player_id, variant) DO UPDATE SET
                screen_name = excluded.screen_name,
                hands_played = hands_played + 1,
                vpip_count = vpip_count + excluded.vpip_count,
                pfr_count = pfr_count + excluded.pfr_count,
                three_bet_count = three_bet_count + excluded.three_bet_count,
                three_bet_opp = three_bet_opp + excluded.three_bet_opp,
                cbet_count = cbet_count + excluded.cbet_count,
                cbet_opp = cbet_opp + excluded.cbet_opp,
                fold_to_cbet_count = fold_to_cbet_count + excluded.fold_to_cbet_count,
                fold_to_cbet_opp = fold_to_cbet_opp + excluded.fold_to_cbet_opp,
                wtsd_count = wtsd_count + excluded.wtsd_count,
                wtsd_opp = wtsd_opp + excluded.wtsd_opp,
                wsd_count = wsd_count + excluded.wsd_count,
                total_bets = total_bets + excluded.total_bets,
                total_raises = total_raises + excluded.total_raises,
                total_calls = total_calls + excluded.total_calls,
                bet_size_sum = bet_size_sum + excluded.bet_size_sum,
                bet_size_count = bet_size_count + excluded.bet_size_count,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(&summary.player_id)
        .bind(summary.variant.as_str())
        .bind(&summary.screen_name)
        .bind(as_inc(summary.voluntary))
        .bind(as_inc(summary.raised_preflop))
        .bind(as_inc(summary.did_three_bet))
        .bind(as_inc(summary.had_three_bet_opp))
        .bind(as_inc(summary.did_cbet))
        .bind(as_inc(summary.had_cbet_opp))
        .bind(as_inc(summary.folded_to_cbet))
        .bind(as_inc(summary.faced_cbet))
        .bind(as_inc(summary.went_to_showdown))
        .bind(as_inc(summary.saw_river))
        .bind(as_inc(summary.won_at_showdown))
        .bind(summary.bet_count())
        .bind(summary.raise_count())
        .bind(summary.call_count())
        .bind(bet_size_sum)
        .bind(bet_sizes.len() as i64)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(e) = applied {
            // Explicit rollback keeps the error readable; dropping the
            // transaction would roll back anyway.
            let _ = tx.rollback().await;
            return Err(RepositoryError::Transaction(e.to_string()));
        }

        for action in &summary.postflop_actions {
            let inserted = sqlx::query(
                r#"
                INSERT INTO opponent_actions
                    (player_id, variant, hand_num, street, action, amount, pot_size, pot_ratio, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&summary.player_id)
            .bind(summary.variant.as_str())
            .bind(summary.hand_num)
            .bind(action.street.as_str())
            .bind(action.action.as_str())
            .bind(action.amount as i64)
            .bind(action.pot_size as i64)
            .bind(action.pot_ratio)
            .bind(now)
            .execute(&mut *tx)
            .await;

            if let Err(e) = inserted {
                let _ = tx.rollback().await;
                return Err(RepositoryError::Transaction(e.to_string()));
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Transaction(e.to_string()))
    }

    async fn recent(
        &self,
        variant: Variant,
        limit: u32,
    ) -> Result<Vec<OpponentProfile>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM opponents WHERE variant = ? ORDER BY last_seen DESC LIMIT ?",
        )
        .bind(variant.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows.iter().map(Self::row_to_profile).collect())
    }
}
