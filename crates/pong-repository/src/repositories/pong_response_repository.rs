use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::{Expr, OnConflict},
};

use crate::{
    error::{RepositoryError, Result},
    models::pong_responses::{ActiveModel, Column, Entity, Model},
    observability::QueryTimer,
    types::PongResponseEntry,
};

#[derive(Clone)]
pub struct PongResponseRepository {
    conn: Arc<DatabaseConnection>,
}

impl PongResponseRepository {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Insert or replace the response transaction for a request.
    ///
    /// An existing row keeps its `created_at`; `response_tx` is overwritten and
    /// `confirmed` is reset, since the new transaction has not been observed yet.
    pub async fn upsert_response(
        &self,
        request_tx: &str,
        response_tx: &str,
    ) -> Result<PongResponseEntry> {
        let timer = QueryTimer::start("upsert_response");
        let now = Utc::now().timestamp_millis();

        let model = ActiveModel {
            request_tx: ActiveValue::Set(request_tx.to_string()),
            response_tx: ActiveValue::Set(response_tx.to_string()),
            confirmed: ActiveValue::Set(false),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };

        let result = async {
            Entity::insert(model)
                .on_conflict(
                    OnConflict::column(Column::RequestTx)
                        .update_columns([Column::ResponseTx, Column::Confirmed, Column::UpdatedAt])
                        .to_owned(),
                )
                .exec_without_returning(self.conn.as_ref())
                .await?;

            Entity::find_by_id(request_tx.to_string())
                .one(self.conn.as_ref())
                .await?
                .map(Self::to_entry)
                .ok_or_else(|| RepositoryError::MissingAfterUpsert(request_tx.to_string()))
        }
        .await;

        timer.finish(&result, |_| 1);
        result
    }

    /// Set the confirmation flag on the row holding `response_tx`.
    /// Returns the number of rows updated.
    pub async fn set_confirmed(&self, response_tx: &str, confirmed: bool) -> Result<u64> {
        let timer = QueryTimer::start("set_confirmed");
        let now = Utc::now().timestamp_millis();

        let result = Entity::update_many()
            .col_expr(Column::Confirmed, Expr::value(confirmed))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::ResponseTx.eq(response_tx))
            .exec(self.conn.as_ref())
            .await;

        timer.finish(&result, |res| res.rows_affected as usize);
        Ok(result?.rows_affected)
    }

    /// All response records, oldest first.
    pub async fn list_responses(&self) -> Result<Vec<PongResponseEntry>> {
        let timer = QueryTimer::start("list_responses");
        let result = Entity::find()
            .order_by_asc(Column::CreatedAt)
            .all(self.conn.as_ref())
            .await;

        timer.finish(&result, Vec::len);
        Ok(result?.into_iter().map(Self::to_entry).collect())
    }

    pub async fn get_response(&self, request_tx: &str) -> Result<Option<PongResponseEntry>> {
        let timer = QueryTimer::start("get_response");
        let result = Entity::find()
            .filter(Column::RequestTx.eq(request_tx))
            .one(self.conn.as_ref())
            .await;

        timer.finish(&result, |row| usize::from(row.is_some()));
        Ok(result?.map(Self::to_entry))
    }

    fn to_entry(model: Model) -> PongResponseEntry {
        PongResponseEntry {
            request_tx: model.request_tx,
            response_tx: model.response_tx,
            confirmed: model.confirmed,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
