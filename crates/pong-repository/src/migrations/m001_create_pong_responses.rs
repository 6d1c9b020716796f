use sea_orm_migration::{
    async_trait::async_trait,
    prelude::{DbErr, DeriveMigrationName, Iden, Index, MigrationTrait, SchemaManager, Table},
    schema::{big_integer, boolean, string, string_len},
    sea_query,
};

#[derive(Iden)]
enum PongResponses {
    Table,
    RequestTx,
    ResponseTx,
    Confirmed,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PongResponses::Table)
                    .if_not_exists()
                    .col(string_len(PongResponses::RequestTx, 66).primary_key())
                    .col(string(PongResponses::ResponseTx))
                    .col(boolean(PongResponses::Confirmed).default(false))
                    .col(big_integer(PongResponses::CreatedAt))
                    .col(big_integer(PongResponses::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // set_confirmed filters by the response transaction
        manager
            .create_index(
                Index::create()
                    .name("idx_pong_responses_response_tx")
                    .table(PongResponses::Table)
                    .col(PongResponses::ResponseTx)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pong_responses_created_at")
                    .table(PongResponses::Table)
                    .col(PongResponses::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(PongResponses::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}
