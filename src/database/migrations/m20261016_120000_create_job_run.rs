use sea_orm_migration::{
    prelude::*,
    schema::{
        big_integer_null, string, string_len, text_null, timestamp_with_time_zone,
        timestamp_with_time_zone_null, uuid,
    },
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(JobRun::Table)
                    .if_not_exists()
                    .col(uuid(JobRun::Id).primary_key())
                    .col(string(JobRun::JobName))
                    .col(string_len(JobRun::Status, 16).default("running"))
                    .col(timestamp_with_time_zone(JobRun::StartedAt))
                    .col(timestamp_with_time_zone_null(JobRun::FinishedAt))
                    .col(big_integer_null(JobRun::DurationMs))
                    .col(text_null(JobRun::Error))
                    .col(
                        timestamp_with_time_zone(JobRun::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Recent-runs listing orders by start time, optionally per job
        manager
            .create_index(
                Index::create()
                    .name("idx-job_run-started_at")
                    .table(JobRun::Table)
                    .col(JobRun::StartedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-job_run-job_name-started_at")
                    .table(JobRun::Table)
                    .col(JobRun::JobName)
                    .col(JobRun::StartedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobRun::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum JobRun {
    Table,
    Id,
    JobName,
    Status,
    StartedAt,
    FinishedAt,
    DurationMs,
    Error,
    CreatedAt,
}
