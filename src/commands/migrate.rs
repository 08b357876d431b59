use std::{cmp, process::ExitCode};

use sea_orm::{DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

use crate::{
    boot::BootError,
    cli::MigrateAction,
    config::Config,
    database::{migrations::Migrator, setup_database_connection},
};

pub async fn handle_migrate_command(
    config: &Config,
    action: MigrateAction,
) -> Result<ExitCode, BootError> {
    // Create a simple connection just for migrations
    let db = setup_database_connection(&config.database).await?;

    if let Err(e) = handle_migration_command(&db, action).await {
        eprintln!("❌ Migration failed: {e}");
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

pub async fn handle_migration_command(
    db: &DatabaseConnection,
    action: MigrateAction,
) -> Result<(), DbErr> {
    match action {
        MigrateAction::Up { steps } => {
            let pending_migrations = Migrator::get_pending_migrations(db).await?;

            if pending_migrations.is_empty() {
                println!("✅ All migrations are already up to date");
                return Ok(());
            }

            let count = steps.map_or(pending_migrations.len(), |steps| {
                cmp::min(steps as usize, pending_migrations.len())
            });
            println!("Running {count} migration(s) up:");
            for migration in &pending_migrations[..count] {
                println!("  📄 {}", migration.name());
            }
            println!();

            Migrator::up(db, steps).await?;
            println!("✅ Migrations completed successfully");
        }
        MigrateAction::Down { steps } => {
            let applied_migrations = Migrator::get_applied_migrations(db).await?;

            if applied_migrations.is_empty() {
                println!("❌ No migrations to roll back");
                return Ok(());
            }

            let migrations_to_revert = cmp::min(steps as usize, applied_migrations.len());
            let revert_slice =
                &applied_migrations[applied_migrations.len() - migrations_to_revert..];

            println!("Rolling back migrations:");
            for migration in revert_slice.iter().rev() {
                println!("  📄 {}", migration.name());
            }
            println!();

            Migrator::down(db, Some(steps)).await?;
            println!("✅ Rollback completed successfully");
        }
        MigrateAction::Status => {
            let pending = Migrator::get_pending_migrations(db).await?;
            if pending.is_empty() {
                println!("✅ All migrations are up to date");
            } else {
                println!("📋 Pending migrations:");
                for migration in pending {
                    println!("  - {}", migration.name());
                }
            }

            println!("📋 Applied migrations:");
            for migration in Migrator::get_applied_migrations(db).await? {
                println!("  ✓ {}", migration.name());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;

    #[tokio::test]
    async fn test_up_then_down_on_sqlite() {
        let db = setup_database_connection(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            pool_size: 1,
        })
        .await
        .unwrap();

        handle_migration_command(&db, MigrateAction::Up { steps: None })
            .await
            .unwrap();
        assert!(Migrator::get_pending_migrations(&db).await.unwrap().is_empty());

        handle_migration_command(&db, MigrateAction::Down { steps: 1 })
            .await
            .unwrap();
        assert_eq!(Migrator::get_applied_migrations(&db).await.unwrap().len(), 0);

        handle_migration_command(&db, MigrateAction::Status).await.unwrap();
    }
}
