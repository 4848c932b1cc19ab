use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude as mig;

pub struct UniqueActiveTriple;

impl mig::MigrationName for UniqueActiveTriple {
    fn name(&self) -> &'static str {
        "m002_unique_active_triple"
    }
}

// Partial indexes have no portable builder form; SQLite and Postgres accept this text.
const UP: &str = "CREATE UNIQUE INDEX IF NOT EXISTS ux_persistent_ids_active \
                  ON persistent_ids (issuer_id, relying_party_id, local_id) \
                  WHERE deactivation_date IS NULL";

const DOWN: &str = "DROP INDEX IF EXISTS ux_persistent_ids_active";

#[async_trait::async_trait]
impl mig::MigrationTrait for UniqueActiveTriple {
    async fn up(&self, manager: &mig::SchemaManager) -> Result<(), mig::DbErr> {
        manager.get_connection().execute_unprepared(UP).await?;
        Ok(())
    }

    async fn down(&self, manager: &mig::SchemaManager) -> Result<(), mig::DbErr> {
        manager.get_connection().execute_unprepared(DOWN).await?;
        Ok(())
    }
}
