use sea_orm_migration::prelude as mig;

mod m001_create_persistent_ids;
mod m002_unique_active_triple;

pub struct Migrator;

#[async_trait::async_trait]
impl mig::MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn mig::MigrationTrait>> {
        vec![
            Box::new(m001_create_persistent_ids::CreatePersistentIds),
            Box::new(m002_unique_active_triple::UniqueActiveTriple),
        ]
    }
}
