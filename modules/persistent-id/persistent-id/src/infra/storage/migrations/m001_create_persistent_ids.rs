use sea_orm_migration::prelude as mig;

const TABLE: &str = "persistent_ids";

pub struct CreatePersistentIds;

impl mig::MigrationName for CreatePersistentIds {
    fn name(&self) -> &'static str {
        "m001_create_persistent_ids"
    }
}

fn col(name: &str) -> mig::Alias {
    mig::Alias::new(name)
}

#[async_trait::async_trait]
impl mig::MigrationTrait for CreatePersistentIds {
    async fn up(&self, manager: &mig::SchemaManager) -> Result<(), mig::DbErr> {
        manager
            .create_table(
                mig::Table::create()
                    .table(col(TABLE))
                    .if_not_exists()
                    .col(
                        mig::ColumnDef::new(col("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(mig::ColumnDef::new(col("issuer_id")).string().not_null())
                    .col(
                        mig::ColumnDef::new(col("relying_party_id"))
                            .string()
                            .not_null(),
                    )
                    .col(mig::ColumnDef::new(col("local_id")).string().not_null())
                    .col(
                        mig::ColumnDef::new(col("principal_name"))
                            .string()
                            .not_null(),
                    )
                    .col(
                        mig::ColumnDef::new(col("persistent_id"))
                            .string()
                            .not_null(),
                    )
                    .col(mig::ColumnDef::new(col("peer_provided_id")).string().null())
                    .col(
                        mig::ColumnDef::new(col("creation_date"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        mig::ColumnDef::new(col("deactivation_date"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // A value is never reissued under the same issuer / RP pair, active or not.
        manager
            .create_index(
                mig::Index::create()
                    .name("ux_persistent_ids_value")
                    .table(col(TABLE))
                    .col(col("issuer_id"))
                    .col(col("relying_party_id"))
                    .col(col("persistent_id"))
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                mig::Index::create()
                    .name("ix_persistent_ids_triple")
                    .table(col(TABLE))
                    .col(col("issuer_id"))
                    .col(col("relying_party_id"))
                    .col(col("local_id"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &mig::SchemaManager) -> Result<(), mig::DbErr> {
        manager
            .drop_table(mig::Table::drop().table(col(TABLE)).to_owned())
            .await
    }
}
