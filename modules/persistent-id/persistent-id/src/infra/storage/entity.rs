use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

use crate::domain::model::PersistentIdEntry;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "persistent_ids")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub issuer_id: String,
    pub relying_party_id: String,
    pub local_id: String,
    pub principal_name: String,
    pub persistent_id: String,
    pub peer_provided_id: Option<String>,
    pub creation_date: OffsetDateTime,
    pub deactivation_date: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for PersistentIdEntry {
    fn from(m: Model) -> Self {
        Self {
            persistent_id: m.persistent_id,
            issuer_id: m.issuer_id,
            relying_party_id: m.relying_party_id,
            local_id: m.local_id,
            principal_name: m.principal_name,
            peer_provided_id: m.peer_provided_id,
            creation_time: m.creation_date,
            deactivation_time: m.deactivation_date,
        }
    }
}
