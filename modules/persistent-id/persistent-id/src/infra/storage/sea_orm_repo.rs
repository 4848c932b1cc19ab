use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select,
};
use time::OffsetDateTime;

use crate::domain::error::PersistentIdError;
use crate::domain::model::{PairwiseKey, PersistentIdEntry};
use crate::domain::repo::PersistentIdRepository;

use super::entity::{self, Column, Entity as PersistentIdEntity};

pub struct SeaOrmPersistentIdRepository;

impl SeaOrmPersistentIdRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for SeaOrmPersistentIdRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn by_key(key: PairwiseKey<'_>) -> Select<PersistentIdEntity> {
    PersistentIdEntity::find()
        .filter(Column::IssuerId.eq(key.issuer_id))
        .filter(Column::RelyingPartyId.eq(key.relying_party_id))
        .filter(Column::LocalId.eq(key.local_id))
}

#[async_trait]
impl PersistentIdRepository for SeaOrmPersistentIdRepository {
    async fn find_active<C: ConnectionTrait>(
        &self,
        conn: &C,
        key: PairwiseKey<'_>,
    ) -> Result<Option<PersistentIdEntry>, PersistentIdError> {
        let found = by_key(key)
            .filter(Column::DeactivationDate.is_null())
            .order_by_desc(Column::Id)
            .one(conn)
            .await?;
        Ok(found.map(Into::into))
    }

    async fn find_active_by_value<C: ConnectionTrait>(
        &self,
        conn: &C,
        persistent_id: &str,
    ) -> Result<Option<PersistentIdEntry>, PersistentIdError> {
        let found = PersistentIdEntity::find()
            .filter(Column::PersistentId.eq(persistent_id))
            .filter(Column::DeactivationDate.is_null())
            .one(conn)
            .await?;
        Ok(found.map(Into::into))
    }

    async fn count_by_value<C: ConnectionTrait>(
        &self,
        conn: &C,
        issuer_id: &str,
        relying_party_id: &str,
        persistent_id: &str,
    ) -> Result<u64, PersistentIdError> {
        Ok(PersistentIdEntity::find()
            .filter(Column::IssuerId.eq(issuer_id))
            .filter(Column::RelyingPartyId.eq(relying_party_id))
            .filter(Column::PersistentId.eq(persistent_id))
            .count(conn)
            .await?)
    }

    async fn list<C: ConnectionTrait>(
        &self,
        conn: &C,
        key: PairwiseKey<'_>,
    ) -> Result<Vec<PersistentIdEntry>, PersistentIdError> {
        let rows = by_key(key).order_by_asc(Column::Id).all(conn).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count<C: ConnectionTrait>(
        &self,
        conn: &C,
        key: PairwiseKey<'_>,
    ) -> Result<u64, PersistentIdError> {
        Ok(by_key(key).count(conn).await?)
    }

    async fn insert<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: &PersistentIdEntry,
    ) -> Result<(), PersistentIdError> {
        let model = entity::ActiveModel {
            id: ActiveValue::NotSet,
            issuer_id: ActiveValue::Set(entry.issuer_id.clone()),
            relying_party_id: ActiveValue::Set(entry.relying_party_id.clone()),
            local_id: ActiveValue::Set(entry.local_id.clone()),
            principal_name: ActiveValue::Set(entry.principal_name.clone()),
            persistent_id: ActiveValue::Set(entry.persistent_id.clone()),
            peer_provided_id: ActiveValue::Set(entry.peer_provided_id.clone()),
            creation_date: ActiveValue::Set(entry.creation_time),
            deactivation_date: ActiveValue::Set(entry.deactivation_time),
        };
        PersistentIdEntity::insert(model).exec(conn).await?;
        Ok(())
    }

    async fn deactivate<C: ConnectionTrait>(
        &self,
        conn: &C,
        persistent_id: &str,
        at: OffsetDateTime,
    ) -> Result<u64, PersistentIdError> {
        let res = PersistentIdEntity::update_many()
            .col_expr(Column::DeactivationDate, Expr::value(at))
            .filter(Column::PersistentId.eq(persistent_id))
            .filter(Column::DeactivationDate.is_null())
            .exec(conn)
            .await?;
        Ok(res.rows_affected)
    }

    async fn set_peer_provided_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        persistent_id: &str,
        peer_provided_id: &str,
    ) -> Result<u64, PersistentIdError> {
        let res = PersistentIdEntity::update_many()
            .col_expr(Column::PeerProvidedId, Expr::value(peer_provided_id))
            .filter(Column::PersistentId.eq(persistent_id))
            .filter(Column::DeactivationDate.is_null())
            .exec(conn)
            .await?;
        Ok(res.rows_affected)
    }
}
