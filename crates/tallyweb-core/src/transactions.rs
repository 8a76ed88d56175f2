//! Transactions resource

use crate::bus::PubSub;
use crate::error::CoreResult;
use crate::model::{Query, ResourceModel, Table};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tallyweb_store::{Record, StoreRef};

/// Event published after a transaction has been stored; the payload is the new record
pub const TRANSACTION_CREATED: &str = "transaction-create";

pub struct Transactions {
    table: Table,
    bus: Arc<PubSub>,
}

impl Transactions {
    pub async fn new(store: StoreRef, bus: Arc<PubSub>) -> CoreResult<Self> {
        Ok(Self {
            table: Table::open("transactions", store).await?,
            bus,
        })
    }
}

#[async_trait]
impl ResourceModel for Transactions {
    fn name(&self) -> &str {
        self.table.resource()
    }

    async fn find(&self, _query: &Query) -> CoreResult<Vec<Record>> {
        self.table.find().await
    }

    async fn get(&self, index: &str) -> CoreResult<Record> {
        self.table.get(index).await
    }

    async fn post(&self, data: Record) -> CoreResult<Record> {
        let created = self.table.post(data).await?;
        self.bus.publish(TRANSACTION_CREATED, Value::Object(created.clone()));
        Ok(created)
    }

    async fn patch(&self, id: &Value, data: Record) -> CoreResult<Record> {
        self.table.patch(id, data).await
    }

    async fn delete(&self, id: &Value) -> CoreResult<()> {
        self.table.delete(id).await
    }
}
