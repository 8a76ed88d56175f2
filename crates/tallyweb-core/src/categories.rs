//! Categories resource
//!
//! A category keeps a running `value`. Every created transaction adds its
//! `value` to the category named by its `category` field.

use crate::bus::PubSub;
use crate::error::CoreResult;
use crate::model::{Query, ResourceModel, Table};
use crate::transactions::TRANSACTION_CREATED;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tallyweb_store::{Record, StoreRef};

pub struct Categories {
    table: Arc<Table>,
}

impl Categories {
    /// Open the categories table and start following created transactions
    pub async fn new(store: StoreRef, bus: &PubSub) -> CoreResult<Self> {
        let table = Arc::new(Table::open("categories", store).await?);

        let handler_table = table.clone();
        bus.subscribe(TRANSACTION_CREATED, move |payload| {
            let table = handler_table.clone();
            async move { apply_transaction(&table, payload).await }
        });

        Ok(Self { table })
    }
}

async fn apply_transaction(table: &Table, payload: Value) -> CoreResult<()> {
    let category = payload.get("category").cloned().unwrap_or_else(|| json!(""));
    let value = payload.get("value").cloned().unwrap_or_else(|| json!(0));

    let mut delta = Record::new();
    delta.insert("value".to_string(), value.clone());
    table.patch(&category, delta).await?;

    log::debug!(
        target: "tallyweb::categories",
        "Updated category {}",
        json!({ "category": category, "value": value })
    );
    Ok(())
}

#[async_trait]
impl ResourceModel for Categories {
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
        self.table.post(data).await
    }

    async fn patch(&self, id: &Value, data: Record) -> CoreResult<Record> {
        self.table.patch(id, data).await
    }

    async fn delete(&self, id: &Value) -> CoreResult<()> {
        self.table.delete(id).await
    }
}
