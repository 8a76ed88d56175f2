//! Route table for the v1 API
//!
//! | Method | Path | Verb |
//! |---|---|---|
//! | GET | /v1/{resource} | find |
//! | POST | /v1/{resource} | post |
//! | GET | /v1/{resource}/:id | get (positional index) |
//! | PATCH | /v1/{resource}/:id | patch |
//! | DELETE | /v1/{resource}/:id | delete |

use crate::dispatch::Verb;
use crate::Application;
use std::sync::Arc;
use tallyweb_config::Config;
use tallyweb_core::{Categories, CoreResult, ModelRef, Transactions};
use tallyweb_store::JsonFileStore;

pub const TRANSACTIONS_PATH: &str = "/v1/transactions";
pub const CATEGORIES_PATH: &str = "/v1/categories";

/// Open both resource models and register their routes
pub async fn register_routes(app: &mut Application, config: &Config) -> CoreResult<()> {
    let bus = app.pub_sub();

    let transactions: ModelRef = Arc::new(
        Transactions::new(Arc::new(JsonFileStore::new(config.transactions_path())), bus.clone()).await?,
    );
    let categories: ModelRef = Arc::new(
        Categories::new(Arc::new(JsonFileStore::new(config.categories_path())), &bus).await?,
    );

    register_resource(app, TRANSACTIONS_PATH, transactions);
    register_resource(app, CATEGORIES_PATH, categories);
    Ok(())
}

fn register_resource(app: &mut Application, base: &str, model: ModelRef) {
    let item = format!("{}/:id", base);

    app.register_route(base, Verb::Find, model.clone());
    app.register_route(&item, Verb::Get, model.clone());
    app.register_route(base, Verb::Post, model.clone());
    app.register_route(&item, Verb::Patch, model.clone());
    app.register_route(&item, Verb::Delete, model);
}
