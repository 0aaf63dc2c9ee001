// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Result;
use serde_json::json;
use tracing::info;
use tradepost::api::{DispatcherExt, Method, RequestDescriptor};
use tradepost::logging::init_logging;
use tradepost::simulated::SimulatedBackendBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    // A backend with one collectible in the collection and a wantlist endpoint echoing the id
    let backend = SimulatedBackendBuilder::new()
        .respond(
            Method::Get,
            "/collection/get",
            json!([{"id": 3, "name": "Holo dragon", "campaign": "Spring drop"}]),
        )
        .handle(Method::Post, "/wantlist/add", |body| {
            json!({"collectible_id": body.map(|body| body["collectible_id"].clone())})
        })
        .build();

    let count = backend
        .dispatch(
            |collection, label| {
                let count = collection.as_array().map_or(0, Vec::len);
                info!("{label}: {count} collectible(s)");
                count
            },
            &RequestDescriptor::get("/collection/get")?,
            "collection",
        )
        .await?;
    println!("Collection size: {count}");

    let added = backend
        .fetch(&RequestDescriptor::post_json(
            "/wantlist/add",
            &json!({"collectible_id": 7}),
        )?)
        .await?;
    println!("Added to wantlist: {added}");

    // Routes the backend doesn't know come back as application errors, the continuation never runs
    let result = backend
        .dispatch(|_, _| (), &RequestDescriptor::delete("/offers/12")?, ())
        .await;
    if let Err(err) = result {
        println!("Error banner: {}", err.to_payload());
    }

    println!("Requests sent: {}", backend.requests().len());

    Ok(())
}
