//! The legacy JSON API: items and the protected-route probe.

use std::convert::Infallible;

use log::error;
use serde::{Deserialize, Serialize};
use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Reply};

use super::with_state;
use crate::{auth, db, error::json_error, SharedState};

#[derive(Debug, Deserialize)]
struct NewItem {
    name: String,
    description: Option<String>,
}

#[derive(Serialize)]
struct Protected {
    message: &'static str,
    #[serde(rename = "userId")]
    user_id: i64,
}

async fn list_items(state: SharedState) -> Result<Response, Infallible> {
    let response = match db::list_items(&state.db).await {
        Ok(items) => warp::reply::json(&items).into_response(),
        Err(e) => {
            error!("listing items failed: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching items")
        }
    };
    Ok(response)
}

async fn add_item(item: NewItem, state: SharedState) -> Result<Response, Infallible> {
    let response =
        match db::insert_item(&state.db, &item.name, item.description.as_deref()).await {
            Ok(id) => warp::reply::with_status(
                warp::reply::json(&db::Item {
                    id,
                    name: item.name,
                    description: item.description,
                }),
                StatusCode::CREATED,
            )
            .into_response(),
            Err(e) => {
                error!("adding item failed: {}", e);
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "Error adding item")
            }
        };
    Ok(response)
}

pub(super) fn filters(state: SharedState) -> BoxedFilter<(Response,)> {
    // GET /api/protected -> bearer token or session cookie required
    let protected = warp::path!("api" / "protected")
        .and(warp::get())
        .and(auth::api_authenticate(state.keys.clone()))
        .map(|user_id: i64| {
            warp::reply::json(&Protected {
                message: "This is a protected route",
                user_id,
            })
            .into_response()
        });

    // GET /api/items -> every item
    let list = warp::path!("api" / "items")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_items);

    // POST /api/items {name, description} -> created item
    let add = warp::path!("api" / "items")
        .and(warp::post())
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::json::<NewItem>())
        .and(with_state(state))
        .and_then(add_item);

    protected.or(list).unify().or(add).unify().boxed()
}
