//! The route table.
//!
//! Each submodule contributes a boxed group of filters; [`build_filters`]
//! joins them, falls back to the 404 page and attaches request logging.

use std::convert::Infallible;

use warp::{filters::BoxedFilter, reply::Response, Filter, Reply};

use crate::{auth, error::handle_rejection, pages, SharedState};

mod account;
mod chat;
mod items;
mod weather;

pub(crate) fn with_state(
    state: SharedState,
) -> impl Filter<Extract = (SharedState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

// GET / -> welcome page
fn index(state: &SharedState) -> BoxedFilter<(Response,)> {
    warp::path::end()
        .and(warp::get())
        .and(auth::current_user(state.keys.clone()))
        .map(|user: Option<auth::SessionUser>| pages::index(user.as_ref()).into_response())
        .boxed()
}

/// Every route without the rejection handler.
pub fn routes(state: SharedState) -> BoxedFilter<(Response,)> {
    index(&state)
        .or(weather::filters(state.clone()))
        .unify()
        .or(account::filters(state.clone()))
        .unify()
        .or(chat::filters(state.clone()))
        .unify()
        .or(items::filters(state))
        .unify()
        .boxed()
}

pub fn build_filters(
    state: SharedState,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    routes(state)
        .recover(handle_rejection)
        .with(warp::log("weather_app"))
}
