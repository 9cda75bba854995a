use std::{convert::Infallible, sync::Arc};

use warp::{filters::BoxedFilter, reply::Response, Filter, Reply};

use crate::{
    auth::{self, SessionUser},
    chat::{user_connected, ChatRoom},
    pages, SharedState,
};

fn with_room(
    room: Arc<ChatRoom>,
) -> impl Filter<Extract = (Arc<ChatRoom>,), Error = Infallible> + Clone {
    warp::any().map(move || room.clone())
}

async fn upgrade_connection(ws: warp::ws::Ws, room: Arc<ChatRoom>) -> Result<Response, Infallible> {
    // This will call our function if the handshake succeeds.
    Ok(ws
        .on_upgrade(move |socket| user_connected(socket, room))
        .into_response())
}

// GET /joey-chat -> chat page, session required
fn page(state: &SharedState) -> BoxedFilter<(Response,)> {
    warp::path!("joey-chat")
        .and(warp::get())
        .and(auth::authenticate(state.keys.clone()))
        .map(|user: SessionUser| pages::chat(&user).into_response())
        .boxed()
}

// GET /chat/ws -> websocket upgrade
fn ws_upgrade(state: &SharedState) -> BoxedFilter<(Response,)> {
    warp::path!("chat" / "ws")
        // The `ws()` filter will prepare Websocket handshake...
        .and(warp::ws())
        .and(with_room(state.chat.clone()))
        .and_then(upgrade_connection)
        .boxed()
}

pub(super) fn filters(state: SharedState) -> BoxedFilter<(Response,)> {
    page(&state).or(ws_upgrade(&state)).unify().boxed()
}
