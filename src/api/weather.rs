use std::convert::Infallible;

use log::error;
use serde::Deserialize;
use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Reply};

use super::with_state;
use crate::{
    auth::{self, SessionUser},
    pages,
    weather::WeatherError,
    SharedState,
};

#[derive(Debug, Deserialize)]
struct WeatherQuery {
    city: Option<String>,
}

async fn weather_page(
    query: WeatherQuery,
    user: Option<SessionUser>,
    state: SharedState,
) -> Result<Response, Infallible> {
    let city = match query.city.as_deref().map(str::trim) {
        Some(city) if !city.is_empty() => city.to_owned(),
        _ => return Ok(pages::weather_form(user.as_ref()).into_response()),
    };

    let response = match state.weather.current(&city).await {
        Ok(report) => pages::weather(user.as_ref(), &city, &report).into_response(),
        Err(e) => {
            error!("weather lookup for {:?} failed: {}", city, e);
            let (status, title, message) = match e {
                WeatherError::InvalidApiKey => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Weather Error",
                    "Error: Invalid API key. Please check your OpenWeatherMap API key.",
                ),
                WeatherError::CityNotFound => {
                    (StatusCode::NOT_FOUND, "City Not Found", "City not found")
                }
                WeatherError::Status { .. } | WeatherError::Request(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Weather Error",
                    "Error fetching weather data",
                ),
            };
            pages::weather_error(user.as_ref(), status, title, message, &city)
        }
    };
    Ok(response)
}

// GET /weather?city={city} -> form, report or error page
pub(super) fn filters(state: SharedState) -> BoxedFilter<(Response,)> {
    warp::path!("weather")
        .and(warp::get())
        .and(warp::query::<WeatherQuery>())
        .and(auth::current_user(state.keys.clone()))
        .and(with_state(state))
        .and_then(weather_page)
        .boxed()
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{method, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use crate::{
        api::test_support::{body_text, Harness},
        weather::tests::london,
    };

    async fn upstream() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london()))
            .mount(&server)
            .await;
        Mock::given(query_param("q", "Atlantis"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(query_param("q", "Revoked"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(query_param("q", "Overloaded"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn form_without_city() {
        let harness = Harness::new().await;
        let filter = harness.filter();

        for path in &["/weather", "/weather?city=", "/weather?city=%20%20"] {
            let reply = warp::test::request().path(path).reply(&filter).await;
            assert_eq!(reply.status(), 200);
            assert!(body_text(&reply).contains(r#"name="city""#));
        }
    }

    #[tokio::test]
    async fn renders_report() {
        let server = upstream().await;
        let harness =
            Harness::with_weather_url(&format!("{}/data/2.5/weather", server.uri())).await;

        let reply = warp::test::request()
            .path("/weather?city=London")
            .reply(&harness.filter())
            .await;
        assert_eq!(reply.status(), 200);
        let body = body_text(&reply);
        assert!(body.contains("Weather for London"));
        assert!(body.contains("London, GB"));
        assert!(body.contains("broken clouds"));
        assert!(body.contains("14.2"));
    }

    #[tokio::test]
    async fn upstream_failures_map_to_error_pages() {
        let server = upstream().await;
        let harness =
            Harness::with_weather_url(&format!("{}/data/2.5/weather", server.uri())).await;
        let filter = harness.filter();

        let missing = warp::test::request()
            .path("/weather?city=Atlantis")
            .reply(&filter)
            .await;
        assert_eq!(missing.status(), 404);
        assert!(body_text(&missing).contains("City not found"));

        let bad_key = warp::test::request()
            .path("/weather?city=Revoked")
            .reply(&filter)
            .await;
        assert_eq!(bad_key.status(), 500);
        assert!(body_text(&bad_key).contains("Invalid API key"));

        let other = warp::test::request()
            .path("/weather?city=Overloaded")
            .reply(&filter)
            .await;
        assert_eq!(other.status(), 500);
        assert!(body_text(&other).contains("Error fetching weather data"));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_500() {
        let harness = Harness::new().await;
        let reply = warp::test::request()
            .path("/weather?city=London")
            .reply(&harness.filter())
            .await;
        assert_eq!(reply.status(), 500);
        assert!(body_text(&reply).contains("Error fetching weather data"));
    }
}
