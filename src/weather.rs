//! OpenWeatherMap "current weather" client.

use log::error;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("upstream rejected the API key")]
    InvalidApiKey,

    #[error("city not found")]
    CityNotFound,

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Readings {
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: i64,
    pub humidity: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sys {
    pub country: Option<String>,
}

/// The subset of the upstream payload the weather page shows.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherReport {
    pub name: String,
    #[serde(rename = "weather", default)]
    pub conditions: Vec<Condition>,
    pub main: Readings,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub sys: Sys,
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        WeatherClient {
            http: reqwest::Client::new(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Current conditions for `city` in metric units.
    pub async fn current(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(WeatherError::InvalidApiKey),
            StatusCode::NOT_FOUND => Err(WeatherError::CityNotFound),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                error!("weather upstream returned {}: {}", status, body);
                Err(WeatherError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            _ => Ok(response.json::<WeatherReport>().await?),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    pub(crate) fn london() -> serde_json::Value {
        json!({
            "coord": { "lon": -0.1257, "lat": 51.5085 },
            "weather": [{ "id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d" }],
            "main": { "temp": 14.2, "feels_like": 13.6, "temp_min": 12.9, "temp_max": 15.3, "pressure": 1012, "humidity": 76 },
            "wind": { "speed": 4.12, "deg": 250 },
            "sys": { "country": "GB" },
            "name": "London",
            "cod": 200
        })
    }

    fn client_for(server: &MockServer) -> WeatherClient {
        WeatherClient::new(format!("{}/data/2.5/weather", server.uri()), "test-key")
    }

    #[tokio::test]
    async fn sends_metric_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "London"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london()))
            .expect(1)
            .mount(&server)
            .await;

        let report = client_for(&server).current("London").await.unwrap();
        assert_eq!(report.name, "London");
        assert_eq!(report.sys.country.as_deref(), Some("GB"));
        assert_eq!(report.conditions[0].description, "broken clouds");
        assert_eq!(report.main.humidity, 76);
    }

    #[tokio::test]
    async fn maps_upstream_statuses() {
        let server = MockServer::start().await;
        Mock::given(query_param("q", "Nowhere"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "cod": "404", "message": "city not found" })),
            )
            .mount(&server)
            .await;
        Mock::given(query_param("q", "Locked"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(query_param("q", "Broken"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;
        Mock::given(query_param("q", "Garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.current("Nowhere").await,
            Err(WeatherError::CityNotFound)
        ));
        assert!(matches!(
            client.current("Locked").await,
            Err(WeatherError::InvalidApiKey)
        ));
        match client.current("Broken").await {
            Err(WeatherError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            client.current("Garbled").await,
            Err(WeatherError::Request(_))
        ));
    }
}
