use crate::errors::EstimateError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

pub const PVWATTS_ENDPOINT: &str = "https://developer.nrel.gov/api/pvwatts/v8.json";

// fixed array description sent with every request
const MODULE_TYPE: u8 = 0; // standard
const LOSSES: f64 = 14.08; // percent
const ARRAY_TYPE: u8 = 0; // fixed, open rack
const TILT: u32 = 20; // degrees
const AZIMUTH: u32 = 180; // degrees, due south

pub const MONTHS_IN_YEAR: usize = 12;

#[derive(Clone, Debug)]
pub struct EstimateRequest<'a> {
    pub api_key: &'a str,
    /// kW
    pub system_capacity: i64,
    pub address: &'a str,
}

impl EstimateRequest<'_> {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("format", "json".to_string()),
            ("api_key", self.api_key.to_string()),
            ("system_capacity", self.system_capacity.to_string()),
            ("module_type", MODULE_TYPE.to_string()),
            ("losses", LOSSES.to_string()),
            ("array_type", ARRAY_TYPE.to_string()),
            ("tilt", TILT.to_string()),
            ("azimuth", AZIMUTH.to_string()),
            ("address", self.address.to_string()),
        ]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MonthlyProduction {
    /// kWh/m²/day
    pub solar_radiation: [f64; MONTHS_IN_YEAR],
    /// kWh
    pub ac_energy: [f64; MONTHS_IN_YEAR],
}

impl MonthlyProduction {
    pub fn average_solar_radiation(&self) -> f64 {
        self.solar_radiation.iter().sum::<f64>() / MONTHS_IN_YEAR as f64
    }

    pub fn total_ac_energy(&self) -> f64 {
        self.ac_energy.iter().sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProductionEstimate {
    /// kWh
    pub annual_ac_energy: f64,
    pub monthly: MonthlyProduction,
}

/// A source of annual and monthly production estimates for a proposed array.
pub trait EnergyEstimator {
    fn estimate(&self, request: &EstimateRequest<'_>) -> Result<ProductionEstimate, EstimateError>;
}

/// Client for the NREL PVWatts v8 service.
#[derive(Debug)]
pub struct PvWattsClient {
    client: Client,
    endpoint: String,
}

impl PvWattsClient {
    /// Returns a new client
    ///
    /// # Arguments
    ///
    /// * 'endpoint' - full URL of the PVWatts JSON endpoint
    /// * 'timeout' - request timeout, or None to wait indefinitely
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, EstimateError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl EnergyEstimator for PvWattsClient {
    fn estimate(&self, request: &EstimateRequest<'_>) -> Result<ProductionEstimate, EstimateError> {
        info!(
            "requesting PVWatts estimate for {} kW at {}",
            request.system_capacity, request.address
        );

        let response = self
            .client
            .get(&self.endpoint)
            .query(&request.query())
            .send()?;

        let status = response.status();
        let body = response.text()?;
        debug!("PVWatts responded with {status}");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EstimateError::Unauthorized(status.as_u16()));
        }

        match parse_estimate(&body) {
            Ok(estimate) if status.is_success() => Ok(estimate),
            Err(err @ EstimateError::ServiceErrors(_)) => Err(err),
            _ if !status.is_success() => Err(EstimateError::Status {
                status: status.as_u16(),
                body,
            }),
            result => result,
        }
    }
}

#[derive(Deserialize)]
struct PvWattsResponse {
    #[serde(default)]
    errors: Vec<String>,
    outputs: Option<Value>,
}

#[derive(Deserialize)]
struct PvWattsOutputs {
    ac_annual: Option<f64>,
    solrad_monthly: Option<Vec<f64>>,
    ac_monthly: Option<Vec<f64>>,
}

/// Extracts the annual and monthly production from a PVWatts JSON body.
pub(crate) fn parse_estimate(body: &str) -> Result<ProductionEstimate, EstimateError> {
    let response: PvWattsResponse = serde_json::from_str(body)?;

    if !response.errors.is_empty() {
        return Err(EstimateError::ServiceErrors(response.errors));
    }

    let outputs: PvWattsOutputs =
        serde_json::from_value(response.outputs.ok_or(EstimateError::MissingField("outputs"))?)?;

    Ok(ProductionEstimate {
        annual_ac_energy: outputs
            .ac_annual
            .ok_or(EstimateError::MissingField("ac_annual"))?,
        monthly: MonthlyProduction {
            solar_radiation: monthly_series("solrad_monthly", outputs.solrad_monthly)?,
            ac_energy: monthly_series("ac_monthly", outputs.ac_monthly)?,
        },
    })
}

fn monthly_series(
    field: &'static str,
    values: Option<Vec<f64>>,
) -> Result<[f64; MONTHS_IN_YEAR], EstimateError> {
    let values = values.ok_or(EstimateError::MissingField(field))?;

    <[f64; MONTHS_IN_YEAR]>::try_from(values).map_err(|values| EstimateError::WrongSeriesLength {
        field,
        actual: values.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    #[fixture]
    fn solrad() -> Vec<f64> {
        vec![
            2.61, 3.42, 4.37, 5.21, 5.64, 6.02, 6.01, 5.58, 4.91, 3.86, 2.69, 2.23,
        ]
    }

    #[fixture]
    fn ac() -> Vec<f64> {
        vec![
            7012.4, 8302.1, 11205.7, 12710.3, 13650.9, 13822.5, 14015.2, 13380.8, 11920.6,
            10010.1, 7220.3, 6120.9,
        ]
    }

    #[fixture]
    fn success_body(solrad: Vec<f64>, ac: Vec<f64>) -> String {
        json!({
            "inputs": {"system_capacity": "150"},
            "errors": [],
            "warnings": [],
            "outputs": {
                "ac_annual": 129371.8,
                "solrad_monthly": solrad,
                "ac_monthly": ac,
            }
        })
        .to_string()
    }

    fn request() -> EstimateRequest<'static> {
        EstimateRequest {
            api_key: "DEMO_KEY",
            system_capacity: 150,
            address: "16802",
        }
    }

    #[rstest]
    fn should_parse_successful_response(success_body: String, solrad: Vec<f64>) {
        let estimate = parse_estimate(&success_body).unwrap();

        assert_eq!(estimate.annual_ac_energy, 129371.8);
        assert_eq!(estimate.monthly.solar_radiation.to_vec(), solrad);
        assert_relative_eq!(estimate.monthly.total_ac_energy(), 129371.8, epsilon = 1e-6);
        assert_relative_eq!(
            estimate.monthly.average_solar_radiation(),
            52.55 / 12.,
            epsilon = 1e-9
        );
    }

    #[rstest]
    fn should_report_service_errors() {
        let body = json!({"errors": ["address not found"], "outputs": []}).to_string();

        assert!(matches!(
            parse_estimate(&body),
            Err(EstimateError::ServiceErrors(errors)) if errors == vec!["address not found"]
        ));
    }

    #[rstest]
    fn should_report_missing_fields(solrad: Vec<f64>) {
        let no_outputs = json!({"errors": []}).to_string();
        assert!(matches!(
            parse_estimate(&no_outputs),
            Err(EstimateError::MissingField("outputs"))
        ));

        let no_ac_monthly =
            json!({"outputs": {"ac_annual": 1.0, "solrad_monthly": solrad}}).to_string();
        assert!(matches!(
            parse_estimate(&no_ac_monthly),
            Err(EstimateError::MissingField("ac_monthly"))
        ));
    }

    #[rstest]
    fn should_report_wrong_series_length(ac: Vec<f64>) {
        let body = json!({"outputs": {
            "ac_annual": 1.0,
            "solrad_monthly": [1.0, 2.0],
            "ac_monthly": ac,
        }})
        .to_string();

        assert!(matches!(
            parse_estimate(&body),
            Err(EstimateError::WrongSeriesLength {
                field: "solrad_monthly",
                actual: 2
            })
        ));
    }

    #[rstest]
    fn should_report_malformed_payload() {
        assert!(matches!(
            parse_estimate("<html>Service Unavailable</html>"),
            Err(EstimateError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_estimate(r#"{"outputs": {"ac_annual": "lots"}}"#),
            Err(EstimateError::MalformedPayload(_))
        ));
    }

    #[rstest]
    fn should_send_fixed_array_parameters(success_body: String) {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/api/pvwatts/v8.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "json".into()),
                Matcher::UrlEncoded("api_key".into(), "DEMO_KEY".into()),
                Matcher::UrlEncoded("system_capacity".into(), "150".into()),
                Matcher::UrlEncoded("module_type".into(), "0".into()),
                Matcher::UrlEncoded("losses".into(), "14.08".into()),
                Matcher::UrlEncoded("array_type".into(), "0".into()),
                Matcher::UrlEncoded("tilt".into(), "20".into()),
                Matcher::UrlEncoded("azimuth".into(), "180".into()),
                Matcher::UrlEncoded("address".into(), "16802".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(success_body)
            .create();

        let client =
            PvWattsClient::new(&format!("{}/api/pvwatts/v8.json", server.url()), None).unwrap();
        let estimate = client.estimate(&request()).unwrap();

        mock.assert();
        assert_eq!(estimate.annual_ac_energy, 129371.8);
    }

    #[rstest]
    fn should_distinguish_unauthorized() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error": {"code": "API_KEY_INVALID"}}"#)
            .create();

        let client = PvWattsClient::new(&server.url(), None).unwrap();

        assert!(matches!(
            client.estimate(&request()),
            Err(EstimateError::Unauthorized(403))
        ));
    }

    #[rstest]
    fn should_surface_service_errors_on_unprocessable_request() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(422)
            .with_body(json!({"errors": ["system_capacity must be positive"]}).to_string())
            .create();

        let client = PvWattsClient::new(&server.url(), None).unwrap();

        assert!(matches!(
            client.estimate(&request()),
            Err(EstimateError::ServiceErrors(_))
        ));
    }

    #[rstest]
    fn should_report_http_status_with_body() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create();

        let client = PvWattsClient::new(&server.url(), None).unwrap();

        match client.estimate(&request()) {
            Err(EstimateError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[rstest]
    fn should_report_transport_failure() {
        // nothing listens on the discard port
        let client = PvWattsClient::new("http://127.0.0.1:9/pvwatts", None).unwrap();

        assert!(matches!(
            client.estimate(&request()),
            Err(EstimateError::Transport(_))
        ));
    }
}
