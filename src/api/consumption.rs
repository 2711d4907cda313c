use std::fmt;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{LinkyError, PortalClient, PortalResponse};

use super::{parse_api_date, DateRange};

/// Sample value the portal uses for a slot nobody asked for
pub const DATA_NOT_REQUESTED: f64 = -1.0;
/// Sample value the portal uses for a slot the meter did not report
pub const DATA_NOT_AVAILABLE: f64 = -2.0;

/// Shown in place of the JSON payload when the account must accept new
/// terms of use on the website.
const TERMS_OF_USE_MARKER: &str = "Conditions d'utilisation";

const PORTLET_ID: &str = "lincspartdisplaycdc_WAR_lincspartcdcportlet";

pub struct ConsumptionClient<'a> {
    client: &'a dyn PortalClient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// Half-hourly power, despite the name the portal gives it
    Hour,
    Day,
    Month,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Hour,
        Granularity::Day,
        Granularity::Month,
        Granularity::Year,
    ];

    pub fn requires_range(&self) -> bool {
        !matches!(self, Granularity::Year)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resource_id = match self {
            Granularity::Hour => "urlCdcHeure",
            Granularity::Day => "urlCdcJour",
            Granularity::Month => "urlCdcMois",
            Granularity::Year => "urlCdcAn",
        };
        write!(f, "{}", resource_id)
    }
}

#[derive(Deserialize, Debug)]
pub struct PortalReply {
    pub etat: Option<Etat>,
    pub graphe: Option<Graphe>,
}

#[derive(Deserialize, Debug)]
pub struct Etat {
    pub valeur: String,
    #[serde(rename = "erreurText")]
    pub erreur_text: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Graphe {
    pub data: Vec<DataPoint>,
    pub periode: Periode,
    pub decalage: i64,
    #[serde(rename = "puissanceSouscrite")]
    pub puissance_souscrite: Option<f64>,
}

#[derive(Deserialize, Debug)]
pub struct Periode {
    #[serde(rename = "dateDebut")]
    pub date_debut: String,
    #[serde(rename = "dateFin")]
    pub date_fin: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct DataPoint {
    pub ordre: i64,
    pub valeur: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub index: i64,
    /// Never negative
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionSeries {
    pub granularity: Granularity,
    /// Start of the period, as reported by the portal
    pub period_start: NaiveDate,
    /// Number of steps between `period_start` and the first sample
    pub offset: i64,
    /// 0 when the portal does not know it
    pub subscribed_power_limit: f64,
    pub samples: Vec<Sample>,
}

impl ConsumptionSeries {
    fn from_graphe(granularity: Granularity, graphe: Graphe) -> Result<Self, LinkyError> {
        let period_start = parse_api_date(&graphe.periode.date_debut)?;

        let subscribed_power_limit = match graphe.puissance_souscrite {
            Some(limit) if limit > 0.0 => limit,
            _ => 0.0,
        };

        let mut clamped = 0;
        let samples = graphe
            .data
            .into_iter()
            .map(|point| {
                if point.valeur < 0.0 {
                    clamped += 1;
                }
                Sample {
                    index: point.ordre,
                    value: point.valeur.max(0.0),
                }
            })
            .collect::<Vec<_>>();

        if clamped > 0 {
            debug!(
                granularity = ?granularity,
                clamped, "replaced portal sentinel values with zero"
            );
        }

        Ok(Self {
            granularity,
            period_start,
            offset: graphe.decalage,
            subscribed_power_limit,
            samples,
        })
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }
}

impl<'a> ConsumptionClient<'a> {
    const DATA_URL: &'static str = "/suivi-de-consommation";

    pub fn new(client: &'a dyn PortalClient) -> Self {
        Self { client }
    }

    /// Half-hourly power over `range`
    pub fn per_hour(&self, range: DateRange) -> Result<ConsumptionSeries, LinkyError> {
        self.fetch(Granularity::Hour, Some(range))
    }

    pub fn per_day(&self, range: DateRange) -> Result<ConsumptionSeries, LinkyError> {
        self.fetch(Granularity::Day, Some(range))
    }

    pub fn per_month(&self, range: DateRange) -> Result<ConsumptionSeries, LinkyError> {
        self.fetch(Granularity::Month, Some(range))
    }

    /// The portal picks the window for yearly data.
    pub fn per_year(&self) -> Result<ConsumptionSeries, LinkyError> {
        self.fetch(Granularity::Year, None)
    }

    /// Retrieves one consumption series.
    ///
    /// The range is ignored for [`Granularity::Year`] and mandatory otherwise.
    /// A redirect is answered by sending the very same request once more;
    /// it is never followed.
    pub fn fetch(
        &self,
        granularity: Granularity,
        range: Option<DateRange>,
    ) -> Result<ConsumptionSeries, LinkyError> {
        let qs = Self::query_string(granularity);

        let form = match (granularity.requires_range(), range) {
            (false, _) => vec![],
            (true, Some(range)) => range.to_form(&format!("_{}", PORTLET_ID)),
            (true, None) => return Err(LinkyError::MissingDateRange(granularity)),
        };

        info!(granularity = ?granularity, range = ?range, "retrieving consumption data");

        let mut response = self.client.http_post(Self::DATA_URL, &qs, &form)?;
        if response.is_redirect() {
            debug!(status = response.status, "portal redirected, sending the request again");
            response = self.client.http_post(Self::DATA_URL, &qs, &form)?;
        }

        let graphe = Self::decode(response)?;
        ConsumptionSeries::from_graphe(granularity, graphe)
    }

    fn query_string(granularity: Granularity) -> Vec<(String, String)> {
        [
            ("p_p_id", PORTLET_ID.to_string()),
            ("p_p_lifecycle", "2".to_string()),
            ("p_p_state", "normal".to_string()),
            ("p_p_mode", "view".to_string()),
            ("p_p_resource_id", granularity.to_string()),
            ("p_p_cacheability", "cacheLevelPage".to_string()),
            ("p_p_col_id", "column-1".to_string()),
            ("p_p_col_pos", "1".to_string()),
            ("p_p_col_count", "3".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn decode(response: PortalResponse) -> Result<Graphe, LinkyError> {
        if response.status == 200 && response.body.contains(TERMS_OF_USE_MARKER) {
            warn!("portal asks for the latest terms of use to be accepted");
            return Err(LinkyError::Authentication(
                "You need to accept the latest Terms of Use. \
                 Please manually log into the website, then come back."
                    .to_string(),
            ));
        }

        let reply: PortalReply = serde_json::from_str(&response.body).map_err(|e| {
            LinkyError::MalformedResponse(format!(
                "HTTP {} with a body that is not a consumption payload: {}",
                response.status, e
            ))
        })?;

        if let Some(etat) = reply.etat.filter(|etat| etat.valeur == "erreur") {
            let message = etat
                .erreur_text
                .as_deref()
                .map(unescape_html)
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| "The portal reported an unspecified error".to_string());
            return Err(LinkyError::Service(message));
        }

        reply
            .graphe
            .ok_or_else(|| LinkyError::MalformedResponse("no 'graphe' in payload".to_string()))
    }
}

// Error texts are HTML fragments; non-breaking spaces become plain ones.
fn unescape_html(text: &str) -> String {
    html_escape::decode_html_entities(text)
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}
