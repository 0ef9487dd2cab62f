use serde::Deserialize;

use crate::pb;

/// Query-string shape shared by every list endpoint. Unset values travel as
/// zero on the wire; the services normalise to page 1 / size 10.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i32>,
    pub page_size: Option<i32>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn to_pb(&self) -> pb::Pagination {
        pb::Pagination {
            page: self.page.unwrap_or(0),
            page_size: self.page_size.unwrap_or(0),
            search: self.search.clone().unwrap_or_default(),
        }
    }
}

/// Query-string shape shared by every stats endpoint.
#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub year: i32,
    pub month: Option<u32>,
    pub card_number: Option<String>,
}

impl StatsParams {
    pub fn to_stats_request(&self, dimension: &str, grain: &str, scope: &str) -> pb::StatsRequest {
        pb::StatsRequest {
            dimension: dimension.to_string(),
            grain: grain.to_string(),
            scope: scope.to_string(),
            card_number: self.card_number.clone().unwrap_or_default(),
            year: self.year,
            month: self.month.unwrap_or(0),
        }
    }
}
