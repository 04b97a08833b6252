mod http_debt_position_api;
mod request_builder;

pub use http_debt_position_api::HttpDebtPositionApi;
pub use request_builder::{ApiRequest, bulk_request, single_request};
