//! Device listing pagination
//!
//! Pages are requested from 1 upwards. A page is only used when its envelope
//! is complete; any problem with it ends the walk for this cycle.

use serde_json::Value;

use crate::error::PageError;
use crate::tlink::models::DevicePage;
use crate::tlink::{Credential, TelemetryApi};

/// Listing `flag` value meaning success
pub const SUCCESS_FLAG: &str = "00";

/// A validated listing page
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    pub total: i64,
    pub devices: Vec<Value>,
}

pub async fn fetch_page(
    api: &dyn TelemetryApi,
    credential: &Credential,
    page: u32,
    page_size: u32,
) -> Result<ListingPage, PageError> {
    let body = api
        .request_device_page(&credential.token, credential.user_id, page, page_size)
        .await?;

    parse_page(&body).map_err(|e| {
        tracing::debug!("[DeviceSync] {}", body);
        e
    })
}

pub fn parse_page(body: &str) -> Result<ListingPage, PageError> {
    let envelope: DevicePage =
        serde_json::from_str(body).map_err(|e| PageError::Malformed(e.to_string()))?;

    let flag = envelope
        .flag
        .ok_or(PageError::MissingField("flag"))?
        .as_text();
    if flag != SUCCESS_FLAG {
        let msg = envelope
            .msg
            .map(|m| match m {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_default();
        return Err(PageError::Rejected { flag, msg });
    }

    let total = envelope
        .row_count
        .ok_or(PageError::MissingField("rowCount"))?
        .as_i64("rowCount")
        .map_err(|e| PageError::Malformed(e.to_string()))?;

    let devices = match envelope.data_list {
        None | Some(Value::Null) => return Err(PageError::MissingField("dataList")),
        Some(Value::Array(devices)) => devices,
        Some(_) => return Err(PageError::NotAnArray("dataList")),
    };

    Ok(ListingPage { total, devices })
}

/// Another page is fetched only after a full page that has not reached `total` yet
pub fn has_next_page(page: u32, page_size: u32, returned: usize, total: i64) -> bool {
    returned == page_size as usize && i64::from(page) * i64::from(page_size) < total
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_next_page() {
        assert!(has_next_page(1, 100, 100, 250));
        assert!(has_next_page(2, 100, 100, 250));
        assert!(!has_next_page(3, 100, 50, 250));
        assert!(!has_next_page(1, 100, 100, 100));
        // a short page stops the walk whatever the total says
        assert!(!has_next_page(1, 100, 57, 1000));
        assert!(!has_next_page(1, 100, 0, 0));
    }

    #[test]
    fn test_parse_valid_page() {
        let body = json!({
            "flag": "00",
            "rowCount": 2,
            "dataList": [{"id": 1}, {"id": 2}]
        })
        .to_string();

        let page = parse_page(&body).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.devices.len(), 2);
    }

    #[test]
    fn test_parse_rejected_flag() {
        let body = json!({"flag": "01", "msg": "token invalid"}).to_string();
        assert_eq!(
            parse_page(&body),
            Err(PageError::Rejected {
                flag: "01".to_string(),
                msg: "token invalid".to_string()
            })
        );
    }

    #[test]
    fn test_parse_missing_fields() {
        let body = json!({"rowCount": 1, "dataList": []}).to_string();
        assert_eq!(parse_page(&body), Err(PageError::MissingField("flag")));

        let body = json!({"flag": "00", "dataList": []}).to_string();
        assert_eq!(parse_page(&body), Err(PageError::MissingField("rowCount")));

        let body = json!({"flag": "00", "rowCount": 1, "dataList": null}).to_string();
        assert_eq!(parse_page(&body), Err(PageError::MissingField("dataList")));

        let body = json!({"flag": "00", "rowCount": 1, "dataList": {"id": 1}}).to_string();
        assert_eq!(parse_page(&body), Err(PageError::NotAnArray("dataList")));
    }

    #[test]
    fn test_parse_not_json() {
        assert!(matches!(parse_page("oops"), Err(PageError::Malformed(_))));
    }
}
