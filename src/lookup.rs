//! 버스 도착 정보 조회
//!
//! 경기도 버스도착정보 API에서 노선별 첫 번째 도착 예정 버스를 가져와
//! 안내 문장으로 만든다. 네트워크/해석 오류는 "실패" 문장으로 바뀌고
//! 호출자에게 오류로 전달되지 않는다.

use crate::config::LookupConfig;
use crate::registry::parse_list;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// 여러 버스의 안내를 이어 붙이는 구분자
pub const REPORT_SEPARATOR: &str = " 그리고, ";

pub const NO_SAVED_BUSES: &str = "저장된 버스 정보가 없습니다.";
pub const LIST_READ_FAILED: &str = "버스 번호 파일을 읽는 데 실패했습니다.";

/// 도착 정보 조회기
pub struct ArrivalLookup {
    client: reqwest::Client,
    endpoint: String,
    service_key: String,
    station_id: String,
    sta_order: String,
    routes: BTreeMap<String, String>,
}

impl ArrivalLookup {
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("도착 정보 HTTP 클라이언트 생성 실패")?;

        if config.service_key.is_empty() {
            log::warn!("lookup.service_key가 비어 있습니다. 조회가 실패할 수 있습니다.");
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            service_key: config.service_key.clone(),
            station_id: config.station_id.clone(),
            sta_order: config.sta_order.clone(),
            routes: config.routes.clone(),
        })
    }

    /// 노선 ID (대응표에 없으면 None)
    pub fn route_id(&self, bus: &str) -> Option<&str> {
        self.routes.get(bus).map(String::as_str)
    }

    /// 요청 URL
    ///
    /// 서비스 키는 이미 URL 인코딩된 값이므로 다시 인코딩하지 않고 그대로 붙인다.
    fn request_url(&self, route_id: &str) -> String {
        format!(
            "{}?serviceKey={}&stationId={}&routeId={}&staOrder={}&format=json",
            self.endpoint, self.service_key, self.station_id, route_id, self.sta_order
        )
    }

    async fn fetch(&self, route_id: &str) -> Result<Value> {
        let response = self
            .client
            .get(self.request_url(route_id))
            .send()
            .await
            .context("도착 정보 API 요청 실패")?;

        if !response.status().is_success() {
            anyhow::bail!("도착 정보 API 오류: {}", response.status());
        }

        response
            .json::<Value>()
            .await
            .context("도착 정보 응답 해석 실패")
    }

    /// 버스 한 대의 안내 문장
    pub async fn report(&self, bus: &str) -> String {
        let Some(route_id) = self.route_id(bus) else {
            return format!("{}번 버스는 지원되지 않는 노선입니다.", bus);
        };

        match self.fetch(route_id).await {
            Ok(body) => describe_arrival(bus, &body),
            Err(e) => {
                log::error!("{}번 버스 정보 조회 실패: {:#}", bus, e);
                format!("{}번 버스 정보를 가져오는 데 실패했습니다.", bus)
            }
        }
    }

    /// 여러 대의 안내를 순서대로 조회해서 한 문장으로
    pub async fn report_all(&self, buses: &[String]) -> String {
        let mut reports = Vec::with_capacity(buses.len());
        for bus in buses {
            reports.push(self.report(bus).await);
        }
        reports.join(REPORT_SEPARATOR)
    }
}

/// API 응답에서 첫 번째 도착 예정 버스의 안내 문장을 만든다
///
/// `predictTime1`(분)과 `locationNo1`(남은 정류장)이 모두 있어야 도착 예정 안내,
/// 하나라도 없거나 비어 있으면 실시간 정보 없음.
///
/// # Examples
///
/// ```
/// # use bus_kiosk::lookup::describe_arrival;
/// let body = serde_json::json!({
///     "response": {"msgBody": {"busArrivalItem": {"predictTime1": 7, "locationNo1": 3}}}
/// });
/// assert_eq!(
///     describe_arrival("5100", &body),
///     "5100번 버스는 7분 후 도착 예정이며, 남은 정류장은 3개 입니다."
/// );
/// ```
pub fn describe_arrival(bus: &str, body: &Value) -> String {
    let item = &body["response"]["msgBody"]["busArrivalItem"];
    match (present(&item["predictTime1"]), present(&item["locationNo1"])) {
        (Some(minutes), Some(stops)) => format!(
            "{}번 버스는 {}분 후 도착 예정이며, 남은 정류장은 {}개 입니다.",
            bus, minutes, stops
        ),
        _ => format!("{}번 버스의 실시간 도착 정보가 없습니다.", bus),
    }
}

/// 비어 있지 않은 값만 문자열로 (null, 빈 문자열, 0은 없음으로 본다)
fn present(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// 조회 대상 결정 결과
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Targets {
    Buses(Vec<String>),
    /// 대상 없음 (안내 문장 포함)
    Nothing(&'static str),
}

/// 인자가 있으면 그 번호 하나, 없으면 목록 파일 전체
pub fn resolve_targets(bus: Option<&str>, list_path: &Path) -> Targets {
    if let Some(bus) = bus {
        log::info!("단일 버스 조회 모드: {}", bus);
        return Targets::Buses(vec![bus.to_string()]);
    }

    log::info!("전체 버스 조회 모드");
    match fs::read_to_string(list_path) {
        Ok(content) => {
            let buses: Vec<String> = parse_list(&content).into_iter().collect();
            if buses.is_empty() {
                Targets::Nothing(NO_SAVED_BUSES)
            } else {
                Targets::Buses(buses)
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Targets::Nothing(NO_SAVED_BUSES),
        Err(e) => {
            log::error!("버스 번호 파일 읽기 실패: {:?}: {}", list_path, e);
            Targets::Nothing(LIST_READ_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn lookup() -> ArrivalLookup {
        let config = LookupConfig {
            service_key: "abc%2Bdef%3D%3D".to_string(),
            ..LookupConfig::default()
        };
        ArrivalLookup::new(&config).unwrap()
    }

    fn body(item: Value) -> Value {
        json!({"response": {"msgBody": {"busArrivalItem": item}}})
    }

    #[test]
    fn test_describe_arrival_with_strings() {
        let body = body(json!({"predictTime1": "12", "locationNo1": "5"}));
        assert_eq!(
            describe_arrival("M5107", &body),
            "M5107번 버스는 12분 후 도착 예정이며, 남은 정류장은 5개 입니다."
        );
    }

    #[test]
    fn test_describe_arrival_missing_data() {
        let expected = "7000번 버스의 실시간 도착 정보가 없습니다.";
        assert_eq!(describe_arrival("7000", &body(json!({"predictTime1": 3}))), expected);
        assert_eq!(
            describe_arrival("7000", &body(json!({"predictTime1": "", "locationNo1": 2}))),
            expected
        );
        assert_eq!(
            describe_arrival("7000", &body(json!({"predictTime1": 0, "locationNo1": 2}))),
            expected
        );
        assert_eq!(describe_arrival("7000", &json!({"response": {}})), expected);
    }

    #[test]
    fn test_request_url_keeps_encoded_key() {
        let url = lookup().request_url("200000115");
        assert!(url.starts_with("http://apis.data.go.kr/"));
        assert!(url.contains("serviceKey=abc%2Bdef%3D%3D&"));
        assert!(url.contains("stationId=228000723"));
        assert!(url.contains("routeId=200000115"));
        assert!(url.contains("staOrder=56"));
        assert!(url.ends_with("format=json"));
    }

    #[tokio::test]
    async fn test_unsupported_route() {
        let lookup = lookup();
        assert_eq!(lookup.route_id("9999"), None);
        assert_eq!(
            lookup.report("9999").await,
            "9999번 버스는 지원되지 않는 노선입니다."
        );
        assert_eq!(
            lookup.report_all(&["1".to_string(), "2".to_string()]).await,
            "1번 버스는 지원되지 않는 노선입니다. 그리고, 2번 버스는 지원되지 않는 노선입니다."
        );
    }

    #[test]
    fn test_resolve_targets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bus_number.txt");

        assert_eq!(
            resolve_targets(Some("5100"), &path),
            Targets::Buses(vec!["5100".to_string()])
        );
        assert_eq!(resolve_targets(None, &path), Targets::Nothing(NO_SAVED_BUSES));

        fs::write(&path, "\n  \n").unwrap();
        assert_eq!(resolve_targets(None, &path), Targets::Nothing(NO_SAVED_BUSES));

        fs::write(&path, "M5107\n5100\n").unwrap();
        assert_eq!(
            resolve_targets(None, &path),
            Targets::Buses(vec!["5100".to_string(), "M5107".to_string()])
        );
    }

    #[test]
    fn test_resolve_targets_unreadable() {
        let dir = TempDir::new().unwrap();
        // 디렉터리는 파일로 읽을 수 없다
        assert_eq!(
            resolve_targets(None, dir.path()),
            Targets::Nothing(LIST_READ_FAILED)
        );
    }
}
