use serde::{Deserialize, Serialize};

/// 등록 결과
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// 새로 등록되어 파일에 기록됨
    Added,
    /// 이미 목록에 있음 (파일 변경 없음)
    AlreadyPresent,
}

/// 제거 결과
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// 목록과 파일에서 제거됨
    Removed,
    /// 목록에 없음 (로그만 남기고 무시)
    NotFound,
}

/// 등록 목록 변경에 따라 발생하는 부수 효과 신호
///
/// 목록 자체는 스피커/LED를 모른다. 변경 후 쌓인 이벤트를 컨트롤러가 꺼내서 처리한다.
///
/// # Examples
///
/// ```
/// # use bus_kiosk::types::RegistryEvent;
/// let event = RegistryEvent::Arrived("5100".to_string());
/// assert_eq!(event.announcement().as_deref(), Some("5100번 버스 도착이 확인되었습니다."));
/// assert_eq!(RegistryEvent::Indicator { active: true }.announcement(), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryEvent {
    /// 표시등 상태 (목록이 비어 있지 않으면 켜짐)
    Indicator { active: bool },

    /// 등록된 버스가 도착해 목록에서 빠짐
    Arrived(String),

    /// 마지막 버스가 빠져 목록이 비었음
    AllComplete,
}

impl RegistryEvent {
    /// 이벤트에 대응하는 안내 문구 (없으면 None)
    pub fn announcement(&self) -> Option<String> {
        match self {
            RegistryEvent::Indicator { .. } => None,
            RegistryEvent::Arrived(bus) => Some(format!("{}번 버스 도착이 확인되었습니다.", bus)),
            RegistryEvent::AllComplete => Some("모든 버스 탑승이 완료되었습니다.".to_string()),
        }
    }
}

/// 안내 음성 재생 방식
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Playback {
    /// 재생이 끝날 때까지 대기
    Blocking,

    /// 재생을 시작만 하고 바로 반환
    Background,
}
