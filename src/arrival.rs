use crate::registry::RegisteredBuses;
use crate::types::RemoveOutcome;
use anyhow::Result;

/// 도착 신호 태그
pub const ARRIVED_TAG: &str = "ARRIVED";

/// 마이크로컨트롤러가 보내는 도착 알림 (`ARRIVED:<노선 번호>`)
///
/// 노선 번호는 문법 검사 없이 그대로 받는다. 마이크로컨트롤러는
/// 키오스크가 보낸 번호만 돌려준다.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrivalNotice {
    pub bus: String,
}

impl ArrivalNotice {
    /// 한 줄을 해석. 도착 알림이 아니면 None
    ///
    /// # Examples
    ///
    /// ```
    /// # use bus_kiosk::arrival::ArrivalNotice;
    /// let notice = ArrivalNotice::parse("ARRIVED:5100\r\n").unwrap();
    /// assert_eq!(notice.bus, "5100");
    /// assert!(ArrivalNotice::parse("READY").is_none());
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with(ARRIVED_TAG) || !line[ARRIVED_TAG.len()..].starts_with(':') {
            return None;
        }
        let bus = line.split(':').nth(1)?;
        Some(Self {
            bus: bus.to_string(),
        })
    }
}

/// 도착 알림 처리 결과
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// 목록에서 제거됨
    Removed(String),
    /// 목록에 없는 번호 (로그만 남김)
    NotRegistered(String),
    /// 도착 알림 형식이 아닌 줄
    Ignored,
}

/// 도착 알림 한 줄을 받아 등록 목록에서 제거
///
/// 안내 음성과 표시등은 목록에 쌓인 이벤트로 처리된다.
pub fn on_arrival(registry: &mut RegisteredBuses, raw_token: &str) -> Result<ArrivalOutcome> {
    let Some(notice) = ArrivalNotice::parse(raw_token) else {
        log::debug!("도착 알림이 아닌 수신 데이터: {:?}", raw_token);
        return Ok(ArrivalOutcome::Ignored);
    };

    log::info!("도착 신호 수신: {}", notice.bus);
    match registry.remove(&notice.bus)? {
        RemoveOutcome::Removed => Ok(ArrivalOutcome::Removed(notice.bus)),
        RemoveOutcome::NotFound => Ok(ArrivalOutcome::NotRegistered(notice.bus)),
    }
}
