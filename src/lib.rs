//! bus-kiosk - 버스 탑승 안내 키오스크
//!
//! 키패드나 음성으로 기다리는 버스 번호를 등록하고, 마이크로컨트롤러가
//! 시리얼로 보내 주는 도착 신호에 맞춰 목록에서 지우며 음성으로 안내한다.
//!
//! # 주요 기능
//!
//! - **번호 추출**: "엠 오일공칠 번"처럼 한국어로 읽은 음성 인식 결과를 `M5107`로 변환
//! - **등록 목록**: 정렬/중복 제거된 목록을 줄 단위 파일과 1:1로 유지
//! - **도착 처리**: `ARRIVED:<번호>` 신호로 목록에서 제거, 표시등과 안내 음성 갱신
//! - **확인 대화**: 번호 제안 → 예/아니오 확인 후에만 등록
//! - **도착 정보 조회**: 경기도 버스도착정보 API로 도착 예정 시간 안내
//!
//! # 아키텍처
//!
//! ```text
//! [Keypad] ──┐                         ┌─→ [Indicator]
//!            ├─→ [Kiosk] ─→ [RegisteredBuses] ─→ [bus_number.txt]
//! [Serial] ──┘      │   ↑              └─→ [Announcer]
//!                   │   └── sync_from_file
//!                   ↓
//!        [VoicePipeline] ─→ bus-kiosk voice
//!                              [Microphone] → [SpeechRecognizer]
//!                                     ↓
//!                              [normalizer] → [ConfirmationDialog]
//!                                     ↓
//!                              CONFIRMED_BUS:<번호>
//! ```
//!
//! # 사용 예
//!
//! ```
//! use bus_kiosk::normalizer::extract_identifier;
//!
//! let bus = extract_identifier("오일공공 다시 일").unwrap();
//! assert_eq!(bus.as_str(), "5100-1");
//! ```

pub mod arrival;
pub mod config;
pub mod dialog;
pub mod grammar;
pub mod indicator;
pub mod keypad;
pub mod kiosk;
pub mod lookup;
pub mod normalizer;
pub mod pipeline;
pub mod recorder;
pub mod registry;
pub mod serial;
pub mod stt;
pub mod syllables;
pub mod tts;
pub mod types;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;
