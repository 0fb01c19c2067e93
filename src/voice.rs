//! 음성 입력 세션 (`bus-kiosk voice`)
//!
//! 마이크 녹음 → 음성 인식 → 번호 확인 대화 → 목록 파일에 추가.
//! 키오스크 본체와는 목록 파일과 `CONFIRMED_BUS:` 출력으로만 연결된다.

use crate::config::VoiceConfig;
use crate::dialog::{ConfirmationDialog, DialogTiming, Listen, TranscriptSource};
use crate::grammar::BusId;
use crate::recorder::{pcm_to_bytes, Microphone};
use crate::registry::RegisteredBuses;
use crate::stt::SpeechRecognizer;
use crate::tts::Announcer;
use crate::types::{AddOutcome, Playback};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// 마이크와 음성 인식기를 묶은 입력원
pub struct MicrophoneListener<R: SpeechRecognizer> {
    microphone: Microphone,
    recognizer: R,
}

impl<R: SpeechRecognizer> MicrophoneListener<R> {
    pub fn new(microphone: Microphone, recognizer: R) -> Self {
        Self {
            microphone,
            recognizer,
        }
    }
}

#[async_trait]
impl<R: SpeechRecognizer> TranscriptSource for MicrophoneListener<R> {
    async fn listen(&mut self, duration: Duration) -> Listen {
        let samples = match self.microphone.record(duration).await {
            Ok(samples) if !samples.is_empty() => samples,
            Ok(_) => {
                log::error!("녹음된 음성이 없습니다.");
                return Listen::RecordingFailed;
            }
            Err(e) => {
                log::error!("녹음 중 오류: {:#}", e);
                return Listen::RecordingFailed;
            }
        };

        match self.recognizer.recognize(&pcm_to_bytes(&samples)).await {
            Some(text) => Listen::Heard(text),
            None => Listen::NotUnderstood,
        }
    }
}

impl DialogTiming {
    pub fn from_config(config: &VoiceConfig) -> Self {
        Self {
            candidate: Duration::from_secs(config.record_seconds),
            confirmation: Duration::from_secs(config.confirm_record_seconds),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            yes_no_playback: config.yes_no_playback,
        }
    }
}

/// 음성 입력 세션 한 번
///
/// 확정된 번호를 목록 파일에 추가하고 돌려준다.
/// `max_attempts`가 설정되어 있고 그 횟수를 넘기면 None.
///
/// # Errors
///
/// 목록 파일을 읽거나 쓰지 못한 경우.
pub async fn run_voice_session(
    source: &mut dyn TranscriptSource,
    announcer: &dyn Announcer,
    config: &VoiceConfig,
    list_path: &Path,
) -> Result<Option<BusId>> {
    let timing = DialogTiming::from_config(config);
    let mut dialog = ConfirmationDialog::new();
    let Some(bus) = dialog
        .run(source, announcer, &timing, config.max_attempts)
        .await
    else {
        log::error!("버스 번호를 확인하지 못했습니다.");
        return Ok(None);
    };

    let mut registry = RegisteredBuses::open(list_path)?;
    if registry.add(&bus)? == AddOutcome::AlreadyPresent {
        log::info!("{}번은 이미 목록에 있습니다.", bus);
    }

    let message = format!("{} 번이 목록에 추가되었습니다.", bus);
    log::info!("[최종 결과] {}", message);
    announcer.announce(&message, Playback::Blocking).await;
    Ok(Some(bus))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingAnnouncer, ScriptedSource};
    use std::fs;
    use tempfile::TempDir;

    fn config(max_attempts: u32) -> VoiceConfig {
        VoiceConfig {
            retry_delay_ms: 0,
            max_attempts,
            ..VoiceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_voice_session_adds_to_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bus_number.txt");
        fs::write(&path, "7000\n").unwrap();

        let mut source = ScriptedSource::new(vec![
            Listen::Heard("엠 오일공칠 번 버스".to_string()),
            Listen::Heard("네".to_string()),
        ]);
        let announcer = RecordingAnnouncer::default();

        let bus = run_voice_session(&mut source, &announcer, &config(5), &path)
            .await
            .unwrap();
        assert_eq!(bus, BusId::parse("M5107"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "7000\nM5107\n");
        assert_eq!(
            announcer.messages().last().unwrap(),
            "M5107 번이 목록에 추가되었습니다."
        );
        assert_eq!(
            source.durations(),
            &[Duration::from_secs(3), Duration::from_secs(3)]
        );
    }

    #[tokio::test]
    async fn test_voice_session_yes_no_prompt_in_background() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bus_number.txt");
        let mut source = ScriptedSource::new(vec![
            Listen::Heard("5100".to_string()),
            Listen::Heard("응".to_string()),
        ]);
        let announcer = RecordingAnnouncer::default();

        run_voice_session(&mut source, &announcer, &config(5), &path)
            .await
            .unwrap();

        let messages = announcer.messages();
        let idx = messages
            .iter()
            .position(|m| m == "네 또는 아니오로 답해주세요.")
            .unwrap();
        assert_eq!(announcer.playbacks()[idx], Playback::Background);
    }

    #[tokio::test]
    async fn test_voice_session_retries_until_confirmed_by_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bus_number.txt");
        let mut script = vec![Listen::Heard("안녕하세요".to_string()); 6];
        script.push(Listen::Heard("오일공공".to_string()));
        script.push(Listen::Heard("네".to_string()));
        let mut source = ScriptedSource::new(script);
        let announcer = RecordingAnnouncer::default();
        let config = VoiceConfig {
            retry_delay_ms: 0,
            ..VoiceConfig::default()
        };

        let bus = run_voice_session(&mut source, &announcer, &config, &path)
            .await
            .unwrap();
        assert_eq!(bus, BusId::parse("5100"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "5100\n");
        assert!(!announcer
            .messages()
            .iter()
            .any(|m| m == "오류가 발생하여 버스 번호를 확인하지 못했습니다."));
    }

    #[tokio::test]
    async fn test_voice_session_gives_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bus_number.txt");
        let mut source = ScriptedSource::new(vec![]);
        let announcer = RecordingAnnouncer::default();

        let bus = run_voice_session(&mut source, &announcer, &config(2), &path)
            .await
            .unwrap();
        assert!(bus.is_none());
        assert!(!path.exists());
    }
}
