use crate::config::TtsConfig;
use crate::types::Playback;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex_lite::Regex;
use std::process::Stdio;
use tokio::process::Command;

/// 음성 안내 출력의 공통 트레이트
///
/// 실패는 내부에서 로그로 처리하고 호출자에게 전달하지 않는다.
#[async_trait]
pub trait Announcer: Send + Sync {
    /// 문장을 읽어 준다 (빈 문장은 무시)
    async fn announce(&self, text: &str, playback: Playback);
}

/// 음성 출력 없이 로그만 남기는 안내기 (TTS 비활성 시)
#[derive(Debug, Default, Clone)]
pub struct LogAnnouncer;

#[async_trait]
impl Announcer for LogAnnouncer {
    async fn announce(&self, text: &str, _playback: Playback) {
        if !text.trim().is_empty() {
            log::info!("[TTS 비활성] {}", text);
        }
    }
}

/// 외부 합성/재생 명령을 이용한 안내기
///
/// 1. 합성 명령으로 임시 음성 파일 생성 (`{text}`, `{output}` 치환)
/// 2. 재생 명령으로 재생 (스피커 키워드로 찾은 ALSA 장치를 `-D`로 지정)
pub struct CommandAnnouncer {
    synth_command: Vec<String>,
    player_command: Vec<String>,
    device_flag: String,
    alsa_device: Option<String>,
}

impl CommandAnnouncer {
    /// 스피커 장치를 검색해서 안내기를 만든다
    ///
    /// 키워드에 맞는 장치가 없으면 시스템 기본 장치를 쓴다.
    pub async fn detect(config: &TtsConfig) -> Self {
        let alsa_device = if config.speaker_keyword.is_empty() {
            log::info!("스피커 키워드가 없어 시스템 기본 장치를 사용합니다.");
            None
        } else {
            match list_playback_devices(&config.device_list_command).await {
                Ok(listing) => {
                    let found = find_alsa_device(&listing, &config.speaker_keyword);
                    match &found {
                        Some(device) => log::info!("스피커 장치 찾음: {}", device),
                        None => log::warn!(
                            "키워드 '{}'를 포함하는 스피커를 찾지 못했습니다. 기본 장치를 사용합니다.",
                            config.speaker_keyword
                        ),
                    }
                    found
                }
                Err(e) => {
                    log::error!("스피커 장치 검색 중 오류: {:#}", e);
                    None
                }
            }
        };

        Self {
            synth_command: config.synth_command.clone(),
            player_command: config.player_command.clone(),
            device_flag: config.device_flag.clone(),
            alsa_device,
        }
    }

    pub fn alsa_device(&self) -> Option<&str> {
        self.alsa_device.as_deref()
    }

    async fn speak(&self, text: &str, playback: Playback) -> Result<()> {
        let audio_file = tempfile::Builder::new()
            .prefix("bus-kiosk-tts-")
            .suffix(".wav")
            .tempfile()
            .context("TTS 임시 파일 생성 실패")?;
        let output = audio_file.path().to_string_lossy().to_string();

        let synth = substitute(&self.synth_command, text, &output);
        let (program, args) = synth.split_first().context("합성 명령이 비어 있습니다")?;
        let status = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("합성 명령 실행 실패: {}", program))?;
        if !status.status.success() {
            anyhow::bail!(
                "합성 명령 실패 ({}): {}",
                status.status,
                String::from_utf8_lossy(&status.stderr).trim()
            );
        }

        let player = self.player_args(&output);
        log::debug!("[TTS] 다음 명령어로 재생 시도: {}", player.join(" "));
        let (program, args) = player.split_first().context("재생 명령이 비어 있습니다")?;
        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("재생 명령 실행 실패: {}", program))?;

        match playback {
            Playback::Blocking => {
                let result = child.wait_with_output().await.context("재생 대기 실패")?;
                if !result.status.success() {
                    anyhow::bail!(
                        "재생 실패 ({}): {}. 스피커 연결을 확인하세요.",
                        result.status,
                        String::from_utf8_lossy(&result.stderr).trim()
                    );
                }
            }
            Playback::Background => {
                // 재생이 끝날 때까지 임시 파일을 유지
                tokio::spawn(async move {
                    let _audio_file = audio_file;
                    if let Err(e) = child.wait().await {
                        log::error!("백그라운드 재생 오류: {}", e);
                    }
                });
            }
        }

        Ok(())
    }

    fn player_args(&self, output: &str) -> Vec<String> {
        let mut args = self.player_command.clone();
        if let Some(device) = &self.alsa_device {
            args.push(self.device_flag.clone());
            args.push(device.clone());
        }
        args.push(output.to_string());
        args
    }
}

#[async_trait]
impl Announcer for CommandAnnouncer {
    async fn announce(&self, text: &str, playback: Playback) {
        if text.trim().is_empty() {
            return;
        }
        log::info!("[안내] {}", text);
        if let Err(e) = self.speak(text, playback).await {
            log::error!("음성 안내 실패: {:#}", e);
        }
    }
}

/// 명령 인자 템플릿 치환
fn substitute(template: &[String], text: &str, output: &str) -> Vec<String> {
    template
        .iter()
        .map(|arg| arg.replace("{text}", text).replace("{output}", output))
        .collect()
}

async fn list_playback_devices(command: &[String]) -> Result<String> {
    let (program, args) = command.split_first().context("장치 목록 명령이 비어 있습니다")?;
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("'{}' 명령을 찾을 수 없습니다. alsa-utils가 설치되어 있는지 확인하세요.", program))?;
    if !output.status.success() {
        anyhow::bail!("장치 목록 명령 실패: {}", output.status);
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// `aplay -l` 출력에서 키워드를 포함한 첫 장치의 ALSA 이름(`hw:카드,장치`)을 찾는다
pub fn find_alsa_device(listing: &str, keyword: &str) -> Option<String> {
    let card_device = Regex::new(r"card (\d+).*device (\d+)").ok()?;
    let keyword = keyword.to_lowercase();

    listing
        .lines()
        .filter(|line| line.to_lowercase().contains(&keyword))
        .find_map(|line| {
            let caps = card_device.captures(line)?;
            Some(format!("hw:{},{}", caps.get(1)?.as_str(), caps.get(2)?.as_str()))
        })
}
