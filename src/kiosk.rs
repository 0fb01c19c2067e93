//! 키오스크 메인 루프
//!
//! 시리얼 도착 신호와 키패드 입력을 짧은 주기로 번갈아 확인한다.
//! 등록 목록은 이 루프만 변경하므로 잠금이 필요 없다.

use crate::arrival::{on_arrival, ArrivalOutcome};
use crate::config::KeypadConfig;
use crate::grammar::BusId;
use crate::indicator::Indicator;
use crate::keypad::{Debouncer, InputBuffer, Key, KeyCommand, KeySource};
use crate::pipeline::{LookupPipeline, VoiceOutcome, VoicePipeline};
use crate::registry::RegisteredBuses;
use crate::serial::SerialLink;
use crate::tts::Announcer;
use crate::types::{AddOutcome, Playback, RegistryEvent};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// 키오스크에 연결된 장치들
pub struct Devices {
    pub serial: Box<dyn SerialLink>,
    pub keypad: Box<dyn KeySource>,
    pub indicator: Box<dyn Indicator>,
    pub announcer: Box<dyn Announcer>,
}

/// 키오스크 컨트롤러
pub struct Kiosk {
    registry: RegisteredBuses,
    devices: Devices,
    voice: VoicePipeline,
    lookup: LookupPipeline,
    input: InputBuffer,
    debouncer: Debouncer,
    poll_interval: Duration,
    echo_keys: bool,
}

impl Kiosk {
    pub fn new(
        registry: RegisteredBuses,
        devices: Devices,
        voice: VoicePipeline,
        lookup: LookupPipeline,
        keypad: &KeypadConfig,
    ) -> Self {
        Self {
            registry,
            devices,
            voice,
            lookup,
            input: InputBuffer::new(),
            debouncer: Debouncer::new(Duration::from_millis(keypad.debounce_ms)),
            poll_interval: Duration::from_millis(keypad.poll_interval_ms),
            echo_keys: keypad.echo_keys,
        }
    }

    pub fn registry(&self) -> &RegisteredBuses {
        &self.registry
    }

    pub fn input(&self) -> &str {
        self.input.as_str()
    }

    /// 새 세션 시작: 이전 목록을 지우고 표시등을 끈 뒤 준비 안내
    pub async fn start(&mut self) -> Result<()> {
        log::info!("이전 버스 목록을 모두 삭제합니다.");
        self.registry.clear_and_delete()?;
        self.dispatch_events().await;

        log::info!("키패드 준비 완료 (Ctrl+C 종료)");
        self.say("키패드 사용이 가능합니다.").await;
        Ok(())
    }

    /// 중단 신호가 올 때까지 폴링
    pub async fn run(&mut self, running: &AtomicBool) {
        while running.load(Ordering::SeqCst) {
            self.poll_once().await;
            tokio::time::sleep(self.poll_interval).await;
        }
        log::info!("종료 신호 수신");
    }

    /// 한 주기: 수신된 시리얼 줄을 모두 처리한 뒤 키 하나를 처리
    ///
    /// 오류는 로그만 남기고 다음 주기로 넘어간다.
    pub async fn poll_once(&mut self) {
        loop {
            match self.devices.serial.read_line() {
                Ok(Some(line)) => {
                    if let Err(e) = self.handle_serial_line(&line).await {
                        log::error!("도착 신호 처리 실패: {:#}", e);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::error!("{:#}", e);
                    break;
                }
            }
        }

        if let Some(key) = self.devices.keypad.poll() {
            let bounce_free = !self.devices.keypad.needs_debounce();
            if bounce_free || self.debouncer.accept(key, Instant::now()) {
                if let Err(e) = self.handle_key(key).await {
                    log::error!("키 입력 처리 실패: {:#}", e);
                }
            }
        }
    }

    /// 마이크로컨트롤러에서 받은 한 줄 처리
    pub async fn handle_serial_line(&mut self, line: &str) -> Result<ArrivalOutcome> {
        let outcome = on_arrival(&mut self.registry, line)?;
        self.dispatch_events().await;
        Ok(outcome)
    }

    /// 디바운스를 통과한 키 하나 처리
    pub async fn handle_key(&mut self, key: Key) -> Result<()> {
        log::info!("[Key] {}", key.label());
        if self.echo_keys {
            if let Some(echo) = key.echo() {
                self.say(&echo).await;
            }
        }

        match self.input.press(key) {
            KeyCommand::Edited => {}
            KeyCommand::EmptyInput => self.say("입력된 버스 번호가 없습니다.").await,
            KeyCommand::Register(text) => self.register_typed(&text).await?,
            KeyCommand::LookupAll => self.lookup_all().await,
            KeyCommand::VoiceMode => self.voice_mode().await?,
        }

        log::info!("[Input] {}", self.input.as_str());
        Ok(())
    }

    async fn register_typed(&mut self, text: &str) -> Result<()> {
        let Some(bus) = BusId::parse(text) else {
            log::warn!("올바르지 않은 버스 번호 입력: {}", text);
            self.say(&format!("{}은 올바른 버스 번호가 아닙니다.", text))
                .await;
            return Ok(());
        };

        match self.registry.add(&bus)? {
            AddOutcome::Added => {
                self.say(&format!("{}번 버스를 등록합니다.", bus)).await;
                self.dispatch_events().await;
                self.lookup.run(Some(bus.as_str())).await;
                self.send(&bus)?;
            }
            AddOutcome::AlreadyPresent => {
                self.say(&format!("{}번 버스는 이미 등록되어 있습니다.", bus))
                    .await;
            }
        }
        Ok(())
    }

    async fn lookup_all(&mut self) {
        if self.registry.is_empty() {
            self.say("조회할 버스가 없습니다.").await;
            return;
        }
        self.say("등록된 모든 버스의 실시간 도착 정보를 조회합니다.")
            .await;
        self.lookup.run(None).await;
    }

    /// 음성 입력 파이프라인 실행 후 파일에서 목록을 다시 읽는다
    async fn voice_mode(&mut self) -> Result<()> {
        let outcome = self.voice.run().await;

        self.registry.sync_from_file()?;
        self.dispatch_events().await;
        log::info!(
            "음성 인식 후 상태 동기화 완료. 현재 목록: {:?}",
            self.registry.iter().collect::<Vec<_>>()
        );

        if let VoiceOutcome::Confirmed(bus) = outcome {
            self.lookup.run(Some(&bus)).await;
            if self.registry.contains(&bus) {
                self.devices.serial.write_line(&bus)?;
                log::info!("전송: {}", bus);
            } else {
                log::warn!("확인된 번호({})가 목록 파일에 없습니다.", bus);
            }
        }
        Ok(())
    }

    fn send(&mut self, bus: &BusId) -> Result<()> {
        self.devices.serial.write_line(bus.as_str())?;
        log::info!("전송: {}", bus);
        Ok(())
    }

    /// 등록 목록에 쌓인 이벤트를 표시등/안내로 반영
    async fn dispatch_events(&mut self) {
        for event in self.registry.drain_events() {
            match &event {
                RegistryEvent::Indicator { active } => {
                    if let Err(e) = self.devices.indicator.set(*active) {
                        log::error!("{:#}", e);
                    }
                }
                RegistryEvent::Arrived(_) | RegistryEvent::AllComplete => {
                    if let Some(message) = event.announcement() {
                        self.say(&message).await;
                    }
                }
            }
        }
    }

    async fn say(&self, text: &str) {
        self.devices
            .announcer
            .announce(text, Playback::Blocking)
            .await;
    }

    /// 장치 정리 (표시등 끄기)
    pub fn shutdown(&mut self) {
        if let Err(e) = self.devices.indicator.set(false) {
            log::error!("{:#}", e);
        }
        log::info!("키오스크를 종료합니다.");
    }
}
