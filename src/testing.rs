//! 테스트용 가짜 협력자

use crate::dialog::{Listen, TranscriptSource};
use crate::indicator::Indicator;
use crate::keypad::{Key, KeySource};
use crate::pipeline::{CommandExecutor, CommandOutput};
use crate::serial::SerialLink;
use crate::tts::Announcer;
use crate::types::Playback;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 미리 정해 둔 결과를 순서대로 돌려주는 입력원
///
/// 대본이 끝나면 계속 `NotUnderstood`.
pub struct ScriptedSource {
    script: VecDeque<Listen>,
    durations: Vec<Duration>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Listen>) -> Self {
        Self {
            script: script.into(),
            durations: Vec::new(),
        }
    }

    pub fn durations(&self) -> &[Duration] {
        &self.durations
    }
}

#[async_trait]
impl TranscriptSource for ScriptedSource {
    async fn listen(&mut self, duration: Duration) -> Listen {
        self.durations.push(duration);
        self.script.pop_front().unwrap_or(Listen::NotUnderstood)
    }
}

/// 안내 문구를 기록만 하는 안내기
#[derive(Default, Clone)]
pub struct RecordingAnnouncer {
    spoken: Arc<Mutex<Vec<(String, Playback)>>>,
}

impl RecordingAnnouncer {
    pub fn messages(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn playbacks(&self) -> Vec<Playback> {
        self.spoken.lock().unwrap().iter().map(|(_, p)| *p).collect()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, text: &str, playback: Playback) {
        if !text.trim().is_empty() {
            self.spoken.lock().unwrap().push((text.to_string(), playback));
        }
    }
}

/// 메모리 상의 시리얼 (수신 대기열 + 송신 기록)
#[derive(Default, Clone)]
pub struct FakeSerial {
    incoming: Arc<Mutex<VecDeque<String>>>,
    written: Arc<Mutex<Vec<String>>>,
}

impl FakeSerial {
    pub fn push_line(&self, line: &str) {
        self.incoming.lock().unwrap().push_back(line.to_string());
    }

    pub fn written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }
}

impl SerialLink for FakeSerial {
    fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.incoming.lock().unwrap().pop_front())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.written.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

/// 미리 넣어 둔 키를 하나씩 돌려주는 키패드
#[derive(Default, Clone)]
pub struct FakeKeypad {
    keys: Arc<Mutex<VecDeque<Key>>>,
    bounce_free: bool,
}

impl FakeKeypad {
    /// 콘솔처럼 떨림이 없는 입력원
    pub fn bounce_free() -> Self {
        Self {
            bounce_free: true,
            ..Self::default()
        }
    }

    pub fn press_all(&self, keys: &str) {
        let mut queue = self.keys.lock().unwrap();
        queue.extend(keys.chars().filter_map(Key::from_char));
    }
}

impl KeySource for FakeKeypad {
    fn poll(&mut self) -> Option<Key> {
        self.keys.lock().unwrap().pop_front()
    }

    fn needs_debounce(&self) -> bool {
        !self.bounce_free
    }
}

/// 상태 변화를 기록하는 표시등
#[derive(Default, Clone)]
pub struct FakeIndicator {
    states: Arc<Mutex<Vec<bool>>>,
}

impl FakeIndicator {
    pub fn current(&self) -> Option<bool> {
        self.states.lock().unwrap().last().copied()
    }
}

impl Indicator for FakeIndicator {
    fn set(&mut self, on: bool) -> Result<()> {
        self.states.lock().unwrap().push(on);
        Ok(())
    }
}

/// 결과를 미리 정해 두는 명령 실행기
///
/// 대본이 끝나면 성공 + 빈 출력.
#[derive(Default, Clone)]
pub struct FakeExecutor {
    outputs: Arc<Mutex<VecDeque<std::result::Result<CommandOutput, String>>>>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_output(&self, success: bool, stdout: &str) {
        self.outputs.lock().unwrap().push_back(Ok(CommandOutput {
            success,
            stdout: stdout.to_string(),
        }));
    }

    pub fn push_error(&self, message: &str) {
        self.outputs
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    /// 호출된 명령 (프로그램 + 인자)
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.lock().unwrap().push(call);

        match self.outputs.lock().unwrap().pop_front() {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(CommandOutput {
                success: true,
                stdout: String::new(),
            }),
        }
    }
}
